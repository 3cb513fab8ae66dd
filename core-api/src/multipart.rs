//! Multipart/form-data request encoding.
//!
//! The story upload endpoint takes a photo file plus text fields as a
//! `multipart/form-data` body. Encoding the body by hand keeps the
//! [`HttpClient`](crate::http::HttpClient) seam uniform (every request is a
//! method, a URL, headers, and bytes), which is what makes the transport
//! mockable.

use bytes::{BufMut, Bytes, BytesMut};

/// Builder for a `multipart/form-data` request body.
///
/// ```
/// use core_api::multipart::MultipartForm;
/// use bytes::Bytes;
///
/// let form = MultipartForm::new()
///     .text("description", "sunset at the pier")
///     .file("photo", "photo.jpg", "image/jpeg", Bytes::from_static(b"..."));
///
/// let content_type = form.content_type();
/// let body = form.into_body();
/// assert!(content_type.starts_with("multipart/form-data; boundary="));
/// assert!(!body.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    parts: Vec<Part>,
}

#[derive(Debug, Clone)]
enum Part {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        content_type: String,
        data: Bytes,
    },
}

impl MultipartForm {
    /// Create an empty form with a random boundary.
    pub fn new() -> Self {
        Self {
            boundary: format!("story-core-{:032x}", rand::random::<u128>()),
            parts: Vec::new(),
        }
    }

    /// Append a text field.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(Part::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Append a file field.
    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: Bytes,
    ) -> Self {
        self.parts.push(Part::File {
            name: name.into(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        });
        self
    }

    /// The `Content-Type` header value for this form.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Encode the form into the wire body.
    pub fn into_body(self) -> Bytes {
        let mut buf = BytesMut::new();

        for part in &self.parts {
            buf.put_slice(b"--");
            buf.put_slice(self.boundary.as_bytes());
            buf.put_slice(b"\r\n");

            match part {
                Part::Text { name, value } => {
                    buf.put_slice(
                        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                            .as_bytes(),
                    );
                    buf.put_slice(value.as_bytes());
                }
                Part::File {
                    name,
                    file_name,
                    content_type,
                    data,
                } => {
                    buf.put_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                            name, file_name
                        )
                        .as_bytes(),
                    );
                    buf.put_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
                    buf.put_slice(data);
                }
            }

            buf.put_slice(b"\r\n");
        }

        buf.put_slice(b"--");
        buf.put_slice(self.boundary.as_bytes());
        buf.put_slice(b"--\r\n");

        buf.freeze()
    }
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}
