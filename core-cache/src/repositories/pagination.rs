//! Pagination helper types for repository queries

use serde::{Deserialize, Serialize};

/// Pagination request parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Current page number (0-indexed)
    pub page: u32,
    /// Number of items per page
    pub page_size: u32,
}

impl PageRequest {
    /// Create a new page request
    ///
    /// # Examples
    ///
    /// ```
    /// use core_cache::repositories::PageRequest;
    ///
    /// let request = PageRequest::new(0, 20);
    /// assert_eq!(request.page, 0);
    /// assert_eq!(request.page_size, 20);
    /// ```
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// Calculate the SQL OFFSET value
    pub fn offset(&self) -> u32 {
        self.page * self.page_size
    }

    /// Get the LIMIT value (same as page_size)
    pub fn limit(&self) -> u32 {
        self.page_size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            page_size: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_default() {
        let request = PageRequest::default();
        assert_eq!(request.page, 0);
        assert_eq!(request.page_size, 20);
    }

    #[test]
    fn test_page_request_offset() {
        let request = PageRequest::new(0, 20);
        assert_eq!(request.offset(), 0);

        let request = PageRequest::new(2, 20);
        assert_eq!(request.offset(), 40);
    }

    #[test]
    fn test_page_request_limit() {
        let request = PageRequest::new(0, 20);
        assert_eq!(request.limit(), 20);
    }
}
