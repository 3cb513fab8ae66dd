//! List diff engine.
//!
//! Computes an edit script of insert/remove/move/update operations that
//! transforms one ordered sequence into another, using a caller-supplied
//! identity key and content equality predicate. Identity decides whether
//! two entries are "the same item"; content equality decides whether the
//! surviving item needs an `Update`. Content changes are therefore reported
//! as updates, never as a remove/insert pair.
//!
//! The engine is standalone and platform-independent: it knows nothing
//! about stories or rendering, only about two slices and two closures.
//! Keys are assumed unique within each sequence, which the cache
//! guarantees for story ids.

use std::collections::HashSet;
use std::hash::Hash;

/// One step of an edit script.
///
/// Indices refer to the sequence as it stands when the step is applied,
/// with earlier steps of the same script already performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOp<T> {
    /// Insert `item` so that it ends up at `index`.
    Insert { index: usize, item: T },
    /// Remove the item at `index`.
    Remove { index: usize },
    /// Take the item at `from` and re-insert it at `to`.
    Move { from: usize, to: usize },
    /// Replace the content of the item at `index` (same identity).
    Update { index: usize, item: T },
}

/// Compute an edit script turning `old` into `new`.
///
/// `key_of` extracts the identity key; `content_eq` compares full content.
///
/// Diffing a sequence against itself yields an empty script.
pub fn diff_by_key<T, K, FK, FE>(
    old: &[T],
    new: &[T],
    key_of: FK,
    content_eq: FE,
) -> Vec<EditOp<T>>
where
    T: Clone,
    K: Eq + Hash,
    FK: Fn(&T) -> K,
    FE: Fn(&T, &T) -> bool,
{
    let mut script = Vec::new();
    let mut working: Vec<T> = old.to_vec();

    let new_keys: HashSet<K> = new.iter().map(&key_of).collect();
    let old_keys: HashSet<K> = old.iter().map(&key_of).collect();

    // Removals first, back to front so earlier indices stay valid.
    for index in (0..working.len()).rev() {
        if !new_keys.contains(&key_of(&working[index])) {
            script.push(EditOp::Remove { index });
            working.remove(index);
        }
    }

    // Reorder survivors: walk the target order and pull each needed item
    // forward to its position.
    let survivors: Vec<&T> = new
        .iter()
        .filter(|item| old_keys.contains(&key_of(item)))
        .collect();
    for (position, target) in survivors.iter().copied().enumerate() {
        let target_key = key_of(target);
        if key_of(&working[position]) == target_key {
            continue;
        }
        let from = position
            + working[position..]
                .iter()
                .position(|item| key_of(item) == target_key)
                .expect("survivor key present in working sequence");
        script.push(EditOp::Move {
            from,
            to: position,
        });
        let item = working.remove(from);
        working.insert(position, item);
    }

    // Insert the newcomers at their final positions.
    for (index, item) in new.iter().enumerate() {
        if !old_keys.contains(&key_of(item)) {
            script.push(EditOp::Insert {
                index,
                item: item.clone(),
            });
            working.insert(index, item.clone());
        }
    }

    // Same identity, changed content.
    for (index, item) in new.iter().enumerate() {
        if !content_eq(&working[index], item) {
            script.push(EditOp::Update {
                index,
                item: item.clone(),
            });
            working[index] = item.clone();
        }
    }

    script
}

/// Apply an edit script produced by [`diff_by_key`] to `old`.
///
/// Deterministically reproduces the `new` sequence the script was computed
/// against.
pub fn apply_edit_script<T: Clone>(old: &[T], script: &[EditOp<T>]) -> Vec<T> {
    let mut working: Vec<T> = old.to_vec();

    for op in script {
        match op {
            EditOp::Insert { index, item } => working.insert(*index, item.clone()),
            EditOp::Remove { index } => {
                working.remove(*index);
            }
            EditOp::Move { from, to } => {
                let item = working.remove(*from);
                working.insert(*to, item);
            }
            EditOp::Update { index, item } => working[*index] = item.clone(),
        }
    }

    working
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Entry {
        id: u32,
        text: &'static str,
    }

    fn entry(id: u32, text: &'static str) -> Entry {
        Entry { id, text }
    }

    fn diff(old: &[Entry], new: &[Entry]) -> Vec<EditOp<Entry>> {
        diff_by_key(old, new, |e| e.id, |a, b| a == b)
    }

    fn assert_replays(old: &[Entry], new: &[Entry]) {
        let script = diff(old, new);
        assert_eq!(apply_edit_script(old, &script), new, "script: {:?}", script);
    }

    #[test]
    fn test_identical_sequences_yield_empty_script() {
        let items = vec![entry(1, "a"), entry(2, "b"), entry(3, "c")];
        assert!(diff(&items, &items).is_empty());
    }

    #[test]
    fn test_pure_append() {
        let old = vec![entry(1, "a")];
        let new = vec![entry(1, "a"), entry(2, "b"), entry(3, "c")];

        let script = diff(&old, &new);
        assert_eq!(
            script,
            vec![
                EditOp::Insert { index: 1, item: entry(2, "b") },
                EditOp::Insert { index: 2, item: entry(3, "c") },
            ]
        );
        assert_replays(&old, &new);
    }

    #[test]
    fn test_pure_removal() {
        let old = vec![entry(1, "a"), entry(2, "b"), entry(3, "c")];
        let new = vec![entry(2, "b")];

        let script = diff(&old, &new);
        assert_eq!(
            script,
            vec![EditOp::Remove { index: 2 }, EditOp::Remove { index: 0 }]
        );
        assert_replays(&old, &new);
    }

    #[test]
    fn test_content_change_is_update_not_remove_insert() {
        let old = vec![entry(1, "a"), entry(2, "b")];
        let new = vec![entry(1, "a"), entry(2, "b (edited)")];

        let script = diff(&old, &new);
        assert_eq!(
            script,
            vec![EditOp::Update { index: 1, item: entry(2, "b (edited)") }]
        );
        assert_replays(&old, &new);
    }

    #[test]
    fn test_single_displacement_is_one_move() {
        let old = vec![entry(1, "a"), entry(2, "b"), entry(3, "c")];
        let new = vec![entry(3, "c"), entry(1, "a"), entry(2, "b")];

        let script = diff(&old, &new);
        assert_eq!(script, vec![EditOp::Move { from: 2, to: 0 }]);
        assert_replays(&old, &new);
    }

    #[test]
    fn test_reversal() {
        let old = vec![entry(1, "a"), entry(2, "b"), entry(3, "c"), entry(4, "d")];
        let new = vec![entry(4, "d"), entry(3, "c"), entry(2, "b"), entry(1, "a")];
        assert_replays(&old, &new);
    }

    #[test]
    fn test_mixed_insert_remove_move_update() {
        let old = vec![entry(1, "a"), entry(2, "b"), entry(3, "c"), entry(4, "d")];
        let new = vec![
            entry(5, "e"),
            entry(3, "c (edited)"),
            entry(1, "a"),
            entry(6, "f"),
        ];
        assert_replays(&old, &new);
    }

    #[test]
    fn test_from_empty_and_to_empty() {
        let items = vec![entry(1, "a"), entry(2, "b")];
        assert_replays(&[], &items);
        assert_replays(&items, &[]);
    }

    #[test]
    fn test_replaced_item_moves_to_end_like_a_refetch() {
        // An upserted story re-enters at the end of key order with new
        // content; the diff should express that as a move plus update.
        let old = vec![entry(1, "a"), entry(2, "b"), entry(3, "c")];
        let new = vec![entry(2, "b"), entry(3, "c"), entry(1, "a (edited)")];
        assert_replays(&old, &new);
    }

    #[test]
    fn test_many_scrambles_replay_exactly() {
        let old = vec![
            entry(1, "a"),
            entry(2, "b"),
            entry(3, "c"),
            entry(4, "d"),
            entry(5, "e"),
        ];
        let scrambles: Vec<Vec<Entry>> = vec![
            vec![entry(2, "b"), entry(4, "d"), entry(1, "a"), entry(5, "e")],
            vec![entry(5, "e"), entry(4, "d"), entry(6, "f"), entry(2, "b")],
            vec![entry(3, "c (edited)"), entry(1, "a"), entry(7, "g")],
            vec![entry(1, "a (edited)"), entry(5, "e (edited)")],
        ];

        for new in &scrambles {
            assert_replays(&old, new);
        }
    }
}
