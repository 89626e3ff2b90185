//! The tombstoned document buffer and its apply algorithm.
//!
//! The buffer holds the full edit history as one ordered sequence of
//! characters with provenance. Deletion never shrinks the sequence; it only
//! tombstones characters, which keeps every branch's positional frame of
//! reference intact. Applying a branch-relative operation resolves it to
//! absolute buffer positions, mutates the buffer, and reports the change in
//! the globally-visible numbering.

use crate::doc::char_state::CharState;
use crate::doc::types::Operation;

/// An ordered sequence of characters with per-branch provenance.
///
/// # Design
///
/// - Positions inside operations are branch-relative character counts;
///   `visible_to_absolute` maps them onto the shared buffer.
/// - Concurrent inserts at the same point are ordered by branch identifier
///   (`tie_break_resolve`), so all participants arrive at the same
///   left-to-right arrangement regardless of delivery order.
/// - Deletion is tombstoning: characters stay in place and materialized
///   text simply skips them.
///
/// The scans are linear in buffer length. An order-statistics structure
/// could replace them without changing observable behavior; plain linear
/// walks are fine for the document sizes this engine targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentBuffer {
    chars: Vec<CharState>,
}

impl DocumentBuffer {
    /// Creates a buffer from plain text. All characters become base text
    /// with no insertion provenance.
    pub fn from_text(text: &str) -> Self {
        DocumentBuffer {
            chars: text.chars().map(CharState::base).collect(),
        }
    }

    /// Materializes the globally-visible text, skipping every character
    /// any branch has deleted.
    pub fn text(&self) -> String {
        self.chars
            .iter()
            .filter(|c| c.is_globally_visible())
            .map(CharState::value)
            .collect()
    }

    /// Materializes the text as `branch` currently sees it.
    pub fn text_for_branch(&self, branch: &str) -> String {
        self.chars
            .iter()
            .filter(|c| c.is_visible_to(branch))
            .map(CharState::value)
            .collect()
    }

    /// Total number of characters in the buffer, tombstones included.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// True if the buffer holds no characters at all.
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Number of globally-visible characters.
    pub fn visible_len(&self) -> usize {
        self.chars.iter().filter(|c| c.is_globally_visible()).count()
    }

    /// Maps position `pos` in what `branch` currently sees onto an
    /// absolute buffer index: the earliest index preceded by exactly `pos`
    /// characters visible to the branch. Landing at the *head* of any
    /// invisible run matters: it is the starting point the tie-break pass
    /// walks from. Positions past the visible end clamp to the buffer
    /// length (append at end).
    fn visible_to_absolute(&self, pos: usize, branch: &str) -> usize {
        let mut visible = 0;
        for (idx, ch) in self.chars.iter().enumerate() {
            if visible == pos {
                return idx;
            }
            if ch.is_visible_to(branch) {
                visible += 1;
            }
        }
        self.chars.len()
    }

    /// Advances `start_abs` past the contiguous run of characters inserted
    /// by branches that sort before `branch`. This is what makes concurrent
    /// inserts at the same logical position land in the same order on every
    /// participant: placement depends only on the inserting identifiers and
    /// the fixed total order, never on arrival order.
    fn tie_break_resolve(&self, start_abs: usize, branch: &str) -> usize {
        let mut idx = start_abs;
        while idx < self.chars.len() && self.chars[idx].tie_break_advance(branch) {
            idx += 1;
        }
        idx
    }

    /// Tombstones `num_deleted` characters visible to `branch` starting at
    /// `from_abs` and returns the canonical list of operations describing
    /// the buffer's global change: minimal contiguous delete ranges in the
    /// globally-visible numbering, followed by the companion insert.
    ///
    /// Characters already invisible to `branch` are walked over without
    /// counting against `num_deleted`. Only characters whose *global*
    /// visibility flips contribute delete ranges; each range's `from` is
    /// adjusted for the ranges emitted before it, so a consumer can apply
    /// the list sequentially against a progressively shrinking text.
    fn mark_deleted(
        &mut self,
        branch: &str,
        from_abs: usize,
        num_deleted: usize,
        content: &str,
    ) -> Vec<Operation> {
        let from_visible = self.chars[..from_abs]
            .iter()
            .filter(|c| c.is_globally_visible())
            .count();

        // Indices of flipped characters, in the pre-call global numbering.
        let mut flipped = Vec::new();
        let mut global_idx = from_visible;
        let mut remaining = num_deleted;
        let mut idx = from_abs;
        while remaining > 0 && idx < self.chars.len() {
            let ch = &mut self.chars[idx];
            if ch.is_visible_to(branch) {
                let was_global = ch.is_globally_visible();
                ch.mark_deleted(branch);
                if was_global {
                    flipped.push(global_idx);
                    global_idx += 1;
                }
                remaining -= 1;
            } else if ch.is_globally_visible() {
                global_idx += 1;
            }
            idx += 1;
        }

        // Run-length-encode the flipped indices into delete ranges,
        // shifting each range by the characters removed before it.
        let mut ops = Vec::new();
        let mut shift = 0;
        let mut run: Option<(usize, usize)> = None;
        for index in flipped {
            match run {
                Some((start, len)) if start + len == index => {
                    run = Some((start, len + 1));
                }
                Some((start, len)) => {
                    ops.push(Operation::delete(start - shift, len));
                    shift += len;
                    run = Some((index, 1));
                }
                None => {
                    run = Some((index, 1));
                }
            }
        }
        if let Some((start, len)) = run {
            ops.push(Operation::delete(start - shift, len));
        }

        ops.push(Operation::insert(from_visible, content));
        ops
    }

    /// Applies a branch-relative operation and returns the operations that
    /// describe the resulting change in the globally-visible numbering.
    ///
    /// Never fails: positions beyond the branch's visible text clamp to the
    /// end of the buffer, and deletions stop at the buffer end if they run
    /// out of characters.
    pub fn apply(&mut self, op: &Operation, branch: &str) -> Vec<Operation> {
        let from_abs = self.visible_to_absolute(op.from, branch);
        let insert_abs = self.tie_break_resolve(from_abs, branch);

        // Deletion scanning starts at the tie-break-resolved point, so a
        // delete never consumes characters placed after this branch's edit
        // point by the ordering rule.
        let change_ops = self.mark_deleted(branch, insert_abs, op.num_deleted, &op.content);

        let new_chars: Vec<CharState> = op
            .content
            .chars()
            .map(|c| CharState::inserted(c, branch))
            .collect();
        self.chars.splice(insert_abs..insert_abs, new_chars);

        change_ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text_round_trip() {
        let buffer = DocumentBuffer::from_text("hello");
        assert_eq!(buffer.text(), "hello");
        assert_eq!(buffer.len(), 5);
        assert_eq!(buffer.visible_len(), 5);
    }

    #[test]
    fn test_insert_and_delete() {
        let mut buffer = DocumentBuffer::from_text("world");
        buffer.apply(&Operation::insert(0, "hello "), "me");
        assert_eq!(buffer.text(), "hello world");

        buffer.apply(&Operation::delete(6, 5), "me");
        assert_eq!(buffer.text(), "hello ");
        // Tombstones keep the buffer length.
        assert_eq!(buffer.len(), 11);
        assert_eq!(buffer.visible_len(), 6);
    }

    #[test]
    fn test_deleted_chars_stay_visible_to_other_branches() {
        let mut buffer = DocumentBuffer::from_text("abc");
        buffer.apply(&Operation::delete(1, 1), "a");
        assert_eq!(buffer.text(), "ac");
        assert_eq!(buffer.text_for_branch("a"), "ac");
        // Branch "b" never deleted 'b' and still sees it.
        assert_eq!(buffer.text_for_branch("b"), "abc");
    }

    #[test]
    fn test_tie_break_orders_concurrent_inserts() {
        // Both branches insert at visible position 0 of "x"; the branch
        // that sorts first ends up first, in either application order.
        let mut left = DocumentBuffer::from_text("x");
        left.apply(&Operation::insert(0, "A"), "a");
        left.apply(&Operation::insert(0, "B"), "b");
        assert_eq!(left.text(), "ABx");

        let mut right = DocumentBuffer::from_text("x");
        right.apply(&Operation::insert(0, "B"), "b");
        right.apply(&Operation::insert(0, "A"), "a");
        assert_eq!(right.text(), "ABx");
    }

    #[test]
    fn test_clamping_past_visible_end() {
        let mut buffer = DocumentBuffer::from_text("abc");
        let change = buffer.apply(&Operation::insert(100, "X"), "me");
        assert_eq!(buffer.text(), "abcX");
        assert_eq!(change, vec![Operation::insert(3, "X")]);

        let mut buffer = DocumentBuffer::from_text("abc");
        buffer.apply(&Operation::delete(1, 100), "me");
        assert_eq!(buffer.text(), "a");
    }

    #[test]
    fn test_change_ops_for_plain_edit() {
        let mut buffer = DocumentBuffer::from_text("abcd");
        let change = buffer.apply(&Operation::new(1, 2, "XY"), "me");
        assert_eq!(buffer.text(), "aXYd");
        assert_eq!(
            change,
            vec![Operation::delete(1, 2), Operation::insert(1, "XY")]
        );
    }

    #[test]
    fn test_change_ops_split_around_foreign_inserts() {
        // "me" deletes a range that spans a character it cannot see
        // ('X' inserted by "other" is invisible to "me" but globally
        // visible): the global effect splits into two delete ranges.
        let mut buffer = DocumentBuffer::from_text("abcd");
        buffer.apply(&Operation::insert(2, "X"), "other");
        assert_eq!(buffer.text(), "abXcd");

        let change = buffer.apply(&Operation::delete(1, 2), "me");
        assert_eq!(buffer.text(), "aXd");
        assert_eq!(
            change,
            vec![
                Operation::delete(1, 1),
                Operation::delete(2, 1),
                Operation::insert(1, ""),
            ]
        );
    }

    #[test]
    fn test_delete_consumes_chars_tombstoned_by_others() {
        // A character deleted by someone else is still visible to this
        // branch, so it counts against num_deleted; its global visibility
        // already flipped, so it produces no delete range.
        let mut buffer = DocumentBuffer::from_text("abcd");
        buffer.apply(&Operation::delete(1, 1), "other"); // tombstone 'b' for "other"
        assert_eq!(buffer.text(), "acd");

        // "me" still sees "abcd" and deletes what it sees as b..c.
        let change = buffer.apply(&Operation::delete(1, 2), "me");
        assert_eq!(buffer.text(), "ad");
        assert_eq!(buffer.text_for_branch("me"), "ad");
        // Only 'c' flipped globally; 'b' was already gone from global text.
        assert_eq!(
            change,
            vec![Operation::delete(1, 1), Operation::insert(1, "")]
        );
    }

    #[test]
    fn test_unicode_positions_are_char_counts() {
        let mut buffer = DocumentBuffer::from_text("héllo");
        buffer.apply(&Operation::new(1, 1, "🦀"), "me");
        assert_eq!(buffer.text(), "h🦀llo");
    }

    #[test]
    fn test_apply_reports_global_positions_not_branch_positions() {
        let mut buffer = DocumentBuffer::from_text("abcd");
        // "other" tombstones 'a' for itself; globally it is gone.
        buffer.apply(&Operation::delete(0, 1), "other");
        assert_eq!(buffer.text(), "bcd");

        // "me" still sees "abcd", so its position 2 is 'c', but the
        // reported change is in the global numbering, where 'c' is at 1.
        let change = buffer.apply(&Operation::insert(2, "Z"), "me");
        assert_eq!(buffer.text(), "bZcd");
        assert_eq!(change, vec![Operation::insert(1, "Z")]);
    }
}
