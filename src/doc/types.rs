//! Fundamental type definitions for the document engine.
//!
//! This module contains the branch identifier type, the reserved replay
//! identifier, and the positional `Operation` value that crosses the
//! engine boundary.

use serde::{Deserialize, Serialize};

/// A unique identifier for each branch (collaborator) in the system.
///
/// Each participant in the collaborative editing session carries a distinct
/// name. The lexicographic order over these names is the fixed total order
/// used to tie-break concurrent inserts, so every participant must use the
/// same names consistently.
pub type BranchId = String;

/// Reserved branch identifier used when replaying the operation log.
///
/// The leading character comes from Unicode's "Miscellaneous Technical"
/// block so it can never collide with a participant name typed by a user.
/// Replay must not re-run tie-break decisions against real participants;
/// tagging every replayed operation with this single identifier turns the
/// log back into a plain sequence of global splices.
pub const REPLAY_BRANCH: &str = "\u{2388}replay";

/// A positional edit: delete `num_deleted` characters starting at the
/// branch-visible position `from`, then insert `content` at that position.
///
/// Positions count characters as the issuing branch currently sees them,
/// not bytes. `num_deleted == 0` is a pure insert and an empty `content`
/// is a pure delete. Operations are immutable values; the buffer clamps
/// out-of-range positions instead of rejecting them, since concurrent
/// edits routinely make a request stale by the time it is processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Branch-visible character position the edit starts at.
    pub from: usize,
    /// Number of visible characters to delete at `from`.
    pub num_deleted: usize,
    /// Text inserted at `from` after the deletion.
    pub content: String,
}

impl Operation {
    /// Creates an operation that deletes and inserts in one step.
    pub fn new(from: usize, num_deleted: usize, content: impl Into<String>) -> Self {
        Operation {
            from,
            num_deleted,
            content: content.into(),
        }
    }

    /// Creates a pure insert at `from`.
    pub fn insert(from: usize, content: impl Into<String>) -> Self {
        Operation::new(from, 0, content)
    }

    /// Creates a pure delete of `num_deleted` characters at `from`.
    pub fn delete(from: usize, num_deleted: usize) -> Self {
        Operation::new(from, num_deleted, "")
    }

    /// True if the operation neither deletes nor inserts anything.
    pub fn is_noop(&self) -> bool {
        self.num_deleted == 0 && self.content.is_empty()
    }

    /// Number of characters the operation inserts.
    pub fn inserted_len(&self) -> usize {
        self.content.chars().count()
    }
}
