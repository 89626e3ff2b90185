//! Error types for the revision history and sync endpoints.
//!
//! Out-of-range *positions inside operations* are never errors: the buffer
//! clamps them, because concurrent edits routinely make a request's view
//! stale. The variants here cover malformed requests, which are rejected
//! before any mutation, and internal consistency violations, which signal
//! an algorithmic bug rather than a user-facing failure.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A revision beyond the current head was requested.
    #[error("revision {requested} is beyond the current head {head}")]
    RevisionOutOfRange { requested: usize, head: usize },

    /// A merge request claimed a base revision the history has not reached.
    #[error("merge base revision {base_rev} is ahead of the current head {head}")]
    StaleMergeBase { base_rev: usize, head: usize },

    /// A participant tried to use the identifier reserved for log replay.
    #[error("branch name {0:?} is reserved for internal replay")]
    ReservedBranch(String),

    /// A recorded savepoint's text does not match the replayed log.
    /// Fatal: the history is corrupted by an implementation bug.
    #[error("savepoint at revision {rev} does not match the replayed log")]
    SavepointMismatch { rev: usize },

    /// The savepoint list is missing its revision-0 entry.
    /// Fatal: the history is corrupted by an implementation bug.
    #[error("savepoint list must start with a revision 0 entry")]
    MalformedSavepoints,
}
