//! # crdt-doc: convergent collaborative text editing
//!
//! A tombstone-buffer document engine for collaborative editing: multiple
//! independent branches (clients, servers) issue positional edits against
//! their own view of a shared text and converge to identical content after
//! exchanging edits in arbitrary order, with no central lock and no
//! turn-taking.
//!
//! ## Features
//!
//! - **Conflict-free**: concurrent edits merge in any delivery order
//! - **Tombstone-based deletion**: deleted characters are retained with
//!   per-branch provenance, so stale positions stay resolvable
//! - **Deterministic tie-breaking**: concurrent inserts at the same point
//!   are ordered by branch identifier, identically on every participant
//! - **Revision history**: an append-only operation log with periodic
//!   full-text savepoints bounds the cost of reconstructing old revisions
//!
//! ## Example
//!
//! ```rust
//! use crdt_doc::{Operation, RevisionHistory};
//!
//! let mut history = RevisionHistory::new("me", "world");
//! history.apply(&[Operation::insert(0, "hello ")]).unwrap();
//! assert_eq!(history.text(), "hello world");
//! ```

pub mod doc;
pub mod error;
pub mod history;
pub mod sync;

// Re-export the main public API
pub use doc::{BranchId, CharState, DocumentBuffer, Operation, REPLAY_BRANCH};
pub use error::EngineError;
pub use history::{MIN_SAVEPOINT_RATE, RevisionHistory, Savepoint};
pub use sync::{SyncClient, SyncRequest, SyncResponse, SyncServer};
