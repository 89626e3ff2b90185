//! Tombstone document buffer.
//!
//! This module contains the per-character provenance state, the positional
//! operation value, and the buffer whose apply algorithm turns
//! branch-relative edits into convergent global changes.

pub mod buffer;
pub mod char_state;
pub mod types;

// Re-export the main public API
pub use buffer::DocumentBuffer;
pub use char_state::CharState;
pub use types::{BranchId, Operation, REPLAY_BRANCH};
