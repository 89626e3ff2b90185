//! Per-character provenance state.
//!
//! Each character in the document buffer remembers which branch inserted it
//! and which branches have deleted it. These two facts are all the engine
//! needs to map branch-relative positions, tie-break concurrent inserts,
//! and compose concurrent deletes losslessly.

use std::collections::BTreeSet;

use crate::doc::types::BranchId;

/// A single character together with its provenance.
///
/// `inserted_by == None` marks a character that belongs to the document's
/// base text and predates branch tracking; insertion provenance never
/// changes once set. `deleted_by` is strictly monotonic: branches are
/// added, never removed, and several branches may independently delete the
/// same character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharState {
    value: char,
    inserted_by: Option<BranchId>,
    deleted_by: BTreeSet<BranchId>,
}

impl CharState {
    /// Creates a base-text character with no insertion provenance.
    pub fn base(value: char) -> Self {
        CharState {
            value,
            inserted_by: None,
            deleted_by: BTreeSet::new(),
        }
    }

    /// Creates a character inserted by `branch`.
    pub fn inserted(value: char, branch: &str) -> Self {
        CharState {
            value,
            inserted_by: Some(branch.to_string()),
            deleted_by: BTreeSet::new(),
        }
    }

    /// The character value.
    pub fn value(&self) -> char {
        self.value
    }

    /// The branch that inserted this character, if any.
    pub fn inserted_by(&self) -> Option<&str> {
        self.inserted_by.as_deref()
    }

    /// True if `branch` has deleted this character.
    pub fn is_deleted_by(&self, branch: &str) -> bool {
        self.deleted_by.contains(branch)
    }

    /// True if some branch other than `branch` inserted this character.
    pub fn is_inserted_by_other(&self, branch: &str) -> bool {
        matches!(self.inserted_by.as_deref(), Some(b) if b != branch)
    }

    /// True if `branch` currently sees this character: not deleted by the
    /// branch and not inserted by a different branch.
    pub fn is_visible_to(&self, branch: &str) -> bool {
        !self.is_deleted_by(branch) && !self.is_inserted_by_other(branch)
    }

    /// True if no branch has deleted this character. Globally visible
    /// characters are the ones that appear in materialized text.
    pub fn is_globally_visible(&self) -> bool {
        self.deleted_by.is_empty()
    }

    /// Tie-break rule for concurrent inserts: `branch`'s insertion point
    /// advances past characters inserted by branches whose identifier
    /// sorts before it in the fixed total order.
    pub fn tie_break_advance(&self, branch: &str) -> bool {
        matches!(self.inserted_by.as_deref(), Some(b) if b < branch)
    }

    /// Marks this character deleted by `branch`. Idempotent: deleting the
    /// same character twice from the same branch changes nothing.
    pub fn mark_deleted(&mut self, branch: &str) {
        self.deleted_by.insert(branch.to_string());
    }
}
