//! Revision history: an append-only operation log with text checkpoints.
//!
//! The history is the unit of state each participant owns. It records every
//! operation in the order it was integrated, reconstructs the text at any
//! past revision by replaying from the nearest savepoint, and merges remote
//! batches that were computed against a stale base revision.
//!
//! The log is kept in the history's own *global frame*: each entry, replayed
//! in order against the globally-visible numbering, reproduces the exact
//! text evolution this history went through. Locally applied operations are
//! already in that frame (they are issued against the current head, where
//! the visible and global numberings coincide); merged remote operations are
//! recorded as the canonical change-ops their integration produced. This is
//! what makes savepoint replay, `text_for_rev`, and convergence agree.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::doc::{DocumentBuffer, Operation, REPLAY_BRANCH};
use crate::error::EngineError;
use crate::sync::{SyncRequest, SyncResponse};

/// A savepoint is taken once this many operations accumulate since the
/// previous one, bounding replay cost for text reconstruction.
pub const MIN_SAVEPOINT_RATE: usize = 20;

/// A full-text checkpoint at a given revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Savepoint {
    /// Log length at the time the checkpoint was taken.
    pub rev: usize,
    /// The globally-visible text at that revision.
    pub text: String,
}

/// An append-only operation log with periodic full-text savepoints.
///
/// Revision `r` denotes the state after `r` operations; revision 0 is the
/// initial text. Revisions only grow. A [`DocumentBuffer`] is rebuilt
/// transiently whenever text at some revision is needed; it is never
/// persisted independently of the log and savepoints.
///
/// A history instance assumes strictly serialized mutation (`&mut self`).
/// Share one across threads behind an exclusive-access boundary such as the
/// mutex the sync server uses; the algorithm itself needs no coordination
/// between *different* instances.
#[derive(Debug, Clone)]
pub struct RevisionHistory {
    name: String,
    operations: Vec<Operation>,
    savepoints: Vec<Savepoint>,
}

impl RevisionHistory {
    /// Creates a history for the participant `name`, starting from
    /// `initial_text` at revision 0.
    pub fn new(name: impl Into<String>, initial_text: &str) -> Self {
        RevisionHistory {
            name: name.into(),
            operations: Vec::new(),
            savepoints: vec![Savepoint {
                rev: 0,
                text: initial_text.to_string(),
            }],
        }
    }

    /// The branch identifier this history tags its own edits with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current revision: the number of operations in the log.
    pub fn current_rev(&self) -> usize {
        self.operations.len()
    }

    /// The recorded savepoints, oldest first.
    pub fn savepoints(&self) -> &[Savepoint] {
        &self.savepoints
    }

    /// The log slice from `rev` to the current head. Used by sync clients
    /// to collect the operations a server has not seen yet.
    pub fn operations_since(&self, rev: usize) -> Result<&[Operation], EngineError> {
        if rev > self.operations.len() {
            return Err(EngineError::RevisionOutOfRange {
                requested: rev,
                head: self.operations.len(),
            });
        }
        Ok(&self.operations[rev..])
    }

    /// Reconstructs the globally-visible text at `rev` by replaying the
    /// log from the nearest savepoint at or before it.
    ///
    /// Replay is tagged with the reserved [`REPLAY_BRANCH`] identifier:
    /// every logged entry is a global splice, so replay must not re-run
    /// tie-break decisions against real participant names.
    pub fn text_for_rev(&self, rev: usize) -> Result<String, EngineError> {
        if rev > self.operations.len() {
            return Err(EngineError::RevisionOutOfRange {
                requested: rev,
                head: self.operations.len(),
            });
        }
        let savepoint = self
            .savepoints
            .iter()
            .rev()
            .find(|s| s.rev <= rev)
            .ok_or(EngineError::MalformedSavepoints)?;
        let mut buffer = DocumentBuffer::from_text(&savepoint.text);
        for op in &self.operations[savepoint.rev..rev] {
            buffer.apply(op, REPLAY_BRANCH);
        }
        Ok(buffer.text())
    }

    /// The globally-visible text at the current head.
    pub fn text(&self) -> String {
        // The revision-0 savepoint seeded by `new` makes this infallible;
        // a failure here means the history is corrupted by a bug.
        self.text_for_rev(self.current_rev())
            .expect("revision history savepoints corrupted")
    }

    /// Applies local edits issued by this history's own branch against the
    /// current head. Returns the pending log slice, which is empty for a
    /// local apply (the base *is* the head).
    pub fn apply(&mut self, ops: &[Operation]) -> Result<Vec<Operation>, EngineError> {
        let name = self.name.clone();
        self.apply_as(ops, &name)
    }

    /// Applies edits issued by an arbitrary branch against the current
    /// head. The original operations enter the log verbatim: at the head,
    /// the issuing branch's visible numbering and the global numbering
    /// coincide, so they already describe global splices.
    pub fn apply_as(&mut self, ops: &[Operation], branch: &str) -> Result<Vec<Operation>, EngineError> {
        let base_rev = self.current_rev();
        let (mut buffer, pending) = self.rebuild_at(base_rev)?;
        for op in ops {
            buffer.apply(op, branch);
        }
        self.operations
            .extend(ops.iter().filter(|op| !op.is_noop()).cloned());
        self.maybe_savepoint()?;
        Ok(pending)
    }

    /// Merges a batch of remote edits computed against a stale base
    /// revision.
    ///
    /// The buffer is rebuilt at `base_rev` and caught up to the current
    /// head under this history's own identity, which re-establishes the
    /// tie-break context; the remote operations are then applied under
    /// their true branch name, which transparently re-targets positions
    /// around everything that happened since `base_rev`. The canonical
    /// change-ops of that application are appended to the log.
    ///
    /// The response carries the raw log slice from `base_rev` to the head
    /// *before* the append (exactly the operations the remote side is
    /// missing) plus the new head revision.
    pub fn merge(&mut self, request: &SyncRequest) -> Result<SyncResponse, EngineError> {
        if request.branch_name == REPLAY_BRANCH {
            return Err(EngineError::ReservedBranch(request.branch_name.clone()));
        }
        let (mut buffer, missing) = self.rebuild_at(request.base_rev)?;
        debug!(
            branch = %request.branch_name,
            base_rev = request.base_rev,
            head = self.current_rev(),
            incoming = request.operations.len(),
            "merging remote batch"
        );
        for op in &request.operations {
            let change_ops = buffer.apply(op, &request.branch_name);
            self.operations
                .extend(change_ops.into_iter().filter(|c| !c.is_noop()));
        }
        self.maybe_savepoint()?;
        Ok(SyncResponse {
            operations: missing,
            revision: self.current_rev(),
        })
    }

    /// Replays the full log from the revision-0 savepoint and checks every
    /// recorded savepoint against it. A mismatch means the engine corrupted
    /// its own state; callers should treat that as fatal, never correct it.
    pub fn check_savepoints(&self) -> Result<(), EngineError> {
        let first = self
            .savepoints
            .first()
            .ok_or(EngineError::MalformedSavepoints)?;
        if first.rev != 0 {
            return Err(EngineError::MalformedSavepoints);
        }
        let mut buffer = DocumentBuffer::from_text(&first.text);
        let mut replayed = 0;
        for savepoint in &self.savepoints {
            for op in &self.operations[replayed..savepoint.rev] {
                buffer.apply(op, REPLAY_BRANCH);
            }
            replayed = savepoint.rev;
            if buffer.text() != savepoint.text {
                return Err(EngineError::SavepointMismatch { rev: savepoint.rev });
            }
        }
        Ok(())
    }

    /// Rebuilds a buffer at `base_rev` and replays everything after it
    /// under this history's own identity, so that the branch applied next
    /// sees exactly the text it knew at `base_rev`. Also returns the
    /// replayed slice, which is what a remote at `base_rev` is missing.
    ///
    /// Rejects stale bases before any mutation.
    fn rebuild_at(&self, base_rev: usize) -> Result<(DocumentBuffer, Vec<Operation>), EngineError> {
        if base_rev > self.operations.len() {
            return Err(EngineError::StaleMergeBase {
                base_rev,
                head: self.operations.len(),
            });
        }
        let base_text = self.text_for_rev(base_rev)?;
        let mut buffer = DocumentBuffer::from_text(&base_text);
        let pending = self.operations[base_rev..].to_vec();
        for op in &pending {
            buffer.apply(op, &self.name);
        }
        Ok((buffer, pending))
    }

    /// Takes a savepoint once enough operations have accumulated since the
    /// last one.
    fn maybe_savepoint(&mut self) -> Result<(), EngineError> {
        let head = self.current_rev();
        let last = self
            .savepoints
            .last()
            .ok_or(EngineError::MalformedSavepoints)?;
        if head - last.rev >= MIN_SAVEPOINT_RATE {
            let text = self.text_for_rev(head)?;
            debug!(rev = head, "recording savepoint");
            self.savepoints.push(Savepoint { rev: head, text });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_history_seeds_revision_zero() {
        let history = RevisionHistory::new("me", "hello");
        assert_eq!(history.current_rev(), 0);
        assert_eq!(history.text(), "hello");
        assert_eq!(history.savepoints().len(), 1);
        assert_eq!(history.savepoints()[0].rev, 0);
        assert_eq!(history.savepoints()[0].text, "hello");
    }

    #[test]
    fn test_local_apply_advances_revision() {
        let mut history = RevisionHistory::new("me", "world");
        let pending = history.apply(&[Operation::insert(0, "hello ")]).unwrap();
        assert!(pending.is_empty());
        assert_eq!(history.current_rev(), 1);
        assert_eq!(history.text(), "hello world");
    }

    #[test]
    fn test_noop_operations_do_not_enter_the_log() {
        let mut history = RevisionHistory::new("me", "abc");
        history.apply(&[Operation::new(0, 0, "")]).unwrap();
        assert_eq!(history.current_rev(), 0);
        assert_eq!(history.text(), "abc");
    }

    #[test]
    fn test_text_for_rev_walks_history() {
        let mut history = RevisionHistory::new("me", "");
        history.apply(&[Operation::insert(0, "a")]).unwrap();
        history.apply(&[Operation::insert(1, "b")]).unwrap();
        history.apply(&[Operation::insert(2, "c")]).unwrap();

        assert_eq!(history.text_for_rev(0).unwrap(), "");
        assert_eq!(history.text_for_rev(1).unwrap(), "a");
        assert_eq!(history.text_for_rev(2).unwrap(), "ab");
        assert_eq!(history.text_for_rev(3).unwrap(), "abc");
        assert_eq!(
            history.text_for_rev(4),
            Err(EngineError::RevisionOutOfRange { requested: 4, head: 3 })
        );
    }

    #[test]
    fn test_savepoint_taken_at_rate() {
        let mut history = RevisionHistory::new("me", "");
        for i in 0..MIN_SAVEPOINT_RATE + 5 {
            history.apply(&[Operation::insert(i, "x")]).unwrap();
        }
        assert_eq!(history.savepoints().len(), 2);
        assert_eq!(history.savepoints()[1].rev, MIN_SAVEPOINT_RATE);
        assert_eq!(history.savepoints()[1].text.len(), MIN_SAVEPOINT_RATE);
        history.check_savepoints().unwrap();
    }

    #[test]
    fn test_merge_rejects_stale_base_without_mutation() {
        let mut history = RevisionHistory::new("server", "abc");
        let request = SyncRequest {
            base_rev: 3,
            operations: vec![Operation::insert(0, "x")],
            branch_name: "client".to_string(),
        };
        let result = history.merge(&request);
        assert_eq!(
            result,
            Err(EngineError::StaleMergeBase { base_rev: 3, head: 0 })
        );
        assert_eq!(history.current_rev(), 0);
        assert_eq!(history.text(), "abc");
    }

    #[test]
    fn test_merge_rejects_reserved_branch() {
        let mut history = RevisionHistory::new("server", "abc");
        let request = SyncRequest {
            base_rev: 0,
            operations: vec![],
            branch_name: REPLAY_BRANCH.to_string(),
        };
        assert!(matches!(
            history.merge(&request),
            Err(EngineError::ReservedBranch(_))
        ));
    }

    #[test]
    fn test_merge_returns_missing_slice_and_new_head() {
        let mut history = RevisionHistory::new("server", "initial");
        history.apply(&[Operation::insert(0, "The ")]).unwrap();

        let request = SyncRequest {
            base_rev: 0,
            operations: vec![Operation::insert(0, "An ")],
            branch_name: "client".to_string(),
        };
        let response = history.merge(&request).unwrap();
        assert_eq!(response.operations, vec![Operation::insert(0, "The ")]);
        assert_eq!(response.revision, 2);
        // "client" < "server": the client's insert sorts first.
        assert_eq!(history.text(), "An The initial");
    }

    #[test]
    fn test_round_trip() {
        let mut history = RevisionHistory::new("me", "seed");
        history.apply(&[Operation::new(0, 4, "grown")]).unwrap();
        assert_eq!(
            history.text_for_rev(history.current_rev()).unwrap(),
            history.text()
        );
    }
}
