//! Thin synchronization endpoints over a revision history.
//!
//! These wrappers contain no algorithmic machinery of their own: a server
//! forwards merge requests to its history, and a client tracks the last
//! synchronized revisions and exchanges operation batches. Convergence is
//! achieved entirely by the history's merge algorithm; transport, retries
//! and backpressure belong to the host application.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::doc::Operation;
use crate::error::EngineError;
use crate::history::RevisionHistory;

/// A batch of edits pushed to a server, computed against `base_rev`, the
/// last server revision the sender has seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    /// The server revision the sender's view was based on.
    pub base_rev: usize,
    /// The sender's edits since that revision, in issue order.
    pub operations: Vec<Operation>,
    /// The sender's branch identifier.
    pub branch_name: String,
}

/// The server's answer to a [`SyncRequest`]: the log entries the sender is
/// missing and the server's new head revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    /// Verbatim log entries from `base_rev` to the pre-merge head.
    pub operations: Vec<Operation>,
    /// The server's head revision after the merge.
    pub revision: usize,
}

/// Server-side endpoint: one shared history behind an exclusive-access
/// boundary, so several clients can sync against it from different threads.
#[derive(Clone)]
pub struct SyncServer {
    name: String,
    history: Arc<Mutex<RevisionHistory>>,
}

impl SyncServer {
    /// Creates a server named `name` starting from `initial_text`.
    pub fn new(name: impl Into<String>, initial_text: &str) -> Self {
        let name = name.into();
        SyncServer {
            history: Arc::new(Mutex::new(RevisionHistory::new(name.clone(), initial_text))),
            name,
        }
    }

    /// The server's branch identifier.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle to the underlying history, for server-side edits.
    pub fn history(&self) -> Arc<Mutex<RevisionHistory>> {
        Arc::clone(&self.history)
    }

    /// Applies an edit on the server's own branch.
    pub fn edit(&self, op: Operation) -> Result<(), EngineError> {
        self.history.lock().apply(&[op])?;
        Ok(())
    }

    /// Merges a client batch and answers with the operations the client is
    /// missing.
    pub fn handle(&self, request: &SyncRequest) -> Result<SyncResponse, EngineError> {
        let mut history = self.history.lock();
        let response = history.merge(request)?;
        info!(
            client = %request.branch_name,
            received = request.operations.len(),
            returned = response.operations.len(),
            revision = response.revision,
            "handled sync request"
        );
        Ok(response)
    }

    /// The server's current text.
    pub fn text(&self) -> String {
        self.history.lock().text()
    }
}

/// Client-side endpoint: owns its history and remembers how far it has
/// synchronized, both in the server's numbering (`server_rev`) and in its
/// own (`synced_rev`).
#[derive(Debug)]
pub struct SyncClient {
    history: RevisionHistory,
    server_rev: usize,
    synced_rev: usize,
}

impl SyncClient {
    /// Creates a client named `name` starting from the same `initial_text`
    /// as the server it will sync with.
    pub fn new(name: impl Into<String>, initial_text: &str) -> Self {
        SyncClient {
            history: RevisionHistory::new(name, initial_text),
            server_rev: 0,
            synced_rev: 0,
        }
    }

    /// The client's branch identifier.
    pub fn name(&self) -> &str {
        self.history.name()
    }

    /// The client's current text.
    pub fn text(&self) -> String {
        self.history.text()
    }

    /// The client's revision history.
    pub fn history(&self) -> &RevisionHistory {
        &self.history
    }

    /// Applies a local edit, visible immediately in [`SyncClient::text`]
    /// and shipped to the server on the next [`SyncClient::sync`].
    pub fn edit(&mut self, op: Operation) -> Result<(), EngineError> {
        self.history.apply(&[op])?;
        Ok(())
    }

    /// One full exchange: push local edits accumulated since the last
    /// sync, then merge the operations the server had that this client had
    /// not seen. Afterwards client and server hold identical text.
    pub fn sync(&mut self, server: &SyncServer) -> Result<(), EngineError> {
        let operations = self.history.operations_since(self.synced_rev)?.to_vec();
        let request = SyncRequest {
            base_rev: self.server_rev,
            operations,
            branch_name: self.history.name().to_string(),
        };
        let response = server.handle(&request)?;

        self.history.merge(&SyncRequest {
            base_rev: self.synced_rev,
            operations: response.operations,
            branch_name: server.name().to_string(),
        })?;

        self.server_rev = response.revision;
        self.synced_rev = self.history.current_rev();
        Ok(())
    }
}
