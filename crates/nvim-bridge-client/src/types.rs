//! Values produced by bridge operations.
//!
//! Everything here is built fresh for one call and dropped after the response.
//! Constructors enforce the shape invariants: a snapshot is either fully
//! populated or an error placeholder, and an operation result carries an
//! error exactly when it failed.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::session::SessionError;

/// A running Neovim reachable through a socket. Identity is `id` (the pid).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instance {
    pub socket_path: PathBuf,
    pub id: u32,
}

impl Instance {
    /// Placeholder for an id that did not resolve to a socket.
    pub fn unresolved(id: u32) -> Self {
        Self {
            socket_path: PathBuf::new(),
            id,
        }
    }
}

/// 1-based cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CursorPosition {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BufferInfo {
    pub id: i64,
    pub name: String,
    pub loaded: bool,
    pub current: bool,
}

/// Display label for a buffer with no file name.
pub fn unnamed_buffer_label(id: i64) -> String {
    format!("[No Name #{id}]")
}

/// State read from an instance in one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceState {
    pub working_directory: String,
    pub current_file: String,
    pub buffers: Vec<BufferInfo>,
    pub cursor_position: CursorPosition,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum SnapshotBody {
    Ready(InstanceState),
    Failed { error: OperationError },
}

/// Point-in-time view of an instance, or the reason it could not be taken.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceSnapshot {
    pub instance: Instance,
    #[serde(flatten)]
    body: SnapshotBody,
}

impl InstanceSnapshot {
    pub fn ready(instance: Instance, state: InstanceState) -> Self {
        Self {
            instance,
            body: SnapshotBody::Ready(state),
        }
    }

    pub fn failed(instance: Instance, error: OperationError) -> Self {
        Self {
            instance,
            body: SnapshotBody::Failed { error },
        }
    }

    pub fn state(&self) -> Option<&InstanceState> {
        match &self.body {
            SnapshotBody::Ready(state) => Some(state),
            SnapshotBody::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&OperationError> {
        match &self.body {
            SnapshotBody::Ready(_) => None,
            SnapshotBody::Failed { error } => Some(error),
        }
    }
}

// ============================================================================
// Errors surfaced in results
// ============================================================================

/// Which tier an operation failed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Arguments rejected before any lookup.
    InvalidRequest,
    /// No live socket for the requested id.
    NotFound,
    /// The socket exists but could not be connected to.
    ConnectFailure,
    /// Connected, then a call failed mid-sequence.
    TransportFailure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationError {
    pub kind: ErrorKind,
    pub message: String,
}

impl OperationError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::InvalidRequest,
            message: message.into(),
        }
    }

    pub fn not_found(id: u32) -> Self {
        Self {
            kind: ErrorKind::NotFound,
            message: format!("Neovim instance with PID {id} not found"),
        }
    }

    /// Classify a session failure for instance `id`.
    pub fn from_session(id: u32, err: &SessionError) -> Self {
        match err {
            SessionError::Connect(e) => Self {
                kind: ErrorKind::ConnectFailure,
                message: format!("Failed to connect to Neovim instance {id}: {e}"),
            },
            SessionError::Rpc(e) => Self {
                kind: ErrorKind::TransportFailure,
                message: format!("RPC error on Neovim instance {id}: {e}"),
            },
        }
    }
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

// ============================================================================
// Operation results
// ============================================================================

/// Outcome of navigate/execute, with operation-specific echo fields.
#[derive(Debug, Clone, Serialize)]
pub struct OperationResult<D> {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<OperationError>,
    #[serde(flatten)]
    details: D,
}

impl<D> OperationResult<D> {
    pub fn ok(message: impl Into<String>, details: D) -> Self {
        Self {
            success: true,
            message: message.into(),
            error: None,
            details,
        }
    }

    pub fn failed(error: OperationError, details: D) -> Self {
        Self {
            success: false,
            message: error.message.clone(),
            error: Some(error),
            details,
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn error(&self) -> Option<&OperationError> {
        self.error.as_ref()
    }

    pub fn details(&self) -> &D {
        &self.details
    }
}

/// Echo fields of a navigate call, with column defaults applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigateDetails {
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_column: Option<u32>,
}

/// Echo fields of an execute call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecuteDetails {
    pub command: String,
    pub is_key_sequence: bool,
    /// Trimmed command output, or the editor's rejection text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// The editor rejected the command (failed search, unknown command, ...).
    pub rejected: bool,
}

pub type NavigateResult = OperationResult<NavigateDetails>;
pub type ExecuteResult = OperationResult<ExecuteDetails>;
