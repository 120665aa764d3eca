//! Error types for the plot editor engine.

use std::fmt;

use thiserror::Error;

use crate::gateway::RequestId;

/// Result type alias for editor operations.
pub type Result<T> = std::result::Result<T, EditorError>;

/// Which of the two history stacks an operation targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKind {
    Undo,
    Redo,
}

impl fmt::Display for HistoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryKind::Undo => f.write_str("undo"),
            HistoryKind::Redo => f.write_str("redo"),
        }
    }
}

/// Errors surfaced by the editor. None of them are fatal; the session stays usable.
#[derive(Debug, Error)]
pub enum EditorError {
    /// Undo or redo requested with an empty stack.
    #[error("nothing to {0}")]
    HistoryEmpty(HistoryKind),

    /// The render engine reported a failure for the live request.
    #[error("render request {request} failed: {message}")]
    RenderFailure { request: RequestId, message: String },

    /// A path that does not fit the shape of the document.
    #[error("invalid option path `{path}`: {reason}")]
    InvalidPath { path: String, reason: String },

    /// Render resolution that is not a positive finite number.
    #[error("invalid resolution {0}: ppi must be a positive finite number")]
    InvalidPpi(f64),

    /// The editor was closed; open it again before editing.
    #[error("plot editor is closed")]
    Closed,

    /// Malformed JSON handed in by the host.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EditorError {
    pub fn invalid_path(path: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors a host would render as a disabled button rather than a message.
    pub fn is_history_empty(&self) -> bool {
        matches!(self, EditorError::HistoryEmpty(_))
    }
}
