//! Push session error types.

use tonic::Status;

use crate::hooks::HookError;

/// Errors that end a server push session.
///
/// A duplicate client id is not one of them: the session answers with the
/// `/error` envelope and ends cleanly.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// The first envelope on the stream was not a registration.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The online hook refused the client; no acknowledgment was sent.
    #[error("Online hook rejected client {client_id}: {source}")]
    Hook {
        client_id: String,
        #[source]
        source: HookError,
    },

    /// The underlying stream failed.
    #[error("Transport error: {0}")]
    Transport(Status),

    /// A pushed command could not be written to the client.
    #[error("Write to client {0} failed")]
    WriteFailed(String),
}

impl From<PushError> for Status {
    fn from(err: PushError) -> Self {
        match err {
            PushError::Protocol(msg) => Self::invalid_argument(msg),
            e @ PushError::Hook { .. } => Self::failed_precondition(e.to_string()),
            PushError::Transport(status) => status,
            e @ PushError::WriteFailed(_) => Self::unavailable(e.to_string()),
        }
    }
}
