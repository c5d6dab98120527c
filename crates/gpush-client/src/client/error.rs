//! Client error types.

use tonic::Status;

/// Errors that end a client run or reject a handler registration.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Connection error: {0}")]
    Connection(String),

    /// The server already has a live session for this client id.
    #[error("Client id {0} is already registered")]
    DuplicateId(String),

    #[error("Transport error: {0}")]
    Transport(Status),

    #[error("Stream ended by server")]
    StreamClosed,

    /// A handler for this API name was registered twice.
    #[error("Handler already registered for {0}")]
    DuplicateApi(String),

    /// Handlers cannot claim the handshake's API names.
    #[error("{0} is reserved for the registration handshake")]
    ReservedApi(String),

    #[error("Register payload error: {0}")]
    Payload(#[from] gpush_core::Error),
}

impl ClientError {
    /// Whether the registration was refused because the id is in use, as
    /// opposed to a transport failure.
    pub const fn is_duplicate_id(&self) -> bool {
        matches!(self, Self::DuplicateId(_))
    }
}
