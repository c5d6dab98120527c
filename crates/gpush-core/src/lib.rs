//! gpush Core Library
//!
//! Shared functionality for gpush components:
//! - Handshake payload encoding (the advertised API list)
//! - Reconnect backoff policy for callers that drive `run` in a loop
//! - Tracing initialisation
//! - Common error types

pub mod error;
pub mod payload;
pub mod reconnect;
pub mod tracing_init;

pub use error::{Error, Result};
pub use reconnect::ReconnectPolicy;
