//! Push client: handler registration, handshake and dispatch.
//!
//! `PushClient::run` never retries; [`reconnect::run_with_reconnect`] is one
//! way for the owning application to keep a client online.

pub mod engine;
pub mod error;
pub mod handler;
pub mod reconnect;

pub use engine::{PushClient, PushClientBuilder};
pub use error::ClientError;
pub use handler::{CommandHandler, CommandTable};
