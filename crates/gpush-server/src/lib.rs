//! gpush Server Library
//!
//! Server side of the push layer:
//! - Connection registry mapping client ids to live sessions
//! - Registration handshake and session lifecycle (`PushServer::push`)
//! - Command push to a registered client (`PushServer::send_cmd`)
//! - Online/offline presence hooks
//! - tonic adapter for the `MessageService` gRPC service

pub mod config;
pub mod error;
pub mod hooks;
pub mod registry;
pub mod server;

pub use config::ServerConfig;
pub use error::PushError;
pub use hooks::{HookError, NoopHooks, PresenceHooks};
pub use registry::{ConnectionRegistry, SessionGuard, SessionHandle};
pub use server::{MessageServiceImpl, PushServer};
