//! gpush Client Library
//!
//! Client side of the push layer:
//! - Handler table keyed by API name, fixed before the client runs
//! - Registration handshake and the sequential dispatch loop (`PushClient::run`)
//! - A caller-owned reconnect driver with exponential backoff

pub mod client;

pub use client::{ClientError, CommandHandler, CommandTable, PushClient, PushClientBuilder};
