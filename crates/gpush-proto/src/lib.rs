//! gpush Protocol Buffers
//!
//! Generated protobuf code for the gpush gRPC API.
//!
//! This crate contains:
//! - `PushRequest` / `PushResponse` envelopes
//! - `MessageService` with its single bidirectional `Push` stream
//! - the reserved handshake API names in [`methods`]

#![allow(clippy::derive_partial_eq_without_eq)]

pub mod methods;

/// gpush v1 API definitions.
pub mod v1 {
    tonic::include_proto!("gpush.v1");
}

// Re-export v1 as the default API version for convenience
pub use v1::*;
