//! In-memory registry of active client sessions.

pub mod connection;

pub use connection::{ConnectionRegistry, DuplicateId, Outbound, SessionGuard, SessionHandle};
