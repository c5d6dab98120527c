//! Push session engine and its gRPC adapter.

pub mod message_svc;
pub mod push;

#[cfg(test)]
mod test_helpers;

pub use message_svc::MessageServiceImpl;
pub use push::PushServer;
