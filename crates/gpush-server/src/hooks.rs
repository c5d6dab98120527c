//! Presence hooks invoked when a client session activates and terminates.

use std::sync::Arc;

/// Error returned by an online hook to refuse a client.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct HookError(String);

impl HookError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Application callbacks for session activation and teardown.
///
/// Supplied when the [`PushServer`](crate::PushServer) is built and fixed for
/// its lifetime. `offline` is called exactly once for every session whose
/// `online` call succeeded, and never for any other session.
pub trait PresenceHooks: Send + Sync {
    /// Called after the client id has been claimed and before the client is
    /// acknowledged. `data` is the raw register payload. Returning an error
    /// aborts the registration.
    fn online(&self, _client_id: &str, _data: &[u8]) -> Result<(), HookError> {
        Ok(())
    }

    /// Called when an activated session ends, before its registry entry is
    /// released.
    fn offline(&self, _client_id: &str) {}
}

impl<T: PresenceHooks + ?Sized> PresenceHooks for Arc<T> {
    fn online(&self, client_id: &str, data: &[u8]) -> Result<(), HookError> {
        (**self).online(client_id, data)
    }

    fn offline(&self, client_id: &str) {
        (**self).offline(client_id);
    }
}

/// Hooks that accept every client and ignore departures.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl PresenceHooks for NoopHooks {}
