//! Session handles and the registry that owns them while they are active.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use tokio::sync::{Notify, mpsc};
use tonic::Status;
use tracing::{debug, info, warn};

use gpush_proto::v1::PushResponse;

/// Sender half of a session's response stream.
pub type Outbound = mpsc::Sender<Result<PushResponse, Status>>;

/// One registered client connection and the means to push to it.
pub struct SessionHandle {
    /// Client id claimed by the register envelope.
    pub client_id: String,
    /// API names the client advertised (empty if the payload was not a JSON
    /// string array).
    pub apis: Vec<String>,
    outbound: Outbound,
    teardown: Notify,
    active: AtomicBool,
}

impl SessionHandle {
    pub fn new(client_id: String, apis: Vec<String>, outbound: Outbound) -> Self {
        Self {
            client_id,
            apis,
            outbound,
            teardown: Notify::new(),
            active: AtomicBool::new(false),
        }
    }

    /// Queue the registration acknowledgment and make the session visible
    /// to lookups in one step, so no pushed command can precede it.
    ///
    /// Returns `false` if the client has already gone away.
    pub async fn acknowledge(&self, ack: PushResponse) -> bool {
        let Ok(permit) = self.outbound.reserve().await else {
            return false;
        };
        permit.send(Ok(ack));
        self.active.store(true, Ordering::Release);
        true
    }

    /// Whether the session has been acknowledged.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Write a command onto the client's stream.
    ///
    /// Returns `false` if the stream is gone; the session is then signalled to
    /// tear down so its registry slot is released promptly.
    pub async fn dispatch(&self, api: &str, data: Vec<u8>) -> bool {
        let response = PushResponse {
            api: api.to_string(),
            data,
        };
        if self.outbound.send(Ok(response)).await.is_ok() {
            return true;
        }
        warn!(client_id = %self.client_id, api = %api, "Push failed, tearing down session");
        self.teardown.notify_one();
        false
    }

    /// Resolves once a write to this session has failed.
    pub async fn torn_down(&self) {
        self.teardown.notified().await;
    }
}

/// Returned when a client id already has a live session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("client id {0} is already registered")]
pub struct DuplicateId(pub String);

/// Thread-safe registry of active client sessions.
///
/// At most one entry exists per client id. Entries are only added through
/// [`ConnectionRegistry::try_register`], which hands back a [`SessionGuard`]
/// that releases the slot when dropped. A claimed id blocks other
/// registrations at once, but lookups only see the session after it has been
/// acknowledged.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    sessions: Arc<RwLock<HashMap<String, Arc<SessionHandle>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the handle's client id.
    ///
    /// Fails with [`DuplicateId`] if another session already holds the id.
    /// The check is repeated under the write lock, so concurrent attempts for
    /// one id can never both succeed.
    pub fn try_register(&self, handle: SessionHandle) -> Result<SessionGuard, DuplicateId> {
        if self.sessions.read().contains_key(&handle.client_id) {
            return Err(DuplicateId(handle.client_id));
        }
        let handle = Arc::new(handle);
        match self.sessions.write().entry(handle.client_id.clone()) {
            Entry::Occupied(_) => return Err(DuplicateId(handle.client_id.clone())),
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&handle));
            }
        }
        info!(client_id = %handle.client_id, "Session registered");
        Ok(SessionGuard {
            registry: self.clone(),
            handle,
        })
    }

    /// Remove the entry for `client_id` if it is still owned by `handle`.
    pub fn unregister(&self, client_id: &str, handle: &Arc<SessionHandle>) -> bool {
        let mut sessions = self.sessions.write();
        let owned = sessions
            .get(client_id)
            .is_some_and(|current| Arc::ptr_eq(current, handle));
        if owned {
            sessions.remove(client_id);
            drop(sessions);
            info!(client_id = %client_id, "Session unregistered");
        } else {
            drop(sessions);
            debug!(client_id = %client_id, "Session already released");
        }
        owned
    }

    /// Get an acknowledged session by client id.
    pub fn get(&self, client_id: &str) -> Option<Arc<SessionHandle>> {
        self.sessions
            .read()
            .get(client_id)
            .filter(|session| session.is_active())
            .cloned()
    }

    /// Check if a client id has an acknowledged session.
    pub fn is_connected(&self, client_id: &str) -> bool {
        self.get(client_id).is_some()
    }

    /// Get all client ids with acknowledged sessions.
    pub fn connected_clients(&self) -> Vec<String> {
        self.sessions
            .read()
            .values()
            .filter(|session| session.is_active())
            .map(|session| session.client_id.clone())
            .collect()
    }

    /// Count of acknowledged sessions.
    pub fn connection_count(&self) -> usize {
        self.sessions
            .read()
            .values()
            .filter(|session| session.is_active())
            .count()
    }

    /// Count of claimed ids, including sessions still activating.
    pub fn claimed_count(&self) -> usize {
        self.sessions.read().len()
    }
}

/// Scoped ownership of one registry slot.
///
/// Dropping the guard removes the entry, whichever way the owning session
/// ended.
pub struct SessionGuard {
    registry: ConnectionRegistry,
    handle: Arc<SessionHandle>,
}

impl SessionGuard {
    pub const fn handle(&self) -> &Arc<SessionHandle> {
        &self.handle
    }

    pub fn client_id(&self) -> &str {
        &self.handle.client_id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry
            .unregister(&self.handle.client_id, &self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(id: &str) -> (SessionHandle, mpsc::Receiver<Result<PushResponse, Status>>) {
        let (tx, rx) = mpsc::channel(16);
        (SessionHandle::new(id.into(), vec!["/SayHello".into()], tx), rx)
    }

    fn activate(guard: &SessionGuard) {
        guard.handle().active.store(true, Ordering::Release);
    }

    #[test]
    fn register_and_get_session() {
        let registry = ConnectionRegistry::new();
        let (h, _rx) = handle("c1");

        let guard = registry.try_register(h).unwrap();
        activate(&guard);

        assert!(registry.is_connected("c1"));
        assert!(!registry.is_connected("c2"));

        let session = registry.get("c1").unwrap();
        assert_eq!(session.client_id, "c1");
        assert_eq!(session.apis, vec!["/SayHello"]);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let registry = ConnectionRegistry::new();
        let (first, _rx1) = handle("c1");
        let (second, _rx2) = handle("c1");

        let guard = registry.try_register(first).unwrap();
        activate(&guard);
        let err = registry.try_register(second).err().unwrap();
        assert_eq!(err, DuplicateId("c1".into()));

        // The original holder is untouched.
        assert!(Arc::ptr_eq(&registry.get("c1").unwrap(), guard.handle()));
        assert_eq!(registry.connection_count(), 1);
    }

    #[test]
    fn dropping_guard_releases_slot() {
        let registry = ConnectionRegistry::new();
        let (h, _rx) = handle("c1");

        let guard = registry.try_register(h).unwrap();
        activate(&guard);
        assert_eq!(registry.connection_count(), 1);

        drop(guard);
        assert_eq!(registry.connection_count(), 0);
        assert_eq!(registry.claimed_count(), 0);
        assert!(registry.get("c1").is_none());

        let (again, _rx2) = handle("c1");
        assert!(registry.try_register(again).is_ok());
    }

    #[test]
    fn unregister_ignores_foreign_handle() {
        let registry = ConnectionRegistry::new();
        let (h, _rx) = handle("c1");
        let (other, _rx2) = handle("c1");
        let other = Arc::new(other);

        let guard = registry.try_register(h).unwrap();
        activate(&guard);
        assert!(!registry.unregister("c1", &other));
        assert!(registry.is_connected("c1"));
    }

    #[test]
    fn connected_clients_list() {
        let registry = ConnectionRegistry::new();
        let (h1, _rx1) = handle("c1");
        let (h2, _rx2) = handle("c2");

        let (h3, _rx3) = handle("c3");

        let g1 = registry.try_register(h1).unwrap();
        let g2 = registry.try_register(h2).unwrap();
        let _pending = registry.try_register(h3).unwrap();
        activate(&g1);
        activate(&g2);

        let mut clients = registry.connected_clients();
        clients.sort();
        assert_eq!(clients, vec!["c1", "c2"]);
    }

    #[test]
    fn unacknowledged_session_is_claimed_but_hidden() {
        let registry = ConnectionRegistry::new();
        let (h, _rx) = handle("c1");
        let (again, _rx2) = handle("c1");

        let _guard = registry.try_register(h).unwrap();

        assert!(registry.get("c1").is_none());
        assert!(!registry.is_connected("c1"));
        assert_eq!(registry.connection_count(), 0);
        assert_eq!(registry.claimed_count(), 1);
        assert!(registry.try_register(again).is_err());
    }

    #[tokio::test]
    async fn acknowledge_queues_reply_then_activates() {
        let registry = ConnectionRegistry::new();
        let (h, mut rx) = handle("c1");
        let guard = registry.try_register(h).unwrap();

        let ack = PushResponse {
            api: "/ok".into(),
            data: b"success".to_vec(),
        };
        assert!(guard.handle().acknowledge(ack).await);
        assert!(registry.is_connected("c1"));

        assert!(guard.handle().dispatch("/SayHello", b"Alice".to_vec()).await);
        assert_eq!(rx.recv().await.unwrap().unwrap().api, "/ok");
        assert_eq!(rx.recv().await.unwrap().unwrap().api, "/SayHello");
    }

    #[tokio::test]
    async fn acknowledge_fails_when_client_left() {
        let registry = ConnectionRegistry::new();
        let (h, rx) = handle("c1");
        let guard = registry.try_register(h).unwrap();
        drop(rx);

        let ack = PushResponse {
            api: "/ok".into(),
            data: b"success".to_vec(),
        };
        assert!(!guard.handle().acknowledge(ack).await);
        assert!(!registry.is_connected("c1"));
    }

    #[tokio::test]
    async fn dispatch_writes_response() {
        let (h, mut rx) = handle("c1");

        assert!(h.dispatch("/SayHello", b"Alice".to_vec()).await);

        let resp = rx.recv().await.unwrap().unwrap();
        assert_eq!(resp.api, "/SayHello");
        assert_eq!(resp.data, b"Alice");
    }

    #[tokio::test]
    async fn failed_dispatch_signals_teardown() {
        let (h, rx) = handle("c1");
        drop(rx);

        assert!(!h.dispatch("/SayHello", b"Alice".to_vec()).await);

        // The permit is stored, so a later wait returns immediately.
        tokio::time::timeout(std::time::Duration::from_secs(1), h.torn_down())
            .await
            .unwrap();
    }
}
