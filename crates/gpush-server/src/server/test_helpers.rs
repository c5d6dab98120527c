//! Shared test helpers for server session tests.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tonic::Status;

use gpush_proto::methods::API_REGISTER;
use gpush_proto::v1::{PushRequest, PushResponse};

use crate::error::PushError;
use crate::hooks::{HookError, PresenceHooks};
use crate::server::push::PushServer;

/// Hooks that record every call and reject one configured client id.
#[derive(Default)]
pub struct RecordingHooks {
    pub reject: Option<String>,
    /// Blocks the online hook after recording the call.
    pub online_delay: Option<Duration>,
    pub online: Mutex<Vec<(String, Vec<u8>)>>,
    pub offline: Mutex<Vec<String>>,
}

impl RecordingHooks {
    pub fn rejecting(client_id: &str) -> Self {
        Self {
            reject: Some(client_id.to_string()),
            ..Self::default()
        }
    }

    pub fn slow(online_delay: Duration) -> Self {
        Self {
            online_delay: Some(online_delay),
            ..Self::default()
        }
    }
}

impl PresenceHooks for RecordingHooks {
    fn online(&self, client_id: &str, data: &[u8]) -> Result<(), HookError> {
        self.online.lock().push((client_id.to_string(), data.to_vec()));
        if let Some(delay) = self.online_delay {
            std::thread::sleep(delay);
        }
        if self.reject.as_deref() == Some(client_id) {
            return Err(HookError::new(format!("{client_id} is not allowed")));
        }
        Ok(())
    }

    fn offline(&self, client_id: &str) {
        self.offline.lock().push(client_id.to_string());
    }
}

/// Inbound side of a fake client stream.
pub type InboundTx = mpsc::Sender<Result<PushRequest, Status>>;

/// A session's stream pair as seen from the fake client.
pub struct FakeClient {
    pub inbound_tx: InboundTx,
    pub inbound: ReceiverStream<Result<PushRequest, Status>>,
    pub outbound_tx: mpsc::Sender<Result<PushResponse, Status>>,
    pub outbound_rx: mpsc::Receiver<Result<PushResponse, Status>>,
}

pub fn fake_client() -> FakeClient {
    let (inbound_tx, inbound_rx) = mpsc::channel(16);
    let (outbound_tx, outbound_rx) = mpsc::channel(16);
    FakeClient {
        inbound_tx,
        inbound: ReceiverStream::new(inbound_rx),
        outbound_tx,
        outbound_rx,
    }
}

pub fn register_request(client_id: &str) -> PushRequest {
    PushRequest {
        api: API_REGISTER.into(),
        id: client_id.into(),
        data: br#"["/SayHello"]"#.to_vec(),
    }
}

/// Receive the next response, failing the test if none arrives in time.
pub async fn next_response(
    rx: &mut mpsc::Receiver<Result<PushResponse, Status>>,
) -> Option<Result<PushResponse, Status>> {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
}

/// Wait until `cond` holds, failing the test after a few seconds.
pub async fn wait_until(cond: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

/// A push session running on its own task, fed by a fake client.
pub struct SpawnedSession {
    pub inbound_tx: InboundTx,
    pub outbound_rx: mpsc::Receiver<Result<PushResponse, Status>>,
    pub task: JoinHandle<Result<(), PushError>>,
}

/// Send a register envelope for `client_id` and run the session on a task.
pub async fn spawn_session(server: &Arc<PushServer>, client_id: &str) -> SpawnedSession {
    let FakeClient {
        inbound_tx,
        inbound,
        outbound_tx,
        outbound_rx,
    } = fake_client();
    inbound_tx
        .send(Ok(register_request(client_id)))
        .await
        .unwrap();
    let server = Arc::clone(server);
    let task = tokio::spawn(async move { server.push(inbound, outbound_tx).await });
    SpawnedSession {
        inbound_tx,
        outbound_rx,
        task,
    }
}
