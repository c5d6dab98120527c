//! Shared setup for end-to-end tests: a real server on an ephemeral port.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Channel, Server};

use gpush_proto::v1::message_service_server::MessageServiceServer;
use gpush_server::{HookError, MessageServiceImpl, PresenceHooks, PushServer, ServerConfig};

/// Hooks that record calls and reject one configured client id.
#[derive(Default)]
pub struct RecordingHooks {
    pub reject: Option<String>,
    /// Blocks the online hook after recording the call.
    pub online_delay: Option<Duration>,
    pub online: Mutex<Vec<String>>,
    pub offline: Mutex<Vec<String>>,
}

impl PresenceHooks for RecordingHooks {
    fn online(&self, client_id: &str, _data: &[u8]) -> Result<(), HookError> {
        self.online.lock().push(client_id.to_string());
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

pub struct TestServer {
    pub server: Arc<PushServer>,
    pub hooks: Arc<RecordingHooks>,
    pub addr: SocketAddr,
    _shutdown: oneshot::Sender<()>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn channel(&self) -> Channel {
        Channel::from_shared(self.url())
            .unwrap()
            .connect()
            .await
            .unwrap()
    }
}

pub async fn start_server(hooks: RecordingHooks) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let hooks = Arc::new(hooks);
    let server = Arc::new(PushServer::new(ServerConfig::default(), Arc::clone(&hooks)));
    let service = MessageServiceImpl::new(Arc::clone(&server));

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        Server::builder()
            .add_service(MessageServiceServer::new(service))
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
    });

    TestServer {
        server,
        hooks,
        addr,
        _shutdown: shutdown_tx,
    }
}

/// Wait until `cond` holds, failing the test after a few seconds.
pub async fn wait_until(cond: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}
