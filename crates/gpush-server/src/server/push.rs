//! Server push session: registration handshake, presence hooks, command push.

use std::sync::Arc;

use tokio_stream::{Stream, StreamExt};
use tonic::Status;
use tracing::{debug, info, warn};

use gpush_core::payload::decode_api_list;
use gpush_proto::methods::{API_ERROR, API_OK, API_REGISTER, PAYLOAD_DUP_ID, PAYLOAD_SUCCESS};
use gpush_proto::v1::{PushRequest, PushResponse};

use crate::config::ServerConfig;
use crate::error::PushError;
use crate::hooks::PresenceHooks;
use crate::registry::{ConnectionRegistry, Outbound, SessionGuard, SessionHandle};

/// Routes commands to registered clients and drives each client's session.
pub struct PushServer {
    registry: ConnectionRegistry,
    hooks: Arc<dyn PresenceHooks>,
    config: ServerConfig,
}

impl PushServer {
    pub fn new(config: ServerConfig, hooks: impl PresenceHooks + 'static) -> Self {
        Self::with_registry(config, ConnectionRegistry::new(), hooks)
    }

    pub fn with_registry(
        config: ServerConfig,
        registry: ConnectionRegistry,
        hooks: impl PresenceHooks + 'static,
    ) -> Self {
        Self {
            registry,
            hooks: Arc::new(hooks),
            config,
        }
    }

    pub const fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Push a command to a registered client.
    ///
    /// Unknown ids are a silent no-op: nothing is queued for clients that
    /// have not registered yet or have already left. Returns `true` if the
    /// command was handed to a live session.
    pub async fn send_cmd(&self, client_id: &str, api: &str, data: Vec<u8>) -> bool {
        let Some(session) = self.registry.get(client_id) else {
            debug!(client_id = %client_id, api = %api, "No session for client, dropping command");
            return false;
        };
        session.dispatch(api, data).await
    }

    /// Run one client session to completion.
    ///
    /// Reads the register envelope from `inbound`, claims the client id,
    /// calls the online hook and acknowledges on `outbound`, then waits until
    /// the client goes away or a push to it fails. A duplicate id is answered
    /// with `/error` and ends with `Ok(())`.
    pub async fn push<S>(&self, mut inbound: S, outbound: Outbound) -> Result<(), PushError>
    where
        S: Stream<Item = Result<PushRequest, Status>> + Unpin + Send,
    {
        let register = match inbound.next().await {
            Some(Ok(request)) => request,
            Some(Err(status)) => return Err(PushError::Transport(status)),
            None => {
                return Err(PushError::Protocol(
                    "stream ended before registration".into(),
                ));
            }
        };
        if register.api != API_REGISTER {
            return Err(PushError::Protocol(format!(
                "expected {API_REGISTER}, got {}",
                register.api
            )));
        }

        let PushRequest {
            id: client_id,
            data,
            ..
        } = register;
        let apis = decode_api_list(&data).unwrap_or_else(|e| {
            debug!(client_id = %client_id, error = %e, "Register payload is not an API list");
            Vec::new()
        });

        let handle = SessionHandle::new(client_id.clone(), apis, outbound.clone());
        let Ok(guard) = self.registry.try_register(handle) else {
            info!(client_id = %client_id, "Rejecting duplicate client id");
            let reply = PushResponse {
                api: API_ERROR.into(),
                data: PAYLOAD_DUP_ID.to_vec(),
            };
            if outbound.send(Ok(reply)).await.is_err() {
                debug!(client_id = %client_id, "Client left before duplicate reply");
            }
            return Ok(());
        };

        if let Err(source) = self.hooks.online(&client_id, &data) {
            warn!(client_id = %client_id, error = %source, "Online hook rejected client");
            return Err(PushError::Hook { client_id, source });
        }

        let session = ActiveSession {
            hooks: Arc::clone(&self.hooks),
            guard,
        };
        info!(
            client_id = %client_id,
            apis = ?session.guard.handle().apis,
            "Client online"
        );
        let result = session.serve(&mut inbound, &outbound).await;
        info!(client_id = %client_id, "Client offline");
        result
    }
}

/// A session past the online hook. Dropping it calls the offline hook and
/// then releases the registry slot.
struct ActiveSession {
    hooks: Arc<dyn PresenceHooks>,
    guard: SessionGuard,
}

impl ActiveSession {
    async fn serve<S>(&self, inbound: &mut S, outbound: &Outbound) -> Result<(), PushError>
    where
        S: Stream<Item = Result<PushRequest, Status>> + Unpin + Send,
    {
        let handle = self.guard.handle();
        let ack = PushResponse {
            api: API_OK.into(),
            data: PAYLOAD_SUCCESS.to_vec(),
        };
        if !handle.acknowledge(ack).await {
            debug!(client_id = %handle.client_id, "Client left before acknowledgment");
            return Ok(());
        }

        // The client half-closes its side after the handshake, so the end of
        // `inbound` is not a termination signal. A failed push also closes
        // the response stream; it is checked first so it is reported as such.
        let mut inbound_open = true;
        loop {
            tokio::select! {
                biased;
                () = handle.torn_down() => {
                    return Err(PushError::WriteFailed(handle.client_id.clone()));
                }
                () = outbound.closed() => {
                    debug!(client_id = %handle.client_id, "Response stream closed");
                    return Ok(());
                }
                next = inbound.next(), if inbound_open => match next {
                    None => inbound_open = false,
                    Some(Ok(request)) => {
                        debug!(
                            client_id = %handle.client_id,
                            api = %request.api,
                            "Ignoring envelope on registered stream"
                        );
                    }
                    Some(Err(status)) => return Err(PushError::Transport(status)),
                },
            }
        }
    }
}

impl Drop for ActiveSession {
    fn drop(&mut self) {
        self.hooks.offline(self.guard.client_id());
    }
}
