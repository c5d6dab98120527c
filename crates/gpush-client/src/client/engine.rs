//! Client registration handshake and dispatch loop.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tonic::Status;
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, info, warn};

use gpush_core::payload::encode_api_list;
use gpush_proto::methods::{API_ERROR, API_OK, API_REGISTER, PAYLOAD_DUP_ID};
use gpush_proto::v1::message_service_client::MessageServiceClient;
use gpush_proto::v1::{PushRequest, PushResponse};

use super::error::ClientError;
use super::handler::{CommandHandler, CommandTable};

/// Collects command handlers before the client starts.
#[derive(Default)]
pub struct PushClientBuilder {
    table: CommandTable,
}

impl PushClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route commands named `api` to `handler`.
    ///
    /// Fails with [`ClientError::DuplicateApi`] if `api` already has a
    /// handler.
    pub fn register_cmd(
        mut self,
        api: impl Into<String>,
        handler: impl CommandHandler + 'static,
    ) -> Result<Self, ClientError> {
        self.table.register(api, handler)?;
        Ok(self)
    }

    /// Freeze the handler table and bind it to a channel.
    pub fn build(self, channel: Channel) -> PushClient {
        PushClient {
            service: MessageServiceClient::new(channel),
            table: Arc::new(self.table),
        }
    }

    /// Like [`build`](Self::build), with a channel that connects on first use.
    ///
    /// Connection failures then surface from [`PushClient::run`] instead of
    /// here.
    pub fn build_lazy(self, server_url: impl Into<String>) -> Result<PushClient, ClientError> {
        let channel = Endpoint::from_shared(server_url.into())
            .map_err(|e| ClientError::Connection(e.to_string()))?
            .connect_lazy();
        Ok(self.build(channel))
    }
}

/// A client with a fixed handler table.
#[derive(Clone)]
pub struct PushClient {
    service: MessageServiceClient<Channel>,
    table: Arc<CommandTable>,
}

impl PushClient {
    pub fn builder() -> PushClientBuilder {
        PushClientBuilder::new()
    }

    pub fn handlers(&self) -> &CommandTable {
        &self.table
    }

    /// Register as `client_id` on a fresh stream, then dispatch pushed
    /// commands until the stream fails.
    ///
    /// Only returns on failure. The caller decides whether to run again.
    pub async fn run(&self, client_id: &str) -> Result<(), ClientError> {
        let register = PushRequest {
            api: API_REGISTER.into(),
            id: client_id.to_string(),
            data: encode_api_list(&self.table.apis())?,
        };
        let (request_tx, request_rx) = mpsc::channel(1);
        request_tx
            .send(register)
            .await
            .map_err(|_| ClientError::Connection("request stream closed".into()))?;

        let response = self
            .service
            .clone()
            .push(ReceiverStream::new(request_rx))
            .await
            .map_err(ClientError::Transport)?;
        let mut inbound = response.into_inner();

        handshake(&mut inbound, client_id).await?;
        info!(client_id = %client_id, "Registered with server");

        // Nothing more to send: close our half of the stream.
        drop(request_tx);

        dispatch_loop(&self.table, &mut inbound).await
    }
}

/// Wait for the server's answer to the register envelope.
pub(crate) async fn handshake<S>(inbound: &mut S, client_id: &str) -> Result<(), ClientError>
where
    S: Stream<Item = Result<PushResponse, Status>> + Unpin,
{
    match inbound.next().await {
        Some(Ok(reply)) if reply.api == API_ERROR && reply.data == PAYLOAD_DUP_ID => {
            Err(ClientError::DuplicateId(client_id.to_string()))
        }
        Some(Ok(reply)) => {
            if reply.api != API_OK {
                warn!(client_id = %client_id, api = %reply.api, "Unexpected handshake reply");
            }
            Ok(())
        }
        Some(Err(status)) => Err(ClientError::Transport(status)),
        None => Err(ClientError::StreamClosed),
    }
}

/// Hand each pushed command to its handler, one at a time.
pub(crate) async fn dispatch_loop<S>(table: &CommandTable, inbound: &mut S) -> Result<(), ClientError>
where
    S: Stream<Item = Result<PushResponse, Status>> + Unpin,
{
    loop {
        match inbound.next().await {
            Some(Ok(PushResponse { api, data })) => {
                if !table.dispatch(&api, data).await {
                    debug!(api = %api, "No handler for command, dropping");
                }
            }
            Some(Err(status)) => return Err(ClientError::Transport(status)),
            None => return Err(ClientError::StreamClosed),
        }
    }
}
