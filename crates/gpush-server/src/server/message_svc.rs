//! MessageService gRPC implementation.

use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};
use tracing::{instrument, warn};

use gpush_proto::v1::message_service_server::MessageService;
use gpush_proto::v1::{PushRequest, PushResponse};

use crate::server::push::PushServer;

type PushResponseStream =
    Pin<Box<dyn tokio_stream::Stream<Item = Result<PushResponse, Status>> + Send>>;

/// Serves one [`PushServer`] session per `Push` call.
pub struct MessageServiceImpl {
    server: Arc<PushServer>,
}

impl MessageServiceImpl {
    pub const fn new(server: Arc<PushServer>) -> Self {
        Self { server }
    }
}

#[tonic::async_trait]
impl MessageService for MessageServiceImpl {
    type PushStream = PushResponseStream;

    #[instrument(skip(self, request), fields(rpc = "Push"))]
    async fn push(
        &self,
        request: Request<Streaming<PushRequest>>,
    ) -> Result<Response<Self::PushStream>, Status> {
        let in_stream = request.into_inner();

        // Dropped by tonic when the client goes away, which ends the session.
        let (out_tx, out_rx) =
            mpsc::channel::<Result<PushResponse, Status>>(self.server.config().outbound_capacity());

        let server = Arc::clone(&self.server);
        tokio::spawn(async move {
            let error_tx = out_tx.clone();
            if let Err(e) = server.push(in_stream, out_tx).await {
                warn!(error = %e, "Push session failed");
                // Best effort: the stream may already be gone.
                let _ = error_tx.send(Err(e.into())).await;
            }
        });

        let out_stream = ReceiverStream::new(out_rx);
        Ok(Response::new(Box::pin(out_stream)))
    }
}
