//! Command handlers and the table that routes API names to them.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::future::Future;

use gpush_proto::methods::is_reserved;

use super::error::ClientError;

/// Handles the payload of one pushed command.
///
/// Handlers run one at a time on the client's receive loop, so a slow
/// handler delays every command after it.
#[tonic::async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, data: Vec<u8>);
}

#[tonic::async_trait]
impl<F, Fut> CommandHandler for F
where
    F: Fn(Vec<u8>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, data: Vec<u8>) {
        (self)(data).await;
    }
}

/// Handlers keyed by API name.
#[derive(Default)]
pub struct CommandTable {
    handlers: HashMap<String, Box<dyn CommandHandler>>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler. Registering an API name twice is an error and leaves
    /// the first handler in place.
    pub fn register(
        &mut self,
        api: impl Into<String>,
        handler: impl CommandHandler + 'static,
    ) -> Result<(), ClientError> {
        let api = api.into();
        if is_reserved(&api) {
            return Err(ClientError::ReservedApi(api));
        }
        match self.handlers.entry(api) {
            Entry::Occupied(slot) => Err(ClientError::DuplicateApi(slot.key().clone())),
            Entry::Vacant(slot) => {
                slot.insert(Box::new(handler));
                Ok(())
            }
        }
    }

    /// Registered API names, in no particular order.
    pub fn apis(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the handler for `api`. Returns `false` if there is none.
    pub async fn dispatch(&self, api: &str, data: Vec<u8>) -> bool {
        match self.handlers.get(api) {
            Some(handler) => {
                handler.handle(data).await;
                true
            }
            None => false,
        }
    }
}
