//! Per-run cache of model clients keyed by provider and model.

use super::model_ref::ModelRef;
use super::transport::{ClientOptions, ModelClient, OpenAiClient};
use crate::error::Result;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Builds a client from resolved options.
pub type ClientFactory = Box<dyn Fn(ClientOptions) -> Result<Arc<dyn ModelClient>> + Send + Sync>;

/// Clients created during one process run, reused across steps that target
/// the same `(provider, model)` pair.
///
/// Options (and therefore credentials) are only resolved on a cache miss, so a
/// credential command runs at most once per pair.
pub struct ClientCache {
    clients: HashMap<(String, String), Arc<dyn ModelClient>>,
    factory: ClientFactory,
}

impl ClientCache {
    /// A cache that builds [`OpenAiClient`]s.
    pub fn new() -> Self {
        Self::with_factory(Box::new(|options| {
            Ok(Arc::new(OpenAiClient::new(options)?) as Arc<dyn ModelClient>)
        }))
    }

    /// A cache that builds clients with `factory`.
    pub fn with_factory(factory: ClientFactory) -> Self {
        Self {
            clients: HashMap::new(),
            factory,
        }
    }

    /// Return the client for `model`, creating it with the options produced by
    /// `resolve` when none exists yet.
    pub async fn get_or_connect<F, Fut>(
        &mut self,
        model: &ModelRef,
        resolve: F,
    ) -> Result<Arc<dyn ModelClient>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ClientOptions>>,
    {
        let key = (model.provider.clone(), model.model.clone());
        if let Some(client) = self.clients.get(&key) {
            return Ok(Arc::clone(client));
        }

        let options = resolve().await?;
        debug!(provider = %options.provider, model = %options.model, "creating model client");
        let client = (self.factory)(options)?;
        self.clients.insert(key, Arc::clone(&client));
        Ok(client)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl Default for ClientCache {
    fn default() -> Self {
        Self::new()
    }
}
