use std::sync::Arc;

use crate::cache::TtlCache;
use crate::config::EngineConfig;
use crate::db::DocumentStore;
use crate::services::chain_service::PendingAggregate;

/// Cache of in-flight or completed chain-id aggregations, keyed by operation.
pub type ChainIdCache = TtlCache<&'static str, PendingAggregate>;

/// Read-only query surface over the registry store.
///
/// Stateless apart from the chain-id cache. Clones share the store handle and
/// the cache.
pub struct QueryEngine<S> {
    pub(crate) store: Arc<S>,
    pub(crate) config: Arc<EngineConfig>,
    pub(crate) chain_cache: Arc<ChainIdCache>,
}

impl<S> Clone for QueryEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
            chain_cache: Arc::clone(&self.chain_cache),
        }
    }
}

impl<S: DocumentStore> QueryEngine<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        let cache = ChainIdCache::new(config.chain_cache_capacity, config.chain_cache_ttl);
        Self::with_cache(Arc::new(store), config, Arc::new(cache))
    }

    pub fn with_cache(store: Arc<S>, config: EngineConfig, chain_cache: Arc<ChainIdCache>) -> Self {
        Self {
            store,
            config: Arc::new(config),
            chain_cache,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub(crate) fn window(&self, limit: Option<usize>) -> usize {
        limit
            .filter(|limit| *limit > 0)
            .unwrap_or(self.config.default_limit)
    }
}
