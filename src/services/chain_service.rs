use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tracing::debug;

use crate::db::models::{ChainCount, Page};
use crate::db::{AggregateCommand, AggregateReply, DocumentStore, Reducer, StoreError};
use crate::dsl::CHAIN_ID_FIELD;
use crate::engine::QueryEngine;
use crate::error::Result;

const CHAIN_IDS_KEY: &str = "chain_ids";
const CHAIN_IDS_WITH_COUNT_KEY: &str = "chain_ids_with_count";
const CHAIN_AGGREGATE_LIMIT: usize = 10_000;

/// An aggregation that may still be running. Every clone resolves to the same
/// reply, so concurrent callers share one store call.
pub type PendingAggregate = Shared<BoxFuture<'static, std::result::Result<Arc<AggregateReply>, StoreError>>>;

impl<S: DocumentStore> QueryEngine<S> {
    /// Distinct chain ids present in the package index, ascending.
    pub async fn get_chain_ids(&self) -> Result<Vec<u64>> {
        let reply = self
            .cached_chain_aggregate(CHAIN_IDS_KEY, Reducer::CountDistinct)
            .await?;

        let mut chain_ids: Vec<u64> = reply
            .rows
            .iter()
            .filter_map(|row| row.get(CHAIN_ID_FIELD))
            .filter_map(|value| value.parse().ok())
            .collect();
        chain_ids.sort_unstable();
        chain_ids.dedup();
        Ok(chain_ids)
    }

    /// Document count per chain id, largest first.
    pub async fn get_chain_ids_with_count(&self) -> Result<Page<ChainCount>> {
        let reply = self
            .cached_chain_aggregate(CHAIN_IDS_WITH_COUNT_KEY, Reducer::Count)
            .await?;

        let mut data: Vec<ChainCount> = reply
            .rows
            .iter()
            .filter_map(|row| {
                let chain_id = row.get(CHAIN_ID_FIELD)?.parse().ok()?;
                let count = row
                    .get("count")
                    .and_then(|value| value.parse().ok())
                    .unwrap_or_default();
                Some(ChainCount { chain_id, count })
            })
            .collect();
        data.sort_by(|a, b| b.count.cmp(&a.count).then(a.chain_id.cmp(&b.chain_id)));

        Ok(Page {
            total: reply.total,
            data,
        })
    }

    async fn cached_chain_aggregate(
        &self,
        key: &'static str,
        reducer: Reducer,
    ) -> Result<Arc<AggregateReply>> {
        let store = Arc::clone(&self.store);
        let command = AggregateCommand::new(
            self.config.package_index.clone(),
            "*",
            CHAIN_ID_FIELD,
            reducer,
        )
        .window(0, CHAIN_AGGREGATE_LIMIT);

        let pending = self.chain_cache.get_or_insert_with(key, move || {
            async move {
                debug!(operation = key, "running chain id aggregation");
                store.aggregate(command).await.map(Arc::new)
            }
            .boxed()
            .shared()
        });

        match pending.clone().await {
            Ok(reply) => Ok(reply),
            Err(err) => {
                // Failed lookups are not cached; the next caller retries.
                self.chain_cache
                    .remove_if(&key, |current| current.ptr_eq(&pending));
                Err(err.into())
            }
        }
    }
}
