//! Scripted in-memory store for engine tests.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::db::{Batch, Command, DocumentStore, Fields, Reply, StoreError, StoredDocument};

type Responder = Box<dyn Fn(&Command) -> Result<Reply, StoreError> + Send + Sync>;

/// Answers each command through a closure and records every executed batch.
pub struct ScriptedStore {
    responder: Responder,
    batches: Mutex<Vec<Batch>>,
    delay: Option<Duration>,
}

impl ScriptedStore {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&Command) -> Result<Reply, StoreError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            batches: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Fails every batch as if the store were unreachable.
    pub fn unavailable() -> Self {
        Self::new(|_| Err(StoreError::Connection("connection refused".to_string())))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn batches(&self) -> Vec<Batch> {
        self.batches.lock().clone()
    }

    pub fn count_commands<F>(&self, predicate: F) -> usize
    where
        F: Fn(&Command) -> bool,
    {
        self.batches
            .lock()
            .iter()
            .flat_map(|batch| batch.commands())
            .filter(|command| predicate(command))
            .count()
    }
}

#[async_trait]
impl DocumentStore for ScriptedStore {
    async fn execute(&self, batch: Batch) -> Result<Vec<Reply>, StoreError> {
        self.batches.lock().push(batch.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        batch
            .commands()
            .iter()
            .map(|command| (self.responder)(command))
            .collect()
    }
}

pub fn fields(pairs: &[(&str, &str)]) -> Fields {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn package_fields(name: &str, version: &str, chain_id: u64, timestamp: u64) -> Fields {
    let chain_id = chain_id.to_string();
    let timestamp = timestamp.to_string();
    let deploy_url = format!("ipfs://{}-{}-deploy", name, version);
    fields(&[
        ("type", "package"),
        ("name", name),
        ("version", version),
        ("preset", "main"),
        ("chainId", &chain_id),
        ("owner", "0x000000000000000000000000000000000000dEaD"),
        ("deployUrl", &deploy_url),
        ("metaUrl", "ipfs://meta"),
        ("miscUrl", "ipfs://misc"),
        ("timestamp", &timestamp),
    ])
}

pub fn tag_fields(name: &str, tag: &str, version_of_tag: &str, chain_id: u64, timestamp: u64) -> Fields {
    let chain_id = chain_id.to_string();
    let timestamp = timestamp.to_string();
    fields(&[
        ("type", "tag"),
        ("name", name),
        ("tag", tag),
        ("preset", "main"),
        ("chainId", &chain_id),
        ("versionOfTag", version_of_tag),
        ("timestamp", &timestamp),
    ])
}

pub fn document(fields: Fields) -> StoredDocument {
    let key = format!(
        "reg:package:{}:{}@{}#{}",
        fields.get("name").map(String::as_str).unwrap_or_default(),
        fields
            .get("version")
            .or_else(|| fields.get("tag"))
            .map(String::as_str)
            .unwrap_or_default(),
        fields.get("preset").map(String::as_str).unwrap_or_default(),
        fields.get("chainId").map(String::as_str).unwrap_or_default(),
    );
    StoredDocument { key, fields }
}
