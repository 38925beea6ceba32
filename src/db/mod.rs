pub mod models;
#[cfg(feature = "redis")]
pub mod redis_store;
#[cfg(test)]
pub mod testing;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

/// Raw hash fields as stored. Every value is a string, numbers included.
pub type Fields = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCommand {
    pub index: String,
    pub query: String,
    pub sort_by: Option<(String, SortOrder)>,
    pub offset: usize,
    pub limit: usize,
}

impl SearchCommand {
    pub fn new(index: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            query: query.into(),
            sort_by: None,
            offset: 0,
            limit: 10,
        }
    }

    pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = Some((field.into(), order));
        self
    }

    pub fn window(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    Count,
    CountDistinct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateCommand {
    pub index: String,
    pub query: String,
    pub group_by: String,
    pub reducer: Reducer,
    /// Name of the reduced value in each returned row.
    pub alias: String,
    pub offset: usize,
    pub limit: usize,
}

impl AggregateCommand {
    pub fn new(
        index: impl Into<String>,
        query: impl Into<String>,
        group_by: impl Into<String>,
        reducer: Reducer,
    ) -> Self {
        Self {
            index: index.into(),
            query: query.into(),
            group_by: group_by.into(),
            reducer,
            alias: "count".to_string(),
            offset: 0,
            limit: 10,
        }
    }

    pub fn window(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Search(SearchCommand),
    Aggregate(AggregateCommand),
    Fetch { key: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub key: String,
    pub fields: Fields,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchReply {
    pub total: u64,
    pub documents: Vec<StoredDocument>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateReply {
    pub total: u64,
    pub rows: Vec<Fields>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Search(SearchReply),
    Aggregate(AggregateReply),
    /// `None` when the key does not exist or holds an empty hash.
    Record(Option<Fields>),
}

impl Reply {
    pub fn into_search(self) -> Result<SearchReply, StoreError> {
        match self {
            Reply::Search(reply) => Ok(reply),
            other => Err(StoreError::UnexpectedReply(format!(
                "expected search reply, got {}",
                other.kind()
            ))),
        }
    }

    pub fn into_aggregate(self) -> Result<AggregateReply, StoreError> {
        match self {
            Reply::Aggregate(reply) => Ok(reply),
            other => Err(StoreError::UnexpectedReply(format!(
                "expected aggregate reply, got {}",
                other.kind()
            ))),
        }
    }

    pub fn into_record(self) -> Result<Option<Fields>, StoreError> {
        match self {
            Reply::Record(record) => Ok(record.filter(|fields| !fields.is_empty())),
            other => Err(StoreError::UnexpectedReply(format!(
                "expected record reply, got {}",
                other.kind()
            ))),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Reply::Search(_) => "search",
            Reply::Aggregate(_) => "aggregate",
            Reply::Record(_) => "record",
        }
    }
}

/// Accumulates commands that a [`DocumentStore`] executes in one round trip.
///
/// Batching bounds latency only. A failure of any command fails the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    commands: Vec<Command>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, command: SearchCommand) -> Self {
        self.commands.push(Command::Search(command));
        self
    }

    pub fn aggregate(mut self, command: AggregateCommand) -> Self {
        self.commands.push(Command::Aggregate(command));
        self
    }

    pub fn fetch(mut self, key: impl Into<String>) -> Self {
        self.commands.push(Command::Fetch { key: key.into() });
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("command failed: {0}")]
    Command(String),
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),
}

/// Read-only access to the backing index store.
///
/// `execute` returns exactly one reply per command, in command order.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    async fn execute(&self, batch: Batch) -> Result<Vec<Reply>, StoreError>;

    async fn search(&self, command: SearchCommand) -> Result<SearchReply, StoreError> {
        let replies = self.execute(Batch::new().search(command)).await?;
        single_reply(replies)?.into_search()
    }

    async fn aggregate(&self, command: AggregateCommand) -> Result<AggregateReply, StoreError> {
        let replies = self.execute(Batch::new().aggregate(command)).await?;
        single_reply(replies)?.into_aggregate()
    }
}

fn single_reply(replies: Vec<Reply>) -> Result<Reply, StoreError> {
    next_reply(&mut replies.into_iter())
}

/// Takes the next reply of an executed batch, failing if the store returned
/// fewer replies than commands sent.
pub fn next_reply(replies: &mut impl Iterator<Item = Reply>) -> Result<Reply, StoreError> {
    replies
        .next()
        .ok_or_else(|| StoreError::UnexpectedReply("batch returned too few replies".to_string()))
}
