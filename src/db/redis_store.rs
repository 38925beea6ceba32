use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Client, Pipeline, RedisError, Value};
use tracing::debug;

use crate::db::{
    AggregateCommand, AggregateReply, Batch, Command, DocumentStore, Fields, Reducer, Reply,
    SearchCommand, SearchReply, SortOrder, StoreError, StoredDocument,
};

/// RediSearch-backed store. Every batch is sent as one pipeline over a
/// shared multiplexed connection.
#[derive(Clone)]
pub struct RedisStore {
    connection: MultiplexedConnection,
}

impl RedisStore {
    pub fn new(connection: MultiplexedConnection) -> Self {
        Self { connection }
    }

    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url).map_err(map_redis_error)?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(map_redis_error)?;
        Ok(Self::new(connection))
    }
}

#[async_trait]
impl DocumentStore for RedisStore {
    async fn execute(&self, batch: Batch) -> Result<Vec<Reply>, StoreError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let commands = batch.into_commands();
        let mut pipe = redis::pipe();
        for command in &commands {
            push_command(&mut pipe, command);
        }

        let mut connection = self.connection.clone();
        let values: Vec<Value> = pipe
            .query_async(&mut connection)
            .await
            .map_err(map_redis_error)?;

        debug!(
            commands = commands.len(),
            replies = values.len(),
            "executed store batch"
        );

        if values.len() != commands.len() {
            return Err(StoreError::UnexpectedReply(format!(
                "sent {} commands, received {} replies",
                commands.len(),
                values.len()
            )));
        }

        commands
            .iter()
            .zip(values)
            .map(|(command, value)| parse_reply(command, value))
            .collect()
    }
}

fn push_command(pipe: &mut Pipeline, command: &Command) {
    match command {
        Command::Search(search) => push_search(pipe, search),
        Command::Aggregate(aggregate) => push_aggregate(pipe, aggregate),
        Command::Fetch { key } => {
            pipe.cmd("HGETALL").arg(key);
        }
    }
}

fn push_search(pipe: &mut Pipeline, search: &SearchCommand) {
    pipe.cmd("FT.SEARCH").arg(&search.index).arg(&search.query);
    if let Some((field, order)) = &search.sort_by {
        pipe.arg("SORTBY").arg(field).arg(match order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        });
    }
    pipe.arg("LIMIT").arg(search.offset).arg(search.limit);
}

fn push_aggregate(pipe: &mut Pipeline, aggregate: &AggregateCommand) {
    let field = format!("@{}", aggregate.group_by);
    pipe.cmd("FT.AGGREGATE")
        .arg(&aggregate.index)
        .arg(&aggregate.query)
        .arg("GROUPBY")
        .arg(1)
        .arg(&field)
        .arg("REDUCE");
    match aggregate.reducer {
        Reducer::Count => {
            pipe.arg("COUNT").arg(0);
        }
        Reducer::CountDistinct => {
            pipe.arg("COUNT_DISTINCT").arg(1).arg(&field);
        }
    }
    pipe.arg("AS")
        .arg(&aggregate.alias)
        .arg("LIMIT")
        .arg(aggregate.offset)
        .arg(aggregate.limit);
}

fn parse_reply(command: &Command, value: Value) -> Result<Reply, StoreError> {
    match command {
        Command::Search(_) => parse_search(value).map(Reply::Search),
        Command::Aggregate(_) => parse_aggregate(value).map(Reply::Aggregate),
        Command::Fetch { .. } => {
            let fields = parse_fields(value)?;
            Ok(Reply::Record((!fields.is_empty()).then_some(fields)))
        }
    }
}

// [total, key, [field, value, ...], key, [...], ...]
fn parse_search(value: Value) -> Result<SearchReply, StoreError> {
    let mut items = into_array(value, "FT.SEARCH")?.into_iter();
    let total = items
        .next()
        .as_ref()
        .and_then(value_as_u64)
        .ok_or_else(|| StoreError::UnexpectedReply("FT.SEARCH reply without total".into()))?;

    let mut documents = Vec::new();
    while let Some(key) = items.next() {
        let key = value_as_string(&key)
            .ok_or_else(|| StoreError::UnexpectedReply("FT.SEARCH key is not a string".into()))?;
        let fields = match items.next() {
            Some(fields) => parse_fields(fields)?,
            None => Fields::new(),
        };
        documents.push(StoredDocument { key, fields });
    }

    Ok(SearchReply { total, documents })
}

// [total, [field, value, ...], ...]
fn parse_aggregate(value: Value) -> Result<AggregateReply, StoreError> {
    let mut items = into_array(value, "FT.AGGREGATE")?.into_iter();
    let total = items.next().as_ref().and_then(value_as_u64).ok_or_else(|| {
        StoreError::UnexpectedReply("FT.AGGREGATE reply without total".into())
    })?;

    let rows = items.map(parse_fields).collect::<Result<Vec<_>, _>>()?;
    Ok(AggregateReply { total, rows })
}

fn parse_fields(value: Value) -> Result<Fields, StoreError> {
    let pairs: Vec<(Value, Value)> = match value {
        Value::Nil => Vec::new(),
        Value::Map(pairs) => pairs,
        Value::Array(items) => {
            let mut pairs = Vec::with_capacity(items.len() / 2);
            let mut items = items.into_iter();
            while let (Some(field), Some(value)) = (items.next(), items.next()) {
                pairs.push((field, value));
            }
            pairs
        }
        other => {
            return Err(StoreError::UnexpectedReply(format!(
                "expected field list, got {:?}",
                other
            )));
        }
    };

    let mut fields = Fields::with_capacity(pairs.len());
    for (field, value) in pairs {
        if let (Some(field), Some(value)) = (value_as_string(&field), value_as_string(&value)) {
            fields.insert(field, value);
        }
    }
    Ok(fields)
}

fn into_array(value: Value, command: &str) -> Result<Vec<Value>, StoreError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(StoreError::UnexpectedReply(format!(
            "{} returned {:?}",
            command, other
        ))),
    }
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::BulkString(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Value::SimpleString(text) => Some(text.clone()),
        Value::VerbatimString { text, .. } => Some(text.clone()),
        Value::Int(number) => Some(number.to_string()),
        Value::Double(number) => Some(number.to_string()),
        _ => None,
    }
}

fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Int(number) => u64::try_from(*number).ok(),
        other => value_as_string(other).and_then(|text| text.parse().ok()),
    }
}

fn map_redis_error(err: RedisError) -> StoreError {
    if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
        StoreError::Connection(err.to_string())
    } else {
        StoreError::Command(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulk(text: &str) -> Value {
        Value::BulkString(text.as_bytes().to_vec())
    }

    #[test]
    fn parses_search_reply_with_documents() {
        let value = Value::Array(vec![
            Value::Int(7),
            bulk("reg:package:foo:1.0.0@main#1"),
            Value::Array(vec![bulk("type"), bulk("package"), bulk("chainId"), bulk("1")]),
        ]);
        let reply = parse_search(value).expect("parse");
        assert_eq!(reply.total, 7);
        assert_eq!(reply.documents.len(), 1);
        assert_eq!(reply.documents[0].key, "reg:package:foo:1.0.0@main#1");
        assert_eq!(reply.documents[0].fields["chainId"], "1");
    }

    #[test]
    fn parses_aggregate_rows() {
        let value = Value::Array(vec![
            Value::Int(2),
            Value::Array(vec![bulk("name"), bulk("foo"), bulk("count"), bulk("3")]),
            Value::Array(vec![bulk("name"), bulk("bar"), bulk("count"), bulk("2")]),
        ]);
        let reply = parse_aggregate(value).expect("parse");
        assert_eq!(reply.total, 2);
        assert_eq!(reply.rows[1]["name"], "bar");
    }

    #[test]
    fn empty_hash_is_a_missing_record() {
        let command = Command::Fetch {
            key: "missing".to_string(),
        };
        let reply = parse_reply(&command, Value::Array(Vec::new())).expect("parse");
        assert_eq!(reply, Reply::Record(None));
    }

    // RESP array of bulk strings, as written on the wire.
    fn resp(args: &[&str]) -> Vec<u8> {
        let mut out = format!("*{}\r\n", args.len()).into_bytes();
        for arg in args {
            out.extend(format!("${}\r\n{}\r\n", arg.len(), arg).into_bytes());
        }
        out
    }

    fn packed(command: Command) -> Vec<u8> {
        let mut pipe = redis::pipe();
        push_command(&mut pipe, &command);
        pipe.get_packed_pipeline()
    }

    #[test]
    fn search_is_sorted_and_windowed() {
        let command = Command::Search(
            SearchCommand::new("idx:package", "*")
                .sort_by("timestamp", SortOrder::Desc)
                .window(0, 500),
        );
        assert_eq!(
            packed(command),
            resp(&[
                "FT.SEARCH", "idx:package", "*", "SORTBY", "timestamp", "DESC", "LIMIT", "0",
                "500",
            ])
        );
    }

    #[test]
    fn unsorted_search_omits_sortby() {
        let command = Command::Search(SearchCommand::new("idx:abi", "@type:{contract}").window(20, 10));
        assert_eq!(
            packed(command),
            resp(&["FT.SEARCH", "idx:abi", "@type:{contract}", "LIMIT", "20", "10"])
        );
    }

    #[test]
    fn count_aggregation_groups_by_field() {
        let command = Command::Aggregate(
            AggregateCommand::new("idx:package", "*", "name", Reducer::Count).window(0, 500),
        );
        assert_eq!(
            packed(command),
            resp(&[
                "FT.AGGREGATE", "idx:package", "*", "GROUPBY", "1", "@name", "REDUCE", "COUNT",
                "0", "AS", "count", "LIMIT", "0", "500",
            ])
        );
    }

    #[test]
    fn count_distinct_aggregation_reduces_over_the_group_field() {
        let command = Command::Aggregate(
            AggregateCommand::new("idx:package", "*", "chainId", Reducer::CountDistinct)
                .window(0, 10),
        );
        assert_eq!(
            packed(command),
            resp(&[
                "FT.AGGREGATE", "idx:package", "*", "GROUPBY", "1", "@chainId", "REDUCE",
                "COUNT_DISTINCT", "1", "@chainId", "AS", "count", "LIMIT", "0", "10",
            ])
        );
    }

    #[test]
    fn fetch_is_hgetall() {
        let command = Command::Fetch {
            key: "reg:package:vault:1.0.0@main#10".to_string(),
        };
        assert_eq!(
            packed(command),
            resp(&["HGETALL", "reg:package:vault:1.0.0@main#10"])
        );
    }

    #[test]
    fn batch_commands_are_pipelined_in_order() {
        let mut pipe = redis::pipe();
        push_command(&mut pipe, &Command::Fetch { key: "a".to_string() });
        push_command(&mut pipe, &Command::Fetch { key: "b".to_string() });
        let mut expected = resp(&["HGETALL", "a"]);
        expected.extend(resp(&["HGETALL", "b"]));
        assert_eq!(pipe.get_packed_pipeline(), expected);
    }

    #[test]
    fn search_reply_must_be_an_array() {
        let err = parse_search(Value::Okay).expect_err("should fail");
        assert!(matches!(err, StoreError::UnexpectedReply(_)));
    }
}
