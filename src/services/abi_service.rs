use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::models::{FunctionKind, Page, SearchResult, StoredRecord};
use crate::db::{DocumentStore, SearchCommand, SortOrder};
use crate::dsl::{AbiTerm, TIMESTAMP_FIELD, classify_abi_term, compose_abi_query};
use crate::engine::QueryEngine;
use crate::error::Result;
use crate::ranking::rank_by_name;
use crate::transform::{classify, transform_contract, transform_function};

const FUNCTION_KINDS: &[&str] = &["function", "event", "error"];
const CONTRACT_KINDS: &[&str] = &["contract"];

/// A selector (`0x` + 8 or 64 hex), an address (`0x` + 40 hex) or a name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbiSearch {
    pub query: Option<String>,
    #[serde(default)]
    pub chain_ids: Vec<u64>,
    pub limit: Option<usize>,
}

impl AbiSearch {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }
}

impl<S: DocumentStore> QueryEngine<S> {
    /// Functions, events and errors across indexed deployments.
    pub async fn search_functions(&self, request: &AbiSearch) -> Result<Page<SearchResult>> {
        self.search_abi(request, FUNCTION_KINDS).await
    }

    pub async fn search_contracts(&self, request: &AbiSearch) -> Result<Page<SearchResult>> {
        self.search_abi(request, CONTRACT_KINDS).await
    }

    async fn search_abi(&self, request: &AbiSearch, kinds: &[&str]) -> Result<Page<SearchResult>> {
        let term = request
            .query
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty());
        let query = compose_abi_query(term, kinds, &request.chain_ids).to_string();
        let limit = self.window(request.limit);
        debug!(query = %query, limit, "searching abi index");

        let reply = self
            .store
            .search(
                SearchCommand::new(self.config.abi_index.clone(), query)
                    .sort_by(TIMESTAMP_FIELD, SortOrder::Desc)
                    .window(0, limit),
            )
            .await?;

        let mut data: Vec<SearchResult> = reply
            .documents
            .iter()
            .filter_map(|document| classify(&document.key, &document.fields))
            .filter_map(|record| match record {
                StoredRecord::Function(raw) => transform_function(&raw, FunctionKind::Function)
                    .map(SearchResult::Function),
                StoredRecord::Event(raw) => {
                    transform_function(&raw, FunctionKind::Event).map(SearchResult::Function)
                }
                StoredRecord::Error(raw) => {
                    transform_function(&raw, FunctionKind::Error).map(SearchResult::Function)
                }
                StoredRecord::Contract(raw) => {
                    transform_contract(&raw).map(SearchResult::Contract)
                }
                StoredRecord::Package(_) | StoredRecord::Tag(_) => None,
            })
            .collect();

        if let Some(AbiTerm::Name(name)) = term.map(classify_abi_term) {
            rank_by_name(&mut data, name);
        }

        Ok(Page {
            total: reply.total,
            data,
        })
    }
}
