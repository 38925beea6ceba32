use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::db::models::{Namespace, Package, Page, SearchResult, StoredRecord};
use crate::db::{
    AggregateCommand, Batch, DocumentStore, Fields, Reducer, SearchCommand, SortOrder, next_reply,
};
use crate::dsl::{NAME_FIELD, TIMESTAMP_FIELD, compose_package_query};
use crate::engine::QueryEngine;
use crate::error::Result;
use crate::ranking::rank_by_name;
use crate::transform::{
    classify, find_package_by_tag, transform_package, transform_package_with_tag,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSearch {
    pub query: Option<String>,
    #[serde(default)]
    pub chain_ids: Vec<u64>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub include_namespaces: bool,
}

impl PackageSearch {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    fn term(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }
}

impl<S: DocumentStore> QueryEngine<S> {
    /// Fuzzy package search, optionally with per-namespace counts.
    ///
    /// Namespace entries come first, then packages newest first; a query term
    /// re-sorts the whole list by edit distance. `total` adds the search and
    /// aggregation totals.
    pub async fn search_packages(&self, request: &PackageSearch) -> Result<Page<SearchResult>> {
        let term = request.term();
        let query = compose_package_query(term, &request.chain_ids).to_string();
        let limit = self.window(request.limit);

        debug!(
            query = %query,
            limit,
            include_namespaces = request.include_namespaces,
            "searching packages"
        );

        let mut batch = Batch::new().search(
            SearchCommand::new(self.config.package_index.clone(), query.clone())
                .sort_by(TIMESTAMP_FIELD, SortOrder::Desc)
                .window(0, limit),
        );
        if request.include_namespaces {
            batch = batch.aggregate(
                AggregateCommand::new(
                    self.config.package_index.clone(),
                    query,
                    NAME_FIELD,
                    Reducer::Count,
                )
                .window(0, limit),
            );
        }

        let mut replies = self.store.execute(batch).await?.into_iter();
        let search = next_reply(&mut replies)?.into_search()?;

        let records: Vec<StoredRecord> = search
            .documents
            .iter()
            .filter_map(|document| classify(&document.key, &document.fields))
            .collect();

        let mut total = search.total;
        let mut data = Vec::with_capacity(records.len());

        if request.include_namespaces {
            let aggregate = next_reply(&mut replies)?.into_aggregate()?;
            total += aggregate.total;
            data.extend(
                aggregate
                    .rows
                    .iter()
                    .filter_map(namespace_from_row)
                    .map(SearchResult::Namespace),
            );
        }

        data.extend(resolve_page(&records).into_iter().map(SearchResult::Package));

        if let Some(term) = term {
            rank_by_name(&mut data, term);
        }

        Ok(Page { total, data })
    }
}

/// Packages of one result page, tags resolved against packages in the same
/// page only. A tag whose target fell outside the page is dropped.
pub(crate) fn resolve_page(records: &[StoredRecord]) -> Vec<Package> {
    records
        .iter()
        .filter_map(|record| match record {
            StoredRecord::Package(package) => Some(transform_package(package)),
            StoredRecord::Tag(tag) => match find_package_by_tag(records, tag) {
                Some(package) => Some(transform_package_with_tag(package, tag)),
                None => {
                    warn!(
                        name = %tag.name,
                        tag = %tag.tag,
                        preset = %tag.preset,
                        chain_id = %tag.chain_id,
                        version = %tag.version_of_tag,
                        "dangling tag, target package not in result page"
                    );
                    None
                }
            },
            _ => None,
        })
        .collect()
}

fn namespace_from_row(row: &Fields) -> Option<Namespace> {
    let name = row.get(NAME_FIELD).filter(|name| !name.is_empty())?;
    let count = row
        .get("count")
        .and_then(|count| count.parse().ok())
        .unwrap_or_default();
    Some(Namespace {
        name: name.clone(),
        count,
    })
}
