use tracing::{debug, warn};

use crate::db::models::{Package, Page, RawTag, StoredRecord};
use crate::db::{Batch, DocumentStore, SearchCommand, SortOrder, next_reply};
use crate::dsl::{TIMESTAMP_FIELD, compose_name_query};
use crate::engine::QueryEngine;
use crate::error::{RegistryError, Result};
use crate::package_ref::{PackageRef, is_valid_name};
use crate::services::search_service::resolve_page;
use crate::transform::{classify, is_tag_target, transform_package, transform_package_with_tag};

/// A fetched record waiting for its final shape.
enum Slot {
    Ready(Package),
    Tag(RawTag),
}

impl<S: DocumentStore> QueryEngine<S> {
    /// Looks up one package reference on every known chain.
    ///
    /// Tags are followed to their target package with a second round trip.
    /// Results keep chain id order.
    pub async fn find_packages_by_ref(&self, package_ref: &str) -> Result<Page<Package>> {
        let reference: PackageRef = package_ref.parse()?;
        let full_ref = reference.full_ref();

        let chain_ids = self.get_chain_ids().await?;
        if chain_ids.is_empty() {
            return Ok(Page::empty());
        }

        let batch = chain_ids.iter().fold(Batch::new(), |batch, chain_id| {
            batch.fetch(self.config.package_key(&full_ref, chain_id))
        });
        debug!(reference = %full_ref, fetches = batch.len(), "fetching package by ref");

        let mut slots = Vec::new();
        for reply in self.store.execute(batch).await? {
            let Some(fields) = reply.into_record()? else {
                continue;
            };
            match classify(&full_ref, &fields) {
                Some(StoredRecord::Package(package)) => {
                    slots.push(Slot::Ready(transform_package(&package)))
                }
                Some(StoredRecord::Tag(tag)) => slots.push(Slot::Tag(tag)),
                _ => {}
            }
        }

        let data = self.follow_tags(slots).await?;
        Ok(Page {
            total: data.len() as u64,
            data,
        })
    }

    /// Every version of the package named exactly `name`, newest first.
    pub async fn find_packages_by_name(&self, name: &str) -> Result<Page<Package>> {
        let name = name.trim();
        if !is_valid_name(name) {
            return Err(RegistryError::InvalidInput(format!(
                "invalid package name {:?}",
                name
            )));
        }

        let query = compose_name_query(name, &[]).to_string();
        debug!(query = %query, "searching packages by name");

        let reply = self
            .store
            .search(
                SearchCommand::new(self.config.package_index.clone(), query)
                    .sort_by(TIMESTAMP_FIELD, SortOrder::Desc)
                    .window(0, self.config.default_limit),
            )
            .await?;

        let records: Vec<StoredRecord> = reply
            .documents
            .iter()
            .filter_map(|document| classify(&document.key, &document.fields))
            .filter(|record| match record {
                StoredRecord::Package(package) => package.name == name,
                StoredRecord::Tag(tag) => tag.name == name,
                _ => false,
            })
            .collect();

        let data = resolve_page(&records);
        if data.is_empty() {
            return Err(RegistryError::NotFound(format!("package {:?}", name)));
        }
        Ok(Page {
            total: data.len() as u64,
            data,
        })
    }

    async fn follow_tags(&self, slots: Vec<Slot>) -> Result<Vec<Package>> {
        let batch = slots.iter().fold(Batch::new(), |batch, slot| match slot {
            Slot::Tag(tag) => batch.fetch(self.config.package_key(
                &format!("{}:{}@{}", tag.name, tag.version_of_tag, tag.preset),
                &tag.chain_id,
            )),
            Slot::Ready(_) => batch,
        });

        if batch.is_empty() {
            return Ok(slots
                .into_iter()
                .filter_map(|slot| match slot {
                    Slot::Ready(package) => Some(package),
                    Slot::Tag(_) => None,
                })
                .collect());
        }

        debug!(fetches = batch.len(), "resolving tags");
        let mut replies = self.store.execute(batch).await?.into_iter();

        let mut data = Vec::with_capacity(slots.len());
        for slot in slots {
            match slot {
                Slot::Ready(package) => data.push(package),
                Slot::Tag(tag) => {
                    let target = next_reply(&mut replies)?
                        .into_record()?
                        .and_then(|fields| classify(&tag.name, &fields));
                    match target {
                        Some(StoredRecord::Package(package)) if is_tag_target(&package, &tag) => {
                            data.push(transform_package_with_tag(&package, &tag))
                        }
                        _ => warn!(
                            name = %tag.name,
                            tag = %tag.tag,
                            preset = %tag.preset,
                            chain_id = %tag.chain_id,
                            version = %tag.version_of_tag,
                            "dangling tag, target package not found"
                        ),
                    }
                }
            }
        }
        Ok(data)
    }
}
