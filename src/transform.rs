//! Raw stored hashes to public result shapes.
//!
//! Tags never carry content pointers of their own. A tag resolved to its
//! target package takes identity and recency from the tag and the URLs and
//! owner from the package.

use serde::Deserialize;
use serde::de::value::{Error as ValueError, MapDeserializer};
use tracing::warn;

use crate::db::Fields;
use crate::db::models::{
    Contract, Function, FunctionKind, Package, RawContract, RawFunction, RawPackage, RawTag,
    StoredRecord,
};
use crate::dsl::hex_len;
use crate::package_ref::is_full_ref;

/// Classifies a stored hash by its `type` field. Unknown kinds and hashes
/// missing required fields yield `None`.
pub fn classify(key: &str, fields: &Fields) -> Option<StoredRecord> {
    let entries = fields.iter().map(|(k, v)| (k.as_str(), v.as_str()));
    match StoredRecord::deserialize(MapDeserializer::<_, ValueError>::new(entries)) {
        Ok(record) => Some(record),
        Err(err) => {
            warn!(key = %key, error = %err, "skipping unrecognized record");
            None
        }
    }
}

pub fn transform_package(raw: &RawPackage) -> Package {
    Package {
        name: raw.name.clone(),
        version: raw.version.clone(),
        preset: raw.preset.clone(),
        chain_id: parse_number(&raw.chain_id),
        owner: raw.owner.clone(),
        deploy_url: raw.deploy_url.clone(),
        meta_url: raw.meta_url.clone(),
        misc_url: raw.misc_url.clone(),
        timestamp: parse_number(&raw.timestamp),
    }
}

pub fn transform_package_with_tag(package: &RawPackage, tag: &RawTag) -> Package {
    Package {
        name: tag.name.clone(),
        version: tag.tag.clone(),
        preset: tag.preset.clone(),
        chain_id: parse_number(&tag.chain_id),
        owner: package.owner.clone(),
        deploy_url: package.deploy_url.clone(),
        meta_url: package.meta_url.clone(),
        misc_url: package.misc_url.clone(),
        timestamp: parse_number(&tag.timestamp),
    }
}

/// Finds the package a tag points at among already fetched records.
pub fn find_package_by_tag<'a>(
    records: &'a [StoredRecord],
    tag: &RawTag,
) -> Option<&'a RawPackage> {
    records.iter().find_map(|record| match record {
        StoredRecord::Package(package) if is_tag_target(package, tag) => Some(package),
        _ => None,
    })
}

pub fn is_tag_target(package: &RawPackage, tag: &RawTag) -> bool {
    package.name == tag.name
        && package.preset == tag.preset
        && package.chain_id == tag.chain_id
        && package.version == tag.version_of_tag
}

pub fn transform_function(raw: &RawFunction, kind: FunctionKind) -> Option<Function> {
    let problem = if raw.name.is_empty() {
        Some("empty name")
    } else if !matches!(hex_len(&raw.selector), Some(8) | Some(64)) {
        Some("malformed selector")
    } else if !is_decimal(&raw.timestamp) {
        Some("malformed timestamp")
    } else if !is_full_ref(&raw.package) {
        Some("invalid package reference")
    } else if parse_chain_id(&raw.chain_id).is_none() {
        Some("invalid chain id")
    } else if !is_address(&raw.address) {
        Some("invalid address")
    } else if raw.contract_name.is_empty() {
        Some("empty contract name")
    } else {
        None
    };

    if let Some(problem) = problem {
        warn!(
            name = %raw.name,
            selector = %raw.selector,
            package = %raw.package,
            problem,
            "skipping malformed function record"
        );
        return None;
    }

    Some(Function {
        name: raw.name.clone(),
        kind,
        selector: raw.selector.clone(),
        contract_name: raw.contract_name.clone(),
        address: raw.address.clone(),
        chain_id: parse_chain_id(&raw.chain_id)?,
        package: raw.package.clone(),
        timestamp: parse_number(&raw.timestamp),
    })
}

pub fn transform_contract(raw: &RawContract) -> Option<Contract> {
    let chain_id = parse_chain_id(&raw.chain_id);
    let valid = !raw.name.is_empty()
        && is_address(&raw.address)
        && is_full_ref(&raw.package)
        && chain_id.is_some();

    if !valid {
        warn!(
            name = %raw.name,
            address = %raw.address,
            package = %raw.package,
            "skipping malformed contract record"
        );
        return None;
    }

    Some(Contract {
        name: raw.name.clone(),
        address: raw.address.clone(),
        chain_id: chain_id?,
        package: raw.package.clone(),
        timestamp: parse_number(&raw.timestamp),
    })
}

// Invalid stored numbers read as 0; the producer validates at indexing time.
fn parse_number(value: &str) -> u64 {
    value.trim().parse().unwrap_or_default()
}

fn parse_chain_id(value: &str) -> Option<u64> {
    value.parse().ok().filter(|id| *id > 0)
}

fn is_decimal(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|ch| ch.is_ascii_digit())
}

fn is_address(value: &str) -> bool {
    hex_len(value) == Some(40)
}
