use serde::{Deserialize, Serialize};

/// Stored package hash, numeric fields still in their string form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPackage {
    pub name: String,
    pub version: String,
    pub preset: String,
    pub chain_id: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub deploy_url: String,
    #[serde(default)]
    pub meta_url: String,
    #[serde(default)]
    pub misc_url: String,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTag {
    pub name: String,
    pub tag: String,
    pub preset: String,
    pub chain_id: String,
    pub version_of_tag: String,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawContract {
    pub name: String,
    pub address: String,
    pub chain_id: String,
    pub package: String,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFunction {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub selector: String,
    #[serde(default)]
    pub contract_name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub chain_id: String,
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub timestamp: String,
}

/// A stored hash classified by its `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoredRecord {
    Package(RawPackage),
    Tag(RawTag),
    Contract(RawContract),
    Function(RawFunction),
    Event(RawFunction),
    Error(RawFunction),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub name: String,
    pub version: String,
    pub preset: String,
    pub chain_id: u64,
    pub owner: String,
    pub deploy_url: String,
    pub meta_url: String,
    pub misc_url: String,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub name: String,
    pub address: String,
    pub chain_id: u64,
    pub package: String,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionKind {
    Function,
    Event,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Function {
    pub name: String,
    pub kind: FunctionKind,
    pub selector: String,
    pub contract_name: String,
    pub address: String,
    pub chain_id: u64,
    pub package: String,
    pub timestamp: u64,
}

/// One entry of a heterogeneous result list, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SearchResult {
    Package(Package),
    Namespace(Namespace),
    Contract(Contract),
    Function(Function),
}

impl SearchResult {
    pub fn name(&self) -> &str {
        match self {
            SearchResult::Package(package) => &package.name,
            SearchResult::Namespace(namespace) => &namespace.name,
            SearchResult::Contract(contract) => &contract.name,
            SearchResult::Function(function) => &function.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainCount {
    pub chain_id: u64,
    pub count: u64,
}

/// `total` may exceed `data.len()`: windowing and dropped records are not
/// compensated for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub total: u64,
    pub data: Vec<T>,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            total: 0,
            data: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn search_result_serializes_with_type_tag() {
        let result = SearchResult::Namespace(Namespace {
            name: "foo".to_string(),
            count: 3,
        });
        let value = serde_json::to_value(&result).expect("serialize");
        assert_eq!(value, json!({"type": "namespace", "name": "foo", "count": 3}));
    }

    #[test]
    fn package_serializes_numbers_and_camel_case() {
        let result = SearchResult::Package(Package {
            name: "vault".to_string(),
            version: "1.0.0".to_string(),
            preset: "main".to_string(),
            chain_id: 10,
            owner: "0xabc".to_string(),
            deploy_url: "ipfs://deploy".to_string(),
            meta_url: "ipfs://meta".to_string(),
            misc_url: "ipfs://misc".to_string(),
            timestamp: 1700000000,
        });
        let value = serde_json::to_value(&result).expect("serialize");
        assert_eq!(value["type"], "package");
        assert_eq!(value["chainId"], 10);
        assert_eq!(value["deployUrl"], "ipfs://deploy");
        assert!(value["timestamp"].is_u64());
    }
}
