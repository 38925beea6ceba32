use std::fmt;
use std::time::Duration;

/// Window applied when a caller does not pass a limit.
pub const DEFAULT_LIMIT: usize = 500;

/// Upper bounds for the chain-id cache.
pub const MAX_CHAIN_CACHE_TTL: Duration = Duration::from_secs(60);
pub const MAX_CHAIN_CACHE_CAPACITY: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Full-text index over package and tag hashes.
    pub package_index: String,
    /// Full-text index over contract and function/event/error hashes.
    pub abi_index: String,
    /// Prefix of package and tag hash keys, `<prefix>:<ref>#<chainId>`.
    pub key_prefix: String,
    pub default_limit: usize,
    pub chain_cache_ttl: Duration,
    pub chain_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            package_index: "idx:package".to_string(),
            abi_index: "idx:abi".to_string(),
            key_prefix: "reg:package".to_string(),
            default_limit: DEFAULT_LIMIT,
            chain_cache_ttl: MAX_CHAIN_CACHE_TTL,
            chain_cache_capacity: MAX_CHAIN_CACHE_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub fn package_key(&self, full_ref: &str, chain_id: impl fmt::Display) -> String {
        format!("{}:{}#{}", self.key_prefix, full_ref, chain_id)
    }
}
