use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use humantime::parse_duration;
use registry::EngineConfig;
use registry::config::{MAX_CHAIN_CACHE_CAPACITY, MAX_CHAIN_CACHE_TTL};
use serde::Deserialize;

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub redis_url: String,
    pub engine: EngineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            engine: EngineConfig::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    redis: RawRedisConfig,
    #[serde(default)]
    index: RawIndexConfig,
    #[serde(default)]
    chain_cache: RawChainCacheConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRedisConfig {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawIndexConfig {
    package_index: Option<String>,
    abi_index: Option<String>,
    key_prefix: Option<String>,
    default_limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawChainCacheConfig {
    ttl: Option<String>,
    capacity: Option<usize>,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;

        let parsed: FileConfig = toml::from_str(&raw)
            .with_context(|| format!("failed to parse TOML {}", path.display()))?;

        Self::from_raw(parsed)
    }

    fn from_raw(raw: FileConfig) -> Result<Self> {
        let defaults = EngineConfig::default();

        let redis_url = raw
            .redis
            .url
            .unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());

        let chain_cache_ttl = match raw.chain_cache.ttl.as_deref() {
            Some(ttl) => parse_duration_string(ttl, "chain_cache.ttl")?,
            None => defaults.chain_cache_ttl,
        };

        let engine = EngineConfig {
            package_index: raw.index.package_index.unwrap_or(defaults.package_index),
            abi_index: raw.index.abi_index.unwrap_or(defaults.abi_index),
            key_prefix: raw.index.key_prefix.unwrap_or(defaults.key_prefix),
            default_limit: raw.index.default_limit.unwrap_or(defaults.default_limit),
            chain_cache_ttl,
            chain_cache_capacity: raw
                .chain_cache
                .capacity
                .unwrap_or(defaults.chain_cache_capacity),
        };

        let cfg = Self { redis_url, engine };
        cfg.validate_config()?;
        Ok(cfg)
    }

    pub fn validate_config(&self) -> Result<()> {
        if self.redis_url.trim().is_empty() {
            bail!("redis.url must not be empty");
        }
        if !self.redis_url.starts_with("redis://")
            && !self.redis_url.starts_with("rediss://")
            && !self.redis_url.starts_with("unix://")
        {
            bail!(
                "redis.url must use redis://, rediss:// or unix://, got '{}'",
                self.redis_url
            );
        }

        let engine = &self.engine;
        for (field, value) in [
            ("index.package_index", &engine.package_index),
            ("index.abi_index", &engine.abi_index),
            ("index.key_prefix", &engine.key_prefix),
        ] {
            if value.trim().is_empty() {
                bail!("{field} must not be empty");
            }
        }
        if engine.default_limit == 0 {
            bail!("index.default_limit must be greater than zero");
        }
        if engine.chain_cache_capacity == 0 {
            bail!("chain_cache.capacity must be greater than zero");
        }
        if engine.chain_cache_capacity > MAX_CHAIN_CACHE_CAPACITY {
            bail!(
                "chain_cache.capacity must be at most {MAX_CHAIN_CACHE_CAPACITY}, got {}",
                engine.chain_cache_capacity
            );
        }
        if engine.chain_cache_ttl > MAX_CHAIN_CACHE_TTL {
            bail!(
                "chain_cache.ttl must be at most {}, got {}",
                humantime::format_duration(MAX_CHAIN_CACHE_TTL),
                humantime::format_duration(engine.chain_cache_ttl)
            );
        }

        Ok(())
    }
}

fn parse_duration_string(value: &str, field: &str) -> Result<Duration> {
    let duration = parse_duration(value)
        .with_context(|| format!("invalid duration for {field}: '{value}'"))?;

    if duration.is_zero() {
        return Err(anyhow!("duration for {field} must be greater than zero"));
    }

    Ok(duration)
}
