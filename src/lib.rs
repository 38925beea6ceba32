pub mod cache;
pub mod config;
pub mod db;
pub mod dsl;
pub mod engine;
pub mod error;
pub mod package_ref;
pub mod ranking;
pub mod services;
pub mod transform;

pub use config::EngineConfig;
pub use db::models::{
    ChainCount, Contract, Function, FunctionKind, Namespace, Package, Page, SearchResult,
};
pub use db::{Batch, DocumentStore, StoreError};
pub use engine::QueryEngine;
pub use error::{RegistryError, Result};
pub use package_ref::PackageRef;
pub use services::abi_service::AbiSearch;
pub use services::search_service::PackageSearch;

#[cfg(feature = "redis")]
pub use db::redis_store::RedisStore;
