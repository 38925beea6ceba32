use thiserror::Error;

use crate::db::StoreError;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
