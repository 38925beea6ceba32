pub mod abi_service;
pub mod chain_service;
pub mod package_service;
pub mod search_service;
