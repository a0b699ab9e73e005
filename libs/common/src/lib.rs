//! Common library for the YESS Go client core
//!
//! This crate provides shared functionality used across the client
//! services, including persisted key/value storage, error handling,
//! and other common utilities.

pub mod error;
pub mod storage;

/// Example usage of the storage module
///
/// ```rust,no_run
/// use common::storage::{SharedStorage, StorageConfig};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = StorageConfig::from_env()?;
///     let storage = SharedStorage::open(&config)?;
///     let context = storage.context();
///     context.set("token", "opaque-bearer-token");
///     println!("token = {:?}", context.get("token"));
///     Ok(())
/// }
/// ```
pub fn example_usage() {}
