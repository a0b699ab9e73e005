//! Custom error types for the common library
//!
//! This module defines application-specific error types that can be used
//! throughout the application.

use std::io::Error as IoError;
use thiserror::Error;

/// Custom error type for persisted storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Error occurred while reading the storage snapshot file
    #[error("Storage file read error: {0}")]
    Read(#[source] IoError),

    /// Error occurred while writing the storage snapshot file
    #[error("Storage file write error: {0}")]
    Write(#[source] IoError),

    /// Configuration error
    #[error("Storage configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with StorageError
pub type StorageResult<T> = Result<T, StorageError>;
