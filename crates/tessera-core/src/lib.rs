//! Tessera Core Library
//!
//! This crate provides the domain models, error taxonomy, configuration and
//! collaborator hooks shared by every Tessera component.

pub mod config;
pub mod constants;
pub mod error;
pub mod hooks;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::TesseraConfig;
pub use error::{AppError, ErrorMetadata, LogLevel, UploadError};
pub use hooks::{IdentityProvider, StaticIdentity, UploaderIdentity};
pub use storage_types::StorageBackend;
