//! Tessera Storage Library
//!
//! This crate provides the object storage collaborator used by the upload
//! pipeline: the `Storage` trait plus S3 and local filesystem backends.
//!
//! # Storage layout
//!
//! Objects live in one of two buckets (images, documents). Inside a bucket,
//! keys are scoped by owning session:
//!
//! - `{session_id}/{unix_millis}-{random}.{ext}`
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized in
//! the `keys` module so every upload gets a fresh key.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::{generate_storage_key, validate_key};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use tessera_core::StorageBackend;
pub use traits::{Storage, StorageError, StorageResult};
