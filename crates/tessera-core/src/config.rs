//! Configuration module
//!
//! Upload admission rules, bucket names, storage backend and database settings,
//! all read from the environment (with `.env` support).

use std::env;

use crate::constants::{
    DEFAULT_DOCUMENT_BUCKET, DEFAULT_DOCUMENT_CONTENT_TYPES, DEFAULT_DOCUMENT_EXTENSIONS,
    DEFAULT_EVENT_CAPACITY, DEFAULT_IMAGE_BUCKET, DEFAULT_IMAGE_CONTENT_TYPES,
    DEFAULT_IMAGE_EXTENSIONS, DEFAULT_MAX_FILE_SIZE_BYTES,
};
use crate::storage_types::StorageBackend;

const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug)]
pub struct TesseraConfig {
    // Admission rules
    pub max_file_size_bytes: usize,
    pub image_content_types: Vec<String>,
    pub image_extensions: Vec<String>,
    pub document_content_types: Vec<String>,
    pub document_extensions: Vec<String>,
    // Buckets
    pub image_bucket: String,
    pub document_bucket: String,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    // Database configuration
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Upload event bus
    pub event_channel_capacity: usize,
}

fn list_from_env(key: &str, default: &[&str]) -> Vec<String> {
    match env::var(key) {
        Ok(value) => value
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect(),
        Err(_) => default.iter().map(|s| s.to_string()).collect(),
    }
}

/// `MAX_FILE_SIZE_MB` value in bytes.
fn parse_megabytes(value: &str) -> Result<usize, anyhow::Error> {
    let mb = value
        .trim()
        .parse::<usize>()
        .map_err(|e| anyhow::anyhow!("MAX_FILE_SIZE_MB is not a number: {}", e))?;
    mb.checked_mul(1024 * 1024)
        .ok_or_else(|| anyhow::anyhow!("MAX_FILE_SIZE_MB is too large: {}", mb))
}

impl Default for TesseraConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            image_content_types: DEFAULT_IMAGE_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            image_extensions: DEFAULT_IMAGE_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            document_content_types: DEFAULT_DOCUMENT_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            document_extensions: DEFAULT_DOCUMENT_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            image_bucket: DEFAULT_IMAGE_BUCKET.to_string(),
            document_bucket: DEFAULT_DOCUMENT_BUCKET.to_string(),
            storage_backend: StorageBackend::Local,
            local_storage_path: None,
            local_storage_base_url: None,
            s3_region: None,
            s3_endpoint: None,
            database_url: None,
            db_max_connections: MAX_CONNECTIONS,
            db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
            event_channel_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl TesseraConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let max_file_size_bytes = match env::var("MAX_FILE_SIZE_MB") {
            Ok(mb) => parse_megabytes(&mb)?,
            Err(_) => defaults.max_file_size_bytes,
        };

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(s) => s.parse()?,
            Err(_) => defaults.storage_backend,
        };

        let config = Self {
            max_file_size_bytes,
            image_content_types: list_from_env("IMAGE_CONTENT_TYPES", DEFAULT_IMAGE_CONTENT_TYPES),
            image_extensions: list_from_env("IMAGE_EXTENSIONS", DEFAULT_IMAGE_EXTENSIONS),
            document_content_types: list_from_env(
                "DOCUMENT_CONTENT_TYPES",
                DEFAULT_DOCUMENT_CONTENT_TYPES,
            ),
            document_extensions: list_from_env("DOCUMENT_EXTENSIONS", DEFAULT_DOCUMENT_EXTENSIONS),
            image_bucket: env::var("IMAGE_BUCKET").unwrap_or(defaults.image_bucket),
            document_bucket: env::var("DOCUMENT_BUCKET").unwrap_or(defaults.document_bucket),
            storage_backend,
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            s3_region: env::var("S3_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            database_url: env::var("DATABASE_URL").ok(),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            event_channel_capacity: env::var("UPLOAD_EVENT_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_EVENT_CAPACITY),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_file_size_bytes == 0 {
            anyhow::bail!("MAX_FILE_SIZE_MB must be greater than zero");
        }
        if self.image_bucket.trim().is_empty() || self.document_bucket.trim().is_empty() {
            anyhow::bail!("IMAGE_BUCKET and DOCUMENT_BUCKET must not be empty");
        }
        if self.image_bucket == self.document_bucket {
            anyhow::bail!(
                "IMAGE_BUCKET and DOCUMENT_BUCKET must differ (both are '{}')",
                self.image_bucket
            );
        }
        if let Some(ct) = self
            .image_content_types
            .iter()
            .find(|ct| !ct.starts_with("image/"))
        {
            anyhow::bail!("IMAGE_CONTENT_TYPES entry '{}' is not an image type", ct);
        }
        if let Some(ct) = self
            .document_content_types
            .iter()
            .find(|ct| ct.starts_with("image/"))
        {
            anyhow::bail!("DOCUMENT_CONTENT_TYPES entry '{}' is an image type", ct);
        }
        if self.event_channel_capacity == 0 {
            anyhow::bail!("UPLOAD_EVENT_CAPACITY must be greater than zero");
        }
        Ok(())
    }

    /// Every admitted MIME type, images first.
    pub fn allowed_content_types(&self) -> Vec<String> {
        self.image_content_types
            .iter()
            .chain(self.document_content_types.iter())
            .cloned()
            .collect()
    }
}
