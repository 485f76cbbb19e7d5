//! Mock Storage implementation for testing

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tessera_storage::{Storage, StorageBackend, StorageError, StorageResult};

type ObjectMap = HashMap<(String, String), Bytes>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// In-memory object storage
///
/// Puts can be made to fail by payload or for every call, and can be delayed
/// to force interleaving between concurrent tasks.
#[derive(Clone, Default)]
pub struct MockStorage {
    objects: Arc<Mutex<ObjectMap>>,
    failing_payloads: Arc<Mutex<HashSet<Bytes>>>,
    fail_all: Arc<Mutex<bool>>,
    put_delay: Arc<Mutex<Option<Duration>>>,
    put_calls: Arc<AtomicUsize>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every put whose body equals `data`.
    pub fn fail_puts_with(&self, data: impl Into<Bytes>) {
        lock(&self.failing_payloads).insert(data.into());
    }

    pub fn fail_all_puts(&self, fail: bool) {
        *lock(&self.fail_all) = fail;
    }

    /// Sleep this long inside every put.
    pub fn set_put_delay(&self, delay: Duration) {
        *lock(&self.put_delay) = Some(delay);
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn object_count(&self) -> usize {
        lock(&self.objects).len()
    }

    pub fn get_object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        lock(&self.objects)
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Every stored `(bucket, key)`, sorted.
    pub fn keys(&self) -> Vec<(String, String)> {
        let mut keys: Vec<_> = lock(&self.objects).keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        _content_type: &str,
        data: Bytes,
    ) -> StorageResult<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *lock(&self.put_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if *lock(&self.fail_all) || lock(&self.failing_payloads).contains(&data) {
            return Err(StorageError::UploadFailed(format!(
                "injected failure for {}/{}",
                bucket, key
            )));
        }

        lock(&self.objects).insert((bucket.to_string(), key.to_string()), data);
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("http://mock-storage/{}/{}", bucket, key)
    }

    async fn download(&self, bucket: &str, key: &str) -> StorageResult<Bytes> {
        self.get_object(bucket, key)
            .ok_or_else(|| StorageError::NotFound(format!("{}/{}", bucket, key)))
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        lock(&self.objects).remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        Ok(self.get_object(bucket, key).is_some())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
