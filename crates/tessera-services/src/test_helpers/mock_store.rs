//! Mock descriptor store for testing without a database

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tessera_core::models::{ArchiveStats, DescriptorFilter, NewDescriptor, StoredObjectDescriptor};
use tessera_core::AppError;
use tessera_db::DescriptorStore;
use uuid::Uuid;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// In-memory descriptor table
///
/// Enforces `(owning_session_id, storage_key)` uniqueness like the real table.
#[derive(Clone, Default)]
pub struct MockDescriptorStore {
    rows: Arc<Mutex<Vec<StoredObjectDescriptor>>>,
    failing_files: Arc<Mutex<HashSet<String>>>,
    fail_next: Arc<AtomicUsize>,
    insert_calls: Arc<AtomicUsize>,
}

impl MockDescriptorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` inserts, whatever they contain.
    pub fn fail_next_inserts(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Fail every insert for this original file name.
    pub fn fail_inserts_for(&self, file_name: &str) {
        lock(&self.failing_files).insert(file_name.to_string());
    }

    /// Seed a row directly, e.g. with a past `created_at`.
    pub fn add_row(&self, row: StoredObjectDescriptor) {
        lock(&self.rows).push(row);
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn rows(&self) -> Vec<StoredObjectDescriptor> {
        lock(&self.rows).clone()
    }

    fn take_injected_failure(&self) -> bool {
        self.fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl DescriptorStore for MockDescriptorStore {
    async fn insert(&self, descriptor: NewDescriptor) -> Result<StoredObjectDescriptor, AppError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);

        if self.take_injected_failure() || lock(&self.failing_files).contains(&descriptor.file_name)
        {
            return Err(AppError::Internal("injected insert failure".to_string()));
        }
        if let Some(field) = descriptor.missing_field() {
            return Err(AppError::InvalidInput(format!("{} must not be empty", field)));
        }

        let mut rows = lock(&self.rows);
        if rows.iter().any(|r| {
            r.owning_session_id == descriptor.owning_session_id
                && r.storage_key == descriptor.storage_key
        }) {
            return Err(AppError::InvalidInput(format!(
                "duplicate storage key {}",
                descriptor.storage_key
            )));
        }

        let stored = StoredObjectDescriptor::from_new(descriptor, Uuid::new_v4(), Utc::now());
        rows.push(stored.clone());
        Ok(stored)
    }

    async fn list_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<StoredObjectDescriptor>, AppError> {
        let mut rows: Vec<_> = lock(&self.rows)
            .iter()
            .filter(|r| r.owning_session_id == session_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn list(
        &self,
        filter: &DescriptorFilter,
    ) -> Result<Vec<StoredObjectDescriptor>, AppError> {
        let mut rows: Vec<_> = lock(&self.rows)
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn stats(&self, since: DateTime<Utc>) -> Result<ArchiveStats, AppError> {
        let rows = lock(&self.rows);
        let sessions: HashSet<&str> = rows.iter().map(|r| r.owning_session_id.as_str()).collect();
        Ok(ArchiveStats {
            total_objects: rows.len() as i64,
            sessions_with_uploads: sessions.len() as i64,
            recent_uploads: rows.iter().filter(|r| r.created_at >= since).count() as i64,
        })
    }
}
