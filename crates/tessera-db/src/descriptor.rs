use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tessera_core::models::{ArchiveStats, DescriptorFilter, NewDescriptor, StoredObjectDescriptor};
use tessera_core::AppError;
use uuid::Uuid;

/// Relational metadata store for upload descriptors.
///
/// Uniqueness of `(owning_session_id, storage_key)` is enforced here, not by callers.
#[async_trait::async_trait]
pub trait DescriptorStore: Send + Sync {
    /// Persist one descriptor. One call, one row.
    async fn insert(&self, descriptor: NewDescriptor) -> Result<StoredObjectDescriptor, AppError>;

    /// Descriptors for a session, newest first.
    async fn list_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<StoredObjectDescriptor>, AppError>;

    /// Descriptors across sessions, newest first, narrowed by `filter`.
    async fn list(
        &self,
        filter: &DescriptorFilter,
    ) -> Result<Vec<StoredObjectDescriptor>, AppError>;

    /// Archive counters; `recent_uploads` counts rows created at or after `since`.
    async fn stats(&self, since: DateTime<Utc>) -> Result<ArchiveStats, AppError>;
}

#[derive(Clone)]
pub struct PgDescriptorRepository {
    pool: PgPool,
}

impl PgDescriptorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl DescriptorStore for PgDescriptorRepository {
    #[tracing::instrument(skip(self, descriptor), fields(
        db.system = "postgresql",
        db.table = "stored_objects",
        db.operation = "insert",
        storage_key = %descriptor.storage_key
    ))]
    async fn insert(&self, descriptor: NewDescriptor) -> Result<StoredObjectDescriptor, AppError> {
        if let Some(field) = descriptor.missing_field() {
            return Err(AppError::InvalidInput(format!("{} must not be empty", field)));
        }

        let row = sqlx::query_as::<_, StoredObjectDescriptor>(
            r#"
            INSERT INTO stored_objects (
                id, owning_session_id, uploaded_by, file_name, storage_key,
                file_size, mime_type, caption
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, owning_session_id, uploaded_by, file_name, storage_key,
                      file_size, mime_type, caption, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&descriptor.owning_session_id)
        .bind(&descriptor.uploaded_by)
        .bind(&descriptor.file_name)
        .bind(&descriptor.storage_key)
        .bind(descriptor.file_size)
        .bind(&descriptor.mime_type)
        .bind(&descriptor.caption)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(
                error = ?e,
                session_id = %descriptor.owning_session_id,
                "Failed to insert descriptor"
            );
            AppError::from(e)
        })?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(
        db.system = "postgresql",
        db.table = "stored_objects",
        db.operation = "select"
    ))]
    async fn list_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<StoredObjectDescriptor>, AppError> {
        let rows = sqlx::query_as::<_, StoredObjectDescriptor>(
            r#"
            SELECT id, owning_session_id, uploaded_by, file_name, storage_key,
                   file_size, mime_type, caption, created_at
            FROM stored_objects
            WHERE owning_session_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    #[tracing::instrument(skip(self), fields(
        db.system = "postgresql",
        db.table = "stored_objects",
        db.operation = "select"
    ))]
    async fn list(
        &self,
        filter: &DescriptorFilter,
    ) -> Result<Vec<StoredObjectDescriptor>, AppError> {
        let rows = sqlx::query_as::<_, StoredObjectDescriptor>(
            r#"
            SELECT id, owning_session_id, uploaded_by, file_name, storage_key,
                   file_size, mime_type, caption, created_at
            FROM stored_objects
            WHERE ($1::TEXT IS NULL OR owning_session_id = $1)
              AND ($2::TEXT IS NULL OR caption ILIKE $2 OR file_name ILIKE $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.session_id.as_deref())
        .bind(filter.search.as_deref().map(like_pattern))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    #[tracing::instrument(skip(self), fields(
        db.system = "postgresql",
        db.table = "stored_objects",
        db.operation = "aggregate"
    ))]
    async fn stats(&self, since: DateTime<Utc>) -> Result<ArchiveStats, AppError> {
        let (total_objects, sessions_with_uploads, recent_uploads): (i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    COUNT(*),
                    COUNT(DISTINCT owning_session_id),
                    COUNT(*) FILTER (WHERE created_at >= $1)
                FROM stored_objects
                "#,
            )
            .bind(since)
            .fetch_one(&self.pool)
            .await?;

        Ok(ArchiveStats {
            total_objects,
            sessions_with_uploads,
            recent_uploads,
        })
    }
}

/// `%term%` with LIKE wildcards in `term` matched literally.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
