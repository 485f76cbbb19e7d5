//! Test helpers for upload pipeline tests
//!
//! In-memory storage and descriptor store with failure injection, so the
//! orchestrator can be exercised without a database or object store.

pub mod mock_storage;
pub mod mock_store;

pub use mock_storage::MockStorage;
pub use mock_store::MockDescriptorStore;

use std::sync::Arc;

use tessera_core::StaticIdentity;

use crate::upload::UploadOrchestrator;

/// Orchestrator wired to the given mocks and a fixed uploader.
pub fn mock_orchestrator(
    storage: Arc<MockStorage>,
    store: Arc<MockDescriptorStore>,
    uploader_id: &str,
) -> UploadOrchestrator {
    UploadOrchestrator::new(
        storage,
        store,
        Arc::new(StaticIdentity::new(uploader_id)),
        256,
    )
}
