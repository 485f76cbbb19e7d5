//! Hooks for the session/identity collaborator
//!
//! Authentication and role resolution live outside this workspace. The upload
//! orchestrator only needs to know who is uploading, and asks once per batch.

use async_trait::async_trait;

/// Identity of the user submitting a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploaderIdentity {
    pub user_id: String,
}

/// Supplies the uploader id for a batch submission.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_uploader(&self) -> Result<UploaderIdentity, String>;
}

/// Identity fixed at construction (CLI, service accounts, tests).
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    user_id: String,
}

impl StaticIdentity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_uploader(&self) -> Result<UploaderIdentity, String> {
        if self.user_id.trim().is_empty() {
            return Err("no signed-in user".to_string());
        }
        Ok(UploaderIdentity {
            user_id: self.user_id.clone(),
        })
    }
}
