use crate::application_port::AuthError;
use crate::domain_model::UserId;
use crate::domain_port::{AuthSessionStore, SessionSlot, UserRepo, UserUpdate};
use std::sync::Arc;

/// Keeps the refresh slot as a field on the user document, so revocation
/// never needs a separate table or a scan.
pub struct UserRecordSessionStore {
    user_repo: Arc<dyn UserRepo>,
}

impl UserRecordSessionStore {
    pub fn new(user_repo: Arc<dyn UserRepo>) -> Self {
        UserRecordSessionStore { user_repo }
    }
}

#[async_trait::async_trait]
impl AuthSessionStore for UserRecordSessionStore {
    async fn load(&self, user_id: UserId) -> Result<Option<SessionSlot>, AuthError> {
        let slot = self.user_repo.find_by_id(user_id).await?.map(|user| SessionSlot {
            refresh_token_hash: user.refresh_token_hash.clone(),
            user,
        });
        Ok(slot)
    }

    async fn save_refresh_hash(&self, user_id: UserId, hash: &str) -> Result<(), AuthError> {
        let update = UserUpdate {
            refresh_token_hash: Some(Some(hash.to_string())),
            ..UserUpdate::default()
        };
        if !self.user_repo.update(user_id, update).await? {
            return Err(AuthError::Store(format!("user {user_id} vanished during save")));
        }
        Ok(())
    }

    async fn rotate_refresh_hash(
        &self,
        user_id: UserId,
        current: &str,
        next: Option<&str>,
    ) -> Result<bool, AuthError> {
        self.user_repo
            .compare_and_set_refresh_hash(user_id, current, next)
            .await
    }
}
