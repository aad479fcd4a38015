use crate::application_port::*;
use crate::domain_model::*;

/// The single refresh slot of a user, as seen by the session store.
#[derive(Debug, Clone)]
pub struct SessionSlot {
    pub user: UserRecord,
    pub refresh_token_hash: Option<String>,
}

#[async_trait::async_trait]
pub trait AuthSessionStore: Send + Sync {
    /// `None` when the user does not exist.
    async fn load(&self, user_id: UserId) -> Result<Option<SessionSlot>, AuthError>;

    /// Unconditionally overwrite the stored hash (login, register).
    async fn save_refresh_hash(&self, user_id: UserId, hash: &str) -> Result<(), AuthError>;

    /// Replace the stored hash only if it still equals `current`. `next = None` logs out.
    /// Returns `false` when another request rotated the slot first.
    async fn rotate_refresh_hash(
        &self,
        user_id: UserId,
        current: &str,
        next: Option<&str>,
    ) -> Result<bool, AuthError>;
}
