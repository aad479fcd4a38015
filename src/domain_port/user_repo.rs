use crate::application_port::*;
use crate::domain_model::*;

#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_id: UserId,
    /// Already normalized.
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

/// Partial update. `None` leaves a field untouched; for `refresh_token_hash`,
/// `Some(None)` clears the slot.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub refresh_token_hash: Option<Option<String>>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password_hash.is_none() && self.refresh_token_hash.is_none()
    }
}

#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    /// Fails with [`AuthError::Conflict`] when the email is already taken.
    async fn create(&self, user: NewUser) -> Result<UserRecord, AuthError>;

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, AuthError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError>;

    /// Returns `false` when no such user exists.
    async fn update(&self, user_id: UserId, update: UserUpdate) -> Result<bool, AuthError>;

    /// Atomically replace the refresh hash, only if it still equals `expected`.
    async fn compare_and_set_refresh_hash(
        &self,
        user_id: UserId,
        expected: &str,
        new: Option<&str>,
    ) -> Result<bool, AuthError>;
}
