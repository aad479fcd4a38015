use crate::application_port::AuthError;
use crate::domain_model::{UserId, UserSummary};

#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    async fn profile(&self, user_id: UserId) -> Result<UserSummary, AuthError>;
}
