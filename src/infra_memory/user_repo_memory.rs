use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Process-local user store. The email index plays the role of a unique index.
#[derive(Default)]
pub struct MemoryUserRepo {
    users: DashMap<UserId, UserRecord>,
    emails: DashMap<String, UserId>,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait::async_trait]
impl UserRepo for MemoryUserRepo {
    async fn create(&self, user: NewUser) -> Result<UserRecord, AuthError> {
        let record = UserRecord {
            user_id: user.user_id,
            email: user.email,
            username: user.username,
            password_hash: user.password_hash,
            role: user.role,
            refresh_token_hash: None,
            created_at: Utc::now(),
        };

        match self.emails.entry(record.email.clone()) {
            Entry::Occupied(_) => Err(AuthError::Conflict),
            Entry::Vacant(slot) => {
                // hold the email shard until the record is visible
                self.users.insert(record.user_id, record.clone());
                slot.insert(record.user_id);
                Ok(record)
            }
        }
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, AuthError> {
        Ok(self.users.get(&user_id).map(|r| r.value().clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        let Some(user_id) = self.emails.get(email).map(|r| *r.value()) else {
            return Ok(None);
        };
        self.find_by_id(user_id).await
    }

    async fn update(&self, user_id: UserId, update: UserUpdate) -> Result<bool, AuthError> {
        let Some(mut record) = self.users.get_mut(&user_id) else {
            return Ok(false);
        };
        if let Some(username) = update.username {
            record.username = username;
        }
        if let Some(password_hash) = update.password_hash {
            record.password_hash = password_hash;
        }
        if let Some(refresh_token_hash) = update.refresh_token_hash {
            record.refresh_token_hash = refresh_token_hash;
        }
        Ok(true)
    }

    async fn compare_and_set_refresh_hash(
        &self,
        user_id: UserId,
        expected: &str,
        new: Option<&str>,
    ) -> Result<bool, AuthError> {
        // get_mut holds the shard write lock across the compare and the write
        let Some(mut record) = self.users.get_mut(&user_id) else {
            return Ok(false);
        };
        if record.refresh_token_hash.as_deref() != Some(expected) {
            return Ok(false);
        }
        record.refresh_token_hash = new.map(str::to_string);
        Ok(true)
    }
}
