use super::util::is_dup_key;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, MySqlPool, QueryBuilder, Row};

const USER_COLUMNS: &str =
    "user_id, email, username, password_hash, role, refresh_token_hash, created_at";

pub struct MySqlUserRepo {
    pool: MySqlPool,
}

impl MySqlUserRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlUserRepo { pool }
    }

    fn row_to_record(row: MySqlRow) -> Result<UserRecord, AuthError> {
        let store_err = |e: sqlx::Error| AuthError::Store(e.to_string());

        let role: String = row.try_get("role").map_err(store_err)?;
        let role = role
            .parse::<Role>()
            .map_err(|e| AuthError::Store(format!("decode role: {e}")))?;
        let created_at: DateTime<Utc> = row.try_get("created_at").map_err(store_err)?;

        Ok(UserRecord {
            user_id: row.try_get::<UserId, _>("user_id").map_err(store_err)?,
            email: row.try_get("email").map_err(store_err)?,
            username: row.try_get("username").map_err(store_err)?,
            password_hash: row.try_get("password_hash").map_err(store_err)?,
            role,
            refresh_token_hash: row.try_get("refresh_token_hash").map_err(store_err)?,
            created_at,
        })
    }
}

#[async_trait::async_trait]
impl UserRepo for MySqlUserRepo {
    async fn create(&self, user: NewUser) -> Result<UserRecord, AuthError> {
        let res = sqlx::query(
            r#"
INSERT INTO user_account (user_id, email, username, password_hash, role)
VALUES (?, ?, ?, ?, ?)
"#,
        )
        .bind(user.user_id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .execute(&self.pool)
        .await;

        match res {
            Ok(_) => {}
            Err(e) if is_dup_key(&e) => return Err(AuthError::Conflict),
            Err(e) => return Err(AuthError::Store(format!("insert user: {e}"))),
        }

        self.find_by_id(user.user_id)
            .await?
            .ok_or_else(|| AuthError::Store(format!("user {} missing after insert", user.user_id)))
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, AuthError> {
        let row_opt: Option<MySqlRow> =
            sqlx::query(&format!("SELECT {USER_COLUMNS} FROM user_account WHERE user_id = ?"))
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| AuthError::Store(format!("query user by id: {e}")))?;

        row_opt.map(Self::row_to_record).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        let row_opt: Option<MySqlRow> =
            sqlx::query(&format!("SELECT {USER_COLUMNS} FROM user_account WHERE email = ?"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| AuthError::Store(format!("query user by email: {e}")))?;

        row_opt.map(Self::row_to_record).transpose()
    }

    async fn update(&self, user_id: UserId, update: UserUpdate) -> Result<bool, AuthError> {
        if update.is_empty() {
            let exists: i64 =
                sqlx::query_scalar("SELECT COUNT(1) FROM user_account WHERE user_id = ?")
                    .bind(user_id)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| AuthError::Store(e.to_string()))?;
            return Ok(exists > 0);
        }

        let mut qb = QueryBuilder::<MySql>::new("UPDATE user_account SET ");
        let mut fields = qb.separated(", ");
        if let Some(username) = update.username {
            fields.push("username = ").push_bind_unseparated(username);
        }
        if let Some(password_hash) = update.password_hash {
            fields.push("password_hash = ").push_bind_unseparated(password_hash);
        }
        if let Some(refresh_token_hash) = update.refresh_token_hash {
            fields
                .push("refresh_token_hash = ")
                .push_bind_unseparated(refresh_token_hash);
        }
        // keeps affected rows at 1 even when every value is unchanged
        fields.push("updated_at = CURRENT_TIMESTAMP(6)");
        qb.push(" WHERE user_id = ").push_bind(user_id);

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::Store(format!("update user: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn compare_and_set_refresh_hash(
        &self,
        user_id: UserId,
        expected: &str,
        new: Option<&str>,
    ) -> Result<bool, AuthError> {
        let result = sqlx::query(
            r#"
UPDATE user_account
SET refresh_token_hash = ?, updated_at = CURRENT_TIMESTAMP(6)
WHERE user_id = ? AND refresh_token_hash = ?
"#,
        )
        .bind(new)
        .bind(user_id)
        .bind(expected)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::Store(format!("rotate refresh hash: {e}")))?;

        Ok(result.rows_affected() == 1)
    }
}
