use crate::domain_model::{UserId, UserSummary};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Refresh, logout and access checks all collapse to this one signal.
    #[error("unauthorized")]
    Unauthorized,
    #[error("user already exists")]
    Conflict,
    #[error("user not found")]
    NotFound,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("token invalid")]
    InvalidToken,
    #[error("validation error: {0}")]
    Validation(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub user: UserSummary,
    pub tokens: TokenPair,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RefreshToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub user_id: UserId,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
}

/// Mints access/refresh pairs. No I/O.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, user: UserId) -> Result<TokenPair, AuthError>;
}

pub trait TokenVerifier: Send + Sync {
    /// Fails with [`AuthError::InvalidToken`] on a bad signature, malformed token,
    /// wrong kind or expiry.
    fn verify(&self, token: &str, kind: TokenKind) -> Result<VerifiedToken, AuthError>;
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash(&self, secret: &str) -> Result<String, AuthError>;
    /// `Ok(false)` on mismatch. Errors only when `hashed` is not a valid hash.
    async fn verify(&self, candidate: &str, hashed: &str) -> Result<bool, AuthError>;
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn register(&self, request: RegisterInput) -> Result<LoginResult, AuthError>;
    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError>;
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError>;
    async fn logout(&self, refresh_token: &str) -> Result<(), AuthError>;
    async fn verify_access(&self, access_token: &str) -> Result<UserId, AuthError>;
}
