use crate::application_port::{
    AuthError, AuthService, CredentialHasher, LoginInput, LoginResult, RegisterInput, TokenIssuer,
    TokenKind, TokenPair, TokenVerifier, VerifiedToken,
};
use crate::domain_model::{Role, UserId, UserRecord, UserSummary, normalize_email};
use crate::domain_port::{AuthSessionStore, NewUser, UserRepo};
use std::sync::Arc;
use tracing::{debug, info};

const FORBIDDEN_PASSWORD_CHARS: [char; 4] = ['\'', '"', '`', '\\'];

pub struct RealAuthService {
    user_repo: Arc<dyn UserRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_issuer: Arc<dyn TokenIssuer>,
    token_verifier: Arc<dyn TokenVerifier>,
    session_store: Arc<dyn AuthSessionStore>,
    min_password_len: usize,
    max_password_len: usize,
    max_username_len: usize,
}

/// A refresh token that passed signature, expiry and slot comparison.
struct ActiveSession {
    user: UserRecord,
    token: VerifiedToken,
    stored_hash: String,
}

impl RealAuthService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_issuer: Arc<dyn TokenIssuer>,
        token_verifier: Arc<dyn TokenVerifier>,
        session_store: Arc<dyn AuthSessionStore>,
    ) -> Self {
        Self {
            user_repo,
            credential_hasher,
            token_issuer,
            token_verifier,
            session_store,
            min_password_len: 8,
            max_password_len: 32,
            max_username_len: 64,
        }
    }

    fn validate_register(&self, email: &str, username: &str, password: &str) -> Result<(), AuthError> {
        if !is_plausible_email(email) {
            return Err(AuthError::Validation("email is not valid".to_string()));
        }
        if username.is_empty() || username.chars().count() > self.max_username_len {
            return Err(AuthError::Validation(format!(
                "username must be between 1 and {} characters",
                self.max_username_len
            )));
        }
        let len = password.chars().count();
        if len < self.min_password_len || len > self.max_password_len {
            return Err(AuthError::Validation(format!(
                "password must be between {} and {} characters",
                self.min_password_len, self.max_password_len
            )));
        }
        if password
            .chars()
            .any(|c| c.is_whitespace() || FORBIDDEN_PASSWORD_CHARS.contains(&c))
        {
            return Err(AuthError::Validation(
                "password must not contain spaces, quotes or backslashes".to_string(),
            ));
        }
        Ok(())
    }

    /// Issue a pair and make its refresh token the only one allowed to rotate.
    async fn start_session(&self, user_id: UserId) -> Result<TokenPair, AuthError> {
        let tokens = self.token_issuer.issue(user_id)?;
        let hash = self.credential_hasher.hash(&tokens.refresh_token.0).await?;
        self.session_store.save_refresh_hash(user_id, &hash).await?;
        Ok(tokens)
    }

    /// Every rejection below maps to the same `Unauthorized`; only the log says why.
    async fn authenticate_refresh(&self, refresh_token: &str) -> Result<ActiveSession, AuthError> {
        let token = refresh_token.trim();
        if token.is_empty() {
            return Err(reject(None, "missing token"));
        }

        let verified = self
            .token_verifier
            .verify(token, TokenKind::Refresh)
            .map_err(|_| reject(None, "invalid or expired token"))?;

        let slot = self
            .session_store
            .load(verified.user_id)
            .await?
            .ok_or_else(|| reject(Some(&verified), "user not found"))?;
        let Some(stored_hash) = slot.refresh_token_hash else {
            return Err(reject(Some(&verified), "no active session"));
        };

        if !self.credential_hasher.verify(token, &stored_hash).await? {
            return Err(reject(Some(&verified), "token superseded"));
        }

        Ok(ActiveSession {
            user: slot.user,
            token: verified,
            stored_hash,
        })
    }
}

fn reject(token: Option<&VerifiedToken>, reason: &'static str) -> AuthError {
    match token {
        Some(token) => debug!(
            user_id = %token.user_id,
            jti = %token.jti,
            reason,
            "refresh token rejected"
        ),
        None => debug!(reason, "refresh token rejected"),
    }
    AuthError::Unauthorized
}

fn is_plausible_email(email: &str) -> bool {
    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn register(&self, request: RegisterInput) -> Result<LoginResult, AuthError> {
        let RegisterInput {
            email,
            username,
            password,
        } = request;
        let email = normalize_email(&email);
        let username = username.trim().to_string();

        self.validate_register(&email, &username, &password)?;

        // The store's unique index still backstops a concurrent registration.
        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(AuthError::Conflict);
        }

        let password_hash = self.credential_hasher.hash(&password).await?;
        let user = self
            .user_repo
            .create(NewUser {
                user_id: UserId::new_v4(),
                email,
                username,
                password_hash,
                role: Role::User,
            })
            .await?;

        let tokens = self.start_session(user.user_id).await?;
        info!(user_id = %user.user_id, "user registered");

        Ok(LoginResult {
            user: UserSummary::from(&user),
            tokens,
        })
    }

    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError> {
        let LoginInput { email, password } = request;
        let email = normalize_email(&email);
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::Validation("email and password are required".to_string()));
        }

        let user = self
            .user_repo
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::NotFound)?;

        let ok = self
            .credential_hasher
            .verify(&password, &user.password_hash)
            .await?;
        if !ok {
            debug!(user_id = %user.user_id, "login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.start_session(user.user_id).await?;
        info!(user_id = %user.user_id, "user logged in");

        Ok(LoginResult {
            user: UserSummary::from(&user),
            tokens,
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let session = self.authenticate_refresh(refresh_token).await?;
        let user_id = session.user.user_id;

        let tokens = self.token_issuer.issue(user_id)?;
        let new_hash = self.credential_hasher.hash(&tokens.refresh_token.0).await?;

        // Rotation: only the request that still sees the old hash may replace it.
        let rotated = self
            .session_store
            .rotate_refresh_hash(user_id, &session.stored_hash, Some(&new_hash))
            .await?;
        if !rotated {
            return Err(reject(Some(&session.token), "lost rotation race"));
        }

        info!(%user_id, jti = %session.token.jti, "refresh token rotated");
        Ok(tokens)
    }

    async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        let session = self.authenticate_refresh(refresh_token).await?;
        let user_id = session.user.user_id;

        let cleared = self
            .session_store
            .rotate_refresh_hash(user_id, &session.stored_hash, None)
            .await?;
        if !cleared {
            return Err(reject(Some(&session.token), "lost rotation race"));
        }

        info!(%user_id, jti = %session.token.jti, "user logged out");
        Ok(())
    }

    async fn verify_access(&self, access_token: &str) -> Result<UserId, AuthError> {
        let verified = self
            .token_verifier
            .verify(access_token.trim(), TokenKind::Access)
            .map_err(|_| AuthError::Unauthorized)?;

        if self.user_repo.find_by_id(verified.user_id).await?.is_none() {
            debug!(user_id = %verified.user_id, "access token for unknown user");
            return Err(AuthError::Unauthorized);
        }

        Ok(verified.user_id)
    }
}
