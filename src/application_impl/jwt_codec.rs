use crate::application_port::{
    AccessToken, AuthError, RefreshToken, TokenIssuer, TokenKind, TokenPair, TokenVerifier,
    VerifiedToken,
};
use crate::domain_model::UserId;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

#[derive(Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub access_secret: Vec<u8>,
    pub refresh_secret: Vec<u8>,
    /// Clock skew tolerated on `exp`, in seconds.
    pub leeway_secs: u64,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String, // user id as string
    exp: i64,
    iat: i64,
    iss: String,
    aud: String,
    jti: String, // keeps two pairs minted in the same second distinct
}

struct KindKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

/// HS256 issuer/verifier with one secret per token kind, so a leaked access
/// token can never pass as a refresh token.
pub struct JwtHs256Codec {
    access: KindKeys,
    refresh: KindKeys,
    issuer: String,
    audience: String,
    validation: Validation,
}

impl JwtHs256Codec {
    pub fn try_new(cfg: JwtConfig) -> Result<Self, AuthError> {
        if cfg.access_secret.is_empty() || cfg.refresh_secret.is_empty() {
            return Err(AuthError::Configuration("token secrets must be set".to_string()));
        }
        if cfg.access_secret == cfg.refresh_secret {
            return Err(AuthError::Configuration(
                "access and refresh secrets must differ".to_string(),
            ));
        }
        if cfg.access_ttl <= Duration::zero() || cfg.refresh_ttl <= Duration::zero() {
            return Err(AuthError::Configuration("token lifetimes must be positive".to_string()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = cfg.leeway_secs;
        validation.set_audience(&[cfg.audience.as_str()]);
        validation.set_issuer(&[cfg.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);

        Ok(JwtHs256Codec {
            access: KindKeys {
                encoding: EncodingKey::from_secret(&cfg.access_secret),
                decoding: DecodingKey::from_secret(&cfg.access_secret),
                ttl: cfg.access_ttl,
            },
            refresh: KindKeys {
                encoding: EncodingKey::from_secret(&cfg.refresh_secret),
                decoding: DecodingKey::from_secret(&cfg.refresh_secret),
                ttl: cfg.refresh_ttl,
            },
            issuer: cfg.issuer,
            audience: cfg.audience,
            validation,
        })
    }

    fn keys(&self, kind: TokenKind) -> &KindKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Sign a token of `kind` as if issued at `now`.
    pub(crate) fn encode_at(
        &self,
        user: UserId,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<(String, DateTime<Utc>), AuthError> {
        let keys = self.keys(kind);
        let iat = now.timestamp();
        let exp = iat + keys.ttl.num_seconds();
        let exp_dt = DateTime::from_timestamp(exp, 0)
            .ok_or_else(|| AuthError::InternalError("token expiry out of range".to_string()))?;

        let claims = Claims {
            sub: user.to_string(),
            exp,
            iat,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: uuid::Uuid::new_v4().to_string(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|e| AuthError::InternalError(e.to_string()))?;
        Ok((token, exp_dt))
    }

    #[inline]
    fn parse_user_id(sub: &str) -> Result<UserId, AuthError> {
        sub.parse::<UserId>().map_err(|_| AuthError::InvalidToken)
    }
}

impl TokenIssuer for JwtHs256Codec {
    fn issue(&self, user: UserId) -> Result<TokenPair, AuthError> {
        let now = Utc::now();
        let (access, access_exp) = self.encode_at(user, TokenKind::Access, now)?;
        let (refresh, refresh_exp) = self.encode_at(user, TokenKind::Refresh, now)?;
        Ok(TokenPair {
            access_token: AccessToken(access),
            refresh_token: RefreshToken(refresh),
            access_token_expires_at: access_exp,
            refresh_token_expires_at: refresh_exp,
        })
    }
}

impl TokenVerifier for JwtHs256Codec {
    fn verify(&self, token: &str, kind: TokenKind) -> Result<VerifiedToken, AuthError> {
        let data = decode::<Claims>(token, &self.keys(kind).decoding, &self.validation).map_err(
            |e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => debug!(?kind, "token expired"),
                    other => debug!(?kind, reason = ?other, "token rejected"),
                }
                AuthError::InvalidToken
            },
        )?;
        let claims = data.claims;
        let expires_at =
            DateTime::from_timestamp(claims.exp, 0).ok_or(AuthError::InvalidToken)?;
        Ok(VerifiedToken {
            user_id: Self::parse_user_id(&claims.sub)?,
            jti: claims.jti,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> JwtConfig {
        JwtConfig {
            issuer: "tessera.auth".to_string(),
            audience: "tessera-client".to_string(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
            access_secret: b"access-secret".to_vec(),
            refresh_secret: b"refresh-secret".to_vec(),
            leeway_secs: 0,
        }
    }

    fn codec() -> JwtHs256Codec {
        JwtHs256Codec::try_new(cfg()).unwrap()
    }

    #[test]
    fn issued_tokens_verify_under_their_own_kind() {
        let codec = codec();
        let user = UserId::new_v4();
        let pair = codec.issue(user).unwrap();

        let access = codec.verify(&pair.access_token.0, TokenKind::Access).unwrap();
        assert_eq!(access.user_id, user);
        let refresh = codec.verify(&pair.refresh_token.0, TokenKind::Refresh).unwrap();
        assert_eq!(refresh.user_id, user);
        assert_eq!(refresh.expires_at, pair.refresh_token_expires_at);
    }

    #[test]
    fn tokens_fail_under_the_other_kind() {
        let codec = codec();
        let pair = codec.issue(UserId::new_v4()).unwrap();

        assert!(matches!(
            codec.verify(&pair.access_token.0, TokenKind::Refresh),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            codec.verify(&pair.refresh_token.0, TokenKind::Access),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn refresh_outlives_access() {
        let pair = codec().issue(UserId::new_v4()).unwrap();
        assert!(pair.refresh_token_expires_at > pair.access_token_expires_at);
        assert_ne!(pair.access_token, AccessToken(pair.refresh_token.0.clone()));
    }

    #[test]
    fn pairs_issued_back_to_back_differ() {
        let codec = codec();
        let user = UserId::new_v4();
        let a = codec.issue(user).unwrap();
        let b = codec.issue(user).unwrap();
        assert_ne!(a.refresh_token, b.refresh_token);
        assert_ne!(a.access_token, b.access_token);
    }

    #[test]
    fn each_token_carries_its_own_id() {
        let codec = codec();
        let user = UserId::new_v4();
        let a = codec.issue(user).unwrap();
        let b = codec.issue(user).unwrap();

        let a_jti = codec.verify(&a.refresh_token.0, TokenKind::Refresh).unwrap().jti;
        let b_jti = codec.verify(&b.refresh_token.0, TokenKind::Refresh).unwrap().jti;
        let access_jti = codec.verify(&a.access_token.0, TokenKind::Access).unwrap().jti;

        assert!(a_jti.parse::<uuid::Uuid>().is_ok());
        assert_ne!(a_jti, b_jti);
        assert_ne!(a_jti, access_jti);
    }

    #[test]
    fn expired_refresh_token_is_rejected() {
        let codec = codec();
        let issued_at = Utc::now() - Duration::days(8);
        let (token, exp) = codec
            .encode_at(UserId::new_v4(), TokenKind::Refresh, issued_at)
            .unwrap();
        assert!(exp < Utc::now());
        assert!(matches!(
            codec.verify(&token, TokenKind::Refresh),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn tampered_and_garbage_tokens_are_rejected() {
        let codec = codec();
        let mine = codec.issue(UserId::new_v4()).unwrap().refresh_token.0;
        let theirs = codec.issue(UserId::new_v4()).unwrap().refresh_token.0;
        let mine: Vec<&str> = mine.split('.').collect();
        let theirs: Vec<&str> = theirs.split('.').collect();
        // their claims under my signature
        let forged = format!("{}.{}.{}", mine[0], theirs[1], mine[2]);

        assert!(codec.verify(&forged, TokenKind::Refresh).is_err());
        assert!(codec.verify("invalidToken", TokenKind::Refresh).is_err());
        assert!(codec.verify("", TokenKind::Refresh).is_err());
    }

    #[test]
    fn foreign_issuer_is_rejected() {
        let other = JwtHs256Codec::try_new(JwtConfig {
            issuer: "someone-else".to_string(),
            ..cfg()
        })
        .unwrap();
        let pair = other.issue(UserId::new_v4()).unwrap();
        assert!(codec().verify(&pair.refresh_token.0, TokenKind::Refresh).is_err());
    }

    #[test]
    fn config_requires_distinct_non_empty_secrets() {
        let same = JwtConfig {
            refresh_secret: b"access-secret".to_vec(),
            ..cfg()
        };
        assert!(matches!(
            JwtHs256Codec::try_new(same),
            Err(AuthError::Configuration(_))
        ));

        let empty = JwtConfig {
            access_secret: Vec::new(),
            ..cfg()
        };
        assert!(matches!(
            JwtHs256Codec::try_new(empty),
            Err(AuthError::Configuration(_))
        ));

        let negative = JwtConfig {
            access_ttl: Duration::seconds(-1),
            ..cfg()
        };
        assert!(matches!(
            JwtHs256Codec::try_new(negative),
            Err(AuthError::Configuration(_))
        ));
    }
}
