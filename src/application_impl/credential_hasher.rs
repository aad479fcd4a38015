use crate::application_port::{AuthError, CredentialHasher};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};

/// Argon2id work factor.
#[derive(Debug, Clone, Copy)]
pub struct HashConfig {
    pub memory_cost_kib: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for HashConfig {
    fn default() -> Self {
        HashConfig {
            memory_cost_kib: 19 * 1024,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

/// Salted one-way hash used for both login passwords and refresh-token fingerprints.
///
/// Hashes are PHC strings, so verification reads the salt and parameters from the
/// stored value; changing [`HashConfig`] only affects newly produced hashes.
pub struct Argon2CredentialHasher {
    argon2: Argon2<'static>,
}

impl Argon2CredentialHasher {
    pub fn try_new(cfg: HashConfig) -> Result<Self, AuthError> {
        let params = Params::new(cfg.memory_cost_kib, cfg.time_cost, cfg.parallelism, None)
            .map_err(|e| AuthError::Configuration(format!("argon2 params: {e}")))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

#[async_trait::async_trait]
impl CredentialHasher for Argon2CredentialHasher {
    async fn hash(&self, secret: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| AuthError::InternalError(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    async fn verify(&self, candidate: &str, hashed: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(hashed)
            .map_err(|e| AuthError::Configuration(format!("invalid PHC hash: {e}")))?;

        match self.argon2.verify_password(candidate.as_bytes(), &parsed) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::Configuration(format!("verify error: {e}"))),
        }
    }
}
