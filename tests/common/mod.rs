#![allow(dead_code)]

use std::sync::Arc;
use tessera::application_impl::*;
use tessera::application_port::*;
use tessera::domain_port::UserRepo;
use tessera::infra_memory::MemoryUserRepo;
use tessera::server::Server;

pub const ISSUER: &str = "tessera.auth";
pub const AUDIENCE: &str = "tessera-client";
pub const ACCESS_SECRET: &[u8] = b"test-access-secret";
pub const REFRESH_SECRET: &[u8] = b"test-refresh-secret";

pub fn jwt_config() -> JwtConfig {
    JwtConfig {
        issuer: ISSUER.to_string(),
        audience: AUDIENCE.to_string(),
        access_ttl: chrono::Duration::minutes(15),
        refresh_ttl: chrono::Duration::days(7),
        access_secret: ACCESS_SECRET.to_vec(),
        refresh_secret: REFRESH_SECRET.to_vec(),
        leeway_secs: 0,
    }
}

/// Minimum Argon2 cost so the suite stays fast.
pub fn cheap_hasher() -> Arc<Argon2CredentialHasher> {
    Arc::new(
        Argon2CredentialHasher::try_new(HashConfig {
            memory_cost_kib: 8,
            time_cost: 1,
            parallelism: 1,
        })
        .unwrap(),
    )
}

pub struct Harness {
    pub repo: Arc<MemoryUserRepo>,
    pub hasher: Arc<Argon2CredentialHasher>,
    pub server: Arc<Server>,
}

impl Harness {
    pub fn new() -> Self {
        let repo = Arc::new(MemoryUserRepo::new());
        let hasher = cheap_hasher();
        let codec = Arc::new(JwtHs256Codec::try_new(jwt_config()).unwrap());
        let user_repo: Arc<dyn UserRepo> = repo.clone();
        let server = Arc::new(Server::with_parts(user_repo, hasher.clone(), codec));
        Harness {
            repo,
            hasher,
            server,
        }
    }

    pub fn auth(&self) -> &Arc<dyn AuthService> {
        &self.server.auth_service
    }

    pub async fn register(&self, email: &str, password: &str) -> LoginResult {
        self.auth()
            .register(RegisterInput {
                email: email.to_string(),
                username: "TestUser".to_string(),
                password: password.to_string(),
            })
            .await
            .unwrap()
    }
}
