use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::logger::*;
use crate::settings::Settings;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::{MySql, Pool};
use std::sync::Arc;

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub user_service: Arc<dyn UserService>,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let (user_repo, pool): (Arc<dyn UserRepo>, Option<Pool<MySql>>) =
            match settings.storage.backend.as_str() {
                "memory" => (Arc::new(MemoryUserRepo::new()), None),
                "mysql" => {
                    let dsn = settings
                        .storage
                        .mysql_dsn
                        .as_deref()
                        .ok_or_else(|| anyhow::anyhow!("storage.mysql_dsn is required"))?;
                    let pool = MySqlPoolOptions::new()
                        .max_connections(settings.storage.max_connections)
                        .connect(dsn)
                        .await?;
                    (Arc::new(MySqlUserRepo::new(pool.clone())), Some(pool))
                }
                other => return Err(anyhow::anyhow!("Unknown storage backend: {}", other)),
            };

        let credential_hasher: Arc<dyn CredentialHasher> =
            Arc::new(Argon2CredentialHasher::try_new(settings.auth.hash_config())?);
        let codec = Arc::new(JwtHs256Codec::try_new(settings.auth.jwt_config()?)?);

        let server = Self::with_parts(user_repo, credential_hasher, codec);
        info!(backend = %settings.storage.backend, "server started");

        Ok(Self { pool, ..server })
    }

    /// Wire the services over an already-built user store and codec.
    pub fn with_parts(
        user_repo: Arc<dyn UserRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        codec: Arc<JwtHs256Codec>,
    ) -> Self {
        let session_store: Arc<dyn AuthSessionStore> =
            Arc::new(UserRecordSessionStore::new(user_repo.clone()));

        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            user_repo.clone(),
            credential_hasher,
            codec.clone(),
            codec,
            session_store,
        ));
        let user_service: Arc<dyn UserService> = Arc::new(RealUserService::new(user_repo));

        Self {
            auth_service,
            user_service,
            pool: None,
        }
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
