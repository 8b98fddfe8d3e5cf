// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::{
    db::{
        IdentityGateway, InMemoryStore, InventoryGateway, InventoryRepository,
        MaterialRequestRepository, MaterialRequestStore, UserRepository,
    },
    services::{
        access::AccessService, auth::AuthService,
        material_request_service::MaterialRequestService,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBackend {
    Postgres,
    Memory,
}

impl FromStr for DataBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(DataBackend::Postgres),
            "memory" => Ok(DataBackend::Memory),
            other => anyhow::bail!("DATA_BACKEND inválido: {other}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub data_backend: DataBackend,
    pub app_env: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let data_backend: DataBackend = env_or("DATA_BACKEND", "postgres").parse()?;

        // Sem banco no modo memória, então a URL só é obrigatória no Postgres.
        let database_url = env::var("DATABASE_URL").ok();
        if data_backend == DataBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL deve ser definida");
        }

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let db_max_connections: u32 = env_or("DB_MAX_CONNECTIONS", "5")
            .parse()
            .context("DB_MAX_CONNECTIONS deve ser um inteiro")?;
        let acquire_secs: u64 = env_or("DB_ACQUIRE_TIMEOUT_SECS", "3")
            .parse()
            .context("DB_ACQUIRE_TIMEOUT_SECS deve ser um inteiro")?;

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:3000"),
            db_max_connections,
            db_acquire_timeout: Duration::from_secs(acquire_secs),
            data_backend,
            app_env: env_or("APP_ENV", "development"),
        })
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub material_request_service: MaterialRequestService,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        match config.data_backend {
            DataBackend::Postgres => {
                let database_url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL deve ser definida")?;

                // Conecta ao banco de dados, usando '?' para propagar erros
                let db_pool = PgPoolOptions::new()
                    .max_connections(config.db_max_connections)
                    .acquire_timeout(config.db_acquire_timeout)
                    .connect(database_url)
                    .await?;

                tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

                sqlx::migrate!()
                    .run(&db_pool)
                    .await
                    .context("Falha ao rodar as migrações do banco de dados")?;

                tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

                // --- Monta o gráfico de dependências ---
                let user_repo = UserRepository::new(db_pool.clone());
                let inventory_repo = InventoryRepository::new(db_pool.clone());
                let material_request_repo =
                    MaterialRequestRepository::new(db_pool, inventory_repo.clone());

                Ok(Self::with_gateways(
                    config.jwt_secret.clone(),
                    Arc::new(user_repo),
                    Arc::new(material_request_repo),
                    Arc::new(inventory_repo),
                ))
            }
            DataBackend::Memory => {
                tracing::warn!("DATA_BACKEND=memory: dados não persistem entre execuções");
                Ok(Self::in_memory(
                    config.jwt_secret.clone(),
                    InMemoryStore::with_demo_users(),
                ))
            }
        }
    }

    pub fn with_gateways(
        jwt_secret: String,
        identity: Arc<dyn IdentityGateway>,
        store: Arc<dyn MaterialRequestStore>,
        inventory: Arc<dyn InventoryGateway>,
    ) -> Self {
        let access = AccessService::new(identity);
        Self {
            auth_service: AuthService::new(jwt_secret),
            material_request_service: MaterialRequestService::new(access, store, inventory),
        }
    }

    pub fn in_memory(jwt_secret: String, store: InMemoryStore) -> Self {
        let shared = Arc::new(store);
        Self::with_gateways(jwt_secret, shared.clone(), shared.clone(), shared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names_are_case_insensitive() {
        assert_eq!("Memory".parse::<DataBackend>().unwrap(), DataBackend::Memory);
        assert_eq!(" postgres ".parse::<DataBackend>().unwrap(), DataBackend::Postgres);
        assert!("mysql".parse::<DataBackend>().is_err());
    }
}
