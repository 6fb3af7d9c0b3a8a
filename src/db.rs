// TaskSync/backend-api/src/db.rs
use diesel::Connection;
use diesel_async::async_connection_wrapper::AsyncConnectionWrapper;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::{pooled_connection::bb8::Pool, AsyncPgConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::time::Duration;
use thiserror::Error;

// Type alias for the connection pool
pub type DbPool = Pool<AsyncPgConnection>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(Error, Debug)]
pub enum DbSetupError {
    #[error("failed to connect to database after {attempts} attempts: {last_error}")]
    Unreachable { attempts: u32, last_error: String },

    #[error("failed to run migrations: {0}")]
    Migration(String),
}

#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_size: u32,
    pub connect_attempts: u32,
    pub connect_delay: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        PoolSettings {
            max_size: 10,
            connect_attempts: 5,
            connect_delay: Duration::from_secs(2),
        }
    }
}

/// Builds the pool and checks out one connection to prove the database is
/// reachable, retrying `connect_attempts` times.
pub async fn create_pool(
    database_url: &str,
    settings: &PoolSettings,
) -> Result<DbPool, DbSetupError> {
    let attempts = settings.connect_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        match Pool::builder()
            .max_size(settings.max_size)
            .build(config)
            .await
        {
            Ok(pool) => {
                let checkout = pool.get().await.map(|_conn| ()).map_err(|e| e.to_string());
                match checkout {
                    Ok(()) => {
                        log::info!("Database pool ready (attempt {}/{})", attempt, attempts);
                        return Ok(pool);
                    }
                    Err(e) => last_error = e,
                }
            }
            Err(e) => last_error = e.to_string(),
        }

        log::warn!(
            "Database not reachable (attempt {}/{}): {}",
            attempt,
            attempts,
            last_error
        );
        if attempt < attempts {
            tokio::time::sleep(settings.connect_delay).await;
        }
    }

    Err(DbSetupError::Unreachable {
        attempts,
        last_error,
    })
}

/// Applies pending embedded migrations on a blocking thread.
pub async fn run_migrations(database_url: &str) -> Result<(), DbSetupError> {
    let database_url = database_url.to_owned();
    tokio::task::spawn_blocking(move || {
        let mut conn = AsyncConnectionWrapper::<AsyncPgConnection>::establish(&database_url)
            .map_err(|e| DbSetupError::Migration(e.to_string()))?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| DbSetupError::Migration(e.to_string()))?;
        for version in applied {
            log::info!("Applied migration {}", version);
        }
        Ok(())
    })
    .await
    .map_err(|e| DbSetupError::Migration(e.to_string()))?
}
