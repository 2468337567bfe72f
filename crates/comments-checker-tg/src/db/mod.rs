mod cfg;
mod error;
mod tg_user;

use crate::prelude::*;
use crate::{err_ctx, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

pub(crate) use cfg::*;
pub(crate) use error::*;
pub(crate) use tg_user::*;

/// Handle to the database. It is cheap to clone, all clones share the
/// same connection pool.
#[derive(Clone)]
pub(crate) struct Repo {
    pool: sqlx::SqlitePool,
    pub(crate) tg_users: TgUserRepo,
}

impl Repo {
    fn new(pool: sqlx::SqlitePool) -> Self {
        Self {
            tg_users: TgUserRepo::new(pool.clone()),
            pool,
        }
    }

    /// Waits for all connections to be returned to the pool and closes them
    pub(crate) async fn close(&self) {
        self.pool.close().await;
        info!("Database connection pool was closed");
    }
}

pub(crate) async fn init(cfg: Config) -> Result<Repo> {
    let opts = SqliteConnectOptions::from_str(&cfg.url)
        .map_err(err_ctx!(DbError::Connect))?
        .create_if_missing(true);

    // Verify that the connection is working early.
    let pool = SqlitePoolOptions::new()
        .max_connections(cfg.pool_size)
        .connect_with(opts)
        .await
        .map_err(err_ctx!(DbError::Connect))?;

    migrate(&pool).await?;

    Ok(Repo::new(pool))
}

async fn migrate(pool: &sqlx::SqlitePool) -> Result {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(err_ctx!(DbError::Migrate))?;

    Ok(())
}

/// Private in-memory database for a single test
#[cfg(test)]
pub(crate) async fn init_in_memory() -> Repo {
    // Every connection to `:memory:` gets its own database, so the pool
    // must never open a second one
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    migrate(&pool).await.unwrap();

    Repo::new(pool)
}
