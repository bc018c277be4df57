use anyhow::Result;
use serde::Deserialize;
use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Sqlite, SqlitePool};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub url: String,
    pub max_connections: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url: "sqlite://gym.db".to_string(),
            max_connections: 5,
        }
    }
}

impl Settings {
    fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

pub async fn create_pool(settings: &Settings) -> Result<SqlitePool> {
    match Sqlite::database_exists(&settings.url).await? {
        true => tracing::info!("Database already exists"),
        false => Sqlite::create_database(&settings.url).await?,
    }

    let mut options = SqlitePoolOptions::new().max_connections(settings.max_connections);
    if settings.is_in_memory() {
        // an in-memory database lives and dies with its single connection
        options = options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }
    let pool = options.connect(&settings.url).await?;

    sqlx::migrate!("db/migrations").run(&pool).await?;

    Ok(pool)
}

/// Shared handle on the pool, extracted by handlers with `State<Database>`.
#[derive(Clone, Debug)]
pub struct Database(SqlitePool);

impl Database {
    pub fn new(pool: SqlitePool) -> Self {
        Self(pool)
    }
}

impl AsRef<SqlitePool> for Database {
    fn as_ref(&self) -> &SqlitePool {
        &self.0
    }
}
