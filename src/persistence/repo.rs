use crate::case::service::TestCaseOperations;
use crate::config::StoreConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

const CREATE_TEST_CASES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS testcases (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    feature_name TEXT NOT NULL CHECK (length(feature_name) BETWEEN 1 AND 255),
    title TEXT NOT NULL CHECK (length(title) BETWEEN 1 AND 500),
    steps TEXT NOT NULL CHECK (length(steps) >= 1),
    expected_result TEXT NOT NULL CHECK (length(expected_result) >= 1),
    priority TEXT NOT NULL DEFAULT 'Medium' CHECK (priority IN ('Low', 'Medium', 'High')),
    status TEXT NOT NULL DEFAULT 'Draft' CHECK (status IN ('Draft', 'Ready', 'Automated')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const CREATE_FEATURE_NAME_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS ix_testcases_feature_name ON testcases (feature_name)";

#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub async fn connect(config: &StoreConfig) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;
        let repository = Self { pool };
        repository.create_schema().await?;
        info!(database_url = %config.database_url, "connected to test case store");
        Ok(repository)
    }

    /// Single-connection in-memory store; every pooled connection would otherwise see its own database.
    #[cfg(test)]
    pub async fn in_memory() -> Self {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let repository = Self { pool };
        repository.create_schema().await.unwrap();
        repository
    }

    async fn create_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(CREATE_TEST_CASES_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_FEATURE_NAME_INDEX).execute(&self.pool).await?;
        Ok(())
    }

    pub fn test_cases(&self) -> TestCaseOperations {
        TestCaseOperations {
            pool: self.pool.clone(),
        }
    }
}
