use crate::case::model::{NewTestCase, TestCase, TestCaseChanges, TestCaseFilter};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};

const COLUMNS: &str =
    "id, feature_name, title, steps, expected_result, priority, status, created_at, updated_at";

pub struct TestCaseOperations {
    pub(crate) pool: SqlitePool,
}

fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Next `updated_at` for a record; never equal to or earlier than the previous one.
fn next_updated_at(previous: DateTime<Utc>) -> DateTime<Utc> {
    now().max(previous + Duration::microseconds(1))
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

async fn find_by_id(connection: &mut SqliteConnection, id: i64) -> Result<Option<TestCase>, sqlx::Error> {
    sqlx::query_as::<_, TestCase>(&format!("SELECT {COLUMNS} FROM testcases WHERE id = ?"))
        .bind(id)
        .fetch_optional(connection)
        .await
}

impl TestCaseOperations {
    pub async fn create(&self, new_case: NewTestCase) -> Result<TestCase, sqlx::Error> {
        let timestamp = now();
        let mut tx = self.pool.begin().await?;
        let test_case = sqlx::query_as::<_, TestCase>(&format!(
            "INSERT INTO testcases (feature_name, title, steps, expected_result, priority, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING {COLUMNS}"
        ))
        .bind(new_case.feature_name)
        .bind(new_case.title)
        .bind(new_case.steps)
        .bind(new_case.expected_result)
        .bind(new_case.priority.as_str())
        .bind(new_case.status.as_str())
        .bind(timestamp)
        .bind(timestamp)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        info!(id = test_case.id, "created test case");
        Ok(test_case)
    }

    pub async fn list(&self, filter: TestCaseFilter) -> Result<Vec<TestCase>, sqlx::Error> {
        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM testcases WHERE 1 = 1"));
        if let Some(priority) = filter.priority {
            query.push(" AND priority = ").push_bind(priority.as_str());
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(search) = filter.search.filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(&search));
            query
                .push(" AND (title LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR feature_name LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
        query.push(" ORDER BY created_at DESC, id DESC");

        let test_cases = query.build_query_as::<TestCase>().fetch_all(&self.pool).await?;
        debug!(count = test_cases.len(), "listed test cases");
        Ok(test_cases)
    }

    pub async fn get(&self, id: i64) -> Result<Option<TestCase>, sqlx::Error> {
        let mut connection = self.pool.acquire().await?;
        find_by_id(&mut *connection, id).await
    }

    /// Returns `None` when no test case has this id; nothing is written in that case.
    pub async fn update(&self, id: i64, changes: TestCaseChanges) -> Result<Option<TestCase>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        // First statement must write: SQLite fails a read-to-write lock upgrade with SQLITE_BUSY instead of waiting.
        let locked = sqlx::query("UPDATE testcases SET id = id WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if locked.rows_affected() == 0 {
            return Ok(None);
        }
        let Some(mut test_case) = find_by_id(&mut *tx, id).await? else {
            return Ok(None);
        };
        changes.apply_to(&mut test_case);
        test_case.updated_at = next_updated_at(test_case.updated_at);

        sqlx::query(
            "UPDATE testcases SET feature_name = ?, title = ?, steps = ?, expected_result = ?, \
             priority = ?, status = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&test_case.feature_name)
        .bind(&test_case.title)
        .bind(&test_case.steps)
        .bind(&test_case.expected_result)
        .bind(test_case.priority.as_str())
        .bind(test_case.status.as_str())
        .bind(test_case.updated_at)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        info!(id, "updated test case");
        Ok(Some(test_case))
    }

    /// Returns whether a test case was removed.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM testcases WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(id, "deleted test case");
        }
        Ok(deleted)
    }
}
