use anyhow::{anyhow, Context as _, Result};
use chrono::Utc;
use serde::Serialize;
use sqlx::{sqlite::SqliteConnectOptions, ConnectOptions, SqlitePool};
use std::{path::Path, str::FromStr};

/// Fixed workflow stage assigned to every newly created task. Callers cannot
/// override it; all later stages come in through status updates.
pub const INITIAL_STATUS: &str = "servicos";

/// Default timeout for individual SQLite queries.
/// Prevents hung queries from blocking the server indefinitely.
const QUERY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Execute a future with the standard query timeout.
/// Returns an error if the operation takes longer than `QUERY_TIMEOUT`.
async fn with_timeout<T>(fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(QUERY_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(anyhow!(
            "database query timed out after {}s",
            QUERY_TIMEOUT.as_secs()
        )),
    }
}

/// One row of the `tasks` table. Serialized verbatim as the wire-level task
/// object — column names are the JSON field names.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize)]
pub struct TaskRow {
    pub id: i64,
    pub responsavel: String,
    pub cliente: String,
    pub descricao: String,
    /// Due date, stored exactly as supplied — no timezone normalization.
    pub data_entrega: String,
    /// Opaque workflow stage. The board front-end owns the vocabulary;
    /// this service never validates it beyond non-emptiness.
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        Self::new_with_slow_query(data_dir, 0).await
    }

    /// Create storage with slow-query logging enabled.
    ///
    /// `slow_query_ms` is the threshold in milliseconds — queries exceeding it
    /// are logged at WARN level. Set to 0 to disable slow-query logging.
    pub async fn new_with_slow_query(data_dir: &Path, slow_query_ms: u64) -> Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;
        let db_path = data_dir.join("kanban.db");
        let mut opts =
            SqliteConnectOptions::from_str(&format!("sqlite://{}?mode=rwc", db_path.display()))?
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .create_if_missing(true);

        if slow_query_ms > 0 {
            opts = opts.log_slow_statements(
                log::LevelFilter::Warn,
                std::time::Duration::from_millis(slow_query_ms),
            );
        }

        let pool = SqlitePool::connect_with(opts).await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    /// Return a clone of the connection pool (cheap — Arc-backed).
    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    /// Idempotent schema setup. Safe to run on every startup; never drops or
    /// alters existing data.
    async fn migrate(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                responsavel TEXT NOT NULL,
                cliente TEXT NOT NULL,
                descricao TEXT NOT NULL,
                data_entrega TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_tasks_created ON tasks(created_at);
            ",
        )
        .execute(pool)
        .await
        .context("Creating tasks table")?;
        Ok(())
    }

    // ─── Tasks ──────────────────────────────────────────────────────────────

    /// All tasks, most recently created first. `created_at` granularity can
    /// coincide, so ties break by descending id (insertion order).
    pub async fn list_tasks(&self) -> Result<Vec<TaskRow>> {
        with_timeout(async {
            Ok(
                sqlx::query_as("SELECT * FROM tasks ORDER BY created_at DESC, id DESC")
                    .fetch_all(&self.pool)
                    .await?,
            )
        })
        .await
    }

    pub async fn get_task(&self, id: i64) -> Result<Option<TaskRow>> {
        with_timeout(async {
            Ok(sqlx::query_as("SELECT * FROM tasks WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?)
        })
        .await
    }

    /// Insert a new task and return the stored row, generated id and
    /// timestamps included. Status is always the initial stage; anything the
    /// caller had in mind is ignored upstream.
    pub async fn create_task(
        &self,
        responsavel: &str,
        cliente: &str,
        descricao: &str,
        data_entrega: &str,
    ) -> Result<TaskRow> {
        let now = Utc::now().to_rfc3339();
        let id = with_timeout(async {
            Ok(sqlx::query_scalar::<_, i64>(
                r"INSERT INTO tasks (responsavel, cliente, descricao, data_entrega, status, created_at, updated_at)
                  VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                  RETURNING id",
            )
            .bind(responsavel)
            .bind(cliente)
            .bind(descricao)
            .bind(data_entrega)
            .bind(INITIAL_STATUS)
            .bind(&now)
            .fetch_one(&self.pool)
            .await
            .context("Inserting task")?)
        })
        .await?;
        self.get_task(id)
            .await?
            .ok_or_else(|| anyhow!("task not found after insert"))
    }

    /// Set a task's status and bump `updated_at`. Returns `None` (and mutates
    /// nothing) when the id does not exist. No constraint is placed on the
    /// status value itself.
    pub async fn update_task_status(&self, id: i64, status: &str) -> Result<Option<TaskRow>> {
        let now = Utc::now().to_rfc3339();
        let result = with_timeout(async {
            Ok(
                sqlx::query("UPDATE tasks SET status = ?, updated_at = ? WHERE id = ?")
                    .bind(status)
                    .bind(&now)
                    .bind(id)
                    .execute(&self.pool)
                    .await?,
            )
        })
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        let row = self
            .get_task(id)
            .await?
            .ok_or_else(|| anyhow!("task not found after update"))?;
        Ok(Some(row))
    }

    /// Remove a task. Returns `false` when the id does not exist.
    /// Irreversible; no archival copy is kept.
    pub async fn delete_task(&self, id: i64) -> Result<bool> {
        let result = with_timeout(async {
            Ok(sqlx::query("DELETE FROM tasks WHERE id = ?")
                .bind(id)
                .execute(&self.pool)
                .await?)
        })
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_tasks(&self) -> Result<u64> {
        let row: (i64,) = with_timeout(async {
            Ok(sqlx::query_as("SELECT COUNT(*) FROM tasks")
                .fetch_one(&self.pool)
                .await?)
        })
        .await?;
        Ok(row.0 as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    async fn test_storage() -> (tempfile::TempDir, Storage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path()).await.unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn migrate_is_idempotent_and_preserves_rows() {
        let dir = tempfile::tempdir().unwrap();
        {
            let storage = Storage::new(dir.path()).await.unwrap();
            storage
                .create_task("Ana", "Acme", "Fix bug", "2024-01-10")
                .await
                .unwrap();
        }
        // Reopen against the same file — schema setup must not touch the row.
        let storage = Storage::new(dir.path()).await.unwrap();
        assert_eq!(storage.count_tasks().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn create_forces_initial_status_and_equal_timestamps() {
        let (_dir, storage) = test_storage().await;
        let task = storage
            .create_task("Ana", "Acme", "Fix bug", "2024-01-10")
            .await
            .unwrap();
        assert_eq!(task.status, INITIAL_STATUS);
        assert_eq!(task.created_at, task.updated_at);
        assert_eq!(task.responsavel, "Ana");
        assert_eq!(task.cliente, "Acme");
        assert_eq!(task.descricao, "Fix bug");
        assert_eq!(task.data_entrega, "2024-01-10");
        DateTime::parse_from_rfc3339(&task.created_at).unwrap();
    }

    #[tokio::test]
    async fn list_orders_newest_first_with_id_tiebreak() {
        let (_dir, storage) = test_storage().await;
        for i in 0..5 {
            storage
                .create_task(&format!("owner{i}"), "Acme", "work", "2024-06-01")
                .await
                .unwrap();
        }
        let tasks = storage.list_tasks().await.unwrap();
        assert_eq!(tasks.len(), 5);
        let ids: Vec<i64> = tasks.iter().map(|t| t.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        assert_eq!(ids, sorted, "ids strictly descending");
        for pair in tasks.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
    }

    #[tokio::test]
    async fn update_changes_only_status_and_updated_at() {
        let (_dir, storage) = test_storage().await;
        let before = storage
            .create_task("Ana", "Acme", "Fix bug", "2024-01-10")
            .await
            .unwrap();
        // Make sure the clock moves between insert and update.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let after = storage
            .update_task_status(before.id, "em_andamento")
            .await
            .unwrap()
            .expect("task exists");
        assert_eq!(after.status, "em_andamento");
        assert_eq!(after.id, before.id);
        assert_eq!(after.responsavel, before.responsavel);
        assert_eq!(after.cliente, before.cliente);
        assert_eq!(after.descricao, before.descricao);
        assert_eq!(after.data_entrega, before.data_entrega);
        assert_eq!(after.created_at, before.created_at);
        let t0 = DateTime::parse_from_rfc3339(&before.updated_at).unwrap();
        let t1 = DateTime::parse_from_rfc3339(&after.updated_at).unwrap();
        assert!(t1 > t0, "updated_at strictly increases");
    }

    #[tokio::test]
    async fn update_unknown_id_mutates_nothing() {
        let (_dir, storage) = test_storage().await;
        storage
            .create_task("Ana", "Acme", "Fix bug", "2024-01-10")
            .await
            .unwrap();
        let result = storage.update_task_status(99999, "done").await.unwrap();
        assert!(result.is_none());
        assert_eq!(storage.count_tasks().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_removes_exactly_one_row_once() {
        let (_dir, storage) = test_storage().await;
        let task = storage
            .create_task("Ana", "Acme", "Fix bug", "2024-01-10")
            .await
            .unwrap();
        storage
            .create_task("Bia", "Globex", "Ship it", "2024-02-20")
            .await
            .unwrap();
        assert!(storage.delete_task(task.id).await.unwrap());
        assert_eq!(storage.count_tasks().await.unwrap(), 1);
        assert!(!storage.delete_task(task.id).await.unwrap());
        let remaining = storage.list_tasks().await.unwrap();
        assert!(remaining.iter().all(|t| t.id != task.id));
    }
}
