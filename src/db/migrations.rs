//! Database lifecycle and schema migrations.

use crate::error::DatabaseError;
use crate::{Error, Result};
use sqlx::SqliteConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool};
use std::path::Path;

use super::Database;

/// One schema version: statements applied together in a transaction
struct Migration {
    version: i64,
    description: &'static str,
    statements: &'static [&'static str],
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "batches and their outcomes",
    statements: &[
        r#"
        CREATE TABLE batches (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            format TEXT NOT NULL,
            total INTEGER NOT NULL,
            state INTEGER NOT NULL,
            succeeded INTEGER NOT NULL DEFAULT 0,
            failed INTEGER NOT NULL DEFAULT 0,
            started_at INTEGER NOT NULL,
            finished_at INTEGER
        )
        "#,
        "CREATE INDEX idx_batches_started_at ON batches(started_at)",
        r#"
        CREATE TABLE batch_outcomes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id INTEGER NOT NULL,
            position INTEGER NOT NULL,
            task_id TEXT NOT NULL,
            display_name TEXT NOT NULL,
            source_reference TEXT NOT NULL,
            succeeded INTEGER NOT NULL,
            byte_size INTEGER,
            error_detail TEXT,
            file_path TEXT,
            recorded_at INTEGER NOT NULL,
            FOREIGN KEY (batch_id) REFERENCES batches(id) ON DELETE CASCADE,
            UNIQUE(batch_id, position)
        )
        "#,
    ],
}];

fn connection_failed(context: &str, e: impl std::fmt::Display) -> Error {
    Error::Database(DatabaseError::ConnectionFailed(format!("{}: {}", context, e)))
}

fn migration_failed(context: &str, e: impl std::fmt::Display) -> Error {
    Error::Database(DatabaseError::MigrationFailed(format!("{}: {}", context, e)))
}

impl Database {
    /// Open (or create) the history database at `path` and bring its schema
    /// up to date
    ///
    /// The parent directory is created when missing. Connections enforce
    /// foreign keys (outcomes cascade with their batch) and use WAL.
    pub async fn new(path: &Path) -> Result<Self> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| connection_failed("cannot create database directory", e))?;
            }
            _ => {}
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| connection_failed("cannot open database", e))?;

        let db = Self { pool };
        db.run_migrations().await?;

        tracing::debug!(path = %path.display(), "Opened history database");
        Ok(db)
    }

    /// Apply every migration newer than the recorded schema version
    async fn run_migrations(&self) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| connection_failed("cannot acquire connection", e))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            )",
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| migration_failed("cannot create schema_version", e))?;

        let applied: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| Error::Database(DatabaseError::QueryFailed(e.to_string())))?;
        let applied = applied.unwrap_or(0);

        for migration in MIGRATIONS.iter().filter(|m| m.version > applied) {
            apply(&mut *conn, migration).await?;
        }

        Ok(())
    }

    /// Close the database connection
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Run one migration inside BEGIN/COMMIT, rolling back on the first failure
async fn apply(conn: &mut SqliteConnection, migration: &Migration) -> Result<()> {
    tracing::info!(
        version = migration.version,
        description = migration.description,
        "Applying database migration"
    );

    sqlx::query("BEGIN")
        .execute(&mut *conn)
        .await
        .map_err(|e| migration_failed("cannot begin transaction", e))?;

    let result = async {
        for statement in migration.statements {
            sqlx::query(*statement)
                .execute(&mut *conn)
                .await
                .map_err(|e| migration_failed(&format!("migration v{}", migration.version), e))?;
        }

        sqlx::query("INSERT INTO schema_version (version, applied_at) VALUES (?, ?)")
            .bind(migration.version)
            .bind(chrono::Utc::now().timestamp())
            .execute(&mut *conn)
            .await
            .map_err(|e| migration_failed("cannot record schema version", e))?;

        Ok::<(), Error>(())
    }
    .await;

    if let Err(e) = result {
        if let Err(rollback) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
            tracing::warn!(error = %rollback, "Rollback of failed migration failed");
        }
        return Err(e);
    }

    sqlx::query("COMMIT")
        .execute(&mut *conn)
        .await
        .map_err(|e| migration_failed("cannot commit migration", e))?;

    tracing::info!(version = migration.version, "Database migration complete");
    Ok(())
}
