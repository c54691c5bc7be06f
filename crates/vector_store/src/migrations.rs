use anyhow::{Context, Result};
use sqlx::{Executor, SqlitePool};
use tracing::info;

/// Ordered schema migrations, tracked through SQLite's `user_version` pragma.
const MIGRATIONS: &[(i64, &str)] = &[(
    1,
    r#"
    CREATE TABLE IF NOT EXISTS index_meta (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS chunks (
        id        INTEGER PRIMARY KEY AUTOINCREMENT,
        file_name TEXT NOT NULL,
        page      INTEGER NOT NULL,
        chunk_id  INTEGER NOT NULL,
        content   TEXT NOT NULL,
        embedding BLOB NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(file_name, page, chunk_id);
    "#,
)];

pub fn latest_version() -> i64 {
    MIGRATIONS.last().map(|(version, _)| *version).unwrap_or(0)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await
        .context("Failed to read schema version")?;

    for (version, sql) in MIGRATIONS.iter().filter(|(version, _)| *version > current) {
        let mut tx = pool.begin().await.context("Failed to start migration")?;

        Executor::execute(&mut *tx, *sql)
            .await
            .with_context(|| format!("Failed to apply migration {version}"))?;

        let pragma = format!("PRAGMA user_version = {version}");
        sqlx::query(&pragma)
            .execute(&mut *tx)
            .await
            .context("Failed to record schema version")?;

        tx.commit().await.context("Failed to commit migration")?;
        info!(version, "Applied index migration");
    }

    Ok(())
}
