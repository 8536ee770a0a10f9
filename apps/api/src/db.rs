use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Tables used by the ingest, note and audit services.
const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS ingests (
        id          UUID PRIMARY KEY,
        audio_key   TEXT,
        transcript  TEXT NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS notes (
        id          BIGSERIAL PRIMARY KEY,
        patient_id  TEXT NOT NULL,
        content     JSONB NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS audit_events (
        id      BIGSERIAL PRIMARY KEY,
        action  TEXT NOT NULL,
        meta    JSONB NOT NULL,
        at      TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
];

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Creates any missing tables. Safe to run on every startup.
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Database schema ready");
    Ok(())
}
