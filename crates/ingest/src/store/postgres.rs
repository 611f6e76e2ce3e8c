//! PostgreSQL implementation of [`ApodStore`].

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;
use tracing::info;

use apod_core::config::PostgresConfig;
use apod_core::{CanonicalRecord, IngestError, PersistedRow};

use super::ApodStore;

pub const CREATE_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS apod_data(
        id SERIAL PRIMARY KEY,
        title VARCHAR(255),
        explanation TEXT,
        url TEXT,
        date DATE,
        media_type VARCHAR(50)
    );";

// `date` is bound as text and coerced by the server's own cast.
pub const INSERT_SQL: &str = "
    INSERT INTO apod_data (title, explanation, url, date, media_type)
    VALUES ($1, $2, $3, $4::date, $5)
    RETURNING id";

pub const LATEST_SQL: &str = "
    SELECT id, title, explanation, url, date::text AS date, media_type
    FROM apod_data
    ORDER BY id DESC
    LIMIT $1";

/// Every column except `id` is nullable in the table definition.
#[derive(Debug, sqlx::FromRow)]
struct ApodRow {
    id: i32,
    title: Option<String>,
    explanation: Option<String>,
    url: Option<String>,
    date: Option<String>,
    media_type: Option<String>,
}

impl From<ApodRow> for PersistedRow {
    fn from(row: ApodRow) -> Self {
        Self {
            id: row.id,
            record: CanonicalRecord {
                title: row.title.unwrap_or_default(),
                explanation: row.explanation.unwrap_or_default(),
                url: row.url.unwrap_or_default(),
                date: row.date.unwrap_or_default(),
                media_type: row.media_type.unwrap_or_default(),
            },
        }
    }
}

fn storage_error(e: sqlx::Error) -> IngestError {
    IngestError::Storage(e.to_string())
}

/// Connection options for the sink.
///
/// `PG_URL` wins when set. Otherwise the options are assembled field by
/// field, so credentials never pass through URL parsing.
pub fn connect_options(config: &PostgresConfig) -> Result<PgConnectOptions, IngestError> {
    if let Some(url) = &config.url {
        return PgConnectOptions::from_str(url).map_err(storage_error);
    }

    let ssl_mode = PgSslMode::from_str(&config.ssl_mode).map_err(storage_error)?;
    let mut options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .database(&config.database)
        .username(config.username_or_default())
        .ssl_mode(ssl_mode);
    if let Some(password) = &config.password {
        options = options.password(password);
    }
    Ok(options)
}

/// [`ApodStore`] over a sqlx connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a pool without opening a connection.
    ///
    /// An unreachable server surfaces on first use, inside the stage that
    /// needed it, rather than at startup.
    pub fn connect_lazy(config: &PostgresConfig) -> Result<Self, IngestError> {
        let options = connect_options(config)?;
        info!(
            host = %options.get_host(),
            port = options.get_port(),
            database = ?options.get_database(),
            "PostgreSQL pool configured"
        );
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_lazy_with(options);
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl ApodStore for PgStore {
    async fn create_table(&self) -> Result<(), IngestError> {
        sqlx::query(CREATE_TABLE_SQL)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    async fn insert(&self, record: &CanonicalRecord) -> Result<i32, IngestError> {
        sqlx::query_scalar::<_, i32>(INSERT_SQL)
            .bind(&record.title)
            .bind(&record.explanation)
            .bind(&record.url)
            .bind(&record.date)
            .bind(&record.media_type)
            .fetch_one(&self.pool)
            .await
            .map_err(storage_error)
    }

    async fn latest(&self, limit: u32) -> Result<Vec<PersistedRow>, IngestError> {
        let rows = sqlx::query_as::<_, ApodRow>(LATEST_SQL)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(rows.into_iter().map(PersistedRow::from).collect())
    }
}
