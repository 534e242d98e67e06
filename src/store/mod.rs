//! Local SQLite cache of CVE records.
//!
//! The database holds a single `cves` table with one row per CVE and the
//! affected product's version range. It is normally downloaded from a
//! remote copy (see [`refresh`]) and only created locally as a fallback.

pub mod refresh;
mod sample;

pub use refresh::{DatabaseManager, HttpSource, RemoteSource};
pub use sample::sample_records;

use crate::error::Result;
use crate::model::CveRecord;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::{debug, info, warn};

/// Columns a usable `cves` table must have.
pub const EXPECTED_COLUMNS: [&str; 8] = [
    "id",
    "vendor",
    "product",
    "version_start",
    "version_end",
    "description",
    "published_date",
    "cvss_score",
];

const INSERT_OR_REPLACE: &str = "INSERT OR REPLACE INTO cves (id, vendor, product, version_start, version_end, description, published_date, cvss_score) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

const INSERT_OR_IGNORE: &str = "INSERT OR IGNORE INTO cves (id, vendor, product, version_start, version_end, description, published_date, cvss_score) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

const SELECT_COLUMNS: &str =
    "id, vendor, product, version_start, version_end, description, published_date, cvss_score";

/// Outcome of inspecting a database file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreStatus {
    /// The file does not exist.
    Missing,
    /// The file could not be opened or queried as SQLite.
    Corrupt(String),
    /// The file is SQLite but has no `cves` table.
    MissingTable,
    /// The `cves` table lacks a required column.
    MissingColumn(String),
    /// The database is usable.
    Ready { records: i64 },
}

impl StoreStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, StoreStatus::Ready { .. })
    }
}

impl std::fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreStatus::Missing => write!(f, "database does not exist"),
            StoreStatus::Corrupt(reason) => write!(f, "database is unreadable: {}", reason),
            StoreStatus::MissingTable => write!(f, "database is missing the 'cves' table"),
            StoreStatus::MissingColumn(col) => write!(f, "table is missing column: {}", col),
            StoreStatus::Ready { records } => write!(f, "database has {} CVE entries", records),
        }
    }
}

/// Handle to an open CVE database.
pub struct CveStore {
    pool: SqlitePool,
}

impl CveStore {
    /// Opens an existing database file.
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = connect(path, false).await?;
        Ok(Self { pool })
    }

    /// Creates an in-memory database with the full schema.
    pub async fn in_memory() -> Result<Self> {
        // A single connection keeps every query on the same in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        create_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// Closes the pool, releasing the database file.
    pub async fn close(self) {
        self.pool.close().await;
    }

    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cves")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Returns records whose product or vendor contains `term`
    /// (case-insensitive). Rows that cannot be decoded are skipped.
    pub async fn search(&self, term: &str) -> Result<Vec<CveRecord>> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let pattern = format!("%{}%", term);
        let rows = sqlx::query(&format!(
            "SELECT {} FROM cves WHERE product LIKE ?1 OR vendor LIKE ?1",
            SELECT_COLUMNS
        ))
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;

        let records = rows
            .iter()
            .filter_map(|row| match record_from_row(row) {
                Ok(record) => Some(record),
                Err(e) => {
                    debug!("Skipping undecodable CVE row for '{}': {}", term, e);
                    None
                }
            })
            .collect();

        Ok(records)
    }

    pub async fn get(&self, id: &str) -> Result<Option<CveRecord>> {
        let row = sqlx::query(&format!("SELECT {} FROM cves WHERE id = ?1", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(record_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Inserts or replaces a record.
    pub async fn upsert(&self, record: &CveRecord) -> Result<()> {
        upsert_query(record, INSERT_OR_REPLACE)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Inserts or replaces many records in a single transaction.
    pub async fn import(&self, records: &[CveRecord]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        for record in records {
            upsert_query(record, INSERT_OR_REPLACE)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        info!("Imported {} CVE records", records.len());
        Ok(records.len())
    }

    /// Adds the sample records used when no real database is available.
    ///
    /// Does nothing when the table already holds records; returns the
    /// number of rows inserted.
    pub async fn seed_sample_data(&self) -> Result<usize> {
        let existing = self.count().await?;
        if existing > 0 {
            info!(
                "Database already contains {} records. Skipping sample data.",
                existing
            );
            return Ok(0);
        }

        let records = sample_records();
        let mut tx = self.pool.begin().await?;
        for record in &records {
            upsert_query(record, INSERT_OR_IGNORE)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        info!("Added {} sample CVE entries to the database.", records.len());
        Ok(records.len())
    }
}

fn upsert_query<'q>(
    record: &'q CveRecord,
    sql: &'static str,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    sqlx::query(sql)
        .bind(record.id.as_str())
        .bind(record.vendor.as_deref())
        .bind(record.product.as_deref())
        .bind(record.version_start.as_deref())
        .bind(record.version_end.as_deref())
        .bind(record.description.as_deref())
        .bind(record.published_date.as_deref())
        .bind(record.cvss_score)
}

fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> std::result::Result<CveRecord, sqlx::Error> {
    Ok(CveRecord {
        id: row.try_get("id")?,
        vendor: row.try_get("vendor")?,
        product: row.try_get("product")?,
        version_start: row.try_get("version_start")?,
        version_end: row.try_get("version_end")?,
        description: row.try_get("description")?,
        published_date: row.try_get("published_date")?,
        cvss_score: row.try_get("cvss_score")?,
    })
}

async fn connect(path: &Path, create: bool) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(create)
        .journal_mode(SqliteJournalMode::Delete);

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Drops and recreates the `cves` table and its indexes.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("DROP TABLE IF EXISTS cves").execute(pool).await?;

    sqlx::query(
        r#"
        CREATE TABLE cves (
            id TEXT PRIMARY KEY,
            vendor TEXT,
            product TEXT,
            version_start TEXT,
            version_end TEXT,
            description TEXT,
            published_date TEXT,
            cvss_score REAL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_vendor ON cves(vendor)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_product ON cves(product)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn try_create(path: &Path) -> Result<()> {
    let pool = connect(path, true).await?;
    let result = create_schema(&pool).await;
    pool.close().await;
    result
}

/// Creates a fresh, empty database at `path`.
///
/// If creation fails on an existing (presumably corrupt) file, the file is
/// removed and creation is retried once.
pub async fn create_database(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        crate::platform::ensure_dir(parent)?;
    }

    info!("Creating database at: {}", path.display());

    match try_create(path).await {
        Ok(()) => {
            info!("Database initialized: {}", path.display());
            Ok(())
        }
        Err(e) if path.exists() => {
            warn!("Error creating database: {}", e);
            std::fs::remove_file(path)?;
            info!("Removed corrupt database file: {}", path.display());
            try_create(path).await?;
            info!("Successfully recreated database: {}", path.display());
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Checks that `path` is a SQLite database with a complete `cves` table.
///
/// Problems with the file are reported through [`StoreStatus`], never as
/// an error.
pub async fn verify_database(path: &Path) -> StoreStatus {
    if !path.exists() {
        debug!("Database does not exist: {}", path.display());
        return StoreStatus::Missing;
    }

    let pool = match connect(path, false).await {
        Ok(pool) => pool,
        Err(e) => return StoreStatus::Corrupt(e.to_string()),
    };

    let status = inspect(&pool)
        .await
        .unwrap_or_else(|e| StoreStatus::Corrupt(e.to_string()));
    pool.close().await;

    debug!("Verified {}: {}", path.display(), status);
    status
}

async fn inspect(pool: &SqlitePool) -> Result<StoreStatus> {
    let table: Option<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' AND name='cves'")
            .fetch_optional(pool)
            .await?;

    if table.is_none() {
        return Ok(StoreStatus::MissingTable);
    }

    let rows = sqlx::query("PRAGMA table_info(cves)").fetch_all(pool).await?;
    let columns: Vec<String> = rows
        .iter()
        .filter_map(|row| row.try_get::<String, _>("name").ok())
        .collect();

    if let Some(missing) = EXPECTED_COLUMNS
        .iter()
        .find(|col| !columns.iter().any(|c| c == *col))
    {
        return Ok(StoreStatus::MissingColumn(missing.to_string()));
    }

    let (records,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cves")
        .fetch_one(pool)
        .await?;

    Ok(StoreStatus::Ready { records })
}
