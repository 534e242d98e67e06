//! Keeping the local CVE database present and reasonably fresh.

use super::{create_database, verify_database, CveStore, StoreStatus};
use crate::cache::Cache;
use crate::config::{Config, ConnectivityConfig};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDateTime, NaiveTime, Weekday};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, error, info, warn};

/// Prefix of the cache key holding the time of the last successful download.
const REFRESH_KEY_PREFIX: &str = "database_refresh";

/// The refresh marker is tracked per database file.
fn refresh_key(path: &Path) -> String {
    format!("{}_{}", REFRESH_KEY_PREFIX, path.display())
}

/// Where a fresh copy of the database comes from.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Human-readable location, used in log messages.
    fn location(&self) -> String;
    async fn fetch(&self) -> Result<Vec<u8>>;
}

/// Downloads the database file over HTTP(S).
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cybervault/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl RemoteSource for HttpSource {
    fn location(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?;

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}

/// Returns true when a TCP connection to `host:port` succeeds within `timeout`.
pub async fn check_connectivity(host: &str, port: u16, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            debug!("Connectivity probe to {}:{} failed: {}", host, port, e);
            false
        }
        Err(_) => {
            debug!("Connectivity probe to {}:{} timed out", host, port);
            false
        }
    }
}

/// The remote database is rebuilt between Sunday 23:55 and Monday 01:00.
pub fn in_maintenance_window(now: NaiveDateTime) -> bool {
    let time = now.time();
    match now.weekday() {
        Weekday::Sun => NaiveTime::from_hms_opt(23, 55, 0).is_some_and(|start| time >= start),
        Weekday::Mon => NaiveTime::from_hms_opt(1, 0, 0).is_some_and(|end| time <= end),
        _ => false,
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".temp");
    PathBuf::from(name)
}

/// Replaces the database at `path` with `bytes`.
///
/// The bytes are staged in `<path>.temp` and only moved into place once
/// they verify as a complete CVE database.
pub async fn install_database(bytes: &[u8], path: &Path) -> Result<StoreStatus> {
    if let Some(parent) = path.parent() {
        crate::platform::ensure_dir(parent)?;
    }

    let temp = temp_path(path);
    tokio::fs::write(&temp, bytes).await?;

    let status = verify_database(&temp).await;
    if !status.is_ready() {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(Error::InvalidDownload(status.to_string()));
    }

    if path.exists() {
        tokio::fs::remove_file(path).await?;
    }
    tokio::fs::rename(&temp, path).await?;

    info!("Installed CVE database at {} ({})", path.display(), status);
    Ok(status)
}

/// Decides whether to reuse, download or create the local database.
pub struct DatabaseManager {
    path: PathBuf,
    source: Box<dyn RemoteSource>,
    cache: Cache,
    refresh_interval_hours: u64,
    seed_sample_data: bool,
    connectivity: Option<ConnectivityConfig>,
}

impl DatabaseManager {
    pub fn new(path: impl Into<PathBuf>, source: Box<dyn RemoteSource>) -> Self {
        Self {
            path: path.into(),
            source,
            cache: Cache::new(),
            refresh_interval_hours: 24,
            seed_sample_data: true,
            connectivity: Some(ConnectivityConfig::default()),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let source = HttpSource::new(&config.database_url, config.download_timeout())?;
        Ok(Self::new(config.database_path(), Box::new(source))
            .with_cache(Cache::with_ttl_hours(config.refresh_interval_hours))
            .with_refresh_interval_hours(config.refresh_interval_hours)
            .with_seed_sample_data(config.seed_sample_data)
            .with_connectivity(Some(config.connectivity.clone())))
    }

    pub fn with_cache(mut self, cache: Cache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_refresh_interval_hours(mut self, hours: u64) -> Self {
        self.refresh_interval_hours = hours;
        self
    }

    pub fn with_seed_sample_data(mut self, seed: bool) -> Self {
        self.seed_sample_data = seed;
        self
    }

    /// `None` skips the connectivity probe.
    pub fn with_connectivity(mut self, connectivity: Option<ConnectivityConfig>) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn status(&self) -> StoreStatus {
        verify_database(&self.path).await
    }

    /// Last successful download, if still within the refresh interval.
    pub fn last_refresh(&self) -> Option<String> {
        self.cache.get(&refresh_key(&self.path))
    }

    pub fn is_refresh_due(&self) -> bool {
        self.refresh_interval_hours == 0 || self.last_refresh().is_none()
    }

    /// Makes sure a usable database exists at [`path`](Self::path).
    pub async fn ensure_database(&self, now: NaiveDateTime) -> Result<StoreStatus> {
        let status = verify_database(&self.path).await;

        if status.is_ready() {
            if in_maintenance_window(now) {
                info!("Remote database is being rebuilt, using existing database");
                return Ok(status);
            }

            if !self.is_refresh_due() {
                debug!("CVE database refreshed recently, skipping download");
                return Ok(status);
            }

            match self.download(now).await {
                Ok(updated) => return Ok(updated),
                Err(e) => warn!("Could not refresh CVE database, keeping existing copy: {}", e),
            }

            let status = verify_database(&self.path).await;
            if status.is_ready() {
                return Ok(status);
            }
            warn!("Existing database became unusable: {}", status);
        } else {
            info!("Local database not usable ({}), downloading", status);
            match self.download(now).await {
                Ok(updated) => return Ok(updated),
                Err(e) => warn!("Could not download CVE database: {}", e),
            }
        }

        info!("Creating a new local database");
        self.initialize(self.seed_sample_data).await
    }

    /// Downloads and installs the remote database regardless of the
    /// refresh interval or maintenance window.
    pub async fn update(&self, now: NaiveDateTime) -> Result<StoreStatus> {
        self.download(now).await
    }

    /// Creates an empty database, optionally seeded with sample records.
    pub async fn initialize(&self, seed: bool) -> Result<StoreStatus> {
        if let Err(e) = create_database(&self.path).await {
            error!("Failed to create database: {}", e);
            return Err(Error::SetupFailed(self.path.clone()));
        }

        // A locally built database was never downloaded.
        if let Err(e) = self.cache.remove(&refresh_key(&self.path)) {
            warn!("Could not clear refresh time: {}", e);
        }

        if seed {
            let store = CveStore::open(&self.path).await?;
            let seeded = store.seed_sample_data().await;
            store.close().await;
            if let Err(e) = seeded {
                warn!("Could not add sample data: {}", e);
            }
        }

        let status = verify_database(&self.path).await;
        if status.is_ready() {
            Ok(status)
        } else {
            error!("Database verification failed: {}", status);
            Err(Error::SetupFailed(self.path.clone()))
        }
    }

    async fn download(&self, now: NaiveDateTime) -> Result<StoreStatus> {
        if let Some(probe) = &self.connectivity {
            if !check_connectivity(&probe.host, probe.port, probe.timeout()).await {
                return Err(Error::Offline(probe.address()));
            }
        }

        info!("Downloading CVE database from {}", self.source.location());
        let bytes = self.source.fetch().await?;
        install_database(&bytes, &self.path).await?;

        if let Err(e) = self.cache.set(&refresh_key(&self.path), &now.to_string()) {
            warn!("Could not record refresh time: {}", e);
        }

        Ok(verify_database(&self.path).await)
    }
}
