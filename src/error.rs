//! Error type for the vulnerability database layer.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to download CVE database: {0}")]
    Download(#[from] reqwest::Error),

    #[error("downloaded file is not a valid CVE database: {0}")]
    InvalidDownload(String),

    #[error("no network connectivity (probe to {0} failed)")]
    Offline(String),

    #[error("failed to set up CVE database at {}", .0.display())]
    SetupFailed(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
