//! Cross-platform path resolution.
//!
//! This module provides functions for finding the per-user directories
//! where cybervault keeps its CVE database, generated reports and cache.
//!
//! Unlike lookups of third-party install locations, these functions always
//! return a path. Callers create the directories on demand.

use std::path::{Path, PathBuf};

/// File name of the local CVE database inside the data directory.
pub const DATABASE_FILE: &str = "cves.db";

/// Returns the root directory for cybervault application data.
///
/// Platform-specific locations:
/// - Linux: `~/.local/share/cybervault/`
/// - macOS: `~/Library/Application Support/cybervault/`
/// - Windows: `%LOCALAPPDATA%\cybervault\`
///
/// Falls back to `./cybervault/` if no data directory can be determined.
pub fn app_root() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cybervault")
}

/// Returns the directory holding the CVE database (`<app_root>/data`).
pub fn data_dir() -> PathBuf {
    app_root().join("data")
}

/// Returns the directory generated reports are written to (`<app_root>/reports`).
pub fn reports_dir() -> PathBuf {
    app_root().join("reports")
}

/// Returns the path of the CVE database inside `data_dir`.
pub fn database_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DATABASE_FILE)
}

/// Returns the cache directory for cybervault.
///
/// Platform-specific locations:
/// - Linux: `~/.cache/cybervault/`
/// - macOS: `~/Library/Caches/cybervault/`
/// - Windows: `%LOCALAPPDATA%\cybervault\cache\`
///
/// Falls back to `/tmp/cybervault/` if no cache directory can be determined.
pub fn cache_dir() -> PathBuf {
    if cfg!(target_os = "windows") {
        return app_root().join("cache");
    }

    dirs::cache_dir()
        .map(|d| d.join("cybervault"))
        .unwrap_or_else(|| std::env::temp_dir().join("cybervault"))
}

/// Creates `dir` and its parents if missing.
pub fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
        tracing::info!("Created directory: {}", dir.display());
    }
    Ok(())
}
