//! Configuration file handling.
//!
//! This module provides loading and saving of cybervault configuration
//! from a TOML file.
//!
//! # Configuration Location
//!
//! The configuration file is stored at:
//! - Linux: `~/.config/cybervault/config.toml`
//! - macOS: `~/Library/Application Support/cybervault/config.toml`
//! - Windows: `%APPDATA%\cybervault\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! database_url = "https://malice.games/cves.db"
//! refresh_interval_hours = 24
//! include_unknown = false
//! default_format = "table"
//! report_format = "html"
//!
//! [connectivity]
//! host = "8.8.8.8"
//! port = 53
//! timeout_secs = 3
//!
//! [ignore]
//! software = ["microsoft visual c++*"]
//! vulnerabilities = ["CVE-2023-0001"]
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::platform;

/// Remote copy of the CVE database.
pub const DEFAULT_DATABASE_URL: &str = "https://malice.games/cves.db";

/// Application configuration.
///
/// This struct represents all configurable options for cybervault.
/// It can be loaded from a TOML file or created with default values.
///
/// # Example
///
/// ```no_run
/// use cybervault::Config;
///
/// // Load from file (or use defaults if file doesn't exist)
/// let config = Config::load().unwrap();
///
/// println!("Refresh every {} hours", config.refresh_interval_hours);
/// println!("Database: {}", config.database_path().display());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the CVE database is downloaded from.
    ///
    /// Default: `https://malice.games/cves.db`
    pub database_url: String,

    /// Minimum hours between two downloads of the remote database.
    /// `0` downloads on every scan.
    ///
    /// Default: 24 hours
    pub refresh_interval_hours: u64,

    /// Timeout for the database download, in seconds.
    ///
    /// Default: 60
    pub download_timeout_secs: u64,

    /// Whether CVEs without a CVSS score are reported.
    ///
    /// Default: false
    pub include_unknown: bool,

    /// Insert sample CVE records when a fresh database has to be created
    /// because the download failed.
    ///
    /// Default: true
    pub seed_sample_data: bool,

    /// Default terminal output format when no `--format` flag is provided.
    ///
    /// Valid values: "table", "json", "html"
    /// Default: "table"
    pub default_format: String,

    /// Format of the report document written to the reports directory.
    ///
    /// Valid values: "html", "json"
    /// Default: "html"
    pub report_format: String,

    /// Overrides the directory holding `cves.db`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Overrides the directory reports are written to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reports_dir: Option<PathBuf>,

    /// Network probe performed before downloading.
    pub connectivity: ConnectivityConfig,

    /// Ignore list configuration for suppressing known issues.
    pub ignore: IgnoreConfig,
}

/// Target of the TCP probe used to detect an offline machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    pub host: String,
    pub port: u16,
    pub timeout_secs: u64,
}

impl ConnectivityConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            host: "8.8.8.8".to_string(),
            port: 53,
            timeout_secs: 3,
        }
    }
}

/// Configuration for ignoring specific software or vulnerabilities.
///
/// Use this to suppress known false positives or accepted risks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreConfig {
    /// Program names to exclude from matching (compared lowercased).
    ///
    /// Supports glob patterns (e.g., "microsoft visual c++*").
    pub software: Vec<String>,

    /// Vulnerability IDs to ignore (e.g., "CVE-2021-12345").
    pub vulnerabilities: Vec<String>,
}

impl IgnoreConfig {
    /// Check if a program should be ignored.
    pub fn should_ignore_software(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.software.iter().any(|pattern| {
            let pattern = pattern.to_lowercase();
            if pattern.contains('*') {
                glob_match(&pattern, &name)
            } else {
                pattern == name
            }
        })
    }

    /// Check if a vulnerability should be ignored.
    pub fn should_ignore_vulnerability(&self, vuln_id: &str) -> bool {
        self.vulnerabilities
            .iter()
            .any(|id| id.eq_ignore_ascii_case(vuln_id))
    }
}

/// Simple glob matching (supports * as wildcard).
fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();

    if parts.len() == 1 {
        return pattern == text;
    }

    let mut remaining = text;

    if !parts[0].is_empty() {
        if !remaining.starts_with(parts[0]) {
            return false;
        }
        remaining = &remaining[parts[0].len()..];
    }

    let last_part = parts[parts.len() - 1];
    if !last_part.is_empty() {
        if !remaining.ends_with(last_part) {
            return false;
        }
        remaining = &remaining[..remaining.len() - last_part.len()];
    }

    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        if let Some(pos) = remaining.find(part) {
            remaining = &remaining[pos + part.len()..];
        } else {
            return false;
        }
    }

    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            refresh_interval_hours: 24,
            download_timeout_secs: 60,
            include_unknown: false,
            seed_sample_data: true,
            default_format: "table".to_string(),
            report_format: "html".to_string(),
            data_dir: None,
            reports_dir: None,
            connectivity: ConnectivityConfig::default(),
            ignore: IgnoreConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the default config file.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Loads configuration from an explicit path, falling back to defaults
    /// when the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Saves the configuration, creating the parent directory if needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Returns the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cybervault")
            .join("config.toml")
    }

    /// Directory holding the CVE database.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(platform::data_dir)
    }

    /// Directory reports are written to.
    pub fn reports_dir(&self) -> PathBuf {
        self.reports_dir.clone().unwrap_or_else(platform::reports_dir)
    }

    /// Path of `cves.db`.
    pub fn database_path(&self) -> PathBuf {
        platform::database_path(&self.data_dir())
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    /// Generates a string containing the default configuration.
    pub fn generate_default_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match_exact() {
        assert!(glob_match("7-zip", "7-zip"));
        assert!(!glob_match("7-zip", "winrar"));
    }

    #[test]
    fn test_glob_match_prefix() {
        assert!(glob_match("microsoft visual c++*", "microsoft visual c++ 2015 redistributable"));
        assert!(!glob_match("microsoft visual c++*", "microsoft edge"));
    }

    #[test]
    fn test_glob_match_suffix_and_contains() {
        assert!(glob_match("*(x64)", "7-zip 19.00 (x64)"));
        assert!(glob_match("*java*", "oracle java runtime"));
        assert!(!glob_match("*java*", "python 3.12"));
    }

    #[test]
    fn test_ignore_config_software() {
        let config = IgnoreConfig {
            software: vec!["Notepad++".to_string(), "microsoft visual c++*".to_string()],
            vulnerabilities: vec![],
        };

        assert!(config.should_ignore_software("notepad++"));
        assert!(config.should_ignore_software("Microsoft Visual C++ 2019 X64 Minimum Runtime"));
        assert!(!config.should_ignore_software("google chrome"));
    }

    #[test]
    fn test_ignore_config_vulnerabilities() {
        let config = IgnoreConfig {
            software: vec![],
            vulnerabilities: vec!["CVE-2021-12345".to_string()],
        };

        assert!(config.should_ignore_vulnerability("CVE-2021-12345"));
        assert!(config.should_ignore_vulnerability("cve-2021-12345"));
        assert!(!config.should_ignore_vulnerability("CVE-2022-99999"));
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.refresh_interval_hours, 24);
        assert_eq!(config.default_format, "table");
        assert_eq!(config.report_format, "html");
        assert!(!config.include_unknown);
        assert!(config.seed_sample_data);
        assert_eq!(config.connectivity.address(), "8.8.8.8:53");
        assert!(config.ignore.software.is_empty());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            include_unknown = true
            data_dir = "/srv/cybervault"

            [ignore]
            vulnerabilities = ["CVE-2023-0001"]
            "#,
        )
        .unwrap();

        assert!(config.include_unknown);
        assert_eq!(config.refresh_interval_hours, 24);
        assert_eq!(config.connectivity.port, 53);
        assert_eq!(
            config.database_path(),
            PathBuf::from("/srv/cybervault").join("cves.db")
        );
        assert!(config.ignore.should_ignore_vulnerability("CVE-2023-0001"));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.refresh_interval_hours = 6;
        config.reports_dir = Some(tmp.path().join("reports"));
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.refresh_interval_hours, 6);
        assert_eq!(loaded.reports_dir(), tmp.path().join("reports"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(loaded.default_format, "table");
    }
}
