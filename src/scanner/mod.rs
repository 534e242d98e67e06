//! Installed software scanners.
//!
//! This module provides the [`Scanner`] trait and implementations for
//! discovering the programs installed on a machine.
//!
//! # Available Scanners
//!
//! | Scanner | Source | Platforms |
//! |---------|--------|-----------|
//! | [`RegistryScanner`] | Uninstall registry keys | Windows |
//! | [`WindowsVersionScanner`] | Windows release and build | Windows |
//! | [`EdgeScanner`] | Microsoft Edge app package | Windows |
//! | [`InventoryScanner`] | JSON inventory file | All |
//!
//! # Example
//!
//! ```no_run
//! use cybervault::scanner::{all_scanners, Scanner};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     for scanner in all_scanners() {
//!         if scanner.is_supported() {
//!             println!("Scanning {}...", scanner.name());
//!             let software = scanner.scan().await?;
//!             println!("Found {} programs", software.len());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

mod edge;
mod inventory;
mod registry;
mod windows;

pub use edge::EdgeScanner;
pub use inventory::{parse_inventory, InventoryScanner};
pub use registry::{direct_children, parse_reg_query, software_from_keys, RegistryKey, RegistryScanner};
pub use windows::WindowsVersionScanner;

use crate::config::IgnoreConfig;
use crate::model::{InstalledSoftware, Platform, Source};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::process::Command;
use tracing::debug;

/// Trait for discovering installed software from a specific source.
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Returns the human-readable name of this scanner.
    fn name(&self) -> &'static str;

    /// Returns the source type this scanner handles.
    fn source(&self) -> Source;

    /// Returns the platforms this scanner supports.
    fn supported_platforms(&self) -> &[Platform];

    /// Returns true if this scanner is supported on the current platform.
    fn is_supported(&self) -> bool {
        let current = Platform::current();
        self.supported_platforms().contains(&current)
    }

    /// Scans for installed software and returns it.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan fails (e.g., an external command
    /// cannot be started or a file cannot be read).
    async fn scan(&self) -> Result<Vec<InstalledSoftware>>;
}

/// Returns the scanners that inspect the local machine.
///
/// [`InventoryScanner`] is not included since it needs a file path.
///
/// ```
/// use cybervault::scanner::all_scanners;
///
/// assert_eq!(all_scanners().len(), 3);
/// ```
pub fn all_scanners() -> Vec<Box<dyn Scanner>> {
    vec![
        Box::new(RegistryScanner),
        Box::new(WindowsVersionScanner),
        Box::new(EdgeScanner),
    ]
}

/// Whether a record carries enough information to be matched.
pub fn is_meaningful(software: &InstalledSoftware) -> bool {
    software.name.chars().count() > 2 && software.version.chars().count() > 1
}

/// Drops records that are too short to be real program entries.
pub fn normalize(software: Vec<InstalledSoftware>) -> Vec<InstalledSoftware> {
    software
        .into_iter()
        .filter(|s| {
            let keep = is_meaningful(s);
            if !keep {
                debug!("Dropping entry '{}' version '{}'", s.name, s.version);
            }
            keep
        })
        .collect()
}

/// Removes repeated (name, version) pairs, keeping the first occurrence.
pub fn dedupe(software: Vec<InstalledSoftware>) -> Vec<InstalledSoftware> {
    let mut seen = HashSet::new();
    software
        .into_iter()
        .filter(|s| seen.insert((s.name.clone(), s.version.clone())))
        .collect()
}

/// Deduplicates the combined scanner output and applies the ignore list.
pub fn prepare(software: Vec<InstalledSoftware>, ignore: &IgnoreConfig) -> Vec<InstalledSoftware> {
    dedupe(software)
        .into_iter()
        .filter(|s| !ignore.should_ignore_software(&s.name))
        .collect()
}

/// Runs an external command and returns its stdout.
///
/// A non-zero exit status yields `Ok(None)`; failing to start the command
/// is an error.
pub(crate) fn command_output(program: &str, args: &[&str]) -> Result<Option<String>> {
    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("Failed to execute {}", program))?;

    if !output.status.success() {
        return Ok(None);
    }

    Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
}
