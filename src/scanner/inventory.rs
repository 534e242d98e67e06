use super::normalize;
use crate::model::{InstalledSoftware, Platform, Source};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Reads software from a JSON file instead of the local machine.
///
/// The file holds an array of `{"name", "version", "publisher"?}` objects,
/// e.g. an export taken from another computer.
pub struct InventoryScanner {
    path: PathBuf,
}

#[derive(Deserialize)]
struct InventoryEntry {
    name: String,
    version: String,
    #[serde(default)]
    publisher: Option<String>,
}

impl InventoryScanner {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

pub fn parse_inventory(content: &str) -> Result<Vec<InstalledSoftware>> {
    let entries: Vec<InventoryEntry> =
        serde_json::from_str(content).context("Failed to parse inventory file")?;

    let software = entries
        .into_iter()
        .map(|entry| {
            let software = InstalledSoftware::new(entry.name, entry.version, Source::Inventory);
            match entry.publisher {
                Some(publisher) if !publisher.trim().is_empty() => {
                    software.with_publisher(publisher.trim())
                }
                _ => software,
            }
        })
        .collect();

    Ok(normalize(software))
}

#[async_trait]
impl super::Scanner for InventoryScanner {
    fn name(&self) -> &'static str {
        "Inventory File"
    }

    fn source(&self) -> Source {
        Source::Inventory
    }

    fn supported_platforms(&self) -> &[Platform] {
        &[Platform::Linux, Platform::MacOS, Platform::Windows]
    }

    async fn scan(&self) -> Result<Vec<InstalledSoftware>> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read inventory file {}", self.path.display()))?;
        parse_inventory(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Scanner;

    #[test]
    fn test_parse_inventory() {
        let software = parse_inventory(
            r#"[
                {"name": "Google Chrome", "version": "105.0.5195.102", "publisher": "Google LLC"},
                {"name": "VLC media player", "version": "3.0.18"},
                {"name": "XY", "version": "1.0"},
                {"name": "Tool", "version": "1"}
            ]"#,
        )
        .unwrap();

        assert_eq!(software.len(), 2);
        assert_eq!(software[0].name, "google chrome");
        assert_eq!(software[0].publisher.as_deref(), Some("Google LLC"));
        assert_eq!(software[1].name, "vlc media player");
        assert!(software[1].publisher.is_none());
    }

    #[test]
    fn test_invalid_inventory() {
        assert!(parse_inventory("{\"name\": \"x\"}").is_err());
        assert!(parse_inventory("[{\"name\": \"missing version\"}]").is_err());
    }

    #[tokio::test]
    async fn test_scan_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("inventory.json");
        fs::write(&path, r#"[{"name": "Mozilla Firefox", "version": "105.0"}]"#).unwrap();

        let scanner = InventoryScanner::new(&path);
        assert!(scanner.is_supported());
        let software = scanner.scan().await.unwrap();
        assert_eq!(software.len(), 1);
        assert_eq!(software[0].source, Source::Inventory);

        let missing = InventoryScanner::new(tmp.path().join("absent.json"));
        assert!(missing.scan().await.is_err());
    }
}
