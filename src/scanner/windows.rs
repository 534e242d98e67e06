use super::{normalize, registry};
use crate::model::{InstalledSoftware, Platform, Source};
use anyhow::Result;
use async_trait::async_trait;

const CURRENT_VERSION_KEY: &str = r"HKEY_LOCAL_MACHINE\SOFTWARE\Microsoft\Windows NT\CurrentVersion";

/// Reports the operating system itself as `windows <release>`.
pub struct WindowsVersionScanner;

pub(crate) fn windows_release(key: &registry::RegistryKey) -> Option<InstalledSoftware> {
    let build = key.get("CurrentBuildNumber")?;
    let release = key.get("DisplayVersion")?;
    Some(InstalledSoftware::new(
        format!("windows {}", release),
        build,
        Source::System,
    ))
}

#[async_trait]
impl super::Scanner for WindowsVersionScanner {
    fn name(&self) -> &'static str {
        "Windows Version"
    }

    fn source(&self) -> Source {
        Source::System
    }

    fn supported_platforms(&self) -> &[Platform] {
        &[Platform::Windows]
    }

    async fn scan(&self) -> Result<Vec<InstalledSoftware>> {
        let keys = registry::query(CURRENT_VERSION_KEY, false)?;
        let software = keys.iter().filter_map(windows_release).collect();
        Ok(normalize(software))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_release_from_key() {
        let output = "
HKEY_LOCAL_MACHINE\\SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion
    SystemRoot    REG_SZ    C:\\WINDOWS
    CurrentBuildNumber    REG_SZ    19045
    DisplayVersion    REG_SZ    22H2
    ProductName    REG_SZ    Windows 10 Pro
";
        let keys = registry::parse_reg_query(output);
        let software = windows_release(&keys[0]).unwrap();
        assert_eq!(software.name, "windows 22h2");
        assert_eq!(software.version, "19045");
        assert_eq!(software.source, Source::System);
    }

    #[test]
    fn test_missing_display_version() {
        let keys = registry::parse_reg_query(
            "HKEY_LOCAL_MACHINE\\X\n    CurrentBuildNumber    REG_SZ    7601\n",
        );
        assert!(windows_release(&keys[0]).is_none());
    }
}
