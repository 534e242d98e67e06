use super::{command_output, normalize};
use crate::model::{InstalledSoftware, Platform, Source};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

const ROOTS: [&str; 2] = ["HKEY_LOCAL_MACHINE", "HKEY_CURRENT_USER"];

const UNINSTALL_PATHS: [&str; 2] = [
    r"SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall",
    r"SOFTWARE\WOW6432Node\Microsoft\Windows\CurrentVersion\Uninstall",
];

/// One key block of `reg query` output.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RegistryKey {
    pub path: String,
    pub values: HashMap<String, String>,
}

impl RegistryKey {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Parses the text printed by `reg query <key> [/s]`.
///
/// Key lines start with `HKEY_`; value lines are indented and hold
/// `name    REG_TYPE    data` separated by four spaces.
pub fn parse_reg_query(output: &str) -> Vec<RegistryKey> {
    let mut keys = Vec::new();
    let mut current: Option<RegistryKey> = None;

    for line in output.lines() {
        if line.starts_with("HKEY_") {
            if let Some(key) = current.take() {
                keys.push(key);
            }
            current = Some(RegistryKey {
                path: line.trim().to_string(),
                values: HashMap::new(),
            });
            continue;
        }

        let Some(key) = current.as_mut() else {
            continue;
        };

        if !line.starts_with(' ') {
            continue;
        }

        let mut fields = line.trim_start().splitn(3, "    ");
        let (Some(name), Some(kind)) = (fields.next(), fields.next()) else {
            continue;
        };
        if !kind.starts_with("REG_") {
            continue;
        }

        let data = fields.next().unwrap_or_default();
        key.values.insert(name.to_string(), data.to_string());
    }

    if let Some(key) = current {
        keys.push(key);
    }

    keys
}

/// Runs `reg query` and parses the result. Missing keys yield no blocks.
pub(crate) fn query(path: &str, recursive: bool) -> Result<Vec<RegistryKey>> {
    let mut args = vec!["query", path];
    if recursive {
        args.push("/s");
    }

    match command_output("reg", &args)? {
        Some(stdout) => Ok(parse_reg_query(&stdout)),
        None => {
            debug!("Registry key not found: {}", path);
            Ok(Vec::new())
        }
    }
}

/// Maps uninstall keys to software records. Keys without both a display
/// name and a display version are not installed programs.
/// Keys exactly one level below `parent`, compared case-insensitively.
pub fn direct_children<'a>(keys: &'a [RegistryKey], parent: &str) -> Vec<&'a RegistryKey> {
    keys.iter()
        .filter(|key| {
            let Some(prefix) = key.path.get(..parent.len()) else {
                return false;
            };
            if !prefix.eq_ignore_ascii_case(parent) {
                return false;
            }
            match key.path[parent.len()..].strip_prefix('\\') {
                Some(child) => !child.is_empty() && !child.contains('\\'),
                None => false,
            }
        })
        .collect()
}

pub fn software_from_keys<'a>(
    keys: impl IntoIterator<Item = &'a RegistryKey>,
) -> Vec<InstalledSoftware> {
    keys.into_iter()
        .filter_map(|key| {
            let name = key.get("DisplayName")?;
            let version = key.get("DisplayVersion")?;

            let mut software = InstalledSoftware::new(name, version, Source::Registry);
            if let Some(publisher) = key.get("Publisher") {
                software = software.with_publisher(publisher);
            }
            if let Some(location) = key.get("InstallLocation") {
                software = software.with_location(PathBuf::from(location));
            }
            Some(software)
        })
        .collect()
}

pub struct RegistryScanner;

#[async_trait]
impl super::Scanner for RegistryScanner {
    fn name(&self) -> &'static str {
        "Installed Programs"
    }

    fn source(&self) -> Source {
        Source::Registry
    }

    fn supported_platforms(&self) -> &[Platform] {
        &[Platform::Windows]
    }

    async fn scan(&self) -> Result<Vec<InstalledSoftware>> {
        let mut software = Vec::new();

        for root in ROOTS {
            for path in UNINSTALL_PATHS {
                let full = format!(r"{}\{}", root, path);
                match query(&full, true) {
                    Ok(keys) => software.extend(software_from_keys(direct_children(&keys, &full))),
                    Err(e) => debug!("Skipping {}: {}", full, e),
                }
            }
        }

        Ok(normalize(software))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\r
HKEY_LOCAL_MACHINE\\SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\Uninstall\\7-Zip\r
    DisplayName    REG_SZ    7-Zip 23.01 (x64)\r
    DisplayVersion    REG_SZ    23.01\r
    Publisher    REG_SZ    Igor Pavlov\r
    InstallLocation    REG_SZ    C:\\Program Files\\7-Zip\\\r
    NoModify    REG_DWORD    0x1\r
\r
HKEY_LOCAL_MACHINE\\SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\Uninstall\\{GUID-1}\r
    DisplayName    REG_SZ    Google Chrome\r
    DisplayVersion    REG_SZ    105.0.5195.102\r
    Comments    REG_SZ    \r
\r
HKEY_LOCAL_MACHINE\\SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\Uninstall\\Connection Manager\r
    SystemComponent    REG_DWORD    0x1\r
\r
HKEY_LOCAL_MACHINE\\SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\Uninstall\\NoVersion\r
    DisplayName    REG_SZ    Orphaned Tool\r
";

    #[test]
    fn test_parse_reg_query_blocks() {
        let keys = parse_reg_query(SAMPLE);
        assert_eq!(keys.len(), 4);
        assert!(keys[0].path.ends_with(r"Uninstall\7-Zip"));
        assert_eq!(keys[0].get("DisplayVersion"), Some("23.01"));
        assert_eq!(keys[0].get("NoModify"), Some("0x1"));
        assert_eq!(keys[1].get("Comments"), None);
        assert!(keys[2].get("DisplayName").is_none());
    }

    #[test]
    fn test_value_with_spaces() {
        let keys = parse_reg_query(SAMPLE);
        assert_eq!(keys[0].get("DisplayName"), Some("7-Zip 23.01 (x64)"));
        assert_eq!(keys[0].get("InstallLocation"), Some(r"C:\Program Files\7-Zip\"));
    }

    #[test]
    fn test_software_requires_name_and_version() {
        let software = software_from_keys(&parse_reg_query(SAMPLE));
        assert_eq!(software.len(), 2);

        assert_eq!(software[0].name, "7-zip 23.01 (x64)");
        assert_eq!(software[0].version, "23.01");
        assert_eq!(software[0].publisher.as_deref(), Some("Igor Pavlov"));
        assert_eq!(software[0].source, Source::Registry);

        assert_eq!(software[1].name, "google chrome");
        assert!(software[1].install_location.is_none());
    }

    #[test]
    fn test_nested_subkeys_are_not_programs() {
        let output = "\r
HKEY_LOCAL_MACHINE\\SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\Uninstall\r
\r
HKEY_LOCAL_MACHINE\\SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\Uninstall\\Acme Suite\r
    DisplayName    REG_SZ    Acme Suite\r
    DisplayVersion    REG_SZ    4.2\r
\r
HKEY_LOCAL_MACHINE\\SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\Uninstall\\Acme Suite\\Plugin\r
    DisplayName    REG_SZ    Acme Plugin\r
    DisplayVersion    REG_SZ    1.0\r
";
        let parent = r"HKEY_LOCAL_MACHINE\SOFTWARE\Microsoft\Windows\CurrentVersion\uninstall";
        let keys = parse_reg_query(output);
        assert_eq!(keys.len(), 3);

        let children = direct_children(&keys, parent);
        assert_eq!(children.len(), 1);

        let software = software_from_keys(children);
        assert_eq!(software.len(), 1);
        assert_eq!(software[0].name, "acme suite");
    }

    #[test]
    fn test_ignores_noise_before_first_key() {
        let keys = parse_reg_query("ERROR: junk\n    Orphan    REG_SZ    value\n");
        assert!(keys.is_empty());
    }
}
