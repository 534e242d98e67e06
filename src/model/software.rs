use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Registry,
    System,
    Appx,
    Inventory,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Registry => "registry",
            Source::System => "system",
            Source::Appx => "appx",
            Source::Inventory => "inventory",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Source::Registry => "Registry",
            Source::System => "System",
            Source::Appx => "App Package",
            Source::Inventory => "Inventory",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    MacOS,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        #[cfg(target_os = "windows")]
        return Platform::Windows;
        #[cfg(target_os = "macos")]
        return Platform::MacOS;
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        return Platform::Linux;
    }
}

/// A program found on the system.
///
/// Names are lowercased at construction so that matching and
/// de-duplication do not depend on how the vendor capitalised them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstalledSoftware {
    pub name: String,
    pub version: String,
    pub source: Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_location: Option<PathBuf>,
}

impl InstalledSoftware {
    pub fn new(name: impl Into<String>, version: impl Into<String>, source: Source) -> Self {
        Self {
            name: name.into().trim().to_lowercase(),
            version: version.into().trim().to_string(),
            source,
            publisher: None,
            install_location: None,
        }
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    pub fn with_location(mut self, path: PathBuf) -> Self {
        self.install_location = Some(path);
        self
    }

    /// Key used to collapse duplicate entries (same program listed under
    /// several registry hives).
    pub fn key(&self) -> (&str, &str) {
        (&self.name, &self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_is_lowercased_and_trimmed() {
        let sw = InstalledSoftware::new("  Google Chrome ", " 105.0.1 ", Source::Registry);
        assert_eq!(sw.name, "google chrome");
        assert_eq!(sw.version, "105.0.1");
        assert_eq!(sw.key(), ("google chrome", "105.0.1"));
    }

    #[test]
    fn test_source_names() {
        assert_eq!(Source::Appx.as_str(), "appx");
        assert_eq!(Source::Registry.to_string(), "Registry");
    }
}
