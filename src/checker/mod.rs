mod local;
mod version;

pub use local::{search_terms, LocalCveChecker};
pub use version::{parse_version, version_in_range, Version};

use crate::model::{InstalledSoftware, ProgramFindings};
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait VulnerabilityChecker: Send + Sync {
    fn name(&self) -> &'static str;
    async fn check(&self, programs: &[InstalledSoftware]) -> Result<Vec<ProgramFindings>>;
}
