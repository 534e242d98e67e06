use super::version::{parse_version, version_in_range};
use super::VulnerabilityChecker;
use crate::config::IgnoreConfig;
use crate::model::{CveMatch, CveRecord, InstalledSoftware, ProgramFindings};
use crate::store::CveStore;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::{debug, warn};

const MICROSOFT_PRODUCTS: [&str; 5] = ["office", "excel", "word", "powerpoint", "outlook"];
const ADOBE_PRODUCTS: [&str; 3] = ["reader", "acrobat", "flash"];

/// Matches installed programs against the local CVE database.
pub struct LocalCveChecker {
    store: CveStore,
    include_unknown: bool,
    ignore: IgnoreConfig,
}

impl LocalCveChecker {
    pub fn new(store: CveStore) -> Self {
        Self {
            store,
            include_unknown: false,
            ignore: IgnoreConfig::default(),
        }
    }

    /// Also report CVEs that have no CVSS score.
    pub fn with_include_unknown(mut self, include_unknown: bool) -> Self {
        self.include_unknown = include_unknown;
        self
    }

    pub fn with_ignore(mut self, ignore: IgnoreConfig) -> Self {
        self.ignore = ignore;
        self
    }

    pub async fn close(self) {
        self.store.close().await;
    }

    /// Returns the CVEs affecting a single program.
    pub async fn check_program(&self, program: &InstalledSoftware) -> Result<Vec<CveMatch>> {
        let Some(installed) = parse_version(&program.version) else {
            debug!(
                "Skipping {}: unparsable version '{}'",
                program.name, program.version
            );
            return Ok(Vec::new());
        };

        let mut seen = HashSet::new();
        let mut matches = Vec::new();

        for term in search_terms(&program.name) {
            let records = match self.store.search(&term).await {
                Ok(records) => records,
                Err(e) => {
                    warn!("CVE lookup for '{}' failed: {}", term, e);
                    continue;
                }
            };

            for record in records {
                if seen.contains(&record.id) || !self.accepts(&record) {
                    continue;
                }

                match version_in_range(
                    &installed,
                    record.version_start.as_deref(),
                    record.version_end.as_deref(),
                ) {
                    Some(true) => {
                        debug!("{} {} affected by {}", program.name, installed, record.id);
                        seen.insert(record.id.clone());
                        matches.push(CveMatch::from(record));
                    }
                    Some(false) => {}
                    None => debug!("Skipping {}: unparsable version bound", record.id),
                }
            }
        }

        Ok(matches)
    }

    fn accepts(&self, record: &CveRecord) -> bool {
        if record.cvss_score.is_none() && !self.include_unknown {
            return false;
        }
        !self.ignore.should_ignore_vulnerability(&record.id)
    }
}

#[async_trait]
impl VulnerabilityChecker for LocalCveChecker {
    fn name(&self) -> &'static str {
        "Local CVE database"
    }

    async fn check(&self, programs: &[InstalledSoftware]) -> Result<Vec<ProgramFindings>> {
        let mut findings = Vec::new();

        for program in programs {
            let matches = self.check_program(program).await?;
            if !matches.is_empty() {
                findings.push(ProgramFindings::new(program.clone(), matches));
            }
        }

        Ok(findings)
    }
}

/// Derives the product/vendor terms looked up for a program name.
///
/// Registry display names rarely match the product names used in CVE
/// records, so the first one or two words are used along with a few
/// well-known product families.
pub fn search_terms(name: &str) -> Vec<String> {
    let name = name.trim().to_lowercase();
    let words: Vec<&str> = name.split_whitespace().collect();

    let mut terms: Vec<String> = Vec::new();
    let mut push = |term: &str| {
        if !term.is_empty() && !terms.iter().any(|t| t == term) {
            terms.push(term.to_string());
        }
    };

    if let Some(first) = words.first() {
        push(*first);
    }
    if words.len() > 1 {
        push(words[..2].join(" ").as_str());
    }

    if name.contains("chrome") {
        push("chromium");
    } else if name.contains("microsoft") {
        for product in MICROSOFT_PRODUCTS.iter().filter(|p| name.contains(*p)) {
            push(*product);
        }
    } else if name.contains("adobe") {
        for product in ADOBE_PRODUCTS.iter().filter(|p| name.contains(*p)) {
            push(*product);
        }
    }

    terms
}
