use super::{CveMatch, InstalledSoftware, Severity};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Format of [`ScanResult::timestamp`], also used in report file names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// All CVEs matched for one installed program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramFindings {
    pub software: InstalledSoftware,
    pub matches: Vec<CveMatch>,
}

impl ProgramFindings {
    pub fn new(software: InstalledSoftware, matches: Vec<CveMatch>) -> Self {
        Self { software, matches }
    }

    /// Highest CVSS score among the matches, if any carries one.
    pub fn highest_score(&self) -> Option<f64> {
        self.matches
            .iter()
            .filter_map(|m| m.cvss_score)
            .fold(None, |acc, s| Some(acc.map_or(s, |a: f64| a.max(s))))
    }

    /// Most urgent severity among the matches. Unscored matches only count
    /// when nothing else was found.
    pub fn highest_severity(&self) -> Severity {
        self.matches
            .iter()
            .map(|m| m.severity)
            .filter(|s| *s != Severity::Unknown)
            .min()
            .unwrap_or(if self.matches.is_empty() {
                Severity::None
            } else {
                Severity::Unknown
            })
    }

    pub fn severity_counts(&self) -> BTreeMap<Severity, usize> {
        let mut counts = BTreeMap::new();
        for m in &self.matches {
            *counts.entry(m.severity).or_default() += 1;
        }
        counts
    }

    /// Matches sorted by score, highest first; unscored matches last.
    pub fn sorted_matches(&self) -> Vec<&CveMatch> {
        let mut sorted: Vec<&CveMatch> = self.matches.iter().collect();
        sorted.sort_by(|a, b| {
            let a = a.cvss_score.unwrap_or(f64::NEG_INFINITY);
            let b = b.cvss_score.unwrap_or(f64::NEG_INFINITY);
            b.total_cmp(&a)
        });
        sorted
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub scan_time: DateTime<Local>,
    pub timestamp: String,
    pub programs: Vec<InstalledSoftware>,
    pub findings: Vec<ProgramFindings>,
    pub severity_totals: BTreeMap<Severity, usize>,
}

impl ScanResult {
    pub fn new(
        programs: Vec<InstalledSoftware>,
        findings: Vec<ProgramFindings>,
        include_unknown: bool,
    ) -> Self {
        Self::at(Local::now(), programs, findings, include_unknown)
    }

    /// Builds a result for a fixed scan time. Programs without matches are
    /// dropped from `findings`.
    pub fn at(
        scan_time: DateTime<Local>,
        programs: Vec<InstalledSoftware>,
        findings: Vec<ProgramFindings>,
        include_unknown: bool,
    ) -> Self {
        let findings: Vec<ProgramFindings> =
            findings.into_iter().filter(|f| !f.matches.is_empty()).collect();

        let mut severity_totals = BTreeMap::new();
        for finding in &findings {
            for m in &finding.matches {
                if include_unknown || m.severity != Severity::Unknown {
                    *severity_totals.entry(m.severity).or_default() += 1;
                }
            }
        }

        Self {
            timestamp: scan_time.format(TIMESTAMP_FORMAT).to_string(),
            scan_time,
            programs,
            findings,
            severity_totals,
        }
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.severity_totals.get(&severity).copied().unwrap_or(0)
    }

    pub fn total_vulnerabilities(&self) -> usize {
        self.severity_totals.values().sum()
    }

    pub fn vulnerable_programs(&self) -> usize {
        self.findings.len()
    }

    /// Findings ordered by their highest CVSS score, worst first.
    pub fn sorted_findings(&self) -> Vec<&ProgramFindings> {
        let mut sorted: Vec<&ProgramFindings> = self.findings.iter().collect();
        sorted.sort_by(|a, b| {
            let a = a.highest_score().unwrap_or(-1.0);
            let b = b.highest_score().unwrap_or(-1.0);
            b.total_cmp(&a)
        });
        sorted
    }

    /// One-line recommendation for the whole system.
    pub fn recommendation(&self) -> &'static str {
        if self.count(Severity::Critical) > 0 {
            "Critical vulnerabilities detected! Immediate action required."
        } else if self.count(Severity::High) > 0 {
            "High risk vulnerabilities found. Remediation advised within 7 days."
        } else if self.total_vulnerabilities() > 0 {
            "System security is in good standing. Continue regular monitoring."
        } else {
            "Your system appears secure. Continue regular updates and monitoring."
        }
    }

    /// Health score (0-100) based on the counted findings.
    pub fn health_score(&self) -> u8 {
        if self.programs.is_empty() {
            return 100;
        }

        let penalty: i32 = self
            .severity_totals
            .iter()
            .map(|(severity, count)| severity.penalty() * *count as i32)
            .sum();

        (100 - penalty).clamp(0, 100) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Source;
    use chrono::TimeZone;

    fn cve(id: &str, score: Option<f64>) -> CveMatch {
        CveMatch {
            id: id.to_string(),
            cvss_score: score,
            severity: Severity::from_score(score),
            description: format!("{} description", id),
            published_date: None,
        }
    }

    fn program(name: &str) -> InstalledSoftware {
        InstalledSoftware::new(name, "1.0", Source::Inventory)
    }

    #[test]
    fn test_timestamp_format() {
        let time = Local.with_ymd_and_hms(2023, 10, 26, 12, 30, 0).unwrap();
        let result = ScanResult::at(time, vec![], vec![], false);
        assert_eq!(result.timestamp, "20231026_123000");
        assert_eq!(result.total_vulnerabilities(), 0);
    }

    #[test]
    fn test_totals_exclude_unknown_by_default() {
        let findings = vec![ProgramFindings::new(
            program("vulnerable app"),
            vec![cve("CVE-1", Some(7.5)), cve("CVE-2", None)],
        )];

        let result = ScanResult::new(vec![program("vulnerable app")], findings.clone(), false);
        assert_eq!(result.count(Severity::High), 1);
        assert_eq!(result.count(Severity::Unknown), 0);
        assert_eq!(result.total_vulnerabilities(), 1);

        let result = ScanResult::new(vec![program("vulnerable app")], findings, true);
        assert_eq!(result.count(Severity::Unknown), 1);
        assert_eq!(result.total_vulnerabilities(), 2);
    }

    #[test]
    fn test_empty_findings_are_dropped() {
        let findings = vec![
            ProgramFindings::new(program("clean"), vec![]),
            ProgramFindings::new(program("dirty"), vec![cve("CVE-1", Some(5.0))]),
        ];
        let result = ScanResult::new(vec![program("clean"), program("dirty")], findings, false);
        assert_eq!(result.vulnerable_programs(), 1);
        assert_eq!(result.findings[0].software.name, "dirty");
    }

    #[test]
    fn test_findings_sorted_by_highest_score() {
        let findings = vec![
            ProgramFindings::new(program("medium"), vec![cve("CVE-1", Some(5.0))]),
            ProgramFindings::new(program("critical"), vec![cve("CVE-2", Some(9.8)), cve("CVE-3", Some(2.0))]),
            ProgramFindings::new(program("unscored"), vec![cve("CVE-4", None)]),
        ];
        let result = ScanResult::new(vec![], findings, true);
        let names: Vec<&str> = result
            .sorted_findings()
            .iter()
            .map(|f| f.software.name.as_str())
            .collect();
        assert_eq!(names, vec!["critical", "medium", "unscored"]);
    }

    #[test]
    fn test_highest_severity_and_counts() {
        let finding = ProgramFindings::new(
            program("app"),
            vec![cve("CVE-1", Some(3.0)), cve("CVE-2", Some(7.2)), cve("CVE-3", None)],
        );
        assert_eq!(finding.highest_severity(), Severity::High);
        assert_eq!(finding.highest_score(), Some(7.2));
        assert_eq!(finding.severity_counts().get(&Severity::Low), Some(&1));

        let only_unknown = ProgramFindings::new(program("app"), vec![cve("CVE-9", None)]);
        assert_eq!(only_unknown.highest_severity(), Severity::Unknown);
        assert_eq!(only_unknown.highest_score(), None);
    }

    #[test]
    fn test_sorted_matches_put_unscored_last() {
        let finding = ProgramFindings::new(
            program("app"),
            vec![cve("CVE-1", None), cve("CVE-2", Some(4.0)), cve("CVE-3", Some(9.1))],
        );
        let ids: Vec<&str> = finding.sorted_matches().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["CVE-3", "CVE-2", "CVE-1"]);
    }

    #[test]
    fn test_recommendation_and_health() {
        let clean = ScanResult::new(vec![program("a")], vec![], false);
        assert_eq!(
            clean.recommendation(),
            "Your system appears secure. Continue regular updates and monitoring."
        );
        assert_eq!(clean.health_score(), 100);

        let findings = vec![ProgramFindings::new(
            program("a"),
            vec![cve("CVE-1", Some(9.5)), cve("CVE-2", Some(7.0))],
        )];
        let bad = ScanResult::new(vec![program("a")], findings, false);
        assert_eq!(
            bad.recommendation(),
            "Critical vulnerabilities detected! Immediate action required."
        );
        assert_eq!(bad.health_score(), 60);

        let findings = vec![ProgramFindings::new(program("a"), vec![cve("CVE-1", Some(2.0))])];
        let low = ScanResult::new(vec![program("a")], findings, false);
        assert_eq!(
            low.recommendation(),
            "System security is in good standing. Continue regular monitoring."
        );
    }
}
