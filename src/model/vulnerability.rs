use serde::{Deserialize, Serialize};

/// Lower CVSS bound of each severity class.
pub const CRITICAL_THRESHOLD: f64 = 9.0;
pub const HIGH_THRESHOLD: f64 = 7.0;
pub const MEDIUM_THRESHOLD: f64 = 4.0;
pub const LOW_THRESHOLD: f64 = 0.1;

/// Severity class derived from a CVSS base score.
///
/// Variants are declared in priority order, so sorting (or iterating a
/// `BTreeMap<Severity, _>`) yields the most urgent class first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    None,
    Unknown,
}

impl Severity {
    /// Every class in priority order.
    pub const ALL: [Severity; 6] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::None,
        Severity::Unknown,
    ];

    /// Classifies a CVSS base score. A missing score is `Unknown`.
    pub fn from_score(score: Option<f64>) -> Self {
        let Some(score) = score else {
            return Severity::Unknown;
        };

        match score {
            s if s >= CRITICAL_THRESHOLD => Severity::Critical,
            s if s >= HIGH_THRESHOLD => Severity::High,
            s if s >= MEDIUM_THRESHOLD => Severity::Medium,
            s if s >= LOW_THRESHOLD => Severity::Low,
            _ => Severity::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
            Severity::None => "None",
            Severity::Unknown => "Unknown",
        }
    }

    /// Recommended action for software whose worst finding has this severity.
    pub fn action(&self) -> &'static str {
        match self {
            Severity::Critical => "Update immediately or uninstall",
            Severity::High => "Update as soon as possible",
            Severity::Medium => "Consider updating in the next maintenance cycle",
            Severity::Low => "Optional update at your convenience",
            Severity::None => "No action required",
            Severity::Unknown => "Review manually",
        }
    }

    /// Plain-language explanation used in the report document.
    pub fn explanation(&self) -> &'static str {
        match self {
            Severity::Critical => "Urgent security issues that could allow attackers to take control of your computer or steal sensitive information.",
            Severity::High => "Serious vulnerabilities that should be fixed as soon as possible to protect your system.",
            Severity::Medium => "Important issues that should be addressed during your next regular maintenance.",
            Severity::Low => "Minor security weaknesses that pose limited risk.",
            Severity::None => "Informational entries without measurable impact.",
            Severity::Unknown => "Entries the database carries no CVSS score for.",
        }
    }

    /// Health score penalty per finding of this severity.
    pub fn penalty(&self) -> i32 {
        match self {
            Severity::Critical => 25,
            Severity::High => 15,
            Severity::Medium => 8,
            Severity::Low => 3,
            Severity::None => 0,
            Severity::Unknown => 5,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a textual CVSS score (e.g. `"7.5"`) into a severity level.
pub fn parse_cvss_score(score: &str) -> Severity {
    match score.trim().parse::<f64>() {
        Ok(cvss) if cvss.is_finite() => Severity::from_score(Some(cvss)),
        _ => Severity::Unknown,
    }
}

/// One row of the local `cves` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CveRecord {
    pub id: String,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub version_start: Option<String>,
    #[serde(default)]
    pub version_end: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub cvss_score: Option<f64>,
}

impl CveRecord {
    pub fn severity(&self) -> Severity {
        Severity::from_score(self.cvss_score)
    }
}

/// A CVE found to affect a particular installed program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CveMatch {
    pub id: String,
    pub cvss_score: Option<f64>,
    pub severity: Severity,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
}

impl From<CveRecord> for CveMatch {
    fn from(record: CveRecord) -> Self {
        Self {
            severity: record.severity(),
            id: record.id,
            cvss_score: record.cvss_score,
            description: record.description.unwrap_or_default(),
            published_date: record.published_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_score_boundaries() {
        let cases = [
            (0.0, Severity::None),
            (0.09, Severity::None),
            (0.1, Severity::Low),
            (3.9, Severity::Low),
            (3.99, Severity::Low),
            (4.0, Severity::Medium),
            (6.99, Severity::Medium),
            (7.0, Severity::High),
            (8.99, Severity::High),
            (9.0, Severity::Critical),
            (10.0, Severity::Critical),
        ];

        for (score, expected) in cases {
            assert_eq!(Severity::from_score(Some(score)), expected, "score {}", score);
        }
    }

    #[test]
    fn test_missing_score_is_unknown() {
        assert_eq!(Severity::from_score(None), Severity::Unknown);
    }

    #[test]
    fn test_just_below_thresholds() {
        assert_eq!(Severity::from_score(Some(LOW_THRESHOLD - 0.01)), Severity::None);
        assert_eq!(Severity::from_score(Some(MEDIUM_THRESHOLD - 0.01)), Severity::Low);
        assert_eq!(Severity::from_score(Some(HIGH_THRESHOLD - 0.01)), Severity::Medium);
        assert_eq!(Severity::from_score(Some(CRITICAL_THRESHOLD - 0.01)), Severity::High);
    }

    #[test]
    fn test_parse_cvss_score_text() {
        assert_eq!(parse_cvss_score("7.5"), Severity::High);
        assert_eq!(parse_cvss_score("0.0"), Severity::None);
        assert_eq!(parse_cvss_score("9.8"), Severity::Critical);
        assert_eq!(parse_cvss_score(" 4.2 "), Severity::Medium);
        assert_eq!(parse_cvss_score("not a number"), Severity::Unknown);
        assert_eq!(parse_cvss_score("NaN"), Severity::Unknown);
    }

    #[test]
    fn test_priority_order() {
        let mut levels = vec![Severity::Low, Severity::Unknown, Severity::Critical, Severity::None];
        levels.sort();
        assert_eq!(
            levels,
            vec![Severity::Critical, Severity::Low, Severity::None, Severity::Unknown]
        );
    }

    #[test]
    fn test_cve_match_from_record() {
        let record = CveRecord {
            id: "CVE-2023-0003".to_string(),
            vendor: Some("google".to_string()),
            product: Some("chrome".to_string()),
            version_start: Some("100.0.0.0".to_string()),
            version_end: Some("110.0.0.0".to_string()),
            description: None,
            published_date: Some("2023-02-01".to_string()),
            cvss_score: Some(8.1),
        };

        let m = CveMatch::from(record);
        assert_eq!(m.severity, Severity::High);
        assert_eq!(m.description, "");
        assert_eq!(m.published_date.as_deref(), Some("2023-02-01"));
    }
}
