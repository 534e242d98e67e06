use crate::model::{ScanResult, Severity};
use anyhow::Result;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct ProgramRow {
    #[tabled(rename = "Program")]
    name: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Vulnerabilities")]
    count: usize,
    #[tabled(rename = "Highest Severity")]
    severity: String,
    #[tabled(rename = "Action")]
    action: String,
}

#[derive(Tabled)]
struct CveRow {
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Program")]
    program: String,
    #[tabled(rename = "CVE")]
    cve: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Description")]
    description: String,
}

#[derive(Tabled)]
struct SeverityRow {
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Count")]
    count: usize,
    #[tabled(rename = "Percentage")]
    percentage: String,
    #[tabled(rename = "Action")]
    action: String,
}

pub fn print_cli_table(result: &ScanResult) -> Result<()> {
    println!();
    println!(
        "Scan completed at: {}",
        result.scan_time.format("%Y-%m-%d %H:%M:%S")
    );
    println!("Programs scanned: {}", result.programs.len());
    println!();

    if result.findings.is_empty() {
        println!("No vulnerable programs found.");
    } else {
        println!(
            "Found {} vulnerable programs:",
            result.vulnerable_programs()
        );
        println!();

        let findings = result.sorted_findings();
        let rows: Vec<ProgramRow> = findings
            .iter()
            .map(|f| {
                let severity = f.highest_severity();
                ProgramRow {
                    name: truncate(&f.software.name, 40),
                    version: f.software.version.clone(),
                    count: f.matches.len(),
                    severity: format_severity(&severity),
                    action: severity.action().to_string(),
                }
            })
            .collect();

        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{}", table);

        println!();
        println!("Vulnerabilities:");
        println!();

        let rows: Vec<CveRow> = findings
            .iter()
            .flat_map(|f| {
                f.sorted_matches().into_iter().map(move |m| CveRow {
                    severity: format_severity(&m.severity),
                    program: truncate(&f.software.name, 30),
                    cve: m.id.clone(),
                    score: format_score(m.cvss_score),
                    description: truncate(&m.description, 50),
                })
            })
            .collect();

        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{}", table);
    }

    println!();
    print_summary(result);

    Ok(())
}

fn print_summary(result: &ScanResult) {
    let total = result.total_vulnerabilities();

    if total > 0 {
        println!("Severity breakdown:");
        println!();

        let rows: Vec<SeverityRow> = Severity::ALL
            .iter()
            .filter(|s| result.count(**s) > 0)
            .map(|s| {
                let count = result.count(*s);
                SeverityRow {
                    severity: format_severity(s),
                    count,
                    percentage: format!("{:.1}%", count as f64 * 100.0 / total as f64),
                    action: s.action().to_string(),
                }
            })
            .collect();

        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{}", table);
        println!();
    }

    println!("Summary:");
    println!("  Total programs: {}", result.programs.len());
    if total > 0 {
        println!(
            "  Vulnerabilities: {} critical, {} high, {} medium, {} low",
            result.count(Severity::Critical),
            result.count(Severity::High),
            result.count(Severity::Medium),
            result.count(Severity::Low)
        );
    }
    println!("  {}", result.recommendation());

    let score = result.health_score();
    println!();
    println!("Health Score: {}/100 {}", score, health_score_indicator(score));
}

fn format_severity(severity: &Severity) -> String {
    match severity {
        Severity::Critical => "\x1b[31mCRITICAL\x1b[0m".to_string(),
        Severity::High => "\x1b[91mHIGH\x1b[0m".to_string(),
        Severity::Medium => "\x1b[33mMEDIUM\x1b[0m".to_string(),
        Severity::Low => "\x1b[32mLOW\x1b[0m".to_string(),
        Severity::None => "NONE".to_string(),
        Severity::Unknown => "UNKNOWN".to_string(),
    }
}

fn format_score(score: Option<f64>) -> String {
    score.map_or_else(|| "-".to_string(), |s| format!("{:.1}", s))
}

pub(crate) fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn health_score_indicator(score: u8) -> &'static str {
    match score {
        90..=100 => "[Excellent]",
        70..=89 => "[Good]",
        50..=69 => "[Fair]",
        25..=49 => "[Poor]",
        _ => "[Critical]",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
        assert_eq!(truncate("überlange Beschreibung", 8), "überl...");
    }

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(Some(7.25)), "7.2");
        assert_eq!(format_score(None), "-");
    }

    #[test]
    fn test_health_indicator() {
        assert_eq!(health_score_indicator(100), "[Excellent]");
        assert_eq!(health_score_indicator(75), "[Good]");
        assert_eq!(health_score_indicator(10), "[Critical]");
    }
}
