//! HTML report document.
//!
//! Generates a self-contained report written for a non-technical reader:
//! what the findings mean, what to do about them, and per-program details.

use crate::model::{CveMatch, ProgramFindings, ScanResult, Severity};
use anyhow::Result;

/// Matches listed per program before the remainder is summarized.
const TOP_MATCHES: usize = 5;

/// Longest description shown before it is cut off with `...`.
const DESCRIPTION_LIMIT: usize = 150;

/// Generate and print HTML report output
pub fn print_html(result: &ScanResult) -> Result<()> {
    let html = generate_html_string(result);
    println!("{}", html);
    Ok(())
}

/// Generate HTML as a string (for file output)
pub fn generate_html_string(result: &ScanResult) -> String {
    let mut html = String::new();

    html.push_str(&format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>CyberVault Vulnerability Scan - {}</title>
    <style>
        :root {{
            --bg-color: #f5f6fa;
            --card-bg: #ffffff;
            --text-color: #222;
            --text-muted: #666;
            --border-color: #d8dbe5;
            --critical: #8b0000;
            --high: #d9534f;
            --medium: #f0ad4e;
            --low: #5bc0de;
            --none: #5cb85c;
            --accent: #2c3e50;
        }}
        * {{ box-sizing: border-box; margin: 0; padding: 0; }}
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: var(--bg-color);
            color: var(--text-color);
            line-height: 1.6;
            padding: 2rem;
        }}
        .container {{ max-width: 960px; margin: 0 auto; }}
        header {{ margin-bottom: 2rem; padding-bottom: 1rem; border-bottom: 2px solid var(--accent); }}
        h1 {{ font-size: 1.9rem; color: var(--accent); }}
        .timestamp {{ color: var(--text-muted); font-size: 0.9rem; }}
        section {{ margin-bottom: 2rem; }}
        h2 {{ font-size: 1.35rem; margin-bottom: 0.75rem; color: var(--accent); }}
        h3 {{ font-size: 1.1rem; margin-bottom: 0.5rem; }}
        p {{ margin-bottom: 0.75rem; }}
        .card {{
            background: var(--card-bg);
            padding: 1.25rem;
            border-radius: 8px;
            border: 1px solid var(--border-color);
            margin-bottom: 1rem;
        }}
        .highlight {{ background: #eef3fb; }}
        ul, ol {{ margin-left: 1.5rem; }}
        li {{ margin-bottom: 0.5rem; }}
        table {{ width: 100%; border-collapse: collapse; background: var(--card-bg); }}
        th, td {{ padding: 0.6rem 0.9rem; text-align: left; border: 1px solid var(--border-color); }}
        th {{ background: var(--accent); color: white; }}
        .severity-critical {{ color: var(--critical); }}
        .severity-high {{ color: var(--high); }}
        .severity-medium {{ color: var(--medium); }}
        .severity-low {{ color: var(--low); }}
        .severity-none {{ color: var(--none); }}
        .severity-unknown {{ color: var(--text-muted); }}
        .cve {{ font-size: 0.9rem; margin-left: 1rem; margin-bottom: 0.4rem; }}
        .health {{ font-size: 1.5rem; font-weight: 700; }}
        .empty {{ text-align: center; padding: 2rem; color: var(--text-muted); }}
        footer {{ text-align: center; color: var(--text-muted); font-size: 0.8rem; margin-top: 2rem; padding-top: 1rem; border-top: 1px solid var(--border-color); }}
    </style>
</head>
<body>
    <div class="container">
        <header>
            <h1>CyberVault Vulnerability Scan</h1>
            <span class="timestamp">Date: {}</span>
        </header>
"#,
        result.scan_time.format("%Y-%m-%d"),
        result.scan_time.format("%Y-%m-%d %H:%M:%S")
    ));

    push_overview(&mut html, result);
    push_actions(&mut html, result);
    push_severity_summary(&mut html, result);
    push_details(&mut html, result);

    html.push_str(
        r#"        <footer>
            Generated by cybervault
        </footer>
    </div>
</body>
</html>
"#,
    );

    html
}

fn push_overview(html: &mut String, result: &ScanResult) {
    let critical = result.count(Severity::Critical);
    let high = result.count(Severity::High);

    html.push_str(
        r#"        <section>
            <h2>What This Report Means For You</h2>
            <p>This report found security vulnerabilities in software installed on your computer. A vulnerability is like a weak spot in your software that could potentially be exploited by hackers. The higher the severity level, the more urgent it is to address the issue.</p>
"#,
    );

    html.push_str(&format!(
        r#"            <div class="card highlight">
                <h3>Key Findings</h3>
                <ul>
                    <li>We scanned {} software programs on your computer</li>
                    <li>{} of these programs have potential security issues</li>
                    <li>We found a total of {} vulnerabilities</li>
"#,
        result.programs.len(),
        result.vulnerable_programs(),
        result.total_vulnerabilities()
    ));

    if critical > 0 {
        html.push_str(&format!(
            "                    <li><strong>{} critical vulnerabilities require immediate attention</strong></li>\n",
            critical
        ));
    }
    if high > 0 {
        html.push_str(&format!(
            "                    <li><strong>{} high-severity vulnerabilities should be addressed soon</strong></li>\n",
            high
        ));
    }

    let score = result.health_score();
    html.push_str(&format!(
        r#"                </ul>
                <p>{}</p>
                <p>Health score: <span class="health {}">{}/100</span></p>
            </div>
        </section>
"#,
        result.recommendation(),
        health_class(score),
        score
    ));
}

fn push_actions(html: &mut String, result: &ScanResult) {
    html.push_str(
        r#"        <section>
            <h2>What You Should Do</h2>
            <div class="card">
                <ol>
"#,
    );

    if result.count(Severity::Critical) > 0 || result.count(Severity::High) > 0 {
        html.push_str(
            r#"                    <li><strong>Update Your Software</strong>: Most vulnerabilities can be fixed by updating to the latest version of the software. Look for "Check for updates" options in your programs or visit the software providers' websites.</li>
                    <li><strong>Prioritize Critical and High Severity Issues</strong>: Focus on updating the programs listed with Critical and High severity ratings first.</li>
                    <li><strong>Consider Alternatives</strong>: If updates are not available for vulnerable software, consider replacing it with more secure alternatives.</li>
"#,
        );
    } else {
        html.push_str(
            r#"                    <li><strong>Regular Updates</strong>: Continue to keep your software updated to maintain good security.</li>
                    <li><strong>Periodic Scanning</strong>: Run this vulnerability scan regularly (e.g., monthly) to check for new issues.</li>
"#,
        );
    }

    html.push_str(
        r#"                </ol>
                <p><strong>Need Help?</strong> If you're unsure how to update specific software, search online for "[software name] update guide" or contact your IT support.</p>
            </div>
        </section>
"#,
    );
}

fn push_severity_summary(html: &mut String, result: &ScanResult) {
    html.push_str(
        r#"        <section>
            <h2>Severity Summary</h2>
"#,
    );

    let rows: Vec<Severity> = Severity::ALL
        .into_iter()
        .filter(|s| result.count(*s) > 0)
        .collect();

    if rows.is_empty() {
        html.push_str("            <div class=\"empty\">No vulnerabilities found</div>\n");
    } else {
        html.push_str(
            r#"            <table>
                <thead>
                    <tr>
                        <th>Severity</th>
                        <th>Count</th>
                        <th>Action Required</th>
                    </tr>
                </thead>
                <tbody>
"#,
        );

        for severity in rows {
            html.push_str(&format!(
                r#"                    <tr>
                        <td class="{}">{}</td>
                        <td>{}</td>
                        <td>{}</td>
                    </tr>
"#,
                severity_class(severity),
                severity.as_str(),
                result.count(severity),
                severity.action()
            ));
        }

        html.push_str(
            r#"                </tbody>
            </table>
"#,
        );
    }

    html.push_str(
        r#"            <h3 style="margin-top: 1rem;">Understanding Severity Levels</h3>
            <div class="card">
"#,
    );
    for severity in [Severity::Critical, Severity::High, Severity::Medium, Severity::Low] {
        html.push_str(&format!(
            "                <p><strong class=\"{}\">{}</strong>: {}</p>\n",
            severity_class(severity),
            severity.as_str(),
            severity.explanation()
        ));
    }
    html.push_str("            </div>\n        </section>\n");
}

fn push_details(html: &mut String, result: &ScanResult) {
    html.push_str(
        r#"        <section>
            <h2>Detailed Findings</h2>
"#,
    );

    let findings = result.sorted_findings();
    if findings.is_empty() {
        html.push_str("            <div class=\"empty\">No vulnerable programs found</div>\n");
    }

    for finding in findings {
        push_program(html, finding);
    }

    html.push_str("        </section>\n");
}

fn push_program(html: &mut String, finding: &ProgramFindings) {
    let highest = finding.highest_severity();
    let counts = finding.severity_counts();
    let count = |s: Severity| counts.get(&s).copied().unwrap_or(0);

    let note = match highest {
        Severity::Critical | Severity::High => {
            "This software has serious security issues that need attention."
        }
        Severity::Medium => "This software has important but less urgent security issues.",
        _ => "This software has minor security concerns.",
    };

    html.push_str(&format!(
        r#"            <div class="card">
                <h3 class="{}">{} (version: {})</h3>
                <p><strong>Recommended Action</strong>: {} - {}</p>
                <p>Total vulnerabilities: {}<br>Severity breakdown: Critical: {}, High: {}, Medium: {}, Low: {}</p>
                <p>Top Vulnerabilities:</p>
"#,
        severity_class(highest),
        html_escape(&finding.software.name),
        html_escape(&finding.software.version),
        highest.action(),
        note,
        finding.matches.len(),
        count(Severity::Critical),
        count(Severity::High),
        count(Severity::Medium),
        count(Severity::Low)
    ));

    let sorted = finding.sorted_matches();
    for m in sorted.iter().take(TOP_MATCHES) {
        html.push_str(&format!(
            "                <p class=\"cve\"><strong>{}</strong> (Score: {}, {}): {}</p>\n",
            html_escape(&m.id),
            score_text(m),
            m.severity.as_str(),
            html_escape(&shorten(&m.description, DESCRIPTION_LIMIT))
        ));
    }

    if sorted.len() > TOP_MATCHES {
        html.push_str(&format!(
            "                <p class=\"cve\">... and {} more vulnerabilities</p>\n",
            sorted.len() - TOP_MATCHES
        ));
    }

    html.push_str("            </div>\n");
}

fn score_text(m: &CveMatch) -> String {
    m.cvss_score
        .map_or_else(|| "N/A".to_string(), |s| format!("{:.1}", s))
}

/// Keeps the first `limit` characters, appending `...` when cut.
fn shorten(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        let kept: String = text.chars().take(limit).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}

fn severity_class(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "severity-critical",
        Severity::High => "severity-high",
        Severity::Medium => "severity-medium",
        Severity::Low => "severity-low",
        Severity::None => "severity-none",
        Severity::Unknown => "severity-unknown",
    }
}

fn health_class(score: u8) -> &'static str {
    match score {
        70..=100 => "severity-none",
        50..=69 => "severity-medium",
        25..=49 => "severity-high",
        _ => "severity-critical",
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
