//! End-to-end tests for the CLI
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const INVENTORY: &str = r#"[
    {"name": "Google Chrome", "version": "105.0.5195.102", "publisher": "Google LLC"},
    {"name": "7-Zip 23.01 (x64)", "version": "23.01"},
    {"name": "Mystery Tool", "version": "unknown"}
]"#;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("inventory.json"), INVENTORY).unwrap();
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = cargo_bin_cmd!("cybervault");
        cmd.arg("--config")
            .arg(self.path().join("config.toml"))
            .arg("--data-dir")
            .arg(self.path().join("data"))
            .arg("--reports-dir")
            .arg(self.path().join("reports"));
        cmd
    }

    fn scan(&self, extra: &[&str]) -> assert_cmd::Command {
        let mut cmd = self.cmd();
        cmd.args(["scan", "--no-update", "--format", "json", "--inventory"])
            .arg(self.path().join("inventory.json"))
            .args(extra);
        cmd
    }

    fn reports(&self) -> Vec<String> {
        let dir = self.path().join("reports");
        if !dir.exists() {
            return Vec::new();
        }
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }
}

#[test]
fn test_help_and_version() {
    cargo_bin_cmd!("cybervault").arg("--help").assert().code(0);
    cargo_bin_cmd!("cybervault").arg("--version").assert().code(0);
}

#[test]
fn test_db_init_seeds_sample_records() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["db", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("9 CVE entries"));

    assert!(ws.path().join("data").join("cves.db").exists());

    ws.cmd()
        .args(["db", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("database has 9 CVE entries"));
}

#[test]
fn test_db_show() {
    let ws = Workspace::new();
    ws.cmd().args(["db", "init"]).assert().success();

    ws.cmd()
        .args(["db", "show", "CVE-2023-0003"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Product:   chrome"))
        .stdout(predicate::str::contains("100.0.0.0 to 110.0.0.0"))
        .stdout(predicate::str::contains("8.1 (High)"));

    ws.cmd()
        .args(["db", "show", "CVE-2099-9999"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not in the database"));
}

#[test]
fn test_db_init_without_seed() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["db", "init", "--no-seed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 CVE entries"));
}

#[test]
fn test_offline_inventory_scan_json() {
    let ws = Workspace::new();
    ws.cmd().args(["db", "init"]).assert().success();

    let output = ws.scan(&[]).assert().success().get_output().stdout.clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();

    assert_eq!(json["programs"].as_array().unwrap().len(), 3);

    let findings = json["findings"].as_array().unwrap();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0]["software"]["name"], "google chrome");

    let mut ids: Vec<&str> = findings[0]["matches"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["CVE-2023-0003", "CVE-2023-0004"]);

    assert_eq!(json["severity_totals"]["high"], 1);
    assert_eq!(json["severity_totals"]["medium"], 1);
}

#[test]
fn test_scan_writes_html_report() {
    let ws = Workspace::new();

    ws.scan(&[]).assert().success();

    let reports = ws.reports();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].starts_with("cybervault-report-"));
    assert!(reports[0].ends_with(".html"));

    let html = fs::read_to_string(ws.path().join("reports").join(&reports[0])).unwrap();
    assert!(html.contains("What This Report Means For You"));
    assert!(html.contains("google chrome (version: 105.0.5195.102)"));

    ws.cmd()
        .arg("reports")
        .assert()
        .success()
        .stdout(predicate::str::contains("cybervault-report-"));
}

#[test]
fn test_no_report_flag() {
    let ws = Workspace::new();
    ws.scan(&["--no-report"]).assert().success();
    assert!(ws.reports().is_empty());
}

#[test]
fn test_fail_on_exit_codes() {
    let ws = Workspace::new();
    ws.cmd().args(["db", "init"]).assert().success();

    ws.scan(&["--no-report", "--fail-on", "critical"]).assert().code(0);
    ws.scan(&["--no-report", "--fail-on", "high"]).assert().code(3);
    ws.scan(&["--no-report", "--fail-on", "medium"]).assert().code(3);
    ws.scan(&["--no-report", "--fail-on", "low"]).assert().code(3);
}

#[test]
fn test_ignore_list_from_config() {
    let ws = Workspace::new();
    fs::write(
        ws.path().join("config.toml"),
        "[ignore]\nvulnerabilities = [\"CVE-2023-0003\"]\n",
    )
    .unwrap();

    ws.scan(&["--no-report", "--fail-on", "high"]).assert().code(0);
    ws.scan(&["--no-report", "--fail-on", "medium"]).assert().code(4);
}

#[test]
fn test_db_import() {
    let ws = Workspace::new();
    let records = ws.path().join("records.json");
    fs::write(
        &records,
        r#"[{"id": "CVE-2024-7777", "vendor": "igor pavlov", "product": "7-zip",
             "version_start": "23.00", "version_end": "23.99", "cvss_score": 9.8}]"#,
    )
    .unwrap();

    ws.cmd()
        .args(["db", "import"])
        .arg(&records)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 1 CVE records."));

    ws.scan(&["--no-report", "--fail-on", "critical"]).assert().code(2);
}

#[test]
fn test_missing_inventory_is_not_fatal() {
    let ws = Workspace::new();
    let output = ws
        .cmd()
        .args(["scan", "--no-update", "--no-report", "--format", "json", "--inventory"])
        .arg(ws.path().join("absent.json"))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert!(json["programs"].as_array().unwrap().is_empty());
}

#[test]
fn test_invalid_format() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["scan", "--no-update", "--format", "pdf"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown format"));
}

#[test]
fn test_config_path_and_init() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["config", "--path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));

    ws.cmd().args(["config", "--init"]).assert().success();
    let content = fs::read_to_string(ws.path().join("config.toml")).unwrap();
    assert!(content.contains("database_url"));
}
