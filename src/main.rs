use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand, ValueEnum};
use cybervault::{
    cache::Cache,
    checker::{LocalCveChecker, VulnerabilityChecker},
    config::Config,
    model::{CveRecord, InstalledSoftware, ScanResult, Severity},
    output::{list_reports, print_result, write_report, OutputFormat},
    scanner::{all_scanners, prepare, InventoryScanner, Scanner},
    store::{refresh::in_maintenance_window, CveStore, DatabaseManager, StoreStatus},
};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Exit codes for CI integration
mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const CRITICAL_VULN: u8 = 2;
    pub const HIGH_VULN: u8 = 3;
    pub const MEDIUM_VULN: u8 = 4;
    pub const LOW_VULN: u8 = 5;
    pub const ERROR: u8 = 1;
}

#[derive(Parser)]
#[command(name = "cybervault")]
#[command(
    author,
    version,
    about = "Scan installed software for known vulnerabilities and write a plain-language report"
)]
struct Cli {
    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the CVE database
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory reports are written to
    #[arg(long, global = true)]
    reports_dir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan installed software for vulnerabilities
    Scan {
        /// Output format (table, json, html)
        #[arg(short, long)]
        format: Option<String>,

        /// Read software from a JSON inventory file instead of this machine
        #[arg(short, long)]
        inventory: Option<PathBuf>,

        /// Also report CVEs without a CVSS score
        #[arg(long)]
        include_unknown: bool,

        /// Do not download a newer CVE database
        #[arg(long)]
        no_update: bool,

        /// Do not write a report file
        #[arg(long)]
        no_report: bool,

        /// Disable concurrent scanning (scan sources sequentially)
        #[arg(long)]
        no_parallel: bool,

        /// Exit with error if vulnerabilities at or above this severity are found
        #[arg(long, value_enum)]
        fail_on: Option<FailLevel>,
    },

    /// Manage the local CVE database
    Db {
        #[command(subcommand)]
        action: DbCommand,
    },

    /// List previously written reports
    Reports,

    /// List available sources
    ListSources,

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Clear the cache
    ClearCache,
}

#[derive(Subcommand)]
enum DbCommand {
    /// Show whether the database is usable
    Status,

    /// Download the remote database now
    Update,

    /// Create an empty local database
    Init {
        /// Do not insert the sample records
        #[arg(long)]
        no_seed: bool,
    },

    /// Import CVE records from a JSON file
    Import {
        /// JSON array of CVE records
        file: PathBuf,
    },

    /// Show a single CVE record
    Show {
        /// CVE identifier, e.g. CVE-2023-0003
        id: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FailLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl FailLevel {
    fn severity(self) -> Severity {
        match self {
            FailLevel::Critical => Severity::Critical,
            FailLevel::High => Severity::High,
            FailLevel::Medium => Severity::Medium,
            FailLevel::Low => Severity::Low,
        }
    }
}

struct ScanOptions {
    format: OutputFormat,
    inventory: Option<PathBuf>,
    include_unknown: bool,
    update: bool,
    write_report: bool,
    parallel: bool,
    fail_on: Option<FailLevel>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<(Config, PathBuf)> {
    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load().unwrap_or_else(|e| {
            warn!("Ignoring unreadable config file: {:#}", e);
            Config::default()
        }),
    };

    if let Some(dir) = &cli.data_dir {
        config.data_dir = Some(dir.clone());
    }
    if let Some(dir) = &cli.reports_dir {
        config.reports_dir = Some(dir.clone());
    }

    Ok((config, config_path))
}

async fn run(cli: Cli) -> Result<u8> {
    let (config, config_path) = load_config(&cli)?;

    match cli.command {
        Commands::Scan {
            format,
            inventory,
            include_unknown,
            no_update,
            no_report,
            no_parallel,
            fail_on,
        } => {
            let format_str = format.unwrap_or_else(|| config.default_format.clone());
            let format = OutputFormat::from_str(&format_str).map_err(|e| anyhow::anyhow!(e))?;

            let options = ScanOptions {
                format,
                inventory,
                include_unknown: include_unknown || config.include_unknown,
                update: !no_update,
                write_report: !no_report,
                parallel: !no_parallel,
                fail_on,
            };

            run_scan(&config, options).await
        }
        Commands::Db { action } => {
            handle_db(&config, action).await?;
            Ok(exit_codes::SUCCESS)
        }
        Commands::Reports => {
            show_reports(&config.reports_dir())?;
            Ok(exit_codes::SUCCESS)
        }
        Commands::ListSources => {
            list_sources();
            Ok(exit_codes::SUCCESS)
        }
        Commands::Config { init, path } => {
            handle_config(&config_path, init, path)?;
            Ok(exit_codes::SUCCESS)
        }
        Commands::ClearCache => {
            let cache = Cache::new();
            cache.clear()?;
            println!("Cache cleared.");
            Ok(exit_codes::SUCCESS)
        }
    }
}

fn spinner(message: &str, is_interactive: bool) -> Option<ProgressBar> {
    if !is_interactive {
        return None;
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message.to_string());
    Some(pb)
}

fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

async fn run_scan(config: &Config, options: ScanOptions) -> Result<u8> {
    let is_interactive = options.format == OutputFormat::Table;

    // Make sure the database is usable before anything is scanned
    let manager = DatabaseManager::from_config(config)?;
    let db_progress = spinner("Preparing CVE database...", is_interactive);
    let status = prepare_database(&manager, config, options.update).await?;
    if let Some(pb) = db_progress {
        pb.finish_with_message(status.to_string());
    }

    let scanners: Vec<Box<dyn Scanner>> = match &options.inventory {
        Some(path) => vec![Box::new(InventoryScanner::new(path))],
        None => all_scanners(),
    };

    let found = if options.parallel && scanners.len() > 1 {
        scan_concurrent(&scanners, is_interactive).await
    } else {
        scan_sequential(&scanners, is_interactive).await
    };
    let programs = prepare(found, &config.ignore);
    info!("Checking {} programs", programs.len());

    let vuln_progress = spinner("Checking for vulnerabilities...", is_interactive);

    let store = CveStore::open(manager.path()).await?;
    let checker = LocalCveChecker::new(store)
        .with_include_unknown(options.include_unknown)
        .with_ignore(config.ignore.clone());
    let findings = checker.check(&programs).await;
    checker.close().await;
    let findings = findings?;

    let result = ScanResult::new(programs, findings, options.include_unknown);

    if let Some(pb) = vuln_progress {
        pb.finish_with_message(format!(
            "Found {} vulnerabilities",
            result.total_vulnerabilities()
        ));
    }

    print_result(&result, options.format)?;

    if options.write_report {
        let report_format = OutputFormat::from_str(&config.report_format)
            .map_err(|e| anyhow::anyhow!(e))?;
        let path = write_report(&result, &config.reports_dir(), report_format)?;
        if is_interactive {
            println!();
            println!("Report written to: {}", path.display());
        }
    }

    // Determine exit code based on --fail-on
    Ok(determine_exit_code(&result, options.fail_on))
}

async fn prepare_database(
    manager: &DatabaseManager,
    config: &Config,
    update: bool,
) -> Result<StoreStatus> {
    if update {
        return Ok(manager.ensure_database(Local::now().naive_local()).await?);
    }

    let status = manager.status().await;
    if status.is_ready() {
        return Ok(status);
    }

    info!("No usable database and updates disabled, creating one locally");
    Ok(manager.initialize(config.seed_sample_data).await?)
}

/// Scan all sources concurrently
async fn scan_concurrent(
    scanners: &[Box<dyn Scanner>],
    is_interactive: bool,
) -> Vec<InstalledSoftware> {
    let progress = if is_interactive {
        let pb = ProgressBar::new(scanners.len() as u64);
        pb.set_style(bar_style(
            "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} Scanning sources...",
        ));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(Arc::new(pb))
    } else {
        None
    };

    let futures: Vec<_> = scanners
        .iter()
        .map(|scanner| {
            let pb = progress.clone();
            async move {
                let result = run_scanner(scanner.as_ref()).await;
                if let Some(ref pb) = pb {
                    pb.inc(1);
                }
                result
            }
        })
        .collect();

    let results = join_all(futures).await;

    if let Some(pb) = progress {
        let total: usize = results.iter().map(|r| r.len()).sum();
        pb.finish_with_message(format!("Found {} programs", total));
    }

    results.into_iter().flatten().collect()
}

/// Scan sources one after another
async fn scan_sequential(
    scanners: &[Box<dyn Scanner>],
    is_interactive: bool,
) -> Vec<InstalledSoftware> {
    let mut all_software = Vec::new();

    let scan_progress = if is_interactive {
        let pb = ProgressBar::new(scanners.len() as u64);
        pb.set_style(bar_style("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}"));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    for scanner in scanners {
        if let Some(ref pb) = scan_progress {
            pb.set_message(format!("Scanning {}...", scanner.name()));
        }

        all_software.extend(run_scanner(scanner.as_ref()).await);

        if let Some(ref pb) = scan_progress {
            pb.inc(1);
        }
    }

    if let Some(pb) = scan_progress {
        pb.finish_with_message(format!("Found {} programs", all_software.len()));
    }

    all_software
}

async fn run_scanner(scanner: &dyn Scanner) -> Vec<InstalledSoftware> {
    if !scanner.is_supported() {
        return Vec::new();
    }

    match scanner.scan().await {
        Ok(software) => {
            info!("{}: found {} programs", scanner.name(), software.len());
            software
        }
        Err(e) => {
            warn!("{} scan failed: {:#}", scanner.name(), e);
            Vec::new()
        }
    }
}

/// Determine the exit code based on vulnerabilities found and --fail-on setting
fn determine_exit_code(result: &ScanResult, fail_on: Option<FailLevel>) -> u8 {
    let Some(fail_on) = fail_on else {
        return exit_codes::SUCCESS;
    };
    let threshold = fail_on.severity();

    [
        (Severity::Critical, exit_codes::CRITICAL_VULN),
        (Severity::High, exit_codes::HIGH_VULN),
        (Severity::Medium, exit_codes::MEDIUM_VULN),
        (Severity::Low, exit_codes::LOW_VULN),
    ]
    .into_iter()
    .filter(|(severity, _)| *severity <= threshold)
    .find(|(severity, _)| result.count(*severity) > 0)
    .map_or(exit_codes::SUCCESS, |(_, code)| code)
}

async fn handle_db(config: &Config, action: DbCommand) -> Result<()> {
    let manager = DatabaseManager::from_config(config)?;

    match action {
        DbCommand::Status => {
            let now = Local::now().naive_local();
            println!("Database: {}", manager.path().display());
            println!("Status:   {}", manager.status().await);
            match manager.last_refresh() {
                Some(at) => println!("Last refresh: {}", at),
                None => println!("Last refresh: none within the refresh interval"),
            }
            if in_maintenance_window(now) {
                println!("The remote database is currently being rebuilt.");
            }
        }
        DbCommand::Update => {
            let status = manager
                .update(Local::now().naive_local())
                .await
                .context("Database update failed")?;
            println!("Database updated: {}", status);
        }
        DbCommand::Init { no_seed } => {
            let status = manager.initialize(!no_seed).await?;
            println!("Database initialized at {}: {}", manager.path().display(), status);
        }
        DbCommand::Import { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let records: Vec<CveRecord> = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse CVE records in {}", file.display()))?;

            if !manager.status().await.is_ready() {
                manager.initialize(false).await?;
            }

            let store = CveStore::open(manager.path()).await?;
            let imported = store.import(&records).await;
            store.close().await;
            println!("Imported {} CVE records.", imported?);
        }
        DbCommand::Show { id } => {
            let status = manager.status().await;
            if !status.is_ready() {
                anyhow::bail!("CVE database is not usable: {}", status);
            }

            let store = CveStore::open(manager.path()).await?;
            let record = store.get(id.trim()).await;
            store.close().await;
            let record = record?.with_context(|| format!("{} is not in the database", id))?;
            print_record(&record);
        }
    }

    Ok(())
}

fn print_record(record: &CveRecord) {
    let field = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    println!("{}", record.id);
    println!("  Vendor:    {}", field(&record.vendor));
    println!("  Product:   {}", field(&record.product));
    println!(
        "  Versions:  {} to {}",
        field(&record.version_start),
        field(&record.version_end)
    );
    match record.cvss_score {
        Some(score) => println!("  CVSS:      {:.1} ({})", score, record.severity().as_str()),
        None => println!("  CVSS:      unscored"),
    }
    println!("  Published: {}", field(&record.published_date));
    println!("  {}", field(&record.description));
}

fn show_reports(dir: &Path) -> Result<()> {
    let reports = list_reports(dir)?;

    if reports.is_empty() {
        println!("No reports found in {}", dir.display());
        return Ok(());
    }

    println!("Reports in {}:", dir.display());
    println!();
    for report in reports {
        let modified: DateTime<Local> = report.modified.into();
        let name = report
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!(
            "  {:<45} {}  {:>8} bytes",
            name,
            modified.format("%Y-%m-%d %H:%M:%S"),
            report.size
        );
    }

    Ok(())
}

fn list_sources() {
    println!("Available sources:");
    println!();

    for scanner in all_scanners() {
        let supported = if scanner.is_supported() { "yes" } else { "no" };
        println!(
            "  {:<10} {:<22} [supported: {}]",
            scanner.source().as_str(),
            scanner.name(),
            supported
        );
    }

    println!(
        "  {:<10} {:<22} [supported: yes]  (scan --inventory FILE)",
        "inventory", "Inventory File"
    );
}

fn handle_config(config_path: &Path, init: bool, show_path: bool) -> Result<()> {
    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
            return Ok(());
        }

        let config = Config::default();
        config.save_to(config_path)?;
        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Default configuration:");
        println!("{}", Config::generate_default_config());
        return Ok(());
    }

    // Show current config
    if config_path.exists() {
        let content = std::fs::read_to_string(config_path)?;
        println!("Config file: {}", config_path.display());
        println!();
        println!("{}", content);
    } else {
        println!("No config file found.");
        println!("Run 'cybervault config --init' to create one.");
        println!();
        println!("Config path: {}", config_path.display());
    }

    Ok(())
}
