pub mod cache;
pub mod checker;
pub mod config;
pub mod error;
pub mod model;
pub mod output;
pub mod platform;
pub mod scanner;
pub mod store;

pub use cache::Cache;
pub use config::Config;
pub use error::{Error, Result};
pub use model::{
    CveMatch, CveRecord, InstalledSoftware, Platform, ProgramFindings, ScanResult, Severity, Source,
};
pub use scanner::Scanner;
