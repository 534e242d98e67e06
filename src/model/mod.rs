//! Core data types for installed software, CVE records, and scan results.
//!
//! This module contains the fundamental types used throughout cybervault:
//!
//! - [`InstalledSoftware`] - A program discovered on the system
//! - [`Source`] - Where a program record came from (registry, inventory file, ...)
//! - [`Platform`] - Operating system platform
//! - [`CveRecord`] - One row of the local vulnerability database
//! - [`Severity`] - CVSS-derived severity class
//! - [`ScanResult`] - Complete scan results
//!
//! # Example
//!
//! ```
//! use cybervault::{InstalledSoftware, ScanResult, Source};
//!
//! let program = InstalledSoftware::new("7-zip 19.00 (x64)", "19.00", Source::Inventory);
//! let result = ScanResult::new(vec![program], Vec::new(), false);
//!
//! println!("Scanned {} programs", result.programs.len());
//! ```

mod result;
mod software;
mod vulnerability;

pub use result::*;
pub use software::*;
pub use vulnerability::*;
