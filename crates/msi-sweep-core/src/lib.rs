pub mod config;
pub mod engine;
pub mod error;
pub mod exclusion;
pub mod models;
pub mod msi;
pub mod platform;
pub mod progress;
pub mod resolver;
pub mod scanner;

pub use config::AppConfig;
pub use engine::ScanEngine;
pub use error::Error;
pub use exclusion::SummaryInfoSource;
pub use models::{FilteredResult, OrphanedFile, PackageSummary, RegisteredPackage, ScanResult};
pub use msi::InstallerApi;
pub use progress::{ProgressReporter, SilentReporter};
