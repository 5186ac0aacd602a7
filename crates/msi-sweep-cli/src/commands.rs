use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "msi-sweep")]
#[command(about = "Finds orphaned packages in the Windows Installer cache", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Reconcile the installer cache against installed products
    Scan {
        /// Print the result as JSON instead of a report
        #[arg(long)]
        json: bool,
        /// Match exclusion filters against file names only
        #[arg(long)]
        no_metadata: bool,
    },
    /// List every cached package an installed product still claims
    Registered {
        #[arg(long)]
        json: bool,
    },
    /// Show the summary information of a package file
    Inspect { path: PathBuf },
    /// Print configuration values
    PrintConfig,
}
