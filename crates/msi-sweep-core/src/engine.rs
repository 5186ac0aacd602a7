use crate::config::AppConfig;
use crate::error::Error;
use crate::exclusion::{self, SummaryInfoSource};
use crate::models::{FilteredResult, OrphanedFile, RegisteredPackage, ScanResult};
use crate::msi::InstallerApi;
use crate::progress::ProgressReporter;
use crate::resolver::RegistrationResolver;
use crate::scanner;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, info};

pub struct ScanEngine {
    config: AppConfig,
    cancel: Arc<AtomicBool>,
}

impl ScanEngine {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared flag checked at every enumeration step and every file
    /// reconciled. Setting it makes the running scan return
    /// [`Error::Cancelled`]; the flag stays set until the engine is dropped.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn installer_dir(&self) -> PathBuf {
        self.config.installer_dir()
    }

    /// Run the full reconciliation:
    /// 1. Resolve every package an installed product still claims
    /// 2. List the installer cache folder
    /// 3. Report each unclaimed package as orphaned
    ///
    /// Runs synchronously on the calling thread. On error nothing partial is
    /// returned.
    pub fn scan(
        &self,
        api: &dyn InstallerApi,
        reporter: &dyn ProgressReporter,
    ) -> Result<ScanResult, Error> {
        let dir = self.installer_dir();
        info!("Scanning installer cache {}", dir.display());

        let registered = self.registered_packages(api, reporter)?;
        let disk_files = scanner::list_package_files(&dir)?;
        debug!("{} packages on disk", disk_files.len());

        scanner::reconcile(registered, &disk_files, &self.cancel, reporter)
    }

    /// [`scan`](Self::scan) against an already listed set of cache files.
    pub fn scan_with_files(
        &self,
        api: &dyn InstallerApi,
        disk_files: &[String],
        reporter: &dyn ProgressReporter,
    ) -> Result<ScanResult, Error> {
        let registered = self.registered_packages(api, reporter)?;
        scanner::reconcile(registered, disk_files, &self.cancel, reporter)
    }

    /// Only the resolver phase: the claimed set, in claim order.
    pub fn registered_packages(
        &self,
        api: &dyn InstallerApi,
        reporter: &dyn ProgressReporter,
    ) -> Result<Vec<RegisteredPackage>, Error> {
        let dir = self.installer_dir();
        RegistrationResolver::new(api, &dir, &self.cancel, reporter).resolve()
    }

    /// Partition orphans using the configured exclusion filters. Package
    /// metadata is consulted only when `read_package_metadata` is on.
    pub fn filter(
        &self,
        files: &[OrphanedFile],
        metadata: Option<&dyn SummaryInfoSource>,
    ) -> FilteredResult {
        let metadata = metadata.filter(|_| self.config.read_package_metadata);
        exclusion::apply_filters(files, &self.config.normalized_filters(), metadata)
    }
}
