use ahash::AHashSet;
use std::fs;
use std::sync::atomic::AtomicBool;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{check_cancelled, Error};
use crate::models::{OrphanedFile, PackageKind, RegisteredPackage, ScanResult};
use crate::platform::path_key;
use crate::progress::ProgressReporter;

/// Cross-references the cache folder listing against the claimed packages.
///
/// Every listed `.msi`/`.msp` that no claim names (compared ignoring case) is
/// an orphan. Secondary claims suppress orphans exactly like primary ones.
/// Sizes are best-effort: a file whose size cannot be read is recorded as 0.
pub fn reconcile(
    registered: Vec<RegisteredPackage>,
    disk_files: &[String],
    cancel: &AtomicBool,
    reporter: &dyn ProgressReporter,
) -> Result<ScanResult, Error> {
    let start = Instant::now();
    reporter.on_reconcile_start();
    reporter.on_message("Scanning installer cache folder...");

    let claimed: AHashSet<String> = registered
        .iter()
        .map(|pkg| path_key(&pkg.local_package_path))
        .collect();
    let registered_total_bytes = claimed_bytes(&registered);

    let mut orphaned_files = Vec::new();
    for path in disk_files {
        check_cancelled(cancel)?;

        if claimed.contains(&path_key(path)) {
            continue;
        }
        let Some(kind) = PackageKind::from_path(path) else {
            continue;
        };

        let size_bytes = match fs::metadata(path) {
            Ok(metadata) => metadata.len(),
            Err(err) => {
                warn!("Could not read size of {}: {}", path, err);
                0
            }
        };
        debug!("Orphaned: {} ({} bytes)", path, size_bytes);
        orphaned_files.push(OrphanedFile {
            full_path: path.clone(),
            size_bytes,
            is_patch: kind == PackageKind::Patch,
        });
    }

    let duration = start.elapsed();
    info!(
        "{} of {} cached packages orphaned in {:.2}s",
        orphaned_files.len(),
        disk_files.len(),
        duration.as_secs_f64()
    );
    reporter.on_reconcile_complete(orphaned_files.len(), duration.as_secs_f64());

    Ok(ScanResult {
        orphaned_files,
        registered_packages: registered,
        registered_total_bytes,
    })
}

/// Claims whose file is already gone count for nothing.
fn claimed_bytes(registered: &[RegisteredPackage]) -> u64 {
    registered
        .iter()
        .filter_map(|pkg| fs::metadata(&pkg.local_package_path).ok())
        .filter(|metadata| metadata.is_file())
        .map(|metadata| metadata.len())
        .sum()
}
