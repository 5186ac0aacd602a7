use std::io;
use std::path::Path;
use tracing::{debug, error};
use walkdir::WalkDir;

use crate::error::Error;
use crate::models::PackageKind;

/// Lists the `.msi`/`.msp` files directly inside the installer cache folder,
/// sorted by path. Subfolders (per-product icon and transform caches) are
/// not descended into.
///
/// A folder that does not exist yields an empty list. A folder that cannot be
/// read because of permissions is [`Error::PermissionDenied`]; unreadable
/// single entries are skipped.
pub fn list_package_files(dir: &Path) -> Result<Vec<String>, Error> {
    if !dir.is_dir() {
        debug!("Installer cache folder {} not found", dir.display());
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry_result in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                // Depth 0 failing means the folder itself could not be read.
                if err.depth() == 0 {
                    return Err(folder_error(dir, err));
                }
                debug!("Skipping unreadable entry in {}: {}", dir.display(), err);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path().to_string_lossy().into_owned();
        if PackageKind::from_path(&path).is_some() {
            files.push(path);
        }
    }

    files.sort();
    debug!("{} packages in {}", files.len(), dir.display());
    Ok(files)
}

fn folder_error(dir: &Path, err: walkdir::Error) -> Error {
    let kind = err.io_error().map(|e| e.kind());
    error!("Error reading installer cache folder {}: {}", dir.display(), err);
    match kind {
        Some(io::ErrorKind::PermissionDenied) => Error::PermissionDenied(format!(
            "cannot read installer cache folder {}",
            dir.display()
        )),
        Some(kind) => Error::Io(io::Error::new(
            kind,
            format!("Error reading directory {}: {}", dir.display(), err),
        )),
        None => Error::Other(err.to_string()),
    }
}
