use serde::Serialize;

/// The two package types kept in the installer cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PackageKind {
    Installer,
    Patch,
}

impl PackageKind {
    /// Classifies by extension, ignoring case. Anything else is `None`.
    pub fn from_path(path: &str) -> Option<Self> {
        let (_, ext) = file_name_of(path).rsplit_once('.')?;
        if ext.eq_ignore_ascii_case("msi") {
            Some(PackageKind::Installer)
        } else if ext.eq_ignore_ascii_case("msp") {
            Some(PackageKind::Patch)
        } else {
            None
        }
    }
}

/// A cached package still claimed by an installed product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredPackage {
    pub local_package_path: String,
    pub product_name: String,
    pub product_code: String,
    /// Found only through a component registration, not the product's own
    /// cached-package property.
    pub is_secondary_claim: bool,
    /// The owning product matched a vendor known to register this way; the
    /// attribution deserves a second look before anything is touched.
    pub vendor_warning: bool,
}

impl RegisteredPackage {
    pub fn primary(path: &str, product_name: &str, product_code: &str) -> Self {
        Self {
            local_package_path: path.to_string(),
            product_name: product_name.to_string(),
            product_code: product_code.to_string(),
            is_secondary_claim: false,
            vendor_warning: false,
        }
    }

    pub fn secondary(
        path: &str,
        product_name: &str,
        product_code: &str,
        vendor_warning: bool,
    ) -> Self {
        Self {
            local_package_path: path.to_string(),
            product_name: product_name.to_string(),
            product_code: product_code.to_string(),
            is_secondary_claim: true,
            vendor_warning,
        }
    }

    pub fn file_name(&self) -> &str {
        file_name_of(&self.local_package_path)
    }
}

/// A package in the cache folder that no installed product claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanedFile {
    pub full_path: String,
    pub size_bytes: u64,
    pub is_patch: bool,
}

impl OrphanedFile {
    pub fn file_name(&self) -> &str {
        file_name_of(&self.full_path)
    }

    /// e.g. "14.2 MB".
    pub fn size_display(&self) -> String {
        let bytes = self.size_bytes;
        if bytes >= GIB {
            format!("{:.1} GB", bytes as f64 / GIB as f64)
        } else if bytes >= MIB {
            format!("{:.1} MB", bytes as f64 / MIB as f64)
        } else if bytes >= KIB {
            format!("{:.1} KB", bytes as f64 / KIB as f64)
        } else {
            format!("{} B", bytes)
        }
    }

    pub fn type_label(&self) -> &'static str {
        if self.is_patch {
            ".msp"
        } else {
            ".msi"
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanResult {
    pub orphaned_files: Vec<OrphanedFile>,
    pub registered_packages: Vec<RegisteredPackage>,
    /// On-disk size of claimed packages that actually exist.
    pub registered_total_bytes: u64,
}

impl ScanResult {
    pub fn orphaned_total_bytes(&self) -> u64 {
        total_size(&self.orphaned_files)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilteredResult {
    pub actionable: Vec<OrphanedFile>,
    pub excluded: Vec<OrphanedFile>,
}

impl FilteredResult {
    pub fn actionable_bytes(&self) -> u64 {
        total_size(&self.actionable)
    }

    pub fn excluded_bytes(&self) -> u64 {
        total_size(&self.excluded)
    }
}

/// Metadata from a package's summary information stream and signature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackageSummary {
    pub title: String,
    pub subject: String,
    pub author: String,
    pub comments: String,
    /// Common name of the Authenticode signer, empty when unsigned.
    pub signer: String,
}

const KIB: u64 = 1_024;
const MIB: u64 = 1_048_576;
const GIB: u64 = 1_073_741_824;

/// Human-readable total, two decimals once it reaches gigabytes.
pub fn format_size(bytes: u64) -> String {
    if bytes >= GIB {
        format!("{:.2} GB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn total_size(files: &[OrphanedFile]) -> u64 {
    files.iter().map(|f| f.size_bytes).sum()
}

/// Last path component, accepting either separator so Windows paths split
/// the same way on every host.
pub(crate) fn file_name_of(path: &str) -> &str {
    path.rsplit(['\\', '/']).next().unwrap_or(path)
}
