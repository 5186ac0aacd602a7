use ahash::AHashSet;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::time::Instant;
use tracing::{debug, info, trace};

use crate::error::{check_cancelled, Error};
use crate::models::{PackageKind, RegisteredPackage};
use crate::msi::{
    ContextMask, InstallerApi, InstallerApiExt, ProductIdentity, PropertyTarget, UserScope,
    PROP_LOCAL_PACKAGE, PROP_PRODUCT_NAME,
};
use crate::platform::{is_within_dir, path_key};
use crate::progress::ProgressReporter;

/// Lowercase fragments of product names whose component-path claims get the
/// vendor warning. Only one vendor has been seen registering its cached
/// packages this way.
pub const VENDOR_WARNING_PATTERNS: &[&str] = &["adobe"];

/// Builds the set of cached packages some installed product still needs.
///
/// 1. Every product in every context for every user: its `LocalPackage`
///    and the `LocalPackage` of each applied patch.
/// 2. Every installed component whose key path lands in the installer cache
///    and is not claimed yet, attributed to the first product providing it.
///
/// Phase 1 always completes before phase 2, and the first claim on a path
/// wins, so a primary claim is never displaced by a component-path claim.
pub struct RegistrationResolver<'a> {
    api: &'a dyn InstallerApi,
    installer_dir: String,
    cancel: &'a AtomicBool,
    reporter: &'a dyn ProgressReporter,
}

struct InstalledProduct {
    identity: ProductIdentity,
    name: String,
}

impl<'a> RegistrationResolver<'a> {
    pub fn new(
        api: &'a dyn InstallerApi,
        installer_dir: &Path,
        cancel: &'a AtomicBool,
        reporter: &'a dyn ProgressReporter,
    ) -> Self {
        Self {
            api,
            installer_dir: installer_dir.to_string_lossy().into_owned(),
            cancel,
            reporter,
        }
    }

    pub fn resolve(&self) -> Result<Vec<RegisteredPackage>, Error> {
        let start = Instant::now();
        self.reporter.on_resolve_start();

        let mut claims = ClaimSet::default();
        let products = self.claim_product_packages(&mut claims)?;
        let primary_count = claims.len();
        debug!("{} packages claimed directly by products", primary_count);

        self.claim_component_packages(&products, &mut claims)?;

        let registered = claims.into_packages();
        let duration = start.elapsed();
        info!(
            "{} registered packages ({} via component paths) in {:.2}s",
            registered.len(),
            registered.len() - primary_count,
            duration.as_secs_f64()
        );
        self.reporter
            .on_resolve_complete(registered.len(), duration.as_secs_f64());
        Ok(registered)
    }

    fn claim_product_packages(
        &self,
        claims: &mut ClaimSet,
    ) -> Result<Vec<InstalledProduct>, Error> {
        self.reporter.on_message("Enumerating installed products...");

        let mut identities = Vec::new();
        for product in self
            .api
            .enumerate_products(&UserScope::AllUsers, ContextMask::ALL)
        {
            check_cancelled(self.cancel)?;
            identities.push(product?);
        }
        info!("{} installed products found", identities.len());
        self.reporter.on_products_found(identities.len());

        let mut products = Vec::with_capacity(identities.len());
        for identity in identities {
            check_cancelled(self.cancel)?;

            let target = PropertyTarget::Product(&identity);
            let name = self.api.property_text(target, PROP_PRODUCT_NAME);
            let local_package = self.api.property_text(target, PROP_LOCAL_PACKAGE);
            self.reporter.on_product(if name.is_empty() {
                &identity.product_code
            } else {
                &name
            });

            if !local_package.is_empty() {
                claims.claim(RegisteredPackage::primary(
                    &local_package,
                    &name,
                    &identity.product_code,
                ));
            }

            for patch in self.api.enumerate_patches(&identity) {
                check_cancelled(self.cancel)?;
                let patch = patch?;
                let patch_package = self
                    .api
                    .property_text(PropertyTarget::Patch(&patch), PROP_LOCAL_PACKAGE);
                if !patch_package.is_empty() {
                    claims.claim(RegisteredPackage::primary(
                        &patch_package,
                        &name,
                        &identity.product_code,
                    ));
                }
            }

            products.push(InstalledProduct { identity, name });
        }

        Ok(products)
    }

    fn claim_component_packages(
        &self,
        products: &[InstalledProduct],
        claims: &mut ClaimSet,
    ) -> Result<(), Error> {
        self.reporter.on_component_scan_start();
        self.reporter.on_message("Scanning component registrations...");

        let mut checked = 0usize;
        let mut claimed = 0usize;
        for component in self
            .api
            .enumerate_components(&UserScope::AllUsers, ContextMask::ALL)
        {
            check_cancelled(self.cancel)?;
            let component = component?;
            checked += 1;
            if checked % 256 == 0 {
                self.reporter.on_component_progress(checked);
            }

            let Some(path) = self.api.component_path(
                None,
                &component.component_code,
                component.user_sid.as_deref(),
                component.context,
            ) else {
                continue;
            };
            if !is_within_dir(&path, &self.installer_dir)
                || PackageKind::from_path(&path).is_none()
                || claims.contains(&path)
            {
                continue;
            }

            let package = match self.find_owner(products, &component.component_code)? {
                Some(owner) => RegisteredPackage::secondary(
                    &path,
                    &owner.name,
                    &owner.identity.product_code,
                    matches_vendor_pattern(&owner.name),
                ),
                None => {
                    debug!(
                        "No owning product for component {} ({})",
                        component.component_code, path
                    );
                    RegisteredPackage::secondary(&path, "", "", false)
                }
            };
            debug!(
                "Component {} claims {} for '{}'",
                component.component_code, path, package.product_name
            );
            if claims.claim(package) {
                claimed += 1;
            }
        }

        self.reporter.on_component_progress(checked);
        info!(
            "{} components checked, {} packages claimed through component paths",
            checked, claimed
        );
        Ok(())
    }

    /// First installed product that provides the component. Linear in the
    /// number of products for every unclaimed component.
    fn find_owner<'p>(
        &self,
        products: &'p [InstalledProduct],
        component_code: &str,
    ) -> Result<Option<&'p InstalledProduct>, Error> {
        for product in products {
            check_cancelled(self.cancel)?;
            let provides = self
                .api
                .component_path(
                    Some(&product.identity.product_code),
                    component_code,
                    product.identity.user_sid.as_deref(),
                    product.identity.context,
                )
                .is_some();
            if provides {
                return Ok(Some(product));
            }
        }
        Ok(None)
    }
}

pub fn matches_vendor_pattern(product_name: &str) -> bool {
    let name = product_name.to_lowercase();
    VENDOR_WARNING_PATTERNS
        .iter()
        .any(|pattern| name.contains(pattern))
}

/// Claims keyed by case-insensitive path, in claim order.
#[derive(Default)]
struct ClaimSet {
    packages: Vec<RegisteredPackage>,
    keys: AHashSet<String>,
}

impl ClaimSet {
    fn len(&self) -> usize {
        self.packages.len()
    }

    fn contains(&self, path: &str) -> bool {
        self.keys.contains(&path_key(path))
    }

    /// Returns false when the path was already claimed.
    fn claim(&mut self, package: RegisteredPackage) -> bool {
        if self.keys.insert(path_key(&package.local_package_path)) {
            self.packages.push(package);
            true
        } else {
            trace!("Already claimed: {}", package.local_package_path);
            false
        }
    }

    fn into_packages(self) -> Vec<RegisteredPackage> {
        self.packages
    }
}
