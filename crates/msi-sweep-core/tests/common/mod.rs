#![allow(dead_code)]

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use msi_sweep_core::msi::{
    ComponentIdentity, ContextMask, EnumStep, InstallContext, InstallerApi, PatchIdentity,
    ProductIdentity, PropertyTarget, PropertyValue, UserScope, PROP_LOCAL_PACKAGE,
    PROP_PRODUCT_NAME,
};
use msi_sweep_core::ProgressReporter;

pub const CACHE: &str = r"C:\Windows\Installer";

pub fn cached(name: &str) -> String {
    format!(r"{}\{}", CACHE, name)
}

pub fn machine_product(code: &str) -> ProductIdentity {
    ProductIdentity {
        product_code: code.to_string(),
        user_sid: None,
        context: InstallContext::Machine,
    }
}

pub fn user_product(code: &str, sid: &str) -> ProductIdentity {
    ProductIdentity {
        product_code: code.to_string(),
        user_sid: Some(sid.to_string()),
        context: InstallContext::UserUnmanaged,
    }
}

/// Scripted installer database. Each enumeration is a list of steps
/// returned by index; anything past the end reports `End`.
#[derive(Default)]
pub struct FakeInstaller {
    pub products: Vec<EnumStep<ProductIdentity>>,
    pub patches: HashMap<String, Vec<EnumStep<PatchIdentity>>>,
    pub components: Vec<EnumStep<ComponentIdentity>>,
    /// Component code -> installed key path.
    pub component_paths: HashMap<String, String>,
    /// Component code -> product codes that provide it.
    pub component_owners: HashMap<String, Vec<String>>,
    /// (product code, property) -> value.
    pub product_props: HashMap<(String, String), String>,
    /// (patch code, property) -> value.
    pub patch_props: HashMap<(String, String), String>,
    pub product_calls: Cell<u32>,
    /// Tripped the first time any patch index is queried.
    pub cancel_on_patch: Option<Arc<AtomicBool>>,
    /// Tripped the first time a component path is resolved through any product.
    pub cancel_on_component_path: Option<Arc<AtomicBool>>,
}

impl FakeInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn product(mut self, identity: ProductIdentity, name: &str, local_package: &str) -> Self {
        let code = identity.product_code.clone();
        self.products.push(EnumStep::Item(identity));
        self.set_product_prop(&code, PROP_PRODUCT_NAME, name);
        self.set_product_prop(&code, PROP_LOCAL_PACKAGE, local_package);
        self
    }

    pub fn patch(mut self, product_code: &str, patch_code: &str, local_package: &str) -> Self {
        let product = self
            .products
            .iter()
            .find_map(|step| match step {
                EnumStep::Item(p) if p.product_code == product_code => Some(p.clone()),
                _ => None,
            })
            .expect("patch added before its product");
        self.patches
            .entry(product_code.to_string())
            .or_default()
            .push(EnumStep::Item(PatchIdentity {
                patch_code: patch_code.to_string(),
                product_code: product_code.to_string(),
                user_sid: product.user_sid,
                context: product.context,
            }));
        self.patch_props.insert(
            (patch_code.to_string(), PROP_LOCAL_PACKAGE.to_string()),
            local_package.to_string(),
        );
        self
    }

    pub fn component(mut self, code: &str, path: &str, owners: &[&str]) -> Self {
        self.components.push(EnumStep::Item(ComponentIdentity {
            component_code: code.to_string(),
            user_sid: None,
            context: InstallContext::Machine,
        }));
        self.component_paths
            .insert(code.to_string(), path.to_string());
        self.component_owners.insert(
            code.to_string(),
            owners.iter().map(|o| o.to_string()).collect(),
        );
        self
    }

    pub fn product_step(mut self, step: EnumStep<ProductIdentity>) -> Self {
        self.products.push(step);
        self
    }

    pub fn component_step(mut self, step: EnumStep<ComponentIdentity>) -> Self {
        self.components.push(step);
        self
    }

    pub fn cancel_on_patch(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancel_on_patch = Some(token);
        self
    }

    pub fn cancel_on_component_path(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancel_on_component_path = Some(token);
        self
    }

    fn set_product_prop(&mut self, code: &str, name: &str, value: &str) {
        if !value.is_empty() {
            self.product_props
                .insert((code.to_string(), name.to_string()), value.to_string());
        }
    }
}

impl InstallerApi for FakeInstaller {
    fn product_at(
        &self,
        scope: &UserScope,
        contexts: ContextMask,
        index: u32,
    ) -> EnumStep<ProductIdentity> {
        assert_eq!(scope, &UserScope::AllUsers);
        assert_eq!(contexts, ContextMask::ALL);
        self.product_calls.set(self.product_calls.get() + 1);
        self.products
            .get(index as usize)
            .cloned()
            .unwrap_or(EnumStep::End)
    }

    fn patch_at(&self, product: &ProductIdentity, index: u32) -> EnumStep<PatchIdentity> {
        if let Some(token) = &self.cancel_on_patch {
            token.store(true, Ordering::SeqCst);
        }
        self.patches
            .get(&product.product_code)
            .and_then(|steps| steps.get(index as usize).cloned())
            .unwrap_or(EnumStep::End)
    }

    fn component_at(
        &self,
        _scope: &UserScope,
        _contexts: ContextMask,
        index: u32,
    ) -> EnumStep<ComponentIdentity> {
        self.components
            .get(index as usize)
            .cloned()
            .unwrap_or(EnumStep::End)
    }

    fn component_path(
        &self,
        product_code: Option<&str>,
        component_code: &str,
        _user_sid: Option<&str>,
        _context: InstallContext,
    ) -> Option<String> {
        if product_code.is_none() {
            if let Some(token) = &self.cancel_on_component_path {
                token.store(true, Ordering::SeqCst);
            }
        }
        if let Some(product_code) = product_code {
            let owners = self.component_owners.get(component_code)?;
            if !owners.iter().any(|o| o == product_code) {
                return None;
            }
        }
        self.component_paths.get(component_code).cloned()
    }

    fn property(&self, target: PropertyTarget<'_>, name: &str) -> PropertyValue {
        let value = match target {
            PropertyTarget::Product(p) => self
                .product_props
                .get(&(p.product_code.clone(), name.to_string())),
            PropertyTarget::Patch(p) => self
                .patch_props
                .get(&(p.patch_code.clone(), name.to_string())),
        };
        value.cloned().map_or(PropertyValue::Absent, PropertyValue::Text)
    }
}

/// Records the hooks it sees and optionally trips a cancel token once a
/// given number of products has been reported.
#[derive(Default)]
pub struct RecordingReporter {
    pub products: Mutex<Vec<String>>,
    pub products_found: AtomicUsize,
    pub resolved: AtomicUsize,
    pub orphans: AtomicUsize,
    pub cancel_after: Option<(usize, Arc<AtomicBool>)>,
    pub cancel_on_component_scan: Option<Arc<AtomicBool>>,
}

impl ProgressReporter for RecordingReporter {
    fn on_products_found(&self, count: usize) {
        self.products_found.store(count, Ordering::SeqCst);
    }

    fn on_product(&self, name: &str) {
        let mut products = self.products.lock().unwrap();
        products.push(name.to_string());
        if let Some((after, token)) = &self.cancel_after {
            if products.len() >= *after {
                token.store(true, Ordering::SeqCst);
            }
        }
    }

    fn on_component_scan_start(&self) {
        if let Some(token) = &self.cancel_on_component_scan {
            token.store(true, Ordering::SeqCst);
        }
    }

    fn on_resolve_complete(&self, registered: usize, _duration_secs: f64) {
        self.resolved.store(registered, Ordering::SeqCst);
    }

    fn on_reconcile_complete(&self, orphans: usize, _duration_secs: f64) {
        self.orphans.store(orphans, Ordering::SeqCst);
    }
}
