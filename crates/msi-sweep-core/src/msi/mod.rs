//! Typed access to the Windows Installer query surface.
//!
//! The native API enumerates by index and hands strings back through
//! caller-allocated buffers. [`InstallerApi`] models one index step per call;
//! [`InstallerApiExt`] turns those steps into lazy, restartable sequences.

pub mod buffer;
pub mod codes;
pub mod enumerate;
#[cfg(target_os = "windows")]
pub mod native;
#[cfg(target_os = "windows")]
pub mod summary;

use serde::Serialize;
use std::fmt;

use crate::error::Error;
pub use enumerate::{DeniedPolicy, Enumeration};

/// Well-known SID the installer accepts as "every user on the machine".
pub const ALL_USERS_SID: &str = "s-1-1-0";

/// Installed product property holding the cached package path.
pub const PROP_LOCAL_PACKAGE: &str = "LocalPackage";
pub const PROP_PRODUCT_NAME: &str = "ProductName";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum InstallContext {
    Machine,
    UserManaged,
    UserUnmanaged,
}

impl InstallContext {
    pub fn flag(self) -> u32 {
        match self {
            InstallContext::UserUnmanaged => codes::CONTEXT_USER_UNMANAGED,
            InstallContext::UserManaged => codes::CONTEXT_USER_MANAGED,
            InstallContext::Machine => codes::CONTEXT_MACHINE,
        }
    }

    pub fn from_flag(flag: u32) -> Option<Self> {
        match flag {
            codes::CONTEXT_USER_UNMANAGED => Some(InstallContext::UserUnmanaged),
            codes::CONTEXT_USER_MANAGED => Some(InstallContext::UserManaged),
            codes::CONTEXT_MACHINE => Some(InstallContext::Machine),
            _ => None,
        }
    }
}

impl fmt::Display for InstallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InstallContext::Machine => "machine",
            InstallContext::UserManaged => "user-managed",
            InstallContext::UserUnmanaged => "user-unmanaged",
        };
        f.write_str(label)
    }
}

/// Set of installation contexts an enumeration should cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextMask(u32);

impl ContextMask {
    pub const MACHINE: ContextMask = ContextMask(codes::CONTEXT_MACHINE);
    pub const USER_MANAGED: ContextMask = ContextMask(codes::CONTEXT_USER_MANAGED);
    pub const USER_UNMANAGED: ContextMask = ContextMask(codes::CONTEXT_USER_UNMANAGED);
    pub const ALL: ContextMask = ContextMask(
        codes::CONTEXT_MACHINE | codes::CONTEXT_USER_MANAGED | codes::CONTEXT_USER_UNMANAGED,
    );

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, context: InstallContext) -> bool {
        self.0 & context.flag() != 0
    }
}

impl From<InstallContext> for ContextMask {
    fn from(context: InstallContext) -> Self {
        ContextMask(context.flag())
    }
}

/// Whose registrations an enumeration covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserScope {
    AllUsers,
    CurrentUser,
    User(String),
}

impl UserScope {
    /// SID argument for the native call; `None` means the current user.
    pub fn sid(&self) -> Option<&str> {
        match self {
            UserScope::AllUsers => Some(ALL_USERS_SID),
            UserScope::CurrentUser => None,
            UserScope::User(sid) => Some(sid),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductIdentity {
    pub product_code: String,
    /// `None` for per-machine registrations.
    pub user_sid: Option<String>,
    pub context: InstallContext,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PatchIdentity {
    pub patch_code: String,
    pub product_code: String,
    pub user_sid: Option<String>,
    pub context: InstallContext,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentIdentity {
    pub component_code: String,
    pub user_sid: Option<String>,
    pub context: InstallContext,
}

#[derive(Debug, Clone, Copy)]
pub enum PropertyTarget<'a> {
    Product(&'a ProductIdentity),
    Patch(&'a PatchIdentity),
}

/// Raw property value as the native layer reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Text(String),
    Integer(i32),
    Absent,
}

impl PropertyValue {
    /// Collapses the value to a string where empty means absent.
    pub fn into_string(self) -> String {
        match self {
            PropertyValue::Text(text) => text,
            PropertyValue::Integer(value) => value.to_string(),
            PropertyValue::Absent => String::new(),
        }
    }
}

/// Outcome of asking the native layer for the item at one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumStep<T> {
    Item(T),
    /// This index failed for a reason other than access denial.
    Skip(u32),
    AccessDenied,
    End,
}

/// The installer query primitives, one index step at a time.
///
/// Implementations must hold no cursor state: asking for index 0 always
/// restarts the enumeration.
pub trait InstallerApi {
    fn product_at(&self, scope: &UserScope, contexts: ContextMask, index: u32)
        -> EnumStep<ProductIdentity>;

    /// Applied patches of one product. Patches inherit the user and context
    /// of their target product.
    fn patch_at(&self, product: &ProductIdentity, index: u32) -> EnumStep<PatchIdentity>;

    fn component_at(
        &self,
        scope: &UserScope,
        contexts: ContextMask,
        index: u32,
    ) -> EnumStep<ComponentIdentity>;

    /// Installed path of a component. `product_code == None` resolves through
    /// any product that provides the component.
    fn component_path(
        &self,
        product_code: Option<&str>,
        component_code: &str,
        user_sid: Option<&str>,
        context: InstallContext,
    ) -> Option<String>;

    fn property(&self, target: PropertyTarget<'_>, name: &str) -> PropertyValue;
}

/// Sequence and string conveniences layered over [`InstallerApi`].
pub trait InstallerApiExt: InstallerApi {
    fn enumerate_products(
        &self,
        scope: &UserScope,
        contexts: ContextMask,
    ) -> Enumeration<'_, ProductIdentity> {
        let scope = scope.clone();
        Enumeration::new("products", DeniedPolicy::Fatal, move |index| {
            self.product_at(&scope, contexts, index)
        })
    }

    fn enumerate_patches<'a>(
        &'a self,
        product: &'a ProductIdentity,
    ) -> Enumeration<'a, PatchIdentity> {
        Enumeration::new("patches", DeniedPolicy::EndSequence, move |index| {
            self.patch_at(product, index)
        })
    }

    fn enumerate_components(
        &self,
        scope: &UserScope,
        contexts: ContextMask,
    ) -> Enumeration<'_, ComponentIdentity> {
        let scope = scope.clone();
        Enumeration::new("components", DeniedPolicy::EndSequence, move |index| {
            self.component_at(&scope, contexts, index)
        })
    }

    fn property_text(&self, target: PropertyTarget<'_>, name: &str) -> String {
        self.property(target, name).into_string()
    }
}

impl<A: InstallerApi + ?Sized> InstallerApiExt for A {}

/// The live Windows Installer on this machine.
#[cfg(target_os = "windows")]
pub fn system_installer() -> Result<Box<dyn InstallerApi>, Error> {
    Ok(Box::new(native::WindowsInstaller))
}

#[cfg(not(target_os = "windows"))]
pub fn system_installer() -> Result<Box<dyn InstallerApi>, Error> {
    Err(Error::UnsupportedPlatform)
}
