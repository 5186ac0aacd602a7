use std::ptr;
use windows_sys::Win32::System::ApplicationInstallationAndServicing::{
    MsiEnumComponentsExW, MsiEnumPatchesExW, MsiEnumProductsExW, MsiGetComponentPathExW,
    MsiGetPatchInfoExW, MsiGetProductInfoExW, MSIINSTALLCONTEXT,
};

use super::buffer::{from_wide, read_string, read_with_sid, to_wide};
use super::codes::{
    classify, install_state_code, Status, ERROR_MORE_DATA, ERROR_SUCCESS, GUID_BUFFER_LEN,
    PATCH_STATE_APPLIED,
};
use super::{
    ComponentIdentity, ContextMask, EnumStep, InstallContext, InstallerApi, PatchIdentity,
    ProductIdentity, PropertyTarget, PropertyValue, UserScope,
};

/// `msi.dll` behind [`InstallerApi`]. Holds no state; every call passes its
/// scope explicitly.
pub struct WindowsInstaller;

impl InstallerApi for WindowsInstaller {
    fn product_at(
        &self,
        scope: &UserScope,
        contexts: ContextMask,
        index: u32,
    ) -> EnumStep<ProductIdentity> {
        let user = scope.sid().map(to_wide);
        let mut code = [0u16; GUID_BUFFER_LEN];
        let mut context: MSIINSTALLCONTEXT = 0;
        let (rc, sid) = read_with_sid(|sid_buf, sid_len| unsafe {
            MsiEnumProductsExW(
                ptr::null(),
                wide_ptr(&user),
                contexts.bits() as _,
                index,
                code.as_mut_ptr(),
                &mut context,
                sid_buf.as_mut_ptr(),
                sid_len,
            )
        });

        to_step(rc, context, |context| ProductIdentity {
            product_code: from_wide(&code),
            user_sid: user_sid_for(context, sid),
            context,
        })
    }

    fn patch_at(&self, product: &ProductIdentity, index: u32) -> EnumStep<PatchIdentity> {
        let product_code = to_wide(&product.product_code);
        let user = product.user_sid.as_deref().map(to_wide);
        let mut patch_code = [0u16; GUID_BUFFER_LEN];
        let mut target_code = [0u16; GUID_BUFFER_LEN];
        let mut context: MSIINSTALLCONTEXT = 0;
        let mut sid_len: u32 = 0;

        let mut rc = unsafe {
            MsiEnumPatchesExW(
                product_code.as_ptr(),
                wide_ptr(&user),
                product.context.flag() as _,
                PATCH_STATE_APPLIED as _,
                index,
                patch_code.as_mut_ptr(),
                target_code.as_mut_ptr(),
                &mut context,
                ptr::null_mut(),
                &mut sid_len,
            )
        };
        // No SID buffer was supplied, so "more data" only concerns the SID.
        if rc == ERROR_MORE_DATA {
            rc = ERROR_SUCCESS;
        }

        to_step(rc, product.context.flag() as _, |_| PatchIdentity {
            patch_code: from_wide(&patch_code),
            product_code: product.product_code.clone(),
            user_sid: product.user_sid.clone(),
            context: product.context,
        })
    }

    fn component_at(
        &self,
        scope: &UserScope,
        contexts: ContextMask,
        index: u32,
    ) -> EnumStep<ComponentIdentity> {
        let user = scope.sid().map(to_wide);
        let mut code = [0u16; GUID_BUFFER_LEN];
        let mut context: MSIINSTALLCONTEXT = 0;
        let (rc, sid) = read_with_sid(|sid_buf, sid_len| unsafe {
            MsiEnumComponentsExW(
                wide_ptr(&user),
                contexts.bits() as _,
                index,
                code.as_mut_ptr(),
                &mut context,
                sid_buf.as_mut_ptr(),
                sid_len,
            )
        });

        to_step(rc, context, |context| ComponentIdentity {
            component_code: from_wide(&code),
            user_sid: user_sid_for(context, sid),
            context,
        })
    }

    fn component_path(
        &self,
        product_code: Option<&str>,
        component_code: &str,
        user_sid: Option<&str>,
        context: InstallContext,
    ) -> Option<String> {
        let product = product_code.map(to_wide);
        let component = to_wide(component_code);
        let user = user_sid.map(to_wide);
        read_string(|buf, len| {
            let state = unsafe {
                MsiGetComponentPathExW(
                    wide_ptr(&product),
                    component.as_ptr(),
                    wide_ptr(&user),
                    context.flag() as _,
                    out_ptr(buf),
                    len,
                )
            };
            install_state_code(state as i32)
        })
    }

    fn property(&self, target: PropertyTarget<'_>, name: &str) -> PropertyValue {
        let name = to_wide(name);
        let value = match target {
            PropertyTarget::Product(product) => {
                let code = to_wide(&product.product_code);
                let user = product.user_sid.as_deref().map(to_wide);
                read_string(|buf, len| unsafe {
                    MsiGetProductInfoExW(
                        code.as_ptr(),
                        wide_ptr(&user),
                        product.context.flag() as _,
                        name.as_ptr(),
                        out_ptr(buf),
                        len,
                    )
                })
            }
            PropertyTarget::Patch(patch) => {
                let patch_code = to_wide(&patch.patch_code);
                let product_code = to_wide(&patch.product_code);
                let user = patch.user_sid.as_deref().map(to_wide);
                read_string(|buf, len| unsafe {
                    MsiGetPatchInfoExW(
                        patch_code.as_ptr(),
                        product_code.as_ptr(),
                        wide_ptr(&user),
                        patch.context.flag() as _,
                        name.as_ptr(),
                        out_ptr(buf),
                        len,
                    )
                })
            }
        };
        value.map_or(PropertyValue::Absent, PropertyValue::Text)
    }
}

fn to_step<T, F>(rc: u32, context: MSIINSTALLCONTEXT, build: F) -> EnumStep<T>
where
    F: FnOnce(InstallContext) -> T,
{
    match classify(rc) {
        Status::Ok => match InstallContext::from_flag(context as u32) {
            Some(context) => EnumStep::Item(build(context)),
            None => EnumStep::Skip(rc),
        },
        Status::End => EnumStep::End,
        Status::Denied => EnumStep::AccessDenied,
        Status::Failed(code) => EnumStep::Skip(code),
    }
}

/// Per-machine registrations never carry a SID.
fn user_sid_for(context: InstallContext, sid: Option<String>) -> Option<String> {
    match context {
        InstallContext::Machine => None,
        _ => sid,
    }
}

fn wide_ptr(value: &Option<Vec<u16>>) -> *const u16 {
    value.as_ref().map_or(ptr::null(), |w| w.as_ptr())
}

fn out_ptr(buf: Option<&mut [u16]>) -> *mut u16 {
    buf.map_or(ptr::null_mut(), |b| b.as_mut_ptr())
}
