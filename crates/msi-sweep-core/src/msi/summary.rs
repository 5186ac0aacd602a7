use std::ptr;
use tracing::debug;
use windows_sys::Win32::Foundation::FILETIME;
use windows_sys::Win32::Security::Cryptography::{
    CertFreeCertificateContext, CertGetNameStringW, CERT_CONTEXT, CERT_NAME_SIMPLE_DISPLAY_TYPE,
};
use windows_sys::Win32::System::ApplicationInstallationAndServicing::{
    MsiCloseHandle, MsiGetFileSignatureInformationW, MsiGetSummaryInformationW,
    MsiSummaryInfoGetPropertyW, MSIHANDLE,
};

use super::buffer::{from_wide, read_string, to_wide};
use super::codes::ERROR_SUCCESS;
use crate::exclusion::SummaryInfoSource;
use crate::models::PackageSummary;

const PID_TITLE: u32 = 2;
const PID_SUBJECT: u32 = 3;
const PID_AUTHOR: u32 = 4;
const PID_COMMENTS: u32 = 6;
const VT_LPSTR: u32 = 30;

/// Reads the summary information stream of `.msi`/`.msp` files.
pub struct MsiSummaryReader;

struct SummaryHandle(MSIHANDLE);

impl Drop for SummaryHandle {
    fn drop(&mut self) {
        if self.0 != 0 {
            unsafe {
                MsiCloseHandle(self.0);
            }
        }
    }
}

impl SummaryInfoSource for MsiSummaryReader {
    fn summary_info(&self, path: &str) -> Option<PackageSummary> {
        let wide_path = to_wide(path);
        let mut raw: MSIHANDLE = 0;
        let rc = unsafe { MsiGetSummaryInformationW(0, wide_path.as_ptr(), 0, &mut raw) };
        if rc != ERROR_SUCCESS {
            debug!("No summary information for {} (error {})", path, rc);
            return None;
        }
        let handle = SummaryHandle(raw);

        Some(PackageSummary {
            title: string_property(&handle, PID_TITLE),
            subject: string_property(&handle, PID_SUBJECT),
            author: string_property(&handle, PID_AUTHOR),
            comments: string_property(&handle, PID_COMMENTS),
            signer: signer_name(&wide_path),
        })
    }
}

fn string_property(handle: &SummaryHandle, property: u32) -> String {
    let mut data_type: u32 = 0;
    let value = read_string(|buf, len| {
        let mut int_value: i32 = 0;
        let mut filetime = FILETIME {
            dwLowDateTime: 0,
            dwHighDateTime: 0,
        };
        unsafe {
            MsiSummaryInfoGetPropertyW(
                handle.0,
                property,
                &mut data_type,
                &mut int_value,
                &mut filetime,
                buf.map_or(ptr::null_mut(), |b| b.as_mut_ptr()),
                len,
            )
        }
    });

    if data_type != VT_LPSTR {
        return String::new();
    }
    value.unwrap_or_default()
}

/// Simple display name (usually the CN) of the package's Authenticode signer.
fn signer_name(wide_path: &[u16]) -> String {
    let mut cert: *mut CERT_CONTEXT = ptr::null_mut();
    let hr = unsafe {
        MsiGetFileSignatureInformationW(
            wide_path.as_ptr(),
            0,
            &mut cert,
            ptr::null_mut(),
            ptr::null_mut(),
        )
    };
    if hr != 0 || cert.is_null() {
        return String::new();
    }

    let name = unsafe {
        let len = CertGetNameStringW(
            cert,
            CERT_NAME_SIMPLE_DISPLAY_TYPE,
            0,
            ptr::null(),
            ptr::null_mut(),
            0,
        );
        if len > 1 {
            let mut buf = vec![0u16; len as usize];
            CertGetNameStringW(
                cert,
                CERT_NAME_SIMPLE_DISPLAY_TYPE,
                0,
                ptr::null(),
                buf.as_mut_ptr(),
                len,
            );
            from_wide(&buf)
        } else {
            String::new()
        }
    };

    unsafe {
        CertFreeCertificateContext(cert);
    }
    name
}
