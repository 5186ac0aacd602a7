use std::ptr;
use tracing::debug;
use windows_sys::Win32::Foundation::ERROR_SUCCESS;
use windows_sys::Win32::System::Registry::{RegCloseKey, RegOpenKeyExW, HKEY, HKEY_LOCAL_MACHINE, KEY_READ};

use crate::msi::buffer::to_wide;

const REBOOT_KEYS: &[&str] = &[
    r"SOFTWARE\Microsoft\Windows\CurrentVersion\WindowsUpdate\Auto Update\RebootRequired",
    r"SOFTWARE\Microsoft\Windows\CurrentVersion\Component Based Servicing\RebootPending",
];

/// A pending reboot can leave packages half-registered, so the CLI warns
/// before trusting the scan. Any failure reads as "no reboot pending".
pub fn has_pending_reboot() -> bool {
    REBOOT_KEYS.iter().any(|key| key_exists(key))
}

fn key_exists(sub_key: &str) -> bool {
    let wide = to_wide(sub_key);
    let mut handle: HKEY = ptr::null_mut();
    let status = unsafe { RegOpenKeyExW(HKEY_LOCAL_MACHINE, wide.as_ptr(), 0, KEY_READ, &mut handle) };
    if status != ERROR_SUCCESS {
        return false;
    }
    unsafe {
        RegCloseKey(handle);
    }
    debug!("Pending reboot marker present: HKLM\\{}", sub_key);
    true
}
