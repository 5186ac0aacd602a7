//! Status codes and flag values of the Windows Installer API.

pub const ERROR_SUCCESS: u32 = 0;
pub const ERROR_ACCESS_DENIED: u32 = 5;
pub const ERROR_INVALID_PARAMETER: u32 = 87;
pub const ERROR_MORE_DATA: u32 = 234;
pub const ERROR_NO_MORE_ITEMS: u32 = 259;
pub const ERROR_UNKNOWN_PRODUCT: u32 = 1605;
pub const ERROR_UNKNOWN_PROPERTY: u32 = 1608;
pub const ERROR_BAD_CONFIGURATION: u32 = 1610;
pub const ERROR_FUNCTION_FAILED: u32 = 1627;

pub const CONTEXT_USER_UNMANAGED: u32 = 0x1;
pub const CONTEXT_USER_MANAGED: u32 = 0x2;
pub const CONTEXT_MACHINE: u32 = 0x4;

pub const PATCH_STATE_APPLIED: u32 = 0x1;

/// INSTALLSTATE returned by component path queries when the buffer is short.
pub const INSTALLSTATE_MOREDATA: i32 = -3;

/// GUID in registry format plus terminator.
pub const GUID_BUFFER_LEN: usize = 39;
pub const SID_BUFFER_LEN: usize = 256;

/// How an enumeration call's return code should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    End,
    Denied,
    Failed(u32),
}

pub fn classify(code: u32) -> Status {
    match code {
        ERROR_SUCCESS => Status::Ok,
        ERROR_NO_MORE_ITEMS => Status::End,
        ERROR_ACCESS_DENIED => Status::Denied,
        other => Status::Failed(other),
    }
}

/// Maps an INSTALLSTATE onto the error-code vocabulary of the string
/// protocol: non-negative states carry a path, MOREDATA asks for a larger
/// buffer, everything else means "no path".
pub fn install_state_code(state: i32) -> u32 {
    if state >= 0 {
        ERROR_SUCCESS
    } else if state == INSTALLSTATE_MOREDATA {
        ERROR_MORE_DATA
    } else {
        ERROR_FUNCTION_FAILED
    }
}
