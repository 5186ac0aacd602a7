//! The two-call string protocol shared by every installer getter.
//!
//! First call: no buffer, learn the length. Second call: a buffer of that
//! length plus the terminator. If the value grew in between, the native side
//! answers "more data" with the new length and we retry exactly once.

use tracing::trace;

use super::codes::{ERROR_MORE_DATA, ERROR_SUCCESS, SID_BUFFER_LEN};

/// Runs the sizing protocol against `call`.
///
/// `call` receives the output buffer (`None` for the sizing call) and the
/// in/out character count. On input the count is the buffer capacity
/// including the terminator; on output it is the value length without it.
/// Returns `None` when either call fails or the value is empty.
pub fn read_string<F>(mut call: F) -> Option<String>
where
    F: FnMut(Option<&mut [u16]>, &mut u32) -> u32,
{
    let mut required: u32 = 0;
    let code = call(None, &mut required);
    if code != ERROR_SUCCESS && code != ERROR_MORE_DATA {
        trace!("Size query failed with {}", code);
        return None;
    }
    if required == 0 {
        return None;
    }

    for _ in 0..2 {
        let capacity = required.checked_add(1)?;
        let mut buf = vec![0u16; capacity as usize];
        let mut written = capacity;
        match call(Some(&mut buf), &mut written) {
            ERROR_SUCCESS => {
                let end = (written as usize).min(buf.len());
                let value = from_wide(&buf[..end]);
                return if value.is_empty() { None } else { Some(value) };
            }
            ERROR_MORE_DATA if written > required => {
                trace!("Value grew from {} to {} chars, retrying", required, written);
                required = written;
            }
            other => {
                trace!("Value read failed with {}", other);
                return None;
            }
        }
    }

    None
}

/// Runs one indexed enumeration call that also reports a SID.
///
/// The SID goes into a fixed buffer first. When it does not fit, the same
/// index is queried once more with room for the reported length plus the
/// terminator. Returns the final status and the SID, if one came back.
pub fn read_with_sid<F>(mut call: F) -> (u32, Option<String>)
where
    F: FnMut(&mut [u16], &mut u32) -> u32,
{
    let mut sid = vec![0u16; SID_BUFFER_LEN];
    let mut sid_len = SID_BUFFER_LEN as u32;
    let mut rc = call(&mut sid, &mut sid_len);

    if rc == ERROR_MORE_DATA {
        trace!("SID needs {} chars, re-querying", sid_len);
        let Some(capacity) = sid_len.checked_add(1) else {
            return (rc, None);
        };
        sid = vec![0u16; capacity as usize];
        sid_len = capacity;
        rc = call(&mut sid, &mut sid_len);
    }

    let sid = (rc == ERROR_SUCCESS && sid_len > 0)
        .then(|| from_wide(&sid))
        .filter(|s| !s.is_empty());
    (rc, sid)
}

/// NUL-terminated UTF-16 copy of `s` for passing to the native API.
pub fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Decodes a UTF-16 buffer up to its first NUL.
pub fn from_wide(buf: &[u16]) -> String {
    let end = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msi::codes::{ERROR_UNKNOWN_PROPERTY, ERROR_UNKNOWN_PRODUCT};
    use std::cell::RefCell;

    /// Behaves like MsiGetProductInfoEx for a value that may change between calls.
    fn native_getter<'a>(
        values: &'a RefCell<Vec<&'static str>>,
        capacities: &'a RefCell<Vec<u32>>,
    ) -> impl FnMut(Option<&mut [u16]>, &mut u32) -> u32 + 'a {
        move |buf: Option<&mut [u16]>, len: &mut u32| {
            let value = {
                let mut values = values.borrow_mut();
                if values.len() > 1 {
                    values.remove(0)
                } else {
                    values[0]
                }
            };
            let wide: Vec<u16> = value.encode_utf16().collect();
            match buf {
                None => {
                    *len = wide.len() as u32;
                    ERROR_SUCCESS
                }
                Some(buf) => {
                    capacities.borrow_mut().push(*len);
                    if (*len as usize) < wide.len() + 1 {
                        *len = wide.len() as u32;
                        return ERROR_MORE_DATA;
                    }
                    buf[..wide.len()].copy_from_slice(&wide);
                    buf[wide.len()] = 0;
                    *len = wide.len() as u32;
                    ERROR_SUCCESS
                }
            }
        }
    }

    #[test]
    fn test_reads_value_with_exact_capacity() {
        let values = RefCell::new(vec![r"C:\Windows\Installer\1a2b.msi"]);
        let capacities = RefCell::new(Vec::new());
        let value = read_string(native_getter(&values, &capacities));
        assert_eq!(value.as_deref(), Some(r"C:\Windows\Installer\1a2b.msi"));
        // Length reported by the sizing call plus one terminator slot.
        assert_eq!(capacities.borrow().as_slice(), &[30]);
    }

    #[test]
    fn test_value_growing_between_calls_is_retried_once() {
        let values = RefCell::new(vec!["short", "a longer value", "a longer value"]);
        let capacities = RefCell::new(Vec::new());
        let value = read_string(native_getter(&values, &capacities));
        assert_eq!(value.as_deref(), Some("a longer value"));
        assert_eq!(capacities.borrow().as_slice(), &[6, 15]);
    }

    #[test]
    fn test_value_that_keeps_growing_is_not_truncated() {
        let values = RefCell::new(vec!["a", "ab", "abc", "abcd"]);
        let capacities = RefCell::new(Vec::new());
        assert_eq!(read_string(native_getter(&values, &capacities)), None);
        assert_eq!(capacities.borrow().len(), 2);
    }

    #[test]
    fn test_sizing_failure_reads_as_absent() {
        let mut calls = 0;
        let value = read_string(|_, _| {
            calls += 1;
            ERROR_UNKNOWN_PROPERTY
        });
        assert_eq!(value, None);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_empty_value_reads_as_absent() {
        let values = RefCell::new(vec![""]);
        let capacities = RefCell::new(Vec::new());
        assert_eq!(read_string(native_getter(&values, &capacities)), None);
        assert!(capacities.borrow().is_empty());
    }

    #[test]
    fn test_second_call_failure_reads_as_absent() {
        let value = read_string(|buf, len| match buf {
            None => {
                *len = 10;
                ERROR_MORE_DATA
            }
            Some(_) => ERROR_UNKNOWN_PRODUCT,
        });
        assert_eq!(value, None);
    }

    /// Behaves like MsiEnumProductsEx reporting `sid` for the item.
    fn sid_reporter<'a>(
        sid: &'a str,
        capacities: &'a RefCell<Vec<u32>>,
    ) -> impl FnMut(&mut [u16], &mut u32) -> u32 + 'a {
        move |buf: &mut [u16], len: &mut u32| {
            capacities.borrow_mut().push(*len);
            let wide: Vec<u16> = sid.encode_utf16().collect();
            if (*len as usize) < wide.len() + 1 {
                *len = wide.len() as u32;
                return ERROR_MORE_DATA;
            }
            buf[..wide.len()].copy_from_slice(&wide);
            buf[wide.len()] = 0;
            *len = wide.len() as u32;
            ERROR_SUCCESS
        }
    }

    #[test]
    fn test_short_sid_fits_fixed_buffer() {
        let capacities = RefCell::new(Vec::new());
        let (rc, sid) = read_with_sid(sid_reporter("S-1-5-21-1004", &capacities));
        assert_eq!(rc, ERROR_SUCCESS);
        assert_eq!(sid.as_deref(), Some("S-1-5-21-1004"));
        assert_eq!(capacities.borrow().as_slice(), &[SID_BUFFER_LEN as u32]);
    }

    #[test]
    fn test_long_sid_is_requeried_with_room_for_terminator() {
        let long_sid = format!("S-1-5-21-{}", "7".repeat(300));
        let capacities = RefCell::new(Vec::new());
        let (rc, sid) = read_with_sid(sid_reporter(&long_sid, &capacities));

        assert_eq!(rc, ERROR_SUCCESS);
        assert_eq!(sid.as_deref(), Some(long_sid.as_str()));
        assert_eq!(
            capacities.borrow().as_slice(),
            &[SID_BUFFER_LEN as u32, long_sid.len() as u32 + 1]
        );
    }

    #[test]
    fn test_machine_item_without_sid() {
        let (rc, sid) = read_with_sid(|_, len| {
            *len = 0;
            ERROR_SUCCESS
        });
        assert_eq!(rc, ERROR_SUCCESS);
        assert_eq!(sid, None);
    }

    #[test]
    fn test_wide_conversions() {
        let wide = to_wide("s-1-1-0");
        assert_eq!(wide.len(), 8);
        assert_eq!(*wide.last().unwrap(), 0);
        assert_eq!(from_wide(&wide), "s-1-1-0");
        assert_eq!(from_wide(&[0x41, 0x42]), "AB");
    }
}
