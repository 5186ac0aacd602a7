#[cfg(target_os = "windows")]
pub mod windows;

use std::env;
use std::path::PathBuf;

/// `%windir%\Installer`, falling back to `C:\Windows\Installer`.
pub fn default_installer_dir() -> PathBuf {
    let windir = env::var_os("windir")
        .or_else(|| env::var_os("SystemRoot"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(r"C:\Windows"));
    windir.join("Installer")
}

#[cfg(target_os = "windows")]
pub fn has_pending_reboot() -> bool {
    windows::has_pending_reboot()
}

#[cfg(not(target_os = "windows"))]
pub fn has_pending_reboot() -> bool {
    false
}

/// Key used wherever two installer paths are compared: lowercase, with `/`
/// folded into `\` so either separator style names the same file.
pub fn path_key(path: &str) -> String {
    path.to_lowercase().replace('/', "\\")
}

/// True when `path` names something below `dir`, compared case-insensitively.
/// Either separator style is accepted.
pub fn is_within_dir(path: &str, dir: &str) -> bool {
    let dir = path_key(dir.trim_end_matches(['\\', '/']));
    let path = path_key(path);
    if dir.is_empty() || path.len() <= dir.len() || !path.starts_with(&dir) {
        return false;
    }
    path.as_bytes()[dir.len()] == b'\\'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_key_folds_case_and_separators() {
        assert_eq!(
            path_key(r"C:/Windows/Installer\AAA.msi"),
            path_key(r"c:\windows\installer\aaa.MSI")
        );
    }

    #[test]
    fn test_is_within_dir_mixed_separators() {
        assert!(is_within_dir(r"C:\Windows\Installer\a.msi", "C:/Windows/Installer"));
        assert!(is_within_dir("C:/Windows/Installer/a.msi", r"C:\Windows\Installer"));
    }

    #[test]
    fn test_is_within_dir_ignores_case() {
        assert!(is_within_dir(
            r"C:\WINDOWS\Installer\1a2b3c.msi",
            r"c:\windows\installer"
        ));
        assert!(is_within_dir(
            r"C:\Windows\Installer\{GUID}\icon.exe",
            r"C:\Windows\Installer\"
        ));
    }

    #[test]
    fn test_is_within_dir_requires_separator_boundary() {
        assert!(!is_within_dir(
            r"C:\Windows\InstallerBackup\1a2b3c.msi",
            r"C:\Windows\Installer"
        ));
        assert!(!is_within_dir(r"C:\Windows\Installer", r"C:\Windows\Installer"));
        assert!(!is_within_dir(r"D:\Program Files\app.exe", r"C:\Windows\Installer"));
    }

    #[test]
    fn test_default_installer_dir_ends_with_installer() {
        assert!(default_installer_dir().ends_with("Installer"));
    }
}
