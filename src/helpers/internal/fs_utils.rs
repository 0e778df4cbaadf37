//! Filesystem utilities shared by the installer and config readers

use crate::core::error::{Result, SwitchError};
use std::path::{Path, PathBuf};

/// Create `dir` and its ancestors if missing.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.as_os_str().is_empty() && !dir.is_dir() {
        std::fs::create_dir_all(dir).map_err(|e| SwitchError::io(dir, e))?;
    }
    Ok(())
}

/// Ensure a file's parent directory exists.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) => ensure_dir(parent),
        None => Ok(()),
    }
}

/// Set file permissions (Unix only).
#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .map_err(|e| SwitchError::io(path, e))
}

#[cfg(not(unix))]
pub fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

/// Read a small text file, returning `None` when it does not exist.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SwitchError::io(path, e)),
    }
}

/// Expand `$VAR`, `${VAR}` and a leading `~` using the supplied lookups.
///
/// Unknown variables expand to the empty string.
pub fn expand_path(
    raw: &str,
    home: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> PathBuf {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }
        let mut name = String::new();
        while let Some(&n) = chars.peek() {
            if n.is_ascii_alphanumeric() || n == '_' {
                name.push(n);
                chars.next();
            } else {
                break;
            }
        }
        if braced && chars.peek() == Some(&'}') {
            chars.next();
        }
        if name.is_empty() {
            out.push('$');
        } else if let Some(value) = lookup(&name) {
            out.push_str(&value);
        }
    }

    match out.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\') => {
            home.join(rest.trim_start_matches(['/', '\\']))
        }
        _ => PathBuf::from(out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_parent_dir() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a/b/c.txt");
        ensure_parent_dir(&file).unwrap();
        assert!(dir.path().join("a/b").is_dir());
    }

    #[test]
    fn test_read_optional_missing_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_optional(&dir.path().join("nope")).unwrap().is_none());
    }

    #[test]
    fn test_expand_path_variables() {
        let lookup = |name: &str| match name {
            "HOME" => Some("/home/alice".to_string()),
            "BIN" => Some("bin".to_string()),
            _ => None,
        };
        let home = Path::new("/home/alice");
        assert_eq!(
            expand_path("$HOME/${BIN}/terraform", home, lookup),
            PathBuf::from("/home/alice/bin/terraform")
        );
        assert_eq!(
            expand_path("~/bin/tofu", home, lookup),
            PathBuf::from("/home/alice/bin/tofu")
        );
        assert_eq!(expand_path("/opt/$MISSING/x", home, lookup), PathBuf::from("/opt//x"));
        assert_eq!(expand_path("/cost$", home, lookup), PathBuf::from("/cost$"));
    }
}
