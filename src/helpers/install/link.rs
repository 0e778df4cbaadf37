//! Active-binary link management
//!
//! The active binary is replaced by removing the old link and creating a new
//! one. There is a short window where no link exists.

use crate::core::error::{Result, SwitchError};
use std::path::{Path, PathBuf};

/// First candidate whose parent directory exists
///
/// Fails when a directory occupies the chosen path.
pub fn choose_link_path(candidates: &[PathBuf]) -> Result<PathBuf> {
    let link = candidates
        .iter()
        .find(|c| c.parent().is_some_and(Path::is_dir))
        .cloned()
        .ok_or_else(|| SwitchError::Symlink {
            path: candidates
                .iter()
                .map(|c| c.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            reason: "no parent directory exists; create one or pass --bin".to_string(),
        })?;

    if std::fs::symlink_metadata(&link).is_ok_and(|meta| meta.is_dir()) {
        return Err(directory_in_the_way(&link));
    }
    Ok(link)
}

fn directory_in_the_way(link: &Path) -> SwitchError {
    SwitchError::Symlink {
        path: link.display().to_string(),
        reason: "a directory is in the way".to_string(),
    }
}

/// Point `link` at `target`, replacing whatever file is there
pub fn relink(target: &Path, link: &Path) -> Result<()> {
    let symlink_err = |reason: String| SwitchError::Symlink {
        path: link.display().to_string(),
        reason,
    };

    if let Ok(meta) = std::fs::symlink_metadata(link) {
        if meta.is_dir() {
            return Err(directory_in_the_way(link));
        }
        if !meta.file_type().is_symlink() {
            tracing::warn!(path = %link.display(), "replacing a regular file with the active link");
        }
        std::fs::remove_file(link).map_err(|e| symlink_err(format!("cannot remove: {}", e)))?;
        tracing::debug!(link = %link.display(), "removed previous link");
    }

    create_link(target, link).map_err(|e| symlink_err(e.to_string()))?;
    tracing::debug!(link = %link.display(), target = %target.display(), "linked");
    Ok(())
}

/// Target of the current link, if it is a symlink
pub fn current_target(link: &Path) -> Option<PathBuf> {
    std::fs::read_link(link).ok()
}

#[cfg(unix)]
fn create_link(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

// Symlinks need elevated rights on Windows; a copy behaves the same for callers
#[cfg(not(unix))]
fn create_link(target: &Path, link: &Path) -> std::io::Result<()> {
    std::fs::copy(target, link).map(|_| ())
}
