//! Release archive extraction
//!
//! Release zips contain the executable plus licence and readme files. Only the
//! executable is unpacked; everything else in the archive is ignored.

use crate::core::error::{Result, SwitchError};
use crate::helpers::internal::fs_utils;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Mode applied when the archive carries no Unix permissions
const DEFAULT_EXEC_MODE: u32 = 0o755;

/// Extract the entry named `executable` from a zip into `dest_dir`
///
/// Returns the path of the extracted file. Entries with unsafe paths are
/// skipped; the executable may sit in a subdirectory of the archive.
pub fn extract_executable(archive_path: &Path, dest_dir: &Path, executable: &str) -> Result<PathBuf> {
    let archive_name = archive_path.display().to_string();
    let extract_err = |reason: String| SwitchError::Extract {
        archive: archive_name.clone(),
        reason,
    };

    let file = File::open(archive_path).map_err(|e| SwitchError::io(archive_path, e))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| extract_err(format!("zip read error: {}", e)))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| extract_err(format!("zip entry error: {}", e)))?;

        if !entry.is_file() {
            continue;
        }
        let Some(inner) = entry.enclosed_name() else {
            tracing::debug!(entry = entry.name(), "skipping unsafe zip path");
            continue;
        };
        if inner.file_name().and_then(|n| n.to_str()) != Some(executable) {
            continue;
        }

        fs_utils::ensure_dir(dest_dir)?;
        let outpath = dest_dir.join(executable);
        let mut outfile = File::create(&outpath).map_err(|e| SwitchError::io(&outpath, e))?;
        std::io::copy(&mut entry, &mut outfile)
            .map_err(|e| extract_err(format!("write error for {}: {}", outpath.display(), e)))?;

        let mode = entry.unix_mode().unwrap_or(DEFAULT_EXEC_MODE) | 0o100;
        fs_utils::set_mode(&outpath, mode & 0o7777)?;

        tracing::debug!(from = %inner.display(), to = %outpath.display(), "extracted executable");
        return Ok(outpath);
    }

    Err(SwitchError::ExecutableNotFound {
        archive: archive_name,
        name: executable.to_string(),
    })
}
