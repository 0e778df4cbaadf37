//! Streaming download with a progress bar

use super::http::io_to_network;
use crate::core::error::{Result, SwitchError};
use crate::helpers::internal::fs_utils;
use crate::helpers::internal::progress::{self, ProgressGuard, upgrade_to_bytes};
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

/// Stream a response body into `dest`, returning the number of bytes written.
///
/// A partially written file is left behind on failure; the caller owns the
/// staging directory and discards it.
pub fn download_with_progress(
    response: ureq::Response,
    url: &str,
    dest: &Path,
    timeout: Duration,
) -> Result<u64> {
    fs_utils::ensure_parent_dir(dest)?;

    let filename = dest
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());

    let pb = progress::create_spinner(&filename);
    let _guard = ProgressGuard::new(&pb);

    if let Some(len) = response
        .header("content-length")
        .and_then(|s| s.parse().ok())
    {
        upgrade_to_bytes(&pb, len);
    }

    let mut file = std::fs::File::create(dest).map_err(|e| SwitchError::io(dest, e))?;
    let mut reader = response.into_reader();
    let mut buffer = [0u8; 8192];
    let mut total_bytes = 0u64;

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| io_to_network(url, timeout, e))?;
        if bytes_read == 0 {
            break;
        }
        file.write_all(&buffer[..bytes_read])
            .map_err(|e| SwitchError::io(dest, e))?;
        total_bytes += bytes_read as u64;
        pb.set_position(total_bytes);
    }

    file.flush().map_err(|e| SwitchError::io(dest, e))?;
    Ok(total_bytes)
}
