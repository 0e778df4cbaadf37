//! SHA256 checksums and manifest lookup
//!
//! Release manifests are `SHA256SUMS` files: one `<64 hex><two spaces><file>`
//! entry per line.

use crate::core::error::{Result, SwitchError};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Chunk size for reading files during hashing (1MB)
const CHUNK_SIZE: usize = 1024 * 1024;

/// Hex-encoded SHA256 of a file
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut f = std::fs::File::open(path).map_err(|e| SwitchError::io(path, e))?;
    hash_reader::<Sha256>(&mut f).map_err(|e| SwitchError::io(path, e))
}

fn hash_reader<D: Digest>(reader: &mut impl Read) -> std::io::Result<String> {
    let mut hasher = D::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Find the digest recorded for `file_name` in a manifest
///
/// Only lines split by exactly two spaces are considered, and the file name
/// must match exactly.
pub fn checksum_for<'a>(manifest: &'a str, file_name: &str) -> Option<&'a str> {
    manifest.lines().find_map(|line| {
        let (digest, name) = line.trim_end_matches('\r').split_once("  ")?;
        (name == file_name).then_some(digest)
    })
}

/// Check `archive` against its manifest entry
pub fn verify_against_manifest(archive: &Path, manifest: &str, manifest_name: &str) -> Result<()> {
    let file_name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let expected = checksum_for(manifest, &file_name).ok_or_else(|| SwitchError::ChecksumMissing {
        file: file_name.clone(),
        manifest: manifest_name.to_string(),
    })?;

    let actual = sha256_file(archive)?;
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(SwitchError::ChecksumMismatch {
            file: file_name,
            expected: expected.to_lowercase(),
            actual,
        });
    }

    tracing::debug!(file = %file_name, sha256 = %actual, "checksum verified");
    Ok(())
}
