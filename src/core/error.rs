//! Error types for version resolution and installation
//!
//! Uses `thiserror` so that each failure class stays a distinct value all the way
//! up to the CLI. Integrity failures in particular are kept apart: a checksum
//! mismatch points at a corrupt mirror, a signature failure at the signing key.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, SwitchError>;

#[derive(Error, Debug)]
pub enum SwitchError {
    // Configuration errors
    #[error("failed to read configuration from {path}: {reason}")]
    Config { path: String, reason: String },

    #[error("invalid version {version:?} from {origin}: expected #.#.# or #.#.#-<letters><digits>")]
    InvalidVersion { version: String, origin: String },

    #[error("invalid version constraint {constraint:?}: {reason}")]
    InvalidConstraint { constraint: String, reason: String },

    #[error("unknown product {id:?} (expected one of: {known})")]
    UnknownProduct { id: String, known: String },

    #[error("cannot force color and disable color at the same time ({origin})")]
    ColorConflict { origin: String },

    // Resolution errors
    #[error("no version found matching constraint {constraint:?}")]
    NoMatchingVersion { constraint: String },

    #[error("{product} version {version:?} does not exist in the mirror index")]
    VersionNotFound { product: String, version: String },

    #[error("mirror {url} returned no versions")]
    EmptyCatalog { url: String },

    // Network errors
    #[error("request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    #[error("request to {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("request to {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },

    // Integrity errors
    #[error("no checksum for {file} in manifest {manifest}")]
    ChecksumMissing { file: String, manifest: String },

    #[error("checksum mismatch for {file}\n  expected: {expected}\n  got:      {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("signature verification failed for {file}: {reason}")]
    SignatureInvalid { file: String, reason: String },

    // Installation errors
    #[error("failed to extract {archive}: {reason}")]
    Extract { archive: String, reason: String },

    #[error("executable {name:?} not found in release archive {archive}")]
    ExecutableNotFound { archive: String, name: String },

    #[error("failed to acquire lock {path} after {attempts} attempts; remove it manually if no install is running")]
    LockTimeout { path: PathBuf, attempts: u32 },

    #[error("unable to update symlink {path}: {reason}")]
    Symlink { path: String, reason: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SwitchError {
    /// Wrap an I/O error with the path it happened at
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for failures that indicate tampered or corrupt downloads
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            Self::ChecksumMissing { .. } | Self::ChecksumMismatch { .. } | Self::SignatureInvalid { .. }
        )
    }
}
