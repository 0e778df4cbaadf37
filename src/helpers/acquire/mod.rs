//! Fetching and authenticating release artifacts
//!
//! - **http**: the `MirrorTransport` seam and its `ureq` implementation
//! - **download**: streaming a response body to disk with progress
//! - **verify**: detached OpenPGP signatures over checksum manifests

pub mod download;
pub mod http;
pub mod verify;

pub use http::{HttpTransport, MirrorTransport, timeout_from_env};
pub use verify::{PgpVerifier, SignatureVerifier};
