//! HTTP transport for mirror indexes and release artifacts
//!
//! Every request carries an explicit deadline. Index and manifest fetches use
//! `TFSWITCH_HTTP_TIMEOUT` (seconds, clamped to 5..=300, default 30); archive
//! downloads get a fixed five minute budget.

use super::download::download_with_progress;
use crate::core::error::{Result, SwitchError};
use std::path::Path;
use std::time::Duration;

/// Default HTTP timeout in seconds
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Deadline for archive downloads
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

const USER_AGENT: &str = concat!("tfswitch/", env!("CARGO_PKG_VERSION"));

/// Network access needed by the catalog and the installer
///
/// Tests substitute an in-memory implementation.
pub trait MirrorTransport {
    /// GET `url` and return the body as text
    fn fetch_text(&self, url: &str) -> Result<String>;

    /// GET `url` and stream the body into `dest`, returning the byte count
    fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// Timeout from a raw `TFSWITCH_HTTP_TIMEOUT` value
pub fn timeout_from_env(raw: Option<&str>) -> Duration {
    let secs = raw
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
    Duration::from_secs(secs.clamp(5, 300))
}

/// `ureq`-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    timeout: Duration,
    download_timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            download_timeout: DOWNLOAD_TIMEOUT,
        }
    }

    fn get(&self, url: &str, timeout: Duration) -> Result<ureq::Response> {
        ureq::get(url)
            .timeout(timeout)
            .set("User-Agent", USER_AGENT)
            .call()
            .map_err(|e| map_ureq_error(url, timeout, e))
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
    }
}

impl MirrorTransport for HttpTransport {
    fn fetch_text(&self, url: &str) -> Result<String> {
        tracing::debug!(url, "fetching");
        self.get(url, self.timeout)?
            .into_string()
            .map_err(|e| io_to_network(url, self.timeout, e))
    }

    fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<u64> {
        tracing::debug!(url, dest = %dest.display(), "downloading");
        let response = self.get(url, self.download_timeout)?;
        download_with_progress(response, url, dest, self.download_timeout)
    }
}

/// Map a `ureq` failure to the matching error variant
fn map_ureq_error(url: &str, timeout: Duration, err: ureq::Error) -> SwitchError {
    match err {
        ureq::Error::Status(status, _) => SwitchError::HttpStatus {
            url: url.to_string(),
            status,
        },
        ureq::Error::Transport(transport) => {
            let timed_out = std::error::Error::source(&transport)
                .and_then(|s| s.downcast_ref::<std::io::Error>())
                .is_some_and(is_timeout);
            if timed_out {
                SwitchError::Timeout {
                    url: url.to_string(),
                    seconds: timeout.as_secs(),
                }
            } else {
                SwitchError::Network {
                    url: url.to_string(),
                    reason: transport.to_string(),
                }
            }
        }
    }
}

/// Map a body read failure, keeping timeouts distinct
pub(crate) fn io_to_network(url: &str, timeout: Duration, err: std::io::Error) -> SwitchError {
    if is_timeout(&err) {
        SwitchError::Timeout {
            url: url.to_string(),
            seconds: timeout.as_secs(),
        }
    } else {
        SwitchError::Network {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}

fn is_timeout(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
    )
}
