//! Diagnostic logging setup
//!
//! User-facing progress goes through [`super::output`]; everything here is
//! `tracing` diagnostics written to stderr.

use std::fmt;
use tracing_subscriber::EnvFilter;

/// Log level as accepted by `--log-level`, `TF_LOG_LEVEL` and `log-level`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Notice,
    Debug,
    Trace,
}

impl LogLevel {
    /// Case-insensitive parse; `None` for unknown names
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ERROR" => Some(Self::Error),
            "WARN" | "WARNING" => Some(Self::Warn),
            "INFO" => Some(Self::Info),
            "NOTICE" => Some(Self::Notice),
            "DEBUG" => Some(Self::Debug),
            "TRACE" => Some(Self::Trace),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Notice => "NOTICE",
            Self::Debug => "DEBUG",
            Self::Trace => "TRACE",
        }
    }

    /// `EnvFilter` directive; NOTICE has no tracing equivalent and maps to info
    pub fn to_filter_directive(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info | Self::Notice => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn initialize_tracing(level: LogLevel, ansi: bool) {
    let filter = EnvFilter::new(level.to_filter_directive());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(ansi)
        .with_writer(std::io::stderr)
        .try_init();
}
