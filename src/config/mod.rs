//! Configuration sources and parameter resolution
//!
//! Every invocation resolves one [`ResolvedParameters`] from, highest first:
//!
//! 1. command line flags and the positional version (always re-applied last)
//! 2. `.tfswitch.toml` in the working directory
//! 3. `.tfswitchrc`
//! 4. `.terraform-version` / `.opentofu-version`
//! 5. `required_version` in Terraform/OpenTofu module files
//! 6. `terraform_version_constraint` in Terragrunt files
//! 7. environment variables
//! 8. built-in defaults
//!
//! Sources 2 to 7 form a chain: the first one that exists is read and the rest
//! are ignored. `~/.tfswitch.toml` sits beneath the chain as a base layer.

pub mod chain;
pub mod env;
pub mod module;
pub mod terragrunt;
pub mod toml_file;
pub mod version_file;

use crate::core::error::{Result, SwitchError};
use crate::core::logging::LogLevel;
use crate::core::output::ColorMode;
use crate::core::platform;
use crate::core::product::{DEFAULT_PRODUCT, Product, with_exe_extension};
use crate::core::version::VersionRequest;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

pub use chain::{ConfigChain, ConfigSource, SourceLayer, resolve_parameters};

/// Directory under the install path that holds versioned binaries
pub const INSTALL_DIR_NAME: &str = ".terraform.versions";

/// Where a resolved value came from. Used for diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    Default,
    Environment,
    File(PathBuf),
    Cli,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Default => f.write_str("default"),
            Provenance::Environment => f.write_str("environment"),
            Provenance::File(path) => write!(f, "{}", path.display()),
            Provenance::Cli => f.write_str("command line"),
        }
    }
}

/// A value together with the source that set it
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub provenance: Provenance,
}

impl<T> Resolved<T> {
    pub fn new(value: T, provenance: Provenance) -> Self {
        Self { value, provenance }
    }

    fn default_value(value: T) -> Self {
        Self::new(value, Provenance::Default)
    }
}

/// Values a single source provides; `None` means "not set here"
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialParameters {
    pub arch: Option<String>,
    pub bin_path: Option<PathBuf>,
    pub default_version: Option<VersionRequest>,
    pub install_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub mirror_url: Option<String>,
    pub product: Option<String>,
    pub version: Option<VersionRequest>,
    pub dry_run: Option<bool>,
    pub force_color: Option<bool>,
    pub no_color: Option<bool>,
}

/// Value read for one mapped field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
}

impl FieldValue {
    fn into_text(self) -> String {
        match self {
            FieldValue::Text(s) => s,
            FieldValue::Flag(b) => b.to_string(),
        }
    }

    fn as_flag(&self) -> bool {
        match self {
            FieldValue::Flag(b) => *b,
            FieldValue::Text(s) => !s.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Flag,
}

type Setter = fn(&mut PartialParameters, FieldValue, &str) -> Result<()>;

/// One option that can be set from the environment and from TOML
pub struct FieldMapping {
    pub env: &'static str,
    pub toml: &'static str,
    pub kind: FieldKind,
    pub description: &'static str,
    /// TOML values get `$VAR` and `~` expansion
    pub expand_in_toml: bool,
    pub apply: Setter,
}

/// Environment variable and TOML key table
pub static FIELD_MAPPINGS: &[FieldMapping] = &[
    FieldMapping {
        env: "TF_ARCH",
        toml: "arch",
        kind: FieldKind::Text,
        description: "CPU architecture",
        expand_in_toml: false,
        apply: set_arch,
    },
    FieldMapping {
        env: "TF_BINARY_PATH",
        toml: "bin",
        kind: FieldKind::Text,
        description: "Custom binary path",
        expand_in_toml: true,
        apply: set_bin_path,
    },
    FieldMapping {
        env: "TF_DEFAULT_VERSION",
        toml: "default-version",
        kind: FieldKind::Text,
        description: "Default version",
        expand_in_toml: false,
        apply: set_default_version,
    },
    FieldMapping {
        env: "FORCE_COLOR",
        toml: "force-color",
        kind: FieldKind::Flag,
        description: "Force color output",
        expand_in_toml: false,
        apply: set_force_color,
    },
    FieldMapping {
        env: "TF_INSTALL_PATH",
        toml: "install",
        kind: FieldKind::Text,
        description: "Custom install path",
        expand_in_toml: true,
        apply: set_install_path,
    },
    FieldMapping {
        env: "TF_LOG_LEVEL",
        toml: "log-level",
        kind: FieldKind::Text,
        description: "Log level",
        expand_in_toml: false,
        apply: set_log_level,
    },
    FieldMapping {
        env: "NO_COLOR",
        toml: "no-color",
        kind: FieldKind::Flag,
        description: "Disable color output",
        expand_in_toml: false,
        apply: set_no_color,
    },
    FieldMapping {
        env: "TF_PRODUCT",
        toml: "product",
        kind: FieldKind::Text,
        description: "Product",
        expand_in_toml: false,
        apply: set_product,
    },
    FieldMapping {
        env: "TF_VERSION",
        toml: "version",
        kind: FieldKind::Text,
        description: "Version",
        expand_in_toml: false,
        apply: set_version,
    },
];

fn set_arch(p: &mut PartialParameters, v: FieldValue, _origin: &str) -> Result<()> {
    p.arch = Some(v.into_text());
    Ok(())
}

fn set_bin_path(p: &mut PartialParameters, v: FieldValue, _origin: &str) -> Result<()> {
    p.bin_path = Some(PathBuf::from(v.into_text()));
    Ok(())
}

fn set_default_version(p: &mut PartialParameters, v: FieldValue, origin: &str) -> Result<()> {
    p.default_version = Some(VersionRequest::parse(&v.into_text(), origin)?);
    Ok(())
}

fn set_force_color(p: &mut PartialParameters, v: FieldValue, _origin: &str) -> Result<()> {
    p.force_color = Some(v.as_flag());
    Ok(())
}

fn set_install_path(p: &mut PartialParameters, v: FieldValue, _origin: &str) -> Result<()> {
    p.install_path = Some(PathBuf::from(v.into_text()));
    Ok(())
}

fn set_log_level(p: &mut PartialParameters, v: FieldValue, _origin: &str) -> Result<()> {
    p.log_level = Some(v.into_text());
    Ok(())
}

fn set_no_color(p: &mut PartialParameters, v: FieldValue, _origin: &str) -> Result<()> {
    p.no_color = Some(v.as_flag());
    Ok(())
}

fn set_product(p: &mut PartialParameters, v: FieldValue, _origin: &str) -> Result<()> {
    p.product = Some(v.into_text());
    Ok(())
}

fn set_version(p: &mut PartialParameters, v: FieldValue, origin: &str) -> Result<()> {
    p.version = Some(VersionRequest::parse(&v.into_text(), origin)?);
    Ok(())
}

/// Everything configuration resolution may look at, captured once
///
/// The environment is a snapshot so that resolution never reads process
/// state directly.
#[derive(Debug, Clone)]
pub struct ConfigContext {
    pub working_dir: PathBuf,
    pub home_dir: PathBuf,
    pub env: BTreeMap<String, String>,
    pub cli: PartialParameters,
}

impl ConfigContext {
    /// Capture the current process: cwd (or `chdir`), home and environment
    pub fn from_process(cli: PartialParameters, chdir: Option<&Path>) -> Result<Self> {
        let cwd = std::env::current_dir().map_err(|e| SwitchError::io(".", e))?;
        let working_dir = match chdir {
            Some(dir) => cwd.join(dir),
            None => cwd,
        };
        if !working_dir.is_dir() {
            return Err(SwitchError::Config {
                path: working_dir.display().to_string(),
                reason: "working directory does not exist".to_string(),
            });
        }

        let home_dir = dirs::home_dir().ok_or_else(|| SwitchError::Config {
            path: "~".to_string(),
            reason: "cannot determine home directory".to_string(),
        })?;

        Ok(Self {
            working_dir,
            home_dir,
            env: std::env::vars().collect(),
            cli,
        })
    }

    /// Non-empty environment value
    pub fn env_var(&self, name: &str) -> Option<&str> {
        self.env
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Expand `$VAR` and `~` against this context
    pub fn expand(&self, raw: &str) -> PathBuf {
        crate::helpers::internal::fs_utils::expand_path(raw, &self.home_dir, |name| {
            self.env_var(name).map(str::to_string)
        })
    }
}

/// Final configuration for one invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParameters {
    pub arch: Resolved<String>,
    pub bin_path: Resolved<PathBuf>,
    pub chdir: PathBuf,
    pub default_version: Option<Resolved<VersionRequest>>,
    pub home_dir: PathBuf,
    pub install_path: Resolved<PathBuf>,
    pub log_level: Resolved<LogLevel>,
    pub mirror_url: Resolved<String>,
    pub product: Resolved<Product>,
    pub version: Option<Resolved<VersionRequest>>,
    pub dry_run: bool,
    pub color: ColorMode,
}

impl ResolvedParameters {
    /// Directory holding versioned binaries, the recent file and the lock
    pub fn install_dir(&self) -> PathBuf {
        self.install_path.value.join(INSTALL_DIR_NAME)
    }

    pub fn product(&self) -> Product {
        self.product.value
    }

    /// Trace every value with its source
    pub fn log_provenance(&self) {
        tracing::debug!(value = %self.product.value, from = %self.product.provenance, "resolved product");
        tracing::debug!(value = %self.arch.value, from = %self.arch.provenance, "resolved architecture");
        tracing::debug!(value = %self.bin_path.value.display(), from = %self.bin_path.provenance, "resolved binary path");
        tracing::debug!(value = %self.install_dir().display(), from = %self.install_path.provenance, "resolved install directory");
        tracing::debug!(value = %self.mirror_url.value, from = %self.mirror_url.provenance, "resolved mirror");
        tracing::debug!(value = %self.log_level.value, from = %self.log_level.provenance, "resolved log level");
        tracing::debug!(value = %self.chdir.display(), "resolved working directory");
        tracing::debug!(dry_run = self.dry_run, color = ?self.color, "resolved flags");
        if let Some(version) = &self.version {
            tracing::debug!(value = %version.value, from = %version.provenance, "resolved version");
        }
        if let Some(default) = &self.default_version {
            tracing::debug!(value = %default.value, from = %default.provenance, "resolved fallback version");
        }
    }
}

/// Accumulates layers, lowest precedence first
#[derive(Debug, Default)]
pub(crate) struct Layers {
    arch: Option<Resolved<String>>,
    bin_path: Option<Resolved<PathBuf>>,
    default_version: Option<Resolved<VersionRequest>>,
    install_path: Option<Resolved<PathBuf>>,
    log_level: Option<Resolved<String>>,
    mirror_url: Option<Resolved<String>>,
    product: Option<Resolved<String>>,
    version: Option<Resolved<VersionRequest>>,
    dry_run: Option<Resolved<bool>>,
    force_color: Option<Resolved<bool>>,
    no_color: Option<Resolved<bool>>,
}

fn overlay<T>(slot: &mut Option<Resolved<T>>, value: Option<T>, provenance: &Provenance) {
    if let Some(value) = value {
        *slot = Some(Resolved::new(value, provenance.clone()));
    }
}

impl Layers {
    pub(crate) fn apply(&mut self, params: PartialParameters, provenance: &Provenance) {
        overlay(&mut self.arch, params.arch, provenance);
        overlay(&mut self.bin_path, params.bin_path, provenance);
        overlay(&mut self.default_version, params.default_version, provenance);
        overlay(&mut self.install_path, params.install_path, provenance);
        overlay(&mut self.log_level, params.log_level, provenance);
        overlay(&mut self.mirror_url, params.mirror_url, provenance);
        overlay(&mut self.product, params.product, provenance);
        overlay(&mut self.version, params.version, provenance);
        overlay(&mut self.dry_run, params.dry_run, provenance);
        overlay(&mut self.force_color, params.force_color, provenance);
        overlay(&mut self.no_color, params.no_color, provenance);
    }

    /// Product id as currently layered, for choosing file names mid-chain
    pub(crate) fn product_id(&self) -> Option<&str> {
        self.product.as_ref().map(|p| p.value.as_str())
    }

    pub(crate) fn finalize(self, ctx: &ConfigContext) -> Result<ResolvedParameters> {
        let product = match self.product {
            Some(p) => Resolved::new(Product::parse(&p.value)?, p.provenance),
            None => Resolved::default_value(DEFAULT_PRODUCT),
        };

        let log_level = match self.log_level {
            Some(raw) => match LogLevel::parse(&raw.value) {
                Some(level) => Resolved::new(level, raw.provenance),
                None => {
                    tracing::warn!(value = %raw.value, from = %raw.provenance, "unknown log level, using INFO");
                    Resolved::default_value(LogLevel::Info)
                }
            },
            None => Resolved::default_value(LogLevel::Info),
        };

        let force = self.force_color.filter(|f| f.value);
        let no = self.no_color.filter(|n| n.value);
        let color = match (force, no) {
            (Some(force), Some(no)) => {
                return Err(SwitchError::ColorConflict {
                    origin: format!("force-color from {}, no-color from {}", force.provenance, no.provenance),
                });
            }
            (Some(_), None) => ColorMode::Always,
            (None, Some(_)) => ColorMode::Never,
            (None, None) => ColorMode::Auto,
        };

        let mirror_url = self
            .mirror_url
            .unwrap_or_else(|| Resolved::default_value(product.value.default_mirror().to_string()));
        let bin_path = self
            .bin_path
            .unwrap_or_else(|| Resolved::default_value(default_bin_path(product.value, &ctx.home_dir)));

        Ok(ResolvedParameters {
            arch: self
                .arch
                .unwrap_or_else(|| Resolved::default_value(platform::host_arch().to_string())),
            bin_path,
            chdir: ctx.working_dir.clone(),
            default_version: self.default_version,
            home_dir: ctx.home_dir.clone(),
            install_path: self
                .install_path
                .unwrap_or_else(|| Resolved::default_value(ctx.home_dir.clone())),
            log_level,
            mirror_url,
            product,
            version: self.version,
            dry_run: self.dry_run.is_some_and(|d| d.value),
            color,
        })
    }
}

/// Default location of the active binary for `product`
pub fn default_bin_path(product: Product, home: &Path) -> PathBuf {
    if platform::host_os() == "windows" {
        home.join("bin")
            .join(with_exe_extension(product.executable(), "windows"))
    } else {
        Path::new("/usr/local/bin").join(product.executable())
    }
}
