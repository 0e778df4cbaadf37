//! tfswitch CLI - switch the active Terraform or OpenTofu version
//!
//! Usage:
//!   tfswitch                       Install the version the current directory asks for
//!   tfswitch 1.7.5                 Install an exact version
//!   tfswitch '~> 1.6.0'            Install the newest version matching a constraint
//!   tfswitch --latest              Install the newest stable release
//!   tfswitch --list-all            List published versions, recent ones first
//!   tfswitch -n 1.7.5              Exit 0/2 depending on whether 1.7.5 is acceptable

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tfswitch::config::{ConfigContext, PartialParameters, resolve_parameters};
use tfswitch::core::logging::initialize_tracing;
use tfswitch::core::output::{self, ColorMode, set_color_mode};
use tfswitch::core::version::VersionRequest;
use tfswitch::helpers::acquire::{HttpTransport, PgpVerifier, timeout_from_env};
use tfswitch::switch::{Action, ActionOutcome, Switcher};

/// Seconds allowed for index and manifest requests
const HTTP_TIMEOUT_ENV: &str = "TFSWITCH_HTTP_TIMEOUT";

#[derive(Parser)]
#[command(name = "tfswitch")]
#[command(about = "Switch between Terraform and OpenTofu versions")]
#[command(version)]
struct Cli {
    /// Version or constraint to install (e.g. 1.7.5, "~> 1.6.0")
    #[arg(value_name = "VERSION")]
    target_version: Option<String>,

    /// CPU architecture of the downloaded binary
    #[arg(short = 'A', long)]
    arch: Option<String>,

    /// Path of the active binary link
    #[arg(short = 'b', long = "bin")]
    bin: Option<PathBuf>,

    /// Directory to read configuration from
    #[arg(short = 'c', long)]
    chdir: Option<PathBuf>,

    /// Version to use when nothing else is configured
    #[arg(short = 'd', long = "default")]
    default_version: Option<String>,

    /// Directory under which `.terraform.versions` is created
    #[arg(short = 'i', long)]
    install: Option<PathBuf>,

    /// Release mirror URL
    #[arg(short = 'm', long)]
    mirror: Option<String>,

    /// Product to manage (terraform, opentofu)
    #[arg(short = 't', long)]
    product: Option<String>,

    /// Log level (ERROR, WARN, INFO, NOTICE, DEBUG, TRACE)
    #[arg(short = 'g', long)]
    log_level: Option<String>,

    /// Resolve and report without installing
    #[arg(short = 'r', long)]
    dry_run: bool,

    /// Install the latest stable release
    #[arg(short = 'u', long)]
    latest: bool,

    /// Show the latest stable release
    #[arg(short = 'U', long)]
    show_latest: bool,

    /// Install the latest stable release matching `~> VERSION`
    #[arg(short = 's', long, value_name = "VERSION")]
    latest_stable: Option<String>,

    /// Show the latest stable release matching `~> VERSION`
    #[arg(short = 'S', long, value_name = "VERSION")]
    show_latest_stable: Option<String>,

    /// Install the latest pre-release for a version line
    #[arg(short = 'p', long, value_name = "VERSION")]
    latest_pre: Option<String>,

    /// Show the latest pre-release for a version line
    #[arg(short = 'P', long, value_name = "VERSION")]
    show_latest_pre: Option<String>,

    /// List all published versions, including pre-releases
    #[arg(short = 'l', long)]
    list_all: bool,

    /// Exit 0 if VERSION satisfies the configured requirement, 2 if not
    #[arg(short = 'n', long, value_name = "VERSION")]
    match_version_requirement: Option<String>,

    /// Disable colored output
    #[arg(short = 'k', long)]
    no_color: bool,

    /// Force colored output
    #[arg(short = 'K', long)]
    force_color: bool,

    /// Do not verify the checksum manifest signature
    #[arg(long)]
    skip_signature: bool,
}

impl Cli {
    /// Explicitly set flags as the highest-precedence configuration layer
    fn overrides(&self) -> Result<PartialParameters> {
        let version = self
            .target_version
            .as_deref()
            .map(|v| VersionRequest::parse(v, "command line"))
            .transpose()?;
        let default_version = self
            .default_version
            .as_deref()
            .map(|v| VersionRequest::parse(v, "--default"))
            .transpose()?;

        Ok(PartialParameters {
            arch: self.arch.clone(),
            bin_path: self.bin.clone(),
            default_version,
            install_path: self.install.clone(),
            log_level: self.log_level.clone(),
            mirror_url: self.mirror.clone(),
            product: self.product.clone(),
            version,
            dry_run: self.dry_run.then_some(true),
            force_color: self.force_color.then_some(true),
            no_color: self.no_color.then_some(true),
        })
    }

    fn action(&self) -> Action {
        if let Some(version) = &self.match_version_requirement {
            return Action::MatchRequirement {
                version: version.clone(),
            };
        }
        if self.list_all {
            return Action::ListAll;
        }
        if self.latest || self.show_latest {
            return Action::Latest {
                show_only: self.show_latest,
            };
        }
        if let Some(prefix) = self.show_latest_stable.as_ref().or(self.latest_stable.as_ref()) {
            return Action::LatestStable {
                prefix: prefix.clone(),
                show_only: self.show_latest_stable.is_some(),
            };
        }
        if let Some(prefix) = self.show_latest_pre.as_ref().or(self.latest_pre.as_ref()) {
            return Action::LatestPre {
                prefix: prefix.clone(),
                show_only: self.show_latest_pre.is_some(),
            };
        }
        Action::Install
    }
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let ctx = ConfigContext::from_process(cli.overrides()?, cli.chdir.as_deref())
        .context("Failed to read the environment")?;
    let params = resolve_parameters(&ctx).context("Failed to resolve configuration")?;

    set_color_mode(params.color);
    initialize_tracing(params.log_level.value, params.color != ColorMode::Never);
    params.log_provenance();

    let transport = HttpTransport::new(timeout_from_env(ctx.env_var(HTTP_TIMEOUT_ENV)));
    let verifier = PgpVerifier;
    let switcher = Switcher::new(&params, &transport, &verifier).skip_signature(cli.skip_signature);

    let outcome = switcher
        .run(&cli.action())
        .with_context(|| format!("Failed to switch {}", params.product()))?;

    match outcome {
        ActionOutcome::Installed(_) => {}
        ActionOutcome::Shown(version) => println!("{}", version),
        ActionOutcome::Listed(versions) => {
            for listed in versions {
                let note = if listed.recent { "*recent" } else { "" };
                output::list_item(&listed.version, note, listed.recent);
            }
        }
        ActionOutcome::Requirement(result) => {
            return Ok(ExitCode::from(result.exit_code() as u8));
        }
    }
    Ok(ExitCode::SUCCESS)
}
