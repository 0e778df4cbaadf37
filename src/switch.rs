//! What a single invocation does once parameters are resolved
//!
//! Each [`Action`] maps to one of the CLI modes. Anything that needs the
//! catalog goes through the injected [`MirrorTransport`], so the whole flow is
//! testable without a network.

use crate::config::ResolvedParameters;
use crate::core::catalog;
use crate::core::error::Result;
use crate::core::installer::{InstallOptions, InstallOutcome, InstallRequest, Installer};
use crate::core::output;
use crate::core::platform;
use crate::core::recent::RecentCache;
use crate::core::resolver::{self, ListMode};
use crate::core::version::{Constraint, Release, VersionRequest, is_valid_version};
use crate::helpers::acquire::{MirrorTransport, SignatureVerifier};

/// Invocation mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Resolve from configuration and install
    Install,
    /// Latest stable release
    Latest { show_only: bool },
    /// Latest release matching `~> prefix`
    LatestStable { prefix: String, show_only: bool },
    /// Latest pre-release on the `prefix` line
    LatestPre { prefix: String, show_only: bool },
    /// Print every published version, recent ones first
    ListAll,
    /// Check a version against the configured requirement
    MatchRequirement { version: String },
}

/// Result of running an action; the binary turns this into output and an
/// exit code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Installed(InstallOutcome),
    Shown(String),
    Listed(Vec<ListedVersion>),
    Requirement(RequirementMatch),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedVersion {
    pub version: String,
    pub recent: bool,
}

/// Outcome of `--match-version-requirement`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementMatch {
    Satisfied,
    Mismatch,
    InvalidVersion,
}

impl RequirementMatch {
    pub fn exit_code(self) -> i32 {
        match self {
            RequirementMatch::Satisfied => 0,
            RequirementMatch::Mismatch => 2,
            RequirementMatch::InvalidVersion => 1,
        }
    }
}

pub struct Switcher<'a> {
    params: &'a ResolvedParameters,
    transport: &'a dyn MirrorTransport,
    verifier: &'a dyn SignatureVerifier,
    skip_signature: bool,
}

impl<'a> Switcher<'a> {
    pub fn new(
        params: &'a ResolvedParameters,
        transport: &'a dyn MirrorTransport,
        verifier: &'a dyn SignatureVerifier,
    ) -> Self {
        Self {
            params,
            transport,
            verifier,
            skip_signature: false,
        }
    }

    pub fn skip_signature(mut self, skip: bool) -> Self {
        self.skip_signature = skip;
        self
    }

    pub fn run(&self, action: &Action) -> Result<ActionOutcome> {
        match action {
            Action::Install => {
                let version = self.resolve_target()?;
                self.install(&version).map(ActionOutcome::Installed)
            }
            Action::Latest { show_only } => {
                let releases = self.releases(ListMode::Stable)?;
                let version = resolver::resolve(&releases, None, ListMode::Stable)?.to_string();
                self.install_or_show(version, *show_only)
            }
            Action::LatestStable { prefix, show_only } => {
                let constraint = Constraint::parse(&format!("~> {}", prefix.trim()))?;
                let releases = self.releases(ListMode::Stable)?;
                let version =
                    resolver::resolve(&releases, Some(&constraint), ListMode::Stable)?.to_string();
                self.install_or_show(version, *show_only)
            }
            Action::LatestPre { prefix, show_only } => {
                let releases = self.releases(ListMode::All)?;
                let version = resolver::latest_prerelease(&releases, prefix)?.to_string();
                self.install_or_show(version, *show_only)
            }
            Action::ListAll => self.list_all().map(ActionOutcome::Listed),
            Action::MatchRequirement { version } => {
                Ok(ActionOutcome::Requirement(match_version_requirement(self.params, version)))
            }
        }
    }

    fn releases(&self, mode: ListMode) -> Result<Vec<Release>> {
        catalog::list_releases(
            self.transport,
            &self.params.mirror_url.value,
            mode.includes_prereleases(),
        )
    }

    fn install_or_show(&self, version: String, show_only: bool) -> Result<ActionOutcome> {
        if show_only {
            Ok(ActionOutcome::Shown(version))
        } else {
            self.install(&version).map(ActionOutcome::Installed)
        }
    }

    /// Concrete version to install: the configured version or constraint,
    /// then the default version, then the latest stable release
    pub fn resolve_target(&self) -> Result<String> {
        let request = match (&self.params.version, &self.params.default_version) {
            (Some(version), _) => &version.value,
            (None, Some(default)) => {
                tracing::debug!(version = %default.value, from = %default.provenance, "using default version");
                &default.value
            }
            (None, None) => {
                output::warning("no version configured, installing the latest stable release");
                let releases = self.releases(ListMode::Stable)?;
                return Ok(resolver::resolve(&releases, None, ListMode::Stable)?.to_string());
            }
        };

        match request {
            VersionRequest::Exact(version) => Ok(version.clone()),
            VersionRequest::Constraint(constraint) => {
                let releases = self.releases(ListMode::All)?;
                let release = resolver::resolve(&releases, Some(constraint), ListMode::All)?;
                output::info(&format!(
                    "Matched version {} for constraint {}",
                    release,
                    constraint
                ));
                Ok(release.to_string())
            }
        }
    }

    pub fn install_request(&self, version: &str) -> InstallRequest {
        let params = self.params;
        InstallRequest {
            product: params.product(),
            version: version.to_string(),
            os: platform::host_os().to_string(),
            arch: params.arch.value.clone(),
            mirror_url: params.mirror_url.value.clone(),
            install_dir: params.install_dir(),
            bin_path: params.bin_path.value.clone(),
            home_dir: params.home_dir.clone(),
        }
    }

    fn install(&self, version: &str) -> Result<InstallOutcome> {
        let options = InstallOptions {
            dry_run: self.params.dry_run,
            skip_signature: self.skip_signature,
            ..Default::default()
        };
        Installer::new(self.transport, self.verifier, options).install(&self.install_request(version))
    }

    /// Recent versions first, then the full catalog
    pub fn list_all(&self) -> Result<Vec<ListedVersion>> {
        let mut releases = self.releases(ListMode::All)?;
        releases.sort_by(|a, b| b.cmp(a));

        let recent = RecentCache::new(&self.params.install_dir()).get(self.params.product())?;
        let mut listed: Vec<ListedVersion> = recent
            .iter()
            .map(|v| ListedVersion {
                version: v.clone(),
                recent: true,
            })
            .collect();
        listed.extend(
            releases
                .iter()
                .filter(|r| !recent.iter().any(|v| v == r.as_str()))
                .map(|r| ListedVersion {
                    version: r.to_string(),
                    recent: false,
                }),
        );
        Ok(listed)
    }
}

/// Check `candidate` against the resolved requirement: the configured
/// version or constraint, else the default version, else anything
pub fn match_version_requirement(params: &ResolvedParameters, candidate: &str) -> RequirementMatch {
    let candidate = candidate.trim();
    if !is_valid_version(candidate) {
        output::error(&format!("{} is not a valid version", candidate));
        return RequirementMatch::InvalidVersion;
    }

    let requirement = params
        .version
        .as_ref()
        .or(params.default_version.as_ref())
        .map(|r| &r.value);

    let satisfied = match requirement {
        None => {
            output::warning("no version requirement configured, any version matches");
            true
        }
        Some(VersionRequest::Exact(exact)) => exact == candidate,
        Some(VersionRequest::Constraint(constraint)) => constraint.matches_str(candidate),
    };

    if satisfied {
        tracing::info!(version = candidate, requirement = ?requirement.map(VersionRequest::as_str), "version satisfies requirement");
        RequirementMatch::Satisfied
    } else {
        tracing::info!(version = candidate, requirement = ?requirement.map(VersionRequest::as_str), "version does not satisfy requirement");
        RequirementMatch::Mismatch
    }
}
