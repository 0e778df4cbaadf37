//! Install pipeline
//!
//! ```text
//! ResolveTarget -> CheckCache -+-> (hit) ---------------------------------------------+-> Relink -> RecordRecent -> Done
//!                              +-> (miss) Download -> VerifyChecksum -> VerifySignature -> Extract -> Rename -+
//! ```
//!
//! Every step returns a typed error; the first failure stops the pipeline
//! before the active link is touched. Dry runs stop after the read-only steps.
//! Mutating steps run under the install lock, and everything downloaded lives
//! in a staging directory that is removed on every exit path.

use super::catalog;
use super::error::{Result, SwitchError};
use super::lock::{self, LockPolicy};
use super::output;
use super::product::Product;
use super::recent::RecentCache;
use super::version::validate_version;
use crate::helpers::acquire::{MirrorTransport, SignatureVerifier};
use crate::helpers::build::extract_executable;
use crate::helpers::install::{choose_link_path, current_target, relink};
use crate::helpers::internal::fs_utils::{ensure_dir, read_optional, set_mode};
use crate::helpers::internal::progress::with_spinner;
use crate::helpers::internal::hash::verify_against_manifest;
use std::fmt;
use std::path::{Path, PathBuf};

/// Pipeline states, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ResolveTarget,
    CheckCache,
    Download,
    VerifyChecksum,
    VerifySignature,
    Extract,
    Rename,
    Relink,
    RecordRecent,
    Done,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::ResolveTarget => "resolve target",
            Step::CheckCache => "check cache",
            Step::Download => "download",
            Step::VerifyChecksum => "verify checksum",
            Step::VerifySignature => "verify signature",
            Step::Extract => "extract",
            Step::Rename => "rename",
            Step::Relink => "relink",
            Step::RecordRecent => "record recent",
            Step::Done => "done",
        };
        f.write_str(name)
    }
}

/// What to install and where
#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub product: Product,
    pub version: String,
    pub os: String,
    pub arch: String,
    pub mirror_url: String,
    /// `<install path>/.terraform.versions`
    pub install_dir: PathBuf,
    pub bin_path: PathBuf,
    pub home_dir: PathBuf,
}

impl InstallRequest {
    /// Canonical path of the versioned executable
    pub fn artifact_path(&self) -> PathBuf {
        self.install_dir
            .join(self.product.artifact_file_name(&self.version, &self.os))
    }

    /// Link locations in preference order
    pub fn link_candidates(&self) -> Vec<PathBuf> {
        let fallback = self
            .home_dir
            .join("bin")
            .join(self.product.executable_file_name(&self.os));
        if fallback == self.bin_path {
            vec![self.bin_path.clone()]
        } else {
            vec![self.bin_path.clone(), fallback]
        }
    }

    /// Architecture to download. Terraform published no darwin/arm64 builds
    /// before 1.0.2, so those fall back to amd64.
    pub fn download_arch(&self) -> &str {
        if self.product == Product::Terraform
            && self.os == "darwin"
            && self.arch == "arm64"
            && semver::Version::parse(&self.version)
                .is_ok_and(|v| v < semver::Version::new(1, 0, 2))
        {
            return "amd64";
        }
        &self.arch
    }
}

#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    pub dry_run: bool,
    pub skip_signature: bool,
    pub lock_policy: LockPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub version: String,
    pub artifact: PathBuf,
    pub link: PathBuf,
    pub cache_hit: bool,
    pub dry_run: bool,
    /// States the pipeline passed through
    pub steps: Vec<Step>,
}

pub struct Installer<'a> {
    transport: &'a dyn MirrorTransport,
    verifier: &'a dyn SignatureVerifier,
    options: InstallOptions,
}

impl<'a> Installer<'a> {
    pub fn new(
        transport: &'a dyn MirrorTransport,
        verifier: &'a dyn SignatureVerifier,
        options: InstallOptions,
    ) -> Self {
        Self {
            transport,
            verifier,
            options,
        }
    }

    /// Run the pipeline for `request`
    pub fn install(&self, request: &InstallRequest) -> Result<InstallOutcome> {
        let mut trail = Vec::new();
        let result = self.run(request, &mut trail);
        if let Err(e) = &result {
            let failed_at = trail.last().copied().unwrap_or(Step::ResolveTarget);
            tracing::error!(step = %failed_at, error = %e, "install failed");
        }
        result
    }

    fn run(&self, request: &InstallRequest, trail: &mut Vec<Step>) -> Result<InstallOutcome> {
        let product = request.product;
        let version = request.version.as_str();

        enter(trail, Step::ResolveTarget);
        validate_version(version, "install request")?;
        let artifact = request.artifact_path();
        let link = choose_link_path(&request.link_candidates())?;

        enter(trail, Step::CheckCache);
        let cache_hit = artifact.is_file();
        if !cache_hit {
            self.ensure_published(request)?;
        }

        if self.options.dry_run {
            output::info(&format!(
                "Dry run: would install {} {} to {}",
                product,
                version,
                link.display()
            ));
            return Ok(InstallOutcome {
                version: version.to_string(),
                artifact,
                link,
                cache_hit,
                dry_run: true,
                steps: std::mem::take(trail),
            });
        }

        ensure_dir(&request.install_dir)?;
        let _lock = lock::acquire_install_lock(&request.install_dir, self.options.lock_policy)?;

        if cache_hit {
            output::skip(&format!("{} {} already installed", product, version));
        } else {
            output::action(&format!("Installing {} {}", product, version));
            self.fetch_and_stage(request, &artifact, trail)?;
        }

        enter(trail, Step::Relink);
        if let Some(previous) = current_target(&link) {
            tracing::debug!(link = %link.display(), previous = %previous.display(), "replacing active link");
        }
        relink(&artifact, &link)?;

        enter(trail, Step::RecordRecent);
        if let Err(e) = RecentCache::new(&request.install_dir).add(product, version) {
            output::warning(&format!("could not update recent versions: {}", e));
        }

        enter(trail, Step::Done);
        output::success(&format!(
            "Switched {} to {} ({})",
            link.display(),
            version,
            artifact.display()
        ));
        Ok(InstallOutcome {
            version: version.to_string(),
            artifact,
            link,
            cache_hit,
            dry_run: false,
            steps: std::mem::take(trail),
        })
    }

    /// The version must appear in the mirror's catalog before we download it
    fn ensure_published(&self, request: &InstallRequest) -> Result<()> {
        let releases = catalog::list_releases(self.transport, &request.mirror_url, true)?;
        if releases.iter().any(|r| r.as_str() == request.version) {
            Ok(())
        } else {
            Err(SwitchError::VersionNotFound {
                product: request.product.name().to_string(),
                version: request.version.clone(),
            })
        }
    }

    /// Download, verify and unpack into a staging directory, then move the
    /// executable to its canonical name
    fn fetch_and_stage(&self, request: &InstallRequest, artifact: &Path, trail: &mut Vec<Step>) -> Result<()> {
        let product = request.product;
        let version = request.version.as_str();
        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&request.install_dir)
            .map_err(|e| SwitchError::io(&request.install_dir, e))?;

        enter(trail, Step::Download);
        let base = product.artifact_base_url(&request.mirror_url, version);
        let archive_name = product.archive_name(version, &request.os, request.download_arch());
        let archive_path = staging.path().join(&archive_name);
        output::detail(&format!("downloading {}/{}", base, archive_name));
        self.transport
            .fetch_to_file(&format!("{}/{}", base, archive_name), &archive_path)?;

        enter(trail, Step::VerifyChecksum);
        let manifest_name = product.manifest_name(version);
        let manifest = self
            .transport
            .fetch_text(&format!("{}/{}", base, manifest_name))?;
        verify_against_manifest(&archive_path, &manifest, &manifest_name)?;
        output::detail("checksum verified");

        if self.options.skip_signature {
            tracing::warn!(%manifest_name, "signature verification skipped");
        } else {
            enter(trail, Step::VerifySignature);
            self.verify_signature(request, &base, &manifest, staging.path())?;
            output::detail("signature verified");
        }

        enter(trail, Step::Extract);
        let executable = product.executable_file_name(&request.os);
        let extracted = with_spinner(&format!("extracting {}", executable), || {
            extract_executable(&archive_path, staging.path(), &executable)
        })?;

        enter(trail, Step::Rename);
        std::fs::rename(&extracted, artifact).map_err(|e| SwitchError::io(artifact, e))?;
        set_mode(artifact, 0o755)?;
        Ok(())
    }

    fn verify_signature(&self, request: &InstallRequest, base: &str, manifest: &str, staging: &Path) -> Result<()> {
        let product = request.product;
        let signature_name = product.signature_name(&request.version);
        let signature_path = staging.join(&signature_name);
        self.transport
            .fetch_to_file(&format!("{}/{}", base, signature_name), &signature_path)?;
        let signature = std::fs::read(&signature_path).map_err(|e| SwitchError::io(&signature_path, e))?;

        let key = self.public_key(request)?;
        if self.verifier.verify(manifest.as_bytes(), &signature, &key)? {
            Ok(())
        } else {
            Err(SwitchError::SignatureInvalid {
                file: product.manifest_name(&request.version),
                reason: format!("not signed by key {}", product.public_key_id()),
            })
        }
    }

    /// Cached public key, fetched on first use
    fn public_key(&self, request: &InstallRequest) -> Result<String> {
        let product = request.product;
        let path = request.install_dir.join(product.public_key_file_name());
        if let Some(key) = read_optional(&path)? {
            return Ok(key);
        }
        tracing::debug!(url = product.public_key_url(), "fetching public key");
        let key = self.transport.fetch_text(product.public_key_url())?;
        std::fs::write(&path, &key).map_err(|e| SwitchError::io(&path, e))?;
        Ok(key)
    }
}

fn enter(trail: &mut Vec<Step>, step: Step) {
    tracing::debug!(%step, "install step");
    trail.push(step);
}
