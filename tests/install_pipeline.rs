//! Integration tests for the install pipeline
//!
//! A fake mirror serves a real zip, a matching SHA256SUMS manifest and a
//! signature; the verifier is stubbed so tests control the outcome.

#![cfg(unix)]

use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tfswitch::core::installer::{InstallOptions, InstallRequest, Installer, Step};
use tfswitch::core::lock::{LockPolicy, acquire_install_lock};
use tfswitch::core::platform;
use tfswitch::core::recent::RecentCache;
use tfswitch::helpers::acquire::{MirrorTransport, SignatureVerifier};
use tfswitch::{Product, Result, SwitchError};
use zip::write::SimpleFileOptions;

const MIRROR: &str = "https://mirror.test/terraform";

/// In-memory mirror that records every URL it serves
struct FakeMirror {
    files: HashMap<String, Vec<u8>>,
    requests: RefCell<Vec<String>>,
}

impl FakeMirror {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        self.requests.borrow_mut().push(url.to_string());
        self.files
            .get(url)
            .cloned()
            .ok_or_else(|| SwitchError::HttpStatus {
                url: url.to_string(),
                status: 404,
            })
    }

    fn downloads(&self) -> Vec<String> {
        self.requests
            .borrow()
            .iter()
            .filter(|u| !u.ends_with('/'))
            .cloned()
            .collect()
    }
}

impl MirrorTransport for FakeMirror {
    fn fetch_text(&self, url: &str) -> Result<String> {
        Ok(String::from_utf8_lossy(&self.get(url)?).into_owned())
    }

    fn fetch_to_file(&self, url: &str, dest: &Path) -> Result<u64> {
        let bytes = self.get(url)?;
        std::fs::write(dest, &bytes).map_err(|e| SwitchError::io(dest, e))?;
        Ok(bytes.len() as u64)
    }
}

struct StubVerifier {
    accept: bool,
}

impl SignatureVerifier for StubVerifier {
    fn verify(&self, _data: &[u8], signature: &[u8], public_key: &str) -> Result<bool> {
        assert_eq!(signature, b"signature");
        assert_eq!(public_key, "PUBLIC KEY");
        Ok(self.accept)
    }
}

fn zip_with(name: &str, content: &[u8]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file(name, SimpleFileOptions::default().unix_permissions(0o755))
        .unwrap();
    zip.write_all(content).unwrap();
    zip.finish().unwrap().into_inner()
}

/// Mirror publishing `versions`, each with a valid archive and manifest
fn mirror(versions: &[&str]) -> FakeMirror {
    let product = Product::Terraform;
    let os = platform::host_os();
    let mut files = HashMap::new();

    let index: String = versions
        .iter()
        .map(|v| format!("<a href=\"/terraform/{v}/\">terraform_{v}</a>\n"))
        .collect();
    files.insert(format!("{MIRROR}/"), index.into_bytes());
    files.insert(product.public_key_url().to_string(), b"PUBLIC KEY".to_vec());

    for version in versions {
        let base = product.artifact_base_url(MIRROR, version);
        let archive_name = product.archive_name(version, os, "amd64");
        let archive = zip_with(
            &product.executable_file_name(os),
            format!("#!/bin/sh\necho {version}\n").as_bytes(),
        );
        let digest = hex::encode(Sha256::digest(&archive));
        let manifest = format!(
            "{}  terraform_{version}_windows_386.zip\n{digest}  {archive_name}\n",
            "0".repeat(64)
        );

        files.insert(format!("{base}/{archive_name}"), archive);
        files.insert(
            format!("{base}/{}", product.manifest_name(version)),
            manifest.into_bytes(),
        );
        files.insert(
            format!("{base}/{}", product.signature_name(version)),
            b"signature".to_vec(),
        );
    }

    FakeMirror {
        files,
        requests: RefCell::new(Vec::new()),
    }
}

struct Env {
    root: TempDir,
}

impl Env {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("bin")).unwrap();
        std::fs::create_dir_all(root.path().join("home")).unwrap();
        Self { root }
    }

    fn install_dir(&self) -> PathBuf {
        self.root.path().join("home/.terraform.versions")
    }

    fn link(&self) -> PathBuf {
        self.root.path().join("bin/terraform")
    }

    fn request(&self, version: &str) -> InstallRequest {
        InstallRequest {
            product: Product::Terraform,
            version: version.to_string(),
            os: platform::host_os().to_string(),
            arch: "amd64".to_string(),
            mirror_url: MIRROR.to_string(),
            install_dir: self.install_dir(),
            bin_path: self.link(),
            home_dir: self.root.path().join("home"),
        }
    }

    /// Every path under the root, for before/after comparisons
    fn snapshot(&self) -> BTreeSet<PathBuf> {
        fn walk(dir: &Path, out: &mut BTreeSet<PathBuf>) {
            for entry in std::fs::read_dir(dir).unwrap() {
                let path = entry.unwrap().path();
                out.insert(path.clone());
                if path.is_dir() && !path.is_symlink() {
                    walk(&path, out);
                }
            }
        }
        let mut out = BTreeSet::new();
        walk(self.root.path(), &mut out);
        out
    }
}

fn options() -> InstallOptions {
    InstallOptions {
        lock_policy: LockPolicy {
            attempts: 2,
            interval: Duration::from_millis(10),
        },
        ..Default::default()
    }
}

// =============================================================================
// Successful installs
// =============================================================================

#[test]
fn test_fresh_install_links_and_records() {
    let env = Env::new();
    let mirror = mirror(&["1.7.5", "1.6.0"]);
    let verifier = StubVerifier { accept: true };

    let outcome = Installer::new(&mirror, &verifier, options())
        .install(&env.request("1.7.5"))
        .unwrap();

    assert!(!outcome.cache_hit);
    assert_eq!(outcome.link, env.link());
    assert_eq!(outcome.artifact, env.install_dir().join("terraform_1.7.5"));
    assert_eq!(std::fs::read_link(env.link()).unwrap(), outcome.artifact);
    assert_eq!(
        std::fs::read_to_string(&outcome.artifact).unwrap(),
        "#!/bin/sh\necho 1.7.5\n"
    );
    assert_eq!(
        outcome.steps,
        vec![
            Step::ResolveTarget,
            Step::CheckCache,
            Step::Download,
            Step::VerifyChecksum,
            Step::VerifySignature,
            Step::Extract,
            Step::Rename,
            Step::Relink,
            Step::RecordRecent,
            Step::Done,
        ]
    );

    let recent = RecentCache::new(&env.install_dir()).get(Product::Terraform).unwrap();
    assert_eq!(recent, vec!["1.7.5".to_string()]);

    // Only the artifact, the recent file and the cached key remain
    let mut left: Vec<String> = std::fs::read_dir(env.install_dir())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    left.sort();
    assert_eq!(
        left,
        vec![
            "RECENT".to_string(),
            "terraform_1.7.5".to_string(),
            Product::Terraform.public_key_file_name(),
        ]
    );
}

#[test]
fn test_cache_hit_skips_download() {
    let env = Env::new();
    std::fs::create_dir_all(env.install_dir()).unwrap();
    std::fs::write(env.install_dir().join("terraform_1.6.0"), "cached").unwrap();
    let mirror = mirror(&[]);

    let outcome = Installer::new(&mirror, &StubVerifier { accept: true }, options())
        .install(&env.request("1.6.0"))
        .unwrap();

    assert!(outcome.cache_hit);
    assert!(mirror.requests.borrow().is_empty());
    assert_eq!(
        outcome.steps,
        vec![
            Step::ResolveTarget,
            Step::CheckCache,
            Step::Relink,
            Step::RecordRecent,
            Step::Done
        ]
    );
    assert_eq!(
        std::fs::read_link(env.link()).unwrap(),
        env.install_dir().join("terraform_1.6.0")
    );
}

#[test]
fn test_switching_replaces_the_link() {
    let env = Env::new();
    let mirror = mirror(&["1.7.5", "1.6.0"]);
    let verifier = StubVerifier { accept: true };
    let installer = Installer::new(&mirror, &verifier, options());

    installer.install(&env.request("1.7.5")).unwrap();
    installer.install(&env.request("1.6.0")).unwrap();

    assert_eq!(
        std::fs::read_link(env.link()).unwrap(),
        env.install_dir().join("terraform_1.6.0")
    );
    let recent = RecentCache::new(&env.install_dir()).get(Product::Terraform).unwrap();
    assert_eq!(recent, vec!["1.6.0".to_string(), "1.7.5".to_string()]);
}

#[test]
fn test_skip_signature_does_not_fetch_signature() {
    let env = Env::new();
    let mirror = mirror(&["1.7.5"]);
    let options = InstallOptions {
        skip_signature: true,
        ..options()
    };

    let outcome = Installer::new(&mirror, &StubVerifier { accept: false }, options)
        .install(&env.request("1.7.5"))
        .unwrap();

    assert!(!outcome.steps.contains(&Step::VerifySignature));
    assert!(mirror.downloads().iter().all(|u| !u.ends_with(".sig")));
}

// =============================================================================
// Failures leave the active link alone
// =============================================================================

#[test]
fn test_checksum_mismatch_is_integrity_failure() {
    let env = Env::new();
    let mut mirror = mirror(&["1.7.5"]);
    let base = Product::Terraform.artifact_base_url(MIRROR, "1.7.5");
    let archive = Product::Terraform.archive_name("1.7.5", platform::host_os(), "amd64");
    mirror
        .files
        .insert(format!("{base}/{archive}"), b"tampered".to_vec());

    let err = Installer::new(&mirror, &StubVerifier { accept: true }, options())
        .install(&env.request("1.7.5"))
        .unwrap_err();

    assert!(matches!(err, SwitchError::ChecksumMismatch { .. }));
    assert!(err.is_integrity_failure());
    assert!(std::fs::symlink_metadata(env.link()).is_err());
    assert!(!env.install_dir().join("terraform_1.7.5").exists());
    assert!(!env.install_dir().join(".tfswitch.lock").exists());
}

#[test]
fn test_bad_signature_is_reported_separately() {
    let env = Env::new();
    let mirror = mirror(&["1.7.5"]);

    let err = Installer::new(&mirror, &StubVerifier { accept: false }, options())
        .install(&env.request("1.7.5"))
        .unwrap_err();

    assert!(matches!(err, SwitchError::SignatureInvalid { .. }));
    assert!(err.is_integrity_failure());
    assert!(std::fs::symlink_metadata(env.link()).is_err());
    assert!(RecentCache::new(&env.install_dir()).get(Product::Terraform).unwrap().is_empty());
}

#[test]
fn test_unpublished_version_is_not_downloaded() {
    let env = Env::new();
    let mirror = mirror(&["1.7.5"]);

    let err = Installer::new(&mirror, &StubVerifier { accept: true }, options())
        .install(&env.request("1.7.4"))
        .unwrap_err();

    assert!(matches!(err, SwitchError::VersionNotFound { .. }));
    assert!(mirror.downloads().is_empty());
}

#[test]
fn test_held_lock_times_out() {
    let env = Env::new();
    std::fs::create_dir_all(env.install_dir()).unwrap();
    let _held = acquire_install_lock(&env.install_dir(), LockPolicy::default()).unwrap();
    let mirror = mirror(&["1.7.5"]);

    let err = Installer::new(&mirror, &StubVerifier { accept: true }, options())
        .install(&env.request("1.7.5"))
        .unwrap_err();

    match err {
        SwitchError::LockTimeout { path, attempts } => {
            assert_eq!(path, env.install_dir().join(".tfswitch.lock"));
            assert_eq!(attempts, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(std::fs::symlink_metadata(env.link()).is_err());
}

#[test]
fn test_directory_at_link_path_fails_before_download() {
    let env = Env::new();
    std::fs::create_dir(env.link()).unwrap();
    let mirror = mirror(&["1.7.5"]);

    for dry_run in [false, true] {
        let err = Installer::new(
            &mirror,
            &StubVerifier { accept: true },
            InstallOptions {
                dry_run,
                ..options()
            },
        )
        .install(&env.request("1.7.5"))
        .unwrap_err();

        assert!(matches!(err, SwitchError::Symlink { .. }));
    }
    assert!(mirror.requests.borrow().is_empty());
    assert!(!env.install_dir().exists());
}

#[test]
fn test_regular_file_at_link_path_is_replaced() {
    let env = Env::new();
    std::fs::write(env.link(), "manually installed").unwrap();
    let mirror = mirror(&["1.7.5"]);

    Installer::new(&mirror, &StubVerifier { accept: true }, options())
        .install(&env.request("1.7.5"))
        .unwrap();

    assert_eq!(
        std::fs::read_link(env.link()).unwrap(),
        env.install_dir().join("terraform_1.7.5")
    );
}

// =============================================================================
// Dry run
// =============================================================================

#[test]
fn test_dry_run_mutates_nothing() {
    let env = Env::new();
    let mirror = mirror(&["1.7.5"]);
    let before = env.snapshot();

    let outcome = Installer::new(
        &mirror,
        &StubVerifier { accept: true },
        InstallOptions {
            dry_run: true,
            ..options()
        },
    )
    .install(&env.request("1.7.5"))
    .unwrap();

    assert!(outcome.dry_run);
    assert_eq!(outcome.version, "1.7.5");
    assert_eq!(outcome.steps, vec![Step::ResolveTarget, Step::CheckCache]);
    assert_eq!(env.snapshot(), before);
    assert!(mirror.downloads().is_empty());
}
