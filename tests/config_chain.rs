//! Integration tests for configuration resolution
//!
//! Each test builds a project directory and a fake home, then resolves
//! parameters through the public API exactly as the CLI does.

use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tfswitch::config::{ConfigContext, PartialParameters, Provenance, resolve_parameters};
use tfswitch::core::output::ColorMode;
use tfswitch::core::version::VersionRequest;
use tfswitch::{Product, SwitchError};

struct Project {
    work: TempDir,
    home: TempDir,
}

impl Project {
    fn new() -> Self {
        Self {
            work: TempDir::new().unwrap(),
            home: TempDir::new().unwrap(),
        }
    }

    fn file(self, name: &str, content: &str) -> Self {
        std::fs::write(self.work.path().join(name), content).unwrap();
        self
    }

    fn home_file(self, name: &str, content: &str) -> Self {
        std::fs::write(self.home.path().join(name), content).unwrap();
        self
    }

    fn ctx(&self, env: &[(&str, &str)], cli: PartialParameters) -> ConfigContext {
        ConfigContext {
            working_dir: self.work.path().to_path_buf(),
            home_dir: self.home.path().to_path_buf(),
            env: env
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            cli,
        }
    }
}

fn cli_version(v: &str) -> PartialParameters {
    PartialParameters {
        version: Some(VersionRequest::parse(v, "command line").unwrap()),
        ..Default::default()
    }
}

fn version(ctx: &ConfigContext) -> Option<String> {
    resolve_parameters(ctx)
        .unwrap()
        .version
        .map(|v| v.value.to_string())
}

#[test]
fn test_cli_positional_beats_toml_in_same_directory() {
    let project = Project::new().file(".tfswitch.toml", "version = \"1.5.0\"\n");
    assert_eq!(
        version(&project.ctx(&[], cli_version("1.6.1"))).as_deref(),
        Some("1.6.1")
    );
}

#[test]
fn test_toml_beats_rc_in_same_directory() {
    let project = Project::new()
        .file(".tfswitch.toml", "version = \"1.5.0\"\n")
        .file(".tfswitchrc", "1.2.0");
    assert_eq!(
        version(&project.ctx(&[], PartialParameters::default())).as_deref(),
        Some("1.5.0")
    );
}

#[test]
fn test_module_beats_terragrunt_and_environment() {
    let project = Project::new()
        .file("main.tf", "terraform {\n  required_version = \">= 1.3\"\n}\n")
        .file("terragrunt.hcl", "terraform_version_constraint = \"~> 1.1.0\"\n");
    let ctx = project.ctx(&[("TF_VERSION", "1.0.0")], PartialParameters::default());
    assert_eq!(version(&ctx).as_deref(), Some(">= 1.3"));
}

#[test]
fn test_terragrunt_file_name_from_environment() {
    let project = Project::new()
        .file("custom.hcl", "terraform_version_constraint = \"~> 1.4.0\"\n")
        .file("terragrunt.hcl", "terraform_version_constraint = \"~> 1.1.0\"\n");
    let ctx = project.ctx(
        &[("TF_TERRAGRUNT_CONFIG_FILE_NAME", "nested/custom.hcl")],
        PartialParameters::default(),
    );
    assert_eq!(version(&ctx).as_deref(), Some("~> 1.4.0"));
}

#[test]
fn test_cli_flags_apply_on_top_of_any_source() {
    let project = Project::new().file(".tfswitchrc", "1.2.0");
    let cli = PartialParameters {
        bin_path: Some(PathBuf::from("/tmp/custom/terraform")),
        log_level: Some("DEBUG".into()),
        ..Default::default()
    };

    let params = resolve_parameters(&project.ctx(&[], cli)).unwrap();
    assert_eq!(params.bin_path.value, Path::new("/tmp/custom/terraform"));
    assert_eq!(params.bin_path.provenance, Provenance::Cli);
    assert_eq!(
        params.version.map(|v| v.provenance),
        Some(Provenance::File(project.work.path().join(".tfswitchrc")))
    );
}

#[test]
fn test_home_toml_product_drives_file_lookup_and_defaults() {
    let project = Project::new()
        .home_file(".tfswitch.toml", "product = \"opentofu\"\n")
        .file(".terraform-version", "1.5.0")
        .file(".opentofu-version", "1.6.2");

    let params = resolve_parameters(&project.ctx(&[], PartialParameters::default())).unwrap();
    assert_eq!(params.product(), Product::OpenTofu);
    assert_eq!(params.version.map(|v| v.value.to_string()).as_deref(), Some("1.6.2"));
    assert_eq!(params.mirror_url.value, Product::OpenTofu.default_mirror());
}

#[test]
fn test_color_flags_from_environment() {
    let project = Project::new();
    let params = resolve_parameters(&project.ctx(&[("NO_COLOR", "1")], PartialParameters::default())).unwrap();
    assert_eq!(params.color, ColorMode::Never);

    let conflict = project.ctx(
        &[("NO_COLOR", "1")],
        PartialParameters {
            force_color: Some(true),
            ..Default::default()
        },
    );
    assert!(matches!(
        resolve_parameters(&conflict),
        Err(SwitchError::ColorConflict { .. })
    ));
}

#[test]
fn test_present_but_broken_source_does_not_fall_back() {
    let project = Project::new()
        .file(".tfswitchrc", "not-a-version")
        .file(".terraform-version", "1.5.0");
    let err = resolve_parameters(&project.ctx(&[], PartialParameters::default())).unwrap_err();
    match err {
        SwitchError::InvalidVersion { version, origin } => {
            assert_eq!(version, "not-a-version");
            assert!(origin.ends_with(".tfswitchrc"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_env_product_selects_file_and_final_product() {
    let project = Project::new()
        .file(".terraform-version", "1.5.0")
        .file(".opentofu-version", "1.6.2");

    let params = resolve_parameters(&project.ctx(&[("TF_PRODUCT", "opentofu")], PartialParameters::default())).unwrap();
    assert_eq!(params.product(), Product::OpenTofu);
    assert_eq!(params.product.provenance, Provenance::Environment);
    assert_eq!(params.version.map(|v| v.value.to_string()).as_deref(), Some("1.6.2"));
    assert_eq!(params.mirror_url.value, Product::OpenTofu.default_mirror());
}

#[test]
fn test_commented_required_version_falls_through_to_terragrunt() {
    let project = Project::new()
        .file("main.tf", "# required_version is pinned by terragrunt\nresource \"null_resource\" \"x\" {}\n")
        .file("terragrunt.hcl", "terraform_version_constraint = \"~> 1.5.0\"\n");
    assert_eq!(
        version(&project.ctx(&[], PartialParameters::default())).as_deref(),
        Some("~> 1.5.0")
    );
}
