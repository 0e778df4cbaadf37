//! `terraform_version_constraint` from Terragrunt configuration

use super::chain::{ConfigSource, SourceLayer};
use super::{ConfigContext, PartialParameters, Provenance};
use crate::core::error::{Result, SwitchError};
use crate::core::product::Product;
use crate::core::version::{Constraint, VersionRequest};
use hcl::Expression;
use std::path::{Path, PathBuf};

const CONSTRAINT_KEY: &str = "terraform_version_constraint";
const DEFAULT_FILE_NAMES: [&str; 2] = ["terragrunt.hcl", "root.hcl"];

/// Overrides the first Terragrunt file name tried
pub const CONFIG_NAME_ENV: &str = "TF_TERRAGRUNT_CONFIG_FILE_NAME";

/// Candidate file names in lookup order. Only the basename of the override
/// is used.
pub fn candidate_names(override_name: Option<&str>) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(3);
    if let Some(name) = override_name
        .and_then(|raw| Path::new(raw).file_name())
        .map(|n| n.to_string_lossy().into_owned())
    {
        names.push(name);
    }
    for name in DEFAULT_FILE_NAMES {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

fn candidates(ctx: &ConfigContext) -> Vec<PathBuf> {
    candidate_names(ctx.env_var(CONFIG_NAME_ENV))
        .into_iter()
        .map(|name| ctx.working_dir.join(name))
        .filter(|path| path.is_file())
        .collect()
}

/// Constraint string from one file; `Ok(None)` when the attribute is absent
/// or empty
fn constraint_in(path: &Path) -> Result<Option<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| SwitchError::Config {
        path: path.display().to_string(),
        reason: format!("cannot read file: {e}"),
    })?;
    let body = hcl::parse(&content).map_err(|e| SwitchError::Config {
        path: path.display().to_string(),
        reason: format!("invalid HCL: {e}"),
    })?;
    Ok(body
        .attributes()
        .filter(|attr| attr.key() == CONSTRAINT_KEY)
        .find_map(|attr| match attr.expr() {
            Expression::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        }))
}

/// First candidate file that declares a constraint. Unparseable files are
/// logged and skipped.
fn find_constraint(ctx: &ConfigContext) -> Option<(PathBuf, String)> {
    candidates(ctx).into_iter().find_map(|path| match constraint_in(&path) {
        Ok(Some(raw)) => Some((path, raw)),
        Ok(None) => None,
        Err(e) => {
            tracing::error!(file = %path.display(), error = %e, "skipping unreadable Terragrunt file");
            None
        }
    })
}

/// Terragrunt configuration in the working directory
pub struct TerragruntSource;

impl ConfigSource for TerragruntSource {
    fn name(&self) -> &'static str {
        "terragrunt"
    }

    fn exists(&self, ctx: &ConfigContext, _product: Product) -> bool {
        find_constraint(ctx).is_some()
    }

    fn read(&self, ctx: &ConfigContext, _product: Product) -> Result<SourceLayer> {
        let Some((path, raw)) = find_constraint(ctx) else {
            return Ok(SourceLayer {
                params: PartialParameters::default(),
                provenance: Provenance::File(ctx.working_dir.clone()),
            });
        };
        let constraint = Constraint::parse(&raw).map_err(|e| SwitchError::Config {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(SourceLayer {
            params: PartialParameters {
                version: Some(VersionRequest::Constraint(constraint)),
                ..Default::default()
            },
            provenance: Provenance::File(path),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn ctx(dir: &Path) -> ConfigContext {
        ConfigContext {
            working_dir: dir.to_path_buf(),
            home_dir: dir.to_path_buf(),
            env: BTreeMap::new(),
            cli: PartialParameters::default(),
        }
    }

    #[test]
    fn test_candidate_names() {
        assert_eq!(candidate_names(None), vec!["terragrunt.hcl", "root.hcl"]);
        assert_eq!(
            candidate_names(Some("/somewhere/else/custom.hcl")),
            vec!["custom.hcl", "terragrunt.hcl", "root.hcl"]
        );
        assert_eq!(candidate_names(Some("root.hcl")), vec!["root.hcl", "terragrunt.hcl"]);
    }

    #[test]
    fn test_reads_constraint() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("terragrunt.hcl"),
            "terraform_version_constraint = \">= 1.2, < 1.6\"\n",
        )
        .unwrap();

        let c = ctx(dir.path());
        assert!(TerragruntSource.exists(&c, Product::Terraform));
        let layer = TerragruntSource.read(&c, Product::Terraform).unwrap();
        assert_eq!(
            layer.params.version.map(|v| v.to_string()),
            Some(">= 1.2, < 1.6".to_string())
        );
    }

    #[test]
    fn test_falls_through_to_root_hcl() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("terragrunt.hcl"), "include {\n").unwrap();
        std::fs::write(
            dir.path().join("root.hcl"),
            "terraform_version_constraint = \"~> 1.5.0\"\n",
        )
        .unwrap();

        let layer = TerragruntSource.read(&ctx(dir.path()), Product::Terraform).unwrap();
        assert_eq!(layer.provenance, Provenance::File(dir.path().join("root.hcl")));
    }

    #[test]
    fn test_empty_constraint_does_not_exist() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("terragrunt.hcl"), "terraform_version_constraint = \"\"\n").unwrap();
        assert!(!TerragruntSource.exists(&ctx(dir.path()), Product::Terraform));
    }

    #[test]
    fn test_directory_named_like_config_is_skipped() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("terragrunt.hcl")).unwrap();
        assert!(!TerragruntSource.exists(&ctx(dir.path()), Product::Terraform));
    }
}
