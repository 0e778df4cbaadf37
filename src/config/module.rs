//! `required_version` constraints from Terraform/OpenTofu module files

use super::chain::{ConfigSource, SourceLayer};
use super::{ConfigContext, PartialParameters, Provenance};
use crate::core::error::{Result, SwitchError};
use crate::core::product::Product;
use crate::core::version::{Constraint, VersionRequest};
use hcl::{Body, Expression};
use std::path::{Path, PathBuf};

const REQUIRED_VERSION: &str = "required_version";

/// Module files in `dir` for `product`, sorted for stable output
pub fn module_files(dir: &Path, product: Product) -> Vec<PathBuf> {
    let base = glob::Pattern::escape(&dir.to_string_lossy());
    let mut files: Vec<PathBuf> = product
        .module_extensions()
        .iter()
        .filter_map(|ext| glob::glob(&format!("{base}/*.{ext}")).ok())
        .flat_map(|paths| paths.filter_map(|p| p.ok()))
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    files
}

/// Every `terraform { required_version = "..." }` string in an HCL body
fn required_versions(body: &Body) -> Vec<String> {
    body.blocks()
        .filter(|block| block.identifier() == "terraform")
        .flat_map(|block| block.body().attributes())
        .filter(|attr| attr.key() == REQUIRED_VERSION)
        .filter_map(|attr| match attr.expr() {
            Expression::String(s) => Some(s.clone()),
            _ => None,
        })
        .collect()
}

/// Collect and AND together the constraints declared across `files`
pub fn read_module_constraints(files: &[PathBuf]) -> Result<Option<Constraint>> {
    let mut clauses = Vec::new();

    for file in files {
        let content = std::fs::read_to_string(file).map_err(|e| SwitchError::Config {
            path: file.display().to_string(),
            reason: format!("cannot read file: {e}"),
        })?;
        if !content.contains(REQUIRED_VERSION) {
            continue;
        }
        let body = hcl::parse(&content).map_err(|e| SwitchError::Config {
            path: file.display().to_string(),
            reason: format!("invalid HCL: {e}"),
        })?;
        for raw in required_versions(&body) {
            Constraint::parse(&raw).map_err(|e| SwitchError::Config {
                path: file.display().to_string(),
                reason: e.to_string(),
            })?;
            tracing::debug!(file = %file.display(), constraint = %raw, "found required_version");
            clauses.push(raw);
        }
    }

    if clauses.is_empty() {
        return Ok(None);
    }
    Constraint::parse(&clauses.join(", ")).map(Some)
}

/// Terraform/OpenTofu module in the working directory
pub struct ModuleSource;

impl ConfigSource for ModuleSource {
    fn name(&self) -> &'static str {
        "module required_version"
    }

    /// True when some file declares `required_version`. A file that
    /// mentions it but does not parse also counts, so `read` reports it.
    fn exists(&self, ctx: &ConfigContext, product: Product) -> bool {
        module_files(&ctx.working_dir, product)
            .iter()
            .filter_map(|file| std::fs::read_to_string(file).ok())
            .filter(|content| content.contains(REQUIRED_VERSION))
            .any(|content| match hcl::parse(&content) {
                Ok(body) => !required_versions(&body).is_empty(),
                Err(_) => true,
            })
    }

    fn read(&self, ctx: &ConfigContext, product: Product) -> Result<SourceLayer> {
        let constraint = read_module_constraints(&module_files(&ctx.working_dir, product))?;
        Ok(SourceLayer {
            params: PartialParameters {
                version: constraint.map(VersionRequest::Constraint),
                ..Default::default()
            },
            provenance: Provenance::File(ctx.working_dir.clone()),
        })
    }
}
