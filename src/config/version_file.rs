//! Single-value version files: `.tfswitchrc` and the per-product
//! `.terraform-version` / `.opentofu-version`

use super::chain::{ConfigSource, SourceLayer};
use super::{ConfigContext, PartialParameters, Provenance};
use crate::core::error::{Result, SwitchError};
use crate::core::product::Product;
use crate::core::version::VersionRequest;
use std::path::{Path, PathBuf};

pub const RC_FILE_NAME: &str = ".tfswitchrc";

/// Read a file whose whole trimmed content is a version or constraint.
/// Empty content yields no version.
pub fn read_version_file(path: &Path) -> Result<PartialParameters> {
    let content = std::fs::read_to_string(path).map_err(|e| SwitchError::Config {
        path: path.display().to_string(),
        reason: format!("cannot read file: {e}"),
    })?;

    let token = content.trim();
    let mut params = PartialParameters::default();
    if token.is_empty() {
        tracing::debug!(file = %path.display(), "version file is empty");
        return Ok(params);
    }
    params.version = Some(VersionRequest::parse(token, &path.display().to_string())?);
    Ok(params)
}

fn layer_from(path: PathBuf) -> Result<SourceLayer> {
    let params = read_version_file(&path)?;
    Ok(SourceLayer {
        params,
        provenance: Provenance::File(path),
    })
}

/// `.tfswitchrc` in the working directory
pub struct RcFile;

impl ConfigSource for RcFile {
    fn name(&self) -> &'static str {
        "rc file"
    }

    fn exists(&self, ctx: &ConfigContext, _product: Product) -> bool {
        ctx.working_dir.join(RC_FILE_NAME).is_file()
    }

    fn read(&self, ctx: &ConfigContext, _product: Product) -> Result<SourceLayer> {
        layer_from(ctx.working_dir.join(RC_FILE_NAME))
    }
}

/// `.terraform-version` or `.opentofu-version`, depending on the product
pub struct ToolVersionFile;

impl ConfigSource for ToolVersionFile {
    fn name(&self) -> &'static str {
        "version file"
    }

    fn exists(&self, ctx: &ConfigContext, product: Product) -> bool {
        ctx.working_dir.join(product.version_file()).is_file()
    }

    fn read(&self, ctx: &ConfigContext, product: Product) -> Result<SourceLayer> {
        layer_from(ctx.working_dir.join(product.version_file()))
    }
}
