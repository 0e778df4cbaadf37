//! `.tfswitch.toml` configuration files

use super::chain::{ConfigSource, SourceLayer};
use super::{ConfigContext, FIELD_MAPPINGS, FieldKind, FieldValue, PartialParameters, Provenance};
use crate::core::error::{Result, SwitchError};
use crate::core::product::Product;
use std::path::{Path, PathBuf};
use toml::Value;

pub const TOML_FILE_NAME: &str = ".tfswitch.toml";

/// Parse a TOML config file into partial parameters
///
/// Keys of the wrong type are warned about and skipped. A file that cannot be
/// read or parsed is an error.
pub fn read_toml_file(path: &Path, ctx: &ConfigContext) -> Result<PartialParameters> {
    let content = std::fs::read_to_string(path).map_err(|e| SwitchError::Config {
        path: path.display().to_string(),
        reason: format!("cannot read file: {e}"),
    })?;
    parse_toml(&content, path, ctx)
}

fn parse_toml(content: &str, path: &Path, ctx: &ConfigContext) -> Result<PartialParameters> {
    let table: toml::Table = content.parse().map_err(|e: toml::de::Error| SwitchError::Config {
        path: path.display().to_string(),
        reason: e.to_string().trim().to_string(),
    })?;

    let origin = path.display().to_string();
    let mut params = PartialParameters::default();

    for mapping in FIELD_MAPPINGS {
        let Some(value) = table.get(mapping.toml) else {
            continue;
        };
        let field = match (mapping.kind, value) {
            (FieldKind::Text, Value::String(s)) if mapping.expand_in_toml => {
                FieldValue::Text(ctx.expand(s).display().to_string())
            }
            (FieldKind::Text, Value::String(s)) => FieldValue::Text(s.clone()),
            (FieldKind::Flag, Value::Boolean(b)) => FieldValue::Flag(*b),
            (kind, other) => {
                tracing::warn!(
                    file = %origin,
                    key = mapping.toml,
                    expected = ?kind,
                    found = other.type_str(),
                    "ignoring configuration key with unexpected type"
                );
                continue;
            }
        };
        (mapping.apply)(&mut params, field, &origin)?;
    }

    Ok(params)
}

/// `~/.tfswitch.toml`, applied beneath the chain when present
pub fn home_layer(ctx: &ConfigContext) -> Result<Option<SourceLayer>> {
    let path = ctx.home_dir.join(TOML_FILE_NAME);
    if !path.is_file() {
        return Ok(None);
    }
    let params = read_toml_file(&path, ctx)?;
    Ok(Some(SourceLayer {
        params,
        provenance: Provenance::File(path),
    }))
}

/// `.tfswitch.toml` in the working directory
pub struct ProjectToml;

impl ProjectToml {
    fn path(ctx: &ConfigContext) -> PathBuf {
        ctx.working_dir.join(TOML_FILE_NAME)
    }
}

impl ConfigSource for ProjectToml {
    fn name(&self) -> &'static str {
        "project toml"
    }

    fn exists(&self, ctx: &ConfigContext, _product: Product) -> bool {
        Self::path(ctx).is_file()
    }

    fn read(&self, ctx: &ConfigContext, _product: Product) -> Result<SourceLayer> {
        let path = Self::path(ctx);
        let params = read_toml_file(&path, ctx)?;
        Ok(SourceLayer {
            params,
            provenance: Provenance::File(path),
        })
    }
}
