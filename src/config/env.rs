//! Environment variable source, driven by the static field table

use super::chain::{ConfigSource, SourceLayer};
use super::{ConfigContext, FIELD_MAPPINGS, FieldKind, FieldValue, PartialParameters, Provenance};
use crate::core::error::Result;
use crate::core::product::Product;

/// Build partial parameters from the context's environment snapshot.
/// Empty variables are ignored; any non-empty flag variable means true.
pub fn read_environment(ctx: &ConfigContext) -> Result<PartialParameters> {
    let mut params = PartialParameters::default();
    for mapping in FIELD_MAPPINGS {
        let Some(raw) = ctx.env_var(mapping.env) else {
            continue;
        };
        let value = match mapping.kind {
            FieldKind::Text => FieldValue::Text(raw.to_string()),
            FieldKind::Flag => FieldValue::Flag(true),
        };
        let origin = format!("environment variable {}", mapping.env);
        (mapping.apply)(&mut params, value, &origin)?;
    }
    Ok(params)
}

pub struct EnvironmentSource;

impl ConfigSource for EnvironmentSource {
    fn name(&self) -> &'static str {
        "environment"
    }

    fn exists(&self, ctx: &ConfigContext, _product: Product) -> bool {
        FIELD_MAPPINGS.iter().any(|m| ctx.env_var(m.env).is_some())
    }

    fn read(&self, ctx: &ConfigContext, _product: Product) -> Result<SourceLayer> {
        Ok(SourceLayer {
            params: read_environment(ctx)?,
            provenance: Provenance::Environment,
        })
    }
}
