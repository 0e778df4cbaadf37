//! First-match configuration chain

use super::env::EnvironmentSource;
use super::module::ModuleSource;
use super::terragrunt::TerragruntSource;
use super::toml_file::{self, ProjectToml};
use super::version_file::{RcFile, ToolVersionFile};
use super::{ConfigContext, Layers, PartialParameters, Provenance, ResolvedParameters};
use crate::core::error::Result;
use crate::core::product::{DEFAULT_PRODUCT, Product};

/// Values read from one source and where they came from
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLayer {
    pub params: PartialParameters,
    pub provenance: Provenance,
}

/// One configuration source in the chain
///
/// `product` is the product known before the chain runs. Sources use it to
/// pick file names and extensions.
pub trait ConfigSource {
    fn name(&self) -> &'static str;

    /// Whether this source should win the chain. Must not fail; problems
    /// surface from [`ConfigSource::read`].
    fn exists(&self, ctx: &ConfigContext, product: Product) -> bool;

    fn read(&self, ctx: &ConfigContext, product: Product) -> Result<SourceLayer>;
}

pub struct ConfigChain {
    sources: Vec<Box<dyn ConfigSource>>,
}

impl Default for ConfigChain {
    fn default() -> Self {
        Self::standard()
    }
}

impl ConfigChain {
    /// Sources in precedence order, highest first
    pub fn standard() -> Self {
        Self::with_sources(vec![
            Box::new(ProjectToml),
            Box::new(RcFile),
            Box::new(ToolVersionFile),
            Box::new(ModuleSource),
            Box::new(TerragruntSource),
            Box::new(EnvironmentSource),
        ])
    }

    pub fn with_sources(sources: Vec<Box<dyn ConfigSource>>) -> Self {
        Self { sources }
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Merge defaults, `~/.tfswitch.toml`, the winning source and the CLI
    pub fn resolve(&self, ctx: &ConfigContext) -> Result<ResolvedParameters> {
        let mut layers = Layers::default();

        if let Some(home) = toml_file::home_layer(ctx)? {
            tracing::debug!(file = %home.provenance, "applying home configuration");
            layers.apply(home.params, &home.provenance);
        }

        if ctx.cli.product.is_none() && layers.product_id().is_none() {
            if let Some(id) = ctx.env_var("TF_PRODUCT") {
                let env_product = PartialParameters {
                    product: Some(id.to_string()),
                    ..Default::default()
                };
                layers.apply(env_product, &Provenance::Environment);
            }
        }

        let product = probe_product(ctx, &layers);

        match self.sources.iter().find(|s| s.exists(ctx, product)) {
            Some(source) => {
                let layer = source.read(ctx, product)?;
                tracing::debug!(source = source.name(), from = %layer.provenance, "configuration source matched");
                layers.apply(layer.params, &layer.provenance);
            }
            None => tracing::debug!("no configuration source matched, using defaults"),
        }

        layers.apply(ctx.cli.clone(), &Provenance::Cli);
        layers.finalize(ctx)
    }
}

/// Product used for file lookups: CLI, then home TOML or `TF_PRODUCT`.
/// Unknown ids fall back to the default here and fail later in finalize.
fn probe_product(ctx: &ConfigContext, layers: &Layers) -> Product {
    ctx.cli
        .product
        .as_deref()
        .or_else(|| layers.product_id())
        .and_then(Product::from_id)
        .unwrap_or(DEFAULT_PRODUCT)
}

/// Resolve with the standard chain
pub fn resolve_parameters(ctx: &ConfigContext) -> Result<ResolvedParameters> {
    ConfigChain::standard().resolve(ctx)
}
