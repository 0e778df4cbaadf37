//! Resolve and switch the active Terraform or OpenTofu version
//!
//! A run has three stages:
//!
//! 1. [`config`] merges CLI flags, project files, environment variables and
//!    defaults into one [`config::ResolvedParameters`].
//! 2. [`core::resolver`] turns a version or constraint into one concrete
//!    release from the product's [`core::catalog`].
//! 3. [`core::installer`] downloads, verifies and unpacks that release under
//!    the install lock, then repoints the active binary link.
//!
//! [`switch`] ties the stages together for each CLI mode.
//!
//! # Example
//!
//! ```no_run
//! use tfswitch::config::{ConfigContext, PartialParameters, resolve_parameters};
//! use tfswitch::helpers::acquire::{HttpTransport, PgpVerifier};
//! use tfswitch::switch::{Action, Switcher};
//!
//! # fn main() -> tfswitch::core::Result<()> {
//! let ctx = ConfigContext::from_process(PartialParameters::default(), None)?;
//! let params = resolve_parameters(&ctx)?;
//! let transport = HttpTransport::default();
//! Switcher::new(&params, &transport, &PgpVerifier).run(&Action::Install)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod helpers;
pub mod switch;

pub use config::{ConfigContext, ResolvedParameters};
pub use crate::core::{Product, Result, SwitchError};
