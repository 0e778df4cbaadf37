//! Domain core: products, versions, resolution, caches, locking and the
//! install pipeline

pub mod catalog;
pub mod error;
pub mod installer;
pub mod lock;
pub mod logging;
pub mod output;
pub mod platform;
pub mod product;
pub mod recent;
pub mod resolver;
pub mod version;

pub use error::{Result, SwitchError};
pub use product::Product;
pub use version::{Constraint, Release, VersionRequest};
