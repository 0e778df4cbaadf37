//! Mechanical I/O used by the installer
//!
//! ## Categories
//!
//! - **acquire**: HTTP transport, streaming download, signature verification
//! - **build**: extracting the executable from a release zip
//! - **install**: choosing and replacing the active link
//! - **internal**: filesystem helpers, hashing, progress bars

pub mod acquire;
pub mod build;
pub mod install;
pub mod internal;
