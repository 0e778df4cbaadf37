//! Placing installed binaries on the user's PATH

pub mod link;

pub use link::{choose_link_path, current_target, relink};
