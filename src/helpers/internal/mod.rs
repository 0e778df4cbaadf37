//! Internal utilities shared across helpers

pub mod fs_utils;
pub mod hash;
pub mod progress;
