//! Unpacking downloaded release archives

pub mod extract;

pub use extract::extract_executable;
