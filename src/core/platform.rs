//! Host platform naming
//!
//! Release archives use Go's GOOS/GOARCH names, not Rust's.

/// Operating system name as used in release archive names
pub fn host_os() -> &'static str {
    go_os(std::env::consts::OS)
}

/// CPU architecture name as used in release archive names
pub fn host_arch() -> &'static str {
    go_arch(std::env::consts::ARCH)
}

fn go_os(os: &'static str) -> &'static str {
    match os {
        "macos" => "darwin",
        other => other,
    }
}

fn go_arch(arch: &'static str) -> &'static str {
    match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        "arm" => "arm",
        other => other,
    }
}
