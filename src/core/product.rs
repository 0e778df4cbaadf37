//! Supported products and their per-product behavior table
//!
//! Each product is one variant of [`Product`] plus one row in `PRODUCTS`.
//! Adding a product means adding both; nothing else in the crate matches on
//! product identity except the recent-list accessor.

use super::error::{Result, SwitchError};
use std::fmt;

/// Product used when nothing else is configured
pub const DEFAULT_PRODUCT: Product = Product::Terraform;

/// A supported infrastructure-as-code tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Product {
    Terraform,
    OpenTofu,
}

/// Static descriptor for one product
#[derive(Debug)]
pub struct ProductInfo {
    pub id: &'static str,
    pub name: &'static str,
    /// Index listing all releases
    pub default_mirror: &'static str,
    /// Where archives are served from when it differs from the index
    pub download_mirror: Option<&'static str>,
    /// Prefix of installed artifacts (`terraform_1.7.5`)
    pub version_prefix: &'static str,
    /// Prefix of release archive names (`tofu_1.6.0_linux_amd64.zip`)
    pub archive_prefix: &'static str,
    pub executable: &'static str,
    pub public_key_id: &'static str,
    pub public_key_url: &'static str,
    /// Suffix appended to the SHA256SUMS name for the detached signature
    pub signature_suffix: &'static str,
    /// Per-directory version pin file read by the config chain
    pub version_file: &'static str,
    /// Module file extensions scanned for `required_version`
    pub module_extensions: &'static [&'static str],
}

const PRODUCTS: [ProductInfo; 2] = [
    ProductInfo {
        id: "terraform",
        name: "Terraform",
        default_mirror: "https://releases.hashicorp.com/terraform",
        download_mirror: None,
        version_prefix: "terraform_",
        archive_prefix: "terraform_",
        executable: "terraform",
        public_key_id: "72D7468F",
        public_key_url: "https://www.hashicorp.com/.well-known/pgp-key.txt",
        signature_suffix: "72D7468F.sig",
        version_file: ".terraform-version",
        module_extensions: &["tf"],
    },
    ProductInfo {
        id: "opentofu",
        name: "OpenTofu",
        default_mirror: "https://get.opentofu.org/tofu",
        download_mirror: Some("https://github.com/opentofu/opentofu/releases/download"),
        version_prefix: "opentofu_",
        archive_prefix: "tofu_",
        executable: "tofu",
        public_key_id: "0C0AF313E5FD9F80",
        public_key_url: "https://get.opentofu.org/opentofu.asc",
        signature_suffix: "gpgsig",
        version_file: ".opentofu-version",
        module_extensions: &["tf", "tofu"],
    },
];

impl Product {
    pub const ALL: [Product; 2] = [Product::Terraform, Product::OpenTofu];

    fn info(self) -> &'static ProductInfo {
        match self {
            Product::Terraform => &PRODUCTS[0],
            Product::OpenTofu => &PRODUCTS[1],
        }
    }

    /// Look up a product by id, ignoring case
    pub fn from_id(id: &str) -> Option<Product> {
        Self::ALL
            .into_iter()
            .find(|p| p.info().id.eq_ignore_ascii_case(id.trim()))
    }

    /// Like [`Product::from_id`], but reports unknown ids as an error
    pub fn parse(id: &str) -> Result<Product> {
        Self::from_id(id).ok_or_else(|| SwitchError::UnknownProduct {
            id: id.to_string(),
            known: Self::ALL.map(|p| p.id()).join(", "),
        })
    }

    pub fn id(self) -> &'static str {
        self.info().id
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn default_mirror(self) -> &'static str {
        self.info().default_mirror
    }

    pub fn version_prefix(self) -> &'static str {
        self.info().version_prefix
    }

    pub fn executable(self) -> &'static str {
        self.info().executable
    }

    pub fn public_key_id(self) -> &'static str {
        self.info().public_key_id
    }

    pub fn public_key_url(self) -> &'static str {
        self.info().public_key_url
    }

    pub fn version_file(self) -> &'static str {
        self.info().version_file
    }

    pub fn module_extensions(self) -> &'static [&'static str] {
        self.info().module_extensions
    }

    /// Base URL holding the archive, manifest and signature for `version`
    pub fn artifact_base_url(self, mirror_url: &str, version: &str) -> String {
        match self.info().download_mirror {
            Some(download) => format!("{}/v{}", download.trim_end_matches('/'), version),
            None => format!("{}/{}", mirror_url.trim_end_matches('/'), version),
        }
    }

    /// Release archive file name for a platform
    pub fn archive_name(self, version: &str, os: &str, arch: &str) -> String {
        format!("{}{}_{}_{}.zip", self.info().archive_prefix, version, os, arch)
    }

    /// Checksum manifest file name
    pub fn manifest_name(self, version: &str) -> String {
        format!("{}{}_SHA256SUMS", self.info().archive_prefix, version)
    }

    /// Detached signature file name for the manifest
    pub fn signature_name(self, version: &str) -> String {
        format!("{}.{}", self.manifest_name(version), self.info().signature_suffix)
    }

    /// File name of the cached public key inside the install directory
    pub fn public_key_file_name(self) -> String {
        format!("{}_{}.asc", self.id(), self.public_key_id())
    }

    /// Executable name with the platform extension applied
    pub fn executable_file_name(self, os: &str) -> String {
        with_exe_extension(self.executable(), os)
    }

    /// Canonical installed artifact name, e.g. `terraform_1.7.5`
    pub fn artifact_file_name(self, version: &str, os: &str) -> String {
        with_exe_extension(&format!("{}{}", self.version_prefix(), version), os)
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Append `.exe` on Windows unless already present
pub fn with_exe_extension(name: &str, os: &str) -> String {
    if os == "windows" && !name.ends_with(".exe") {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(Product::from_id("terraform"), Some(Product::Terraform));
        assert_eq!(Product::from_id("OpenTofu"), Some(Product::OpenTofu));
        assert_eq!(Product::from_id("OPENTOFU"), Some(Product::OpenTofu));
        assert_eq!(Product::from_id("pulumi"), None);
    }

    #[test]
    fn test_parse_unknown_lists_known_ids() {
        let err = Product::parse("pulumi").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("pulumi"));
        assert!(msg.contains("terraform, opentofu"));
    }

    #[test]
    fn test_terraform_urls() {
        let p = Product::Terraform;
        assert_eq!(
            p.artifact_base_url("https://releases.hashicorp.com/terraform/", "1.7.5"),
            "https://releases.hashicorp.com/terraform/1.7.5"
        );
        assert_eq!(
            p.archive_name("1.7.5", "linux", "amd64"),
            "terraform_1.7.5_linux_amd64.zip"
        );
        assert_eq!(p.manifest_name("1.7.5"), "terraform_1.7.5_SHA256SUMS");
        assert_eq!(
            p.signature_name("1.7.5"),
            "terraform_1.7.5_SHA256SUMS.72D7468F.sig"
        );
    }

    #[test]
    fn test_opentofu_downloads_from_release_mirror() {
        let p = Product::OpenTofu;
        assert_eq!(
            p.artifact_base_url("https://get.opentofu.org/tofu", "1.6.2"),
            "https://github.com/opentofu/opentofu/releases/download/v1.6.2"
        );
        assert_eq!(p.archive_name("1.6.2", "darwin", "arm64"), "tofu_1.6.2_darwin_arm64.zip");
        assert_eq!(p.signature_name("1.6.2"), "tofu_1.6.2_SHA256SUMS.gpgsig");
    }

    #[test]
    fn test_artifact_names() {
        assert_eq!(Product::Terraform.artifact_file_name("1.7.5", "linux"), "terraform_1.7.5");
        assert_eq!(
            Product::OpenTofu.artifact_file_name("1.6.2", "windows"),
            "opentofu_1.6.2.exe"
        );
        assert_eq!(Product::OpenTofu.executable_file_name("windows"), "tofu.exe");
        assert_eq!(with_exe_extension("tofu.exe", "windows"), "tofu.exe");
    }
}
