//! Recently installed versions, per product
//!
//! Stored as `RECENT` in the install directory:
//!
//! ```json
//! {"terraform":["1.7.5","1.6.0"],"opentofu":["1.6.2"]}
//! ```
//!
//! Older releases wrote one version per line with no product information;
//! such files are read as Terraform-only and rewritten as JSON on the next add.

use super::error::{Result, SwitchError};
use super::product::Product;
use super::version::{is_valid_version, validate_version};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name inside the install directory
pub const RECENT_FILE_NAME: &str = "RECENT";

/// Entries kept per product
pub const MAX_RECENT: usize = 3;

/// On-disk shape
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentFile {
    #[serde(default, alias = "Terraform")]
    pub terraform: Vec<String>,
    #[serde(default, alias = "OpenTofu")]
    pub opentofu: Vec<String>,
}

impl RecentFile {
    pub fn list(&self, product: Product) -> &[String] {
        match product {
            Product::Terraform => &self.terraform,
            Product::OpenTofu => &self.opentofu,
        }
    }

    fn list_mut(&mut self, product: Product) -> &mut Vec<String> {
        match product {
            Product::Terraform => &mut self.terraform,
            Product::OpenTofu => &mut self.opentofu,
        }
    }

    fn all_valid(&self) -> bool {
        Product::ALL
            .iter()
            .flat_map(|p| self.list(*p))
            .all(|v| is_valid_version(v))
    }

    /// Move `version` to the front of the product's list, capping its length
    pub fn push_front(&mut self, product: Product, version: &str) {
        let list = self.list_mut(product);
        list.retain(|v| v != version);
        list.insert(0, version.to_string());
        list.truncate(MAX_RECENT);
    }
}

/// Layout of a `RECENT` file, decided from its first byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecentFormat {
    Empty,
    Json,
    Legacy,
}

pub fn detect_recent_format(bytes: &[u8]) -> RecentFormat {
    match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
        None => RecentFormat::Empty,
        Some(b'{') => RecentFormat::Json,
        Some(_) => RecentFormat::Legacy,
    }
}

/// Parse a stored file; the error is a description of the corruption
fn parse_recent(bytes: &[u8]) -> std::result::Result<RecentFile, String> {
    let file = match detect_recent_format(bytes) {
        RecentFormat::Empty => RecentFile::default(),
        RecentFormat::Json => serde_json::from_slice(bytes).map_err(|e| e.to_string())?,
        RecentFormat::Legacy => RecentFile {
            terraform: String::from_utf8_lossy(bytes)
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            opentofu: Vec::new(),
        },
    };

    if file.all_valid() {
        Ok(file)
    } else {
        Err("invalid version entry".to_string())
    }
}

/// Handle on the `RECENT` file of one install directory
#[derive(Debug, Clone)]
pub struct RecentCache {
    path: PathBuf,
}

impl RecentCache {
    pub fn new(install_dir: &Path) -> Self {
        Self {
            path: install_dir.join(RECENT_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole file; missing or corrupt files read as empty
    pub fn load(&self) -> Result<RecentFile> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(RecentFile::default()),
            Err(e) => return Err(SwitchError::io(&self.path, e)),
        };
        match parse_recent(&bytes) {
            Ok(file) => Ok(file),
            Err(reason) => {
                tracing::warn!(path = %self.path.display(), %reason, "ignoring corrupt recent file");
                Ok(RecentFile::default())
            }
        }
    }

    /// Recent versions for `product`, most recent first
    pub fn get(&self, product: Product) -> Result<Vec<String>> {
        Ok(self.load()?.list(product).to_vec())
    }

    /// Record a successful install of `version`
    ///
    /// A corrupt file is discarded and rebuilt around this entry alone.
    pub fn add(&self, product: Product, version: &str) -> Result<()> {
        validate_version(version, "recent version cache")?;

        let mut file = match std::fs::read(&self.path) {
            Ok(bytes) => parse_recent(&bytes).unwrap_or_else(|reason| {
                tracing::warn!(
                    path = %self.path.display(),
                    %reason,
                    "rebuilding corrupt recent file"
                );
                RecentFile::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RecentFile::default(),
            Err(e) => return Err(SwitchError::io(&self.path, e)),
        };

        file.push_front(product, version);
        self.save(&file)
    }

    fn save(&self, file: &RecentFile) -> Result<()> {
        let json = serde_json::to_vec(file).map_err(|e| SwitchError::Config {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;
        std::fs::write(&self.path, json).map_err(|e| SwitchError::io(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_readd_moves_to_front_without_growth() {
        let dir = TempDir::new().unwrap();
        let cache = RecentCache::new(dir.path());
        cache.add(Product::Terraform, "1.5.0").unwrap();
        cache.add(Product::Terraform, "1.6.0").unwrap();
        cache.add(Product::Terraform, "1.5.0").unwrap();

        assert_eq!(cache.get(Product::Terraform).unwrap(), vec!["1.5.0", "1.6.0"]);
    }

    #[test]
    fn test_fourth_version_evicts_oldest() {
        let dir = TempDir::new().unwrap();
        let cache = RecentCache::new(dir.path());
        for v in ["1.1.0", "1.2.0", "1.3.0", "1.4.0"] {
            cache.add(Product::OpenTofu, v).unwrap();
        }

        assert_eq!(
            cache.get(Product::OpenTofu).unwrap(),
            vec!["1.4.0", "1.3.0", "1.2.0"]
        );
        assert!(cache.get(Product::Terraform).unwrap().is_empty());
    }

    #[test]
    fn test_round_trip_preserves_per_product_order() {
        let dir = TempDir::new().unwrap();
        let cache = RecentCache::new(dir.path());
        cache.add(Product::Terraform, "1.7.5").unwrap();
        cache.add(Product::OpenTofu, "1.6.2").unwrap();
        cache.add(Product::Terraform, "1.6.0").unwrap();

        let raw = std::fs::read_to_string(cache.path()).unwrap();
        assert_eq!(raw, r#"{"terraform":["1.6.0","1.7.5"],"opentofu":["1.6.2"]}"#);

        let reopened = RecentCache::new(dir.path()).load().unwrap();
        assert_eq!(reopened.terraform, vec!["1.6.0", "1.7.5"]);
        assert_eq!(reopened.opentofu, vec!["1.6.2"]);
    }

    #[test]
    fn test_legacy_file_reads_as_terraform() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(RECENT_FILE_NAME), "1.2.3\n1.1.0\n").unwrap();
        let cache = RecentCache::new(dir.path());

        assert_eq!(cache.get(Product::Terraform).unwrap(), vec!["1.2.3", "1.1.0"]);
        assert!(cache.get(Product::OpenTofu).unwrap().is_empty());

        cache.add(Product::OpenTofu, "1.6.2").unwrap();
        let raw = std::fs::read_to_string(cache.path()).unwrap();
        assert_eq!(raw, r#"{"terraform":["1.2.3","1.1.0"],"opentofu":["1.6.2"]}"#);
    }

    #[test]
    fn test_capitalized_product_keys_are_kept() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(RECENT_FILE_NAME),
            r#"{"Terraform":["1.5.7","1.4.6"],"OpenTofu":["1.6.2"]}"#,
        )
        .unwrap();
        let cache = RecentCache::new(dir.path());

        assert_eq!(cache.get(Product::Terraform).unwrap(), vec!["1.5.7", "1.4.6"]);
        cache.add(Product::OpenTofu, "1.7.0").unwrap();
        let raw = std::fs::read_to_string(cache.path()).unwrap();
        assert_eq!(
            raw,
            r#"{"terraform":["1.5.7","1.4.6"],"opentofu":["1.7.0","1.6.2"]}"#
        );
    }

    #[test]
    fn test_invalid_entry_rebuilds_with_current_only() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(RECENT_FILE_NAME),
            r#"{"terraform":["1.2.3","garbage"],"opentofu":["1.6.0"]}"#,
        )
        .unwrap();
        let cache = RecentCache::new(dir.path());

        cache.add(Product::Terraform, "1.7.5").unwrap();
        let file = cache.load().unwrap();
        assert_eq!(file.terraform, vec!["1.7.5"]);
        assert!(file.opentofu.is_empty());
    }

    #[test]
    fn test_corrupt_json_is_not_a_failure() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(RECENT_FILE_NAME), "{not json").unwrap();
        let cache = RecentCache::new(dir.path());

        assert!(cache.get(Product::Terraform).unwrap().is_empty());
        cache.add(Product::Terraform, "1.7.5").unwrap();
        assert_eq!(cache.get(Product::Terraform).unwrap(), vec!["1.7.5"]);
    }

    #[test]
    fn test_add_rejects_invalid_version() {
        let dir = TempDir::new().unwrap();
        let cache = RecentCache::new(dir.path());
        assert!(cache.add(Product::Terraform, "1.x").is_err());
        assert!(!cache.path().exists());
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_recent_format(b""), RecentFormat::Empty);
        assert_eq!(detect_recent_format(b"  \n"), RecentFormat::Empty);
        assert_eq!(detect_recent_format(b"{\"terraform\":[]}"), RecentFormat::Json);
        assert_eq!(detect_recent_format(b"1.2.3\n"), RecentFormat::Legacy);
    }
}
