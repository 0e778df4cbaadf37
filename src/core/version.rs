//! Version validation and constraint parsing
//!
//! Constraints use the comparator syntax of Terraform's `required_version`:
//!
//! ```text
//! "1.7.5"                 // exact (same as "= 1.7.5")
//! ">= 1.0, < 1.4"         // range, clauses are ANDed
//! "~> 1.1.0"              // pessimistic: >= 1.1.0, < 1.2.0
//! "~> 1.1"                // pessimistic: >= 1.1.0, < 2.0.0
//! "!= 1.3.2"              // exclusion
//! ```
//!
//! Partial operands are padded with zeros. A pre-release version only ever
//! matches a clause whose operand carries a pre-release on the same
//! major.minor.patch.

use super::error::{Result, SwitchError};
use regex::Regex;
use semver::{Prerelease, Version};
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

fn strict_version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\d+\.\d+\.\d+(-[A-Za-z]+\d*)?$").expect("strict version pattern is valid")
    })
}

/// Check a version string against the install-time syntax: `#.#.#` or
/// `#.#.#-<letters><digits>`
pub fn is_valid_version(version: &str) -> bool {
    strict_version_pattern().is_match(version)
}

/// Validate a version, naming where it came from on failure
pub fn validate_version(version: &str, origin: &str) -> Result<()> {
    if is_valid_version(version) {
        Ok(())
    } else {
        Err(SwitchError::InvalidVersion {
            version: version.to_string(),
            origin: origin.to_string(),
        })
    }
}

/// One release from a mirror catalog
///
/// Keeps the exact string the mirror published alongside the parsed version so
/// that artifact names are built from what the mirror knows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    raw: String,
    version: Version,
}

impl Release {
    /// Parse a catalog token; returns `None` for anything that is not semver-shaped
    pub fn parse(raw: &str) -> Option<Self> {
        let version = Version::parse(raw).ok()?;
        Some(Self {
            raw: raw.to_string(),
            version,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn is_prerelease(&self) -> bool {
        !self.version.pre.is_empty()
    }
}

impl Ord for Release {
    fn cmp(&self, other: &Self) -> Ordering {
        self.version
            .cmp_precedence(&other.version)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for Release {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Comparison operator of a single constraint clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Pessimistic,
}

impl Operator {
    // Longest tokens first so ">=" is not read as ">"
    const TOKENS: [(&'static str, Operator); 7] = [
        ("~>", Operator::Pessimistic),
        (">=", Operator::GreaterEqual),
        ("<=", Operator::LessEqual),
        ("!=", Operator::NotEqual),
        (">", Operator::Greater),
        ("<", Operator::Less),
        ("=", Operator::Equal),
    ];

    fn split(clause: &str) -> (Operator, &str) {
        for (token, op) in Self::TOKENS {
            if let Some(rest) = clause.strip_prefix(token) {
                return (op, rest);
            }
        }
        (Operator::Equal, clause)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::Greater => ">",
            Operator::GreaterEqual => ">=",
            Operator::Less => "<",
            Operator::LessEqual => "<=",
            Operator::Pessimistic => "~>",
        }
    }
}

/// Operand of a clause, possibly with fewer than three segments
#[derive(Debug, Clone, PartialEq, Eq)]
struct PartialVersion {
    version: Version,
    /// Number of numeric segments the author wrote (1..=3)
    specified: usize,
}

impl PartialVersion {
    fn parse(operand: &str, constraint: &str) -> Result<Self> {
        let invalid = |reason: String| SwitchError::InvalidConstraint {
            constraint: constraint.to_string(),
            reason,
        };

        let operand = operand.strip_prefix('v').unwrap_or(operand);
        // Build metadata never participates in comparison
        let operand = operand.split('+').next().unwrap_or(operand);
        let (core, pre) = match operand.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (operand, None),
        };

        if core.is_empty() {
            return Err(invalid("missing version".to_string()));
        }

        let mut segments = [0u64; 3];
        let mut specified = 0;
        for part in core.split('.') {
            if specified == segments.len() {
                return Err(invalid(format!("too many segments in {:?}", operand)));
            }
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid(format!("{:?} is not a numeric segment", part)));
            }
            segments[specified] = part
                .parse()
                .map_err(|_| invalid(format!("segment {:?} is out of range", part)))?;
            specified += 1;
        }

        let mut version = Version::new(segments[0], segments[1], segments[2]);
        if let Some(pre) = pre {
            version.pre = Prerelease::new(pre)
                .map_err(|e| invalid(format!("bad pre-release {:?}: {}", pre, e)))?;
        }

        Ok(Self { version, specified })
    }
}

/// One `<operator> <version>` clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparator {
    op: Operator,
    operand: PartialVersion,
}

impl Comparator {
    pub fn operator(&self) -> Operator {
        self.op
    }

    pub fn matches(&self, version: &Version) -> bool {
        let c = &self.operand.version;
        match self.op {
            Operator::Equal => version.cmp_precedence(c) == Ordering::Equal,
            Operator::NotEqual => version.cmp_precedence(c) != Ordering::Equal,
            Operator::Greater => {
                prerelease_allowed(version, c) && version.cmp_precedence(c) == Ordering::Greater
            }
            Operator::GreaterEqual => {
                prerelease_allowed(version, c) && version.cmp_precedence(c) != Ordering::Less
            }
            Operator::Less => {
                prerelease_allowed(version, c) && version.cmp_precedence(c) == Ordering::Less
            }
            Operator::LessEqual => {
                prerelease_allowed(version, c) && version.cmp_precedence(c) != Ordering::Greater
            }
            Operator::Pessimistic => self.matches_pessimistic(version),
        }
    }

    fn matches_pessimistic(&self, version: &Version) -> bool {
        let c = &self.operand.version;
        if !prerelease_allowed(version, c) || (!c.pre.is_empty() && version.pre.is_empty()) {
            return false;
        }
        if version.cmp_precedence(c) == Ordering::Less {
            return false;
        }

        let want = [c.major, c.minor, c.patch];
        let have = [version.major, version.minor, version.patch];
        // Every segment before the last written one is pinned
        let pinned = self.operand.specified.saturating_sub(1);
        want[..pinned] == have[..pinned]
    }
}

/// A pre-release version only satisfies a clause that names a pre-release of
/// the same release line.
fn prerelease_allowed(version: &Version, operand: &Version) -> bool {
    match (version.pre.is_empty(), operand.pre.is_empty()) {
        (false, false) => {
            version.major == operand.major
                && version.minor == operand.minor
                && version.patch == operand.patch
        }
        (false, true) => false,
        _ => true,
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op.as_str(), self.operand.version)
    }
}

/// A conjunction of comparator clauses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    clauses: Vec<Comparator>,
    original: String,
}

impl Constraint {
    /// Parse a comma-separated clause list
    pub fn parse(input: &str) -> Result<Self> {
        let original = input.trim().to_string();
        if original.is_empty() {
            return Err(SwitchError::InvalidConstraint {
                constraint: original,
                reason: "empty constraint".to_string(),
            });
        }

        let clauses = original
            .split(',')
            .map(|clause| {
                let clause = clause.trim();
                let (op, operand) = Operator::split(clause);
                let operand = PartialVersion::parse(operand.trim(), &original)?;
                Ok(Comparator { op, operand })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { clauses, original })
    }

    /// True when every clause accepts `version`
    pub fn matches(&self, version: &Version) -> bool {
        self.clauses.iter().all(|c| c.matches(version))
    }

    /// Convenience wrapper for string versions; unparseable input never matches
    pub fn matches_str(&self, version: &str) -> bool {
        Version::parse(version).is_ok_and(|v| self.matches(&v))
    }

    pub fn clauses(&self) -> &[Comparator] {
        &self.clauses
    }

    pub fn as_str(&self) -> &str {
        &self.original
    }
}

impl std::str::FromStr for Constraint {
    type Err = SwitchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

/// What a configuration source asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRequest {
    /// A concrete, install-ready version
    Exact(String),
    /// A range to resolve against the catalog
    Constraint(Constraint),
}

impl VersionRequest {
    /// Interpret a raw version token
    ///
    /// Tokens that start with an operator or contain a comma are constraints;
    /// anything else must pass the strict version check.
    pub fn parse(raw: &str, origin: &str) -> Result<Self> {
        let raw = raw.trim();
        if is_valid_version(raw) {
            return Ok(Self::Exact(raw.to_string()));
        }
        if looks_like_constraint(raw) {
            return Constraint::parse(raw).map(Self::Constraint);
        }
        Err(SwitchError::InvalidVersion {
            version: raw.to_string(),
            origin: origin.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Exact(v) => v,
            Self::Constraint(c) => c.as_str(),
        }
    }
}

impl fmt::Display for VersionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn looks_like_constraint(raw: &str) -> bool {
    raw.contains(',') || raw.starts_with(['=', '!', '>', '<', '~'])
}
