//! Constraint resolution against a release catalog

use super::error::{Result, SwitchError};
use super::version::{Constraint, Release, is_valid_version};

/// Which releases take part in resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    /// Final releases only
    Stable,
    /// Everything the mirror lists, pre-releases included
    All,
}

impl ListMode {
    pub fn includes_prereleases(self) -> bool {
        self == ListMode::All
    }
}

/// Pick the highest release satisfying `constraint`
///
/// With no constraint this is simply the highest release the mode admits.
/// Releases that fail the strict install syntax are never returned, even when
/// they satisfy every clause.
pub fn resolve<'a>(
    releases: &'a [Release],
    constraint: Option<&Constraint>,
    mode: ListMode,
) -> Result<&'a Release> {
    let mut candidates: Vec<&Release> = releases
        .iter()
        .filter(|r| mode.includes_prereleases() || !r.is_prerelease())
        .collect();
    candidates.sort_by(|a, b| b.cmp(a));
    candidates.dedup_by(|a, b| a.as_str() == b.as_str());

    let found = candidates.into_iter().find(|r| {
        constraint.is_none_or(|c| c.matches(r.version())) && is_valid_version(r.as_str())
    });

    match found {
        Some(release) => {
            tracing::debug!(
                version = release.as_str(),
                constraint = constraint.map(Constraint::as_str),
                "resolved version"
            );
            Ok(release)
        }
        None => Err(SwitchError::NoMatchingVersion {
            constraint: constraint
                .map(|c| c.as_str().to_string())
                .unwrap_or_else(|| "<any>".to_string()),
        }),
    }
}

/// Parse `constraint` and resolve it in one step
pub fn resolve_str<'a>(
    releases: &'a [Release],
    constraint: &str,
    mode: ListMode,
) -> Result<&'a Release> {
    let parsed = Constraint::parse(constraint)?;
    resolve(releases, Some(&parsed), mode)
}

/// Highest pre-release on the `major.minor` line named by `prefix`
///
/// `prefix` is `X.Y` or `X.Y.Z`; the match is on version segments, so `1.1`
/// never selects `1.10.0-beta1`.
pub fn latest_prerelease<'a>(releases: &'a [Release], prefix: &str) -> Result<&'a Release> {
    let wanted: Vec<&str> = prefix.trim().split('.').collect();
    let not_found = || SwitchError::NoMatchingVersion {
        constraint: format!("{}.* (pre-release)", prefix.trim()),
    };
    if wanted.len() < 2 || wanted.len() > 3 {
        return Err(not_found());
    }

    releases
        .iter()
        .filter(|r| r.is_prerelease() && is_valid_version(r.as_str()))
        .filter(|r| {
            let v = r.version();
            let segments = [v.major.to_string(), v.minor.to_string(), v.patch.to_string()];
            wanted.iter().zip(segments.iter()).all(|(w, s)| *w == s)
        })
        .max()
        .ok_or_else(not_found)
}
