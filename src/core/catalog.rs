//! Release catalog: the list of versions a mirror publishes
//!
//! Mirrors serve an HTML directory listing. Anything that looks like
//! `/<major>.<minor>.<patch>[-<pre>]/` on a line is taken as a release.

use super::error::{Result, SwitchError};
use super::version::Release;
use crate::helpers::acquire::MirrorTransport;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn index_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"/(\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?)/").expect("index pattern is valid")
    })
}

/// Extract releases from an index page
///
/// Tokens are deduplicated by exact string and kept in page order.
/// Pre-releases are dropped unless `include_prereleases` is set.
pub fn parse_index(body: &str, include_prereleases: bool) -> Vec<Release> {
    let mut seen = HashSet::new();
    let mut releases = Vec::new();

    for caps in body.lines().flat_map(|line| index_pattern().captures_iter(line)) {
        let token = &caps[1];
        if !seen.insert(token.to_string()) {
            continue;
        }
        match Release::parse(token) {
            Some(release) if include_prereleases || !release.is_prerelease() => {
                releases.push(release)
            }
            Some(_) => {}
            None => tracing::trace!(token, "skipping unparseable index entry"),
        }
    }

    releases
}

/// Index URL for a mirror, always ending in `/`
pub fn index_url(mirror_url: &str) -> String {
    if mirror_url.ends_with('/') {
        mirror_url.to_string()
    } else {
        format!("{}/", mirror_url)
    }
}

/// Fetch and parse the catalog for a mirror
pub fn list_releases(
    transport: &dyn MirrorTransport,
    mirror_url: &str,
    include_prereleases: bool,
) -> Result<Vec<Release>> {
    let url = index_url(mirror_url);
    let body = transport.fetch_text(&url)?;
    let releases = parse_index(&body, include_prereleases);

    if releases.is_empty() {
        return Err(SwitchError::EmptyCatalog { url });
    }

    tracing::debug!(url = %url, count = releases.len(), "loaded release catalog");
    Ok(releases)
}
