// SPDX-License-Identifier: AGPL-3.0-or-later

//! C4: region selector (`spec.md` §4.4).
//!
//! Resolves the open question in `spec.md` §9 ("Route-table ambiguity")
//! as option (b): the table is sorted once at load time — range entries
//! ascending by lower bound, prefix entries descending by length — and two
//! prefix entries where one is a prefix of the other are rejected as a
//! `RouterError::Configuration` at load time. First-match on the sorted
//! table is then a well-defined, order-independent contract.

use crate::error::RouterError;

#[derive(Debug, Clone)]
enum RouteKey {
    Prefix(String),
    Range { lo: String, hi: String, width: usize },
}

#[derive(Debug, Clone)]
struct RouteEntry {
    key: RouteKey,
    region: String,
}

/// The compiled, load-time-validated BIN route table.
#[derive(Debug, Clone)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
    default_region: String,
}

impl RouteTable {
    /// Builds a table from `(key, region)` pairs as they appear in
    /// configuration (`spec.md` §4.4: a key is either a bare prefix, or a
    /// `lo-hi` range). Validates and sorts at construction time so that
    /// `resolve` is a pure first-match scan with no ambiguity.
    pub fn build(
        raw_routes: impl IntoIterator<Item = (String, String)>,
        default_region: impl Into<String>,
    ) -> Result<Self, RouterError> {
        let mut entries = Vec::new();
        for (raw_key, region) in raw_routes {
            let key = parse_key(&raw_key)?;
            entries.push(RouteEntry { key, region });
        }

        reject_overlapping_prefixes(&entries)?;
        sort_entries(&mut entries);

        Ok(Self {
            entries,
            default_region: default_region.into(),
        })
    }

    /// `spec.md` §4.4 algorithm: `pan` shorter than 6 characters routes to
    /// `default_region`; otherwise match the 6-digit BIN against the
    /// sorted table, falling back to `default_region` on no match.
    pub fn resolve(&self, pan: &str) -> &str {
        if pan.len() < 6 {
            return &self.default_region;
        }
        let bin = &pan[..6];
        for entry in &self.entries {
            if key_matches(&entry.key, bin) {
                return &entry.region;
            }
        }
        &self.default_region
    }

    pub fn default_region(&self) -> &str {
        &self.default_region
    }
}

fn parse_key(raw: &str) -> Result<RouteKey, RouterError> {
    match raw.split_once('-') {
        Some((lo, hi)) if !lo.is_empty() && !hi.is_empty() => {
            if lo.len() != hi.len() {
                return Err(RouterError::configuration(format!(
                    "route range {raw:?}: lo/hi width mismatch"
                )));
            }
            let width = lo.len();
            if lo > hi {
                return Err(RouterError::configuration(format!(
                    "route range {raw:?}: lo > hi"
                )));
            }
            Ok(RouteKey::Range {
                lo: lo.to_string(),
                hi: hi.to_string(),
                width,
            })
        },
        _ => Ok(RouteKey::Prefix(raw.to_string())),
    }
}

fn key_matches(key: &RouteKey, bin: &str) -> bool {
    match key {
        RouteKey::Prefix(prefix) => bin.starts_with(prefix.as_str()),
        RouteKey::Range { lo, hi, width } => {
            let Some(candidate) = bin.get(..*width) else {
                return false;
            };
            // Lexicographic comparison on equal-width numeric strings is
            // equivalent to numeric comparison.
            candidate >= lo.as_str() && candidate <= hi.as_str()
        },
    }
}

/// Two prefix entries where one is a prefix of the other are ambiguous
/// under any traversal order; reject at load time rather than let runtime
/// order decide which wins (`spec.md` §9).
fn reject_overlapping_prefixes(entries: &[RouteEntry]) -> Result<(), RouterError> {
    for (i, a) in entries.iter().enumerate() {
        let RouteKey::Prefix(a_prefix) = &a.key else {
            continue;
        };
        for b in entries.iter().skip(i + 1) {
            let RouteKey::Prefix(b_prefix) = &b.key else {
                continue;
            };
            if a_prefix.starts_with(b_prefix.as_str()) || b_prefix.starts_with(a_prefix.as_str()) {
                return Err(RouterError::configuration(format!(
                    "overlapping route prefixes {a_prefix:?} and {b_prefix:?}"
                )));
            }
        }
    }
    Ok(())
}

/// Ranges first (ascending lower bound), then prefixes (descending
/// length) so that a longer, more specific prefix is tried before a
/// shorter one — `reject_overlapping_prefixes` already guarantees no two
/// prefixes both match the same BIN, so this ordering only matters for
/// prefix-vs-range precedence, which configuration authors control by not
/// mixing the two for the same BIN space (`spec.md` §4.4).
fn sort_entries(entries: &mut [RouteEntry]) {
    entries.sort_by(|a, b| match (&a.key, &b.key) {
        (RouteKey::Range { lo: lo_a, .. }, RouteKey::Range { lo: lo_b, .. }) => lo_a.cmp(lo_b),
        (RouteKey::Range { .. }, RouteKey::Prefix(_)) => std::cmp::Ordering::Less,
        (RouteKey::Prefix(_), RouteKey::Range { .. }) => std::cmp::Ordering::Greater,
        (RouteKey::Prefix(p_a), RouteKey::Prefix(p_b)) => p_b.len().cmp(&p_a.len()),
    });
}
