//! Source collection over parsed pages
//!
//! Pure functions from a parsed document to the ordered list of image
//! references that match the harvest pattern. Nothing here touches the
//! network; the tab worker hands in the document and the page URL.

use std::collections::HashSet;
use std::fmt;

use scraper::{Html, Selector};
use serde::Serialize;
use url::Url;

/// A resolved, absolute reference to one image resource.
///
/// The string form is the deduplication key: two descriptors are the
/// same image exactly when their strings are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SourceDescriptor(String);

impl SourceDescriptor {
    pub fn new(url: impl Into<String>) -> Self {
        SourceDescriptor(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What counts as a harvestable image: the alt text must start with
/// the prefix. An empty prefix accepts any labeled image; elements
/// without an alt attribute never match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourcePattern {
    prefix: String,
}

impl SourcePattern {
    pub fn alt_prefix(prefix: impl Into<String>) -> Self {
        SourcePattern {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn matches(&self, alt: &str) -> bool {
        alt.starts_with(&self.prefix)
    }
}

/// Collect matching image references from a parsed page, in document
/// order, resolved against `base`. Duplicates are kept; dedup is a
/// separate stage. `limit` caps the matched list, like the page cap in
/// single-page harvests.
pub fn collect_sources(
    document: &Html,
    base: &Url,
    pattern: &SourcePattern,
    limit: Option<usize>,
) -> Vec<SourceDescriptor> {
    let img_sel = Selector::parse("img").unwrap();
    let mut out = Vec::new();

    for img in document.select(&img_sel) {
        let matched = img
            .value()
            .attr("alt")
            .map(|alt| pattern.matches(alt))
            .unwrap_or(false);
        if !matched {
            continue;
        }
        if let Some(raw) = best_candidate(
            img.value().attr("src"),
            img.value().attr("srcset"),
        ) {
            if let Ok(resolved) = base.join(raw) {
                out.push(SourceDescriptor::new(resolved.to_string()));
            } else {
                log::debug!("skipping unresolvable image reference {:?}", raw);
            }
        }
        if let Some(cap) = limit {
            if out.len() >= cap {
                break;
            }
        }
    }

    out
}

/// Pick the reference a browser would have settled on: the widest
/// srcset candidate when one is declared, otherwise the plain src.
fn best_candidate<'a>(src: Option<&'a str>, srcset: Option<&'a str>) -> Option<&'a str> {
    if let Some(set) = srcset {
        if let Some(url) = best_srcset_candidate(set) {
            return Some(url);
        }
    }
    src.filter(|s| !s.is_empty())
}

/// Largest candidate from a srcset attribute. Width descriptors (`w`)
/// and density descriptors (`x`) are never mixed in valid markup, so
/// candidates are compared within whatever kind the page used; a bare
/// candidate counts as 1x.
fn best_srcset_candidate(srcset: &str) -> Option<&str> {
    let mut best: Option<(&str, f64)> = None;
    for candidate in srcset.split(',') {
        let mut parts = candidate.split_whitespace();
        let url = match parts.next() {
            Some(u) if !u.is_empty() => u,
            _ => continue,
        };
        let score = match parts.next() {
            Some(d) if d.ends_with('w') => d[..d.len() - 1].parse::<f64>().unwrap_or(0.0),
            Some(d) if d.ends_with('x') => d[..d.len() - 1].parse::<f64>().unwrap_or(0.0),
            _ => 1.0,
        };
        match best {
            Some((_, s)) if s >= score => {}
            _ => best = Some((url, score)),
        }
    }
    best.map(|(url, _)| url)
}

/// Drop duplicate descriptors, keeping the first occurrence of each.
pub fn dedup_first_seen(descriptors: Vec<SourceDescriptor>) -> Vec<SourceDescriptor> {
    let mut seen = HashSet::new();
    let mut out = descriptors;
    out.retain(|d| seen.insert(d.clone()));
    out
}

/// Merge two collections in visit order (primary first), dropping
/// anything the primary page already produced.
pub fn merge_ordered(
    primary: Vec<SourceDescriptor>,
    secondary: Vec<SourceDescriptor>,
) -> Vec<SourceDescriptor> {
    let mut combined = primary;
    combined.extend(secondary);
    dedup_first_seen(combined)
}
