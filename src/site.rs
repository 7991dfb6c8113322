//! Harvest targets and site predicates
//!
//! A harvest run visits one or two pages that must belong to the same
//! site. "Same site" is judged on the URL origin (scheme, host, port),
//! never on string prefixes, so `https://example.com` and
//! `https://example.com.evil.net` are not confused.

use url::Url;

use crate::error::{Error, Result};

/// How many pages a harvest visits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestScope {
    /// One page
    Single,
    /// Two pages of the same site, merged in visit order
    Dual,
}

impl HarvestScope {
    /// Label used in artifact filenames
    pub fn label(self) -> &'static str {
        match self {
            HarvestScope::Single => "single",
            HarvestScope::Dual => "dual",
        }
    }
}

/// The page (or ordered pair of pages) a harvest run visits
#[derive(Debug, Clone)]
pub struct Targets {
    primary: Url,
    secondary: Option<Url>,
}

impl Targets {
    /// Single-page harvest
    pub fn single(primary: Url) -> Self {
        Targets {
            primary,
            secondary: None,
        }
    }

    /// Dual-page harvest; both pages must share an origin
    pub fn dual(primary: Url, secondary: Url) -> Result<Self> {
        if !same_origin(&primary, &secondary) {
            return Err(Error::ConfigError(format!(
                "secondary page {} is not on the same site as {}",
                secondary, primary
            )));
        }
        Ok(Targets {
            primary,
            secondary: Some(secondary),
        })
    }

    /// Parse targets from raw strings (CLI entry point)
    pub fn parse(primary: &str, secondary: Option<&str>) -> Result<Self> {
        let primary = parse_page_url(primary)?;
        match secondary {
            Some(raw) => {
                let secondary = parse_page_url(raw)?;
                Targets::dual(primary, secondary)
            }
            None => Ok(Targets::single(primary)),
        }
    }

    pub fn primary(&self) -> &Url {
        &self.primary
    }

    pub fn secondary(&self) -> Option<&Url> {
        self.secondary.as_ref()
    }

    pub fn scope(&self) -> HarvestScope {
        if self.secondary.is_some() {
            HarvestScope::Dual
        } else {
            HarvestScope::Single
        }
    }

    /// Whether `url` belongs to the harvested site
    pub fn on_site(&self, url: &Url) -> bool {
        same_origin(&self.primary, url)
    }

    /// Whether `url` is one of the target pages (query and fragment ignored)
    pub fn is_target(&self, url: &Url) -> bool {
        same_page(&self.primary, url)
            || self
                .secondary
                .as_ref()
                .map(|s| same_page(s, url))
                .unwrap_or(false)
    }
}

/// Origin equality: scheme + host + port
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}

fn same_page(a: &Url, b: &Url) -> bool {
    same_origin(a, b) && a.path() == b.path()
}

fn parse_page_url(raw: &str) -> Result<Url> {
    let url =
        Url::parse(raw).map_err(|e| Error::ConfigError(format!("invalid URL {:?}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::ConfigError(format!(
            "unsupported scheme {:?} in {:?}",
            other, raw
        ))),
    }
}
