//! Page hosting backends
//!
//! A page host owns at most one loaded page at a time: it navigates,
//! keeps the parsed document, and answers collection queries against
//! it. Hosts are not required to be `Send`; the tab worker keeps each
//! host on its own thread and talks to it over channels.

use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::cookie::Jar;
use scraper::Html;
use url::Url;

use crate::collect::{self, SourceDescriptor, SourcePattern};
use crate::config::HarvestConfig;
use crate::error::{Error, Result};

/// Core trait for page hosting backends
pub trait PageHost {
    /// Navigate to a URL, blocking until the page is ready. On return
    /// the host's document reflects the new page.
    fn navigate(&mut self, url: &Url) -> Result<()>;

    /// URL of the currently loaded page, after redirects
    fn current_url(&self) -> Option<&Url>;

    /// Collect matching image references from the loaded page
    fn collect(
        &self,
        pattern: &SourcePattern,
        limit: Option<usize>,
    ) -> Result<Vec<SourceDescriptor>>;
}

/// HTTP-backed host: fetches pages with a cookie-carrying client and
/// parses them without running any page scripts.
pub struct HttpHost {
    client: Client,
    user_agent: String,
    document: Option<Html>,
    url: Option<Url>,
}

impl HttpHost {
    /// Build a host around a shared cookie jar, so image fetches made
    /// elsewhere ride on the same session the pages established.
    pub fn new(config: &HarvestConfig, jar: Arc<Jar>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .cookie_provider(jar)
            .build()
            .map_err(|e| {
                Error::InitializationError(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
            document: None,
            url: None,
        })
    }
}

impl PageHost for HttpHost {
    fn navigate(&mut self, url: &Url) -> Result<()> {
        let res = self
            .client
            .get(url.clone())
            .header("User-Agent", self.user_agent.clone())
            .send()
            .map_err(|e| Error::NavigationError(format!("HTTP GET failed: {}", e)))?
            .error_for_status()
            .map_err(|e| Error::NavigationError(format!("Page responded with an error: {}", e)))?;

        // Redirects may have moved us; keep the URL we ended up on
        let final_url = res.url().clone();
        let body = res
            .text()
            .map_err(|e| Error::NavigationError(format!("Failed to read response body: {}", e)))?;

        self.document = Some(Html::parse_document(&body));
        self.url = Some(final_url);
        Ok(())
    }

    fn current_url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    fn collect(
        &self,
        pattern: &SourcePattern,
        limit: Option<usize>,
    ) -> Result<Vec<SourceDescriptor>> {
        let document = self
            .document
            .as_ref()
            .ok_or_else(|| Error::NavigationError("No page loaded".into()))?;
        let base = self
            .url
            .as_ref()
            .ok_or_else(|| Error::NavigationError("No page loaded".into()))?;
        Ok(collect::collect_sources(document, base, pattern, limit))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn serve_once(html: &'static str) -> String {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr();
        std::thread::spawn(move || {
            if let Ok(request) = server.recv() {
                let response = tiny_http::Response::from_string(html);
                let _ = request.respond(response);
            }
        });
        format!("http://{}/", addr)
    }

    #[test]
    fn http_host_navigates_and_collects() {
        let url = serve_once(
            r#"<html><body>
                <img alt="Plate #1" src="/tiles/a.png">
                <img alt="other" src="/skip.png">
            </body></html>"#,
        );

        let mut host =
            HttpHost::new(&HarvestConfig::default(), Arc::new(Jar::default())).unwrap();
        host.navigate(&Url::parse(&url).unwrap()).unwrap();

        assert_eq!(host.current_url().unwrap().as_str(), url);
        let found = host
            .collect(&SourcePattern::alt_prefix("Plate #"), None)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].as_str().ends_with("/tiles/a.png"));
    }

    #[test]
    fn collect_before_navigate_is_an_error() {
        let host = HttpHost::new(&HarvestConfig::default(), Arc::new(Jar::default())).unwrap();
        let err = host.collect(&SourcePattern::default(), None).unwrap_err();
        assert!(matches!(err, Error::NavigationError(_)));
    }

    #[test]
    fn navigate_to_unreachable_host_fails() {
        // bind then drop to find a port nothing listens on
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = HarvestConfig {
            request_timeout_ms: 2000,
            ..Default::default()
        };
        let mut host = HttpHost::new(&config, Arc::new(Jar::default())).unwrap();
        let err = host
            .navigate(&Url::parse(&format!("http://127.0.0.1:{}/", port)).unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::NavigationError(_)));
    }
}
