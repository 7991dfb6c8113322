//! Async tab facade
//!
//! The tab is the async face of a page host. A dedicated worker thread
//! owns the host (parsed documents are not `Send`) and executes
//! commands sent from async tasks, so callers get an async interface
//! without the host needing to cross threads.

use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use reqwest::cookie::Jar;
use tokio::sync::oneshot;
use url::Url;

use crate::collect::{SourceDescriptor, SourcePattern};
use crate::config::HarvestConfig;
use crate::error::{Error, Result};
use crate::host::{HttpHost, PageHost};

enum Command {
    Goto(Url, oneshot::Sender<Result<()>>),
    // navigation nobody waits for; failures are logged and dropped
    GotoDetached(Url),
    Collect {
        pattern: SourcePattern,
        limit: Option<usize>,
        resp: oneshot::Sender<Result<Vec<SourceDescriptor>>>,
    },
    CurrentUrl(oneshot::Sender<Option<Url>>),
    Close(oneshot::Sender<()>),
}

/// Resolves exactly once, when the navigation that produced it either
/// completes or fails. Waiting consumes the signal, so a stale signal
/// can never fire for a later navigation.
pub struct ReadySignal {
    rx: oneshot::Receiver<Result<()>>,
}

impl ReadySignal {
    /// Wait for the page to become ready, up to `timeout_ms`
    pub async fn wait(self, timeout_ms: u64) -> Result<()> {
        match tokio::time::timeout(Duration::from_millis(timeout_ms), self.rx).await {
            Err(_) => Err(Error::NavigationTimeout(timeout_ms)),
            Ok(Err(_)) => Err(Error::TabClosed("navigation reply dropped".into())),
            Ok(Ok(res)) => res,
        }
    }
}

/// A browsing context backed by a worker thread that owns the host
#[derive(Clone, Debug)]
pub struct Tab {
    cmd_tx: Sender<Command>,
    jar: Option<Arc<Jar>>,
}

impl Tab {
    /// Open a tab backed by an [`HttpHost`]. The returned tab exposes
    /// the host's cookie jar so image fetches can share the session.
    pub async fn open(config: &HarvestConfig) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let worker_jar = jar.clone();
        let config = config.clone();
        let mut tab = Self::with_host(move || HttpHost::new(&config, worker_jar)).await?;
        tab.jar = Some(jar);
        Ok(tab)
    }

    /// Open a tab around any host. The host is constructed on the
    /// worker thread, so it never needs to be `Send` itself.
    pub async fn with_host<H, F>(make_host: F) -> Result<Self>
    where
        H: PageHost + 'static,
        F: FnOnce() -> Result<H> + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx) = oneshot::channel::<Result<()>>();

        thread::spawn(move || {
            let mut host = match make_host() {
                Ok(h) => h,
                Err(err) => {
                    let _ = init_tx.send(Err(err));
                    return;
                }
            };
            let _ = init_tx.send(Ok(()));

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    Command::Goto(url, resp) => {
                        let _ = resp.send(host.navigate(&url));
                    }
                    Command::GotoDetached(url) => {
                        if let Err(e) = host.navigate(&url) {
                            log::debug!("detached navigation to {} failed: {}", url, e);
                        }
                    }
                    Command::Collect {
                        pattern,
                        limit,
                        resp,
                    } => {
                        let _ = resp.send(host.collect(&pattern, limit));
                    }
                    Command::CurrentUrl(resp) => {
                        let _ = resp.send(host.current_url().cloned());
                    }
                    Command::Close(resp) => {
                        let _ = resp.send(());
                        break;
                    }
                }
            }
        });

        let init_res = init_rx.await.map_err(|_| {
            Error::InitializationError("tab worker exited before reporting ready".into())
        })?;
        init_res?;

        Ok(Self {
            cmd_tx,
            jar: None,
        })
    }

    /// Cookie jar shared with the host, when the backend has one
    pub fn cookie_jar(&self) -> Option<Arc<Jar>> {
        self.jar.clone()
    }

    /// Start a navigation and hand back its ready signal. If the
    /// worker is gone the signal resolves to [`Error::TabClosed`].
    pub fn navigate(&self, url: &Url) -> ReadySignal {
        let (tx, rx) = oneshot::channel();
        // a failed send drops tx, which surfaces through the signal
        let _ = self.cmd_tx.send(Command::Goto(url.clone(), tx));
        ReadySignal { rx }
    }

    /// Fire-and-forget navigation, used to put a tab back where it
    /// was. Nothing observes the outcome.
    pub fn navigate_detached(&self, url: &Url) {
        if self.cmd_tx.send(Command::GotoDetached(url.clone())).is_err() {
            log::debug!("tab already closed; skipping detached navigation to {}", url);
        }
    }

    pub async fn collect(
        &self,
        pattern: &SourcePattern,
        limit: Option<usize>,
    ) -> Result<Vec<SourceDescriptor>> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Collect {
                pattern: pattern.clone(),
                limit,
                resp: tx,
            })
            .map_err(|_| Error::TabClosed("collect after close".into()))?;
        rx.await
            .map_err(|_| Error::TabClosed("collect reply dropped".into()))?
    }

    pub async fn current_url(&self) -> Result<Option<Url>> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::CurrentUrl(tx))
            .map_err(|_| Error::TabClosed("current_url after close".into()))?;
        rx.await
            .map_err(|_| Error::TabClosed("current_url reply dropped".into()))
    }

    /// Shut down the worker thread. Detached navigations queued before
    /// the close still run first.
    pub async fn close(self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        if self.cmd_tx.send(Command::Close(tx)).is_err() {
            return Ok(());
        }
        let _ = rx.await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::ScriptedHost;

    const PAGE: &str = "https://gallery.example/wall";

    fn wall_html() -> &'static str {
        r#"<img alt="Plate #1" src="/a.png"><img alt="Plate #2" src="/b.png">"#
    }

    #[tokio::test]
    async fn navigate_resolves_ready_and_collect_sees_the_page() {
        let host = ScriptedHost::new().page(PAGE, wall_html());
        let tab = Tab::with_host(move || Ok(host)).await.unwrap();

        let url = Url::parse(PAGE).unwrap();
        tab.navigate(&url).wait(1000).await.unwrap();

        assert_eq!(tab.current_url().await.unwrap(), Some(url));
        let found = tab
            .collect(&SourcePattern::alt_prefix("Plate #"), None)
            .await
            .unwrap();
        assert_eq!(found.len(), 2);

        tab.close().await.unwrap();
    }

    #[tokio::test]
    async fn failed_navigation_reports_through_the_signal() {
        let host = ScriptedHost::new().failing(PAGE, "boom");
        let tab = Tab::with_host(move || Ok(host)).await.unwrap();

        let err = tab
            .navigate(&Url::parse(PAGE).unwrap())
            .wait(1000)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NavigationError(_)));

        tab.close().await.unwrap();
    }

    #[tokio::test]
    async fn hung_navigation_times_out() {
        let host = ScriptedHost::new().hanging(PAGE);
        let tab = Tab::with_host(move || Ok(host)).await.unwrap();

        let err = tab
            .navigate(&Url::parse(PAGE).unwrap())
            .wait(50)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NavigationTimeout(50)));
        // worker stays parked; the tab handle is simply dropped
    }

    #[tokio::test]
    async fn detached_navigation_reaches_the_host() {
        let host = ScriptedHost::new().page(PAGE, wall_html());
        let visits = host.visits();
        let tab = Tab::with_host(move || Ok(host)).await.unwrap();

        tab.navigate_detached(&Url::parse(PAGE).unwrap());
        // Close acks after queued commands, so the visit is recorded
        tab.close().await.unwrap();

        assert_eq!(visits.lock().unwrap().as_slice(), [PAGE.to_string()]);
    }

    #[tokio::test]
    async fn fresh_tab_has_no_current_url() {
        let host = ScriptedHost::new();
        let tab = Tab::with_host(move || Ok(host)).await.unwrap();
        assert_eq!(tab.current_url().await.unwrap(), None);
        tab.close().await.unwrap();
    }

    #[tokio::test]
    async fn failing_host_constructor_surfaces_at_open() {
        let err = Tab::with_host(|| {
            Err::<ScriptedHost, _>(Error::InitializationError("no backend".into()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, Error::InitializationError(_)));
    }

    #[tokio::test]
    async fn operations_after_close_report_tab_closed() {
        let host = ScriptedHost::new().page(PAGE, wall_html());
        let tab = Tab::with_host(move || Ok(host)).await.unwrap();
        let clone = tab.clone();
        tab.close().await.unwrap();

        // give the worker a moment to exit its loop
        tokio::time::sleep(Duration::from_millis(50)).await;

        let err = clone
            .collect(&SourcePattern::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TabClosed(_)));
    }
}
