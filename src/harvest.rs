//! The harvest state machine
//!
//! Drives one run end to end: navigate, collect, merge, load, stitch,
//! and put the tab back where it was. Every step is sequenced through
//! the same tab, and a run owns the harvester exclusively, so two runs
//! can never interleave on one tab.

use image::RgbaImage;
use serde::Serialize;

use crate::collect;
use crate::config::HarvestConfig;
use crate::error::{Error, Result};
use crate::loader::{self, Fetcher};
use crate::rendering::{self, Artifact, StitchOptions};
use crate::site::{HarvestScope, Targets};
use crate::tab::Tab;

/// Where a run currently is. Mostly useful in logs and for callers
/// that surface progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    NavigatePrimary,
    CollectPrimary,
    NavigateSecondary,
    CollectSecondary,
    Merge,
    Load,
    Compose,
    Restore,
    Done,
    Failed,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::NavigatePrimary => "navigate-primary",
            Phase::CollectPrimary => "collect-primary",
            Phase::NavigateSecondary => "navigate-secondary",
            Phase::CollectSecondary => "collect-secondary",
            Phase::Merge => "merge",
            Phase::Load => "load",
            Phase::Compose => "compose",
            Phase::Restore => "restore",
            Phase::Done => "done",
            Phase::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts and artifact facts from a finished run
#[derive(Debug, Clone, Serialize)]
pub struct HarvestSummary {
    pub scope: String,
    pub layout: String,
    pub pages_visited: usize,
    /// raw matches across all pages, before dedup
    pub collected: usize,
    /// after dedup and the merged-list cap
    pub unique: usize,
    /// dropped by the merged-list cap
    pub truncated: usize,
    pub loaded: usize,
    pub failed_loads: usize,
    pub artifact_filename: String,
    pub artifact_bytes: usize,
    pub artifact_sha256: String,
}

/// What a successful run hands back
#[derive(Debug)]
pub struct HarvestOutcome {
    pub artifact: Artifact,
    pub summary: HarvestSummary,
}

/// One tab, one fetcher, one run at a time
pub struct Harvester {
    config: HarvestConfig,
    targets: Targets,
    tab: Tab,
    fetcher: Fetcher,
    phase: Phase,
}

impl Harvester {
    /// Open a harvester with the HTTP host backend
    pub async fn open(config: HarvestConfig, targets: Targets) -> Result<Self> {
        let tab = Tab::open(&config).await?;
        let fetcher = Fetcher::new(&config, tab.cookie_jar())?;
        Ok(Self::from_parts(config, targets, tab, fetcher))
    }

    /// Assemble a harvester from an already-open tab and fetcher
    pub fn from_parts(config: HarvestConfig, targets: Targets, tab: Tab, fetcher: Fetcher) -> Self {
        Harvester {
            config,
            targets,
            tab,
            fetcher,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn targets(&self) -> &Targets {
        &self.targets
    }

    /// Navigate to the primary page and report how many images match,
    /// without loading or stitching anything.
    pub async fn probe(&mut self) -> Result<usize> {
        self.phase = Phase::NavigatePrimary;
        let ready = self.tab.navigate(self.targets.primary());
        ready.wait(self.config.navigation_timeout_ms).await?;

        self.phase = Phase::CollectPrimary;
        let found = self.tab.collect(&self.config.pattern, None).await?;
        self.phase = Phase::Idle;
        Ok(found.len())
    }

    /// Run one harvest end to end
    pub async fn run(&mut self) -> Result<HarvestOutcome> {
        match self.drive().await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                log::error!("harvest failed during {}: {}", self.phase, e);
                self.phase = Phase::Failed;
                Err(e)
            }
        }
    }

    async fn drive(&mut self) -> Result<HarvestOutcome> {
        let scope = self.targets.scope();
        // remember where the tab was so we can put it back afterwards
        let starting_url = self.tab.current_url().await?;

        self.phase = Phase::NavigatePrimary;
        log::info!("navigating to {}", self.targets.primary());
        let ready = self.tab.navigate(self.targets.primary());
        ready.wait(self.config.navigation_timeout_ms).await?;

        self.phase = Phase::CollectPrimary;
        let primary = match scope {
            HarvestScope::Single => {
                // let late-inserted images land before the sweep
                if self.config.settle_ms > 0 {
                    tokio::time::sleep(std::time::Duration::from_millis(self.config.settle_ms))
                        .await;
                }
                self.tab
                    .collect(&self.config.pattern, Some(self.config.max_page_sources))
                    .await?
            }
            HarvestScope::Dual => self.tab.collect(&self.config.pattern, None).await?,
        };
        log::info!("collected {} references from the primary page", primary.len());

        let secondary = match self.targets.secondary() {
            Some(url) => {
                self.phase = Phase::NavigateSecondary;
                log::info!("navigating to {}", url);
                let ready = self.tab.navigate(url);
                ready.wait(self.config.navigation_timeout_ms).await?;

                self.phase = Phase::CollectSecondary;
                let found = self.tab.collect(&self.config.pattern, None).await?;
                log::info!("collected {} references from the secondary page", found.len());
                found
            }
            None => Vec::new(),
        };

        self.phase = Phase::Merge;
        let collected = primary.len() + secondary.len();
        let mut unique = collect::merge_ordered(primary, secondary);
        let mut truncated = 0;
        if scope == HarvestScope::Dual && unique.len() > self.config.max_merged_sources {
            truncated = unique.len() - self.config.max_merged_sources;
            unique.truncate(self.config.max_merged_sources);
            log::warn!(
                "merged list capped at {} references ({} dropped)",
                self.config.max_merged_sources,
                truncated
            );
        }
        if unique.is_empty() {
            return Err(Error::NoImages(self.config.pattern.prefix().to_string()));
        }
        log::info!("{} unique references after merge", unique.len());

        self.phase = Phase::Load;
        let results =
            loader::load_images(&self.fetcher, &unique, self.config.load_concurrency).await;
        let mut images = Vec::new();
        let mut failed_loads = 0;
        for (descriptor, result) in results {
            match result {
                Ok(loaded) => images.push(loaded),
                Err(e) => {
                    failed_loads += 1;
                    log::warn!("skipping {}: {}", descriptor, e);
                }
            }
        }
        if images.is_empty() {
            return Err(Error::AllLoadsFailed(unique.len()));
        }
        let loaded = images.len();

        self.phase = Phase::Compose;
        let pixels: Vec<RgbaImage> = images.into_iter().map(|img| img.pixels).collect();
        let options = StitchOptions {
            mode: self.config.layout,
            fit: self.config.fit,
            padding: self.config.padding,
            background: self.config.background.clone(),
            scope,
        };
        let artifact = rendering::stitch(&pixels, &options)?;
        log::info!(
            "stitched {} images into {} ({} bytes)",
            loaded,
            artifact.filename,
            artifact.bytes.len()
        );

        self.phase = Phase::Restore;
        match starting_url {
            Some(url) if self.targets.on_site(&url) => {
                log::debug!("restoring tab to {}", url);
                self.tab.navigate_detached(&url);
            }
            Some(url) => {
                log::debug!("not restoring off-site page {}", url);
            }
            None => {}
        }

        self.phase = Phase::Done;
        let summary = HarvestSummary {
            scope: scope.label().to_string(),
            layout: self.config.layout.to_string(),
            pages_visited: match scope {
                HarvestScope::Single => 1,
                HarvestScope::Dual => 2,
            },
            collected,
            unique: unique.len(),
            truncated,
            loaded,
            failed_loads,
            artifact_filename: artifact.filename.clone(),
            artifact_bytes: artifact.bytes.len(),
            artifact_sha256: artifact.digest(),
        };
        Ok(HarvestOutcome { artifact, summary })
    }

    /// Close the underlying tab
    pub async fn close(self) -> Result<()> {
        self.tab.close().await
    }
}
