//! Pagestitch
//!
//! Harvests labeled images from one or two pages of a site and
//! stitches them into a single contact-sheet PNG. A harvest visits the
//! target page(s) in a worker-backed tab, collects every `<img>` whose
//! alt text carries the configured prefix, loads the unique references
//! concurrently, and composes them into a grid of uniform square
//! cells.
//!
//! # Example
//!
//! ```no_run
//! use pagestitch::{HarvestConfig, Harvester, SourcePattern, Targets};
//!
//! # #[tokio::main]
//! # async fn main() -> pagestitch::Result<()> {
//! let config = HarvestConfig {
//!     pattern: SourcePattern::alt_prefix("Plate #"),
//!     ..Default::default()
//! };
//! let targets = Targets::parse("https://gallery.example/wall", None)?;
//!
//! let mut harvester = Harvester::open(config, targets).await?;
//! let outcome = harvester.run().await?;
//! outcome.artifact.write_to(std::path::Path::new("."))?;
//! println!("wrote {}", outcome.summary.artifact_filename);
//! # harvester.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod collect;
pub mod config;
pub mod harvest;
pub mod host;
pub mod loader;
pub mod rendering;
pub mod site;
pub mod tab;

// Re-export the working set at the crate root for ergonomic use
pub use collect::{SourceDescriptor, SourcePattern};
pub use config::{HarvestConfig, PreferenceStore, Preferences};
pub use harvest::{HarvestOutcome, HarvestSummary, Harvester, Phase};
pub use loader::{Fetcher, LoadedImage};
pub use rendering::{Artifact, FitMode, LayoutMode, StitchOptions};
pub use site::{HarvestScope, Targets};
pub use tab::{ReadySignal, Tab};
