use std::path::PathBuf;

use clap::Parser;

use pagestitch::{
    Error, HarvestConfig, Harvester, LayoutMode, PreferenceStore, Preferences, Result,
    SourcePattern, Targets,
};

#[derive(Parser)]
#[command(name = "pagestitch")]
#[command(about = "Stitch labeled images from a page (or two) into one PNG")]
#[command(version)]
struct Cli {
    /// URL of the page to harvest
    page: String,

    /// Second page of the same site to harvest and merge
    #[arg(long, value_name = "URL")]
    second_page: Option<String>,

    /// Alt-text prefix a harvested image must carry; the default
    /// accepts any labeled image
    #[arg(short, long, default_value = "")]
    prefix: String,

    /// Grid shape: "tight" or "square" (remembered for later runs)
    #[arg(short, long)]
    layout: Option<LayoutMode>,

    /// Directory the stitched PNG is written into
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// Count matching images on the page and exit without stitching
    #[arg(long)]
    probe: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,

    /// Preference file location
    #[arg(long, value_name = "FILE")]
    prefs: Option<PathBuf>,

    /// Cap on the merged reference list in dual-page runs
    #[arg(long, value_name = "N")]
    max_merged: Option<usize>,

    /// Settle delay before single-page collection, in milliseconds
    #[arg(long, value_name = "MS")]
    settle_ms: Option<u64>,

    /// Navigation timeout in milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("pagestitch: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let store = PreferenceStore::at(
        cli.prefs
            .clone()
            .unwrap_or_else(PreferenceStore::default_path),
    );

    // An explicit layout choice wins and is persisted; otherwise the
    // stored preference applies.
    let layout = match cli.layout {
        Some(choice) => {
            let prefs = Preferences {
                layout: Some(choice),
            };
            if let Err(e) = store.save(&prefs) {
                log::warn!("could not persist layout preference: {}", e);
            }
            choice
        }
        None => store.load().layout.unwrap_or_default(),
    };

    let mut config = HarvestConfig {
        pattern: SourcePattern::alt_prefix(cli.prefix.clone()),
        layout,
        ..Default::default()
    };
    if let Some(n) = cli.max_merged {
        config.max_merged_sources = n;
    }
    if let Some(ms) = cli.settle_ms {
        config.settle_ms = ms;
    }
    if let Some(ms) = cli.timeout_ms {
        config.navigation_timeout_ms = ms;
    }

    let targets = Targets::parse(&cli.page, cli.second_page.as_deref())?;
    let mut harvester = Harvester::open(config, targets).await?;

    if cli.probe {
        let count = harvester.probe().await?;
        harvester.close().await?;
        if cli.json {
            println!("{}", serde_json::json!({ "matches": count }));
        } else {
            println!(
                "{} matching image{}",
                count,
                if count == 1 { "" } else { "s" }
            );
        }
        return Ok(());
    }

    let outcome = harvester.run().await;
    harvester.close().await?;
    let outcome = outcome?;

    std::fs::create_dir_all(&cli.out)?;
    let path = outcome.artifact.write_to(&cli.out)?;

    if cli.json {
        let body = serde_json::to_string_pretty(&outcome.summary)
            .map_err(|e| Error::EncodeError(e.to_string()))?;
        println!("{}", body);
    } else {
        println!(
            "{} ({} images, {} bytes) -> {}",
            outcome.summary.artifact_filename,
            outcome.summary.loaded,
            outcome.summary.artifact_bytes,
            path.display()
        );
    }
    Ok(())
}
