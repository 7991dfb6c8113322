//! Minimal harvest example run against a bundled demo gallery
//!
//! cargo run --example stitch_demo

use anyhow::Result;
use image::{Rgba, RgbaImage};
use pagestitch::rendering::raster::encode_png;
use pagestitch::{HarvestConfig, Harvester, SourcePattern, Targets};

const GALLERY_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>Demo Gallery</title></head>
<body>
<img alt="Nav icon" src="/img/icon.png">
<img alt="Figure 1: red" src="/img/red.png">
<img alt="Figure 2: green" src="/img/green.png">
<img alt="Figure 3: blue" src="/img/blue.png">
<img alt="Figure 1: red" src="/img/red.png">
</body>
</html>"#;

fn plate(w: u32, h: u32, px: [u8; 4]) -> Result<Vec<u8>> {
    Ok(encode_png(&RgbaImage::from_pixel(w, h, Rgba(px)))?)
}

fn header(raw: &str) -> tiny_http::Header {
    raw.parse::<tiny_http::Header>().unwrap()
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    println!("Pagestitch - Demo Gallery Harvest\n");

    let red = plate(96, 96, [220, 60, 60, 255])?;
    let green = plate(64, 96, [60, 180, 90, 255])?;
    let blue = plate(96, 64, [70, 90, 220, 255])?;
    let icon = plate(16, 16, [120, 120, 120, 255])?;

    // Use a tiny HTTP server to provide deterministic content for the example
    let server = tiny_http::Server::http("0.0.0.0:0").unwrap();
    let addr = server.server_addr();

    std::thread::spawn(move || {
        for request in server.incoming_requests() {
            let response = match request.url() {
                "/" => tiny_http::Response::from_string(GALLERY_HTML)
                    .with_header(header("Content-Type: text/html; charset=utf-8")),
                "/img/red.png" => tiny_http::Response::from_data(red.clone())
                    .with_header(header("Content-Type: image/png")),
                "/img/green.png" => tiny_http::Response::from_data(green.clone())
                    .with_header(header("Content-Type: image/png")),
                "/img/blue.png" => tiny_http::Response::from_data(blue.clone())
                    .with_header(header("Content-Type: image/png")),
                "/img/icon.png" => tiny_http::Response::from_data(icon.clone())
                    .with_header(header("Content-Type: image/png")),
                _ => tiny_http::Response::from_string("Not Found").with_status_code(404),
            };
            let _ = request.respond(response);
        }
    });

    let url = format!("http://{}", addr);
    let config = HarvestConfig {
        pattern: SourcePattern::alt_prefix("Figure"),
        settle_ms: 0,
        ..Default::default()
    };
    let targets = Targets::parse(&url, None)?;

    println!("Loading: {}", url);
    let mut harvester = Harvester::open(config, targets).await?;
    let outcome = harvester.run().await?;
    harvester.close().await?;

    println!(
        "Harvest:\n  matched: {}\n  unique: {}\n  loaded: {}\n  artifact: {}\n",
        outcome.summary.collected,
        outcome.summary.unique,
        outcome.summary.loaded,
        outcome.summary.artifact_filename
    );

    let path = outcome.artifact.write_to(&std::env::temp_dir())?;
    println!("Wrote {} ({} bytes)", path.display(), outcome.artifact.bytes.len());
    println!("Done.");

    Ok(())
}
