//! Image loading
//!
//! Fetches collected references and decodes them into pixel buffers.
//! Loads run concurrently up to a bound, but results come back in
//! collection order so the grid never depends on network timing.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use futures::stream::{self, StreamExt};
use image::RgbaImage;
use reqwest::cookie::Jar;

use crate::collect::SourceDescriptor;
use crate::config::HarvestConfig;
use crate::error::{Error, Result};

/// A successfully fetched and decoded image
pub struct LoadedImage {
    pub descriptor: SourceDescriptor,
    pub pixels: RgbaImage,
}

impl LoadedImage {
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

/// Async image fetcher. Shares the tab's cookie jar when given one,
/// so protected images load with the session the page established.
pub struct Fetcher {
    client: reqwest::Client,
    user_agent: String,
}

impl Fetcher {
    pub fn new(config: &HarvestConfig, jar: Option<Arc<Jar>>) -> Result<Self> {
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_millis(config.request_timeout_ms));
        if let Some(jar) = jar {
            builder = builder.cookie_provider(jar);
        }
        let client = builder.build().map_err(|e| {
            Error::InitializationError(format!("Failed to build HTTP client: {}", e))
        })?;
        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
        })
    }

    /// Fetch the raw bytes behind a descriptor. `data:` URIs decode
    /// locally without touching the network.
    pub async fn fetch(&self, descriptor: &SourceDescriptor) -> Result<Vec<u8>> {
        if let Some(rest) = descriptor.as_str().strip_prefix("data:") {
            return decode_data_uri(rest);
        }

        let res = self
            .client
            .get(descriptor.as_str())
            .header("User-Agent", self.user_agent.clone())
            .send()
            .await
            .map_err(|e| Error::FetchError(format!("{}: {}", descriptor, e)))?
            .error_for_status()
            .map_err(|e| Error::FetchError(format!("{}: {}", descriptor, e)))?;

        let bytes = res
            .bytes()
            .await
            .map_err(|e| Error::FetchError(format!("{}: {}", descriptor, e)))?;
        Ok(bytes.to_vec())
    }
}

fn decode_data_uri(rest: &str) -> Result<Vec<u8>> {
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::FetchError("malformed data: URI".into()))?;
    if meta.ends_with(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| Error::FetchError(format!("invalid base64 in data: URI: {}", e)))
    } else {
        Err(Error::FetchError(
            "unsupported data: URI encoding (expected base64)".into(),
        ))
    }
}

/// Decode fetched bytes into RGBA pixels, sniffing the format
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| Error::DecodeError(e.to_string()))?;
    let pixels = decoded.to_rgba8();
    if pixels.width() == 0 || pixels.height() == 0 {
        return Err(Error::DecodeError("decoded image has zero area".into()));
    }
    Ok(pixels)
}

async fn load_one(fetcher: &Fetcher, descriptor: &SourceDescriptor) -> Result<LoadedImage> {
    let bytes = fetcher.fetch(descriptor).await?;
    // decoding is CPU work; keep it off the async threads
    let pixels = tokio::task::spawn_blocking(move || decode_image(&bytes))
        .await
        .map_err(|e| Error::DecodeError(format!("decode task failed: {}", e)))??;
    Ok(LoadedImage {
        descriptor: descriptor.clone(),
        pixels,
    })
}

/// Load every descriptor with up to `concurrency` fetches in flight.
/// The result vector lines up with the input: one entry per
/// descriptor, in order, each carrying its own success or failure.
pub async fn load_images(
    fetcher: &Fetcher,
    descriptors: &[SourceDescriptor],
    concurrency: usize,
) -> Vec<(SourceDescriptor, Result<LoadedImage>)> {
    let concurrency = concurrency.max(1);
    stream::iter(descriptors.to_vec())
        .map(|descriptor| async move {
            let result = load_one(fetcher, &descriptor).await;
            (descriptor, result)
        })
        .buffered(concurrency)
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn png_data_uri(px: Rgba<u8>) -> String {
        let img = RgbaImage::from_pixel(1, 1, px);
        let bytes = crate::rendering::raster::encode_png(&img).unwrap();
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes)
        )
    }

    fn fetcher() -> Fetcher {
        Fetcher::new(&HarvestConfig::default(), None).unwrap()
    }

    #[tokio::test]
    async fn data_uri_round_trips_without_a_network() {
        let uri = png_data_uri(Rgba([7, 8, 9, 255]));
        let bytes = fetcher()
            .fetch(&SourceDescriptor::new(uri))
            .await
            .unwrap();
        let pixels = decode_image(&bytes).unwrap();
        assert_eq!(pixels.dimensions(), (1, 1));
        assert_eq!(*pixels.get_pixel(0, 0), Rgba([7, 8, 9, 255]));
    }

    #[tokio::test]
    async fn malformed_data_uris_are_fetch_errors() {
        let cases = [
            "data:image/png;base64", // no comma
            "data:image/png;base64,!!!not-base64!!!",
            "data:text/plain,plain%20text", // not base64-encoded
        ];
        for case in cases {
            let err = fetcher()
                .fetch(&SourceDescriptor::new(case))
                .await
                .unwrap_err();
            assert!(matches!(err, Error::FetchError(_)), "case {:?}", case);
        }
    }

    #[test]
    fn garbage_bytes_are_decode_errors() {
        let err = decode_image(b"definitely not an image").unwrap_err();
        assert!(matches!(err, Error::DecodeError(_)));
    }

    #[tokio::test]
    async fn results_line_up_with_input_order() {
        let good_a = png_data_uri(Rgba([1, 0, 0, 255]));
        let bad = "data:image/png;base64,AAAA".to_string();
        let good_b = png_data_uri(Rgba([0, 1, 0, 255]));

        let descriptors: Vec<_> = [good_a.as_str(), bad.as_str(), good_b.as_str()]
            .iter()
            .map(|s| SourceDescriptor::new(*s))
            .collect();

        let results = load_images(&fetcher(), &descriptors, 4).await;
        assert_eq!(results.len(), 3);
        for (i, (descriptor, _)) in results.iter().enumerate() {
            assert_eq!(descriptor, &descriptors[i]);
        }
        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_err());
        assert!(results[2].1.is_ok());
    }

    #[tokio::test]
    async fn zero_concurrency_is_clamped_not_stuck() {
        let uri = png_data_uri(Rgba([3, 3, 3, 255]));
        let descriptors = vec![SourceDescriptor::new(uri)];
        let results = load_images(&fetcher(), &descriptors, 0).await;
        assert!(results[0].1.is_ok());
    }
}
