//! Loading the raw trip dataset.
//!
//! A source is either a local file or an `http(s)://` URL. Gzip-compressed
//! payloads are detected by their magic bytes and inflated transparently.

mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::io::Read;
use tracing::{debug, info};

use auth::UrlParam;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}

pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Inflates `bytes` if they carry a gzip header, otherwise returns them as-is.
pub fn maybe_decompress(bytes: Vec<u8>) -> Result<Vec<u8>> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(bytes);
    }

    let mut decoder = GzDecoder::new(bytes.as_slice());
    let mut inflated = Vec::new();
    decoder
        .read_to_end(&mut inflated)
        .context("failed to decompress gzip trip data")?;
    debug!(compressed = bytes.len(), inflated = inflated.len(), "Inflated gzip payload");
    Ok(inflated)
}

/// Loads the dataset from a local path or URL. For URLs, `app_token` is
/// appended as the open-data portal's `$$app_token` query parameter.
#[tracing::instrument(skip(app_token))]
pub async fn load_source(source: &str, app_token: Option<&str>) -> Result<Vec<u8>> {
    let bytes = if is_remote(source) {
        let client = BasicClient::new()?;
        match app_token {
            Some(token) => {
                let client = UrlParam::app_token(client, token.to_string());
                fetch_bytes(&client, source).await?
            }
            None => fetch_bytes(&client, source).await?,
        }
    } else {
        tokio::fs::read(source)
            .await
            .with_context(|| format!("failed to read trip data from '{source}'"))?
    };

    info!(bytes = bytes.len(), "Trip data loaded");
    maybe_decompress(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    #[test]
    fn test_is_remote() {
        assert!(is_remote("https://data.austintexas.gov/trips.csv"));
        assert!(is_remote("http://localhost:8080/trips.csv"));
        assert!(!is_remote("data/trips.csv"));
        assert!(!is_remote("httpdata/trips.csv"));
    }

    #[test]
    fn test_plain_bytes_pass_through() {
        let data = b"start_station_name,start_time,duration_minutes\n".to_vec();
        assert_eq!(maybe_decompress(data.clone()).unwrap(), data);
    }

    #[test]
    fn test_gzip_bytes_are_inflated() {
        let data = b"start_station_name,start_time,duration_minutes\n";
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        let compressed = encoder.finish().unwrap();

        assert_eq!(maybe_decompress(compressed).unwrap(), data.to_vec());
    }

    #[test]
    fn test_truncated_gzip_is_error() {
        assert!(maybe_decompress(vec![0x1f, 0x8b, 0x08]).is_err());
    }

    #[tokio::test]
    async fn test_load_missing_file_is_error() {
        assert!(load_source("/nonexistent/trips.csv", None).await.is_err());
    }
}
