/// Radar composite source client.
///
/// Downloads the animated radar composite (a GIF with one frame per radar
/// sweep, followed by duplicated "now" frames), detects unchanged downloads
/// by SHA-256 checksum, and decodes the animation into a `FrameSequence`.
///
/// Any failure here maps to a `SourceError`, which makes the daemon skip the
/// cycle and keep the previously stored forecast.

use std::io::Cursor;
use std::time::Duration;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, RgbImage};
use sha2::{Digest, Sha256};

use crate::analysis::FrameSequence;
use crate::model::SourceError;

// ============================================================================
// Downloads
// ============================================================================

/// A fetched radar animation and its checksum.
#[derive(Debug, Clone)]
pub struct Download {
    pub bytes: Vec<u8>,
    pub checksum: String,
}

/// Builds the blocking HTTP client used for the radar source.
pub fn build_client(timeout_secs: u64) -> Result<reqwest::blocking::Client, SourceError> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| SourceError::Transport(e.to_string()))
}

/// Downloads the raw animation bytes.
pub fn fetch(client: &reqwest::blocking::Client, url: &str) -> Result<Vec<u8>, SourceError> {
    let response = client.get(url).send()?;

    if !response.status().is_success() {
        return Err(SourceError::Http(response.status().as_u16()));
    }

    Ok(response.bytes()?.to_vec())
}

/// Downloads the animation, returning `None` when its checksum equals
/// `last_checksum` (the radar server has not published a new composite).
pub fn fetch_if_changed(
    client: &reqwest::blocking::Client,
    url: &str,
    last_checksum: Option<&str>,
) -> Result<Option<Download>, SourceError> {
    let bytes = fetch(client, url)?;
    let checksum = checksum(&bytes);
    if last_checksum == Some(checksum.as_str()) {
        return Ok(None);
    }
    Ok(Some(Download { bytes, checksum }))
}

/// Hexadecimal SHA-256 of a download.
pub fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

// ============================================================================
// Decoding
// ============================================================================

/// Decodes every frame of an animated GIF, composited to full canvas size,
/// into an RGB frame sequence.
///
/// Transparent areas become black, which classifies as no precipitation.
pub fn decode_frames(bytes: &[u8]) -> Result<FrameSequence, SourceError> {
    let decoder = GifDecoder::new(Cursor::new(bytes))?;
    let frames = decoder.into_frames().collect_frames()?;

    let rgb: Vec<RgbImage> = frames
        .into_iter()
        .map(|frame| DynamicImage::ImageRgba8(frame.into_buffer()).to_rgb8())
        .collect();

    FrameSequence::new(rgb)
}

// ============================================================================
// Tests
// ============================================================================
