// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Image compression adapter.
//
// Codec selection is driven by the source file extension: `.png` sources are
// re-encoded losslessly (the quality parameter is ignored), everything else
// is re-encoded as JPEG at the requested quality. The output is written next
// to the source with a `_compressed` suffix, so repeated runs are
// deterministic and never clobber the source file.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use ::image::codecs::jpeg::JpegEncoder;
use ::image::{DynamicImage, ImageFormat};
use capturekit_core::error::{CaptureError, Result};
use capturekit_core::{CompressionResult, OutputFormat};
use tracing::{debug, info, instrument, warn};

/// Quality used when the caller passes none or an out-of-range value that
/// cannot be clamped sensibly (absent quality).
const DEFAULT_QUALITY: i64 = 80;

/// Compress an image file, honouring `quality` for lossy sources.
///
/// Every failure mode comes back as a `success: false` result carrying the
/// sizes measured so far; this function never returns a transport error.
#[instrument(skip_all, fields(path = %source.as_ref().display()))]
pub fn compress_image(source: impl AsRef<Path>, quality: Option<i64>) -> CompressionResult {
    let source = source.as_ref();

    if !source.is_file() {
        warn!("compression requested for missing file");
        return CompressionResult::failure("Source file does not exist", 0);
    }

    let original_size = match std::fs::metadata(source) {
        Ok(meta) => meta.len() as i64,
        Err(err) => {
            return CompressionResult::failure(format!("Cannot stat source file: {err}"), 0);
        }
    };

    let decoded = match ::image::open(source) {
        Ok(img) => img,
        Err(err) => {
            debug!(%err, "image decode failed");
            return CompressionResult::failure("Failed to decode image", original_size);
        }
    };

    let lossless = has_extension(source, "png");
    let quality = clamp_quality(quality);

    let encoded = if lossless {
        encode_png(&decoded)
    } else {
        encode_jpeg_bytes(&decoded, quality)
    };
    let encoded = match encoded {
        Ok(bytes) => bytes,
        Err(err) => {
            return CompressionResult::failure(
                format!("Failed to compress image: {err}"),
                original_size,
            );
        }
    };

    let output = output_path(source, if lossless { "png" } else { "jpg" });
    if let Err(err) = std::fs::write(&output, &encoded) {
        return CompressionResult::failure(
            format!("Failed to save compressed image: {err}"),
            original_size,
        );
    }

    info!(
        original_size,
        compressed_size = encoded.len(),
        lossless,
        "image compressed"
    );
    CompressionResult::compressed(
        output.to_string_lossy().into_owned(),
        original_size,
        encoded.len() as i64,
    )
}

/// Encode a decoded page bitmap in the requested scan output format.
///
/// JPEG pages are written at maximum quality; the scan pipeline compresses
/// them afterwards only when the caller asked for it.
pub fn encode_page(image: &DynamicImage, format: OutputFormat) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Jpeg => encode_jpeg_bytes(image, 100),
        OutputFormat::Png => encode_png(image),
    }
}

/// JPEG-encode at the given quality (1-100).
pub(crate) fn encode_jpeg_bytes(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let rgb = image.to_rgb8();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    rgb.write_with_encoder(encoder)
        .map_err(|err| CaptureError::Image(format!("JPEG encoding failed: {err}")))?;
    Ok(buffer)
}

/// Lossless PNG encode.
fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|err| CaptureError::Image(format!("PNG encoding failed: {err}")))?;
    Ok(buffer)
}

/// Clamp a caller-supplied quality into 0-100, defaulting when absent.
pub(crate) fn clamp_quality(quality: Option<i64>) -> u8 {
    quality.unwrap_or(DEFAULT_QUALITY).clamp(0, 100) as u8
}

/// `<dir>/<stem>_compressed.<ext>` — distinct from the source by
/// construction.
fn output_path(source: &Path, extension: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    source.with_file_name(format!("{stem}_compressed.{extension}"))
}

fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(wanted))
        .unwrap_or(false)
}

// -- Tests --------------------------------------------------------------------
