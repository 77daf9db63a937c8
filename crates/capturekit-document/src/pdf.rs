// SPDX-License-Identifier: PMPL-1.0-or-later
//
// PDF compression adapter.
//
// Scanned PDFs carry almost all of their weight in embedded raster images.
// Compression therefore rewrites every DCT-encoded image XObject at the
// requested JPEG quality (keeping the original stream whenever re-encoding
// does not shrink it) and flate-compresses the remaining streams. Page count
// and order are untouched.

use std::path::Path;

use ::image::ImageFormat;
use capturekit_core::CompressionResult;
use lopdf::{Document, Object, Stream};
use tracing::{debug, info, instrument, warn};

use crate::image::encode_jpeg_bytes;

/// Compress a PDF file, honouring `quality` for embedded raster images.
///
/// Failure taxonomy matches the image adapter: missing file, invalid source
/// data, encode failure, write failure — all reported inside the result.
#[instrument(skip_all, fields(path = %source.as_ref().display()))]
pub fn compress_pdf(source: impl AsRef<Path>, quality: Option<i64>) -> CompressionResult {
    let source = source.as_ref();

    if !source.is_file() {
        warn!("PDF compression requested for missing file");
        return CompressionResult::failure("Source file does not exist", 0);
    }

    let original_size = match std::fs::metadata(source) {
        Ok(meta) => meta.len() as i64,
        Err(err) => {
            return CompressionResult::failure(format!("Cannot stat source file: {err}"), 0);
        }
    };

    let mut document = match Document::load(source) {
        Ok(doc) => doc,
        Err(err) => {
            debug!(%err, "PDF load failed");
            return CompressionResult::failure("Invalid PDF data", original_size);
        }
    };

    let quality = crate::image::clamp_quality(quality);
    let rewritten = recompress_embedded_images(&mut document, quality);
    debug!(rewritten, quality, "embedded images re-encoded");

    // Flate-compress whatever streams are still stored plain.
    document.compress();

    let mut encoded = Vec::new();
    if let Err(err) = document.save_to(&mut encoded) {
        return CompressionResult::failure(
            format!("Failed to compress PDF: {err}"),
            original_size,
        );
    }

    let output = source.with_file_name(format!(
        "{}_compressed.pdf",
        source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string())
    ));
    if let Err(err) = std::fs::write(&output, &encoded) {
        return CompressionResult::failure(
            format!("Failed to save compressed PDF: {err}"),
            original_size,
        );
    }

    info!(
        original_size,
        compressed_size = encoded.len(),
        rewritten,
        "PDF compressed"
    );
    CompressionResult::compressed(
        output.to_string_lossy().into_owned(),
        original_size,
        encoded.len() as i64,
    )
}

/// Re-encode every DCT image XObject at the given quality.
///
/// Returns the number of streams that were actually replaced. Streams that
/// fail to decode, or whose re-encoding is not smaller, are left alone.
fn recompress_embedded_images(document: &mut Document, quality: u8) -> usize {
    let mut rewritten = 0;

    for (_, object) in document.objects.iter_mut() {
        let Object::Stream(stream) = object else {
            continue;
        };
        if !is_dct_image(stream) {
            continue;
        }

        let decoded = match ::image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)
        {
            Ok(img) => img,
            Err(err) => {
                debug!(%err, "skipping undecodable image stream");
                continue;
            }
        };

        let reencoded = match encode_jpeg_bytes(&decoded, quality) {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!(%err, "skipping image stream that failed to re-encode");
                continue;
            }
        };

        if reencoded.len() >= stream.content.len() {
            continue;
        }

        // Re-encoding always yields 8-bit RGB, whatever the source carried.
        let mut dict = stream.dict.clone();
        dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
        dict.set("BitsPerComponent", Object::Integer(8));
        dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
        dict.remove(b"DecodeParms");
        *stream = Stream::new(dict, reencoded);
        rewritten += 1;
    }

    rewritten
}

/// An image XObject stored with the DCT (JPEG) filter.
fn is_dct_image(stream: &Stream) -> bool {
    let is_image = stream
        .dict
        .get(b"Subtype")
        .ok()
        .and_then(|obj| obj.as_name().ok())
        == Some(b"Image".as_slice());
    if !is_image {
        return false;
    }

    match stream.dict.get(b"Filter") {
        Ok(Object::Name(name)) => name == b"DCTDecode",
        Ok(Object::Array(filters)) => filters
            .iter()
            .any(|f| f.as_name().ok() == Some(b"DCTDecode".as_slice())),
        _ => false,
    }
}

// -- Tests --------------------------------------------------------------------
