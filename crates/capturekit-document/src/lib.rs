// SPDX-License-Identifier: PMPL-1.0-or-later
//
// capturekit-document — Compression adapters for the CaptureKit plugin.
//
// Converts an image or PDF file into a compressed sibling file and reports
// before/after byte sizes. Domain failures (missing file, undecodable data,
// write errors) are reported inside the returned `CompressionResult`, never
// as transport errors.

pub mod image;
pub mod pdf;

pub use image::{compress_image, encode_page};
pub use pdf::compress_pdf;
