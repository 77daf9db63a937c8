// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Core value types for the CaptureKit scan/compression protocol.
//
// All three request/reply types are transient: created per call, delivered
// through a single reply handle, never persisted and never shared across
// calls. The result types enforce their consistency invariants through the
// constructors below; the wire codec re-checks them on decode.

use serde::{Deserialize, Serialize};

/// File format for persisted scan pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Lossy encode at maximum quality when persisting scan pages.
    Jpeg,
    /// Lossless encode; compression quality parameters are ignored.
    Png,
}

impl OutputFormat {
    /// Wire name of the format (travels as a plain string).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        }
    }

    /// File extension for persisted pages.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }

    /// Parse a wire name. Unrecognised names fall back to JPEG, matching the
    /// lenient behaviour callers expect from the channel boundary.
    pub fn from_name(name: &str) -> Self {
        match name {
            "png" => Self::Png,
            _ => Self::Jpeg,
        }
    }
}

/// Caller-constructed options for one scan invocation. Consumed once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanOptions {
    pub output_format: OutputFormat,
    /// Run each persisted page through the image compressor after the scan.
    pub auto_compress: bool,
    /// JPEG quality (0-100) used when `auto_compress` is set.
    pub compression_quality: i64,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Jpeg,
            auto_compress: false,
            compression_quality: 80,
        }
    }
}

/// Outcome of one scan request.
///
/// Invariant: `success` implies `error_message` is `None`; failure implies
/// `image_paths` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Persisted page files, in page order.
    pub image_paths: Vec<String>,
    pub success: bool,
    pub error_message: Option<String>,
}

impl ScanResult {
    /// Successful scan with the persisted page paths in page order.
    pub fn pages(image_paths: Vec<String>) -> Self {
        Self {
            image_paths,
            success: true,
            error_message: None,
        }
    }

    /// Failed scan. The path list is always empty on failure.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            image_paths: Vec::new(),
            success: false,
            error_message: Some(message.into()),
        }
    }

    /// Check the consistency invariant. Used at the codec boundary to reject
    /// values a peer could not have produced through the constructors.
    pub fn validate(&self) -> bool {
        if self.success {
            self.error_message.is_none()
        } else {
            self.image_paths.is_empty()
        }
    }
}

/// Outcome of one image or PDF compression call.
///
/// Invariant: `success` implies `output_path` is present and
/// `error_message` is `None`. Sizes are byte counts and never negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionResult {
    pub output_path: Option<String>,
    pub original_size: i64,
    pub compressed_size: i64,
    pub success: bool,
    pub error_message: Option<String>,
}

impl CompressionResult {
    /// Successful compression.
    pub fn compressed(output_path: impl Into<String>, original_size: i64, compressed_size: i64) -> Self {
        Self {
            output_path: Some(output_path.into()),
            original_size,
            compressed_size,
            success: true,
            error_message: None,
        }
    }

    /// Failed compression. `original_size` is whatever was measured before
    /// the failure (0 when the source file was never read).
    pub fn failure(message: impl Into<String>, original_size: i64) -> Self {
        Self {
            output_path: None,
            original_size,
            compressed_size: 0,
            success: false,
            error_message: Some(message.into()),
        }
    }

    /// Check the consistency invariant (see type docs).
    pub fn validate(&self) -> bool {
        if self.original_size < 0 || self.compressed_size < 0 {
            return false;
        }
        if self.success {
            self.output_path.is_some() && self.error_message.is_none()
        } else {
            true
        }
    }
}
