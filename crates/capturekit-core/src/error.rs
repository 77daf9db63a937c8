// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Unified error types for CaptureKit.

use thiserror::Error;

/// Top-level error type for all CaptureKit operations.
///
/// These are transport-level faults: things that prevent a request from
/// reaching the native layer or a reply from being assembled. Domain-level
/// failures (cancellation, permission denial, a file that will not decode)
/// are never errors — they travel inside `ScanResult` / `CompressionResult`
/// with `success: false`.
#[derive(Debug, Error)]
pub enum CaptureError {
    // -- Wire codec --
    #[error("message decoding failed: {0}")]
    Codec(String),

    // -- Document processing --
    #[error("image processing failed: {0}")]
    Image(String),

    #[error("PDF operation failed: {0}")]
    Pdf(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    // -- Channel / orchestration --
    #[error("a document scan is already in flight")]
    ScanInProgress,

    #[error("invalid channel arguments: {0}")]
    InvalidArguments(String),

    #[error("no handler registered for channel {0}")]
    UnknownChannel(String),

    // -- Platform bridge --
    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

impl CaptureError {
    /// Stable error code used in the transport error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Codec(_) => "INVALID_MESSAGE",
            Self::Image(_) => "IMAGE_ERROR",
            Self::Pdf(_) => "PDF_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::ScanInProgress => "SCAN_IN_PROGRESS",
            Self::InvalidArguments(_) => "INVALID_ARGS",
            Self::UnknownChannel(_) => "NO_HANDLER",
            Self::PlatformUnavailable => "UNAVAILABLE",
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CaptureError>;
