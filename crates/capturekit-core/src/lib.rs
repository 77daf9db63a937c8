// SPDX-License-Identifier: PMPL-1.0-or-later
//
// capturekit-core — Value types and error definitions shared across all crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::ScannerConfig;
pub use error::CaptureError;
pub use types::*;
