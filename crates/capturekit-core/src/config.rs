// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Scanner configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings forwarded to the native scanner SDK plus the destination for
/// persisted pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Maximum number of pages per scan session.
    pub page_limit: u32,
    /// Allow importing existing photos instead of camera capture only.
    pub allow_gallery_import: bool,
    /// Directory where scanned pages and compressed files are written.
    pub output_dir: PathBuf,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            page_limit: 10,
            allow_gallery_import: false,
            output_dir: std::env::temp_dir(),
        }
    }
}
