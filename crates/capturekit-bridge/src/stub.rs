// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Stub scanner for desktop/CI builds where no native scanning SDK exists.

use capturekit_core::error::{CaptureError, Result};

use crate::traits::{DocumentScanner, PermissionStatus, ScanCompletion};

/// No-op scanner returned on platforms without a vendor SDK.
pub struct StubScanner;

impl DocumentScanner for StubScanner {
    fn is_supported(&self) -> bool {
        false
    }

    fn camera_permission(&self) -> PermissionStatus {
        PermissionStatus::Denied
    }

    fn present(&self, _completion: ScanCompletion) -> Result<()> {
        tracing::warn!("DocumentScanner::present called on stub scanner");
        Err(CaptureError::PlatformUnavailable)
    }
}
