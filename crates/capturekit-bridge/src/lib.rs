// SPDX-License-Identifier: PMPL-1.0-or-later
//
// capturekit-bridge — Native document-scanner abstractions.
//
// Defines the trait the scan orchestrator drives and the platform dispatch
// logic. Real implementations wrap the vendor scanning SDKs (ML Kit on
// Android, VisionKit on iOS); those SDKs own edge detection and the capture
// UI, which are out of scope here. Desktop and CI builds get a stub.

pub mod mock;
pub mod stub;
pub mod traits;

pub use traits::{CapturedPage, DocumentScanner, PermissionStatus, ScanCompletion, ScanOutcome};

/// Retrieve the scanner implementation for the target operating system.
///
/// Platforms without a native scanning SDK get [`stub::StubScanner`], which
/// reports unsupported and refuses to present.
pub fn platform_scanner() -> Box<dyn traits::DocumentScanner> {
    Box::new(stub::StubScanner)
}
