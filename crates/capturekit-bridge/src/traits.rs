// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Platform-agnostic trait definitions for the native document scanner.

use capturekit_core::error::Result;
use image::DynamicImage;

/// Outcome of a capture-permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    /// The user refused, now or previously.
    Denied,
    /// Policy (parental controls, device management) blocks camera access.
    Restricted,
}

impl PermissionStatus {
    /// Failure message delivered when a scan cannot start.
    pub fn denial_message(&self) -> &'static str {
        match self {
            Self::Granted => "",
            Self::Denied => "Camera permission not granted",
            Self::Restricted => "Camera access is restricted",
        }
    }
}

/// One camera-captured document page, already decoded by the native layer.
pub struct CapturedPage {
    pub image: DynamicImage,
}

impl CapturedPage {
    pub fn new(image: DynamicImage) -> Self {
        Self { image }
    }
}

/// What the native scanning UI reported back, exactly once per session.
pub enum ScanOutcome {
    /// The user confirmed a capture; pages are in capture order and may be
    /// empty when every page failed to materialise.
    Pages(Vec<CapturedPage>),
    /// The user dismissed the scanner without capturing.
    Cancelled,
    /// The native SDK failed with a describable error.
    Failed(String),
    /// An unrecognised native status code.
    Unknown,
}

/// Single-use continuation delivering one [`ScanOutcome`].
pub type ScanCompletion = Box<dyn FnOnce(ScanOutcome) + Send>;

/// Native document-scanner capability.
///
/// `present` launches the vendor scanning UI and must invoke the completion
/// exactly once, on whatever thread the native SDK calls back on. The other
/// two methods are synchronous and side-effect-free apart from the
/// permission prompt the OS may show.
pub trait DocumentScanner: Send + Sync {
    /// Whether scanning is supported on this device/OS version. Never
    /// prompts for permission and never touches scan state.
    fn is_supported(&self) -> bool;

    /// Check — and, where the platform allows, request — capture permission.
    fn camera_permission(&self) -> PermissionStatus;

    /// Present the native scanning UI. Errors here are transport-level
    /// (nothing was presented); everything after presentation arrives
    /// through `completion`.
    fn present(&self, completion: ScanCompletion) -> Result<()>;
}
