// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Mock scanner for testing.
//
// A configurable scanner that simulates the native SDK without any camera
// or UI: outcomes are scripted, and completions can optionally be held so a
// test can fire them at a chosen moment (or never).

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use capturekit_core::error::{CaptureError, Result};

use crate::traits::{DocumentScanner, PermissionStatus, ScanCompletion, ScanOutcome};

/// Scripted scanner used by orchestrator and channel tests.
pub struct MockScanner {
    supported: bool,
    permission: PermissionStatus,
    /// Outcome delivered synchronously from `present`, unless holding.
    outcome: Mutex<Option<ScanOutcome>>,
    /// When set, `present` stashes the completion instead of firing it.
    hold_completion: bool,
    held: Mutex<Option<ScanCompletion>>,
    present_count: AtomicUsize,
}

impl MockScanner {
    /// A supported scanner with granted permission and no scripted outcome.
    pub fn new() -> Self {
        Self {
            supported: true,
            permission: PermissionStatus::Granted,
            outcome: Mutex::new(None),
            hold_completion: false,
            held: Mutex::new(None),
            present_count: AtomicUsize::new(0),
        }
    }

    /// Script the outcome `present` delivers synchronously.
    pub fn with_outcome(self, outcome: ScanOutcome) -> Self {
        *self.outcome.lock().expect("mock outcome lock") = Some(outcome);
        self
    }

    pub fn with_permission(mut self, permission: PermissionStatus) -> Self {
        self.permission = permission;
        self
    }

    pub fn unsupported(mut self) -> Self {
        self.supported = false;
        self
    }

    /// Keep the completion instead of firing it, simulating a scanner UI
    /// that is still on screen. Fire it later with [`MockScanner::complete`].
    pub fn holding_completion(mut self) -> Self {
        self.hold_completion = true;
        self
    }

    /// Fire a held completion. Returns false if none was held.
    pub fn complete(&self, outcome: ScanOutcome) -> bool {
        match self.held.lock().expect("mock held lock").take() {
            Some(completion) => {
                completion(outcome);
                true
            }
            None => false,
        }
    }

    /// How many times the scanner UI was presented.
    pub fn presentations(&self) -> usize {
        self.present_count.load(Ordering::SeqCst)
    }
}

impl Default for MockScanner {
    fn default() -> Self {
        Self::new()
    }
}

// Lets a test keep a handle on the scanner after boxing it for the
// orchestrator, to fire held completions or inspect presentation counts.
impl DocumentScanner for std::sync::Arc<MockScanner> {
    fn is_supported(&self) -> bool {
        self.as_ref().is_supported()
    }

    fn camera_permission(&self) -> PermissionStatus {
        self.as_ref().camera_permission()
    }

    fn present(&self, completion: ScanCompletion) -> Result<()> {
        self.as_ref().present(completion)
    }
}

impl DocumentScanner for MockScanner {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn camera_permission(&self) -> PermissionStatus {
        self.permission
    }

    fn present(&self, completion: ScanCompletion) -> Result<()> {
        if !self.supported {
            return Err(CaptureError::PlatformUnavailable);
        }
        self.present_count.fetch_add(1, Ordering::SeqCst);

        if self.hold_completion {
            *self.held.lock().expect("mock held lock") = Some(completion);
            return Ok(());
        }

        let outcome = self
            .outcome
            .lock()
            .expect("mock outcome lock")
            .take()
            .unwrap_or(ScanOutcome::Unknown);
        completion(outcome);
        Ok(())
    }
}
