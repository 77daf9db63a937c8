// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Scan orchestration.
//
// Drives one document scan at a time: preflight checks, presenting the
// native scanner, persisting the captured pages, and delivering exactly one
// reply per request. The single pending request lives in a mutex-guarded
// slot; a second scan while one is in flight is rejected rather than queued.

use std::fs;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use capturekit_bridge::{CapturedPage, DocumentScanner, PermissionStatus, ScanOutcome};
use capturekit_core::config::ScannerConfig;
use capturekit_core::error::{CaptureError, Result};
use capturekit_core::types::{ScanOptions, ScanResult};
use capturekit_document::{compress_image, encode_page};

/// Single-use reply handle for one scan request.
///
/// `Ok` carries the scan outcome, success or domain failure alike. `Err` is
/// a transport fault: the request never reached the scanner (busy slot,
/// presentation failure) and no `ScanResult` exists for it.
pub type ScanReply = Box<dyn FnOnce(Result<ScanResult>) + Send>;

/// One in-flight scan: its identity, the options it was started with, and
/// the reply handle that must fire exactly once.
struct ScanRequest {
    id: Uuid,
    options: ScanOptions,
    reply: ScanReply,
}

/// Owns the scanner and the single pending-request slot.
pub struct ScanOrchestrator {
    scanner: Box<dyn DocumentScanner>,
    config: ScannerConfig,
    pending: Mutex<Option<ScanRequest>>,
}

impl ScanOrchestrator {
    pub fn new(scanner: Box<dyn DocumentScanner>, config: ScannerConfig) -> Self {
        Self {
            scanner,
            config,
            pending: Mutex::new(None),
        }
    }

    /// Whether the platform can scan at all. Never touches the pending slot.
    pub fn is_scanning_available(&self) -> bool {
        self.scanner.is_supported()
    }

    /// Start a scan. The reply fires exactly once, either synchronously (a
    /// preflight check failed) or from the native completion callback.
    #[instrument(skip_all, fields(format = options.output_format.as_str()))]
    pub fn scan_document(self: &Arc<Self>, options: ScanOptions, reply: ScanReply) {
        let id = Uuid::new_v4();

        // The reply must never run while the slot is locked, so every early
        // exit drops the guard first.
        let mut pending = lock_pending(&self.pending);
        if pending.is_some() {
            drop(pending);
            debug!("rejecting scan request, another scan is in flight");
            reply(Err(CaptureError::ScanInProgress));
            return;
        }

        if !self.scanner.is_supported() {
            drop(pending);
            reply(Ok(ScanResult::failure(
                "Document scanning not supported on this device",
            )));
            return;
        }

        let permission = self.scanner.camera_permission();
        if permission != PermissionStatus::Granted {
            drop(pending);
            info!(?permission, "scan refused, camera permission missing");
            reply(Ok(ScanResult::failure(permission.denial_message())));
            return;
        }

        *pending = Some(ScanRequest { id, options, reply });
        drop(pending);

        let orchestrator = Arc::clone(self);
        let presented = self
            .scanner
            .present(Box::new(move |outcome| orchestrator.finish(id, outcome)));

        if let Err(err) = presented {
            // The native UI never appeared, so the completion will not fire.
            // Reclaim the slot unless the scanner already completed
            // synchronously before failing.
            let request = take_pending(&self.pending, id);
            if let Some(request) = request {
                warn!(error = %err, "failed to present document scanner");
                (request.reply)(Err(err));
            }
        }
    }

    /// Deliver the outcome for request `id`. Called from the native
    /// completion callback. A stale or repeated completion finds no matching
    /// request and is discarded, which keeps the reply single-shot.
    #[instrument(skip_all, fields(request = %id))]
    pub fn finish(&self, id: Uuid, outcome: ScanOutcome) {
        let Some(request) = take_pending(&self.pending, id) else {
            debug!("discarding completion with no matching request");
            return;
        };

        let result = match outcome {
            ScanOutcome::Pages(pages) => self.persist_pages(&request.options, pages),
            ScanOutcome::Cancelled => ScanResult::failure("user cancelled"),
            ScanOutcome::Failed(message) => ScanResult::failure(message),
            ScanOutcome::Unknown => ScanResult::failure("unknown error"),
        };

        info!(
            success = result.success,
            pages = result.image_paths.len(),
            "scan finished"
        );
        (request.reply)(Ok(result));
    }

    /// Write the captured pages to the output directory, in page order, then
    /// optionally run each one through the image compressor.
    fn persist_pages(&self, options: &ScanOptions, pages: Vec<CapturedPage>) -> ScanResult {
        if pages.is_empty() {
            return ScanResult::failure("no pages scanned");
        }

        let limit = self.config.page_limit as usize;
        if pages.len() > limit {
            warn!(pages = pages.len(), limit, "truncating scan to page limit");
        }

        let format = options.output_format;
        let stamp = Utc::now().timestamp_millis();
        let mut paths = Vec::with_capacity(pages.len().min(limit));

        for (index, page) in pages.into_iter().take(limit).enumerate() {
            let path = self
                .config
                .output_dir
                .join(format!("scan_{stamp}_{index}.{}", format.extension()));
            let written = encode_page(&page.image, format)
                .and_then(|bytes| fs::write(&path, bytes).map_err(CaptureError::from));
            if let Err(err) = written {
                warn!(error = %err, page = index, "failed to persist scanned page");
                return ScanResult::failure(format!("Failed to save scanned pages: {err}"));
            }
            paths.push(path.to_string_lossy().into_owned());
        }

        if options.auto_compress {
            let quality = Some(options.compression_quality);
            for path in &mut paths {
                let compressed = compress_image(path.as_str(), quality);
                match compressed.output_path {
                    Some(output) if compressed.success => *path = output,
                    _ => warn!(path = %path, "auto-compress failed, keeping original page"),
                }
            }
        }

        ScanResult::pages(paths)
    }
}

fn lock_pending(pending: &Mutex<Option<ScanRequest>>) -> MutexGuard<'_, Option<ScanRequest>> {
    match pending.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Take the pending request if its id matches, leaving it in place otherwise.
fn take_pending(pending: &Mutex<Option<ScanRequest>>, id: Uuid) -> Option<ScanRequest> {
    let mut guard = lock_pending(pending);
    if guard.as_ref().is_some_and(|request| request.id == id) {
        guard.take()
    } else {
        None
    }
}
