// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Binary channel endpoints.
//
// Maps channel names to operations and wraps every reply in the standard
// envelope: a one-element list on success, a three-element
// [code, message, details] list for transport errors. Domain failures never
// use the error envelope; they travel as success-envelope result values with
// `success: false`.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use capturekit_bridge::{DocumentScanner, platform_scanner};
use capturekit_codec::{Value, decode_message, encode_message};
use capturekit_core::config::ScannerConfig;
use capturekit_core::error::CaptureError;
use capturekit_core::types::{CompressionResult, ScanOptions};
use capturekit_document::{compress_image, compress_pdf};

use crate::orchestrator::ScanOrchestrator;

pub const CHANNEL_SCAN_DOCUMENT: &str = "capturekit.DocumentScannerApi.scanDocument";
pub const CHANNEL_IS_SCANNING_AVAILABLE: &str = "capturekit.DocumentScannerApi.isScanningAvailable";
pub const CHANNEL_COMPRESS_IMAGE: &str = "capturekit.DocumentScannerApi.compressImage";
pub const CHANNEL_COMPRESS_PDF: &str = "capturekit.DocumentScannerApi.compressPdf";

/// Single-use handle delivering one encoded reply to the host channel.
pub type BinaryReply = Box<dyn FnOnce(Vec<u8>) + Send>;

/// The plugin facade the host messenger dispatches into.
///
/// One instance serves all four channels and stays usable after any failed
/// request.
pub struct CapturePlugin {
    orchestrator: Arc<ScanOrchestrator>,
}

impl CapturePlugin {
    pub fn new(scanner: Box<dyn DocumentScanner>, config: ScannerConfig) -> Self {
        Self {
            orchestrator: Arc::new(ScanOrchestrator::new(scanner, config)),
        }
    }

    /// Plugin wired to the scanner for the current platform.
    pub fn with_platform_scanner(config: ScannerConfig) -> Self {
        Self::new(platform_scanner(), config)
    }

    /// Dispatch one incoming channel message. The reply fires exactly once,
    /// synchronously for everything except a presented document scan.
    #[instrument(skip(self, message, reply))]
    pub fn handle_message(&self, channel: &str, message: &[u8], reply: BinaryReply) {
        match channel {
            CHANNEL_SCAN_DOCUMENT => self.scan_document(message, reply),
            CHANNEL_IS_SCANNING_AVAILABLE => {
                let available = self.orchestrator.is_scanning_available();
                debug!(available, "availability probe");
                reply(success_reply(Value::Bool(available)));
            }
            CHANNEL_COMPRESS_IMAGE => compress(message, reply, |path, q| compress_image(path, q)),
            CHANNEL_COMPRESS_PDF => compress(message, reply, |path, q| compress_pdf(path, q)),
            other => {
                warn!(channel = other, "message on unhandled channel");
                reply(error_reply(&CaptureError::UnknownChannel(other.to_string())));
            }
        }
    }

    fn scan_document(&self, message: &[u8], reply: BinaryReply) {
        let options = match decode_message(message) {
            Ok(Value::ScanOptions(options)) => options,
            // A null message means default options, like an argument-less call.
            Ok(Value::Null) => ScanOptions::default(),
            Ok(_) => {
                reply(error_reply(&CaptureError::InvalidArguments(
                    "scanDocument expects scan options or null".into(),
                )));
                return;
            }
            Err(err) => {
                reply(error_reply(&err));
                return;
            }
        };

        self.orchestrator.scan_document(
            options,
            Box::new(move |outcome| {
                let bytes = match outcome {
                    Ok(result) => success_reply(result.into()),
                    Err(err) => error_reply(&err),
                };
                reply(bytes);
            }),
        );
    }
}

/// Shared argument handling for both compression endpoints: the message is a
/// list of `[source_path, quality]`, quality optional.
fn compress<F>(message: &[u8], reply: BinaryReply, run: F)
where
    F: FnOnce(&str, Option<i64>) -> CompressionResult,
{
    let args = match decode_message(message) {
        Ok(Value::List(args)) => args,
        Ok(_) => {
            reply(error_reply(&CaptureError::InvalidArguments(
                "compression expects an argument list".into(),
            )));
            return;
        }
        Err(err) => {
            reply(error_reply(&err));
            return;
        }
    };

    let Some(path) = args.first().and_then(Value::as_str) else {
        reply(error_reply(&CaptureError::InvalidArguments(
            "missing source path".into(),
        )));
        return;
    };
    let quality = args.get(1).and_then(Value::as_i64);

    let result = run(path, quality);
    reply(success_reply(result.into()));
}

fn success_reply(value: Value) -> Vec<u8> {
    encode_message(&Value::List(vec![value]))
}

fn error_reply(err: &CaptureError) -> Vec<u8> {
    encode_message(&Value::List(vec![
        Value::from(err.code()),
        Value::from(err.to_string()),
        Value::Null,
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use capturekit_bridge::mock::MockScanner;
    use capturekit_bridge::{CapturedPage, ScanOutcome};
    use capturekit_core::types::ScanResult;
    use image::DynamicImage;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn plugin_with(scanner: MockScanner, dir: &TempDir) -> CapturePlugin {
        let config = ScannerConfig {
            output_dir: dir.path().to_path_buf(),
            ..ScannerConfig::default()
        };
        CapturePlugin::new(Box::new(scanner), config)
    }

    /// Send a message and capture the encoded reply.
    fn send(plugin: &CapturePlugin, channel: &str, message: &[u8]) -> Vec<u8> {
        let slot = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&slot);
        plugin.handle_message(
            channel,
            message,
            Box::new(move |bytes| {
                *sink.lock().unwrap() = Some(bytes);
            }),
        );
        let bytes = slot.lock().unwrap().take();
        bytes.expect("reply did not fire")
    }

    fn decode_envelope(bytes: &[u8]) -> Vec<Value> {
        match decode_message(bytes).expect("reply must decode") {
            Value::List(items) => items,
            other => panic!("reply envelope is not a list: {other:?}"),
        }
    }

    fn expect_error(bytes: &[u8], code: &str) {
        let items = decode_envelope(bytes);
        assert_eq!(items.len(), 3, "error envelope has three elements");
        assert_eq!(items[0].as_str(), Some(code));
        assert!(items[1].as_str().is_some_and(|m| !m.is_empty()));
        assert!(items[2].is_null());
    }

    fn expect_scan_result(bytes: &[u8]) -> ScanResult {
        let mut items = decode_envelope(bytes);
        assert_eq!(items.len(), 1, "success envelope has one element");
        match items.remove(0) {
            Value::ScanResult(result) => result,
            other => panic!("expected a scan result, got {other:?}"),
        }
    }

    fn expect_compression_result(bytes: &[u8]) -> CompressionResult {
        let mut items = decode_envelope(bytes);
        assert_eq!(items.len(), 1);
        match items.remove(0) {
            Value::CompressionResult(result) => result,
            other => panic!("expected a compression result, got {other:?}"),
        }
    }

    #[test]
    fn scan_document_round_trips_through_encoded_messages() {
        let dir = TempDir::new().unwrap();
        let scanner = MockScanner::new().with_outcome(ScanOutcome::Pages(vec![
            CapturedPage::new(DynamicImage::new_rgb8(8, 8)),
        ]));
        let plugin = plugin_with(scanner, &dir);

        let message = encode_message(&Value::ScanOptions(ScanOptions::default()));
        let result = expect_scan_result(&send(&plugin, CHANNEL_SCAN_DOCUMENT, &message));
        assert!(result.success);
        assert_eq!(result.image_paths.len(), 1);
    }

    #[test]
    fn null_message_scans_with_default_options() {
        let dir = TempDir::new().unwrap();
        let scanner = MockScanner::new().with_outcome(ScanOutcome::Cancelled);
        let plugin = plugin_with(scanner, &dir);

        let message = encode_message(&Value::Null);
        let result = expect_scan_result(&send(&plugin, CHANNEL_SCAN_DOCUMENT, &message));
        assert!(!result.success);
        assert_eq!(result.error_message.as_deref(), Some("user cancelled"));
    }

    #[test]
    fn malformed_scan_arguments_are_a_transport_error() {
        let dir = TempDir::new().unwrap();
        let plugin = plugin_with(MockScanner::new(), &dir);

        let message = encode_message(&Value::Bool(true));
        expect_error(
            &send(&plugin, CHANNEL_SCAN_DOCUMENT, &message),
            "INVALID_ARGS",
        );

        // Undecodable bytes fail closed before any argument handling.
        expect_error(
            &send(&plugin, CHANNEL_SCAN_DOCUMENT, &[200, 1, 2]),
            "INVALID_MESSAGE",
        );
    }

    #[test]
    fn busy_scanner_rejects_over_the_channel() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockScanner::new().holding_completion());
        let config = ScannerConfig {
            output_dir: dir.path().to_path_buf(),
            ..ScannerConfig::default()
        };
        let plugin = CapturePlugin::new(Box::new(Arc::clone(&mock)), config);

        let message = encode_message(&Value::Null);
        let first = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&first);
        plugin.handle_message(
            CHANNEL_SCAN_DOCUMENT,
            &message,
            Box::new(move |bytes| {
                *sink.lock().unwrap() = Some(bytes);
            }),
        );
        assert!(first.lock().unwrap().is_none());

        expect_error(
            &send(&plugin, CHANNEL_SCAN_DOCUMENT, &message),
            "SCAN_IN_PROGRESS",
        );

        // The held scan still completes and uses the success envelope.
        assert!(mock.complete(ScanOutcome::Cancelled));
        let bytes = first.lock().unwrap().take().expect("held reply fired");
        let result = expect_scan_result(&bytes);
        assert_eq!(result.error_message.as_deref(), Some("user cancelled"));
    }

    #[test]
    fn availability_probe_replies_with_a_bool() {
        let dir = TempDir::new().unwrap();
        let plugin = plugin_with(MockScanner::new(), &dir);
        let items = decode_envelope(&send(
            &plugin,
            CHANNEL_IS_SCANNING_AVAILABLE,
            &encode_message(&Value::Null),
        ));
        assert_eq!(items, vec![Value::Bool(true)]);

        let plugin = plugin_with(MockScanner::new().unsupported(), &dir);
        let items = decode_envelope(&send(
            &plugin,
            CHANNEL_IS_SCANNING_AVAILABLE,
            &encode_message(&Value::Null),
        ));
        assert_eq!(items, vec![Value::Bool(false)]);
    }

    #[test]
    fn compress_image_end_to_end() {
        let dir = TempDir::new().unwrap();
        let plugin = plugin_with(MockScanner::new(), &dir);

        let source = dir.path().join("page.jpg");
        DynamicImage::new_rgb8(32, 32).save(&source).unwrap();

        let message = encode_message(&Value::List(vec![
            Value::from(source.to_string_lossy().into_owned()),
            Value::I32(50),
        ]));
        let result = expect_compression_result(&send(&plugin, CHANNEL_COMPRESS_IMAGE, &message));
        assert!(result.success);
        assert!(
            result
                .output_path
                .as_deref()
                .is_some_and(|p| p.ends_with("_compressed.jpg"))
        );
    }

    #[test]
    fn missing_source_is_a_domain_failure_not_a_transport_error() {
        let dir = TempDir::new().unwrap();
        let plugin = plugin_with(MockScanner::new(), &dir);

        let message = encode_message(&Value::List(vec![
            Value::from("/nonexistent/file.jpg"),
            Value::Null,
        ]));
        let result = expect_compression_result(&send(&plugin, CHANNEL_COMPRESS_IMAGE, &message));
        assert!(!result.success);
        assert_eq!(
            result.error_message.as_deref(),
            Some("Source file does not exist")
        );

        let result = expect_compression_result(&send(&plugin, CHANNEL_COMPRESS_PDF, &message));
        assert!(!result.success);
    }

    #[test]
    fn compression_argument_errors() {
        let dir = TempDir::new().unwrap();
        let plugin = plugin_with(MockScanner::new(), &dir);

        // Not a list at all.
        let message = encode_message(&Value::from("just a path"));
        expect_error(
            &send(&plugin, CHANNEL_COMPRESS_IMAGE, &message),
            "INVALID_ARGS",
        );

        // A list whose first element is not a string.
        let message = encode_message(&Value::List(vec![Value::Null, Value::I32(80)]));
        expect_error(
            &send(&plugin, CHANNEL_COMPRESS_PDF, &message),
            "INVALID_ARGS",
        );
    }

    #[test]
    fn unknown_channel_gets_no_handler() {
        let dir = TempDir::new().unwrap();
        let plugin = plugin_with(MockScanner::new(), &dir);
        expect_error(
            &send(
                &plugin,
                "capturekit.DocumentScannerApi.selfDestruct",
                &encode_message(&Value::Null),
            ),
            "NO_HANDLER",
        );
    }
}
