// SPDX-License-Identifier: PMPL-1.0-or-later
//
// capturekit-plugin — Channel endpoints and scan orchestration.
//
// The top of the stack: decodes incoming channel messages, drives the scan
// orchestrator and the compression adapters, and encodes exactly one reply
// per request. Hosts embed [`CapturePlugin`] and forward binary messages
// from their messenger into [`CapturePlugin::handle_message`].

pub mod channel;
pub mod orchestrator;

pub use channel::{
    BinaryReply, CHANNEL_COMPRESS_IMAGE, CHANNEL_COMPRESS_PDF, CHANNEL_IS_SCANNING_AVAILABLE,
    CHANNEL_SCAN_DOCUMENT, CapturePlugin,
};
pub use orchestrator::{ScanOrchestrator, ScanReply};
