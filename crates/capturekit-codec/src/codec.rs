// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Encoder/decoder for the standard tagged-binary envelope plus the three
// CaptureKit extension tags.
//
// Wire rules, matching the host framework's standard codec byte for byte:
// - every value starts with a one-byte type tag;
// - scalars are little-endian; float64 payloads are aligned to 8 bytes
//   relative to the start of the message;
// - collection sizes are one byte below 254, `254` + u16 up to 65535,
//   otherwise `255` + u32;
// - typed lists (tags 8-11, 14) align their payload to the element size.
//
// Extension tags 129-131 wrap the domain types as a positional field list in
// a fixed order. Decoding trusts schema compliance from the peer: malformed
// input fails closed with a codec error, never with partial recovery.

use capturekit_core::error::{CaptureError, Result};
use capturekit_core::{CompressionResult, OutputFormat, ScanOptions, ScanResult};
use tracing::trace;

use crate::value::Value;

// Standard tag space.
const TAG_NULL: u8 = 0;
const TAG_TRUE: u8 = 1;
const TAG_FALSE: u8 = 2;
const TAG_INT32: u8 = 3;
const TAG_INT64: u8 = 4;
// Tag 5 is the legacy big-integer encoding; it is never produced and is
// rejected on decode like any other unknown tag.
const TAG_FLOAT64: u8 = 6;
const TAG_STRING: u8 = 7;
const TAG_UINT8_LIST: u8 = 8;
const TAG_INT32_LIST: u8 = 9;
const TAG_INT64_LIST: u8 = 10;
const TAG_FLOAT64_LIST: u8 = 11;
const TAG_LIST: u8 = 12;
const TAG_MAP: u8 = 13;
const TAG_FLOAT32_LIST: u8 = 14;

// Extension tag space (> 128, outside the standard range).
const TAG_SCAN_OPTIONS: u8 = 129;
const TAG_SCAN_RESULT: u8 = 130;
const TAG_COMPRESSION_RESULT: u8 = 131;

/// Encode a single message value into its wire bytes.
pub fn encode_message(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    write_value(&mut buf, value);
    trace!(bytes = buf.len(), "message encoded");
    buf
}

/// Decode a single message value from wire bytes.
///
/// The whole buffer must be consumed; trailing bytes mean the message is
/// corrupted and the decode fails closed.
pub fn decode_message(data: &[u8]) -> Result<Value> {
    let mut reader = Reader::new(data);
    let value = reader.read_value()?;
    if reader.remaining() != 0 {
        return Err(CaptureError::Codec(format!(
            "message corrupted: {} trailing bytes",
            reader.remaining()
        )));
    }
    Ok(value)
}

// -- Encoding -----------------------------------------------------------------

pub(crate) fn write_value(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => buf.push(TAG_NULL),
        Value::Bool(true) => buf.push(TAG_TRUE),
        Value::Bool(false) => buf.push(TAG_FALSE),
        Value::I32(v) => {
            buf.push(TAG_INT32);
            buf.extend_from_slice(&v.to_le_bytes());
        }
        Value::I64(v) => {
            buf.push(TAG_INT64);
            buf.extend_from_slice(&v.to_le_bytes());
        }
        Value::F64(v) => {
            buf.push(TAG_FLOAT64);
            write_alignment(buf, 8);
            buf.extend_from_slice(&v.to_le_bytes());
        }
        Value::Str(s) => {
            buf.push(TAG_STRING);
            write_size(buf, s.len());
            buf.extend_from_slice(s.as_bytes());
        }
        Value::U8List(bytes) => {
            buf.push(TAG_UINT8_LIST);
            write_size(buf, bytes.len());
            buf.extend_from_slice(bytes);
        }
        Value::I32List(items) => {
            buf.push(TAG_INT32_LIST);
            write_size(buf, items.len());
            write_alignment(buf, 4);
            for item in items {
                buf.extend_from_slice(&item.to_le_bytes());
            }
        }
        Value::I64List(items) => {
            buf.push(TAG_INT64_LIST);
            write_size(buf, items.len());
            write_alignment(buf, 8);
            for item in items {
                buf.extend_from_slice(&item.to_le_bytes());
            }
        }
        Value::F64List(items) => {
            buf.push(TAG_FLOAT64_LIST);
            write_size(buf, items.len());
            write_alignment(buf, 8);
            for item in items {
                buf.extend_from_slice(&item.to_le_bytes());
            }
        }
        Value::F32List(items) => {
            buf.push(TAG_FLOAT32_LIST);
            write_size(buf, items.len());
            write_alignment(buf, 4);
            for item in items {
                buf.extend_from_slice(&item.to_le_bytes());
            }
        }
        Value::List(items) => {
            buf.push(TAG_LIST);
            write_size(buf, items.len());
            for item in items {
                write_value(buf, item);
            }
        }
        Value::Map(entries) => {
            buf.push(TAG_MAP);
            write_size(buf, entries.len());
            for (key, val) in entries {
                write_value(buf, key);
                write_value(buf, val);
            }
        }
        Value::ScanOptions(options) => {
            buf.push(TAG_SCAN_OPTIONS);
            let fields = Value::List(vec![
                Value::Str(options.output_format.as_str().to_string()),
                Value::Bool(options.auto_compress),
                Value::I64(options.compression_quality),
            ]);
            write_value(buf, &fields);
        }
        Value::ScanResult(result) => {
            buf.push(TAG_SCAN_RESULT);
            let paths = result
                .image_paths
                .iter()
                .map(|p| Value::Str(p.clone()))
                .collect();
            let fields = Value::List(vec![
                Value::List(paths),
                Value::Bool(result.success),
                result.error_message.clone().into(),
            ]);
            write_value(buf, &fields);
        }
        Value::CompressionResult(result) => {
            buf.push(TAG_COMPRESSION_RESULT);
            let fields = Value::List(vec![
                result.output_path.clone().into(),
                Value::I64(result.original_size),
                Value::I64(result.compressed_size),
                Value::Bool(result.success),
                result.error_message.clone().into(),
            ]);
            write_value(buf, &fields);
        }
    }
}

/// Write a collection size in the standard variable-width form.
fn write_size(buf: &mut Vec<u8>, size: usize) {
    if size < 254 {
        buf.push(size as u8);
    } else if size <= u16::MAX as usize {
        buf.push(254);
        buf.extend_from_slice(&(size as u16).to_le_bytes());
    } else {
        buf.push(255);
        buf.extend_from_slice(&(size as u32).to_le_bytes());
    }
}

/// Pad with zero bytes until the buffer length is a multiple of `alignment`.
fn write_alignment(buf: &mut Vec<u8>, alignment: usize) {
    while buf.len() % alignment != 0 {
        buf.push(0);
    }
}

// -- Decoding -----------------------------------------------------------------

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u8(&mut self) -> Result<u8> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or_else(|| underflow("type tag"))?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_bytes(&mut self, count: usize, what: &str) -> Result<&'a [u8]> {
        if self.remaining() < count {
            return Err(underflow(what));
        }
        let slice = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    /// Skip padding so the next read starts on a multiple of `alignment`.
    /// Capped at the buffer end so a truncated message surfaces as an
    /// underflow on the following read instead of an out-of-range position.
    fn align(&mut self, alignment: usize) {
        let misalignment = self.pos % alignment;
        if misalignment != 0 {
            self.pos = (self.pos + alignment - misalignment).min(self.data.len());
        }
    }

    fn read_size(&mut self) -> Result<usize> {
        match self.read_u8()? {
            254 => {
                let bytes = self.read_bytes(2, "u16 size")?;
                Ok(u16::from_le_bytes([bytes[0], bytes[1]]) as usize)
            }
            255 => {
                let bytes = self.read_bytes(4, "u32 size")?;
                Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize)
            }
            small => Ok(small as usize),
        }
    }

    fn read_value(&mut self) -> Result<Value> {
        let tag = self.read_u8()?;
        match tag {
            TAG_NULL => Ok(Value::Null),
            TAG_TRUE => Ok(Value::Bool(true)),
            TAG_FALSE => Ok(Value::Bool(false)),
            TAG_INT32 => {
                let b = self.read_bytes(4, "int32")?;
                Ok(Value::I32(i32::from_le_bytes([b[0], b[1], b[2], b[3]])))
            }
            TAG_INT64 => {
                let b = self.read_bytes(8, "int64")?;
                Ok(Value::I64(i64::from_le_bytes([
                    b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
                ])))
            }
            TAG_FLOAT64 => {
                self.align(8);
                let b = self.read_bytes(8, "float64")?;
                Ok(Value::F64(f64::from_le_bytes([
                    b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
                ])))
            }
            TAG_STRING => {
                let size = self.read_size()?;
                let bytes = self.read_bytes(size, "string payload")?;
                let text = std::str::from_utf8(bytes)
                    .map_err(|_| CaptureError::Codec("invalid UTF-8 in string".to_string()))?;
                Ok(Value::Str(text.to_string()))
            }
            TAG_UINT8_LIST => {
                let size = self.read_size()?;
                let bytes = self.read_bytes(size, "byte list payload")?;
                Ok(Value::U8List(bytes.to_vec()))
            }
            TAG_INT32_LIST => {
                let size = self.read_size()?;
                self.align(4);
                let bytes = self.read_bytes(size * 4, "int32 list payload")?;
                Ok(Value::I32List(
                    bytes
                        .chunks_exact(4)
                        .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                        .collect(),
                ))
            }
            TAG_INT64_LIST => {
                let size = self.read_size()?;
                self.align(8);
                let bytes = self.read_bytes(size * 8, "int64 list payload")?;
                Ok(Value::I64List(
                    bytes
                        .chunks_exact(8)
                        .map(|c| i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                        .collect(),
                ))
            }
            TAG_FLOAT64_LIST => {
                let size = self.read_size()?;
                self.align(8);
                let bytes = self.read_bytes(size * 8, "float64 list payload")?;
                Ok(Value::F64List(
                    bytes
                        .chunks_exact(8)
                        .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                        .collect(),
                ))
            }
            TAG_FLOAT32_LIST => {
                let size = self.read_size()?;
                self.align(4);
                let bytes = self.read_bytes(size * 4, "float32 list payload")?;
                Ok(Value::F32List(
                    bytes
                        .chunks_exact(4)
                        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                        .collect(),
                ))
            }
            TAG_LIST => {
                let size = self.read_size()?;
                let mut items = Vec::with_capacity(size.min(4096));
                for _ in 0..size {
                    items.push(self.read_value()?);
                }
                Ok(Value::List(items))
            }
            TAG_MAP => {
                let size = self.read_size()?;
                let mut entries = Vec::with_capacity(size.min(4096));
                for _ in 0..size {
                    let key = self.read_value()?;
                    let val = self.read_value()?;
                    entries.push((key, val));
                }
                Ok(Value::Map(entries))
            }
            TAG_SCAN_OPTIONS => {
                let fields = self.read_field_list(3, "ScanOptions")?;
                let output_format = expect_string(&fields[0], "ScanOptions.outputFormat")?;
                let options = ScanOptions {
                    output_format: OutputFormat::from_name(&output_format),
                    auto_compress: expect_bool(&fields[1], "ScanOptions.autoCompress")?,
                    compression_quality: expect_int(&fields[2], "ScanOptions.compressionQuality")?,
                };
                Ok(Value::ScanOptions(options))
            }
            TAG_SCAN_RESULT => {
                let fields = self.read_field_list(3, "ScanResult")?;
                let image_paths = expect_string_list(&fields[0], "ScanResult.imagePaths")?;
                let result = ScanResult {
                    image_paths,
                    success: expect_bool(&fields[1], "ScanResult.success")?,
                    error_message: expect_opt_string(&fields[2], "ScanResult.errorMessage")?,
                };
                if !result.validate() {
                    return Err(CaptureError::Codec(
                        "ScanResult violates its consistency invariant".to_string(),
                    ));
                }
                Ok(Value::ScanResult(result))
            }
            TAG_COMPRESSION_RESULT => {
                let fields = self.read_field_list(5, "CompressionResult")?;
                let result = CompressionResult {
                    output_path: expect_opt_string(&fields[0], "CompressionResult.outputPath")?,
                    original_size: expect_int(&fields[1], "CompressionResult.originalSize")?,
                    compressed_size: expect_int(&fields[2], "CompressionResult.compressedSize")?,
                    success: expect_bool(&fields[3], "CompressionResult.success")?,
                    error_message: expect_opt_string(&fields[4], "CompressionResult.errorMessage")?,
                };
                if !result.validate() {
                    return Err(CaptureError::Codec(
                        "CompressionResult violates its consistency invariant".to_string(),
                    ));
                }
                Ok(Value::CompressionResult(result))
            }
            unknown => Err(CaptureError::Codec(format!("unknown type tag {unknown}"))),
        }
    }

    /// Read the positional field list that follows an extension tag.
    fn read_field_list(&mut self, expected: usize, type_name: &str) -> Result<Vec<Value>> {
        match self.read_value()? {
            Value::List(fields) if fields.len() == expected => Ok(fields),
            Value::List(fields) => Err(CaptureError::Codec(format!(
                "{type_name} expects {expected} fields, got {}",
                fields.len()
            ))),
            other => Err(CaptureError::Codec(format!(
                "{type_name} payload must be a list, got {other:?}"
            ))),
        }
    }
}

fn underflow(what: &str) -> CaptureError {
    CaptureError::Codec(format!("message too short reading {what}"))
}

fn expect_string(value: &Value, field: &str) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| type_mismatch(field, "string", value))
}

fn expect_opt_string(value: &Value, field: &str) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::Str(s) => Ok(Some(s.clone())),
        other => Err(type_mismatch(field, "string or null", other)),
    }
}

fn expect_bool(value: &Value, field: &str) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| type_mismatch(field, "bool", value))
}

fn expect_int(value: &Value, field: &str) -> Result<i64> {
    value
        .as_i64()
        .ok_or_else(|| type_mismatch(field, "integer", value))
}

fn expect_string_list(value: &Value, field: &str) -> Result<Vec<String>> {
    match value {
        Value::List(items) => items
            .iter()
            .map(|item| expect_string(item, field))
            .collect(),
        other => Err(type_mismatch(field, "list of strings", other)),
    }
}

fn type_mismatch(field: &str, expected: &str, got: &Value) -> CaptureError {
    CaptureError::Codec(format!("{field}: expected {expected}, got {got:?}"))
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: Value) {
        let bytes = encode_message(&value);
        let decoded = decode_message(&bytes).expect("decode");
        assert_eq!(decoded, value);
    }

    #[test]
    fn round_trips_scalars() {
        round_trip(Value::Null);
        round_trip(Value::Bool(true));
        round_trip(Value::Bool(false));
        round_trip(Value::I32(-42));
        round_trip(Value::I64(1_234_567_890_123));
        round_trip(Value::F64(3.141592653589793));
        round_trip(Value::Str("scan_1700000000000_0.jpg".into()));
        round_trip(Value::Str(String::new()));
    }

    #[test]
    fn round_trips_typed_lists() {
        round_trip(Value::U8List(vec![0, 1, 2, 255]));
        round_trip(Value::I32List(vec![i32::MIN, 0, i32::MAX]));
        round_trip(Value::I64List(vec![i64::MIN, 0, i64::MAX]));
        round_trip(Value::F64List(vec![0.5, -1.25, f64::MAX]));
        round_trip(Value::F32List(vec![0.5, -1.25]));
    }

    #[test]
    fn round_trips_nested_collections() {
        round_trip(Value::List(vec![
            Value::Null,
            Value::List(vec![Value::Str("a".into()), Value::I32(7)]),
            Value::Map(vec![
                (Value::Str("key".into()), Value::Bool(true)),
                (Value::I32(1), Value::F64(2.0)),
            ]),
        ]));
    }

    #[test]
    fn round_trips_domain_types() {
        round_trip(Value::ScanOptions(ScanOptions {
            output_format: OutputFormat::Png,
            auto_compress: true,
            compression_quality: 65,
        }));
        round_trip(Value::ScanResult(ScanResult::pages(vec![
            "/tmp/scan_0.jpg".into(),
            "/tmp/scan_1.jpg".into(),
        ])));
        round_trip(Value::ScanResult(ScanResult::failure("user cancelled")));
        round_trip(Value::CompressionResult(CompressionResult::compressed(
            "/tmp/out_compressed.jpg",
            250_000,
            80_000,
        )));
        round_trip(Value::CompressionResult(CompressionResult::failure(
            "Source file does not exist",
            0,
        )));
    }

    #[test]
    fn domain_tags_sit_above_the_standard_space() {
        let bytes = encode_message(&Value::ScanOptions(ScanOptions::default()));
        assert_eq!(bytes[0], 129);
        let bytes = encode_message(&Value::ScanResult(ScanResult::failure("x")));
        assert_eq!(bytes[0], 130);
        let bytes = encode_message(&Value::CompressionResult(CompressionResult::failure("x", 0)));
        assert_eq!(bytes[0], 131);
    }

    #[test]
    fn wide_size_prefixes_round_trip() {
        // 254 forces the u16 size form; 70_000 forces u32.
        round_trip(Value::Str("x".repeat(254)));
        round_trip(Value::U8List(vec![7u8; 70_000]));
        round_trip(Value::List(vec![Value::Null; 300]));
    }

    #[test]
    fn float64_payload_is_eight_byte_aligned() {
        // A one-byte tag means the scalar must be preceded by 7 padding bytes.
        let bytes = encode_message(&Value::F64(1.0));
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[8..], &1.0f64.to_le_bytes());

        // Same property inside a list, where the leading offset is odd.
        round_trip(Value::List(vec![
            Value::Str("odd".into()),
            Value::F64List(vec![1.0, 2.0, 3.0]),
        ]));
    }

    #[test]
    fn truncated_input_fails_closed() {
        let bytes = encode_message(&Value::Str("hello world".into()));
        for cut in 0..bytes.len() {
            assert!(decode_message(&bytes[..cut]).is_err(), "cut at {cut}");
        }
        let bytes = encode_message(&Value::ScanResult(ScanResult::pages(vec!["/a".into()])));
        assert!(decode_message(&bytes[..bytes.len() - 1]).is_err());

        // A float64 tag with no payload must not align past the buffer end.
        assert!(decode_message(&[6]).is_err());
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = encode_message(&Value::Bool(true));
        bytes.push(0);
        assert!(decode_message(&bytes).is_err());
    }

    #[test]
    fn unknown_tags_are_rejected() {
        // 5 is the legacy big-int tag; 200 is unassigned.
        assert!(decode_message(&[5]).is_err());
        assert!(decode_message(&[200]).is_err());
    }

    #[test]
    fn decode_rejects_invariant_violations() {
        // Hand-craft a ScanResult claiming success while carrying an error
        // message; the constructors cannot produce this, so decode must
        // refuse it.
        let mut bytes = vec![130u8];
        write_value(
            &mut bytes,
            &Value::List(vec![
                Value::List(vec![]),
                Value::Bool(true),
                Value::Str("boom".into()),
            ]),
        );
        assert!(decode_message(&bytes).is_err());

        // CompressionResult success without an output path.
        let mut bytes = vec![131u8];
        write_value(
            &mut bytes,
            &Value::List(vec![
                Value::Null,
                Value::I64(10),
                Value::I64(5),
                Value::Bool(true),
                Value::Null,
            ]),
        );
        assert!(decode_message(&bytes).is_err());
    }

    #[test]
    fn decode_rejects_wrong_field_counts() {
        let mut bytes = vec![129u8];
        write_value(&mut bytes, &Value::List(vec![Value::Bool(true)]));
        assert!(decode_message(&bytes).is_err());
    }

    #[test]
    fn scan_options_accept_int32_quality() {
        // Peers using the standard codec narrow small integers to 32 bits.
        let mut bytes = vec![129u8];
        write_value(
            &mut bytes,
            &Value::List(vec![
                Value::Str("jpeg".into()),
                Value::Bool(false),
                Value::I32(80),
            ]),
        );
        let decoded = decode_message(&bytes).expect("decode");
        assert_eq!(
            decoded,
            Value::ScanOptions(ScanOptions {
                output_format: OutputFormat::Jpeg,
                auto_compress: false,
                compression_quality: 80,
            })
        );
    }
}
