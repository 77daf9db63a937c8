// SPDX-License-Identifier: PMPL-1.0-or-later
//
// capturekit-codec — Tagged binary message codec for the CaptureKit channel
// protocol.
//
// Implements the host framework's standard message codec (one discriminator
// byte per value, little-endian scalars, size-prefixed collections, aligned
// typed lists) extended with three reserved tags for the domain types. The
// extension tags live above the standard tag space so they can never collide
// with a built-in scalar or collection tag.

pub mod codec;
pub mod value;

pub use codec::{decode_message, encode_message};
pub use value::Value;
