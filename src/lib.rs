//! # opgp
//!
//! An implementation of the OpenPGP message format (RFC 4880): parsing and
//! producing packet streams, transferable keys, encrypted and signed
//! messages, cleartext signatures, key generation and revocation.
//!
//! The packet layer lives in [`packet`], composed objects (keys, messages,
//! standalone signatures) in [`composed`], with the most used types
//! re-exported at the crate root.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, rust_2018_idioms)]

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

#[macro_use]
pub mod errors;
pub mod armor;
pub mod cleartext;
pub mod composed;
pub mod crypto;
pub mod de;
pub mod normalize_lines;
pub mod packet;
pub mod ser;
pub mod types;
pub mod util;

pub use self::cleartext::CleartextSignedMessage;
pub use self::composed::*;
pub use self::packet::Signature;

/// Default maximum size that gets buffered.
pub const MAX_BUFFER_SIZE: usize = 1024 * 1024 * 1024;
