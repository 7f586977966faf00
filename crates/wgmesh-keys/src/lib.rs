//! `WireGuard` key material for wgmesh.
//!
//! [`KeyStore`] keeps one keypair per `(network, identifier)` on disk and never
//! regenerates a private key once written. Key generation is delegated to a
//! [`KeyPrimitive`]: [`NativeKeys`] computes Curve25519 keys in-process,
//! [`WgCommand`] runs `wg genkey` / `wg pubkey`.

#![forbid(unsafe_code)]

pub mod error;
mod keys;
mod primitive;
pub mod secure_fs;
mod store;

pub use error::{KeyError, KeyErrorKind, KeyFormatError, PrimitiveError};
pub use keys::{PrivateKey, PublicKey, KEY_SIZE};
pub use primitive::{KeyPrimitive, NativeKeys, WgCommand};
pub use store::{KeyLayout, KeyLookup, KeyStore};
