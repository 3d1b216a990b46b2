//! Record-layer cryptography building blocks: a cipher box abstracting the
//! null/CBC/AEAD-GCM record transforms across SSL3.0-TLS1.2, a pluggable
//! primitive provider backed by `RustCrypto`, named-group negotiation, a
//! bounded concurrent LRU cache, and process configuration.
//!
//! Grounded on `pkg/crypto`'s TLS record-cipher and extension code; see
//! `DESIGN.md` at the repository root for the module-by-module ledger.

pub mod cache;
pub mod cipher_box;
pub mod config;
pub mod error;
pub mod groups;
pub mod provider;
pub mod version;
