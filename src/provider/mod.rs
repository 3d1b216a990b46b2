//! Abstraction over the cryptographic primitives `CipherBox` drives.
//!
//! Nothing in this module implements cryptography: it defines the seam the
//! core depends on, mirroring the external-collaborator shape described for
//! `PrimitiveProvider` -- construction by name/descriptor, `init`, `update`,
//! `doFinal`. The concrete implementation lives in [`rustcrypto`] and is a
//! separate, swappable edge of the system.

pub mod rustcrypto;

use crate::error::ProviderError;

/// Which half of a cipher a [`BlockCipher`]/[`StreamCipher`] was
/// initialized for. AEAD ciphers don't need this: GCM encrypt/decrypt use
/// the same primitive, keyed by whether `encrypt` or `decrypt` is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherMode {
    Encrypt,
    Decrypt,
}

/// A block cipher initialized once per `CipherBox` lifetime (CBC mode).
/// `update` is called once per record with a full multiple of `block_size`
/// bytes. The chaining state (the running IV) is internal and carries over
/// between `update` calls -- that's what lets TLS 1.1+'s explicit-IV scheme
/// work: the caller prepends a random block to the plaintext before the
/// first `update` after `init`, and that block's ciphertext is both the
/// wire-visible explicit IV and the chain's new running state. This trait
/// never pads -- that's `cipher_box`'s job.
pub trait BlockCipher: Send {
    fn block_size(&self) -> usize;

    fn init(&mut self, mode: CipherMode, key: &[u8], iv: &[u8]) -> Result<(), ProviderError>;

    /// `input` must be a non-zero multiple of `block_size`.
    fn update(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), ProviderError>;
}

/// A stream cipher (RC4). Keyed once via `init`, `update` may be called any
/// number of times; there is no notion of a per-record IV.
pub trait StreamCipher: Send {
    fn init(&mut self, key: &[u8]) -> Result<(), ProviderError>;

    fn update(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), ProviderError>;
}

/// An AEAD cipher. Unlike [`BlockCipher`], `CipherBox` re-initializes this
/// once per record (construction is cheap and the nonce changes every
/// record), so the trait exposes a single-shot `seal`/`open` instead of a
/// persistent `init`+`update`+`doFinal` sequence.
pub trait AeadCipher: Send {
    fn key_size(&self) -> usize;
    fn tag_size(&self) -> usize;

    /// Encrypts `plaintext`, appending ciphertext followed by the
    /// authentication tag to `out`.
    fn seal(
        &self,
        key: &[u8],
        nonce: &[u8],
        plaintext: &[u8],
        aad: &[u8],
        out: &mut Vec<u8>,
    ) -> Result<(), ProviderError>;

    /// Verifies and decrypts `ciphertext_and_tag`, appending plaintext to
    /// `out`. Tag verification MUST be constant-time; on mismatch this
    /// returns `Err(ProviderError::OperationFailed)` with no other
    /// observable difference from any other failure mode.
    fn open(
        &self,
        key: &[u8],
        nonce: &[u8],
        ciphertext_and_tag: &[u8],
        aad: &[u8],
        out: &mut Vec<u8>,
    ) -> Result<(), ProviderError>;
}

/// A MAC primitive (HMAC-SHA1 / HMAC-SHA256), used by an `Authenticator`
/// implementor driving a CBC `CipherBox`. `CipherBox` itself never computes
/// a MAC -- that's outside its contract -- but a concrete provider needs to
/// expose one for a full stack to be testable end to end.
pub trait Mac: Send {
    fn output_size(&self) -> usize;
    fn compute(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>, ProviderError>;
}

/// Source of cryptographically secure random bytes, used for CBC explicit
/// IVs (TLS 1.1+) and anywhere else `CipherBox` needs randomness.
pub trait SecureRandom: Send {
    fn fill(&self, dst: &mut [u8]);
}

/// Factory the core depends on to obtain primitive instances by name. A
/// `CipherBox` is handed a `&dyn PrimitiveProvider` at construction and
/// never names a concrete crate itself.
pub trait PrimitiveProvider: Send + Sync {
    fn block_cipher(&self, transformation: &str) -> Result<Box<dyn BlockCipher>, ProviderError>;
    fn stream_cipher(&self, transformation: &str) -> Result<Box<dyn StreamCipher>, ProviderError>;
    fn aead_cipher(&self, transformation: &str) -> Result<Box<dyn AeadCipher>, ProviderError>;
    fn mac(&self, transformation: &str) -> Result<Box<dyn Mac>, ProviderError>;
    fn secure_random(&self) -> &dyn SecureRandom;
}
