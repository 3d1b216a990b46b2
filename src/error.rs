use thiserror::Error;

/// Errors surfaced by this crate.
///
/// Every record-layer decrypt failure -- MAC mismatch, padding mismatch,
/// AEAD tag mismatch, length sanity violation -- collapses to
/// [`CipherError::BadRecordMac`]. This is deliberate: distinguishing the
/// sub-cause in an externally observable way (return value, log line,
/// timing) is exactly what enables padding-oracle and Lucky13-style
/// attacks, so no variant here is allowed to carry that detail.
#[derive(Debug, Error)]
pub enum CipherError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("bad record mac")]
    BadRecordMac,

    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

pub type Result<T> = core::result::Result<T, CipherError>;

/// Errors a [`crate::provider::PrimitiveProvider`] implementation may
/// return. These are narrower than [`CipherError`] because a provider
/// doesn't know about the record-layer error-collapsing policy; the
/// `cipher_box` module is responsible for folding these into
/// [`CipherError::BadRecordMac`] or [`CipherError::UnsupportedAlgorithm`]
/// as appropriate before they ever reach a caller.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("algorithm not available: {0}")]
    UnsupportedAlgorithm(String),

    #[error("primitive initialization failed: {0}")]
    InitializationFailed(String),

    #[error("primitive operation failed")]
    OperationFailed,
}

impl From<ProviderError> for CipherError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::UnsupportedAlgorithm(msg) => CipherError::UnsupportedAlgorithm(msg),
            // Both of these can only fire at construction time (wrong key
            // length, provider doesn't like the IV) or mid-record on an
            // AEAD tag mismatch. We can't tell which from here, so the
            // caller (CipherBox) decides based on which call site produced
            // the error.
            ProviderError::InitializationFailed(msg) => CipherError::Configuration(msg),
            ProviderError::OperationFailed => CipherError::BadRecordMac,
        }
    }
}
