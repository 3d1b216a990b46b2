//! Record-layer bulk cipher: the keystone of this crate.
//!
//! A [`CipherBox`] is constructed once per (connection, direction) and then
//! driven record by record through `encrypt`/`decrypt`. It owns exactly one
//! of three cipher shapes -- null, block-CBC, AEAD-GCM -- chosen at
//! construction from a [`BulkCipher`] descriptor, and never switches shape
//! afterward. Based on `pkg/crypto/src/tls/cipher_tls12.rs`'s
//! `CipherEndpointSpecTLS12`, generalized to also cover CBC and the null
//! cipher in one type instead of three.

use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;
use zeroize::Zeroizing;

use crate::error::{CipherError, Result};
use crate::provider::{CipherMode as ProviderCipherMode, PrimitiveProvider};
use crate::version::ProtocolVersion;

/// What kind of primitive a [`BulkCipher`] names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherType {
    Stream,
    Block,
    Aead,
}

/// Direction a `CipherBox` was constructed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Encrypt,
    Decrypt,
}

/// Describes a bulk cipher algorithm by name, the way a cipher-suite table
/// would. `allowed = false` marks an algorithm as present in the registry
/// for protocol compatibility but refused at construction time (export-grade
/// and legacy ciphers).
#[derive(Debug, Clone)]
pub struct BulkCipher {
    pub name: &'static str,
    pub transformation: &'static str,
    pub cipher_type: CipherType,
    /// Record IV size on the wire: block size for CBC, full nonce size
    /// for AEAD (fixed + explicit), 0 for stream ciphers.
    pub iv_size: usize,
    /// AEAD-only: size of the implicit (connection-scoped) part of the
    /// nonce. Zero for non-AEAD ciphers.
    pub fixed_iv_size: usize,
    /// AEAD authentication tag size in bytes. Zero for non-AEAD ciphers.
    pub tag_size: usize,
    pub block_size: usize,
    pub allowed: bool,
}

impl BulkCipher {
    pub const NULL: BulkCipher = BulkCipher {
        name: "NULL",
        transformation: "",
        cipher_type: CipherType::Stream,
        iv_size: 0,
        fixed_iv_size: 0,
        tag_size: 0,
        block_size: 1,
        allowed: true,
    };

    pub const AES_128_CBC: BulkCipher = BulkCipher {
        name: "AES_128_CBC",
        transformation: "AES/CBC/NoPadding/128",
        cipher_type: CipherType::Block,
        iv_size: 16,
        fixed_iv_size: 0,
        tag_size: 0,
        block_size: 16,
        allowed: true,
    };

    pub const AES_256_CBC: BulkCipher = BulkCipher {
        name: "AES_256_CBC",
        transformation: "AES/CBC/NoPadding/256",
        cipher_type: CipherType::Block,
        iv_size: 16,
        fixed_iv_size: 0,
        tag_size: 0,
        block_size: 16,
        allowed: true,
    };

    pub const AES_128_GCM: BulkCipher = BulkCipher {
        name: "AES_128_GCM",
        transformation: "AES/GCM/NoPadding/128",
        cipher_type: CipherType::Aead,
        iv_size: 12,
        fixed_iv_size: 4,
        tag_size: 16,
        block_size: 16,
        allowed: true,
    };

    pub const AES_256_GCM: BulkCipher = BulkCipher {
        name: "AES_256_GCM",
        transformation: "AES/GCM/NoPadding/256",
        cipher_type: CipherType::Aead,
        iv_size: 12,
        fixed_iv_size: 4,
        tag_size: 16,
        block_size: 16,
        allowed: true,
    };

    /// 3DES-CBC: present so older suites still negotiate, never selected
    /// by default (see `config`).
    pub const DESEDE_CBC: BulkCipher = BulkCipher {
        name: "DESEDE_CBC",
        transformation: "DESede/CBC/NoPadding",
        cipher_type: CipherType::Block,
        iv_size: 8,
        fixed_iv_size: 0,
        tag_size: 0,
        block_size: 8,
        allowed: false,
    };

    /// RC4: retained for interoperability with ancient peers, disabled by
    /// policy (RFC 7465 forbids its use).
    pub const RC4: BulkCipher = BulkCipher {
        name: "RC4",
        transformation: "RC4",
        cipher_type: CipherType::Stream,
        iv_size: 0,
        fixed_iv_size: 0,
        tag_size: 0,
        block_size: 1,
        allowed: false,
    };
}

/// The authenticated-data and sequence-number contract `CipherBox` consumes.
/// Owned by the record layer, not by this crate; `acquireAuthenticationBytes`
/// must be called exactly once per record, immediately before the
/// corresponding `encrypt`/`decrypt` call on AEAD paths.
pub trait Authenticator {
    /// 8-byte monotonic counter for the direction this box was built for.
    fn sequence_number(&self) -> u64;

    /// MAC length in bytes; 0 for AEAD ciphers (no separate MAC).
    fn mac_len(&self) -> usize;

    /// Returns the AEAD additional-authenticated-data prefix and advances
    /// the sequence number. Composition (what goes in the AAD) is owned by
    /// the Authenticator; `CipherBox` passes the bytes through unchanged.
    fn acquire_authentication_bytes(&mut self, content_type: u8, fragment_len: usize) -> Vec<u8>;
}

const MAX_ZERO_IV: usize = 16;

/// Process-wide fixed zero IV substituted for BLOCK decryption boxes built
/// without an explicit IV at TLS 1.1+ (where the true IV travels with every
/// record instead). A shared mask avoids per-connection randomness cost and
/// is not a secret: it is immediately overwritten by the peer's real
/// explicit IV on the first record.
static ZERO_IV: Lazy<[u8; MAX_ZERO_IV]> = Lazy::new(|| [0u8; MAX_ZERO_IV]);

/// Process-wide count of `BadRecordMac` failures across every `CipherBox`.
/// This is the only observable signal a failed record leaves behind: no
/// sub-cause (padding vs MAC vs AEAD tag), no per-record log line, nothing
/// that could seed a padding-oracle or Lucky13-style timing distinguisher.
static BAD_RECORD_MAC_COUNT: AtomicU64 = AtomicU64::new(0);

/// Current value of the aggregate `BadRecordMac` counter, for metrics
/// export. Never reset automatically.
pub fn bad_record_mac_count() -> u64 {
    BAD_RECORD_MAC_COUNT.load(Ordering::Relaxed)
}

fn note_bad_record_mac() -> CipherError {
    BAD_RECORD_MAC_COUNT.fetch_add(1, Ordering::Relaxed);
    CipherError::BadRecordMac
}

enum CipherState {
    Null,
    Stream(Box<dyn crate::provider::StreamCipher>),
    Block(Box<dyn crate::provider::BlockCipher>),
    /// AEAD state is held but not initialized until each record; `key` is
    /// retained across the box's lifetime and zeroized on drop.
    Aead { key: Zeroizing<Vec<u8>> },
}

/// Record-layer bulk cipher for one (connection, direction) pair. `key`
/// material (`fixed_iv` and, for AEAD, `CipherState::Aead::key`) is wrapped
/// in `Zeroizing`, so it is overwritten automatically when the box is
/// dropped -- no explicit `Drop` impl needed here.
pub struct CipherBox<'p> {
    provider: &'p dyn PrimitiveProvider,
    version: ProtocolVersion,
    cipher: BulkCipher,
    mode: Mode,
    state: CipherState,
    fixed_iv: Zeroizing<Vec<u8>>,
    record_iv_size: usize,
}

impl<'p> CipherBox<'p> {
    /// Identity cipher used for the NULL cipher suite.
    pub fn null(version: ProtocolVersion, mode: Mode) -> Self {
        CipherBox {
            provider: NULL_PROVIDER.as_ref(),
            version,
            cipher: BulkCipher::NULL,
            mode,
            state: CipherState::Null,
            fixed_iv: Zeroizing::new(Vec::new()),
            record_iv_size: 0,
        }
    }

    /// Constructs a cipher box for `cipher` keyed with `key`/`iv`.
    ///
    /// `iv` is `None` for a BLOCK decrypt box at TLS 1.1+: the real IV
    /// arrives with the first record, so construction substitutes
    /// [`ZERO_IV`]. For AEAD ciphers `iv` must be exactly `fixed_iv_size`
    /// bytes and is retained as the connection-scoped nonce prefix; the
    /// primitive itself is not initialized until the first record.
    pub fn new(
        provider: &'p dyn PrimitiveProvider,
        version: ProtocolVersion,
        cipher: BulkCipher,
        key: &[u8],
        iv: Option<&[u8]>,
        mode: Mode,
    ) -> Result<Self> {
        if version == ProtocolVersion::Ssl3_0 {
            return Err(CipherError::Configuration(
                "SSLv3 is not a supported construction target".into(),
            ));
        }
        if !cipher.allowed {
            return Err(CipherError::UnsupportedAlgorithm(cipher.name.to_string()));
        }

        let state = match cipher.cipher_type {
            CipherType::Aead => CipherState::Aead {
                key: Zeroizing::new(key.to_vec()),
            },
            CipherType::Stream => {
                let mut primitive = provider
                    .stream_cipher(cipher.transformation)
                    .map_err(CipherError::from)?;
                primitive.init(key).map_err(CipherError::from)?;
                CipherState::Stream(primitive)
            }
            CipherType::Block => {
                let mut primitive = provider
                    .block_cipher(cipher.transformation)
                    .map_err(CipherError::from)?;
                let resolved_iv;
                let iv_bytes = match iv {
                    Some(iv) => iv,
                    None => {
                        if mode == Mode::Encrypt || !version.has_explicit_block_iv() {
                            return Err(CipherError::Configuration(
                                "IV required for this protocol version/mode".into(),
                            ));
                        }
                        resolved_iv = &ZERO_IV[..cipher.block_size];
                        resolved_iv
                    }
                };
                let provider_mode = match mode {
                    Mode::Encrypt => ProviderCipherMode::Encrypt,
                    Mode::Decrypt => ProviderCipherMode::Decrypt,
                };
                primitive
                    .init(provider_mode, key, iv_bytes)
                    .map_err(CipherError::from)?;
                CipherState::Block(primitive)
            }
        };

        let fixed_iv = Zeroizing::new(match cipher.cipher_type {
            CipherType::Aead => iv
                .filter(|iv| iv.len() == cipher.fixed_iv_size)
                .ok_or_else(|| CipherError::Configuration("bad AEAD fixed IV length".into()))?
                .to_vec(),
            _ => Vec::new(),
        });

        let record_iv_size = cipher.iv_size.saturating_sub(cipher.fixed_iv_size);
        Ok(CipherBox {
            provider,
            version,
            cipher,
            mode,
            state,
            fixed_iv,
            record_iv_size,
        })
    }

    pub fn cipher_type(&self) -> CipherType {
        self.cipher.cipher_type
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Size of the explicit (wire-visible) nonce/IV this box prepends to
    /// each record it encrypts.
    pub fn explicit_nonce_size(&self) -> usize {
        match self.cipher.cipher_type {
            CipherType::Block if self.version.has_explicit_block_iv() => self.cipher.block_size,
            CipherType::Aead => self.record_iv_size,
            _ => 0,
        }
    }

    /// Produces the explicit nonce for the next record to encrypt. For
    /// BLOCK ciphers this is `block_size` random bytes (the caller must
    /// feed them through `encrypt` as a leading plaintext block so the CBC
    /// chain absorbs them). For AEAD it's the 8-byte sequence number, and
    /// as a side effect this (re)initializes the AEAD primitive state the
    /// next `encrypt` call will use.
    pub fn create_explicit_nonce(&mut self, authenticator: &dyn Authenticator) -> Vec<u8> {
        match self.cipher.cipher_type {
            CipherType::Block if self.version.has_explicit_block_iv() => {
                let mut random = vec![0u8; self.cipher.block_size];
                self.provider.secure_random().fill(&mut random);
                random
            }
            CipherType::Aead => authenticator.sequence_number().to_be_bytes().to_vec(),
            _ => Vec::new(),
        }
    }

    /// AEAD-only decrypt-side counterpart of `create_explicit_nonce`: reads
    /// the explicit nonce prefix off the front of `ciphertext`, composes it
    /// with the connection's fixed IV, and feeds AAD for this record via
    /// `authenticator.acquire_authentication_bytes` (advancing its sequence
    /// number). Returns `(nonce, aad, rest)` where `rest` is `ciphertext`
    /// with the explicit prefix stripped. BLOCK ciphers have no separate
    /// applying step -- their explicit IV is a decrypted block, stripped
    /// inline in `decrypt` after `primitive.update`.
    fn apply_explicit_nonce(
        &self,
        content_type: u8,
        ciphertext: &[u8],
        authenticator: &mut dyn Authenticator,
    ) -> Result<(Vec<u8>, Vec<u8>, Vec<u8>)> {
        let explicit_size = self.record_iv_size;
        if ciphertext.len() < explicit_size {
            return Err(note_bad_record_mac());
        }
        let (explicit, rest) = ciphertext.split_at(explicit_size);
        let mut nonce = self.fixed_iv.to_vec();
        nonce.extend_from_slice(explicit);
        let plaintext_len = rest.len().saturating_sub(self.cipher.tag_size);
        let aad = authenticator.acquire_authentication_bytes(content_type, plaintext_len);
        Ok((nonce, aad, rest.to_vec()))
    }

    /// Encrypts one record's plaintext fragment.
    ///
    /// For BLOCK ciphers at TLS >= 1.1, `plain_fragment` is expected to
    /// already have the random explicit-IV block prepended by the caller
    /// (from `create_explicit_nonce`); this function pads and encrypts the
    /// whole thing, and the resulting first ciphertext block doubles as the
    /// wire-visible explicit IV.
    pub fn encrypt(
        &mut self,
        content_type: u8,
        plain_fragment: &[u8],
        authenticator: &mut dyn Authenticator,
    ) -> Result<Vec<u8>> {
        match &mut self.state {
            CipherState::Null => Ok(plain_fragment.to_vec()),
            CipherState::Stream(primitive) => {
                let mut out = Vec::with_capacity(plain_fragment.len());
                primitive
                    .update(plain_fragment, &mut out)
                    .map_err(CipherError::from)?;
                Ok(out)
            }
            CipherState::Block(primitive) => {
                let padded = add_padding(plain_fragment, self.cipher.block_size);
                let mut out = Vec::with_capacity(padded.len());
                primitive.update(&padded, &mut out).map_err(CipherError::from)?;
                Ok(out)
            }
            CipherState::Aead { key } => {
                let explicit = authenticator.sequence_number().to_be_bytes();
                let mut nonce = self.fixed_iv.clone();
                nonce.extend_from_slice(&explicit);
                let aad = authenticator
                    .acquire_authentication_bytes(content_type, plain_fragment.len());
                let aead = self
                    .provider
                    .aead_cipher(self.cipher.transformation)
                    .map_err(CipherError::from)?;
                let mut out = Vec::with_capacity(plain_fragment.len() + self.cipher.tag_size);
                aead.seal(key, &nonce, plain_fragment, &aad, &mut out)
                    .map_err(CipherError::from)?;
                Ok(out)
            }
        }
    }

    /// Decrypts one record's ciphertext. `ciphertext` for BLOCK/AEAD must
    /// include the explicit nonce/IV prefix. The AEAD path delegates the
    /// prefix split, nonce composition, and AAD acquisition to
    /// `apply_explicit_nonce`; the BLOCK path strips its explicit IV inline,
    /// after decryption, since it's just the leading decrypted block.
    pub fn decrypt(
        &mut self,
        content_type: u8,
        ciphertext: &[u8],
        authenticator: &mut dyn Authenticator,
    ) -> Result<Vec<u8>> {
        if matches!(self.state, CipherState::Aead { .. }) {
            let (nonce, aad, rest) =
                self.apply_explicit_nonce(content_type, ciphertext, authenticator)?;
            let plaintext_len = rest.len().saturating_sub(self.cipher.tag_size);
            let key = match &self.state {
                CipherState::Aead { key } => key,
                _ => unreachable!(),
            };
            let aead = self
                .provider
                .aead_cipher(self.cipher.transformation)
                .map_err(CipherError::from)?;
            let mut out = Vec::with_capacity(plaintext_len);
            aead.open(key, &nonce, &rest, &aad, &mut out)
                .map_err(|_| note_bad_record_mac())?;
            return Ok(out);
        }

        match &mut self.state {
            CipherState::Null => Ok(ciphertext.to_vec()),
            CipherState::Stream(primitive) => {
                let mut out = Vec::with_capacity(ciphertext.len());
                primitive
                    .update(ciphertext, &mut out)
                    .map_err(CipherError::from)?;
                Ok(out)
            }
            CipherState::Block(primitive) => {
                let mac_len = authenticator.mac_len();
                sanity_check(mac_len, ciphertext.len(), self.cipher.block_size, self.version)?;
                let mut padded = Vec::with_capacity(ciphertext.len());
                primitive
                    .update(ciphertext, &mut padded)
                    .map_err(|_| note_bad_record_mac())?;
                let new_len =
                    remove_padding(&padded, mac_len, self.cipher.block_size, self.version)?;
                let mut plain = padded[..new_len].to_vec();
                if self.version.has_explicit_block_iv() {
                    if plain.len() < self.cipher.block_size {
                        return Err(note_bad_record_mac());
                    }
                    plain.drain(0..self.cipher.block_size);
                }
                Ok(plain)
            }
            CipherState::Aead { .. } => unreachable!("handled above"),
        }
    }
}

/// `ProviderError::from` collapses to `BadRecordMac` for anything that
/// could plausibly be triggered by attacker-controlled ciphertext (the
/// `CipherState::Aead`/`Block` match arms above rely on this). Construction
/// failures (bad key length, unknown transformation) surface their real
/// cause since they can only fire on misconfiguration, never peer input.
static NULL_PROVIDER: once_cell::sync::Lazy<Box<dyn PrimitiveProvider>> =
    once_cell::sync::Lazy::new(|| Box::new(crate::provider::rustcrypto::RustCryptoProvider::new()));

/// `addPadding`: appends `padLen + 1` bytes of value `padLen` so the total
/// length is a multiple of `block_size`. `padLen = block_size - (len + 1) mod
/// block_size`, always in `[0, block_size - 1]`.
pub fn add_padding(plain: &[u8], block_size: usize) -> Vec<u8> {
    let pad_len = block_size - (plain.len() + 1) % block_size;
    let mut out = Vec::with_capacity(plain.len() + pad_len + 1);
    out.extend_from_slice(plain);
    out.resize(out.len() + pad_len + 1, pad_len as u8);
    out
}

/// `removePadding`: constant-time with respect to the padding's content
/// (though not with respect to `padded.len()`, which is public). Scans
/// exactly `padLen + 1` bytes bounded by 256 iterations regardless of the
/// value read, so the number of memory accesses a timing attacker can
/// observe never depends on whether the padding was well-formed.
pub fn remove_padding(
    padded: &[u8],
    tag_len: usize,
    block_size: usize,
    version: ProtocolVersion,
) -> Result<usize> {
    if padded.is_empty() {
        return Err(note_bad_record_mac());
    }
    let pad_len = *padded.last().unwrap() as usize;
    let new_len = (padded.len() as isize) - (pad_len as isize) - 1;

    let missed = scan_padding(padded, pad_len).0;

    if new_len < tag_len as isize {
        return Err(note_bad_record_mac());
    }

    match version {
        ProtocolVersion::Ssl3_0 => {
            if pad_len > block_size {
                return Err(note_bad_record_mac());
            }
        }
        _ => {
            if missed != 0 {
                return Err(note_bad_record_mac());
            }
        }
    }

    Ok(new_len as usize)
}

/// Always runs all 256 iterations regardless of `pad_len`'s real value:
/// positions past the claimed padding (or past the start of `padded`) are
/// masked out of the accumulator rather than skipped, so the loop's
/// *shape* -- iteration count and branches taken -- never depends on
/// `pad_len`, which is attacker-influenced. Returns `(mismatch_accumulator,
/// iterations_run)`; the second element exists only so tests can confirm
/// it never varies.
fn scan_padding(padded: &[u8], pad_len: usize) -> (u32, u32) {
    let scan_len = (pad_len + 1).min(padded.len());
    let mut missed: u32 = 0;
    let mut iterations = 0u32;
    for i in 0..256 {
        let in_range = i < scan_len;
        let idx = padded.len() - 1 - i.min(padded.len() - 1);
        let got = padded[idx];
        let want = pad_len as u8;
        let mismatch = (got ^ want) as u32;
        missed |= mismatch & (in_range as u32).wrapping_neg();
        iterations += 1;
    }
    (missed, iterations)
}

/// `sanityCheck`: CBC fragment length must be a positive multiple of
/// `block_size` and at least `max(mac_len + 1, block_size)` plus one more
/// block at TLS >= 1.1 for the explicit IV. Checked before the primitive
/// ever touches the bytes, so a failure here never reveals anything about
/// padding or MAC content.
pub fn sanity_check(
    mac_len: usize,
    frag_len: usize,
    block_size: usize,
    version: ProtocolVersion,
) -> Result<()> {
    if frag_len == 0 || !frag_len.is_multiple_of(block_size) {
        return Err(note_bad_record_mac());
    }
    let mut min_len = std::cmp::max(mac_len + 1, block_size);
    if version.has_explicit_block_iv() {
        min_len += block_size;
    }
    if frag_len < min_len {
        return Err(note_bad_record_mac());
    }
    Ok(())
}

pub mod authenticator {
    //! Reference [`Authenticator`] implementation for TLS 1.2, used by this
    //! crate's own tests. AAD composition belongs to whatever Authenticator
    //! a real record layer provides; `CipherBox` never assumes this shape,
    //! it only calls through the trait.

    use super::Authenticator;

    /// Composes AAD as `sequence_number(8) || content_type(1) ||
    /// protocol_version(2) || plaintext_length(2)`, the conventional TLS 1.2
    /// GCM AAD layout.
    pub struct Tls12Authenticator {
        sequence_num: u64,
        mac_len: usize,
        legacy_record_version: (u8, u8),
    }

    impl Tls12Authenticator {
        pub fn new(mac_len: usize, legacy_record_version: (u8, u8)) -> Self {
            Tls12Authenticator {
                sequence_num: 0,
                mac_len,
                legacy_record_version,
            }
        }
    }

    impl Authenticator for Tls12Authenticator {
        fn sequence_number(&self) -> u64 {
            self.sequence_num
        }

        fn mac_len(&self) -> usize {
            self.mac_len
        }

        fn acquire_authentication_bytes(&mut self, content_type: u8, fragment_len: usize) -> Vec<u8> {
            let mut aad = Vec::with_capacity(13);
            aad.extend_from_slice(&self.sequence_num.to_be_bytes());
            aad.push(content_type);
            aad.push(self.legacy_record_version.0);
            aad.push(self.legacy_record_version.1);
            aad.extend_from_slice(&(fragment_len as u16).to_be_bytes());
            self.sequence_num += 1;
            aad
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::rustcrypto::RustCryptoProvider;

    struct TestAuthenticator {
        seq: u64,
        mac_len: usize,
    }

    impl Authenticator for TestAuthenticator {
        fn sequence_number(&self) -> u64 {
            self.seq
        }

        fn mac_len(&self) -> usize {
            self.mac_len
        }

        fn acquire_authentication_bytes(&mut self, content_type: u8, fragment_len: usize) -> Vec<u8> {
            let mut aad = Vec::with_capacity(13);
            aad.extend_from_slice(&self.seq.to_be_bytes());
            aad.push(content_type);
            aad.extend_from_slice(&[3, 3]);
            aad.extend_from_slice(&(fragment_len as u16).to_be_bytes());
            self.seq += 1;
            aad
        }
    }

    #[test]
    fn add_then_remove_padding_round_trips() {
        for len in 0..40 {
            let plain: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let padded = add_padding(&plain, 16);
            assert_eq!(padded.len() % 16, 0);
            let new_len = remove_padding(&padded, 0, 16, ProtocolVersion::Tls1_2).unwrap();
            assert_eq!(new_len, plain.len());
            assert_eq!(&padded[..new_len], &plain[..]);
        }
    }

    #[test]
    fn remove_padding_rejects_corrupted_padding() {
        let padded = add_padding(b"hello world", 16);
        let mut corrupted = padded.clone();
        let last = corrupted.len() - 1;
        corrupted[last - 1] ^= 0xff;
        assert!(remove_padding(&corrupted, 0, 16, ProtocolVersion::Tls1_2).is_err());
    }

    #[test]
    fn null_cipher_is_identity() {
        let mut auth = TestAuthenticator { seq: 0, mac_len: 0 };
        let mut enc = CipherBox::null(ProtocolVersion::Tls1_2, Mode::Encrypt);
        let out = enc.encrypt(23, b"hello", &mut auth).unwrap();
        assert_eq!(out, b"hello");
    }

    #[test]
    fn aead_round_trip_tls12() {
        let provider = RustCryptoProvider::new();
        let key = [0x7au8; 16];
        let fixed_iv = [0x01u8; 4];

        let mut enc_auth = TestAuthenticator { seq: 0, mac_len: 0 };
        let mut enc = CipherBox::new(
            &provider,
            ProtocolVersion::Tls1_2,
            BulkCipher::AES_128_GCM,
            &key,
            Some(&fixed_iv),
            Mode::Encrypt,
        )
        .unwrap();

        let plaintext = b"application data payload";
        let explicit = enc.create_explicit_nonce(&enc_auth);
        let ciphertext = enc.encrypt(23, plaintext, &mut enc_auth).unwrap();

        let mut wire = explicit.clone();
        wire.extend_from_slice(&ciphertext);

        let mut dec_auth = TestAuthenticator { seq: 0, mac_len: 0 };
        let mut dec = CipherBox::new(
            &provider,
            ProtocolVersion::Tls1_2,
            BulkCipher::AES_128_GCM,
            &key,
            Some(&fixed_iv),
            Mode::Decrypt,
        )
        .unwrap();
        let recovered = dec.decrypt(23, &wire, &mut dec_auth).unwrap();
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn aead_tampered_ciphertext_is_bad_record_mac() {
        let provider = RustCryptoProvider::new();
        let key = [0x7au8; 16];
        let fixed_iv = [0x01u8; 4];

        let mut enc_auth = TestAuthenticator { seq: 0, mac_len: 0 };
        let mut enc = CipherBox::new(
            &provider,
            ProtocolVersion::Tls1_2,
            BulkCipher::AES_128_GCM,
            &key,
            Some(&fixed_iv),
            Mode::Encrypt,
        )
        .unwrap();
        let explicit = enc.create_explicit_nonce(&enc_auth);
        let mut ciphertext = enc.encrypt(23, b"payload", &mut enc_auth).unwrap();
        *ciphertext.last_mut().unwrap() ^= 1;

        let mut wire = explicit;
        wire.extend_from_slice(&ciphertext);

        let mut dec_auth = TestAuthenticator { seq: 0, mac_len: 0 };
        let mut dec = CipherBox::new(
            &provider,
            ProtocolVersion::Tls1_2,
            BulkCipher::AES_128_GCM,
            &key,
            Some(&fixed_iv),
            Mode::Decrypt,
        )
        .unwrap();
        let err = dec.decrypt(23, &wire, &mut dec_auth).unwrap_err();
        assert!(matches!(err, CipherError::BadRecordMac));
    }

    #[test]
    fn cbc_round_trip_tls12_with_explicit_iv() {
        let provider = RustCryptoProvider::new();
        let key = [0x33u8; 16];
        let iv = [0x44u8; 16];

        let mut enc_auth = TestAuthenticator { seq: 0, mac_len: 20 };
        let mut enc = CipherBox::new(
            &provider,
            ProtocolVersion::Tls1_2,
            BulkCipher::AES_128_CBC,
            &key,
            Some(&iv),
            Mode::Encrypt,
        )
        .unwrap();

        let explicit = enc.create_explicit_nonce(&enc_auth);
        let mut fragment = explicit.clone();
        fragment.extend_from_slice(b"record payload here.");
        let ciphertext = enc.encrypt(23, &fragment, &mut enc_auth).unwrap();

        let mut dec_auth = TestAuthenticator { seq: 0, mac_len: 20 };
        let mut dec = CipherBox::new(
            &provider,
            ProtocolVersion::Tls1_2,
            BulkCipher::AES_128_CBC,
            &key,
            Some(&iv),
            Mode::Decrypt,
        )
        .unwrap();
        let recovered = dec.decrypt(23, &ciphertext, &mut dec_auth).unwrap();
        assert_eq!(recovered, b"record payload here.");
    }

    #[test]
    fn block_decrypt_without_iv_uses_zero_mask_at_tls11() {
        let provider = RustCryptoProvider::new();
        let key = [0x09u8; 16];
        let dec = CipherBox::new(
            &provider,
            ProtocolVersion::Tls1_1,
            BulkCipher::AES_128_CBC,
            &key,
            None,
            Mode::Decrypt,
        );
        assert!(dec.is_ok());
    }

    #[test]
    fn disallowed_cipher_is_refused() {
        let provider = RustCryptoProvider::new();
        let key = [0u8; 16];
        let result = CipherBox::new(
            &provider,
            ProtocolVersion::Tls1_2,
            BulkCipher::RC4,
            &key,
            None,
            Mode::Encrypt,
        );
        assert!(matches!(result, Err(CipherError::UnsupportedAlgorithm(_))));
    }

    #[test]
    fn aes_128_cbc_sha_tls10_padding_arithmetic() {
        // padLen = 16 - (3 + 20 + 1) mod 16 = 8, applied to
        // plaintext-plus-MAC ("abc" + a 20-byte MAC), not plaintext alone.
        let plain = b"abc";
        let mut plain_plus_mac = plain.to_vec();
        plain_plus_mac.extend_from_slice(&[0u8; 20]);
        let padded = add_padding(&plain_plus_mac, 16);
        let pad_len = *padded.last().unwrap();
        assert_eq!(pad_len, 8);
        assert_eq!(padded.len() - plain_plus_mac.len(), 9);

        let new_len = remove_padding(&padded, 20, 16, ProtocolVersion::Tls1_0).unwrap();
        assert_eq!(new_len, plain_plus_mac.len());
    }

    #[test]
    fn padding_check_runs_constant_iterations_across_pad_lengths() {
        for pad_len in 0..=300usize {
            let padded = vec![pad_len as u8; 512];
            let (_, iterations) = scan_padding(&padded, pad_len);
            assert_eq!(iterations, 256);
        }
    }

    #[test]
    fn corrupted_last_byte_always_fails_regardless_of_value() {
        let mac_len = 20;
        let plain_plus_mac = vec![0u8; 3 + mac_len];
        let good = add_padding(&plain_plus_mac, 16);
        for corrupt in 0u8..=255 {
            let mut record = good.clone();
            let last = record.len() - 1;
            record[last - 1] = corrupt;
            if corrupt as usize == *record.last().unwrap() as usize {
                continue;
            }
            let result = remove_padding(&record, mac_len, 16, ProtocolVersion::Tls1_0);
            assert!(result.is_err());
        }
    }

    #[test]
    fn tls11_identical_plaintexts_yield_different_ciphertexts() {
        let provider = RustCryptoProvider::new();
        let key = [0x55u8; 16];
        let iv = [0x11u8; 16];

        let mut auth_a = TestAuthenticator { seq: 0, mac_len: 0 };
        let mut enc_a = CipherBox::new(
            &provider,
            ProtocolVersion::Tls1_1,
            BulkCipher::AES_128_CBC,
            &key,
            Some(&iv),
            Mode::Encrypt,
        )
        .unwrap();
        let explicit_a = enc_a.create_explicit_nonce(&auth_a);
        let mut fragment_a = explicit_a.clone();
        fragment_a.extend_from_slice(b"identical plaintext fragment...");
        let ciphertext_a = enc_a.encrypt(23, &fragment_a, &mut auth_a).unwrap();

        let mut auth_b = TestAuthenticator { seq: 0, mac_len: 0 };
        let mut enc_b = CipherBox::new(
            &provider,
            ProtocolVersion::Tls1_1,
            BulkCipher::AES_128_CBC,
            &key,
            Some(&iv),
            Mode::Encrypt,
        )
        .unwrap();
        let explicit_b = enc_b.create_explicit_nonce(&auth_b);
        let mut fragment_b = explicit_b.clone();
        fragment_b.extend_from_slice(b"identical plaintext fragment...");
        let ciphertext_b = enc_b.encrypt(23, &fragment_b, &mut auth_b).unwrap();

        assert_ne!(explicit_a, explicit_b);
        assert_ne!(ciphertext_a[..16], ciphertext_b[..16]);
    }

    #[test]
    fn authenticator_reference_impl_composes_conventional_aad() {
        use super::authenticator::Tls12Authenticator;
        let mut auth = Tls12Authenticator::new(16, (3, 3));
        let aad = auth.acquire_authentication_bytes(23, 42);
        assert_eq!(aad.len(), 13);
        assert_eq!(&aad[0..8], &0u64.to_be_bytes());
        assert_eq!(aad[8], 23);
        assert_eq!(&aad[9..11], &[3, 3]);
        assert_eq!(&aad[11..13], &42u16.to_be_bytes());
        assert_eq!(auth.sequence_number(), 1);
    }
}
