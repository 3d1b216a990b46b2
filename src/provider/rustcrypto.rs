//! Concrete [`PrimitiveProvider`] backed by RustCrypto crates.
//!
//! This is the only place in the crate that names a concrete cryptographic
//! algorithm; `cipher_box`, `cache` and `groups` only ever see the traits in
//! [`super`]. A FIPS-validated provider could replace this module entirely
//! without touching the core.

use aes::cipher::generic_array::GenericArray;
use aes::{Aes128, Aes256};
use aes_gcm::aead::{Aead, KeyInit as AeadKeyInit, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use des::TdesEde3;
use hmac::digest::KeyInit as HmacKeyInit;
use hmac::{Hmac, Mac as HmacMacTrait};
use rand::rngs::OsRng as RandOsRng;
use rand::RngCore;
use rc4::{consts::U16, Rc4, StreamCipher as Rc4StreamCipherTrait};
use sha1::Sha1;
use sha2::Sha256;

use super::{AeadCipher, BlockCipher, CipherMode, Mac, PrimitiveProvider, SecureRandom, StreamCipher};
use crate::error::ProviderError;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type Tdes3CbcEnc = cbc::Encryptor<TdesEde3>;
type Tdes3CbcDec = cbc::Decryptor<TdesEde3>;

/// The default, fully-working provider. Weak-cipher policy (`allowed`,
/// §3's BulkCipher descriptor) lives in `cipher_box`, not here -- this
/// module will happily construct any primitive it's asked for.
#[derive(Debug, Default)]
pub struct RustCryptoProvider;

impl RustCryptoProvider {
    pub fn new() -> Self {
        Self
    }
}

impl PrimitiveProvider for RustCryptoProvider {
    fn block_cipher(&self, transformation: &str) -> Result<Box<dyn BlockCipher>, ProviderError> {
        match transformation {
            "AES/CBC/NoPadding/128" => Ok(Box::new(AesCbc128::default())),
            "AES/CBC/NoPadding/256" => Ok(Box::new(AesCbc256::default())),
            "DESede/CBC/NoPadding" => Ok(Box::new(Tdes3Cbc::default())),
            other => Err(ProviderError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    fn stream_cipher(&self, transformation: &str) -> Result<Box<dyn StreamCipher>, ProviderError> {
        match transformation {
            "RC4" => Ok(Box::new(Rc4Stream::default())),
            other => Err(ProviderError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    fn aead_cipher(&self, transformation: &str) -> Result<Box<dyn AeadCipher>, ProviderError> {
        match transformation {
            "AES/GCM/NoPadding/128" => Ok(Box::new(AesGcm128)),
            "AES/GCM/NoPadding/256" => Ok(Box::new(AesGcm256)),
            other => Err(ProviderError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    fn mac(&self, transformation: &str) -> Result<Box<dyn Mac>, ProviderError> {
        match transformation {
            "HmacSHA1" => Ok(Box::new(HmacSha1)),
            "HmacSHA256" => Ok(Box::new(HmacSha256)),
            other => Err(ProviderError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    fn secure_random(&self) -> &dyn SecureRandom {
        &OS_RANDOM
    }
}

static OS_RANDOM: OsRandom = OsRandom;

/// [`SecureRandom`] backed by the operating system's CSPRNG.
pub struct OsRandom;

impl SecureRandom for OsRandom {
    fn fill(&self, dst: &mut [u8]) {
        RandOsRng.fill_bytes(dst);
    }
}

macro_rules! aes_gcm_impl {
    ($name:ident, $inner:ty, $key_size:expr) => {
        struct $name;

        impl AeadCipher for $name {
            fn key_size(&self) -> usize {
                $key_size
            }

            fn tag_size(&self) -> usize {
                16
            }

            fn seal(
                &self,
                key: &[u8],
                nonce: &[u8],
                plaintext: &[u8],
                aad: &[u8],
                out: &mut Vec<u8>,
            ) -> Result<(), ProviderError> {
                let cipher = <$inner>::new_from_slice(key)
                    .map_err(|_| ProviderError::InitializationFailed("bad key length".into()))?;
                let mut ciphertext = cipher
                    .encrypt(nonce.into(), Payload { msg: plaintext, aad })
                    .map_err(|_| ProviderError::OperationFailed)?;
                out.append(&mut ciphertext);
                Ok(())
            }

            fn open(
                &self,
                key: &[u8],
                nonce: &[u8],
                ciphertext_and_tag: &[u8],
                aad: &[u8],
                out: &mut Vec<u8>,
            ) -> Result<(), ProviderError> {
                let cipher = <$inner>::new_from_slice(key)
                    .map_err(|_| ProviderError::InitializationFailed("bad key length".into()))?;
                let mut plaintext = cipher
                    .decrypt(
                        nonce.into(),
                        Payload {
                            msg: ciphertext_and_tag,
                            aad,
                        },
                    )
                    // aes-gcm verifies the tag before returning anything; the
                    // single `aead::Error` variant carries no detail about
                    // why decryption failed, which is what we need here.
                    .map_err(|_| ProviderError::OperationFailed)?;
                out.append(&mut plaintext);
                Ok(())
            }
        }
    };
}

aes_gcm_impl!(AesGcm128, Aes128Gcm, 16);
aes_gcm_impl!(AesGcm256, Aes256Gcm, 32);

enum CbcState<Enc, Dec> {
    Uninit,
    Encrypting(Box<Enc>),
    Decrypting(Box<Dec>),
}

macro_rules! cbc_block_impl {
    ($name:ident, $enc:ty, $dec:ty, $block_size:expr) => {
        #[derive(Default)]
        struct $name {
            state: Option<CbcState<$enc, $dec>>,
        }

        impl Default for CbcState<$enc, $dec> {
            fn default() -> Self {
                CbcState::Uninit
            }
        }

        impl BlockCipher for $name {
            fn block_size(&self) -> usize {
                $block_size
            }

            fn init(&mut self, mode: CipherMode, key: &[u8], iv: &[u8]) -> Result<(), ProviderError> {
                self.state = Some(match mode {
                    CipherMode::Encrypt => CbcState::Encrypting(Box::new(
                        <$enc>::new_from_slices(key, iv)
                            .map_err(|_| ProviderError::InitializationFailed("bad key/iv length".into()))?,
                    )),
                    CipherMode::Decrypt => CbcState::Decrypting(Box::new(
                        <$dec>::new_from_slices(key, iv)
                            .map_err(|_| ProviderError::InitializationFailed("bad key/iv length".into()))?,
                    )),
                });
                Ok(())
            }

            fn update(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), ProviderError> {
                if input.is_empty() || input.len() % $block_size != 0 {
                    return Err(ProviderError::OperationFailed);
                }
                let mut blocks: Vec<GenericArray<u8, _>> = input
                    .chunks_exact($block_size)
                    .map(GenericArray::clone_from_slice)
                    .collect();
                match self
                    .state
                    .as_mut()
                    .ok_or_else(|| ProviderError::InitializationFailed("not initialized".into()))?
                {
                    CbcState::Encrypting(enc) => enc.encrypt_blocks_mut(&mut blocks),
                    CbcState::Decrypting(dec) => dec.decrypt_blocks_mut(&mut blocks),
                    CbcState::Uninit => {
                        return Err(ProviderError::InitializationFailed("not initialized".into()))
                    }
                }
                for block in &blocks {
                    out.extend_from_slice(block);
                }
                Ok(())
            }
        }
    };
}

cbc_block_impl!(AesCbc128, Aes128CbcEnc, Aes128CbcDec, 16);
cbc_block_impl!(AesCbc256, Aes256CbcEnc, Aes256CbcDec, 16);
cbc_block_impl!(Tdes3Cbc, Tdes3CbcEnc, Tdes3CbcDec, 8);

#[derive(Default)]
struct Rc4Stream {
    cipher: Option<Rc4<U16>>,
}

impl StreamCipher for Rc4Stream {
    fn init(&mut self, key: &[u8]) -> Result<(), ProviderError> {
        if key.len() != 16 {
            return Err(ProviderError::InitializationFailed(
                "RC4 provider configured for 128-bit keys".into(),
            ));
        }
        self.cipher = Some(
            Rc4::new_from_slice(key)
                .map_err(|_| ProviderError::InitializationFailed("bad RC4 key".into()))?,
        );
        Ok(())
    }

    fn update(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), ProviderError> {
        let cipher = self
            .cipher
            .as_mut()
            .ok_or_else(|| ProviderError::InitializationFailed("not initialized".into()))?;
        let mut buf = input.to_vec();
        cipher.apply_keystream(&mut buf);
        out.extend_from_slice(&buf);
        Ok(())
    }
}

macro_rules! hmac_impl {
    ($name:ident, $digest:ty, $out:expr) => {
        struct $name;

        impl Mac for $name {
            fn output_size(&self) -> usize {
                $out
            }

            fn compute(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>, ProviderError> {
                let mut mac = <Hmac<$digest> as HmacKeyInit>::new_from_slice(key)
                    .map_err(|_| ProviderError::InitializationFailed("bad MAC key".into()))?;
                mac.update(data);
                Ok(mac.finalize().into_bytes().to_vec())
            }
        }
    };
}

hmac_impl!(HmacSha1, Sha1, 20);
hmac_impl!(HmacSha256, Sha256, 32);
