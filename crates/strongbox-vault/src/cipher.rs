// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Algorithm-specific seal/open operations behind a single engine.
//!
//! The nonce-based AEADs draw a fresh random 96-bit nonce from the system
//! CSPRNG on every seal and prefix it to the output: `nonce || ciphertext || tag`.
//! Nonce reuse under one key would be catastrophic for both GCM and Poly1305.
//! Fernet tokens carry their own IV, timestamp, and HMAC and are stored as
//! their ASCII form.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, CHACHA20_POLY1305, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use strongbox_core::{Algorithm, StrongboxError};
use tracing::debug;

use crate::key_material::KeyMaterial;

/// One authenticated encryption scheme bound to one key.
pub trait Cipher: Send + Sync {
    fn algorithm(&self) -> Algorithm;

    /// Encrypt `plaintext` into a self-contained blob.
    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, StrongboxError>;

    /// Authenticate and decrypt a blob produced by [`Cipher::seal`].
    fn open(&self, blob: &[u8]) -> Result<Vec<u8>, StrongboxError>;
}

/// Fernet token scheme (AES-128-CBC + HMAC-SHA256), expiry never checked.
pub struct FernetCipher {
    fernet: fernet::Fernet,
}

impl FernetCipher {
    pub fn new(material: &KeyMaterial) -> Result<Self, StrongboxError> {
        let token = std::str::from_utf8(material.key_bytes())
            .map_err(|_| StrongboxError::Crypto("fernet key is not ASCII".to_string()))?;
        let fernet = fernet::Fernet::new(token)
            .ok_or_else(|| StrongboxError::Crypto("invalid fernet key".to_string()))?;
        Ok(Self { fernet })
    }
}

impl Cipher for FernetCipher {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Fernet
    }

    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, StrongboxError> {
        Ok(self.fernet.encrypt(plaintext).into_bytes())
    }

    fn open(&self, blob: &[u8]) -> Result<Vec<u8>, StrongboxError> {
        let token = std::str::from_utf8(blob)
            .map_err(|_| StrongboxError::Authentication("fernet token is not ASCII".to_string()))?;
        self.fernet.decrypt(token.trim()).map_err(|_| {
            StrongboxError::Authentication(
                "fernet token is malformed or was issued under a different key".to_string(),
            )
        })
    }
}

/// Shared nonce-prefixed framing for the ring AEADs.
struct NonceAead {
    key: LessSafeKey,
    rng: SystemRandom,
    name: &'static str,
}

impl NonceAead {
    fn new(
        algorithm: &'static ring::aead::Algorithm,
        name: &'static str,
        key: &[u8],
    ) -> Result<Self, StrongboxError> {
        let unbound = UnboundKey::new(algorithm, key)
            .map_err(|_| StrongboxError::Crypto(format!("failed to create {name} key")))?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
            name,
        })
    }

    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, StrongboxError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| StrongboxError::Crypto("failed to generate random nonce".to_string()))?;

        // Seal in place: the buffer is extended with the authentication tag.
        let mut in_out = plaintext.to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut in_out,
            )
            .map_err(|_| StrongboxError::Crypto(format!("{} encryption failed", self.name)))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + in_out.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&in_out);
        Ok(blob)
    }

    fn open(&self, blob: &[u8]) -> Result<Vec<u8>, StrongboxError> {
        if blob.len() < NONCE_LEN {
            return Err(StrongboxError::Authentication(format!(
                "{} blob truncated: {} bytes, nonce alone is {NONCE_LEN}",
                self.name,
                blob.len()
            )));
        }
        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| StrongboxError::Authentication("malformed nonce".to_string()))?;

        let mut in_out = ciphertext.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| {
                StrongboxError::Authentication(format!(
                    "{} authentication failed -- wrong key or corrupted data",
                    self.name
                ))
            })?;
        Ok(plaintext.to_vec())
    }
}

/// AES-256-GCM.
pub struct AesGcmCipher(NonceAead);

impl AesGcmCipher {
    pub fn new(material: &KeyMaterial) -> Result<Self, StrongboxError> {
        NonceAead::new(&AES_256_GCM, "AES-256-GCM", material.key_bytes()).map(Self)
    }
}

impl Cipher for AesGcmCipher {
    fn algorithm(&self) -> Algorithm {
        Algorithm::AesGcm
    }

    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, StrongboxError> {
        self.0.seal(plaintext)
    }

    fn open(&self, blob: &[u8]) -> Result<Vec<u8>, StrongboxError> {
        self.0.open(blob)
    }
}

/// ChaCha20-Poly1305.
pub struct ChaCha20Cipher(NonceAead);

impl ChaCha20Cipher {
    pub fn new(material: &KeyMaterial) -> Result<Self, StrongboxError> {
        NonceAead::new(&CHACHA20_POLY1305, "ChaCha20-Poly1305", material.key_bytes()).map(Self)
    }
}

impl Cipher for ChaCha20Cipher {
    fn algorithm(&self) -> Algorithm {
        Algorithm::ChaCha20
    }

    fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, StrongboxError> {
        self.0.seal(plaintext)
    }

    fn open(&self, blob: &[u8]) -> Result<Vec<u8>, StrongboxError> {
        self.0.open(blob)
    }
}

/// Encrypts and decrypts with the algorithm fixed at construction.
///
/// Switching algorithms means building a new engine from new key material.
pub struct CipherEngine {
    cipher: Box<dyn Cipher>,
}

impl std::fmt::Debug for CipherEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherEngine")
            .field("algorithm", &self.cipher.algorithm())
            .finish_non_exhaustive()
    }
}

impl CipherEngine {
    /// Build the engine for the algorithm recorded in `material`.
    pub fn new(material: &KeyMaterial) -> Result<Self, StrongboxError> {
        let cipher: Box<dyn Cipher> = match material.algorithm() {
            Algorithm::Fernet => Box::new(FernetCipher::new(material)?),
            Algorithm::AesGcm => Box::new(AesGcmCipher::new(material)?),
            Algorithm::ChaCha20 => Box::new(ChaCha20Cipher::new(material)?),
        };
        debug!(algorithm = %cipher.algorithm(), "cipher engine ready");
        Ok(Self { cipher })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.cipher.algorithm()
    }

    /// Encrypt bytes. Empty input yields empty output without touching the cipher.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, StrongboxError> {
        if plaintext.is_empty() {
            return Ok(Vec::new());
        }
        self.cipher.seal(plaintext)
    }

    /// Decrypt bytes. Empty input yields empty output without touching the cipher.
    pub fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>, StrongboxError> {
        if blob.is_empty() {
            return Ok(Vec::new());
        }
        self.cipher.open(blob)
    }

    /// Encrypt a string field into printable text.
    ///
    /// Fernet tokens are already url-safe ASCII; nonce-based blobs are
    /// standard base64.
    pub fn encrypt_text(&self, plaintext: &str) -> Result<String, StrongboxError> {
        let blob = self.encrypt(plaintext.as_bytes())?;
        if self.algorithm().is_nonce_based() {
            Ok(STANDARD.encode(blob))
        } else {
            String::from_utf8(blob)
                .map_err(|_| StrongboxError::Crypto("fernet produced a non-ASCII token".to_string()))
        }
    }

    /// Inverse of [`CipherEngine::encrypt_text`].
    pub fn decrypt_text(&self, sealed: &str) -> Result<String, StrongboxError> {
        let blob = if self.algorithm().is_nonce_based() {
            STANDARD
                .decode(sealed.trim())
                .map_err(|_| StrongboxError::Authentication("field is not valid base64".to_string()))?
        } else {
            sealed.as_bytes().to_vec()
        };
        let plaintext = self.decrypt(&blob)?;
        String::from_utf8(plaintext)
            .map_err(|_| StrongboxError::Crypto("decrypted field is not valid UTF-8".to_string()))
    }
}

/// Fill a fixed-size array from the system CSPRNG.
pub(crate) fn random_array<const N: usize>() -> Result<[u8; N], StrongboxError> {
    let mut out = [0u8; N];
    SystemRandom::new()
        .fill(&mut out)
        .map_err(|_| StrongboxError::Crypto("failed to read system randomness".to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(algorithm: Algorithm) -> CipherEngine {
        CipherEngine::new(&KeyMaterial::generate(algorithm).unwrap()).unwrap()
    }

    #[test]
    fn every_algorithm_round_trips() {
        for alg in Algorithm::ALL {
            let engine = engine(alg);
            let blob = engine.encrypt(b"secret api key value").unwrap();
            assert_eq!(engine.decrypt(&blob).unwrap(), b"secret api key value", "{alg}");
        }
    }

    #[test]
    fn empty_input_short_circuits() {
        for alg in Algorithm::ALL {
            let engine = engine(alg);
            assert!(engine.encrypt(b"").unwrap().is_empty());
            assert!(engine.decrypt(b"").unwrap().is_empty());
        }
    }

    #[test]
    fn aes_gcm_blob_is_nonce_ciphertext_tag() {
        let engine = engine(Algorithm::AesGcm);
        let blob = engine.encrypt(b"hello").unwrap();
        assert_eq!(blob.len(), 12 + 5 + 16);
        assert_eq!(engine.decrypt(&blob).unwrap(), b"hello");
    }

    #[test]
    fn nonces_differ_between_encryptions() {
        for alg in [Algorithm::AesGcm, Algorithm::ChaCha20] {
            let engine = engine(alg);
            let a = engine.encrypt(b"same input twice").unwrap();
            let b = engine.encrypt(b"same input twice").unwrap();
            assert_ne!(a[..12], b[..12]);
            assert_ne!(a, b);
        }
    }

    #[test]
    fn cross_key_decryption_is_an_authentication_error() {
        for alg in Algorithm::ALL {
            let blob = engine(alg).encrypt(b"secret data").unwrap();
            let err = engine(alg).decrypt(&blob).unwrap_err();
            assert!(err.is_authentication(), "{alg}: {err}");
        }
    }

    #[test]
    fn truncated_blob_is_rejected() {
        let engine = engine(Algorithm::ChaCha20);
        let err = engine.decrypt(&[0u8; 7]).unwrap_err();
        assert!(err.is_authentication());

        let blob = engine.encrypt(b"do not truncate").unwrap();
        let err = engine.decrypt(&blob[..20]).unwrap_err();
        assert!(err.is_authentication());
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let engine = engine(Algorithm::AesGcm);
        let mut blob = engine.encrypt(b"do not tamper").unwrap();
        blob[14] ^= 0x01;
        assert!(engine.decrypt(&blob).unwrap_err().is_authentication());
    }

    #[test]
    fn fernet_output_is_a_token() {
        let engine = engine(Algorithm::Fernet);
        let blob = engine.encrypt(b"hello").unwrap();
        let token = std::str::from_utf8(&blob).unwrap();
        // Version byte 0x80 encodes to "gA" in url-safe base64.
        assert!(token.starts_with("gA"));
    }

    #[test]
    fn text_fields_round_trip() {
        for alg in Algorithm::ALL {
            let engine = engine(alg);
            let sealed = engine.encrypt_text("correct horse battery staple").unwrap();
            assert!(sealed.is_ascii());
            assert_eq!(engine.decrypt_text(&sealed).unwrap(), "correct horse battery staple");
        }
    }

    #[test]
    fn garbage_text_field_fails() {
        let engine = engine(Algorithm::AesGcm);
        assert!(engine.decrypt_text("not base64 at all!").is_err());
    }
}
