//! Dataset encryption with AES-128-GCM.
//!
//! Every transfer generates a fresh 16-byte data key. Files are sealed as a
//! random 12-byte nonce followed by the ciphertext and authentication tag,
//! so a flipped byte anywhere in the payload fails decryption.

use std::fmt;
use std::fs;
use std::path::Path;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes128Gcm, Nonce};
use log::info;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

/// Length of a data key in bytes (AES-128).
pub const DATA_KEY_LEN: usize = 16;

/// Length of the GCM nonce prepended to each sealed file.
const NONCE_LEN: usize = 12;

/// Symmetric key protecting one dataset in transit.
///
/// The key material is wiped from memory when the value is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DataKey([u8; DATA_KEY_LEN]);

impl DataKey {
    /// Generates a fresh random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; DATA_KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        DataKey(bytes)
    }

    /// Wraps existing key material, validating its length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != DATA_KEY_LEN {
            return Err(Error::Crypto(format!(
                "data key must be {DATA_KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let mut key = [0u8; DATA_KEY_LEN];
        key.copy_from_slice(bytes);
        Ok(DataKey(key))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataKey(..)")
    }
}

/// Seals `plaintext` under `key` with a fresh random nonce.
pub fn encrypt(plaintext: &[u8], key: &DataKey) -> Result<Vec<u8>> {
    let cipher = Aes128Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| Error::Crypto(format!("invalid key length: {e}")))?;
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| Error::Crypto("encryption failed".into()))?;
    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Opens a sealed payload produced by [`encrypt`].
pub fn decrypt(sealed: &[u8], key: &DataKey) -> Result<Vec<u8>> {
    if sealed.len() < NONCE_LEN {
        return Err(Error::Crypto("sealed data too short".into()));
    }
    let cipher = Aes128Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| Error::Crypto(format!("invalid key length: {e}")))?;
    let nonce = Nonce::from_slice(&sealed[..NONCE_LEN]);
    cipher
        .decrypt(nonce, &sealed[NONCE_LEN..])
        .map_err(|_| Error::Crypto("decryption failed: wrong key or tampered data".into()))
}

/// Encrypts the file at `source` into `dest`.
pub fn encrypt_file(source: &Path, dest: &Path, key: &DataKey) -> Result<()> {
    let plaintext = fs::read(source)?;
    let sealed = encrypt(&plaintext, key)?;
    fs::write(dest, &sealed)?;
    info!(
        "Encrypted {} ({} bytes) to {} ({} bytes)",
        source.display(),
        plaintext.len(),
        dest.display(),
        sealed.len()
    );
    Ok(())
}

/// Decrypts the file at `source` into `dest`.
pub fn decrypt_file(source: &Path, dest: &Path, key: &DataKey) -> Result<()> {
    let sealed = fs::read(source)?;
    let plaintext = decrypt(&sealed, key)?;
    fs::write(dest, &plaintext)?;
    info!(
        "Decrypted {} ({} bytes) to {} ({} bytes)",
        source.display(),
        sealed.len(),
        dest.display(),
        plaintext.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let key = DataKey::generate();
        let plaintext = b"confidential dataset rows";
        let sealed = encrypt(plaintext, &key).unwrap();
        assert_ne!(&sealed[NONCE_LEN..], plaintext.as_slice());
        let opened = decrypt(&sealed, &key).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = DataKey::generate();
        let mut sealed = encrypt(b"payload", &key).unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        let err = decrypt(&sealed, &key).unwrap_err();
        assert!(matches!(err, Error::Crypto(_)));
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = encrypt(b"payload", &DataKey::generate()).unwrap();
        assert!(decrypt(&sealed, &DataKey::generate()).is_err());
    }

    #[test]
    fn test_rejects_short_data() {
        let err = decrypt(&[0u8; 4], &DataKey::generate()).unwrap_err();
        assert!(err.to_string().contains("too short"));
    }

    #[test]
    fn test_key_length_is_validated() {
        assert!(DataKey::from_bytes(&[0u8; 16]).is_ok());
        assert!(DataKey::from_bytes(&[0u8; 32]).is_err());
        assert!(DataKey::from_bytes(&[]).is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("data.csv");
        let sealed = dir.path().join("data.csv.encrypted");
        let restored = dir.path().join("restored.csv");
        fs::write(&source, b"a,b\n1,2\n").unwrap();

        let key = DataKey::generate();
        encrypt_file(&source, &sealed, &key).unwrap();
        assert_ne!(fs::read(&sealed).unwrap(), fs::read(&source).unwrap());
        decrypt_file(&sealed, &restored, &key).unwrap();
        assert_eq!(fs::read(&restored).unwrap(), b"a,b\n1,2\n");
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let key = DataKey::generate();
        assert_eq!(format!("{key:?}"), "DataKey(..)");
    }
}
