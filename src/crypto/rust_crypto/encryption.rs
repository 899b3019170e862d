//! RSA PKCS#1 v1.5 encryption using the `rsa` crate.

use rand::rngs::OsRng;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use zeroize::Zeroizing;

use crate::buffer::Buf;
use crate::crypto::provider::{Decryptor, Encryptor};

/// Encrypts to the public key of a certificate.
#[derive(Debug)]
pub(super) struct RsaEncryptor(pub(super) RsaPublicKey);

impl Encryptor for RsaEncryptor {
    fn encrypt(&self, plaintext: &[u8], out: &mut Buf) -> Result<(), String> {
        let ciphertext = self
            .0
            .encrypt(&mut OsRng, Pkcs1v15Encrypt, plaintext)
            .map_err(|e| format!("RSA encryption failed: {}", e))?;
        out.clear();
        out.extend_from_slice(&ciphertext);
        Ok(())
    }
}

/// Private key for receiving an RSA encrypted pre-master secret.
pub(super) struct RsaDecryptionKey(pub(super) RsaPrivateKey);

impl std::fmt::Debug for RsaDecryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RsaDecryptionKey").finish()
    }
}

impl Decryptor for RsaDecryptionKey {
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>, String> {
        self.0
            .decrypt(Pkcs1v15Encrypt, ciphertext)
            .map(Zeroizing::new)
            .map_err(|_| "RSA decryption failed".to_string())
    }
}
