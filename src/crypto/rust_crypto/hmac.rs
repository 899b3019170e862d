//! HMAC using RustCrypto.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::buffer::Buf;
use crate::crypto::provider::{HmacProvider, MacContext};

/// Reusable HMAC-SHA256.
///
/// The keyed initial state is kept aside so a reset is a clone of it.
#[derive(Clone)]
struct HmacSha256Context {
    initial: Hmac<Sha256>,
    running: Hmac<Sha256>,
}

impl std::fmt::Debug for HmacSha256Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSha256Context").finish_non_exhaustive()
    }
}

impl MacContext for HmacSha256Context {
    fn update(&mut self, data: &[u8]) {
        self.running.update(data);
    }

    fn finalize_reset(&mut self, out: &mut Buf) {
        let done = std::mem::replace(&mut self.running, self.initial.clone());
        out.clear();
        out.extend_from_slice(&done.finalize().into_bytes());
    }

    fn reset(&mut self) {
        self.running = self.initial.clone();
    }

    fn output_len(&self) -> usize {
        32
    }
}

/// HMAC provider implementation.
#[derive(Debug)]
pub(super) struct RustCryptoHmacProvider;

impl HmacProvider for RustCryptoHmacProvider {
    fn hmac_sha256(&self, key: &[u8], data: &[u8]) -> Result<[u8; 32], String> {
        let mut mac =
            Hmac::<Sha256>::new_from_slice(key).map_err(|_| "Invalid HMAC key".to_string())?;
        mac.update(data);
        let result = mac.finalize();
        let bytes = result.into_bytes();

        let mut output = [0u8; 32];
        output.copy_from_slice(&bytes);
        Ok(output)
    }

    fn create_hmac_sha256(&self, key: &[u8]) -> Result<Box<dyn MacContext>, String> {
        let initial =
            Hmac::<Sha256>::new_from_slice(key).map_err(|_| "Invalid HMAC key".to_string())?;
        Ok(Box::new(HmacSha256Context {
            running: initial.clone(),
            initial,
        }))
    }
}

/// Static instance of the HMAC provider.
pub(super) static HMAC_PROVIDER: RustCryptoHmacProvider = RustCryptoHmacProvider;
