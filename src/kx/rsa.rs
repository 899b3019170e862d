//! RSA key transport, alone and as the inner secret of RSA_PSK.

use std::sync::Arc;

use subtle::{ConditionallySelectable, ConstantTimeEq};
use zeroize::Zeroizing;

use super::params::expect_end;
use super::Env;
use crate::buffer::Buf;
use crate::codec::opaque16;
use crate::crypto::{CertificateRole, Credentials, Decryptor, Encryptor, TlsCertificate};
use crate::error::AlertDescription;
use crate::Error;

/// Length of an RSA pre-master secret.
pub const RSA_PREMASTER_LEN: usize = 48;

#[derive(Debug, Default)]
pub(crate) struct RsaTransport {
    decryptor: Option<Arc<dyn Decryptor>>,
    encryptor: Option<Box<dyn Encryptor>>,
    premaster: Option<Zeroizing<Vec<u8>>>,
}

impl RsaTransport {
    pub fn process_server_credentials(&mut self, credentials: Credentials) -> Result<(), Error> {
        let Credentials::Decryptor { chain, key } = credentials else {
            return Err(Error::internal("RSA key exchange needs decryption credentials"));
        };
        let usable = chain
            .end_entity()
            .is_some_and(|c| c.supports_role(CertificateRole::RsaEncryption));
        if !usable {
            return Err(Error::internal("server certificate not usable for RSA encryption"));
        }
        self.decryptor = Some(key);
        Ok(())
    }

    pub fn process_server_certificate(&mut self, cert: &dyn TlsCertificate) -> Result<(), Error> {
        if !cert.supports_role(CertificateRole::RsaEncryption) {
            return Err(Error::fatal(
                AlertDescription::CertificateUnknown,
                "server certificate not usable for RSA encryption",
            ));
        }
        let encryptor = cert
            .create_encryptor()
            .map_err(|e| Error::fatal(AlertDescription::CertificateUnknown, e))?;
        self.encryptor = Some(encryptor);
        Ok(())
    }

    /// Client: pick the pre-master secret and write it encrypted.
    pub fn write_encrypted(&mut self, env: &Env<'_>, out: &mut Buf) -> Result<(), Error> {
        let encryptor = self
            .encryptor
            .as_ref()
            .ok_or_else(|| Error::internal("server certificate not processed"))?;

        let mut premaster = env.provider().random_bytes(RSA_PREMASTER_LEN)?;
        premaster[..2].copy_from_slice(&env.context.client_version.as_u16().to_be_bytes());

        let mut encrypted = Buf::new();
        encryptor
            .encrypt(&premaster, &mut encrypted)
            .map_err(Error::CryptoError)?;
        out.put_opaque16(&encrypted)?;

        self.premaster = Some(premaster);
        Ok(())
    }

    /// Server: read and decrypt the pre-master secret, returning what follows it.
    ///
    /// Failures are never reported. Any decryption failure, wrong length or
    /// version mismatch silently yields a random secret instead, so the
    /// handshake fails later at Finished without revealing which.
    pub fn read_encrypted<'a>(&mut self, env: &Env<'_>, input: &'a [u8]) -> Result<&'a [u8], Error> {
        let decryptor = self
            .decryptor
            .as_ref()
            .ok_or_else(|| Error::internal("server credentials not processed"))?;
        let (rest, encrypted) = opaque16(input)?;

        let version = env.context.client_version.as_u16().to_be_bytes();
        let mut fallback = env.provider().random_bytes(RSA_PREMASTER_LEN)?;
        fallback[..2].copy_from_slice(&version);

        let decrypted = decryptor
            .decrypt(encrypted)
            .ok()
            .filter(|d| d.len() == RSA_PREMASTER_LEN);
        let valid = decrypted.is_some() as u8;
        let decrypted = decrypted.unwrap_or_else(|| Zeroizing::new(vec![0; RSA_PREMASTER_LEN]));

        let accept = subtle::Choice::from(valid) & decrypted[..2].ct_eq(&version);

        let mut premaster = Zeroizing::new(vec![0u8; RSA_PREMASTER_LEN]);
        for (i, byte) in premaster.iter_mut().enumerate() {
            *byte = u8::conditional_select(&fallback[i], &decrypted[i], accept);
        }
        if !bool::from(accept) {
            trace!("RSA pre-master rejected, using random substitute");
        }

        self.premaster = Some(premaster);
        Ok(rest)
    }

    pub fn premaster(&mut self) -> Result<Zeroizing<Vec<u8>>, Error> {
        self.premaster
            .take()
            .ok_or_else(|| Error::internal("no RSA pre-master secret"))
    }
}

#[derive(Debug, Default)]
pub(crate) struct RsaKeyExchange {
    pub transport: RsaTransport,
}

impl RsaKeyExchange {
    pub fn generate_client_key_exchange(&mut self, env: &Env<'_>) -> Result<Vec<u8>, Error> {
        let mut out = Buf::new();
        self.transport.write_encrypted(env, &mut out)?;
        Ok(out.into_vec())
    }

    pub fn process_client_key_exchange(&mut self, env: &Env<'_>, body: &[u8]) -> Result<(), Error> {
        let rest = self.transport.read_encrypted(env, body)?;
        expect_end(rest, "EncryptedPreMasterSecret")
    }
}
