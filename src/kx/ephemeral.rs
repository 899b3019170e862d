//! DHE_DSS, DHE_RSA, DH_anon, ECDHE_ECDSA, ECDHE_RSA and ECDH_anon.

use std::sync::Arc;

use zeroize::Zeroizing;

use super::agreement::{usable_groups, EphemeralAgreement, Family};
use super::params::{expect_end, sign_params, verify_params};
use super::Env;
use crate::buffer::Buf;
use crate::crypto::{CertificateRole, Credentials, SignatureVerifier};
use crate::crypto::{SigningKey, TlsCertificate};
use crate::error::AlertDescription;
use crate::types::SignatureAlgorithm;
use crate::Error;

#[derive(Debug)]
pub(crate) struct EphemeralKeyExchange {
    family: Family,
    /// `None` for the anonymous variants.
    signature: Option<SignatureAlgorithm>,
    signer: Option<Arc<dyn SigningKey>>,
    verifier: Option<Box<dyn SignatureVerifier>>,
    agreement: EphemeralAgreement,
}

impl EphemeralKeyExchange {
    pub fn new(family: Family, signature: Option<SignatureAlgorithm>) -> Self {
        EphemeralKeyExchange {
            family,
            signature,
            signer: None,
            verifier: None,
            agreement: EphemeralAgreement::default(),
        }
    }

    fn signature(&self) -> Result<SignatureAlgorithm, Error> {
        self.signature
            .ok_or_else(|| Error::internal("anonymous key exchange has no signature"))
    }

    pub fn process_server_credentials(&mut self, credentials: Credentials) -> Result<(), Error> {
        let signature = self.signature()?;
        let Credentials::Signer { chain, key } = credentials else {
            return Err(Error::internal("ephemeral key exchange needs signing credentials"));
        };
        let usable = chain
            .end_entity()
            .is_some_and(|c| c.supports_role(CertificateRole::Signing(signature)));
        if !usable || key.algorithm() != signature {
            return Err(Error::internal(format!(
                "server credentials cannot sign with {:?}",
                signature
            )));
        }
        self.signer = Some(key);
        Ok(())
    }

    pub fn process_server_certificate(&mut self, cert: &dyn TlsCertificate) -> Result<(), Error> {
        let signature = self.signature()?;
        if !cert.supports_role(CertificateRole::Signing(signature)) {
            return Err(Error::fatal(
                AlertDescription::CertificateUnknown,
                format!("server certificate cannot sign with {:?}", signature),
            ));
        }
        let verifier = cert
            .create_verifier(signature)
            .map_err(|e| Error::fatal(AlertDescription::CertificateUnknown, e))?;
        self.verifier = Some(verifier);
        Ok(())
    }

    pub fn generate_server_key_exchange(&mut self, env: &Env<'_>) -> Result<Vec<u8>, Error> {
        let domain = env.server()?.ephemeral_domain(self.family)?;

        let mut out = Buf::new();
        self.agreement
            .generate_params(env.provider(), domain, &mut out)?;

        if self.signature.is_some() {
            let signer = self
                .signer
                .as_ref()
                .ok_or_else(|| Error::internal("no server signing key"))?;
            let params = out.to_vec();
            sign_params(env.context, signer.as_ref(), &params, &mut out)?;
        }

        Ok(out.into_vec())
    }

    pub fn process_server_key_exchange(&mut self, env: &Env<'_>, body: &[u8]) -> Result<(), Error> {
        let client = env.client()?;
        let rest = match self.family {
            Family::Dh => self
                .agreement
                .receive_dh_params(body, client.dh_verifier.as_ref())?,
            Family::Ec => {
                let groups = usable_groups(&client.provider, &client.ec_groups);
                self.agreement.receive_ec_params(body, &groups)?
            }
        };

        let rest = match self.signature {
            Some(signature) => {
                let params = &body[..body.len() - rest.len()];
                let verifier = self
                    .verifier
                    .as_ref()
                    .ok_or_else(|| Error::internal("server certificate not processed"))?;
                verify_params(env.context, verifier.as_ref(), signature, params, rest)?
            }
            None => rest,
        };

        expect_end(rest, "ServerKeyExchange")
    }

    pub fn generate_client_key_exchange(&mut self, env: &Env<'_>) -> Result<Vec<u8>, Error> {
        let mut out = Buf::new();
        self.agreement
            .generate_client_value(env.provider(), &mut out)?;
        Ok(out.into_vec())
    }

    pub fn process_client_key_exchange(&mut self, body: &[u8]) -> Result<(), Error> {
        let rest = self.agreement.receive_client_value(body)?;
        expect_end(rest, "ClientKeyExchange")
    }

    pub fn premaster(&mut self) -> Result<Zeroizing<Vec<u8>>, Error> {
        self.agreement.premaster()
    }
}
