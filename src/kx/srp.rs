//! SRP, SRP_DSS and SRP_RSA (RFC 5054).

use std::sync::Arc;

use num_bigint::BigUint;
use zeroize::Zeroizing;

use super::params::{expect_end, sign_params, verify_params, ServerSrpParams};
use super::Env;
use crate::buffer::Buf;
use crate::codec::opaque16;
use crate::crypto::{CertificateRole, Credentials, SignatureVerifier, SigningKey};
use crate::crypto::{SrpGroup, SrpServerExchange, TlsCertificate};
use crate::error::AlertDescription;
use crate::types::SignatureAlgorithm;
use crate::Error;

#[derive(Debug)]
pub(crate) struct SrpKeyExchange {
    signature: Option<SignatureAlgorithm>,
    signer: Option<Arc<dyn SigningKey>>,
    verifier: Option<Box<dyn SignatureVerifier>>,
    // Client side
    server_params: Option<ServerSrpParams>,
    premaster: Option<Zeroizing<Vec<u8>>>,
    // Server side
    group: Option<SrpGroup>,
    exchange: Option<Box<dyn SrpServerExchange>>,
    client_public: Option<Vec<u8>>,
}

impl SrpKeyExchange {
    pub fn new(signature: Option<SignatureAlgorithm>) -> Self {
        SrpKeyExchange {
            signature,
            signer: None,
            verifier: None,
            server_params: None,
            premaster: None,
            group: None,
            exchange: None,
            client_public: None,
        }
    }

    fn signature(&self) -> Result<SignatureAlgorithm, Error> {
        self.signature
            .ok_or_else(|| Error::internal("SRP without certificate has no signature"))
    }

    pub fn process_server_credentials(&mut self, credentials: Credentials) -> Result<(), Error> {
        let signature = self.signature()?;
        let Credentials::Signer { chain, key } = credentials else {
            return Err(Error::internal("SRP key exchange needs signing credentials"));
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
        let login = env.server()?.srp_login.as_ref().ok_or_else(|| {
            Error::fatal(AlertDescription::UnknownPskIdentity, "no SRP login for client")
        })?;
        let exchange = env
            .provider()
            .srp_provider
            .server_start(&login.group, &login.verifier)
            .map_err(Error::CryptoError)?;

        let mut out = Buf::new();
        ServerSrpParams {
            group: login.group.clone(),
            salt: login.salt.clone(),
            public: exchange.pub_key().to_vec(),
        }
        .serialize(&mut out)?;

        if self.signature.is_some() {
            let signer = self
                .signer
                .as_ref()
                .ok_or_else(|| Error::internal("no server signing key"))?;
            let params = out.to_vec();
            sign_params(env.context, signer.as_ref(), &params, &mut out)?;
        }

        self.group = Some(login.group.clone());
        self.exchange = Some(exchange);
        Ok(out.into_vec())
    }

    pub fn process_server_key_exchange(&mut self, env: &Env<'_>, body: &[u8]) -> Result<(), Error> {
        let client = env.client()?;
        let (rest, params) = ServerSrpParams::parse(body)?;
        if !client.srp_verifier.accept(&params.group) {
            return Err(Error::fatal(
                AlertDescription::InsufficientSecurity,
                format!("SRP group rejected: {:?}", params.group),
            ));
        }
        check_public(&params.group, &params.public, "B")?;

        let rest = match self.signature {
            Some(signature) => {
                let signed = &body[..body.len() - rest.len()];
                let verifier = self
                    .verifier
                    .as_ref()
                    .ok_or_else(|| Error::internal("server certificate not processed"))?;
                verify_params(env.context, verifier.as_ref(), signature, signed, rest)?
            }
            None => rest,
        };
        expect_end(rest, "ServerKeyExchange")?;

        self.server_params = Some(params);
        Ok(())
    }

    pub fn generate_client_key_exchange(&mut self, env: &Env<'_>) -> Result<Vec<u8>, Error> {
        let credentials = env
            .client()?
            .srp
            .as_ref()
            .ok_or_else(|| Error::internal("no SRP credentials configured"))?;
        let params = self
            .server_params
            .as_ref()
            .ok_or_else(|| Error::internal("server params not received"))?;

        let agreement = env
            .provider()
            .srp_provider
            .client_agree(
                &params.group,
                &params.salt,
                credentials.identity(),
                credentials.password(),
                &params.public,
            )
            .map_err(|e| Error::fatal(AlertDescription::IllegalParameter, e))?;

        let mut out = Buf::new();
        out.put_opaque16(&agreement.public_key)?;
        self.premaster = Some(agreement.premaster);
        Ok(out.into_vec())
    }

    pub fn process_client_key_exchange(&mut self, body: &[u8]) -> Result<(), Error> {
        let group = self
            .group
            .as_ref()
            .ok_or_else(|| Error::internal("server params not generated"))?;
        let (rest, public) = opaque16(body)?;
        expect_end(rest, "ClientKeyExchange")?;
        check_public(group, public, "A")?;
        self.client_public = Some(public.to_vec());
        Ok(())
    }

    pub fn premaster(&mut self, env: &Env<'_>) -> Result<Zeroizing<Vec<u8>>, Error> {
        if let Some(premaster) = self.premaster.take() {
            return Ok(premaster);
        }
        let exchange = self
            .exchange
            .take()
            .ok_or_else(|| Error::internal("no SRP exchange"))?;
        let public = self
            .client_public
            .take()
            .ok_or_else(|| Error::internal("no client public value"))?;
        let mut out = Buf::new();
        exchange
            .complete(&public, &mut out)
            .map_err(|e| Error::fatal(AlertDescription::IllegalParameter, e))?;
        trace!("{:?} server premaster of {} bytes", env.algorithm, out.len());
        Ok(Zeroizing::new(out.into_vec()))
    }
}

/// Reject a public value that is 0 mod N.
fn check_public(group: &SrpGroup, public: &[u8], name: &str) -> Result<(), Error> {
    let n = BigUint::from_bytes_be(group.n());
    let value = BigUint::from_bytes_be(public);
    let zero = BigUint::from(0u32);
    if n == zero || value % n == zero {
        return Err(Error::fatal(
            AlertDescription::IllegalParameter,
            format!("SRP {} is 0 mod N", name),
        ));
    }
    Ok(())
}
