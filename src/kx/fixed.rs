//! DH_DSS, DH_RSA, ECDH_ECDSA and ECDH_RSA.
//!
//! The server agreement key is bound in its certificate. The client either
//! holds a certified key in the same group, in which case its
//! ClientKeyExchange is empty, or sends an ephemeral value.

use std::sync::Arc;

use zeroize::Zeroizing;

use super::agreement::{check_public, read_public, write_public, Ephemeral, Family};
use super::params::expect_end;
use super::Env;
use crate::buffer::Buf;
use crate::crypto::{AgreementDomain, AgreementKey, CertificateRole, Credentials, TlsCertificate};
use crate::error::AlertDescription;
use crate::Error;

#[derive(Debug)]
pub(crate) struct FixedKeyExchange {
    family: Family,
    // Server side
    server_key: Option<Arc<dyn AgreementKey>>,
    client_public: Option<Vec<u8>>,
    implicit_client_public: bool,
    // Client side
    server_public: Option<(AgreementDomain, Vec<u8>)>,
    client_key: Option<Arc<dyn AgreementKey>>,
    local: Option<Ephemeral>,
}

impl FixedKeyExchange {
    pub fn new(family: Family) -> Self {
        FixedKeyExchange {
            family,
            server_key: None,
            client_public: None,
            implicit_client_public: false,
            server_public: None,
            client_key: None,
            local: None,
        }
    }

    fn role(&self) -> CertificateRole {
        match self.family {
            Family::Dh => CertificateRole::DhAgreement,
            Family::Ec => CertificateRole::EcdhAgreement,
        }
    }

    pub fn process_server_credentials(&mut self, credentials: Credentials) -> Result<(), Error> {
        let Credentials::Agreement { chain, key } = credentials else {
            return Err(Error::internal("fixed key exchange needs agreement credentials"));
        };
        let usable = chain
            .end_entity()
            .is_some_and(|c| c.supports_role(self.role()));
        if !usable || Family::of(key.domain()) != self.family {
            return Err(Error::internal(format!(
                "server agreement key unusable for {:?}",
                self.family
            )));
        }
        self.server_key = Some(key);
        Ok(())
    }

    pub fn process_server_certificate(
        &mut self,
        env: &Env<'_>,
        cert: &dyn TlsCertificate,
    ) -> Result<(), Error> {
        let unknown = |reason: &str| Error::fatal(AlertDescription::CertificateUnknown, reason);

        if !cert.supports_role(self.role()) {
            return Err(unknown("server certificate not usable for key agreement"));
        }
        let domain = cert
            .agreement_domain()
            .ok_or_else(|| unknown("server certificate has no agreement key"))?;
        let public = cert
            .agreement_public_key()
            .ok_or_else(|| unknown("server certificate has no agreement key"))?;
        if Family::of(&domain) != self.family {
            return Err(unknown("server agreement key of the wrong kind"));
        }

        let client = env.client()?;
        match &domain {
            AgreementDomain::Dh(group) => {
                if !client.dh_verifier.accept(group) {
                    return Err(Error::fatal(
                        AlertDescription::InsufficientSecurity,
                        format!("DH group rejected: {:?}", group),
                    ));
                }
            }
            AgreementDomain::Ec(group) => {
                if !client.ec_groups.contains(group) || !client.provider.supports_group(*group) {
                    return Err(Error::fatal(
                        AlertDescription::IllegalParameter,
                        format!("server certificate uses unoffered group {:?}", group),
                    ));
                }
            }
        }
        check_public(&domain, public)?;

        self.server_public = Some((domain, public.to_vec()));
        Ok(())
    }

    pub fn process_client_credentials(&mut self, credentials: Credentials) -> Result<(), Error> {
        if let Credentials::Agreement { key, .. } = credentials {
            let (domain, _) = self
                .server_public
                .as_ref()
                .ok_or_else(|| Error::internal("server certificate not processed"))?;
            if key.domain() != domain {
                return Err(Error::internal("client agreement key not in the server group"));
            }
            self.client_key = Some(key);
        }
        Ok(())
    }

    pub fn process_client_certificate(&mut self, cert: &dyn TlsCertificate) -> Result<(), Error> {
        if !cert.supports_role(self.role()) {
            // A signing certificate, the client sends its value explicitly.
            return Ok(());
        }
        let server_key = self
            .server_key
            .as_ref()
            .ok_or_else(|| Error::internal("server credentials not processed"))?;
        match (cert.agreement_domain(), cert.agreement_public_key()) {
            (Some(domain), Some(public)) if &domain == server_key.domain() => {
                check_public(&domain, public)?;
                self.client_public = Some(public.to_vec());
                self.implicit_client_public = true;
                Ok(())
            }
            _ => Err(Error::fatal(
                AlertDescription::CertificateUnknown,
                "client agreement key not in the server group",
            )),
        }
    }

    pub fn generate_client_key_exchange(&mut self, env: &Env<'_>) -> Result<Vec<u8>, Error> {
        if self.client_key.is_some() {
            return Ok(Vec::new());
        }
        let (domain, _) = self
            .server_public
            .as_ref()
            .ok_or_else(|| Error::internal("server certificate not processed"))?;
        let local = Ephemeral::start(env.provider(), domain)?;
        let mut out = Buf::new();
        write_public(domain, local.public_key(), &mut out)?;
        self.local = Some(local);
        Ok(out.into_vec())
    }

    pub fn process_client_key_exchange(&mut self, body: &[u8]) -> Result<(), Error> {
        if self.implicit_client_public {
            return expect_end(body, "implicit client public value");
        }
        let server_key = self
            .server_key
            .as_ref()
            .ok_or_else(|| Error::internal("server credentials not processed"))?;
        let (rest, public) = read_public(server_key.domain(), body)?;
        expect_end(rest, "client public value")?;
        self.client_public = Some(public);
        Ok(())
    }

    pub fn premaster(&mut self, env: &Env<'_>) -> Result<Zeroizing<Vec<u8>>, Error> {
        let illegal = |e: String| Error::fatal(AlertDescription::IllegalParameter, e);

        if let Some(key) = self.server_key.take() {
            let public = self
                .client_public
                .take()
                .ok_or_else(|| Error::internal("no client public value"))?;
            let mut out = Buf::new();
            key.agree(&public, &mut out).map_err(illegal)?;
            return Ok(Zeroizing::new(out.into_vec()));
        }

        let (_, public) = self
            .server_public
            .take()
            .ok_or_else(|| Error::internal("no server public value"))?;
        if let Some(key) = self.client_key.take() {
            let mut out = Buf::new();
            key.agree(&public, &mut out).map_err(illegal)?;
            return Ok(Zeroizing::new(out.into_vec()));
        }
        let local = self
            .local
            .take()
            .ok_or_else(|| Error::internal("no client key pair"))?;
        debug!("{:?} client agreement completes with ephemeral key", env.algorithm);
        local.complete(&public)
    }
}
