//! PSK, DHE_PSK, ECDHE_PSK and RSA_PSK (RFC 4279, RFC 5489).

use zeroize::Zeroizing;

use super::agreement::{usable_groups, EphemeralAgreement, Family};
use super::params::expect_end;
use super::rsa::RsaTransport;
use super::Env;
use crate::buffer::Buf;
use crate::codec::opaque16;
use crate::crypto::{Credentials, TlsCertificate};
use crate::error::AlertDescription;
use crate::types::KeyExchangeAlgorithm;
use crate::Error;

/// Where the other_secret half of the pre-master secret comes from.
#[derive(Debug)]
enum OtherSecret {
    /// Zeros the length of the PSK.
    Zeros,
    Agreement(Family, EphemeralAgreement),
    Rsa(RsaTransport),
}

#[derive(Debug)]
pub(crate) struct PskKeyExchange {
    other: OtherSecret,
    /// Hint from the server, empty if it sent none.
    hint: Vec<u8>,
    psk: Option<Zeroizing<Vec<u8>>>,
}

impl PskKeyExchange {
    pub fn new(algorithm: KeyExchangeAlgorithm) -> Self {
        let other = match algorithm {
            KeyExchangeAlgorithm::DHE_PSK => {
                OtherSecret::Agreement(Family::Dh, EphemeralAgreement::default())
            }
            KeyExchangeAlgorithm::ECDHE_PSK => {
                OtherSecret::Agreement(Family::Ec, EphemeralAgreement::default())
            }
            KeyExchangeAlgorithm::RSA_PSK => OtherSecret::Rsa(RsaTransport::default()),
            _ => OtherSecret::Zeros,
        };
        PskKeyExchange {
            other,
            hint: Vec::new(),
            psk: None,
        }
    }

    pub fn process_server_credentials(&mut self, credentials: Credentials) -> Result<(), Error> {
        match &mut self.other {
            OtherSecret::Rsa(transport) => transport.process_server_credentials(credentials),
            _ => Err(Error::internal("PSK key exchange without server certificate")),
        }
    }

    pub fn process_server_certificate(&mut self, cert: &dyn TlsCertificate) -> Result<(), Error> {
        match &mut self.other {
            OtherSecret::Rsa(transport) => transport.process_server_certificate(cert),
            _ => Err(Error::internal("PSK key exchange without server certificate")),
        }
    }

    /// `None` when there is neither a hint nor params to send.
    pub fn generate_server_key_exchange(&mut self, env: &Env<'_>) -> Result<Option<Vec<u8>>, Error> {
        let server = env.server()?;
        let manager = server
            .psk_manager
            .as_ref()
            .ok_or_else(|| Error::internal("no PSK identity manager"))?;
        let hint = manager.hint();

        let mut out = Buf::new();
        match &mut self.other {
            OtherSecret::Agreement(family, agreement) => {
                out.put_opaque16(hint.as_deref().unwrap_or_default())?;
                let domain = server.ephemeral_domain(*family)?;
                agreement.generate_params(env.provider(), domain, &mut out)?;
            }
            OtherSecret::Zeros | OtherSecret::Rsa(_) => match hint {
                Some(hint) => out.put_opaque16(&hint)?,
                None => return Ok(None),
            },
        }
        Ok(Some(out.into_vec()))
    }

    pub fn process_server_key_exchange(&mut self, env: &Env<'_>, body: &[u8]) -> Result<(), Error> {
        let client = env.client()?;
        let (rest, hint) = opaque16(body)?;
        self.hint = hint.to_vec();

        let rest = match &mut self.other {
            OtherSecret::Agreement(Family::Dh, agreement) => {
                agreement.receive_dh_params(rest, client.dh_verifier.as_ref())?
            }
            OtherSecret::Agreement(Family::Ec, agreement) => {
                let groups = usable_groups(&client.provider, &client.ec_groups);
                agreement.receive_ec_params(rest, &groups)?
            }
            OtherSecret::Zeros | OtherSecret::Rsa(_) => rest,
        };
        expect_end(rest, "ServerKeyExchange")
    }

    pub fn generate_client_key_exchange(&mut self, env: &Env<'_>) -> Result<Vec<u8>, Error> {
        let psk = env
            .client()?
            .psk
            .as_ref()
            .ok_or_else(|| Error::internal("no PSK identity configured"))?;
        if !self.hint.is_empty() {
            debug!("PSK identity hint: {}", String::from_utf8_lossy(&self.hint));
        }

        let mut out = Buf::new();
        out.put_opaque16(psk.identity())?;
        match &mut self.other {
            OtherSecret::Zeros => {}
            OtherSecret::Agreement(_, agreement) => {
                agreement.generate_client_value(env.provider(), &mut out)?
            }
            OtherSecret::Rsa(transport) => transport.write_encrypted(env, &mut out)?,
        }

        self.psk = Some(Zeroizing::new(psk.key().to_vec()));
        Ok(out.into_vec())
    }

    pub fn process_client_key_exchange(&mut self, env: &Env<'_>, body: &[u8]) -> Result<(), Error> {
        let manager = env
            .server()?
            .psk_manager
            .as_ref()
            .ok_or_else(|| Error::internal("no PSK identity manager"))?;
        let (rest, identity) = opaque16(body)?;
        let psk = manager.get_psk(identity).ok_or_else(|| {
            Error::fatal(
                AlertDescription::UnknownPskIdentity,
                format!("unknown PSK identity {}", String::from_utf8_lossy(identity)),
            )
        })?;

        let rest = match &mut self.other {
            OtherSecret::Zeros => rest,
            OtherSecret::Agreement(_, agreement) => agreement.receive_client_value(rest)?,
            OtherSecret::Rsa(transport) => transport.read_encrypted(env, rest)?,
        };
        expect_end(rest, "ClientKeyExchange")?;

        self.psk = Some(psk);
        Ok(())
    }

    /// opaque16 other_secret ‖ opaque16 psk.
    pub fn premaster(&mut self) -> Result<Zeroizing<Vec<u8>>, Error> {
        let psk = self
            .psk
            .take()
            .ok_or_else(|| Error::internal("no PSK"))?;
        let other = match &mut self.other {
            OtherSecret::Zeros => Zeroizing::new(vec![0; psk.len()]),
            OtherSecret::Agreement(_, agreement) => agreement.premaster()?,
            OtherSecret::Rsa(transport) => transport.premaster()?,
        };
        Ok(psk_premaster(&other, &psk))
    }
}

fn psk_premaster(other: &[u8], psk: &[u8]) -> Zeroizing<Vec<u8>> {
    let mut out = Zeroizing::new(Vec::with_capacity(4 + other.len() + psk.len()));
    out.extend_from_slice(&(other.len() as u16).to_be_bytes());
    out.extend_from_slice(other);
    out.extend_from_slice(&(psk.len() as u16).to_be_bytes());
    out.extend_from_slice(psk);
    out
}
