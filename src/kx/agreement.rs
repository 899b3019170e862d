//! Diffie-Hellman style agreements shared by several key exchange families.

use zeroize::Zeroizing;

use super::params::{check_dh_public, check_ec_point, DhGroupVerifier, ServerDhParams};
use super::params::ServerEcdhParams;
use crate::buffer::Buf;
use crate::codec::{opaque16, opaque8};
use crate::crypto::{ActiveDhExchange, ActiveKeyExchange, AgreementDomain, CryptoProvider};
use crate::error::AlertDescription;
use crate::types::NamedGroup;
use crate::Error;

/// Whether an agreement runs over a finite field or a curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Family {
    Dh,
    Ec,
}

impl Family {
    pub fn of(domain: &AgreementDomain) -> Family {
        match domain {
            AgreementDomain::Dh(_) => Family::Dh,
            AgreementDomain::Ec(_) => Family::Ec,
        }
    }
}

/// A fresh key pair for one handshake.
#[derive(Debug)]
pub(crate) enum Ephemeral {
    Dh(Box<dyn ActiveDhExchange>),
    Ec(Box<dyn ActiveKeyExchange>),
}

impl Ephemeral {
    pub fn start(provider: &CryptoProvider, domain: &AgreementDomain) -> Result<Self, Error> {
        match domain {
            AgreementDomain::Dh(group) => provider
                .dh_provider
                .start_exchange(group)
                .map(Ephemeral::Dh)
                .map_err(Error::CryptoError),
            AgreementDomain::Ec(group) => {
                let kx = provider.find_kx_group(*group).ok_or_else(|| {
                    Error::internal(format!("no provider support for {:?}", group))
                })?;
                kx.start_exchange(Buf::new())
                    .map(Ephemeral::Ec)
                    .map_err(Error::CryptoError)
            }
        }
    }

    pub fn public_key(&self) -> &[u8] {
        match self {
            Ephemeral::Dh(kx) => kx.pub_key(),
            Ephemeral::Ec(kx) => kx.pub_key(),
        }
    }

    pub fn complete(self, peer: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
        let mut out = Buf::new();
        let result = match self {
            Ephemeral::Dh(kx) => kx.complete(peer, &mut out),
            Ephemeral::Ec(kx) => kx.complete(peer, &mut out),
        };
        result.map_err(|e| Error::fatal(AlertDescription::IllegalParameter, e))?;
        Ok(Zeroizing::new(out.into_vec()))
    }
}

/// Validate a peer public value for `domain`.
pub(crate) fn check_public(domain: &AgreementDomain, public: &[u8]) -> Result<(), Error> {
    match domain {
        AgreementDomain::Dh(group) => check_dh_public(group, public),
        AgreementDomain::Ec(group) => check_ec_point(*group, public),
    }
}

/// Write a public value as carried in ClientKeyExchange.
pub(crate) fn write_public(
    domain: &AgreementDomain,
    public: &[u8],
    out: &mut Buf,
) -> Result<(), Error> {
    match domain {
        AgreementDomain::Dh(_) => out.put_opaque16(public),
        AgreementDomain::Ec(_) => out.put_opaque8(public),
    }
}

/// Read and validate a public value from a ClientKeyExchange.
pub(crate) fn read_public<'a>(
    domain: &AgreementDomain,
    input: &'a [u8],
) -> Result<(&'a [u8], Vec<u8>), Error> {
    let (rest, public) = match domain {
        AgreementDomain::Dh(_) => opaque16(input)?,
        AgreementDomain::Ec(_) => opaque8(input)?,
    };
    check_public(domain, public)?;
    Ok((rest, public.to_vec()))
}

/// Groups the client offers that the provider can run.
pub(crate) fn usable_groups(provider: &CryptoProvider, groups: &[NamedGroup]) -> Vec<NamedGroup> {
    groups
        .iter()
        .copied()
        .filter(|g| provider.supports_group(*g))
        .collect()
}

/// Ephemeral agreement negotiated through ServerKeyExchange.
#[derive(Debug, Default)]
pub(crate) struct EphemeralAgreement {
    domain: Option<AgreementDomain>,
    local: Option<Ephemeral>,
    peer: Option<Vec<u8>>,
}

impl EphemeralAgreement {
    pub fn domain(&self) -> Option<&AgreementDomain> {
        self.domain.as_ref()
    }

    /// Server: start a key pair in `domain` and write its params.
    pub fn generate_params(
        &mut self,
        provider: &CryptoProvider,
        domain: AgreementDomain,
        out: &mut Buf,
    ) -> Result<(), Error> {
        let local = Ephemeral::start(provider, &domain)?;
        let public = local.public_key().to_vec();
        match &domain {
            AgreementDomain::Dh(group) => ServerDhParams {
                group: group.clone(),
                public,
            }
            .serialize(out)?,
            AgreementDomain::Ec(group) => ServerEcdhParams {
                group: *group,
                public,
            }
            .serialize(out)?,
        }
        debug!("Server ephemeral in {:?}", domain);
        self.local = Some(local);
        self.domain = Some(domain);
        Ok(())
    }

    /// Client: read ServerDHParams, returning what follows them.
    pub fn receive_dh_params<'a>(
        &mut self,
        input: &'a [u8],
        verifier: &dyn DhGroupVerifier,
    ) -> Result<&'a [u8], Error> {
        let (rest, params) = ServerDhParams::parse(input)?;
        if !verifier.accept(&params.group) {
            return Err(Error::fatal(
                AlertDescription::InsufficientSecurity,
                format!("DH group rejected: {:?}", params.group),
            ));
        }
        check_dh_public(&params.group, &params.public)?;
        self.domain = Some(AgreementDomain::Dh(params.group));
        self.peer = Some(params.public);
        Ok(rest)
    }

    /// Client: read ServerECDHParams, returning what follows them.
    pub fn receive_ec_params<'a>(
        &mut self,
        input: &'a [u8],
        acceptable: &[NamedGroup],
    ) -> Result<&'a [u8], Error> {
        let (rest, params) = ServerEcdhParams::parse(input)?;
        if !acceptable.contains(&params.group) {
            return Err(Error::fatal(
                AlertDescription::IllegalParameter,
                format!("server chose unoffered group {:?}", params.group),
            ));
        }
        check_ec_point(params.group, &params.public)?;
        self.domain = Some(AgreementDomain::Ec(params.group));
        self.peer = Some(params.public);
        Ok(rest)
    }

    /// Client: start a key pair in the server's domain and write it.
    pub fn generate_client_value(
        &mut self,
        provider: &CryptoProvider,
        out: &mut Buf,
    ) -> Result<(), Error> {
        let domain = self
            .domain
            .as_ref()
            .ok_or_else(|| Error::internal("server params not received"))?;
        let local = Ephemeral::start(provider, domain)?;
        write_public(domain, local.public_key(), out)?;
        self.local = Some(local);
        Ok(())
    }

    /// Server: read the client public value, returning what follows it.
    pub fn receive_client_value<'a>(&mut self, input: &'a [u8]) -> Result<&'a [u8], Error> {
        let domain = self
            .domain
            .as_ref()
            .ok_or_else(|| Error::internal("server params not generated"))?;
        let (rest, public) = read_public(domain, input)?;
        self.peer = Some(public);
        Ok(rest)
    }

    pub fn premaster(&mut self) -> Result<Zeroizing<Vec<u8>>, Error> {
        let local = self
            .local
            .take()
            .ok_or_else(|| Error::internal("no local key pair"))?;
        let peer = self
            .peer
            .take()
            .ok_or_else(|| Error::internal("no peer public value"))?;
        local.complete(&peer)
    }
}
