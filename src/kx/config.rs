use std::fmt;
use std::sync::Arc;

use zeroize::Zeroizing;

use super::agreement::Family;
use super::params::{DefaultDhGroupVerifier, DefaultSrpConfigVerifier};
use super::params::{DhGroupVerifier, SrpConfigVerifier};
use crate::crypto::{AgreementDomain, CryptoProvider, CryptoSafe, DhGroup, SrpGroup};
use crate::error::AlertDescription;
use crate::types::NamedGroup;
use crate::{Config, Error};

/// A pre-shared key and the identity the client presents for it.
#[derive(Clone)]
pub struct PskIdentity {
    identity: Vec<u8>,
    key: Zeroizing<Vec<u8>>,
}

impl PskIdentity {
    pub fn new(identity: &[u8], key: &[u8]) -> Self {
        PskIdentity {
            identity: identity.to_vec(),
            key: Zeroizing::new(key.to_vec()),
        }
    }

    pub fn identity(&self) -> &[u8] {
        &self.identity
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }
}

impl fmt::Debug for PskIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PskIdentity")
            .field("identity", &String::from_utf8_lossy(&self.identity))
            .finish_non_exhaustive()
    }
}

/// Server side lookup of pre-shared keys.
pub trait PskIdentityManager: CryptoSafe {
    /// Hint sent in ServerKeyExchange, if any.
    fn hint(&self) -> Option<Vec<u8>>;

    /// The key for `identity`, or `None` if it is unknown.
    fn get_psk(&self, identity: &[u8]) -> Option<Zeroizing<Vec<u8>>>;
}

/// Client SRP login.
#[derive(Clone)]
pub struct SrpCredentials {
    identity: Vec<u8>,
    password: Zeroizing<Vec<u8>>,
}

impl SrpCredentials {
    pub fn new(identity: &[u8], password: &[u8]) -> Self {
        SrpCredentials {
            identity: identity.to_vec(),
            password: Zeroizing::new(password.to_vec()),
        }
    }

    pub fn identity(&self) -> &[u8] {
        &self.identity
    }

    pub fn password(&self) -> &[u8] {
        &self.password
    }
}

impl fmt::Debug for SrpCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SrpCredentials")
            .field("identity", &String::from_utf8_lossy(&self.identity))
            .finish_non_exhaustive()
    }
}

/// What the server stores for an SRP user, looked up from the identity in
/// the ClientHello.
#[derive(Debug, Clone)]
pub struct SrpLoginParameters {
    pub group: SrpGroup,
    pub salt: Vec<u8>,
    pub verifier: Vec<u8>,
}

/// Client side inputs to a [`KeyExchange`](super::KeyExchange).
#[derive(Debug, Clone)]
pub struct ClientKxConfig {
    pub(crate) provider: CryptoProvider,
    pub(crate) ec_groups: Vec<NamedGroup>,
    pub(crate) dh_verifier: Arc<dyn DhGroupVerifier>,
    pub(crate) srp_verifier: Arc<dyn SrpConfigVerifier>,
    pub(crate) psk: Option<PskIdentity>,
    pub(crate) srp: Option<SrpCredentials>,
}

impl ClientKxConfig {
    /// Offer every group the provider supports and verify finite field
    /// groups against [`Config::min_dh_group_bits`].
    pub fn new(config: &Config) -> Self {
        let provider = config.crypto_provider().clone();
        let min_bits = config.min_dh_group_bits();
        ClientKxConfig {
            ec_groups: provider.kx_groups.iter().map(|g| g.name()).collect(),
            provider,
            dh_verifier: Arc::new(DefaultDhGroupVerifier { min_bits }),
            srp_verifier: Arc::new(DefaultSrpConfigVerifier { min_bits }),
            psk: None,
            srp: None,
        }
    }

    /// Groups offered in the ClientHello, most preferred first.
    pub fn with_ec_groups(mut self, groups: Vec<NamedGroup>) -> Self {
        self.ec_groups = groups;
        self
    }

    pub fn with_dh_verifier(mut self, verifier: Arc<dyn DhGroupVerifier>) -> Self {
        self.dh_verifier = verifier;
        self
    }

    pub fn with_srp_verifier(mut self, verifier: Arc<dyn SrpConfigVerifier>) -> Self {
        self.srp_verifier = verifier;
        self
    }

    pub fn with_psk(mut self, psk: PskIdentity) -> Self {
        self.psk = Some(psk);
        self
    }

    pub fn with_srp(mut self, credentials: SrpCredentials) -> Self {
        self.srp = Some(credentials);
        self
    }

    pub fn ec_groups(&self) -> &[NamedGroup] {
        &self.ec_groups
    }
}

/// Server side inputs to a [`KeyExchange`](super::KeyExchange).
#[derive(Debug, Clone)]
pub struct ServerKxConfig {
    pub(crate) provider: CryptoProvider,
    pub(crate) ec_groups: Vec<NamedGroup>,
    pub(crate) client_supported_groups: Option<Vec<NamedGroup>>,
    pub(crate) dh_group: Option<DhGroup>,
    pub(crate) psk_manager: Option<Arc<dyn PskIdentityManager>>,
    pub(crate) srp_login: Option<SrpLoginParameters>,
}

impl ServerKxConfig {
    pub fn new(config: &Config) -> Self {
        let provider = config.crypto_provider().clone();
        ServerKxConfig {
            ec_groups: provider.kx_groups.iter().map(|g| g.name()).collect(),
            provider,
            client_supported_groups: None,
            dh_group: None,
            psk_manager: None,
            srp_login: None,
        }
    }

    /// Groups the server is willing to use, most preferred first.
    pub fn with_ec_groups(mut self, groups: Vec<NamedGroup>) -> Self {
        self.ec_groups = groups;
        self
    }

    /// The supported_groups extension of the ClientHello. Without it any
    /// server group may be chosen.
    pub fn with_client_supported_groups(mut self, groups: Vec<NamedGroup>) -> Self {
        self.client_supported_groups = Some(groups);
        self
    }

    /// Group for DHE, DH_anon and DHE_PSK.
    pub fn with_dh_group(mut self, group: DhGroup) -> Self {
        self.dh_group = Some(group);
        self
    }

    pub fn with_psk_manager(mut self, manager: Arc<dyn PskIdentityManager>) -> Self {
        self.psk_manager = Some(manager);
        self
    }

    pub fn with_srp_login(mut self, login: SrpLoginParameters) -> Self {
        self.srp_login = Some(login);
        self
    }

    /// First server group the client also supports.
    pub(crate) fn select_ec_group(&self) -> Option<NamedGroup> {
        self.ec_groups.iter().copied().find(|g| {
            self.provider.supports_group(*g)
                && self
                    .client_supported_groups
                    .as_ref()
                    .map_or(true, |client| client.contains(g))
        })
    }

    /// Domain for a server generated ephemeral key in `family`.
    pub(crate) fn ephemeral_domain(&self, family: Family) -> Result<AgreementDomain, Error> {
        match family {
            Family::Dh => self
                .dh_group
                .clone()
                .map(AgreementDomain::Dh)
                .ok_or_else(|| Error::internal("no DH group configured")),
            Family::Ec => self.select_ec_group().map(AgreementDomain::Ec).ok_or_else(|| {
                Error::fatal(AlertDescription::HandshakeFailure, "no common EC group")
            }),
        }
    }
}
