//! Key exchange family.
//!
//! A [`KeyExchange`] is created for the negotiated [`KeyExchangeAlgorithm`]
//! and driven through a fixed sequence of calls by the handshake:
//!
//! ```text
//! init
//! skip_server_credentials | process_server_credentials | process_server_certificate
//! skip_server_key_exchange | process_server_key_exchange | generate_server_key_exchange
//! client_certificate_types
//! skip_client_credentials | process_client_credentials | process_client_certificate
//! generate_client_key_exchange | process_client_key_exchange
//! generate_pre_master_secret
//! ```
//!
//! Calls out of order, from the wrong side, or that make no sense for the
//! algorithm fail with [`Error::Internal`]. Anything wrong with what the peer
//! sent fails with [`Error::Fatal`] carrying the alert to send. After any
//! error, or once the pre-master secret is taken, the instance is spent.

mod agreement;
mod config;
mod ephemeral;
mod fixed;
pub mod params;
mod psk;
mod rsa;
mod srp;

use std::fmt;

use zeroize::Zeroizing;

use self::agreement::Family;
use self::ephemeral::EphemeralKeyExchange;
use self::fixed::FixedKeyExchange;
use self::psk::PskKeyExchange;
use self::rsa::RsaKeyExchange;
use self::srp::SrpKeyExchange;
use crate::crypto::{CertificateChain, CryptoProvider, Credentials, TlsCertificate};
use crate::error::AlertDescription;
use crate::types::{ClientCertificateType, KeyExchangeAlgorithm, ProtocolVersion};
use crate::Error;

pub use config::{ClientKxConfig, PskIdentity, PskIdentityManager, ServerKxConfig};
pub use config::{SrpCredentials, SrpLoginParameters};
pub use params::{DefaultDhGroupVerifier, DefaultSrpConfigVerifier};
pub use params::{DhGroupVerifier, SrpConfigVerifier};

/// Handshake values the key exchange depends on.
#[derive(Debug, Clone)]
pub struct KxContext {
    /// Negotiated version.
    pub version: ProtocolVersion,
    /// Version offered in the ClientHello, embedded in RSA pre-master secrets.
    pub client_version: ProtocolVersion,
    pub client_random: [u8; 32],
    pub server_random: [u8; 32],
}

impl KxContext {
    /// client_random ‖ server_random ‖ params, the input of a ServerKeyExchange signature.
    pub(crate) fn signed_data(&self, params: &[u8]) -> Vec<u8> {
        let mut data = Vec::with_capacity(64 + params.len());
        data.extend_from_slice(&self.client_random);
        data.extend_from_slice(&self.server_random);
        data.extend_from_slice(params);
        data
    }
}

/// Side of the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

/// Static properties of a key exchange algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// The server must send ServerKeyExchange.
    pub requires_server_key_exchange: bool,
    /// A client certificate is proven with CertificateVerify.
    pub requires_certificate_verify: bool,
    /// No certificates at all.
    pub is_anonymous: bool,
    /// The server must send a Certificate.
    pub requires_server_certificate: bool,
}

impl Capabilities {
    pub fn of(algorithm: KeyExchangeAlgorithm) -> Self {
        use KeyExchangeAlgorithm::*;
        let (ske, verify, cert) = match algorithm {
            DH_DSS | DH_RSA | ECDH_ECDSA | ECDH_RSA => (false, false, true),
            DHE_DSS | DHE_RSA | ECDHE_ECDSA | ECDHE_RSA => (true, true, true),
            DH_anon | ECDH_anon => (true, false, false),
            RSA => (false, true, true),
            PSK => (false, false, false),
            DHE_PSK | ECDHE_PSK => (true, false, false),
            RSA_PSK => (false, false, true),
            SRP => (true, false, false),
            SRP_DSS | SRP_RSA => (true, false, true),
        };
        Capabilities {
            requires_server_key_exchange: ske,
            requires_certificate_verify: verify,
            is_anonymous: algorithm.is_anonymous(),
            requires_server_certificate: cert,
        }
    }
}

/// Certificate types a server may request for `algorithm`.
///
/// `None` means client certificates do not apply to the algorithm at all.
pub fn client_certificate_types(
    algorithm: KeyExchangeAlgorithm,
) -> Option<Vec<ClientCertificateType>> {
    use ClientCertificateType::*;
    use KeyExchangeAlgorithm::*;
    match algorithm {
        DH_DSS | DH_RSA => Some(vec![RsaFixedDh, DssFixedDh]),
        ECDH_ECDSA | ECDH_RSA => Some(vec![EcdsaFixedEcdh, RsaFixedEcdh]),
        DHE_DSS | DHE_RSA | ECDHE_ECDSA | ECDHE_RSA | RSA => {
            Some(vec![EcdsaSign, RsaSign, DssSign])
        }
        DH_anon | ECDH_anon | PSK | DHE_PSK | ECDHE_PSK | RSA_PSK | SRP | SRP_DSS | SRP_RSA => {
            None
        }
    }
}

/// The key exchange output, handed to the PRF exactly once.
pub struct PreMasterSecret(Zeroizing<Vec<u8>>);

impl PreMasterSecret {
    pub(crate) fn new(secret: Zeroizing<Vec<u8>>) -> Self {
        PreMasterSecret(secret)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for PreMasterSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PreMasterSecret([redacted; {}])", self.0.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    Created,
    Initialized,
    ServerCredentials,
    ServerKeyExchange,
    ClientCredentials,
    ClientKeyExchange,
    Done,
    Failed,
}

#[derive(Debug)]
enum KxConfig {
    Client(ClientKxConfig),
    Server(ServerKxConfig),
}

/// What a variant sees of the surrounding key exchange.
pub(crate) struct Env<'a> {
    pub algorithm: KeyExchangeAlgorithm,
    pub context: &'a KxContext,
    config: &'a KxConfig,
}

impl<'a> Env<'a> {
    pub fn provider(&self) -> &'a CryptoProvider {
        match self.config {
            KxConfig::Client(c) => &c.provider,
            KxConfig::Server(s) => &s.provider,
        }
    }

    pub fn client(&self) -> Result<&'a ClientKxConfig, Error> {
        match self.config {
            KxConfig::Client(c) => Ok(c),
            KxConfig::Server(_) => Err(Error::internal("client operation on server")),
        }
    }

    pub fn server(&self) -> Result<&'a ServerKxConfig, Error> {
        match self.config {
            KxConfig::Server(s) => Ok(s),
            KxConfig::Client(_) => Err(Error::internal("server operation on client")),
        }
    }
}

#[derive(Debug)]
enum Inner {
    Fixed(FixedKeyExchange),
    Ephemeral(EphemeralKeyExchange),
    Rsa(RsaKeyExchange),
    Psk(PskKeyExchange),
    Srp(SrpKeyExchange),
}

impl Inner {
    fn new(algorithm: KeyExchangeAlgorithm) -> Self {
        use KeyExchangeAlgorithm::*;
        let signature = algorithm.server_signature_algorithm();
        match algorithm {
            DH_DSS | DH_RSA => Inner::Fixed(FixedKeyExchange::new(Family::Dh)),
            ECDH_ECDSA | ECDH_RSA => Inner::Fixed(FixedKeyExchange::new(Family::Ec)),
            DHE_DSS | DHE_RSA | DH_anon => {
                Inner::Ephemeral(EphemeralKeyExchange::new(Family::Dh, signature))
            }
            ECDHE_ECDSA | ECDHE_RSA | ECDH_anon => {
                Inner::Ephemeral(EphemeralKeyExchange::new(Family::Ec, signature))
            }
            RSA => Inner::Rsa(RsaKeyExchange::default()),
            PSK | DHE_PSK | ECDHE_PSK | RSA_PSK => Inner::Psk(PskKeyExchange::new(algorithm)),
            SRP | SRP_DSS | SRP_RSA => Inner::Srp(SrpKeyExchange::new(signature)),
        }
    }
}

/// Key exchange state machine for one handshake.
pub struct KeyExchange {
    algorithm: KeyExchangeAlgorithm,
    role: Role,
    stage: Stage,
    context: Option<KxContext>,
    config: KxConfig,
    inner: Inner,
}

impl fmt::Debug for KeyExchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyExchange")
            .field("algorithm", &self.algorithm)
            .field("role", &self.role)
            .field("stage", &self.stage)
            .finish_non_exhaustive()
    }
}

macro_rules! step {
    ($self:ident, $op:expr, $role:expr, [$($from:ident),+] => $to:ident, |$inner:ident, $env:ident| $body:expr) => {{
        $self.enter($op, $role, &[$(Stage::$from),+])?;
        let result = {
            let $env = Env {
                algorithm: $self.algorithm,
                context: $self
                    .context
                    .as_ref()
                    .ok_or_else(|| Error::internal("key exchange not initialised"))?,
                config: &$self.config,
            };
            let $inner = &mut $self.inner;
            $body
        };
        $self.leave($op, result, Stage::$to)
    }};
}

impl KeyExchange {
    pub fn new_client(algorithm: KeyExchangeAlgorithm, config: ClientKxConfig) -> Self {
        Self::new(algorithm, Role::Client, KxConfig::Client(config))
    }

    pub fn new_server(algorithm: KeyExchangeAlgorithm, config: ServerKxConfig) -> Self {
        Self::new(algorithm, Role::Server, KxConfig::Server(config))
    }

    fn new(algorithm: KeyExchangeAlgorithm, role: Role, config: KxConfig) -> Self {
        KeyExchange {
            algorithm,
            role,
            stage: Stage::Created,
            context: None,
            config,
            inner: Inner::new(algorithm),
        }
    }

    pub fn algorithm(&self) -> KeyExchangeAlgorithm {
        self.algorithm
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::of(self.algorithm)
    }

    pub fn requires_server_key_exchange(&self) -> bool {
        self.capabilities().requires_server_key_exchange
    }

    pub fn requires_certificate_verify(&self) -> bool {
        self.capabilities().requires_certificate_verify
    }

    fn enter(&mut self, op: &str, role: Option<Role>, from: &[Stage]) -> Result<(), Error> {
        if let Some(role) = role {
            if role != self.role {
                self.stage = Stage::Failed;
                return Err(Error::internal(format!(
                    "{} is a {:?} operation, this is the {:?}",
                    op, role, self.role
                )));
            }
        }
        if !from.contains(&self.stage) {
            let stage = self.stage;
            // A misordered call leaves the exchange unusable.
            self.stage = Stage::Failed;
            return Err(Error::internal(format!(
                "{} called in stage {:?} of {:?}",
                op, stage, self.algorithm
            )));
        }
        Ok(())
    }

    fn leave<T>(&mut self, op: &str, result: Result<T, Error>, to: Stage) -> Result<T, Error> {
        match &result {
            Ok(_) => {
                if self.stage != to {
                    debug!("{:?} {:?}: {} -> {:?}", self.algorithm, self.role, op, to);
                }
                self.stage = to;
            }
            Err(e) => {
                debug!("{:?} {:?}: {} failed: {}", self.algorithm, self.role, op, e);
                self.stage = Stage::Failed;
            }
        }
        result
    }

    fn unexpected(&self, what: &str) -> Error {
        Error::fatal(
            AlertDescription::UnexpectedMessage,
            format!("{} not expected for {:?}", what, self.algorithm),
        )
    }

    fn not_applicable(&self, what: &str) -> Error {
        Error::internal(format!("{} does not apply to {:?}", what, self.algorithm))
    }

    pub fn init(&mut self, context: KxContext) -> Result<(), Error> {
        self.enter("init", None, &[Stage::Created])?;
        self.context = Some(context);
        self.leave("init", Ok(()), Stage::Initialized)
    }

    /// The server sent no Certificate, or is configured without one.
    pub fn skip_server_credentials(&mut self) -> Result<(), Error> {
        let required = self.capabilities().requires_server_certificate;
        let err = required.then(|| self.unexpected("missing server certificate"));
        step!(self, "skip_server_credentials", None, [Initialized] => ServerCredentials, |_inner, _env| {
            match err {
                Some(e) => Err(e),
                None => Ok(()),
            }
        })
    }

    /// Server: the credentials backing the Certificate message.
    pub fn process_server_credentials(&mut self, credentials: Credentials) -> Result<(), Error> {
        let required = self.capabilities().requires_server_certificate;
        step!(self, "process_server_credentials", Some(Role::Server), [Initialized] => ServerCredentials, |inner, _env| {
            if !required {
                Err(Error::internal("server credentials not used by this key exchange"))
            } else if credentials.chain().is_empty() {
                Err(Error::internal("server credentials without certificate"))
            } else {
                match inner {
                    Inner::Fixed(kx) => kx.process_server_credentials(credentials),
                    Inner::Ephemeral(kx) => kx.process_server_credentials(credentials),
                    Inner::Rsa(kx) => kx.transport.process_server_credentials(credentials),
                    Inner::Psk(kx) => kx.process_server_credentials(credentials),
                    Inner::Srp(kx) => kx.process_server_credentials(credentials),
                }
            }
        })
    }

    /// Client: the server's Certificate message.
    pub fn process_server_certificate(&mut self, chain: &CertificateChain) -> Result<(), Error> {
        let err = (!self.capabilities().requires_server_certificate)
            .then(|| self.not_applicable("server certificate"));
        step!(self, "process_server_certificate", Some(Role::Client), [Initialized] => ServerCredentials, |inner, env| {
            match (err, end_entity(chain)) {
                (Some(e), _) => Err(e),
                (None, Err(e)) => Err(e),
                (None, Ok(cert)) => match inner {
                    Inner::Fixed(kx) => kx.process_server_certificate(&env, cert),
                    Inner::Ephemeral(kx) => kx.process_server_certificate(cert),
                    Inner::Rsa(kx) => kx.transport.process_server_certificate(cert),
                    Inner::Psk(kx) => kx.process_server_certificate(cert),
                    Inner::Srp(kx) => kx.process_server_certificate(cert),
                },
            }
        })
    }

    /// Client: the server went straight to ServerHelloDone.
    pub fn skip_server_key_exchange(&mut self) -> Result<(), Error> {
        let err = self
            .requires_server_key_exchange()
            .then(|| self.unexpected("missing ServerKeyExchange"));
        step!(self, "skip_server_key_exchange", Some(Role::Client), [ServerCredentials] => ServerKeyExchange, |_inner, _env| {
            match err {
                Some(e) => Err(e),
                None => Ok(()),
            }
        })
    }

    /// Server: the ServerKeyExchange body, or `None` if none is sent.
    pub fn generate_server_key_exchange(&mut self) -> Result<Option<Vec<u8>>, Error> {
        step!(self, "generate_server_key_exchange", Some(Role::Server), [ServerCredentials] => ServerKeyExchange, |inner, env| {
            match inner {
                Inner::Fixed(_) | Inner::Rsa(_) => Ok(None),
                Inner::Ephemeral(kx) => kx.generate_server_key_exchange(&env).map(Some),
                Inner::Psk(kx) => kx.generate_server_key_exchange(&env),
                Inner::Srp(kx) => kx.generate_server_key_exchange(&env).map(Some),
            }
        })
    }

    /// Client: a received ServerKeyExchange body.
    pub fn process_server_key_exchange(&mut self, body: &[u8]) -> Result<(), Error> {
        let never_sent = self.not_applicable("ServerKeyExchange");
        step!(self, "process_server_key_exchange", Some(Role::Client), [ServerCredentials] => ServerKeyExchange, |inner, env| {
            match inner {
                Inner::Fixed(_) | Inner::Rsa(_) => Err(never_sent),
                Inner::Ephemeral(kx) => kx.process_server_key_exchange(&env, body),
                Inner::Psk(kx) => kx.process_server_key_exchange(&env, body),
                Inner::Srp(kx) => kx.process_server_key_exchange(&env, body),
            }
        })
    }

    /// Certificate types for a CertificateRequest.
    ///
    /// `None` means client authentication does not apply to the algorithm.
    pub fn client_certificate_types(&mut self) -> Result<Option<Vec<ClientCertificateType>>, Error> {
        let algorithm = self.algorithm;
        step!(self, "client_certificate_types", None, [ServerKeyExchange] => ServerKeyExchange, |_inner, _env| {
            Ok(client_certificate_types(algorithm))
        })
    }

    /// No client certificate is sent, or none was received.
    pub fn skip_client_credentials(&mut self) -> Result<(), Error> {
        step!(self, "skip_client_credentials", None, [ServerKeyExchange] => ClientCredentials, |_inner, _env| {
            Ok(())
        })
    }

    /// Client: credentials answering a CertificateRequest.
    pub fn process_client_credentials(&mut self, credentials: Credentials) -> Result<(), Error> {
        let applicable = client_certificate_types(self.algorithm).is_some();
        step!(self, "process_client_credentials", Some(Role::Client), [ServerKeyExchange] => ClientCredentials, |inner, _env| {
            if !applicable {
                Err(Error::internal("client credentials not used by this key exchange"))
            } else {
                match (inner, credentials) {
                    (_, Credentials::Decryptor { .. }) => {
                        Err(Error::internal("decryption credentials cannot authenticate a client"))
                    }
                    (Inner::Fixed(kx), credentials) => kx.process_client_credentials(credentials),
                    (_, Credentials::Agreement { .. }) => {
                        Err(Error::internal("agreement credentials need a fixed key exchange"))
                    }
                    (_, Credentials::Signer { .. }) => Ok(()),
                }
            }
        })
    }

    /// Server: the client's Certificate message.
    ///
    /// An empty chain is the same as [`skip_client_credentials`](Self::skip_client_credentials).
    pub fn process_client_certificate(&mut self, chain: &CertificateChain) -> Result<(), Error> {
        let err = client_certificate_types(self.algorithm)
            .is_none()
            .then(|| self.not_applicable("client certificate"));
        step!(self, "process_client_certificate", Some(Role::Server), [ServerKeyExchange] => ClientCredentials, |inner, _env| {
            match (err, chain.end_entity(), inner) {
                (Some(e), _, _) => Err(e),
                (None, None, _) => Ok(()),
                (None, Some(cert), Inner::Fixed(kx)) => kx.process_client_certificate(cert.as_ref()),
                (None, Some(_), _) => Ok(()),
            }
        })
    }

    /// Client: the ClientKeyExchange body.
    pub fn generate_client_key_exchange(&mut self) -> Result<Vec<u8>, Error> {
        step!(self, "generate_client_key_exchange", Some(Role::Client), [ClientCredentials] => ClientKeyExchange, |inner, env| {
            match inner {
                Inner::Fixed(kx) => kx.generate_client_key_exchange(&env),
                Inner::Ephemeral(kx) => kx.generate_client_key_exchange(&env),
                Inner::Rsa(kx) => kx.generate_client_key_exchange(&env),
                Inner::Psk(kx) => kx.generate_client_key_exchange(&env),
                Inner::Srp(kx) => kx.generate_client_key_exchange(&env),
            }
        })
    }

    /// Server: a received ClientKeyExchange body.
    pub fn process_client_key_exchange(&mut self, body: &[u8]) -> Result<(), Error> {
        step!(self, "process_client_key_exchange", Some(Role::Server), [ClientCredentials] => ClientKeyExchange, |inner, env| {
            match inner {
                Inner::Fixed(kx) => kx.process_client_key_exchange(body),
                Inner::Ephemeral(kx) => kx.process_client_key_exchange(body),
                Inner::Rsa(kx) => kx.process_client_key_exchange(&env, body),
                Inner::Psk(kx) => kx.process_client_key_exchange(&env, body),
                Inner::Srp(kx) => kx.process_client_key_exchange(body),
            }
        })
    }

    /// The pre-master secret. Can only be taken once.
    pub fn generate_pre_master_secret(&mut self) -> Result<PreMasterSecret, Error> {
        step!(self, "generate_pre_master_secret", None, [ClientKeyExchange] => Done, |inner, env| {
            let secret = match inner {
                Inner::Fixed(kx) => kx.premaster(&env),
                Inner::Ephemeral(kx) => kx.premaster(),
                Inner::Rsa(kx) => kx.transport.premaster(),
                Inner::Psk(kx) => kx.premaster(),
                Inner::Srp(kx) => kx.premaster(&env),
            };
            secret.map(PreMasterSecret::new)
        })
    }
}

/// The end entity certificate of a chain the peer must have sent.
fn end_entity(chain: &CertificateChain) -> Result<&dyn TlsCertificate, Error> {
    chain
        .end_entity()
        .map(|c| c.as_ref())
        .ok_or_else(|| Error::fatal(AlertDescription::BadCertificate, "empty certificate chain"))
}
