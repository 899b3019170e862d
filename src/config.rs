use std::time::Duration;

use crate::crypto::{rust_crypto, CryptoProvider};
use crate::inbound::DEFAULT_MAX_MESSAGE_SIZE;
use crate::Error;

/// Smallest MTU we can fragment a handshake into.
const MIN_MTU: usize = 256;

/// Smallest handshake message size limit we accept.
const MIN_HANDSHAKE_MESSAGE_SIZE: usize = 1024;

/// Handshake lengths are 24 bit.
const MAX_HANDSHAKE_MESSAGE_SIZE: usize = (1 << 24) - 1;

/// Engine configuration.
#[derive(Clone)]
pub struct Config {
    mtu: usize,
    handshake_timeout: Duration,
    flight_start_rto: Duration,
    flight_max_rto: Duration,
    flight_retries: usize,
    max_receive_ahead: u16,
    max_handshake_message_size: usize,
    max_cookie_length: usize,
    min_dh_group_bits: usize,
    rng_seed: Option<u64>,
    crypto_provider: CryptoProvider,
}

impl Config {
    /// Create a new configuration builder.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder {
            mtu: 1150,
            handshake_timeout: Duration::from_secs(40),
            flight_start_rto: Duration::from_secs(1),
            flight_max_rto: Duration::from_secs(60),
            flight_retries: 4,
            max_receive_ahead: 16,
            max_handshake_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_cookie_length: 255,
            min_dh_group_bits: 2048,
            rng_seed: None,
            crypto_provider: None,
        }
    }

    /// Max transmission unit.
    ///
    /// The largest datagrams we will produce.
    #[inline(always)]
    pub fn mtu(&self) -> usize {
        self.mtu
    }

    /// Timeout for the entire handshake, regardless of flights.
    #[inline(always)]
    pub fn handshake_timeout(&self) -> Duration {
        self.handshake_timeout
    }

    /// Time of first retry.
    ///
    /// Every flight restarts with this value.
    /// Doubled for every retry with a ±25% jitter.
    #[inline(always)]
    pub fn flight_start_rto(&self) -> Duration {
        self.flight_start_rto
    }

    /// Upper bound for the doubling retransmission timeout.
    #[inline(always)]
    pub fn flight_max_rto(&self) -> Duration {
        self.flight_max_rto
    }

    /// Max number of retries per flight.
    #[inline(always)]
    pub fn flight_retries(&self) -> usize {
        self.flight_retries
    }

    /// How many handshake messages beyond the next expected one we buffer.
    #[inline(always)]
    pub fn max_receive_ahead(&self) -> u16 {
        self.max_receive_ahead
    }

    /// Largest handshake message body we reassemble.
    #[inline(always)]
    pub fn max_handshake_message_size(&self) -> usize {
        self.max_handshake_message_size
    }

    /// Largest cookie accepted in a ClientHello.
    #[inline(always)]
    pub fn max_cookie_length(&self) -> usize {
        self.max_cookie_length
    }

    /// Smallest prime accepted from a peer for finite field Diffie-Hellman.
    #[inline(always)]
    pub fn min_dh_group_bits(&self) -> usize {
        self.min_dh_group_bits
    }

    /// Seed for non-cryptographic randomness.
    #[inline(always)]
    pub fn rng_seed(&self) -> Option<u64> {
        self.rng_seed
    }

    /// Cryptographic provider.
    ///
    /// Provides all cryptographic operations (hashing, MAC, key agreement, etc.).
    #[inline(always)]
    pub fn crypto_provider(&self) -> &CryptoProvider {
        &self.crypto_provider
    }
}

/// Builder for [`Config`].
pub struct ConfigBuilder {
    mtu: usize,
    handshake_timeout: Duration,
    flight_start_rto: Duration,
    flight_max_rto: Duration,
    flight_retries: usize,
    max_receive_ahead: u16,
    max_handshake_message_size: usize,
    max_cookie_length: usize,
    min_dh_group_bits: usize,
    rng_seed: Option<u64>,
    crypto_provider: Option<CryptoProvider>,
}

impl ConfigBuilder {
    /// Set the max transmission unit (MTU).
    ///
    /// Defaults to 1150.
    pub fn mtu(mut self, mtu: usize) -> Self {
        self.mtu = mtu;
        self
    }

    /// Set the timeout for the entire handshake, regardless of flights.
    ///
    /// Defaults to 40 seconds.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Set the time of first retry.
    ///
    /// Defaults to 1 second.
    pub fn flight_start_rto(mut self, rto: Duration) -> Self {
        self.flight_start_rto = rto;
        self
    }

    /// Set the upper bound of the retransmission timeout.
    ///
    /// Defaults to 60 seconds.
    pub fn flight_max_rto(mut self, rto: Duration) -> Self {
        self.flight_max_rto = rto;
        self
    }

    /// Set the max number of retries per flight.
    ///
    /// Defaults to 4.
    pub fn flight_retries(mut self, retries: usize) -> Self {
        self.flight_retries = retries;
        self
    }

    /// Set how far ahead of the next expected message sequence we buffer.
    ///
    /// Defaults to 16.
    pub fn max_receive_ahead(mut self, ahead: u16) -> Self {
        self.max_receive_ahead = ahead;
        self
    }

    /// Set the largest handshake message we reassemble.
    ///
    /// Defaults to 32768 bytes. Must be at least 1024.
    pub fn max_handshake_message_size(mut self, size: usize) -> Self {
        self.max_handshake_message_size = size;
        self
    }

    /// Set the largest accepted ClientHello cookie.
    ///
    /// Defaults to 255. DTLS 1.0 peers are always capped at 32.
    pub fn max_cookie_length(mut self, len: usize) -> Self {
        self.max_cookie_length = len;
        self
    }

    /// Set the smallest accepted Diffie-Hellman prime.
    ///
    /// Defaults to 2048 bits.
    pub fn min_dh_group_bits(mut self, bits: usize) -> Self {
        self.min_dh_group_bits = bits;
        self
    }

    /// Seed the non-cryptographic RNG, for reproducible tests.
    ///
    /// Defaults to none.
    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Set a custom crypto provider.
    ///
    /// If not set, the installed default is used, falling back on the
    /// RustCrypto based provider.
    pub fn with_crypto_provider(mut self, provider: CryptoProvider) -> Self {
        self.crypto_provider = Some(provider);
        self
    }

    /// Build the configuration.
    ///
    /// The crypto provider is selected in the following priority order:
    /// 1. Explicit provider set via `with_crypto_provider()`
    /// 2. Default provider installed via `CryptoProvider::install_default()`
    /// 3. The RustCrypto provider
    pub fn build(self) -> Result<Config, Error> {
        if self.mtu < MIN_MTU {
            return Err(Error::ConfigError(format!(
                "mtu {} is below the minimum of {}",
                self.mtu, MIN_MTU
            )));
        }

        if self.flight_start_rto > self.flight_max_rto {
            return Err(Error::ConfigError(
                "flight_start_rto exceeds flight_max_rto".to_string(),
            ));
        }

        if !(MIN_HANDSHAKE_MESSAGE_SIZE..=MAX_HANDSHAKE_MESSAGE_SIZE)
            .contains(&self.max_handshake_message_size)
        {
            return Err(Error::ConfigError(format!(
                "max_handshake_message_size {} outside {}..={}",
                self.max_handshake_message_size, MIN_HANDSHAKE_MESSAGE_SIZE, MAX_HANDSHAKE_MESSAGE_SIZE
            )));
        }

        if self.max_cookie_length > 255 {
            return Err(Error::ConfigError(
                "max_cookie_length cannot exceed 255".to_string(),
            ));
        }

        let crypto_provider = self
            .crypto_provider
            .or_else(|| CryptoProvider::get_default().cloned())
            .unwrap_or_else(rust_crypto::default_provider);

        crypto_provider.validate()?;

        Ok(Config {
            mtu: self.mtu,
            handshake_timeout: self.handshake_timeout,
            flight_start_rto: self.flight_start_rto,
            flight_max_rto: self.flight_max_rto,
            flight_retries: self.flight_retries,
            max_receive_ahead: self.max_receive_ahead,
            max_handshake_message_size: self.max_handshake_message_size,
            max_cookie_length: self.max_cookie_length,
            min_dh_group_bits: self.min_dh_group_bits,
            rng_seed: self.rng_seed,
            crypto_provider,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::builder()
            .build()
            .expect("Default config should always validate")
    }
}
