//! dtlskx
//!
//! Key exchange and datagram reliability core for (D)TLS 1.0 - 1.2.
//!
//! The crate provides the pieces a handshake coordinator is built from, not
//! the coordinator itself:
//!
//! * [`kx::KeyExchange`]: the negotiated key exchange state machine, shared
//!   by TLS and DTLS, for the DH, DHE, ECDH, ECDHE, anonymous, RSA, PSK and
//!   SRP families.
//! * [`Epoch`] and [`ReplayWindow`]: per-epoch 48-bit write sequence numbers
//!   and the 64 entry anti-replay bitmap.
//! * [`Reassembler`] and [`InboundFlight`]: out of order handshake fragment
//!   reassembly.
//! * [`CookieVerifier`]: the stateless cookie exchange protecting a server
//!   before it commits any per-client state.
//!
//! Crypto is consumed through the capability traits in [`crypto`]. The
//! default provider in [`crypto::rust_crypto`] is built on the RustCrypto
//! crates.
//!
//! ```
//! use dtlskx::kx::{ClientKxConfig, KeyExchange};
//! use dtlskx::types::KeyExchangeAlgorithm;
//! use dtlskx::Config;
//!
//! let config = Config::default();
//! let kx = KeyExchange::new_client(KeyExchangeAlgorithm::ECDHE_ECDSA, ClientKxConfig::new(&config));
//! assert!(kx.requires_server_key_exchange());
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all)]
// #![deny(missing_docs)]

#[macro_use]
extern crate log;

mod error;
pub use error::{AlertDescription, AlertLevel, Error};

pub mod types;

mod buffer;
pub use buffer::Buf;

pub mod codec;

mod rng;
pub use rng::SeededRng;

mod config;
pub use config::{Config, ConfigBuilder};

mod window;
pub use window::ReplayWindow;

mod epoch;
pub use epoch::{Epoch, EpochSet, NullCipher, RecordCipher};

pub mod timer;

pub mod record;

pub mod message;

mod reassembler;
pub use reassembler::Reassembler;

mod inbound;
pub use inbound::{Contribution, InboundFlight, InboundMessage};

mod verifier;
pub use verifier::{hello_verify_request, ClientHelloSummary, CookieVerifier, VerifiedRequest};
pub use verifier::COOKIE_LEN;

pub mod transport;

pub mod crypto;

pub mod kx;
