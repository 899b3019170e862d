//! Key exchange integration tests.
//!
//! Each test drives a client and a server [`KeyExchange`](dtlskx::kx::KeyExchange)
//! against each other, passing the message bodies across by hand.

mod common;
mod dh;
mod misuse;
mod psk;
