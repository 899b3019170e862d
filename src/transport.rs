//! Datagram transport capability.
//!
//! Socket I/O is outside this crate. The engine talks to the network through
//! these traits and never blocks on its own.

use std::io;

/// Send side of a datagram transport.
pub trait DatagramSender {
    /// Largest datagram `send` accepts.
    fn send_limit(&self) -> usize;

    /// Send one datagram.
    fn send(&mut self, datagram: &[u8]) -> io::Result<()>;
}

/// A bidirectional datagram transport.
pub trait DatagramTransport: DatagramSender {
    /// Largest datagram `receive` can return.
    fn receive_limit(&self) -> usize;

    /// Receive one datagram into `buf`.
    ///
    /// `wait_millis` of 0 waits indefinitely. Running out of time must be
    /// reported as [`io::ErrorKind::TimedOut`] or [`io::ErrorKind::WouldBlock`],
    /// see [`is_timeout`]. Any other error is a hard failure.
    fn receive(&mut self, buf: &mut [u8], wait_millis: u64) -> io::Result<usize>;

    fn close(&mut self) -> io::Result<()>;
}

/// Whether a transport error only signals that nothing arrived in time.
pub fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

/// Collects sent datagrams in memory.
#[derive(Debug, Default)]
pub struct MemorySender {
    pub limit: usize,
    pub sent: Vec<Vec<u8>>,
}

impl MemorySender {
    pub fn new(limit: usize) -> Self {
        MemorySender {
            limit,
            sent: Vec::new(),
        }
    }
}

impl DatagramSender for MemorySender {
    fn send_limit(&self) -> usize {
        self.limit
    }

    fn send(&mut self, datagram: &[u8]) -> io::Result<()> {
        if datagram.len() > self.limit {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "datagram exceeds send limit",
            ));
        }
        self.sent.push(datagram.to_vec());
        Ok(())
    }
}
