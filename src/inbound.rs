use std::collections::BTreeMap;

use crate::message::HandshakeHeader;
use crate::reassembler::Reassembler;
use crate::types::MessageType;
use crate::Config;

/// Outcome of adding a fragment to an [`InboundFlight`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contribution {
    /// The fragment belongs to a current or upcoming message.
    Accepted,
    /// Dropped: inconsistent header, or too far ahead.
    Ignored,
    /// Fragment of a message we already delivered. The peer is retransmitting,
    /// which means it has not seen our last flight.
    PreviousFlight,
}

/// A completely reassembled handshake message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub msg_type: MessageType,
    pub message_seq: u16,
    pub body: Vec<u8>,
}

/// Largest handshake message buffered unless configured otherwise.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 32_768;

/// Reassembles incoming handshake messages and releases them in order.
#[derive(Debug)]
pub struct InboundFlight {
    next_receive_seq: u16,
    max_receive_ahead: u16,
    max_message_size: usize,
    pending: BTreeMap<u16, Reassembler>,
}

impl InboundFlight {
    pub fn new(max_receive_ahead: u16) -> Self {
        Self::starting_at(0, max_receive_ahead)
    }

    /// Receive-ahead and message size bounds taken from the config.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_receive_ahead())
            .with_max_message_size(config.max_handshake_message_size())
    }

    /// Ignore messages announcing a body longer than `size`.
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Start expecting `message_seq`, e.g. after a verified ClientHello retry.
    pub fn starting_at(message_seq: u16, max_receive_ahead: u16) -> Self {
        InboundFlight {
            next_receive_seq: message_seq,
            max_receive_ahead,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            pending: BTreeMap::new(),
        }
    }

    pub fn next_receive_seq(&self) -> u16 {
        self.next_receive_seq
    }

    /// Number of messages with at least one fragment buffered.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn contribute(&mut self, header: &HandshakeHeader, fragment: &[u8]) -> Contribution {
        let seq = header.message_seq;

        if seq < self.next_receive_seq {
            trace!("Fragment of delivered message_seq {}", seq);
            return Contribution::PreviousFlight;
        }

        let ahead = seq - self.next_receive_seq;
        if ahead > self.max_receive_ahead {
            warn!(
                "Drop message_seq {}, more than {} ahead of {}",
                seq, self.max_receive_ahead, self.next_receive_seq
            );
            return Contribution::Ignored;
        }

        let fragment_end = match header.fragment_end() {
            Some(end) if end <= header.length => end,
            _ => {
                trace!("Drop fragment with bad bounds: {:?}", header);
                return Contribution::Ignored;
            }
        };
        if fragment.len() != header.fragment_length as usize {
            trace!(
                "Drop fragment, {} bytes for fragment_length {}",
                fragment.len(),
                header.fragment_length
            );
            return Contribution::Ignored;
        }

        let length = header.length as usize;
        if length > self.max_message_size {
            // The body is allocated up front, so the announced length is capped.
            warn!(
                "Drop message_seq {}, length {} exceeds {}",
                seq, length, self.max_message_size
            );
            return Contribution::Ignored;
        }

        let reassembler = self
            .pending
            .entry(seq)
            .or_insert_with(|| Reassembler::new(header.msg_type, length));

        if reassembler.msg_type() != header.msg_type || reassembler.total_length() != length {
            warn!(
                "Drop fragment for message_seq {}: {:?}/{} conflicts with {:?}/{}",
                seq,
                header.msg_type,
                length,
                reassembler.msg_type(),
                reassembler.total_length()
            );
            return Contribution::Ignored;
        }

        reassembler.contribute_fragment(
            header.msg_type,
            length,
            fragment,
            header.fragment_offset as usize,
            (fragment_end - header.fragment_offset) as usize,
        );

        Contribution::Accepted
    }

    /// Whether the next expected message is complete.
    pub fn has_next_message(&self) -> bool {
        self.pending
            .get(&self.next_receive_seq)
            .is_some_and(|r| r.is_complete())
    }

    /// Release the next message if it is complete.
    pub fn next_message(&mut self) -> Option<InboundMessage> {
        if !self.has_next_message() {
            return None;
        }

        let message_seq = self.next_receive_seq;
        let reassembler = self.pending.remove(&message_seq)?;
        let msg_type = reassembler.msg_type();
        let body = reassembler.into_body()?;

        self.next_receive_seq = self.next_receive_seq.wrapping_add(1);
        debug!("Received {:?} message_seq {}", msg_type, message_seq);

        Some(InboundMessage {
            msg_type,
            message_seq,
            body,
        })
    }

    /// Drop partially received messages, e.g. on a handshake restart.
    pub fn reset(&mut self, next_receive_seq: u16) {
        self.pending.clear();
        self.next_receive_seq = next_receive_seq;
    }
}
