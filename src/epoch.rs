//! Per-epoch write sequence and replay state.
//!
//! DTLS scopes record sequence numbers to an epoch. The handshake keeps the
//! old epoch alive for retransmits while the new one carries post
//! ChangeCipherSpec traffic, see [`EpochSet`].

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::crypto::CryptoSafe;
use crate::types::{ContentType, MAX_SEQUENCE_NUMBER};
use crate::window::ReplayWindow;
use crate::Error;

/// Opaque cipher context bound to an epoch.
///
/// Record protection itself lives outside this crate. The epoch only needs
/// to carry the negotiated cipher and ask it for size limits.
pub trait RecordCipher: CryptoSafe {
    /// Largest plaintext that fits in `ciphertext_limit` bytes of record body.
    fn plaintext_limit(&self, ciphertext_limit: usize) -> usize;

    /// Record body size produced for `plaintext_limit` bytes of plaintext.
    fn ciphertext_limit(&self, plaintext_limit: usize) -> usize;

    /// Protect one record body.
    fn encode_plaintext(
        &self,
        seq_no: u64,
        content_type: ContentType,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, String>;

    /// Unprotect one record body.
    fn decode_ciphertext(
        &self,
        seq_no: u64,
        content_type: ContentType,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, String>;
}

/// Pass-through cipher of epoch 0.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCipher;

impl RecordCipher for NullCipher {
    fn plaintext_limit(&self, ciphertext_limit: usize) -> usize {
        ciphertext_limit
    }

    fn ciphertext_limit(&self, plaintext_limit: usize) -> usize {
        plaintext_limit
    }

    fn encode_plaintext(&self, _: u64, _: ContentType, plaintext: &[u8]) -> Result<Vec<u8>, String> {
        Ok(plaintext.to_vec())
    }

    fn decode_ciphertext(&self, _: u64, _: ContentType, ciphertext: &[u8]) -> Result<Vec<u8>, String> {
        Ok(ciphertext.to_vec())
    }
}

#[derive(Debug)]
struct EpochState {
    next_write_seq: u64,
    replay: ReplayWindow,
}

/// One generation of negotiated record protection.
///
/// The id and cipher are fixed at construction. The write counter and the
/// replay window mutate under a single lock, so an `Epoch` can be shared
/// between threads behind an `Arc`.
pub struct Epoch {
    epoch: u16,
    cipher: Box<dyn RecordCipher>,
    state: Mutex<EpochState>,
}

impl Epoch {
    pub fn new(epoch: u16, cipher: Box<dyn RecordCipher>) -> Self {
        Epoch {
            epoch,
            cipher,
            state: Mutex::new(EpochState {
                next_write_seq: 0,
                replay: ReplayWindow::new(),
            }),
        }
    }

    /// Epoch 0 with the null cipher.
    pub fn initial() -> Self {
        Self::new(0, Box::new(NullCipher))
    }

    pub fn epoch(&self) -> u16 {
        self.epoch
    }

    pub fn cipher(&self) -> &dyn RecordCipher {
        self.cipher.as_ref()
    }

    fn lock(&self) -> MutexGuard<'_, EpochState> {
        // The state is plain integers, a panic elsewhere cannot leave it torn.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Take the next write sequence number.
    ///
    /// Fails once the 48-bit space is used up. The epoch must be retired
    /// before that happens.
    pub fn allocate_sequence_number(&self) -> Result<u64, Error> {
        let mut state = self.lock();
        if state.next_write_seq > MAX_SEQUENCE_NUMBER {
            return Err(Error::SequenceExhausted(self.epoch));
        }
        let seq = state.next_write_seq;
        state.next_write_seq += 1;
        Ok(seq)
    }

    /// The next write sequence number, without taking it.
    pub fn sequence_number(&self) -> u64 {
        self.lock().next_write_seq
    }

    /// Move the write counter, e.g. to echo a ClientHello record sequence.
    ///
    /// The counter never moves backwards.
    pub fn set_sequence_number(&self, seq: u64) -> Result<(), Error> {
        let mut state = self.lock();
        if seq < state.next_write_seq {
            return Err(Error::internal(format!(
                "epoch {} sequence cannot move back from {} to {}",
                self.epoch, state.next_write_seq, seq
            )));
        }
        state.next_write_seq = seq;
        Ok(())
    }

    pub fn should_discard(&self, seq: u64) -> bool {
        let discard = self.lock().replay.should_discard(seq);
        if discard {
            trace!("Discard replayed record epoch {} seq {}", self.epoch, seq);
        }
        discard
    }

    pub fn report_authenticated(&self, seq: u64) {
        self.lock().replay.report_authenticated(seq);
    }

    pub fn reset_replay_window(&self, seq: u64) {
        self.lock().replay.reset(seq);
    }
}

impl fmt::Debug for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("Epoch")
            .field("epoch", &self.epoch)
            .field("cipher", &self.cipher)
            .field("next_write_seq", &state.next_write_seq)
            .finish()
    }
}

/// The live epochs of one association.
///
/// Reading and writing switch separately: the peer's ChangeCipherSpec
/// activates the pending read epoch and ours activates the pending write
/// epoch. The previous write epoch stays around so a lost flight can be
/// retransmitted under its original keys.
#[derive(Debug)]
pub struct EpochSet {
    read: Arc<Epoch>,
    write: Arc<Epoch>,
    previous_write: Option<Arc<Epoch>>,
    pending: Option<Arc<Epoch>>,
}

impl Default for EpochSet {
    fn default() -> Self {
        Self::new()
    }
}

impl EpochSet {
    pub fn new() -> Self {
        let initial = Arc::new(Epoch::initial());
        EpochSet {
            read: initial.clone(),
            write: initial,
            previous_write: None,
            pending: None,
        }
    }

    pub fn read(&self) -> &Arc<Epoch> {
        &self.read
    }

    pub fn write(&self) -> &Arc<Epoch> {
        &self.write
    }

    pub fn previous_write(&self) -> Option<&Arc<Epoch>> {
        self.previous_write.as_ref()
    }

    pub fn pending(&self) -> Option<&Arc<Epoch>> {
        self.pending.as_ref()
    }

    /// Prepare the next epoch with a freshly negotiated cipher.
    pub fn init_pending(&mut self, cipher: Box<dyn RecordCipher>) -> Result<(), Error> {
        if self.pending.is_some() {
            return Err(Error::internal("pending epoch already initialised"));
        }
        let current = self.read.epoch().max(self.write.epoch());
        let next = current.checked_add(1).ok_or(Error::WrappedEpoch)?;
        debug!("Pending epoch {}", next);
        self.pending = Some(Arc::new(Epoch::new(next, cipher)));
        Ok(())
    }

    /// Switch reads to the pending epoch.
    pub fn activate_pending_read(&mut self) -> Result<(), Error> {
        let pending = self
            .pending
            .as_ref()
            .ok_or_else(|| Error::internal("no pending epoch for read"))?;
        if pending.epoch() == self.read.epoch() {
            return Err(Error::internal("pending read epoch already active"));
        }
        debug!("Read epoch {} -> {}", self.read.epoch(), pending.epoch());
        self.read = pending.clone();
        self.release_pending_if_done();
        Ok(())
    }

    /// Switch writes to the pending epoch, retaining the old one for retransmits.
    pub fn activate_pending_write(&mut self) -> Result<(), Error> {
        let pending = self
            .pending
            .as_ref()
            .ok_or_else(|| Error::internal("no pending epoch for write"))?;
        if pending.epoch() == self.write.epoch() {
            return Err(Error::internal("pending write epoch already active"));
        }
        debug!("Write epoch {} -> {}", self.write.epoch(), pending.epoch());
        let old = std::mem::replace(&mut self.write, pending.clone());
        self.previous_write = Some(old);
        self.release_pending_if_done();
        Ok(())
    }

    fn release_pending_if_done(&mut self) {
        let done = match &self.pending {
            Some(p) => p.epoch() == self.read.epoch() && p.epoch() == self.write.epoch(),
            None => false,
        };
        if done {
            self.pending = None;
        }
    }

    /// Drop the retained previous write epoch once the handshake is confirmed.
    pub fn discard_previous(&mut self) {
        if let Some(previous) = self.previous_write.take() {
            debug!("Discard previous write epoch {}", previous.epoch());
        }
    }

    /// Look up the epoch that should process an incoming record.
    pub fn read_epoch(&self, epoch: u16) -> Option<&Arc<Epoch>> {
        if self.read.epoch() == epoch {
            return Some(&self.read);
        }
        // Records of the next epoch may arrive before the peer's
        // ChangeCipherSpec has been processed.
        self.pending.as_ref().filter(|p| p.epoch() == epoch)
    }
}
