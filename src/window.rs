use crate::types::Sequence;

/// Number of sequence numbers tracked behind the latest confirmed one.
const WINDOW_SIZE: u64 = 64;

/// Sliding anti-replay window for DTLS record sequence numbers.
///
/// Keeps the latest authenticated sequence number and a 64-bit bitmap where
/// bit `i` set means `latest - i` has been seen.
///
/// Admission is two explicit steps. A received record must pass
/// [`ReplayWindow::should_discard`] before it is processed, and only once it
/// has been authenticated is [`ReplayWindow::report_authenticated`] called.
/// A forged record therefore never moves the window.
///
/// Each epoch owns its own window.
#[derive(Debug, Clone)]
pub struct ReplayWindow {
    latest: Option<u64>,
    bitmap: u64,
}

impl Default for ReplayWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplayWindow {
    pub fn new() -> Self {
        ReplayWindow {
            latest: None,
            bitmap: 0,
        }
    }

    /// Latest authenticated sequence number, `None` before the first one.
    pub fn latest(&self) -> Option<u64> {
        self.latest
    }

    /// Whether a record with sequence number `seq` must be dropped.
    ///
    /// Fails closed for numbers outside the 48-bit domain. Never mutates.
    pub fn should_discard(&self, seq: u64) -> bool {
        if !Sequence::is_valid_number(seq) {
            return true;
        }

        let Some(latest) = self.latest else {
            return false;
        };

        if seq > latest {
            return false;
        }

        let diff = latest - seq;
        diff >= WINDOW_SIZE || (self.bitmap & (1 << diff)) != 0
    }

    /// Mark `seq` as seen after the record carrying it was authenticated.
    ///
    /// # Panics
    ///
    /// If `seq` does not fit in 48 bits. Records carrying such numbers
    /// cannot be parsed, so this is a caller bug.
    pub fn report_authenticated(&mut self, seq: u64) {
        assert!(
            Sequence::is_valid_number(seq),
            "sequence number {} is out of the 48-bit range",
            seq
        );

        let Some(latest) = self.latest else {
            self.latest = Some(seq);
            self.bitmap = 1;
            return;
        };

        if seq <= latest {
            let diff = latest - seq;
            if diff < WINDOW_SIZE {
                self.bitmap |= 1 << diff;
            }
        } else {
            let diff = seq - latest;
            if diff >= WINDOW_SIZE {
                self.bitmap = 1;
            } else {
                self.bitmap <<= diff;
                self.bitmap |= 1;
            }
            self.latest = Some(seq);
        }
    }

    /// Restart the window so that only numbers strictly after `seq` are accepted.
    ///
    /// # Panics
    ///
    /// If `seq` does not fit in 48 bits.
    pub fn reset(&mut self, seq: u64) {
        assert!(
            Sequence::is_valid_number(seq),
            "sequence number {} is out of the 48-bit range",
            seq
        );

        self.latest = Some(seq);
        let shift = (WINDOW_SIZE - 1).saturating_sub(seq);
        self.bitmap = u64::MAX >> shift;
    }
}
