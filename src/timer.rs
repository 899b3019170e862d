//! Deadlines and retransmission backoff.
//!
//! Nothing here reads the clock. Callers pass `now` in, which keeps the
//! handshake testable and lets the transport own all waiting.

use std::time::{Duration, Instant};

use crate::{Config, SeededRng};

// In seconds.
const JITTER_RANGE: f32 = 0.5;

const MIN_RTO: Duration = Duration::from_millis(50);

/// An overall deadline, such as the handshake timeout.
#[derive(Debug, Clone, Copy)]
pub struct Timeout {
    start: Instant,
    duration: Duration,
}

impl Timeout {
    pub fn new(duration: Duration, now: Instant) -> Self {
        Timeout {
            start: now,
            duration,
        }
    }

    /// Time left before the deadline, zero once expired.
    ///
    /// A clock observed going backwards restarts the timeout from `now`.
    pub fn remaining(&mut self, now: Instant) -> Duration {
        if now < self.start {
            self.start = now;
            return self.duration;
        }
        let elapsed = now - self.start;
        self.duration.saturating_sub(elapsed)
    }

    pub fn has_expired(&mut self, now: Instant) -> bool {
        self.remaining(now).is_zero()
    }

    /// Milliseconds to wait in a receive call.
    ///
    /// `None` for no timeout means wait indefinitely, which is `0`.
    /// An expired timeout is `-1`.
    pub fn wait_millis(timeout: Option<&mut Timeout>, now: Instant) -> i64 {
        let Some(timeout) = timeout else {
            return 0;
        };
        let remaining = timeout.remaining(now);
        if remaining.is_zero() {
            return -1;
        }
        // At least one millisecond, a 0 here would mean "forever".
        remaining.as_millis().clamp(1, i64::MAX as u128) as i64
    }

    /// Cap `wait_millis` by what remains of `timeout`.
    ///
    /// `wait_millis` of 0 means wait indefinitely. Returns -1 once the
    /// timeout has expired.
    pub fn constrain_wait(wait_millis: i64, timeout: Option<&mut Timeout>, now: Instant) -> i64 {
        if wait_millis < 0 {
            return -1;
        }
        let remaining = Self::wait_millis(timeout, now);
        if remaining < 0 {
            return -1;
        }
        if remaining == 0 {
            return wait_millis;
        }
        if wait_millis == 0 {
            return remaining;
        }
        wait_millis.min(remaining)
    }
}

/// Retransmission timer for one flight.
///
/// Starts at the configured RTO, doubles per attempt up to a ceiling and
/// carries a random jitter of ±0.25s.
pub struct ExponentialBackoff {
    start_rto: Duration,
    max_rto: Duration,
    retries: usize,
    rto: Duration,
    jitter: f32,
    left: usize,
}

impl ExponentialBackoff {
    pub fn new(
        start_rto: Duration,
        max_rto: Duration,
        retries: usize,
        rng: &mut SeededRng,
    ) -> Self {
        Self {
            start_rto,
            max_rto,
            retries,
            rto: start_rto,
            jitter: rng.jitter(JITTER_RANGE),
            left: retries,
        }
    }

    /// Backoff for handshake flights as configured.
    pub fn for_flights(config: &Config, rng: &mut SeededRng) -> Self {
        Self::new(
            config.flight_start_rto(),
            config.flight_max_rto(),
            config.flight_retries(),
            rng,
        )
    }

    pub fn reset(&mut self, rng: &mut SeededRng) {
        self.rto = self.start_rto;
        self.jitter = rng.jitter(JITTER_RANGE);
        self.left = self.retries;
    }

    pub fn rto(&self) -> Duration {
        if self.jitter < 0.0 {
            let duration = Duration::from_secs_f32(self.jitter.abs());
            self.rto.saturating_sub(duration)
        } else {
            self.rto + Duration::from_secs_f32(self.jitter)
        }
        .max(MIN_RTO)
    }

    /// Deadline of the current attempt.
    pub fn deadline(&self, sent_at: Instant) -> Instant {
        sent_at + self.rto()
    }

    pub fn attempt(&mut self, rng: &mut SeededRng) {
        let Some(n) = self.left.checked_sub(1) else {
            return;
        };

        self.left = n;
        self.jitter = rng.jitter(JITTER_RANGE);
        self.rto = (self.rto * 2).min(self.max_rto);
        debug!("Flight backoff, rto {:?}, {} retries left", self.rto, n);
    }

    pub fn can_retry(&self) -> bool {
        self.left > 0
    }
}
