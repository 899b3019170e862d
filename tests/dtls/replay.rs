//! Anti-replay window against a reference model.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use dtlskx::types::MAX_SEQUENCE_NUMBER;
use dtlskx::ReplayWindow;

/// Everything ever authenticated, checked the slow way.
#[derive(Default)]
struct Model {
    seen: HashSet<u64>,
    latest: Option<u64>,
}

impl Model {
    fn should_discard(&self, seq: u64) -> bool {
        if seq > MAX_SEQUENCE_NUMBER {
            return true;
        }
        match self.latest {
            None => false,
            Some(latest) if seq > latest => false,
            Some(latest) => latest - seq >= 64 || self.seen.contains(&seq),
        }
    }

    fn report(&mut self, seq: u64) {
        self.seen.insert(seq);
        self.latest = Some(self.latest.map_or(seq, |l| l.max(seq)));
    }
}

fn check(seed: u64, base: u64, spread: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut window = ReplayWindow::new();
    let mut model = Model::default();
    let mut cursor = base;

    for _ in 0..5_000 {
        // mostly forward, sometimes a jump, sometimes a late arrival
        let seq = match rng.gen_range(0..10) {
            0 => cursor.saturating_add(rng.gen_range(0..spread)),
            1..=3 => cursor.saturating_sub(rng.gen_range(0..80)),
            _ => cursor.saturating_add(rng.gen_range(0..3)),
        }
        .min(MAX_SEQUENCE_NUMBER);

        let discard = window.should_discard(seq);
        assert_eq!(discard, model.should_discard(seq), "seq {} latest {:?}", seq, model.latest);

        // an authentication failure every now and then leaves the window alone
        if !discard && rng.gen_bool(0.9) {
            window.report_authenticated(seq);
            model.report(seq);
            cursor = cursor.max(seq);
        }
        assert_eq!(window.latest(), model.latest);
    }
}

#[test]
fn matches_model_from_zero() {
    let _ = env_logger::try_init();
    check(1, 0, 100);
}

#[test]
fn matches_model_with_big_jumps() {
    let _ = env_logger::try_init();
    check(2, 1000, 1 << 20);
}

#[test]
fn matches_model_at_the_top_of_the_range() {
    let _ = env_logger::try_init();
    check(3, MAX_SEQUENCE_NUMBER - 4_000, 200);
}

#[test]
fn each_number_is_accepted_once() {
    let _ = env_logger::try_init();

    let mut rng = StdRng::seed_from_u64(4);
    let mut window = ReplayWindow::new();
    let mut accepted = HashSet::new();

    // heavy duplication in a narrow band
    for _ in 0..10_000 {
        let seq = rng.gen_range(0..200);
        if !window.should_discard(seq) {
            window.report_authenticated(seq);
            assert!(accepted.insert(seq), "{} accepted twice", seq);
        }
    }
}

#[test]
fn rejected_records_do_not_move_the_window() {
    let _ = env_logger::try_init();

    let mut window = ReplayWindow::new();
    window.report_authenticated(10);

    // a forged record with a huge number is checked but never reported
    assert!(!window.should_discard(1 << 40));
    assert_eq!(window.latest(), Some(10));
    assert!(!window.should_discard(9));
    assert!(window.should_discard(10));
}

#[test]
fn reset_accepts_only_later_numbers() {
    let _ = env_logger::try_init();

    for seq in [0, 1, 62, 63, 64, 65, 1 << 30, MAX_SEQUENCE_NUMBER - 1] {
        let mut window = ReplayWindow::new();
        window.reset(seq);
        assert_eq!(window.latest(), Some(seq));
        assert!(window.should_discard(seq));
        assert!(window.should_discard(seq.saturating_sub(1)));
        assert!(window.should_discard(seq.saturating_sub(63)));
        assert!(!window.should_discard(seq + 1));
    }
}
