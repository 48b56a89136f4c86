//! Pacing sleeps: humanized per-action jitter vs. block cooldown.
//!
//! These are deliberately two separate operations on one trait. The jitter
//! delay runs after every verified action; the cooldown runs only after a
//! suspected platform-side block and must not be affected by delay tuning.

use std::thread;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::core::types::ActionKind;

/// Sleep side effects the governor schedules. Tests record instead of sleep.
pub trait Pacer {
    /// Humanized delay after a verified action.
    fn action_delay(&mut self, kind: ActionKind);

    /// Mandatory pause after a suspected temporary block.
    fn cooldown(&mut self);
}

/// Real pacer backed by `thread::sleep`.
pub struct ThreadPacer {
    delay_base: Duration,
    cooldown_len: Duration,
}

impl ThreadPacer {
    pub fn new(delay_base: Duration, cooldown_len: Duration) -> Self {
        Self {
            delay_base,
            cooldown_len,
        }
    }
}

impl Pacer for ThreadPacer {
    fn action_delay(&mut self, kind: ActionKind) {
        if self.delay_base.is_zero() {
            return;
        }
        // Jitter bounds 0.85x..=1.14x of the configured base.
        let base = self.delay_base.as_secs_f64();
        let jittered = rand::thread_rng().gen_range(base * 0.85..=base * 1.14);
        debug!(kind = kind.as_str(), seconds = jittered, "post-action delay");
        thread::sleep(Duration::from_secs_f64(jittered));
    }

    fn cooldown(&mut self) {
        warn!(seconds = self.cooldown_len.as_secs(), "cooldown after suspected block");
        thread::sleep(self.cooldown_len);
    }
}
