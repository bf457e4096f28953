//! Completion-service rate-limit cooldown
//!
//! Tripped by a 429 reply. While active, decisions fail fast without calling
//! the service. The cooldown is a deadline, so it clears itself once it lapses
//! and nothing has to be scheduled to reset it.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::info;

#[derive(Debug)]
pub struct RateLimiter {
    cooldown: Duration,
    until: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            until: Mutex::new(None),
        }
    }

    /// Whether the cooldown is still running
    pub fn is_exceeded(&self) -> bool {
        let mut until = self.until.lock();
        match *until {
            Some(deadline) if Instant::now() < deadline => true,
            Some(_) => {
                *until = None;
                info!("Rate-limit cooldown over, resuming completion requests");
                false
            }
            None => false,
        }
    }

    /// Start (or restart) the cooldown from now
    pub fn trip(&self) {
        *self.until.lock() = Some(Instant::now() + self.cooldown);
    }

    /// Time left on the cooldown, zero when inactive
    pub fn remaining(&self) -> Duration {
        let until = *self.until.lock();
        until
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::ZERO)
    }
}
