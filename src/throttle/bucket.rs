use super::config::ThrottleConfig;
use std::time::Duration;
use tokio::time::Instant;

const MIN_WAIT: Duration = Duration::from_millis(1);

/// Outcome of asking the bucket for one token.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Admission {
    Granted { from_burst: bool },
    Wait(Duration),
}

/// Token bucket with a burst overflow bucket and optional cooldown.
///
/// Refill is lazy: `tokens += elapsed * rate`, capped at the rate. Refill beyond the cap
/// spills into the burst bucket. A fresh bucket holds a single regular token, so even the
/// first second never admits more than `rate` requests without burst.
#[derive(Clone, Debug)]
pub struct BucketState {
    pub available_tokens: f64,
    pub burst_tokens: f64,
    pub last_refill: Instant,
    pub cooldown_until: Option<Instant>,
}

impl BucketState {
    #[must_use]
    pub fn new(cfg: &ThrottleConfig, now: Instant) -> Self {
        Self {
            available_tokens: cfg.requests_per_second.min(1.0),
            burst_tokens: cfg.burst_capacity,
            last_refill: now,
            cooldown_until: None,
        }
    }

    pub fn refill(&mut self, cfg: &ThrottleConfig, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        if elapsed <= 0.0 {
            return;
        }
        let total = cfg.requests_per_second.mul_add(elapsed, self.available_tokens);
        if total > cfg.requests_per_second {
            let overflow = total - cfg.requests_per_second;
            self.available_tokens = cfg.requests_per_second;
            self.burst_tokens = (self.burst_tokens + overflow).min(cfg.burst_capacity);
        } else {
            self.available_tokens = total;
        }
        self.last_refill = now;
    }

    /// Consume one token, preferring regular over burst tokens.
    pub fn try_acquire(&mut self, cfg: &ThrottleConfig, now: Instant) -> Admission {
        if let Some(until) = self.cooldown_until {
            if now < until {
                return Admission::Wait(until - now);
            }
            self.cooldown_until = None;
        }
        self.refill(cfg, now);
        if self.available_tokens >= 1.0 {
            self.available_tokens -= 1.0;
            return Admission::Granted { from_burst: false };
        }
        if self.burst_tokens >= 1.0 {
            self.burst_tokens -= 1.0;
            if self.burst_tokens < 1.0
                && let Some(cooldown) = cfg.cooldown
            {
                self.cooldown_until = Some(now + cooldown);
            }
            return Admission::Granted { from_burst: true };
        }
        let missing = 1.0 - self.available_tokens;
        let wait = crate::utils::num::secs_f64_to_duration(missing / cfg.requests_per_second);
        Admission::Wait(wait.max(MIN_WAIT))
    }

    /// Re-establish the capacity invariants after a config change.
    pub fn clamp(&mut self, cfg: &ThrottleConfig) {
        self.available_tokens = self.available_tokens.clamp(0.0, cfg.requests_per_second);
        self.burst_tokens = self.burst_tokens.clamp(0.0, cfg.burst_capacity);
        if cfg.cooldown.is_none() {
            self.cooldown_until = None;
        }
    }

    #[must_use]
    pub fn in_cooldown(&self, now: Instant) -> bool {
        self.cooldown_until.is_some_and(|until| now < until)
    }
}
