use crate::config::Environment;
use std::time::Duration;

const MIN_RATE: f64 = 0.01;

#[derive(Clone, Debug, PartialEq)]
pub struct ThrottleConfig {
    /// Regular bucket capacity and refill rate.
    pub requests_per_second: f64,
    /// Extra allowance on top of the regular bucket; 0 disables burst.
    pub burst_capacity: f64,
    /// Pause entered once the burst allowance is exhausted.
    pub cooldown: Option<Duration>,
    pub max_queue_size: usize,
    pub max_retries: u32,
    pub base_retry_delay: Duration,
}

impl ThrottleConfig {
    /// Burst of twice the base rate, cooldown after the burst is spent, three retries.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            requests_per_second: 10.0,
            burst_capacity: 20.0,
            cooldown: Some(Duration::from_secs(2)),
            max_queue_size: 100,
            max_retries: 3,
            base_retry_delay: Duration::from_secs(1),
        }
    }

    /// No burst, no cooldown, no retries.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            requests_per_second: 5.0,
            burst_capacity: 0.0,
            cooldown: None,
            max_queue_size: 50,
            max_retries: 0,
            base_retry_delay: Duration::from_secs(1),
        }
    }

    #[must_use]
    pub fn for_environment(env: &Environment) -> Self {
        Self {
            requests_per_second: env.requests_per_second,
            burst_capacity: env.burst_capacity,
            cooldown: (env.cooldown_ms > 0).then(|| Duration::from_millis(env.cooldown_ms)),
            max_queue_size: env.max_queue_size,
            max_retries: env.retry_attempts,
            base_retry_delay: Duration::from_millis(env.retry_delay_ms),
        }
        .normalized()
    }

    /// Clamp values that would stall or break the bucket arithmetic.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if !self.requests_per_second.is_finite() || self.requests_per_second < MIN_RATE {
            self.requests_per_second = MIN_RATE;
        }
        if !self.burst_capacity.is_finite() || self.burst_capacity < 0.0 {
            self.burst_capacity = 0.0;
        }
        self
    }

    pub fn apply(&mut self, update: &ThrottleConfigUpdate) {
        if let Some(v) = update.requests_per_second {
            self.requests_per_second = v;
        }
        if let Some(v) = update.burst_capacity {
            self.burst_capacity = v;
        }
        if let Some(v) = update.cooldown {
            self.cooldown = v;
        }
        if let Some(v) = update.max_queue_size {
            self.max_queue_size = v;
        }
        if let Some(v) = update.max_retries {
            self.max_retries = v;
        }
        if let Some(v) = update.base_retry_delay {
            self.base_retry_delay = v;
        }
        *self = self.clone().normalized();
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// Partial update for [`super::Throttle::update_config`]; `None` leaves a field unchanged.
#[derive(Clone, Debug, Default)]
pub struct ThrottleConfigUpdate {
    pub requests_per_second: Option<f64>,
    pub burst_capacity: Option<f64>,
    pub cooldown: Option<Option<Duration>>,
    pub max_queue_size: Option<usize>,
    pub max_retries: Option<u32>,
    pub base_retry_delay: Option<Duration>,
}
