use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const WAIT_WINDOW: usize = 100;

#[derive(Default)]
pub struct ThrottleMetrics {
    pub total_requests: AtomicU64,
    pub successful_requests: AtomicU64,
    pub failed_requests: AtomicU64,
    pub retried_requests: AtomicU64,
    pub dropped_requests: AtomicU64,
    waits_ms: Mutex<VecDeque<u64>>,
}

impl ThrottleMetrics {
    pub fn record_wait(&self, wait: Duration) {
        let mut w = self.waits_ms.lock();
        if w.len() == WAIT_WINDOW {
            w.pop_front();
        }
        w.push_back(crate::utils::num::duration_to_millis_u64(wait));
    }

    fn average_wait_ms(&self) -> f64 {
        let w = self.waits_ms.lock();
        if w.is_empty() {
            return 0.0;
        }
        w.iter().map(|&ms| ms as f64).sum::<f64>() / w.len() as f64
    }

    pub fn snapshot(&self, queue_size: usize, in_cooldown: bool, available_tokens: f64) -> ThrottleStats {
        ThrottleStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            retried_requests: self.retried_requests.load(Ordering::Relaxed),
            dropped_requests: self.dropped_requests.load(Ordering::Relaxed),
            queue_size,
            average_wait_ms: self.average_wait_ms(),
            in_cooldown,
            available_tokens,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ThrottleStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub retried_requests: u64,
    pub dropped_requests: u64,
    pub queue_size: usize,
    /// Mean queue wait over the last 100 admissions.
    pub average_wait_ms: f64,
    pub in_cooldown: bool,
    pub available_tokens: f64,
}
