//! Request throttling: token bucket admission with burst allowance and cooldown, a bounded
//! FIFO queue, exponential-backoff retries for transient failures and running statistics.

mod bucket;
mod config;
mod core;
mod stats;

pub use bucket::{Admission, BucketState};
pub use config::{ThrottleConfig, ThrottleConfigUpdate};
pub use core::{Throttle, Ticket};
pub use stats::{ThrottleMetrics, ThrottleStats};
