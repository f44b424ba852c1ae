use super::bucket::{Admission, BucketState};
use super::config::{ThrottleConfig, ThrottleConfigUpdate};
use super::stats::{ThrottleMetrics, ThrottleStats};
use crate::errors::{DataError, Result};
use crate::utils::num::exponential_backoff;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::task::{Context, Poll};
use tokio::sync::{Notify, oneshot};
use tokio::time::Instant;

type AttemptFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// A queued job. Success is delivered by `invoke` itself; terminal failures go to `on_failure`.
struct QueueItem {
    invoke: Box<dyn FnMut() -> AttemptFuture + Send>,
    on_failure: Box<dyn FnOnce(DataError) + Send>,
    enqueued_at: Instant,
    retry_count: u32,
    generation: u64,
}

struct State {
    config: ThrottleConfig,
    bucket: BucketState,
    queue: VecDeque<QueueItem>,
    worker_running: bool,
    // Items sleeping out a retry delay; they belong to the current generation.
    backing_off: usize,
    // Bumped by clear_queue so items sleeping in backoff know they were cancelled.
    generation: u64,
}

struct Shared {
    name: String,
    state: Mutex<State>,
    metrics: ThrottleMetrics,
    cleared: Notify,
}

/// Token-bucket request throttle with a bounded FIFO queue and transient-failure retries.
///
/// One worker task drains the queue. Retried items go back to the front of the queue once
/// their backoff delay has elapsed.
#[derive(Clone)]
pub struct Throttle {
    inner: Arc<Shared>,
}

/// Resolves to the final result of a submitted job.
pub struct Ticket<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> Future for Ticket<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => {
                Poll::Ready(Err(DataError::Throttle("request abandoned before completion".into())))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

enum Step {
    Run(QueueItem),
    Wait(std::time::Duration),
    Idle,
}

impl Throttle {
    pub fn new(name: impl Into<String>, config: ThrottleConfig) -> Self {
        let config = config.normalized();
        let bucket = BucketState::new(&config, Instant::now());
        Self {
            inner: Arc::new(Shared {
                name: name.into(),
                state: Mutex::new(State {
                    config,
                    bucket,
                    queue: VecDeque::new(),
                    worker_running: false,
                    backing_off: 0,
                    generation: 0,
                }),
                metrics: ThrottleMetrics::default(),
                cleared: Notify::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Queue `f`. Fails immediately with [`DataError::QueueFull`] when the queue is at its
    /// configured depth; otherwise returns a ticket resolving to `f`'s eventual result.
    ///
    /// `f` is called once per attempt, so it must be able to rebuild its request.
    pub fn submit<T, F, Fut>(&self, mut f: F) -> Result<Ticket<T>>
    where
        T: Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| DataError::Throttle("no async runtime available".into()))?;
        let (tx, rx) = oneshot::channel::<Result<T>>();
        let reply = Arc::new(Mutex::new(Some(tx)));
        let success = reply.clone();

        let invoke = move || -> AttemptFuture {
            let attempt = f();
            let success = success.clone();
            Box::pin(async move {
                let value = attempt.await?;
                if let Some(tx) = success.lock().take() {
                    let _ = tx.send(Ok(value));
                }
                Ok(())
            })
        };
        let on_failure = move |e: DataError| {
            if let Some(tx) = reply.lock().take() {
                let _ = tx.send(Err(e));
            }
        };

        let spawn_worker = {
            let mut st = self.inner.state.lock();
            if st.queue.len() >= st.config.max_queue_size {
                let max_queue_size = st.config.max_queue_size;
                drop(st);
                self.inner.metrics.dropped_requests.fetch_add(1, Ordering::Relaxed);
                log::warn!("throttle {}: queue full ({max_queue_size}), rejecting request", self.inner.name);
                return Err(DataError::QueueFull { max_queue_size });
            }
            let generation = st.generation;
            st.queue.push_back(QueueItem {
                invoke: Box::new(invoke),
                on_failure: Box::new(on_failure),
                enqueued_at: Instant::now(),
                retry_count: 0,
                generation,
            });
            self.inner.metrics.total_requests.fetch_add(1, Ordering::Relaxed);
            !std::mem::replace(&mut st.worker_running, true)
        };
        if spawn_worker {
            runtime.spawn(run_worker(self.inner.clone()));
        }
        Ok(Ticket { rx })
    }

    /// `submit(f)?.await`.
    pub async fn execute<T, F, Fut>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.submit(f)?.await
    }

    /// Reject every queued item and every item waiting out a retry backoff with
    /// [`DataError::QueueCleared`]. Returns the number of items rejected.
    pub fn clear_queue(&self) -> usize {
        let (drained, backing_off) = {
            let mut st = self.inner.state.lock();
            st.generation += 1;
            let backing_off = std::mem::take(&mut st.backing_off);
            (st.queue.drain(..).collect::<Vec<QueueItem>>(), backing_off)
        };
        self.inner.cleared.notify_waiters();
        let count = drained.len() + backing_off;
        for item in drained {
            (item.on_failure)(DataError::QueueCleared);
        }
        self.inner
            .metrics
            .dropped_requests
            .fetch_add(crate::utils::num::usize_to_u64(count), Ordering::Relaxed);
        if count > 0 {
            log::info!("throttle {}: cleared {count} queued requests", self.inner.name);
        }
        count
    }

    pub fn update_config(&self, update: &ThrottleConfigUpdate) {
        let mut st = self.inner.state.lock();
        let State { config, bucket, .. } = &mut *st;
        config.apply(update);
        bucket.clamp(config);
        log::debug!("throttle {}: config updated to {config:?}", self.inner.name);
    }

    pub fn config(&self) -> ThrottleConfig {
        self.inner.state.lock().config.clone()
    }

    pub fn queue_size(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    pub fn stats(&self) -> ThrottleStats {
        let (queue_size, in_cooldown, tokens) = {
            let mut st = self.inner.state.lock();
            let now = Instant::now();
            let State { config, bucket, queue, .. } = &mut *st;
            bucket.refill(config, now);
            (queue.len(), bucket.in_cooldown(now), bucket.available_tokens)
        };
        self.inner.metrics.snapshot(queue_size, in_cooldown, tokens)
    }
}

async fn run_worker(shared: Arc<Shared>) {
    loop {
        let step = {
            let mut st = shared.state.lock();
            let State { config, bucket, queue, worker_running, .. } = &mut *st;
            if queue.is_empty() {
                *worker_running = false;
                Step::Idle
            } else {
                match bucket.try_acquire(config, Instant::now()) {
                    Admission::Granted { from_burst } => {
                        if from_burst {
                            log::debug!("throttle {}: admitted on burst allowance", shared.name);
                        }
                        match queue.pop_front() {
                            Some(item) => Step::Run(item),
                            None => Step::Idle,
                        }
                    }
                    Admission::Wait(d) => Step::Wait(d),
                }
            }
        };
        match step {
            Step::Idle => return,
            Step::Wait(d) => tokio::time::sleep(d).await,
            Step::Run(item) => {
                shared.metrics.record_wait(item.enqueued_at.elapsed());
                crate::dev_trace!("throttle", "admit", "name" => shared.name.as_str(), "retry" => item.retry_count);
                tokio::spawn(run_item(shared.clone(), item));
            }
        }
    }
}

async fn run_item(shared: Arc<Shared>, mut item: QueueItem) {
    let error = match (item.invoke)().await {
        Ok(()) => {
            shared.metrics.successful_requests.fetch_add(1, Ordering::Relaxed);
            return;
        }
        Err(e) => e,
    };

    let (max_retries, base_delay) = {
        let st = shared.state.lock();
        (st.config.max_retries, st.config.base_retry_delay)
    };
    if !error.is_transient() || item.retry_count >= max_retries {
        shared.metrics.failed_requests.fetch_add(1, Ordering::Relaxed);
        if item.retry_count > 0 {
            log::warn!(
                "throttle {}: giving up after {} retries: {error}",
                shared.name,
                item.retry_count
            );
        }
        (item.on_failure)(error);
        return;
    }

    // Registered before the generation check so a concurrent clear_queue cannot be missed.
    let cancelled = shared.cleared.notified();
    {
        let mut st = shared.state.lock();
        if item.generation != st.generation {
            // Cleared while this attempt was in flight.
            drop(st);
            shared.metrics.dropped_requests.fetch_add(1, Ordering::Relaxed);
            (item.on_failure)(DataError::QueueCleared);
            return;
        }
        st.backing_off += 1;
    }

    let delay = exponential_backoff(base_delay, item.retry_count);
    item.retry_count += 1;
    shared.metrics.retried_requests.fetch_add(1, Ordering::Relaxed);
    log::warn!(
        "throttle {}: transient failure ({error}), retry {} of {max_retries} in {delay:?}",
        shared.name,
        item.retry_count
    );
    tokio::select! {
        () = tokio::time::sleep(delay) => {}
        () = cancelled => {}
    }
    requeue_front(&shared, item);
}

fn requeue_front(shared: &Arc<Shared>, mut item: QueueItem) {
    let spawn_worker = {
        let mut st = shared.state.lock();
        if item.generation != st.generation {
            // clear_queue already counted this item as dropped.
            drop(st);
            (item.on_failure)(DataError::QueueCleared);
            return;
        }
        st.backing_off = st.backing_off.saturating_sub(1);
        item.enqueued_at = Instant::now();
        st.queue.push_front(item);
        !std::mem::replace(&mut st.worker_running, true)
    };
    if spawn_worker {
        tokio::spawn(run_worker(shared.clone()));
    }
}
