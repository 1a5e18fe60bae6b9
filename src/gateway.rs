use crate::model::structures::priority::Priority;
use std::collections::VecDeque;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::debug;

/// Request budget shared by every upstream call. A fixed window `window`
/// bounds at most `max_requests` dispatches; `background_reserve` slots are
/// kept free for interactive callers so a backfill can never starve a user
/// who is waiting on a page load.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub window: Duration,
    pub max_requests: usize,
    pub background_reserve: usize,
    pub recheck_interval: Duration
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            window: Duration::from_secs(120),
            max_requests: 100,
            background_reserve: 30,
            recheck_interval: Duration::from_millis(250)
        }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway scheduler is no longer running")]
    Closed
}

struct Waiter {
    priority: Priority,
    permit: oneshot::Sender<()>
}

/// Handle to the single scheduler task owning all rate-limiter state.
///
/// Admission (may this call start now?) is serialized inside the scheduler;
/// the call itself runs in the caller after `acquire` resolves, so slow
/// responses never hold up the queue.
#[derive(Clone)]
pub struct Gateway {
    tx: mpsc::UnboundedSender<Waiter>
}

impl Gateway {
    pub fn spawn(config: GatewayConfig) -> Gateway {
        let (tx, rx) = mpsc::unbounded_channel();

        let scheduler = Scheduler {
            config,
            rx,
            queue: VecDeque::new(),
            dispatched: VecDeque::new()
        };
        tokio::spawn(scheduler.run());

        Gateway { tx }
    }

    /// Suspends until the scheduler grants a slot for this call.
    pub async fn acquire(&self, priority: Priority) -> Result<(), GatewayError> {
        let (permit_tx, permit_rx) = oneshot::channel();

        self.tx
            .send(Waiter {
                priority,
                permit: permit_tx
            })
            .map_err(|_| GatewayError::Closed)?;

        permit_rx.await.map_err(|_| GatewayError::Closed)
    }
}

struct Scheduler {
    config: GatewayConfig,
    rx: mpsc::UnboundedReceiver<Waiter>,
    queue: VecDeque<Waiter>,
    /// Rolling log of dispatch times inside the current window.
    dispatched: VecDeque<Instant>
}

impl Scheduler {
    async fn run(mut self) {
        loop {
            if self.queue.is_empty() {
                // Idle: block until someone wants a slot.
                match self.rx.recv().await {
                    Some(waiter) => self.queue.push_back(waiter),
                    None => return
                }
            }

            while let Ok(waiter) = self.rx.try_recv() {
                self.queue.push_back(waiter);
            }

            // Interactive entries ahead of background, stable otherwise.
            self.queue.make_contiguous().sort_by_key(|w| w.priority);

            let now = Instant::now();
            self.prune(now);

            let available = self.config.max_requests - self.dispatched.len();
            let can_proceed = match self.queue.front().map(|w| w.priority) {
                Some(Priority::Interactive) => available > 0,
                Some(Priority::Background) => available > self.config.background_reserve,
                None => false
            };

            if can_proceed {
                if let Some(waiter) = self.queue.pop_front() {
                    self.dispatched.push_back(now);

                    // A dropped receiver means the caller gave up after
                    // enqueueing; the slot still counts as spent.
                    let _ = waiter.permit.send(());
                }
            } else {
                debug!(
                    queued = self.queue.len(),
                    in_window = self.dispatched.len(),
                    "budget exhausted, rechecking shortly"
                );
                tokio::time::sleep(self.config.recheck_interval).await;
            }
        }
    }

    fn prune(&mut self, now: Instant) {
        while let Some(oldest) = self.dispatched.front() {
            if now.duration_since(*oldest) >= self.config.window {
                self.dispatched.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Gateway, GatewayConfig};
    use crate::model::structures::priority::Priority;
    use std::time::Duration;
    use tokio::time::Instant;

    fn small_config() -> GatewayConfig {
        GatewayConfig {
            window: Duration::from_secs(10),
            max_requests: 3,
            background_reserve: 1,
            recheck_interval: Duration::from_millis(50)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_is_never_exceeded() {
        let gateway = Gateway::spawn(small_config());
        let start = Instant::now();

        // Three slots are granted immediately.
        for _ in 0..3 {
            gateway.acquire(Priority::Interactive).await.unwrap();
        }
        assert!(start.elapsed() < Duration::from_secs(1));

        // The fourth slot only opens once the first dispatch ages out.
        gateway.acquire(Priority::Interactive).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_respects_reserve() {
        // reserve 1 of 3: background may run while more than one slot is free.
        let gateway = Gateway::spawn(small_config());

        gateway.acquire(Priority::Background).await.unwrap();
        gateway.acquire(Priority::Background).await.unwrap();

        // Two dispatched, one slot left: that slot belongs to interactive.
        let blocked = {
            let gateway = gateway.clone();
            tokio::spawn(async move { gateway.acquire(Priority::Background).await })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!blocked.is_finished());

        // An interactive call takes the reserved slot without waiting for
        // the window to roll over.
        let start = Instant::now();
        gateway.acquire(Priority::Interactive).await.unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));

        // Once dispatches age out the background call goes through.
        blocked.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_interactive_overtakes_queued_background() {
        let config = GatewayConfig {
            window: Duration::from_secs(10),
            max_requests: 1,
            background_reserve: 0,
            recheck_interval: Duration::from_millis(50)
        };
        let gateway = Gateway::spawn(config);

        // Exhaust the budget.
        gateway.acquire(Priority::Interactive).await.unwrap();

        let background = {
            let gateway = gateway.clone();
            tokio::spawn(async move {
                gateway.acquire(Priority::Background).await.unwrap();
                Instant::now()
            })
        };
        // Let the background waiter enqueue first.
        tokio::time::sleep(Duration::from_millis(200)).await;

        let interactive = {
            let gateway = gateway.clone();
            tokio::spawn(async move {
                gateway.acquire(Priority::Interactive).await.unwrap();
                Instant::now()
            })
        };

        let interactive_done = interactive.await.unwrap();
        let background_done = background.await.unwrap();
        assert!(interactive_done <= background_done);
    }
}
