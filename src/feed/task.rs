//! Cancellable polling tasks

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// Handle to a spawned polling loop.
///
/// Dropping the handle or calling [`PollTask::cancel`] aborts the loop, so
/// tearing down a view is a single call.
pub struct PollTask {
    key: String,
    handle: JoinHandle<()>,
}

impl PollTask {
    /// Spawn a loop that runs `tick` every `every`, starting one period from
    /// now. The loop ends early when `tick` returns `false`.
    pub fn spawn<F, Fut>(key: impl Into<String>, every: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let key = key.into();
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            let mut interval = time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await; // skip first immediate tick

            loop {
                interval.tick().await;
                if !tick().await {
                    tracing::debug!("Poller {} stopped", task_key);
                    break;
                }
            }
        });
        Self { key, handle }
    }

    /// What this task polls (a conversation id, or a list name).
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for PollTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_until_cancelled() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let task = PollTask::spawn("c1", Duration::from_millis(100), move || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                true
            }
        });
        assert_eq!(task.key(), "c1");

        time::sleep(Duration::from_millis(350)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        task.cancel();
        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_tick_returns_false() {
        let task = PollTask::spawn("c1", Duration::from_millis(10), || async { false });
        time::sleep(Duration::from_millis(50)).await;
        assert!(task.is_finished());
    }
}
