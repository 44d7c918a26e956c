//! Replace-in-place polling of whole lists.
//!
//! Every refresh fully replaces the held list with what the server returned;
//! nothing is merged. Used for pending friend requests and the conversation
//! list.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use super::lock;
use super::source::{FriendActions, SnapshotSource};
use super::task::PollTask;
use crate::api::error::ApiResult;
use crate::models::Friend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The list was replaced; holds the new length.
    Replaced(usize),
    /// A local change landed while the request was in flight.
    Stale,
    Failed,
}

struct Held<T> {
    items: Vec<T>,
    generation: u64,
}

pub struct SnapshotFeed<T, S> {
    name: &'static str,
    source: Arc<S>,
    held: Mutex<Held<T>>,
    events: Option<mpsc::UnboundedSender<Vec<T>>>,
}

impl<T, S> SnapshotFeed<T, S>
where
    T: Clone + Send + 'static,
    S: SnapshotSource<T> + 'static,
{
    pub fn new(name: &'static str, source: Arc<S>) -> Self {
        Self {
            name,
            source,
            held: Mutex::new(Held {
                items: Vec::new(),
                generation: 0,
            }),
            events: None,
        }
    }

    /// Publish the full list after every change.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<Vec<T>>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn items(&self) -> Vec<T> {
        lock(&self.held).items.clone()
    }

    fn publish(&self, items: Vec<T>) {
        if let Some(ref tx) = self.events {
            let _ = tx.send(items);
        }
    }

    /// Re-fetch the list and replace what is held. Failures are logged and
    /// keep the previous list.
    pub async fn refresh(&self) -> RefreshOutcome {
        let generation = lock(&self.held).generation;
        let fetched = match self.source.fetch_snapshot().await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!("{} polling failed: {}", self.name, e);
                return RefreshOutcome::Failed;
            }
        };

        let mut held = lock(&self.held);
        if held.generation != generation {
            return RefreshOutcome::Stale;
        }
        held.items = fetched;
        let snapshot = held.items.clone();
        drop(held);

        let len = snapshot.len();
        self.publish(snapshot);
        RefreshOutcome::Replaced(len)
    }

    /// Drop held items matching `remove`, invalidating in-flight refreshes.
    pub fn remove_where(&self, remove: impl Fn(&T) -> bool) {
        let mut held = lock(&self.held);
        held.items.retain(|item| !remove(item));
        held.generation += 1;
        let snapshot = held.items.clone();
        drop(held);
        self.publish(snapshot);
    }

    /// Refresh every `every` until cancelled.
    pub fn spawn_poller(self: &Arc<Self>, every: Duration) -> PollTask
    where
        S: Send + Sync,
    {
        let feed = Arc::clone(self);
        PollTask::spawn(self.name, every, move || {
            let feed = Arc::clone(&feed);
            async move {
                feed.refresh().await;
                true
            }
        })
    }
}

impl<S> SnapshotFeed<Friend, S>
where
    S: SnapshotSource<Friend> + FriendActions + 'static,
{
    /// Accept a pending request; on success it leaves the local list at once.
    pub async fn accept(&self, request_id: &str) -> ApiResult<()> {
        self.source.accept_request(request_id).await?;
        self.remove_where(|f| f.id == request_id);
        Ok(())
    }

    /// Reject a pending request; on success it leaves the local list at once.
    pub async fn reject(&self, request_id: &str) -> ApiResult<()> {
        self.source.reject_request(request_id).await?;
        self.remove_where(|f| f.id == request_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ApiError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio_test::assert_ok;

    #[derive(Default)]
    struct FakeRequests {
        responses: Mutex<VecDeque<ApiResult<Vec<Friend>>>>,
        accepted: Mutex<Vec<String>>,
        fail_actions: bool,
    }

    #[async_trait]
    impl SnapshotSource<Friend> for FakeRequests {
        async fn fetch_snapshot(&self) -> ApiResult<Vec<Friend>> {
            lock(&self.responses).pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    #[async_trait]
    impl FriendActions for FakeRequests {
        async fn accept_request(&self, request_id: &str) -> ApiResult<()> {
            if self.fail_actions {
                return Err(ApiError::NotFound {
                    url: format!("/friends/{}/accept", request_id),
                });
            }
            lock(&self.accepted).push(request_id.to_string());
            Ok(())
        }

        async fn reject_request(&self, _request_id: &str) -> ApiResult<()> {
            Ok(())
        }
    }

    fn pending(id: &str) -> Friend {
        Friend {
            id: id.to_string(),
            sender_id: format!("sender-{}", id),
            recipient_id: "me".to_string(),
            accept_time: None,
            sender: None,
        }
    }

    fn held_ids<S: SnapshotSource<Friend> + 'static>(feed: &SnapshotFeed<Friend, S>) -> Vec<String> {
        feed.items().into_iter().map(|f| f.id).collect()
    }

    #[tokio::test]
    async fn test_empty_tick_replaces_list() {
        let source = Arc::new(FakeRequests {
            responses: Mutex::new(vec![Ok(vec![pending("r1"), pending("r2")]), Ok(vec![])].into()),
            ..FakeRequests::default()
        });
        let feed = SnapshotFeed::new("friend requests", source);

        assert_eq!(feed.refresh().await, RefreshOutcome::Replaced(2));
        assert_eq!(held_ids(&feed), vec!["r1", "r2"]);
        assert_eq!(feed.refresh().await, RefreshOutcome::Replaced(0));
        assert!(feed.items().is_empty());
    }

    #[tokio::test]
    async fn test_failed_tick_keeps_previous() {
        let source = Arc::new(FakeRequests {
            responses: Mutex::new(
                vec![
                    Ok(vec![pending("r1")]),
                    Err(ApiError::Status {
                        status: 500,
                        url: "/friends".into(),
                        body: String::new(),
                    }),
                ]
                .into(),
            ),
            ..FakeRequests::default()
        });
        let feed = SnapshotFeed::new("friend requests", source);
        feed.refresh().await;
        assert_eq!(feed.refresh().await, RefreshOutcome::Failed);
        assert_eq!(held_ids(&feed), vec!["r1"]);
    }

    #[tokio::test]
    async fn test_accept_removes_locally() {
        let source = Arc::new(FakeRequests {
            responses: Mutex::new(vec![Ok(vec![pending("r1"), pending("r2")])].into()),
            ..FakeRequests::default()
        });
        let feed = SnapshotFeed::new("friend requests", Arc::clone(&source));
        feed.refresh().await;

        assert_ok!(feed.accept("r1").await);
        assert_eq!(held_ids(&feed), vec!["r2"]);
        assert_eq!(*lock(&source.accepted), vec!["r1".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_accept_leaves_list() {
        let source = Arc::new(FakeRequests {
            responses: Mutex::new(vec![Ok(vec![pending("r1")])].into()),
            fail_actions: true,
            ..FakeRequests::default()
        });
        let feed = SnapshotFeed::new("friend requests", source);
        feed.refresh().await;

        assert!(feed.accept("r1").await.is_err());
        assert_eq!(held_ids(&feed), vec!["r1"]);
    }

    #[tokio::test]
    async fn test_events_carry_full_list() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let source = Arc::new(FakeRequests {
            responses: Mutex::new(vec![Ok(vec![pending("r1")])].into()),
            ..FakeRequests::default()
        });
        let feed = SnapshotFeed::new("friend requests", source).with_events(tx);
        feed.refresh().await;
        feed.reject("r1").await.unwrap();

        assert_eq!(rx.recv().await.unwrap().len(), 1);
        assert!(rx.recv().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_replaces_each_tick() {
        let source = Arc::new(FakeRequests {
            responses: Mutex::new(vec![Ok(vec![pending("r1"), pending("r2")]), Ok(vec![])].into()),
            ..FakeRequests::default()
        });
        let feed = Arc::new(SnapshotFeed::new("friend requests", source));
        let task = feed.spawn_poller(Duration::from_millis(1500));

        tokio::time::sleep(Duration::from_millis(1600)).await;
        assert_eq!(feed.items().len(), 2);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(feed.items().is_empty());
        task.cancel();
    }
}
