//! Message feed: incremental polling and backward pagination over a
//! [`MessageWindow`].
//!
//! Every operation captures a [`Ticket`] before awaiting the network and
//! checks it again before touching the window, so a response that arrives
//! after the feed moved to another conversation is discarded.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use super::lock;
use super::source::MessageSource;
use super::task::PollTask;
use super::window::{MessageWindow, Ticket};
use crate::api::error::ApiResult;
use crate::models::{Message, PageRequest};

/// State change published to the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    Loaded { conversation_id: String, count: usize },
    Appended { conversation_id: String, messages: Vec<Message> },
    Prepended { conversation_id: String, count: usize },
    Exhausted { conversation_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(usize),
    /// The feed switched conversations while the request was in flight.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Appended(usize),
    Empty,
    Stale,
    /// No conversation is open.
    Idle,
    /// The request failed; logged and ignored.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OlderOutcome {
    Prepended(usize),
    /// The server had nothing older; further backward requests are suppressed.
    Exhausted,
    /// Nothing to do: no conversation, empty window, already exhausted, or a
    /// backward request already in flight.
    Skipped,
    Stale,
}

/// Everything a view needs to draw the open conversation, read under one lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSnapshot {
    pub conversation_id: String,
    pub messages: Vec<Message>,
    pub exhausted: bool,
    pub loading_older: bool,
}

pub struct MessageFeed<S> {
    source: Arc<S>,
    window: Mutex<MessageWindow>,
    page_size: usize,
    events: Option<mpsc::UnboundedSender<FeedEvent>>,
}

impl<S: MessageSource + 'static> MessageFeed<S> {
    pub fn new(source: Arc<S>, page_size: usize) -> Self {
        Self {
            source,
            window: Mutex::new(MessageWindow::new()),
            page_size: page_size.max(1),
            events: None,
        }
    }

    /// Publish every applied change on `tx`.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<FeedEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    fn emit(&self, event: FeedEvent) {
        if let Some(ref tx) = self.events {
            let _ = tx.send(event);
        }
    }

    pub fn conversation_id(&self) -> Option<String> {
        lock(&self.window).conversation_id().map(String::from)
    }

    /// Copy of the current window contents, oldest first.
    pub fn messages(&self) -> Vec<Message> {
        lock(&self.window).messages().to_vec()
    }

    pub fn cursor(&self) -> Option<String> {
        lock(&self.window).cursor().map(String::from)
    }

    pub fn snapshot(&self) -> Option<FeedSnapshot> {
        let w = lock(&self.window);
        Some(FeedSnapshot {
            conversation_id: w.conversation_id()?.to_string(),
            messages: w.messages().to_vec(),
            exhausted: w.is_exhausted(),
            loading_older: w.is_loading_older(),
        })
    }

    /// Reset to `conversation_id` and load its most recent page.
    pub async fn switch(&self, conversation_id: &str) -> ApiResult<LoadOutcome> {
        let ticket = lock(&self.window).switch(conversation_id);
        tracing::debug!("Switched message feed to {}", conversation_id);
        self.load(ticket).await
    }

    /// Load the most recent page of `conversation_id`, replacing the window.
    ///
    /// Opening a different conversation than the current one resets first,
    /// exactly like [`MessageFeed::switch`].
    pub async fn load_initial(&self, conversation_id: &str) -> ApiResult<LoadOutcome> {
        let ticket = {
            let mut w = lock(&self.window);
            match w.ticket() {
                Some(t) if t.conversation_id == conversation_id => t,
                _ => w.switch(conversation_id),
            }
        };
        self.load(ticket).await
    }

    async fn load(&self, ticket: Ticket) -> ApiResult<LoadOutcome> {
        let page = PageRequest::latest(self.page_size);
        let result = self
            .source
            .fetch_page(&ticket.conversation_id, &page)
            .await;

        let mut w = lock(&self.window);
        if !w.is_current(&ticket) {
            tracing::debug!("Discarding stale initial page for {}", ticket.conversation_id);
            return Ok(LoadOutcome::Stale);
        }
        let count = w.replace(result?);
        drop(w);

        self.emit(FeedEvent::Loaded {
            conversation_id: ticket.conversation_id,
            count,
        });
        Ok(LoadOutcome::Loaded(count))
    }

    /// Fetch messages newer than the forward cursor and append them.
    ///
    /// Failures are logged and swallowed: the next tick is an independent
    /// attempt.
    pub async fn poll_forward(&self) -> PollOutcome {
        let (ticket, cursor) = {
            let w = lock(&self.window);
            match w.ticket() {
                Some(t) => (t, w.cursor().map(String::from)),
                None => return PollOutcome::Idle,
            }
        };
        self.poll_with(ticket, cursor).await
    }

    /// Like [`MessageFeed::poll_forward`], but only while `conversation_id`
    /// is still the open conversation.
    pub async fn poll_forward_for(&self, conversation_id: &str) -> PollOutcome {
        let (ticket, cursor) = {
            let w = lock(&self.window);
            match w.ticket() {
                Some(t) if t.conversation_id == conversation_id => {
                    (t, w.cursor().map(String::from))
                }
                Some(_) => return PollOutcome::Stale,
                None => return PollOutcome::Idle,
            }
        };
        self.poll_with(ticket, cursor).await
    }

    async fn poll_with(&self, ticket: Ticket, cursor: Option<String>) -> PollOutcome {
        let page = PageRequest::after(self.page_size, cursor);
        let fetched = match self.source.fetch_page(&ticket.conversation_id, &page).await {
            Ok(msgs) => msgs,
            Err(e) => {
                tracing::warn!("Message poll for {} failed: {}", ticket.conversation_id, e);
                return PollOutcome::Failed;
            }
        };

        let mut w = lock(&self.window);
        if !w.is_current(&ticket) {
            return PollOutcome::Stale;
        }
        if fetched.is_empty() {
            return PollOutcome::Empty;
        }

        let new_messages = w.append(fetched);
        drop(w);
        if new_messages.is_empty() {
            return PollOutcome::Empty;
        }

        let added = new_messages.len();
        tracing::debug!("Appended {} message(s) to {}", added, ticket.conversation_id);
        self.emit(FeedEvent::Appended {
            conversation_id: ticket.conversation_id,
            messages: new_messages,
        });
        PollOutcome::Appended(added)
    }

    /// Fetch the page before the oldest held message and prepend it.
    ///
    /// An empty page marks the conversation exhausted. On failure the window
    /// is left untouched and the caller may retry.
    pub async fn load_older(&self) -> ApiResult<OlderOutcome> {
        let (ticket, oldest) = {
            let mut w = lock(&self.window);
            let Some(ticket) = w.ticket() else {
                return Ok(OlderOutcome::Skipped);
            };
            if w.is_empty() || w.is_exhausted() || w.is_loading_older() {
                return Ok(OlderOutcome::Skipped);
            }
            let Some(oldest) = w.oldest_id().map(String::from) else {
                return Ok(OlderOutcome::Skipped);
            };
            w.set_loading_older(true);
            (ticket, oldest)
        };

        let page = PageRequest::before(self.page_size, oldest);
        let result = self.source.fetch_page(&ticket.conversation_id, &page).await;

        let mut w = lock(&self.window);
        if !w.is_current(&ticket) {
            return Ok(OlderOutcome::Stale);
        }
        w.set_loading_older(false);
        let fetched = result?;

        if fetched.is_empty() {
            w.mark_exhausted();
            drop(w);
            tracing::debug!("No older messages in {}", ticket.conversation_id);
            self.emit(FeedEvent::Exhausted {
                conversation_id: ticket.conversation_id,
            });
            return Ok(OlderOutcome::Exhausted);
        }

        let added = w.prepend(fetched);
        drop(w);
        self.emit(FeedEvent::Prepended {
            conversation_id: ticket.conversation_id,
            count: added,
        });
        Ok(OlderOutcome::Prepended(added))
    }

    /// Forget the open conversation. In-flight responses are discarded.
    pub fn close(&self) {
        lock(&self.window).close();
    }

    /// Poll the open conversation every `every` until cancelled or until the
    /// feed moves to another conversation. Returns `None` when nothing is open.
    pub fn spawn_poller(self: &Arc<Self>, every: Duration) -> Option<PollTask> {
        let conversation_id = self.conversation_id()?;
        let feed = Arc::clone(self);
        let key = conversation_id.clone();
        Some(PollTask::spawn(conversation_id, every, move || {
            let feed = Arc::clone(&feed);
            let key = key.clone();
            async move {
                !matches!(
                    feed.poll_forward_for(&key).await,
                    PollOutcome::Stale | PollOutcome::Idle
                )
            }
        }))
    }
}
