//! Ordered message window for one conversation.
//!
//! Pure state, no I/O. The window keeps messages in non-decreasing
//! `send_time` order with unique ids, and the forward cursor always names the
//! newest message it holds.

use std::collections::HashSet;

use crate::models::Message;

/// Identifies the conversation a request was issued for.
///
/// A response may only be applied while its ticket is still current; any
/// switch bumps the generation and invalidates older tickets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub conversation_id: String,
    generation: u64,
}

#[derive(Debug, Default)]
pub struct MessageWindow {
    conversation_id: Option<String>,
    generation: u64,
    messages: Vec<Message>,
    ids: HashSet<String>,
    cursor: Option<String>,
    exhausted: bool,
    loading_older: bool,
}

/// Sort a page ascending by send time. The sort is stable, so messages with
/// equal timestamps keep the order the server returned them in.
fn sort_page(page: &mut [Message]) {
    page.sort_by(|a, b| a.send_time.cmp(&b.send_time));
}

impl MessageWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset every piece of per-conversation state in one step and return
    /// the ticket for the new conversation.
    pub fn switch(&mut self, conversation_id: &str) -> Ticket {
        self.generation += 1;
        self.conversation_id = Some(conversation_id.to_string());
        self.messages.clear();
        self.ids.clear();
        self.cursor = None;
        self.exhausted = false;
        self.loading_older = false;
        Ticket {
            conversation_id: conversation_id.to_string(),
            generation: self.generation,
        }
    }

    /// Drop the conversation entirely (view torn down).
    pub fn close(&mut self) {
        self.switch("");
        self.conversation_id = None;
    }

    pub fn ticket(&self) -> Option<Ticket> {
        self.conversation_id.as_ref().map(|id| Ticket {
            conversation_id: id.clone(),
            generation: self.generation,
        })
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.generation == ticket.generation
            && self.conversation_id.as_deref() == Some(ticket.conversation_id.as_str())
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Forward cursor: id of the newest message held.
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Backward cursor: id of the oldest message held.
    pub fn oldest_id(&self) -> Option<&str> {
        self.messages.first().map(|m| m.id.as_str())
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn mark_exhausted(&mut self) {
        self.exhausted = true;
    }

    pub fn is_loading_older(&self) -> bool {
        self.loading_older
    }

    pub fn set_loading_older(&mut self, loading: bool) {
        self.loading_older = loading;
    }

    /// Replace the window with an initial page.
    pub fn replace(&mut self, page: Vec<Message>) -> usize {
        self.messages.clear();
        self.ids.clear();
        self.append(page).len()
    }

    /// Append a forward page. Returns the messages that were not already
    /// held, oldest first. They may land before existing messages when the
    /// page carries an earlier timestamp.
    pub fn append(&mut self, page: Vec<Message>) -> Vec<Message> {
        let mut fresh = self.dedup(page);
        if fresh.is_empty() {
            return Vec::new();
        }
        sort_page(&mut fresh);
        let added = fresh.clone();

        let out_of_order = match (self.messages.last(), fresh.first()) {
            (Some(tail), Some(head)) => head.send_time < tail.send_time,
            _ => false,
        };
        self.messages.extend(fresh);
        if out_of_order {
            sort_page(&mut self.messages);
        }
        self.sync_cursor();
        added
    }

    /// Prepend an older page. Returns how many new messages were added.
    pub fn prepend(&mut self, page: Vec<Message>) -> usize {
        let mut fresh = self.dedup(page);
        if fresh.is_empty() {
            return 0;
        }
        sort_page(&mut fresh);

        let out_of_order = match (fresh.last(), self.messages.first()) {
            (Some(tail), Some(head)) => tail.send_time > head.send_time,
            _ => false,
        };
        let added = fresh.len();
        fresh.append(&mut self.messages);
        self.messages = fresh;
        if out_of_order {
            sort_page(&mut self.messages);
        }
        self.sync_cursor();
        added
    }

    /// Keep only messages not already held, recording their ids.
    fn dedup(&mut self, page: Vec<Message>) -> Vec<Message> {
        page.into_iter()
            .filter(|m| self.ids.insert(m.id.clone()))
            .collect()
    }

    fn sync_cursor(&mut self) {
        self.cursor = self.messages.last().map(|m| m.id.clone());
    }
}
