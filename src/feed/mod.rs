//! Client-side feeds over the Minicord API
//!
//! The message feed keeps an ordered window of one conversation's messages,
//! extended forward by polling and backward by "load older". Snapshot feeds
//! re-fetch a whole list on every tick (pending friend requests, the
//! conversation list).

pub mod directory;
pub mod messages;
pub mod snapshot;
pub mod source;
mod task;
pub mod window;

pub use directory::MemberDirectory;
pub use messages::{FeedEvent, MessageFeed};
pub use snapshot::SnapshotFeed;
pub use source::{ConversationList, PendingRequests};
pub use task::PollTask;

use std::sync::{Mutex, MutexGuard};

/// Lock a mutex, recovering the data if another task panicked while holding it.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}
