//! Data sources the feeds pull from
//!
//! `MinicordClient` implements every trait here; tests substitute in-memory
//! fakes.

use std::sync::Arc;

use async_trait::async_trait;

use crate::api;
use crate::api::client::MinicordClient;
use crate::api::error::ApiResult;
use crate::models::{Conversation, Friend, Member, Message, PageRequest, User};

/// Paged access to a conversation's messages.
#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn fetch_page(&self, conversation_id: &str, page: &PageRequest) -> ApiResult<Vec<Message>>;
}

/// User and membership lookups used to label messages and conversations.
#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn lookup_user(&self, user_id: &str) -> ApiResult<User>;
    async fn conversation_members(&self, conversation_id: &str) -> ApiResult<Vec<Member>>;
}

/// A list that is re-fetched whole on every poll.
#[async_trait]
pub trait SnapshotSource<T>: Send + Sync {
    async fn fetch_snapshot(&self) -> ApiResult<Vec<T>>;
}

/// Foreground actions on pending friend requests.
#[async_trait]
pub trait FriendActions: Send + Sync {
    async fn accept_request(&self, request_id: &str) -> ApiResult<()>;
    async fn reject_request(&self, request_id: &str) -> ApiResult<()>;
}

#[async_trait]
impl MessageSource for MinicordClient {
    async fn fetch_page(&self, conversation_id: &str, page: &PageRequest) -> ApiResult<Vec<Message>> {
        api::messages::list_messages_data(self, conversation_id, page).await
    }
}

#[async_trait]
impl UserLookup for MinicordClient {
    async fn lookup_user(&self, user_id: &str) -> ApiResult<User> {
        api::users::get_user_data(self, user_id).await
    }

    async fn conversation_members(&self, conversation_id: &str) -> ApiResult<Vec<Member>> {
        api::conversations::list_members_data(self, conversation_id).await
    }
}

/// The caller's pending friend requests.
pub struct PendingRequests(pub Arc<MinicordClient>);

#[async_trait]
impl SnapshotSource<Friend> for PendingRequests {
    async fn fetch_snapshot(&self) -> ApiResult<Vec<Friend>> {
        Ok(api::friends::get_friends_data(&self.0).await?.pending)
    }
}

#[async_trait]
impl FriendActions for PendingRequests {
    async fn accept_request(&self, request_id: &str) -> ApiResult<()> {
        api::friends::accept_request_data(&self.0, request_id).await
    }

    async fn reject_request(&self, request_id: &str) -> ApiResult<()> {
        api::friends::delete_relation_data(&self.0, request_id).await
    }
}

/// Every conversation the caller belongs to.
pub struct ConversationList(pub Arc<MinicordClient>);

#[async_trait]
impl SnapshotSource<Conversation> for ConversationList {
    async fn fetch_snapshot(&self) -> ApiResult<Vec<Conversation>> {
        api::conversations::list_conversations_data(&self.0).await
    }
}
