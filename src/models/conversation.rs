//! Conversation-related models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Conversation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationType {
    DirectMessage,
    Group,
}

impl ConversationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationType::DirectMessage => "DIRECT_MESSAGE",
            ConversationType::Group => "GROUP",
        }
    }
}

/// Conversation entity: a DM or group messaging thread
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ConversationType,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub members: Option<Vec<Member>>,
}

impl Conversation {
    pub fn is_group(&self) -> bool {
        self.kind == ConversationType::Group
    }
}

/// Membership record joining a user to a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub conversation_id: String,
    pub user_id: String,
    #[serde(default)]
    pub join_time: Option<DateTime<Utc>>,
}

/// Body of `POST /conversations`
#[derive(Debug, Serialize)]
pub struct NewConversation<'a> {
    #[serde(rename = "type")]
    pub kind: ConversationType,
    pub members: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
}
