//! Message-related models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub author_id: String,
    pub conversation_id: String,
    pub content: String,
    #[serde(alias = "createdAt", alias = "timestamp")]
    pub send_time: DateTime<Utc>,
}

/// Page of messages as returned by `GET /conversations/{id}/messages`.
///
/// The current API wraps the list in `{ "messages": [...] }`; older
/// deployments return the bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MessagePage {
    Wrapped { messages: Vec<Message> },
    Bare(Vec<Message>),
}

impl MessagePage {
    pub fn into_messages(self) -> Vec<Message> {
        match self {
            MessagePage::Wrapped { messages } => messages,
            MessagePage::Bare(messages) => messages,
        }
    }
}

/// Cursor parameters for a message page request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: usize,
    /// Only messages strictly older than this message id
    pub before: Option<String>,
    /// Only messages strictly newer than this message id
    pub after: Option<String>,
}

impl PageRequest {
    pub fn latest(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn before(limit: usize, id: impl Into<String>) -> Self {
        Self {
            limit,
            before: Some(id.into()),
            after: None,
        }
    }

    pub fn after(limit: usize, id: Option<String>) -> Self {
        Self {
            limit,
            before: None,
            after: id,
        }
    }

    /// Query pairs in the order the API documents them.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("limit", self.limit.to_string())];
        if let Some(ref before) = self.before {
            pairs.push(("before", before.clone()));
        }
        if let Some(ref after) = self.after {
            pairs.push(("after", after.clone()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_decodes_wrapped_and_bare() {
        let wrapped = r#"{"messages":[{"id":"m1","authorId":"u1","conversationId":"c1","content":"hi","sendTime":"2024-05-01T10:00:00Z"}]}"#;
        let bare = r#"[{"id":"m2","authorId":"u1","conversationId":"c1","content":"yo","createdAt":"2024-05-01T10:01:00Z"}]"#;

        let page: MessagePage = serde_json::from_str(wrapped).unwrap();
        assert_eq!(page.into_messages()[0].id, "m1");

        let page: MessagePage = serde_json::from_str(bare).unwrap();
        let msgs = page.into_messages();
        assert_eq!(msgs[0].id, "m2");
        assert_eq!(msgs[0].send_time.to_rfc3339(), "2024-05-01T10:01:00+00:00");
    }

    #[test]
    fn test_page_request_query() {
        assert_eq!(
            PageRequest::latest(10).query(),
            vec![("limit", "10".to_string())]
        );
        assert_eq!(
            PageRequest::before(5, "m5").query(),
            vec![("limit", "5".to_string()), ("before", "m5".to_string())]
        );
        assert_eq!(PageRequest::after(10, None).query().len(), 1);
    }
}
