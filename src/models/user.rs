//! User and friend-relation models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

/// Friend relation between two users. No `accept_time` means the request is
/// still pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Friend {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    #[serde(default)]
    pub accept_time: Option<DateTime<Utc>>,
    /// Sender profile, embedded by the `/friends` endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<User>,
}

impl Friend {
    pub fn is_pending(&self) -> bool {
        self.accept_time.is_none()
    }

    /// The user on the other side of the relation from `self_id`.
    pub fn other_party(&self, self_id: &str) -> &str {
        if self.sender_id == self_id {
            &self.recipient_id
        } else {
            &self.sender_id
        }
    }

    pub fn sender_name(&self) -> &str {
        self.sender
            .as_ref()
            .map(|u| u.username.as_str())
            .unwrap_or("Unknown")
    }
}

/// Accepted friends and pending requests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FriendList {
    pub friends: Vec<Friend>,
    pub pending: Vec<Friend>,
}

/// Wire shape of `GET /friends`: either split lists or one flat array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FriendListWire {
    Split {
        #[serde(default)]
        friends: Vec<Friend>,
        #[serde(default)]
        pending: Vec<Friend>,
    },
    Flat(Vec<Friend>),
}

impl<'de> Deserialize<'de> for FriendList {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Ok(match FriendListWire::deserialize(d)? {
            FriendListWire::Split { friends, pending } => FriendList { friends, pending },
            FriendListWire::Flat(all) => {
                let (pending, friends) = all.into_iter().partition(Friend::is_pending);
                FriendList { friends, pending }
            }
        })
    }
}

/// Response of a successful login
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// Response of the username availability check
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UsernameAvailability {
    pub available: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_friend_list_split() {
        let json = r#"{
            "friends": [{"id":"f1","senderId":"a","recipientId":"b","acceptTime":"2024-01-01T00:00:00Z"}],
            "pending": [{"id":"f2","senderId":"c","recipientId":"b","sender":{"id":"c","username":"carol"}}]
        }"#;
        let list: FriendList = serde_json::from_str(json).unwrap();
        assert_eq!(list.friends.len(), 1);
        assert_eq!(list.pending.len(), 1);
        assert_eq!(list.pending[0].sender_name(), "carol");
    }

    #[test]
    fn test_friend_list_flat_is_partitioned() {
        let json = r#"[
            {"id":"f1","senderId":"a","recipientId":"b","acceptTime":"2024-01-01T00:00:00Z"},
            {"id":"f2","senderId":"c","recipientId":"b"}
        ]"#;
        let list: FriendList = serde_json::from_str(json).unwrap();
        assert_eq!(list.friends[0].id, "f1");
        assert_eq!(list.pending[0].id, "f2");
        assert_eq!(list.pending[0].sender_name(), "Unknown");
    }

    #[test]
    fn test_other_party() {
        let f = Friend {
            id: "f".into(),
            sender_id: "a".into(),
            recipient_id: "b".into(),
            accept_time: None,
            sender: None,
        };
        assert_eq!(f.other_party("a"), "b");
        assert_eq!(f.other_party("b"), "a");
    }
}
