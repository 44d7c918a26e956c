//! Username and membership caches.
//!
//! One `MemberDirectory` is owned by whichever view needs labels; it is
//! never shared through a global.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::lock;
use super::source::UserLookup;
use crate::api::error::ApiResult;
use crate::models::{Conversation, ConversationType, Member, User};

/// Label shown when a user cannot be resolved.
pub const UNKNOWN_LABEL: &str = "Unknown";
const UNKNOWN_USER_TITLE: &str = "Unknown User";
const UNTITLED_GROUP: &str = "Untitled Group";

pub struct MemberDirectory<L> {
    lookup: Arc<L>,
    usernames: Mutex<HashMap<String, String>>,
    members: Mutex<HashMap<String, Vec<Member>>>,
}

impl<L: UserLookup> MemberDirectory<L> {
    pub fn new(lookup: Arc<L>) -> Self {
        Self {
            lookup,
            usernames: Mutex::new(HashMap::new()),
            members: Mutex::new(HashMap::new()),
        }
    }

    /// Record a user already fetched elsewhere.
    pub fn remember(&self, user: &User) {
        lock(&self.usernames).insert(user.id.clone(), user.username.clone());
    }

    pub fn cached_label(&self, user_id: &str) -> Option<String> {
        lock(&self.usernames).get(user_id).cloned()
    }

    /// Username for `user_id`, or [`UNKNOWN_LABEL`] when the lookup fails.
    ///
    /// Failures are not cached; the next call tries again.
    pub async fn label_for(&self, user_id: &str) -> String {
        if let Some(name) = self.cached_label(user_id) {
            return name;
        }
        match self.lookup.lookup_user(user_id).await {
            Ok(user) => {
                self.remember(&user);
                user.username
            }
            Err(e) => {
                tracing::debug!("Username lookup for {} failed: {}", user_id, e);
                UNKNOWN_LABEL.to_string()
            }
        }
    }

    /// Members of a conversation, fetched once and then served from cache.
    pub async fn members(&self, conversation_id: &str) -> ApiResult<Vec<Member>> {
        let cached = lock(&self.members).get(conversation_id).cloned();
        if let Some(cached) = cached {
            return Ok(cached);
        }
        let members = self.lookup.conversation_members(conversation_id).await?;
        lock(&self.members).insert(conversation_id.to_string(), members.clone());
        Ok(members)
    }

    /// Title to show for a conversation.
    ///
    /// Groups use their title; direct messages use the other member's
    /// username.
    pub async fn display_title(&self, conversation: &Conversation, self_id: &str) -> String {
        match conversation.kind {
            ConversationType::Group => conversation
                .title
                .clone()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| UNTITLED_GROUP.to_string()),
            ConversationType::DirectMessage => {
                let members = match conversation.members {
                    Some(ref m) if !m.is_empty() => m.clone(),
                    _ => match self.members(&conversation.id).await {
                        Ok(m) => m,
                        Err(e) => {
                            tracing::debug!("Members of {} unavailable: {}", conversation.id, e);
                            return UNKNOWN_USER_TITLE.to_string();
                        }
                    },
                };
                match members.iter().find(|m| m.user_id != self_id) {
                    Some(other) => self.label_for(&other.user_id).await,
                    None => UNKNOWN_USER_TITLE.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ApiError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeLookup {
        users: HashMap<String, String>,
        members: HashMap<String, Vec<Member>>,
        user_calls: AtomicUsize,
        member_calls: AtomicUsize,
    }

    impl FakeLookup {
        fn new() -> Self {
            let users = [("u1", "alice"), ("u2", "bob")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            let members = [
                ("dm", vec![member("dm", "u1"), member("dm", "u2")]),
                ("lonely", vec![member("lonely", "u1")]),
                ("ghost", vec![member("ghost", "u1"), member("ghost", "u9")]),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
            Self {
                users,
                members,
                user_calls: AtomicUsize::new(0),
                member_calls: AtomicUsize::new(0),
            }
        }
    }

    fn member(conversation_id: &str, user_id: &str) -> Member {
        Member {
            conversation_id: conversation_id.to_string(),
            user_id: user_id.to_string(),
            join_time: None,
        }
    }

    #[async_trait]
    impl UserLookup for FakeLookup {
        async fn lookup_user(&self, user_id: &str) -> ApiResult<User> {
            self.user_calls.fetch_add(1, Ordering::SeqCst);
            match self.users.get(user_id) {
                Some(name) => Ok(User {
                    id: user_id.to_string(),
                    username: name.clone(),
                    profile_picture: None,
                }),
                None => Err(ApiError::NotFound {
                    url: format!("/users/{}", user_id),
                }),
            }
        }

        async fn conversation_members(&self, conversation_id: &str) -> ApiResult<Vec<Member>> {
            self.member_calls.fetch_add(1, Ordering::SeqCst);
            self.members
                .get(conversation_id)
                .cloned()
                .ok_or_else(|| ApiError::NotFound {
                    url: format!("/conversations/{}/members", conversation_id),
                })
        }
    }

    fn conversation(id: &str, kind: ConversationType, title: Option<&str>) -> Conversation {
        Conversation {
            id: id.to_string(),
            kind,
            title: title.map(String::from),
            members: None,
        }
    }

    #[tokio::test]
    async fn test_label_is_cached() {
        let lookup = Arc::new(FakeLookup::new());
        let dir = MemberDirectory::new(Arc::clone(&lookup));
        assert_eq!(dir.label_for("u1").await, "alice");
        assert_eq!(dir.label_for("u1").await, "alice");
        assert_eq!(lookup.user_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_lookup_falls_back_and_retries() {
        let lookup = Arc::new(FakeLookup::new());
        let dir = MemberDirectory::new(Arc::clone(&lookup));
        assert_eq!(dir.label_for("nobody").await, UNKNOWN_LABEL);
        assert_eq!(dir.label_for("nobody").await, UNKNOWN_LABEL);
        assert_eq!(lookup.user_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_group_titles() {
        let dir = MemberDirectory::new(Arc::new(FakeLookup::new()));
        let named = conversation("g1", ConversationType::Group, Some("Rustaceans"));
        let unnamed = conversation("g2", ConversationType::Group, None);
        assert_eq!(dir.display_title(&named, "u1").await, "Rustaceans");
        assert_eq!(dir.display_title(&unnamed, "u1").await, "Untitled Group");
    }

    #[tokio::test]
    async fn test_dm_titles() {
        let lookup = Arc::new(FakeLookup::new());
        let dir = MemberDirectory::new(Arc::clone(&lookup));
        let dm = conversation("dm", ConversationType::DirectMessage, None);
        assert_eq!(dir.display_title(&dm, "u1").await, "bob");
        assert_eq!(dir.display_title(&dm, "u2").await, "alice");
        assert_eq!(lookup.member_calls.load(Ordering::SeqCst), 1);

        let lonely = conversation("lonely", ConversationType::DirectMessage, None);
        assert_eq!(dir.display_title(&lonely, "u1").await, "Unknown User");

        let ghost = conversation("ghost", ConversationType::DirectMessage, None);
        assert_eq!(dir.display_title(&ghost, "u1").await, UNKNOWN_LABEL);

        let missing = conversation("gone", ConversationType::DirectMessage, None);
        assert_eq!(dir.display_title(&missing, "u1").await, "Unknown User");
    }

    #[tokio::test]
    async fn test_members_are_cached() {
        let lookup = Arc::new(FakeLookup::new());
        let dir = MemberDirectory::new(Arc::clone(&lookup));
        dir.members("dm").await.unwrap();
        dir.members("dm").await.unwrap();
        assert_eq!(lookup.member_calls.load(Ordering::SeqCst), 1);
        assert!(dir.members("gone").await.is_err());
    }
}
