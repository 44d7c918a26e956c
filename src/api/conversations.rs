//! Conversation endpoints: list, detail, create, rename, membership

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use reqwest::Method;
use serde::Serialize;

use super::client::{segment, MinicordClient};
use super::error::ApiResult;
use super::{messages, users};
use crate::feed::MemberDirectory;
use crate::models::{Conversation, ConversationType, Member, Message, NewConversation, PageRequest};

/// `GET /conversations`
pub async fn list_conversations_data(client: &MinicordClient) -> ApiResult<Vec<Conversation>> {
    client.get_json("/conversations", &[]).await
}

/// `GET /conversations/{id}`
pub async fn get_conversation_data(client: &MinicordClient, id: &str) -> ApiResult<Conversation> {
    client
        .get_json(&format!("/conversations/{}", segment(id)), &[])
        .await
}

/// `POST /conversations`
pub async fn create_conversation_data(
    client: &MinicordClient,
    kind: ConversationType,
    members: &[String],
    title: Option<&str>,
) -> ApiResult<Conversation> {
    let body = NewConversation {
        kind,
        members,
        title,
    };
    client.send_json(Method::POST, "/conversations", &body).await
}

#[derive(Serialize)]
struct TitleUpdate<'a> {
    title: &'a str,
}

/// `PATCH /conversations/{id}`
pub async fn update_title_data(client: &MinicordClient, id: &str, title: &str) -> ApiResult<()> {
    client
        .send_json_ignore(
            Method::PATCH,
            &format!("/conversations/{}", segment(id)),
            &TitleUpdate { title },
        )
        .await
}

/// `GET /conversations/{id}/members`
pub async fn list_members_data(client: &MinicordClient, id: &str) -> ApiResult<Vec<Member>> {
    client
        .get_json(&format!("/conversations/{}/members", segment(id)), &[])
        .await
}

#[derive(Serialize)]
struct MemberRef<'a> {
    id: &'a str,
}

/// `POST /conversations/{id}/members`
pub async fn add_member_data(client: &MinicordClient, id: &str, user_id: &str) -> ApiResult<()> {
    client
        .send_json_ignore(
            Method::POST,
            &format!("/conversations/{}/members", segment(id)),
            &MemberRef { id: user_id },
        )
        .await
}

/// `DELETE /conversations/{id}/members/{memberId}`
pub async fn remove_member_data(client: &MinicordClient, id: &str, member_id: &str) -> ApiResult<()> {
    client
        .send_empty(
            Method::DELETE,
            &format!("/conversations/{}/members/{}", segment(id), segment(member_id)),
        )
        .await
}

/// Most recent message of a conversation, for list previews.
pub async fn last_message_data(client: &MinicordClient, id: &str) -> ApiResult<Option<Message>> {
    let msgs = messages::list_messages_data(client, id, &PageRequest::latest(1)).await?;
    Ok(msgs.into_iter().max_by(|a, b| a.send_time.cmp(&b.send_time)))
}

/// Whether a DM's member list is `self_id` plus exactly `user_id`.
fn is_dm_with(members: &[Member], self_id: &str, user_id: &str) -> bool {
    let mut others = members.iter().filter(|m| m.user_id != self_id);
    matches!(
        (others.next(), others.next()),
        (Some(m), None) if m.user_id == user_id
    )
}

/// The direct-message conversation between `self_id` and `user_id`, created
/// if none exists.
pub async fn find_or_create_dm_data(
    client: &MinicordClient,
    self_id: &str,
    user_id: &str,
) -> ApiResult<Conversation> {
    for conversation in list_conversations_data(client).await? {
        if conversation.kind != ConversationType::DirectMessage {
            continue;
        }
        let members = list_members_data(client, &conversation.id).await?;
        if is_dm_with(&members, self_id, user_id) {
            return Ok(conversation);
        }
    }
    tracing::info!("No DM with {} yet, creating one", user_id);
    create_conversation_data(client, ConversationType::DirectMessage, &[user_id.to_string()], None).await
}

/// Truncate a preview to `max` characters on a char boundary.
pub(crate) fn preview(text: &str, max: usize) -> String {
    let text = text.trim().replace('\n', " ");
    if text.chars().count() <= max {
        return text;
    }
    let cut: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", cut)
}

/// List conversations with titles and last-message previews (prints to stdout).
pub async fn list_conversations(limit: usize) -> Result<()> {
    let client = Arc::new(MinicordClient::new()?);
    let me = users::get_self_data(&client).await.context("Failed to fetch /users/self")?;
    let directory = MemberDirectory::new(Arc::clone(&client));
    directory.remember(&me);

    let conversations = list_conversations_data(&client)
        .await
        .context("Failed to fetch conversations")?;

    println!("\nConversations:");
    println!("{:-<60}", "");

    if conversations.is_empty() {
        println!("  (no conversations)");
        return Ok(());
    }

    for conversation in conversations.iter().take(limit) {
        let title = directory.display_title(conversation, &me.id).await;
        let kind = if conversation.is_group() { "group" } else { "dm" };
        println!("{} [{}]", title, kind);
        println!("  ID: {}", conversation.id);

        match last_message_data(&client, &conversation.id).await {
            Ok(Some(msg)) => {
                let author = directory.label_for(&msg.author_id).await;
                println!(
                    "  Last: {} [{}]: {}",
                    msg.send_time.format("%Y-%m-%d %H:%M"),
                    author,
                    preview(&msg.content, 60)
                );
            }
            Ok(None) => {}
            Err(e) => tracing::debug!("No preview for {}: {}", conversation.id, e),
        }
        println!();
    }

    Ok(())
}

/// Show a conversation and its members (prints to stdout).
pub async fn show_conversation(id: &str) -> Result<()> {
    let client = Arc::new(MinicordClient::new()?);
    let me = users::get_self_data(&client).await.context("Failed to fetch /users/self")?;
    let conversation = get_conversation_data(&client, id)
        .await
        .with_context(|| format!("Conversation {} not found", id))?;
    let directory = MemberDirectory::new(Arc::clone(&client));
    directory.remember(&me);

    println!();
    println!("Title: {}", directory.display_title(&conversation, &me.id).await);
    println!("Type:  {}", conversation.kind.as_str());
    println!("ID:    {}", conversation.id);
    print_members(&directory, id).await
}

async fn print_members(directory: &MemberDirectory<MinicordClient>, id: &str) -> Result<()> {
    let members = directory
        .members(id)
        .await
        .context("Failed to fetch members")?;
    println!("Members ({}):", members.len());
    for member in &members {
        let joined = member
            .join_time
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!(
            "  {:<20} {:<38} {}",
            directory.label_for(&member.user_id).await,
            member.user_id,
            joined
        );
    }
    Ok(())
}

/// List members of a conversation (prints to stdout).
pub async fn list_members(id: &str) -> Result<()> {
    let client = Arc::new(MinicordClient::new()?);
    let directory = MemberDirectory::new(Arc::clone(&client));
    print_members(&directory, id).await
}

/// Create a DM or group with the given usernames.
pub async fn create_conversation(group: bool, usernames: &[String], title: Option<&str>) -> Result<()> {
    let client = MinicordClient::new()?;
    let mut ids = Vec::with_capacity(usernames.len());
    for name in usernames {
        let user = users::get_user_by_username_data(&client, name)
            .await
            .with_context(|| format!("User '{}' not found", name))?;
        ids.push(user.id);
    }

    let kind = if group {
        ConversationType::Group
    } else {
        ConversationType::DirectMessage
    };
    let conversation = create_conversation_data(&client, kind, &ids, title)
        .await
        .context("Failed to create conversation")?;
    println!("Created {} {}", kind.as_str(), conversation.id);
    Ok(())
}

/// Rename a group conversation.
pub async fn rename_conversation(id: &str, title: &str) -> Result<()> {
    let client = MinicordClient::new()?;
    update_title_data(&client, id, title)
        .await
        .context("Failed to update title")?;
    println!("Title set to: {}", title);
    Ok(())
}

/// Add a user (by username) to a conversation.
pub async fn add_member(id: &str, username: &str) -> Result<()> {
    let client = MinicordClient::new()?;
    let user = users::get_user_by_username_data(&client, username)
        .await
        .with_context(|| format!("User '{}' not found", username))?;
    add_member_data(&client, id, &user.id)
        .await
        .context("Failed to add member")?;
    println!("Added {} to {}", user.username, id);
    Ok(())
}

/// Remove a user (by username) from a conversation.
pub async fn remove_member(id: &str, username: &str) -> Result<()> {
    let client = MinicordClient::new()?;
    let user = users::get_user_by_username_data(&client, username)
        .await
        .with_context(|| format!("User '{}' not found", username))?;
    remove_member_data(&client, id, &user.id)
        .await
        .context("Failed to remove member")?;
    println!("Removed {} from {}", user.username, id);
    Ok(())
}

/// Print the id of the DM with `username`, creating it if needed.
pub async fn open_dm(username: &str) -> Result<()> {
    let client = MinicordClient::new()?;
    let user = users::get_user_by_username_data(&client, username)
        .await
        .with_context(|| format!("User '{}' not found", username))?;
    let me = users::get_self_data(&client).await.context("Failed to fetch /users/self")?;
    if user.id == me.id {
        bail!("You cannot open a direct message with yourself");
    }
    let conversation = find_or_create_dm_data(&client, &me.id, &user.id)
        .await
        .context("Failed to open DM")?;
    println!("{}", conversation.id);
    Ok(())
}
