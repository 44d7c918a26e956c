//! Friend endpoints: list, request, accept, reject/unfriend

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use reqwest::Method;
use serde::Serialize;

use super::client::{segment, MinicordClient};
use super::error::ApiResult;
use super::users;
use crate::config::Config;
use crate::feed::{MemberDirectory, PendingRequests, SnapshotFeed};
use crate::models::{Friend, FriendList};

/// `GET /friends`
pub async fn get_friends_data(client: &MinicordClient) -> ApiResult<FriendList> {
    client.get_json("/friends", &[]).await
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FriendRequest<'a> {
    recipient_id: &'a str,
}

/// `POST /friends`
pub async fn send_request_data(client: &MinicordClient, recipient_id: &str) -> ApiResult<()> {
    client
        .send_json_ignore(Method::POST, "/friends", &FriendRequest { recipient_id })
        .await
}

/// `POST /friends/{id}/accept`
pub async fn accept_request_data(client: &MinicordClient, request_id: &str) -> ApiResult<()> {
    client
        .send_empty(Method::POST, &format!("/friends/{}/accept", segment(request_id)))
        .await
}

/// `DELETE /friends/{id}`: rejects a pending request or ends a friendship.
pub async fn delete_relation_data(client: &MinicordClient, relation_id: &str) -> ApiResult<()> {
    client
        .send_empty(Method::DELETE, &format!("/friends/{}", segment(relation_id)))
        .await
}

/// Whether `user_id` is an accepted friend.
pub async fn is_friend_data(client: &MinicordClient, self_id: &str, user_id: &str) -> ApiResult<bool> {
    let list = get_friends_data(client).await?;
    Ok(list.friends.iter().any(|f| f.other_party(self_id) == user_id))
}

async fn relation_label(
    directory: &MemberDirectory<MinicordClient>,
    relation: &Friend,
    self_id: &str,
) -> String {
    match relation.sender {
        Some(ref sender) if sender.id != self_id => sender.username.clone(),
        _ => directory.label_for(relation.other_party(self_id)).await,
    }
}

/// List friends and pending requests (prints to stdout).
pub async fn list_friends() -> Result<()> {
    let client = Arc::new(MinicordClient::new()?);
    let me = users::get_self_data(&client).await.context("Failed to fetch /users/self")?;
    let directory = MemberDirectory::new(Arc::clone(&client));
    let list = get_friends_data(&client).await.context("Failed to fetch friends")?;

    println!("\nFriend Requests:");
    if list.pending.is_empty() {
        println!("  No pending friend requests");
    }
    for req in &list.pending {
        let name = relation_label(&directory, req, &me.id).await;
        let direction = if req.sender_id == me.id { "outgoing" } else { "incoming" };
        println!("  {:<20} {} ({})", name, req.id, direction);
    }

    println!("\nYour Friends:");
    if list.friends.is_empty() {
        println!("  You have no friends yet");
    }
    for fr in &list.friends {
        let name = relation_label(&directory, fr, &me.id).await;
        println!("  {:<20} {}", name, fr.id);
    }

    Ok(())
}

/// Send a friend request to `username`.
pub async fn add_friend(username: &str) -> Result<()> {
    let client = MinicordClient::new()?;
    let user = users::get_user_by_username_data(&client, username)
        .await
        .with_context(|| format!("User '{}' not found", username))?;
    let me = users::get_self_data(&client).await.context("Failed to fetch /users/self")?;
    if user.id == me.id {
        bail!("You cannot send a friend request to yourself");
    }
    if is_friend_data(&client, &me.id, &user.id).await? {
        println!("You are already friends with {}.", username);
        return Ok(());
    }
    send_request_data(&client, &user.id)
        .await
        .context("Failed to send friend request")?;
    println!("Friend request sent to {}!", username);
    Ok(())
}

/// Accept a pending request by relation id.
pub async fn accept_request(request_id: &str) -> Result<()> {
    let client = MinicordClient::new()?;
    accept_request_data(&client, request_id)
        .await
        .context("Failed to accept friend request")?;
    println!("Friend request accepted.");
    Ok(())
}

/// Reject a pending request, or unfriend, by relation id.
pub async fn delete_relation(relation_id: &str, verb: &str) -> Result<()> {
    let client = MinicordClient::new()?;
    delete_relation_data(&client, relation_id)
        .await
        .with_context(|| format!("Failed to {}", verb))?;
    println!("Done: {} {}", verb, relation_id);
    Ok(())
}

/// Print pending requests; with `watch`, keep polling and reprint on change.
pub async fn list_requests(watch: bool) -> Result<()> {
    let config = Config::load()?;
    let client = Arc::new(MinicordClient::from_config(&config)?);
    let feed = SnapshotFeed::new("friend requests", Arc::new(PendingRequests(Arc::clone(&client))));

    feed.refresh().await;
    let mut shown = feed.items();
    print_pending(&shown);
    if !watch {
        return Ok(());
    }

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let feed = Arc::new(feed.with_events(tx));
    let poller = feed.spawn_poller(config.poll.friend_request_interval());
    println!("Watching friend requests... (Ctrl-C to stop)");

    loop {
        tokio::select! {
            pending = rx.recv() => match pending {
                Some(pending) => {
                    if pending != shown {
                        print_pending(&pending);
                        shown = pending;
                    }
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    poller.cancel();
    Ok(())
}

fn print_pending(pending: &[Friend]) {
    println!("\nPending friend requests ({}):", pending.len());
    if pending.is_empty() {
        println!("  No pending friend requests");
    }
    for req in pending {
        println!("  {:<20} wants to be your friend  [{}]", req.sender_name(), req.id);
    }
}
