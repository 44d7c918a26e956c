//! Message endpoints plus the live `watch` view

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Method;
use serde::Serialize;
use tokio::sync::mpsc;

use super::client::{segment, MinicordClient};
use super::error::ApiResult;
use crate::config::Config;
use crate::feed::{FeedEvent, MemberDirectory, MessageFeed};
use crate::models::{Message, MessagePage, PageRequest};

/// `GET /conversations/{id}/messages?limit&before&after`
pub async fn list_messages_data(
    client: &MinicordClient,
    conversation_id: &str,
    page: &PageRequest,
) -> ApiResult<Vec<Message>> {
    let resp: MessagePage = client
        .get_json(
            &format!("/conversations/{}/messages", segment(conversation_id)),
            &page.query(),
        )
        .await?;
    Ok(resp.into_messages())
}

/// `GET /conversations/{id}/messages/{messageId}`
pub async fn get_message_data(
    client: &MinicordClient,
    conversation_id: &str,
    message_id: &str,
) -> ApiResult<Message> {
    client
        .get_json(
            &format!(
                "/conversations/{}/messages/{}",
                segment(conversation_id),
                segment(message_id)
            ),
            &[],
        )
        .await
}

#[derive(Serialize)]
struct NewMessage<'a> {
    content: &'a str,
}

/// `POST /conversations/{id}/messages`
pub async fn send_message_data(
    client: &MinicordClient,
    conversation_id: &str,
    content: &str,
) -> ApiResult<()> {
    client
        .send_json_ignore(
            Method::POST,
            &format!("/conversations/{}/messages", segment(conversation_id)),
            &NewMessage { content },
        )
        .await
}

async fn print_message(directory: &MemberDirectory<MinicordClient>, msg: &Message) {
    let author = directory.label_for(&msg.author_id).await;
    println!(
        "[{}] {}: {}",
        msg.send_time.format("%Y-%m-%d %H:%M:%S"),
        author,
        msg.content
    );
}

/// Read one page of messages (prints to stdout, oldest first).
pub async fn read_messages(
    conversation_id: &str,
    limit: usize,
    before: Option<String>,
    after: Option<String>,
) -> Result<()> {
    let client = Arc::new(MinicordClient::new()?);
    let directory = MemberDirectory::new(Arc::clone(&client));
    let page = PageRequest {
        limit,
        before,
        after,
    };

    let mut msgs = list_messages_data(&client, conversation_id, &page)
        .await
        .context("Failed to fetch messages")?;
    msgs.sort_by(|a, b| a.send_time.cmp(&b.send_time));

    if msgs.is_empty() {
        println!("(no messages)");
        return Ok(());
    }

    for msg in &msgs {
        print_message(&directory, msg).await;
    }

    Ok(())
}

/// Show a single message.
pub async fn show_message(conversation_id: &str, message_id: &str) -> Result<()> {
    let client = Arc::new(MinicordClient::new()?);
    let directory = MemberDirectory::new(Arc::clone(&client));
    let msg = get_message_data(&client, conversation_id, message_id)
        .await
        .with_context(|| format!("Message {} not found", message_id))?;
    print_message(&directory, &msg).await;
    Ok(())
}

/// Send a message to a conversation.
pub async fn send_message(conversation_id: &str, content: &str) -> Result<()> {
    let client = MinicordClient::new()?;
    send_message_data(&client, conversation_id, content)
        .await
        .context("Send failed")?;
    println!("Message sent.");
    Ok(())
}

/// Print the latest page, then every new message as polling finds it,
/// until Ctrl-C.
pub async fn watch(conversation_id: &str) -> Result<()> {
    let config = Config::load()?;
    let client = Arc::new(MinicordClient::from_config(&config)?);
    let directory = MemberDirectory::new(Arc::clone(&client));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let feed = Arc::new(MessageFeed::new(Arc::clone(&client), config.poll.page_size).with_events(tx));

    feed.load_initial(conversation_id)
        .await
        .context("Failed to load messages")?;
    for msg in feed.messages() {
        print_message(&directory, &msg).await;
    }

    let poller = feed
        .spawn_poller(config.poll.message_interval())
        .context("No conversation open")?;
    println!("Watching {}... (Ctrl-C to stop)", poller.key());

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(FeedEvent::Appended { messages, .. }) => {
                    for msg in &messages {
                        print_message(&directory, msg).await;
                    }
                }
                Some(_) => {}
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Stopping watch at {}", feed.cursor().unwrap_or_default());
                break;
            }
        }
    }

    poller.cancel();
    feed.close();
    Ok(())
}
