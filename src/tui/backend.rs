//! Async backend: owns the API client and the feeds.
//!
//! Uses an mpsc channel pair. The TUI sends `BackendCommand` values; the
//! backend loop executes them and forwards feed changes as
//! `BackendResponse` values.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use super::messages::MessageLine;
use super::sidebar::ConversationEntry;
use crate::api;
use crate::api::client::MinicordClient;
use crate::auth::TokenStore;
use crate::config::Config;
use crate::feed::{
    ConversationList, FeedEvent, MemberDirectory, MessageFeed, PendingRequests, PollTask,
    SnapshotFeed,
};
use crate::models::{Conversation, Friend, User};

type Directory = MemberDirectory<MinicordClient>;
type Feed = MessageFeed<MinicordClient>;

/// Commands sent from the TUI event loop to the async backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCommand {
    OpenConversation { conversation_id: String },
    LoadOlder,
    SendMessage { conversation_id: String, content: String },
    AcceptRequest { request_id: String },
    RejectRequest { request_id: String },
}

/// Responses from the async backend to the TUI.
pub enum BackendResponse {
    /// The client is authenticated as `user`.
    Ready { user: User },
    Conversations(Vec<ConversationEntry>),
    Window {
        conversation_id: String,
        messages: Vec<MessageLine>,
        exhausted: bool,
        loading_older: bool,
    },
    Requests(Vec<Friend>),
    MessageSent(Result<()>),
    RequestHandled {
        accepted: bool,
        result: Result<()>,
    },
    /// Loading a page failed; the window is unchanged.
    LoadFailed(String),
    /// Initial client creation failed (auth issue).
    ClientError(String),
}

/// Handle for interacting with the backend from the TUI side.
pub struct Backend {
    cmd_tx: mpsc::UnboundedSender<BackendCommand>,
    resp_rx: mpsc::UnboundedReceiver<BackendResponse>,
}

impl Backend {
    /// Spawn the backend loop.
    pub fn start() -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (resp_tx, resp_rx) = mpsc::unbounded_channel();

        tokio::spawn(backend_loop(cmd_rx, resp_tx));

        Self { cmd_tx, resp_rx }
    }

    /// Send a command to the backend (non-blocking).
    pub fn send(&self, cmd: BackendCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            tracing::error!("Backend channel closed -- command dropped");
        }
    }

    /// Next response, or `None` once the backend has stopped.
    pub async fn recv(&mut self) -> Option<BackendResponse> {
        self.resp_rx.recv().await
    }
}

/// Load the config, build the client and find out who we are.
async fn connect() -> Result<(Config, Arc<MinicordClient>, User)> {
    let config = Config::load()?;
    let client = Arc::new(MinicordClient::from_config(&config)?);
    let user = match config.get_user() {
        Some(user) => user,
        None => api::users::get_self_data(&client)
            .await
            .context("Failed to fetch current user")?,
    };
    Ok((config, client, user))
}

async fn backend_loop(
    mut cmd_rx: mpsc::UnboundedReceiver<BackendCommand>,
    resp_tx: mpsc::UnboundedSender<BackendResponse>,
) {
    let (config, client, user) = match connect().await {
        Ok(c) => c,
        Err(e) => {
            let _ = resp_tx.send(BackendResponse::ClientError(format!("{:#}", e)));
            return;
        }
    };
    let _ = resp_tx.send(BackendResponse::Ready { user: user.clone() });

    let directory = Arc::new(MemberDirectory::new(Arc::clone(&client)));
    directory.remember(&user);

    let (feed_tx, mut feed_rx) = mpsc::unbounded_channel();
    let feed = Arc::new(MessageFeed::new(Arc::clone(&client), config.poll.page_size).with_events(feed_tx));

    let (conv_tx, conv_rx) = mpsc::unbounded_channel();
    let conversations = Arc::new(
        SnapshotFeed::new("conversations", Arc::new(ConversationList(Arc::clone(&client))))
            .with_events(conv_tx),
    );

    let (req_tx, mut req_rx) = mpsc::unbounded_channel();
    let requests = Arc::new(
        SnapshotFeed::new("friend requests", Arc::new(PendingRequests(Arc::clone(&client))))
            .with_events(req_tx),
    );

    // Titles and author labels may need lookups; resolve them off the
    // command loop, one update at a time so they arrive in order.
    tokio::spawn(title_loop(
        conv_rx,
        Arc::clone(&directory),
        user.id.clone(),
        resp_tx.clone(),
    ));
    let (window_tx, window_rx) = mpsc::unbounded_channel();
    tokio::spawn(window_loop(
        window_rx,
        Arc::clone(&feed),
        Arc::clone(&directory),
        user.id.clone(),
        resp_tx.clone(),
    ));

    // First snapshots right away; the pollers take over one period later.
    {
        let conversations = Arc::clone(&conversations);
        let requests = Arc::clone(&requests);
        tokio::spawn(async move {
            tokio::join!(conversations.refresh(), requests.refresh());
        });
    }
    let _conversation_poller = conversations.spawn_poller(config.poll.conversation_interval());
    let _request_poller = requests.spawn_poller(config.poll.friend_request_interval());
    let mut message_poller: Option<PollTask> = None;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else { break };
                if let BackendCommand::OpenConversation { .. } = cmd {
                    // The new conversation gets its own poller once loaded.
                    message_poller = None;
                }
                tokio::spawn(execute(
                    cmd,
                    Arc::clone(&client),
                    Arc::clone(&feed),
                    Arc::clone(&requests),
                    resp_tx.clone(),
                ));
            }
            Some(event) = feed_rx.recv() => {
                if let FeedEvent::Loaded { ref conversation_id, .. } = event {
                    let polling = message_poller
                        .as_ref()
                        .filter(|p| !p.is_finished())
                        .map(|p| p.key());
                    if polling != Some(conversation_id.as_str()) {
                        message_poller = feed.spawn_poller(config.poll.message_interval());
                    }
                }
                let _ = window_tx.send(());
            }
            Some(pending) = req_rx.recv() => {
                let _ = resp_tx.send(BackendResponse::Requests(pending));
            }
        }
    }

    feed.close();
    tracing::debug!("Backend loop stopped");
}

async fn execute(
    cmd: BackendCommand,
    client: Arc<MinicordClient>,
    feed: Arc<Feed>,
    requests: Arc<SnapshotFeed<Friend, PendingRequests>>,
    resp_tx: mpsc::UnboundedSender<BackendResponse>,
) {
    match cmd {
        BackendCommand::OpenConversation { conversation_id } => {
            if let Err(e) = feed.switch(&conversation_id).await {
                let _ = resp_tx.send(BackendResponse::LoadFailed(format!(
                    "Failed to load messages: {}",
                    e
                )));
            }
        }
        BackendCommand::LoadOlder => {
            if let Err(e) = feed.load_older().await {
                let _ = resp_tx.send(BackendResponse::LoadFailed(format!(
                    "Failed to load older messages: {}",
                    e
                )));
            }
        }
        BackendCommand::SendMessage {
            conversation_id,
            content,
        } => {
            let result = api::messages::send_message_data(&client, &conversation_id, &content)
                .await
                .map_err(anyhow::Error::from);
            let sent = result.is_ok();
            let _ = resp_tx.send(BackendResponse::MessageSent(result));
            if sent {
                // Show our own message without waiting for the next tick.
                feed.poll_forward().await;
            }
        }
        BackendCommand::AcceptRequest { request_id } => {
            let result = requests.accept(&request_id).await.map_err(anyhow::Error::from);
            let _ = resp_tx.send(BackendResponse::RequestHandled {
                accepted: true,
                result,
            });
        }
        BackendCommand::RejectRequest { request_id } => {
            let result = requests.reject(&request_id).await.map_err(anyhow::Error::from);
            let _ = resp_tx.send(BackendResponse::RequestHandled {
                accepted: false,
                result,
            });
        }
    }
}

/// Resolve display titles for each conversation list snapshot.
async fn title_loop(
    mut rx: mpsc::UnboundedReceiver<Vec<Conversation>>,
    directory: Arc<Directory>,
    self_id: String,
    resp_tx: mpsc::UnboundedSender<BackendResponse>,
) {
    while let Some(mut list) = rx.recv().await {
        // Only the newest snapshot matters.
        while let Ok(newer) = rx.try_recv() {
            list = newer;
        }
        let mut entries = Vec::with_capacity(list.len());
        for conversation in &list {
            entries.push(ConversationEntry {
                id: conversation.id.clone(),
                title: directory.display_title(conversation, &self_id).await,
                is_group: conversation.is_group(),
            });
        }
        if resp_tx.send(BackendResponse::Conversations(entries)).is_err() {
            break;
        }
    }
}

/// Publish the message window after each feed change.
async fn window_loop(
    mut rx: mpsc::UnboundedReceiver<()>,
    feed: Arc<Feed>,
    directory: Arc<Directory>,
    self_id: String,
    resp_tx: mpsc::UnboundedSender<BackendResponse>,
) {
    while rx.recv().await.is_some() {
        while rx.try_recv().is_ok() {}
        let Some(snapshot) = feed.snapshot() else {
            continue;
        };
        let mut messages = Vec::with_capacity(snapshot.messages.len());
        for message in snapshot.messages {
            let author = directory.label_for(&message.author_id).await;
            messages.push(MessageLine::new(message, author, &self_id));
        }
        let window = BackendResponse::Window {
            conversation_id: snapshot.conversation_id,
            messages,
            exhausted: snapshot.exhausted,
            loading_older: snapshot.loading_older,
        };
        if resp_tx.send(window).is_err() {
            break;
        }
    }
}
