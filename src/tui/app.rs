//! TUI application state and main event loop

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::DefaultTerminal;

use super::backend::{Backend, BackendCommand, BackendResponse};
use super::compose::ComposeState;
use super::log_capture::LogBuffer;
use super::messages::MessagesState;
use super::requests::RequestsState;
use super::sidebar::SidebarState;
use super::ui;

/// How often captured log lines are pulled into the status bar.
const LOG_DRAIN_INTERVAL_MS: u64 = 250;

/// Active pane in the TUI
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    #[default]
    Sidebar,
    Messages,
    Compose,
}

impl Pane {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pane::Sidebar => "sidebar",
            Pane::Messages => "messages",
            Pane::Compose => "compose",
        }
    }

    fn next(self) -> Self {
        match self {
            Pane::Sidebar => Pane::Messages,
            Pane::Messages => Pane::Compose,
            Pane::Compose => Pane::Sidebar,
        }
    }

    fn previous(self) -> Self {
        match self {
            Pane::Sidebar => Pane::Compose,
            Pane::Messages => Pane::Sidebar,
            Pane::Compose => Pane::Messages,
        }
    }
}

/// Application state
pub struct App {
    pub should_exit: bool,
    /// The backend is authenticated and running.
    pub is_online: bool,
    pub user_name: String,
    pub connection_state: String,
    pub active_pane: Pane,
    pub sidebar: SidebarState,
    pub messages: MessagesState,
    pub compose: ComposeState,
    pub requests: RequestsState,
    /// Transient message shown in the status bar.
    pub status_message: Option<String>,
    pub status_is_error: bool,
    /// Most recent captured log line.
    pub last_log: Option<String>,
}

impl Default for App {
    fn default() -> Self {
        Self {
            should_exit: false,
            is_online: false,
            user_name: String::new(),
            connection_state: "Connecting".to_string(),
            active_pane: Pane::default(),
            sidebar: SidebarState::default(),
            messages: MessagesState::default(),
            compose: ComposeState::default(),
            requests: RequestsState::default(),
            status_message: None,
            status_is_error: false,
            last_log: None,
        }
    }
}

impl App {
    fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_is_error = false;
    }

    fn set_error(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_is_error = true;
    }

    /// Handle a key press. Returns a command for the backend, if any.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<BackendCommand> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && key.code == KeyCode::Char('c') {
            self.should_exit = true;
            return None;
        }

        // Any key dismisses the previous status message.
        self.status_message = None;

        if self.requests.visible {
            return self.handle_requests_key(key);
        }
        if ctrl && key.code == KeyCode::Char('r') {
            self.requests.toggle();
            return None;
        }

        match key.code {
            KeyCode::Tab => {
                self.active_pane = self.active_pane.next();
                return None;
            }
            KeyCode::BackTab => {
                self.active_pane = self.active_pane.previous();
                return None;
            }
            _ => {}
        }

        match self.active_pane {
            Pane::Sidebar => self.handle_sidebar_key(key),
            Pane::Messages => self.handle_messages_key(key),
            Pane::Compose => self.handle_compose_key(key),
        }
    }

    fn handle_sidebar_key(&mut self, key: KeyEvent) -> Option<BackendCommand> {
        match key.code {
            KeyCode::Char('q') => self.should_exit = true,
            KeyCode::Char('f') => self.requests.toggle(),
            KeyCode::Up | KeyCode::Char('k') => self.sidebar.move_up(),
            KeyCode::Down | KeyCode::Char('j') => self.sidebar.move_down(),
            KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => return self.open_selected(),
            _ => {}
        }
        None
    }

    fn open_selected(&mut self) -> Option<BackendCommand> {
        let entry = self.sidebar.selected_entry()?.clone();
        self.active_pane = Pane::Messages;
        if self.sidebar.open_id.as_deref() == Some(entry.id.as_str()) {
            return None;
        }
        self.sidebar.open_id = Some(entry.id.clone());
        self.messages.open(&entry.id, &entry.title);
        Some(BackendCommand::OpenConversation {
            conversation_id: entry.id,
        })
    }

    fn handle_messages_key(&mut self, key: KeyEvent) -> Option<BackendCommand> {
        match key.code {
            KeyCode::Char('q') => self.should_exit = true,
            KeyCode::Char('f') => self.requests.toggle(),
            KeyCode::Up | KeyCode::Char('k') => {
                self.messages.select_previous();
                if self.messages.wants_older() {
                    self.messages.loading_older = true;
                    return Some(BackendCommand::LoadOlder);
                }
            }
            KeyCode::Down | KeyCode::Char('j') => self.messages.select_next(),
            KeyCode::End | KeyCode::Char('G') => self.messages.select_last(),
            KeyCode::Esc | KeyCode::Left | KeyCode::Char('h') => self.active_pane = Pane::Sidebar,
            KeyCode::Enter | KeyCode::Char('i') => self.active_pane = Pane::Compose,
            _ => {}
        }
        None
    }

    fn handle_compose_key(&mut self, key: KeyEvent) -> Option<BackendCommand> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => self.active_pane = Pane::Messages,
            KeyCode::Enter => return self.submit(),
            KeyCode::Char('u') if ctrl => self.compose.clear(),
            KeyCode::Char(c) if !ctrl => self.compose.insert_char(c),
            KeyCode::Backspace => self.compose.backspace(),
            KeyCode::Delete => self.compose.delete(),
            KeyCode::Left => self.compose.move_left(),
            KeyCode::Right => self.compose.move_right(),
            KeyCode::Home => self.compose.move_home(),
            KeyCode::End => self.compose.move_end(),
            _ => {}
        }
        None
    }

    fn submit(&mut self) -> Option<BackendCommand> {
        let Some(conversation_id) = self.messages.conversation_id.clone() else {
            self.set_error("Open a conversation first");
            return None;
        };
        let content = self.compose.take()?;
        Some(BackendCommand::SendMessage {
            conversation_id,
            content,
        })
    }

    fn handle_requests_key(&mut self, key: KeyEvent) -> Option<BackendCommand> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('f') => self.requests.visible = false,
            KeyCode::Char('r') if ctrl => self.requests.visible = false,
            KeyCode::Up | KeyCode::Char('k') => self.requests.move_up(),
            KeyCode::Down | KeyCode::Char('j') => self.requests.move_down(),
            KeyCode::Char('a') => {
                let request_id = self.requests.selected_id()?.to_string();
                self.set_status("Accepting request...");
                return Some(BackendCommand::AcceptRequest { request_id });
            }
            KeyCode::Char('r') => {
                let request_id = self.requests.selected_id()?.to_string();
                self.set_status("Rejecting request...");
                return Some(BackendCommand::RejectRequest { request_id });
            }
            _ => {}
        }
        None
    }

    /// Apply a backend response to the view state.
    pub fn apply(&mut self, resp: BackendResponse) {
        match resp {
            BackendResponse::Ready { user } => {
                self.user_name = user.username;
                self.is_online = true;
                self.connection_state = "Connected".to_string();
            }
            BackendResponse::Conversations(entries) => {
                self.sidebar.update(entries);
                if let Some(title) = self.sidebar.open_title() {
                    if title != self.messages.header {
                        self.messages.header = title.to_string();
                    }
                }
            }
            BackendResponse::Window {
                conversation_id,
                messages,
                exhausted,
                loading_older,
            } => {
                self.messages
                    .apply(&conversation_id, messages, exhausted, loading_older);
            }
            BackendResponse::Requests(pending) => self.requests.update(pending),
            BackendResponse::MessageSent(Ok(())) => {}
            BackendResponse::MessageSent(Err(e)) => self.set_error(format!("Send failed: {:#}", e)),
            BackendResponse::RequestHandled { accepted, result } => match result {
                Ok(()) if accepted => self.set_status("Friend request accepted"),
                Ok(()) => self.set_status("Friend request rejected"),
                Err(e) => self.set_error(format!("Request failed: {:#}", e)),
            },
            BackendResponse::LoadFailed(msg) => {
                self.messages.loading = false;
                self.messages.loading_older = false;
                self.set_error(msg);
            }
            BackendResponse::ClientError(msg) => {
                self.is_online = false;
                self.connection_state = "Offline".to_string();
                self.sidebar.loading = false;
                self.set_error(msg);
            }
        }
    }

    /// Keep the newest captured log line for the status bar.
    pub fn absorb_logs(&mut self, lines: Vec<String>) {
        if let Some(last) = lines.into_iter().rev().find(|l| !l.trim().is_empty()) {
            self.last_log = Some(last);
        }
    }
}

/// Run the TUI, restoring the terminal however the loop ends.
pub async fn run(logs: LogBuffer) -> Result<()> {
    let mut terminal = ratatui::init();
    let result = run_app(&mut terminal, logs).await;
    ratatui::restore();
    result
}

async fn run_app(terminal: &mut DefaultTerminal, logs: LogBuffer) -> Result<()> {
    let mut app = App::default();
    let mut backend = Backend::start();
    let mut backend_alive = true;
    let mut events = EventStream::new();
    let mut log_tick = tokio::time::interval(Duration::from_millis(LOG_DRAIN_INTERVAL_MS));

    while !app.should_exit {
        terminal.draw(|frame| ui::render(frame, &app))?;

        tokio::select! {
            maybe_event = events.next() => match maybe_event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    if let Some(cmd) = app.handle_key(key) {
                        backend.send(cmd);
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
            resp = backend.recv(), if backend_alive => match resp {
                Some(resp) => app.apply(resp),
                None => backend_alive = false,
            },
            _ = log_tick.tick() => app.absorb_logs(logs.drain()),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use crate::tui::messages::MessageLine;
    use crate::tui::sidebar::ConversationEntry;
    use chrono::{TimeZone, Utc};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn entry(id: &str, title: &str) -> ConversationEntry {
        ConversationEntry {
            id: id.to_string(),
            title: title.to_string(),
            is_group: false,
        }
    }

    fn line(id: &str) -> MessageLine {
        MessageLine {
            id: id.to_string(),
            author: "bob".to_string(),
            content: "hi".to_string(),
            sent_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            own: false,
        }
    }

    fn app_with_open_conversation() -> App {
        let mut app = App::default();
        app.apply(BackendResponse::Conversations(vec![entry("c1", "bob")]));
        assert_eq!(
            app.handle_key(press(KeyCode::Enter)),
            Some(BackendCommand::OpenConversation {
                conversation_id: "c1".into()
            })
        );
        app
    }

    #[test]
    fn test_ready_sets_user() {
        let mut app = App::default();
        app.apply(BackendResponse::Ready {
            user: User {
                id: "u1".into(),
                username: "alice".into(),
                profile_picture: None,
            },
        });
        assert_eq!(app.user_name, "alice");
        assert!(app.is_online);
    }

    #[test]
    fn test_open_conversation_focuses_messages() {
        let mut app = app_with_open_conversation();
        assert_eq!(app.active_pane, Pane::Messages);
        assert_eq!(app.messages.header, "bob");
        assert!(app.messages.loading);

        // Reopening the open conversation does not reload it.
        app.active_pane = Pane::Sidebar;
        assert_eq!(app.handle_key(press(KeyCode::Enter)), None);
    }

    #[test]
    fn test_selecting_oldest_message_loads_older_once() {
        let mut app = app_with_open_conversation();
        app.apply(BackendResponse::Window {
            conversation_id: "c1".into(),
            messages: vec![line("m1"), line("m2")],
            exhausted: false,
            loading_older: false,
        });

        assert_eq!(app.handle_key(press(KeyCode::Up)), Some(BackendCommand::LoadOlder));
        assert_eq!(app.handle_key(press(KeyCode::Up)), None);
    }

    #[test]
    fn test_exhausted_conversation_does_not_load_older() {
        let mut app = app_with_open_conversation();
        app.apply(BackendResponse::Window {
            conversation_id: "c1".into(),
            messages: vec![line("m1")],
            exhausted: true,
            loading_older: false,
        });
        assert_eq!(app.handle_key(press(KeyCode::Up)), None);
    }

    #[test]
    fn test_compose_sends_to_open_conversation() {
        let mut app = app_with_open_conversation();
        app.handle_key(press(KeyCode::Char('i')));
        assert_eq!(app.active_pane, Pane::Compose);
        for c in "hey".chars() {
            app.handle_key(press(KeyCode::Char(c)));
        }
        assert_eq!(
            app.handle_key(press(KeyCode::Enter)),
            Some(BackendCommand::SendMessage {
                conversation_id: "c1".into(),
                content: "hey".into()
            })
        );
        assert!(app.compose.input.is_empty());
    }

    #[test]
    fn test_compose_without_conversation_reports_error() {
        let mut app = App::default();
        app.active_pane = Pane::Compose;
        app.handle_key(press(KeyCode::Char('x')));
        assert_eq!(app.handle_key(press(KeyCode::Enter)), None);
        assert!(app.status_is_error);
        assert_eq!(app.compose.input, "x");
    }

    #[test]
    fn test_q_types_in_compose() {
        let mut app = App::default();
        app.active_pane = Pane::Compose;
        app.handle_key(press(KeyCode::Char('q')));
        assert!(!app.should_exit);
        assert_eq!(app.compose.input, "q");
    }

    #[test]
    fn test_requests_overlay_actions() {
        let mut app = App::default();
        app.apply(BackendResponse::Requests(vec![crate::models::Friend {
            id: "r1".into(),
            sender_id: "u2".into(),
            recipient_id: "u1".into(),
            accept_time: None,
            sender: None,
        }]));
        app.handle_key(ctrl('r'));
        assert!(app.requests.visible);
        assert_eq!(
            app.handle_key(press(KeyCode::Char('a'))),
            Some(BackendCommand::AcceptRequest {
                request_id: "r1".into()
            })
        );
        assert_eq!(
            app.handle_key(press(KeyCode::Char('r'))),
            Some(BackendCommand::RejectRequest {
                request_id: "r1".into()
            })
        );
        app.handle_key(press(KeyCode::Esc));
        assert!(!app.requests.visible);
    }

    #[test]
    fn test_ctrl_c_exits_from_anywhere() {
        let mut app = App::default();
        app.active_pane = Pane::Compose;
        app.handle_key(ctrl('c'));
        assert!(app.should_exit);
    }

    #[test]
    fn test_client_error_goes_offline() {
        let mut app = App::default();
        app.apply(BackendResponse::ClientError("Not logged in".into()));
        assert!(!app.is_online);
        assert!(app.status_is_error);
        assert!(!app.sidebar.loading);
    }

    #[test]
    fn test_absorb_logs_keeps_newest() {
        let mut app = App::default();
        app.absorb_logs(vec!["first".into(), "second".into(), "".into()]);
        assert_eq!(app.last_log.as_deref(), Some("second"));
        app.absorb_logs(vec![]);
        assert_eq!(app.last_log.as_deref(), Some("second"));
    }
}
