//! Messages pane: the open conversation's window, oldest at the top.

use chrono::{DateTime, Local, Utc};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::models::Message;

// ---------------------------------------------------------------------------
// Data model
// ---------------------------------------------------------------------------

/// A message with its author already resolved to a display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLine {
    pub id: String,
    pub author: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
    /// Written by the logged-in user.
    pub own: bool,
}

impl MessageLine {
    pub fn new(message: Message, author: String, self_id: &str) -> Self {
        Self {
            own: message.author_id == self_id,
            id: message.id,
            author,
            content: message.content,
            sent_at: message.send_time,
        }
    }

    /// "14:05" for today, "Mar 02 14:05" otherwise.
    pub fn timestamp(&self) -> String {
        let local = self.sent_at.with_timezone(&Local);
        if local.date_naive() == Local::now().date_naive() {
            local.format("%H:%M").to_string()
        } else {
            local.format("%b %d %H:%M").to_string()
        }
    }
}

/// State for the messages pane.
#[derive(Default)]
pub struct MessagesState {
    /// Title of the open conversation.
    pub header: String,
    pub conversation_id: Option<String>,
    pub lines: Vec<MessageLine>,
    /// Index into `lines` of the highlighted message.
    pub selected: usize,
    /// No older messages exist on the server.
    pub exhausted: bool,
    /// Waiting for the first page.
    pub loading: bool,
    /// A "load older" request is in flight.
    pub loading_older: bool,
}

impl MessagesState {
    /// Start showing `conversation_id`; content arrives later via [`MessagesState::apply`].
    pub fn open(&mut self, conversation_id: &str, header: &str) {
        self.conversation_id = Some(conversation_id.to_string());
        self.header = header.to_string();
        self.lines.clear();
        self.selected = 0;
        self.exhausted = false;
        self.loading = true;
        self.loading_older = false;
    }

    /// Replace the shown window. Ignored when it belongs to a conversation
    /// that is no longer open.
    ///
    /// The selection stays on the same message when older messages are
    /// prepended, and follows the newest message when it was already there.
    pub fn apply(
        &mut self,
        conversation_id: &str,
        lines: Vec<MessageLine>,
        exhausted: bool,
        loading_older: bool,
    ) -> bool {
        if self.conversation_id.as_deref() != Some(conversation_id) {
            return false;
        }

        let follow = self.lines.is_empty() || self.selected + 1 >= self.lines.len();
        let keep = self.lines.get(self.selected).map(|l| l.id.clone());

        self.lines = lines;
        self.exhausted = exhausted;
        self.loading = false;
        self.loading_older = loading_older;

        self.selected = if follow {
            self.lines.len().saturating_sub(1)
        } else {
            keep.and_then(|id| self.lines.iter().position(|l| l.id == id))
                .unwrap_or(self.selected)
                .min(self.lines.len().saturating_sub(1))
        };
        true
    }

    pub fn close(&mut self) {
        *self = Self::default();
    }

    pub fn select_previous(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.lines.len() {
            self.selected += 1;
        }
    }

    pub fn select_last(&mut self) {
        self.selected = self.lines.len().saturating_sub(1);
    }

    /// The oldest held message is highlighted and more may exist before it.
    pub fn wants_older(&self) -> bool {
        self.conversation_id.is_some()
            && !self.lines.is_empty()
            && self.selected == 0
            && !self.exhausted
            && !self.loading_older
            && !self.loading
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render the messages pane into the given area.
pub fn render(area: Rect, buf: &mut Buffer, state: &MessagesState, focused: bool) {
    let border_style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let border_type = if focused {
        BorderType::Double
    } else {
        BorderType::Plain
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(border_style);

    let inner = block.inner(area);
    block.render(area, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let header = if state.header.is_empty() {
        "(no conversation)"
    } else {
        state.header.as_str()
    };
    let header_area = Rect::new(inner.x, inner.y, inner.width, 1);
    render_conversation_header(header_area, buf, header);

    let messages_area = Rect::new(
        inner.x,
        inner.y + 1,
        inner.width,
        inner.height.saturating_sub(1),
    );
    if messages_area.height == 0 {
        return;
    }

    if let Some(placeholder) = placeholder(state) {
        let line = Line::from(Span::styled(
            format!(" {}", placeholder),
            Style::default().fg(Color::DarkGray),
        ));
        Paragraph::new(line).render(Rect::new(messages_area.x, messages_area.y, messages_area.width, 1), buf);
        return;
    }

    let (all_lines, ranges) = build_message_lines(state, messages_area.width as usize);
    let total_lines = all_lines.len();
    let visible_height = messages_area.height as usize;
    let scroll = compute_auto_scroll(state.selected, &ranges, visible_height, total_lines);

    for (row, line_idx) in (scroll..total_lines).take(visible_height).enumerate() {
        let y = messages_area.y + row as u16;
        let line_area = Rect::new(messages_area.x, y, messages_area.width, 1);
        Paragraph::new(all_lines[line_idx].clone()).render(line_area, buf);
    }

    if total_lines > visible_height {
        let indicator_x = messages_area.x + messages_area.width.saturating_sub(1);
        if scroll > 0 {
            let cell = &mut buf[(indicator_x, messages_area.y)];
            cell.set_char('^');
            cell.set_style(Style::default().fg(Color::DarkGray));
        }
        if scroll + visible_height < total_lines {
            let bottom_y = messages_area.y + messages_area.height.saturating_sub(1);
            let cell = &mut buf[(indicator_x, bottom_y)];
            cell.set_char('v');
            cell.set_style(Style::default().fg(Color::DarkGray));
        }
    }
}

fn placeholder(state: &MessagesState) -> Option<&'static str> {
    if state.conversation_id.is_none() {
        Some("Select a conversation (Enter in the sidebar)")
    } else if state.loading {
        Some("Loading...")
    } else if state.lines.is_empty() {
        Some("No messages yet. Say hello!")
    } else {
        None
    }
}

fn render_conversation_header(area: Rect, buf: &mut Buffer, header: &str) {
    let line = Line::from(vec![Span::styled(
        format!(" {} ", header),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    )]);
    Paragraph::new(line)
        .style(Style::default().bg(Color::DarkGray))
        .render(area, buf);
}

/// Build the flat line buffer and per-message line ranges in a single pass.
fn build_message_lines(
    state: &MessagesState,
    width: usize,
) -> (Vec<Line<'static>>, Vec<(usize, usize)>) {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut ranges: Vec<(usize, usize)> = Vec::new();
    let dim = Style::default().fg(Color::DarkGray);

    if state.loading_older {
        lines.push(Line::from(Span::styled(" Loading older messages...", dim)));
    } else if state.exhausted {
        lines.push(Line::from(Span::styled(" -- beginning of conversation --", dim)));
    }

    let content_width = width.saturating_sub(4);

    for (idx, msg) in state.lines.iter().enumerate() {
        let start = lines.len();
        let selected = idx == state.selected;

        let marker = if selected { "\u{25BA} " } else { "  " };
        let author_style = if msg.own {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
        };
        let marker_style = if selected {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::styled(marker.to_string(), marker_style),
            Span::styled(msg.author.clone(), author_style),
            Span::styled(format!("  {}", msg.timestamp()), dim),
        ]));

        let body_style = if selected {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Gray)
        };
        for wrapped in wrap_text(&msg.content, content_width) {
            lines.push(Line::from(vec![
                Span::raw("    "),
                Span::styled(wrapped, body_style),
            ]));
        }

        lines.push(Line::from(""));
        ranges.push((start, lines.len()));
    }

    (lines, ranges)
}

/// Word-wrap by display width. Explicit newlines are kept; words wider
/// than the line are split.
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 {
        return vec![];
    }
    let mut result = Vec::new();
    for line in text.lines() {
        if line.width() <= max_width {
            result.push(line.to_string());
            continue;
        }
        let mut current = String::new();
        let mut current_w = 0;
        for word in line.split_whitespace() {
            let word_w = word.width();
            if current_w > 0 && current_w + 1 + word_w <= max_width {
                current.push(' ');
                current.push_str(word);
                current_w += 1 + word_w;
                continue;
            }
            if current_w > 0 {
                result.push(std::mem::take(&mut current));
                current_w = 0;
            }
            if word_w <= max_width {
                current.push_str(word);
                current_w = word_w;
                continue;
            }
            for ch in word.chars() {
                let ch_w = ch.width().unwrap_or(0);
                if current_w + ch_w > max_width {
                    result.push(std::mem::take(&mut current));
                    current_w = 0;
                }
                current.push(ch);
                current_w += ch_w;
            }
        }
        if !current.is_empty() {
            result.push(current);
        }
    }
    if result.is_empty() {
        result.push(String::new());
    }
    result
}

/// Scroll offset that keeps the selected message visible, preferring to pin
/// it to the bottom of the viewport.
fn compute_auto_scroll(
    selected: usize,
    ranges: &[(usize, usize)],
    visible_height: usize,
    total_lines: usize,
) -> usize {
    if total_lines <= visible_height {
        return 0;
    }
    let Some(&(sel_start, sel_end)) = ranges.get(selected) else {
        return total_lines - visible_height;
    };

    let scroll = if sel_end.saturating_sub(sel_start) >= visible_height || selected == 0 {
        // Show the top (and the "older" banner above the first message).
        if selected == 0 { 0 } else { sel_start }
    } else {
        sel_end.saturating_sub(visible_height)
    };
    scroll.min(total_lines - visible_height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn line(id: &str) -> MessageLine {
        MessageLine {
            id: id.to_string(),
            author: "alice".to_string(),
            content: format!("hello from {}", id),
            sent_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            own: false,
        }
    }

    fn lines(ids: &[&str]) -> Vec<MessageLine> {
        ids.iter().map(|id| line(id)).collect()
    }

    #[test]
    fn test_first_window_selects_newest() {
        let mut state = MessagesState::default();
        state.open("c1", "bob");
        assert!(state.apply("c1", lines(&["m1", "m2", "m3"]), false, false));
        assert_eq!(state.selected, 2);
        assert!(!state.loading);
    }

    #[test]
    fn test_window_for_other_conversation_is_ignored() {
        let mut state = MessagesState::default();
        state.open("c2", "carol");
        assert!(!state.apply("c1", lines(&["m1"]), false, false));
        assert!(state.lines.is_empty());
        assert!(state.loading);
    }

    #[test]
    fn test_prepend_keeps_selected_message() {
        let mut state = MessagesState::default();
        state.open("c1", "bob");
        state.apply("c1", lines(&["m5", "m6", "m7"]), false, false);
        state.selected = 0;

        state.apply("c1", lines(&["m3", "m4", "m5", "m6", "m7"]), false, false);
        assert_eq!(state.lines[state.selected].id, "m5");
    }

    #[test]
    fn test_follows_newest_when_at_bottom() {
        let mut state = MessagesState::default();
        state.open("c1", "bob");
        state.apply("c1", lines(&["m1", "m2"]), false, false);
        state.apply("c1", lines(&["m1", "m2", "m3"]), false, false);
        assert_eq!(state.lines[state.selected].id, "m3");
    }

    #[test]
    fn test_wants_older_only_at_top() {
        let mut state = MessagesState::default();
        state.open("c1", "bob");
        assert!(!state.wants_older());
        state.apply("c1", lines(&["m1", "m2"]), false, false);
        assert!(!state.wants_older());
        state.select_previous();
        assert!(state.wants_older());

        state.loading_older = true;
        assert!(!state.wants_older());
        state.loading_older = false;
        state.exhausted = true;
        assert!(!state.wants_older());
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(wrap_text("short", 10), vec!["short"]);
        assert_eq!(wrap_text("one two three", 7), vec!["one two", "three"]);
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap_text("a\nb", 10), vec!["a", "b"]);
        assert_eq!(wrap_text("", 10), vec![""]);
    }

    #[test]
    fn test_auto_scroll_pins_selection_to_bottom() {
        let ranges = vec![(0, 3), (3, 6), (6, 9), (9, 12)];
        assert_eq!(compute_auto_scroll(3, &ranges, 6, 12), 6);
        assert_eq!(compute_auto_scroll(0, &ranges, 6, 12), 0);
        assert_eq!(compute_auto_scroll(0, &ranges, 20, 12), 0);
    }

    #[test]
    fn test_message_line_marks_own() {
        let m = Message {
            id: "m1".into(),
            author_id: "u1".into(),
            conversation_id: "c1".into(),
            content: "hi".into(),
            send_time: Utc.timestamp_opt(0, 0).unwrap(),
        };
        assert!(MessageLine::new(m.clone(), "me".into(), "u1").own);
        assert!(!MessageLine::new(m, "alice".into(), "u2").own);
    }
}
