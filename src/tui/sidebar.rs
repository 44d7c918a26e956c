//! Sidebar widget: the conversation list, refreshed by polling.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

// ---------------------------------------------------------------------------
// Data model
// ---------------------------------------------------------------------------

/// A conversation with its display title already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationEntry {
    pub id: String,
    pub title: String,
    pub is_group: bool,
}

/// Sidebar state: owns the list and tracks navigation.
pub struct SidebarState {
    pub conversations: Vec<ConversationEntry>,
    /// Index into `conversations`.
    pub selected: usize,
    /// Conversation currently shown in the messages pane.
    pub open_id: Option<String>,
    /// No list has arrived yet.
    pub loading: bool,
}

impl Default for SidebarState {
    fn default() -> Self {
        Self {
            conversations: Vec::new(),
            selected: 0,
            open_id: None,
            loading: true,
        }
    }
}

impl SidebarState {
    /// Replace the list, keeping the cursor on the same conversation when it
    /// is still present.
    pub fn update(&mut self, conversations: Vec<ConversationEntry>) {
        let keep = self.selected_entry().map(|c| c.id.clone());
        self.conversations = conversations;
        self.loading = false;
        if let Some(idx) = keep.and_then(|id| self.conversations.iter().position(|c| c.id == id)) {
            self.selected = idx;
        }
        self.clamp_selection();
    }

    pub fn selected_entry(&self) -> Option<&ConversationEntry> {
        self.conversations.get(self.selected)
    }

    /// Title of the open conversation, if it is in the list.
    pub fn open_title(&self) -> Option<&str> {
        let open = self.open_id.as_deref()?;
        self.conversations
            .iter()
            .find(|c| c.id == open)
            .map(|c| c.title.as_str())
    }

    pub fn move_up(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
    }

    pub fn move_down(&mut self) {
        if self.selected + 1 < self.conversations.len() {
            self.selected += 1;
        }
    }

    fn clamp_selection(&mut self) {
        if self.selected >= self.conversations.len() {
            self.selected = self.conversations.len().saturating_sub(1);
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render the sidebar into the given area.
pub fn render(area: Rect, buf: &mut Buffer, state: &SidebarState, focused: bool) {
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
        .border_style(border_style)
        .title(Span::styled(
            " Conversations ",
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    block.render(area, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    if state.conversations.is_empty() {
        let text = if state.loading { " Loading..." } else { " No conversations" };
        let line = Line::from(Span::styled(text, Style::default().fg(Color::DarkGray)));
        Paragraph::new(line).render(Rect::new(inner.x, inner.y, inner.width, 1), buf);
        return;
    }

    let available_height = inner.height as usize;
    let total = state.conversations.len();
    let scroll_offset = compute_scroll_offset(state.selected, available_height, total);

    for (row_idx, item_idx) in (scroll_offset..total).take(available_height).enumerate() {
        let entry = &state.conversations[item_idx];
        let selected = item_idx == state.selected;
        let open = state.open_id.as_deref() == Some(entry.id.as_str());

        let cursor = if selected { "\u{25BA}" } else { " " };
        let icon = if entry.is_group { "+" } else { "*" };
        let label = format!("{}{} {}", cursor, icon, entry.title);

        let style = if selected {
            Style::default()
                .fg(Color::White)
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD)
        } else if open {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };

        let row = Rect::new(inner.x, inner.y + row_idx as u16, inner.width, 1);
        render_row(buf, row, &label, style);
    }
}

/// Keep the selected row visible.
fn compute_scroll_offset(selected: usize, height: usize, total: usize) -> usize {
    if total <= height || selected < height {
        return 0;
    }
    let max_offset = total.saturating_sub(height);
    selected.saturating_sub(height - 1).min(max_offset)
}

/// Render a row truncated to the area width and padded so the selection
/// highlight spans the whole line.
fn render_row(buf: &mut Buffer, area: Rect, text: &str, style: Style) {
    let width = area.width as usize;
    let truncated = truncate_to_width(text, width);
    let pad = width.saturating_sub(truncated.width());
    let line = Line::from(vec![
        Span::styled(truncated, style),
        Span::styled(" ".repeat(pad), style),
    ]);
    Paragraph::new(line).render(area, buf);
}

fn truncate_to_width(text: &str, width: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, title: &str) -> ConversationEntry {
        ConversationEntry {
            id: id.to_string(),
            title: title.to_string(),
            is_group: false,
        }
    }

    #[test]
    fn test_update_keeps_cursor_on_same_conversation() {
        let mut state = SidebarState::default();
        state.update(vec![entry("a", "alice"), entry("b", "bob")]);
        state.move_down();
        assert_eq!(state.selected_entry().unwrap().id, "b");

        state.update(vec![entry("c", "carol"), entry("a", "alice"), entry("b", "bob")]);
        assert_eq!(state.selected_entry().unwrap().id, "b");
    }

    #[test]
    fn test_update_clamps_when_list_shrinks() {
        let mut state = SidebarState::default();
        state.update(vec![entry("a", "alice"), entry("b", "bob"), entry("c", "carol")]);
        state.move_down();
        state.move_down();
        state.update(vec![entry("a", "alice")]);
        assert_eq!(state.selected, 0);

        state.update(vec![]);
        assert!(state.selected_entry().is_none());
        assert!(!state.loading);
    }

    #[test]
    fn test_navigation_bounds() {
        let mut state = SidebarState::default();
        state.move_down();
        assert_eq!(state.selected, 0);
        state.update(vec![entry("a", "alice"), entry("b", "bob")]);
        state.move_up();
        assert_eq!(state.selected, 0);
        state.move_down();
        state.move_down();
        assert_eq!(state.selected, 1);
    }

    #[test]
    fn test_open_title() {
        let mut state = SidebarState::default();
        state.update(vec![entry("a", "alice")]);
        assert_eq!(state.open_title(), None);
        state.open_id = Some("a".into());
        assert_eq!(state.open_title(), Some("alice"));
    }

    #[test]
    fn test_scroll_offset() {
        assert_eq!(compute_scroll_offset(2, 5, 3), 0);
        assert_eq!(compute_scroll_offset(7, 5, 10), 3);
        assert_eq!(compute_scroll_offset(9, 5, 10), 5);
    }

    #[test]
    fn test_truncate_to_width() {
        assert_eq!(truncate_to_width("hello", 3), "hel");
        assert_eq!(truncate_to_width("日本語", 4), "日本");
    }
}
