//! Friend-requests overlay: pending requests, polled in the background.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
    Frame,
};

use crate::models::Friend;

#[derive(Default)]
pub struct RequestsState {
    pub visible: bool,
    pub requests: Vec<Friend>,
    pub selected: usize,
}

impl RequestsState {
    /// Replace the list with the latest poll result.
    pub fn update(&mut self, requests: Vec<Friend>) {
        let keep = self.selected_id().map(String::from);
        self.requests = requests;
        if let Some(idx) = keep.and_then(|id| self.requests.iter().position(|r| r.id == id)) {
            self.selected = idx;
        }
        if self.selected >= self.requests.len() {
            self.selected = self.requests.len().saturating_sub(1);
        }
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.requests.get(self.selected).map(|r| r.id.as_str())
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    pub fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.selected + 1 < self.requests.len() {
            self.selected += 1;
        }
    }
}

/// Centered popup over the main layout.
pub fn render_overlay(frame: &mut Frame, state: &RequestsState) {
    let area = centered(frame.area(), 50, 14);
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(Color::Yellow))
        .title(Span::styled(
            format!(" Friend requests ({}) ", state.requests.len()),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ));

    let mut lines: Vec<Line> = Vec::new();
    if state.requests.is_empty() {
        lines.push(Line::from(Span::styled(
            " No pending requests",
            Style::default().fg(Color::DarkGray),
        )));
    }
    for (idx, request) in state.requests.iter().enumerate() {
        let selected = idx == state.selected;
        let style = if selected {
            Style::default()
                .fg(Color::White)
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        let cursor = if selected { "\u{25BA}" } else { " " };
        lines.push(Line::from(Span::styled(
            format!("{} {} wants to be friends", cursor, request.sender_name()),
            style,
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " a: accept  r: reject  Esc: close",
        Style::default().fg(Color::Cyan),
    )));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [_, middle, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(height.min(area.height)),
        Constraint::Fill(1),
    ])
    .areas(area);
    let [_, center, _] = Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Length(width.min(area.width)),
        Constraint::Fill(1),
    ])
    .areas(middle);
    center
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(id: &str) -> Friend {
        Friend {
            id: id.to_string(),
            sender_id: format!("s-{}", id),
            recipient_id: "me".to_string(),
            accept_time: None,
            sender: None,
        }
    }

    #[test]
    fn test_update_follows_selected_request() {
        let mut state = RequestsState::default();
        state.update(vec![pending("r1"), pending("r2"), pending("r3")]);
        state.move_down();
        state.move_down();
        assert_eq!(state.selected_id(), Some("r3"));

        state.update(vec![pending("r2"), pending("r3")]);
        assert_eq!(state.selected_id(), Some("r3"));
    }

    #[test]
    fn test_empty_poll_clears_list() {
        let mut state = RequestsState::default();
        state.update(vec![pending("r1")]);
        state.update(vec![]);
        assert!(state.requests.is_empty());
        assert_eq!(state.selected_id(), None);
    }

    #[test]
    fn test_centered_fits_small_terminal() {
        let area = centered(Rect::new(0, 0, 30, 10), 50, 14);
        assert_eq!(area.width, 30);
        assert_eq!(area.height, 10);
    }
}
