//! Compose box: single-line message input.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
    Frame,
};
use unicode_width::UnicodeWidthChar;

/// State for the compose box.
#[derive(Default)]
pub struct ComposeState {
    /// Current input text.
    pub input: String,
    /// Cursor position as a character offset into `input`.
    pub cursor: usize,
}

impl ComposeState {
    pub fn insert_char(&mut self, c: char) {
        let byte_pos = self.char_to_byte(self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    /// Delete the character before the cursor.
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            let end = self.char_to_byte(self.cursor);
            let start = self.char_to_byte(self.cursor - 1);
            self.input.drain(start..end);
            self.cursor -= 1;
        }
    }

    /// Delete the character under the cursor.
    pub fn delete(&mut self) {
        if self.cursor < self.input.chars().count() {
            let start = self.char_to_byte(self.cursor);
            let end = self.char_to_byte(self.cursor + 1);
            self.input.drain(start..end);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.input.chars().count() {
            self.cursor += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    pub fn clear(&mut self) {
        self.input.clear();
        self.cursor = 0;
    }

    /// Take the trimmed text and clear the box. `None` for blank input,
    /// which is left as it is.
    pub fn take(&mut self) -> Option<String> {
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return None;
        }
        self.clear();
        Some(text)
    }

    fn char_to_byte(&self, char_pos: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Border, input line, hint line, border.
pub const COMPOSE_HEIGHT: u16 = 4;

/// Render the compose box and place the terminal cursor when focused.
pub fn render(area: Rect, frame: &mut Frame, state: &ComposeState, target: &str, focused: bool) {
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
    frame.render_widget(block, area);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let input_area = Rect::new(inner.x, inner.y, inner.width, 1);
    let width = input_area.width as usize;
    let view = visible_input(&state.input, state.cursor, width.saturating_sub(1));
    render_input(input_area, frame.buffer_mut(), state, &view, target);

    if focused {
        frame.set_cursor_position((input_area.x + 1 + view.cursor_offset as u16, input_area.y));
    }

    if inner.height >= 2 {
        let hint_area = Rect::new(inner.x, inner.y + 1, inner.width, 1);
        let hint = if focused {
            " Enter: send  Esc: back  C-u: clear"
        } else {
            " Tab or i: write a message"
        };
        Paragraph::new(Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))))
            .render(hint_area, frame.buffer_mut());
    }
}

fn render_input(area: Rect, buf: &mut Buffer, state: &ComposeState, view: &InputView, target: &str) {
    let line = if state.input.is_empty() {
        let placeholder = if target.is_empty() {
            " Open a conversation to write".to_string()
        } else {
            format!(" Message {}...", target)
        };
        Line::from(Span::styled(placeholder, Style::default().fg(Color::DarkGray)))
    } else {
        Line::from(Span::styled(
            format!(" {}", view.visible),
            Style::default().fg(Color::White),
        ))
    };
    Paragraph::new(line).render(area, buf);
}

/// The slice of input that fits the box, scrolled so the cursor is visible.
struct InputView {
    visible: String,
    /// Cursor column within `visible`.
    cursor_offset: usize,
}

fn visible_input(input: &str, cursor: usize, width: usize) -> InputView {
    if width == 0 {
        return InputView {
            visible: String::new(),
            cursor_offset: 0,
        };
    }

    let chars: Vec<(char, usize)> = input
        .chars()
        .map(|c| (c, c.width().unwrap_or(0)))
        .collect();
    let cursor = cursor.min(chars.len());

    // Walk left from the cursor until the window is full.
    let mut start = cursor;
    let mut used = 0;
    while start > 0 && used + chars[start - 1].1 < width {
        used += chars[start - 1].1;
        start -= 1;
    }

    let mut visible = String::new();
    let mut total = 0;
    let mut cursor_offset = 0;
    for (i, &(c, w)) in chars.iter().enumerate().skip(start) {
        if i == cursor {
            cursor_offset = total;
        }
        if total + w > width {
            break;
        }
        visible.push(c);
        total += w;
    }
    if cursor == chars.len() {
        cursor_offset = total.min(width);
    }

    InputView {
        visible,
        cursor_offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str) -> ComposeState {
        let mut state = ComposeState::default();
        text.chars().for_each(|c| state.insert_char(c));
        state
    }

    #[test]
    fn test_insert_and_edit() {
        let mut state = typed("helo");
        state.move_left();
        state.insert_char('l');
        assert_eq!(state.input, "hello");
        state.move_home();
        state.delete();
        assert_eq!(state.input, "ello");
        state.move_end();
        state.backspace();
        assert_eq!(state.input, "ell");
        assert_eq!(state.cursor, 3);
    }

    #[test]
    fn test_multibyte_editing() {
        let mut state = typed("héllo");
        state.move_home();
        state.move_right();
        state.move_right();
        state.backspace();
        assert_eq!(state.input, "hllo");
    }

    #[test]
    fn test_take_trims_and_clears() {
        let mut state = typed("  hi there  ");
        assert_eq!(state.take().as_deref(), Some("hi there"));
        assert!(state.input.is_empty());
        assert_eq!(state.cursor, 0);
    }

    #[test]
    fn test_take_blank_keeps_input() {
        let mut state = typed("   ");
        assert_eq!(state.take(), None);
        assert_eq!(state.input, "   ");
    }

    #[test]
    fn test_visible_input_scrolls_to_cursor() {
        let view = visible_input("abcdefghij", 10, 5);
        assert_eq!(view.visible, "ghij");
        assert_eq!(view.cursor_offset, 4);

        let view = visible_input("abcdefghij", 0, 5);
        assert_eq!(view.visible, "abcde");
        assert_eq!(view.cursor_offset, 0);

        let view = visible_input("abc", 1, 5);
        assert_eq!(view.visible, "abc");
        assert_eq!(view.cursor_offset, 1);
    }
}
