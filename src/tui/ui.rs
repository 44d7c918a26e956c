//! UI rendering for the TUI

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use super::app::{App, Pane};
use super::compose;
use super::messages;
use super::requests;
use super::sidebar;

/// Returns status indicator symbol and color based on online state
fn status_indicator(is_online: bool) -> (&'static str, Color) {
    if is_online {
        ("*", Color::Green)
    } else {
        ("o", Color::Red)
    }
}

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let [header_area, main_area, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(header_area, frame.buffer_mut(), app);

    let [sidebar_area, content_area] =
        Layout::horizontal([Constraint::Length(26), Constraint::Fill(1)]).areas(main_area);

    sidebar::render(
        sidebar_area,
        frame.buffer_mut(),
        &app.sidebar,
        app.active_pane == Pane::Sidebar,
    );

    let [messages_area, compose_area] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(compose::COMPOSE_HEIGHT),
    ])
    .areas(content_area);

    messages::render(
        messages_area,
        frame.buffer_mut(),
        &app.messages,
        app.active_pane == Pane::Messages,
    );

    compose::render(
        compose_area,
        frame,
        &app.compose,
        &app.messages.header,
        app.active_pane == Pane::Compose && !app.requests.visible,
    );

    render_status(status_area, frame.buffer_mut(), app);

    if app.requests.visible {
        requests::render_overlay(frame, &app.requests);
    }
}

fn render_header(area: Rect, buf: &mut Buffer, app: &App) {
    let title = " Minicord";

    let pending = app.requests.requests.len();
    let requests_text = if pending > 0 {
        format!(" [C-r] {} request(s) ", pending)
    } else {
        " [C-r] requests ".to_string()
    };
    let requests_style = if pending > 0 {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };

    let (status_symbol, status_color) = status_indicator(app.is_online);
    let online_text = format!(" {} ", status_symbol);
    let user_text = format!("{} ", app.user_name);

    let right_width = requests_text.width() + online_text.width() + user_text.width();
    let padding = (area.width as usize).saturating_sub(title.width() + right_width);

    let header_line = Line::from(vec![
        Span::styled(
            title,
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" ".repeat(padding)),
        Span::styled(requests_text, requests_style),
        Span::styled(online_text, Style::default().fg(status_color)),
        Span::styled(user_text, Style::default().fg(Color::Cyan)),
    ]);

    Paragraph::new(header_line)
        .style(Style::default().bg(Color::DarkGray))
        .render(area, buf);
}

fn render_status(area: Rect, buf: &mut Buffer, app: &App) {
    if let Some(ref msg) = app.status_message {
        let style = if app.status_is_error {
            Style::default().fg(Color::Red).bg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Green).bg(Color::DarkGray)
        };
        let line = Line::from(Span::styled(format!(" {} ", msg), style));
        Paragraph::new(line)
            .style(Style::default().bg(Color::DarkGray))
            .render(area, buf);
        return;
    }

    let (conn_symbol, conn_color) = status_indicator(app.is_online);
    let sep = Span::styled(" | ", Style::default().fg(Color::Black));

    let mut spans = vec![
        Span::styled(
            format!(" {} {} ", conn_symbol, app.connection_state),
            Style::default().fg(conn_color),
        ),
        sep.clone(),
        Span::styled(
            format!("Tab: {}", app.active_pane.as_str()),
            Style::default().fg(Color::Cyan),
        ),
        sep.clone(),
        Span::styled("q: quit", Style::default().fg(Color::Gray)),
    ];
    if let Some(ref log) = app.last_log {
        spans.push(sep);
        spans.push(Span::styled(log.clone(), Style::default().fg(Color::Gray)));
    }

    Paragraph::new(Line::from(spans))
        .style(Style::default().bg(Color::DarkGray))
        .render(area, buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};

    fn draw(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>()
    }

    #[test]
    fn test_renders_empty_app() {
        let screen = draw(&App::default());
        assert!(screen.contains("Minicord"));
        assert!(screen.contains("Conversations"));
        assert!(screen.contains("Select a conversation"));
    }

    #[test]
    fn test_renders_error_status() {
        let mut app = App::default();
        app.status_message = Some("Not logged in".into());
        app.status_is_error = true;
        assert!(draw(&app).contains("Not logged in"));
    }

    #[test]
    fn test_renders_requests_overlay() {
        let mut app = App::default();
        app.requests.visible = true;
        assert!(draw(&app).contains("No pending requests"));
    }
}
