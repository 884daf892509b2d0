use chrono::{Local, TimeZone};
use minigpt_core::{model_info, Message, Role};
use minigpt_session::StorageBackend;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::App;

pub fn draw<B: StorageBackend>(f: &mut Frame, app: &App<B>) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),    // Sidebar + messages
            Constraint::Length(3), // Input
            Constraint::Length(1), // Status bar
        ])
        .split(f.size());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(20)])
        .split(rows[0]);

    draw_sidebar(f, app, columns[0]);
    draw_messages(f, app, columns[1]);
    draw_input(f, app, rows[1]);
    draw_status_bar(f, app, rows[2]);
}

fn draw_sidebar<B: StorageBackend>(f: &mut Frame, app: &App<B>, area: Rect) {
    let items: Vec<ListItem> = app
        .controller
        .conversations()
        .iter()
        .map(|c| {
            let updated = Local
                .timestamp_millis_opt(c.updated_at)
                .single()
                .map(|t| t.format("%m-%d %H:%M").to_string())
                .unwrap_or_default();
            ListItem::new(vec![
                Line::from(c.title.clone()),
                Line::from(Span::styled(updated, Style::default().fg(Color::DarkGray))),
            ])
        })
        .collect();

    let mut state = ListState::default();
    state.select(app.controller.current_index());

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Conversations "),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    f.render_stateful_widget(list, area, &mut state);
}

fn draw_messages<B: StorageBackend>(f: &mut Frame, app: &App<B>, area: Rect) {
    let width = area.width.saturating_sub(2) as usize;
    let streaming_id = app.controller.streaming_message_id();
    let mut lines: Vec<Line> = Vec::new();

    let title = match app.controller.current() {
        Some(conversation) => {
            if conversation.messages.is_empty() {
                lines.push(Line::from(Span::styled(
                    "Start a conversation by typing below.",
                    Style::default().fg(Color::DarkGray),
                )));
            }
            for message in &conversation.messages {
                let streaming = streaming_id == Some(message.id.as_str());
                lines.extend(format_message(message, streaming, app.spinner(), width));
                lines.push(Line::from(""));
            }
            format!(" {} ", conversation.title)
        }
        None => {
            lines.push(Line::from(Span::styled(
                "No conversation selected. Ctrl-N starts one.",
                Style::default().fg(Color::DarkGray),
            )));
            " Messages ".to_string()
        }
    };

    // Lines are pre-wrapped, so one line is one row
    let height = area.height.saturating_sub(2) as usize;
    let bottom = lines.len().saturating_sub(height);
    let scroll = bottom.saturating_sub(app.scroll_offset);
    let scroll = u16::try_from(scroll).unwrap_or(u16::MAX);

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .scroll((scroll, 0));

    f.render_widget(paragraph, area);
}

fn format_message(
    message: &Message,
    streaming: bool,
    spinner: &str,
    width: usize,
) -> Vec<Line<'static>> {
    let (label, color) = match message.role {
        Role::User => ("You", Color::Green),
        Role::Assistant => ("Assistant", Color::Cyan),
        Role::System => ("System", Color::Yellow),
    };

    let mut header = vec![Span::styled(
        label,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )];
    if streaming {
        header.push(Span::styled(
            format!(" {}", spinner),
            Style::default().fg(Color::Yellow),
        ));
    }

    let mut lines = vec![Line::from(header)];
    for line in message.content.lines() {
        lines.extend(wrap_line(line, width).into_iter().map(Line::from));
    }
    lines
}

/// Greedy word wrap to `width` display columns; words wider than a row are split
fn wrap_line(line: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![line.to_string()];
    }

    let mut rows = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;

    for word in line.split_inclusive(' ') {
        let word_width = word.trim_end().width();
        if current_width + word_width > width && !current.is_empty() {
            rows.push(current.trim_end().to_string());
            current.clear();
            current_width = 0;
        }

        if word_width > width {
            for ch in word.chars() {
                let ch_width = ch.width().unwrap_or(0);
                if current_width + ch_width > width && !current.is_empty() {
                    rows.push(std::mem::take(&mut current));
                    current_width = 0;
                }
                current.push(ch);
                current_width += ch_width;
            }
        } else {
            current.push_str(word);
            current_width += word.width();
        }
    }

    if !current.is_empty() || rows.is_empty() {
        rows.push(current.trim_end().to_string());
    }
    rows
}

fn draw_input<B: StorageBackend>(f: &mut Frame, app: &App<B>, area: Rect) {
    let (title, style) = if app.controller.is_busy() {
        (" Waiting for response... ", Style::default().fg(Color::DarkGray))
    } else {
        (" Message (Enter to send) ", Style::default())
    };

    // Keep the end of the input and the cursor inside the box
    let visible = area.width.saturating_sub(3);
    let input_width = u16::try_from(app.input.width()).unwrap_or(u16::MAX);
    let hidden = input_width.saturating_sub(visible);

    let input = Paragraph::new(app.input.as_str())
        .style(style)
        .scroll((0, hidden))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(input, area);

    f.set_cursor(
        area.x
            .saturating_add(1)
            .saturating_add(input_width.min(visible)),
        area.y.saturating_add(1),
    );
}

fn draw_status_bar<B: StorageBackend>(f: &mut Frame, app: &App<B>, area: Rect) {
    let model = model_info(app.controller.model());
    let mut spans = vec![
        Span::styled(
            format!(" {} ", model.name),
            Style::default().fg(Color::Black).bg(Color::Cyan),
        ),
        Span::styled(
            format!(" {} ", app.server_url),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    match &app.status {
        Some(status) => spans.push(Span::styled(
            status.clone(),
            Style::default().fg(Color::Red),
        )),
        None => spans.push(Span::styled(
            "Ctrl-N new | Ctrl-D delete | Up/Down select | PgUp/PgDn scroll | Tab model | Ctrl-C quit",
            Style::default().fg(Color::DarkGray),
        )),
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
