use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::models::{Devotional, DevotionalSource};

pub fn draw(frame: &mut Frame, app: &App) {
    // Main horizontal split: 1/3 left, 2/3 right
    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3), // Left pane: devotional list
            Constraint::Ratio(2, 3), // Right pane: details
        ])
        .split(frame.area());

    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Min(0),    // List
            Constraint::Length(1), // Status line
        ])
        .split(main_chunks[0]);

    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Source
        ])
        .split(main_chunks[1]);

    render_header(frame, app, left_chunks[0]);
    render_devotional_list(frame, app, left_chunks[1]);
    render_left_status(frame, app, left_chunks[2]);

    render_title(frame, app, right_chunks[0]);
    render_details(frame, app, right_chunks[1]);
    render_right_status(frame, app, right_chunks[2]);

    if app.show_help {
        render_help(frame);
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let filter_label = app.filter.label();
    let total = app.devotionals.len();
    let hidden = app.devotionals.iter().filter(|d| !d.visible).count();

    let title = format!(" Renungan [{filter_label}] ");
    let stats = format!(" {} Entries | {} Hidden", total, hidden);

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let paragraph = Paragraph::new(stats).style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, inner);
}

fn render_devotional_list(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .filtered_devotionals()
        .iter()
        .map(|devotional| {
            let style = if devotional.visible {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };

            let marker = match devotional.source {
                DevotionalSource::Synced => "⟳ ",
                DevotionalSource::Manual => "✎ ",
            };

            let hidden = if devotional.visible { "" } else { "[h] " };

            let line = Line::from(vec![
                Span::styled(marker, Style::default().fg(Color::Yellow)),
                Span::styled(hidden, Style::default().fg(Color::Red)),
                Span::styled(
                    format!("{} ", devotional.date.format("%d/%m/%Y")),
                    Style::default().fg(Color::Blue),
                ),
                Span::styled(devotional.title.as_str(), style),
            ]);

            ListItem::new(line)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(Some(app.selected_index));

    frame.render_stateful_widget(list, area, &mut state);
}

fn render_left_status(frame: &mut Frame, app: &App, area: Rect) {
    let status = if app.is_syncing {
        "Syncing feed...".to_string()
    } else if let Some(message) = &app.status_message {
        message.clone()
    } else {
        "j/k:nav  r:sync  v:visible  f:filter  ?:help  q:quit".to_string()
    };

    let paragraph = Paragraph::new(status).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}

fn render_title(frame: &mut Frame, app: &App, area: Rect) {
    let title = app
        .selected_devotional()
        .map(|d| d.title.as_str())
        .unwrap_or("No devotional selected");

    let block = Block::default()
        .title(" Renungan ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let paragraph = Paragraph::new(title)
        .block(block)
        .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, area);
}

fn details_lines(devotional: &Devotional) -> Vec<Line<'_>> {
    let label = Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD);
    let mut lines = vec![Line::from(vec![
        Span::styled("Tanggal: ", label),
        Span::raw(devotional.date.format("%A, %d %B %Y").to_string()),
    ])];

    let fields = [
        ("Bacaan: ", devotional.reference.as_deref()),
        ("Ayat Emas: ", devotional.key_verse.as_deref()),
        ("Nyanyian: ", devotional.hymn.as_deref()),
    ];
    for (name, value) in fields {
        if let Some(value) = value {
            lines.push(Line::from(vec![Span::styled(name, label), Span::raw(value)]));
        }
    }

    lines.push(Line::default());
    if devotional.body.is_empty() {
        lines.push(Line::styled("(no body text)", Style::default().fg(Color::DarkGray)));
    } else {
        lines.extend(devotional.body.lines().map(Line::raw));
    }

    for (name, value) in [("Doa", &devotional.prayer), ("Kutipan", &devotional.quote)] {
        if let Some(value) = value {
            lines.push(Line::default());
            lines.push(Line::styled(name, label));
            lines.extend(value.lines().map(Line::raw));
        }
    }

    lines
}

fn render_details(frame: &mut Frame, app: &App, area: Rect) {
    let lines = app
        .selected_devotional()
        .map(details_lines)
        .unwrap_or_else(|| vec![Line::raw("Press 'r' to sync the feed...")]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, area);
}

fn render_right_status(frame: &mut Frame, app: &App, area: Rect) {
    let text = match app.selected_devotional() {
        Some(d) => {
            let visibility = if d.visible { "Visible" } else { "Hidden" };
            let source = d.source_url.as_deref().unwrap_or("manual entry");
            format!("{visibility} | {source}")
        }
        None => String::new(),
    };

    let paragraph = Paragraph::new(text).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}

fn render_help(frame: &mut Frame) {
    let area = centered_rect(50, 60, frame.area());

    let help_text = [
        "",
        " Navigation:",
        "   j / ↓    Move down",
        "   k / ↑    Move up",
        "   < / >    First / last",
        "",
        " Actions:",
        "   r        Sync from feed",
        "   v        Toggle visible/hidden",
        "   o        Open source in browser",
        "   f        Cycle filter",
        "   d        Delete devotional",
        "",
        " General:",
        "   ?        Toggle this help",
        "   q        Quit",
        "",
        " Press any key to close",
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(help_text.join("\n"))
        .block(block)
        .style(Style::default().fg(Color::White));

    frame.render_widget(ratatui::widgets::Clear, area);
    frame.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
