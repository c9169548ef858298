//! Frame rendering for every view.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::core::app::{App, View};
use crate::core::categories;
use crate::core::message::TranscriptRole;
use crate::utils::scroll::{bottom_offset, clamp_offset};

pub fn ui(f: &mut Frame, app: &App) {
    let background = Block::default().style(Style::default().bg(app.theme.background_color));
    f.render_widget(background, f.area());

    match app.view {
        View::Home => draw_home(f, app),
        View::Chat => draw_chat(f, app),
        View::Settings | View::Memory | View::Prompts => draw_panel(f, app),
    }
}

fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > max_width.saturating_sub(1) {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push('…');
    out
}

fn draw_home(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    let title = Paragraph::new(Line::from(Span::styled(
        "Ultron Console",
        app.theme.title_style,
    )));
    f.render_widget(title, chunks[0]);

    let width = chunks[1].width.saturating_sub(4) as usize;
    let mut lines: Vec<Line> = Vec::new();
    for (i, item) in app.home_picker.items.iter().enumerate() {
        let selected = i == app.home_picker.selected;
        let marker = if selected { "> " } else { "  " };
        let label_style = if selected {
            app.theme.sidebar_selected_style
        } else if let Some(slug) = item.id.strip_prefix("category:") {
            categories::find_category(slug)
                .map(|c| Style::default().fg(c.accent))
                .unwrap_or(app.theme.sidebar_style)
        } else {
            app.theme.sidebar_style
        };

        let mut spans = vec![
            Span::raw(marker),
            Span::styled(truncate_to_width(&item.label, 24), label_style),
        ];
        if let Some(detail) = &item.detail {
            if !detail.is_empty() {
                spans.push(Span::raw("  "));
                spans.push(Span::styled(
                    truncate_to_width(detail, width.saturating_sub(28)),
                    app.theme.app_info_style,
                ));
            }
        }
        lines.push(Line::from(spans));
    }

    let available = chunks[1].height;
    let offset = bottom_offset(
        (app.home_picker.selected as u16).saturating_add(1),
        available,
    );
    let list = Paragraph::new(lines).scroll((offset, 0));
    f.render_widget(list, chunks[1]);

    let footer = Paragraph::new(Line::from(Span::styled(
        "Enter: open   Up/Down: move   Ctrl+C: quit",
        app.theme.title_style,
    )));
    f.render_widget(footer, chunks[2]);
}

fn draw_chat(f: &mut Frame, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(28), Constraint::Min(0)])
        .split(f.area());

    draw_sidebar(f, app, columns[0]);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(4),
            Constraint::Length(1),
        ])
        .split(columns[1]);

    // Header: category label and model
    let header = Paragraph::new(vec![
        Line::from(Span::styled(
            app.category.label,
            Style::default().fg(app.category.accent),
        )),
        Line::from(Span::styled(
            format!("{} · {}", app.category.description, app.category.model),
            app.theme.app_info_style,
        )),
    ]);
    f.render_widget(header, rows[0]);

    // Transcript. Lines are wrapped here rather than by the widget so the
    // scroll offset counts the rows actually rendered.
    let lines = wrapped_display_lines(app, rows[1].width);
    let available_height = rows[1].height;
    let total_lines = lines.len() as u16;
    let scroll = if app.auto_scroll {
        bottom_offset(total_lines, available_height)
    } else {
        clamp_offset(app.scroll_offset, total_lines, available_height)
    };
    let transcript = Paragraph::new(lines).scroll((scroll, 0));
    f.render_widget(transcript, rows[1]);

    // Input
    let input_title = if app.conversation.has_streaming_entry() {
        "Streaming… (Esc to cancel)"
    } else {
        "Message (Enter to send, / for commands)"
    };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.theme.input_border_style)
        .title(Span::styled(input_title, app.theme.input_title_style));
    let inner = input_block.inner(rows[2]);
    f.render_widget(input_block, rows[2]);
    f.render_widget(&app.input, inner);

    // Status line
    let status = app.status.as_deref().unwrap_or("");
    f.render_widget(
        Paragraph::new(Span::styled(status, app.theme.title_style)),
        rows[3],
    );
}

fn draw_sidebar(f: &mut Frame, app: &App, area: Rect) {
    let border_style = if app.sidebar_focused {
        Style::default().fg(app.category.accent)
    } else {
        app.theme.input_border_style
    };
    let block = Block::default()
        .borders(Borders::RIGHT)
        .border_style(border_style)
        .title(Span::styled(
            app.sidebar.title.clone(),
            app.theme.title_style,
        ));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let width = inner.width.saturating_sub(2) as usize;
    let mut lines: Vec<Line> = Vec::new();
    if app.sidebar.items.is_empty() {
        lines.push(Line::from(Span::styled(
            "No chats yet",
            app.theme.app_info_style,
        )));
        lines.push(Line::from(Span::styled(
            "Ctrl+N starts one",
            app.theme.app_info_style,
        )));
    }
    for (i, item) in app.sidebar.items.iter().enumerate() {
        let selected = i == app.sidebar.selected;
        let active = app.conversation.chat_id() == Some(item.id.as_str());
        let style = if selected {
            app.theme.sidebar_selected_style
        } else if active {
            Style::default().fg(app.category.accent)
        } else {
            app.theme.sidebar_style
        };
        let marker = if active { "* " } else { "  " };
        lines.push(Line::from(vec![
            Span::raw(marker),
            Span::styled(truncate_to_width(&item.label, width), style),
        ]));
    }

    let offset = bottom_offset(
        (app.sidebar.selected as u16).saturating_add(1),
        inner.height,
    );
    f.render_widget(Paragraph::new(lines).scroll((offset, 0)), inner);
}

fn draw_panel(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    let title = Paragraph::new(Line::from(Span::styled(
        app.panel_picker.title.clone(),
        app.theme.title_style,
    )));
    f.render_widget(title, chunks[0]);

    let width = chunks[1].width.saturating_sub(4) as usize;
    let mut lines: Vec<Line> = Vec::new();
    if app.panel_picker.items.is_empty() {
        let empty_hint = match app.view {
            View::Memory => "No memory notes yet. Use /memory add <text> in a chat.",
            View::Prompts => "The prompt library is empty.",
            _ => "",
        };
        lines.push(Line::from(Span::styled(empty_hint, app.theme.app_info_style)));
    }
    for (i, item) in app.panel_picker.items.iter().enumerate() {
        let selected = i == app.panel_picker.selected;
        let marker = if selected { "> " } else { "  " };
        let style = if selected {
            app.theme.sidebar_selected_style
        } else {
            app.theme.assistant_text_style
        };
        let mut spans = vec![
            Span::raw(marker),
            Span::styled(truncate_to_width(&item.label, 40), style),
        ];
        if let Some(detail) = &item.detail {
            if !detail.is_empty() {
                spans.push(Span::raw("  "));
                spans.push(Span::styled(
                    truncate_to_width(detail, width.saturating_sub(44)),
                    app.theme.app_info_style,
                ));
            }
        }
        lines.push(Line::from(spans));
    }
    f.render_widget(Paragraph::new(lines), chunks[1]);

    let footer_text = match app.view {
        View::Settings => "Enter: toggle theme   Esc: back",
        View::Memory => "d: delete note   Esc: back",
        View::Prompts => "Enter: insert into input   Esc: back",
        _ => "",
    };
    f.render_widget(
        Paragraph::new(Span::styled(footer_text, app.theme.title_style)),
        chunks[2],
    );
}

pub fn build_display_lines(app: &App) -> Vec<Line<'_>> {
    let mut lines: Vec<Line> = Vec::new();
    let user_name = app.config.resolved_display_name();

    for entry in app.conversation.entries() {
        match entry.role {
            TranscriptRole::User => {
                let mut first = true;
                for text_line in entry.text.lines() {
                    if first {
                        lines.push(Line::from(vec![
                            Span::styled(
                                format!("{user_name}: "),
                                app.theme.user_prefix_style,
                            ),
                            Span::styled(text_line, app.theme.user_text_style),
                        ]));
                        first = false;
                    } else {
                        lines.push(Line::from(Span::styled(
                            text_line,
                            app.theme.user_text_style,
                        )));
                    }
                }
                if first {
                    // Empty user message still shows the prefix
                    lines.push(Line::from(Span::styled(
                        format!("{user_name}: "),
                        app.theme.user_prefix_style,
                    )));
                }
            }
            TranscriptRole::Assistant => {
                for text_line in entry.text.lines() {
                    lines.push(Line::from(Span::styled(
                        text_line,
                        app.theme.assistant_text_style,
                    )));
                }
                if entry.streaming {
                    lines.push(Line::from(Span::styled(
                        "▌",
                        app.theme.streaming_indicator_style,
                    )));
                } else if entry.text.is_empty() {
                    lines.push(Line::from(Span::styled(
                        "(no response)",
                        app.theme.app_info_style,
                    )));
                }
            }
            TranscriptRole::AppInfo | TranscriptRole::AppWarning => {
                for text_line in entry.text.lines() {
                    lines.push(Line::from(Span::styled(
                        text_line,
                        app.theme.app_info_style,
                    )));
                }
            }
            TranscriptRole::AppError => {
                for text_line in entry.text.lines() {
                    lines.push(Line::from(Span::styled(
                        text_line,
                        app.theme.app_error_style,
                    )));
                }
            }
        }
        for attachment in &entry.attachments {
            lines.push(Line::from(Span::styled(
                format!("[{}]", attachment.name),
                app.theme.app_info_style,
            )));
        }
        lines.push(Line::from(""));
    }

    lines
}

/// Hard-wrap one styled line into rows of at most `width` columns.
fn wrap_line(line: &Line<'_>, width: u16) -> Vec<Line<'static>> {
    let width = width as usize;
    if width == 0 {
        return vec![Line::from("")];
    }
    let mut rows: Vec<Line<'static>> = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut used = 0;
    for span in &line.spans {
        let style = span.style;
        let mut buf = String::new();
        for ch in span.content.chars() {
            let w = ch.width().unwrap_or(0);
            if used + w > width && used > 0 {
                if !buf.is_empty() {
                    current.push(Span::styled(std::mem::take(&mut buf), style));
                }
                rows.push(Line::from(std::mem::take(&mut current)));
                used = 0;
            }
            buf.push(ch);
            used += w;
        }
        if !buf.is_empty() {
            current.push(Span::styled(buf, style));
        }
    }
    rows.push(Line::from(current));
    rows
}

/// Display lines wrapped to the transcript pane width. Scroll offsets are
/// applied in rendered-row units, so wrapping must happen first.
pub fn wrapped_display_lines(app: &App, width: u16) -> Vec<Line<'static>> {
    build_display_lines(app)
        .iter()
        .flat_map(|line| wrap_line(line, width))
        .collect()
}
