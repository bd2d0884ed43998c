use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use docchat_core::markup::{self, Block as MarkupBlock, Inline};
use docchat_core::ChatRole;
use crate::app::{App, InputMode};

/// Maximum number of text rows shown in the message box
const MAX_INPUT_ROWS: u16 = 4;

/// Convert message content into styled lines via the markup renderer.
/// Text only ever becomes spans, so nothing in a reply is interpreted as
/// anything but the recognized constructs.
pub fn content_lines(content: &str) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for block in markup::render(content) {
        match block {
            MarkupBlock::Paragraph(spans) => lines.push(Line::from(styled_spans(spans))),
            MarkupBlock::List(items) => {
                for item in items {
                    let mut spans = vec![Span::styled("  • ", Style::default().fg(Color::DarkGray))];
                    spans.extend(styled_spans(item));
                    lines.push(Line::from(spans));
                }
            }
            MarkupBlock::LineBreak => lines.push(Line::default()),
        }
    }

    lines
}

fn styled_spans(spans: Vec<Inline>) -> Vec<Span<'static>> {
    spans
        .into_iter()
        .map(|span| match span {
            Inline::Text(text) => Span::raw(text),
            Inline::Strong(text) => Span::styled(text, Style::default().add_modifier(Modifier::BOLD)),
            Inline::Code(text) => Span::styled(text, Style::default().fg(Color::LightGreen).bg(Color::Black)),
            Inline::Emphasis(text) => Span::styled(text, Style::default().add_modifier(Modifier::ITALIC)),
        })
        .collect()
}

/// Word-wrap styled lines to `width` columns, keeping span styles.
/// The chat view draws the result unwrapped, so its row count is exact.
fn wrap_lines(lines: Vec<Line<'static>>, width: u16) -> Vec<Line<'static>> {
    let width = width.max(1) as usize;
    lines.into_iter().flat_map(|line| wrap_line(line, width)).collect()
}

fn wrap_line(line: Line<'static>, width: usize) -> Vec<Line<'static>> {
    let mut rows: Vec<Line<'static>> = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut current_len = 0;
    // Whitespace waiting for a following word on the same row
    let mut pending: Vec<Span<'static>> = Vec::new();
    let mut pending_len = 0;

    for span in line.spans {
        let style = span.style;
        for (is_space, chunk) in whitespace_runs(&span.content) {
            let len = chunk.chars().count();

            if is_space {
                // leading whitespace is kept only on the first row
                if current_len == 0 && !rows.is_empty() {
                    continue;
                }
                pending.push(Span::styled(chunk.to_string(), style));
                pending_len += len;
                continue;
            }

            // Words wider than a whole row start where they are and get split below
            if current_len > 0 && len <= width && current_len + pending_len + len > width {
                rows.push(Line::from(std::mem::take(&mut current)));
                current_len = 0;
                pending.clear();
                pending_len = 0;
            }
            current.append(&mut pending);
            current_len += pending_len;
            pending_len = 0;

            // Hard-split words wider than the remaining row
            let mut word = chunk;
            loop {
                let room = width.saturating_sub(current_len);
                let word_len = word.chars().count();
                if word_len <= room {
                    current.push(Span::styled(word.to_string(), style));
                    current_len += word_len;
                    break;
                }
                if room > 0 {
                    let split = word.char_indices().nth(room).map_or(word.len(), |(i, _)| i);
                    current.push(Span::styled(word[..split].to_string(), style));
                    word = &word[split..];
                }
                rows.push(Line::from(std::mem::take(&mut current)));
                current_len = 0;
            }
        }
    }

    if !current.is_empty() || rows.is_empty() {
        rows.push(Line::from(current));
    }
    rows
}

/// Split `s` into alternating runs of whitespace and non-whitespace.
fn whitespace_runs(s: &str) -> Vec<(bool, &str)> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut in_space = None;

    for (i, c) in s.char_indices() {
        let is_space = c.is_whitespace();
        match in_space {
            Some(prev) if prev != is_space => {
                runs.push((prev, &s[start..i]));
                start = i;
            }
            _ => {}
        }
        in_space = Some(is_space);
    }
    if let Some(prev) = in_space {
        runs.push((prev, &s[start..]));
    }
    runs
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let banners = banner_lines(app);
    let input_rows = (app.input.split('\n').count() as u16).clamp(1, MAX_INPUT_ROWS);

    let [header_area, banner_area, body_area, input_area, disclaimer_area, footer_area] =
        Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(banners.len() as u16),
            Constraint::Min(0),
            Constraint::Length(input_rows + 2),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(area);

    render_header(app, frame, header_area);
    frame.render_widget(Paragraph::new(banners), banner_area);

    if app.conversation.messages().is_empty() && !app.conversation.is_loading() {
        render_welcome(app, frame, body_area);
    } else {
        render_chat(app, frame, body_area);
    }

    render_input(app, frame, input_area, input_rows);

    let disclaimer = Paragraph::new("AI can make mistakes. Please double-check responses.")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(disclaimer, disclaimer_area);

    render_footer(app, frame, footer_area);

    // Popups (notice has priority)
    if let Some(notice) = app.notice.clone() {
        render_notice(&notice, frame, area);
    } else if app.input_mode == InputMode::Attach {
        render_attach_prompt(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let doc_indicator = match &app.conversation.session().doc_name {
        Some(name) => format!(" [{}]", name),
        None => String::new(),
    };

    let title = Line::from(vec![
        Span::styled(" DocChat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(doc_indicator, Style::default().fg(Color::White)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

/// Most recent error and the upload progress notice, one row each.
fn banner_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    if let Some(error) = app.conversation.error() {
        lines.push(Line::from(Span::styled(
            format!(" {} ", error),
            Style::default().fg(Color::White).bg(Color::Red),
        )));
    }

    if app.conversation.is_uploading() {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!(" Processing document{} ", dots),
            Style::default().fg(Color::White).bg(Color::Blue),
        )));
    }

    lines
}

fn render_welcome(app: &App, frame: &mut Frame, area: Rect) {
    let mut lines = vec![
        Line::from(Span::styled(
            "How can I help you today?",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(Span::styled(
            "Attach a PDF, DOCX, or TXT document with Ctrl+O, then ask anything about it.",
            Style::default().fg(Color::Gray),
        )),
    ];

    if let Some(name) = &app.conversation.session().doc_name {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            format!("Document loaded: {}", name),
            Style::default().fg(Color::Green),
        )));
    }

    let height = lines.len() as u16;
    let [_, centered, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(height),
        Constraint::Fill(1),
    ])
    .areas(area);

    let welcome = Paragraph::new(Text::from(lines))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(welcome, centered);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation ");

    let mut lines: Vec<Line<'static>> = Vec::new();

    for msg in app.conversation.messages().iter() {
        let label = match msg.role {
            ChatRole::User => Span::styled(
                "You:",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            ChatRole::Assistant => Span::styled(
                "AI:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
        };
        lines.push(Line::from(label));
        lines.extend(content_lines(&msg.content));
        lines.push(Line::default());
    }

    if app.conversation.is_loading() {
        lines.push(Line::from(Span::styled(
            "AI:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let inner = block.inner(area);
    let lines = wrap_lines(lines, inner.width);
    app.update_scroll(lines.len().min(u16::MAX as usize) as u16, inner.height);

    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect, rows: u16) {
    let disabled = app.input_disabled();
    let focused = app.input_mode == InputMode::Chat && app.notice.is_none() && !disabled;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Message ");

    let (text, style) = if disabled {
        let status = if app.conversation.is_uploading() {
            "Processing document..."
        } else {
            "Waiting for response..."
        };
        (status.to_string(), Style::default().fg(Color::DarkGray))
    } else if app.input.is_empty() {
        ("Ask anything".to_string(), Style::default().fg(Color::DarkGray))
    } else {
        (app.input.clone(), Style::default())
    };

    // Cursor row/column within the (possibly multi-line) input
    let before: String = app.input.chars().take(app.input_cursor).collect();
    let cursor_row = before.matches('\n').count() as u16;
    let cursor_col = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) as u16;
    let scroll = cursor_row.saturating_sub(rows.saturating_sub(1));

    let input = Paragraph::new(text)
        .style(style)
        .block(block)
        .scroll((scroll, 0));
    frame.render_widget(input, area);

    if focused {
        frame.set_cursor_position(Position::new(
            area.x + 1 + cursor_col.min(area.width.saturating_sub(3)),
            area.y + 1 + cursor_row - scroll,
        ));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Chat => (" CHAT ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Attach => (" ATTACH ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = if app.notice.is_some() {
        vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" dismiss ", label_style),
        ]
    } else {
        match app.input_mode {
            InputMode::Chat => {
                let mut hints = Vec::new();
                if !app.input_disabled() {
                    hints.extend(vec![
                        Span::styled(" Enter ", key_style),
                        Span::styled(" send ", label_style),
                        Span::styled(" Alt+Enter ", key_style),
                        Span::styled(" newline ", label_style),
                        Span::styled(" Ctrl+O ", key_style),
                        Span::styled(" attach ", label_style),
                    ]);
                }
                hints.extend(vec![
                    Span::styled(" PgUp/PgDn ", key_style),
                    Span::styled(" scroll ", label_style),
                    Span::styled(" Esc ", key_style),
                    Span::styled(" quit ", label_style),
                ]);
                hints
            }
            InputMode::Attach => vec![
                Span::styled(" Enter ", key_style),
                Span::styled(" upload ", label_style),
                Span::styled(" Esc ", key_style),
                Span::styled(" cancel ", label_style),
            ],
        }
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_attach_prompt(app: &App, frame: &mut Frame, area: Rect) {
    let popup = centered_rect(area, 70, 3);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Attach document (PDF, DOCX, TXT) - path ");

    let input = Paragraph::new(app.attach_input.as_str()).block(block);
    frame.render_widget(input, popup);

    let col = app.attach_cursor.min(popup.width.saturating_sub(3) as usize) as u16;
    frame.set_cursor_position(Position::new(popup.x + 1 + col, popup.y + 1));
}

fn render_notice(notice: &str, frame: &mut Frame, area: Rect) {
    let popup = centered_rect(area, 50, 6);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Notice ");

    let text = Text::from(vec![
        Line::from(notice.to_string()),
        Line::default(),
        Line::from(Span::styled("Press Enter to continue", Style::default().fg(Color::DarkGray))),
    ]);

    let paragraph = Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, popup);
}

/// A rect `percent_x` wide and `height` rows tall, centered in `area`.
fn centered_rect(area: Rect, percent_x: u16, height: u16) -> Rect {
    let [_, middle, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(height),
        Constraint::Fill(1),
    ])
    .areas(area);
    let [_, center, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(middle);
    center
}

#[cfg(test)]
mod tests {
    use super::*;
    use docchat_core::{ChatReply, DocChatClient, UploadResponse};
    use ratatui::{backend::TestBackend, Terminal};

    fn screen_text(app: &mut App) -> String {
        screen_text_sized(app, 100, 30)
    }

    fn screen_text_sized(app: &mut App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn app() -> App {
        App::new(DocChatClient::new("http://127.0.0.1:9"))
    }

    #[test]
    fn test_content_lines_styles_spans() {
        let lines = content_lines("Use **care** with `rm`\n- first *item*");
        assert_eq!(lines.len(), 2);

        let first = &lines[0];
        assert_eq!(first.spans[1].content, "care");
        assert!(first.spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(first.spans[3].content, "rm");

        // list items keep asterisks literally
        let item: String = lines[1].spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(item, "  • first *item*");
    }

    #[test]
    fn test_markup_in_reply_is_literal() {
        let lines = content_lines("<b>not bold</b>");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].spans[0].content, "<b>not bold</b>");
    }

    fn row_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_wrap_line_breaks_at_words_and_keeps_styles() {
        let line = Line::from(vec![
            Span::raw("alpha beta "),
            Span::styled("gamma", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" delta"),
        ]);
        let rows = wrap_line(line, 11);
        let texts: Vec<_> = rows.iter().map(row_text).collect();
        assert_eq!(texts, vec!["alpha beta", "gamma delta"]);
        assert!(rows[1].spans[0].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_wrap_line_keeps_indent_and_splits_long_words() {
        let rows = wrap_line(Line::from("  • abcdefghijkl"), 6);
        let texts: Vec<_> = rows.iter().map(row_text).collect();
        assert_eq!(texts, vec!["  • ab", "cdefgh", "ijkl"]);

        assert_eq!(wrap_line(Line::default(), 10).len(), 1);
    }

    #[test]
    fn test_long_reply_end_is_reachable() {
        let mut app = app();
        app.conversation.finish_upload(Ok(UploadResponse {
            session_id: "s".to_string(),
            doc_name: "handbook.pdf".to_string(),
            message: None,
        }));
        let pending = app.conversation.begin_send("summarize").unwrap();
        let mut reply: Vec<String> = (0..60).map(|n| format!("wordnumber{:02}x", n)).collect();
        reply.push("ENDMARKER".to_string());
        app.conversation.finish_send(
            &pending,
            Ok(ChatReply {
                response: reply.join(" "),
                session_id: None,
            }),
        );

        let mut text = String::new();
        for _ in 0..3 {
            app.scroll_down(1000);
            text = screen_text_sized(&mut app, 40, 20);
        }
        assert!(text.contains("ENDMARKER"));
    }

    #[test]
    fn test_welcome_screen_shows_loaded_document() {
        let mut app = app();
        let text = screen_text(&mut app);
        assert!(text.contains("How can I help you today?"));
        assert!(text.contains("Ask anything"));
        assert!(!text.contains("Document loaded"));

        app.conversation.finish_upload(Ok(UploadResponse {
            session_id: "s".to_string(),
            doc_name: "handbook.pdf".to_string(),
            message: None,
        }));
        let text = screen_text(&mut app);
        assert!(text.contains("Document loaded: handbook.pdf"));
    }

    #[test]
    fn test_chat_screen_renders_messages_and_error() {
        let mut app = app();
        app.conversation.finish_upload(Ok(UploadResponse {
            session_id: "s".to_string(),
            doc_name: "handbook.pdf".to_string(),
            message: None,
        }));
        let pending = app.conversation.begin_send("what changed?").unwrap();
        let text = screen_text(&mut app);
        assert!(text.contains("You:"));
        assert!(text.contains("Thinking"));
        assert!(text.contains("Waiting for response..."));

        app.conversation.finish_send(
            &pending,
            Ok(ChatReply {
                response: "- **Leave** policy".to_string(),
                session_id: None,
            }),
        );
        app.conversation.set_error("Failed to get response");
        let text = screen_text(&mut app);
        assert!(text.contains("• Leave policy"));
        assert!(text.contains("Failed to get response"));
    }

    #[test]
    fn test_notice_popup_rendered() {
        let mut app = app();
        app.notice = Some("Please upload a PDF, DOCX, or TXT file.".to_string());
        let text = screen_text(&mut app);
        assert!(text.contains("Notice"));
        assert!(text.contains("Press Enter to continue"));
    }
}
