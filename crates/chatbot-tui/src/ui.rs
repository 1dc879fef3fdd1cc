use chatbot_core::{ChatRole, Page};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, FormField, StatusKind, TextInput};

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;
            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(bold_text, Style::default().add_modifier(Modifier::BOLD)));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, status, footer
    let [header_area, body_area, status_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.session.current_page() {
        Page::Login => render_login_page(app, frame, body_area),
        Page::Signup => render_signup_page(app, frame, body_area),
        Page::Chat => render_chat_page(app, frame, body_area),
    }

    render_status(app, frame, status_area);
    render_footer(app, frame, footer_area);

    if app.show_upload && app.session.current_page() == Page::Chat {
        render_upload_popup(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let user = if app.session.authenticated {
        format!(" [{}]", app.session.username)
    } else {
        String::new()
    };

    let title = Line::from(vec![
        Span::styled(" Chatbot ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(format!("· {}", app.page_title()), Style::default().fg(Color::White)),
        Span::styled(user, Style::default().fg(Color::Green)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_status(app: &App, frame: &mut Frame, area: Rect) {
    let Some(status) = &app.status else {
        return;
    };

    let color = match status.kind {
        StatusKind::Info => Color::Blue,
        StatusKind::Success => Color::Green,
        StatusKind::Error => Color::Red,
    };
    let line = Paragraph::new(format!(" {}", status.text)).style(Style::default().fg(color));
    frame.render_widget(line, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let keys: &[(&str, &str)] = match app.session.current_page() {
        Page::Login => &[
            (" Tab ", " field "),
            (" Enter ", " login "),
            (" ^N ", " sign up "),
            (" Esc ", " quit "),
        ],
        Page::Signup => &[
            (" Tab ", " field "),
            (" Enter ", " sign up "),
            (" Esc ", " back to login "),
        ],
        Page::Chat if app.show_upload => &[(" Enter ", " attach "), (" Esc ", " cancel ")],
        Page::Chat => &[
            (" Enter ", " send "),
            (" ^O ", " image "),
            (" ^T ", " txt "),
            (" ^P ", " pdf "),
            (" ^L ", " clear "),
            (" ^Q ", " logout "),
            (" ^C ", " quit "),
        ],
    };

    let (mode_text, mode_style) = match app.session.current_page() {
        Page::Chat => (" CHAT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
        _ => (" ACCOUNT ", Style::default().bg(Color::Blue).fg(Color::White)),
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    for (key, label) in keys {
        spans.push(Span::styled(*key, key_style));
        spans.push(Span::styled(*label, label_style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Render a single-line input box, scrolled so the cursor stays visible.
fn render_input(frame: &mut Frame, area: Rect, input: &TextInput, title: &str, focused: bool, masked: bool) {
    let border_color = if focused { Color::Yellow } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" {} ", title));

    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width > 0 && input.cursor >= inner_width {
        input.cursor - inner_width + 1
    } else {
        0
    };

    let visible_text: String = input
        .value
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .map(|c| if masked { '*' } else { c })
        .collect();

    let paragraph = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);
    frame.render_widget(paragraph, area);

    if focused {
        let cursor_x = (input.cursor - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

/// Two-column account page: form on the left, a pointer to the other page on the right.
fn render_account_page(
    app: &App,
    frame: &mut Frame,
    area: Rect,
    heading: &str,
    labels: (&str, &str),
    aside: (&str, &str, &str),
) {
    let [form_area, aside_area] =
        Layout::horizontal([Constraint::Ratio(2, 3), Constraint::Ratio(1, 3)]).areas(area);

    let form_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" {} ", heading));
    let inner = form_block.inner(form_area);
    frame.render_widget(form_block, form_area);

    let [_, username_area, password_area, _] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .areas(inner);

    render_input(
        frame,
        username_area,
        &app.username_input,
        labels.0,
        app.form_field == FormField::Username,
        false,
    );
    render_input(
        frame,
        password_area,
        &app.password_input,
        labels.1,
        app.form_field == FormField::Password,
        true,
    );

    let (title, body, hint) = aside;
    let aside_text = Text::from(vec![
        Line::default(),
        Line::from(Span::styled(body.to_string(), Style::default().fg(Color::White))),
        Line::default(),
        Line::from(Span::styled(hint.to_string(), Style::default().fg(Color::Yellow).bold())),
    ]);
    let aside_widget = Paragraph::new(aside_text)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(format!(" {} ", title)),
        );
    frame.render_widget(aside_widget, aside_area);
}

fn render_login_page(app: &App, frame: &mut Frame, area: Rect) {
    render_account_page(
        app,
        frame,
        area,
        "Login to Your Account",
        ("Username", "Password"),
        (
            "New Here?",
            "Sign up and discover a great amount of new opportunities!",
            "Press Ctrl-N to sign up",
        ),
    );
}

fn render_signup_page(app: &App, frame: &mut Frame, area: Rect) {
    render_account_page(
        app,
        frame,
        area,
        "Signup for Chatbot",
        ("Choose a username", "Choose a password"),
        (
            "Already have an account?",
            "Log in to pick up where you left off.",
            "Press Esc to go to login",
        ),
    );
}

fn render_chat_page(app: &mut App, frame: &mut Frame, area: Rect) {
    let [sidebar_area, main_area] =
        Layout::horizontal([Constraint::Length(32), Constraint::Min(0)]).areas(area);

    render_sidebar(app, frame, sidebar_area);

    let [chat_area, input_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(main_area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" Gemini: {} ", app.model_name));

    let user_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let ai_style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let dim = Style::default().fg(Color::DarkGray);

    let chat_text = if app.session.messages.is_empty() && !app.is_loading() {
        let mut lines = vec![Line::from(Span::styled(
            "Ask anything, or press Ctrl-O to start with an image...",
            dim,
        ))];
        if let Some(image) = &app.session.pending_image {
            lines.push(Line::from(Span::styled(format!("Attached: {}", image.name), dim)));
        }
        Text::from(lines)
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in &app.session.messages {
            let style = match msg.role {
                ChatRole::User => user_style,
                ChatRole::Assistant => ai_style,
            };
            lines.push(Line::from(Span::styled(App::role_label(msg.role), style)));
            if let Some(image) = &msg.image {
                lines.push(Line::from(Span::styled(format!("[image: {}]", image.name), dim)));
            }
            match msg.role {
                ChatRole::User => {
                    for line in msg.content.lines() {
                        lines.push(Line::from(line.to_string()));
                    }
                }
                ChatRole::Assistant => {
                    for line in msg.content.lines() {
                        lines.push(parse_markdown_line(line));
                    }
                }
            }
            lines.push(Line::default());
        }

        if let Some(prompt) = &app.pending_prompt {
            lines.push(Line::from(Span::styled("You:", user_style)));
            lines.push(Line::from(prompt.clone()));
            lines.push(Line::default());
            lines.push(Line::from(Span::styled("AI:", ai_style)));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                dim.add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    let input_title = if app.session.pending_image.is_some() {
        "Type your message here (image attached)"
    } else {
        "Type your message here"
    };
    render_input(
        frame,
        input_area,
        &app.chat_input,
        input_title,
        !app.show_upload,
        false,
    );
}

fn render_sidebar(app: &App, frame: &mut Frame, area: Rect) {
    let key = Style::default().fg(Color::Yellow).bold();
    let enabled = Style::default().fg(Color::White);
    let disabled = Style::default().fg(Color::DarkGray);

    let download_style = if app.downloads_enabled() { enabled } else { disabled };

    let mut lines = vec![
        Line::from(Span::styled("Upload an image", Style::default().bold())),
        Line::from(vec![Span::styled("^O ", key), Span::styled("jpg, jpeg, png", enabled)]),
        Line::default(),
        Line::from(Span::styled("Download history", Style::default().bold())),
        Line::from(vec![Span::styled("^T ", key), Span::styled("as text", download_style)]),
        Line::from(vec![Span::styled("^P ", key), Span::styled("as PDF", download_style)]),
    ];
    if !app.downloads_enabled() {
        lines.push(Line::from(Span::styled("Start a chat to enable downloads.", disabled)));
    }
    lines.extend([
        Line::default(),
        Line::from(vec![Span::styled("^L ", key), Span::styled("Clear chat", enabled)]),
        Line::from(vec![Span::styled("^Q ", key), Span::styled("Log out", enabled)]),
    ]);

    if let Some(image) = &app.session.pending_image {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled("Pending image", Style::default().bold())));
        lines.push(Line::from(Span::styled(image.name.clone(), Style::default().fg(Color::Green))));
    }

    let sidebar = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Chat Options "),
    );
    frame.render_widget(sidebar, area);
}

fn render_upload_popup(app: &App, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 60.min(area.width.saturating_sub(4));
    let popup_height = 3;

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    render_input(
        frame,
        popup_area,
        &app.upload_input,
        "Image path (jpg, jpeg, png)",
        true,
        false,
    );
}
