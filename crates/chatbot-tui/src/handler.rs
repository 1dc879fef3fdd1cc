use chatbot_core::Page;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use crate::app::{App, TextInput};
use crate::tui::AppEvent;

const PAGE_SCROLL: u16 = 10;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
    }
}

fn is_ctrl(key: &KeyEvent, c: char) -> bool {
    key.code == KeyCode::Char(c) && key.modifiers.contains(KeyModifiers::CONTROL)
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work on every page
    if is_ctrl(&key, 'c') {
        app.should_quit = true;
        return;
    }

    match app.session.current_page() {
        Page::Login => handle_login(app, key),
        Page::Signup => handle_signup(app, key),
        Page::Chat if app.show_upload => handle_upload(app, key),
        Page::Chat => handle_chat(app, key),
    }
}

/// Shared line-editing keys. Returns false when the key was not an edit.
fn edit_input(input: &mut TextInput, key: &KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return false;
    }
    match key.code {
        KeyCode::Char(c) => input.insert(c),
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Left => input.left(),
        KeyCode::Right => input.right(),
        KeyCode::Home => input.home(),
        KeyCode::End => input.end(),
        _ => return false,
    }
    true
}

fn handle_login(app: &mut App, key: KeyEvent) {
    if is_ctrl(&key, 'n') {
        app.go_to_signup();
        return;
    }

    match key.code {
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => app.toggle_form_field(),
        KeyCode::Enter => app.submit_login(),
        KeyCode::Esc => app.should_quit = true,
        _ => {
            edit_input(app.focused_input(), &key);
        }
    }
}

fn handle_signup(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => app.toggle_form_field(),
        KeyCode::Enter => app.submit_signup(),
        KeyCode::Esc => app.go_to_login(),
        _ => {
            edit_input(app.focused_input(), &key);
        }
    }
}

fn handle_chat(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('o') => app.open_upload(),
            KeyCode::Char('t') => app.download_text(),
            KeyCode::Char('p') => app.download_pdf(),
            KeyCode::Char('l') => app.clear_chat(),
            KeyCode::Char('q') => app.logout(),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Enter => app.send_message(),
        KeyCode::Esc => app.status = None,
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_up(PAGE_SCROLL),
        KeyCode::PageDown => app.scroll_down(PAGE_SCROLL),
        _ => {
            edit_input(&mut app.chat_input, &key);
        }
    }
}

fn handle_upload(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_upload(),
        KeyCode::Enter => app.submit_upload(),
        _ => {
            edit_input(&mut app.upload_input, &key);
        }
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.session.current_page() != Page::Chat {
        return;
    }
    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}
