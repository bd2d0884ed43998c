use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use crate::app::{App, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key).await,
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
    }
    Ok(())
}

async fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.notice.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
            app.dismiss_notice();
        }
        return;
    }

    match app.input_mode {
        InputMode::Chat => handle_chat_key(app, key),
        InputMode::Attach => handle_attach_key(app, key).await,
    }
}

fn handle_chat_key(app: &mut App, key: KeyEvent) {
    let half_page = (app.chat_height / 2).max(1);
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Scrolling works even while input is disabled
    match key.code {
        KeyCode::PageUp => {
            app.scroll_up(half_page);
            return;
        }
        KeyCode::PageDown => {
            app.scroll_down(half_page);
            return;
        }
        KeyCode::Up if ctrl => {
            app.scroll_up(1);
            return;
        }
        KeyCode::Down if ctrl => {
            app.scroll_down(1);
            return;
        }
        KeyCode::End if ctrl => {
            app.scroll_to_bottom();
            return;
        }
        KeyCode::Esc => {
            app.should_quit = true;
            return;
        }
        _ => {}
    }

    if app.input_disabled() {
        return;
    }

    match key.code {
        KeyCode::Char('o') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.open_attach_prompt();
        }
        // Alt+Enter for terminals that cannot report Shift on Enter
        KeyCode::Enter if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) => {
            insert_char(&mut app.input, &mut app.input_cursor, '\n');
        }
        KeyCode::Enter => app.submit_message(),
        _ => edit_line(&mut app.input, &mut app.input_cursor, key),
    }
}

async fn handle_attach_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_attach_prompt(),
        KeyCode::Enter => app.submit_attachment().await,
        _ => edit_line(&mut app.attach_input, &mut app.attach_cursor, key),
    }
}

fn insert_char(buffer: &mut String, cursor: &mut usize, c: char) {
    let byte_pos = char_to_byte_index(buffer, *cursor);
    buffer.insert(byte_pos, c);
    *cursor += 1;
}

/// Cursor movement and editing shared by the message box and attach prompt.
fn edit_line(buffer: &mut String, cursor: &mut usize, key: KeyEvent) {
    match key.code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(buffer, *cursor);
                buffer.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if *cursor < buffer.chars().count() {
                let byte_pos = char_to_byte_index(buffer, *cursor);
                buffer.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            *cursor = cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            *cursor = (*cursor + 1).min(buffer.chars().count());
        }
        KeyCode::Home => {
            *cursor = 0;
        }
        KeyCode::End => {
            *cursor = buffer.chars().count();
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            insert_char(buffer, cursor, c);
        }
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollUp => app.scroll_up(3),
        MouseEventKind::ScrollDown => app.scroll_down(3),
        _ => {}
    }
}
