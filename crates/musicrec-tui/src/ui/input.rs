//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes.

use crossterm::event::{KeyCode, KeyEvent};

use crate::app::{App, AppState, BatchRequest, Screen, PAGE_SCROLL_SIZE};

/// Handle keyboard input. Returns true if the app should quit.
pub fn handle_input(app: &mut App, key: KeyEvent) -> bool {
    // Handle help overlay
    if matches!(app.state, AppState::ShowingHelp) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.state = AppState::Normal;
        }
        return false;
    }

    // Handle quit confirmation
    if matches!(app.state, AppState::ConfirmingQuit) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.state = AppState::Quitting;
                return true;
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = AppState::Normal;
            }
            _ => {}
        }
        return false;
    }

    // Global keys
    match key.code {
        KeyCode::Char('q') => {
            app.state = AppState::ConfirmingQuit;
            return false;
        }
        KeyCode::Char('?') => {
            app.state = AppState::ShowingHelp;
            return false;
        }
        _ => {}
    }

    match app.screen {
        Screen::Login => handle_login_input(app, key),
        Screen::Callback => handle_callback_input(app, key),
        Screen::Dashboard => handle_dashboard_input(app, key),
    }
    false
}

fn handle_login_input(app: &mut App, key: KeyEvent) {
    if matches!(key.code, KeyCode::Enter | KeyCode::Char('l')) {
        app.start_login();
    }
}

fn handle_callback_input(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Esc {
        app.cancel_login();
    }
}

fn handle_dashboard_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.select_previous(1),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(1),
        KeyCode::PageUp => app.select_previous(PAGE_SCROLL_SIZE),
        KeyCode::PageDown => app.select_next(PAGE_SCROLL_SIZE),
        KeyCode::Home => app.selection = 0,
        KeyCode::End => app.select_next(app.tracks.len()),

        KeyCode::Char('g') => app.request_batch(BatchRequest::Generate),
        KeyCode::Char('n') | KeyCode::Right => app.request_batch(BatchRequest::Next),
        KeyCode::Char('p') | KeyCode::Left => app.request_batch(BatchRequest::Previous),
        KeyCode::Char('l') => app.submit_feedback(true),
        KeyCode::Char('s') => app.submit_feedback(false),
        KeyCode::Char('o') | KeyCode::Enter => app.open_selected_track(),
        KeyCode::Char('e') => app.expand_dataset(),
        KeyCode::Char('r') => app.refresh_stats(),
        KeyCode::Char('x') => app.logout(),
        _ => {}
    }
}
