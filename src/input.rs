//! Keyboard input handling.
//!
//! Maps terminal key events to [`App`] actions.  Adding a new keybinding is
//! a single match arm in [`handle_key_event`].
//!
//! ## For contributors
//!
//! To add a new keybinding:
//!
//! 1. Add a method on [`App`] for the action (if one doesn't exist).
//! 2. Add a `KeyCode` match arm in [`handle_key_event`] that calls it.
//! 3. Update the help text in `ui::draw_status_bar`.

use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::app::App;
use crate::filter::PostType;

/// Process a single key event, updating app state accordingly.
///
/// Only reacts to key-press events (ignoring release / repeat) so that each
/// physical keypress triggers exactly one action.
pub fn handle_key_event(app: &mut App, key: KeyEvent, now: Instant) {
    if key.kind != KeyEventKind::Press {
        return;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit = true,
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
        KeyCode::Home | KeyCode::Char('g') => app.select_first(),
        KeyCode::End | KeyCode::Char('G') => app.select_last(),
        KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Char('m') => app.load_more(now),
        KeyCode::Char('f') | KeyCode::Tab => app.cycle_filter(now),
        KeyCode::Char(c @ '1'..='5') => {
            let index = c as usize - '1' as usize;
            app.select_filter(PostType::ALL[index].id(), now);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{app_with, options};
    use crate::loader::Affordance;
    use crossterm::event::{KeyEventState, KeyModifiers};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn enter_and_space_activate_load_more() {
        let (mut app, rx) = app_with(None, options());
        handle_key_event(&mut app, press(KeyCode::Enter), Instant::now());
        handle_key_event(&mut app, press(KeyCode::Char(' ')), Instant::now());
        assert_eq!(app.affordance(), Affordance::Busy);
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn digits_pick_filters_in_menu_order() {
        let (mut app, _rx) = app_with(None, options());
        handle_key_event(&mut app, press(KeyCode::Char('5')), Instant::now());
        assert_eq!(app.active_filter(), PostType::Quotes);
        handle_key_event(&mut app, press(KeyCode::Char('1')), Instant::now());
        assert_eq!(app.active_filter(), PostType::All);
    }

    #[test]
    fn f_cycles_filters() {
        let (mut app, _rx) = app_with(None, options());
        handle_key_event(&mut app, press(KeyCode::Char('f')), Instant::now());
        assert_eq!(app.active_filter(), PostType::Article);
    }

    #[test]
    fn releases_are_ignored() {
        let (mut app, _rx) = app_with(None, options());
        let release = KeyEvent {
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
            ..press(KeyCode::Char('q'))
        };
        handle_key_event(&mut app, release, Instant::now());
        assert!(!app.quit);

        handle_key_event(&mut app, press(KeyCode::Char('q')), Instant::now());
        assert!(app.quit);
    }
}
