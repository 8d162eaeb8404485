//! Keyboard and paste handling for the TUI.
//!
//! Terminals deliver a file dragged onto the window as pasted text, so a
//! bracketed paste is treated as a drop on the focused pane.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use duodeck_lib::error::ParameterError;
use duodeck_lib::playback::DeckHandle;

use crate::app::{App, Prompt};

const SCRUB_STEP: f64 = 0.05;
const GAIN_STEP: f32 = 0.05;
const SPEED_STEP: f64 = 0.05;
const REVERB_STEP: f32 = 0.05;

pub const HELP: &str = "tab=deck/library  space=play/stop  ←/→=scrub 5%  g/G=gain  [/]=speed  \
r/R=room  d/D=damp  w/W=wet  y/Y=dry  l=loop  ↑/↓=select  1/2=load  /=search  i=import  \
x=delete  q=quit  drop or paste files onto the focused pane";

/// Poll for one terminal event and apply it. Returns `false` when the app
/// should exit.
pub fn poll_event(app: &mut App) -> bool {
    if event::poll(Duration::from_millis(100)).unwrap_or(false) {
        if let Ok(event) = event::read() {
            return handle_event(app, event);
        }
    }
    true
}

pub fn handle_event(app: &mut App, event: Event) -> bool {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(app, key.code),
        Event::Paste(text) => {
            handle_paste(app, &text);
            true
        }
        _ => true,
    }
}

/// Pasted text goes into an open prompt; otherwise it is a file drop.
pub fn handle_paste(app: &mut App, text: &str) {
    match app.prompt.as_mut() {
        Some(Prompt::Import(line)) => {
            if !line.is_empty() && !line.ends_with(' ') {
                line.push(' ');
            }
            line.push_str(text.trim());
        }
        Some(Prompt::Search(line)) => {
            line.push_str(text.lines().next().unwrap_or_default());
            let line = line.clone();
            app.apply_search(&line);
        }
        None => app.drop_paths(&parse_dropped(text)),
    }
}

/// Apply a key press to the app state. Returns `false` on quit.
pub fn handle_key(app: &mut App, code: KeyCode) -> bool {
    if app.prompt.is_some() {
        edit_prompt(app, code);
        return true;
    }

    match code {
        KeyCode::Char('q') | KeyCode::Esc => {
            for deck in &app.decks {
                deck.stop();
            }
            return false;
        }
        KeyCode::Tab => app.cycle_focus(),
        KeyCode::Up => app.select_previous(),
        KeyCode::Down => app.select_next(),
        KeyCode::Char('1') => app.load_selected_into(0),
        KeyCode::Char('2') => app.load_selected_into(1),
        KeyCode::Char('/') => {
            app.prompt = Some(Prompt::Search(String::new()));
            app.selected = None;
        }
        KeyCode::Char('i') => {
            app.prompt = Some(Prompt::Import(String::new()));
            app.status = "type or paste paths, enter to import".to_string();
        }
        KeyCode::Char('x') | KeyCode::Delete => app.delete_selected(),
        _ => {
            let focused = app
                .focused_deck()
                .map(|(index, deck)| (index, deck.clone()));
            if let Some((index, deck)) = focused {
                deck_key(app, index, &deck, code);
            }
        }
    }
    true
}

fn deck_key(app: &mut App, index: usize, deck: &DeckHandle, code: KeyCode) {
    let outcome = match code {
        KeyCode::Char(' ') => {
            if deck.is_playing() {
                deck.stop();
            } else if !deck.play() {
                app.status = format!("deck {} has nothing loaded", index + 1);
            }
            Ok(())
        }
        KeyCode::Left => scrub(deck, -SCRUB_STEP),
        KeyCode::Right => scrub(deck, SCRUB_STEP),
        KeyCode::Char('g') => deck.set_gain((deck.gain() - GAIN_STEP).max(0.0)),
        KeyCode::Char('G') => deck.set_gain((deck.gain() + GAIN_STEP).min(1.0)),
        KeyCode::Char('[') => deck.set_speed(deck.speed() - SPEED_STEP),
        KeyCode::Char(']') => deck.set_speed(deck.speed() + SPEED_STEP),
        KeyCode::Char(c @ ('r' | 'R' | 'd' | 'D' | 'w' | 'W' | 'y' | 'Y')) => nudge_reverb(deck, c),
        KeyCode::Char('l') | KeyCode::Char('L') => {
            let looping = deck.toggle_looping();
            app.status = format!(
                "deck {} loop {}",
                index + 1,
                if looping { "on" } else { "off" }
            );
            Ok(())
        }
        _ => Ok(()),
    };

    if let Err(err) = outcome {
        app.status = err.to_string();
    }
}

fn edit_prompt(app: &mut App, code: KeyCode) {
    let Some(prompt) = app.prompt.as_mut() else {
        return;
    };
    let line = match prompt {
        Prompt::Search(line) | Prompt::Import(line) => line,
    };
    match code {
        KeyCode::Esc => {
            app.prompt = None;
            return;
        }
        KeyCode::Enter => {
            // Search keeps its selection.
            if let Some(Prompt::Import(line)) = app.prompt.take() {
                app.import_paths(&parse_dropped(&line));
            }
            return;
        }
        KeyCode::Backspace => {
            line.pop();
        }
        KeyCode::Char(c) => line.push(c),
        _ => return,
    }
    if let Some(Prompt::Search(line)) = &app.prompt {
        let line = line.clone();
        app.apply_search(&line);
    }
}

/// Split dropped or pasted text into paths.
///
/// Terminals quote or backslash-escape dropped paths and some send
/// `file://` URIs. Text naming an existing file as a whole is taken as one
/// path, so unescaped names with spaces still work.
pub fn parse_dropped(text: &str) -> Vec<PathBuf> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    let whole = strip_file_uri(trimmed);
    if Path::new(whole).is_file() {
        return vec![PathBuf::from(whole)];
    }

    let mut paths = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut chars = trimmed.chars();
    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some('"'), '\\') | (None, '\\') => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
                in_token = true;
            }
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                in_token = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_token {
                    paths.push(PathBuf::from(strip_file_uri(&current)));
                    current.clear();
                    in_token = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_token = true;
            }
        }
    }
    if in_token {
        paths.push(PathBuf::from(strip_file_uri(&current)));
    }
    paths
}

fn strip_file_uri(text: &str) -> &str {
    text.strip_prefix("file://").unwrap_or(text)
}

fn scrub(deck: &DeckHandle, delta: f64) -> Result<(), ParameterError> {
    let relative = deck.position_relative();
    if !relative.is_finite() {
        return Ok(());
    }
    deck.set_position_relative((relative + delta).clamp(0.0, 1.0))
}

fn nudge_reverb(deck: &DeckHandle, key: char) -> Result<(), ParameterError> {
    let params = deck.reverb_parameters();
    let step = if key.is_uppercase() {
        REVERB_STEP
    } else {
        -REVERB_STEP
    };
    let next = |value: f32| (value + step).clamp(0.0, 1.0);
    match key.to_ascii_lowercase() {
        'r' => deck.set_room_size(next(params.room_size)),
        'd' => deck.set_damping(next(params.damping)),
        'w' => deck.set_wet_level(next(params.wet_level)),
        _ => deck.set_dry_level(next(params.dry_level)),
    }
}
