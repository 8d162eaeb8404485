//! TUI state shared by key handling and drawing.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use duodeck_lib::audio::AudioDecoder;
use duodeck_lib::constants::DECK_COUNT;
use duodeck_lib::diagnostics::DeckReport;
use duodeck_lib::library::{title_for, Library};
use duodeck_lib::playback::DeckHandle;
use log::info;

pub type SharedReports = Arc<Mutex<[Option<DeckReport>; DECK_COUNT]>>;

/// Pane receiving keys and dropped files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Deck(usize),
    Library,
}

/// Line being edited under the decks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    Search(String),
    /// Paths to import, typed or pasted.
    Import(String),
}

pub struct App {
    pub decks: [DeckHandle; DECK_COUNT],
    pub library: Library,
    pub focus: Focus,
    /// Selected library row.
    pub selected: Option<usize>,
    pub prompt: Option<Prompt>,
    /// Last message shown under the decks.
    pub status: String,
    decoder: Arc<dyn AudioDecoder>,
    reports: SharedReports,
}

impl App {
    pub fn new(
        decks: [DeckHandle; DECK_COUNT],
        library: Library,
        decoder: Arc<dyn AudioDecoder>,
        reports: SharedReports,
    ) -> Self {
        let selected = if library.is_empty() { None } else { Some(0) };
        Self {
            decks,
            library,
            focus: Focus::Deck(0),
            selected,
            prompt: None,
            status: String::new(),
            decoder,
            reports,
        }
    }

    /// Deck receiving transport and parameter keys, if a deck has focus.
    pub fn focused_deck(&self) -> Option<(usize, &DeckHandle)> {
        match self.focus {
            Focus::Deck(index) => self.decks.get(index).map(|deck| (index, deck)),
            Focus::Library => None,
        }
    }

    /// Deck 1, deck 2, then the library.
    pub fn cycle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Deck(index) if index + 1 < DECK_COUNT => Focus::Deck(index + 1),
            Focus::Deck(_) => Focus::Library,
            Focus::Library => Focus::Deck(0),
        };
    }

    /// Latest poller report for `deck`.
    pub fn report(&self, deck: usize) -> Option<DeckReport> {
        let reports = self.reports.lock().unwrap_or_else(PoisonError::into_inner);
        reports.get(deck).cloned().flatten()
    }

    pub fn select_next(&mut self) {
        if self.library.is_empty() {
            self.selected = None;
            return;
        }
        let last = self.library.len() - 1;
        self.selected = Some(self.selected.map_or(0, |row| (row + 1).min(last)));
    }

    pub fn select_previous(&mut self) {
        if self.library.is_empty() {
            self.selected = None;
            return;
        }
        self.selected = Some(self.selected.map_or(0, |row| row.saturating_sub(1)));
    }

    /// Select the first title containing `text`; empty text clears the
    /// selection.
    pub fn apply_search(&mut self, text: &str) {
        self.selected = self.library.find(text);
    }

    /// Load the selected library row into `deck`.
    pub fn load_selected_into(&mut self, deck: usize) {
        let Some(track) = self.selected.and_then(|row| self.library.get(row)) else {
            self.status = "select a track to add to the deck".to_string();
            return;
        };
        let Some(handle) = self.decks.get(deck) else {
            return;
        };
        info!("adding {} to deck {}", track.title, deck + 1);
        self.status = match handle.load(&track.path) {
            Ok(()) => format!("deck {}: {}", deck + 1, track.title),
            Err(err) => err.to_string(),
        };
    }

    /// Remove the selected library row.
    pub fn delete_selected(&mut self) {
        let Some(row) = self.selected else {
            return;
        };
        match self.library.remove(row) {
            Ok(track) => {
                self.status = format!("{} removed from library", track.title);
                self.selected = if self.library.is_empty() {
                    None
                } else {
                    Some(row.min(self.library.len() - 1))
                };
            }
            Err(err) => self.status = err.to_string(),
        }
    }

    /// Add files to the library and select the last one added.
    pub fn import_paths(&mut self, paths: &[PathBuf]) {
        if paths.is_empty() {
            self.status = "nothing to import".to_string();
            return;
        }
        let report = self.library.import(paths, self.decoder.as_ref());
        if let Some(title) = report.added.last() {
            self.selected = self
                .library
                .tracks()
                .iter()
                .position(|track| &track.title == title);
        }
        let mut status = format!("imported {}", report.added.len());
        if !report.duplicates.is_empty() {
            status.push_str(&format!(", {} already in library", report.duplicates.len()));
        }
        if !report.failed.is_empty() {
            status.push_str(&format!(", {} failed", report.failed.len()));
        }
        self.status = status;
    }

    /// Files dropped on the focused pane. A deck takes exactly one file; the
    /// library imports all of them.
    pub fn drop_paths(&mut self, paths: &[PathBuf]) {
        let Focus::Deck(index) = self.focus else {
            self.import_paths(paths);
            return;
        };
        let Some(deck) = self.decks.get(index) else {
            return;
        };
        self.status = match deck.load_dropped(paths) {
            Ok(true) => format!(
                "deck {}: {}",
                index + 1,
                paths.first().map(|path| title_for(path)).unwrap_or_default()
            ),
            Ok(false) => format!("deck {} takes a single file", index + 1),
            Err(err) => err.to_string(),
        };
    }
}
