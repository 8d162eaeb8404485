use std::{
    io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
    thread::sleep,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::ArgMatches;
use crossterm::{
    cursor,
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{info, warn};
use ratatui::{backend::CrosstermBackend, Terminal};

use duodeck_lib::audio::{AudioDecoder, SymphoniaDecoder};
use duodeck_lib::diagnostics::DeckPoller;
use duodeck_lib::library::Library;
use duodeck_lib::playback::{DeckHandle, DeckMixer, DeckSettings, EngineConfig};

use crate::app::{App, SharedReports};
use crate::logging::{self, LogBuffer};
use crate::{cli, controls, ui};

pub fn run(args: &ArgMatches, log_buffer: LogBuffer) -> Result<i32> {
    let library_path = args
        .get_one::<String>("library")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(cli::args::DEFAULT_LIBRARY));

    if let Some(code) = cli::library::maybe_run_library(args, &library_path)? {
        return Ok(code);
    }
    if let Some(code) = cli::info::maybe_run_info(args)? {
        return Ok(code);
    }
    if let Some(code) = cli::create::maybe_run_create(args)? {
        return Ok(code);
    }

    info!("Starting duodeck");
    let quiet = args.get_flag("quiet");
    let library = if quiet {
        None
    } else {
        let library = Library::load(&library_path)
            .with_context(|| format!("reading {}", library_path.display()))?;
        Some(library)
    };

    let config = engine_config(args);
    let decoder: Arc<dyn AudioDecoder> = Arc::new(SymphoniaDecoder::new());
    let mixer = DeckMixer::new(decoder.clone());
    let decks = mixer.handles();

    if let Some(path) = args.get_one::<String>("settings") {
        let settings = DeckSettings::from_path(Path::new(path))
            .with_context(|| format!("failed to read settings {}", path))?;
        for deck in &decks {
            for err in settings.apply(deck) {
                warn!("settings: {}", err);
            }
        }
    }

    for (index, id) in ["deck1", "deck2"].iter().enumerate() {
        if let Some(path) = args.get_one::<String>(id) {
            decks[index].load(Path::new(path))?;
        }
    }

    let _output = open_output(mixer, &config)?;

    let reports: SharedReports = Arc::new(Mutex::new([None, None]));
    let poller = {
        let reports = reports.clone();
        DeckPoller::new(
            decks.clone(),
            move |report| {
                let mut reports = reports.lock().unwrap_or_else(PoisonError::into_inner);
                let deck = report.deck;
                if let Some(slot) = reports.get_mut(deck) {
                    *slot = Some(report);
                }
            },
            Duration::from_millis(config.tick_interval_ms),
        )
    };
    poller.start();

    let code = match library {
        None => run_headless(&decks),
        Some(library) => {
            let mut app = App::new(decks.clone(), library, decoder, reports);
            run_tui(&mut app, &log_buffer);
            if let Err(err) = app.library.save(&library_path) {
                warn!("failed to save {}: {}", library_path.display(), err);
            }
            0
        }
    };

    poller.stop();
    for deck in &decks {
        deck.stop();
    }
    Ok(code)
}

fn engine_config(args: &ArgMatches) -> EngineConfig {
    let defaults = EngineConfig::default();
    EngineConfig {
        block_size: args
            .get_one::<usize>("block-size")
            .copied()
            .unwrap_or(defaults.block_size),
        sample_rate: args
            .get_one::<u32>("sample-rate")
            .copied()
            .unwrap_or(defaults.sample_rate),
        tick_interval_ms: args
            .get_one::<u64>("tick-ms")
            .copied()
            .unwrap_or(defaults.tick_interval_ms),
    }
}

#[cfg(feature = "device")]
fn open_output(
    mixer: DeckMixer,
    config: &EngineConfig,
) -> Result<duodeck_lib::playback::OutputDevice> {
    Ok(duodeck_lib::playback::OutputDevice::open(mixer, config)?)
}

#[cfg(not(feature = "device"))]
fn open_output(_mixer: DeckMixer, _config: &EngineConfig) -> Result<()> {
    anyhow::bail!("built without the `device` feature; playback is unavailable")
}

/// Play whatever is loaded until no deck is playing.
fn run_headless(decks: &[DeckHandle]) -> i32 {
    let mut started = false;
    for deck in decks {
        started |= deck.play();
    }
    if !started {
        warn!("nothing loaded; pass --deck1 or --deck2");
        return 1;
    }
    while decks.iter().any(DeckHandle::is_playing) {
        sleep(Duration::from_millis(50));
    }
    0
}

fn run_tui(app: &mut App, log_buffer: &LogBuffer) {
    let _stderr_capture = logging::capture_stderr(log_buffer.clone());
    let _raw_mode = RawModeGuard::enable().ok();
    let mut stdout = io::stdout();
    let _ = execute!(stdout, EnterAlternateScreen, EnableBracketedPaste, cursor::Hide);
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout)).ok();

    loop {
        if let Some(term) = terminal.as_mut() {
            let log_lines = logging::snapshot(log_buffer);
            ui::draw(term, app, &log_lines);
        }

        if !controls::poll_event(app) {
            break;
        }

        sleep(Duration::from_millis(50));
    }

    // Restore the terminal state before exiting.
    if let Some(mut term) = terminal {
        let _ = term.show_cursor();
        let stdout = term.backend_mut();
        let _ = execute!(stdout, DisableBracketedPaste, LeaveAlternateScreen, cursor::Show);
    }
}

struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
