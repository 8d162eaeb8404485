use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Row, Table, TableState},
    Terminal,
};

use duodeck_lib::audio::PeakWindow;
use duodeck_lib::constants::DECK_COUNT;

use crate::app::{App, Focus, Prompt};
use crate::controls::HELP;

const LEVELS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

pub fn draw(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &App,
    log_lines: &[String],
) {
    let _ = terminal.draw(|f| {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(10),
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(8),
            ])
            .split(f.size());

        let controls = Paragraph::new(HELP)
            .style(Style::default().fg(Color::Blue))
            .block(Block::default().borders(Borders::ALL).title("Controls"));
        f.render_widget(controls, chunks[0]);

        let deck_columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[1]);
        for deck in 0..DECK_COUNT {
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(3)])
                .split(deck_columns[deck]);

            let border = focus_style(app.focus == Focus::Deck(deck));
            let panel = Paragraph::new(deck_text(app, deck))
                .style(Style::default().fg(Color::Green))
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(border)
                        .title(format!("Deck {}", deck + 1)),
                );
            f.render_widget(panel, rows[0]);

            let relative = app
                .report(deck)
                .and_then(|report| report.position_relative)
                .unwrap_or_else(|| app.decks[deck].position_relative());
            let width = rows[1].width.saturating_sub(2) as usize;
            let line = match app.decks[deck].waveform() {
                Some(peaks) => waveform_line(&peaks, width, relative),
                None => Line::default(),
            };
            let waveform = Paragraph::new(line)
                .block(Block::default().borders(Borders::ALL));
            f.render_widget(waveform, rows[1]);
        }

        let prompt_text = match &app.prompt {
            Some(Prompt::Search(text)) => format!("/{}", text),
            Some(Prompt::Import(text)) => format!("import: {}", text),
            None => app.status.clone(),
        };
        let search = Paragraph::new(prompt_text)
            .block(Block::default().borders(Borders::ALL).title("Search / status"));
        f.render_widget(search, chunks[2]);

        let rows: Vec<Row> = app
            .library
            .tracks()
            .iter()
            .map(|track| Row::new(vec![track.title.clone(), track.length.clone()]))
            .collect();
        let table = Table::new(rows, [Constraint::Percentage(80), Constraint::Percentage(20)])
            .header(Row::new(vec!["Title", "Length"]).style(Style::default().add_modifier(Modifier::BOLD)))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(focus_style(app.focus == Focus::Library))
                    .title(format!("Library ({})", app.library.len())),
            );
        let mut state = TableState::default();
        state.select(app.selected);
        f.render_stateful_widget(table, chunks[3], &mut state);

        let log_height = chunks[4].height.saturating_sub(2) as usize;
        let start = log_lines.len().saturating_sub(log_height);
        let log_text = if log_lines.is_empty() {
            "No logs yet.".to_string()
        } else {
            log_lines[start..].join("\n")
        };

        let log_widget = Paragraph::new(log_text)
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title("Logs"));
        f.render_widget(log_widget, chunks[4]);
    });
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    }
}

/// Waveform overview with the played part highlighted up to the playhead.
fn waveform_line(peaks: &[PeakWindow], width: usize, relative: f64) -> Line<'static> {
    let glyphs: Vec<char> = waveform_glyphs(peaks, width).chars().collect();
    let Some(playhead) = playhead_column(relative, glyphs.len()) else {
        return Line::from(Span::styled(
            glyphs.into_iter().collect::<String>(),
            Style::default().fg(Color::DarkGray),
        ));
    };
    let played: String = glyphs[..playhead].iter().collect();
    let head = glyphs[playhead].to_string();
    let rest: String = glyphs[playhead + 1..].iter().collect();
    Line::from(vec![
        Span::styled(played, Style::default().fg(Color::Cyan)),
        Span::styled(head, Style::default().fg(Color::Yellow).add_modifier(Modifier::REVERSED)),
        Span::styled(rest, Style::default().fg(Color::DarkGray)),
    ])
}

/// One bar glyph per column, scaled to the loudest window the column covers.
pub fn waveform_glyphs(peaks: &[PeakWindow], width: usize) -> String {
    if peaks.is_empty() || width == 0 {
        return String::new();
    }
    let count = peaks.len();
    (0..width)
        .map(|column| {
            let start = (column * count / width).min(count - 1);
            let end = ((column + 1) * count / width).clamp(start + 1, count);
            let amplitude = peaks[start..end]
                .iter()
                .map(PeakWindow::amplitude)
                .fold(0.0_f32, f32::max);
            let level = (amplitude.clamp(0.0, 1.0) * 8.0).round() as usize;
            LEVELS[level.min(LEVELS.len() - 1)]
        })
        .collect()
}

/// Column of the playhead, `None` without a meaningful position.
pub fn playhead_column(relative: f64, width: usize) -> Option<usize> {
    if width == 0 || !relative.is_finite() {
        return None;
    }
    let column = (relative.clamp(0.0, 1.0) * width as f64) as usize;
    Some(column.min(width - 1))
}

/// Status lines for one deck panel.
pub fn deck_text(app: &App, deck: usize) -> String {
    let handle = &app.decks[deck];
    let report = app.report(deck);
    let (position, length, playing) = match &report {
        Some(report) => (report.position_seconds, report.length_seconds, report.playing),
        None => (
            handle.position_seconds(),
            handle.length_in_seconds(),
            handle.is_playing(),
        ),
    };
    let state = if !handle.is_loaded() {
        "○ Empty"
    } else if playing {
        "▶ Playing"
    } else {
        "■ Stopped"
    };
    let reverb = handle.reverb_parameters();
    format!(
        "{}   {} / {}\ngain {:.2}   speed {:.2}x   loop {}\nroom {:.2}  damp {:.2}  wet {:.2}  dry {:.2}",
        state,
        format_time(position),
        format_time(length),
        handle.gain(),
        handle.speed(),
        if handle.is_looping() { "on" } else { "off" },
        reverb.room_size,
        reverb.damping,
        reverb.wet_level,
        reverb.dry_level,
    )
}

fn format_time(seconds: f64) -> String {
    let seconds = if seconds.is_finite() {
        seconds.max(0.0) as u64
    } else {
        0
    };
    let minutes = seconds / 60;
    let hours = minutes / 60;
    format!("{:02}:{:02}:{:02}", hours, minutes % 60, seconds % 60)
}
