//! Periodic deck poller: drives looping and reports position for display.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle,
    time::Duration,
};

use parking_lot::Mutex;

use crate::constants::DECK_COUNT;
use crate::playback::deck::DeckHandle;
use crate::playback::looping::{LoopTick, LoopingController};

/// Snapshot of one deck sent to UI consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct DeckReport {
    /// Zero-based deck index.
    pub deck: usize,
    /// `None` when the deck has no usable position.
    pub position_relative: Option<f64>,
    pub position_seconds: f64,
    pub length_seconds: f64,
    pub playing: bool,
    pub looping: bool,
}

impl DeckReport {
    fn capture(deck: usize, handle: &DeckHandle) -> Self {
        let relative = handle.position_relative();
        Self {
            deck,
            position_relative: (relative.is_finite() && relative > 0.0).then_some(relative),
            position_seconds: handle.position_seconds(),
            length_seconds: handle.length_in_seconds(),
            playing: handle.is_playing(),
            looping: handle.is_looping(),
        }
    }
}

type ReportFn = dyn FnMut(DeckReport) + Send;

/// Background poller ticking both decks at a fixed interval.
///
/// Each tick runs the looping controller of every deck, then emits a
/// [`DeckReport`] for each deck whose snapshot changed since the last tick.
#[derive(Clone)]
pub struct DeckPoller {
    decks: Arc<[DeckHandle; DECK_COUNT]>,
    controllers: Arc<Mutex<[LoopingController; DECK_COUNT]>>,
    last: Arc<Mutex<[Option<DeckReport>; DECK_COUNT]>>,
    report: Arc<Mutex<ReportFn>>,
    interval: Duration,
    finish: Arc<AtomicBool>,
    thread_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl DeckPoller {
    pub fn new(
        decks: [DeckHandle; DECK_COUNT],
        report: impl FnMut(DeckReport) + Send + 'static,
        interval: Duration,
    ) -> Self {
        Self {
            decks: Arc::new(decks),
            controllers: Arc::new(Mutex::new(Default::default())),
            last: Arc::new(Mutex::new(Default::default())),
            report: Arc::new(Mutex::new(report)),
            interval,
            finish: Arc::new(AtomicBool::new(false)),
            thread_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Run one tick on the calling thread. Returns the loop outcome per deck.
    pub fn poll_once(&self) -> [LoopTick; DECK_COUNT] {
        let ticks = {
            let mut controllers = self.controllers.lock();
            [
                controllers[0].tick(&self.decks[0]),
                controllers[1].tick(&self.decks[1]),
            ]
        };

        let mut last = self.last.lock();
        let mut report_fn = self.report.lock();
        for (index, deck) in self.decks.iter().enumerate() {
            let report = DeckReport::capture(index, deck);
            if last[index].as_ref() != Some(&report) {
                (*report_fn)(report.clone());
                last[index] = Some(report);
            }
        }
        ticks
    }

    fn run(&self) {
        loop {
            self.poll_once();

            if self.finish.load(Ordering::Relaxed) {
                break;
            }

            std::thread::sleep(self.interval);
        }
    }

    /// Start the background polling thread.
    pub fn start(&self) {
        self.stop();
        self.finish.store(false, Ordering::Relaxed);
        let this = self.clone();
        let spawned = std::thread::Builder::new()
            .name("deck-poller".to_string())
            .spawn(move || this.run());
        match spawned {
            Ok(handle) => *self.thread_handle.lock() = Some(handle),
            Err(err) => log::error!("failed to start deck poller: {}", err),
        }
    }

    /// Stop the background polling thread.
    pub fn stop(&self) {
        self.finish.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread_handle.lock().take() {
            if handle.thread().id() == std::thread::current().id() {
                log::warn!("poller stop called from poller thread; skipping join");
            } else if handle.join().is_err() {
                log::warn!("poller thread panicked during join");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioCallback, PcmSource};
    use crate::playback::deck::DeckEngine;
    use std::sync::mpsc;

    const RATE: u32 = 1_000;

    fn decks() -> ([DeckEngine; 2], [DeckHandle; 2]) {
        let mut engines = [DeckEngine::default(), DeckEngine::default()];
        for engine in &mut engines {
            engine.prepare_to_play(100, RATE);
        }
        let handles = [engines[0].handle(), engines[1].handle()];
        (engines, handles)
    }

    #[test]
    fn reports_only_changes() {
        let (_engines, handles) = decks();
        let (tx, rx) = mpsc::channel();
        let poller = DeckPoller::new(
            handles.clone(),
            move |r| {
                let _ = tx.send(r);
            },
            Duration::ZERO,
        );

        poller.poll_once();
        let first: Vec<DeckReport> = rx.try_iter().collect();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].position_relative, None);
        assert_eq!(first[0].length_seconds, 0.0);

        poller.poll_once();
        assert_eq!(rx.try_iter().count(), 0);

        handles[1].load_source(PcmSource::from_fn(10 * RATE as usize, RATE, |_| (0.0, 0.0)));
        handles[1].set_position(5.0);
        poller.poll_once();
        let changed: Vec<DeckReport> = rx.try_iter().collect();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].deck, 1);
        assert_eq!(changed[0].position_relative, Some(0.5));
        assert_eq!(changed[0].length_seconds, 10.0);
    }

    #[test]
    fn tick_drives_looping_per_deck() {
        let (_engines, handles) = decks();
        let poller = DeckPoller::new(handles.clone(), |_| {}, Duration::ZERO);
        for handle in &handles {
            handle.load_source(PcmSource::from_fn(10 * RATE as usize, RATE, |_| (0.0, 0.0)));
            handle.set_position(9.0);
            handle.play();
        }
        handles[0].set_looping(true);

        let ticks = poller.poll_once();
        assert_eq!(ticks, [LoopTick::Restarted, LoopTick::Idle]);
        assert_eq!(handles[0].position_seconds(), 0.0);
        assert_eq!(handles[1].position_seconds(), 9.0);
    }

    #[test]
    fn start_and_stop_join_the_thread() {
        let (_engines, handles) = decks();
        let (tx, rx) = mpsc::channel();
        let poller = DeckPoller::new(
            handles,
            move |r| {
                let _ = tx.send(r);
            },
            Duration::from_millis(5),
        );
        poller.start();
        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(first.deck, 0);
        poller.stop();
        assert!(poller.thread_handle.lock().is_none());
    }
}
