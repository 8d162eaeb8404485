//! Deferred reclamation for buffers handed to the audio thread.
//!
//! Sources and reverb snapshots are published through `basedrop::SharedCell`.
//! When the audio thread drops the last reference to an old value, the
//! deallocation is queued and performed later on the `audio-gc` thread, so
//! swapping a multi-minute track never frees memory inside a callback.

use basedrop::{Collector, Handle};
use std::sync::mpsc;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

static GC_HANDLE: OnceLock<Handle> = OnceLock::new();

const COLLECT_INTERVAL_MS: u64 = 100;

fn init_gc() -> Handle {
    let (tx, rx) = mpsc::channel();

    let spawned = thread::Builder::new()
        .name("audio-gc".to_string())
        .spawn(move || {
            // Collector is !Sync, so it lives on this thread.
            let mut collector = Collector::new();
            if tx.send(collector.handle()).is_err() {
                return;
            }
            log::debug!("audio gc thread started");
            loop {
                collector.collect();
                thread::sleep(Duration::from_millis(COLLECT_INTERVAL_MS));
            }
        });

    match spawned.ok().and_then(|_| rx.recv().ok()) {
        Some(handle) => handle,
        None => {
            // Without a collector thread, fall back to a leaked collector:
            // values are still dropped, just never reclaimed.
            log::error!("failed to start audio gc thread; deferred drops will leak");
            let collector = Box::leak(Box::new(Collector::new()));
            collector.handle()
        }
    }
}

/// Handle used to allocate `Shared<T>` values.
pub fn gc_handle() -> Handle {
    GC_HANDLE.get_or_init(init_gc).clone()
}
