//! Flow control example: fast timer-driven producer, slow consumer.
//!
//! Publishing never blocks, so a producer that outruns its consumers has to
//! watch queue occupancy itself. Here a `PeriodicTimer` publishes a burst of
//! readings every 10ms into a small queue drained by two slow workers. Before
//! each burst it checks `occupied_in_queue` against `queue_size` and skips
//! the burst when the queue is above the high-water mark.
//!
//! A second handling with a tiny queue and no throttling shows what happens
//! otherwise: `publish` reports `Error::QueueFull` naming the rejecting
//! handling, while the other handling still receives the event.
//!
//! ```text
//! Timer ──Reading──► Dispatcher ──► "store"  (64 slots, 2 workers, 5ms/event)
//!                         │
//!                         └───────► "alerts" (4 slots, 1 worker, 20ms/event)
//! ```
//!
//! Try experimenting:
//! - Raise `HIGH_WATER` to 1.0 and watch "store" start rejecting too
//! - Add workers to "alerts" with `add_handlers` and watch rejections drop

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    thread,
    time::Duration,
};

use kestrel::{Dispatcher, DispatcherConfig, Error, PeriodicTimer, Priority};

const HIGH_WATER: f64 = 0.75;
const BURST: u64 = 8;

#[derive(Clone, Debug)]
struct Reading {
    seq: u64,
    value: f64,
}

#[derive(Default)]
struct Stats {
    published: AtomicU64,
    skipped: AtomicU64,
    rejected: AtomicU64,
    stored: AtomicU64,
    alerted: AtomicU64,
}

fn main() -> kestrel::Result {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = DispatcherConfig::default().with_idle_timeout(Duration::from_millis(20));
    let dispatcher = Arc::new(Dispatcher::new(config));
    let stats = Arc::new(Stats::default());

    let s = stats.clone();
    dispatcher
        .build_handling("store", move |_r: Reading| {
            thread::sleep(Duration::from_millis(5));
            s.stored.fetch_add(1, Ordering::Relaxed);
        })
        .queue_capacity(64)
        .workers(2)
        .priority(Priority::High)
        .add()?;

    let s = stats.clone();
    dispatcher
        .build_handling("alerts", move |r: Reading| {
            if r.value > 0.9 {
                tracing::info!(seq = r.seq, value = r.value, "alert");
            }
            thread::sleep(Duration::from_millis(20));
            s.alerted.fetch_add(1, Ordering::Relaxed);
        })
        .queue_capacity(4)
        .add()?;

    let d = dispatcher.clone();
    let s = stats.clone();
    let mut seq = 0;
    let mut producer = PeriodicTimer::new(Duration::from_millis(10), move || {
        let occupied = d.occupied_in_queue::<Reading>("store").unwrap_or(0);
        let capacity = d.queue_size::<Reading>("store").unwrap_or(1);
        if occupied as f64 >= capacity as f64 * HIGH_WATER {
            s.skipped.fetch_add(1, Ordering::Relaxed);
            return;
        }

        for _ in 0..BURST {
            seq += 1;
            let reading = Reading {
                seq,
                value: (seq % 97) as f64 / 97.0,
            };
            match d.publish(reading) {
                Ok(_) => {}
                Err(Error::QueueFull { rejected, .. }) => {
                    tracing::debug!(seq, ?rejected, "reading rejected");
                    s.rejected.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => tracing::error!(error = %e, "publish failed"),
            }
            s.published.fetch_add(1, Ordering::Relaxed);
        }
    })
    .with_name("producer");

    producer.start()?;
    thread::sleep(Duration::from_secs(2));
    producer.stop();

    // Let "store" drain, then discard what "alerts" could not keep up with
    while dispatcher.occupied_in_queue::<Reading>("store") != Some(0) {
        thread::sleep(Duration::from_millis(10));
    }
    dispatcher.clear_all::<Reading>();

    for snapshot in dispatcher.snapshot() {
        tracing::info!(
            handling = %snapshot.name,
            workers = snapshot.workers,
            processed = snapshot.processed,
            "handling finished"
        );
    }
    tracing::info!(
        published = stats.published.load(Ordering::Relaxed),
        skipped_bursts = stats.skipped.load(Ordering::Relaxed),
        rejected = stats.rejected.load(Ordering::Relaxed),
        stored = stats.stored.load(Ordering::Relaxed),
        alerted = stats.alerted.load(Ordering::Relaxed),
        "done"
    );
    Ok(())
}
