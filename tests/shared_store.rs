// ==============================================
// SHARED STORE CONCURRENCY TESTS (integration)
// ==============================================
//
// A background worker thread serves fetches and writes for a SharedLazyStore.
// The updater only posts a wake-up; the worker re-locks the store to pull
// work and install results. These require multi-threaded execution and
// cannot live inline.

#![cfg(feature = "concurrency")]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Barrier};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use lazystore::prelude::*;

type Store = LazyStore<Vec<f64>, f64>;

enum Job {
    Wake,
    Stop,
}

fn remote_read(region: &Region) -> Vec<f64> {
    let mut out = Vec::with_capacity(region.length() as usize);
    for col in region.col_begin()..region.col_end() {
        for row in region.row_begin()..region.row_end() {
            out.push((row * 1000 + col) as f64);
        }
    }
    out
}

/// Pulls work until the store reports none outstanding.
fn drain(shared: &SharedLazyStore<Vec<f64>, f64>, fetches: &AtomicUsize, writes: &AtomicUsize) {
    loop {
        let tickets: Vec<_> = shared.with(|store| store.pending_assignments().collect());
        for ticket in tickets {
            writes.fetch_add(1, Ordering::SeqCst);
            shared.confirm_assignment(ticket.id(), WriteOutcome::Applied);
        }
        while let Some((handle, region)) =
            shared.with(|store| store.next_scheduled().map(|f| (f.handle(), *f.region())))
        {
            fetches.fetch_add(1, Ordering::SeqCst);
            // Stale results are expected when the store was reset meanwhile.
            let _ = shared.install(handle, remote_read(&region));
        }
        // Work queued while the store was busy does not wake us again.
        if shared.with(|store| store.scheduled_count()) == 0 {
            break;
        }
    }
}

struct Harness {
    shared: SharedLazyStore<Vec<f64>, f64>,
    jobs: Sender<Job>,
    wakes: Arc<AtomicUsize>,
    fetches: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
    worker: Option<JoinHandle<()>>,
}

impl Harness {
    fn new(rows: i64, cols: i64, max: usize, tile: i64) -> Self {
        let (tx, rx): (Sender<Job>, Receiver<Job>) = mpsc::channel();
        let wakes = Arc::new(AtomicUsize::new(0));

        let notify = tx.clone();
        let wake_count = Arc::clone(&wakes);
        let store: Store = LazyStoreBuilder::new(rows, cols)
            .max_fragment_count(max)
            .fragment_dims(tile, tile)
            .build(updater_fn(move |_: &mut Store, _, _| {
                wake_count.fetch_add(1, Ordering::SeqCst);
                let _ = notify.send(Job::Wake);
            }));
        let shared = SharedLazyStore::new(store);

        let fetches = Arc::new(AtomicUsize::new(0));
        let writes = Arc::new(AtomicUsize::new(0));
        let worker = {
            let shared = shared.clone();
            let fetches = Arc::clone(&fetches);
            let writes = Arc::clone(&writes);
            thread::spawn(move || {
                while let Ok(Job::Wake) = rx.recv() {
                    drain(&shared, &fetches, &writes);
                }
            })
        };

        Self {
            shared,
            jobs: tx,
            wakes,
            fetches,
            writes,
            worker: Some(worker),
        }
    }

    /// Polls until `(row, col)` is loaded; requests it on every attempt.
    fn wait_for(&self, row: i64, col: i64) -> Vec<f64> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let loaded = self.shared.with(|store| {
                store
                    .get_or_schedule(row, col)
                    .and_then(|f| f.payload().cloned())
            });
            if let Some(data) = loaded {
                return data;
            }
            assert!(Instant::now() < deadline, "({row}, {col}) never loaded");
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn wait_idle(&self) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.shared.with(|store| store.scheduled_count()) > 0 {
            assert!(Instant::now() < deadline, "store never drained");
            thread::sleep(Duration::from_millis(1));
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = self.jobs.send(Job::Stop);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

// ==============================================
// Background fetch
// ==============================================

mod background_fetch {
    use super::*;

    #[test]
    fn worker_fills_requested_tile() {
        let harness = Harness::new(1_000, 50, 8, 10);
        let first = harness.shared.with(|store| store.get_or_schedule(42, 17).is_some());
        assert!(!first);

        let data = harness.wait_for(42, 17);
        assert_eq!(data.len(), 100);
        // Tile (40..50, 10..20), column-major.
        assert_eq!(data[7 * 10 + 2], 42_017.0);
        assert_eq!(harness.shared.loaded_payload(42, 17), Some(data));
        harness.shared.with(|store| store.check_invariants().unwrap());
    }

    #[test]
    fn burst_of_requests_is_served_by_one_wake() {
        let harness = Harness::new(1_000, 50, 64, 10);
        harness.shared.with(|store| {
            for row in (0..200).step_by(10) {
                assert!(store.get_or_schedule(row, 0).is_none());
            }
        });
        harness.wait_idle();

        for row in (0..200).step_by(10) {
            assert!(harness.shared.loaded_payload(row, 0).is_some());
        }
        assert_eq!(harness.fetches.load(Ordering::SeqCst), 20);
        assert!(harness.wakes.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn writes_are_confirmed_by_worker() {
        let harness = Harness::new(100, 20, 8, 10);
        harness.wait_for(3, 3);

        let id = harness.shared.with(|store| store.set(Assignment::cell(3, 3, 7.0)));
        harness.wait_idle();

        assert_eq!(harness.writes.load(Ordering::SeqCst), 1);
        assert!(!harness.shared.confirm_assignment(id, WriteOutcome::Applied));
        assert!(harness.shared.loaded_payload(3, 3).is_some());
    }
}

// ==============================================
// Concurrent readers
// ==============================================
//
// Several threads scroll through different row bands while the worker
// installs results. Capacity is small enough to force evictions of tiles
// that are still in flight.

mod concurrent_readers {
    use super::*;

    #[test]
    fn readers_and_worker_preserve_invariants() {
        let harness = Harness::new(10_000, 40, 6, 20);
        let threads = 4;
        let barrier = Arc::new(Barrier::new(threads));

        let readers: Vec<_> = (0..threads as i64)
            .map(|t| {
                let shared = harness.shared.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for step in 0..200 {
                        let row = t * 2_000 + (step * 7) % 2_000;
                        let col = (step * 3) % 40;
                        shared.with(|store| {
                            if let Some(f) = store.get_or_schedule(row, col) {
                                assert!(f.region().contains(row, col));
                            }
                            assert!(store.len() <= 6);
                        });
                    }
                })
            })
            .collect();

        for reader in readers {
            reader.join().unwrap();
        }
        harness.wait_idle();
        harness.shared.with(|store| store.check_invariants().unwrap());
    }
}

// ==============================================
// Reset while fetches are in flight
// ==============================================

mod reset_race {
    use super::*;

    #[test]
    fn late_install_after_reset_is_ignored() {
        let harness = Harness::new(1_000, 10, 8, 10);
        let handle = harness.shared.with(|store| {
            store.get_or_schedule(500, 0);
            store.pending_scheduled().first().map(|f| f.handle())
        });
        harness.wait_idle();
        harness.shared.reset(100);

        if let Some(handle) = handle {
            assert_eq!(harness.shared.install(handle, vec![0.0; 100]), Ok(false));
        }
        assert!(harness.shared.with(|store| store.is_empty()));
        assert!(harness.shared.with(|store| store.get_or_schedule(500, 0).is_none()));
    }

    #[test]
    fn concurrent_resets_leave_consistent_store() {
        let harness = Harness::new(1_000, 10, 8, 10);
        let barrier = Arc::new(Barrier::new(2));

        let reader = {
            let shared = harness.shared.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for row in 0..500 {
                    shared.with(|store| {
                        store.get_or_schedule(row, row % 10);
                    });
                }
            })
        };
        let resetter = {
            let shared = harness.shared.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..50 {
                    shared.reset(-1);
                    thread::yield_now();
                }
            })
        };

        reader.join().unwrap();
        resetter.join().unwrap();
        harness.wait_idle();
        harness.shared.with(|store| {
            assert_eq!(store.row_count(), 1_000);
            store.check_invariants().unwrap();
        });
    }
}
