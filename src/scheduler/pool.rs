//! A bounded pool of scoped worker threads.
//!
//! All pools of one run draw helper threads from a single [`Budget`]. The
//! thread that starts a pool drains it too, and helpers are only spawned for
//! permits that are free right now, so nested pools never wait on each other
//! and the whole run keeps at most `workers` items in flight. Results are
//! stored by index and come back in input order regardless of completion
//! order.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;

use crate::signal::Fault;

/// Helper-thread permits shared by every pool of a run.
///
/// The thread driving the run counts as one worker, so a budget for
/// `workers` holds `workers - 1` permits.
#[derive(Debug)]
pub(crate) struct Budget {
    free: AtomicUsize,
}

impl Budget {
    pub(crate) fn new(workers: usize) -> Self {
        Self {
            free: AtomicUsize::new(workers.saturating_sub(1)),
        }
    }

    /// Takes up to `wanted` permits without blocking.
    fn take(&self, wanted: usize) -> usize {
        let mut free = self.free.load(Ordering::SeqCst);
        loop {
            let taken = free.min(wanted);
            if taken == 0 {
                return 0;
            }
            match self.free.compare_exchange(
                free,
                free - taken,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return taken,
                Err(now) => free = now,
            }
        }
    }

    fn give_back(&self, permits: usize) {
        self.free.fetch_add(permits, Ordering::SeqCst);
    }
}

/// One helper's permit, returned when the helper stops draining.
struct Permit<'b>(&'b Budget);

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.0.give_back(1);
    }
}

fn guarded<T, R>(work: &(impl Fn(&T) -> R + Sync), item: &T) -> Result<R, Fault> {
    panic::catch_unwind(AssertUnwindSafe(|| work(item))).map_err(Fault::from_panic)
}

/// Runs `work` over `items` on the calling thread plus as many helper
/// threads as `budget` can spare.
pub(crate) fn run_bounded<T, R, F>(items: &[T], budget: &Budget, work: F) -> Vec<Result<R, Fault>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    let helpers = if items.len() > 1 {
        budget.take(items.len() - 1)
    } else {
        0
    };
    if helpers == 0 {
        return items.iter().map(|item| guarded(&work, item)).collect();
    }

    let next = AtomicUsize::new(0);
    let slots: Mutex<Vec<Option<Result<R, Fault>>>> =
        Mutex::new(items.iter().map(|_| None).collect());

    thread::scope(|scope| {
        let drain = || loop {
            let index = next.fetch_add(1, Ordering::SeqCst);
            let Some(item) = items.get(index) else {
                break;
            };
            let result = guarded(&work, item);
            slots.lock().unwrap_or_else(PoisonError::into_inner)[index] = Some(result);
        };
        for n in 0..helpers {
            let permit = Permit(budget);
            let started = thread::Builder::new()
                .name(format!("verdict-worker-{n}"))
                .spawn_scoped(scope, move || {
                    let _permit = permit;
                    drain();
                });
            if let Err(err) = started {
                tracing::warn!(%err, "failed to spawn worker thread");
            }
        }
        drain();
    });

    slots
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner)
        .into_iter()
        .map(|slot| slot.unwrap_or_else(|| Err(Fault::new("worker thread exited early"))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Live {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Live {
        fn new() -> Self {
            Self {
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }

        fn busy(&self, millis: u64) {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(millis));
            self.active.fetch_sub(1, Ordering::SeqCst);
        }

        fn peak(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn results_keep_input_order() {
        let items: Vec<u64> = (0..8).collect();
        let results = run_bounded(&items, &Budget::new(4), |n| {
            thread::sleep(Duration::from_millis(8 - n));
            n * 10
        });
        let values: Vec<u64> = results.into_iter().map(Result::unwrap).collect();
        assert_eq!(values, [0, 10, 20, 30, 40, 50, 60, 70]);
    }

    #[test]
    fn concurrency_is_bounded() {
        let live = Live::new();
        let items: Vec<u32> = (0..12).collect();
        run_bounded(&items, &Budget::new(3), |_| live.busy(5));
        assert!(live.peak() <= 3);
        assert!(live.peak() > 1);
    }

    #[test]
    fn nested_pools_share_one_budget() {
        let live = Live::new();
        let budget = Budget::new(3);
        let outer: Vec<u32> = (0..4).collect();
        let inner: Vec<u32> = (0..4).collect();
        run_bounded(&outer, &budget, |_| {
            run_bounded(&inner, &budget, |_| live.busy(10));
        });
        assert!(live.peak() <= 3, "peak {}", live.peak());
        assert_eq!(budget.free.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn one_worker_runs_on_the_calling_thread() {
        let caller = thread::current().id();
        let items = [1, 2, 3];
        let results = run_bounded(&items, &Budget::new(1), |_| thread::current().id());
        assert!(results.into_iter().all(|id| id == Ok(caller)));
    }

    #[test]
    fn a_panicking_item_does_not_lose_the_others() {
        let items = [1, 2, 3];
        let results = run_bounded(&items, &Budget::new(2), |n| {
            if *n == 2 {
                panic!("two");
            }
            *n
        });
        assert_eq!(results[0], Ok(1));
        assert!(results[1].is_err());
        assert_eq!(results[2], Ok(3));
    }
}
