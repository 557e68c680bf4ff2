//! Bounded worker pool. Units are scoped threads pulling item indices from a
//! shared cursor; every start and completion is reported to a handler that
//! runs on the calling thread.

use crate::common::default_concurrency;
use crate::domain::{ChallengerError, ChallengerResult};
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

#[derive(Debug)]
pub enum PoolEvent<R> {
    Started {
        index: usize,
    },
    Finished {
        index: usize,
        outcome: ChallengerResult<R>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolControl {
    Continue,
    /// Launch nothing further. In-flight items still finish but their
    /// events are no longer handed to the handler.
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    pub launched: usize,
    pub finished: usize,
    pub stopped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPool {
    concurrency: usize,
    stop_on_error: bool,
}

impl WorkerPool {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            stop_on_error: false,
        }
    }

    pub fn with_default_concurrency() -> Self {
        Self::new(default_concurrency())
    }

    /// A failing item raises the stop flag from its own unit, before any unit
    /// can claim another item.
    pub fn stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }

    pub const fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Runs `job` over `items` on at most `concurrency` scoped threads. A unit
    /// claims its next item only after the handler has answered the previous
    /// `Finished` event, so a `Stop` answer is never outrun by a new launch.
    pub fn run<T, R, F, H>(&self, items: &[T], job: F, mut handler: H) -> PoolStats
    where
        T: Sync,
        R: Send,
        F: Fn(usize, &T) -> ChallengerResult<R> + Sync,
        H: FnMut(PoolEvent<R>) -> PoolControl,
    {
        let units = self.concurrency.min(items.len());
        if units == 0 {
            return PoolStats::default();
        }

        let cursor = AtomicUsize::new(0);
        let launched = AtomicUsize::new(0);
        let abort = AtomicBool::new(false);
        let (sender, receiver) = mpsc::channel::<(usize, PoolEvent<R>)>();
        let mut replies = Vec::with_capacity(units);
        let mut stats = PoolStats::default();

        thread::scope(|scope| {
            for unit in 0..units {
                let sender = sender.clone();
                let (reply_sender, reply_receiver) = mpsc::channel::<PoolControl>();
                replies.push(reply_sender);
                let (cursor, launched, abort, job) = (&cursor, &launched, &abort, &job);
                let stop_on_error = self.stop_on_error;
                scope.spawn(move || {
                    while !abort.load(Ordering::SeqCst) {
                        let index = cursor.fetch_add(1, Ordering::SeqCst);
                        let Some(item) = items.get(index) else {
                            break;
                        };
                        if abort.load(Ordering::SeqCst) {
                            break;
                        }
                        launched.fetch_add(1, Ordering::SeqCst);
                        if sender.send((unit, PoolEvent::Started { index })).is_err() {
                            break;
                        }

                        let outcome = catch_unwind(AssertUnwindSafe(|| job(index, item)))
                            .unwrap_or_else(|payload| Err(unit_panic(index, payload.as_ref())));
                        if stop_on_error && outcome.is_err() {
                            abort.store(true, Ordering::SeqCst);
                        }
                        if sender.send((unit, PoolEvent::Finished { index, outcome })).is_err() {
                            break;
                        }
                        if !matches!(reply_receiver.recv(), Ok(PoolControl::Continue)) {
                            break;
                        }
                    }
                });
            }
            drop(sender);

            for (unit, event) in receiver {
                let finished = matches!(event, PoolEvent::Finished { .. });
                if finished {
                    stats.finished += 1;
                }
                let control = if stats.stopped {
                    PoolControl::Stop
                } else {
                    handler(event)
                };
                if control == PoolControl::Stop && !stats.stopped {
                    stats.stopped = true;
                    abort.store(true, Ordering::SeqCst);
                }
                if finished {
                    // The unit may already have exited on the abort flag.
                    let _ = replies[unit].send(control);
                }
            }
        });

        stats.launched = launched.into_inner();
        stats
    }
}

fn unit_panic(index: usize, payload: &(dyn Any + Send)) -> ChallengerError {
    let reason = payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    ChallengerError::internal(
        "SYS.UNIT_PANIC",
        format!("work unit for item {index} panicked: {reason}"),
    )
}

#[cfg(test)]
mod tests {
    use super::{PoolControl, PoolEvent, WorkerPool};
    use crate::domain::ChallengerError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn concurrency_is_clamped_to_one() {
        assert_eq!(WorkerPool::new(0).concurrency(), 1);
        assert!(WorkerPool::with_default_concurrency().concurrency() >= 1);
    }

    #[test]
    fn never_exceeds_its_bound() {
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let items: Vec<usize> = (0..12).collect();
        let mut finished = Vec::new();

        let stats = WorkerPool::new(3).run(
            &items,
            |_, item| {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(10));
                active.fetch_sub(1, Ordering::SeqCst);
                Ok(item * 2)
            },
            |event| {
                if let PoolEvent::Finished { index, outcome } = event {
                    finished.push((index, outcome.expect("job should succeed")));
                }
                PoolControl::Continue
            },
        );

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(stats.launched, 12);
        assert_eq!(stats.finished, 12);
        assert!(!stats.stopped);
        finished.sort_unstable();
        assert_eq!(finished, (0..12).map(|index| (index, index * 2)).collect::<Vec<_>>());
    }

    #[test]
    fn failing_item_stops_the_unit_before_its_next_claim() {
        let executed = AtomicUsize::new(0);
        let items: Vec<usize> = (0..10).collect();
        let mut handled = Vec::new();

        let stats = WorkerPool::new(1).stop_on_error(true).run(
            &items,
            |index, _| {
                executed.fetch_add(1, Ordering::SeqCst);
                if index == 0 {
                    return Err(ChallengerError::input_validation(
                        "INPUT.SOLUTION_NOT_FOUND",
                        "no solution",
                    ));
                }
                Ok(())
            },
            |event| match event {
                PoolEvent::Started { .. } => PoolControl::Continue,
                PoolEvent::Finished { index, outcome } => {
                    handled.push(index);
                    assert!(outcome.is_err());
                    PoolControl::Stop
                }
            },
        );

        assert_eq!(handled, vec![0]);
        assert!(stats.stopped);
        assert_eq!(executed.load(Ordering::SeqCst), 1);
        assert_eq!(stats.launched, 1);
        assert_eq!(stats.finished, 1);
    }

    #[test]
    fn handler_stop_is_seen_before_the_next_claim() {
        let executed = AtomicUsize::new(0);
        let items: Vec<usize> = (0..10).collect();

        for _ in 0..20 {
            executed.store(0, Ordering::SeqCst);
            let stats = WorkerPool::new(1).run(
                &items,
                |_, _| {
                    executed.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                },
                |event| match event {
                    PoolEvent::Started { .. } => PoolControl::Continue,
                    PoolEvent::Finished { .. } => PoolControl::Stop,
                },
            );

            assert!(stats.stopped);
            assert_eq!(executed.load(Ordering::SeqCst), 1);
            assert_eq!(stats.launched, 1);
        }
    }

    #[test]
    fn failures_do_not_stop_the_pool_by_default() {
        let items: Vec<usize> = (0..6).collect();
        let mut failed = 0;

        let stats = WorkerPool::new(2).run(
            &items,
            |index, _| {
                if index % 2 == 0 {
                    Err(ChallengerError::computation("RUN.FRAGMENTATION", "no fragments"))
                } else {
                    Ok(index)
                }
            },
            |event| {
                if let PoolEvent::Finished { outcome: Err(_), .. } = event {
                    failed += 1;
                }
                PoolControl::Continue
            },
        );

        assert_eq!(failed, 3);
        assert_eq!(stats.launched, 6);
        assert_eq!(stats.finished, 6);
        assert!(!stats.stopped);
    }

    #[test]
    fn panicking_unit_is_reported_and_others_complete() {
        let items = vec!["ok", "boom", "ok"];
        let mut outcomes = Vec::new();

        WorkerPool::new(2).run(
            &items,
            |_, item| {
                if *item == "boom" {
                    panic!("fragmenter exploded");
                }
                Ok(item.len())
            },
            |event| {
                if let PoolEvent::Finished { index, outcome } = event {
                    outcomes.push((index, outcome));
                }
                PoolControl::Continue
            },
        );

        outcomes.sort_by_key(|(index, _)| *index);
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].1, Ok(2));
        assert_eq!(outcomes[2].1, Ok(2));
        let error = outcomes[1].1.clone().expect_err("panicking unit should fail");
        assert_eq!(error.placeholder(), "SYS.UNIT_PANIC");
        assert!(error.message().contains("fragmenter exploded"));
    }

    #[test]
    fn empty_input_launches_nothing() {
        let items: Vec<u8> = Vec::new();
        let stats = WorkerPool::new(4).run(&items, |_, _| Ok(()), |_| PoolControl::Continue);
        assert_eq!(stats.launched, 0);
        assert_eq!(stats.finished, 0);
    }
}
