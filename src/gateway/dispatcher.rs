//! The task dispatcher: worker pool plus completion marshaling.
//!
//! [`Dispatcher::submit`] is the gateway's one asynchronous primitive. It
//! builds a task envelope around an exclusive [`TaskPermit`] for the owner
//! handle, runs the worker body on a shared worker pool, and carries the
//! worker's single `Result` outcome back to the control thread, where the
//! continuation receives it error-first, exactly once.
//!
//! Two ordering rules hold. First, tasks against the same handle are
//! strictly serialized: the second cannot even be admitted until the
//! first's worker body has finished, and because the first's completion is
//! queued before its busy flag clears, same-handle completions arrive in
//! issue order. Second, completions are delivered one at a time, in queue
//! order, by whichever thread pumps them; tasks on independent handles may
//! otherwise run and complete in any order.
//!
//! The dispatcher never runs continuations on worker threads. The host
//! owns its control thread and pumps explicitly: [`Dispatcher::pump`] is
//! non-blocking, [`Dispatcher::pump_until_idle`] blocks until every
//! admitted task has delivered. A continuation that panics unwinds out of
//! the pump call into the host's own fault handling; it is not caught or
//! retried.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::{Receiver, Sender, unbounded};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{FalxError, Result};
use crate::gateway::handle::{EngineObject, Handle};

type Completion = Box<dyn FnOnce() + Send>;

/// Configuration for a [`Dispatcher`].
#[derive(Debug, Clone, Default)]
pub struct DispatcherConfig {
    /// Worker pool size. Defaults to the number of CPUs.
    pub worker_threads: Option<usize>,
}

struct DispatcherInner {
    pool: ThreadPool,
    completion_tx: Sender<Completion>,
    completion_rx: Receiver<Completion>,
    in_flight: AtomicUsize,
}

/// Submits task envelopes to the worker pool and marshals their
/// completions back onto the control thread.
///
/// Cloning is cheap and shares the pool; all clones must be pumped from
/// one thread, the control thread.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

impl Dispatcher {
    /// Create a dispatcher with its own worker pool.
    pub fn new(config: DispatcherConfig) -> Result<Self> {
        let threads = config.worker_threads.unwrap_or_else(num_cpus::get);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("falx-worker-{i}"))
            .build()
            .map_err(|e| FalxError::engine(format!("failed to create worker pool: {e}")))?;

        let (completion_tx, completion_rx) = unbounded();
        Ok(Dispatcher {
            inner: Arc::new(DispatcherInner {
                pool,
                completion_tx,
                completion_rx,
                in_flight: AtomicUsize::new(0),
            }),
        })
    }

    /// Submit one task against `handle`.
    ///
    /// Fails synchronously with [`FalxError::Busy`] if the handle already
    /// has an outstanding task; on success the worker body runs off-thread
    /// with exclusive access to the handle's object slot, and the
    /// continuation later receives the worker's outcome on the pumping
    /// thread. The handle's busy flag clears when the worker body returns,
    /// before the completion is delivered, so a follow-up task can be
    /// admitted while the completion is still queued; the completion is
    /// queued before busy clears, so such a follow-up completes after it.
    pub fn submit<O, T, W, C>(&self, handle: &Handle<O>, worker: W, continuation: C) -> Result<()>
    where
        O: EngineObject,
        T: Send + 'static,
        W: FnOnce(&mut Option<O>) -> Result<T> + Send + 'static,
        C: FnOnce(Result<T>) + Send + 'static,
    {
        let permit = handle.begin_task()?;
        let tx = self.inner.completion_tx.clone();
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);

        self.inner.pool.spawn(move || {
            let outcome = permit.with_object(worker);
            // Queue the completion before busy clears: a task admitted on
            // this handle afterwards necessarily queues behind it, keeping
            // same-handle completions in issue order.
            permit.finish(move || {
                // The pump side holds the receiver for the dispatcher's
                // lifetime, and we hold a sender, so this cannot fail.
                let _ = tx.send(Box::new(move || continuation(outcome)) as Completion);
            });
        });
        Ok(())
    }

    /// Number of tasks admitted but not yet delivered.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Deliver one queued completion, if any. Non-blocking.
    pub fn pump_one(&self) -> bool {
        match self.inner.completion_rx.try_recv() {
            Ok(completion) => {
                completion();
                self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
                true
            }
            Err(_) => false,
        }
    }

    /// Deliver every completion currently queued. Non-blocking; returns
    /// the number delivered.
    pub fn pump(&self) -> usize {
        let mut delivered = 0;
        while self.pump_one() {
            delivered += 1;
        }
        delivered
    }

    /// Block until every admitted task has delivered its completion,
    /// including tasks submitted by the continuations themselves.
    pub fn pump_until_idle(&self) {
        while self.inner.in_flight.load(Ordering::SeqCst) > 0 {
            match self.inner.completion_rx.recv() {
                Ok(completion) => {
                    completion();
                    self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
                }
                Err(_) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineDocument;
    use parking_lot::Mutex;

    fn collect_into(
        sink: Arc<Mutex<Vec<String>>>,
        tag: &'static str,
    ) -> impl FnOnce(Result<String>) + Send + 'static {
        move |outcome| {
            sink.lock().push(format!("{tag}:{}", outcome.unwrap()));
        }
    }

    #[test]
    fn test_outcome_delivered_exactly_once() {
        let dispatcher = Dispatcher::new(DispatcherConfig::default()).unwrap();
        let handle = Handle::new(EngineDocument::new());
        let sink = Arc::new(Mutex::new(Vec::new()));

        dispatcher
            .submit(
                &handle,
                |_slot| Ok("done".to_string()),
                collect_into(sink.clone(), "a"),
            )
            .unwrap();

        dispatcher.pump_until_idle();
        assert_eq!(*sink.lock(), vec!["a:done".to_string()]);
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[test]
    fn test_worker_error_reaches_continuation() {
        let dispatcher = Dispatcher::new(DispatcherConfig::default()).unwrap();
        let handle = Handle::new(EngineDocument::new());
        let seen = Arc::new(Mutex::new(None));
        let seen_in = seen.clone();

        dispatcher
            .submit(
                &handle,
                |_slot| -> Result<()> { Err(FalxError::engine("it broke")) },
                move |outcome| {
                    *seen_in.lock() = Some(outcome.unwrap_err().to_string());
                },
            )
            .unwrap();

        dispatcher.pump_until_idle();
        assert_eq!(seen.lock().as_deref(), Some("engine error: it broke"));
        // The error path still cleared busy.
        assert!(!handle.is_busy());
    }

    #[test]
    fn test_same_handle_serialized_by_admission() {
        // One worker thread, blocked by a gate task on another handle, so
        // the first task's worker body provably has not run yet.
        let dispatcher = Dispatcher::new(DispatcherConfig {
            worker_threads: Some(1),
        })
        .unwrap();
        let gate_handle = Handle::new(EngineDocument::new());
        let handle = Handle::new(EngineDocument::new());
        let (gate_tx, gate_rx) = crossbeam_channel::bounded::<()>(0);
        let (started_tx, started_rx) = crossbeam_channel::bounded::<()>(0);

        dispatcher
            .submit(
                &gate_handle,
                move |_slot| {
                    started_tx.send(()).ok();
                    let _ = gate_rx.recv();
                    Ok(())
                },
                |_outcome: Result<()>| {},
            )
            .unwrap();
        started_rx.recv().unwrap();

        dispatcher
            .submit(&handle, |_slot| Ok(()), |_outcome: Result<()>| {})
            .unwrap();

        // Admitted means busy, even though its worker body has not started.
        let err = dispatcher
            .submit(&handle, |_slot| Ok(()), |_outcome: Result<()>| {})
            .unwrap_err();
        assert!(matches!(err, FalxError::Busy(_)));

        gate_tx.send(()).unwrap();
        dispatcher.pump_until_idle();

        // After the worker body finishes, admission succeeds again.
        dispatcher
            .submit(&handle, |_slot| Ok(()), |_outcome: Result<()>| {})
            .unwrap();
        dispatcher.pump_until_idle();
    }

    #[test]
    fn test_completions_delivered_in_queue_order() {
        let dispatcher = Dispatcher::new(DispatcherConfig {
            worker_threads: Some(1),
        })
        .unwrap();
        let first = Handle::new(EngineDocument::new());
        let second = Handle::new(EngineDocument::new());
        let sink = Arc::new(Mutex::new(Vec::new()));

        // A single worker thread runs the bodies in submission order, so
        // the completions queue in that order too.
        dispatcher
            .submit(
                &first,
                |_slot| Ok("1".to_string()),
                collect_into(sink.clone(), "t"),
            )
            .unwrap();
        dispatcher
            .submit(
                &second,
                |_slot| Ok("2".to_string()),
                collect_into(sink.clone(), "t"),
            )
            .unwrap();

        dispatcher.pump_until_idle();
        assert_eq!(*sink.lock(), vec!["t:1".to_string(), "t:2".to_string()]);
    }

    #[test]
    fn test_same_handle_completions_in_issue_order() {
        let dispatcher = Dispatcher::new(DispatcherConfig {
            worker_threads: Some(2),
        })
        .unwrap();
        let handle = Handle::new(EngineDocument::new());
        let sink = Arc::new(Mutex::new(Vec::new()));

        let (gate_tx, gate_rx) = crossbeam_channel::bounded::<()>(0);
        dispatcher
            .submit(
                &handle,
                move |_slot| {
                    let _ = gate_rx.recv();
                    Ok("first".to_string())
                },
                collect_into(sink.clone(), "h"),
            )
            .unwrap();
        gate_tx.send(()).unwrap();

        // Admission succeeding is the signal that the first worker body
        // ended; its completion must already be queued by then, so the
        // second task's completion lands behind it.
        loop {
            match dispatcher.submit(
                &handle,
                |_slot| Ok("second".to_string()),
                collect_into(sink.clone(), "h"),
            ) {
                Ok(()) => break,
                Err(FalxError::Busy(_)) => std::thread::yield_now(),
                Err(other) => panic!("unexpected admission error: {other}"),
            }
        }

        dispatcher.pump_until_idle();
        assert_eq!(
            *sink.lock(),
            vec!["h:first".to_string(), "h:second".to_string()]
        );
    }

    #[test]
    fn test_continuation_may_submit_follow_up() {
        let dispatcher = Dispatcher::new(DispatcherConfig::default()).unwrap();
        let handle = Handle::new(EngineDocument::new());
        let sink = Arc::new(Mutex::new(Vec::new()));

        let chain_dispatcher = dispatcher.clone();
        let chain_handle = handle.clone();
        let chain_sink = sink.clone();
        dispatcher
            .submit(
                &handle,
                |_slot| Ok("first".to_string()),
                move |outcome| {
                    chain_sink.lock().push(outcome.unwrap());
                    chain_dispatcher
                        .submit(
                            &chain_handle,
                            |_slot| Ok("second".to_string()),
                            collect_into(chain_sink.clone(), "chained"),
                        )
                        .unwrap();
                },
            )
            .unwrap();

        dispatcher.pump_until_idle();
        assert_eq!(
            *sink.lock(),
            vec!["first".to_string(), "chained:second".to_string()]
        );
    }

    #[test]
    fn test_pump_is_nonblocking_when_queue_empty() {
        let dispatcher = Dispatcher::new(DispatcherConfig::default()).unwrap();
        assert_eq!(dispatcher.pump(), 0);
        assert!(!dispatcher.pump_one());
    }
}
