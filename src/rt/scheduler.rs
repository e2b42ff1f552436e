//! Worker threads backing the runtime's execution contexts.
//!
//! A scheduler is a queue drained by a fixed set of worker threads. With a
//! single worker it is serial and runs work in submission order; with more
//! it is a pool and only the dequeue order is FIFO.

use super::executor::{Execute, Work};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    name: String,
    tx: Sender<Op>,
    shared: Arc<Shared>,
}

// Worker threads only hold `Shared`, never the sender, so the queue
// disconnects once every scheduler handle is gone.
struct Shared {
    state: Mutex<State>,
    condvar: Condvar,
}

struct State {
    lifecycle: Lifecycle,
    workers: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Running,
    Terminating,
    Terminated,
}

enum Op {
    Task(Work),
    Terminate,
}

impl Scheduler {
    /// Spawn `workers` threads named after `name` and return the scheduler
    /// feeding them.
    pub fn spawn(name: &str, workers: usize, stack_size: Option<usize>) -> io::Result<Scheduler> {
        let (tx, rx) = crossbeam_channel::unbounded();

        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                lifecycle: Lifecycle::Running,
                workers: 0,
            }),
            condvar: Condvar::new(),
        });

        let scheduler = Scheduler {
            inner: Arc::new(SchedulerInner {
                name: name.to_string(),
                tx,
                shared: shared.clone(),
            }),
        };

        for i in 0..workers {
            let thread_name = if workers == 1 {
                name.to_string()
            } else {
                format!("{}-{}", name, i)
            };

            let mut builder = thread::Builder::new().name(thread_name);

            if let Some(size) = stack_size {
                builder = builder.stack_size(size);
            }

            let rx = rx.clone();
            let worker_shared = shared.clone();

            // Count the worker before it starts so a fast exit can't
            // underflow.
            shared.state.lock().workers += 1;

            if let Err(e) = builder.spawn(move || worker_loop(rx, worker_shared)) {
                shared.state.lock().workers -= 1;
                scheduler.terminate();
                return Err(e);
            }
        }

        debug!("scheduler `{}` started with {} worker(s)", name, workers);

        Ok(scheduler)
    }

    /// Number of worker threads still running.
    pub fn workers(&self) -> usize {
        self.inner.shared.state.lock().workers
    }

    /// Stop accepting work and enqueue one terminate token per worker. Work
    /// queued before the call still runs.
    pub fn terminate(&self) {
        let mut state = self.inner.shared.state.lock();

        if state.lifecycle != Lifecycle::Running {
            return;
        }

        debug!("enqueuing terminate tokens; scheduler={}", self.inner.name);

        if state.workers == 0 {
            state.lifecycle = Lifecycle::Terminated;
            return;
        }

        state.lifecycle = Lifecycle::Terminating;

        for _ in 0..state.workers {
            // Workers hold the receiver until they see the token.
            let _ = self.inner.tx.send(Op::Terminate);
        }
    }

    /// Terminate and wait for every worker to exit. Returns false if the
    /// timeout elapsed first.
    ///
    /// Must not be called from one of this scheduler's own workers without a
    /// timeout, since that worker would wait on itself.
    pub fn shutdown(&self, timeout: Option<Duration>) -> bool {
        self.terminate();

        let deadline = timeout.map(|t| Instant::now() + t);
        let shared = &self.inner.shared;
        let mut state = shared.state.lock();

        while state.lifecycle != Lifecycle::Terminated {
            match deadline {
                Some(deadline) => {
                    if shared.condvar.wait_until(&mut state, deadline).timed_out() {
                        return state.lifecycle == Lifecycle::Terminated;
                    }
                }
                None => shared.condvar.wait(&mut state),
            }
        }

        true
    }
}

impl Execute for Scheduler {
    fn submit(&self, work: Work) {
        // Hold the lock across the send so nothing can be queued behind the
        // terminate tokens.
        let state = self.inner.shared.state.lock();

        if state.lifecycle != Lifecycle::Running {
            warn!("scheduler `{}` is shut down; dropping work", self.inner.name);
            return;
        }

        if self.inner.tx.send(Op::Task(work)).is_err() {
            warn!("scheduler `{}` has no workers; dropping work", self.inner.name);
        }
    }
}

// ===== Background worker =====

fn worker_loop(rx: Receiver<Op>, shared: Arc<Shared>) {
    trace!("worker starting; thread={:?}", thread::current().name());

    while let Ok(op) = rx.recv() {
        match op {
            Op::Task(work) => {
                if panic::catch_unwind(AssertUnwindSafe(work)).is_err() {
                    error!("work panicked; thread={:?}", thread::current().name());
                }
            }
            Op::Terminate => break,
        }
    }

    trace!("worker exiting; thread={:?}", thread::current().name());

    let mut state = shared.state.lock();

    state.workers -= 1;

    if state.workers == 0 {
        // Transition to the terminated state
        state.lifecycle = Lifecycle::Terminated;
        // Signal any waiting threads
        shared.condvar.notify_all();
    }
}
