//! Executors that run future bodies and observer handlers.
//!
//! A `Runtime` owns one serial main thread and one worker pool per QoS
//! class. It is passed explicitly to the code that creates futures; there is
//! no global runtime.

pub use self::context::{ExecutionContext, QoS};
pub use self::executor::{Execute, Executor, Work};

use self::scheduler::Scheduler;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

mod context;
mod executor;
mod scheduler;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("the {0} pool must have at least one worker")]
    ZeroWorkers(QoS),
    #[error("failed to spawn worker thread `{name}`")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// Configures and starts a `Runtime`.
#[derive(Debug, Clone)]
pub struct Builder {
    pool_sizes: [usize; 4],
    thread_name_prefix: String,
    stack_size: Option<usize>,
}

impl Builder {
    pub fn new() -> Builder {
        let parallelism = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Builder {
            pool_sizes: [parallelism, parallelism, (parallelism / 2).max(1), 1],
            thread_name_prefix: "pledge".to_string(),
            stack_size: None,
        }
    }

    /// Number of worker threads in the pool for `qos`.
    pub fn pool_size(mut self, qos: QoS, workers: usize) -> Builder {
        self.pool_sizes[qos.index()] = workers;
        self
    }

    /// Worker threads are named `<prefix>-main`, `<prefix>-utility-<n>`, etc.
    pub fn thread_name_prefix(mut self, prefix: &str) -> Builder {
        self.thread_name_prefix = prefix.to_string();
        self
    }

    pub fn stack_size(mut self, bytes: usize) -> Builder {
        self.stack_size = Some(bytes);
        self
    }

    /// Spawn every worker thread and return the runtime.
    pub fn build(self) -> Result<Runtime, RuntimeError> {
        for qos in QoS::ALL {
            if self.pool_sizes[qos.index()] == 0 {
                return Err(RuntimeError::ZeroWorkers(qos));
            }
        }

        let mut started: Vec<Scheduler> = Vec::with_capacity(5);

        let main = self.spawn("main", 1)?;
        started.push(main.scheduler.clone());

        let mut pools = Vec::with_capacity(QoS::ALL.len());

        for qos in QoS::ALL {
            match self.spawn(qos.label(), self.pool_sizes[qos.index()]) {
                Ok(lane) => {
                    started.push(lane.scheduler.clone());
                    pools.push(lane);
                }
                Err(e) => {
                    for scheduler in &started {
                        scheduler.terminate();
                    }
                    return Err(e);
                }
            }
        }

        debug!("runtime `{}` started", self.thread_name_prefix);

        Ok(Runtime {
            inner: Arc::new(RuntimeInner { main, pools }),
        })
    }

    fn spawn(&self, label: &str, workers: usize) -> Result<Lane, RuntimeError> {
        let name = format!("{}-{}", self.thread_name_prefix, label);

        let scheduler = Scheduler::spawn(&name, workers, self.stack_size)
            .map_err(|source| RuntimeError::Spawn { name, source })?;

        Ok(Lane {
            executor: Executor::new(scheduler.clone()),
            scheduler,
        })
    }
}

impl Default for Builder {
    fn default() -> Builder {
        Builder::new()
    }
}

/// Owns the executors behind each `ExecutionContext`.
///
/// Cloning a runtime clones a handle; all clones share the same threads.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

struct RuntimeInner {
    main: Lane,
    pools: Vec<Lane>,
}

struct Lane {
    scheduler: Scheduler,
    executor: Executor,
}

impl Runtime {
    /// Start a runtime with the default configuration.
    pub fn new() -> Result<Runtime, RuntimeError> {
        Builder::new().build()
    }

    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Map a context to the executor that runs its work.
    pub fn executor(&self, context: &ExecutionContext) -> Executor {
        match *context {
            ExecutionContext::Main => self.inner.main.executor.clone(),
            ExecutionContext::Custom(ref executor) => executor.clone(),
            ref pooled => {
                // Every context besides `Main` and `Custom` names a pool.
                let qos = pooled.qos().unwrap_or(QoS::Background);
                self.inner.pools[qos.index()].executor.clone()
            }
        }
    }

    pub fn main(&self) -> Executor {
        self.executor(&ExecutionContext::Main)
    }

    pub fn background(&self) -> Executor {
        self.executor(&ExecutionContext::Background)
    }

    /// Number of live worker threads for a context; `None` for `Custom`.
    pub fn workers(&self, context: &ExecutionContext) -> Option<usize> {
        match *context {
            ExecutionContext::Main => Some(self.inner.main.scheduler.workers()),
            ExecutionContext::Custom(..) => None,
            ref pooled => pooled
                .qos()
                .map(|qos| self.inner.pools[qos.index()].scheduler.workers()),
        }
    }

    /// Stop every worker once the work already queued has run, and wait for
    /// them to exit. Work submitted afterwards is dropped.
    pub fn shutdown(&self) {
        debug!("shutting down runtime");
        self.shutdown_inner(None);
    }

    /// Like `shutdown`, waiting at most `timeout`. Returns true if every
    /// worker exited in time.
    pub fn shutdown_timeout(&self, timeout: Duration) -> bool {
        debug!("shutting down runtime; timeout={:?}", timeout);
        self.shutdown_inner(Some(timeout))
    }

    fn shutdown_inner(&self, timeout: Option<Duration>) -> bool {
        let lanes = || Some(&self.inner.main).into_iter().chain(self.inner.pools.iter());

        // Terminate everything first so the pools wind down in parallel.
        for lane in lanes() {
            lane.scheduler.terminate();
        }

        let deadline = timeout.map(|t| Instant::now() + t);
        let mut clean = true;

        for lane in lanes() {
            let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            clean &= lane.scheduler.shutdown(remaining);
        }

        clean
    }
}
