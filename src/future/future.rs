use super::{Observer, State};
use crate::rt::Executor;
use crate::Error;
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::mem;
use std::sync::Arc;

type Body<T> = Box<dyn FnOnce(Completer<T>) -> Result<(), Error> + Send>;

/// A value that becomes available asynchronously.
///
/// A future settles at most once, to either a value or an `Error`. Handles
/// are cheap to clone and every clone refers to the same settlement.
///
/// Deferred futures own a body that runs at most once, on the executor given
/// at construction. The body is started by `run_body`, which every
/// combinator calls on its source, so attaching any combinator starts the
/// chain upstream of it.
pub struct Future<T> {
    inner: Arc<Inner<T>>,
}

impl<T: Clone + Send + 'static> Future<T> {
    /// A future with no body that stays pending until `resolve` or `reject`
    /// is called on it.
    pub fn pending() -> Future<T> {
        Future::with_core(Core::new(State::Pending, None), None)
    }

    pub fn resolved(value: T) -> Future<T> {
        Future::with_core(Core::new(State::Resolved(value), None), None)
    }

    pub fn rejected<E: Into<Error>>(err: E) -> Future<T> {
        Future::with_core(Core::new(State::Rejected(err.into()), None), None)
    }

    /// A pending future that runs `body` on `executor` once started.
    ///
    /// The body settles the future through its `Completer`. Returning `Err`
    /// rejects the future with that error.
    pub fn deferred<F>(executor: &Executor, body: F) -> Future<T>
    where
        F: FnOnce(Completer<T>) -> Result<(), Error> + Send + 'static,
    {
        let body: Body<T> = Box::new(body);
        Future::with_core(Core::new(State::Pending, Some(body)), Some(executor.clone()))
    }

    fn with_core(core: Core<T>, executor: Option<Executor>) -> Future<T> {
        Future {
            inner: Arc::new(Inner {
                core: Mutex::new(core),
                executor,
            }),
        }
    }

    /// Settle the future with `value`. Ignored if already settled.
    pub fn resolve(&self, value: T) {
        self.settle(State::Resolved(value));
    }

    /// Settle the future with `err`. Ignored if already settled.
    pub fn reject<E: Into<Error>>(&self, err: E) {
        self.settle(State::Rejected(err.into()));
    }

    fn settle(&self, state: State<T>) {
        let mut core = self.lock();

        if !core.state.is_pending() {
            trace!("future already settled; ignoring; name={:?}", core.name);
            return;
        }

        debug!(
            "settling future; name={:?}; resolved={}; observers={}",
            core.name,
            state.is_resolved(),
            core.observers.len()
        );

        core.state = state;

        // Notifications only enqueue work, so they are submitted under the
        // lock to keep them in registration order.
        let observers = mem::take(&mut core.observers);

        for observer in observers {
            observer.notify(&core.state);
        }
    }

    /// Register observers. If the future has already settled they are
    /// notified right away instead of being stored.
    pub fn add_observers(&self, observers: Vec<Observer<T>>) {
        let mut core = self.lock();

        if core.state.is_pending() {
            core.observers.extend(observers);
            return;
        }

        for observer in observers {
            observer.notify(&core.state);
        }
    }

    /// Register a pair of handlers that run on `executor` once the future
    /// settles.
    pub fn observe<R, J>(&self, executor: &Executor, on_resolve: R, on_reject: J)
    where
        R: FnOnce(T) + Send + 'static,
        J: FnOnce(Error) + Send + 'static,
    {
        self.add_observers(vec![
            Observer::on_resolve(executor, on_resolve),
            Observer::on_reject(executor, on_reject),
        ]);
    }

    /// Start the body if it has not started yet. Does nothing for settled
    /// futures and futures created without a body.
    pub fn run_body(&self) {
        let body = {
            let mut core = self.lock();

            if !core.state.is_pending() || core.body_started {
                return;
            }

            core.body_started = true;
            core.body.take()
        };

        let (body, executor) = match (body, self.inner.executor.as_ref()) {
            (Some(body), Some(executor)) => (body, executor),
            _ => return,
        };

        trace!("dispatching future body");

        let completer = Completer { future: self.clone() };

        executor.run(move || {
            let rejecter = completer.clone();

            if let Err(err) = body(completer) {
                rejecter.reject(err);
            }
        });
    }

    /// The resolved value, if the future has resolved.
    pub fn result(&self) -> Option<T> {
        self.lock().state.value().cloned()
    }

    /// The rejection, if the future has been rejected.
    pub fn error(&self) -> Option<Error> {
        self.lock().state.error().cloned()
    }

    pub fn is_pending(&self) -> bool {
        self.lock().state.is_pending()
    }

    pub fn is_resolved(&self) -> bool {
        self.lock().state.is_resolved()
    }

    pub fn is_rejected(&self) -> bool {
        self.lock().state.is_rejected()
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> State<T> {
        self.lock().state.clone()
    }

    /// Attach a name shown in `Debug` output and log lines.
    pub fn set_name<S: Into<String>>(&self, name: S) {
        self.lock().name = Some(name.into());
    }

    pub fn name(&self) -> Option<String> {
        self.lock().name.clone()
    }

    /// The executor the body runs on, if the future was created deferred.
    pub fn executor(&self) -> Option<&Executor> {
        self.inner.executor.as_ref()
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, Core<T>> {
        self.inner.core.lock()
    }
}

impl<T> Clone for Future<T> {
    fn clone(&self) -> Future<T> {
        Future { inner: self.inner.clone() }
    }
}

impl<T: fmt::Debug> fmt::Debug for Future<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let core = self.inner.core.lock();

        fmt.debug_struct("Future")
            .field("name", &core.name)
            .field("state", &core.state)
            .field("body_started", &core.body_started)
            .field("observers", &core.observers.len())
            .finish()
    }
}

/// Settles a deferred future from inside (or outside) its body.
///
/// Only the first settlement of the future takes effect; later calls are
/// silently ignored.
pub struct Completer<T> {
    future: Future<T>,
}

impl<T: Clone + Send + 'static> Completer<T> {
    pub fn resolve(&self, value: T) {
        self.future.resolve(value);
    }

    pub fn reject<E: Into<Error>>(&self, err: E) {
        self.future.reject(err);
    }

    /// The future this completer settles.
    pub fn future(&self) -> Future<T> {
        self.future.clone()
    }
}

impl<T> Clone for Completer<T> {
    fn clone(&self) -> Completer<T> {
        Completer { future: self.future.clone() }
    }
}

// == Implementation details ==
//
// All state lives behind one mutex per future. No code path holds the lock
// of one future while acquiring another's.
struct Inner<T> {
    core: Mutex<Core<T>>,
    executor: Option<Executor>,
}

struct Core<T> {
    state: State<T>,
    body: Option<Body<T>>,
    body_started: bool,
    observers: Vec<Observer<T>>,
    name: Option<String>,
}

impl<T> Core<T> {
    fn new(state: State<T>, body: Option<Body<T>>) -> Core<T> {
        Core {
            body_started: body.is_none(),
            state,
            body,
            observers: Vec::new(),
            name: None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::Future;
    use crate::rt::{Executor, Work};
    use crate::Error;
    use crossbeam_channel::Receiver;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);

    // Runs each piece of work on a fresh thread.
    fn spawner() -> Executor {
        Executor::new(|work: Work| {
            thread::spawn(work);
        })
    }

    // Queues work until the test drains it by hand.
    fn manual() -> (Executor, Receiver<Work>) {
        let (tx, rx) = crossbeam_channel::unbounded::<Work>();
        let executor = Executor::new(move |work: Work| {
            tx.send(work).unwrap();
        });
        (executor, rx)
    }

    #[test]
    fn test_first_settlement_wins() {
        let f = Future::<i32>::pending();

        f.resolve(1);
        f.reject(Error::msg("late"));
        f.resolve(2);

        assert_eq!(f.result(), Some(1));
        assert!(f.error().is_none());
        assert!(!f.is_pending());

        let g = Future::<i32>::pending();

        g.reject(Error::msg("first"));
        g.resolve(3);

        assert_eq!(g.result(), None);
        assert_eq!(g.error().unwrap().to_string(), "first");
    }

    #[test]
    fn test_terminal_constructors_have_no_body() {
        let resolved = Future::resolved("done");
        let rejected = Future::<()>::rejected(Error::msg("nope"));

        resolved.run_body();
        rejected.run_body();

        assert_eq!(resolved.result(), Some("done"));
        assert!(rejected.is_rejected());
        assert!(resolved.executor().is_none());
    }

    #[test]
    fn test_deferred_body_does_not_start_on_its_own() {
        let (executor, queue) = manual();
        let f = Future::<i32>::deferred(&executor, |c| {
            c.resolve(1);
            Ok(())
        });

        assert!(queue.try_recv().is_err());
        assert!(f.is_pending());

        f.run_body();
        f.run_body();

        let work = queue.try_recv().unwrap();
        assert!(queue.try_recv().is_err(), "body dispatched twice");

        assert!(f.is_pending());
        work();
        assert_eq!(f.result(), Some(1));
    }

    #[test]
    fn test_body_error_rejects() {
        let (executor, queue) = manual();
        let f = Future::<i32>::deferred(&executor, |_| Err(Error::msg("thrown")));

        f.run_body();
        queue.try_recv().unwrap()();

        assert_eq!(f.error().unwrap().to_string(), "thrown");
    }

    #[test]
    fn test_body_error_after_resolve_is_ignored() {
        let (executor, queue) = manual();
        let f = Future::<i32>::deferred(&executor, |c| {
            c.resolve(5);
            Err(Error::msg("too late"))
        });

        f.run_body();
        queue.try_recv().unwrap()();

        assert_eq!(f.result(), Some(5));
    }

    #[test]
    fn test_run_body_on_settled_future_is_noop() {
        let (executor, queue) = manual();
        let f = Future::<i32>::deferred(&executor, |c| {
            c.resolve(1);
            Ok(())
        });

        f.resolve(9);
        f.run_body();

        assert!(queue.try_recv().is_err());
        assert_eq!(f.result(), Some(9));
    }

    #[test]
    fn test_observers_are_notified_in_registration_order() {
        let (executor, queue) = manual();
        let f = Future::<i32>::pending();
        let (tx, rx) = crossbeam_channel::unbounded();

        for i in 0..5 {
            let tx = tx.clone();
            f.observe(&executor, move |v| tx.send((i, v)).unwrap(), |_| {});
        }

        assert!(queue.try_recv().is_err(), "notified before settlement");

        f.resolve(7);

        // Only the matching half of each pair is submitted.
        let work: Vec<Work> = queue.try_iter().collect();
        assert_eq!(work.len(), 5);

        for w in work {
            w();
        }

        let seen: Vec<(i32, i32)> = rx.try_iter().collect();
        assert_eq!(seen, vec![(0, 7), (1, 7), (2, 7), (3, 7), (4, 7)]);
    }

    #[test]
    fn test_late_observer_is_notified_once_and_asynchronously() {
        let (executor, queue) = manual();
        let f = Future::<i32>::rejected(Error::msg("gone"));
        let calls = Arc::new(AtomicUsize::new(0));

        let c = calls.clone();
        f.observe(&executor, |_| panic!("resolved?"), move |err| {
            assert_eq!(err.to_string(), "gone");
            c.fetch_add(1, Ordering::SeqCst);
        });

        // Nothing runs inline.
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        for w in queue.try_iter() {
            w();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);

        f.reject(Error::msg("again"));
        assert!(queue.try_recv().is_err());
    }

    #[test]
    fn test_concurrent_resolves_settle_exactly_once() {
        for _ in 0..50 {
            let f = Future::<i32>::pending();
            let (tx, rx) = crossbeam_channel::unbounded();

            f.observe(&spawner(), move |v| tx.send(v).unwrap(), |_| {});

            let a = f.clone();
            let b = f.clone();
            let t1 = thread::spawn(move || a.resolve(1));
            let t2 = thread::spawn(move || b.resolve(2));
            t1.join().unwrap();
            t2.join().unwrap();

            let result = f.result().unwrap();
            assert!(result == 1 || result == 2);
            assert_eq!(rx.recv_timeout(WAIT).unwrap(), result);
            assert!(rx.recv_timeout(Duration::from_millis(10)).is_err());
        }
    }

    #[test]
    fn test_name_shows_in_debug() {
        let f = Future::resolved(1u8);
        f.set_name("texture");

        assert_eq!(f.name().as_deref(), Some("texture"));
        assert!(format!("{:?}", f).contains("texture"));
    }
}
