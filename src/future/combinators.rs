//! `then`, `map`, `and_then`, `catch` and `always`.
//!
//! Every combinator is built from the public primitives only: it creates a
//! derived future with an empty body, registers a pair of observers on the
//! source that settle the derived future, then runs the body of the derived
//! future and of the source. The derived future holds no reference to its
//! source.

use super::{Future, Observer};
use crate::rt::Executor;
use crate::Error;
use parking_lot::Mutex;
use std::sync::Arc;

impl<T: Clone + Send + 'static> Future<T> {
    /// Run `body` with the resolved value, then resolve with that same value.
    ///
    /// If `body` fails, the returned future is rejected with its error. A
    /// rejection of `self` is forwarded without calling `body`.
    pub fn then<F>(&self, executor: &Executor, body: F) -> Future<T>
    where
        F: FnOnce(&T) -> Result<(), Error> + Send + 'static,
    {
        let next = derived::<T>(executor);

        let resolve = next.clone();
        let reject = next.clone();

        self.add_observers(vec![
            Observer::on_resolve(executor, move |value: T| match body(&value) {
                Ok(()) => resolve.resolve(value),
                Err(err) => resolve.reject(err),
            }),
            Observer::on_reject(executor, move |err| reject.reject(err)),
        ]);

        self.kick(&next);
        next
    }

    /// Transform the resolved value.
    ///
    /// Shorthand for `and_then` with a body that wraps its result in an
    /// already settled future.
    pub fn map<U, F>(&self, executor: &Executor, body: F) -> Future<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<U, Error> + Send + 'static,
    {
        self.and_then(executor, move |value| {
            Ok(match body(value) {
                Ok(value) => Future::resolved(value),
                Err(err) => Future::rejected(err),
            })
        })
    }

    /// Chain a future produced from the resolved value.
    ///
    /// The returned future settles the way the inner future does. If `body`
    /// fails, no inner future exists and the returned future is rejected
    /// with the error.
    pub fn and_then<U, F>(&self, executor: &Executor, body: F) -> Future<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<Future<U>, Error> + Send + 'static,
    {
        let next = derived::<U>(executor);

        let chain = next.clone();
        let reject = next.clone();
        let inner_executor = executor.clone();

        self.add_observers(vec![
            Observer::on_resolve(executor, move |value: T| {
                let inner = match body(value) {
                    Ok(inner) => inner,
                    Err(err) => return chain.reject(err),
                };

                let resolve = chain.clone();
                let reject = chain;

                inner.add_observers(vec![
                    Observer::on_resolve(&inner_executor, move |value| resolve.resolve(value)),
                    Observer::on_reject(&inner_executor, move |err| reject.reject(err)),
                ]);
                inner.run_body();
            }),
            Observer::on_reject(executor, move |err| reject.reject(err)),
        ]);

        self.kick(&next);
        next
    }

    /// Handle a rejection.
    ///
    /// `body` only runs if `self` is rejected. The returned future resolves
    /// to `()` whatever the outcome, unless `body` fails, in which case it is
    /// rejected with the new error.
    pub fn catch<F>(&self, executor: &Executor, body: F) -> Future<()>
    where
        F: FnOnce(Error) -> Result<(), Error> + Send + 'static,
    {
        let next = derived::<()>(executor);

        let resolve = next.clone();
        let handle = next.clone();

        self.add_observers(vec![
            Observer::on_resolve(executor, move |_: T| resolve.resolve(())),
            Observer::on_reject(executor, move |err| match body(err) {
                Ok(()) => handle.resolve(()),
                Err(err) => handle.reject(err),
            }),
        ]);

        self.kick(&next);
        next
    }

    /// Run `body` however `self` settles and forward the outcome.
    ///
    /// If `body` fails, its error replaces the outcome, resolved or not.
    pub fn always<F>(&self, executor: &Executor, body: F) -> Future<T>
    where
        F: FnOnce() -> Result<(), Error> + Send + 'static,
    {
        let next = derived::<T>(executor);

        // Only one half of the pair ever runs.
        let body = Arc::new(Mutex::new(Some(body)));
        let on_reject_body = body.clone();

        let resolve = next.clone();
        let reject = next.clone();

        self.add_observers(vec![
            Observer::on_resolve(executor, move |value: T| {
                match run_shared(&body) {
                    Ok(()) => resolve.resolve(value),
                    Err(err) => resolve.reject(err),
                }
            }),
            Observer::on_reject(executor, move |err| {
                let err = run_shared(&on_reject_body).err().unwrap_or(err);
                reject.reject(err);
            }),
        ]);

        self.kick(&next);
        next
    }

    // Start the derived future's (empty) body and then this future's body.
    fn kick<U: Clone + Send + 'static>(&self, next: &Future<U>) {
        next.run_body();
        self.run_body();
    }
}

// A pending future whose body never settles it; observers on the source do.
fn derived<U: Clone + Send + 'static>(executor: &Executor) -> Future<U> {
    Future::deferred(executor, |_| Ok(()))
}

fn run_shared<F>(body: &Mutex<Option<F>>) -> Result<(), Error>
where
    F: FnOnce() -> Result<(), Error>,
{
    // The lock is released before `body` runs.
    let body = body.lock().take();

    match body {
        Some(body) => body(),
        None => Ok(()),
    }
}

#[cfg(test)]
mod test {
    use crate::future::Future;
    use crate::rt::{Executor, Work};
    use crate::Error;
    use crossbeam_channel::Receiver;

    // Queues work until the test drains it.
    fn manual() -> (Executor, Receiver<Work>) {
        let (tx, rx) = crossbeam_channel::unbounded::<Work>();
        let executor = Executor::new(move |work: Work| {
            tx.send(work).unwrap();
        });
        (executor, rx)
    }

    // Runs queued work, including work queued while draining.
    fn drain(queue: &Receiver<Work>) {
        while let Ok(work) = queue.try_recv() {
            work();
        }
    }

    #[test]
    fn test_then_forwards_value_after_side_effect() {
        let (executor, queue) = manual();
        let (tx, rx) = crossbeam_channel::unbounded();

        let f = Future::resolved(3).then(&executor, move |v| {
            tx.send(*v).unwrap();
            Ok(())
        });

        drain(&queue);

        assert_eq!(rx.try_recv().unwrap(), 3);
        assert_eq!(f.result(), Some(3));
    }

    #[test]
    fn test_nothing_runs_until_drained() {
        let (executor, queue) = manual();
        let src = Future::<i32>::deferred(&executor, |c| {
            c.resolve(1);
            Ok(())
        });

        let next = src.map(&executor, |v| Ok(v * 10));

        // The derived body and the source body were both dispatched.
        assert!(next.is_pending());
        assert!(src.is_pending());

        drain(&queue);

        assert_eq!(next.result(), Some(10));
    }

    #[test]
    fn test_catch_replaces_error_when_handler_fails() {
        let (executor, queue) = manual();

        let f = Future::<i32>::rejected(Error::msg("original"))
            .catch(&executor, |_| Err(Error::msg("replacement")));

        drain(&queue);

        assert_eq!(f.error().unwrap().to_string(), "replacement");
    }

    #[test]
    fn test_always_runs_its_body_once_per_settlement() {
        let (executor, queue) = manual();
        let (tx, rx) = crossbeam_channel::unbounded();

        let f = Future::<i32>::rejected(Error::msg("e")).always(&executor, move || {
            tx.send(()).unwrap();
            Ok(())
        });

        drain(&queue);

        assert_eq!(rx.try_iter().count(), 1);
        assert_eq!(f.error().unwrap().to_string(), "e");
    }
}
