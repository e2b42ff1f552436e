use super::State;
use crate::rt::Executor;
use crate::Error;
use std::fmt;

/// A callback waiting for a future to settle, bound to the executor it runs
/// on.
///
/// Observers are registered in pairs by the combinators, one per outcome.
/// Whichever half does not match the final state is dropped without running.
pub enum Observer<T> {
    OnResolve(Executor, Box<dyn FnOnce(T) + Send>),
    OnReject(Executor, Box<dyn FnOnce(Error) + Send>),
}

impl<T: Clone + Send + 'static> Observer<T> {
    pub fn on_resolve<F>(executor: &Executor, handler: F) -> Observer<T>
    where
        F: FnOnce(T) + Send + 'static,
    {
        Observer::OnResolve(executor.clone(), Box::new(handler))
    }

    pub fn on_reject<F>(executor: &Executor, handler: F) -> Observer<T>
    where
        F: FnOnce(Error) + Send + 'static,
    {
        Observer::OnReject(executor.clone(), Box::new(handler))
    }

    /// Submit the handler to its executor if it matches `state`. Never runs
    /// the handler on the calling thread.
    pub(crate) fn notify(self, state: &State<T>) {
        match (self, state) {
            (Observer::OnResolve(executor, handler), State::Resolved(value)) => {
                let value = value.clone();
                executor.run(move || handler(value));
            }
            (Observer::OnReject(executor, handler), State::Rejected(err)) => {
                let err = err.clone();
                executor.run(move || handler(err));
            }
            (_, State::Pending) => {
                debug_assert!(false, "notified observer of a pending future");
            }
            // The other half of the pair handles this outcome.
            _ => {}
        }
    }
}

impl<T> fmt::Debug for Observer<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Observer::OnResolve(ref executor, _) => write!(fmt, "OnResolve({:?})", executor),
            Observer::OnReject(ref executor, _) => write!(fmt, "OnReject({:?})", executor),
        }
    }
}
