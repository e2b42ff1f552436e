use std::fmt;
use std::sync::Arc;

/// A unit of work submitted to an executor.
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// Something that runs work asynchronously.
///
/// Implementations must never run `work` inline on the calling thread.
/// Futures submit observer notifications while holding their own lock, so an
/// executor that runs work synchronously can deadlock a future that settles
/// from inside one of its own handlers.
pub trait Execute: Send + Sync {
    fn submit(&self, work: Work);
}

impl<F> Execute for F
where
    F: Fn(Work) + Send + Sync,
{
    fn submit(&self, work: Work) {
        (self)(work)
    }
}

/// A cloneable handle to an executor.
#[derive(Clone)]
pub struct Executor {
    inner: Arc<dyn Execute>,
}

impl Executor {
    pub fn new<E: Execute + 'static>(execute: E) -> Executor {
        Executor { inner: Arc::new(execute) }
    }

    /// Schedule the closure to run on this executor.
    pub fn run<F: FnOnce() + Send + 'static>(&self, f: F) {
        self.inner.submit(Box::new(f));
    }

    pub fn submit(&self, work: Work) {
        self.inner.submit(work);
    }

    /// Returns true if both handles submit to the same executor.
    pub fn ptr_eq(&self, other: &Executor) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.inner) as *const (),
            Arc::as_ptr(&other.inner) as *const (),
        )
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "Executor({:p})", Arc::as_ptr(&self.inner) as *const ())
    }
}
