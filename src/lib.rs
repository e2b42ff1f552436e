//! Settle-once deferred values.
//!
//! A `Future` holds a value that becomes available asynchronously. Deferred
//! futures carry a body that runs on an executor supplied by a `Runtime` and
//! settles the future through a `Completer`. Combinators (`then`, `map`,
//! `and_then`, `catch`, `always`) derive new futures whose outcome follows
//! from the source's.
//!
//! ```no_run
//! use pledge::{ExecutionContext, Future, Runtime};
//!
//! let rt = Runtime::new().unwrap();
//! let background = rt.executor(&ExecutionContext::Background);
//!
//! Future::<u32>::deferred(&background, |c| {
//!     c.resolve(42);
//!     Ok(())
//! })
//! .map(&background, |v| Ok(v + 1))
//! .then(&rt.main(), |v| {
//!     println!("got {}", v);
//!     Ok(())
//! });
//! ```

#[macro_use]
extern crate log;

pub use error::Error;
pub use future::{Completer, Future, Observer, State};
pub use rt::{Builder, Execute, ExecutionContext, Executor, QoS, Runtime, RuntimeError, Work};

pub mod future;
pub mod rt;

mod error;
