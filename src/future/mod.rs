pub use self::future::{Completer, Future};
pub use self::observer::Observer;
pub use self::state::State;

mod combinators;
mod future;
mod observer;
mod state;
