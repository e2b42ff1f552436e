use crate::Error;

/// Settlement state of a future.
///
/// A future starts `Pending` and moves to `Resolved` or `Rejected` at most
/// once.
#[derive(Debug, Clone)]
pub enum State<T> {
    Pending,
    Resolved(T),
    Rejected(Error),
}

impl<T> State<T> {
    pub fn is_pending(&self) -> bool {
        matches!(*self, State::Pending)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(*self, State::Resolved(..))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(*self, State::Rejected(..))
    }

    pub fn value(&self) -> Option<&T> {
        match *self {
            State::Resolved(ref value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match *self {
            State::Rejected(ref err) => Some(err),
            _ => None,
        }
    }
}
