use std::fmt;
use std::sync::Arc;

/// The reason a future was rejected.
///
/// Errors are shared between every observer of a rejected future, so the
/// underlying error is reference counted and cloning is cheap. Any
/// `std::error::Error + Send + Sync + 'static` converts into an `Error`,
/// which lets bodies and handlers use `?`.
///
/// Like `anyhow::Error`, this type does not implement `std::error::Error`
/// itself; doing so would conflict with the blanket `From` conversion.
#[derive(Clone)]
pub struct Error {
    inner: Arc<anyhow::Error>,
}

impl Error {
    /// Wrap a concrete error.
    pub fn new<E>(err: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error { inner: Arc::new(anyhow::Error::new(err)) }
    }

    /// Create an error from a printable message.
    pub fn msg<M>(msg: M) -> Error
    where
        M: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        Error { inner: Arc::new(anyhow::Error::msg(msg)) }
    }

    /// Wrap an existing `anyhow::Error`.
    pub fn from_anyhow(err: anyhow::Error) -> Error {
        Error { inner: Arc::new(err) }
    }

    /// Returns true if the wrapped error is of type `E`.
    pub fn is<E>(&self) -> bool
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.inner.is::<E>()
    }

    /// Attempt to borrow the wrapped error as a concrete type.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.inner.downcast_ref::<E>()
    }

    /// Returns true if both handles refer to the same rejection.
    pub fn ptr_eq(&self, other: &Error) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<E> From<E> for Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: E) -> Error {
        Error::new(err)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, fmt)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, fmt)
    }
}
