use super::executor::Executor;
use std::fmt;

/// Quality-of-service class of a background pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QoS {
    UserInteractive,
    UserInitiated,
    Utility,
    Background,
}

impl QoS {
    pub const ALL: [QoS; 4] = [
        QoS::UserInteractive,
        QoS::UserInitiated,
        QoS::Utility,
        QoS::Background,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            QoS::UserInteractive => 0,
            QoS::UserInitiated => 1,
            QoS::Utility => 2,
            QoS::Background => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QoS::UserInteractive => "user-interactive",
            QoS::UserInitiated => "user-initiated",
            QoS::Utility => "utility",
            QoS::Background => "background",
        }
    }
}

impl fmt::Display for QoS {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(self.label())
    }
}

/// Where a body or handler runs.
///
/// A context is only a name; `Runtime::executor` maps it to the executor
/// that actually runs the work. `Custom` carries a caller supplied executor
/// and maps to itself.
#[derive(Debug, Clone)]
pub enum ExecutionContext {
    /// The application's main thread. Serial.
    Main,
    UserInteractive,
    UserInitiated,
    Utility,
    Background,
    Custom(Executor),
}

impl ExecutionContext {
    /// The pool class backing this context, if it is one of the pools.
    pub fn qos(&self) -> Option<QoS> {
        match *self {
            ExecutionContext::UserInteractive => Some(QoS::UserInteractive),
            ExecutionContext::UserInitiated => Some(QoS::UserInitiated),
            ExecutionContext::Utility => Some(QoS::Utility),
            ExecutionContext::Background => Some(QoS::Background),
            ExecutionContext::Main | ExecutionContext::Custom(..) => None,
        }
    }

    /// Serial contexts run work one at a time in submission order.
    pub fn is_serial(&self) -> bool {
        matches!(*self, ExecutionContext::Main)
    }
}

impl From<QoS> for ExecutionContext {
    fn from(qos: QoS) -> ExecutionContext {
        match qos {
            QoS::UserInteractive => ExecutionContext::UserInteractive,
            QoS::UserInitiated => ExecutionContext::UserInitiated,
            QoS::Utility => ExecutionContext::Utility,
            QoS::Background => ExecutionContext::Background,
        }
    }
}

impl From<Executor> for ExecutionContext {
    fn from(executor: Executor) -> ExecutionContext {
        ExecutionContext::Custom(executor)
    }
}
