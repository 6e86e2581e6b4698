//! Errors that escape the object core.
//!
//! AVM1 is permissive: failed writes, failed deletes and rejected prototype
//! links are silent and report through `bool` returns. Only the conditions
//! below propagate, and the bytecode interpreter decides how a script
//! observes them.

use thiserror::Error;

use crate::types::Value;

pub type Avm1Result<T> = Result<T, Avm1Error>;

#[derive(Debug, Clone, Error)]
pub enum Avm1Error {
    /// `new` on a native function without a construction entry point.
    #[error("{0} is not a constructor")]
    NotConstructible(String),

    /// Call on a value that carries no call behavior.
    #[error("{0} is not a function")]
    NotCallable(String),

    #[error("TypeError: {0}")]
    TypeError(String),

    /// A script-level `throw`, carried back to the interpreter untouched.
    #[error("uncaught {} thrown by script", .0.type_name())]
    Thrown(Value),

    #[error("script execution timed out")]
    Timeout,

    /// Interpreted code was invoked before an action interpreter was installed.
    #[error("no action interpreter installed")]
    NoInterpreter,
}

impl Avm1Error {
    pub fn type_error(message: impl Into<String>) -> Self {
        Avm1Error::TypeError(message.into())
    }
}
