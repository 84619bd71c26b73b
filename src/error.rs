//! Program-wide error type.
//!
//! Hand-rolled rather than built on `thiserror`, matching the host crate's
//! own `error.rs`: a flat enum of error kinds, each carrying a message,
//! with manual `Display`/`std::error::Error` impls.

use std::fmt;

/// The kinds of failure the VM can surface, per the error handling design.
#[derive(Debug, Clone)]
pub enum Error {
    /// Arithmetic/comparison/indexing on a wrong-typed operand, or a call to
    /// a non-callable value.
    Type(String),
    /// Array index out of `[0, size)`.
    Bounds(String),
    /// Stack growth, array growth, or object allocation failed.
    Resource(String),
    /// A named function was not found on VM entry.
    Lookup(String),
    /// A host callable returned failure; the message is the host's own.
    Host(String),
    /// An unknown opcode was dispatched — a compiler/VM disagreement bug.
    Internal(String),
}

impl Error {
    pub(crate) fn ty(msg: impl Into<String>) -> Self {
        Error::Type(msg.into())
    }

    pub(crate) fn bounds(msg: impl Into<String>) -> Self {
        Error::Bounds(msg.into())
    }

    pub(crate) fn resource(msg: impl Into<String>) -> Self {
        Error::Resource(msg.into())
    }

    pub(crate) fn lookup(msg: impl Into<String>) -> Self {
        Error::Lookup(msg.into())
    }

    pub(crate) fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// Wrap a host callable's own error message.
    pub fn host(msg: impl Into<String>) -> Self {
        Error::Host(msg.into())
    }

    /// The underlying message, with the kind prefix stripped.
    pub fn message(&self) -> &str {
        match self {
            Error::Type(m)
            | Error::Bounds(m)
            | Error::Resource(m)
            | Error::Lookup(m)
            | Error::Host(m)
            | Error::Internal(m) => m,
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Error::Type(_) => "type error",
            Error::Bounds(_) => "bounds error",
            Error::Resource(_) => "resource error",
            Error::Lookup(_) => "lookup error",
            Error::Host(_) => "host error",
            Error::Internal(_) => "internal error",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind_name(), self.message())
    }
}

impl std::error::Error for Error {}

pub type Result<T, E = Error> = std::result::Result<T, E>;
