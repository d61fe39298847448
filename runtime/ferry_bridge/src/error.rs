//! Recoverable bridge failures and the status-code convention.
//!
//! Contract violations (stale handles, writes to realized values, out of
//! range indices) are panics and never appear here. Everything in
//! [`BridgeError`] is something a caller can observe and continue from.

use std::ffi::{CStr, CString};

use ferry_heap::{EvalError, EvalErrorKind, InternError, Kind};

/// A recoverable failure at the bridge boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BridgeError {
    /// Evaluation failed. `message` is the evaluator's text, unchanged.
    #[error("{message}")]
    Evaluation { kind: EvalErrorKind, message: String },

    #[error("attribute set builder is full: capacity {capacity} already used")]
    CapacityExceeded { capacity: usize },

    #[error("list slot {index} of {size} was never set")]
    IncompleteList { index: usize, size: usize },

    #[error("attribute '{name}' missing")]
    MissingAttribute { name: String },

    #[error("value is {} while {expected} was expected", .got.article_name())]
    TypeMismatch { expected: &'static str, got: Kind },

    #[error(transparent)]
    Intern(#[from] InternError),
}

impl From<EvalError> for BridgeError {
    fn from(err: EvalError) -> Self {
        BridgeError::Evaluation {
            kind: err.kind,
            message: err.message,
        }
    }
}

impl BridgeError {
    /// Status code reported through the C boundary.
    pub fn code(&self) -> ErrorCode {
        match self {
            BridgeError::Evaluation { .. } | BridgeError::TypeMismatch { .. } => {
                ErrorCode::Evaluation
            }
            BridgeError::CapacityExceeded { .. }
            | BridgeError::Intern(InternError::Overflow { .. }) => ErrorCode::Overflow,
            BridgeError::IncompleteList { .. } | BridgeError::MissingAttribute { .. } => {
                ErrorCode::Key
            }
            BridgeError::Intern(InternError::InteriorNul { .. }) => ErrorCode::Unknown,
        }
    }
}

/// Status codes shared by every fallible C entry point.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    #[default]
    Ok = 0,
    Unknown = -1,
    /// A declared capacity was exceeded.
    Overflow = -2,
    /// A required entry was missing.
    Key = -3,
    /// The evaluator reported a failure.
    Evaluation = -4,
}

impl ErrorCode {
    pub const fn as_raw(self) -> i32 {
        self as i32
    }
}

/// Last outcome of a fallible operation.
///
/// Cleared to success when an operation starts; holds a code and message
/// only after a failure.
#[derive(Debug, Default)]
pub struct ErrorContext {
    code: ErrorCode,
    message: Option<CString>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.code = ErrorCode::Ok;
        self.message = None;
    }

    pub fn set(&mut self, err: &BridgeError) {
        self.code = err.code();
        self.message = Some(to_c_message(&err.to_string()));
    }

    /// Clear, then record the outcome of `result`.
    pub fn capture<T>(&mut self, result: Result<T, BridgeError>) -> Option<T> {
        self.clear();
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::debug!(code = ?err.code(), %err, "bridge operation failed");
                self.set(&err);
                None
            }
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn is_ok(&self) -> bool {
        self.code == ErrorCode::Ok
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().and_then(|msg| msg.to_str().ok())
    }

    /// NUL-terminated message, valid until the context is next modified.
    pub fn c_message(&self) -> Option<&CStr> {
        self.message.as_deref()
    }
}

/// Messages may quote user strings; embedded NULs would truncate them.
fn to_c_message(message: &str) -> CString {
    CString::new(message.replace('\0', "\\0")).unwrap_or_default()
}
