//! Evaluation errors.
//!
//! Every recoverable failure inside the evaluator is an [`EvalError`]: a
//! structured [`EvalErrorKind`] plus the rendered message. The message is
//! what crosses the C boundary, so it is computed once and carried verbatim.
//!
//! Factory functions (e.g. [`division_by_zero`]) are the intended API; they
//! populate both fields consistently.

use std::fmt;

use crate::value::Kind;

/// Result of evaluation.
pub type EvalResult<T = ()> = Result<T, EvalError>;

/// Typed error category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EvalErrorKind {
    // Arithmetic
    DivisionByZero,
    IntegerOverflow { operation: &'static str },

    // Type
    TypeMismatch { expected: &'static str, got: Kind },
    NotCallable { got: Kind },

    // Access
    MissingAttribute { name: String },
    IndexOutOfBounds { index: i64, len: usize },

    // Evaluation state
    InfiniteRecursion,
    StackOverflow { depth: usize },
    Uninitialised,

    // Raised by user code
    Thrown { message: String },
    Aborted { message: String },
    /// A foreign primop panicked; the payload text is kept.
    ForeignPanic { message: String },
}

impl fmt::Display for EvalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DivisionByZero => write!(f, "division by zero"),
            Self::IntegerOverflow { operation } => {
                write!(f, "integer overflow in {operation}")
            }

            Self::TypeMismatch { expected, got } => {
                write!(f, "value is {} while {expected} was expected", got.article_name())
            }
            Self::NotCallable { got } => {
                write!(f, "attempt to call something which is not a function but {}", got.article_name())
            }

            Self::MissingAttribute { name } => write!(f, "attribute '{name}' missing"),
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "list index {index} is out of bounds for a list of length {len}")
            }

            Self::InfiniteRecursion => write!(f, "infinite recursion encountered"),
            Self::StackOverflow { depth } => {
                write!(f, "stack overflow (evaluation depth exceeded {depth})")
            }
            Self::Uninitialised => write!(f, "attempt to force a value that was never written"),

            Self::Thrown { message } => f.write_str(message),
            Self::Aborted { message } => {
                write!(f, "evaluation aborted with the following error message: '{message}'")
            }
            Self::ForeignPanic { message } => write!(f, "primop panicked: {message}"),
        }
    }
}

/// Evaluation error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    /// Human-readable message. Equals `kind.to_string()`.
    pub message: String,
}

impl EvalError {
    /// Create an error from a structured kind.
    pub fn from_kind(kind: EvalErrorKind) -> Self {
        let message = kind.to_string();
        EvalError { kind, message }
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for EvalError {}

impl From<EvalErrorKind> for EvalError {
    fn from(kind: EvalErrorKind) -> Self {
        EvalError::from_kind(kind)
    }
}

// Factory functions

#[cold]
pub fn division_by_zero() -> EvalError {
    EvalErrorKind::DivisionByZero.into()
}

#[cold]
pub fn integer_overflow(operation: &'static str) -> EvalError {
    EvalErrorKind::IntegerOverflow { operation }.into()
}

#[cold]
pub fn type_mismatch(expected: &'static str, got: Kind) -> EvalError {
    EvalErrorKind::TypeMismatch { expected, got }.into()
}

#[cold]
pub fn not_callable(got: Kind) -> EvalError {
    EvalErrorKind::NotCallable { got }.into()
}

#[cold]
pub fn missing_attribute(name: impl Into<String>) -> EvalError {
    EvalErrorKind::MissingAttribute { name: name.into() }.into()
}

#[cold]
pub fn index_out_of_bounds(index: i64, len: usize) -> EvalError {
    EvalErrorKind::IndexOutOfBounds { index, len }.into()
}

#[cold]
pub fn infinite_recursion() -> EvalError {
    EvalErrorKind::InfiniteRecursion.into()
}

#[cold]
pub fn stack_overflow(depth: usize) -> EvalError {
    EvalErrorKind::StackOverflow { depth }.into()
}

#[cold]
pub fn uninitialised() -> EvalError {
    EvalErrorKind::Uninitialised.into()
}

#[cold]
pub fn thrown(message: impl Into<String>) -> EvalError {
    EvalErrorKind::Thrown {
        message: message.into(),
    }
    .into()
}

#[cold]
pub fn aborted(message: impl Into<String>) -> EvalError {
    EvalErrorKind::Aborted {
        message: message.into(),
    }
    .into()
}

#[cold]
pub fn foreign_panic(message: impl Into<String>) -> EvalError {
    EvalErrorKind::ForeignPanic {
        message: message.into(),
    }
    .into()
}
