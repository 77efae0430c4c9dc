//! Language error taxonomy
//!
//! Every failure the engine can report is a [`LanguageError`]: a kind, a
//! human-readable message, an optional source context with a caret offset,
//! and the chain of defined-function invocations that were active when the
//! error was raised.
//!
//! Errors never get recovered from inside the engine. They unwind to whoever
//! submitted the token or requested execution, which decides how to present
//! them.

use crate::value::{Element, TypeDescriptor};
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, LanguageError>;

/// Category of a [`LanguageError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A literal token could not be parsed
    Parser,
    /// A command name is not recognized
    Syntax,
    /// Arguments on the stack do not match a command's signature
    Type,
    /// A push or limit change would exceed the stack capacity,
    /// or defined functions nested too deeply
    StackOverflow,
    /// An element was requested from an empty stack
    StackUnderflow,
    /// Execution was interrupted by the host
    Stop,
    /// A primitive failed while running
    Runtime,
    /// Host configuration (flags, config files) is malformed
    Argument,
}

impl ErrorKind {
    /// Header line shown above the message when the error is displayed
    pub fn header(&self) -> &'static str {
        match self {
            ErrorKind::Parser => "Could not parse:",
            ErrorKind::Syntax => "Syntax error:",
            ErrorKind::Type => "Type error:",
            ErrorKind::StackOverflow => "Stack overflowed:",
            ErrorKind::StackUnderflow => "Stack underflowed:",
            ErrorKind::Stop => "Execution stopped:",
            ErrorKind::Runtime => "Runtime error:",
            ErrorKind::Argument => "Command line arguments invalid:",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.header())
    }
}

/// Source text an error points into, with the character offset of the defect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    pub text: String,
    /// Offset in characters (not bytes) into `text`
    pub offset: usize,
}

/// A structured language error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} {message}")]
pub struct LanguageError {
    pub kind: ErrorKind,
    pub message: String,
    pub context: Option<ErrorContext>,
    /// Enclosing defined-function invocations, innermost last
    pub trace: Vec<String>,
}

impl LanguageError {
    /// Create an error without context or trace
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        LanguageError {
            kind,
            message: message.into(),
            context: None,
            trace: Vec::new(),
        }
    }

    /// Attach a source context and caret offset (builder pattern)
    pub fn with_context(mut self, text: impl Into<String>, offset: usize) -> Self {
        self.context = Some(ErrorContext {
            text: text.into(),
            offset,
        });
        self
    }

    /// A malformed literal token
    pub fn parser(message: impl Into<String>, token: &str, offset: usize) -> Self {
        Self::new(ErrorKind::Parser, message).with_context(token, offset)
    }

    /// An unrecognized command
    pub fn syntax(message: impl Into<String>, name: &str, offset: usize) -> Self {
        Self::new(ErrorKind::Syntax, message).with_context(name, offset)
    }

    /// An argument that does not satisfy its descriptor
    pub fn type_mismatch(expected: &TypeDescriptor, actual: &Element) -> Self {
        Self::new(
            ErrorKind::Type,
            format!(
                "Expected {}, but found a {}.",
                expected,
                actual.kind()
            ),
        )
        .with_context(actual.to_string(), 0)
    }

    /// A signature deeper than the stack
    pub fn type_missing(expected: &TypeDescriptor) -> Self {
        Self::new(
            ErrorKind::Type,
            format!("Expected {}, but reached the bottom of the stack.", expected),
        )
    }

    /// A push or limit change beyond the stack capacity
    pub fn overflow(limit: usize) -> Self {
        Self::new(
            ErrorKind::StackOverflow,
            format!("Stack exceeded its limit of {} elements.", limit),
        )
    }

    /// Defined functions nested deeper than allowed
    pub fn call_depth_exceeded(limit: usize) -> Self {
        Self::new(
            ErrorKind::StackOverflow,
            format!("Defined functions nested deeper than {} calls.", limit),
        )
    }

    /// Access to an element of an empty stack
    pub fn underflow() -> Self {
        Self::new(
            ErrorKind::StackUnderflow,
            "Stack is empty, but attempted to access element from stack.",
        )
    }

    /// Host-requested interruption
    pub fn stop() -> Self {
        Self::new(ErrorKind::Stop, "Interrupted by user.")
    }

    /// Failure inside a primitive
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Runtime, message)
    }

    /// Malformed host configuration
    pub fn argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Argument, message)
    }

    /// Attach the call-context trace unless an inner frame already did
    pub fn in_context(mut self, trace: &[String]) -> Self {
        if self.trace.is_empty() {
            self.trace = trace.to_vec();
        }
        self
    }

    /// Move the context of a nested parse failure into its enclosing token
    ///
    /// `start` is the character offset at which the nested token begins
    /// inside `outer`.
    pub(crate) fn rebase(mut self, outer: &str, start: usize) -> Self {
        if let Some(ctx) = self.context.take() {
            self.context = Some(ErrorContext {
                text: outer.to_string(),
                offset: start + ctx.offset,
            });
        }
        self
    }
}
