// SPDX-License-Identifier: MIT

use crate::value::Value;

use core::fmt;
use core::ops::ControlFlow;
use std::rc::Rc;

/// Errors raised while compiling a schema document. Compilation is the only
/// phase that can fail hard; instance validation reports through an
/// [`ErrorHandler`] instead.
///
/// Kept `Send + Sync` (plain owned strings, no `Rc`) so it can travel
/// through `anyhow::Error`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SchemaError {
    /// Two schemas were registered under the same URI.
    #[error("schema with {0} already inserted")]
    AlreadyInserted(String),
    /// An external document is referenced but no loader callback is set.
    #[error("external schema reference '{0}' needs loading, but no loader callback given")]
    NoLoader(String),
    /// A `$ref` never found its target.
    #[error("unresolved schema-reference {0}")]
    Unresolved(String),
    /// A `pattern` or `patternProperties` regex failed to compile.
    #[error("invalid regex pattern '{pattern}': {error}")]
    InvalidPattern { pattern: String, error: String },
    /// The loader callback failed for an external document.
    #[error("loading external schema '{location}' failed: {error}")]
    LoaderFailed { location: String, error: String },
}

/// A single validation failure: where it happened, what was there, and why
/// it was rejected.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub path: Rc<str>,
    pub instance: Value,
    pub message: Rc<str>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "at '{}' of {} - {}",
            self.path, self.instance, self.message
        )
    }
}

impl std::error::Error for ValidationError {}

/// Receives validation failures during a walk over the node graph.
///
/// Every report answers with a [`ControlFlow`]: `Continue` keeps the walk
/// going so later failures are still discovered, `Break` stops it on the
/// spot and nothing further is visited. Combinators use throwaway
/// [`ErrorFlag`] handlers internally so that sub-failures consulted for
/// policy (`not`, `if`, `oneOf`, `contains`) never reach the caller's
/// handler.
pub trait ErrorHandler {
    fn error(&mut self, path: &str, instance: &Value, message: &str) -> ControlFlow<()>;

    /// Whether any error has been reported so far.
    fn has_error(&self) -> bool;
}

/// The minimal handler: remembers only that something failed. This is the
/// scratch handler used for policy-level sub-validations.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorFlag {
    seen: bool,
}

impl ErrorHandler for ErrorFlag {
    fn error(&mut self, _path: &str, _instance: &Value, _message: &str) -> ControlFlow<()> {
        self.seen = true;
        ControlFlow::Continue(())
    }

    fn has_error(&self) -> bool {
        self.seen
    }
}

/// A handler that keeps every reported failure and lets the walk run to
/// completion.
#[derive(Debug, Clone, Default)]
pub struct ErrorRecorder {
    errors: Vec<ValidationError>,
}

impl ErrorRecorder {
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }
}

impl ErrorHandler for ErrorRecorder {
    fn error(&mut self, path: &str, instance: &Value, message: &str) -> ControlFlow<()> {
        self.errors.push(ValidationError {
            path: path.into(),
            instance: instance.clone(),
            message: message.into(),
        });
        ControlFlow::Continue(())
    }

    fn has_error(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// The handler for fail-fast callers: keeps the first failure and breaks
/// the walk at the point it was reported, so nothing past it runs.
#[derive(Debug, Clone, Default)]
pub struct ErrorTrap {
    error: Option<ValidationError>,
}

impl ErrorTrap {
    pub fn into_error(self) -> Option<ValidationError> {
        self.error
    }
}

impl ErrorHandler for ErrorTrap {
    fn error(&mut self, path: &str, instance: &Value, message: &str) -> ControlFlow<()> {
        if self.error.is_none() {
            self.error = Some(ValidationError {
                path: path.into(),
                instance: instance.clone(),
                message: message.into(),
            });
        }
        ControlFlow::Break(())
    }

    fn has_error(&self) -> bool {
        self.error.is_some()
    }
}
