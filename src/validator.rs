// SPDX-License-Identifier: MIT

use crate::schema::error::{ErrorHandler, ErrorTrap, ValidationError};
use crate::schema::registry::RootSchema;
use crate::uri::JsonUri;
use crate::value::Value;

use std::rc::Rc;

use anyhow::Result;

/// The validator a host embeds: compile a schema once with
/// [`set_root_schema`](Validator::set_root_schema), then validate any number
/// of instances against it.
///
/// ```
/// use conformus::{Validator, Value};
///
/// let schema =
///     Value::from_json_str(r#"{"type": "integer", "minimum": 0, "maximum": 10}"#).unwrap();
///
/// let mut validator = Validator::new();
/// validator.set_root_schema(&schema).unwrap();
///
/// assert!(validator.validate(&Value::from(5)).is_ok());
/// assert!(validator.validate(&Value::from(11)).is_err());
/// ```
#[derive(Debug)]
pub struct Validator {
    root: RootSchema,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    pub fn new() -> Validator {
        Validator {
            root: RootSchema::new(),
        }
    }

    /// Register the callback that fetches external schema documents.
    ///
    /// The callback receives the absolute document location and returns the
    /// parsed document; a document that cannot be found is an `Err`. It is
    /// invoked lazily during [`set_root_schema`](Validator::set_root_schema)
    /// for every document that is referenced but not yet known.
    ///
    /// ```
    /// use conformus::{Validator, Value};
    ///
    /// let mut validator = Validator::new();
    /// validator.set_loader(|uri| match uri.location() {
    ///     "http://example.com/size.json" => {
    ///         Value::from_json_str(r#"{"type": "integer", "minimum": 0}"#)
    ///     }
    ///     _ => anyhow::bail!("unknown document {uri}"),
    /// });
    ///
    /// let schema =
    ///     Value::from_json_str(r#"{"$ref": "http://example.com/size.json"}"#).unwrap();
    /// validator.set_root_schema(&schema).unwrap();
    ///
    /// assert!(validator.validate(&Value::from(3)).is_ok());
    /// assert!(validator.validate(&Value::from(-3)).is_err());
    /// ```
    pub fn set_loader(&mut self, loader: impl Fn(&JsonUri) -> Result<Value> + 'static) {
        self.root.set_loader(Rc::new(loader));
    }

    /// Register the callback that checks `format` keywords. Without one, any
    /// schema using `format` reports a missing-checker error for every
    /// string it validates.
    pub fn set_format_checker(&mut self, check: impl Fn(&str, &str) -> Result<()> + 'static) {
        self.root.set_format_checker(Rc::new(check));
    }

    /// Compile `schema` and resolve every reference, fetching external
    /// documents through the loader callback as needed.
    ///
    /// Fails on an unresolvable `$ref`, a duplicate registration, an
    /// external reference without a loader, or a loader failure.
    pub fn set_root_schema(&mut self, schema: &Value) -> Result<()> {
        self.root.set_root_schema(schema)
    }

    /// Validate `instance`, stopping the walk at the first failure and
    /// returning it. Nothing past the failure is visited, so callbacks for
    /// later properties or items never run.
    pub fn validate(&self, instance: &Value) -> Result<(), ValidationError> {
        let mut trap = ErrorTrap::default();
        self.root.validate_instance(instance, &mut trap);
        match trap.into_error() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Validate `instance`, reporting every failure into `handler`. The
    /// handler decides whether the walk runs to completion: accumulating
    /// handlers like [`crate::ErrorRecorder`] see every failure, while a
    /// handler may break the walk early from its `error` method.
    ///
    /// ```
    /// use conformus::{ErrorRecorder, Validator, Value};
    ///
    /// let schema = Value::from_json_str(
    ///     r#"{"type": "object", "required": ["a", "b"]}"#,
    /// ).unwrap();
    /// let mut validator = Validator::new();
    /// validator.set_root_schema(&schema).unwrap();
    ///
    /// let mut recorder = ErrorRecorder::default();
    /// validator.validate_with_handler(&Value::new_object(), &mut recorder);
    /// assert_eq!(recorder.errors().len(), 2);
    /// ```
    pub fn validate_with_handler(&self, instance: &Value, handler: &mut dyn ErrorHandler) {
        self.root.validate_instance(instance, handler);
    }
}
