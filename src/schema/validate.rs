// SPDX-License-Identifier: MIT

//! Validation: a single entry point dispatching on the node variant.
//!
//! Errors go to the caller's handler. Every report returns a
//! [`ControlFlow`]; when the handler answers `Break`, the walk unwinds
//! through every loop below via `?` and nothing else is visited. Handlers
//! that accumulate answer `Continue` and see every failure. Sub-validations
//! whose outcome is only consulted for policy (`not`, `if`, `oneOf`,
//! `contains`) run against throwaway [`ErrorFlag`] handlers, so their
//! failures never reach the caller.

use crate::schema::error::{ErrorFlag, ErrorHandler};
use crate::schema::{
    ArraySchema, CombinationKind, CombinationSchema, Items, NotSchema, NumericSchema, NumericType,
    ObjectSchema, RefSchema, RequiredSchema, Schema, StringSchema, TypeSchema,
};
use crate::value::Value;

use core::ops::ControlFlow;

impl Schema {
    /// Validate `instance` against this node, reporting failures into
    /// `handler`. `path` is the location of `instance` within the document
    /// being validated; the root is the empty path.
    ///
    /// Returns `Break` when the handler requested that the walk stop.
    pub fn validate(
        &self,
        instance: &Value,
        path: &str,
        handler: &mut dyn ErrorHandler,
    ) -> ControlFlow<()> {
        match self {
            Schema::Boolean(true) => ControlFlow::Continue(()),
            Schema::Boolean(false) => {
                handler.error(path, instance, "instance invalid as per false-schema")
            }
            Schema::Null => {
                if instance.is_null() {
                    ControlFlow::Continue(())
                } else {
                    handler.error(path, instance, "expected to be null")
                }
            }
            Schema::BooleanType => ControlFlow::Continue(()),
            Schema::Integer(numeric) => numeric.validate(instance, path, handler),
            Schema::Unsigned(numeric) => numeric.validate(instance, path, handler),
            Schema::Number(numeric) => numeric.validate(instance, path, handler),
            Schema::String(string) => string.validate(instance, path, handler),
            Schema::Object(object) => object.validate(instance, path, handler),
            Schema::Array(array) => array.validate(instance, path, handler),
            Schema::Typed(typed) => typed.validate(instance, path, handler),
            Schema::Not(not) => not.validate(instance, path, handler),
            Schema::Combination(combination) => combination.validate(instance, path, handler),
            Schema::Required(required) => required.validate(instance, path, handler),
            Schema::Ref(reference) => reference.validate(instance, path, handler),
        }
    }
}

fn property_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        format!("[{key}]")
    } else {
        format!("{path}.{key}")
    }
}

fn item_path(path: &str, index: usize) -> String {
    if path.is_empty() {
        format!("[{index}]")
    } else {
        format!("{path}[{index}]")
    }
}

// count code points, not bytes: UTF-8 continuation bytes have 10 as their
// top two bits
fn code_point_count(text: &str) -> usize {
    text.bytes().filter(|b| b & 0xC0 != 0x80).count()
}

// The residual is measured against the nearest multiple, not the truncated
// quotient, so values just under a multiple are not misclassified.
fn violates_multiple_of(value: f64, multiple: f64) -> bool {
    let quotient = (value / multiple).round();
    (value - quotient * multiple).abs() > f64::EPSILON
}

impl<T: NumericType> NumericSchema<T> {
    fn validate(
        &self,
        instance: &Value,
        path: &str,
        handler: &mut dyn ErrorHandler,
    ) -> ControlFlow<()> {
        let Ok(number) = instance.as_number() else {
            return ControlFlow::Continue(());
        };
        let value = T::from_number(number);

        if let Some(multiple) = self.multiple_of {
            let value = value.to_f64();
            // zero is a multiple of everything
            if value != 0.0 && violates_multiple_of(value, multiple) {
                handler.error(path, instance, &format!("is not a multiple of {multiple}"))?;
            }
        }

        if let Some(maximum) = self.maximum {
            if (self.exclusive_maximum && value >= maximum) || value > maximum {
                handler.error(path, instance, &format!("exceeds maximum of {maximum}"))?;
            }
        }

        if let Some(minimum) = self.minimum {
            if (self.exclusive_minimum && value <= minimum) || value < minimum {
                handler.error(path, instance, &format!("is below minimum of {minimum}"))?;
            }
        }

        ControlFlow::Continue(())
    }
}

impl StringSchema {
    fn validate(
        &self,
        instance: &Value,
        path: &str,
        handler: &mut dyn ErrorHandler,
    ) -> ControlFlow<()> {
        let Ok(text) = instance.as_string() else {
            return ControlFlow::Continue(());
        };
        let length = code_point_count(text);

        if let Some(min) = self.min_length {
            if length < min {
                handler.error(
                    path,
                    instance,
                    &format!("'{instance}' is too short as per minLength ({min})"),
                )?;
            }
        }

        if let Some(max) = self.max_length {
            if length > max {
                handler.error(
                    path,
                    instance,
                    &format!("'{instance}' is too long as per maxLength ({max})"),
                )?;
            }
        }

        if let Some((regex, pattern)) = &self.pattern {
            if !regex.is_match(text) {
                handler.error(
                    path,
                    instance,
                    &format!("{text} does not match regex pattern: {pattern}"),
                )?;
            }
        }

        if let Some(format) = &self.format {
            match &self.format_check {
                Some(check) => {
                    if let Err(error) = check(format.as_ref(), text.as_ref()) {
                        handler.error(
                            path,
                            instance,
                            &format!("'{text}' is not a valid {format}: {error}"),
                        )?;
                    }
                }
                None => handler.error(
                    path,
                    instance,
                    &format!(
                        "a format checker was not provided but a format keyword \
                         for this string is present: {format}"
                    ),
                )?,
            }
        }

        ControlFlow::Continue(())
    }
}

impl ObjectSchema {
    fn validate(
        &self,
        instance: &Value,
        path: &str,
        handler: &mut dyn ErrorHandler,
    ) -> ControlFlow<()> {
        let Ok(fields) = instance.as_object() else {
            return ControlFlow::Continue(());
        };

        if let Some(max) = self.max_properties {
            if fields.len() > max {
                handler.error(path, instance, "too many properties")?;
            }
        }

        if let Some(min) = self.min_properties {
            if fields.len() < min {
                handler.error(path, instance, "too few properties")?;
            }
        }

        for name in &self.required {
            if !fields.contains_key(name.as_ref()) {
                handler.error(
                    path,
                    instance,
                    &format!("required property '{name}' not found in object"),
                )?;
            }
        }

        for (key, value) in fields.iter() {
            if let Some(names) = &self.property_names {
                names.validate(&Value::String(key.clone()), path, handler)?;
            }

            let prop_path = property_path(path, key);
            let mut matched = false;

            if let Some(sub) = self.properties.get(key.as_ref()) {
                matched = true;
                sub.validate(value, &prop_path, handler)?;
            }

            for (regex, sub) in &self.pattern_properties {
                if regex.is_match(key.as_ref()) {
                    matched = true;
                    sub.validate(value, &prop_path, handler)?;
                }
            }

            // additionalProperties as a last resort
            if !matched {
                if let Some(additional) = &self.additional_properties {
                    additional.validate(value, &prop_path, handler)?;
                }
            }
        }

        for (name, dependency) in &self.dependencies {
            // the presence of the property puts the whole instance under the
            // dependency schema
            if fields.contains_key(name.as_ref()) {
                dependency.validate(instance, path, handler)?;
            }
        }

        ControlFlow::Continue(())
    }
}

impl ArraySchema {
    fn validate(
        &self,
        instance: &Value,
        path: &str,
        handler: &mut dyn ErrorHandler,
    ) -> ControlFlow<()> {
        let Ok(items) = instance.as_array() else {
            return ControlFlow::Continue(());
        };

        if let Some(max) = self.max_items {
            if items.len() > max {
                handler.error(path, instance, "has too many items")?;
            }
        }

        if let Some(min) = self.min_items {
            if items.len() < min {
                handler.error(path, instance, "has too few items")?;
            }
        }

        if self.unique_items {
            for (index, item) in items.iter().enumerate() {
                if items.iter().skip(index + 1).any(|other| other == item) {
                    handler.error(path, instance, "items have to be unique for this array")?;
                }
            }
        }

        match &self.items {
            Some(Items::Uniform(schema)) => {
                for (index, item) in items.iter().enumerate() {
                    schema.validate(item, &item_path(path, index), handler)?;
                }
            }
            Some(Items::Tuple(tuple)) => {
                for (index, item) in items.iter().enumerate() {
                    match tuple.get(index).or(self.additional_items.as_ref()) {
                        Some(schema) => schema.validate(item, &item_path(path, index), handler)?,
                        // past the tuple with no additionalItems: accepted
                        None => break,
                    }
                }
            }
            None => {}
        }

        if let Some(contains) = &self.contains {
            let satisfied = items.iter().any(|item| {
                let mut scratch = ErrorFlag::default();
                let _ = contains.validate(item, path, &mut scratch);
                !scratch.has_error()
            });
            if !satisfied {
                handler.error(
                    path,
                    instance,
                    "array does not contain required element as per 'contains'",
                )?;
            }
        }

        ControlFlow::Continue(())
    }
}

impl TypeSchema {
    fn validate(
        &self,
        instance: &Value,
        path: &str,
        handler: &mut dyn ErrorHandler,
    ) -> ControlFlow<()> {
        // run the validator for the instance's own type, if there is one
        match self
            .types
            .get(instance.kind().index())
            .and_then(Option::as_ref)
        {
            Some(validator) => validator.validate(instance, path, handler)?,
            None => handler.error(path, instance, "unexpected instance type")?,
        }

        if let Some(allowed) = &self.enum_values {
            if !allowed.iter().any(|candidate| candidate == instance) {
                handler.error(path, instance, "instance not found in required enum")?;
            }
        }

        if let Some(constant) = &self.const_value {
            if constant != instance {
                handler.error(path, instance, "instance not const")?;
            }
        }

        for logic in &self.logic {
            logic.validate(instance, path, handler)?;
        }

        if let Some(conditional) = &self.conditional {
            let mut scratch = ErrorFlag::default();
            let _ = conditional.condition.validate(instance, path, &mut scratch);
            if !scratch.has_error() {
                if let Some(then_branch) = &conditional.then_branch {
                    then_branch.validate(instance, path, handler)?;
                }
            } else if let Some(else_branch) = &conditional.else_branch {
                else_branch.validate(instance, path, handler)?;
            }
        }

        ControlFlow::Continue(())
    }
}

impl NotSchema {
    fn validate(
        &self,
        instance: &Value,
        path: &str,
        handler: &mut dyn ErrorHandler,
    ) -> ControlFlow<()> {
        let mut scratch = ErrorFlag::default();
        let _ = self.subschema.validate(instance, path, &mut scratch);
        if scratch.has_error() {
            ControlFlow::Continue(())
        } else {
            handler.error(
                path,
                instance,
                "instance is valid, whereas it should NOT be as required by schema",
            )
        }
    }
}

impl CombinationSchema {
    fn validate(
        &self,
        instance: &Value,
        path: &str,
        handler: &mut dyn ErrorHandler,
    ) -> ControlFlow<()> {
        let mut count = 0usize;

        for sub in &self.subschemata {
            let mut scratch = ErrorFlag::default();
            let _ = sub.validate(instance, path, &mut scratch);

            if scratch.has_error() {
                if self.kind == CombinationKind::AllOf {
                    handler.error(
                        path,
                        instance,
                        "at least one subschema has failed, but all of them are \
                         required to validate",
                    )?;
                    return ControlFlow::Continue(());
                }
            } else {
                count += 1;
            }

            if self.kind == CombinationKind::OneOf && count > 1 {
                handler.error(
                    path,
                    instance,
                    "more than one subschema has succeeded, but exactly one of \
                     them is required to validate",
                )?;
                return ControlFlow::Continue(());
            }
            if self.kind == CombinationKind::AnyOf && count == 1 {
                return ControlFlow::Continue(());
            }
        }

        match self.kind {
            CombinationKind::AnyOf if count == 0 => handler.error(
                path,
                instance,
                "no subschema has succeeded, but at least one of them is required to validate",
            ),
            CombinationKind::OneOf if count == 0 => handler.error(
                path,
                instance,
                "no subschema has succeeded, but exactly one of them is required to validate",
            ),
            _ => ControlFlow::Continue(()),
        }
    }
}

impl RequiredSchema {
    fn validate(
        &self,
        instance: &Value,
        path: &str,
        handler: &mut dyn ErrorHandler,
    ) -> ControlFlow<()> {
        let Ok(fields) = instance.as_object() else {
            return ControlFlow::Continue(());
        };
        for name in &self.required {
            if !fields.contains_key(name.as_ref()) {
                handler.error(
                    path,
                    instance,
                    &format!("required property '{name}' not found in object as a dependency"),
                )?;
            }
        }
        ControlFlow::Continue(())
    }
}

impl RefSchema {
    fn validate(
        &self,
        instance: &Value,
        path: &str,
        handler: &mut dyn ErrorHandler,
    ) -> ControlFlow<()> {
        match self.target() {
            Some(target) => target.validate(instance, path, handler),
            None => handler.error(
                path,
                instance,
                &format!("unresolved schema-reference {}", self.id),
            ),
        }
    }
}
