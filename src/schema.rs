// SPDX-License-Identifier: MIT

//! The compiled schema model.
//!
//! A schema document is compiled into a graph of validator nodes. Each node
//! is one variant of [`Schema`] and knows how to validate an instance
//! against the keywords it was compiled from. Nodes are shared through `Rc`
//! handles: the same node may be registered under several URIs (`$id`
//! aliases) and referenced from several parents (`$ref`), and reference
//! cycles are expected. The only node that changes after compilation is
//! [`RefSchema`], whose target is bound once when the referenced schema
//! becomes known.

use crate::number::Number;
use crate::value::{Kind, Value};

use core::fmt;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::Result;
use regex::Regex;

pub(crate) mod compile;
pub mod error;
pub mod registry;
mod validate;

use self::registry::FormatCheck;

/// A compiled validator node.
///
/// `true`/`false` schemas, the per-type validators, the combinators and the
/// reference indirection are all variants of this one sum type; validation
/// dispatches on the variant. See [`Schema::validate`].
#[derive(Debug)]
pub enum Schema {
    /// A boolean schema: `true` accepts every instance, `false` rejects
    /// every instance.
    Boolean(bool),
    /// `"type": "null"`: accepts only null.
    Null,
    /// `"type": "boolean"`: accepts any boolean instance.
    BooleanType,
    /// Numeric constraints applied to integer instances.
    Integer(NumericSchema<i64>),
    /// Numeric constraints applied to unsigned integer instances.
    Unsigned(NumericSchema<u64>),
    /// Numeric constraints applied to floating point instances.
    Number(NumericSchema<f64>),
    String(StringSchema),
    Object(ObjectSchema),
    Array(ArraySchema),
    /// An object schema: per-type validators plus `enum`/`const`, the
    /// logical combinators and `if`/`then`/`else`.
    Typed(TypeSchema),
    Not(NotSchema),
    Combination(CombinationSchema),
    /// A bare required-properties check; used for the array shorthand form
    /// of `dependencies`.
    Required(RequiredSchema),
    /// A `$ref` indirection.
    Ref(RefSchema),
}

/// The numeric representations a [`NumericSchema`] can be instantiated over.
///
/// Keyword values convert with the usual JSON laxness: a fractional bound on
/// an integer validator truncates rather than erroring, matching how JSON
/// libraries coerce numbers.
pub trait NumericType: Copy + PartialOrd + fmt::Display + Sized {
    fn from_number(n: &Number) -> Self;

    fn from_keyword(v: &Value) -> Result<Self> {
        Ok(Self::from_number(v.as_number()?))
    }

    fn to_f64(self) -> f64;
}

impl NumericType for i64 {
    fn from_number(n: &Number) -> Self {
        match n {
            Number::Int(v) => *v,
            Number::UInt(v) => i64::try_from(*v).unwrap_or(i64::MAX),
            Number::Float(v) => *v as i64,
        }
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl NumericType for u64 {
    fn from_number(n: &Number) -> Self {
        match n {
            Number::Int(v) => u64::try_from(*v).unwrap_or(0),
            Number::UInt(v) => *v,
            Number::Float(v) => *v as u64,
        }
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl NumericType for f64 {
    fn from_number(n: &Number) -> Self {
        n.as_f64()
    }

    fn to_f64(self) -> f64 {
        self
    }
}

/// `maximum`, `minimum`, `exclusiveMaximum`, `exclusiveMinimum` and
/// `multipleOf` over one numeric representation.
#[derive(Debug, Default)]
pub struct NumericSchema<T> {
    // An exclusive bound shares storage with the inclusive one; the keyword
    // read last wins.
    pub(crate) maximum: Option<T>,
    pub(crate) minimum: Option<T>,
    pub(crate) exclusive_maximum: bool,
    pub(crate) exclusive_minimum: bool,
    pub(crate) multiple_of: Option<f64>,
}

/// `minLength`, `maxLength`, `pattern` and `format`. Lengths are counted in
/// Unicode code points; `pattern` uses search semantics, not full match.
pub struct StringSchema {
    pub(crate) min_length: Option<usize>,
    pub(crate) max_length: Option<usize>,
    pub(crate) pattern: Option<(Regex, Rc<str>)>,
    pub(crate) format: Option<Rc<str>>,
    pub(crate) format_check: Option<Rc<FormatCheck>>,
}

impl fmt::Debug for StringSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringSchema")
            .field("min_length", &self.min_length)
            .field("max_length", &self.max_length)
            .field("pattern", &self.pattern.as_ref().map(|(_, s)| s))
            .field("format", &self.format)
            .finish()
    }
}

/// The object keywords: size bounds, `required`, `properties`,
/// `patternProperties`, `additionalProperties`, `dependencies` and
/// `propertyNames`.
#[derive(Debug)]
pub struct ObjectSchema {
    pub(crate) max_properties: Option<usize>,
    pub(crate) min_properties: Option<usize>,
    pub(crate) required: Vec<Rc<str>>,
    pub(crate) properties: BTreeMap<Rc<str>, Rc<Schema>>,
    pub(crate) pattern_properties: Vec<(Regex, Rc<Schema>)>,
    pub(crate) additional_properties: Option<Rc<Schema>>,
    pub(crate) dependencies: BTreeMap<Rc<str>, Rc<Schema>>,
    pub(crate) property_names: Option<Rc<Schema>>,
}

/// The `items` keyword: one schema for every element, or a positional tuple.
#[derive(Debug)]
pub enum Items {
    Uniform(Rc<Schema>),
    Tuple(Vec<Rc<Schema>>),
}

/// The array keywords: size bounds, `uniqueItems`, `items`,
/// `additionalItems` and `contains`.
#[derive(Debug)]
pub struct ArraySchema {
    pub(crate) max_items: Option<usize>,
    pub(crate) min_items: Option<usize>,
    pub(crate) unique_items: bool,
    pub(crate) items: Option<Items>,
    // Only meaningful for the tuple form of `items`.
    pub(crate) additional_items: Option<Rc<Schema>>,
    pub(crate) contains: Option<Rc<Schema>>,
}

/// An `if`/`then`/`else` triple. The condition always exists; the branches
/// are optional.
#[derive(Debug)]
pub struct Conditional {
    pub(crate) condition: Rc<Schema>,
    pub(crate) then_branch: Option<Rc<Schema>>,
    pub(crate) else_branch: Option<Rc<Schema>>,
}

/// An object schema after `$ref` handling: an array of per-type validators
/// indexed by instance [`Kind`], plus the type-independent keywords.
#[derive(Debug, Default)]
pub struct TypeSchema {
    // Indexed by Kind. A missing `type` keyword populates every slot from
    // the same keyword set; an explicit `type` populates only the listed
    // ones, and an instance landing on an empty slot fails.
    pub(crate) types: [Option<Rc<Schema>>; Kind::COUNT],
    pub(crate) enum_values: Option<Vec<Value>>,
    pub(crate) const_value: Option<Value>,
    pub(crate) logic: Vec<Rc<Schema>>,
    pub(crate) conditional: Option<Conditional>,
}

#[derive(Debug)]
pub struct NotSchema {
    pub(crate) subschema: Rc<Schema>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinationKind {
    AllOf,
    AnyOf,
    OneOf,
}

impl CombinationKind {
    pub(crate) fn keyword(self) -> &'static str {
        match self {
            CombinationKind::AllOf => "allOf",
            CombinationKind::AnyOf => "anyOf",
            CombinationKind::OneOf => "oneOf",
        }
    }
}

#[derive(Debug)]
pub struct CombinationSchema {
    pub(crate) kind: CombinationKind,
    pub(crate) subschemata: Vec<Rc<Schema>>,
}

#[derive(Debug)]
pub struct RequiredSchema {
    pub(crate) required: Vec<Rc<str>>,
}

/// A `$ref` indirection node.
///
/// References may be forward, backward, cyclic or into documents that have
/// not been loaded yet, so a reference compiles to this placeholder and the
/// registry binds the target when the referenced schema is registered.
#[derive(Debug)]
pub struct RefSchema {
    pub(crate) id: Rc<str>,
    target: RefCell<Option<Rc<Schema>>>,
}

impl RefSchema {
    pub(crate) fn new(id: String) -> RefSchema {
        RefSchema {
            id: id.into(),
            target: RefCell::new(None),
        }
    }

    // The target is bound exactly once during resolution; a second call
    // keeps the first binding.
    pub(crate) fn set_target(&self, target: Rc<Schema>) {
        let mut slot = self.target.borrow_mut();
        if slot.is_none() {
            *slot = Some(target);
        }
    }

    pub(crate) fn target(&self) -> Option<Rc<Schema>> {
        self.target.borrow().clone()
    }
}
