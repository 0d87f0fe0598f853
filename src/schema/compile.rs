// SPDX-License-Identifier: MIT

//! The schema factory: walks a JSON document and builds validator nodes.
//!
//! Keywords are consumed from a working copy of each schema object as they
//! are recognized; whatever survives the walk is stashed with the registry
//! as an unknown keyword so a later `$ref` can still promote it to a schema.

use crate::schema::error::SchemaError;
use crate::schema::registry::RootSchema;
use crate::schema::{
    ArraySchema, CombinationKind, CombinationSchema, Conditional, Items, NotSchema, NumericSchema,
    NumericType, ObjectSchema, RequiredSchema, Schema, StringSchema, TypeSchema,
};
use crate::uri::JsonUri;
use crate::value::{Kind, Value};

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use anyhow::{anyhow, Context, Result};
use regex::Regex;

type Map = BTreeMap<Rc<str>, Value>;

// JSON Schema type names and the instance kinds they cover. "integer"
// appears twice because integer instances parse as signed or unsigned.
const SCHEMA_TYPES: &[(&str, Kind)] = &[
    ("null", Kind::Null),
    ("object", Kind::Object),
    ("array", Kind::Array),
    ("string", Kind::String),
    ("boolean", Kind::Bool),
    ("integer", Kind::Int),
    ("integer", Kind::UInt),
    ("number", Kind::Float),
];

/// Compile `json` into a validator node, registering it and every subschema
/// with `root` under each URI in `uris` extended by the tokens in `keys`.
///
/// Returns `None` when `json` is not a schema (neither a boolean nor an
/// object); callers treat that as the keyword being absent.
pub(crate) fn make(
    json: &Value,
    root: &mut RootSchema,
    keys: &[&str],
    mut uris: Vec<JsonUri>,
) -> Result<Option<Rc<Schema>>> {
    for key in keys {
        for uri in &mut uris {
            *uri = uri.append(key);
        }
    }

    match json {
        Value::Bool(accept) => {
            let node = Rc::new(Schema::Boolean(*accept));
            for uri in &uris {
                root.insert(uri, &node)?;
            }
            Ok(Some(node))
        }
        Value::Object(fields) => {
            let mut fields: Map = (**fields).clone();

            // `$id` makes this subschema addressable under an additional
            // base URI; `$ref`s below this point resolve against it.
            if let Some(id) = fields.remove("$id") {
                let id = id.as_string().context("'$id' must be a string")?.clone();
                let derived = last_uri(&uris)?.derive(&id);
                if !uris.contains(&derived) {
                    uris.push(derived);
                }
            }

            if let Some(definitions) = fields.remove("definitions") {
                let definitions = definitions
                    .as_object()
                    .context("'definitions' must be an object")?;
                for (name, sub) in definitions.iter() {
                    // registered for `$ref` use only, never validated directly
                    make(sub, root, &["definitions", name], uris.clone())?;
                }
            }

            let node = match fields.remove("$ref") {
                Some(reference) => {
                    let reference = reference
                        .as_string()
                        .context("'$ref' must be a string")?
                        .clone();
                    let target = last_uri(&uris)?.derive(&reference);
                    root.get_or_create_ref(&target)?
                }
                None => Rc::new(Schema::Typed(TypeSchema::compile(&mut fields, root, &uris)?)),
            };

            // annotation-only keywords
            for key in ["$schema", "default", "title", "description"] {
                fields.remove(key);
            }

            for uri in &uris {
                root.insert(uri, &node)?;
                for (key, value) in fields.iter() {
                    root.insert_unknown_keyword(uri, key, value)?;
                }
            }
            Ok(Some(node))
        }
        _ => Ok(None),
    }
}

fn last_uri(uris: &[JsonUri]) -> Result<&JsonUri> {
    uris.last()
        .ok_or_else(|| anyhow!("no base URI for subschema"))
}

impl TypeSchema {
    fn compile(fields: &mut Map, root: &mut RootSchema, uris: &[JsonUri]) -> Result<TypeSchema> {
        let mut schema = TypeSchema::default();

        // Numeric keywords are shared between the three numeric validators,
        // so those validators note what they consumed here and the keywords
        // are dropped only after every slot has been built.
        let mut known = BTreeSet::new();

        match fields.remove("type") {
            None => {
                // no type constraint: every kind gets a validator built from
                // the same keyword set
                for (_, kind) in SCHEMA_TYPES {
                    schema.types[kind.index()] =
                        Some(type_validator(*kind, fields, root, uris, &mut known)?);
                }
            }
            Some(Value::String(name)) => {
                for (type_name, kind) in SCHEMA_TYPES {
                    if *type_name == name.as_ref() {
                        schema.types[kind.index()] =
                            Some(type_validator(*kind, fields, root, uris, &mut known)?);
                    }
                }
            }
            Some(Value::Array(names)) => {
                for name in names.iter() {
                    let name = name.as_string().context("'type' entries must be strings")?;
                    for (type_name, kind) in SCHEMA_TYPES {
                        if *type_name == name.as_ref() {
                            schema.types[kind.index()] =
                                Some(type_validator(*kind, fields, root, uris, &mut known)?);
                        }
                    }
                }
            }
            // unrecognized form; no per-type validators at all
            Some(_) => {}
        }

        for key in known {
            fields.remove(key);
        }

        // Integer instances must satisfy "number" constraints as well:
        // reuse the float validator for the integer slots when no dedicated
        // integer validator exists.
        if schema.types[Kind::Float.index()].is_some() && schema.types[Kind::Int.index()].is_none()
        {
            schema.types[Kind::Int.index()] = schema.types[Kind::Float.index()].clone();
            schema.types[Kind::UInt.index()] = schema.types[Kind::Float.index()].clone();
        }

        if let Some(values) = fields.remove("enum") {
            schema.enum_values = Some(values.as_array().context("'enum' must be an array")?.clone());
        }

        schema.const_value = fields.remove("const");

        if let Some(sub) = fields.remove("not") {
            if let Some(subschema) = make(&sub, root, &["not"], uris.to_vec())? {
                schema.logic.push(Rc::new(Schema::Not(NotSchema { subschema })));
            }
        }

        for kind in [
            CombinationKind::AllOf,
            CombinationKind::AnyOf,
            CombinationKind::OneOf,
        ] {
            if let Some(subs) = fields.remove(kind.keyword()) {
                let subs = subs
                    .as_array()
                    .with_context(|| format!("'{}' must be an array", kind.keyword()))?;
                let mut subschemata = Vec::with_capacity(subs.len());
                for (index, sub) in subs.iter().enumerate() {
                    let index = index.to_string();
                    if let Some(s) = make(sub, root, &[kind.keyword(), &index], uris.to_vec())? {
                        subschemata.push(s);
                    }
                }
                schema.logic.push(Rc::new(Schema::Combination(CombinationSchema {
                    kind,
                    subschemata,
                })));
            }
        }

        if let Some(condition_json) = fields.remove("if") {
            // `if` on its own constrains nothing
            if fields.contains_key("then") || fields.contains_key("else") {
                let condition = make(&condition_json, root, &["if"], uris.to_vec())?;
                let then_branch = match fields.remove("then") {
                    Some(v) => make(&v, root, &["then"], uris.to_vec())?,
                    None => None,
                };
                let else_branch = match fields.remove("else") {
                    Some(v) => make(&v, root, &["else"], uris.to_vec())?,
                    None => None,
                };
                if let Some(condition) = condition {
                    schema.conditional = Some(Conditional {
                        condition,
                        then_branch,
                        else_branch,
                    });
                }
            }
        }

        Ok(schema)
    }
}

fn type_validator(
    kind: Kind,
    fields: &mut Map,
    root: &mut RootSchema,
    uris: &[JsonUri],
    known: &mut BTreeSet<&'static str>,
) -> Result<Rc<Schema>> {
    let node = match kind {
        Kind::Null => Schema::Null,
        Kind::Bool => Schema::BooleanType,
        Kind::Int => Schema::Integer(NumericSchema::compile(fields, known)?),
        Kind::UInt => Schema::Unsigned(NumericSchema::compile(fields, known)?),
        Kind::Float => Schema::Number(NumericSchema::compile(fields, known)?),
        Kind::String => Schema::String(StringSchema::compile(fields, root)?),
        Kind::Array => Schema::Array(ArraySchema::compile(fields, root, uris)?),
        Kind::Object => Schema::Object(ObjectSchema::compile(fields, root, uris)?),
    };
    Ok(Rc::new(node))
}

impl<T: NumericType> NumericSchema<T> {
    fn compile(fields: &Map, known: &mut BTreeSet<&'static str>) -> Result<NumericSchema<T>> {
        let mut schema = NumericSchema {
            maximum: None,
            minimum: None,
            exclusive_maximum: false,
            exclusive_minimum: false,
            multiple_of: None,
        };

        if let Some(v) = fields.get("maximum") {
            schema.maximum = Some(T::from_keyword(v).context("'maximum' must be a number")?);
            known.insert("maximum");
        }

        if let Some(v) = fields.get("minimum") {
            schema.minimum = Some(T::from_keyword(v).context("'minimum' must be a number")?);
            known.insert("minimum");
        }

        // The exclusive bounds are read after the inclusive ones and share
        // their storage; when both appear, the exclusive bound replaces the
        // inclusive one.
        if let Some(v) = fields.get("exclusiveMaximum") {
            schema.maximum =
                Some(T::from_keyword(v).context("'exclusiveMaximum' must be a number")?);
            schema.exclusive_maximum = true;
            known.insert("exclusiveMaximum");
        }

        if let Some(v) = fields.get("exclusiveMinimum") {
            schema.minimum =
                Some(T::from_keyword(v).context("'exclusiveMinimum' must be a number")?);
            schema.exclusive_minimum = true;
            known.insert("exclusiveMinimum");
        }

        if let Some(v) = fields.get("multipleOf") {
            schema.multiple_of = Some(
                v.as_number()
                    .context("'multipleOf' must be a number")?
                    .as_f64(),
            );
            known.insert("multipleOf");
        }

        Ok(schema)
    }
}

impl StringSchema {
    fn compile(fields: &mut Map, root: &RootSchema) -> Result<StringSchema> {
        let mut schema = StringSchema {
            min_length: None,
            max_length: None,
            pattern: None,
            format: None,
            format_check: None,
        };

        if let Some(v) = fields.remove("maxLength") {
            schema.max_length =
                Some(v.as_usize().context("'maxLength' must be a non-negative integer")?);
        }

        if let Some(v) = fields.remove("minLength") {
            schema.min_length =
                Some(v.as_usize().context("'minLength' must be a non-negative integer")?);
        }

        if let Some(v) = fields.remove("pattern") {
            let pattern = v.as_string().context("'pattern' must be a string")?.clone();
            let regex = compile_regex(&pattern)?;
            schema.pattern = Some((regex, pattern));
        }

        if let Some(v) = fields.remove("format") {
            schema.format = Some(v.as_string().context("'format' must be a string")?.clone());
            schema.format_check = root.format_checker();
        }

        Ok(schema)
    }
}

impl ObjectSchema {
    fn compile(fields: &mut Map, root: &mut RootSchema, uris: &[JsonUri]) -> Result<ObjectSchema> {
        let mut schema = ObjectSchema {
            max_properties: None,
            min_properties: None,
            required: vec![],
            properties: BTreeMap::new(),
            pattern_properties: vec![],
            additional_properties: None,
            dependencies: BTreeMap::new(),
            property_names: None,
        };

        if let Some(v) = fields.remove("maxProperties") {
            schema.max_properties = Some(
                v.as_usize()
                    .context("'maxProperties' must be a non-negative integer")?,
            );
        }

        if let Some(v) = fields.remove("minProperties") {
            schema.min_properties = Some(
                v.as_usize()
                    .context("'minProperties' must be a non-negative integer")?,
            );
        }

        if let Some(v) = fields.remove("required") {
            schema.required = string_list(&v, "required")?;
        }

        if let Some(v) = fields.remove("properties") {
            let properties = v.as_object().context("'properties' must be an object")?;
            for (name, sub) in properties.iter() {
                if let Some(s) = make(sub, root, &["properties", name], uris.to_vec())? {
                    schema.properties.insert(name.clone(), s);
                }
            }
        }

        if let Some(v) = fields.remove("patternProperties") {
            let patterns = v
                .as_object()
                .context("'patternProperties' must be an object")?;
            for (pattern, sub) in patterns.iter() {
                let regex = compile_regex(pattern)?;
                if let Some(s) = make(sub, root, &["patternProperties", pattern], uris.to_vec())? {
                    schema.pattern_properties.push((regex, s));
                }
            }
        }

        if let Some(v) = fields.remove("additionalProperties") {
            schema.additional_properties =
                make(&v, root, &["additionalProperties"], uris.to_vec())?;
        }

        if let Some(v) = fields.remove("dependencies") {
            let dependencies = v.as_object().context("'dependencies' must be an object")?;
            for (name, dep) in dependencies.iter() {
                let node = match dep {
                    // array form: shorthand for a required-properties check
                    Value::Array(_) => Some(Rc::new(Schema::Required(RequiredSchema {
                        required: string_list(dep, "dependencies")?,
                    }))),
                    _ => make(dep, root, &["dependencies", name], uris.to_vec())?,
                };
                if let Some(node) = node {
                    schema.dependencies.insert(name.clone(), node);
                }
            }
        }

        if let Some(v) = fields.remove("propertyNames") {
            schema.property_names = make(&v, root, &["propertyNames"], uris.to_vec())?;
        }

        Ok(schema)
    }
}

impl ArraySchema {
    fn compile(fields: &mut Map, root: &mut RootSchema, uris: &[JsonUri]) -> Result<ArraySchema> {
        let mut schema = ArraySchema {
            max_items: None,
            min_items: None,
            unique_items: false,
            items: None,
            additional_items: None,
            contains: None,
        };

        if let Some(v) = fields.remove("maxItems") {
            schema.max_items = Some(
                v.as_usize()
                    .context("'maxItems' must be a non-negative integer")?,
            );
        }

        if let Some(v) = fields.remove("minItems") {
            schema.min_items = Some(
                v.as_usize()
                    .context("'minItems' must be a non-negative integer")?,
            );
        }

        if let Some(v) = fields.remove("uniqueItems") {
            schema.unique_items = v.as_bool().context("'uniqueItems' must be a boolean")?;
        }

        if let Some(items) = fields.remove("items") {
            match &items {
                Value::Array(subs) => {
                    let mut tuple = Vec::with_capacity(subs.len());
                    for (index, sub) in subs.iter().enumerate() {
                        let index = index.to_string();
                        if let Some(s) = make(sub, root, &["items", &index], uris.to_vec())? {
                            tuple.push(s);
                        }
                    }
                    schema.items = Some(Items::Tuple(tuple));

                    // only consulted past the end of the tuple
                    if let Some(additional) = fields.remove("additionalItems") {
                        schema.additional_items =
                            make(&additional, root, &["additionalItems"], uris.to_vec())?;
                    }
                }
                Value::Object(_) | Value::Bool(_) => {
                    schema.items =
                        make(&items, root, &["items"], uris.to_vec())?.map(Items::Uniform);
                }
                _ => {}
            }
        }

        if let Some(v) = fields.remove("contains") {
            schema.contains = make(&v, root, &["contains"], uris.to_vec())?;
        }

        Ok(schema)
    }
}

fn compile_regex(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| {
        SchemaError::InvalidPattern {
            pattern: pattern.to_string(),
            error: e.to_string(),
        }
        .into()
    })
}

fn string_list(value: &Value, keyword: &str) -> Result<Vec<Rc<str>>> {
    let items = value
        .as_array()
        .with_context(|| format!("'{keyword}' must be an array of strings"))?;
    items
        .iter()
        .map(|v| {
            Ok(v.as_string()
                .with_context(|| format!("'{keyword}' entries must be strings"))?
                .clone())
        })
        .collect()
}
