// SPDX-License-Identifier: MIT

//! The root registry: owns every compiled schema keyed by `(location,
//! pointer)`, resolves references in any discovery order, and drives the
//! lazy loading of external documents.

use crate::schema::error::{ErrorHandler, SchemaError};
use crate::schema::{compile, RefSchema, Schema};
use crate::uri::{JsonPointer, JsonUri};
use crate::value::Value;

use core::fmt;
use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::Result;
use log::debug;

/// Fetches an external schema document given its location.
pub type SchemaLoader = dyn Fn(&JsonUri) -> Result<Value>;

/// Checks a string instance against a named `format`; failure is an `Err`.
pub type FormatCheck = dyn Fn(&str, &str) -> Result<()>;

/// Per-document compilation state. Three parallel maps because schemas,
/// references and unrecognized sub-objects can be discovered in any order:
/// forward, backward, across documents, and through unknown keywords that a
/// later `$ref` promotes to schemas.
#[derive(Default)]
struct SchemaFile {
    // compiled nodes by pointer; a pointer registers at most once
    schemas: BTreeMap<JsonPointer, Rc<Schema>>,
    // placeholder refs waiting for their pointer to be compiled
    unresolved: BTreeMap<JsonPointer, Rc<Schema>>,
    // raw JSON under unrecognized keys, promotable to schemas
    unknown_keywords: BTreeMap<JsonPointer, Value>,
}

/// Owns the compiled schema graph and the user callbacks. Mutated during
/// compilation; read-only during validation.
pub struct RootSchema {
    loader: Option<Rc<SchemaLoader>>,
    format: Option<Rc<FormatCheck>>,
    root: Option<Rc<Schema>>,
    // location as key
    files: BTreeMap<String, SchemaFile>,
}

impl fmt::Debug for RootSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootSchema")
            .field("files", &self.files.keys().collect::<Vec<_>>())
            .field("has_root", &self.root.is_some())
            .finish()
    }
}

impl RootSchema {
    pub(crate) fn new() -> RootSchema {
        RootSchema {
            loader: None,
            format: None,
            root: None,
            files: BTreeMap::new(),
        }
    }

    pub(crate) fn set_loader(&mut self, loader: Rc<SchemaLoader>) {
        self.loader = Some(loader);
    }

    pub(crate) fn set_format_checker(&mut self, format: Rc<FormatCheck>) {
        self.format = Some(format);
    }

    pub(crate) fn format_checker(&self) -> Option<Rc<FormatCheck>> {
        self.format.clone()
    }

    fn file_mut(&mut self, location: &str) -> &mut SchemaFile {
        self.files.entry(location.to_string()).or_default()
    }

    /// Register `node` at `uri`. Registering the same `(location, pointer)`
    /// twice is an error; registering a pointer someone is waiting for
    /// resolves their reference.
    pub(crate) fn insert(&mut self, uri: &JsonUri, node: &Rc<Schema>) -> Result<()> {
        let file = self.file_mut(uri.location());
        if file.schemas.contains_key(uri.pointer()) {
            return Err(SchemaError::AlreadyInserted(uri.to_string()).into());
        }
        file.schemas.insert(uri.pointer().clone(), node.clone());
        debug!("registered schema at {uri}");

        // was someone already referencing this newly registered schema?
        if let Some(placeholder) = file.unresolved.remove(uri.pointer()) {
            if let Schema::Ref(reference) = placeholder.as_ref() {
                reference.set_target(node.clone());
                debug!("resolved reference to {uri}");
            }
        }
        Ok(())
    }

    /// Stash the JSON under an unrecognized keyword, unless a reference is
    /// already waiting for exactly this pointer, in which case the JSON is a
    /// schema after all and is compiled on the spot.
    pub(crate) fn insert_unknown_keyword(
        &mut self,
        uri: &JsonUri,
        key: &str,
        value: &Value,
    ) -> Result<()> {
        let new_uri = uri.append(key);
        let pending = self
            .files
            .get(new_uri.location())
            .map_or(false, |f| f.unresolved.contains_key(new_uri.pointer()));
        if pending {
            compile::make(value, self, &[], vec![new_uri])?;
        } else {
            let pointer = new_uri.pointer().clone();
            self.file_mut(new_uri.location())
                .unknown_keywords
                .insert(pointer, value.clone());
        }
        Ok(())
    }

    /// Resolve `uri` to a schema node: the registered schema if it exists, a
    /// promoted unknown keyword if one is stashed there, or a placeholder
    /// reference that resolves when the pointer is eventually compiled.
    pub(crate) fn get_or_create_ref(&mut self, uri: &JsonUri) -> Result<Rc<Schema>> {
        if let Some(existing) = self
            .files
            .get(uri.location())
            .and_then(|f| f.schemas.get(uri.pointer()))
        {
            return Ok(existing.clone());
        }

        if let Some(json) = self.stashed_json(uri) {
            if let Some(node) = compile::make(&json, self, &[], vec![uri.clone()])? {
                debug!("promoted unknown keyword at {uri} to a schema");
                return Ok(node);
            }
        }

        let file = self.file_mut(uri.location());
        if let Some(placeholder) = file.unresolved.get(uri.pointer()) {
            return Ok(placeholder.clone());
        }
        let placeholder = Rc::new(Schema::Ref(RefSchema::new(uri.to_string())));
        file.unresolved
            .insert(uri.pointer().clone(), placeholder.clone());
        debug!("created placeholder reference for {uri}");
        Ok(placeholder)
    }

    // Stashed JSON at exactly `uri.pointer()`, or nested inside a stash at a
    // shorter pointer.
    fn stashed_json(&mut self, uri: &JsonUri) -> Option<Value> {
        let file = self.files.get_mut(uri.location())?;
        if let Some(json) = file.unknown_keywords.remove(uri.pointer()) {
            return Some(json);
        }
        for (stashed, json) in file.unknown_keywords.iter() {
            if let Some(rest) = uri.pointer().strip_prefix(stashed) {
                if let Some(found) = value_at(json, rest) {
                    return Some(found.clone());
                }
            }
        }
        None
    }

    /// Compile `schema` as the root document (URI `#`), then keep fetching
    /// and compiling external documents until a pass loads nothing new.
    pub(crate) fn set_root_schema(&mut self, schema: &Value) -> Result<()> {
        self.root = compile::make(schema, self, &[], vec![JsonUri::new("#")])?;

        loop {
            // files is modified while compiling, so snapshot the keys
            let locations: Vec<String> = self.files.keys().cloned().collect();
            let mut loaded = false;
            for location in locations {
                let pending = self
                    .files
                    .get(&location)
                    .map_or(false, |f| f.schemas.is_empty());
                if !pending {
                    continue;
                }
                let loader = self
                    .loader
                    .clone()
                    .ok_or_else(|| SchemaError::NoLoader(location.clone()))?;
                let uri = JsonUri::new(&location);
                debug!("loading external schema document {location}");
                let document = loader(&uri).map_err(|e| SchemaError::LoaderFailed {
                    location: location.clone(),
                    error: e.to_string(),
                })?;
                compile::make(&document, self, &[], vec![uri])?;
                loaded = true;
            }
            if !loaded {
                break;
            }
        }

        // compilation is complete; every reference must have found a target
        for (location, file) in self.files.iter() {
            if let Some(pointer) = file.unresolved.keys().next() {
                let uri = JsonUri::from_parts(location, pointer.clone());
                return Err(SchemaError::Unresolved(uri.to_string()).into());
            }
        }
        Ok(())
    }

    pub(crate) fn validate_instance(&self, instance: &Value, handler: &mut dyn ErrorHandler) {
        // Break only means the handler asked to stop early.
        let _ = match &self.root {
            Some(root) => root.validate(instance, "", handler),
            None => handler.error(
                "",
                instance,
                "no root schema has yet been set for validating an instance",
            ),
        };
    }
}

fn value_at<'a>(mut value: &'a Value, tokens: &[String]) -> Option<&'a Value> {
    for token in tokens {
        value = match value {
            Value::Object(fields) => fields.get(token.as_str())?,
            Value::Array(items) => items.get(token.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(value)
}
