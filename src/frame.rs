//! Schema frames: an index of every subschema, identifier and reference in
//! a document.
//!
//! A frame is computed in a single walk. Each subschema location records
//! the dialect and vocabularies in effect there, which lets documents mix
//! drafts across embedded resources. Frames are snapshots: recompute them
//! after mutating the document.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::trace;

use crate::dialect::{self, is_schema};
use crate::error::SchemaError;
use crate::identity::identify;
use crate::pointer::Pointer;
use crate::resolver::SchemaResolver;
use crate::uri;
use crate::vocabularies::{Known, Vocabularies};
use crate::walker::{SchemaWalker, Strategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    /// The root of a schema resource (the document root or an embedded
    /// schema with its own identifier).
    Resource,
    Subschema,
}

/// A subschema within the framed document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub pointer: Pointer,
    pub dialect: String,
    pub base_dialect: String,
    pub vocabularies: Vocabularies,
    /// Absolute identifier, for resource roots that have one.
    pub identifier: Option<String>,
    /// Base URI of the enclosing resource. Empty for anonymous documents.
    pub base: String,
    /// Pointer to the root of the enclosing resource.
    pub resource: Pointer,
    pub kind: LocationKind,
}

/// A reference edge (`$ref`, `$dynamicRef`, `$recursiveRef` or `$schema`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    pub keyword: String,
    /// The value exactly as written.
    pub raw: String,
    /// Pointer to the keyword holding the reference.
    pub source: Pointer,
    /// The reference resolved against its base URI.
    pub destination: String,
    /// `destination` without its fragment.
    pub base: String,
    pub fragment: Option<String>,
}

impl Reference {
    /// Pointer to the schema object that contains the reference.
    pub fn origin(&self) -> Pointer {
        self.source.parent().unwrap_or_default()
    }

    pub fn is_metaschema(&self) -> bool {
        self.keyword == "$schema"
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Frame {
    locations: BTreeMap<Pointer, Location>,
    uris: BTreeMap<String, Pointer>,
    references: Vec<Reference>,
}

#[derive(Clone)]
struct Scope {
    dialect: String,
    base_dialect: String,
    vocabularies: Vocabularies,
    base: String,
    resource: Pointer,
    /// Every enclosing resource, outermost first.
    bases: Vec<(String, Pointer)>,
}

struct Builder<'a, W: ?Sized, R: ?Sized> {
    walker: &'a W,
    resolver: &'a R,
    frame: Frame,
}

impl Frame {
    /// Frame `document`.
    ///
    /// # Errors
    ///
    /// `UnknownDialect`/`UnknownBaseDialect` when the root dialect cannot be
    /// determined, `Invalid` for malformed or duplicated identifiers, and
    /// resolution errors for unknown metaschemas.
    pub fn new<W, R>(
        document: &Value,
        walker: &W,
        resolver: &R,
        default_dialect: &str,
        default_id: &str,
    ) -> Result<Self, SchemaError>
    where
        W: SchemaWalker + ?Sized,
        R: SchemaResolver + ?Sized,
    {
        if !is_schema(document) {
            return Err(SchemaError::invalid("a schema must be an object or a boolean"));
        }

        let dialect = dialect::dialect(document, default_dialect).to_string();
        if dialect.is_empty() {
            return Err(SchemaError::UnknownDialect);
        }
        let base_dialect = dialect::base_dialect(document, resolver, default_dialect)?;
        if base_dialect.is_empty() {
            return Err(SchemaError::UnknownBaseDialect);
        }
        let vocabularies = dialect::vocabularies_for(resolver, &base_dialect, &dialect)?;

        let scope = Scope {
            dialect,
            base_dialect,
            vocabularies,
            base: String::new(),
            resource: Pointer::root(),
            bases: Vec::new(),
        };

        let mut builder = Builder {
            walker,
            resolver,
            frame: Frame::default(),
        };
        builder.visit(document, Pointer::root(), &scope, default_id, true)?;
        trace!(
            locations = builder.frame.locations.len(),
            references = builder.frame.references.len(),
            "framed document"
        );
        Ok(builder.frame)
    }

    pub fn location(&self, pointer: &Pointer) -> Option<&Location> {
        self.locations.get(pointer)
    }

    /// All locations, in pointer order.
    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.locations.values()
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// The reference held by the keyword at `source`, if any.
    pub fn reference_at(&self, source: &Pointer) -> Option<&Reference> {
        self.references.iter().find(|reference| &reference.source == source)
    }

    /// Every URI this frame can resolve, with its target pointer.
    pub fn uris(&self) -> impl Iterator<Item = (&str, &Pointer)> {
        self.uris.iter().map(|(uri, pointer)| (uri.as_str(), pointer))
    }

    /// The identifier of the document root, if it has one.
    pub fn root_identifier(&self) -> Option<&str> {
        self.locations
            .get(&Pointer::root())
            .and_then(|location| location.identifier.as_deref())
    }

    /// Find the subschema a URI points to.
    ///
    /// Accepts resource identifiers, anchors and JSON Pointer fragments
    /// relative to any known resource (percent-encoded or not).
    pub fn traverse(&self, uri: &str) -> Option<&Pointer> {
        let canonical = uri::canonicalize(uri);
        if let Some(pointer) = self.uris.get(&canonical) {
            return Some(pointer);
        }

        let fragment = uri::fragment(&canonical)?;
        let relative = Pointer::parse(&uri::percent_decode(fragment))?;
        let resource = self.uris.get(uri::strip_fragment(&canonical))?;
        self.locations
            .get_key_value(&resource.concat(&relative))
            .map(|(pointer, _)| pointer)
    }
}

impl<W, R> Builder<'_, W, R>
where
    W: SchemaWalker + ?Sized,
    R: SchemaResolver + ?Sized,
{
    fn register(&mut self, uri: String, pointer: &Pointer) -> Result<(), SchemaError> {
        match self.frame.uris.get(&uri) {
            Some(existing) if existing != pointer => Err(SchemaError::invalid(format!(
                "the identifier {} is declared more than once",
                uri
            ))),
            Some(_) => Ok(()),
            None => {
                self.frame.uris.insert(uri, pointer.clone());
                Ok(())
            }
        }
    }

    fn visit(
        &mut self,
        value: &Value,
        pointer: Pointer,
        parent: &Scope,
        default_id: &str,
        is_root: bool,
    ) -> Result<(), SchemaError> {
        let mut scope = parent.clone();

        if !is_root {
            if let Some(declared) = value.get("$schema").and_then(Value::as_str) {
                scope.base_dialect = dialect::base_dialect(value, self.resolver, declared)?;
                if scope.base_dialect.is_empty() {
                    return Err(SchemaError::UnknownBaseDialect);
                }
                scope.dialect = declared.to_string();
                scope.vocabularies =
                    dialect::vocabularies_for(self.resolver, &scope.base_dialect, declared)?;
            }
        }

        let mut anchors = Vec::new();
        let mut opened = false;
        if let Some(identifier) = identify(value, &scope.base_dialect, default_id)? {
            let resolved = uri::resolve(&scope.base, &identifier);
            if !identifier.starts_with('#') {
                scope.base = uri::strip_fragment(&resolved).to_string();
                scope.resource = pointer.clone();
                opened = true;
            }
            if let Some(fragment) = uri::fragment(&resolved) {
                if !fragment.is_empty() && !fragment.starts_with('/') {
                    anchors.push(fragment.to_string());
                }
            }
        }

        if opened || is_root {
            scope.bases.push((scope.base.clone(), pointer.clone()));
            self.register(scope.base.clone(), &pointer)?;
        }

        if scope
            .vocabularies
            .contains_any(&[Known::Core2019_09, Known::Core2020_12])
        {
            if let Some(anchor) = value.get("$anchor").and_then(Value::as_str) {
                anchors.push(anchor.to_string());
            }
        }
        if scope.vocabularies.contains_known(Known::Core2020_12) {
            if let Some(anchor) = value.get("$dynamicAnchor").and_then(Value::as_str) {
                anchors.push(anchor.to_string());
            }
        }
        for anchor in anchors {
            self.register(uri::with_fragment(&scope.base, &anchor), &pointer)?;
        }

        for (base, resource) in scope.bases.clone() {
            if let Some(relative) = pointer.strip_prefix(&resource) {
                self.register(uri::with_fragment(&base, &relative.to_string()), &pointer)?;
            }
        }

        self.frame.locations.insert(
            pointer.clone(),
            Location {
                pointer: pointer.clone(),
                dialect: scope.dialect.clone(),
                base_dialect: scope.base_dialect.clone(),
                vocabularies: scope.vocabularies.clone(),
                identifier: opened.then(|| scope.base.clone()),
                base: scope.base.clone(),
                resource: scope.resource.clone(),
                kind: if opened || is_root {
                    LocationKind::Resource
                } else {
                    LocationKind::Subschema
                },
            },
        );

        let Value::Object(map) = value else {
            return Ok(());
        };

        for (keyword, child) in map {
            let child_pointer = pointer.join(keyword.as_str());

            if keyword == "$schema" {
                if let Some(raw) = child.as_str() {
                    let destination = uri::canonicalize(raw);
                    self.frame.references.push(Reference {
                        keyword: keyword.clone(),
                        raw: raw.to_string(),
                        source: child_pointer,
                        base: uri::strip_fragment(&destination).to_string(),
                        destination,
                        fragment: None,
                    });
                }
                continue;
            }

            match self.walker.walk(keyword, &scope.vocabularies).strategy {
                Strategy::Reference => {
                    if let Some(raw) = child.as_str() {
                        let destination = uri::resolve(&scope.base, raw);
                        self.frame.references.push(Reference {
                            keyword: keyword.clone(),
                            raw: raw.to_string(),
                            source: child_pointer,
                            base: uri::strip_fragment(&destination).to_string(),
                            fragment: uri::fragment(&destination).map(str::to_string),
                            destination,
                        });
                    }
                }
                Strategy::Value | Strategy::AnyPropertyKey => {
                    self.visit_subschema(child, child_pointer, &scope)?;
                }
                Strategy::Elements => self.visit_elements(child, &child_pointer, &scope)?,
                Strategy::AnyItem => {
                    if child.is_array() {
                        self.visit_elements(child, &child_pointer, &scope)?;
                    } else {
                        self.visit_subschema(child, child_pointer, &scope)?;
                    }
                }
                Strategy::Members | Strategy::AnyProperty => {
                    if let Value::Object(members) = child {
                        for (name, member) in members {
                            self.visit_subschema(member, child_pointer.join(name.as_str()), &scope)?;
                        }
                    }
                }
                Strategy::None | Strategy::Unknown => {}
            }
        }

        Ok(())
    }

    fn visit_subschema(
        &mut self,
        value: &Value,
        pointer: Pointer,
        scope: &Scope,
    ) -> Result<(), SchemaError> {
        if is_schema(value) {
            self.visit(value, pointer, scope, "", false)?;
        }
        Ok(())
    }

    fn visit_elements(
        &mut self,
        value: &Value,
        pointer: &Pointer,
        scope: &Scope,
    ) -> Result<(), SchemaError> {
        if let Value::Array(items) = value {
            for (index, item) in items.iter().enumerate() {
                self.visit_subschema(item, pointer.join(index.to_string()), scope)?;
            }
        }
        Ok(())
    }
}
