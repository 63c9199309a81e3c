//! Schema resolvers - lookups from a URI to a schema document.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::dialect::{
    DRAFT_0, DRAFT_0_HYPER, DRAFT_1, DRAFT_1_HYPER, DRAFT_2, DRAFT_2_HYPER, DRAFT_2019_09,
    DRAFT_2019_09_HYPER, DRAFT_2020_12, DRAFT_2020_12_HYPER, DRAFT_3, DRAFT_3_HYPER, DRAFT_4,
    DRAFT_4_HYPER, DRAFT_6, DRAFT_6_HYPER, DRAFT_7, DRAFT_7_HYPER,
};
use crate::error::SchemaError;
use crate::identity::identify_with;
use crate::uri;
use crate::vocabularies::Known;

/// Fetches schemas by absolute (or caller-relative) URI.
///
/// Returning `None` means the schema is unknown to this resolver. Callers
/// treat that as a resolution failure.
pub trait SchemaResolver {
    fn resolve(&self, uri: &str) -> Option<Value>;

    /// Ask `fallback` whenever this resolver does not know a URI.
    fn or<R: SchemaResolver>(self, fallback: R) -> Fallback<Self, R>
    where
        Self: Sized,
    {
        Fallback {
            first: self,
            second: fallback,
        }
    }
}

/// Two resolvers tried in order. Built by [`SchemaResolver::or`].
#[derive(Debug, Clone)]
pub struct Fallback<A, B> {
    first: A,
    second: B,
}

impl<A: SchemaResolver, B: SchemaResolver> SchemaResolver for Fallback<A, B> {
    fn resolve(&self, uri: &str) -> Option<Value> {
        self.first.resolve(uri).or_else(|| self.second.resolve(uri))
    }
}

impl<F> SchemaResolver for F
where
    F: Fn(&str) -> Option<Value>,
{
    fn resolve(&self, uri: &str) -> Option<Value> {
        self(uri)
    }
}

/// A resolver that knows nothing.
pub fn null_resolver(_uri: &str) -> Option<Value> {
    None
}

const VOCABULARIES_2020_12: &[(Known, bool)] = &[
    (Known::Core2020_12, true),
    (Known::Applicator2020_12, true),
    (Known::Unevaluated2020_12, true),
    (Known::Validation2020_12, true),
    (Known::MetaData2020_12, true),
    (Known::FormatAnnotation2020_12, true),
    (Known::Content2020_12, true),
];

const VOCABULARIES_2019_09: &[(Known, bool)] = &[
    (Known::Core2019_09, true),
    (Known::Applicator2019_09, true),
    (Known::Validation2019_09, true),
    (Known::MetaData2019_09, true),
    (Known::Format2019_09, false),
    (Known::Content2019_09, true),
];

/// Every official dialect: its URI, its own `$schema`, and the keyword it
/// identifies itself with.
const OFFICIAL_METASCHEMAS: &[(&str, &str, &str)] = &[
    (DRAFT_2020_12, DRAFT_2020_12, "$id"),
    (DRAFT_2020_12_HYPER, DRAFT_2020_12_HYPER, "$id"),
    (DRAFT_2019_09, DRAFT_2019_09, "$id"),
    (DRAFT_2019_09_HYPER, DRAFT_2019_09_HYPER, "$id"),
    (DRAFT_7, DRAFT_7, "$id"),
    (DRAFT_7_HYPER, DRAFT_7_HYPER, "$id"),
    (DRAFT_6, DRAFT_6, "$id"),
    (DRAFT_6_HYPER, DRAFT_6_HYPER, "$id"),
    (DRAFT_4, DRAFT_4, "id"),
    (DRAFT_4_HYPER, DRAFT_4_HYPER, "id"),
    (DRAFT_3, DRAFT_3, "id"),
    (DRAFT_3_HYPER, DRAFT_3_HYPER, "id"),
    (DRAFT_2, DRAFT_2_HYPER, "id"),
    (DRAFT_2_HYPER, DRAFT_2_HYPER, "id"),
    (DRAFT_1, DRAFT_1_HYPER, "id"),
    (DRAFT_1_HYPER, DRAFT_1_HYPER, "id"),
    (DRAFT_0, DRAFT_0_HYPER, "id"),
    (DRAFT_0_HYPER, DRAFT_0_HYPER, "id"),
];

/// Serves the official metaschemas, reduced to what dialect and vocabulary
/// resolution reads: `$schema`, the identifier and `$vocabulary`.
///
/// Chain it behind other resolvers with [`SchemaResolver::or`] so that
/// hyper-schema and draft 0 to 2 documents resolve offline.
pub fn official_resolver(uri: &str) -> Option<Value> {
    let canonical = uri::canonicalize(uri);
    let (dialect, parent, id_keyword) = OFFICIAL_METASCHEMAS
        .iter()
        .copied()
        .find(|(dialect, _, _)| *dialect == uri || uri::canonicalize(dialect) == canonical)?;

    let mut metaschema = Map::new();
    metaschema.insert("$schema".to_string(), Value::from(parent));
    metaschema.insert(id_keyword.to_string(), Value::from(dialect));

    let mut vocabularies: Vec<(Known, bool)> = match dialect {
        DRAFT_2020_12 | DRAFT_2020_12_HYPER => VOCABULARIES_2020_12.to_vec(),
        DRAFT_2019_09 | DRAFT_2019_09_HYPER => VOCABULARIES_2019_09.to_vec(),
        _ => Vec::new(),
    };
    if dialect == DRAFT_2020_12_HYPER || dialect == DRAFT_2019_09_HYPER {
        vocabularies.push((Known::HyperSchema2019_09, true));
    }
    if !vocabularies.is_empty() {
        let declared = vocabularies
            .into_iter()
            .map(|(known, required)| (known.uri().to_string(), Value::Bool(required)))
            .collect::<Map<String, Value>>();
        metaschema.insert("$vocabulary".to_string(), Value::Object(declared));
    }

    trace!(uri = %dialect, "resolved official metaschema");
    Some(Value::Object(metaschema))
}

/// In-memory resolver keyed by each schema's canonical identifier.
///
/// Lookups that miss are forwarded to the fallback resolver, if any.
#[derive(Default)]
pub struct MapResolver {
    schemas: HashMap<String, Value>,
    fallback: Option<Box<dyn SchemaResolver>>,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward misses to `fallback`.
    pub fn with_fallback(mut self, fallback: impl SchemaResolver + 'static) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }

    /// Register a schema under its identifier (or `default_id` when it has
    /// none). Returns `false` if the identifier was already registered, in
    /// which case the previous schema is replaced.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Invalid` if the schema has no identifier and no
    /// default was given, or any error raised while identifying it.
    pub fn add(
        &mut self,
        schema: Value,
        default_dialect: &str,
        default_id: &str,
    ) -> Result<bool, SchemaError> {
        let identifier = identify_with(&schema, &*self, default_dialect, default_id)?
            .ok_or_else(|| SchemaError::invalid("cannot register a schema without an identifier"))?;
        let key = uri::canonicalize(&identifier);
        debug!(identifier = %key, "registering schema");
        Ok(self.schemas.insert(key, schema).is_none())
    }

    /// Register a schema under an explicit URI, ignoring its identifier.
    pub fn insert(&mut self, uri: &str, schema: Value) {
        self.schemas.insert(uri::canonicalize(uri), schema);
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl SchemaResolver for MapResolver {
    fn resolve(&self, uri: &str) -> Option<Value> {
        let key = uri::canonicalize(uri);
        if let Some(schema) = self.schemas.get(&key) {
            trace!(uri = %key, "resolved from map");
            return Some(schema.clone());
        }
        match &self.fallback {
            Some(fallback) => fallback.resolve(uri),
            None => None,
        }
    }
}

impl std::fmt::Debug for MapResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapResolver")
            .field("schemas", &self.schemas.keys().collect::<Vec<_>>())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}
