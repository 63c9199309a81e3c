//! Dialect, base dialect and vocabulary resolution.
//!
//! The dialect of a schema is its `$schema` (or a caller default). The base
//! dialect is found by walking `$schema` up the metaschema chain until one of
//! the official dialects, or a metaschema that declares itself, is reached.

use std::borrow::Cow;
use std::collections::HashSet;

use serde_json::Value;
use tracing::trace;

use crate::error::SchemaError;
use crate::resolver::SchemaResolver;
use crate::uri;
use crate::vocabularies::{Known, Vocabularies};

pub const DRAFT_2020_12: &str = "https://json-schema.org/draft/2020-12/schema";
pub const DRAFT_2020_12_HYPER: &str = "https://json-schema.org/draft/2020-12/hyper-schema";
pub const DRAFT_2019_09: &str = "https://json-schema.org/draft/2019-09/schema";
pub const DRAFT_2019_09_HYPER: &str = "https://json-schema.org/draft/2019-09/hyper-schema";
pub const DRAFT_7: &str = "http://json-schema.org/draft-07/schema#";
pub const DRAFT_7_HYPER: &str = "http://json-schema.org/draft-07/hyper-schema#";
pub const DRAFT_6: &str = "http://json-schema.org/draft-06/schema#";
pub const DRAFT_6_HYPER: &str = "http://json-schema.org/draft-06/hyper-schema#";
pub const DRAFT_4: &str = "http://json-schema.org/draft-04/schema#";
pub const DRAFT_4_HYPER: &str = "http://json-schema.org/draft-04/hyper-schema#";
pub const DRAFT_3: &str = "http://json-schema.org/draft-03/schema#";
pub const DRAFT_3_HYPER: &str = "http://json-schema.org/draft-03/hyper-schema#";
pub const DRAFT_2: &str = "http://json-schema.org/draft-02/schema#";
pub const DRAFT_2_HYPER: &str = "http://json-schema.org/draft-02/hyper-schema#";
pub const DRAFT_1: &str = "http://json-schema.org/draft-01/schema#";
pub const DRAFT_1_HYPER: &str = "http://json-schema.org/draft-01/hyper-schema#";
pub const DRAFT_0: &str = "http://json-schema.org/draft-00/schema#";
pub const DRAFT_0_HYPER: &str = "http://json-schema.org/draft-00/hyper-schema#";

/// Dialects that are their own base dialect. Draft 0 to 2 schema dialects
/// are built on top of their hyper-schema, so they are not listed.
const BASE_DIALECTS: &[&str] = &[
    DRAFT_2020_12,
    DRAFT_2020_12_HYPER,
    DRAFT_2019_09,
    DRAFT_2019_09_HYPER,
    DRAFT_7,
    DRAFT_7_HYPER,
    DRAFT_6,
    DRAFT_6_HYPER,
    DRAFT_4,
    DRAFT_4_HYPER,
    DRAFT_3,
    DRAFT_3_HYPER,
    DRAFT_2_HYPER,
    DRAFT_1_HYPER,
    DRAFT_0_HYPER,
];

/// Official dialects that predate `$vocabulary`.
const PRE_VOCABULARY_DIALECTS: &[&str] = &[
    DRAFT_7, DRAFT_6, DRAFT_4, DRAFT_3, DRAFT_2, DRAFT_1, DRAFT_0,
];

/// Whether `uri` is one of the official metaschema URIs, in any of the
/// spellings this crate recognises (with or without an empty fragment).
pub fn is_official_metaschema(uri: &str) -> bool {
    let canonical = crate::uri::canonicalize(uri);
    BASE_DIALECTS
        .iter()
        .chain(PRE_VOCABULARY_DIALECTS)
        .any(|dialect| *dialect == uri || crate::uri::canonicalize(dialect) == canonical)
}

/// Whether the value can be a schema at all (object or boolean).
pub fn is_schema(schema: &Value) -> bool {
    schema.is_object() || schema.is_boolean()
}

/// `true`, `{}` and nothing else.
pub fn is_empty_schema(schema: &Value) -> bool {
    match schema {
        Value::Bool(value) => *value,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// The declared dialect of a schema, or `default_dialect`.
///
/// Boolean schemas and schemas without a string `$schema` use the default.
/// An empty result means the dialect is unknown.
pub fn dialect<'a>(schema: &'a Value, default_dialect: &'a str) -> &'a str {
    schema
        .get("$schema")
        .and_then(Value::as_str)
        .unwrap_or(default_dialect)
}

fn resolution_error(dialect: &str) -> SchemaError {
    if uri::is_relative(dialect) {
        SchemaError::RelativeMetaschemaResolution {
            uri: dialect.to_string(),
        }
    } else {
        SchemaError::Resolution {
            uri: dialect.to_string(),
            message: "could not resolve the metaschema of the schema".into(),
        }
    }
}

/// The metaschema that the schema's dialect points to.
///
/// # Errors
///
/// `UnknownDialect` when no dialect can be determined, or a resolution error
/// when the resolver does not know the metaschema.
pub fn metaschema<R: SchemaResolver + ?Sized>(
    schema: &Value,
    resolver: &R,
    default_dialect: &str,
) -> Result<Value, SchemaError> {
    let effective = dialect(schema, default_dialect);
    if effective.is_empty() {
        return Err(SchemaError::UnknownDialect);
    }
    resolver
        .resolve(effective)
        .ok_or_else(|| resolution_error(effective))
}

/// Resolve the base dialect by walking the metaschema chain.
///
/// Returns an empty string if the schema has no dialect at all.
///
/// # Errors
///
/// Returns a resolution error if a metaschema on the chain cannot be
/// resolved, or if the chain loops without reaching a fixed point.
pub fn base_dialect<R: SchemaResolver + ?Sized>(
    schema: &Value,
    resolver: &R,
    default_dialect: &str,
) -> Result<String, SchemaError> {
    let mut current_schema = Cow::Borrowed(schema);
    let mut current = dialect(schema, default_dialect).to_string();
    let mut visited = HashSet::new();

    loop {
        if current.is_empty() {
            return Ok(String::new());
        }

        if let Some(known) = BASE_DIALECTS.iter().find(|known| **known == current) {
            return Ok((*known).to_string());
        }

        if current_schema.get("$id").and_then(Value::as_str) == Some(current.as_str()) {
            return Ok(current);
        }

        if !visited.insert(current.clone()) {
            return Err(SchemaError::Resolution {
                uri: current,
                message: "the metaschema chain never reaches a base dialect".into(),
            });
        }

        trace!(dialect = %current, "resolving metaschema");
        let next_schema = resolver
            .resolve(&current)
            .ok_or_else(|| resolution_error(&current))?;
        let next = dialect(&next_schema, &current).to_string();
        current_schema = Cow::Owned(next_schema);
        current = next;
    }
}

fn core_vocabulary(base_dialect: &str) -> Result<Known, SchemaError> {
    match base_dialect {
        DRAFT_2020_12 | DRAFT_2020_12_HYPER => Ok(Known::Core2020_12),
        DRAFT_2019_09 | DRAFT_2019_09_HYPER => Ok(Known::Core2019_09),
        _ => Err(SchemaError::BaseDialect {
            dialect: base_dialect.to_string(),
        }),
    }
}

/// The vocabularies in effect for a schema.
///
/// # Errors
///
/// `UnknownBaseDialect` or `UnknownDialect` when those cannot be determined,
/// plus anything [`vocabularies_for`] raises.
pub fn vocabularies<R: SchemaResolver + ?Sized>(
    schema: &Value,
    resolver: &R,
    default_dialect: &str,
) -> Result<Vocabularies, SchemaError> {
    let base = base_dialect(schema, resolver, default_dialect)?;
    if base.is_empty() {
        return Err(SchemaError::UnknownBaseDialect);
    }

    let effective = dialect(schema, default_dialect);
    if effective.is_empty() {
        return Err(SchemaError::UnknownDialect);
    }

    vocabularies_for(resolver, &base, effective)
}

/// The vocabularies declared by `dialect`, whose base dialect is
/// `base_dialect`.
///
/// Pre-vocabulary dialects yield a single entry for the dialect itself (or
/// its base dialect). Otherwise the dialect's metaschema is resolved and its
/// `$vocabulary` copied, defaulting to the core vocabulary.
///
/// # Errors
///
/// A resolution error if the dialect's metaschema is unknown, `BaseDialect`
/// if the base dialect is not vocabulary aware, and `Invalid` if the core
/// vocabulary is missing or optional.
pub fn vocabularies_for<R: SchemaResolver + ?Sized>(
    resolver: &R,
    base_dialect: &str,
    dialect: &str,
) -> Result<Vocabularies, SchemaError> {
    if base_dialect == dialect {
        match dialect {
            DRAFT_2020_12 => {
                return Ok([
                    (Known::Core2020_12, true),
                    (Known::Applicator2020_12, true),
                    (Known::Unevaluated2020_12, true),
                    (Known::Validation2020_12, true),
                    (Known::MetaData2020_12, true),
                    (Known::FormatAnnotation2020_12, true),
                    (Known::Content2020_12, true),
                ]
                .into_iter()
                .collect())
            }
            DRAFT_2019_09 => {
                return Ok([
                    (Known::Core2019_09, true),
                    (Known::Applicator2019_09, true),
                    (Known::Validation2019_09, true),
                    (Known::MetaData2019_09, true),
                    (Known::Format2019_09, false),
                    (Known::Content2019_09, true),
                ]
                .into_iter()
                .collect())
            }
            _ => {}
        }
    }

    if PRE_VOCABULARY_DIALECTS.contains(&dialect) {
        let mut result = Vocabularies::new();
        result.insert(dialect, true);
        return Ok(result);
    }

    if BASE_DIALECTS.contains(&base_dialect) && core_vocabulary(base_dialect).is_err() {
        let mut result = Vocabularies::new();
        result.insert(base_dialect, true);
        return Ok(result);
    }

    let metaschema = resolver.resolve(dialect).ok_or_else(|| SchemaError::Resolution {
        uri: dialect.to_string(),
        message: "could not resolve the metaschema of the schema".into(),
    })?;

    let core = core_vocabulary(base_dialect)?;
    let mut result = Vocabularies::new();
    match metaschema.get("$vocabulary") {
        Some(Value::Object(declared)) => {
            for (vocabulary, required) in declared {
                result.insert(vocabulary.clone(), required.as_bool().unwrap_or(false));
            }
        }
        Some(_) => return Err(SchemaError::invalid("$vocabulary must be an object")),
        None => result.insert_known(core, true),
    }

    match result.get(core.uri()) {
        None => Err(SchemaError::invalid("the core vocabulary must always be present")),
        Some(false) => Err(SchemaError::invalid("the core vocabulary must always be required")),
        Some(true) => Ok(result),
    }
}
