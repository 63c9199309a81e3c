//! Schema identifiers: reading, assigning and removing `$id` / `id`.

use serde_json::{Map, Value};

use crate::dialect::{
    self, base_dialect, DRAFT_0_HYPER, DRAFT_1_HYPER, DRAFT_2019_09, DRAFT_2019_09_HYPER,
    DRAFT_2020_12, DRAFT_2020_12_HYPER, DRAFT_2_HYPER, DRAFT_3, DRAFT_3_HYPER, DRAFT_4,
    DRAFT_4_HYPER, DRAFT_6, DRAFT_6_HYPER, DRAFT_7, DRAFT_7_HYPER,
};
use crate::error::SchemaError;
use crate::pointer::Pointer;
use crate::resolver::SchemaResolver;
use crate::uri;

/// Synthetic identifier given to anonymous schemas by [`wrap`].
pub const WRAPPER_IDENTIFIER: &str = "__sourcemeta-core-wrap__";

/// The identifier keyword for a base dialect.
///
/// # Errors
///
/// `BaseDialect` if the base dialect is not an official one.
pub fn id_keyword(base_dialect: &str) -> Result<&'static str, SchemaError> {
    match base_dialect {
        DRAFT_2020_12 | DRAFT_2020_12_HYPER | DRAFT_2019_09 | DRAFT_2019_09_HYPER | DRAFT_7
        | DRAFT_7_HYPER | DRAFT_6 | DRAFT_6_HYPER => Ok("$id"),
        DRAFT_4 | DRAFT_4_HYPER | DRAFT_3 | DRAFT_3_HYPER | DRAFT_2_HYPER | DRAFT_1_HYPER
        | DRAFT_0_HYPER => Ok("id"),
        _ => Err(SchemaError::BaseDialect {
            dialect: base_dialect.to_string(),
        }),
    }
}

/// Dialects in which `$ref` overrides every sibling keyword.
fn ref_overrides_siblings(base_dialect: &str) -> bool {
    matches!(
        base_dialect,
        DRAFT_7 | DRAFT_7_HYPER | DRAFT_6 | DRAFT_6_HYPER | DRAFT_4 | DRAFT_4_HYPER | DRAFT_3
            | DRAFT_3_HYPER
    )
}

fn or_default(default_id: &str) -> Option<String> {
    (!default_id.is_empty()).then(|| default_id.to_string())
}

/// The identifier of a schema given its base dialect.
///
/// `default_id` (if non-empty) is returned when the schema has no usable
/// identifier, including when a sibling `$ref` hides it.
///
/// # Errors
///
/// `Invalid` if the identifier keyword holds something other than a
/// non-empty string, `BaseDialect` for unrecognised base dialects.
pub fn identify(
    schema: &Value,
    base_dialect: &str,
    default_id: &str,
) -> Result<Option<String>, SchemaError> {
    let Some(map) = schema.as_object() else {
        return Ok(or_default(default_id));
    };

    let keyword = id_keyword(base_dialect)?;
    let Some(identifier) = map.get(keyword) else {
        return Ok(or_default(default_id));
    };

    let identifier = match identifier.as_str() {
        Some(value) if !value.is_empty() => value,
        _ => return Err(SchemaError::invalid("the schema identifier property is invalid")),
    };

    if map.contains_key("$ref") && ref_overrides_siblings(base_dialect) {
        return Ok(or_default(default_id));
    }

    Ok(Some(identifier.to_string()))
}

/// Like [`identify`], resolving the base dialect first.
///
/// Resolution failures fall back to `default_id` when one is given.
///
/// # Errors
///
/// Resolution errors when no `default_id` is given, plus anything
/// [`identify`] raises.
pub fn identify_with<R: SchemaResolver + ?Sized>(
    schema: &Value,
    resolver: &R,
    default_dialect: &str,
    default_id: &str,
) -> Result<Option<String>, SchemaError> {
    match base_dialect(schema, resolver, default_dialect) {
        Ok(base) if base.is_empty() => Ok(or_default(default_id)),
        Ok(base) => identify(schema, &base, default_id),
        Err(err) if err.is_resolution() && !default_id.is_empty() => {
            Ok(Some(default_id.to_string()))
        }
        Err(err) => Err(err),
    }
}

/// Remove the identifier keyword, if any.
///
/// # Errors
///
/// `BaseDialect` for unrecognised base dialects.
pub fn anonymize(schema: &mut Value, base_dialect: &str) -> Result<(), SchemaError> {
    if let Value::Object(map) = schema {
        map.shift_remove(id_keyword(base_dialect)?);
    }
    Ok(())
}

/// Set the identifier keyword to `identifier`.
///
/// # Errors
///
/// `ReferenceObjectResource` if the new identifier is hidden by a sibling
/// `$ref` in this dialect, `Invalid` for boolean schemas.
pub fn reidentify(
    schema: &mut Value,
    identifier: &str,
    base_dialect: &str,
) -> Result<(), SchemaError> {
    let keyword = id_keyword(base_dialect)?;
    let Value::Object(map) = schema else {
        return Err(SchemaError::invalid("cannot assign an identifier to a boolean schema"));
    };
    map.insert(keyword.to_string(), Value::String(identifier.to_string()));

    if map.contains_key("$ref") && identify(schema, base_dialect, "")?.is_none() {
        return Err(SchemaError::ReferenceObjectResource {
            identifier: identifier.to_string(),
        });
    }
    Ok(())
}

/// Like [`reidentify`], resolving the base dialect first.
///
/// # Errors
///
/// `UnknownBaseDialect` if no base dialect can be determined.
pub fn reidentify_with<R: SchemaResolver + ?Sized>(
    schema: &mut Value,
    identifier: &str,
    resolver: &R,
    default_dialect: &str,
) -> Result<(), SchemaError> {
    let base = base_dialect(schema, resolver, default_dialect)?;
    if base.is_empty() {
        return Err(SchemaError::UnknownBaseDialect);
    }
    reidentify(schema, identifier, &base)
}

/// Wrap the subschema at `pointer` into a standalone 2020-12 schema that
/// references it, keeping the surrounding document for context.
///
/// An empty pointer returns a copy of the schema.
///
/// # Errors
///
/// `UnknownBaseDialect` without a dialect, `Invalid` if `pointer` does not
/// exist or the schema cannot be given an identifier.
pub fn wrap<R: SchemaResolver + ?Sized>(
    schema: &Value,
    pointer: &Pointer,
    resolver: &R,
    default_dialect: &str,
) -> Result<Value, SchemaError> {
    if pointer.get(schema).is_none() {
        return Err(SchemaError::invalid(format!(
            "cannot wrap a location that does not exist: {}",
            pointer
        )));
    }
    if pointer.is_empty() {
        return Ok(schema.clone());
    }

    let mut copy = schema.clone();
    let effective = dialect::dialect(schema, default_dialect).to_string();
    if effective.is_empty() {
        return Err(SchemaError::UnknownBaseDialect);
    }
    if let Value::Object(map) = &mut copy {
        map.insert("$schema".into(), Value::String(effective));
    }

    let identifier = identify_with(&copy, resolver, default_dialect, "")?
        .unwrap_or_else(|| WRAPPER_IDENTIFIER.to_string());

    match reidentify_with(&mut copy, &identifier, resolver, default_dialect) {
        Err(SchemaError::ReferenceObjectResource { .. }) => {
            return Err(SchemaError::invalid(
                "cannot process a Draft 7 or older schema with a top-level $ref \
                 (which overrides sibling keywords)",
            ));
        }
        other => other?,
    }

    let reference = match uri::fragment(&identifier) {
        Some(fragment) if !fragment.is_empty() => {
            format!("#{}", Pointer::from_tokens(["$defs", "schema"]).concat(pointer))
        }
        _ => format!("{}#{}", uri::strip_fragment(&identifier), pointer),
    };

    let mut defs = Map::new();
    defs.insert("schema".into(), copy);

    let mut result = Map::new();
    result.insert("$schema".into(), Value::String(DRAFT_2020_12.into()));
    result.insert("$ref".into(), Value::String(reference));
    result.insert("$defs".into(), Value::Object(defs));
    Ok(Value::Object(result))
}
