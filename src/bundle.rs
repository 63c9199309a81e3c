//! Reference bundling: embed every external schema a document references.
//!
//! Bundling frames the document, finds the references the frame cannot
//! follow, fetches their targets through the resolver and embeds them under
//! a definitions container keyed by identifier. Each fetched schema is
//! framed on its own to discover the references it brings, until every
//! external resource has been fetched once.
//!
//! Schemas that arrive already bundled have their absolute-identified
//! entries promoted into the outer container so each resource appears once.

use std::collections::{HashMap, HashSet, VecDeque};

use serde_json::Value;
use tracing::{debug, trace};

use crate::dialect::{self, is_official_metaschema};
use crate::error::SchemaError;
use crate::frame::{Frame, Reference};
use crate::identity::{identify_with, reidentify_with};
use crate::pointer::Pointer;
use crate::resolver::SchemaResolver;
use crate::types::{json_type_name, BundleOptions};
use crate::uri;
use crate::vocabularies::{Known, Vocabularies};
use crate::walker::SchemaWalker;

/// Dialects that keep reusable schemas under `definitions`.
const DEFINITIONS_DIALECTS: &[Known] = &[
    Known::Draft7,
    Known::Draft7Hyper,
    Known::Draft6,
    Known::Draft6Hyper,
    Known::Draft4,
    Known::Draft4Hyper,
];

/// The container external schemas are embedded into when no destination is
/// given: `$defs` from 2019-09 onwards, `definitions` for Draft 4 to 7.
///
/// # Errors
///
/// `Invalid` for dialects without a conventional definitions container.
pub fn default_destination(vocabularies: &Vocabularies) -> Result<Pointer, SchemaError> {
    if vocabularies.contains_any(&[Known::Core2020_12, Known::Core2019_09]) {
        Ok(Pointer::from_tokens(["$defs"]))
    } else if vocabularies.contains_any(DEFINITIONS_DIALECTS) {
        Ok(Pointer::from_tokens(["definitions"]))
    } else {
        Err(SchemaError::invalid(
            "could not determine how to perform bundling in this dialect",
        ))
    }
}

/// Embed every external schema referenced by `document`, in place.
///
/// `document` is only replaced once bundling succeeds.
///
/// # Errors
///
/// - `Resolution` / `RelativeMetaschemaResolution` when the resolver does
///   not know a referenced schema.
/// - `Reference` when a reference points to a fragment that does not exist,
///   or the fetched document is not a schema.
/// - `Conflict` when two embedded schemas claim the same identifier with
///   different contents.
/// - `Invalid` when the destination cannot hold the embedded schemas.
pub fn bundle<W, R>(
    document: &mut Value,
    walker: &W,
    resolver: &R,
    options: &BundleOptions,
) -> Result<(), SchemaError>
where
    W: SchemaWalker + ?Sized,
    R: SchemaResolver + ?Sized,
{
    *document = bundled(document, walker, resolver, options)?;
    Ok(())
}

/// Like [`bundle`], returning a bundled copy.
///
/// # Errors
///
/// Same as [`bundle`].
pub fn bundled<W, R>(
    document: &Value,
    walker: &W,
    resolver: &R,
    options: &BundleOptions,
) -> Result<Value, SchemaError>
where
    W: SchemaWalker + ?Sized,
    R: SchemaResolver + ?Sized,
{
    let mut copy = document.clone();
    bundle_into(&mut copy, walker, resolver, options)?;
    Ok(copy)
}

/// Bundle in place, leaving `document` half-written on error.
fn bundle_into<W, R>(
    document: &mut Value,
    walker: &W,
    resolver: &R,
    options: &BundleOptions,
) -> Result<(), SchemaError>
where
    W: SchemaWalker + ?Sized,
    R: SchemaResolver + ?Sized,
{
    let default_dialect = options.default_dialect.as_str();
    let default_id = options.default_id.as_str();
    if !default_id.is_empty() {
        assign_default_id(document, resolver, default_dialect, default_id)?;
    }

    let frame = Frame::new(document, walker, resolver, default_dialect, default_id)?;
    let pending: VecDeque<Pending> = externals(&frame)?
        .into_iter()
        .map(|(identifier, reference)| Pending::new(identifier, reference, Some(Pointer::root())))
        .collect();
    if pending.is_empty() {
        trace!("nothing to bundle");
        return Ok(());
    }

    let container = match &options.destination {
        Some(destination) => destination.clone(),
        None => {
            let root = frame
                .location(&Pointer::root())
                .ok_or_else(|| SchemaError::invalid("the document root was not framed"))?;
            default_destination(&root.vocabularies)?
        }
    };
    debug!(externals = pending.len(), container = %container, "bundling");

    let mut bundler = Bundler {
        walker,
        resolver,
        default_dialect,
        frame: &frame,
        container: &container,
        fetched: HashMap::new(),
        embedded: HashMap::new(),
    };
    bundler.run(document, pending)
}


/// Report every external reference reachable from `document`, following
/// fetched schemas transitively.
///
/// The callback receives the identifier of the resource holding the
/// reference (if it has one), the pointer to the reference keyword, and the
/// identifier of the external schema it needs. Nothing is mutated.
///
/// # Errors
///
/// The same resolution and reference errors as [`bundle`].
pub fn dependencies<W, R, F>(
    document: &Value,
    walker: &W,
    resolver: &R,
    options: &BundleOptions,
    mut callback: F,
) -> Result<(), SchemaError>
where
    W: SchemaWalker + ?Sized,
    R: SchemaResolver + ?Sized,
    F: FnMut(Option<&str>, &Pointer, &str),
{
    let mut visited = HashSet::new();
    visit_dependencies(
        document,
        walker,
        resolver,
        &options.default_dialect,
        &options.default_id,
        &mut visited,
        &mut callback,
    )
}

fn visit_dependencies<W, R, F>(
    document: &Value,
    walker: &W,
    resolver: &R,
    default_dialect: &str,
    default_id: &str,
    visited: &mut HashSet<String>,
    callback: &mut F,
) -> Result<(), SchemaError>
where
    W: SchemaWalker + ?Sized,
    R: SchemaResolver + ?Sized,
    F: FnMut(Option<&str>, &Pointer, &str),
{
    let frame = Frame::new(document, walker, resolver, default_dialect, default_id)?;
    for (identifier, reference) in externals(&frame)? {
        let origin = frame
            .location(&reference.origin())
            .map(|location| location.base.as_str())
            .filter(|base| !base.is_empty());
        callback(origin, &reference.source, identifier);

        if visited.insert(identifier.to_string()) {
            let (remote, embedded_as) =
                fetch(resolver, identifier, &reference.source, default_dialect)?;
            visit_dependencies(
                &remote,
                walker,
                resolver,
                default_dialect,
                &embedded_as,
                visited,
                callback,
            )?;
        }
    }
    Ok(())
}

/// References the frame cannot follow, paired with the identifier of the
/// external resource that would satisfy each.
fn externals(frame: &Frame) -> Result<Vec<(&str, &Reference)>, SchemaError> {
    let mut result = Vec::new();
    for reference in frame.references() {
        if frame.traverse(&reference.destination).is_some() {
            continue;
        }
        // Official metaschemas are understood by every implementation.
        if reference.is_metaschema() && is_official_metaschema(&reference.raw) {
            continue;
        }
        if reference.base.is_empty() || frame.traverse(&reference.base).is_some() {
            return Err(SchemaError::Reference {
                uri: reference.destination.clone(),
                pointer: reference.source.clone(),
                message: "could not resolve schema reference".into(),
            });
        }
        result.push((reference.base.as_str(), reference));
    }
    Ok(result)
}

fn assign_default_id<R: SchemaResolver + ?Sized>(
    document: &mut Value,
    resolver: &R,
    default_dialect: &str,
    default_id: &str,
) -> Result<(), SchemaError> {
    if !document.is_object() || identify_with(document, resolver, default_dialect, "")?.is_some() {
        return Ok(());
    }

    let mut copy = document.clone();
    match reidentify_with(&mut copy, default_id, resolver, default_dialect) {
        Ok(()) => {
            *document = copy;
            Ok(())
        }
        // The identifier would be hidden by a top-level `$ref`; the default
        // still applies as the framing base.
        Err(SchemaError::ReferenceObjectResource { .. }) => Ok(()),
        Err(error) => Err(error),
    }
}

/// Fetch an external schema. Returns it with the identifier it is embedded
/// under: its own absolute identifier if it declares one, otherwise
/// `identifier`, which is written into it.
fn fetch<R: SchemaResolver + ?Sized>(
    resolver: &R,
    identifier: &str,
    source: &Pointer,
    default_dialect: &str,
) -> Result<(Value, String), SchemaError> {
    let Some(mut remote) = resolver.resolve(identifier) else {
        return Err(if uri::is_relative(identifier) {
            SchemaError::RelativeMetaschemaResolution {
                uri: identifier.to_string(),
            }
        } else {
            SchemaError::Resolution {
                uri: identifier.to_string(),
                message: "could not resolve the reference to an external schema".into(),
            }
        });
    };

    if !remote.is_object() || dialect::dialect(&remote, default_dialect).is_empty() {
        return Err(SchemaError::Reference {
            uri: identifier.to_string(),
            pointer: source.clone(),
            message: format!(
                "the resolved document is not an embeddable schema ({})",
                json_type_name(&remote)
            ),
        });
    }

    let own = identify_with(&remote, resolver, default_dialect, "")?
        .map(|declared| uri::canonicalize(&declared));
    match own {
        Some(own) if own == identifier => Ok((remote, own)),
        Some(own) if !uri::is_relative(&own) => {
            debug!(requested = %identifier, identifier = %own, "external schema declares another identifier");
            Ok((remote, own))
        }
        _ => {
            reidentify_with(&mut remote, identifier, resolver, default_dialect)?;
            Ok((remote, identifier.to_string()))
        }
    }
}

/// `destination` with its resource part replaced by `identifier`.
fn retarget(destination: &str, identifier: &str) -> String {
    match uri::fragment(destination) {
        Some(fragment) if !fragment.is_empty() => uri::with_fragment(identifier, fragment),
        _ => identifier.to_string(),
    }
}

/// A reference waiting to be satisfied by an external schema.
struct Pending {
    identifier: String,
    destination: String,
    raw: String,
    source: Pointer,
    /// Where the document holding the reference sits in the output, if it
    /// was written there.
    host: Option<Pointer>,
}

impl Pending {
    fn new(identifier: &str, reference: &Reference, host: Option<Pointer>) -> Self {
        Self {
            identifier: identifier.to_string(),
            destination: reference.destination.clone(),
            raw: reference.raw.clone(),
            source: reference.source.clone(),
            host,
        }
    }

    /// Point the reference at `identifier`, the identifier its target was
    /// embedded under.
    fn retarget(&self, document: &mut Value, identifier: &str) {
        let Some(host) = &self.host else {
            return;
        };
        let pointer = host.concat(&self.source);
        match pointer.get_mut(document) {
            Some(slot) if slot.as_str() == Some(self.raw.as_str()) => {
                let rewritten = retarget(&self.destination, identifier);
                trace!(pointer = %pointer, reference = %rewritten, "rewriting reference");
                *slot = Value::String(rewritten);
            }
            _ => trace!(pointer = %pointer, "reference moved, leaving it as is"),
        }
    }
}

/// A fetched schema, framed under the identifier it was embedded as.
struct Fetched {
    identifier: String,
    frame: Frame,
}

/// A schema written into the container, with the dialect it was read in.
struct Embedded {
    schema: Value,
    dialect: String,
}

struct Bundler<'a, W: ?Sized, R: ?Sized> {
    walker: &'a W,
    resolver: &'a R,
    default_dialect: &'a str,
    /// Frame of the document before anything was embedded.
    frame: &'a Frame,
    container: &'a Pointer,
    /// Every fetched schema, by the identifier it was fetched as.
    fetched: HashMap<String, Fetched>,
    /// Everything embedded so far, by canonical identifier.
    embedded: HashMap<String, Embedded>,
}

impl<W, R> Bundler<'_, W, R>
where
    W: SchemaWalker + ?Sized,
    R: SchemaResolver + ?Sized,
{
    fn run(&mut self, document: &mut Value, mut pending: VecDeque<Pending>) -> Result<(), SchemaError> {
        while let Some(next) = pending.pop_front() {
            if let Some(fetched) = self.fetched.get(&next.identifier) {
                ensure_resolves(fetched, &next)?;
                if fetched.identifier != next.identifier {
                    next.retarget(document, &fetched.identifier);
                }
                continue;
            }

            // Elevation may have brought it in already.
            if let Some(embedded) = self.embedded.get(&next.identifier) {
                trace!(identifier = %next.identifier, "reusing embedded schema");
                let fetched = Fetched {
                    frame: Frame::new(
                        &embedded.schema,
                        self.walker,
                        self.resolver,
                        &embedded.dialect,
                        &next.identifier,
                    )?,
                    identifier: next.identifier.clone(),
                };
                ensure_resolves(&fetched, &next)?;
                self.fetched.insert(next.identifier, fetched);
                continue;
            }

            let (mut remote, identifier) =
                fetch(self.resolver, &next.identifier, &next.source, self.default_dialect)?;
            let fetched = Fetched {
                frame: Frame::new(
                    &remote,
                    self.walker,
                    self.resolver,
                    self.default_dialect,
                    &identifier,
                )?,
                identifier,
            };
            ensure_resolves(&fetched, &next)?;
            if fetched.identifier != next.identifier {
                next.retarget(document, &fetched.identifier);
            }

            let remote_dialect = dialect::dialect(&remote, self.default_dialect).to_string();
            self.elevate(document, &mut remote)?;
            debug!(identifier = %fetched.identifier, "embedding external schema");
            let host = self.place(document, fetched.identifier.clone(), remote, &remote_dialect)?;

            for (identifier, reference) in externals(&fetched.frame)? {
                // The host document may already hold it.
                if self.frame.traverse(&reference.destination).is_some() {
                    continue;
                }
                if self.frame.traverse(&reference.base).is_some() {
                    return Err(SchemaError::Reference {
                        uri: reference.destination.clone(),
                        pointer: reference.source.clone(),
                        message: "could not resolve schema reference".into(),
                    });
                }
                pending.push_back(Pending::new(identifier, reference, host.clone()));
            }
            self.fetched.insert(next.identifier, fetched);
        }
        Ok(())
    }

    /// Promote the absolute-identified entries of an already bundled schema
    /// into the outer container.
    fn elevate(&mut self, document: &mut Value, schema: &mut Value) -> Result<(), SchemaError> {
        let container = self.container;
        let host_dialect = dialect::dialect(schema, self.default_dialect).to_string();
        let Some(Value::Object(entries)) = container.get_mut(schema) else {
            return Ok(());
        };

        let mut promoted = Vec::new();
        for (name, entry) in entries.iter() {
            if !entry.is_object() {
                continue;
            }
            let Some(identifier) = identify_with(entry, self.resolver, &host_dialect, "")? else {
                continue;
            };
            // Relative identifiers only make sense inside their host.
            if uri::is_relative(&identifier) {
                continue;
            }
            promoted.push((name.clone(), uri::canonicalize(&identifier)));
        }

        let mut elevated = Vec::with_capacity(promoted.len());
        for (name, identifier) in promoted {
            if let Some(entry) = entries.shift_remove(&name) {
                elevated.push((identifier, entry));
            }
        }

        if entries.is_empty() {
            if let (Some(parent), Some(key)) = (container.parent(), container.last()) {
                if let Some(Value::Object(map)) = parent.get_mut(schema) {
                    map.shift_remove(key);
                }
            }
        }

        for (identifier, mut entry) in elevated {
            trace!(identifier = %identifier, "elevating pre-bundled schema");
            self.elevate(document, &mut entry)?;
            self.place(document, identifier, entry, &host_dialect)?;
        }
        Ok(())
    }

    /// Embed `schema` under the container, unless the same resource is
    /// already part of the document. Returns where it was written.
    fn place(
        &mut self,
        document: &mut Value,
        identifier: String,
        schema: Value,
        dialect: &str,
    ) -> Result<Option<Pointer>, SchemaError> {
        if let Some(existing) = self.embedded.get(&identifier) {
            if existing.schema == schema {
                trace!(identifier = %identifier, "skipping duplicate schema");
                return Ok(None);
            }
            return Err(SchemaError::Conflict { identifier });
        }

        if let Some(pointer) = self.frame.traverse(&identifier) {
            return match pointer.get(document) {
                Some(existing) if *existing == schema => Ok(None),
                _ => Err(SchemaError::Conflict { identifier }),
            };
        }

        let container = self.container;
        let target = container.get_or_create(document).ok_or_else(|| {
            SchemaError::invalid(format!(
                "could not bundle to a container path that does not exist: {}",
                container
            ))
        })?;
        let found = json_type_name(target);
        let Value::Object(map) = target else {
            return Err(SchemaError::invalid(format!(
                "could not bundle to a container path that is not an object: {} is an {}",
                container, found
            )));
        };

        let mut key = identifier.clone();
        loop {
            match map.get(&key) {
                Some(existing) if *existing == schema => break,
                Some(_) => key.push_str("/x"),
                None => {
                    map.insert(key.clone(), schema.clone());
                    break;
                }
            }
        }
        self.embedded.insert(
            identifier,
            Embedded {
                schema,
                dialect: dialect.to_string(),
            },
        );
        Ok(Some(container.join(key)))
    }
}

/// Fail unless the schema fetched for `pending` contains the location the
/// reference asks for.
fn ensure_resolves(fetched: &Fetched, pending: &Pending) -> Result<(), SchemaError> {
    let destination = retarget(&pending.destination, &fetched.identifier);
    if fetched.frame.traverse(&destination).is_some() {
        return Ok(());
    }
    Err(SchemaError::Reference {
        uri: pending.destination.clone(),
        pointer: pending.source.clone(),
        message: "could not resolve schema reference".into(),
    })
}
