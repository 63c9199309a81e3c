//! Rule-based schema transformation.
//!
//! A [`TransformSet`] holds named [`TransformRule`]s. [`TransformSet::check`]
//! reports every location a rule matches; [`TransformSet::apply`] rewrites
//! the document one match at a time, re-framing after each change and
//! fixing up JSON Pointer references into regions a rule moved.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde_json::Value;
use tracing::{debug, trace};

use crate::error::SchemaError;
use crate::frame::{Frame, Location, Reference};
use crate::pointer::Pointer;
use crate::resolver::SchemaResolver;
use crate::uri;
use crate::vocabularies::Vocabularies;
use crate::walker::SchemaWalker;

/// The outcome of a rule's condition at one location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Match {
    None,
    /// The rule acts on the current subschema as a whole.
    Current,
    /// The rule acts on one location, relative to the current subschema.
    At(Pointer),
    /// The rule acts on several locations at once, relative to the current
    /// subschema.
    Many(Vec<Pointer>),
}

impl Match {
    pub fn is_match(&self) -> bool {
        !matches!(self, Match::None)
    }

    /// The absolute pointers this match claims, given the location the rule
    /// was evaluated at.
    fn claims(&self, location: &Pointer) -> Vec<Pointer> {
        match self {
            Match::None => Vec::new(),
            Match::Current => vec![location.clone()],
            Match::At(pointer) => vec![location.concat(pointer)],
            Match::Many(pointers) => pointers.iter().map(|pointer| location.concat(pointer)).collect(),
        }
    }
}

impl From<bool> for Match {
    fn from(matched: bool) -> Self {
        if matched {
            Match::Current
        } else {
            Match::None
        }
    }
}

/// Everything a rule can look at when deciding whether it matches.
pub struct RuleContext<'a> {
    /// The whole document being transformed.
    pub root: &'a Value,
    pub frame: &'a Frame,
    /// The frame entry of the subschema under evaluation.
    pub location: &'a Location,
    pub walker: &'a dyn SchemaWalker,
    pub resolver: &'a dyn SchemaResolver,
}

impl<'a> RuleContext<'a> {
    pub fn pointer(&self) -> &'a Pointer {
        &self.location.pointer
    }

    /// Vocabularies in effect at this location.
    pub fn vocabularies(&self) -> &'a Vocabularies {
        &self.location.vocabularies
    }

    pub fn dialect(&self) -> &'a str {
        &self.location.dialect
    }

    pub fn base_dialect(&self) -> &'a str {
        &self.location.base_dialect
    }
}

/// A named, self-describing schema rewrite.
pub trait TransformRule {
    /// Unique name. Adding a rule with a taken name replaces the old one.
    fn name(&self) -> &str;

    /// Human-readable explanation of what the rule flags.
    fn message(&self) -> &str;

    fn condition(&self, schema: &Value, context: &RuleContext<'_>) -> Match;

    /// Rewrite the subschema the condition matched. Must make the condition
    /// stop matching.
    fn transform(&self, schema: &mut Value, matched: &Match);

    /// Where a pointer reference to `target` should point after this rule
    /// was applied at `current`. `origin` is the subschema holding the
    /// reference. Returning `target` unchanged leaves the reference broken.
    fn rereference(
        &self,
        _reference: &str,
        _origin: &Pointer,
        target: &Pointer,
        _current: &Pointer,
    ) -> Result<Pointer, SchemaError> {
        Ok(target.clone())
    }
}

struct Hit<'a> {
    location: Pointer,
    rule: &'a dyn TransformRule,
    matched: Match,
}

/// A collection of rules, evaluated in name order.
#[derive(Default)]
pub struct TransformSet {
    rules: BTreeMap<String, Box<dyn TransformRule>>,
}

impl TransformSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule, replacing any rule with the same name.
    pub fn add(&mut self, rule: impl TransformRule + 'static) -> &mut Self {
        self.rules.insert(rule.name().to_string(), Box::new(rule));
        self
    }

    /// Remove a rule by name. Returns whether it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        self.rules.remove(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Report every rule match without modifying the document.
    ///
    /// Returns `true` when no rule matched anywhere.
    ///
    /// # Errors
    ///
    /// Framing errors, or `TransformConflict` when two rules claim the same
    /// location.
    pub fn check<W, R, F>(
        &self,
        document: &Value,
        walker: &W,
        resolver: &R,
        mut callback: F,
        default_dialect: &str,
    ) -> Result<bool, SchemaError>
    where
        W: SchemaWalker,
        R: SchemaResolver,
        F: FnMut(&Pointer, &str, &str),
    {
        let frame = Frame::new(document, walker, resolver, default_dialect, "")?;
        let hits = self.evaluate(document, &frame, walker, resolver)?;
        for hit in &hits {
            callback(&hit.location, hit.rule.name(), hit.rule.message());
        }
        Ok(hits.is_empty())
    }

    /// Apply rules until none matches. Returns whether anything changed.
    ///
    /// # Errors
    ///
    /// - `TransformConflict` when two rules claim the same location.
    /// - `TransformRepeated` when a rule matches a location it was already
    ///   applied to.
    /// - `BrokenReference` when a transform leaves a pointer reference
    ///   dangling and the rule cannot say where it moved. The document keeps
    ///   the transform that broke it.
    pub fn apply<W, R>(
        &self,
        document: &mut Value,
        walker: &W,
        resolver: &R,
        default_dialect: &str,
    ) -> Result<bool, SchemaError>
    where
        W: SchemaWalker,
        R: SchemaResolver,
    {
        let mut processed: HashSet<(Pointer, String)> = HashSet::new();
        let mut changed = false;

        loop {
            let frame = Frame::new(document, walker, resolver, default_dialect, "")?;
            let hits = self.evaluate(document, &frame, walker, resolver)?;
            let Some(hit) = hits.into_iter().next() else {
                return Ok(changed);
            };

            let name = hit.rule.name().to_string();
            if !processed.insert((hit.location.clone(), name.clone())) {
                return Err(SchemaError::TransformRepeated {
                    pointer: hit.location,
                    rule: name,
                });
            }

            let resolved: HashMap<&str, &Pointer> = frame
                .references()
                .iter()
                .filter(|reference| is_pointer_reference(reference))
                .filter_map(|reference| {
                    frame
                        .traverse(&reference.destination)
                        .map(|target| (reference.destination.as_str(), target))
                })
                .collect();

            let subschema = hit.location.get_mut(document).ok_or_else(|| {
                SchemaError::invalid(format!("location {} disappeared", hit.location))
            })?;
            hit.rule.transform(subschema, &hit.matched);
            changed = true;
            debug!(rule = %name, pointer = %hit.location, "applied transform rule");

            let after = Frame::new(document, walker, resolver, default_dialect, "")?;
            let rewrites = rereference(&after, &resolved, hit.rule, &hit.location)?;
            for (source, rewritten) in rewrites {
                trace!(pointer = %source, reference = %rewritten, "rewriting reference");
                if let Some(slot) = source.get_mut(document) {
                    *slot = Value::String(rewritten);
                }
            }
        }
    }

    /// Every match in the document, in location order then rule name order.
    fn evaluate<'s>(
        &'s self,
        document: &Value,
        frame: &Frame,
        walker: &dyn SchemaWalker,
        resolver: &dyn SchemaResolver,
    ) -> Result<Vec<Hit<'s>>, SchemaError> {
        let mut hits = Vec::new();
        let mut claimed: HashMap<Pointer, &str> = HashMap::new();

        for location in frame.locations() {
            let Some(schema) = location.pointer.get(document) else {
                continue;
            };
            let context = RuleContext {
                root: document,
                frame,
                location,
                walker,
                resolver,
            };

            for rule in self.rules.values() {
                let matched = rule.condition(schema, &context);
                if !matched.is_match() {
                    continue;
                }
                for pointer in matched.claims(&location.pointer) {
                    match claimed.get(&pointer) {
                        Some(first) if *first != rule.name() => {
                            return Err(SchemaError::TransformConflict {
                                pointer,
                                first: first.to_string(),
                                second: rule.name().to_string(),
                            });
                        }
                        Some(_) => {}
                        None => {
                            claimed.insert(pointer, rule.name());
                        }
                    }
                }
                hits.push(Hit {
                    location: location.pointer.clone(),
                    rule: rule.as_ref(),
                    matched,
                });
            }
        }

        Ok(hits)
    }
}

impl std::fmt::Debug for TransformSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformSet")
            .field("rules", &self.rules.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn is_pointer_reference(reference: &Reference) -> bool {
    !reference.is_metaschema()
        && reference
            .fragment
            .as_deref()
            .is_some_and(|fragment| fragment.starts_with('/'))
}

/// New values for the pointer references a transform left dangling.
fn rereference(
    after: &Frame,
    resolved: &HashMap<&str, &Pointer>,
    rule: &dyn TransformRule,
    current: &Pointer,
) -> Result<Vec<(Pointer, String)>, SchemaError> {
    let mut rewrites = Vec::new();
    for reference in after.references() {
        if !is_pointer_reference(reference) || after.traverse(&reference.destination).is_some() {
            continue;
        }
        // Dangling before the transform too.
        let Some(target) = resolved.get(reference.destination.as_str()) else {
            continue;
        };

        let broken = || SchemaError::BrokenReference {
            reference: reference.raw.clone(),
            pointer: reference.source.clone(),
        };
        let moved = rule.rereference(&reference.raw, &reference.origin(), target, current)?;
        if moved == **target || after.location(&moved).is_none() {
            return Err(broken());
        }
        let relative = after
            .traverse(&reference.base)
            .and_then(|resource| moved.strip_prefix(resource))
            .ok_or_else(broken)?;
        rewrites.push((
            reference.source.clone(),
            format!("{}#{}", uri::strip_fragment(&reference.raw), relative),
        ));
    }
    Ok(rewrites)
}
