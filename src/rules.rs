//! Built-in transform rules.

use serde_json::{Map, Value};

use crate::error::SchemaError;
use crate::pointer::Pointer;
use crate::transformer::{Match, RuleContext, TransformRule, TransformSet};
use crate::vocabularies::Known;

const CONDITIONAL_VOCABULARIES: &[Known] = &[
    Known::Applicator2020_12,
    Known::Applicator2019_09,
    Known::Draft7,
    Known::Draft7Hyper,
];

fn keyword(name: &str) -> Pointer {
    Pointer::from_tokens([name])
}

fn defines(schema: &Value, name: &str) -> bool {
    schema.get(name).is_some()
}

fn erase(schema: &mut Value, name: &str) {
    if let Some(map) = schema.as_object_mut() {
        map.shift_remove(name);
    }
}

/// Rename `definitions` to `$defs`, fixing pointer references into it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefinitionsToDefs;

impl TransformRule for DefinitionsToDefs {
    fn name(&self) -> &str {
        "definitions_to_defs"
    }

    fn message(&self) -> &str {
        "`definitions` is superseded by `$defs` starting in 2019-09"
    }

    fn condition(&self, schema: &Value, context: &RuleContext<'_>) -> Match {
        if context
            .vocabularies()
            .contains_any(&[Known::Core2020_12, Known::Core2019_09])
            && defines(schema, "definitions")
            && !defines(schema, "$defs")
        {
            Match::At(keyword("definitions"))
        } else {
            Match::None
        }
    }

    fn transform(&self, schema: &mut Value, _matched: &Match) {
        let Some(map) = schema.as_object_mut() else {
            return;
        };
        // Keep the keyword in its original position.
        *map = std::mem::take(map)
            .into_iter()
            .map(|(key, value)| {
                if key == "definitions" {
                    ("$defs".to_string(), value)
                } else {
                    (key, value)
                }
            })
            .collect::<Map<String, Value>>();
    }

    fn rereference(
        &self,
        _reference: &str,
        _origin: &Pointer,
        target: &Pointer,
        current: &Pointer,
    ) -> Result<Pointer, SchemaError> {
        Ok(target.rebase(&current.join("definitions"), &current.join("$defs")))
    }
}

/// Drop `then` when there is no `if`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThenWithoutIf;

impl TransformRule for ThenWithoutIf {
    fn name(&self) -> &str {
        "then_without_if"
    }

    fn message(&self) -> &str {
        "The `then` keyword is meaningless without the presence of the `if` keyword"
    }

    fn condition(&self, schema: &Value, context: &RuleContext<'_>) -> Match {
        if context.vocabularies().contains_any(CONDITIONAL_VOCABULARIES)
            && defines(schema, "then")
            && !defines(schema, "if")
        {
            Match::At(keyword("then"))
        } else {
            Match::None
        }
    }

    fn transform(&self, schema: &mut Value, _matched: &Match) {
        erase(schema, "then");
    }
}

/// Drop `else` when there is no `if`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElseWithoutIf;

impl TransformRule for ElseWithoutIf {
    fn name(&self) -> &str {
        "else_without_if"
    }

    fn message(&self) -> &str {
        "The `else` keyword is meaningless without the presence of the `if` keyword"
    }

    fn condition(&self, schema: &Value, context: &RuleContext<'_>) -> Match {
        if context.vocabularies().contains_any(CONDITIONAL_VOCABULARIES)
            && defines(schema, "else")
            && !defines(schema, "if")
        {
            Match::At(keyword("else"))
        } else {
            Match::None
        }
    }

    fn transform(&self, schema: &mut Value, _matched: &Match) {
        erase(schema, "else");
    }
}

/// Replace `if: X, then: false` with `not: X`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThenFalse;

impl TransformRule for ThenFalse {
    fn name(&self) -> &str {
        "then_false"
    }

    fn message(&self) -> &str {
        "Setting `then` to the false schema is a convoluted way of negating \
         the `if` subschema, which the `not` keyword expresses directly"
    }

    fn condition(&self, schema: &Value, context: &RuleContext<'_>) -> Match {
        if !context.vocabularies().contains_any(CONDITIONAL_VOCABULARIES) {
            return Match::None;
        }
        let Some(map) = schema.as_object() else {
            return Match::None;
        };
        let (Some(condition), Some(Value::Bool(false))) = (map.get("if"), map.get("then")) else {
            return Match::None;
        };
        if !(condition.is_object() || condition == &Value::Bool(false)) {
            return Match::None;
        }
        if map.get("else").is_some_and(|other| other != &Value::Bool(true)) {
            return Match::None;
        }
        if map.contains_key("not") {
            return Match::None;
        }

        let mut keywords = vec![keyword("then"), keyword("if")];
        if map.contains_key("else") {
            keywords.push(keyword("else"));
        }
        Match::Many(keywords)
    }

    fn transform(&self, schema: &mut Value, _matched: &Match) {
        let Some(map) = schema.as_object_mut() else {
            return;
        };
        let Some(condition) = map.shift_remove("if") else {
            return;
        };
        map.shift_remove("then");
        map.shift_remove("else");
        map.insert("not".to_string(), condition);
    }
}

/// Every built-in rule.
pub fn builtin_rules() -> TransformSet {
    let mut rules = TransformSet::new();
    rules
        .add(DefinitionsToDefs)
        .add(ThenWithoutIf)
        .add(ElseWithoutIf)
        .add(ThenFalse);
    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{DRAFT_2020_12, DRAFT_4, DRAFT_7};
    use crate::resolver::null_resolver;
    use crate::walker::official_walker;
    use serde_json::json;

    fn apply(rule: impl TransformRule + 'static, document: &mut Value) -> Result<bool, SchemaError> {
        let mut set = TransformSet::new();
        set.add(rule);
        set.apply(document, &official_walker, &null_resolver, "")
    }

    #[test]
    fn builtin_names() {
        let rules = builtin_rules();
        assert_eq!(
            rules.names().collect::<Vec<_>>(),
            vec!["definitions_to_defs", "else_without_if", "then_false", "then_without_if"]
        );
    }

    #[test]
    fn definitions_to_defs_fixes_root_reference() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "$ref": "#/definitions/foo",
            "definitions": { "foo": { "type": "string" } }
        });
        assert!(apply(DefinitionsToDefs, &mut document).unwrap());
        assert_eq!(
            document,
            json!({
                "$schema": DRAFT_2020_12,
                "$ref": "#/$defs/foo",
                "$defs": { "foo": { "type": "string" } }
            })
        );
        let keys: Vec<_> = document.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["$schema", "$ref", "$defs"]);
    }

    #[test]
    fn definitions_to_defs_keeps_absolute_base() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com",
            "$ref": "https://example.com#/definitions/foo",
            "definitions": { "foo": { "type": "string" } }
        });
        assert!(apply(DefinitionsToDefs, &mut document).unwrap());
        assert_eq!(document["$ref"], "https://example.com#/$defs/foo");
    }

    #[test]
    fn definitions_to_defs_leaves_identifier_and_anchor_references() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com",
            "allOf": [ { "$ref": "foo" }, { "$ref": "#bar" } ],
            "definitions": {
                "foo": { "$id": "foo", "type": "string" },
                "bar": { "$anchor": "bar", "type": "integer" }
            }
        });
        assert!(apply(DefinitionsToDefs, &mut document).unwrap());
        assert_eq!(document["allOf"], json!([ { "$ref": "foo" }, { "$ref": "#bar" } ]));
        assert!(document.get("$defs").is_some());
    }

    #[test]
    fn definitions_to_defs_nested_location() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "properties": {
                "foo": { "$ref": "#/properties/definitions/definitions/helper" },
                "definitions": {
                    "definitions": { "helper": { "type": "string" } }
                }
            }
        });
        assert!(apply(DefinitionsToDefs, &mut document).unwrap());
        assert_eq!(
            document["properties"]["foo"]["$ref"],
            "#/properties/definitions/$defs/helper"
        );
        assert!(document["properties"]["definitions"].get("$defs").is_some());
    }

    #[test]
    fn definitions_to_defs_from_nested_resource() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com/here",
            "properties": {
                "foo": {
                    "$id": "nested",
                    "$ref": "here#/properties/bar/definitions/helper"
                },
                "bar": {
                    "definitions": { "helper": { "type": "string" } }
                }
            }
        });
        assert!(apply(DefinitionsToDefs, &mut document).unwrap());
        assert_eq!(
            document["properties"]["foo"]["$ref"],
            "here#/properties/bar/$defs/helper"
        );
    }

    #[test]
    fn definitions_to_defs_skips_dangling_and_migrated() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com/here",
            "allOf": [
                { "$ref": "#/definitions/outer" },
                {
                    "properties": {
                        "foo": {
                            "$id": "nested",
                            "$ref": "#/definitions/helper",
                            "definitions": { "inner": { "type": "string" } },
                            "$defs": {}
                        }
                    }
                }
            ],
            "definitions": { "outer": { "type": "string" } }
        });
        assert!(apply(DefinitionsToDefs, &mut document).unwrap());
        assert_eq!(document["allOf"][0]["$ref"], "#/$defs/outer");
        let nested = &document["allOf"][1]["properties"]["foo"];
        assert_eq!(nested["$ref"], "#/definitions/helper");
        assert!(nested.get("definitions").is_some());
        assert!(document.get("definitions").is_none());
    }

    #[test]
    fn definitions_to_defs_ignores_draft7() {
        let mut document = json!({
            "$schema": DRAFT_7,
            "definitions": { "foo": { "type": "string" } }
        });
        assert!(!apply(DefinitionsToDefs, &mut document).unwrap());
        assert!(document.get("definitions").is_some());
    }

    #[test]
    fn then_and_else_without_if() {
        let mut document = json!({
            "$schema": DRAFT_7,
            "then": { "type": "string" },
            "else": { "type": "integer" },
            "properties": { "a": { "then": true } }
        });
        let mut set = TransformSet::new();
        set.add(ThenWithoutIf).add(ElseWithoutIf);
        assert!(set
            .apply(&mut document, &official_walker, &null_resolver, "")
            .unwrap());
        assert_eq!(
            document,
            json!({ "$schema": DRAFT_7, "properties": { "a": {} } })
        );
    }

    #[test]
    fn then_without_if_ignores_draft4() {
        let mut document = json!({ "$schema": DRAFT_4, "then": { "type": "string" } });
        assert!(!apply(ThenWithoutIf, &mut document).unwrap());
    }

    #[test]
    fn then_false_becomes_not() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "type": "object",
            "if": { "required": ["foo"] },
            "then": false,
            "else": true
        });
        assert!(apply(ThenFalse, &mut document).unwrap());
        assert_eq!(
            document,
            json!({
                "$schema": DRAFT_2020_12,
                "type": "object",
                "not": { "required": ["foo"] }
            })
        );
    }

    #[test]
    fn then_false_keeps_meaningful_else() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "if": { "required": ["foo"] },
            "then": false,
            "else": { "type": "string" }
        });
        assert!(!apply(ThenFalse, &mut document).unwrap());
    }

    #[test]
    fn then_false_with_keywords_shared_with_parent() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "type": "object",
            "if": { "type": "object" },
            "then": false
        });
        assert!(apply(ThenFalse, &mut document).unwrap());
        assert_eq!(
            document,
            json!({
                "$schema": DRAFT_2020_12,
                "type": "object",
                "not": { "type": "object" }
            })
        );
    }

    #[test]
    fn then_false_keeps_existing_not() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "if": { "required": ["foo"] },
            "then": false,
            "not": { "type": "string" }
        });
        assert!(!apply(ThenFalse, &mut document).unwrap());
    }

    #[test]
    fn check_reports_builtin_matches() {
        let document = json!({
            "$schema": DRAFT_2020_12,
            "definitions": { "foo": { "then": {} } }
        });
        let mut reports = Vec::new();
        let clean = builtin_rules()
            .check(
                &document,
                &official_walker,
                &null_resolver,
                |pointer, name, _| reports.push((pointer.to_string(), name.to_string())),
                "",
            )
            .unwrap();
        assert!(!clean);
        assert_eq!(
            reports,
            vec![
                (String::new(), "definitions_to_defs".to_string()),
                ("/definitions/foo".to_string(), "then_without_if".to_string()),
            ]
        );
    }
}
