//! Keyword classification: how each keyword contains subschemas.
//!
//! A [`SchemaWalker`] tells the frame which keywords hold subschemas and in
//! what shape. [`official_walker`] knows every official dialect from Draft 0
//! to 2020-12, including hyper-schema keywords.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::OnceLock;

use serde::Serialize;

use crate::vocabularies::{Known, Vocabularies};

/// How a keyword's value relates to subschemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// A known keyword with no subschemas (assertions, annotations, `$id`).
    None,
    /// A keyword the walker does not recognise.
    Unknown,
    /// A single subschema.
    Value,
    /// An array of subschemas.
    Elements,
    /// An object whose member values are subschemas.
    Members,
    /// Either a single subschema or an array of them (`items` before 2020-12).
    AnyItem,
    /// An object whose members may be subschemas or not (`dependencies`).
    AnyProperty,
    /// A single subschema applied to property names.
    AnyPropertyKey,
    /// A URI reference to another schema.
    Reference,
}

impl Strategy {
    /// Whether the keyword may contain subschemas.
    pub fn is_applicator(self) -> bool {
        !matches!(self, Strategy::None | Strategy::Unknown | Strategy::Reference)
    }
}

/// What a walker knows about a keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordInfo {
    pub strategy: Strategy,
    pub vocabulary: Option<String>,
    /// Sibling keywords whose evaluation this keyword depends on.
    pub dependencies: BTreeSet<String>,
    /// Sibling keywords that must be evaluated first, without a semantic
    /// dependency.
    pub order_dependencies: BTreeSet<String>,
}

impl KeywordInfo {
    pub fn unknown() -> Self {
        Self {
            strategy: Strategy::Unknown,
            vocabulary: None,
            dependencies: BTreeSet::new(),
            order_dependencies: BTreeSet::new(),
        }
    }
}

/// Classifies keywords given the vocabularies in effect.
pub trait SchemaWalker {
    fn walk(&self, keyword: &str, vocabularies: &Vocabularies) -> KeywordInfo;
}

impl<F> SchemaWalker for F
where
    F: Fn(&str, &Vocabularies) -> KeywordInfo,
{
    fn walk(&self, keyword: &str, vocabularies: &Vocabularies) -> KeywordInfo {
        self(keyword, vocabularies)
    }
}

/// How many levels of sibling dependencies precede `keyword`.
///
/// Zero for keywords without dependencies. Cyclic dependencies stop counting
/// at the point the cycle closes.
pub fn keyword_priority<W: SchemaWalker + ?Sized>(
    keyword: &str,
    vocabularies: &Vocabularies,
    walker: &W,
) -> u64 {
    fn priority<W: SchemaWalker + ?Sized>(
        keyword: &str,
        vocabularies: &Vocabularies,
        walker: &W,
        stack: &mut HashSet<String>,
    ) -> u64 {
        if !stack.insert(keyword.to_string()) {
            return 0;
        }
        let info = walker.walk(keyword, vocabularies);
        let mut result = 0;
        for dependency in info.dependencies.iter().chain(&info.order_dependencies) {
            if stack.contains(dependency) {
                continue;
            }
            result = result.max(priority(dependency, vocabularies, walker, stack) + 1);
        }
        stack.remove(keyword);
        result
    }

    priority(keyword, vocabularies, walker, &mut HashSet::new())
}

struct Rule {
    vocabulary: Known,
    strategy: Strategy,
    dependencies: &'static [&'static str],
    /// Dependencies only apply when this vocabulary is also present.
    dependent_on: Option<Known>,
    order_dependencies: &'static [&'static str],
}

#[derive(Default)]
struct Table {
    rules: HashMap<&'static str, Vec<Rule>>,
    /// Dialects in which `$ref` overrides any other keyword, known or not.
    ref_overrides: Vec<Known>,
}

impl Table {
    fn walk(
        &mut self,
        vocabularies: &[Known],
        keyword: &'static str,
        strategy: Strategy,
        dependencies: &'static [&'static str],
    ) {
        self.walk_full(vocabularies, keyword, strategy, dependencies, None, &[]);
    }

    fn walk_maybe_dependent(
        &mut self,
        vocabulary: Known,
        keyword: &'static str,
        strategy: Strategy,
        dependent_on: Known,
        dependencies: &'static [&'static str],
    ) {
        self.walk_full(&[vocabulary], keyword, strategy, dependencies, Some(dependent_on), &[]);
    }

    fn walk_full(
        &mut self,
        vocabularies: &[Known],
        keyword: &'static str,
        strategy: Strategy,
        dependencies: &'static [&'static str],
        dependent_on: Option<Known>,
        order_dependencies: &'static [&'static str],
    ) {
        let rules = self.rules.entry(keyword).or_default();
        for vocabulary in vocabularies {
            rules.push(Rule {
                vocabulary: *vocabulary,
                strategy,
                dependencies,
                dependent_on,
                order_dependencies,
            });
        }
    }

    /// Keywords without subschemas.
    fn plain(
        &mut self,
        vocabularies: &[Known],
        keywords: &[&'static str],
        dependencies: &'static [&'static str],
    ) {
        for keyword in keywords {
            self.walk(vocabularies, *keyword, Strategy::None, dependencies);
        }
    }

    fn lookup(&self, keyword: &str, vocabularies: &Vocabularies) -> KeywordInfo {
        let matched = self.rules.get(keyword).and_then(|rules| {
            rules
                .iter()
                .find(|rule| vocabularies.contains_known(rule.vocabulary))
        });

        if let Some(rule) = matched {
            let applies = rule
                .dependent_on
                .map_or(true, |dependent| vocabularies.contains_known(dependent));
            let dependencies: &[&str] = if applies { rule.dependencies } else { &[] };
            return KeywordInfo {
                strategy: rule.strategy,
                vocabulary: Some(rule.vocabulary.uri().to_string()),
                dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
                order_dependencies: rule
                    .order_dependencies
                    .iter()
                    .map(|d| d.to_string())
                    .collect(),
            };
        }

        let mut info = KeywordInfo::unknown();
        if keyword != "$ref" && vocabularies.contains_any(&self.ref_overrides) {
            info.dependencies.insert("$ref".to_string());
        }
        info
    }
}

const IN_PLACE_2020_12: &[&str] = &[
    "allOf", "anyOf", "oneOf", "not", "if", "then", "else", "dependentSchemas", "$ref",
    "$dynamicRef",
];
const IN_PLACE_2019_09: &[&str] = &[
    "allOf", "anyOf", "oneOf", "not", "if", "then", "else", "dependentSchemas", "$ref",
    "$recursiveRef",
];

fn vocabulary_aware(table: &mut Table) {
    use Known::*;
    use Strategy::*;

    // 2020-12
    table.plain(
        &[Core2020_12],
        &["$id", "$schema", "$comment", "$anchor", "$vocabulary", "$dynamicAnchor"],
        &[],
    );
    table.walk(&[Core2020_12], "$ref", Reference, &[]);
    table.walk(&[Core2020_12], "$dynamicRef", Reference, &[]);
    table.walk(&[Core2020_12], "$defs", Members, &[]);
    table.walk(&[Core2020_12], "definitions", Members, &[]);
    table.walk(&[Applicator2020_12], "allOf", Elements, &[]);
    table.walk(&[Applicator2020_12], "anyOf", Elements, &[]);
    table.walk(&[Applicator2020_12], "oneOf", Elements, &[]);
    table.walk(&[Applicator2020_12], "if", Value, &[]);
    table.walk(&[Applicator2020_12], "then", Value, &["if"]);
    table.walk(&[Applicator2020_12], "else", Value, &["if"]);
    table.walk(&[Applicator2020_12], "not", Value, &[]);
    table.walk_maybe_dependent(Applicator2020_12, "properties", Members, Validation2020_12, &["required"]);
    table.walk(
        &[Applicator2020_12],
        "additionalProperties",
        Value,
        &["properties", "patternProperties"],
    );
    table.walk(&[Applicator2020_12], "patternProperties", Members, &[]);
    table.walk(&[Applicator2020_12], "propertyNames", AnyPropertyKey, &[]);
    table.walk(&[Applicator2020_12], "dependentSchemas", Members, &[]);
    table.walk_maybe_dependent(
        Applicator2020_12,
        "contains",
        Value,
        Validation2020_12,
        &["minContains", "maxContains"],
    );
    table.walk(&[Applicator2020_12], "items", Value, &["prefixItems"]);
    table.walk(&[Applicator2020_12], "prefixItems", Elements, &[]);
    table.walk_maybe_dependent(Validation2020_12, "type", None, Applicator2020_12, &["properties"]);
    table.plain(
        &[Validation2020_12],
        &[
            "enum", "const", "maxLength", "minLength", "pattern", "exclusiveMinimum",
            "multipleOf", "exclusiveMaximum", "dependentRequired", "minProperties",
            "maxProperties", "required", "maxItems", "minItems", "uniqueItems", "minContains",
            "maxContains",
        ],
        &[],
    );
    table.plain(&[Validation2020_12], &["maximum", "minimum"], &["type"]);
    table.plain(
        &[MetaData2020_12],
        &["title", "description", "writeOnly", "readOnly", "examples", "default", "deprecated"],
        &[],
    );
    table.plain(&[FormatAnnotation2020_12, FormatAssertion2020_12], &["format"], &[]);
    table.walk_full(
        &[Unevaluated2020_12],
        "unevaluatedProperties",
        Value,
        &["properties", "patternProperties", "additionalProperties"],
        Some(Applicator2020_12),
        IN_PLACE_2020_12,
    );
    table.walk_full(
        &[Unevaluated2020_12],
        "unevaluatedItems",
        Value,
        &["prefixItems", "items", "contains"],
        Some(Applicator2020_12),
        IN_PLACE_2020_12,
    );
    table.walk(&[Content2020_12], "contentSchema", Value, &[]);
    table.plain(&[Content2020_12], &["contentMediaType", "contentEncoding"], &[]);

    // 2019-09
    table.plain(
        &[Core2019_09],
        &["$id", "$schema", "$comment", "$anchor", "$vocabulary", "$recursiveAnchor"],
        &[],
    );
    table.walk(&[Core2019_09], "$ref", Reference, &[]);
    table.walk(&[Core2019_09], "$recursiveRef", Reference, &[]);
    table.walk(&[Core2019_09], "$defs", Members, &[]);
    table.walk(&[Core2019_09], "definitions", Members, &[]);
    table.walk(&[Applicator2019_09], "allOf", Elements, &[]);
    table.walk(&[Applicator2019_09], "anyOf", Elements, &[]);
    table.walk(&[Applicator2019_09], "oneOf", Elements, &[]);
    table.walk(&[Applicator2019_09], "if", Value, &[]);
    table.walk(&[Applicator2019_09], "then", Value, &["if"]);
    table.walk(&[Applicator2019_09], "else", Value, &["if"]);
    table.walk(&[Applicator2019_09], "not", Value, &[]);
    table.walk_maybe_dependent(Applicator2019_09, "properties", Members, Validation2019_09, &["required"]);
    table.walk(&[Applicator2019_09], "patternProperties", Members, &[]);
    table.walk(
        &[Applicator2019_09],
        "additionalProperties",
        Value,
        &["properties", "patternProperties"],
    );
    table.walk(&[Applicator2019_09], "propertyNames", AnyPropertyKey, &[]);
    table.walk(&[Applicator2019_09], "dependentSchemas", Members, &[]);
    table.walk_full(
        &[Applicator2019_09],
        "unevaluatedProperties",
        Value,
        &["properties", "patternProperties", "additionalProperties"],
        Option::None,
        IN_PLACE_2019_09,
    );
    table.walk_full(
        &[Applicator2019_09],
        "unevaluatedItems",
        Value,
        &["items", "additionalItems"],
        Option::None,
        IN_PLACE_2019_09,
    );
    table.walk(&[Applicator2019_09], "items", AnyItem, &[]);
    table.walk_maybe_dependent(
        Applicator2019_09,
        "contains",
        Value,
        Validation2019_09,
        &["minContains", "maxContains"],
    );
    table.walk(&[Applicator2019_09], "additionalItems", Value, &["items"]);
    table.walk_maybe_dependent(Validation2019_09, "type", None, Applicator2019_09, &["properties"]);
    table.plain(
        &[Validation2019_09],
        &[
            "enum", "const", "maxLength", "minLength", "pattern", "exclusiveMaximum",
            "multipleOf", "minimum", "exclusiveMinimum", "maximum", "required",
            "minProperties", "maxProperties", "dependentRequired", "minItems", "maxItems",
            "maxContains", "minContains", "uniqueItems",
        ],
        &[],
    );
    table.plain(
        &[MetaData2019_09],
        &["title", "description", "writeOnly", "readOnly", "examples", "default", "deprecated"],
        &[],
    );
    table.plain(&[Format2019_09], &["format"], &[]);
    table.walk(&[Content2019_09], "contentSchema", Value, &[]);
    table.plain(&[Content2019_09], &["contentMediaType", "contentEncoding"], &[]);
    table.plain(
        &[HyperSchema2019_09],
        &[
            "base", "anchor", "anchorPointer", "href", "rel", "submissionMediaType",
            "targetHints", "targetMediaType", "templatePointers", "templateRequired",
        ],
        &[],
    );
    table.walk(&[HyperSchema2019_09], "links", Elements, &[]);
    for keyword in ["hrefSchema", "targetSchema", "headerSchema", "submissionSchema"] {
        table.walk(&[HyperSchema2019_09], keyword, Value, &[]);
    }
}

fn drafts_6_and_7(table: &mut Table) {
    use Known::*;
    use Strategy::*;

    for (draft, hyper) in [(Draft7, Draft7Hyper), (Draft6, Draft6Hyper)] {
        let both = &[draft, hyper];
        table.ref_overrides.extend([draft, hyper]);
        table.walk(both, "$ref", Reference, &[]);
        table.plain(
            both,
            &[
                "$schema", "$id", "$comment", "enum", "const", "multipleOf", "maximum",
                "exclusiveMaximum", "minimum", "exclusiveMinimum", "maxLength", "minLength",
                "pattern", "maxItems", "minItems", "uniqueItems", "maxProperties",
                "minProperties", "required", "format", "contentEncoding", "contentMediaType",
                "title", "description", "default", "readOnly", "writeOnly", "examples",
            ],
            &["$ref"],
        );
        table.walk(both, "type", None, &["properties"]);
        table.walk(both, "items", AnyItem, &["$ref"]);
        table.walk(both, "additionalItems", Value, &["items"]);
        table.walk(both, "contains", Value, &["$ref"]);
        table.walk(both, "properties", Members, &["$ref", "required"]);
        table.walk(both, "patternProperties", Members, &["$ref"]);
        table.walk(both, "additionalProperties", Value, &["properties", "patternProperties"]);
        table.walk(both, "dependencies", AnyProperty, &["$ref"]);
        table.walk(both, "propertyNames", AnyPropertyKey, &["$ref"]);
        table.walk(both, "allOf", Elements, &["$ref"]);
        table.walk(both, "anyOf", Elements, &["$ref"]);
        table.walk(both, "oneOf", Elements, &["$ref"]);
        table.walk(both, "not", Value, &["$ref"]);
        table.walk(both, "definitions", Members, &["$ref"]);
        table.plain(&[hyper], &["base"], &["$ref"]);
        table.walk(&[hyper], "links", Elements, &["$ref"]);
        table.walk(&[hyper], "hrefSchema", Value, &[]);
        table.walk(&[hyper], "targetSchema", Value, &[]);
        table.walk(&[hyper], "submissionSchema", Value, &[]);
        table.plain(&[hyper], &["href", "rel"], &[]);
    }

    table.walk(&[Draft7, Draft7Hyper], "if", Value, &["$ref"]);
    table.walk(&[Draft7, Draft7Hyper], "then", Value, &["if"]);
    table.walk(&[Draft7, Draft7Hyper], "else", Value, &["if"]);
    table.walk(&[Draft7Hyper], "headerSchema", Value, &[]);
    table.plain(
        &[Draft7Hyper],
        &[
            "anchor", "anchorPointer", "submissionMediaType", "targetHints", "targetMediaType",
            "templatePointers", "templateRequired",
        ],
        &[],
    );
    table.plain(&[Draft6Hyper], &["media"], &["$ref"]);
    table.plain(&[Draft6Hyper], &["submissionEncType", "mediaType"], &[]);
}

fn drafts_3_and_4(table: &mut Table) {
    use Known::*;
    use Strategy::*;

    let draft4 = &[Draft4, Draft4Hyper];
    table.ref_overrides.extend([Draft4, Draft4Hyper, Draft3]);
    table.walk(draft4, "$ref", Reference, &[]);
    table.plain(
        draft4,
        &[
            "$schema", "id", "enum", "multipleOf", "maximum", "exclusiveMaximum", "minimum",
            "exclusiveMinimum", "maxLength", "minLength", "pattern", "maxItems", "minItems",
            "uniqueItems", "maxProperties", "minProperties", "required", "format", "title",
            "description", "default",
        ],
        &["$ref"],
    );
    table.walk(draft4, "type", None, &["properties"]);
    table.walk(draft4, "items", AnyItem, &["$ref"]);
    table.walk(draft4, "additionalItems", Value, &["items"]);
    table.walk(draft4, "properties", Members, &["$ref", "required"]);
    table.walk(draft4, "patternProperties", Members, &["$ref"]);
    table.walk(draft4, "additionalProperties", Value, &["properties", "patternProperties"]);
    table.walk(draft4, "dependencies", AnyProperty, &["$ref"]);
    table.walk(draft4, "allOf", Elements, &["$ref"]);
    table.walk(draft4, "anyOf", Elements, &["$ref"]);
    table.walk(draft4, "oneOf", Elements, &["$ref"]);
    table.walk(draft4, "not", Value, &["$ref"]);
    table.walk(draft4, "definitions", Members, &["$ref"]);
    table.plain(&[Draft4Hyper], &["fragmentResolution", "media", "pathStart"], &["$ref"]);
    table.walk(&[Draft4Hyper], "links", Elements, &["$ref"]);
    table.plain(&[Draft4Hyper], &["encType", "href", "mediaType", "method", "rel"], &[]);
    table.walk(&[Draft4Hyper], "schema", Value, &[]);
    table.walk(&[Draft4Hyper], "targetSchema", Value, &[]);

    let draft3 = &[Draft3, Draft3Hyper];
    table.walk(draft3, "$ref", Reference, &[]);
    table.plain(
        draft3,
        &[
            "id", "$schema", "minItems", "maxItems", "uniqueItems", "required", "enum",
            "pattern", "minLength", "maxLength", "divisibleBy", "minimum", "exclusiveMinimum",
            "maximum", "exclusiveMaximum", "format", "description", "title", "default",
        ],
        &["$ref"],
    );
    table.walk(draft3, "extends", AnyItem, &["$ref"]);
    table.walk(draft3, "type", Elements, &["$ref"]);
    table.walk(draft3, "disallow", Elements, &["$ref"]);
    table.walk(draft3, "properties", Members, &["$ref"]);
    table.walk(draft3, "patternProperties", Members, &["$ref"]);
    table.walk(draft3, "additionalProperties", Value, &["properties", "patternProperties"]);
    table.walk(draft3, "items", AnyItem, &["$ref"]);
    table.walk(draft3, "additionalItems", Value, &["items"]);
    table.walk(draft3, "dependencies", AnyProperty, &["$ref"]);
    table.plain(
        &[Draft3Hyper],
        &["fragmentResolution", "root", "readonly", "contentEncoding", "pathStart", "mediaType"],
        &["$ref"],
    );
    table.walk(&[Draft3Hyper], "links", Elements, &["$ref"]);
    table.plain(&[Draft3Hyper], &["href", "rel", "method", "enctype"], &[]);
    table.walk(&[Draft3Hyper], "targetSchema", Value, &[]);
}

fn drafts_0_to_2(table: &mut Table) {
    use Known::*;
    use Strategy::*;

    for (draft, hyper) in [(Draft2, Draft2Hyper), (Draft1, Draft1Hyper), (Draft0, Draft0Hyper)] {
        let both = &[draft, hyper];
        table.plain(
            both,
            &[
                "$schema", "id", "enum", "maximum", "minimum", "maximumCanEqual",
                "minimumCanEqual", "maxLength", "minLength", "pattern", "maxItems", "minItems",
                "format", "title", "description", "default", "disallow", "contentEncoding",
            ],
            &[],
        );
        table.walk(both, "$ref", Reference, &[]);
        table.walk(both, "items", AnyItem, &[]);
        table.walk(both, "properties", Members, &[]);
        table.walk(both, "additionalProperties", Value, &["properties"]);
        table.walk(both, "type", Elements, &[]);
        table.walk(both, "requires", Value, &[]);
        table.walk(both, "extends", AnyItem, &[]);
        table.plain(
            &[hyper],
            &[
                "fragmentResolution", "root", "readonly", "pathStart", "mediaType", "href",
                "rel", "method", "enctype",
            ],
            &[],
        );
        table.walk(&[hyper], "alternate", Elements, &[]);
        table.walk(&[hyper], "links", Elements, &[]);
    }

    table.plain(&[Draft2, Draft2Hyper], &["uniqueItems", "divisibleBy"], &[]);
    table.walk(&[Draft2Hyper], "targetSchema", Value, &[]);
    for both in [&[Draft1, Draft1Hyper], &[Draft0, Draft0Hyper]] {
        table.plain(both, &["optional", "maxDecimal"], &[]);
    }
}

fn official_table() -> &'static Table {
    static TABLE: OnceLock<Table> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = Table::default();
        vocabulary_aware(&mut table);
        drafts_6_and_7(&mut table);
        drafts_3_and_4(&mut table);
        drafts_0_to_2(&mut table);
        table
    })
}

/// The walker for every official dialect from Draft 0 to 2020-12.
pub fn official_walker(keyword: &str, vocabularies: &Vocabularies) -> KeywordInfo {
    official_table().lookup(keyword, vocabularies)
}
