//! Schema Core
//!
//! Dialect inference, reference bundling and rule-based transformation for
//! JSON Schema documents, from draft 00 up to 2020-12.
//!
//! The building blocks are:
//!
//! - [`dialect`] and [`vocabularies`]: which dialect a schema is written in,
//!   which official base dialect it extends and which vocabularies are active.
//! - [`identity`]: reading and rewriting `$id`/`id`, with the draft 3 to 7
//!   rule that a sibling `$ref` hides the identifier.
//! - [`Frame`]: every subschema location, identifier, anchor and reference
//!   of a document.
//! - [`bundle()`]: embed every external schema a document references so the
//!   result is self-contained.
//! - [`TransformSet`]: apply named rewrite rules with reference fix-ups.
//!
//! Schemas are fetched through a [`SchemaResolver`], which any
//! `Fn(&str) -> Option<Value>` closure implements. [`official_resolver`] serves the official
//! metaschemas and can be chained behind any resolver with
//! [`SchemaResolver::or`].
//!
//! # Example
//!
//! ```
//! use schema_core::{bundle, official_walker, BundleOptions, MapResolver};
//! use serde_json::json;
//!
//! let mut resolver = MapResolver::new();
//! resolver
//!     .add(
//!         json!({
//!             "$schema": "https://json-schema.org/draft/2020-12/schema",
//!             "$id": "https://example.com/name",
//!             "type": "string"
//!         }),
//!         "",
//!         "",
//!     )
//!     .unwrap();
//!
//! let mut schema = json!({
//!     "$schema": "https://json-schema.org/draft/2020-12/schema",
//!     "properties": {
//!         "name": { "$ref": "https://example.com/name" }
//!     }
//! });
//!
//! bundle(&mut schema, &official_walker, &resolver, &BundleOptions::new()).unwrap();
//!
//! assert_eq!(schema["$defs"]["https://example.com/name"]["type"], "string");
//! ```
//!
//! # Destinations
//!
//! | Dialect | Embedded under |
//! |---------|----------------|
//! | 2019-09, 2020-12 | `$defs` |
//! | Draft 4 to Draft 7 | `definitions` |
//! | Older drafts | an explicit [`BundleOptions::destination`] |

pub mod bundle;
pub mod dialect;
mod error;
pub mod frame;
pub mod identity;
mod linter;
mod loader;
pub mod pointer;
pub mod resolver;
pub mod rules;
pub mod transformer;
mod types;
pub mod uri;
pub mod vocabularies;
pub mod walker;

pub use bundle::{bundle, bundled, default_destination, dependencies};
pub use dialect::{base_dialect, is_empty_schema, is_schema, metaschema};
pub use error::{LoadError, SchemaError};
pub use frame::{Frame, Location, LocationKind, Reference};
pub use identity::{anonymize, identify, identify_with, reidentify, reidentify_with, wrap};
pub use linter::{fix, lint, lint_file, Diagnostic, FileResult, FileStatus, LintResult, Severity};
pub use loader::{is_url, load_schema, load_schema_auto, load_schema_str, FileResolver};
pub use pointer::Pointer;
pub use resolver::{null_resolver, official_resolver, Fallback, MapResolver, SchemaResolver};
pub use rules::builtin_rules;
pub use transformer::{Match, RuleContext, TransformRule, TransformSet};
pub use types::{json_type_name, BundleOptions, LintOptions};
pub use vocabularies::{Known, Vocabularies};
pub use walker::{keyword_priority, official_walker, KeywordInfo, SchemaWalker, Strategy};

#[cfg(feature = "remote")]
pub use loader::{load_schema_url, HttpResolver};
