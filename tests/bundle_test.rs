//! Integration tests for reference bundling.

use serde_json::{json, Value};
use schema_core::{bundle, bundled, official_walker, BundleOptions, Pointer, SchemaError};

const DRAFT_2020_12: &str = "https://json-schema.org/draft/2020-12/schema";

fn test_resolver(identifier: &str) -> Option<Value> {
    let schema = match identifier {
        "https://example.com/foo/bar" => json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com/foo/bar",
            "$anchor": "baz"
        }),
        "https://schemas.example.org/test-1" => json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://schemas.example.org/test-1",
            "type": "string"
        }),
        "https://schemas.example.org/test-2" => json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://schemas.example.org/test-2",
            "$ref": "test-3"
        }),
        "https://schemas.example.org/test-3" => json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://schemas.example.org/test-3",
            "$ref": "test-1"
        }),
        "https://schemas.example.org/test-4" => json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://schemas.example.org/test-4",
            "type": "boolean"
        }),
        "https://schemas.example.org/recursive" => json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://schemas.example.org/recursive",
            "properties": {
                "foo": { "$ref": "#" }
            }
        }),
        "https://schemas.example.org/recursive-empty-fragment" => json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://schemas.example.org/recursive-empty-fragment#",
            "properties": {
                "foo": { "$ref": "#" }
            }
        }),
        "https://schemas.example.org/anonymous" => json!({
            "type": "integer"
        }),
        "https://example.com/nested/ref-string.json" => json!({
            "$schema": DRAFT_2020_12,
            "$ref": "string.json"
        }),
        "https://example.com/nested/string.json" => json!({
            "$schema": DRAFT_2020_12,
            "type": "string"
        }),
        "https://example.com/meta/1.json" => json!({
            "$schema": "https://example.com/meta/2.json",
            "$id": "https://example.com/meta/1.json",
            "$vocabulary": { "https://json-schema.org/draft/2020-12/vocab/core": true }
        }),
        "https://example.com/meta/2.json" => json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com/meta/2.json",
            "$vocabulary": { "https://json-schema.org/draft/2020-12/vocab/core": true }
        }),
        "https://cdn.example.com/schemas/foo" => json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com/foo",
            "$defs": {
                "bar": { "type": "string" }
            }
        }),
        "https://www.example.com/schemas/bundled" => json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com/schemas/parent",
            "$ref": "./child",
            "$defs": {
                "https://example.com/schemas/child": {
                    "$id": "https://example.com/schemas/child",
                    "type": "string"
                }
            }
        }),
        "https://example.com/dedup-a" | "https://example.com/dedup-b" => json!({
            "$schema": DRAFT_2020_12,
            "$id": identifier,
            "$ref": "dedup-common",
            "$defs": {
                "https://example.com/dedup-common": {
                    "$schema": DRAFT_2020_12,
                    "$id": "https://example.com/dedup-common",
                    "type": "string"
                }
            }
        }),
        "https://example.com/dedup-conflict-a" => json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com/dedup-conflict-a",
            "$ref": "dedup-conflict-common",
            "$defs": {
                "https://example.com/dedup-conflict-common": {
                    "$schema": DRAFT_2020_12,
                    "$id": "https://example.com/dedup-conflict-common",
                    "type": "string"
                }
            }
        }),
        "https://example.com/dedup-conflict-b" => json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com/dedup-conflict-b",
            "$ref": "dedup-conflict-common",
            "$defs": {
                "https://example.com/dedup-conflict-common": {
                    "$schema": DRAFT_2020_12,
                    "$id": "https://example.com/dedup-conflict-common",
                    "type": "integer"
                }
            }
        }),
        "https://example.com/shared-direct" => json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com/shared-direct",
            "type": "string"
        }),
        "https://example.com/prebundled-with-shared" => json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com/prebundled-with-shared",
            "$ref": "shared-direct",
            "$defs": {
                "https://example.com/shared-direct": {
                    "$schema": DRAFT_2020_12,
                    "$id": "https://example.com/shared-direct",
                    "type": "string"
                }
            }
        }),
        "https://example.com/cross-dialect-host" => json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com/cross-dialect-host",
            "$ref": "cross-dialect-nested",
            "$defs": {
                "https://example.com/cross-dialect-nested": {
                    "$schema": "http://json-schema.org/draft-04/schema#",
                    "id": "https://example.com/cross-dialect-nested",
                    "type": "string"
                }
            }
        }),
        "https://example.com/host-with-relative-nested" => json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com/host-with-relative-nested",
            "$ref": "relative-nested",
            "$defs": {
                "relative-nested": {
                    "$id": "relative-nested",
                    "type": "string"
                }
            }
        }),
        // Only available pre-bundled inside elevated-a.
        "https://example.com/elevated-a" => json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com/elevated-a",
            "$ref": "elevated-common",
            "$defs": {
                "https://example.com/elevated-common": {
                    "$schema": DRAFT_2020_12,
                    "$id": "https://example.com/elevated-common",
                    "type": "integer"
                }
            }
        }),
        "https://example.com/elevated-b" => json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com/elevated-b",
            "$ref": "elevated-common"
        }),
        _ => return None,
    };
    Some(schema)
}

fn run(document: &mut Value, options: &BundleOptions) -> Result<(), SchemaError> {
    bundle(document, &official_walker, &test_resolver, options)
}

fn recursive_remote() -> Value {
    json!({
        "$schema": DRAFT_2020_12,
        "$id": "https://schemas.example.org/recursive",
        "properties": {
            "foo": { "$ref": "#" }
        }
    })
}

// === Basic Embedding ===

mod embedding {
    use super::*;

    #[test]
    fn no_references_is_unchanged() {
        let mut document = json!({ "$schema": DRAFT_2020_12 });
        run(&mut document, &BundleOptions::new()).unwrap();
        assert_eq!(document, json!({ "$schema": DRAFT_2020_12 }));
    }

    #[test]
    fn bundled_leaves_input_untouched() {
        let document = json!({
            "$schema": DRAFT_2020_12,
            "$ref": "https://schemas.example.org/test-1"
        });
        let result =
            bundled(&document, &official_walker, &test_resolver, &BundleOptions::new()).unwrap();

        assert!(document.get("$defs").is_none());
        assert_eq!(
            result["$defs"]["https://schemas.example.org/test-1"]["type"],
            "string"
        );
    }

    #[test]
    fn every_reference_kind_is_followed() {
        let mut document = json!({
            "$id": "https://example.com",
            "$schema": DRAFT_2020_12,
            "properties": {
                "foo": { "$ref": "https://schemas.example.org/test-1" },
                "bar": { "$id": "https://schemas.example.org", "$ref": "test-2" },
                "baz": { "$ref": "https://example.com/foo/bar#baz" },
                "qux": { "$ref": "https://example.com/foo/bar" },
                "dyn": { "$dynamicRef": "https://schemas.example.org/test-4" }
            }
        });
        run(&mut document, &BundleOptions::new()).unwrap();

        let expected = json!({
            "$id": "https://example.com",
            "$schema": DRAFT_2020_12,
            "properties": {
                "foo": { "$ref": "https://schemas.example.org/test-1" },
                "bar": { "$id": "https://schemas.example.org", "$ref": "test-2" },
                "baz": { "$ref": "https://example.com/foo/bar#baz" },
                "qux": { "$ref": "https://example.com/foo/bar" },
                "dyn": { "$dynamicRef": "https://schemas.example.org/test-4" }
            },
            "$defs": {
                "https://schemas.example.org/test-1": {
                    "$schema": DRAFT_2020_12,
                    "$id": "https://schemas.example.org/test-1",
                    "type": "string"
                },
                "https://schemas.example.org/test-2": {
                    "$schema": DRAFT_2020_12,
                    "$id": "https://schemas.example.org/test-2",
                    "$ref": "test-3"
                },
                "https://schemas.example.org/test-3": {
                    "$schema": DRAFT_2020_12,
                    "$id": "https://schemas.example.org/test-3",
                    "$ref": "test-1"
                },
                "https://schemas.example.org/test-4": {
                    "$schema": DRAFT_2020_12,
                    "$id": "https://schemas.example.org/test-4",
                    "type": "boolean"
                },
                "https://example.com/foo/bar": {
                    "$id": "https://example.com/foo/bar",
                    "$schema": DRAFT_2020_12,
                    "$anchor": "baz"
                }
            }
        });
        assert_eq!(document, expected);
    }

    #[test]
    fn bundling_twice_changes_nothing() {
        let mut document = json!({
            "$id": "https://example.com",
            "$schema": DRAFT_2020_12,
            "properties": {
                "test": { "$ref": "https://schemas.example.org/test-2" }
            }
        });
        run(&mut document, &BundleOptions::new()).unwrap();
        let once = document.clone();
        run(&mut document, &BundleOptions::new()).unwrap();
        run(&mut document, &BundleOptions::new()).unwrap();

        assert_eq!(document, once);
        assert_eq!(document["$defs"].as_object().unwrap().len(), 3);
    }

    #[test]
    fn already_embedded_resource_is_reused() {
        let mut document = json!({
            "$id": "https://example.com",
            "$schema": DRAFT_2020_12,
            "properties": {
                "test": { "$ref": "https://schemas.example.org/test-2" }
            },
            "$defs": {
                "already-embedded": {
                    "$schema": DRAFT_2020_12,
                    "$id": "https://schemas.example.org/test-1",
                    "type": "string"
                }
            }
        });
        run(&mut document, &BundleOptions::new()).unwrap();

        let defs = document["$defs"].as_object().unwrap();
        assert_eq!(defs.len(), 3);
        assert!(defs.contains_key("already-embedded"));
        assert!(defs.contains_key("https://schemas.example.org/test-2"));
        assert!(defs.contains_key("https://schemas.example.org/test-3"));
        assert!(!defs.contains_key("https://schemas.example.org/test-1"));
    }

    #[test]
    fn taken_keys_get_a_suffix() {
        let mut document = json!({
            "$id": "https://example.com",
            "$schema": DRAFT_2020_12,
            "properties": {
                "test": { "$ref": "https://schemas.example.org/test-1" },
                "extra": { "$ref": "https://schemas.example.org/test-4" }
            },
            "$defs": {
                "https://schemas.example.org/test-1": { "foo": 1 },
                "https://schemas.example.org/test-4": { "foo": 1 },
                "https://schemas.example.org/test-4/x": { "foo": 1 },
                "https://schemas.example.org/test-4/x/x": { "foo": 1 }
            }
        });
        run(&mut document, &BundleOptions::new()).unwrap();

        let defs = &document["$defs"];
        assert_eq!(defs["https://schemas.example.org/test-1"], json!({ "foo": 1 }));
        assert_eq!(defs["https://schemas.example.org/test-1/x"]["type"], "string");
        assert_eq!(defs["https://schemas.example.org/test-4/x/x"], json!({ "foo": 1 }));
        assert_eq!(
            defs["https://schemas.example.org/test-4/x/x/x"]["type"],
            "boolean"
        );
    }

    #[test]
    fn recursive_remote_is_embedded_once() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "$ref": "https://schemas.example.org/recursive"
        });
        run(&mut document, &BundleOptions::new()).unwrap();

        assert_eq!(
            document,
            json!({
                "$schema": DRAFT_2020_12,
                "$ref": "https://schemas.example.org/recursive",
                "$defs": {
                    "https://schemas.example.org/recursive": recursive_remote()
                }
            })
        );
    }

    #[test]
    fn empty_fragment_is_canonicalized_in_the_key() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "$ref": "https://schemas.example.org/recursive-empty-fragment#"
        });
        run(&mut document, &BundleOptions::new()).unwrap();

        let embedded = &document["$defs"]["https://schemas.example.org/recursive-empty-fragment"];
        assert_eq!(
            embedded["$id"],
            "https://schemas.example.org/recursive-empty-fragment#"
        );
        assert_eq!(
            document["$ref"],
            "https://schemas.example.org/recursive-empty-fragment#"
        );
    }

    #[test]
    fn default_dialect_applies_to_remotes() {
        let mut document = json!({ "$ref": "https://schemas.example.org/anonymous" });
        run(&mut document, &BundleOptions::new().default_dialect(DRAFT_2020_12)).unwrap();

        assert_eq!(
            document,
            json!({
                "$ref": "https://schemas.example.org/anonymous",
                "$defs": {
                    "https://schemas.example.org/anonymous": {
                        "$id": "https://schemas.example.org/anonymous",
                        "type": "integer"
                    }
                }
            })
        );
    }

    #[test]
    fn anonymous_remotes_resolve_relative_to_their_location() {
        let mut document = json!({
            "$id": "https://example.com/test",
            "$schema": DRAFT_2020_12,
            "$ref": "nested/ref-string.json"
        });
        run(&mut document, &BundleOptions::new()).unwrap();

        assert_eq!(
            document["$defs"],
            json!({
                "https://example.com/nested/ref-string.json": {
                    "$id": "https://example.com/nested/ref-string.json",
                    "$schema": DRAFT_2020_12,
                    "$ref": "string.json"
                },
                "https://example.com/nested/string.json": {
                    "$id": "https://example.com/nested/string.json",
                    "$schema": DRAFT_2020_12,
                    "type": "string"
                }
            })
        );
    }

    #[test]
    fn relative_base_with_local_anchor_is_unchanged() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "$id": "common",
            "allOf": [ { "$ref": "#reference" } ],
            "definitions": {
                "reference": { "$anchor": "reference" }
            }
        });
        let expected = document.clone();
        run(&mut document, &BundleOptions::new()).unwrap();
        assert_eq!(document, expected);
    }

    #[test]
    fn custom_metaschemas_are_embedded() {
        let mut document = json!({
            "$schema": "https://example.com/meta/1.json",
            "type": "string"
        });
        run(&mut document, &BundleOptions::new()).unwrap();

        let defs = document["$defs"].as_object().unwrap();
        assert_eq!(defs.len(), 2);
        assert_eq!(
            defs["https://example.com/meta/1.json"]["$schema"],
            "https://example.com/meta/2.json"
        );
        assert_eq!(defs["https://example.com/meta/2.json"]["$schema"], DRAFT_2020_12);
    }
}

// === Destinations ===

mod destinations {
    use super::*;

    #[test]
    fn explicit_definitions() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "$ref": "https://schemas.example.org/recursive"
        });
        let options = BundleOptions::new().destination(Pointer::from_tokens(["definitions"]));
        run(&mut document, &options).unwrap();

        assert_eq!(
            document["definitions"]["https://schemas.example.org/recursive"],
            recursive_remote()
        );
        assert!(document.get("$defs").is_none());
    }

    #[test]
    fn nested_path_is_created() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "$ref": "https://schemas.example.org/recursive"
        });
        let options = BundleOptions::new()
            .destination(Pointer::from_tokens(["x-definitions", "foo", "bar"]));
        run(&mut document, &options).unwrap();

        assert_eq!(
            document["x-definitions"]["foo"]["bar"]["https://schemas.example.org/recursive"],
            recursive_remote()
        );
    }

    #[test]
    fn nested_path_partially_exists() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "$ref": "https://schemas.example.org/recursive",
            "x-definitions": { "foo": {} }
        });
        let options = BundleOptions::new()
            .destination(Pointer::from_tokens(["x-definitions", "foo", "bar"]));
        run(&mut document, &options).unwrap();

        assert_eq!(
            document["x-definitions"]["foo"]["bar"]["https://schemas.example.org/recursive"],
            recursive_remote()
        );
    }

    #[test]
    fn nested_path_through_array() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "$ref": "https://schemas.example.org/recursive",
            "x-definitions": [ { "foo": {} } ]
        });
        let options = BundleOptions::new()
            .destination(Pointer::from_tokens(["x-definitions", "0", "foo", "bar"]));
        run(&mut document, &options).unwrap();

        assert_eq!(
            document["x-definitions"][0]["foo"]["bar"]["https://schemas.example.org/recursive"],
            recursive_remote()
        );
    }

    #[test]
    fn non_object_destination_fails() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "$ref": "https://schemas.example.org/recursive",
            "x-definitions": { "foo": { "bar": [] } }
        });
        let options = BundleOptions::new()
            .destination(Pointer::from_tokens(["x-definitions", "foo", "bar"]));
        let error = run(&mut document, &options).unwrap_err();
        assert!(matches!(error, SchemaError::Invalid { .. }));
    }
}

// === Errors ===

mod errors {
    use super::*;

    #[test]
    fn unknown_schema() {
        let mut document = json!({
            "$id": "https://example.com",
            "$schema": DRAFT_2020_12,
            "properties": {
                "foo": { "$ref": "https://schemas.example.org/xxx" }
            }
        });
        let error = run(&mut document, &BundleOptions::new()).unwrap_err();
        assert!(matches!(
            error,
            SchemaError::Resolution { ref uri, .. } if uri == "https://schemas.example.org/xxx"
        ));
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn failure_leaves_document_untouched() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "allOf": [
                { "$ref": "https://schemas.example.org/test-1" },
                { "$ref": "https://example.com/elevated-a" },
                { "$ref": "https://schemas.example.org/xxx" }
            ]
        });
        let expected = document.clone();
        let options = BundleOptions::new().default_id("https://example.com/failing-entry");

        let error = run(&mut document, &options).unwrap_err();
        assert!(matches!(error, SchemaError::Resolution { .. }));
        assert_eq!(document, expected);
    }

    #[test]
    fn unknown_anchor() {
        let mut document = json!({
            "$id": "https://example.com",
            "$schema": DRAFT_2020_12,
            "properties": {
                "foo": { "$ref": "https://example.com/foo/bar#xxxxxxxx" }
            }
        });
        let error = run(&mut document, &BundleOptions::new()).unwrap_err();
        assert!(matches!(error, SchemaError::Reference { .. }));
    }

    #[test]
    fn conflicting_prebundled_resources() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com/dedup-conflict-entry",
            "allOf": [
                { "$ref": "dedup-conflict-a" },
                { "$ref": "dedup-conflict-b" }
            ]
        });
        let error = run(&mut document, &BundleOptions::new()).unwrap_err();
        assert!(matches!(
            error,
            SchemaError::Conflict { ref identifier }
                if identifier == "https://example.com/dedup-conflict-common"
        ));
    }
}

// === Remotes Declaring Another Identifier ===

mod foreign_identifiers {
    use super::*;

    fn entry_options() -> BundleOptions {
        BundleOptions::new().default_id("https://www.example.com/entry")
    }

    #[test]
    fn reference_is_rewritten_to_the_declared_identifier() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "title": "Entry",
            "$ref": "schemas/bundled"
        });
        run(&mut document, &entry_options()).unwrap();

        assert_eq!(
            document,
            json!({
                "$schema": DRAFT_2020_12,
                "$id": "https://www.example.com/entry",
                "title": "Entry",
                "$ref": "https://example.com/schemas/parent",
                "$defs": {
                    "https://example.com/schemas/child": {
                        "$id": "https://example.com/schemas/child",
                        "type": "string"
                    },
                    "https://example.com/schemas/parent": {
                        "$schema": DRAFT_2020_12,
                        "$id": "https://example.com/schemas/parent",
                        "$ref": "./child"
                    }
                }
            })
        );
    }

    #[test]
    fn duplicate_references_are_all_rewritten() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "properties": {
                "first": { "$ref": "https://cdn.example.com/schemas/foo" },
                "second": { "$ref": "https://cdn.example.com/schemas/foo" }
            }
        });
        run(&mut document, &entry_options()).unwrap();

        assert_eq!(
            document,
            json!({
                "$schema": DRAFT_2020_12,
                "$id": "https://www.example.com/entry",
                "properties": {
                    "first": { "$ref": "https://example.com/foo" },
                    "second": { "$ref": "https://example.com/foo" }
                },
                "$defs": {
                    "https://example.com/foo": {
                        "$schema": DRAFT_2020_12,
                        "$id": "https://example.com/foo",
                        "$defs": {
                            "bar": { "type": "string" }
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn fragment_is_kept() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "properties": {
                "foo": { "$ref": "https://cdn.example.com/schemas/foo#/$defs/bar" }
            }
        });
        run(&mut document, &entry_options()).unwrap();

        assert_eq!(
            document["properties"]["foo"]["$ref"],
            "https://example.com/foo#/$defs/bar"
        );
        assert_eq!(
            document["$defs"]["https://example.com/foo"]["$id"],
            "https://example.com/foo"
        );
    }
}

// === Pre-bundled Remotes ===

mod elevation {
    use super::*;

    #[test]
    fn shared_entries_are_deduplicated() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com/dedup-entry",
            "allOf": [
                { "$ref": "dedup-a" },
                { "$ref": "dedup-b" }
            ]
        });
        run(&mut document, &BundleOptions::new()).unwrap();

        assert_eq!(
            document["$defs"],
            json!({
                "https://example.com/dedup-a": {
                    "$schema": DRAFT_2020_12,
                    "$id": "https://example.com/dedup-a",
                    "$ref": "dedup-common"
                },
                "https://example.com/dedup-b": {
                    "$schema": DRAFT_2020_12,
                    "$id": "https://example.com/dedup-b",
                    "$ref": "dedup-common"
                },
                "https://example.com/dedup-common": {
                    "$schema": DRAFT_2020_12,
                    "$id": "https://example.com/dedup-common",
                    "type": "string"
                }
            })
        );
    }

    #[test]
    fn direct_and_embedded_reference_no_duplicate() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com/direct-and-embedded-entry",
            "allOf": [
                { "$ref": "prebundled-with-shared" },
                { "$ref": "shared-direct" }
            ]
        });
        run(&mut document, &BundleOptions::new()).unwrap();

        assert_eq!(
            document["$defs"],
            json!({
                "https://example.com/prebundled-with-shared": {
                    "$schema": DRAFT_2020_12,
                    "$id": "https://example.com/prebundled-with-shared",
                    "$ref": "shared-direct"
                },
                "https://example.com/shared-direct": {
                    "$schema": DRAFT_2020_12,
                    "$id": "https://example.com/shared-direct",
                    "type": "string"
                }
            })
        );
    }

    #[test]
    fn elevated_entries_satisfy_later_references() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com/elevated-entry",
            "allOf": [
                { "$ref": "elevated-a" },
                { "$ref": "elevated-b" }
            ]
        });
        run(&mut document, &BundleOptions::new()).unwrap();

        assert_eq!(
            document["$defs"],
            json!({
                "https://example.com/elevated-a": {
                    "$schema": DRAFT_2020_12,
                    "$id": "https://example.com/elevated-a",
                    "$ref": "elevated-common"
                },
                "https://example.com/elevated-common": {
                    "$schema": DRAFT_2020_12,
                    "$id": "https://example.com/elevated-common",
                    "type": "integer"
                },
                "https://example.com/elevated-b": {
                    "$schema": DRAFT_2020_12,
                    "$id": "https://example.com/elevated-b",
                    "$ref": "elevated-common"
                }
            })
        );
    }

    #[test]
    fn elevated_entries_must_hold_the_fragment() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com/elevated-entry",
            "allOf": [
                { "$ref": "elevated-a" },
                { "$ref": "elevated-common#/properties/missing" }
            ]
        });
        let error = run(&mut document, &BundleOptions::new()).unwrap_err();
        assert!(matches!(error, SchemaError::Reference { .. }));
    }

    #[test]
    fn nested_entries_keep_their_dialect() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com/cross-dialect-entry",
            "$ref": "cross-dialect-host"
        });
        run(&mut document, &BundleOptions::new()).unwrap();

        assert_eq!(
            document["$defs"],
            json!({
                "https://example.com/cross-dialect-host": {
                    "$schema": DRAFT_2020_12,
                    "$id": "https://example.com/cross-dialect-host",
                    "$ref": "cross-dialect-nested"
                },
                "https://example.com/cross-dialect-nested": {
                    "$schema": "http://json-schema.org/draft-04/schema#",
                    "id": "https://example.com/cross-dialect-nested",
                    "type": "string"
                }
            })
        );
    }

    #[test]
    fn relative_identifiers_stay_nested() {
        let mut document = json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com/relative-entry",
            "$ref": "host-with-relative-nested"
        });
        run(&mut document, &BundleOptions::new()).unwrap();

        assert_eq!(
            document["$defs"],
            json!({
                "https://example.com/host-with-relative-nested": {
                    "$schema": DRAFT_2020_12,
                    "$id": "https://example.com/host-with-relative-nested",
                    "$ref": "relative-nested",
                    "$defs": {
                        "relative-nested": {
                            "$id": "relative-nested",
                            "type": "string"
                        }
                    }
                }
            })
        );
    }
}
