//! Vocabulary identifiers and vocabulary sets.

use std::collections::BTreeMap;

use serde::Serialize;

/// Vocabularies (and pre-vocabulary dialects) with well-known identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Known {
    Core2020_12,
    Applicator2020_12,
    Unevaluated2020_12,
    Validation2020_12,
    MetaData2020_12,
    FormatAnnotation2020_12,
    FormatAssertion2020_12,
    Content2020_12,
    Core2019_09,
    Applicator2019_09,
    Validation2019_09,
    MetaData2019_09,
    Format2019_09,
    Content2019_09,
    HyperSchema2019_09,
    Draft7,
    Draft7Hyper,
    Draft6,
    Draft6Hyper,
    Draft4,
    Draft4Hyper,
    Draft3,
    Draft3Hyper,
    Draft2,
    Draft2Hyper,
    Draft1,
    Draft1Hyper,
    Draft0,
    Draft0Hyper,
}

impl Known {
    pub const ALL: [Known; 29] = [
        Known::Core2020_12,
        Known::Applicator2020_12,
        Known::Unevaluated2020_12,
        Known::Validation2020_12,
        Known::MetaData2020_12,
        Known::FormatAnnotation2020_12,
        Known::FormatAssertion2020_12,
        Known::Content2020_12,
        Known::Core2019_09,
        Known::Applicator2019_09,
        Known::Validation2019_09,
        Known::MetaData2019_09,
        Known::Format2019_09,
        Known::Content2019_09,
        Known::HyperSchema2019_09,
        Known::Draft7,
        Known::Draft7Hyper,
        Known::Draft6,
        Known::Draft6Hyper,
        Known::Draft4,
        Known::Draft4Hyper,
        Known::Draft3,
        Known::Draft3Hyper,
        Known::Draft2,
        Known::Draft2Hyper,
        Known::Draft1,
        Known::Draft1Hyper,
        Known::Draft0,
        Known::Draft0Hyper,
    ];

    pub fn uri(self) -> &'static str {
        match self {
            Known::Core2020_12 => "https://json-schema.org/draft/2020-12/vocab/core",
            Known::Applicator2020_12 => "https://json-schema.org/draft/2020-12/vocab/applicator",
            Known::Unevaluated2020_12 => "https://json-schema.org/draft/2020-12/vocab/unevaluated",
            Known::Validation2020_12 => "https://json-schema.org/draft/2020-12/vocab/validation",
            Known::MetaData2020_12 => "https://json-schema.org/draft/2020-12/vocab/meta-data",
            Known::FormatAnnotation2020_12 => {
                "https://json-schema.org/draft/2020-12/vocab/format-annotation"
            }
            Known::FormatAssertion2020_12 => {
                "https://json-schema.org/draft/2020-12/vocab/format-assertion"
            }
            Known::Content2020_12 => "https://json-schema.org/draft/2020-12/vocab/content",
            Known::Core2019_09 => "https://json-schema.org/draft/2019-09/vocab/core",
            Known::Applicator2019_09 => "https://json-schema.org/draft/2019-09/vocab/applicator",
            Known::Validation2019_09 => "https://json-schema.org/draft/2019-09/vocab/validation",
            Known::MetaData2019_09 => "https://json-schema.org/draft/2019-09/vocab/meta-data",
            Known::Format2019_09 => "https://json-schema.org/draft/2019-09/vocab/format",
            Known::Content2019_09 => "https://json-schema.org/draft/2019-09/vocab/content",
            Known::HyperSchema2019_09 => "https://json-schema.org/draft/2019-09/vocab/hyper-schema",
            Known::Draft7 => "http://json-schema.org/draft-07/schema#",
            Known::Draft7Hyper => "http://json-schema.org/draft-07/hyper-schema#",
            Known::Draft6 => "http://json-schema.org/draft-06/schema#",
            Known::Draft6Hyper => "http://json-schema.org/draft-06/hyper-schema#",
            Known::Draft4 => "http://json-schema.org/draft-04/schema#",
            Known::Draft4Hyper => "http://json-schema.org/draft-04/hyper-schema#",
            Known::Draft3 => "http://json-schema.org/draft-03/schema#",
            Known::Draft3Hyper => "http://json-schema.org/draft-03/hyper-schema#",
            Known::Draft2 => "http://json-schema.org/draft-02/schema#",
            Known::Draft2Hyper => "http://json-schema.org/draft-02/hyper-schema#",
            Known::Draft1 => "http://json-schema.org/draft-01/schema#",
            Known::Draft1Hyper => "http://json-schema.org/draft-01/hyper-schema#",
            Known::Draft0 => "http://json-schema.org/draft-00/schema#",
            Known::Draft0Hyper => "http://json-schema.org/draft-00/hyper-schema#",
        }
    }

    pub fn from_uri(uri: &str) -> Option<Known> {
        Known::ALL.iter().copied().find(|known| known.uri() == uri)
    }
}

/// A set of vocabularies, each flagged as required (`true`) or optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Vocabularies {
    entries: BTreeMap<String, bool>,
}

impl Vocabularies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uri: impl Into<String>, required: bool) {
        self.entries.insert(uri.into(), required);
    }

    pub fn insert_known(&mut self, known: Known, required: bool) {
        self.insert(known.uri(), required);
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.entries.contains_key(uri)
    }

    pub fn contains_known(&self, known: Known) -> bool {
        self.contains(known.uri())
    }

    /// Whether any of the given vocabularies is present.
    pub fn contains_any(&self, known: &[Known]) -> bool {
        known.iter().any(|vocabulary| self.contains_known(*vocabulary))
    }

    /// The required flag of a vocabulary, if present.
    pub fn get(&self, uri: &str) -> Option<bool> {
        self.entries.get(uri).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.entries.iter().map(|(uri, required)| (uri.as_str(), *required))
    }
}

impl FromIterator<(Known, bool)> for Vocabularies {
    fn from_iter<I: IntoIterator<Item = (Known, bool)>>(iter: I) -> Self {
        let mut result = Vocabularies::new();
        for (known, required) in iter {
            result.insert_known(known, required);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_round_trips_through_uri() {
        for known in Known::ALL {
            assert_eq!(Known::from_uri(known.uri()), Some(known));
        }
        assert_eq!(Known::from_uri("https://example.com/vocab/custom"), None);
    }

    #[test]
    fn known_and_custom_share_one_namespace() {
        let mut vocabularies = Vocabularies::new();
        vocabularies.insert("https://json-schema.org/draft/2020-12/vocab/core", true);
        vocabularies.insert("https://example.com/vocab/custom", false);

        assert!(vocabularies.contains_known(Known::Core2020_12));
        assert_eq!(vocabularies.get("https://example.com/vocab/custom"), Some(false));
        assert_eq!(vocabularies.len(), 2);
    }

    #[test]
    fn insert_overrides_required_flag() {
        let mut vocabularies = Vocabularies::new();
        vocabularies.insert_known(Known::Format2019_09, false);
        vocabularies.insert_known(Known::Format2019_09, true);
        assert_eq!(vocabularies.get(Known::Format2019_09.uri()), Some(true));
        assert_eq!(vocabularies.len(), 1);
    }

    #[test]
    fn contains_any() {
        let vocabularies: Vocabularies = [(Known::Draft7, true)].into_iter().collect();
        assert!(vocabularies.contains_any(&[Known::Applicator2020_12, Known::Draft7]));
        assert!(!vocabularies.contains_any(&[Known::Applicator2020_12]));
    }
}
