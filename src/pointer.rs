//! JSON Pointer (RFC 6901) locations within a document.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// A JSON Pointer as a list of unescaped reference tokens.
///
/// Array indexes are kept as decimal strings and interpreted when the
/// pointer is applied to an array.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pointer {
    tokens: Vec<String>,
}

impl Pointer {
    /// The empty pointer, addressing the whole document.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse the string form (`""`, `"/foo/0"`). Returns `None` when the
    /// string is neither empty nor starts with `/`.
    pub fn parse(pointer: &str) -> Option<Self> {
        if pointer.is_empty() {
            return Some(Self::root());
        }
        let rest = pointer.strip_prefix('/')?;
        Some(Self {
            tokens: rest
                .split('/')
                .map(|part| part.replace("~1", "/").replace("~0", "~"))
                .collect(),
        })
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn last(&self) -> Option<&str> {
        self.tokens.last().map(String::as_str)
    }

    pub fn push(&mut self, token: impl Into<String>) {
        self.tokens.push(token.into());
    }

    /// A new pointer with `token` appended.
    pub fn join(&self, token: impl Into<String>) -> Self {
        let mut result = self.clone();
        result.push(token);
        result
    }

    /// A new pointer with all tokens of `other` appended.
    pub fn concat(&self, other: &Pointer) -> Self {
        let mut result = self.clone();
        result.tokens.extend(other.tokens.iter().cloned());
        result
    }

    /// The pointer without its last token.
    pub fn parent(&self) -> Option<Self> {
        if self.tokens.is_empty() {
            return None;
        }
        Some(Self {
            tokens: self.tokens[..self.tokens.len() - 1].to_vec(),
        })
    }

    pub fn starts_with(&self, prefix: &Pointer) -> bool {
        self.tokens.starts_with(&prefix.tokens)
    }

    /// The remainder of this pointer after `prefix`.
    pub fn strip_prefix(&self, prefix: &Pointer) -> Option<Self> {
        if !self.starts_with(prefix) {
            return None;
        }
        Some(Self {
            tokens: self.tokens[prefix.tokens.len()..].to_vec(),
        })
    }

    /// Translate a pointer under `prefix` into the same location under
    /// `replacement`. Pointers outside `prefix` are returned unchanged.
    pub fn rebase(&self, prefix: &Pointer, replacement: &Pointer) -> Self {
        match self.strip_prefix(prefix) {
            Some(rest) => replacement.concat(&rest),
            None => self.clone(),
        }
    }

    /// The value at this pointer, if any.
    pub fn get<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        let mut current = value;
        for token in &self.tokens {
            current = match current {
                Value::Object(map) => map.get(token)?,
                Value::Array(items) => items.get(token.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn get_mut<'a>(&self, value: &'a mut Value) -> Option<&'a mut Value> {
        let mut current = value;
        for token in &self.tokens {
            current = match current {
                Value::Object(map) => map.get_mut(token)?,
                Value::Array(items) => items.get_mut(token.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Walk to this pointer, creating empty objects for missing object
    /// members. Returns `None` if an existing value on the way cannot be
    /// descended into.
    pub fn get_or_create<'a>(&self, value: &'a mut Value) -> Option<&'a mut Value> {
        let mut current = value;
        for token in &self.tokens {
            current = match current {
                Value::Object(map) => map
                    .entry(token.clone())
                    .or_insert_with(|| Value::Object(Map::new())),
                Value::Array(items) => items.get_mut(token.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "/{}", token.replace('~', "~0").replace('/', "~1"))?;
        }
        Ok(())
    }
}

impl Serialize for Pointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
