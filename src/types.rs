//! Option types shared by the bundler, the linter and the CLI.

use serde_json::Value;

use crate::pointer::Pointer;

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Options for [`bundle`](crate::bundle::bundle) and
/// [`dependencies`](crate::bundle::dependencies).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleOptions {
    /// Dialect assumed for schemas without `$schema`. Empty means none.
    pub default_dialect: String,
    /// Identifier assumed for a root without one. Empty means none.
    pub default_id: String,
    /// Where to embed external schemas. When unset, `$defs` is used for
    /// 2019-09 and later and `definitions` for Draft 4 to Draft 7.
    pub destination: Option<Pointer>,
}

impl BundleOptions {
    /// Create bundle options with no defaults and an automatic destination.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dialect assumed for schemas without `$schema`.
    pub fn default_dialect(mut self, dialect: impl Into<String>) -> Self {
        self.default_dialect = dialect.into();
        self
    }

    /// Set the identifier assumed for an anonymous root. It is written into
    /// the bundled output.
    pub fn default_id(mut self, id: impl Into<String>) -> Self {
        self.default_id = id.into();
        self
    }

    /// Embed external schemas under `pointer` instead of the dialect's
    /// definitions container.
    pub fn destination(mut self, pointer: Pointer) -> Self {
        self.destination = Some(pointer);
        self
    }
}

/// Options for [`lint`](crate::linter::lint).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintOptions {
    /// Dialect assumed for files without `$schema`. Empty means none.
    pub default_dialect: String,
    /// Treat warnings as failures.
    pub strict: bool,
}

impl LintOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_dialect(mut self, dialect: impl Into<String>) -> Self {
        self.default_dialect = dialect.into();
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}
