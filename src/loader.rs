//! Schema loading from various sources.
//!
//! Handles loading schemas from files, strings, and HTTP URLs, and provides
//! resolvers backed by a local directory or the network.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, trace};

use crate::error::LoadError;
use crate::resolver::SchemaResolver;
use crate::uri;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Load a schema from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson` if the file isn't valid JSON.
pub fn load_schema(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load a schema from a JSON string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string isn't valid JSON.
pub fn load_schema_str(content: &str) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
}

#[cfg(feature = "remote")]
fn http_client() -> Result<reqwest::blocking::Client, reqwest::Error> {
    reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
}

#[cfg(feature = "remote")]
fn fetch(client: &reqwest::blocking::Client, url: &str) -> Result<Value, LoadError> {
    let network = |source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };

    let response = client.get(url).send().map_err(network)?;
    // Check for HTTP errors before parsing
    let response = response.error_for_status().map_err(network)?;
    let body = response.text().map_err(network)?;
    load_schema_str(&body)
}

/// Load a schema from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails,
/// or `LoadError::InvalidJson` if the response isn't valid JSON.
#[cfg(feature = "remote")]
pub fn load_schema_url(url: &str) -> Result<Value, LoadError> {
    let client = http_client().map_err(|source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    })?;
    fetch(&client, url)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a schema from a file path or URL.
///
/// Automatically detects whether the source is a URL or file path.
/// URL loading requires the `remote` feature.
///
/// # Errors
///
/// Returns appropriate errors based on the source type.
pub fn load_schema_auto(source: &str) -> Result<Value, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_schema_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: PathBuf::from(source),
            })
        }
    } else {
        load_schema(Path::new(source))
    }
}

/// Resolves schemas from a local directory.
///
/// URIs under the configured remote base are mapped onto the directory,
/// relative URIs are joined to it and `file://` URIs are read directly.
///
/// # Example
/// ```text
/// remote_base = "https://example.com/schemas"
/// root = "site"
/// "https://example.com/schemas/person.json" -> "site/person.json"
/// ```
#[derive(Debug, Clone)]
pub struct FileResolver {
    root: PathBuf,
    remote_base: Option<String>,
}

impl FileResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            remote_base: None,
        }
    }

    /// Map URIs starting with `base` onto the resolver's directory.
    pub fn remote_base(mut self, base: impl Into<String>) -> Self {
        self.remote_base = Some(base.into());
        self
    }

    /// The file a URI maps to, if any.
    pub fn path_for(&self, uri: &str) -> Option<PathBuf> {
        let location = uri::strip_fragment(uri);

        if let Some(base) = &self.remote_base {
            let base = base.trim_end_matches('/');
            if let Some(remainder) = location.strip_prefix(base) {
                if remainder.is_empty() || remainder.starts_with('/') {
                    return Some(self.root.join(remainder.trim_start_matches('/')));
                }
            }
        }

        if location.starts_with("file:") {
            return url::Url::parse(location).ok()?.to_file_path().ok();
        }

        if uri::is_relative(location) && !location.is_empty() {
            return Some(self.root.join(location));
        }

        None
    }
}

impl SchemaResolver for FileResolver {
    fn resolve(&self, uri: &str) -> Option<Value> {
        let path = self.path_for(uri)?;
        match load_schema(&path) {
            Ok(schema) => {
                debug!(uri, path = %path.display(), "resolved schema from disk");
                Some(schema)
            }
            Err(LoadError::FileNotFound { .. }) => {
                trace!(uri, path = %path.display(), "no schema on disk");
                None
            }
            Err(error) => {
                debug!(uri, path = %path.display(), %error, "could not load schema");
                None
            }
        }
    }
}

/// Resolves absolute `http` and `https` URIs over the network.
#[cfg(feature = "remote")]
#[derive(Debug, Clone)]
pub struct HttpResolver {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "remote")]
impl HttpResolver {
    /// # Errors
    ///
    /// Returns `LoadError::NetworkError` if the HTTP client cannot be built.
    pub fn new() -> Result<Self, LoadError> {
        let client = http_client().map_err(|source| LoadError::NetworkError {
            url: String::new(),
            source,
        })?;
        Ok(Self { client })
    }
}

#[cfg(feature = "remote")]
impl SchemaResolver for HttpResolver {
    fn resolve(&self, uri: &str) -> Option<Value> {
        let location = uri::strip_fragment(uri);
        if !is_url(location) {
            return None;
        }
        match fetch(&self.client, location) {
            Ok(schema) => {
                debug!(uri, "fetched schema");
                Some(schema)
            }
            Err(error) => {
                debug!(uri, %error, "could not fetch schema");
                None
            }
        }
    }
}
