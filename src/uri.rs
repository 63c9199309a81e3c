//! URI helpers for schema identifiers and references.
//!
//! Absolute URIs go through `url::Url` for normalization and relative
//! resolution. Relative identifiers (e.g. `"common"` as a root `$id`) are
//! resolved against a placeholder authority and stripped back afterwards, so
//! that relative documents keep relative identifiers.

use url::Url;

/// Placeholder base used to resolve relative references against relative
/// bases. Never leaks into results.
const RELATIVE_BASE: &str = "https://relative.schema-core.invalid/";

/// Whether `uri` parses as an absolute URI (has a scheme).
pub fn is_absolute(uri: &str) -> bool {
    Url::parse(uri).is_ok()
}

pub fn is_relative(uri: &str) -> bool {
    !is_absolute(uri)
}

/// Normalize a URI so equivalent spellings compare equal.
///
/// Absolute URIs are serialized by `url` (lowercased scheme and host, dot
/// segments removed). An empty trailing fragment is dropped in all cases.
pub fn canonicalize(uri: &str) -> String {
    match Url::parse(uri) {
        Ok(mut parsed) => {
            if parsed.fragment() == Some("") {
                parsed.set_fragment(None);
            }
            parsed.to_string()
        }
        Err(_) => uri.strip_suffix('#').unwrap_or(uri).to_string(),
    }
}

/// Resolve `reference` against `base` (which may be empty or relative).
pub fn resolve(base: &str, reference: &str) -> String {
    if is_absolute(reference) || (base.is_empty() && !reference.starts_with('#')) {
        return canonicalize(reference);
    }

    if let Ok(parsed) = Url::parse(base) {
        return match parsed.join(reference) {
            Ok(joined) => canonicalize(joined.as_str()),
            Err(_) => canonicalize(reference),
        };
    }

    // Both sides relative: resolve under the placeholder and strip it again.
    let Ok(placeholder) = Url::parse(RELATIVE_BASE) else {
        return canonicalize(reference);
    };
    let joined = placeholder
        .join(base)
        .and_then(|relative_base| relative_base.join(reference));
    match joined {
        Ok(joined) => {
            let joined = canonicalize(joined.as_str());
            joined
                .strip_prefix(RELATIVE_BASE)
                .map(str::to_string)
                .unwrap_or(joined)
        }
        Err(_) => canonicalize(reference),
    }
}

/// The URI without its fragment.
pub fn strip_fragment(uri: &str) -> &str {
    match uri.find('#') {
        Some(index) => &uri[..index],
        None => uri,
    }
}

/// The fragment of the URI (without `#`), if it has one.
pub fn fragment(uri: &str) -> Option<&str> {
    uri.find('#').map(|index| &uri[index + 1..])
}

/// Compose `base#fragment`, canonicalized.
pub fn with_fragment(base: &str, fragment: &str) -> String {
    canonicalize(&format!("{}#{}", strip_fragment(base), fragment))
}

/// Decode `%XX` escapes (as used in JSON Pointer fragments).
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut output = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'%' && index + 2 < bytes.len() {
            let decoded = std::str::from_utf8(&bytes[index + 1..index + 3])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());
            if let Some(byte) = decoded {
                output.push(byte);
                index += 3;
                continue;
            }
        }
        output.push(bytes[index]);
        index += 1;
    }
    String::from_utf8_lossy(&output).into_owned()
}
