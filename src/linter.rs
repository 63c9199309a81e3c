//! Schema linting - static analysis of schema files.
//!
//! Checks schema files for:
//! - JSON syntax errors
//! - Schemas whose dialect or identity cannot be framed
//! - Pointer references that do not resolve within the document
//! - Matches of the configured transform rules

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::frame::Frame;
use crate::loader::{load_schema, FileResolver};
use crate::pointer::Pointer;
use crate::resolver::{official_resolver, SchemaResolver};
use crate::transformer::TransformSet;
use crate::types::LintOptions;
use crate::walker::official_walker;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Error code, or the name of the rule that matched.
    pub code: String,
    pub file: PathBuf,
    /// JSON Pointer to the issue (e.g., "/properties/id/then")
    pub path: String,
    pub message: String,
}

/// Result of linting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Lint a file or directory.
///
/// If path is a directory, recursively finds all .json files.
/// With `options.strict`, files with warnings count as failed.
/// Returns aggregated results for all files.
pub fn lint(path: &Path, rules: &TransformSet, options: &LintOptions) -> LintResult {
    let files = collect_schema_files(path);
    let mut results = Vec::new();
    let mut total_errors = 0;
    let mut total_warnings = 0;

    for file in &files {
        let file_result = lint_file(file, path, rules, options);
        total_errors += file_result
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count();
        total_warnings += file_result
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count();
        results.push(file_result);
    }

    let failed = results
        .iter()
        .filter(|r| {
            if options.strict {
                r.status != FileStatus::Ok
            } else {
                r.status == FileStatus::Error
            }
        })
        .count();

    LintResult {
        path: path.to_path_buf(),
        files_checked: files.len(),
        passed: files.len() - failed,
        failed,
        errors: total_errors,
        warnings: total_warnings,
        results,
    }
}

/// Lint a single schema file.
///
/// Custom metaschemas are resolved relative to the file's directory.
pub fn lint_file(
    file: &Path,
    base_path: &Path,
    rules: &TransformSet,
    options: &LintOptions,
) -> FileResult {
    let display = match file.strip_prefix(base_path) {
        Ok(relative) if !relative.as_os_str().is_empty() => relative.to_path_buf(),
        _ => file.to_path_buf(),
    };
    let mut diagnostics = Vec::new();
    let error = |code: &str, path: &str, message: String| Diagnostic {
        severity: Severity::Error,
        code: code.to_string(),
        file: file.to_path_buf(),
        path: path.to_string(),
        message,
    };

    // Try to load the file (checks syntax)
    let schema = match load_schema(file) {
        Ok(s) => s,
        Err(e) => {
            diagnostics.push(error("E001", "", format!("syntax error: {}", e)));
            return FileResult {
                file: display,
                status: FileStatus::Error,
                diagnostics,
            };
        }
    };

    let resolver =
        FileResolver::new(file.parent().unwrap_or(Path::new("."))).or(official_resolver);
    let frame = match Frame::new(
        &schema,
        &official_walker,
        &resolver,
        &options.default_dialect,
        "",
    ) {
        Ok(frame) => frame,
        Err(e) => {
            diagnostics.push(error("E002", "", e.to_string()));
            return FileResult {
                file: display,
                status: FileStatus::Error,
                diagnostics,
            };
        }
    };

    check_references(&frame, &mut diagnostics, file);

    if schema.get("$schema").and_then(Value::as_str).is_none() {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            code: "W001".to_string(),
            file: file.to_path_buf(),
            path: String::new(),
            message: "schema does not declare its dialect with $schema".to_string(),
        });
    }

    let checked = rules.check(
        &schema,
        &official_walker,
        &resolver,
        |pointer: &Pointer, name: &str, message: &str| {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                code: name.to_string(),
                file: file.to_path_buf(),
                path: pointer.to_string(),
                message: message.to_string(),
            });
        },
        &options.default_dialect,
    );
    if let Err(e) = checked {
        debug!(file = %file.display(), error = %e, "rule evaluation failed");
        diagnostics.push(error("E004", "", e.to_string()));
    }

    let has_errors = diagnostics.iter().any(|d| d.severity == Severity::Error);
    let has_warnings = diagnostics.iter().any(|d| d.severity == Severity::Warning);

    let status = if has_errors {
        FileStatus::Error
    } else if has_warnings {
        FileStatus::Warning
    } else {
        FileStatus::Ok
    };

    FileResult {
        file: display,
        status,
        diagnostics,
    }
}

/// Apply `rules` to every schema under `path`, rewriting changed files in
/// place. Returns the files that changed.
///
/// Files that fail to load or transform are left untouched; a subsequent
/// [`lint`] reports them.
pub fn fix(path: &Path, rules: &TransformSet, options: &LintOptions) -> Vec<PathBuf> {
    let mut changed = Vec::new();
    for file in collect_schema_files(path) {
        let mut schema = match load_schema(&file) {
            Ok(schema) => schema,
            Err(e) => {
                debug!(file = %file.display(), error = %e, "skipping unreadable schema");
                continue;
            }
        };
        let resolver =
            FileResolver::new(file.parent().unwrap_or(Path::new("."))).or(official_resolver);
        match rules.apply(&mut schema, &official_walker, &resolver, &options.default_dialect) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                debug!(file = %file.display(), error = %e, "could not fix schema");
                continue;
            }
        }

        let written = serde_json::to_string_pretty(&schema)
            .map_err(|e| e.to_string())
            .and_then(|text| std::fs::write(&file, text + "\n").map_err(|e| e.to_string()));
        match written {
            Ok(()) => {
                info!(file = %file.display(), "fixed schema");
                changed.push(file);
            }
            Err(e) => warn!(file = %file.display(), error = %e, "could not write schema"),
        }
    }
    changed
}

/// Report local references that point nowhere.
///
/// Only references into a resource of this document are checked. External
/// schemas are the bundler's concern.
fn check_references(frame: &Frame, diagnostics: &mut Vec<Diagnostic>, file: &Path) {
    for reference in frame.references() {
        if reference.is_metaschema()
            || frame.traverse(&reference.destination).is_some()
            || frame.traverse(&reference.base).is_none()
        {
            continue;
        }
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            code: "E003".to_string(),
            file: file.to_path_buf(),
            path: reference.source.to_string(),
            message: format!("reference not found: {}", reference.raw),
        });
    }
}

/// Collect all .json files in a path (file or directory).
fn collect_schema_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            return vec![path.to_path_buf()];
        }
        return vec![];
    }

    let mut files = Vec::new();
    collect_files_recursive(path, &mut files);
    files.sort();
    files
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, files);
        } else if path.extension().map(|e| e == "json").unwrap_or(false) {
            files.push(path);
        }
    }
}
