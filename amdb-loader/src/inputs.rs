//! Reading the hostname list and the document template from disk.

use std::{fs, io, path::Path};

use serde_json::Value;

use crate::{
    domain::{json_kind, Template},
    LoaderError,
};

/// Read the hostnames in `path`, one per line. Surrounding whitespace is
/// trimmed and blank lines are skipped. Duplicates and order are kept.
///
/// # Errors
/// If the file does not exist or cannot be read.
pub fn read_identifiers(path: &Path) -> Result<Vec<String>, LoaderError> {
    let text = read_to_string(path)?;
    let identifiers = parse_identifiers(&text);
    tracing::info!(
        path = %path.display(),
        count = identifiers.len(),
        "Read hostnames"
    );
    Ok(identifiers)
}

/// Split `text` into identifiers, one per nonblank line.
pub fn parse_identifiers(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Read the document template in `path`. The file must hold a JSON object.
///
/// # Errors
/// If the file does not exist or cannot be read, if it is not valid JSON, or
/// if its root is not an object.
pub fn read_template(path: &Path) -> Result<Template, LoaderError> {
    let text = read_to_string(path)?;
    let template = parse_template(&text, path)?;
    tracing::info!(
        path = %path.display(),
        fields = template.fields().len(),
        "Read document template"
    );
    Ok(template)
}

/// Parse `text` as a template. `path` is only used for error reporting.
///
/// # Errors
/// If `text` is not valid JSON, or its root is not an object.
pub fn parse_template(text: &str, path: &Path) -> Result<Template, LoaderError> {
    let value: Value = serde_json::from_str(text).map_err(|source| LoaderError::Parse {
        path: path.to_path_buf(),
        line: source.line(),
        column: source.column(),
        source,
    })?;

    match value {
        Value::Object(fields) => Ok(Template::new(fields)),
        other => Err(LoaderError::TemplateNotObject {
            path: path.to_path_buf(),
            found: json_kind(&other),
        }),
    }
}

/// Read a whole file, separating "missing" from every other I/O problem.
fn read_to_string(path: &Path) -> Result<String, LoaderError> {
    fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => LoaderError::NotFound {
            path: path.to_path_buf(),
        },
        _ => LoaderError::Io {
            path: path.to_path_buf(),
            source,
        },
    })
}
