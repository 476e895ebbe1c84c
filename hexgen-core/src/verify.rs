use crate::binary::Binary;
use crate::fields::{FieldMap, FILE_EXTENSION_KEY};
use crate::format::FormatKind;
use crate::report::Report;
use std::fmt;
use std::path::{Path, PathBuf};

/// A difference between an expected report entry and a fresh parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    MissingFile {
        format: FormatKind,
        key: String,
        path: PathBuf,
    },
    ParseFailed {
        format: FormatKind,
        key: String,
        reason: String,
    },
    FormatChanged {
        key: String,
        expected: FormatKind,
        actual: FormatKind,
    },
    MissingField {
        format: FormatKind,
        key: String,
        field: String,
    },
    UnexpectedField {
        format: FormatKind,
        key: String,
        field: String,
    },
    ValueDiffers {
        format: FormatKind,
        key: String,
        field: String,
        expected: String,
        actual: String,
    },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::MissingFile { format, key, path } => {
                write!(f, "{format} {key}: file not found at {}", path.display())
            }
            Mismatch::ParseFailed {
                format,
                key,
                reason,
            } => write!(f, "{format} {key}: parse failed: {reason}"),
            Mismatch::FormatChanged {
                key,
                expected,
                actual,
            } => write!(f, "{key}: expected {expected}, found {actual}"),
            Mismatch::MissingField { format, key, field } => {
                write!(f, "{format} {key}: missing field {field}")
            }
            Mismatch::UnexpectedField { format, key, field } => {
                write!(f, "{format} {key}: unexpected field {field}")
            }
            Mismatch::ValueDiffers {
                format,
                key,
                field,
                expected,
                actual,
            } => write!(
                f,
                "{format} {key}: {field} expected {expected}, got {actual}"
            ),
        }
    }
}

/// Path of the file a report entry was generated from.
///
/// A dot-leading name such as `.hidden` keeps its whole name as the key and
/// also reports `hidden` as its extension, so when `<key>.<ext>` does not
/// exist the bare key is tried.
pub fn entry_path(dir: &Path, key: &str, expected: &FieldMap) -> PathBuf {
    let bare = dir.join(key);
    match expected.get(FILE_EXTENSION_KEY) {
        Some(ext) => {
            let joined = dir.join(format!("{key}.{ext}"));
            if !joined.is_file() && bare.is_file() {
                bare
            } else {
                joined
            }
        }
        None => bare,
    }
}

/// Compares two field maps, ignoring `file_extension`.
pub fn compare_fields(
    format: FormatKind,
    key: &str,
    expected: &FieldMap,
    actual: &FieldMap,
) -> Vec<Mismatch> {
    let mut mismatches = Vec::new();

    for (field, want) in expected.iter().filter(|(k, _)| *k != FILE_EXTENSION_KEY) {
        match actual.get(field) {
            None => mismatches.push(Mismatch::MissingField {
                format,
                key: key.to_string(),
                field: field.to_string(),
            }),
            Some(got) if got != want => mismatches.push(Mismatch::ValueDiffers {
                format,
                key: key.to_string(),
                field: field.to_string(),
                expected: want.to_string(),
                actual: got.to_string(),
            }),
            Some(_) => {}
        }
    }

    for field in actual
        .keys()
        .filter(|k| *k != FILE_EXTENSION_KEY && !expected.contains_key(k))
    {
        mismatches.push(Mismatch::UnexpectedField {
            format,
            key: key.to_string(),
            field: field.to_string(),
        });
    }

    mismatches
}

fn verify_entry(dir: &Path, format: FormatKind, key: &str, expected: &FieldMap) -> Vec<Mismatch> {
    let path = entry_path(dir, key, expected);
    if !path.is_file() {
        return vec![Mismatch::MissingFile {
            format,
            key: key.to_string(),
            path,
        }];
    }

    match Binary::open(&path) {
        Ok(Some(binary)) if binary.format == format => {
            compare_fields(format, key, expected, &binary.fields)
        }
        Ok(Some(binary)) => vec![Mismatch::FormatChanged {
            key: key.to_string(),
            expected: format,
            actual: binary.format,
        }],
        Ok(None) => vec![Mismatch::FormatChanged {
            key: key.to_string(),
            expected: format,
            actual: FormatKind::Unknown,
        }],
        Err(err) => vec![Mismatch::ParseFailed {
            format,
            key: key.to_string(),
            reason: err.to_string(),
        }],
    }
}

/// Re-parses every file named by `expected` from `dir` and collects all
/// differences. An empty result means the report still matches.
pub fn verify_report<P: AsRef<Path>>(expected: &Report, dir: P) -> Vec<Mismatch> {
    let dir = dir.as_ref();
    let mut mismatches = Vec::new();
    for (format, key, fields) in expected.entries() {
        let found = verify_entry(dir, format, key, fields);
        if found.is_empty() {
            log::debug!("{format} {key}: ok");
        }
        mismatches.extend(found);
    }
    mismatches
}
