use crate::binary::Binary;
use crate::fields::{FieldMap, FILE_EXTENSION_KEY};
use crate::format::FormatKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Comment lines written at the top of every TOML report.
pub const REPORT_PREAMBLE: [&str; 2] = ["# hexgen", "# Auto-generated testing file"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Toml,
    Json,
}

/// Splits a filename into its report identifier and optional extension.
///
/// The identifier is everything before the last dot (leading dots do not
/// count), the extension is everything after the last dot whenever the name
/// contains one.
pub fn file_identity(file_name: &str) -> (String, Option<String>) {
    let leading = file_name.len() - file_name.trim_start_matches('.').len();
    let key = match file_name[leading..].rfind('.') {
        Some(pos) => &file_name[..leading + pos],
        None => file_name,
    };
    let extension = file_name.rsplit_once('.').map(|(_, ext)| ext.to_string());
    (key.to_string(), extension)
}

/// Parsed headers grouped by format table, then by file identifier.
///
/// Both levels are sorted so the serialized report is reproducible no matter
/// in which order files were visited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report(BTreeMap<String, BTreeMap<String, FieldMap>>);

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `binary` under `file_key`, replacing any previous entry with
    /// the same key. Returns `false` for an `Unknown` format, which has no
    /// table.
    pub fn insert(&mut self, file_key: &str, extension: Option<&str>, binary: Binary) -> bool {
        let Some(table) = binary.format.table_name() else {
            return false;
        };
        let mut fields = binary.fields;
        if let Some(ext) = extension {
            fields.insert(FILE_EXTENSION_KEY, ext);
        }
        let previous = self
            .0
            .entry(table.to_string())
            .or_default()
            .insert(file_key.to_string(), fields);
        if previous.is_some() {
            log::debug!("Replacing earlier {table} entry for {file_key}");
        }
        true
    }

    pub fn get(&self, format: FormatKind, file_key: &str) -> Option<&FieldMap> {
        self.table(format)?.get(file_key)
    }

    pub fn table(&self, format: FormatKind) -> Option<&BTreeMap<String, FieldMap>> {
        self.0.get(format.table_name()?)
    }

    /// Iterates `(format, file_key, fields)` in serialized order. Tables
    /// with an unrecognised name are skipped.
    pub fn entries(&self) -> impl Iterator<Item = (FormatKind, &str, &FieldMap)> {
        self.0.iter().flat_map(|(table, files)| {
            let format = FormatKind::from_table_name(table);
            files
                .iter()
                .filter_map(move |(key, fields)| Some((format?, key.as_str(), fields)))
        })
    }

    pub fn len(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_toml_string(&self) -> Result<String> {
        let body = toml::to_string(self).context("Failed to serialize report as TOML")?;
        let mut out = REPORT_PREAMBLE.join("\n");
        out.push_str("\n\n");
        out.push_str(&body);
        Ok(out)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize report as JSON")
    }

    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Toml => self.to_toml_string(),
            OutputFormat::Json => self.to_json_string(),
        }
    }

    pub fn write_to<P: AsRef<Path>>(&self, path: P, format: OutputFormat) -> Result<()> {
        let path = path.as_ref();
        let rendered = self.render(format)?;
        std::fs::write(path, rendered)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        log::info!("Report written: {}", path.display());
        Ok(())
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse TOML report")
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read report {}", path.display()))?;
        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON report {}", path.display()))
        } else {
            Self::from_toml_str(&contents)
                .with_context(|| format!("Failed to load report {}", path.display()))
        }
    }
}
