use crate::binary::Binary;
use crate::format::FormatKind;
use crate::report::{file_identity, Report};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    pub parsed: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug)]
pub enum FileOutcome {
    Parsed(FormatKind),
    Skipped,
    Failed,
}

/// Lists the regular files directly inside `dir`, sorted by name.
pub fn list_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read input directory {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to list {}", dir.display()))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        } else {
            log::debug!("Skipping non-file entry {}", path.display());
        }
    }
    files.sort();
    Ok(files)
}

/// Parses one file and records it in `report`. Parse failures are logged and
/// returned as an outcome, never as an error.
pub fn process_file(report: &mut Report, path: &Path) -> FileOutcome {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    match Binary::open(path) {
        Ok(Some(binary)) => {
            let format = binary.format;
            log::info!("Parsing {format} file: {name}");
            let (key, extension) = file_identity(&name);
            report.insert(&key, extension.as_deref(), binary);
            FileOutcome::Parsed(format)
        }
        Ok(None) => {
            log::debug!("Skipping {name}: unrecognised magic");
            FileOutcome::Skipped
        }
        Err(err) => {
            log::error!("{err:?}");
            log::error!("Failed to parse {name}: {err}");
            FileOutcome::Failed
        }
    }
}

/// Builds a report from every regular file in `dir`.
///
/// Only a failure to list the directory aborts; a file that cannot be parsed
/// is counted and left out of the report.
pub fn build_report<P: AsRef<Path>>(dir: P) -> Result<(Report, BatchStats)> {
    let mut report = Report::new();
    let mut stats = BatchStats::default();

    for path in list_files(dir)? {
        match process_file(&mut report, &path) {
            FileOutcome::Parsed(_) => stats.parsed += 1,
            FileOutcome::Skipped => stats.skipped += 1,
            FileOutcome::Failed => stats.failed += 1,
        }
    }

    log::info!(
        "Parsed {} files ({} skipped, {} failed)",
        stats.parsed,
        stats.skipped,
        stats.failed
    );
    Ok((report, stats))
}
