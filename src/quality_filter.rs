use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;

use anyhow::Result;
use tracing::{debug, warn};

use crate::classification::{ClassificationTable, dataset_document_name};
use crate::dataset::Dataset;
use crate::util::ensure_directory;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyFailure {
    pub filename: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactCopyReport {
    pub copied: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<CopyFailure>,
}

/// Documents with at least one page rated 5/5 on both description and heights.
pub fn select_perfect_score(table: &ClassificationTable) -> BTreeSet<String> {
    table
        .iter()
        .filter(|(_, record)| record.is_perfect_score())
        .filter_map(|(filename, _)| {
            let name = dataset_document_name(filename);
            if name.is_none() {
                debug!(filename, "ignoring non-image classification row");
            }
            name
        })
        .collect()
}

pub fn filter_dataset(dataset: &Dataset, document_names: &BTreeSet<String>) -> Dataset {
    dataset
        .iter()
        .filter(|(name, _)| document_names.contains(name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Copies each named artifact from `source_dir` to `dest_dir`. Missing sources
/// and per-file failures are collected; only an unusable `dest_dir` aborts.
pub fn copy_artifacts<I, S>(
    document_names: I,
    source_dir: &Path,
    dest_dir: &Path,
) -> Result<ArtifactCopyReport>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ensure_directory(dest_dir)?;

    let mut report = ArtifactCopyReport::default();
    for name in document_names {
        let name = name.as_ref();
        let source = source_dir.join(name);
        if !source.is_file() {
            warn!(path = %source.display(), "source artifact missing; skipping");
            report.skipped.push(name.to_string());
            continue;
        }

        match copy_preserving_mtime(&source, &dest_dir.join(name)) {
            Ok(bytes) => {
                debug!(filename = name, bytes, "copied artifact");
                report.copied.push(name.to_string());
            }
            Err(err) => {
                warn!(filename = name, error = %err, "failed to copy artifact");
                report.failed.push(CopyFailure {
                    filename: name.to_string(),
                    reason: err.to_string(),
                });
            }
        }
    }

    Ok(report)
}

fn copy_preserving_mtime(source: &Path, dest: &Path) -> io::Result<u64> {
    let bytes = fs::copy(source, dest)?;
    let modified = fs::metadata(source)?.modified()?;
    OpenOptions::new()
        .write(true)
        .open(dest)?
        .set_modified(modified)?;
    Ok(bytes)
}
