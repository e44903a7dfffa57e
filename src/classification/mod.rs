use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use csv::StringRecord;
use indexmap::IndexMap;
use tracing::{info, warn};

use crate::error::InputError;
use crate::model::{CLASSIFICATION_HEADER, ClassificationRecord, ClassificationRow};
use crate::util::write_atomically;

mod page_key;
mod resolver;
#[cfg(test)]
mod tests;

pub use page_key::{DocumentPageKey, dataset_document_name, document_id};
pub use resolver::{ResolvedDefaults, resolve_defaults, resolve_previous_page};

/// Image filename -> ratings, kept in insertion order so a rewrite keeps row order stable.
/// Rows that could not be read are carried verbatim and written back on save.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassificationTable {
    entries: IndexMap<String, ClassificationRecord>,
    preserved: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BadRows {
    Reject,
    Preserve,
}

impl ClassificationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load used by interactive tools; never fails. A missing file is an empty
    /// table, rows that fail to parse or hold out-of-range values are kept aside
    /// untouched, and a file that cannot be read at all is backed up first.
    pub fn load(path: &Path) -> Self {
        if !path.is_file() {
            info!(path = %path.display(), "no existing classifications; starting empty");
            return Self::default();
        }

        match Self::parse(path, BadRows::Preserve) {
            Ok(table) => {
                if !table.preserved.is_empty() {
                    warn!(
                        path = %path.display(),
                        rows = table.preserved.len(),
                        "keeping unreadable classification rows unchanged"
                    );
                }
                info!(
                    path = %path.display(),
                    classified = table.len(),
                    "loaded existing classifications"
                );
                table
            }
            Err(err) => {
                let backup = backup_path(path);
                match fs::copy(path, &backup) {
                    Ok(_) => warn!(
                        path = %path.display(),
                        backup = %backup.display(),
                        error = %format!("{err:#}"),
                        "could not load existing classifications; backed up and starting empty"
                    ),
                    Err(copy_err) => warn!(
                        path = %path.display(),
                        error = %format!("{err:#}"),
                        backup_error = %copy_err,
                        "could not load or back up existing classifications; starting empty"
                    ),
                }
                Self::default()
            }
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(InputError::not_found("classification table", path).into());
        }
        Self::parse(path, BadRows::Reject)
    }

    fn parse(path: &Path, bad_rows: BadRows) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let headers = reader
            .headers()
            .with_context(|| format!("failed to read header of {}", path.display()))?
            .clone();

        let mut table = Self::default();
        for (index, row) in reader.records().enumerate() {
            let row = row.with_context(|| {
                format!("failed to read row {} in {}", index + 1, path.display())
            })?;
            match parse_row(&row, &headers) {
                Ok((filename, record)) => table.insert(filename, record),
                Err(err) if bad_rows == BadRows::Preserve => {
                    warn!(
                        row = index + 1,
                        error = %format!("{err:#}"),
                        "unreadable classification row"
                    );
                    table.preserved.push(row.iter().map(String::from).collect());
                }
                Err(err) => {
                    return Err(err.context(format!(
                        "malformed row {} in {}",
                        index + 1,
                        path.display()
                    )));
                }
            }
        }

        Ok(table)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_atomically(path, |writer| {
            let mut csv_writer = csv::WriterBuilder::new()
                .has_headers(false)
                .flexible(true)
                .from_writer(writer);

            csv_writer
                .write_record(CLASSIFICATION_HEADER)
                .with_context(|| format!("failed to write header to {}", path.display()))?;
            for (filename, record) in &self.entries {
                csv_writer
                    .serialize(ClassificationRow::new(filename, record))
                    .with_context(|| {
                        format!("failed to write row for {filename} to {}", path.display())
                    })?;
            }
            for row in &self.preserved {
                csv_writer
                    .write_record(row)
                    .with_context(|| format!("failed to write row to {}", path.display()))?;
            }
            csv_writer
                .flush()
                .with_context(|| format!("failed to flush {}", path.display()))?;
            Ok(())
        })
    }

    pub fn preserved_rows(&self) -> usize {
        self.preserved.len()
    }

    pub fn insert(&mut self, filename: impl Into<String>, record: ClassificationRecord) {
        let filename = filename.into();
        self.preserved
            .retain(|row| row.first().map(String::as_str) != Some(filename.as_str()));
        self.entries.insert(filename, record);
    }

    pub fn get(&self, filename: &str) -> Option<&ClassificationRecord> {
        self.entries.get(filename)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ClassificationRecord)> {
        self.entries
            .iter()
            .map(|(filename, record)| (filename.as_str(), record))
    }
}

impl FromIterator<(String, ClassificationRecord)> for ClassificationTable {
    fn from_iter<I: IntoIterator<Item = (String, ClassificationRecord)>>(iter: I) -> Self {
        let mut table = Self::default();
        for (filename, record) in iter {
            table.insert(filename, record);
        }
        table
    }
}

fn parse_row(row: &StringRecord, headers: &StringRecord) -> Result<(String, ClassificationRecord)> {
    let (filename, record) = row
        .deserialize::<ClassificationRow>(Some(headers))
        .context("row does not match the classification columns")?
        .into_parts();
    if !record.is_valid() {
        bail!("out-of-range values for {filename}");
    }
    Ok((filename, record))
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".unreadable");
    path.with_file_name(name)
}
