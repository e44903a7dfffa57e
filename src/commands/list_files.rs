use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::ListFilesArgs;
use crate::error::InputError;
use crate::model::FileListingRow;
use crate::util::{is_hidden, natural_sort_key, write_atomically};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    Natural,
    Alphabetical,
    DirectoryOrder,
    ModificationTime,
}

impl SortMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Natural => "natural",
            Self::Alphabetical => "alphabetical",
            Self::DirectoryOrder => "none",
            Self::ModificationTime => "modification_time",
        }
    }

    pub fn parse_or_natural(raw: &str) -> Self {
        match raw.trim() {
            "natural" => Self::Natural,
            "alphabetical" => Self::Alphabetical,
            "none" => Self::DirectoryOrder,
            "modification_time" => Self::ModificationTime,
            other => {
                warn!(sort = other, "unknown sort method; using natural sorting");
                Self::Natural
            }
        }
    }
}

pub fn run(args: ListFilesArgs) -> Result<()> {
    let sort_mode = SortMode::parse_or_natural(&args.sort);
    let files = list_directory(&args.input_dir, sort_mode)?;

    write_listing(&args.output_file, &files)?;
    info!(
        input_dir = %args.input_dir.display(),
        sort = sort_mode.as_str(),
        file_count = files.len(),
        "found files"
    );
    info!(path = %args.output_file.display(), "exported filenames");

    Ok(())
}

pub fn list_directory(input_dir: &Path, sort_mode: SortMode) -> Result<Vec<String>> {
    if !input_dir.is_dir() {
        return Err(InputError::not_found("input directory", input_dir).into());
    }

    let mut files = discover_files(input_dir)?;
    match sort_mode {
        SortMode::Natural => files.sort_by_cached_key(|(name, _)| natural_sort_key(name)),
        SortMode::Alphabetical => files.sort_by(|a, b| a.0.cmp(&b.0)),
        SortMode::ModificationTime => files.sort_by_key(|(_, path)| modified_at(path)),
        SortMode::DirectoryOrder => {}
    }

    Ok(files.into_iter().map(|(name, _)| name).collect())
}

fn discover_files(input_dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();

    let entries = fs::read_dir(input_dir)
        .with_context(|| format!("failed to read {}", input_dir.display()))?;

    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", input_dir.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            warn!(path = %path.display(), "skipping non UTF-8 filename");
            continue;
        };
        if is_hidden(name) {
            continue;
        }

        files.push((name.to_string(), path));
    }

    Ok(files)
}

fn modified_at(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

fn write_listing(output_file: &Path, files: &[String]) -> Result<()> {
    write_atomically(output_file, |writer| {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        csv_writer
            .write_record(["filename"])
            .with_context(|| format!("failed to write header to {}", output_file.display()))?;
        for filename in files {
            csv_writer
                .serialize(FileListingRow { filename })
                .with_context(|| format!("failed to write {filename}"))?;
        }
        csv_writer
            .flush()
            .with_context(|| format!("failed to flush {}", output_file.display()))?;
        Ok(())
    })
}
