use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

pub const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "bmp"];

static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("digit run pattern is valid"));

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("failed to open file for hashing: {}", path.display()))?;

    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 8192];

    loop {
        let count = file
            .read(&mut buf)
            .with_context(|| format!("failed to read file for hashing: {}", path.display()))?;
        if count == 0 {
            break;
        }
        hasher.update(&buf[..count]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Writes through a temporary sibling file and renames it over `path`, so readers
/// see either the previous content or the complete new content.
pub fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&mut File>) -> Result<()>,
{
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_directory(parent)?;

    let mut staged = NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to stage temporary file in {}", parent.display()))?;
    {
        let mut writer = BufWriter::new(staged.as_file_mut());
        write(&mut writer)?;
        writer
            .flush()
            .with_context(|| format!("failed to flush staged file for {}", path.display()))?;
    }

    staged
        .persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("failed to replace {}", path.display()))?;

    Ok(())
}

pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let data = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;

    write_atomically(path, |writer| {
        writer
            .write_all(&data)
            .with_context(|| format!("failed to write json file: {}", path.display()))?;
        writer
            .write_all(b"\n")
            .with_context(|| format!("failed to finalize json file: {}", path.display()))?;
        Ok(())
    })
}

pub fn is_hidden(filename: &str) -> bool {
    filename.starts_with('.')
}

pub fn image_extension(filename: &str) -> Option<&str> {
    let (_, extension) = filename.rsplit_once('.')?;
    IMAGE_EXTENSIONS
        .iter()
        .any(|candidate| extension.eq_ignore_ascii_case(candidate))
        .then_some(extension)
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum NaturalChunk {
    Text(String),
    Number(u128),
}

/// Sort key that compares digit runs numerically and everything else
/// case-insensitively, so `9156.pdf` sorts before `11084.pdf`.
///
/// Keys always start with a (possibly empty) text chunk and alternate, so
/// chunks at the same position are of the same kind.
pub fn natural_sort_key(name: &str) -> Vec<NaturalChunk> {
    let mut chunks = Vec::new();
    let mut cursor = 0;

    for digits in DIGIT_RUN.find_iter(name) {
        chunks.push(NaturalChunk::Text(
            name[cursor..digits.start()].to_lowercase(),
        ));
        let number = digits.as_str().parse::<u128>().unwrap_or(u128::MAX);
        chunks.push(NaturalChunk::Number(number));
        cursor = digits.end();
    }
    chunks.push(NaturalChunk::Text(name[cursor..].to_lowercase()));

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_sort_treats_digit_runs_as_numbers() {
        let mut names = vec!["11084.pdf", "9156.pdf", "a10.png", "A2.png"];
        names.sort_by_key(|name| natural_sort_key(name));
        assert_eq!(names, vec!["9156.pdf", "11084.pdf", "A2.png", "a10.png"]);
    }

    #[test]
    fn natural_sort_orders_pages_within_a_document() {
        let mut names = vec![
            "13076.pdf_page10.png",
            "13076.pdf_page2.png",
            "13076.pdf_page1.png",
        ];
        names.sort_by_key(|name| natural_sort_key(name));
        assert_eq!(
            names,
            vec![
                "13076.pdf_page1.png",
                "13076.pdf_page2.png",
                "13076.pdf_page10.png"
            ]
        );
    }

    #[test]
    fn image_extension_is_case_insensitive() {
        assert_eq!(image_extension("scan.PNG"), Some("PNG"));
        assert_eq!(image_extension("scan.jpeg"), Some("jpeg"));
        assert_eq!(image_extension("report.pdf"), None);
        assert_eq!(image_extension("no_extension"), None);
    }

    #[test]
    fn write_json_pretty_replaces_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("out.json");

        write_json_pretty(&path, &serde_json::json!({"a": 1})).expect("first write");
        write_json_pretty(&path, &serde_json::json!({"b": 2})).expect("second write");

        let raw = fs::read_to_string(&path).expect("read back");
        assert_eq!(raw, "{\n  \"b\": 2\n}\n");
    }
}
