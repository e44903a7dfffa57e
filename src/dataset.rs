use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use crate::error::InputError;
use crate::ground_truth::SourceDocument;

/// Prediction dataset: PDF name -> extracted document, in file order.
pub type Dataset = Map<String, Value>;

pub fn load_dataset(path: &Path) -> Result<Dataset> {
    if !path.is_file() {
        return Err(InputError::not_found("prediction dataset", path).into());
    }

    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn source_document(dataset: &Dataset, document_name: &str) -> Result<Option<SourceDocument>> {
    dataset
        .get(document_name)
        .map(|value| {
            serde_json::from_value(value.clone())
                .with_context(|| format!("invalid prediction entry for {document_name}"))
        })
        .transpose()
}
