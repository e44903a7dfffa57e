use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::classification::{ClassificationTable, document_id};
use crate::cli::StatusArgs;
use crate::dataset::load_dataset;
use crate::ground_truth::{GROUND_TRUTH_DIR, GROUND_TRUTH_SUFFIX};
use crate::quality_filter::select_perfect_score;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelingStatus {
    pub classified_images: usize,
    pub classified_documents: usize,
    pub perfect_score_pages: usize,
    pub perfect_score_documents: usize,
    pub dataset_documents: Option<usize>,
    pub ground_truth_files: usize,
}

pub fn run(args: StatusArgs) -> Result<()> {
    let status = collect_status(&args)?;

    info!(
        classified_images = status.classified_images,
        classified_documents = status.classified_documents,
        perfect_score_pages = status.perfect_score_pages,
        perfect_score_documents = status.perfect_score_documents,
        "classification status"
    );
    if let Some(dataset_documents) = status.dataset_documents {
        info!(
            path = %args.predictions.display(),
            documents = dataset_documents,
            "prediction dataset status"
        );
    }
    info!(
        output_dir = %args.output_dir.display(),
        files = status.ground_truth_files,
        "ground truth status"
    );

    Ok(())
}

pub fn collect_status(args: &StatusArgs) -> Result<LabelingStatus> {
    let mut status = LabelingStatus::default();

    if args.classifications.is_file() {
        let table = ClassificationTable::load(&args.classifications);
        let documents: BTreeSet<&str> = table.iter().map(|(name, _)| document_id(name)).collect();

        status.classified_images = table.len();
        status.classified_documents = documents.len();
        status.perfect_score_pages = table
            .iter()
            .filter(|(_, record)| record.is_perfect_score())
            .count();
        status.perfect_score_documents = select_perfect_score(&table).len();
    } else {
        warn!(path = %args.classifications.display(), "classification table missing");
    }

    if args.predictions.is_file() {
        status.dataset_documents = Some(load_dataset(&args.predictions)?.len());
    } else {
        warn!(path = %args.predictions.display(), "prediction dataset missing");
    }

    let ground_truth_dir = args.output_dir.join(GROUND_TRUTH_DIR);
    if ground_truth_dir.is_dir() {
        status.ground_truth_files = count_ground_truth_files(&ground_truth_dir)?;
    } else {
        warn!(path = %ground_truth_dir.display(), "ground truth directory missing");
    }

    Ok(status)
}

fn count_ground_truth_files(dir: &Path) -> Result<usize> {
    let mut count = 0;
    for entry in fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))? {
        let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        let is_ground_truth = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(GROUND_TRUTH_SUFFIX));
        if is_ground_truth && entry.path().is_file() {
            count += 1;
        }
    }
    Ok(count)
}
