use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{info, warn};

use crate::classification::ClassificationTable;
use crate::cli::FilterArgs;
use crate::dataset::load_dataset;
use crate::model::{CopiedArtifactEntry, CopyFailureEntry, CopyReportManifest};
use crate::quality_filter::{
    ArtifactCopyReport, copy_artifacts, filter_dataset, select_perfect_score,
};
use crate::util::{now_utc_string, sha256_file, write_json_pretty};

const DEFAULT_ARTIFACT_DEST: &str = "data/output/filtered_pdfs";
const COPY_REPORT_FILE: &str = "copy_report.json";

pub fn run(args: FilterArgs) -> Result<()> {
    let table = ClassificationTable::read(&args.classifications)?;
    let dataset = load_dataset(&args.predictions)?;

    let selected = select_perfect_score(&table);
    info!(
        classified = table.len(),
        documents = selected.len(),
        "found documents with perfect scores (5/5)"
    );
    for name in &selected {
        info!(document = %name, "perfect score");
    }

    let filtered = filter_dataset(&dataset, &selected);
    write_json_pretty(&args.output, &filtered)?;
    info!(
        original = dataset.len(),
        kept = filtered.len(),
        path = %args.output.display(),
        "wrote filtered predictions"
    );
    for name in selected.iter().filter(|name| !filtered.contains_key(name.as_str())) {
        warn!(document = %name, "perfect-score document has no prediction entry");
    }

    if let Some(source_dir) = &args.artifact_source {
        let dest_dir = args
            .artifact_dest
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ARTIFACT_DEST));
        let report = copy_artifacts(&selected, source_dir, &dest_dir)?;
        let manifest = build_copy_manifest(&report, source_dir, &dest_dir, selected.len())?;
        let manifest_path = dest_dir.join(COPY_REPORT_FILE);
        write_json_pretty(&manifest_path, &manifest)?;

        info!(
            copied = report.copied.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            report = %manifest_path.display(),
            "artifact copy complete"
        );
    }

    Ok(())
}

fn build_copy_manifest(
    report: &ArtifactCopyReport,
    source_dir: &Path,
    dest_dir: &Path,
    document_count: usize,
) -> Result<CopyReportManifest> {
    let copied = report
        .copied
        .iter()
        .map(|filename| {
            Ok(CopiedArtifactEntry {
                filename: filename.clone(),
                sha256: sha256_file(&dest_dir.join(filename))?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CopyReportManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        source_directory: source_dir.display().to_string(),
        destination_directory: dest_dir.display().to_string(),
        document_count,
        copied,
        skipped: report.skipped.clone(),
        failed: report
            .failed
            .iter()
            .map(|failure| CopyFailureEntry {
                filename: failure.filename.clone(),
                reason: failure.reason.clone(),
            })
            .collect(),
    })
}
