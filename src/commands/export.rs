use std::path::PathBuf;

use anyhow::Result;
use tracing::{info, warn};

use crate::cli::ExportArgs;
use crate::dataset::{load_dataset, source_document};
use crate::error::InputError;
use crate::ground_truth::{simplify, write_ground_truth};

pub fn run(args: ExportArgs) -> Result<()> {
    let dataset = load_dataset(&args.predictions)?;

    let document_names: Vec<String> = match &args.document {
        Some(name) if !dataset.contains_key(name) => {
            return Err(InputError::not_found("dataset document", PathBuf::from(name)).into());
        }
        Some(name) => vec![name.clone()],
        None => dataset.keys().cloned().collect(),
    };

    let mut written = 0_usize;
    let mut failed = 0_usize;
    for name in &document_names {
        let exported = source_document(&dataset, name).and_then(|source| {
            let boreholes = simplify(&source.unwrap_or_default());
            write_ground_truth(&args.output_dir, name, &boreholes)
        });

        match exported {
            Ok(path) => {
                written += 1;
                info!(document = %name, path = %path.display(), "wrote ground truth");
            }
            Err(err) => {
                failed += 1;
                warn!(
                    document = %name,
                    error = %format!("{err:#}"),
                    "failed to export ground truth"
                );
            }
        }
    }

    info!(
        documents = document_names.len(),
        written,
        failed,
        output_dir = %args.output_dir.display(),
        "ground truth export complete"
    );
    Ok(())
}
