use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "borehole-label",
    version,
    about = "Labeling utilities for borehole-profile document images"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    ListFiles(ListFilesArgs),
    Classify(ClassifyArgs),
    Filter(FilterArgs),
    Edit(EditArgs),
    Export(ExportArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ListFilesArgs {
    #[arg(default_value = "data/output/draw")]
    pub input_dir: PathBuf,

    #[arg(default_value = "filenames.csv")]
    pub output_file: PathBuf,

    /// natural | alphabetical | none | modification_time
    #[arg(long, default_value = "natural")]
    pub sort: String,
}

#[derive(Args, Debug, Clone)]
pub struct ClassifyArgs {
    #[arg(default_value = "data/output/draw")]
    pub image_dir: PathBuf,

    #[arg(default_value = "image_classifications.csv")]
    pub output_csv: PathBuf,

    #[arg(long, default_value_t = false)]
    pub no_open: bool,
}

#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    #[arg(default_value = "image_classifications.csv")]
    pub classifications: PathBuf,

    #[arg(default_value = "data/output/predictions.json")]
    pub predictions: PathBuf,

    #[arg(default_value = "data/output/predictions_filtered.json")]
    pub output: PathBuf,

    pub artifact_source: Option<PathBuf>,

    pub artifact_dest: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    pub predictions: PathBuf,

    /// Dataset document name (`x.pdf`) or one of its page images (`x.pdf_page1.png`).
    pub document: String,

    #[arg(long, default_value = "data/output")]
    pub output_dir: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    pub predictions: PathBuf,

    #[arg(default_value = "data/output")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub document: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(default_value = "image_classifications.csv")]
    pub classifications: PathBuf,

    #[arg(long, default_value = "data/output/predictions.json")]
    pub predictions: PathBuf,

    #[arg(long, default_value = "data/output")]
    pub output_dir: PathBuf,
}
