use serde::{Deserialize, Serialize};

pub const CLASSIFICATION_HEADER: [&str; 5] = [
    "filename",
    "only_images",
    "description_quality",
    "heights_quality",
    "rotate",
];

pub const MAX_QUALITY: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClassificationRecord {
    pub only_images: u8,
    pub description_quality: u8,
    pub heights_quality: u8,
    pub rotate: u8,
}

impl ClassificationRecord {
    pub fn is_valid(&self) -> bool {
        self.only_images <= 1
            && self.description_quality <= MAX_QUALITY
            && self.heights_quality <= MAX_QUALITY
            && self.rotate <= 1
    }

    pub fn is_perfect_score(&self) -> bool {
        self.description_quality == MAX_QUALITY && self.heights_quality == MAX_QUALITY
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRow {
    pub filename: String,
    pub only_images: u8,
    pub description_quality: u8,
    pub heights_quality: u8,
    #[serde(default)]
    pub rotate: u8,
}

impl ClassificationRow {
    pub fn new(filename: &str, record: &ClassificationRecord) -> Self {
        Self {
            filename: filename.to_string(),
            only_images: record.only_images,
            description_quality: record.description_quality,
            heights_quality: record.heights_quality,
            rotate: record.rotate,
        }
    }

    pub fn into_parts(self) -> (String, ClassificationRecord) {
        (
            self.filename,
            ClassificationRecord {
                only_images: self.only_images,
                description_quality: self.description_quality,
                heights_quality: self.heights_quality,
                rotate: self.rotate,
            },
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileListingRow<'a> {
    pub filename: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopiedArtifactEntry {
    pub filename: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyFailureEntry {
    pub filename: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyReportManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_directory: String,
    pub destination_directory: String,
    pub document_count: usize,
    pub copied: Vec<CopiedArtifactEntry>,
    pub skipped: Vec<String>,
    pub failed: Vec<CopyFailureEntry>,
}
