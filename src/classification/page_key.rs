use std::sync::LazyLock;

use regex::Regex;

use crate::util::image_extension;

static PAGE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(?<document>.*)_page(?:(?<page>\d+)(?:\.|$))?")
        .expect("page key pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentPageKey<'a> {
    pub document_id: &'a str,
    pub page_number: Option<u32>,
}

impl<'a> DocumentPageKey<'a> {
    pub fn parse(filename: &'a str) -> Self {
        let Some(captures) = PAGE_KEY.captures(filename) else {
            return Self {
                document_id: filename,
                page_number: None,
            };
        };

        let document_id = captures
            .name("document")
            .map(|value| value.as_str())
            .unwrap_or(filename);
        let page_number = captures
            .name("page")
            .and_then(|value| value.as_str().parse::<u32>().ok());

        Self {
            document_id,
            page_number,
        }
    }

    pub fn page_or_zero(&self) -> u32 {
        self.page_number.unwrap_or(0)
    }
}

pub fn document_id(filename: &str) -> &str {
    DocumentPageKey::parse(filename).document_id
}

/// Maps a page image name to the PDF name that keys the prediction dataset,
/// e.g. `11709_part2.pdf_page2.png` -> `11709_part2.pdf`.
pub fn dataset_document_name(image_filename: &str) -> Option<String> {
    let extension = image_extension(image_filename)?;
    let stem = &image_filename[..image_filename.len() - extension.len() - 1];

    let mut name = DocumentPageKey::parse(stem).document_id.to_string();
    if !name.ends_with(".pdf") {
        name.push_str(".pdf");
    }
    Some(name)
}
