use crate::classification::{ClassificationTable, DocumentPageKey};
use crate::model::ClassificationRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedDefaults<'t> {
    Existing(ClassificationRecord),
    Inherited {
        from: &'t str,
        record: ClassificationRecord,
    },
    Fallback,
}

impl ResolvedDefaults<'_> {
    pub fn record(&self) -> ClassificationRecord {
        match self {
            Self::Existing(record) | Self::Inherited { record, .. } => *record,
            Self::Fallback => ClassificationRecord::default(),
        }
    }
}

/// Nearest preceding classified page of the same document, if any.
pub fn resolve_previous_page<'t>(
    current_filename: &str,
    table: &'t ClassificationTable,
) -> Option<(&'t str, &'t ClassificationRecord)> {
    let current = DocumentPageKey::parse(current_filename);
    let current_page = current.page_or_zero();

    table
        .iter()
        .filter_map(|(filename, record)| {
            let key = DocumentPageKey::parse(filename);
            (key.document_id == current.document_id && key.page_or_zero() < current_page)
                .then(|| (key.page_or_zero(), filename, record))
        })
        .max_by_key(|(page, _, _)| *page)
        .map(|(_, filename, record)| (filename, record))
}

pub fn resolve_defaults<'t>(
    current_filename: &str,
    table: &'t ClassificationTable,
) -> ResolvedDefaults<'t> {
    if let Some(existing) = table.get(current_filename) {
        return ResolvedDefaults::Existing(*existing);
    }

    match resolve_previous_page(current_filename, table) {
        Some((from, record)) => ResolvedDefaults::Inherited {
            from,
            record: *record,
        },
        None => ResolvedDefaults::Fallback,
    }
}
