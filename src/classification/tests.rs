use std::fs;

use super::*;

fn record(only_images: u8, description: u8, heights: u8, rotate: u8) -> ClassificationRecord {
    ClassificationRecord {
        only_images,
        description_quality: description,
        heights_quality: heights,
        rotate,
    }
}

#[test]
fn page_key_splits_document_and_page() {
    let key = DocumentPageKey::parse("11709_part2.pdf_page2.png");
    assert_eq!(key.document_id, "11709_part2.pdf");
    assert_eq!(key.page_number, Some(2));

    let key = DocumentPageKey::parse("13076.pdf");
    assert_eq!(key.document_id, "13076.pdf");
    assert_eq!(key.page_number, None);
    assert_eq!(key.page_or_zero(), 0);
}

#[test]
fn document_id_ignores_page_suffix_renames() {
    let ids = [
        "doc.pdf_page1.png",
        "doc.pdf_page2.png",
        "doc.pdf_page17.png",
        "doc.pdf_page.png",
    ]
    .map(document_id);
    assert!(ids.iter().all(|id| *id == "doc.pdf"));
}

#[test]
fn page_key_uses_last_marker_occurrence() {
    let key = DocumentPageKey::parse("my_pages_report.pdf_page3.png");
    assert_eq!(key.document_id, "my_pages_report.pdf");
    assert_eq!(key.page_number, Some(3));
}

#[test]
fn non_numeric_page_suffix_counts_as_page_zero() {
    let key = DocumentPageKey::parse("doc.pdf_page2a.png");
    assert_eq!(key.document_id, "doc.pdf");
    assert_eq!(key.page_or_zero(), 0);
}

#[test]
fn dataset_document_name_maps_images_to_pdf_keys() {
    assert_eq!(
        dataset_document_name("13076.pdf_page1.png").as_deref(),
        Some("13076.pdf")
    );
    assert_eq!(dataset_document_name("13076_page1.png").as_deref(), Some("13076.pdf"));
    assert_eq!(dataset_document_name("13076.png").as_deref(), Some("13076.pdf"));
    assert_eq!(dataset_document_name("13076.pdf"), None);
}

#[test]
fn previous_page_defaults_are_inherited() {
    let table: ClassificationTable =
        [("doc_page1.png".to_string(), record(0, 5, 5, 0))].into_iter().collect();

    let defaults = resolve_defaults("doc_page2.png", &table);
    assert_eq!(
        defaults,
        ResolvedDefaults::Inherited {
            from: "doc_page1.png",
            record: record(0, 5, 5, 0),
        }
    );
    assert_eq!(defaults.record(), record(0, 5, 5, 0));
}

#[test]
fn resolver_picks_nearest_preceding_page() {
    let table: ClassificationTable = [
        ("doc.pdf_page1.png".to_string(), record(0, 1, 1, 0)),
        ("doc.pdf_page3.png".to_string(), record(0, 3, 3, 0)),
        ("doc.pdf_page7.png".to_string(), record(1, 5, 5, 1)),
        ("other.pdf_page4.png".to_string(), record(1, 4, 4, 1)),
        ("doc.pdf_page2.png".to_string(), record(0, 2, 2, 0)),
    ]
    .into_iter()
    .collect();

    let (from, found) = resolve_previous_page("doc.pdf_page5.png", &table).expect("candidate");
    assert_eq!(from, "doc.pdf_page3.png");
    assert_eq!(*found, record(0, 3, 3, 0));

    assert!(resolve_previous_page("doc.pdf_page1.png", &table).is_none());
    assert!(resolve_previous_page("fresh.pdf_page9.png", &table).is_none());
}

#[test]
fn resolved_page_is_strictly_earlier_with_no_closer_candidate() {
    let table: ClassificationTable = (1..=9)
        .filter(|page| page % 2 == 1)
        .map(|page| (format!("doc.pdf_page{page}.png"), record(0, 1, 1, 0)))
        .collect();

    for (current, _) in table.iter() {
        let current_page = DocumentPageKey::parse(current).page_or_zero();
        if let Some((from, _)) = resolve_previous_page(current, &table) {
            let found_page = DocumentPageKey::parse(from).page_or_zero();
            assert!(found_page < current_page);
            assert!(table.iter().all(|(other, _)| {
                let page = DocumentPageKey::parse(other).page_or_zero();
                !(page > found_page && page < current_page)
            }));
        }
    }
}

#[test]
fn existing_classification_wins_over_inherited_defaults() {
    let table: ClassificationTable = [
        ("doc_page1.png".to_string(), record(0, 5, 5, 0)),
        ("doc_page2.png".to_string(), record(1, 2, 3, 1)),
    ]
    .into_iter()
    .collect();

    assert_eq!(
        resolve_defaults("doc_page2.png", &table),
        ResolvedDefaults::Existing(record(1, 2, 3, 1))
    );
    assert_eq!(resolve_defaults("new_page1.png", &table), ResolvedDefaults::Fallback);
    assert_eq!(
        ResolvedDefaults::Fallback.record(),
        ClassificationRecord::default()
    );
}

#[test]
fn save_then_load_keeps_rows_and_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("image_classifications.csv");

    let mut table = ClassificationTable::new();
    table.insert("b.pdf_page1.png", record(1, 4, 3, 0));
    table.insert("a.pdf_page1.png", record(0, 5, 5, 1));
    table.insert("b.pdf_page1.png", record(1, 5, 3, 0));
    table.save(&path).expect("save");

    let raw = fs::read_to_string(&path).expect("read");
    assert_eq!(
        raw,
        "filename,only_images,description_quality,heights_quality,rotate\n\
         b.pdf_page1.png,1,5,3,0\n\
         a.pdf_page1.png,0,5,5,1\n"
    );

    let loaded = ClassificationTable::load(&path);
    assert_eq!(loaded, table);
}

#[test]
fn empty_table_still_writes_header() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("empty.csv");

    ClassificationTable::new().save(&path).expect("save");
    let raw = fs::read_to_string(&path).expect("read");
    assert_eq!(
        raw,
        "filename,only_images,description_quality,heights_quality,rotate\n"
    );
}

#[test]
fn missing_rotate_column_defaults_to_zero() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("legacy.csv");
    fs::write(
        &path,
        "filename,only_images,description_quality,heights_quality\nx_page1.png,1,2,3\n",
    )
    .expect("write");

    let table = ClassificationTable::read(&path).expect("read");
    assert_eq!(table.get("x_page1.png"), Some(&record(1, 2, 3, 0)));
}

#[test]
fn load_starts_empty_only_for_a_missing_file() {
    let dir = tempfile::tempdir().expect("tempdir");

    let missing = dir.path().join("missing.csv");
    assert!(ClassificationTable::load(&missing).is_empty());
    let err = ClassificationTable::read(&missing).expect_err("missing file");
    assert!(err.downcast_ref::<InputError>().is_some());
}

#[test]
fn load_keeps_bad_rows_aside_and_read_rejects_them() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("mixed.csv");
    fs::write(
        &path,
        "filename,only_images,description_quality,heights_quality,rotate\n\
         x.png,yes,2,3,0\n\
         y.png,0,9,3,0\n\
         z.png,1,2,3,0\n",
    )
    .expect("write");

    let err = ClassificationTable::read(&path).expect_err("strict read");
    assert!(format!("{err:#}").contains("malformed row 1"));

    let mut table = ClassificationTable::load(&path);
    assert_eq!(table.len(), 1);
    assert_eq!(table.preserved_rows(), 2);

    table.insert("y.png", record(0, 4, 3, 0));
    assert_eq!(table.preserved_rows(), 1);
    table.save(&path).expect("save");

    let raw = fs::read_to_string(&path).expect("read");
    assert_eq!(
        raw,
        "filename,only_images,description_quality,heights_quality,rotate\n\
         z.png,1,2,3,0\n\
         y.png,0,4,3,0\n\
         x.png,yes,2,3,0\n"
    );
}

#[test]
fn unreadable_file_is_backed_up_before_starting_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("image_classifications.csv");
    let raw = b"filename,only_images\n\xff\xfe,1\n".to_vec();
    fs::write(&path, &raw).expect("write");

    assert!(ClassificationTable::load(&path).is_empty());
    let backup = dir.path().join("image_classifications.csv.unreadable");
    assert_eq!(fs::read(backup).expect("backup"), raw);
}
