//! Change detection over the whole index.

use std::collections::BTreeSet;

use crate::models::SourceIndex;

/// Ids of mirrored items whose mirror already matches the fresh source.
///
/// A mirror is current when its reading time equals the fresh one (or the
/// item has no progress entry at all) and its shelf category equals the
/// item's archive label, with "no label" on both sides counting as equal.
pub fn detect_up_to_date(index: &SourceIndex) -> BTreeSet<String> {
    index
        .mirrors
        .iter()
        .filter(|(item_id, mirror)| {
            let time_matches = match index.progress.get(item_id.as_str()) {
                None => true,
                Some(fresh) => mirror.reading_time == fresh.reading_time,
            };
            let category_matches =
                mirror.shelf_category.as_deref() == index.archive_label(item_id);
            time_matches && category_matches
        })
        .map(|(item_id, _)| item_id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArchiveGroup, Bookshelf, MirrorIndex, MirrorRecord, ProgressEntry};

    fn mirror(id: &str, time: Option<i64>, category: Option<&str>) -> (String, MirrorRecord) {
        (
            id.to_string(),
            MirrorRecord {
                page_id: format!("page-{id}"),
                item_id: id.to_string(),
                reading_time: time,
                shelf_category: category.map(str::to_string),
                ..Default::default()
            },
        )
    }

    fn progress(id: &str, time: Option<i64>) -> ProgressEntry {
        ProgressEntry {
            book_id: Some(id.into()),
            reading_time: time,
            ..Default::default()
        }
    }

    fn index() -> SourceIndex {
        let bookshelf = Bookshelf {
            progress: vec![
                progress("same", Some(300)),
                progress("changed", Some(600)),
                progress("moved", Some(300)),
                progress("no-time", None),
            ],
            archive: vec![ArchiveGroup {
                name: "Science".into(),
                book_ids: vec!["same".into(), "changed".into(), "quiet".into()],
            }],
            ..Default::default()
        };
        let mirrors: MirrorIndex = [
            mirror("same", Some(300), Some("Science")),
            mirror("changed", Some(300), Some("Science")),
            mirror("moved", Some(300), Some("Science")),
            mirror("quiet", Some(10), Some("Science")),
            mirror("no-time", None, None),
        ]
        .into_iter()
        .collect();
        SourceIndex::build(bookshelf, vec![], mirrors)
    }

    #[test]
    fn test_detects_current_mirrors_only() {
        let current = detect_up_to_date(&index());
        let expected: BTreeSet<String> = ["no-time", "quiet", "same"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(current, expected);
    }

    #[test]
    fn test_detection_is_idempotent() {
        let index = index();
        assert_eq!(detect_up_to_date(&index), detect_up_to_date(&index));
    }

    #[test]
    fn test_no_mirrors_means_nothing_current() {
        let bookshelf = Bookshelf {
            progress: vec![progress("a", Some(1))],
            ..Default::default()
        };
        let index = SourceIndex::build(bookshelf, vec![], MirrorIndex::new());
        assert!(detect_up_to_date(&index).is_empty());
    }
}
