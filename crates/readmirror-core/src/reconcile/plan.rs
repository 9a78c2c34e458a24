//! Work-set planning.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::models::SourceIndex;

/// One item the dispatcher will write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedItem {
    pub item_id: String,
    /// Display title from the listings; empty when unknown.
    pub title: String,
}

/// Ordered work set plus what was skipped and why.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncPlan {
    pub work: Vec<PlannedItem>,
    pub skipped_up_to_date: Vec<String>,
    pub skipped_low_activity: Vec<String>,
}

impl SyncPlan {
    /// Number of candidates considered, written or not.
    pub fn total_candidates(&self) -> usize {
        self.work.len() + self.skipped_up_to_date.len() + self.skipped_low_activity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.work.is_empty()
    }
}

/// Select the items to write this run.
///
/// Candidates are the shelf listing in order, then annotated items not on the
/// shelf. Current mirrors are dropped first, then items whose recorded reading
/// time is below `min_active_time`. Items with no recorded time are kept.
pub fn plan_sync(
    index: &SourceIndex,
    no_sync: &BTreeSet<String>,
    min_active_time: i64,
) -> SyncPlan {
    let mut seen = HashSet::new();
    let mut plan = SyncPlan::default();

    let candidates = index
        .shelf_order
        .iter()
        .chain(index.notebook_order.iter())
        .filter(|id| seen.insert(*id));

    for item_id in candidates {
        if no_sync.contains(item_id) {
            plan.skipped_up_to_date.push(item_id.clone());
            continue;
        }

        let reading_time = index.progress.get(item_id).and_then(|p| p.reading_time);
        if matches!(reading_time, Some(time) if time < min_active_time) {
            plan.skipped_low_activity.push(item_id.clone());
            continue;
        }

        plan.work.push(PlannedItem {
            item_id: item_id.clone(),
            title: index.title_of(item_id),
        });
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bookshelf, MirrorIndex, NotebookEntry, ProgressEntry, ShelfEntry};

    fn shelf(id: &str) -> ShelfEntry {
        ShelfEntry {
            book_id: Some(id.into()),
            title: Some(format!("Title {id}")),
            ..Default::default()
        }
    }

    fn notebook(id: &str) -> NotebookEntry {
        NotebookEntry {
            book_id: Some(id.into()),
            ..Default::default()
        }
    }

    fn progress(id: &str, time: Option<i64>) -> ProgressEntry {
        ProgressEntry {
            book_id: Some(id.into()),
            reading_time: time,
            ..Default::default()
        }
    }

    #[test]
    fn test_plan_orders_shelf_then_new_notebook_ids() {
        let bookshelf = Bookshelf {
            books: vec![shelf("s2"), shelf("s1")],
            ..Default::default()
        };
        let notebooks = vec![notebook("s1"), notebook("n1")];
        let index = SourceIndex::build(bookshelf, notebooks, MirrorIndex::new());

        let plan = plan_sync(&index, &BTreeSet::new(), 60);
        let ids: Vec<&str> = plan.work.iter().map(|p| p.item_id.as_str()).collect();
        assert_eq!(ids, vec!["s2", "s1", "n1"]);
        assert_eq!(plan.work[0].title, "Title s2");
        assert_eq!(plan.work[2].title, "");
    }

    #[test]
    fn test_plan_applies_both_exclusions() {
        let bookshelf = Bookshelf {
            progress: vec![
                progress("low", Some(30)),
                progress("edge", Some(60)),
                progress("untimed", None),
            ],
            books: vec![shelf("current"), shelf("low"), shelf("edge"), shelf("untimed")],
            ..Default::default()
        };
        let notebooks = vec![notebook("fresh")];
        let index = SourceIndex::build(bookshelf, notebooks, MirrorIndex::new());
        let no_sync: BTreeSet<String> = ["current".to_string()].into_iter().collect();

        let plan = plan_sync(&index, &no_sync, 60);
        let ids: Vec<&str> = plan.work.iter().map(|p| p.item_id.as_str()).collect();

        assert_eq!(ids, vec!["edge", "untimed", "fresh"]);
        assert_eq!(plan.skipped_up_to_date, vec!["current".to_string()]);
        assert_eq!(plan.skipped_low_activity, vec!["low".to_string()]);
        assert_eq!(plan.total_candidates(), 5);
    }

    #[test]
    fn test_work_set_excludes_no_sync_members() {
        let bookshelf = Bookshelf {
            books: (0..20).map(|i| shelf(&format!("b{i}"))).collect(),
            ..Default::default()
        };
        let index = SourceIndex::build(bookshelf, vec![], MirrorIndex::new());
        let no_sync: BTreeSet<String> = (0..20).step_by(3).map(|i| format!("b{i}")).collect();

        let plan = plan_sync(&index, &no_sync, 60);
        assert!(plan.work.iter().all(|p| !no_sync.contains(&p.item_id)));
        assert_eq!(plan.work.len() + no_sync.len(), 20);
    }
}
