//! Per-run source indices keyed by item id.

use std::collections::HashMap;

use super::raw::{Bookshelf, NotebookEntry, ProgressEntry, ShelfEntry};
use super::record::MirrorRecord;

/// Existing mirrors keyed by item id.
pub type MirrorIndex = HashMap<String, MirrorRecord>;

/// All source data for one run, built once and then read only.
///
/// Absence from an index is meaningful: an item missing from `progress` has
/// no recorded progress at all, which is not the same as zero progress.
#[derive(Debug, Clone, Default)]
pub struct SourceIndex {
    pub progress: HashMap<String, ProgressEntry>,
    pub shelf: HashMap<String, ShelfEntry>,
    /// Shelf ids in listing order.
    pub shelf_order: Vec<String>,
    pub notebooks: HashMap<String, NotebookEntry>,
    /// Notebook ids in listing order.
    pub notebook_order: Vec<String>,
    /// Archive group name per item.
    pub archive: HashMap<String, String>,
    pub mirrors: MirrorIndex,
}

impl SourceIndex {
    /// Index the raw collaborator responses. Entries without an id are dropped.
    pub fn build(bookshelf: Bookshelf, notebooks: Vec<NotebookEntry>, mirrors: MirrorIndex) -> Self {
        let mut index = SourceIndex {
            mirrors,
            ..Default::default()
        };

        for entry in bookshelf.progress {
            if let Some(id) = entry.book_id.clone() {
                index.progress.insert(id, entry);
            }
        }

        for entry in bookshelf.books {
            if let Some(id) = entry.book_id.clone() {
                if index.shelf.insert(id.clone(), entry).is_none() {
                    index.shelf_order.push(id);
                }
            }
        }

        for entry in notebooks {
            if let Some(id) = entry.book_id.clone() {
                if index.notebooks.insert(id.clone(), entry).is_none() {
                    index.notebook_order.push(id);
                }
            }
        }

        // Later groups win when an item is listed twice.
        for group in bookshelf.archive {
            for id in group.book_ids {
                index.archive.insert(id, group.name.clone());
            }
        }

        index
    }

    /// Archive label for an item, if it belongs to a group.
    pub fn archive_label(&self, item_id: &str) -> Option<&str> {
        self.archive.get(item_id).map(String::as_str)
    }

    /// Best display title known before any detail call.
    pub fn title_of(&self, item_id: &str) -> String {
        self.shelf
            .get(item_id)
            .and_then(|e| e.title.clone())
            .or_else(|| {
                self.notebooks
                    .get(item_id)
                    .and_then(|n| n.book.as_ref())
                    .and_then(|b| b.title.clone())
            })
            .or_else(|| self.mirrors.get(item_id).and_then(|m| m.title.clone()))
            .unwrap_or_default()
    }
}
