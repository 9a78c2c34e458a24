//! Raw payloads as returned by the reading tracker.
//!
//! Every field is optional: the tracker omits keys freely and the engine must
//! tell "missing" apart from "zero".

use serde::{Deserialize, Serialize};

/// Result of the bookshelf call: progress, listing and archive groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Bookshelf {
    #[serde(rename = "bookProgress")]
    pub progress: Vec<ProgressEntry>,
    pub books: Vec<ShelfEntry>,
    pub archive: Vec<ArchiveGroup>,
}

/// Per-item progress summary from the bookshelf call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressEntry {
    pub book_id: Option<String>,
    pub progress: Option<f64>,
    pub reading_time: Option<i64>,
    pub update_time: Option<i64>,
}

/// One item of the shelf listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShelfEntry {
    pub book_id: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub cover: Option<String>,
}

/// A named shelf grouping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArchiveGroup {
    pub name: String,
    pub book_ids: Vec<String>,
}

/// One item of the notebook listing (items with annotations).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotebookEntry {
    pub book_id: Option<String>,
    pub note_count: Option<i64>,
    pub review_count: Option<i64>,
    pub book: Option<ShelfEntry>,
}

/// Category tag attached to an item's metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryTag {
    pub category_id: Option<i64>,
    pub title: Option<String>,
}

/// Rating block; `my_rating` is the user's own verdict.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RatingDetail {
    pub my_rating: Option<String>,
    pub title: Option<String>,
}

/// Detailed item metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemMetadata {
    pub book_id: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub cover: Option<String>,
    pub intro: Option<String>,
    pub publisher: Option<String>,
    pub categories: Option<Vec<CategoryTag>>,
    pub new_rating_detail: Option<RatingDetail>,
}

/// Per-item reading activity, with nested detail blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityDetail {
    pub book_id: Option<String>,
    pub marked_status: Option<i64>,
    pub reading_progress: Option<f64>,
    pub reading_time: Option<i64>,
    pub finished_date: Option<i64>,
    pub reading_book_date: Option<i64>,
    pub last_reading_date: Option<i64>,
    pub total_read_day: Option<i64>,
    pub new_rating_detail: Option<RatingDetail>,
    pub read_detail: Option<ReadDetail>,
    pub book_info: Option<ItemMetadata>,
}

/// Nested reading detail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReadDetail {
    pub total_reading_time: Option<i64>,
    pub total_read_day: Option<i64>,
    pub begin_reading_date: Option<i64>,
    pub last_reading_date: Option<i64>,
    pub data: Option<Vec<DailyRead>>,
}

/// Reading time recorded for one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRead {
    /// Epoch seconds of the day.
    pub read_date: i64,
    /// Seconds read that day.
    #[serde(default)]
    pub read_time: i64,
}
