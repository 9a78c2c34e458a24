//! Merged and derived records.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::raw::DailyRead;

/// Derived reading status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingStatus {
    WantToRead,
    InProgress,
    Finished,
}

impl ReadingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingStatus::WantToRead => "want_to_read",
            ReadingStatus::InProgress => "in_progress",
            ReadingStatus::Finished => "finished",
        }
    }
}

impl std::fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The user's own rating of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonalRating {
    Poor,
    Fair,
    Good,
}

impl PersonalRating {
    /// Parse the tracker's rating value. Unknown values are treated as unrated.
    pub fn from_raw(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "poor" => Some(PersonalRating::Poor),
            "fair" => Some(PersonalRating::Fair),
            "good" => Some(PersonalRating::Good),
            _ => None,
        }
    }
}

/// A partial view of one item. Every field is tagged with presence.
///
/// Records are combined with [`PartialRecord::overlay`]; nothing mutates a
/// record in place once it has been built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialRecord {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub cover: Option<String>,
    pub intro: Option<String>,
    pub categories: Option<Vec<String>>,
    pub shelf_category: Option<String>,
    pub marked_status: Option<i64>,
    pub reading_progress: Option<f64>,
    pub reading_time: Option<i64>,
    pub total_read_day: Option<i64>,
    pub my_rating: Option<PersonalRating>,
    pub finished_date: Option<i64>,
    pub last_reading_date: Option<i64>,
    pub reading_book_date: Option<i64>,
    pub begin_reading_date: Option<i64>,
    pub daily_reads: Option<Vec<DailyRead>>,
    pub external_url: Option<String>,
}

impl PartialRecord {
    /// Combine two views field by field; values present in `newer` win.
    pub fn overlay(self, newer: PartialRecord) -> PartialRecord {
        PartialRecord {
            title: newer.title.or(self.title),
            author: newer.author.or(self.author),
            isbn: newer.isbn.or(self.isbn),
            cover: newer.cover.or(self.cover),
            intro: newer.intro.or(self.intro),
            categories: newer.categories.or(self.categories),
            shelf_category: newer.shelf_category.or(self.shelf_category),
            marked_status: newer.marked_status.or(self.marked_status),
            reading_progress: newer.reading_progress.or(self.reading_progress),
            reading_time: newer.reading_time.or(self.reading_time),
            total_read_day: newer.total_read_day.or(self.total_read_day),
            my_rating: newer.my_rating.or(self.my_rating),
            finished_date: newer.finished_date.or(self.finished_date),
            last_reading_date: newer.last_reading_date.or(self.last_reading_date),
            reading_book_date: newer.reading_book_date.or(self.reading_book_date),
            begin_reading_date: newer.begin_reading_date.or(self.begin_reading_date),
            daily_reads: newer.daily_reads.or(self.daily_reads),
            external_url: newer.external_url.or(self.external_url),
        }
    }
}

/// A previously written counterpart in the document database.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MirrorRecord {
    /// Opaque handle for update-in-place.
    pub page_id: String,
    pub item_id: String,
    pub title: Option<String>,
    pub reading_time: Option<i64>,
    pub shelf_category: Option<String>,
    pub cover: Option<String>,
    pub status_label: Option<String>,
    pub rating_label: Option<String>,
    pub external_url: Option<String>,
}

/// A fully merged item with its derived display fields.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedItem {
    pub item_id: String,
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub intro: Option<String>,
    pub categories: Vec<String>,
    pub category_label: Option<String>,
    pub progress_raw: Option<f64>,
    pub reading_time: Option<i64>,
    pub active_day_count: Option<i64>,
    pub personal_rating: Option<PersonalRating>,
    pub daily_reads: Vec<DailyRead>,
    pub external_url: Option<String>,
    pub status: ReadingStatus,
    pub progress_ratio: f64,
    pub rating_label: Option<String>,
    pub canonical_date: Option<DateTime<FixedOffset>>,
    pub display_dates: Vec<DateTime<FixedOffset>>,
    pub cover_url: String,
}

/// Identity fields written only when a mirror is first created.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemIdentity {
    pub title: String,
    pub item_id: String,
    pub isbn: Option<String>,
    pub link: Option<String>,
}

/// Wire-neutral field set for one mirror write.
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorFields {
    pub identity: Option<ItemIdentity>,
    /// Written even when `None`, which clears a stale value.
    pub category: Option<String>,
    pub status: ReadingStatus,
    pub progress: f64,
    pub reading_time: Option<i64>,
    pub read_days: Option<i64>,
    pub rating_label: Option<String>,
    pub date: Option<DateTime<FixedOffset>>,
    pub external_url: Option<String>,
    pub author_ids: Vec<String>,
    pub category_ids: Vec<String>,
    pub calendar_ids: Vec<String>,
}

impl MirrorFields {
    /// Build the field set for an item; relation ids start empty.
    pub fn from_item(item: &TrackedItem, identity: Option<ItemIdentity>) -> Self {
        Self {
            identity,
            category: item.category_label.clone(),
            status: item.status,
            progress: item.progress_ratio,
            reading_time: item.reading_time,
            read_days: item.active_day_count,
            rating_label: item.rating_label.clone(),
            date: item.canonical_date,
            external_url: item.external_url.clone(),
            author_ids: Vec::new(),
            category_ids: Vec::new(),
            calendar_ids: Vec::new(),
        }
    }
}

/// An existing per-day activity entry linked to a mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyActivityEntry {
    pub entry_id: String,
    pub timestamp: i64,
    pub duration: Option<i64>,
}
