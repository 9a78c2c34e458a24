//! Source merging: several partial views of one item into one record.
//!
//! Override order, later wins field by field:
//!
//! 1. existing mirror (stale, but holds curated fields like the catalogue link)
//! 2. shelf-listing entry
//! 3. archive (shelf category) label
//! 4. detailed item metadata
//! 5. activity detail, with `read_detail` and then `book_info` lifted one
//!    level before the overlay
//!
//! The notebook listing contributes membership only and never reaches here.

use crate::models::{
    ActivityDetail, ItemMetadata, MirrorRecord, PartialRecord, PersonalRating, RatingDetail,
    ReadDetail, ShelfEntry,
};

/// The optional views available for one item.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeInputs<'a> {
    pub mirror: Option<&'a MirrorRecord>,
    pub shelf_entry: Option<&'a ShelfEntry>,
    pub shelf_label: Option<&'a str>,
    pub metadata: Option<&'a ItemMetadata>,
    pub activity: Option<&'a ActivityDetail>,
}

/// Merge every available view of an item.
///
/// The shelf category is taken from the archive index alone: that index is
/// complete, so an item in no group has no category even if its mirror
/// still carries one.
pub fn merge_sources(inputs: MergeInputs<'_>) -> PartialRecord {
    let mut merged = PartialRecord::default();

    if let Some(mirror) = inputs.mirror {
        merged = merged.overlay(from_mirror(mirror));
    }
    if let Some(entry) = inputs.shelf_entry {
        merged = merged.overlay(from_shelf_entry(entry));
    }
    if let Some(metadata) = inputs.metadata {
        merged = merged.overlay(from_metadata(metadata));
    }
    if let Some(activity) = inputs.activity {
        merged = merged.overlay(flatten_activity(activity));
    }

    PartialRecord {
        shelf_category: inputs.shelf_label.map(str::to_string),
        ..merged
    }
}

/// Fields of a mirror that feed the merge.
pub fn from_mirror(mirror: &MirrorRecord) -> PartialRecord {
    PartialRecord {
        title: mirror.title.clone(),
        reading_time: mirror.reading_time,
        shelf_category: mirror.shelf_category.clone(),
        cover: mirror.cover.clone(),
        external_url: mirror.external_url.clone(),
        ..Default::default()
    }
}

pub fn from_shelf_entry(entry: &ShelfEntry) -> PartialRecord {
    PartialRecord {
        title: entry.title.clone(),
        author: entry.author.clone(),
        cover: entry.cover.clone(),
        ..Default::default()
    }
}

pub fn from_metadata(metadata: &ItemMetadata) -> PartialRecord {
    let categories = metadata.categories.as_ref().map(|tags| {
        tags.iter()
            .filter_map(|t| t.title.clone())
            .filter(|t| !t.trim().is_empty())
            .collect::<Vec<_>>()
    });

    PartialRecord {
        title: metadata.title.clone(),
        author: metadata.author.clone(),
        isbn: metadata.isbn.clone(),
        cover: metadata.cover.clone(),
        intro: metadata.intro.clone(),
        categories,
        my_rating: rating_of(metadata.new_rating_detail.as_ref()),
        ..Default::default()
    }
}

fn from_read_detail(detail: &ReadDetail) -> PartialRecord {
    PartialRecord {
        total_read_day: detail.total_read_day,
        begin_reading_date: detail.begin_reading_date,
        last_reading_date: detail.last_reading_date,
        daily_reads: detail.data.clone().filter(|days| !days.is_empty()),
        ..Default::default()
    }
}

/// Lift the nested blocks of an activity record to the top level.
pub fn flatten_activity(activity: &ActivityDetail) -> PartialRecord {
    let top = PartialRecord {
        marked_status: activity.marked_status,
        reading_progress: activity.reading_progress,
        reading_time: activity.reading_time,
        finished_date: activity.finished_date,
        reading_book_date: activity.reading_book_date,
        last_reading_date: activity.last_reading_date,
        total_read_day: activity.total_read_day,
        my_rating: rating_of(activity.new_rating_detail.as_ref()),
        ..Default::default()
    };

    let with_detail = match &activity.read_detail {
        Some(detail) => top.overlay(from_read_detail(detail)),
        None => top,
    };
    match &activity.book_info {
        Some(info) => with_detail.overlay(from_metadata(info)),
        None => with_detail,
    }
}

fn rating_of(detail: Option<&RatingDetail>) -> Option<PersonalRating> {
    detail
        .and_then(|d| d.my_rating.as_deref())
        .and_then(PersonalRating::from_raw)
}
