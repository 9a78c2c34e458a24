//! Field derivation: pure functions from a merged record to display fields.

use chrono::{DateTime, FixedOffset};

use crate::config::{Icons, SyncDefaults, SyncOptions};
use crate::models::{DailyRead, PartialRecord, PersonalRating, ReadingStatus, TrackedItem};

/// Status from the tracker's mark and the recorded reading time.
///
/// Finished wins over everything; otherwise the reading time decides between
/// in-progress and want-to-read. Missing time counts as none.
pub fn derive_status(
    marked_status: Option<i64>,
    reading_time: Option<i64>,
    min_active_time: i64,
) -> ReadingStatus {
    if marked_status == Some(SyncDefaults::FINISHED_MARK) {
        ReadingStatus::Finished
    } else if reading_time.unwrap_or(0) >= min_active_time {
        ReadingStatus::InProgress
    } else {
        ReadingStatus::WantToRead
    }
}

/// Progress ratio in `[0, 1]`; finished items are always complete.
pub fn derive_progress(status: ReadingStatus, reading_progress: Option<f64>) -> f64 {
    if status == ReadingStatus::Finished {
        return 1.0;
    }
    let ratio = reading_progress.unwrap_or(0.0) / 100.0;
    if ratio.is_nan() {
        0.0
    } else {
        ratio.clamp(0.0, 1.0)
    }
}

/// Star label for a rating.
pub fn rating_stars(rating: PersonalRating) -> &'static str {
    match rating {
        PersonalRating::Poor => "⭐️",
        PersonalRating::Fair => "⭐️⭐️⭐️",
        PersonalRating::Good => "⭐️⭐️⭐️⭐️⭐️",
    }
}

/// Rating label: stars when rated, the unrated sentinel when finished without
/// a rating, nothing otherwise.
pub fn derive_rating_label(
    rating: Option<PersonalRating>,
    status: ReadingStatus,
    unrated_label: Option<&str>,
) -> Option<String> {
    match rating {
        Some(rating) => Some(rating_stars(rating).to_string()),
        None if status == ReadingStatus::Finished => unrated_label.map(str::to_string),
        None => None,
    }
}

/// First present timestamp of finish, last activity and shelving.
pub fn canonical_date(
    finished_date: Option<i64>,
    last_reading_date: Option<i64>,
    reading_book_date: Option<i64>,
) -> Option<i64> {
    [finished_date, last_reading_date, reading_book_date]
        .into_iter()
        .flatten()
        .find(|ts| *ts > 0)
}

/// Higher-resolution cover URL, or the default icon when the raw value is
/// not a usable absolute URL.
pub fn derive_cover_url(raw: Option<&str>) -> String {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Icons::BOOK.to_string();
    }

    let rewritten = raw.replace(
        SyncDefaults::LOW_RES_COVER_SEGMENT,
        SyncDefaults::HIGH_RES_COVER_SEGMENT,
    );
    match url::Url::parse(&rewritten) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {
            rewritten
        }
        _ => Icons::BOOK.to_string(),
    }
}

/// Epoch seconds to a calendar timestamp in `offset`.
pub fn to_local(timestamp: i64, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    DateTime::from_timestamp(timestamp, 0).map(|dt| dt.with_timezone(&offset))
}

/// All recorded reading days in ascending order, or the canonical date alone
/// when there are no daily records.
pub fn display_dates(
    daily: &[DailyRead],
    canonical: Option<i64>,
    offset: FixedOffset,
) -> Vec<DateTime<FixedOffset>> {
    if daily.is_empty() {
        return canonical.and_then(|ts| to_local(ts, offset)).into_iter().collect();
    }

    let mut days: Vec<i64> = daily.iter().map(|d| d.read_date).collect();
    days.sort_unstable();
    days.dedup();
    days.into_iter().filter_map(|ts| to_local(ts, offset)).collect()
}

impl TrackedItem {
    /// Derive every display field from a merged record.
    pub fn from_record(item_id: &str, record: PartialRecord, options: &SyncOptions) -> Self {
        let status = derive_status(
            record.marked_status,
            record.reading_time,
            options.min_active_time,
        );
        let progress_ratio = derive_progress(status, record.reading_progress);
        let rating_label =
            derive_rating_label(record.my_rating, status, options.unrated_label.as_deref());
        let date = canonical_date(
            record.finished_date,
            record.last_reading_date,
            record.reading_book_date,
        );
        let daily_reads = record.daily_reads.unwrap_or_default();
        let display_dates = display_dates(&daily_reads, date, options.utc_offset);
        let cover_url = derive_cover_url(record.cover.as_deref());

        TrackedItem {
            item_id: item_id.to_string(),
            title: record.title.unwrap_or_default(),
            author: record.author,
            isbn: record.isbn.filter(|s| !s.trim().is_empty()),
            intro: record.intro,
            categories: record.categories.unwrap_or_default(),
            category_label: record.shelf_category,
            progress_raw: record.reading_progress,
            reading_time: record.reading_time,
            active_day_count: record.total_read_day,
            personal_rating: record.my_rating,
            daily_reads,
            external_url: record.external_url,
            status,
            progress_ratio,
            rating_label,
            canonical_date: date.and_then(|ts| to_local(ts, options.utc_offset)),
            display_dates,
            cover_url,
        }
    }
}
