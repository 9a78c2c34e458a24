//! Centralized configuration for readmirror.
//!
//! Compile-time constants for network behaviour and sync thresholds, plus the
//! runtime options and property schema that a run is configured with.

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    pub const USER_AGENT: &'static str =
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) readmirror/0.3";
    pub const MAX_RETRIES: u32 = 3;
    pub const RETRY_DELAY: Duration = Duration::from_secs(5);
    pub const WEREAD_BASE: &'static str = "https://weread.qq.com";
    pub const NOTION_API_BASE: &'static str = "https://api.notion.com/v1";
    pub const NOTION_VERSION: &'static str = "2022-06-28";
    pub const NOTION_PAGE_SIZE: u32 = 100;
    pub const NOTION_TEXT_LIMIT: usize = 2000;
    pub const NEODB_API_BASE: &'static str = "https://neodb.social/api";
}

/// Thresholds and fixed values used by the reconciliation engine.
pub struct SyncDefaults;

impl SyncDefaults {
    /// Marked-status value the tracker uses for a finished item.
    pub const FINISHED_MARK: i64 = 4;
    /// Minimum reading time (tracker units, seconds) for an item to count as read.
    pub const MIN_ACTIVE_TIME: i64 = 60;
    /// Tracker home time zone, UTC+8.
    pub const UTC_OFFSET_SECS: i32 = 8 * 3600;
    pub const UNRATED_LABEL: &'static str = "未评分";
    pub const LOW_RES_COVER_SEGMENT: &'static str = "/s_";
    pub const HIGH_RES_COVER_SEGMENT: &'static str = "/t7_";
}

/// Icons used for pages created in the document database.
pub struct Icons;

impl Icons {
    pub const BOOK: &'static str = "https://www.notion.so/icons/book_gray.svg";
    pub const TAG: &'static str = "https://www.notion.so/icons/tag_gray.svg";
    pub const USER: &'static str = "https://www.notion.so/icons/user-circle-filled_gray.svg";
    pub const CALENDAR: &'static str = "https://www.notion.so/icons/calendar_gray.svg";
    pub const TARGET: &'static str = "https://www.notion.so/icons/target_red.svg";
}

/// Runtime options for one sync run.
///
/// The enrichment paths are explicit toggles and all start disabled.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Items with recorded reading time below this are skipped.
    pub min_active_time: i64,
    /// Offset used to turn activity timestamps into calendar days.
    pub utc_offset: FixedOffset,
    /// Label for finished items without a personal rating. `None` leaves it unset.
    pub unrated_label: Option<String>,
    /// Look up an external catalogue link for newly mirrored items.
    pub catalogue_lookup: bool,
    /// Upsert one entry per recorded reading day.
    pub daily_activity: bool,
    /// Link author and category relation pages for newly mirrored items.
    pub link_relations: bool,
    /// Link calendar-day relation pages when daily records exist.
    pub link_calendar: bool,
    /// Plan only, never write.
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            min_active_time: SyncDefaults::MIN_ACTIVE_TIME,
            utc_offset: default_offset(),
            unrated_label: Some(SyncDefaults::UNRATED_LABEL.to_string()),
            catalogue_lookup: false,
            daily_activity: false,
            link_relations: false,
            link_calendar: false,
            dry_run: false,
        }
    }
}

impl SyncOptions {
    /// Create options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum reading time gate.
    pub fn with_min_active_time(mut self, value: i64) -> Self {
        self.min_active_time = value;
        self
    }

    /// Set the calendar offset from whole hours east of UTC.
    ///
    /// Out-of-range values fall back to the tracker's home zone.
    pub fn with_utc_offset_hours(mut self, hours: i32) -> Self {
        self.utc_offset = FixedOffset::east_opt(hours * 3600).unwrap_or_else(default_offset);
        self
    }

    /// Set the label used for finished items without a rating.
    pub fn with_unrated_label(mut self, label: Option<String>) -> Self {
        self.unrated_label = label;
        self
    }

    /// Enable or disable the catalogue lookup.
    pub fn with_catalogue_lookup(mut self, enable: bool) -> Self {
        self.catalogue_lookup = enable;
        self
    }

    /// Enable or disable per-day activity upserts.
    pub fn with_daily_activity(mut self, enable: bool) -> Self {
        self.daily_activity = enable;
        self
    }

    /// Enable or disable author/category relation linking.
    pub fn with_link_relations(mut self, enable: bool) -> Self {
        self.link_relations = enable;
        self
    }

    /// Enable or disable calendar-day relation linking.
    pub fn with_link_calendar(mut self, enable: bool) -> Self {
        self.link_calendar = enable;
        self
    }

    /// Enable or disable dry-run mode.
    pub fn with_dry_run(mut self, enable: bool) -> Self {
        self.dry_run = enable;
        self
    }
}

fn default_offset() -> FixedOffset {
    FixedOffset::east_opt(SyncDefaults::UTC_OFFSET_SECS).unwrap_or(Utc.fix())
}

/// How a choice-valued property is stored in the book database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceKind {
    Select,
    Status,
}

/// Property names of the book database.
///
/// Defaults follow the widely used WeRead book template. Any field can be
/// overridden from a JSON file; missing keys keep their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorSchema {
    pub title: String,
    pub item_id: String,
    pub isbn: String,
    pub link: String,
    pub category: String,
    pub status: String,
    pub status_kind: ChoiceKind,
    pub progress: String,
    pub reading_time: String,
    pub read_days: String,
    pub rating: String,
    pub date: String,
    pub kind: String,
    pub kind_value: String,
    pub external_url: String,
    pub authors: String,
    pub categories: String,
    pub calendar: String,
    pub status_labels: StatusLabels,
    pub daily: DailySchema,
}

impl Default for MirrorSchema {
    fn default() -> Self {
        Self {
            title: "标题".into(),
            item_id: "BookId".into(),
            isbn: "ISBN".into(),
            link: "链接".into(),
            category: "书架分类".into(),
            status: "阅读状态".into(),
            status_kind: ChoiceKind::Select,
            progress: "阅读进度".into(),
            reading_time: "阅读时长".into(),
            read_days: "阅读天数".into(),
            rating: "我的评分".into(),
            date: "时间".into(),
            kind: "类型".into(),
            kind_value: "书籍".into(),
            external_url: "豆瓣链接".into(),
            authors: "作者".into(),
            categories: "分类".into(),
            calendar: "日期".into(),
            status_labels: StatusLabels::default(),
            daily: DailySchema::default(),
        }
    }
}

/// Display labels for the derived reading status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusLabels {
    pub want_to_read: String,
    pub in_progress: String,
    pub finished: String,
}

impl Default for StatusLabels {
    fn default() -> Self {
        Self {
            want_to_read: "想读".into(),
            in_progress: "在读".into(),
            finished: "阅读完".into(),
        }
    }
}

/// Property names of the daily-activity database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailySchema {
    pub title: String,
    pub date: String,
    pub duration: String,
    pub timestamp: String,
    pub item: String,
}

impl Default for DailySchema {
    fn default() -> Self {
        Self {
            title: "标题".into(),
            date: "日期".into(),
            duration: "时长".into(),
            timestamp: "时间戳".into(),
            item: "书架".into(),
        }
    }
}

/// Connection settings for the document database.
#[derive(Debug, Clone)]
pub struct NotionSettings {
    pub token: String,
    pub book_database_id: String,
    pub read_database_id: Option<String>,
    pub author_database_id: Option<String>,
    pub category_database_id: Option<String>,
    pub calendar_database_id: Option<String>,
    pub schema: MirrorSchema,
}

impl NotionSettings {
    /// Create settings for the book database with every optional database unset.
    pub fn new(token: impl Into<String>, book_database_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            book_database_id: book_database_id.into(),
            read_database_id: None,
            author_database_id: None,
            category_database_id: None,
            calendar_database_id: None,
            schema: MirrorSchema::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_disable_enrichment() {
        let options = SyncOptions::default();
        assert_eq!(options.min_active_time, 60);
        assert!(!options.catalogue_lookup);
        assert!(!options.daily_activity);
        assert!(!options.link_relations);
        assert!(!options.link_calendar);
        assert_eq!(options.utc_offset.local_minus_utc(), 8 * 3600);
    }

    #[test]
    fn test_invalid_offset_falls_back() {
        let options = SyncOptions::new().with_utc_offset_hours(99);
        assert_eq!(options.utc_offset.local_minus_utc(), 8 * 3600);
        let options = SyncOptions::new().with_utc_offset_hours(-5);
        assert_eq!(options.utc_offset.local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn test_schema_partial_override() {
        let schema: MirrorSchema =
            serde_json::from_str(r#"{"title": "Name", "status_kind": "status"}"#).unwrap();
        assert_eq!(schema.title, "Name");
        assert_eq!(schema.status_kind, ChoiceKind::Status);
        assert_eq!(schema.item_id, "BookId");
        assert_eq!(schema.daily.duration, "时长");
    }
}
