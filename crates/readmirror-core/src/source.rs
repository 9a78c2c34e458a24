//! Collaborator traits the reconciliation engine talks through.
//!
//! The engine never reaches for a global client; each run is handed its
//! collaborators, so tests can substitute in-memory doubles.

use async_trait::async_trait;

use crate::models::{
    ActivityDetail, Bookshelf, DailyActivityEntry, ItemMetadata, MirrorFields, MirrorIndex,
    NotebookEntry,
};
use crate::Result;

/// The reading tracker that owns the source of truth.
#[async_trait]
pub trait ReadingSource: Send + Sync {
    /// Progress index, shelf listing and archive groups.
    async fn fetch_bookshelf(&self) -> Result<Bookshelf>;

    /// Items the user has annotated.
    async fn fetch_notebook_list(&self) -> Result<Vec<NotebookEntry>>;

    /// Detailed metadata for one item.
    async fn fetch_item_detail(&self, item_id: &str) -> Result<ItemMetadata>;

    /// Reading activity for one item.
    async fn fetch_activity_detail(&self, item_id: &str) -> Result<ActivityDetail>;

    /// Public link to the item, when the tracker has one.
    fn item_link(&self, _item_id: &str) -> Option<String> {
        None
    }
}

/// Secondary databases a mirror record can link to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationTarget {
    Author,
    Category,
    CalendarDay,
}

impl RelationTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationTarget::Author => "author",
            RelationTarget::Category => "category",
            RelationTarget::CalendarDay => "calendar_day",
        }
    }
}

/// The document database holding mirror records.
#[async_trait]
pub trait MirrorStore: Send + Sync {
    /// Every mirror written so far, keyed by item id.
    async fn fetch_existing_mirrors(&self) -> Result<MirrorIndex>;

    /// Insert a new mirror and return its page id.
    async fn create_mirror_record(&self, fields: &MirrorFields, cover_url: &str)
        -> Result<String>;

    /// Overwrite an existing mirror in place.
    async fn update_mirror_record(
        &self,
        page_id: &str,
        fields: &MirrorFields,
        cover_url: &str,
    ) -> Result<()>;

    /// Daily-activity entries already linked to a mirror.
    async fn list_daily_activity(&self, page_id: &str) -> Result<Vec<DailyActivityEntry>>;

    /// Create (`entry_id == None`) or update one daily-activity entry.
    async fn upsert_daily_activity(
        &self,
        page_id: &str,
        entry_id: Option<&str>,
        day_timestamp: i64,
        duration: i64,
    ) -> Result<()>;

    /// Page id of the relation page titled `title`, created if missing.
    async fn resolve_relation(&self, target: RelationTarget, title: &str) -> Result<String>;
}

/// An external catalogue used to enrich new mirrors.
#[async_trait]
pub trait Catalogue: Send + Sync {
    /// A link to the item's catalogue page, if the catalogue knows the ISBN.
    async fn lookup_external_url(&self, isbn: &str) -> Result<Option<String>>;
}
