//! Per-item writes.
//!
//! Items are processed one at a time: fetch detail, merge, derive, enrich,
//! then create or update the mirror. A failure is recorded against its item
//! and the batch moves on.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::daily::plan_daily_writes;
use super::merge::{merge_sources, MergeInputs};
use super::plan::{PlannedItem, SyncPlan};
use crate::config::SyncOptions;
use crate::models::{ItemIdentity, MirrorFields, SourceIndex, TrackedItem};
use crate::source::{Catalogue, MirrorStore, ReadingSource, RelationTarget};
use crate::{MirrorError, Result};

/// Title format of calendar-day relation pages.
const CALENDAR_TITLE_FORMAT: &str = "%Y年%m月%d日";

/// An item that could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub item_id: String,
    pub title: String,
    pub message: String,
}

/// What a dispatch pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    /// Ids of items whose mirror was created.
    pub created: Vec<String>,
    /// Ids of items whose mirror was updated in place.
    pub updated: Vec<String>,
    pub failed: Vec<ItemFailure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteKind {
    Created,
    Updated,
}

/// Writes planned items through the mirror store.
pub struct Dispatcher {
    source: Arc<dyn ReadingSource>,
    store: Arc<dyn MirrorStore>,
    catalogue: Option<Arc<dyn Catalogue>>,
    options: SyncOptions,
}

impl Dispatcher {
    pub fn new(
        source: Arc<dyn ReadingSource>,
        store: Arc<dyn MirrorStore>,
        catalogue: Option<Arc<dyn Catalogue>>,
        options: SyncOptions,
    ) -> Self {
        Self {
            source,
            store,
            catalogue,
            options,
        }
    }

    /// Write every item of the plan, in order.
    pub async fn dispatch(&self, plan: &SyncPlan, index: &SourceIndex) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        let total = plan.work.len();

        for (position, planned) in plan.work.iter().enumerate() {
            info!(
                "({}/{}) Syncing {}",
                position + 1,
                total,
                display_name(planned)
            );

            match self.sync_item(planned, index).await {
                Ok(WriteKind::Created) => outcome.created.push(planned.item_id.clone()),
                Ok(WriteKind::Updated) => outcome.updated.push(planned.item_id.clone()),
                Err(e) => {
                    let failure = MirrorError::ItemSync {
                        item_id: planned.item_id.clone(),
                        message: e.to_string(),
                    };
                    error!("{} [{}]: {:?}", failure, planned.title, e);
                    outcome.failed.push(ItemFailure {
                        item_id: planned.item_id.clone(),
                        title: planned.title.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        outcome
    }

    async fn sync_item(&self, planned: &PlannedItem, index: &SourceIndex) -> Result<WriteKind> {
        let item_id = planned.item_id.as_str();
        let metadata = self.source.fetch_item_detail(item_id).await?;
        let activity = self.source.fetch_activity_detail(item_id).await?;

        let mirror = index.mirrors.get(item_id);
        let merged = merge_sources(MergeInputs {
            mirror,
            shelf_entry: index.shelf.get(item_id),
            shelf_label: index.archive_label(item_id),
            metadata: Some(&metadata),
            activity: Some(&activity),
        });
        let item = TrackedItem::from_record(item_id, merged, &self.options);
        debug!(
            "Derived {}: status={}, progress={:.2}, dates={}",
            item_id,
            item.status,
            item.progress_ratio,
            item.display_dates.len()
        );

        let fields = match mirror {
            Some(_) => MirrorFields::from_item(&item, None),
            None => self.new_item_fields(&item).await,
        };
        let fields = self.with_calendar(fields, &item).await;

        let (page_id, kind) = match mirror {
            Some(existing) => {
                self.store
                    .update_mirror_record(&existing.page_id, &fields, &item.cover_url)
                    .await?;
                (existing.page_id.clone(), WriteKind::Updated)
            }
            None => {
                let page_id = self
                    .store
                    .create_mirror_record(&fields, &item.cover_url)
                    .await?;
                (page_id, WriteKind::Created)
            }
        };

        if self.options.daily_activity && !item.daily_reads.is_empty() {
            if let Err(e) = self.sync_daily_activity(&page_id, &item).await {
                warn!("Daily activity for {} not synced: {}", item_id, e);
            }
        }

        Ok(kind)
    }

    /// Field set for a first write: identity plus the creation-time enrichment.
    async fn new_item_fields(&self, item: &TrackedItem) -> MirrorFields {
        let identity = ItemIdentity {
            title: item.title.clone(),
            item_id: item.item_id.clone(),
            isbn: item.isbn.clone(),
            link: self.source.item_link(&item.item_id),
        };
        let mut fields = MirrorFields::from_item(item, Some(identity));

        if fields.external_url.is_none() {
            fields.external_url = self.lookup_external_url(item).await;
        }

        if self.options.link_relations {
            let authors = item
                .author
                .as_deref()
                .map(|a| a.split_whitespace().map(str::to_string).collect::<Vec<_>>())
                .unwrap_or_default();
            fields.author_ids = self.resolve_all(RelationTarget::Author, &authors).await;
            fields.category_ids = self
                .resolve_all(RelationTarget::Category, &item.categories)
                .await;
        }

        fields
    }

    async fn lookup_external_url(&self, item: &TrackedItem) -> Option<String> {
        if !self.options.catalogue_lookup {
            return None;
        }
        let catalogue = self.catalogue.as_ref()?;
        let isbn = item.isbn.as_deref()?;

        match catalogue.lookup_external_url(isbn).await {
            Ok(url) => url,
            Err(e) => {
                warn!("Catalogue lookup for {} failed: {}", item.item_id, e);
                None
            }
        }
    }

    async fn with_calendar(&self, mut fields: MirrorFields, item: &TrackedItem) -> MirrorFields {
        if !self.options.link_calendar || item.display_dates.is_empty() {
            return fields;
        }

        let mut titles: Vec<String> = Vec::new();
        for date in &item.display_dates {
            let title = date.format(CALENDAR_TITLE_FORMAT).to_string();
            if !titles.contains(&title) {
                titles.push(title);
            }
        }
        fields.calendar_ids = self.resolve_all(RelationTarget::CalendarDay, &titles).await;
        fields
    }

    /// Resolve relation pages by title. Failed titles are logged and left out.
    async fn resolve_all(&self, target: RelationTarget, titles: &[String]) -> Vec<String> {
        let mut ids = Vec::with_capacity(titles.len());
        for title in titles.iter().filter(|t| !t.trim().is_empty()) {
            match self.store.resolve_relation(target, title).await {
                Ok(id) => {
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
                Err(e) => warn!("Could not link {} '{}': {}", target.as_str(), title, e),
            }
        }
        ids
    }

    async fn sync_daily_activity(&self, page_id: &str, item: &TrackedItem) -> Result<()> {
        let existing = self.store.list_daily_activity(page_id).await?;
        let writes = plan_daily_writes(&existing, &item.daily_reads);
        debug!(
            "{} daily entries for {}: {} to write",
            existing.len(),
            item.item_id,
            writes.len()
        );

        for write in writes {
            self.store
                .upsert_daily_activity(
                    page_id,
                    write.entry_id.as_deref(),
                    write.timestamp,
                    write.duration,
                )
                .await?;
        }
        Ok(())
    }
}

fn display_name(planned: &PlannedItem) -> &str {
    if planned.title.is_empty() {
        &planned.item_id
    } else {
        &planned.title
    }
}
