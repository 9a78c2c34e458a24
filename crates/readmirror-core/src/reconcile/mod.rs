//! The reconciliation engine.
//!
//! A run gathers the tracker's listings and the existing mirrors, detects
//! which mirrors are already current, plans the remaining work and writes
//! it one item at a time.
//!
//! ```rust,ignore
//! let report = Reconciler::new(source, store, SyncOptions::default())
//!     .with_catalogue(catalogue)
//!     .run()
//!     .await?;
//! println!("{}", report);
//! ```

pub mod daily;
pub mod derive;
pub mod detect;
pub mod dispatch;
pub mod merge;
pub mod plan;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::SyncOptions;
use crate::error::{MirrorError, Result};
use crate::models::SourceIndex;
use crate::source::{Catalogue, MirrorStore, ReadingSource};

pub use daily::{plan_daily_writes, DailyWrite};
pub use detect::detect_up_to_date;
pub use dispatch::{DispatchOutcome, Dispatcher, ItemFailure};
pub use merge::{merge_sources, MergeInputs};
pub use plan::{plan_sync, PlannedItem, SyncPlan};

/// Summary of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub total_candidates: usize,
    pub up_to_date: usize,
    pub low_activity: usize,
    pub created: usize,
    pub updated: usize,
    pub failed: Vec<ItemFailure>,
    pub dry_run: bool,
    /// The work set, filled only on dry runs.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub planned: Vec<PlannedItem>,
}

impl SyncReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            write!(
                f,
                "Dry run: {} candidates, {} to write, {} up to date, {} below activity threshold",
                self.total_candidates,
                self.planned.len(),
                self.up_to_date,
                self.low_activity
            )
        } else {
            write!(
                f,
                "{} candidates: {} created, {} updated, {} up to date, {} below activity threshold, {} failed",
                self.total_candidates,
                self.created,
                self.updated,
                self.up_to_date,
                self.low_activity,
                self.failed.len()
            )
        }
    }
}

/// Runs one reconciliation pass between a reading source and a mirror store.
pub struct Reconciler {
    source: Arc<dyn ReadingSource>,
    store: Arc<dyn MirrorStore>,
    catalogue: Option<Arc<dyn Catalogue>>,
    options: SyncOptions,
}

impl Reconciler {
    pub fn new(
        source: Arc<dyn ReadingSource>,
        store: Arc<dyn MirrorStore>,
        options: SyncOptions,
    ) -> Self {
        Self {
            source,
            store,
            catalogue: None,
            options,
        }
    }

    /// Attach the external catalogue used when `catalogue_lookup` is enabled.
    pub fn with_catalogue(mut self, catalogue: Arc<dyn Catalogue>) -> Self {
        self.catalogue = Some(catalogue);
        self
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Fetch the listings and existing mirrors and index them.
    ///
    /// Any failure here aborts the run.
    pub async fn gather(&self) -> Result<SourceIndex> {
        let bookshelf = self
            .source
            .fetch_bookshelf()
            .await
            .map_err(|e| MirrorError::source_fetch("bookshelf", e))?;
        let notebooks = self
            .source
            .fetch_notebook_list()
            .await
            .map_err(|e| MirrorError::source_fetch("notebook list", e))?;
        let mirrors = self
            .store
            .fetch_existing_mirrors()
            .await
            .map_err(|e| MirrorError::source_fetch("existing mirrors", e))?;

        debug!(
            "Gathered {} progress entries, {} shelf items, {} notebooks, {} mirrors",
            bookshelf.progress.len(),
            bookshelf.books.len(),
            notebooks.len(),
            mirrors.len()
        );
        Ok(SourceIndex::build(bookshelf, notebooks, mirrors))
    }

    /// Plan the run against an index.
    pub fn plan(&self, index: &SourceIndex) -> SyncPlan {
        let no_sync = detect_up_to_date(index);
        plan_sync(index, &no_sync, self.options.min_active_time)
    }

    /// Run a full pass and report what happened.
    pub async fn run(&self) -> Result<SyncReport> {
        let index = self.gather().await?;
        let plan = self.plan(&index);

        info!(
            "{} candidates: {} to sync, {} up to date, {} below activity threshold",
            plan.total_candidates(),
            plan.work.len(),
            plan.skipped_up_to_date.len(),
            plan.skipped_low_activity.len()
        );

        let mut report = SyncReport {
            total_candidates: plan.total_candidates(),
            up_to_date: plan.skipped_up_to_date.len(),
            low_activity: plan.skipped_low_activity.len(),
            dry_run: self.options.dry_run,
            ..Default::default()
        };

        if self.options.dry_run {
            for planned in &plan.work {
                info!("Would sync {} ({})", planned.title, planned.item_id);
            }
            report.planned = plan.work;
            return Ok(report);
        }

        let dispatcher = Dispatcher::new(
            Arc::clone(&self.source),
            Arc::clone(&self.store),
            self.catalogue.clone(),
            self.options.clone(),
        );
        let outcome = dispatcher.dispatch(&plan, &index).await;

        report.created = outcome.created.len();
        report.updated = outcome.updated.len();
        report.failed = outcome.failed;

        info!("{}", report);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_display() {
        let report = SyncReport {
            total_candidates: 5,
            up_to_date: 2,
            low_activity: 1,
            created: 1,
            updated: 1,
            ..Default::default()
        };
        assert_eq!(
            report.to_string(),
            "5 candidates: 1 created, 1 updated, 2 up to date, 1 below activity threshold, 0 failed"
        );
        assert!(!report.has_failures());
    }
}
