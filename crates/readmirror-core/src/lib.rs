//! Readmirror Core - keeps a Notion book database in step with WeRead.
//!
//! The engine reconciles a reading tracker's view of the user's books with
//! mirror records in a document database. It only writes items whose mirror
//! is stale, merges the tracker's partial views of each item, and derives
//! display fields (status, progress, rating label, dates, cover).
//!
//! Collaborators are traits (see [`source`]), so the engine runs the same
//! against the HTTP clients in [`weread`], [`notion`] and [`catalogue`] or
//! against in-memory doubles.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use readmirror_core::{NotionClient, NotionSettings, Reconciler, SyncOptions, WeReadClient};
//!
//! #[tokio::main]
//! async fn main() -> readmirror_core::Result<()> {
//!     let source = Arc::new(WeReadClient::new("wr_skey=...")?);
//!     let store = Arc::new(NotionClient::new(NotionSettings::new("secret_...", "db-id"))?);
//!
//!     let report = Reconciler::new(source, store, SyncOptions::default()).run().await?;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```

pub mod catalogue;
pub mod config;
pub mod error;
pub mod models;
pub mod network;
pub mod notion;
pub mod reconcile;
pub mod source;
pub mod weread;

// Re-export commonly used types
pub use catalogue::NeoDbCatalogue;
pub use config::{ChoiceKind, MirrorSchema, NotionSettings, SyncOptions};
pub use error::{MirrorError, Result};
pub use models::{
    MirrorFields, MirrorRecord, PartialRecord, ReadingStatus, SourceIndex, TrackedItem,
};
pub use notion::NotionClient;
pub use reconcile::{ItemFailure, Reconciler, SyncPlan, SyncReport};
pub use source::{Catalogue, MirrorStore, ReadingSource, RelationTarget};
pub use weread::WeReadClient;
