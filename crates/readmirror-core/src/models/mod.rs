//! Data models for readmirror.
//!
//! `raw` mirrors the tracker's payloads, `record` holds the merged and
//! derived shapes the engine works with, and `index` groups a run's source
//! data by item id.

mod index;
mod raw;
mod record;

pub use index::*;
pub use raw::*;
pub use record::*;
