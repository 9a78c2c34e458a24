//! Notion mirror store.
//!
//! The book database holds one page per mirrored item. Optional databases
//! hold per-day reading entries and the pages mirrors link to (authors,
//! categories, calendar days).

mod client;
pub mod properties;

pub use client::NotionClient;
