//! Readmirror - sync WeRead reading activity into a Notion database.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use readmirror_core::{
    MirrorSchema, NeoDbCatalogue, NotionClient, NotionSettings, Reconciler, SyncOptions,
    SyncReport, WeReadClient,
};
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "readmirror")]
#[command(about = "Mirror WeRead reading progress into a Notion database")]
struct Args {
    /// WeRead cookie copied from a logged-in browser session
    #[arg(long, env = "WEREAD_COOKIE", hide_env_values = true)]
    weread_cookie: String,

    /// Notion integration token
    #[arg(long, env = "NOTION_TOKEN", hide_env_values = true)]
    notion_token: String,

    /// Book database holding one page per item
    #[arg(long, env = "NOTION_BOOK_DATABASE_ID")]
    book_database: String,

    /// Database for per-day reading entries
    #[arg(long, env = "NOTION_READ_DATABASE_ID")]
    read_database: Option<String>,

    /// Database of author pages
    #[arg(long, env = "NOTION_AUTHOR_DATABASE_ID")]
    author_database: Option<String>,

    /// Database of category pages
    #[arg(long, env = "NOTION_CATEGORY_DATABASE_ID")]
    category_database: Option<String>,

    /// Database of calendar-day pages
    #[arg(long, env = "NOTION_CALENDAR_DATABASE_ID")]
    calendar_database: Option<String>,

    /// JSON file overriding property names of the book database
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Look up Douban links through NeoDB for new items
    #[arg(long)]
    catalogue_lookup: bool,

    /// Write one entry per reading day (needs --read-database)
    #[arg(long)]
    daily_activity: bool,

    /// Link author and category pages for new items
    #[arg(long)]
    link_relations: bool,

    /// Link calendar-day pages (on by default when a calendar database is set)
    #[arg(long)]
    link_calendar: Option<bool>,

    /// Minimum recorded reading time, in seconds, for an item to be synced
    #[arg(long, default_value_t = 60)]
    min_active_time: i64,

    /// Hours east of UTC used for calendar days
    #[arg(long, default_value_t = 8, allow_hyphen_values = true)]
    utc_offset: i32,

    /// Label for finished items without a rating; empty leaves it unset
    #[arg(long, default_value = "未评分")]
    unrated_label: String,

    /// Plan the run without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Exit with an error when any item fails
    #[arg(long)]
    fail_on_error: bool,

    /// Print the final report as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    fn sync_options(&self) -> SyncOptions {
        let link_calendar = self
            .link_calendar
            .unwrap_or(self.calendar_database.is_some());
        let unrated = Some(self.unrated_label.trim())
            .filter(|label| !label.is_empty())
            .map(str::to_string);

        SyncOptions::new()
            .with_min_active_time(self.min_active_time)
            .with_utc_offset_hours(self.utc_offset)
            .with_unrated_label(unrated)
            .with_catalogue_lookup(self.catalogue_lookup)
            .with_daily_activity(self.daily_activity)
            .with_link_relations(self.link_relations)
            .with_link_calendar(link_calendar)
            .with_dry_run(self.dry_run)
    }

    fn notion_settings(&self) -> Result<NotionSettings> {
        let mut settings = NotionSettings::new(&self.notion_token, &self.book_database);
        settings.read_database_id = self.read_database.clone();
        settings.author_database_id = self.author_database.clone();
        settings.category_database_id = self.category_database.clone();
        settings.calendar_database_id = self.calendar_database.clone();
        if let Some(path) = &self.schema {
            settings.schema = load_schema(path)?;
        }
        Ok(settings)
    }

    fn check(&self) -> Result<()> {
        if self.daily_activity && self.read_database.is_none() {
            anyhow::bail!("--daily-activity needs --read-database");
        }
        if self.link_relations
            && (self.author_database.is_none() || self.category_database.is_none())
        {
            anyhow::bail!("--link-relations needs --author-database and --category-database");
        }
        if self.link_calendar == Some(true) && self.calendar_database.is_none() {
            anyhow::bail!("--link-calendar needs --calendar-database");
        }
        Ok(())
    }
}

fn load_schema(path: &Path) -> Result<MirrorSchema> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading schema file {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing schema file {}", path.display()))
}

fn init_logging(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("readmirror={level},readmirror_core={level}")));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();
}

fn print_report(report: &SyncReport, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("{}", report);
    for planned in &report.planned {
        println!("  would sync {} ({})", planned.title, planned.item_id);
    }
    for failure in &report.failed {
        println!("  failed {} ({}): {}", failure.title, failure.item_id, failure.message);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);
    args.check()?;

    let options = args.sync_options();
    let settings = args.notion_settings()?;

    let source = Arc::new(WeReadClient::new(&args.weread_cookie)?);
    let store = Arc::new(NotionClient::new(settings)?.with_utc_offset(options.utc_offset));
    let mut reconciler = Reconciler::new(source, store, options.clone());
    if options.catalogue_lookup {
        reconciler = reconciler.with_catalogue(Arc::new(NeoDbCatalogue::new()?));
    }

    info!("Starting sync");
    let report = reconciler.run().await.context("sync aborted")?;
    print_report(&report, args.json)?;

    if args.fail_on_error && report.has_failures() {
        error!("{} items failed", report.failed.len());
        std::process::exit(1);
    }
    Ok(())
}
