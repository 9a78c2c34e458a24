//! Notion API client implementing the mirror store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::properties::{self, Properties};
use crate::config::{Icons, NetworkConfig, NotionSettings, SyncOptions};
use crate::error::{MirrorError, Result};
use crate::models::{DailyActivityEntry, MirrorFields, MirrorIndex};
use crate::network::{retry_call, HttpClient, RetryConfig};
use crate::source::{MirrorStore, RelationTarget};

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_cursor: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QueryResponse {
    results: Vec<Value>,
    has_more: bool,
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedPage {
    id: String,
}

/// Client for the Notion REST API.
pub struct NotionClient {
    http: HttpClient,
    settings: NotionSettings,
    base_url: String,
    retry: RetryConfig,
    utc_offset: FixedOffset,
    /// Relation page ids by target and title, valid for one run.
    relation_cache: Mutex<HashMap<(RelationTarget, String), String>>,
}

impl NotionClient {
    /// Create a client against the public endpoint.
    pub fn new(settings: NotionSettings) -> Result<Self> {
        Self::with_base_url(settings, NetworkConfig::NOTION_API_BASE)
    }

    /// Create a client against another base URL.
    pub fn with_base_url(settings: NotionSettings, base_url: impl Into<String>) -> Result<Self> {
        if settings.token.trim().is_empty() {
            return Err(MirrorError::Config {
                message: "Notion token is empty".into(),
            });
        }
        if settings.book_database_id.trim().is_empty() {
            return Err(MirrorError::Config {
                message: "Notion book database id is empty".into(),
            });
        }

        Ok(Self {
            http: HttpClient::new()?,
            settings,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry: RetryConfig::default(),
            utc_offset: SyncOptions::default().utc_offset,
            relation_cache: Mutex::new(HashMap::new()),
        })
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Offset used for the dates written to daily-activity entries.
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    pub fn settings(&self) -> &NotionSettings {
        &self.settings
    }

    async fn request<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let auth = format!("Bearer {}", self.settings.token);
        let headers = [
            ("Authorization", auth.as_str()),
            ("Notion-Version", NetworkConfig::NOTION_VERSION),
        ];

        retry_call(&self.retry, || {
            self.http
                .send_json(method.clone(), &url, &headers, body)
        })
        .await
    }

    /// Every page of a database matching `filter`, following pagination.
    pub async fn query_database(&self, database_id: &str, filter: Option<&Value>) -> Result<Vec<Value>> {
        let path = format!("/databases/{}/query", database_id);
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let request = QueryRequest {
                page_size: NetworkConfig::NOTION_PAGE_SIZE,
                start_cursor: cursor.as_deref(),
                filter,
            };
            let response: QueryResponse = self.request(Method::POST, &path, &request).await?;
            pages.extend(response.results);

            match response.next_cursor {
                Some(next) if response.has_more => cursor = Some(next),
                _ => break,
            }
        }

        debug!("Queried {} pages from database {}", pages.len(), database_id);
        Ok(pages)
    }

    async fn create_page(&self, parent_id: &str, props: Properties, icon: &str, cover: Option<&str>) -> Result<String> {
        let mut body = json!({
            "parent": { "database_id": parent_id },
            "properties": props,
            "icon": properties::external_file(icon),
        });
        if let Some(cover) = cover {
            body["cover"] = properties::external_file(cover);
        }

        let page: CreatedPage = self.request(Method::POST, "/pages", &body).await?;
        Ok(page.id)
    }

    async fn update_page(&self, page_id: &str, props: Properties, cover: Option<&str>) -> Result<()> {
        let mut body = json!({ "properties": props });
        if let Some(cover) = cover {
            body["cover"] = properties::external_file(cover);
        }

        let _: Value = self
            .request(Method::PATCH, &format!("/pages/{}", page_id), &body)
            .await?;
        Ok(())
    }

    fn read_database(&self) -> Result<&str> {
        self.settings
            .read_database_id
            .as_deref()
            .ok_or_else(|| MirrorError::Config {
                message: "daily activity needs a read database id".into(),
            })
    }

    fn relation_database(&self, target: RelationTarget) -> Result<(&str, &'static str)> {
        let (id, icon) = match target {
            RelationTarget::Author => (&self.settings.author_database_id, Icons::USER),
            RelationTarget::Category => (&self.settings.category_database_id, Icons::TAG),
            RelationTarget::CalendarDay => (&self.settings.calendar_database_id, Icons::CALENDAR),
        };
        id.as_deref().map(|id| (id, icon)).ok_or_else(|| MirrorError::Config {
            message: format!("no database configured for {} relations", target.as_str()),
        })
    }

    fn local_day(&self, timestamp: i64) -> Result<DateTime<FixedOffset>> {
        DateTime::from_timestamp(timestamp, 0)
            .map(|dt| dt.with_timezone(&self.utc_offset))
            .ok_or_else(|| MirrorError::Other(format!("timestamp out of range: {}", timestamp)))
    }
}

#[async_trait]
impl MirrorStore for NotionClient {
    async fn fetch_existing_mirrors(&self) -> Result<MirrorIndex> {
        let schema = &self.settings.schema;
        let pages = self
            .query_database(&self.settings.book_database_id, None)
            .await?;

        let mut index = MirrorIndex::new();
        for page in &pages {
            let Some(mirror) = properties::decode_mirror(page, schema) else {
                continue;
            };
            if index.contains_key(&mirror.item_id) {
                warn!(
                    "Duplicate mirror for {}, keeping the first page",
                    mirror.item_id
                );
                continue;
            }
            index.insert(mirror.item_id.clone(), mirror);
        }
        Ok(index)
    }

    async fn create_mirror_record(&self, fields: &MirrorFields, cover_url: &str) -> Result<String> {
        let props = properties::encode_mirror_fields(fields, &self.settings.schema);
        self.create_page(&self.settings.book_database_id, props, cover_url, None)
            .await
    }

    async fn update_mirror_record(
        &self,
        page_id: &str,
        fields: &MirrorFields,
        cover_url: &str,
    ) -> Result<()> {
        let props = properties::encode_mirror_fields(fields, &self.settings.schema);
        self.update_page(page_id, props, Some(cover_url)).await
    }

    async fn list_daily_activity(&self, page_id: &str) -> Result<Vec<DailyActivityEntry>> {
        let database_id = self.read_database()?;
        let schema = &self.settings.schema;
        let filter = json!({
            "property": schema.daily.item,
            "relation": { "contains": page_id }
        });

        let pages = self.query_database(database_id, Some(&filter)).await?;
        Ok(pages
            .iter()
            .filter_map(|page| properties::decode_daily(page, schema))
            .collect())
    }

    async fn upsert_daily_activity(
        &self,
        page_id: &str,
        entry_id: Option<&str>,
        day_timestamp: i64,
        duration: i64,
    ) -> Result<()> {
        let daily = &self.settings.schema.daily;
        let mut props = Properties::new();
        props.insert(daily.duration.clone(), properties::number(duration as f64));

        if let Some(entry_id) = entry_id {
            return self.update_page(entry_id, props, None).await;
        }

        let database_id = self.read_database()?;
        let day = self.local_day(day_timestamp)?;
        props.insert(
            daily.title.clone(),
            properties::title(&day.format("%Y-%m-%d").to_string()),
        );
        props.insert(daily.date.clone(), properties::date(&day));
        props.insert(
            daily.timestamp.clone(),
            properties::number(day_timestamp as f64),
        );
        props.insert(
            daily.item.clone(),
            properties::relation(&[page_id.to_string()]),
        );

        self.create_page(database_id, props, Icons::TARGET, None)
            .await
            .map(|_| ())
    }

    async fn resolve_relation(&self, target: RelationTarget, title: &str) -> Result<String> {
        let key = (target, title.to_string());
        let mut cache = self.relation_cache.lock().await;
        if let Some(id) = cache.get(&key) {
            return Ok(id.clone());
        }

        let (database_id, icon) = self.relation_database(target)?;
        let title_property = &self.settings.schema.title;
        let filter = json!({
            "property": title_property,
            "title": { "equals": title }
        });

        let existing = self.query_database(database_id, Some(&filter)).await?;
        let id = match existing
            .first()
            .and_then(|page| page.get("id"))
            .and_then(Value::as_str)
        {
            Some(id) => id.to_string(),
            None => {
                let mut props = Properties::new();
                props.insert(title_property.clone(), properties::title(title));
                debug!("Creating {} page '{}'", target.as_str(), title);
                self.create_page(database_id, props, icon, None).await?
            }
        };

        cache.insert(key, id.clone());
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MirrorSchema;
    use crate::models::ReadingStatus;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings() -> NotionSettings {
        let mut settings = NotionSettings::new("secret", "books");
        settings.read_database_id = Some("reads".into());
        settings.author_database_id = Some("authors".into());
        settings
    }

    fn client(server: &MockServer) -> NotionClient {
        NotionClient::with_base_url(settings(), server.uri())
            .unwrap()
            .with_retry(RetryConfig::none())
    }

    fn mirror_page(id: &str, item_id: &str) -> Value {
        json!({
            "id": id,
            "properties": { "BookId": { "rich_text": [{ "plain_text": item_id }] } }
        })
    }

    #[test]
    fn test_empty_token_is_config_error() {
        assert!(matches!(
            NotionClient::new(NotionSettings::new("", "books")),
            Err(MirrorError::Config { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_existing_mirrors_follows_cursor() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/databases/books/query"))
            .and(header("Authorization", "Bearer secret"))
            .and(header("Notion-Version", NetworkConfig::NOTION_VERSION))
            .and(body_partial_json(json!({ "start_cursor": "c2" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [mirror_page("p3", "b3"), mirror_page("p4", "b1")],
                "has_more": false,
                "next_cursor": null
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/databases/books/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [mirror_page("p1", "b1"), mirror_page("p2", "b2")],
                "has_more": true,
                "next_cursor": "c2"
            })))
            .mount(&server)
            .await;

        let mirrors = client(&server).fetch_existing_mirrors().await.unwrap();
        assert_eq!(mirrors.len(), 3);
        assert_eq!(mirrors["b1"].page_id, "p1");
        assert_eq!(mirrors["b3"].page_id, "p3");
    }

    #[tokio::test]
    async fn test_update_sets_cover_and_properties() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/pages/p1"))
            .and(body_partial_json(json!({
                "cover": { "external": { "url": "https://img/t7_a.jpg" } },
                "properties": { "阅读状态": { "select": { "name": "在读" } } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "p1" })))
            .expect(1)
            .mount(&server)
            .await;

        let fields = MirrorFields {
            identity: None,
            category: Some("Science".into()),
            status: ReadingStatus::InProgress,
            progress: 0.5,
            reading_time: Some(600),
            read_days: Some(3),
            rating_label: None,
            date: None,
            external_url: None,
            author_ids: vec![],
            category_ids: vec![],
            calendar_ids: vec![],
        };
        client(&server)
            .update_mirror_record("p1", &fields, "https://img/t7_a.jpg")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_resolve_relation_creates_once_and_caches() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/databases/authors/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [], "has_more": false, "next_cursor": null
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/pages"))
            .and(body_partial_json(json!({ "parent": { "database_id": "authors" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "a1" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        let first = client
            .resolve_relation(RelationTarget::Author, "Carl Sagan")
            .await
            .unwrap();
        let second = client
            .resolve_relation(RelationTarget::Author, "Carl Sagan")
            .await
            .unwrap();
        assert_eq!(first, "a1");
        assert_eq!(second, "a1");
    }

    #[tokio::test]
    async fn test_missing_relation_database_is_config_error() {
        let server = MockServer::start().await;
        let err = client(&server)
            .resolve_relation(RelationTarget::Category, "History")
            .await
            .unwrap_err();
        assert!(matches!(err, MirrorError::Config { .. }));
    }

    #[tokio::test]
    async fn test_daily_entry_create_links_mirror() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pages"))
            .and(body_partial_json(json!({
                "parent": { "database_id": "reads" },
                "properties": {
                    "时长": { "number": 600.0 },
                    "时间戳": { "number": 1700000000.0 },
                    "书架": { "relation": [{ "id": "p1" }] },
                    "日期": { "date": { "start": "2023-11-15T06:13:20+08:00" } }
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "e1" })))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .upsert_daily_activity("p1", None, 1_700_000_000, 600)
            .await
            .unwrap();
    }

    #[test]
    fn test_schema_is_configurable() {
        let mut settings = settings();
        settings.schema = MirrorSchema {
            item_id: "Id".into(),
            ..Default::default()
        };
        let client = NotionClient::new(settings).unwrap();
        assert_eq!(client.settings().schema.item_id, "Id");
    }
}
