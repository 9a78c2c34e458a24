//! WeRead reading-source client.
//!
//! Authenticates with the browser cookie the user supplies. The web API
//! answers failures with HTTP 200 and an `errcode` in the body, so every
//! response is checked for one before it is decoded.

mod reader_url;

pub use reader_url::{encode_book_id, reader_url};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::NetworkConfig;
use crate::error::{MirrorError, Result};
use crate::models::{ActivityDetail, Bookshelf, ItemMetadata, NotebookEntry};
use crate::network::{retry_call, HttpClient, RetryConfig};
use crate::source::ReadingSource;

const SERVICE: &str = "weread";
/// `errcode` returned once the login cookie has expired.
const ERR_SESSION_EXPIRED: i64 = -2012;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NotebookList {
    books: Vec<NotebookEntry>,
}

/// Client for the WeRead web API.
pub struct WeReadClient {
    http: HttpClient,
    cookie: String,
    base_url: String,
    retry: RetryConfig,
}

impl WeReadClient {
    /// Create a client against the public endpoint.
    pub fn new(cookie: impl Into<String>) -> Result<Self> {
        Self::with_base_url(cookie, NetworkConfig::WEREAD_BASE)
    }

    /// Create a client against another base URL.
    pub fn with_base_url(cookie: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let cookie = cookie.into();
        if cookie.trim().is_empty() {
            return Err(MirrorError::Config {
                message: "WeRead cookie is empty".into(),
            });
        }

        Ok(Self {
            http: HttpClient::new()?,
            cookie,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry: RetryConfig::default(),
        })
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn get<T: DeserializeOwned>(&self, path_and_query: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path_and_query);
        let headers = [("Cookie", self.cookie.as_str())];

        let body: Value = retry_call(&self.retry, || self.http.get_json(&url, &headers)).await?;
        check_errcode(&body)?;
        serde_json::from_value(body).map_err(|e| MirrorError::Json {
            message: format!("Unexpected WeRead response for {}: {}", path_and_query, e),
            source: Some(e),
        })
    }
}

/// Map an `errcode` body to an error.
fn check_errcode(body: &Value) -> Result<()> {
    let code = match body.get("errcode").and_then(Value::as_i64) {
        None | Some(0) => return Ok(()),
        Some(code) => code,
    };

    if code == ERR_SESSION_EXPIRED {
        return Err(MirrorError::AuthExpired {
            service: SERVICE.into(),
        });
    }

    let message = body
        .get("errmsg")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    Err(MirrorError::Api {
        service: SERVICE.into(),
        status_code: None,
        message: format!("errcode {}: {}", code, message),
    })
}

#[async_trait]
impl ReadingSource for WeReadClient {
    async fn fetch_bookshelf(&self) -> Result<Bookshelf> {
        let shelf: Bookshelf = self.get("/web/shelf/sync").await?;
        debug!(
            "Bookshelf: {} items, {} progress entries, {} archive groups",
            shelf.books.len(),
            shelf.progress.len(),
            shelf.archive.len()
        );
        Ok(shelf)
    }

    async fn fetch_notebook_list(&self) -> Result<Vec<NotebookEntry>> {
        let list: NotebookList = self.get("/api/user/notebook").await?;
        Ok(list.books)
    }

    async fn fetch_item_detail(&self, item_id: &str) -> Result<ItemMetadata> {
        self.get(&format!("/web/book/info?bookId={}", item_id)).await
    }

    async fn fetch_activity_detail(&self, item_id: &str) -> Result<ActivityDetail> {
        self.get(&format!(
            "/web/book/readinfo?bookId={}&readingDetail=1&readingBookIndex=1&finishedDate=1",
            item_id
        ))
        .await
    }

    fn item_link(&self, item_id: &str) -> Option<String> {
        Some(reader_url(item_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> WeReadClient {
        WeReadClient::with_base_url("wr_skey=abc", server.uri())
            .unwrap()
            .with_retry(RetryConfig::none())
    }

    #[test]
    fn test_empty_cookie_is_config_error() {
        assert!(matches!(
            WeReadClient::new("  "),
            Err(MirrorError::Config { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_bookshelf_sends_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/web/shelf/sync"))
            .and(header("Cookie", "wr_skey=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "bookProgress": [{"bookId": "1", "progress": 40, "readingTime": 1200}],
                "books": [{"bookId": "1", "title": "Cosmos", "author": "Carl Sagan"}],
                "archive": [{"name": "Science", "bookIds": ["1"]}]
            })))
            .mount(&server)
            .await;

        let shelf = client(&server).fetch_bookshelf().await.unwrap();
        assert_eq!(shelf.books[0].title.as_deref(), Some("Cosmos"));
        assert_eq!(shelf.progress[0].reading_time, Some(1200));
        assert_eq!(shelf.archive[0].book_ids, vec!["1".to_string()]);
    }

    #[tokio::test]
    async fn test_activity_detail_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/web/book/readinfo"))
            .and(query_param("bookId", "42"))
            .and(query_param("readingDetail", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "markedStatus": 4,
                "readingTime": 3600,
                "readDetail": {"data": [{"readDate": 1700000000, "readTime": 600}]}
            })))
            .mount(&server)
            .await;

        let detail = client(&server).fetch_activity_detail("42").await.unwrap();
        assert_eq!(detail.marked_status, Some(4));
        let days = detail.read_detail.and_then(|d| d.data).unwrap();
        assert_eq!(days[0].read_time, 600);
    }

    #[tokio::test]
    async fn test_expired_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/user/notebook"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"errcode": -2012, "errmsg": "登录超时"})),
            )
            .mount(&server)
            .await;

        let err = client(&server).fetch_notebook_list().await.unwrap_err();
        assert!(matches!(err, MirrorError::AuthExpired { .. }));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_other_errcode_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/web/book/info"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"errcode": -2003, "errmsg": "bad"})),
            )
            .mount(&server)
            .await;

        let err = client(&server).fetch_item_detail("1").await.unwrap_err();
        match err {
            MirrorError::Api { message, .. } => assert!(message.contains("-2003")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_item_link() {
        let client = WeReadClient::new("wr_skey=abc").unwrap();
        assert_eq!(
            client.item_link("695233").as_deref(),
            Some("https://weread.qq.com/web/reader/ce032b305a9bc1ce0b0dd2a")
        );
    }
}
