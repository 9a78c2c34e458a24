//! Notion property values.
//!
//! Builders produce the JSON shapes the pages endpoint accepts; readers pull
//! plain values back out of a queried page.

use chrono::{DateTime, FixedOffset};
use serde_json::{json, Map, Value};

use crate::config::{ChoiceKind, MirrorSchema, NetworkConfig};
use crate::models::{DailyActivityEntry, MirrorFields, MirrorRecord, ReadingStatus};

pub type Properties = Map<String, Value>;

fn truncate(text: &str) -> String {
    text.chars().take(NetworkConfig::NOTION_TEXT_LIMIT).collect()
}

fn text_content(text: &str) -> Value {
    json!([{ "type": "text", "text": { "content": truncate(text) } }])
}

pub fn title(text: &str) -> Value {
    json!({ "title": text_content(text) })
}

pub fn rich_text(text: &str) -> Value {
    json!({ "rich_text": text_content(text) })
}

pub fn number<N: Into<f64>>(value: N) -> Value {
    json!({ "number": value.into() })
}

/// Choice value; `None` clears the property.
pub fn choice(kind: ChoiceKind, name: Option<&str>) -> Value {
    let value = name.map(|n| json!({ "name": n })).unwrap_or(Value::Null);
    match kind {
        ChoiceKind::Select => json!({ "select": value }),
        ChoiceKind::Status => json!({ "status": value }),
    }
}

pub fn url(value: &str) -> Value {
    json!({ "url": value })
}

pub fn date(value: &DateTime<FixedOffset>) -> Value {
    json!({ "date": { "start": value.format("%Y-%m-%dT%H:%M:%S%:z").to_string() } })
}

pub fn relation(ids: &[String]) -> Value {
    let ids: Vec<Value> = ids.iter().map(|id| json!({ "id": id })).collect();
    json!({ "relation": ids })
}

pub fn external_file(url: &str) -> Value {
    json!({ "type": "external", "external": { "url": url } })
}

/// Property map for one mirror write.
pub fn encode_mirror_fields(fields: &MirrorFields, schema: &MirrorSchema) -> Properties {
    let mut props = Properties::new();

    if let Some(identity) = &fields.identity {
        props.insert(schema.title.clone(), title(&identity.title));
        props.insert(schema.item_id.clone(), rich_text(&identity.item_id));
        if let Some(isbn) = &identity.isbn {
            props.insert(schema.isbn.clone(), rich_text(isbn));
        }
        if let Some(link) = &identity.link {
            props.insert(schema.link.clone(), url(link));
        }
    }

    props.insert(
        schema.category.clone(),
        choice(ChoiceKind::Select, fields.category.as_deref()),
    );
    props.insert(
        schema.status.clone(),
        choice(schema.status_kind, Some(status_label(fields.status, schema))),
    );
    props.insert(schema.progress.clone(), number(fields.progress));
    props.insert(
        schema.kind.clone(),
        choice(ChoiceKind::Select, Some(schema.kind_value.as_str())),
    );

    if let Some(time) = fields.reading_time {
        props.insert(schema.reading_time.clone(), number(time as f64));
    }
    if let Some(days) = fields.read_days {
        props.insert(schema.read_days.clone(), number(days as f64));
    }
    if let Some(rating) = &fields.rating_label {
        props.insert(schema.rating.clone(), choice(ChoiceKind::Select, Some(rating.as_str())));
    }
    if let Some(when) = &fields.date {
        props.insert(schema.date.clone(), date(when));
    }
    if let Some(link) = &fields.external_url {
        props.insert(schema.external_url.clone(), url(link));
    }
    if !fields.author_ids.is_empty() {
        props.insert(schema.authors.clone(), relation(&fields.author_ids));
    }
    if !fields.category_ids.is_empty() {
        props.insert(schema.categories.clone(), relation(&fields.category_ids));
    }
    if !fields.calendar_ids.is_empty() {
        props.insert(schema.calendar.clone(), relation(&fields.calendar_ids));
    }

    props
}

pub fn status_label(status: ReadingStatus, schema: &MirrorSchema) -> &str {
    match status {
        ReadingStatus::WantToRead => &schema.status_labels.want_to_read,
        ReadingStatus::InProgress => &schema.status_labels.in_progress,
        ReadingStatus::Finished => &schema.status_labels.finished,
    }
}

fn property<'a>(page: &'a Value, name: &str) -> Option<&'a Value> {
    page.get("properties").and_then(|p| p.get(name))
}

/// Concatenated plain text of a title or rich-text property.
pub fn read_text(page: &Value, name: &str) -> Option<String> {
    let prop = property(page, name)?;
    let parts = prop
        .get("title")
        .or_else(|| prop.get("rich_text"))?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("plain_text").and_then(Value::as_str))
        .collect();
    (!text.is_empty()).then_some(text)
}

pub fn read_number(page: &Value, name: &str) -> Option<f64> {
    property(page, name)?.get("number")?.as_f64()
}

/// Name of a select or status property.
pub fn read_choice(page: &Value, name: &str) -> Option<String> {
    let prop = property(page, name)?;
    prop.get("select")
        .or_else(|| prop.get("status"))?
        .get("name")?
        .as_str()
        .map(str::to_string)
}

pub fn read_url(page: &Value, name: &str) -> Option<String> {
    property(page, name)?
        .get("url")?
        .as_str()
        .map(str::to_string)
}

/// URL of the page cover, external or uploaded.
pub fn read_cover(page: &Value) -> Option<String> {
    let cover = page.get("cover")?;
    cover
        .get("external")
        .or_else(|| cover.get("file"))?
        .get("url")?
        .as_str()
        .map(str::to_string)
}

fn read_integer(page: &Value, name: &str) -> Option<i64> {
    read_number(page, name).map(|n| n.round() as i64)
}

/// Mirror view of a page from the book database. Pages without an item id
/// are not mirrors.
pub fn decode_mirror(page: &Value, schema: &MirrorSchema) -> Option<MirrorRecord> {
    let page_id = page.get("id")?.as_str()?.to_string();
    let item_id = read_text(page, &schema.item_id)?;

    Some(MirrorRecord {
        page_id,
        item_id,
        title: read_text(page, &schema.title),
        reading_time: read_integer(page, &schema.reading_time),
        shelf_category: read_choice(page, &schema.category),
        cover: read_cover(page),
        status_label: read_choice(page, &schema.status),
        rating_label: read_choice(page, &schema.rating),
        external_url: read_url(page, &schema.external_url),
    })
}

/// Entry view of a page from the daily-activity database.
pub fn decode_daily(page: &Value, schema: &MirrorSchema) -> Option<DailyActivityEntry> {
    Some(DailyActivityEntry {
        entry_id: page.get("id")?.as_str()?.to_string(),
        timestamp: read_integer(page, &schema.daily.timestamp)?,
        duration: read_integer(page, &schema.daily.duration),
    })
}
