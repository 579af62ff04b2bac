// ABOUTME: Blocking HTTP client for the Notion API and the remote-source seam
// ABOUTME: Handles throttling, pagination, auth headers and typed property mapping

use crate::config::NotionSettings;
use crate::model::{Block, DocumentKind, DocumentStatus, RemoteDocument, RichText};
use crate::util::{slugify, truncate_str};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rand::Rng;
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

const PAGE_SIZE: u32 = 100;

/// What the sync pipeline needs from the remote side.
pub trait RemoteSource {
    /// All documents, most recently edited first.
    fn list_documents(&self) -> Result<Vec<RemoteDocument>>;

    /// Direct children of a document, in order.
    fn fetch_blocks(&self, document_id: &str) -> Result<Vec<Block>>;
}

pub struct NotionClient {
    client: Client,
    base_url: String,
    token: String,
    version: String,
    database_id: Option<String>,
    throttle_min: u64,
    throttle_max: u64,
}

impl NotionClient {
    pub fn new(token: String, settings: &NotionSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("notion-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(NotionClient {
            client,
            base_url: settings.api_base.trim_end_matches('/').to_string(),
            token,
            version: settings.version.clone(),
            database_id: settings.database_id.clone(),
            throttle_min: 100,
            throttle_max: 300,
        })
    }

    pub fn with_throttle(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.throttle_min = min_ms;
        self.throttle_max = max_ms;
        self
    }

    pub fn disable_throttle(mut self) -> Self {
        self.throttle_min = 0;
        self.throttle_max = 0;
        self
    }

    fn throttle(&self) {
        if self.throttle_max > 0 {
            let sleep_ms = rand::thread_rng().gen_range(self.throttle_min..=self.throttle_max);
            std::thread::sleep(Duration::from_millis(sleep_ms));
        }
    }

    fn send<T: DeserializeOwned>(&self, endpoint: &str, request: RequestBuilder) -> Result<T> {
        let response = request
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Notion-Version", &self.version)
            .header("Accept", "application/json")
            .send()?;

        self.throttle();

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            warn!(endpoint, status = status.as_u16(), "Notion API error");
            return Err(Error::Api {
                endpoint: endpoint.into(),
                status: status.as_u16(),
                message: truncate_str(&message, 100),
            });
        }

        let body = response.text()?;
        serde_json::from_str(&body).map_err(|e| {
            warn!(
                endpoint,
                error = %e,
                body = %truncate_str(&body, 500),
                "Failed to parse Notion response"
            );
            Error::Parse(e)
        })
    }

    fn post<T: DeserializeOwned>(&self, endpoint: &str, body: &Value) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        self.send(endpoint, self.client.post(&url).json(body))
    }

    fn get<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        self.send(endpoint, self.client.get(&url).query(query))
    }

    fn query_pages(&self) -> Result<Vec<WirePage>> {
        let (endpoint, base_body) = match &self.database_id {
            Some(db) => (
                format!("/v1/databases/{}/query", db),
                json!({
                    "sorts": [{ "timestamp": "last_edited_time", "direction": "descending" }],
                    "page_size": PAGE_SIZE,
                }),
            ),
            None => (
                "/v1/search".to_string(),
                json!({
                    "filter": { "property": "object", "value": "page" },
                    "sort": { "timestamp": "last_edited_time", "direction": "descending" },
                    "page_size": PAGE_SIZE,
                }),
            ),
        };

        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut body = base_body.clone();
            if let Some(c) = &cursor {
                body["start_cursor"] = json!(c);
            }
            let resp: ListResponse<WirePage> = self.post(&endpoint, &body)?;
            pages.extend(resp.results);
            match resp.next_cursor {
                Some(next) if resp.has_more => cursor = Some(next),
                _ => break,
            }
        }
        Ok(pages)
    }
}

impl RemoteSource for NotionClient {
    fn list_documents(&self) -> Result<Vec<RemoteDocument>> {
        info!("Fetching document list");
        let pages = self.query_pages()?;

        let docs: Vec<RemoteDocument> = pages
            .into_iter()
            .filter(|p| !p.archived && !p.in_trash)
            .map(WirePage::into_document)
            .filter(|doc| {
                if doc.title.is_empty() {
                    debug!(id = %doc.id, "Skipping untitled page");
                    false
                } else {
                    true
                }
            })
            .collect();

        info!(count = docs.len(), "Fetched documents");
        Ok(docs)
    }

    fn fetch_blocks(&self, document_id: &str) -> Result<Vec<Block>> {
        let endpoint = format!("/v1/blocks/{}/children", document_id);

        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut query = vec![("page_size", PAGE_SIZE.to_string())];
            if let Some(c) = &cursor {
                query.push(("start_cursor", c.clone()));
            }
            let resp: ListResponse<WireBlock> = self.get(&endpoint, &query)?;
            blocks.extend(resp.results.into_iter().map(WireBlock::into_block));
            match resp.next_cursor {
                Some(next) if resp.has_more => cursor = Some(next),
                _ => break,
            }
        }
        Ok(blocks)
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    results: Vec<T>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WirePage {
    id: String,
    created_time: DateTime<Utc>,
    last_edited_time: DateTime<Utc>,
    #[serde(default)]
    cover: Option<WireFile>,
    #[serde(default)]
    properties: HashMap<String, Value>,
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    in_trash: bool,
}

impl WirePage {
    fn into_document(self) -> RemoteDocument {
        let props = PropertyBag::decode(self.properties);

        let title = props.title();
        let slug = match props.text("Slug") {
            s if s.is_empty() => slugify(&title),
            s => s,
        };
        let status = props
            .option_name("Status")
            .map(|s| DocumentStatus::from_name(&s))
            .unwrap_or(DocumentStatus::Draft);
        let kind = props
            .option_name("Type")
            .map(|s| DocumentKind::from_name(&s))
            .unwrap_or(DocumentKind::Post);
        let date = props
            .date_start("Date")
            .unwrap_or_else(|| self.created_time.format("%Y-%m-%d").to_string());

        RemoteDocument {
            id: self.id,
            title,
            slug,
            tags: props.names("Tags"),
            status,
            kind,
            date,
            excerpt: props.text("Excerpt"),
            created_time: self.created_time,
            last_edited_time: self.last_edited_time,
            cover_url: self.cover.and_then(WireFile::into_url),
        }
    }
}

/// Hosted (`file`) or external file reference, as used by covers and image blocks.
#[derive(Debug, Default, Deserialize)]
struct WireFile {
    #[serde(default)]
    file: Option<WireUrl>,
    #[serde(default)]
    external: Option<WireUrl>,
}

impl WireFile {
    fn into_url(self) -> Option<String> {
        self.file
            .or(self.external)
            .map(|u| u.url)
            .filter(|u| !u.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct WireUrl {
    #[serde(default)]
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct WireRichText {
    #[serde(default)]
    plain_text: String,
    #[serde(default)]
    text: Option<WireText>,
    #[serde(default)]
    annotations: WireAnnotations,
}

#[derive(Debug, Deserialize)]
struct WireText {
    #[serde(default)]
    content: String,
    #[serde(default)]
    link: Option<WireUrl>,
}

#[derive(Debug, Default, Deserialize)]
struct WireAnnotations {
    #[serde(default)]
    bold: bool,
    #[serde(default)]
    italic: bool,
    #[serde(default)]
    strikethrough: bool,
    #[serde(default)]
    code: bool,
}

impl WireRichText {
    fn content(&self) -> &str {
        match &self.text {
            Some(t) => &t.content,
            None => &self.plain_text,
        }
    }

    fn into_rich_text(self) -> RichText {
        let (text, link) = match self.text {
            Some(t) => (t.content, t.link.map(|l| l.url)),
            None => (self.plain_text, None),
        };
        RichText {
            text,
            link,
            bold: self.annotations.bold,
            italic: self.annotations.italic,
            strikethrough: self.annotations.strikethrough,
            code: self.annotations.code,
        }
    }
}

fn join_plain(spans: &[WireRichText]) -> String {
    spans.iter().map(WireRichText::content).collect()
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum PropertyValue {
    Title {
        #[serde(default)]
        title: Vec<WireRichText>,
    },
    RichText {
        #[serde(default)]
        rich_text: Vec<WireRichText>,
    },
    Select {
        select: Option<NamedOption>,
    },
    Status {
        status: Option<NamedOption>,
    },
    MultiSelect {
        #[serde(default)]
        multi_select: Vec<NamedOption>,
    },
    Date {
        date: Option<DateValue>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct NamedOption {
    name: String,
}

#[derive(Debug, Deserialize)]
struct DateValue {
    start: String,
}

/// Properties decoded once. Undecodable values are dropped, so every accessor fails closed.
struct PropertyBag(HashMap<String, PropertyValue>);

impl PropertyBag {
    fn decode(raw: HashMap<String, Value>) -> Self {
        PropertyBag(
            raw.into_iter()
                .filter_map(|(k, v)| serde_json::from_value(v).ok().map(|p| (k, p)))
                .collect(),
        )
    }

    /// `Name`, then `name`.
    fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.0
            .get(name)
            .or_else(|| self.0.get(&name.to_lowercase()))
    }

    fn text(&self, name: &str) -> String {
        match self.get(name) {
            Some(PropertyValue::Title { title }) => join_plain(title),
            Some(PropertyValue::RichText { rich_text }) => join_plain(rich_text),
            _ => String::new(),
        }
    }

    /// The `Title` property, or whichever property is the database's title column.
    fn title(&self) -> String {
        let named = self.text("Title");
        if !named.is_empty() {
            return named;
        }
        self.0
            .values()
            .find_map(|p| match p {
                PropertyValue::Title { title } => Some(join_plain(title)),
                _ => None,
            })
            .unwrap_or_default()
    }

    fn option_name(&self, name: &str) -> Option<String> {
        match self.get(name) {
            Some(PropertyValue::Select { select: Some(o) })
            | Some(PropertyValue::Status { status: Some(o) }) => Some(o.name.clone()),
            _ => None,
        }
    }

    fn names(&self, name: &str) -> Vec<String> {
        match self.get(name) {
            Some(PropertyValue::MultiSelect { multi_select }) => {
                multi_select.iter().map(|o| o.name.clone()).collect()
            }
            _ => Vec::new(),
        }
    }

    fn date_start(&self, name: &str) -> Option<String> {
        match self.get(name) {
            Some(PropertyValue::Date { date: Some(d) }) if !d.start.is_empty() => {
                Some(d.start.clone())
            }
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(flatten)]
    payload: HashMap<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct TextPayload {
    #[serde(default)]
    rich_text: Vec<WireRichText>,
    #[serde(default)]
    language: String,
}

impl WireBlock {
    fn into_block(mut self) -> Block {
        let payload = self.payload.remove(&self.kind).unwrap_or(Value::Null);
        let text = |v: Value| -> TextPayload { serde_json::from_value(v).unwrap_or_default() };
        let spans = |p: TextPayload| -> Vec<RichText> {
            p.rich_text
                .into_iter()
                .map(WireRichText::into_rich_text)
                .collect()
        };

        match self.kind.as_str() {
            "paragraph" => Block::Paragraph(spans(text(payload))),
            "heading_1" | "heading_2" | "heading_3" => Block::Heading {
                level: match self.kind.as_str() {
                    "heading_1" => 1,
                    "heading_2" => 2,
                    _ => 3,
                },
                text: spans(text(payload)),
            },
            "bulleted_list_item" => Block::BulletedItem(spans(text(payload))),
            "numbered_list_item" => Block::NumberedItem(spans(text(payload))),
            "code" => {
                let p = text(payload);
                Block::Code {
                    language: p.language.clone(),
                    text: spans(p),
                }
            }
            "image" => {
                let file: WireFile = serde_json::from_value(payload).unwrap_or_default();
                Block::Image {
                    url: file.into_url().unwrap_or_default(),
                }
            }
            _ => Block::Unsupported { kind: self.kind },
        }
    }
}
