//! Structured body blocks
//!
//! A page body is an ordered, heterogeneous list of typed blocks, stored as
//! JSON in the StreamField layout:
//!
//! ```json
//! [{"type": "code_block", "value": {"title": "main.rs", "code": "fn main() {}", "caption": ""}, "id": "…"}]
//! ```
//!
//! The type names below are the storage contract and must not change:
//! `richtext_section`, `image`, `code_block`, `embed`, `html`,
//! `related_content` and `cards`.
//!
//! Writes are strict (unknown types and constraint violations are rejected).
//! Reads of stored bodies are lenient: children with an unknown type are
//! skipped so older content stays readable.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const RICHTEXT_SECTION: &str = "richtext_section";
pub const IMAGE: &str = "image";
pub const CODE_BLOCK: &str = "code_block";
pub const EMBED: &str = "embed";
pub const HTML: &str = "html";
pub const RELATED_CONTENT: &str = "related_content";
pub const CARDS: &str = "cards";

/// Every block type name accepted in a page body, in declaration order.
pub const BLOCK_TYPES: &[&str] = &[
    RICHTEXT_SECTION,
    IMAGE,
    CODE_BLOCK,
    EMBED,
    HTML,
    RELATED_CONTENT,
    CARDS,
];

pub const CARD_TITLE_MAX_LEN: usize = 40;
pub const CARD_TEXT_MAX_LEN: usize = 100;

static HTTP_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https?://[^\s/?#]+[^\s]*$").expect("valid url regex"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Whether `s` is an absolute http(s) URL
pub fn is_http_url(s: &str) -> bool {
    HTTP_URL.is_match(s)
}

/// Strip markup and collapse whitespace
pub fn strip_html(html: &str) -> String {
    let text = TAG.replace_all(html, " ");
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Block validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BlockError {
    #[error("unknown block type '{0}'")]
    UnknownType(String),

    #[error("invalid value for '{block_type}': {message}")]
    InvalidValue { block_type: String, message: String },

    #[error("'{block_type}' requires field '{field}'")]
    MissingField {
        block_type: &'static str,
        field: &'static str,
    },

    #[error("'{block_type}' field '{field}' exceeds {max} characters")]
    TooLong {
        block_type: &'static str,
        field: &'static str,
        max: usize,
    },

    #[error("'{block_type}' field '{field}' must be an http(s) URL")]
    InvalidUrl {
        block_type: &'static str,
        field: &'static str,
    },
}

fn require(block_type: &'static str, field: &'static str, value: &str) -> Result<(), BlockError> {
    if value.trim().is_empty() {
        return Err(BlockError::MissingField { block_type, field });
    }
    Ok(())
}

fn max_len(
    block_type: &'static str,
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), BlockError> {
    if value.chars().count() > max {
        return Err(BlockError::TooLong {
            block_type,
            field,
            max,
        });
    }
    Ok(())
}

fn url(block_type: &'static str, field: &'static str, value: &str) -> Result<(), BlockError> {
    if !is_http_url(value) {
        return Err(BlockError::InvalidUrl { block_type, field });
    }
    Ok(())
}

// ============================================================================
// Struct blocks
// ============================================================================

/// Kind of a block field, as shown to editing clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Char,
    Text,
    RichText,
    RawHtml,
    Url,
    Embed,
    ImageChooser,
    PageChooser,
    Struct,
    List,
}

/// Schema of one field inside a block
#[derive(Debug, Clone, Serialize)]
pub struct FieldSchema {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_text: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FieldSchema>,
}

impl FieldSchema {
    fn new(name: &'static str, kind: FieldKind, required: bool) -> Self {
        Self {
            name,
            kind,
            required,
            max_length: None,
            help_text: None,
            children: Vec::new(),
        }
    }

    fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    fn help(mut self, text: &'static str) -> Self {
        self.help_text = Some(text);
        self
    }

    fn children(mut self, children: Vec<FieldSchema>) -> Self {
        self.children = children;
        self
    }
}

/// A block made of named fields
pub trait StructBlock {
    /// Schema name of the block
    const NAME: &'static str;
    /// Label shown to editors
    const LABEL: &'static str;
    /// Icon name shown to editors
    const ICON: &'static str;

    fn fields() -> Vec<FieldSchema>;
}

/// Title and block of text rendered and highlighted as code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub title: String,
    pub code: String,
    /// Rich-text caption; empty when not set
    #[serde(default, deserialize_with = "null_as_empty")]
    pub caption: String,
}

impl StructBlock for CodeBlock {
    const NAME: &'static str = "CodeBlock";
    const LABEL: &'static str = "Code Block";
    const ICON: &'static str = "code";

    fn fields() -> Vec<FieldSchema> {
        vec![
            FieldSchema::new("title", FieldKind::Char, true).help("Name of code block."),
            FieldSchema::new("code", FieldKind::Text, true).help("Text to be rendered as code."),
            FieldSchema::new("caption", FieldKind::RichText, false)
                .help("Brief description of code snippet."),
        ]
    }
}

impl CodeBlock {
    pub fn validate(&self) -> Result<(), BlockError> {
        require(CODE_BLOCK, "title", &self.title)?;
        require(CODE_BLOCK, "code", &self.code)
    }
}

/// One card inside a [`CardBlock`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardItem {
    /// Image id
    pub image: i64,
    pub title: String,
    pub text: String,
    /// Target page id; takes precedence over `button_url`
    #[serde(default)]
    pub button_page: Option<i64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub button_url: String,
}

impl CardItem {
    /// Link target for the card button, preferring the page
    pub fn button_target(&self) -> Option<ButtonTarget<'_>> {
        match self.button_page {
            Some(id) => Some(ButtonTarget::Page(id)),
            None if !self.button_url.is_empty() => Some(ButtonTarget::Url(&self.button_url)),
            None => None,
        }
    }

    fn validate(&self) -> Result<(), BlockError> {
        require(CARDS, "cards.title", &self.title)?;
        max_len(CARDS, "cards.title", &self.title, CARD_TITLE_MAX_LEN)?;
        require(CARDS, "cards.text", &self.text)?;
        max_len(CARDS, "cards.text", &self.text, CARD_TEXT_MAX_LEN)?;
        if !self.button_url.is_empty() {
            url(CARDS, "cards.button_url", &self.button_url)?;
        }
        Ok(())
    }
}

/// Resolved target of a card button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonTarget<'a> {
    Page(i64),
    Url(&'a str),
}

/// Cards with an image, a blurb of text, and a button each
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardBlock {
    pub title: String,
    #[serde(deserialize_with = "list_items")]
    pub cards: Vec<CardItem>,
}

impl StructBlock for CardBlock {
    const NAME: &'static str = "CardBlock";
    const LABEL: &'static str = "Graph Cards";
    const ICON: &'static str = "placeholder";

    fn fields() -> Vec<FieldSchema> {
        vec![
            FieldSchema::new("title", FieldKind::Char, true).help("Card title"),
            FieldSchema::new("cards", FieldKind::List, true).children(vec![
                FieldSchema::new("image", FieldKind::ImageChooser, true),
                FieldSchema::new("title", FieldKind::Char, true).max_length(CARD_TITLE_MAX_LEN),
                FieldSchema::new("text", FieldKind::Text, true).max_length(CARD_TEXT_MAX_LEN),
                FieldSchema::new("button_page", FieldKind::PageChooser, false),
                FieldSchema::new("button_url", FieldKind::Url, false)
                    .help("Button page will be used first."),
            ]),
        ]
    }
}

impl CardBlock {
    pub fn validate(&self) -> Result<(), BlockError> {
        require(CARDS, "title", &self.title)?;
        self.cards.iter().try_for_each(CardItem::validate)
    }
}

/// Block to format related content links. Declares no fields of its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelatedContentBlock {}

impl StructBlock for RelatedContentBlock {
    const NAME: &'static str = "RelatedContentBlock";
    const LABEL: &'static str = "Related Content";
    const ICON: &'static str = "link";

    fn fields() -> Vec<FieldSchema> {
        Vec::new()
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// List items are stored either bare or wrapped as `{"type": "item", "value": …, "id": …}`.
fn list_items<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListItem<T> {
        Wrapped { value: T },
        Bare(T),
    }

    let items = Vec::<ListItem<T>>::deserialize(deserializer)?;
    Ok(items
        .into_iter()
        .map(|item| match item {
            ListItem::Wrapped { value } | ListItem::Bare(value) => value,
        })
        .collect())
}

// ============================================================================
// Body block union
// ============================================================================

/// One typed unit of page body content
#[derive(Debug, Clone, PartialEq)]
pub enum BodyBlock {
    /// Rich-text HTML section
    RichText(String),
    /// Image id
    Image(i64),
    Code(CodeBlock),
    /// Embeddable media URL
    Embed(String),
    /// Raw HTML, rendered verbatim
    Html(String),
    /// Id of a related Logue page
    RelatedContent(i64),
    Cards(CardBlock),
}

impl BodyBlock {
    /// Storage type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RichText(_) => RICHTEXT_SECTION,
            Self::Image(_) => IMAGE,
            Self::Code(_) => CODE_BLOCK,
            Self::Embed(_) => EMBED,
            Self::Html(_) => HTML,
            Self::RelatedContent(_) => RELATED_CONTENT,
            Self::Cards(_) => CARDS,
        }
    }

    /// Decode a stored `(type, value)` pair
    pub fn from_raw(block_type: &str, value: Value) -> Result<Self, BlockError> {
        fn decode<T: serde::de::DeserializeOwned>(
            block_type: &str,
            value: Value,
        ) -> Result<T, BlockError> {
            serde_json::from_value(value).map_err(|e| BlockError::InvalidValue {
                block_type: block_type.to_string(),
                message: e.to_string(),
            })
        }

        Ok(match block_type {
            RICHTEXT_SECTION => Self::RichText(decode(block_type, value)?),
            IMAGE => Self::Image(decode(block_type, value)?),
            CODE_BLOCK => Self::Code(decode(block_type, value)?),
            EMBED => Self::Embed(decode(block_type, value)?),
            HTML => Self::Html(decode(block_type, value)?),
            RELATED_CONTENT => Self::RelatedContent(decode(block_type, value)?),
            CARDS => Self::Cards(decode(block_type, value)?),
            other => return Err(BlockError::UnknownType(other.to_string())),
        })
    }

    /// Encode the value half of the stored pair
    pub fn to_value(&self) -> Value {
        match self {
            Self::RichText(s) | Self::Embed(s) | Self::Html(s) => Value::String(s.clone()),
            Self::Image(id) | Self::RelatedContent(id) => Value::from(*id),
            Self::Code(block) => serde_json::to_value(block).unwrap_or(Value::Null),
            Self::Cards(block) => serde_json::to_value(block).unwrap_or(Value::Null),
        }
    }

    /// Check required fields, lengths and URLs
    pub fn validate(&self) -> Result<(), BlockError> {
        match self {
            Self::RichText(html) => require(RICHTEXT_SECTION, "value", html),
            Self::Html(html) => require(HTML, "value", html),
            Self::Embed(u) => url(EMBED, "value", u),
            Self::Image(_) | Self::RelatedContent(_) => Ok(()),
            Self::Code(block) => block.validate(),
            Self::Cards(block) => block.validate(),
        }
    }

    /// Image ids this block refers to
    pub fn image_ids(&self) -> Vec<i64> {
        match self {
            Self::Image(id) => vec![*id],
            Self::Cards(block) => block.cards.iter().map(|c| c.image).collect(),
            _ => Vec::new(),
        }
    }

    /// Page ids this block refers to
    pub fn page_ids(&self) -> Vec<i64> {
        match self {
            Self::RelatedContent(id) => vec![*id],
            Self::Cards(block) => block.cards.iter().filter_map(|c| c.button_page).collect(),
            _ => Vec::new(),
        }
    }

    /// Searchable text of this block
    pub fn plain_text(&self) -> String {
        match self {
            Self::RichText(html) | Self::Html(html) => strip_html(html),
            Self::Code(block) => [
                block.title.as_str(),
                block.code.as_str(),
                &strip_html(&block.caption),
            ]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" "),
            Self::Cards(block) => std::iter::once(block.title.clone())
                .chain(
                    block
                        .cards
                        .iter()
                        .map(|c| format!("{} {}", c.title, c.text)),
                )
                .collect::<Vec<_>>()
                .join(" "),
            Self::Image(_) | Self::Embed(_) | Self::RelatedContent(_) => String::new(),
        }
    }
}

/// Stored shape of one body child
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawStreamChild {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// A body block with its stable id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStreamChild", into = "RawStreamChild")]
pub struct StreamChild {
    pub id: String,
    pub block: BodyBlock,
}

impl StreamChild {
    pub fn new(block: BodyBlock) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            block,
        }
    }
}

impl TryFrom<RawStreamChild> for StreamChild {
    type Error = BlockError;

    fn try_from(raw: RawStreamChild) -> Result<Self, Self::Error> {
        let block = BodyBlock::from_raw(&raw.block_type, raw.value)?;
        Ok(Self {
            id: raw
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            block,
        })
    }
}

impl From<StreamChild> for RawStreamChild {
    fn from(child: StreamChild) -> Self {
        Self {
            block_type: child.block.type_name().to_string(),
            value: child.block.to_value(),
            id: Some(child.id),
        }
    }
}

/// Ordered page body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamBody(pub Vec<StreamChild>);

impl StreamBody {
    /// Build a body from editor input; every child must decode and validate.
    pub fn from_input(children: Vec<RawStreamChild>) -> Result<Self, BlockError> {
        let body = children
            .into_iter()
            .map(StreamChild::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)?;
        body.validate()?;
        Ok(body)
    }

    /// Decode a stored body column. Unknown or malformed children are skipped.
    pub fn from_stored(stored: Option<&str>) -> Self {
        let Some(json) = stored.filter(|s| !s.trim().is_empty()) else {
            return Self::default();
        };

        let raw: Vec<RawStreamChild> = match serde_json::from_str::<Option<Vec<_>>>(json) {
            Ok(children) => children.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Discarding unreadable stored body: {}", e);
                return Self::default();
            }
        };

        Self(
            raw.into_iter()
                .filter_map(|child| {
                    let block_type = child.block_type.clone();
                    match StreamChild::try_from(child) {
                        Ok(child) => Some(child),
                        Err(e) => {
                            tracing::warn!("Skipping stored '{}' block: {}", block_type, e);
                            None
                        }
                    }
                })
                .collect(),
        )
    }

    /// Encode for the body column
    pub fn to_stored(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn validate(&self) -> Result<(), BlockError> {
        self.0.iter().try_for_each(|child| child.block.validate())
    }

    pub fn iter(&self) -> impl Iterator<Item = &BodyBlock> {
        self.0.iter().map(|child| &child.block)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn image_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.iter().flat_map(BodyBlock::image_ids).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn page_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.iter().flat_map(BodyBlock::page_ids).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn plain_text(&self) -> String {
        self.iter()
            .map(BodyBlock::plain_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ============================================================================
// Schema registry
// ============================================================================

/// Schema of one body block type
#[derive(Debug, Clone, Serialize)]
pub struct BlockSchema {
    /// Storage type name
    pub name: &'static str,
    pub kind: FieldKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub struct_block: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldSchema>,
}

impl BlockSchema {
    fn simple(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            struct_block: None,
            label: None,
            icon: None,
            fields: Vec::new(),
        }
    }

    fn of<B: StructBlock>(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Struct,
            struct_block: Some(B::NAME),
            label: Some(B::LABEL),
            icon: Some(B::ICON),
            fields: B::fields(),
        }
    }
}

/// Schemas of the page body union, in [`BLOCK_TYPES`] order
pub fn body_block_schemas() -> Vec<BlockSchema> {
    vec![
        BlockSchema::simple(RICHTEXT_SECTION, FieldKind::RichText),
        BlockSchema::simple(IMAGE, FieldKind::ImageChooser),
        BlockSchema::of::<CodeBlock>(CODE_BLOCK),
        BlockSchema::simple(EMBED, FieldKind::Embed),
        BlockSchema::simple(HTML, FieldKind::RawHtml),
        BlockSchema::simple(RELATED_CONTENT, FieldKind::PageChooser),
        BlockSchema::of::<CardBlock>(CARDS),
    ]
}

/// Schemas of every declared struct block, including ones not in the body union
pub fn struct_block_schemas() -> Vec<BlockSchema> {
    vec![
        BlockSchema::of::<CodeBlock>(CodeBlock::NAME),
        BlockSchema::of::<CardBlock>(CardBlock::NAME),
        BlockSchema::of::<RelatedContentBlock>(RelatedContentBlock::NAME),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(block_type: &str, value: Value) -> RawStreamChild {
        RawStreamChild {
            block_type: block_type.to_string(),
            value,
            id: None,
        }
    }

    fn card(title: &str, text: &str) -> Value {
        json!({"image": 1, "title": title, "text": text, "button_page": null, "button_url": ""})
    }

    #[test]
    fn test_every_type_name_decodes() {
        let values = [
            (RICHTEXT_SECTION, json!("<p>Hi</p>")),
            (IMAGE, json!(3)),
            (CODE_BLOCK, json!({"title": "main.rs", "code": "fn main() {}"})),
            (EMBED, json!("https://www.youtube.com/watch?v=abc")),
            (HTML, json!("<hr>")),
            (RELATED_CONTENT, json!(7)),
            (CARDS, json!({"title": "Cards", "cards": [card("One", "First")]})),
        ];

        for (block_type, value) in values {
            let block = BodyBlock::from_raw(block_type, value).expect(block_type);
            assert_eq!(block.type_name(), block_type);
        }
        assert_eq!(BLOCK_TYPES.len(), 7);
    }

    #[test]
    fn test_stored_layout_is_preserved() {
        let stored = r#"[{"type":"code_block","value":{"title":"a.py","code":"print(1)","caption":""},"id":"b1"}]"#;
        let body = StreamBody::from_stored(Some(stored));

        assert_eq!(body.len(), 1);
        let written: Value = serde_json::from_str(&body.to_stored().unwrap()).unwrap();
        assert_eq!(written[0]["type"], "code_block");
        assert_eq!(written[0]["id"], "b1");
        assert_eq!(written[0]["value"]["title"], "a.py");
    }

    #[test]
    fn test_unknown_stored_block_is_skipped() {
        let stored = r#"[
            {"type": "quote", "value": "old", "id": "x"},
            {"type": "html", "value": "<b>kept</b>", "id": "y"}
        ]"#;
        let body = StreamBody::from_stored(Some(stored));

        assert_eq!(body.len(), 1);
        assert_eq!(body.0[0].id, "y");
    }

    #[test]
    fn test_null_or_garbage_stored_body_is_empty() {
        assert!(StreamBody::from_stored(None).is_empty());
        assert!(StreamBody::from_stored(Some("null")).is_empty());
        assert!(StreamBody::from_stored(Some("{not json")).is_empty());
    }

    #[test]
    fn test_unknown_input_block_is_rejected() {
        let result = StreamBody::from_input(vec![raw("quote", json!("x"))]);
        assert_eq!(result, Err(BlockError::UnknownType("quote".to_string())));
    }

    #[test]
    fn test_input_assigns_ids() {
        let body = StreamBody::from_input(vec![raw(HTML, json!("<hr>"))]).unwrap();
        assert!(uuid::Uuid::parse_str(&body.0[0].id).is_ok());
    }

    #[test]
    fn test_code_block_requires_title_and_code() {
        let missing_title = raw(CODE_BLOCK, json!({"title": " ", "code": "x"}));
        assert!(matches!(
            StreamBody::from_input(vec![missing_title]),
            Err(BlockError::MissingField { field: "title", .. })
        ));

        let missing_code = raw(CODE_BLOCK, json!({"title": "t", "code": ""}));
        assert!(matches!(
            StreamBody::from_input(vec![missing_code]),
            Err(BlockError::MissingField { field: "code", .. })
        ));

        let no_caption = raw(CODE_BLOCK, json!({"title": "t", "code": "x", "caption": null}));
        assert!(StreamBody::from_input(vec![no_caption]).is_ok());
    }

    #[test]
    fn test_card_limits() {
        let long_title = "t".repeat(CARD_TITLE_MAX_LEN + 1);
        let block = raw(CARDS, json!({"title": "C", "cards": [card(&long_title, "ok")]}));
        assert!(matches!(
            StreamBody::from_input(vec![block]),
            Err(BlockError::TooLong { field: "cards.title", .. })
        ));

        let long_text = "x".repeat(CARD_TEXT_MAX_LEN + 1);
        let block = raw(CARDS, json!({"title": "C", "cards": [card("ok", &long_text)]}));
        assert!(matches!(
            StreamBody::from_input(vec![block]),
            Err(BlockError::TooLong { field: "cards.text", .. })
        ));

        let exact = "é".repeat(CARD_TITLE_MAX_LEN);
        let block = raw(CARDS, json!({"title": "C", "cards": [card(&exact, "ok")]}));
        assert!(StreamBody::from_input(vec![block]).is_ok());
    }

    #[test]
    fn test_card_button_prefers_page() {
        let item: CardItem = serde_json::from_value(json!({
            "image": 1, "title": "t", "text": "x",
            "button_page": 9, "button_url": "https://example.com"
        }))
        .unwrap();
        assert_eq!(item.button_target(), Some(ButtonTarget::Page(9)));

        let item: CardItem = serde_json::from_value(json!({
            "image": 1, "title": "t", "text": "x", "button_url": "https://example.com"
        }))
        .unwrap();
        assert_eq!(item.button_target(), Some(ButtonTarget::Url("https://example.com")));
    }

    #[test]
    fn test_wrapped_list_items_accepted() {
        let block: CardBlock = serde_json::from_value(json!({
            "title": "C",
            "cards": [{"type": "item", "value": card("A", "a"), "id": "i1"}, card("B", "b")]
        }))
        .unwrap();
        assert_eq!(block.cards.len(), 2);
        assert_eq!(block.cards[0].title, "A");
        assert_eq!(block.cards[1].title, "B");
    }

    #[test]
    fn test_embed_requires_url() {
        assert!(BodyBlock::Embed("not a url".to_string()).validate().is_err());
        assert!(BodyBlock::Embed("https://vimeo.com/1".to_string()).validate().is_ok());
    }

    #[test]
    fn test_references_and_text() {
        let body = StreamBody(vec![
            StreamChild::new(BodyBlock::Image(4)),
            StreamChild::new(BodyBlock::RelatedContent(2)),
            StreamChild::new(BodyBlock::Image(4)),
            StreamChild::new(BodyBlock::RichText("<p>Hello <b>world</b></p>".to_string())),
        ]);

        assert_eq!(body.image_ids(), vec![4]);
        assert_eq!(body.page_ids(), vec![2]);
        assert_eq!(body.plain_text(), "Hello world");
    }

    #[test]
    fn test_schema_registry() {
        let names: Vec<&str> = body_block_schemas().iter().map(|s| s.name).collect();
        assert_eq!(names, BLOCK_TYPES);

        let structs = struct_block_schemas();
        let related = structs
            .iter()
            .find(|s| s.struct_block == Some("RelatedContentBlock"))
            .unwrap();
        assert!(related.fields.is_empty());
    }

    #[test]
    fn test_is_http_url() {
        assert!(is_http_url("https://example.com/path?q=1"));
        assert!(is_http_url("HTTP://EXAMPLE.COM"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(!is_http_url("https://"));
        assert!(!is_http_url("https://exa mple.com"));
    }
}
