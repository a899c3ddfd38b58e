//! Body renderer
//!
//! Renders a [`StreamBody`] to HTML. Structured blocks go through small tera
//! templates; code blocks are highlighted with syntect first.
//!
//! Rich text and raw HTML are trusted editor content and pass through
//! unescaped. Everything else is escaped by tera.

use crate::models::blocks::{ButtonTarget, CardBlock, CodeBlock};
use crate::models::{BodyBlock, Image, StreamBody};
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::{SyntaxReference, SyntaxSet};
use tera::{Context as TeraContext, Tera};

const DEFAULT_THEME: &str = "base16-ocean.dark";

const CODE_TEMPLATE: &str = r#"<div class="block-code">
<div class="block-code-title">{{ title }}</div>
{{ highlighted | safe }}
{%- if caption %}
<div class="block-code-caption">{{ caption | safe }}</div>
{%- endif %}
</div>"#;

const IMAGE_TEMPLATE: &str = r#"<figure class="block-image"><img src="{{ image.url }}" alt="{{ image.title }}"
{%- if image.width %} width="{{ image.width }}"{% endif %}
{%- if image.height %} height="{{ image.height }}"{% endif %}></figure>"#;

const EMBED_TEMPLATE: &str = r#"<div class="block-embed">
{%- if player %}<iframe src="{{ player }}" frameborder="0" allowfullscreen></iframe>
{%- else %}<a href="{{ url }}">{{ url }}</a>
{%- endif %}</div>"#;

const RELATED_TEMPLATE: &str =
    r#"<aside class="block-related"><a href="{{ page.url }}">{{ page.title }}</a></aside>"#;

const CARDS_TEMPLATE: &str = r#"<section class="block-cards">
<h2>{{ title }}</h2>
{%- for card in cards %}
<div class="card">
{%- if card.image %}<img src="{{ card.image.url }}" alt="{{ card.image.title }}">{% endif %}
<h3>{{ card.title }}</h3>
<p>{{ card.text }}</p>
{%- if card.href %}<a class="card-button" href="{{ card.href }}">{{ card.title }}</a>{% endif %}
</div>
{%- endfor %}
</section>"#;

static YOUTUBE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://(?:www\.|m\.)?(?:youtube\.com/watch\?(?:.*&)?v=|youtu\.be/)([A-Za-z0-9_-]{6,})")
        .expect("valid youtube regex")
});
static VIMEO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://(?:www\.)?vimeo\.com/(\d+)").expect("valid vimeo regex")
});

/// Public link to a Logue page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageLink {
    pub title: String,
    pub url: String,
}

/// Rows referenced by a body, loaded ahead of rendering
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    images: HashMap<i64, Image>,
    pages: HashMap<i64, PageLink>,
}

impl RenderContext {
    pub fn new(images: Vec<Image>, pages: HashMap<i64, PageLink>) -> Self {
        Self {
            images: images.into_iter().map(|image| (image.id, image)).collect(),
            pages,
        }
    }

    fn image(&self, id: i64) -> Option<&Image> {
        self.images.get(&id)
    }

    fn page(&self, id: i64) -> Option<&PageLink> {
        self.pages.get(&id)
    }
}

#[derive(Serialize)]
struct CardView<'a> {
    title: &'a str,
    text: &'a str,
    image: Option<&'a Image>,
    href: Option<&'a str>,
}

/// Renders body blocks to HTML
#[derive(Clone)]
pub struct BodyRenderer {
    tera: Arc<Tera>,
    syntax_set: Arc<SyntaxSet>,
    theme_set: Arc<ThemeSet>,
    theme_name: String,
}

impl BodyRenderer {
    /// Create a renderer highlighting with `theme_name`.
    ///
    /// Unknown themes fall back to "base16-ocean.dark".
    pub fn new(theme_name: &str) -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("code_block.html", CODE_TEMPLATE),
            ("image.html", IMAGE_TEMPLATE),
            ("embed.html", EMBED_TEMPLATE),
            ("related_content.html", RELATED_TEMPLATE),
            ("cards.html", CARDS_TEMPLATE),
        ])
        .context("Failed to compile block templates")?;
        tera.set_escape_fn(html_escape);

        let theme_set = ThemeSet::load_defaults();
        let theme_name = if theme_set.themes.contains_key(theme_name) {
            theme_name.to_string()
        } else {
            tracing::warn!(
                "Unknown highlight theme '{}', using {}",
                theme_name,
                DEFAULT_THEME
            );
            DEFAULT_THEME.to_string()
        };

        Ok(Self {
            tera: Arc::new(tera),
            syntax_set: Arc::new(SyntaxSet::load_defaults_newlines()),
            theme_set: Arc::new(theme_set),
            theme_name,
        })
    }

    pub fn theme_name(&self) -> &str {
        &self.theme_name
    }

    /// Render every block of `body` in order
    pub fn render(&self, body: &StreamBody, context: &RenderContext) -> Result<String> {
        let mut html = String::new();
        for block in body.iter() {
            let rendered = self.render_block(block, context)?;
            if !rendered.is_empty() {
                if !html.is_empty() {
                    html.push('\n');
                }
                html.push_str(&rendered);
            }
        }
        Ok(html)
    }

    pub fn render_block(&self, block: &BodyBlock, context: &RenderContext) -> Result<String> {
        match block {
            BodyBlock::RichText(html) => Ok(format!("<div class=\"block-richtext\">{}</div>", html)),
            BodyBlock::Html(html) => Ok(html.clone()),
            BodyBlock::Code(code) => self.render_code(code),
            BodyBlock::Image(id) => match context.image(*id) {
                Some(image) => {
                    let mut ctx = TeraContext::new();
                    ctx.insert("image", image);
                    self.render_template("image.html", &ctx)
                }
                None => Ok(String::new()),
            },
            BodyBlock::Embed(url) => {
                let mut ctx = TeraContext::new();
                ctx.insert("url", url);
                ctx.insert("player", &embed_player_url(url));
                self.render_template("embed.html", &ctx)
            }
            BodyBlock::RelatedContent(id) => match context.page(*id) {
                Some(page) => {
                    let mut ctx = TeraContext::new();
                    ctx.insert("page", page);
                    self.render_template("related_content.html", &ctx)
                }
                None => Ok(String::new()),
            },
            BodyBlock::Cards(cards) => self.render_cards(cards, context),
        }
    }

    fn render_template(&self, name: &str, context: &TeraContext) -> Result<String> {
        self.tera
            .render(name, context)
            .with_context(|| format!("Failed to render {}", name))
    }

    fn render_code(&self, block: &CodeBlock) -> Result<String> {
        let mut ctx = TeraContext::new();
        ctx.insert("title", &block.title);
        ctx.insert("highlighted", &self.highlight(&block.title, &block.code));
        ctx.insert("caption", &block.caption);
        self.render_template("code_block.html", &ctx)
    }

    fn render_cards(&self, block: &CardBlock, context: &RenderContext) -> Result<String> {
        let cards: Vec<CardView<'_>> = block
            .cards
            .iter()
            .map(|card| {
                let page_url = match card.button_target() {
                    Some(ButtonTarget::Page(id)) => context.page(id).map(|p| p.url.as_str()),
                    _ => None,
                };
                // A card whose page is gone falls back to its URL
                let href = page_url.or_else(|| {
                    (!card.button_url.is_empty()).then_some(card.button_url.as_str())
                });
                CardView {
                    title: &card.title,
                    text: &card.text,
                    image: context.image(card.image),
                    href,
                }
            })
            .collect();

        let mut ctx = TeraContext::new();
        ctx.insert("title", &block.title);
        ctx.insert("cards", &cards);
        self.render_template("cards.html", &ctx)
    }

    /// Syntax for a code block: title extension, then first line, then plain text
    fn syntax_for(&self, title: &str, code: &str) -> &SyntaxReference {
        Path::new(title.trim())
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.syntax_set.find_syntax_by_extension(ext))
            .or_else(|| {
                code.lines()
                    .next()
                    .and_then(|line| self.syntax_set.find_syntax_by_first_line(line))
            })
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text())
    }

    /// Highlight `code` as HTML
    pub fn highlight(&self, title: &str, code: &str) -> String {
        let syntax = self.syntax_for(title, code);
        let theme = &self.theme_set.themes[&self.theme_name];
        match highlighted_html_for_string(code, &self.syntax_set, syntax, theme) {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("Highlighting failed for '{}': {}", title, e);
                format!("<pre><code>{}</code></pre>", html_escape(code))
            }
        }
    }
}

/// Player URL for known video providers
pub fn embed_player_url(url: &str) -> Option<String> {
    if let Some(caps) = YOUTUBE.captures(url) {
        return Some(format!("https://www.youtube.com/embed/{}", &caps[1]));
    }
    VIMEO
        .captures(url)
        .map(|caps| format!("https://player.vimeo.com/video/{}", &caps[1]))
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
