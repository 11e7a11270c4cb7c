//! Block Kit Layouts
//!
//! Typed Slack Block Kit elements and the fixed layouts the bot posts. Every
//! layout is rebuilt from scratch per call; there is no shared template value
//! to mutate.

use serde::Serialize;

use crate::search::SearchHit;

/// Sidebar color of the reply attachment.
pub const ATTACHMENT_COLOR: &str = "#0000ff";

const HEADER_SUFFIX: &str = "search results";
const COUNT_SUFFIX: &str = "articles found!";
const LOGO_ALT_TEXT: &str = "wp-logo";

/// Warning shown when the incoming message has no usable search term.
pub const EMPTY_QUERY_WARNING: &str = ":warning: Could not recognize a search term";

/// Prefix of the warning shown when the search backend fails.
pub const SEARCH_FAILED_WARNING: &str = ":warning: An error occurred: ";

/// Slack rejects header blocks whose text is longer than this.
pub const HEADER_MAX_CHARS: usize = 150;

/// Text object used by header and section blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    PlainText { text: String, emoji: bool },
    #[serde(rename = "mrkdwn")]
    Mrkdwn { text: String },
}

/// Element of a context block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContextElement {
    Image { image_url: String, alt_text: String },
    Mrkdwn { text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListStyle {
    Bullet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TextStyle {
    pub bold: bool,
}

/// Inline element inside a rich text section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RichTextInline {
    Link {
        url: String,
        text: String,
        style: TextStyle,
    },
}

/// Container element inside a rich text block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RichTextElement {
    RichTextList {
        style: ListStyle,
        elements: Vec<RichTextElement>,
    },
    RichTextSection { elements: Vec<RichTextInline> },
}

/// A top-level Block Kit block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header { text: TextObject },
    Section { text: TextObject },
    Context { elements: Vec<ContextElement> },
    Divider,
    RichText { elements: Vec<RichTextElement> },
}

/// Ordered list of blocks rendered by the Slack client.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct MessageLayout(Vec<Block>);

impl MessageLayout {
    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }

    /// Wrap the layout in the colored attachment Slack expects.
    pub fn into_attachment(self) -> Attachment {
        Attachment {
            color: ATTACHMENT_COLOR,
            blocks: self,
        }
    }
}

/// Legacy attachment carrying a block layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub color: &'static str,
    pub blocks: MessageLayout,
}

/// Cut `text` to at most `max` characters, on a char boundary.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Plain-text header block, cut to [`HEADER_MAX_CHARS`].
fn header(text: &str) -> Block {
    Block::Header {
        text: TextObject::PlainText {
            text: truncate_chars(text, HEADER_MAX_CHARS).to_string(),
            emoji: true,
        },
    }
}

/// Build the search result layout: header, count, divider, link list.
///
/// Zero hits yield an empty link list, not an error. Hit order is preserved.
/// A long query is shortened so the header keeps its suffix.
pub fn compose(query: &str, hits: &[SearchHit], logo_url: &str) -> MessageLayout {
    let room = HEADER_MAX_CHARS - HEADER_SUFFIX.len() - 1;
    let title = header(&format!("{} {HEADER_SUFFIX}", truncate_chars(query, room)));

    let count = Block::Context {
        elements: vec![
            ContextElement::Image {
                image_url: logo_url.to_string(),
                alt_text: LOGO_ALT_TEXT.to_string(),
            },
            ContextElement::Mrkdwn {
                text: format!("{} {COUNT_SUFFIX}", hits.len()),
            },
        ],
    };

    let items = hits
        .iter()
        .map(|hit| RichTextElement::RichTextSection {
            elements: vec![RichTextInline::Link {
                url: hit.url.clone(),
                text: hit.title.clone(),
                style: TextStyle { bold: true },
            }],
        })
        .collect();

    let results = Block::RichText {
        elements: vec![RichTextElement::RichTextList {
            style: ListStyle::Bullet,
            elements: items,
        }],
    };

    MessageLayout(vec![title, count, Block::Divider, results])
}

/// Single-header layout used for every warning the bot posts.
pub fn warning(text: &str) -> MessageLayout {
    MessageLayout(vec![header(text)])
}

/// Greeting posted when a user opens a new assistant thread.
pub fn greeting(user_id: &str) -> MessageLayout {
    MessageLayout(vec![
        Block::Section {
            text: TextObject::Mrkdwn {
                text: format!("Hello <@{user_id}>!"),
            },
        },
        Block::Divider,
    ])
}
