//! RSS 2.0 / Atom feed parsing and HTML stripping.
//!
//! Used by the feed-based adapters (Upwork job RSS, Stack Overflow Atom tag
//! feeds). Only the handful of fields an [`beacon_core::IntermediateItem`]
//! needs are extracted; everything else in the feed is skipped.

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::FetchError;

/// One `<item>` (RSS) or `<entry>` (Atom).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct FeedEntry {
    /// `<guid>` / `<id>`; empty when the feed omits it.
    pub id: String,
    pub title: String,
    pub link: String,
    /// `<description>` / `<summary>` / `<content>` with HTML removed.
    pub summary: String,
    pub author: String,
    pub published: Option<DateTime<Utc>>,
}

impl FeedEntry {
    /// Stable per-entry key: the guid if present, otherwise the link.
    pub(crate) fn key(&self) -> &str {
        if self.id.is_empty() {
            &self.link
        } else {
            &self.id
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Title,
    Link,
    Summary,
    Author,
    Published,
}

fn field_for(name: &[u8], in_author: bool) -> Option<Field> {
    match name {
        b"guid" | b"id" => Some(Field::Id),
        b"title" => Some(Field::Title),
        b"link" => Some(Field::Link),
        b"description" | b"summary" | b"content" | b"encoded" => Some(Field::Summary),
        b"author" | b"creator" => Some(Field::Author),
        b"name" if in_author => Some(Field::Author),
        b"pubDate" | b"published" | b"updated" | b"date" => Some(Field::Published),
        _ => None,
    }
}

/// Parse an RSS or Atom document, stopping after `max_entries` complete entries.
///
/// Entries without a title or link are dropped.
///
/// # Errors
///
/// Returns [`FetchError::Transient`] when the document is not well-formed XML.
pub(crate) fn parse_feed(xml: &str, max_entries: usize) -> Result<Vec<FeedEntry>, FetchError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<FeedEntry> = None;
    let mut published_raw = String::new();
    let mut field: Option<Field> = None;
    let mut in_author = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name();
                let name = name.as_ref();
                if name == b"item" || name == b"entry" {
                    current = Some(FeedEntry::default());
                    published_raw.clear();
                    field = None;
                    in_author = false;
                } else if current.is_some() {
                    if name == b"author" {
                        in_author = true;
                    }
                    if name == b"link" {
                        if let (Some(entry), Some(href)) = (current.as_mut(), link_href(&e)) {
                            if entry.link.is_empty() {
                                entry.link = href;
                            }
                        }
                    }
                    // Nested markup inside a summary keeps feeding the summary.
                    if field != Some(Field::Summary) {
                        if let Some(next) = field_for(name, in_author) {
                            field = Some(next);
                        }
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"link" {
                    if let (Some(entry), Some(href)) = (current.as_mut(), link_href(&e)) {
                        if entry.link.is_empty() {
                            entry.link = href;
                        }
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                let name = name.as_ref();
                if name == b"item" || name == b"entry" {
                    if let Some(mut entry) = current.take() {
                        entry.published = parse_timestamp(&published_raw);
                        entry.summary = strip_html(&entry.summary);
                        if !entry.title.is_empty() && !entry.link.is_empty() {
                            entries.push(entry);
                            if entries.len() >= max_entries {
                                break;
                            }
                        }
                    }
                    field = None;
                } else {
                    if name == b"author" {
                        in_author = false;
                    }
                    if field_for(name, true) == field {
                        field = None;
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if let (Some(entry), Some(target)) = (current.as_mut(), field) {
                    let text = e.unescape().map_err(|e| FetchError::decode("feed text", e))?;
                    assign(entry, &mut published_raw, target, &text);
                }
            }
            Ok(Event::CData(e)) => {
                if let (Some(entry), Some(target)) = (current.as_mut(), field) {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    assign(entry, &mut published_raw, target, &text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(FetchError::decode("feed XML", e)),
            _ => {}
        }
    }

    Ok(entries)
}

fn assign(entry: &mut FeedEntry, published_raw: &mut String, field: Field, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    match field {
        Field::Summary => {
            if !entry.summary.is_empty() {
                entry.summary.push(' ');
            }
            entry.summary.push_str(text);
        }
        Field::Id => set_once(&mut entry.id, text),
        Field::Title => set_once(&mut entry.title, text),
        Field::Link => set_once(&mut entry.link, text),
        Field::Author => set_once(&mut entry.author, text),
        Field::Published => set_once(published_raw, text),
    }
}

fn set_once(slot: &mut String, text: &str) {
    if slot.is_empty() {
        *slot = text.to_string();
    }
}

/// `href` of an Atom `<link>`, skipping non-alternate relations.
fn link_href(e: &BytesStart<'_>) -> Option<String> {
    let mut href = None;
    let mut rel_ok = true;
    for attr in e.attributes().flatten() {
        match attr.key.local_name().as_ref() {
            b"href" => href = attr.unescape_value().ok().map(|v| v.into_owned()),
            b"rel" => rel_ok = attr.value.as_ref() == b"alternate",
            _ => {}
        }
    }
    href.filter(|h| rel_ok && !h.is_empty())
}

/// RFC 2822 (RSS `pubDate`) or RFC 3339 (Atom).
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Strip HTML tags from a string and normalize whitespace.
pub(crate) fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    let decoded = out
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}
