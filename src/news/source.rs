// src/news/source.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use std::time::Duration;

use crate::news::types::{FeedFetcher, FeedItem};

const ATOM_NS: &[u8] = b"http://www.w3.org/2005/Atom";

/// Some providers (Reuters, CNN) answer 403 to non-browser clients.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0";

/// HTTP-backed feed source. Never returns an error to the caller.
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: reqwest::Client,
}

impl HttpFeedSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(timeout)
            .build()
            .context("building feed http client")?;
        Ok(Self { client })
    }

    async fn fetch_body(&self, url: &str) -> Result<String> {
        let resp = self.client.get(url).send().await.context("feed http get()")?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("feed responded with status {status}"));
        }
        resp.text().await.context("feed http .text()")
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedSource {
    async fn fetch(&self, url: &str, limit: usize) -> Vec<FeedItem> {
        counter!("feed_fetch_total").increment(1);

        let body = match self.fetch_body(url).await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = %e, url, "feed fetch failed");
                counter!("feed_fetch_errors_total", "stage" => "http").increment(1);
                return Vec::new();
            }
        };

        let t0 = std::time::Instant::now();
        let items = match parse_feed(&body, limit) {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(error = %e, url, "feed parse failed");
                counter!("feed_fetch_errors_total", "stage" => "parse").increment(1);
                Vec::new()
            }
        };
        histogram!("feed_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("feed_items_total").increment(items.len() as u64);
        tracing::debug!(url, items = items.len(), "feed fetched");
        items
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Flavor {
    Rss,
    Atom,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
}

/// An open `<item>` / `<entry>` element.
struct Open {
    flavor: Flavor,
    depth: usize,
    title: Option<String>,
    link: Option<String>,
}

impl Open {
    fn wants(&self, field: Field) -> bool {
        match field {
            Field::Title => self.title.is_none(),
            Field::Link => self.link.is_none(),
        }
    }

    fn set(&mut self, field: Field, value: String) {
        match field {
            Field::Title => self.title = Some(value),
            Field::Link => self.link = Some(value),
        }
    }
}

/// Text of a direct child currently being read.
struct Capture {
    field: Field,
    depth: usize,
    text: String,
}

/// Parse an RSS or Atom document into at most `limit` items.
///
/// RSS `<item>` elements (anywhere in the document) win; Atom `<entry>` elements are
/// only used when no RSS item survived. Items missing a title or link are dropped.
/// Any XML error, including elements left open at end of input, fails the whole document.
pub fn parse_feed(xml: &str, limit: usize) -> Result<Vec<FeedItem>> {
    let cleaned = scrub_html_entities_for_xml(xml);
    let mut reader = NsReader::from_str(&cleaned);

    let mut rss: Vec<FeedItem> = Vec::new();
    let mut atom: Vec<FeedItem> = Vec::new();
    let mut open: Option<Open> = None;
    let mut capture: Option<Capture> = None;
    let mut depth = 0usize;

    loop {
        let (ns, event) = reader.read_resolved_event().context("reading feed xml")?;
        match event {
            Event::Start(e) => {
                depth += 1;
                match open.as_mut() {
                    None => open = open_container(&ns, &e, depth),
                    Some(o) if capture.is_none() && depth == o.depth + 1 => {
                        match child_field(o.flavor, &ns, &e) {
                            Some(Field::Link) if o.flavor == Flavor::Atom => {
                                if o.wants(Field::Link) {
                                    o.set(Field::Link, href_of(&e)?);
                                }
                            }
                            Some(field) if o.wants(field) => {
                                capture = Some(Capture {
                                    field,
                                    depth,
                                    text: String::new(),
                                });
                            }
                            _ => {}
                        }
                    }
                    Some(_) => {}
                }
            }
            Event::Empty(e) => {
                if let Some(o) = open.as_mut() {
                    if capture.is_none() && depth == o.depth {
                        if let Some(field) = child_field(o.flavor, &ns, &e) {
                            if o.wants(field) {
                                let value = if o.flavor == Flavor::Atom && field == Field::Link {
                                    href_of(&e)?
                                } else {
                                    String::new()
                                };
                                o.set(field, value);
                            }
                        }
                    }
                }
            }
            Event::Text(t) => {
                if let Some(c) = capture.as_mut() {
                    if depth == c.depth {
                        c.text.push_str(&t.unescape()?);
                    }
                }
            }
            Event::CData(t) => {
                if let Some(c) = capture.as_mut() {
                    if depth == c.depth {
                        c.text.push_str(&String::from_utf8_lossy(&t.into_inner()));
                    }
                }
            }
            Event::End(_) => {
                if capture.as_ref().is_some_and(|c| c.depth == depth) {
                    if let (Some(c), Some(o)) = (capture.take(), open.as_mut()) {
                        o.set(c.field, c.text);
                    }
                }
                if open.as_ref().is_some_and(|o| o.depth == depth) {
                    if let Some(o) = open.take() {
                        let bucket = match o.flavor {
                            Flavor::Rss => &mut rss,
                            Flavor::Atom => &mut atom,
                        };
                        if bucket.len() < limit {
                            let title = o.title.unwrap_or_default();
                            let link = o.link.unwrap_or_default();
                            if let Some(item) = FeedItem::new(&title, &link) {
                                bucket.push(item);
                            }
                        }
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => {
                if depth != 0 {
                    return Err(anyhow!("unexpected end of document ({depth} open elements)"));
                }
                break;
            }
            _ => {}
        }
    }

    Ok(if rss.is_empty() { atom } else { rss })
}

fn open_container(ns: &ResolveResult, e: &BytesStart, depth: usize) -> Option<Open> {
    let local = e.local_name();
    let flavor = match (ns, local.as_ref()) {
        (ResolveResult::Unbound, b"item") => Flavor::Rss,
        (ResolveResult::Bound(Namespace(uri)), b"entry") if *uri == ATOM_NS => Flavor::Atom,
        _ => return None,
    };
    Some(Open {
        flavor,
        depth,
        title: None,
        link: None,
    })
}

fn child_field(flavor: Flavor, ns: &ResolveResult, e: &BytesStart) -> Option<Field> {
    let in_scope = match flavor {
        Flavor::Rss => matches!(ns, ResolveResult::Unbound),
        Flavor::Atom => matches!(ns, ResolveResult::Bound(Namespace(uri)) if *uri == ATOM_NS),
    };
    if !in_scope {
        return None;
    }
    match e.local_name().as_ref() {
        b"title" => Some(Field::Title),
        b"link" => Some(Field::Link),
        _ => None,
    }
}

fn href_of(e: &BytesStart) -> Result<String> {
    Ok(match e.try_get_attribute("href")? {
        Some(attr) => attr.unescape_value()?.into_owned(),
        None => String::new(),
    })
}

/// HTML entities that show up in real feeds but are undefined in XML.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>Channel title is not an item</title>
  <item><title>  First  </title><link> https://a.example/1 </link></item>
  <item><title>No link</title></item>
  <item><title><![CDATA[Second &amp; more]]></title><link>https://a.example/2</link></item>
  <item><title>Third&nbsp;one</title><link>https://a.example/3</link></item>
</channel></rss>"#;

    #[test]
    fn rss_items_are_trimmed_and_incomplete_ones_dropped() {
        let items = parse_feed(RSS, 8).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], FeedItem::new("First", "https://a.example/1").unwrap());
        assert_eq!(items[1].title, "Second &amp; more");
        assert_eq!(items[2].title, "Third one");
    }

    #[test]
    fn limit_stops_collection() {
        let items = parse_feed(RSS, 2).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].link, "https://a.example/2");
    }

    #[test]
    fn atom_is_used_only_without_rss_items() {
        let atom = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry><title> Atom entry </title><link rel="alternate" href=" https://b.example/1 "/></entry>
  <entry><title>Missing href</title><link rel="alternate"/></entry>
</feed>"#;
        let items = parse_feed(atom, 8).unwrap();
        assert_eq!(items, vec![FeedItem::new("Atom entry", "https://b.example/1").unwrap()]);
    }

    #[test]
    fn entry_outside_atom_namespace_is_ignored() {
        let doc = r#"<feed><entry><title>x</title><link href="https://c.example"/></entry></feed>"#;
        assert!(parse_feed(doc, 8).unwrap().is_empty());
    }

    #[test]
    fn namespaced_rss_children_do_not_count_as_title() {
        let doc = r#"<rss xmlns:dc="http://purl.org/dc/elements/1.1/"><channel>
  <item><dc:title>Wrong</dc:title><title>Right</title><link>https://d.example</link></item>
</channel></rss>"#;
        let items = parse_feed(doc, 8).unwrap();
        assert_eq!(items[0].title, "Right");
    }

    #[test]
    fn unclosed_document_is_an_error() {
        let doc = "<rss><channel><item><title>A</title><link>https://e.example</link></item>";
        assert!(parse_feed(doc, 8).is_err());
    }

    #[test]
    fn mismatched_tags_are_an_error() {
        assert!(parse_feed("<rss><channel></rss>", 8).is_err());
    }
}
