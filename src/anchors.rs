use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::Result;
use crate::html::{Dom, NodeId, parse_html};
use crate::normalize::normalize;

/// One `<a>` element, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnchorRecord {
    pub name: String,
    pub normalized_name: String,
    pub href_raw: String,
    pub href_resolved: String,
    pub position: usize,
}

impl AnchorRecord {
    pub fn new(
        position: usize,
        name: impl Into<String>,
        href_raw: impl Into<String>,
        href_resolved: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            normalized_name: normalize(&name),
            name,
            href_raw: href_raw.into(),
            href_resolved: href_resolved.into(),
            position,
        }
    }

    pub fn href(&self, resolve_urls: bool) -> &str {
        if resolve_urls {
            &self.href_resolved
        } else {
            &self.href_raw
        }
    }
}

/// Raw attribute view of an anchor, for eyeballing a page's links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnchorSummary {
    pub i: usize,
    pub href: String,
    pub text: String,
    pub aria_label: String,
    pub title: String,
}

pub fn extract_anchors(html: &str, base_url: Option<&str>) -> Result<Vec<AnchorRecord>> {
    let dom = parse_html(html)?;
    let id_text = build_id_text_index(&dom);
    let base = base_url.and_then(parse_base_url);

    let anchors = dom
        .elements_by_tag("a")
        .into_iter()
        .enumerate()
        .map(|(position, node)| {
            let href_raw = dom
                .element(node)
                .and_then(|element| element.attr("href"))
                .unwrap_or_default()
                .to_string();
            let href_resolved = match &base {
                Some(base) => resolve_href(base, &href_raw),
                None => href_raw.clone(),
            };
            let name = accessible_name(&dom, node, &id_text);
            AnchorRecord::new(position, name, href_raw, href_resolved)
        })
        .collect::<Vec<_>>();

    debug!(
        anchors = anchors.len(),
        ids = id_text.len(),
        resolved = base.is_some(),
        "extracted html anchors"
    );
    Ok(anchors)
}

pub fn list_anchors(html: &str) -> Result<Vec<AnchorSummary>> {
    let dom = parse_html(html)?;
    Ok(dom
        .elements_by_tag("a")
        .into_iter()
        .enumerate()
        .map(|(i, node)| {
            let attr = |name: &str| {
                dom.element(node)
                    .and_then(|element| element.attr(name))
                    .unwrap_or_default()
                    .to_string()
            };
            AnchorSummary {
                i,
                href: attr("href"),
                text: dom.visible_text(node),
                aria_label: attr("aria-label"),
                title: attr("title"),
            }
        })
        .collect())
}

fn parse_base_url(base_url: &str) -> Option<Url> {
    match Url::parse(base_url) {
        Ok(base) => Some(base),
        Err(err) => {
            debug!(base_url, %err, "base url is not absolute; keeping raw hrefs");
            None
        }
    }
}

fn resolve_href(base: &Url, href_raw: &str) -> String {
    base.join(href_raw)
        .map(String::from)
        .unwrap_or_else(|_| href_raw.to_string())
}

// Later elements win when ids repeat.
fn build_id_text_index(dom: &Dom) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for node in dom.descendant_elements(dom.root()) {
        let Some(id) = dom.element(node).and_then(|e| e.non_empty_attr("id")) else {
            continue;
        };
        let text = dom.visible_text(node);
        if !text.is_empty() {
            out.insert(id.to_string(), text);
        }
    }
    out
}

fn accessible_name(dom: &Dom, anchor: NodeId, id_text: &HashMap<String, String>) -> String {
    let Some(element) = dom.element(anchor) else {
        return String::new();
    };

    if let Some(label) = element.non_empty_attr("aria-label") {
        return label.to_string();
    }

    if let Some(labelledby) = element.non_empty_attr("aria-labelledby") {
        let parts = labelledby
            .split_whitespace()
            .filter_map(|id| id_text.get(id).map(String::as_str))
            .collect::<Vec<_>>();
        if !parts.is_empty() {
            return parts.join(" ");
        }
    }

    if let Some(title) = element.non_empty_attr("title") {
        return title.to_string();
    }

    let text = dom.visible_text(anchor);
    if !text.is_empty() {
        return text;
    }

    if let Some(img) = dom
        .first_descendant_by_tag(anchor, "img")
        .and_then(|img| dom.element(img))
    {
        if let Some(alt) = img.non_empty_attr("alt") {
            return alt.to_string();
        }
        if let Some(title) = img.non_empty_attr("title") {
            return title.to_string();
        }
    }

    String::new()
}
