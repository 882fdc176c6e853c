use std::collections::HashMap;

use crate::{Error, Result};

const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROWTH: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(usize);

#[derive(Debug, Clone)]
pub(crate) enum NodeType {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    node_type: NodeType,
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub(crate) tag_name: String,
    pub(crate) attrs: HashMap<String, String>,
}

impl Element {
    pub(crate) fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub(crate) fn non_empty_attr(&self, name: &str) -> Option<&str> {
        self.attr(name).filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Dom {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Dom {
    fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            node_type: NodeType::Document,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    fn create_node(&mut self, parent: NodeId, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            node_type,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    fn create_element(
        &mut self,
        parent: NodeId,
        tag_name: String,
        attrs: HashMap<String, String>,
    ) -> NodeId {
        self.create_node(parent, NodeType::Element(Element { tag_name, attrs }))
    }

    fn create_text(&mut self, parent: NodeId, text: String) -> NodeId {
        self.create_node(parent, NodeType::Text(text))
    }

    pub(crate) fn root(&self) -> NodeId {
        self.root
    }

    pub(crate) fn element(&self, node_id: NodeId) -> Option<&Element> {
        match &self.nodes[node_id.0].node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn tag_name(&self, node_id: NodeId) -> Option<&str> {
        self.element(node_id).map(|e| e.tag_name.as_str())
    }

    #[cfg(test)]
    pub(crate) fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes[node_id.0].parent
    }

    pub(crate) fn children(&self, node_id: NodeId) -> &[NodeId] {
        &self.nodes[node_id.0].children
    }

    /// Elements below `root` in document (pre-)order, `root` excluded.
    pub(crate) fn descendant_elements(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut pending = self.children(root).iter().rev().copied().collect::<Vec<_>>();
        while let Some(node) = pending.pop() {
            if self.element(node).is_some() {
                out.push(node);
            }
            pending.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    pub(crate) fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.descendant_elements(self.root)
            .into_iter()
            .filter(|node| self.tag_name(*node) == Some(tag))
            .collect()
    }

    pub(crate) fn first_descendant_by_tag(&self, root: NodeId, tag: &str) -> Option<NodeId> {
        self.descendant_elements(root)
            .into_iter()
            .find(|node| self.tag_name(*node) == Some(tag))
    }

    /// Text of every visible text node below `node_id`, each trimmed, empty
    /// pieces dropped, joined with a single space.
    pub(crate) fn visible_text(&self, node_id: NodeId) -> String {
        let mut parts = Vec::new();
        self.collect_visible_text(node_id, &mut parts);
        parts.join(" ")
    }

    fn collect_visible_text<'a>(&'a self, node_id: NodeId, out: &mut Vec<&'a str>) {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, move || {
            match &self.nodes[node_id.0].node_type {
                NodeType::Text(text) => {
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        out.push(trimmed);
                    }
                }
                NodeType::Element(element) if is_hidden_text_container(&element.tag_name) => {}
                NodeType::Document | NodeType::Element(_) => {
                    for child in &self.nodes[node_id.0].children {
                        self.collect_visible_text(*child, out);
                    }
                }
            }
        })
    }
}

fn is_hidden_text_container(tag: &str) -> bool {
    matches!(tag, "script" | "style" | "template")
}

pub(crate) fn decode_html_character_references(src: &str) -> String {
    if !src.contains('&') {
        return src.to_string();
    }

    fn is_entity_token_char(ch: char) -> bool {
        ch.is_ascii_alphanumeric() || ch == '#'
    }

    fn decode_numeric(value: &str) -> Option<char> {
        let codepoint =
            if let Some(hex) = value.strip_prefix('x').or_else(|| value.strip_prefix('X')) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                value.parse::<u32>().ok()?
            };
        char::from_u32(codepoint)
    }

    fn decode_named(value: &str) -> Option<char> {
        match value {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{00A0}'),
            "ensp" => Some('\u{2002}'),
            "emsp" => Some('\u{2003}'),
            "thinsp" => Some('\u{2009}'),
            "copy" => Some('©'),
            "reg" => Some('®'),
            "trade" => Some('™'),
            "euro" => Some('€'),
            "pound" => Some('£'),
            "yen" => Some('¥'),
            "laquo" => Some('«'),
            "raquo" => Some('»'),
            "ldquo" => Some('“'),
            "rdquo" => Some('”'),
            "lsquo" => Some('‘'),
            "rsquo" => Some('’'),
            "ndash" => Some('–'),
            "mdash" => Some('—'),
            "hellip" => Some('…'),
            "middot" => Some('·'),
            "bull" => Some('•'),
            "larr" => Some('←'),
            "rarr" => Some('→'),
            "uarr" => Some('↑'),
            "darr" => Some('↓'),
            _ => None,
        }
    }

    let mut out = String::with_capacity(src.len());
    let mut rest = src;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp + 1..];

        let token_end = tail
            .char_indices()
            .find_map(|(idx, ch)| (!is_entity_token_char(ch)).then_some(idx))
            .unwrap_or(tail.len());
        let raw = &tail[..token_end];
        let decoded = if raw.is_empty() {
            None
        } else if let Some(number) = raw.strip_prefix('#') {
            decode_numeric(number)
        } else {
            decode_named(raw)
        };

        match decoded {
            Some(value) => {
                out.push(value);
                let consumed = if tail[token_end..].starts_with(';') {
                    token_end + 1
                } else {
                    token_end
                };
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = tail;
            }
        }
    }
    out.push_str(rest);

    out
}

pub(crate) fn parse_html(html: &str) -> Result<Dom> {
    let mut dom = Dom::new();

    let mut stack = vec![dom.root];
    let bytes = html.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        // Unterminated comments run to the end of input.
        if starts_with_at(bytes, i, b"<!--") {
            i = find_subslice(bytes, i + 4, b"-->").map_or(bytes.len(), |end| end + 3);
            continue;
        }

        if bytes[i] == b'<' && starts_tag(bytes, i) {
            if starts_with_at(bytes, i, b"</") {
                let (tag, next) = parse_end_tag(html, i)?;
                i = next;
                close_open_element(&dom, &mut stack, &tag);
                continue;
            }

            if starts_with_at(bytes, i, b"<!") || starts_with_at(bytes, i, b"<?") {
                i = parse_declaration_tag(html, i)?;
                continue;
            }

            let (tag, attrs, self_closing, next) = parse_start_tag(html, i)?;
            i = next;
            close_optional_description_item_start_tag(&dom, &mut stack, &tag);
            close_optional_list_item_start_tag(&dom, &mut stack, &tag);
            close_optional_option_start_tag(&dom, &mut stack, &tag);
            close_optional_paragraph_start_tag(&dom, &mut stack, &tag);
            close_nested_anchor_start_tag(&dom, &mut stack, &tag);

            let parent = *stack
                .last()
                .ok_or_else(|| Error::HtmlParse("missing parent element".into()))?;
            let node = dom.create_element(parent, tag.clone(), attrs);

            if let Some(decode) = raw_text_decoding(&tag).filter(|_| !self_closing) {
                let close = find_case_insensitive_raw_end_tag(bytes, i, tag.as_bytes())
                    .unwrap_or(bytes.len());
                if let Some(body) = html.get(i..close) {
                    let body = if decode {
                        decode_html_character_references(body)
                    } else {
                        body.to_string()
                    };
                    if !body.is_empty() {
                        dom.create_text(node, body);
                    }
                }
                i = if close < bytes.len() {
                    parse_end_tag(html, close)?.1
                } else {
                    close
                };
                continue;
            }

            if !self_closing && !is_void_tag(&tag) {
                stack.push(node);
            }
            continue;
        }

        let text_start = i;
        i += 1;
        while i < bytes.len() && !(bytes[i] == b'<' && starts_tag(bytes, i)) {
            i += 1;
        }

        if let Some(text) = html.get(text_start..i) {
            let parent = *stack
                .last()
                .ok_or_else(|| Error::HtmlParse("missing parent element".into()))?;
            let decoded = decode_html_character_references(text);
            if !decoded.is_empty() {
                dom.create_text(parent, decoded);
            }
        }
    }

    Ok(dom)
}

// A lone '<' that does not open markup is text.
fn starts_tag(bytes: &[u8], at: usize) -> bool {
    match bytes.get(at + 1) {
        Some(b'/') => bytes.get(at + 2).is_some_and(|b| b.is_ascii_alphabetic()),
        Some(b'!') | Some(b'?') => true,
        Some(b) => b.is_ascii_alphabetic(),
        None => false,
    }
}

fn close_open_element(dom: &Dom, stack: &mut Vec<NodeId>, tag: &str) {
    let Some(index) = (1..stack.len())
        .rev()
        .find(|index| dom.tag_name(stack[*index]) == Some(tag))
    else {
        return;
    };
    stack.truncate(index);
}

fn raw_text_decoding(tag: &str) -> Option<bool> {
    match tag {
        "script" | "style" => Some(false),
        "title" | "textarea" => Some(true),
        _ => None,
    }
}

fn close_optional_description_item_start_tag(dom: &Dom, stack: &mut Vec<NodeId>, tag: &str) {
    if !(tag == "dt" || tag == "dd") {
        return;
    }

    let mut close_index = None;
    for index in (1..stack.len()).rev() {
        let Some(open_tag) = dom.tag_name(stack[index]) else {
            continue;
        };
        if open_tag == "dt" || open_tag == "dd" {
            close_index = Some(index);
            break;
        }
        if open_tag == "dl" {
            break;
        }
    }

    if let Some(index) = close_index {
        stack.truncate(index);
    }
}

fn close_optional_list_item_start_tag(dom: &Dom, stack: &mut Vec<NodeId>, tag: &str) {
    if tag != "li" {
        return;
    }

    let mut close_index = None;
    for index in (1..stack.len()).rev() {
        let Some(open_tag) = dom.tag_name(stack[index]) else {
            continue;
        };
        if open_tag == "li" {
            close_index = Some(index);
            break;
        }
        if matches!(open_tag, "ol" | "ul" | "menu") {
            break;
        }
    }

    if let Some(index) = close_index {
        stack.truncate(index);
    }
}

fn close_optional_option_start_tag(dom: &Dom, stack: &mut Vec<NodeId>, tag: &str) {
    if !(tag == "option" || tag == "optgroup") {
        return;
    }

    let mut close_index = None;
    for index in (1..stack.len()).rev() {
        let Some(open_tag) = dom.tag_name(stack[index]) else {
            continue;
        };
        if open_tag == "option" {
            close_index = Some(index);
            break;
        }
        if matches!(open_tag, "optgroup" | "select" | "datalist") {
            break;
        }
    }

    if let Some(index) = close_index {
        stack.truncate(index);
    }
}

fn close_optional_paragraph_start_tag(dom: &Dom, stack: &mut Vec<NodeId>, tag: &str) {
    if !is_optional_paragraph_terminator_tag(tag) {
        return;
    }

    let close_index = (1..stack.len())
        .rev()
        .find(|index| dom.tag_name(stack[*index]) == Some("p"));

    if let Some(index) = close_index {
        stack.truncate(index);
    }
}

// Anchors do not nest: a new <a> closes any open one.
fn close_nested_anchor_start_tag(dom: &Dom, stack: &mut Vec<NodeId>, tag: &str) {
    if tag == "a" {
        close_open_element(dom, stack, "a");
    }
}

fn is_optional_paragraph_terminator_tag(tag: &str) -> bool {
    matches!(
        tag,
        "address"
            | "article"
            | "aside"
            | "blockquote"
            | "details"
            | "div"
            | "dl"
            | "fieldset"
            | "figcaption"
            | "figure"
            | "footer"
            | "form"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "header"
            | "hgroup"
            | "hr"
            | "main"
            | "menu"
            | "nav"
            | "ol"
            | "p"
            | "pre"
            | "section"
            | "table"
            | "ul"
    )
}

fn parse_start_tag(
    html: &str,
    at: usize,
) -> Result<(String, HashMap<String, String>, bool, usize)> {
    let bytes = html.as_bytes();
    let mut i = at;
    if bytes.get(i) != Some(&b'<') {
        return Err(Error::HtmlParse("expected '<'".into()));
    }
    i += 1;

    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }

    let tag = html
        .get(tag_start..i)
        .ok_or_else(|| Error::HtmlParse("invalid tag name".into()))?
        .to_ascii_lowercase();

    if tag.is_empty() {
        return Err(Error::HtmlParse("empty tag name".into()));
    }

    let mut attrs = HashMap::new();
    let mut self_closing = false;

    loop {
        skip_ws(bytes, &mut i);
        if i >= bytes.len() {
            break;
        }

        if bytes[i] == b'>' {
            i += 1;
            break;
        }

        if bytes[i] == b'/' && i + 1 < bytes.len() && bytes[i + 1] == b'>' {
            self_closing = true;
            i += 2;
            break;
        }

        if !is_attr_name_char(bytes[i]) {
            // Skip junk such as the stray quotes in href=""/en/"tools/".
            while i < bytes.len()
                && !bytes[i].is_ascii_whitespace()
                && bytes[i] != b'>'
                && !(bytes[i] == b'/' && i + 1 < bytes.len() && bytes[i + 1] == b'>')
            {
                i += 1;
            }
            continue;
        }

        let name_start = i;
        while i < bytes.len() && is_attr_name_char(bytes[i]) {
            i += 1;
        }

        let name = html
            .get(name_start..i)
            .ok_or_else(|| Error::HtmlParse("invalid attribute name".into()))?
            .to_ascii_lowercase();

        skip_ws(bytes, &mut i);

        let value = if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            skip_ws(bytes, &mut i);
            parse_attr_value(html, bytes, &mut i)?
        } else {
            String::new()
        };

        attrs.insert(name, value);
    }

    Ok((tag, attrs, self_closing, i))
}

fn parse_declaration_tag(html: &str, at: usize) -> Result<usize> {
    let bytes = html.as_bytes();
    let mut i = at + 2;

    let mut single_quoted = false;
    let mut double_quoted = false;
    let mut bracket_depth = 0usize;

    while i < bytes.len() {
        let b = bytes[i];

        if single_quoted {
            if b == b'\'' {
                single_quoted = false;
            }
            i += 1;
            continue;
        }

        if double_quoted {
            if b == b'"' {
                double_quoted = false;
            }
            i += 1;
            continue;
        }

        match b {
            b'\'' => single_quoted = true,
            b'"' => double_quoted = true,
            b'[' => bracket_depth += 1,
            b']' if bracket_depth > 0 => bracket_depth -= 1,
            b'>' if bracket_depth == 0 => return Ok(i + 1),
            _ => {}
        }

        i += 1;
    }

    Ok(bytes.len())
}

fn parse_end_tag(html: &str, at: usize) -> Result<(String, usize)> {
    let bytes = html.as_bytes();
    let mut i = at;

    if !(bytes.get(i) == Some(&b'<') && bytes.get(i + 1) == Some(&b'/')) {
        return Err(Error::HtmlParse("expected end tag".into()));
    }
    i += 2;
    skip_ws(bytes, &mut i);

    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }

    let tag = html
        .get(tag_start..i)
        .ok_or_else(|| Error::HtmlParse("invalid end tag".into()))?
        .to_ascii_lowercase();

    while i < bytes.len() && bytes[i] != b'>' {
        i += 1;
    }

    Ok((tag, (i + 1).min(bytes.len())))
}

fn parse_attr_value(html: &str, bytes: &[u8], i: &mut usize) -> Result<String> {
    if *i >= bytes.len() {
        return Ok(String::new());
    }

    if bytes[*i] == b'\'' || bytes[*i] == b'"' {
        let quote = bytes[*i];
        *i += 1;
        let start = *i;
        let end = find_subslice(bytes, start, &[quote]);
        // An unterminated value stops at the next '>' so the tag still closes.
        let value_end = end
            .or_else(|| find_subslice(bytes, start, b">"))
            .unwrap_or(bytes.len());
        let value = html
            .get(start..value_end)
            .ok_or_else(|| Error::HtmlParse("invalid attribute value".into()))?;
        *i = if end.is_some() { value_end + 1 } else { value_end };
        return Ok(decode_html_character_references(value));
    }

    let start = *i;
    while *i < bytes.len()
        && !bytes[*i].is_ascii_whitespace()
        && bytes[*i] != b'>'
        && !(bytes[*i] == b'/' && *i + 1 < bytes.len() && bytes[*i + 1] == b'>')
    {
        *i += 1;
    }

    let value = html
        .get(start..*i)
        .ok_or_else(|| Error::HtmlParse("invalid attribute value".into()))?;
    Ok(decode_html_character_references(value))
}

fn skip_ws(bytes: &[u8], i: &mut usize) {
    while *i < bytes.len() && bytes[*i].is_ascii_whitespace() {
        *i += 1;
    }
}

fn is_tag_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

fn is_attr_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':' || b == b'@' || b == b'.'
}

fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn starts_with_at(bytes: &[u8], at: usize, needle: &[u8]) -> bool {
    bytes.get(at..at + needle.len()) == Some(needle)
}

fn find_subslice(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || from > bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
}

fn find_case_insensitive_raw_end_tag(bytes: &[u8], from: usize, tag: &[u8]) -> Option<usize> {
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] == b'<' && bytes.get(i + 1) == Some(&b'/') {
            let mut j = i + 2;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            let tag_end = j + tag.len();
            if tag_end <= bytes.len() && bytes[j..tag_end].eq_ignore_ascii_case(tag) {
                if tag_end >= bytes.len() || !bytes[tag_end].is_ascii_alphanumeric() {
                    return Some(i);
                }
            }
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(dom: &Dom, tag: &str) -> NodeId {
        dom.elements_by_tag(tag)
            .into_iter()
            .next()
            .unwrap_or_else(|| panic!("no <{tag}> in document"))
    }

    #[test]
    fn builds_nested_tree_in_document_order() -> Result<()> {
        let dom = parse_html(
            "<!DOCTYPE html><html><body><nav><a href='/'>Home</a><a href=/about>About</a></nav></body></html>",
        )?;
        let anchors = dom.elements_by_tag("a");
        assert_eq!(anchors.len(), 2);
        let hrefs = anchors
            .iter()
            .filter_map(|a| dom.element(*a).and_then(|e| e.attr("href")))
            .collect::<Vec<_>>();
        assert_eq!(hrefs, vec!["/", "/about"]);
        let nav = first(&dom, "nav");
        assert_eq!(dom.parent(anchors[0]), Some(nav));
        Ok(())
    }

    #[test]
    fn visible_text_trims_and_joins_pieces() -> Result<()> {
        let dom = parse_html("<a>\n  Read <b>the</b>\n docs  <span> </span></a>")?;
        assert_eq!(dom.visible_text(first(&dom, "a")), "Read the docs");
        Ok(())
    }

    #[test]
    fn visible_text_skips_script_style_and_template() -> Result<()> {
        let dom = parse_html(
            "<a>Go<script>var x = '<a>';</script><style>a{}</style><template>hidden</template></a>",
        )?;
        assert_eq!(dom.elements_by_tag("a").len(), 1);
        assert_eq!(dom.visible_text(first(&dom, "a")), "Go");
        Ok(())
    }

    #[test]
    fn decodes_references_in_text_and_attributes() -> Result<()> {
        let dom = parse_html("<a title=\"Tom &amp; Jerry\">Caf&#233; &lt;3 &copy &bogus;</a>")?;
        let a = first(&dom, "a");
        assert_eq!(dom.element(a).and_then(|e| e.attr("title")), Some("Tom & Jerry"));
        assert_eq!(dom.visible_text(a), "Café <3 © &bogus;");
        Ok(())
    }

    #[test]
    fn valueless_attribute_is_empty() -> Result<()> {
        let dom = parse_html("<a href aria-label>x</a>")?;
        let a = dom.element(first(&dom, "a")).map(|e| e.attrs.clone());
        assert_eq!(a.as_ref().and_then(|attrs| attrs.get("href")).map(String::as_str), Some(""));
        assert_eq!(
            a.as_ref().and_then(|attrs| attrs.get("aria-label")).map(String::as_str),
            Some("")
        );
        Ok(())
    }

    #[test]
    fn unclosed_anchor_is_closed_by_next_anchor() -> Result<()> {
        let dom = parse_html("<a href=1>one<a href=2>two</a>")?;
        let anchors = dom.elements_by_tag("a");
        assert_eq!(anchors.len(), 2);
        assert_eq!(dom.visible_text(anchors[0]), "one");
        assert_eq!(dom.visible_text(anchors[1]), "two");
        Ok(())
    }

    #[test]
    fn list_items_close_implicitly() -> Result<()> {
        let dom = parse_html("<ul><li><a>A</a><li><a>B</a></ul>")?;
        let items = dom.elements_by_tag("li");
        assert_eq!(items.len(), 2);
        assert_eq!(dom.visible_text(items[0]), "A");
        Ok(())
    }

    #[test]
    fn stray_end_tags_and_lone_brackets_are_tolerated() -> Result<()> {
        let dom = parse_html("</div><p>1 < 2</span></p>")?;
        assert_eq!(dom.visible_text(first(&dom, "p")), "1 < 2");
        Ok(())
    }

    #[test]
    fn unclosed_comment_runs_to_end_of_input() -> Result<()> {
        let dom = parse_html("<a href=\"/a\">A</a><a href=\"/b\">B</a><!-- never closed <a>C</a>")?;
        let anchors = dom.elements_by_tag("a");
        assert_eq!(anchors.len(), 2);
        assert_eq!(dom.visible_text(anchors[1]), "B");
        Ok(())
    }

    #[test]
    fn truncated_markup_keeps_what_came_before() -> Result<()> {
        for html in [
            "<a href=\"/a\">A</a><a href=\"/b",
            "<a href=\"/a\">A</a><a href=\"/b\"",
            "<a href=\"/a\">A</a></a",
            "<a href=\"/a\">A</a><!DOCTYPE html",
            "<a href=\"/a\">A</a><script>var x = 1;",
        ] {
            let dom = parse_html(html)?;
            let a = first(&dom, "a");
            assert_eq!(dom.element(a).and_then(|e| e.attr("href")), Some("/a"), "{html}");
            assert_eq!(dom.visible_text(a), "A", "{html}");
        }
        Ok(())
    }

    #[test]
    fn unterminated_quoted_value_stops_at_tag_end() -> Result<()> {
        let dom = parse_html("<a href=\"/ok\">Ok</a><a href=\"/broken>Broken</a><p>after")?;
        let anchors = dom.elements_by_tag("a");
        assert_eq!(anchors.len(), 2);
        assert_eq!(dom.element(anchors[0]).and_then(|e| e.attr("href")), Some("/ok"));
        assert_eq!(dom.element(anchors[1]).and_then(|e| e.attr("href")), Some("/broken"));
        assert_eq!(dom.visible_text(anchors[1]), "Broken");
        assert_eq!(dom.visible_text(first(&dom, "p")), "after");
        Ok(())
    }

    #[test]
    fn unclosed_raw_text_element_runs_to_end_of_input() -> Result<()> {
        let dom = parse_html("<a>Go</a><title>Acme &amp; Co")?;
        let title = first(&dom, "title");
        assert_eq!(dom.visible_text(title), "Acme & Co");
        assert_eq!(dom.elements_by_tag("a").len(), 1);
        Ok(())
    }

    #[test]
    fn deep_nesting_does_not_overflow() -> Result<()> {
        let depth = 5_000;
        let html = format!("{}<a>deep</a>{}", "<div>".repeat(depth), "</div>".repeat(depth));
        let dom = parse_html(&html)?;
        assert_eq!(dom.visible_text(dom.root()), "deep");
        Ok(())
    }
}
