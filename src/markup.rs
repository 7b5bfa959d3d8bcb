//! XHTML-like markup codec for the document tree.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::MarkupError;
use crate::node::{assign_text_runs, DocumentNode, ElementNode, TextNode};

/// Parse markup into a forest and assign text runs in document order.
///
/// Void HTML tags (`<br>`, `<img>`, ...) need no closing tag, mismatched end
/// tags close up to their nearest open match, and whitespace-only text used
/// purely for indentation between blocks is dropped.
pub fn parse_markup(markup: &str) -> Result<Vec<DocumentNode>, MarkupError> {
    let mut reader = Reader::from_reader(markup.as_bytes());
    reader.config_mut().trim_text(false);
    reader.config_mut().check_end_names = false;
    let mut buf = Vec::with_capacity(64);
    let mut builder = TreeBuilder::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let el = element_from_start(&reader, &e)?;
                if is_void_tag(&el.tag) {
                    builder.push_node(el.into());
                } else {
                    builder.open(el);
                }
            }
            Ok(Event::Empty(e)) => {
                let el = element_from_start(&reader, &e)?;
                builder.push_node(el.into());
            }
            Ok(Event::End(e)) => {
                let tag = decode_tag_name(&reader, e.name().as_ref())?;
                if !is_void_tag(&tag) {
                    builder.close(&tag);
                }
            }
            Ok(Event::Text(e)) => {
                let text = e.decode().map_err(|err| MarkupError::Decode {
                    offset: reader.buffer_position(),
                    source: "text node",
                    message: format!("{:?}", err),
                })?;
                builder.push_text(text.as_ref());
            }
            Ok(Event::CData(e)) => {
                let text = reader
                    .decoder()
                    .decode(&e)
                    .map_err(|err| MarkupError::Decode {
                        offset: reader.buffer_position(),
                        source: "cdata",
                        message: format!("{:?}", err),
                    })?;
                builder.push_text(text.as_ref());
            }
            Ok(Event::GeneralRef(e)) => {
                let name = e.decode().map_err(|err| MarkupError::Decode {
                    offset: reader.buffer_position(),
                    source: "entity",
                    message: format!("{:?}", err),
                })?;
                builder.push_text(&resolve_entity(name.as_ref()));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(MarkupError::Tokenize {
                    offset: reader.error_position(),
                    message: err.to_string(),
                });
            }
        }
        buf.clear();
    }

    let mut nodes = builder.finish();
    assign_text_runs(&mut nodes);
    Ok(nodes)
}

/// Serialize a forest back to markup.
pub fn to_markup(nodes: &[DocumentNode]) -> String {
    let mut out = String::with_capacity(nodes.len() * 32);
    for node in nodes {
        write_node(node, &mut out);
    }
    out
}

fn write_node(node: &DocumentNode, out: &mut String) {
    match node {
        DocumentNode::Text(text) => out.push_str(&quick_xml::escape::escape(text.text.as_str())),
        DocumentNode::Element(el) => {
            out.push('<');
            out.push_str(&el.tag);
            if !el.classes.is_empty() {
                out.push_str(" class=\"");
                out.push_str(&quick_xml::escape::escape(el.classes.join(" ").as_str()));
                out.push('"');
            }
            for (key, value) in el.attrs.iter() {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                out.push_str(&quick_xml::escape::escape(value.as_str()));
                out.push('"');
            }
            if el.children.is_empty() && is_void_tag(&el.tag) {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for child in &el.children {
                write_node(child, out);
            }
            out.push_str("</");
            out.push_str(&el.tag);
            out.push('>');
        }
    }
}

#[derive(Default)]
struct TreeBuilder {
    root: Vec<DocumentNode>,
    stack: Vec<ElementNode>,
}

impl TreeBuilder {
    fn children_mut(&mut self) -> &mut Vec<DocumentNode> {
        match self.stack.last_mut() {
            Some(el) => &mut el.children,
            None => &mut self.root,
        }
    }

    fn open(&mut self, el: ElementNode) {
        self.stack.push(el);
    }

    fn close(&mut self, tag: &str) {
        let Some(depth) = self.stack.iter().rposition(|el| el.tag == tag) else {
            log::debug!("ignoring unmatched end tag </{}>", tag);
            return;
        };
        while self.stack.len() > depth {
            self.close_innermost();
        }
    }

    fn close_innermost(&mut self) {
        if let Some(mut el) = self.stack.pop() {
            if is_container_tag(&el.tag) {
                prune_layout_whitespace(&mut el.children);
            }
            self.push_node(el.into());
        }
    }

    fn push_node(&mut self, node: DocumentNode) {
        self.children_mut().push(node);
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let children = self.children_mut();
        if let Some(DocumentNode::Text(last)) = children.last_mut() {
            last.text.push_str(text);
        } else {
            children.push(TextNode::new(text).into());
        }
    }

    fn finish(mut self) -> Vec<DocumentNode> {
        while !self.stack.is_empty() {
            self.close_innermost();
        }
        prune_layout_whitespace(&mut self.root);
        self.root
    }
}

fn prune_layout_whitespace(children: &mut Vec<DocumentNode>) {
    children.retain(|child| !child.is_blank());
}

fn element_from_start(
    reader: &Reader<&[u8]>,
    e: &BytesStart<'_>,
) -> Result<ElementNode, MarkupError> {
    let tag = decode_tag_name(reader, e.name().as_ref())?;
    let mut el = ElementNode::new(tag);
    let mut attrs = BTreeMap::new();
    for attr in e.attributes().flatten() {
        let key = match reader.decoder().decode(attr.key.as_ref()) {
            Ok(v) => v.to_ascii_lowercase(),
            Err(_) => continue,
        };
        let raw = match reader.decoder().decode(&attr.value) {
            Ok(v) => v.to_string(),
            Err(_) => continue,
        };
        let value = match quick_xml::escape::unescape(&raw) {
            Ok(v) => v.into_owned(),
            Err(_) => raw,
        };
        if key == "class" {
            for class in value.split_whitespace() {
                el.add_class(class);
            }
        } else {
            attrs.insert(key, value);
        }
    }
    el.attrs = Arc::new(attrs);
    Ok(el)
}

fn decode_tag_name(reader: &Reader<&[u8]>, raw: &[u8]) -> Result<String, MarkupError> {
    let decoded = reader
        .decoder()
        .decode(raw)
        .map_err(|err| MarkupError::Decode {
            offset: reader.buffer_position(),
            source: "tag name",
            message: format!("{:?}", err),
        })?;
    let local_name = decoded.rsplit(':').next().unwrap_or(decoded.as_ref());
    Ok(local_name.to_ascii_lowercase())
}

fn resolve_entity(name: &str) -> String {
    let mut entity = String::with_capacity(name.len() + 2);
    entity.push('&');
    entity.push_str(name);
    entity.push(';');
    if let Ok(resolved) = quick_xml::escape::unescape(&entity) {
        return resolved.into_owned();
    }
    let named = match name {
        "nbsp" => "\u{00A0}",
        "mdash" => "\u{2014}",
        "ndash" => "\u{2013}",
        "hellip" => "\u{2026}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201C}",
        "rdquo" => "\u{201D}",
        "copy" => "\u{00A9}",
        _ => {
            log::debug!("unknown entity &{};, keeping literal", name);
            return entity;
        }
    };
    named.to_string()
}

fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag,
        "br" | "img" | "hr" | "input" | "meta" | "link" | "col" | "wbr" | "area" | "source"
    )
}

// Containers whose whitespace-only text children are source indentation.
fn is_container_tag(tag: &str) -> bool {
    matches!(
        tag,
        "div"
            | "section"
            | "article"
            | "body"
            | "ul"
            | "ol"
            | "table"
            | "thead"
            | "tbody"
            | "tr"
            | "blockquote"
            | "figure"
            | "header"
            | "footer"
    )
}
