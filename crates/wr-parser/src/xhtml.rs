//! Parser for `xhtml/1.0`.
//!
//! The input is read into a small element tree with `quick-xml`, then mapped
//! onto blocks. Comments written by the XHTML renderer around links, images
//! and macro output (`startwikilink:`, `startimage:`, `startmacro:`) restore
//! the original references and macro calls.

use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event as XmlEvent};
use quick_xml::reader::Reader;
use wr_xdom::{
    Block, BlockKind, Event, Format, ListKind, Listener, MacroCall, Parameters, ResourceReference,
    Syntax, Tag,
};

use crate::params::parse_params;
use crate::resolver::{ReferenceResolver, UrlResolver, XWikiImageResolver, XWikiLinkResolver};
use crate::text::push_text;
use crate::{ParseError, Parser};

/// Separator between the fields of a marker comment.
const FIELD_SEPARATOR: &str = "|-|";

/// Classes the XHTML renderer adds on its own.
const GENERATED_CLASSES: &[&str] = &[
    "wikimodel-freestanding",
    "wikimodel-verbatim",
    "wikimodel-emptyline",
    "wikicreatelink",
    "wikilink",
    "wikiexternallink",
    "wikiattachmentlink",
    "wikigeneratedlinkcontent",
    "xwikirenderingerror",
    "xwikirenderingerrordescription",
];

/// Encode `fields` for use inside an XML comment.
///
/// Every `-` and `\` is backslash-escaped so the result never contains `--`,
/// and fields are joined with `|-|`.
#[must_use]
pub fn encode_comment_fields(fields: &[&str]) -> String {
    fields
        .iter()
        .map(|field| {
            let mut out = String::with_capacity(field.len());
            for c in field.chars() {
                if c == '-' || c == '\\' {
                    out.push('\\');
                }
                out.push(c);
            }
            out
        })
        .collect::<Vec<_>>()
        .join(FIELD_SEPARATOR)
}

/// Inverse of [`encode_comment_fields`].
#[must_use]
pub fn decode_comment_fields(text: &str) -> Vec<String> {
    text.split(FIELD_SEPARATOR)
        .map(|field| {
            let mut out = String::with_capacity(field.len());
            let mut chars = field.chars();
            while let Some(c) = chars.next() {
                if c == '\\' {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                } else {
                    out.push(c);
                }
            }
            out
        })
        .collect()
}

/// XHTML parser.
#[derive(Debug, Default, Clone, Copy)]
pub struct XhtmlParser;

impl Parser for XhtmlParser {
    fn syntax(&self) -> Syntax {
        Syntax::XHTML_1_0
    }

    fn parse_events(
        &self,
        source: &str,
        document: Option<&str>,
        listener: &mut dyn Listener,
    ) -> Result<(), ParseError> {
        let nodes = read_tree(source)?;
        let converter = Converter { document };
        listener.event(Event::Start(Tag::Document, &Parameters::new()));
        converter.blocks(&nodes, listener);
        listener.event(Event::End(Tag::Document));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    /// Attributes as block parameters, minus the ones listed in `skip` and
    /// generated classes.
    fn params(&self, skip: &[&str]) -> Parameters {
        let mut params = BTreeMap::new();
        for (key, value) in &self.attrs {
            if skip.contains(&key.as_str()) || key.starts_with("xmlns") {
                continue;
            }
            if key == "class" {
                let classes: Vec<&str> = value
                    .split_whitespace()
                    .filter(|c| !GENERATED_CLASSES.contains(c))
                    .collect();
                if !classes.is_empty() {
                    params.insert(key.clone(), classes.join(" "));
                }
                continue;
            }
            params.insert(key.clone(), value.clone());
        }
        params
    }

    fn text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element(element) => collect_text(&element.children, out),
            Node::Comment(_) => {}
        }
    }
}

fn syntax_error<R>(reader: &Reader<R>, message: impl std::fmt::Display) -> ParseError {
    ParseError::Syntax {
        position: usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX),
        message: message.to_string(),
    }
}

fn push_text_node(nodes: &mut Vec<Node>, text: &str) {
    if let Some(Node::Text(last)) = nodes.last_mut() {
        last.push_str(text);
    } else {
        nodes.push(Node::Text(text.to_owned()));
    }
}

fn element<R>(reader: &Reader<R>, start: &BytesStart<'_>) -> Element {
    let local = start.local_name();
    let name = reader.decoder().decode(local.as_ref()).map_or_else(
        |_| String::from_utf8_lossy(local.as_ref()).into_owned(),
        std::borrow::Cow::into_owned,
    );
    let mut attrs = Vec::new();
    for attr in start.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
        let value = attr.unescape_value().map_or_else(
            |_| String::from_utf8_lossy(&attr.value).into_owned(),
            std::borrow::Cow::into_owned,
        );
        attrs.push((key, value));
    }
    Element {
        name: name.to_ascii_lowercase(),
        attrs,
        children: Vec::new(),
    }
}

/// Read `source` into a node list.
fn read_tree(source: &str) -> Result<Vec<Node>, ParseError> {
    let wrapped = format!("<root>{source}</root>");
    let mut reader = Reader::from_str(&wrapped);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|err| syntax_error(&reader, err))?;
        match event {
            XmlEvent::Start(start) => stack.push(element(&reader, &start)),
            XmlEvent::Empty(start) => {
                let child = element(&reader, &start);
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Element(child)),
                    None => return Err(syntax_error(&reader, "content outside of the document")),
                }
            }
            XmlEvent::End(_) => {
                let Some(done) = stack.pop() else {
                    return Err(syntax_error(&reader, "unexpected end tag"));
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Element(done)),
                    None => root = Some(done),
                }
            }
            XmlEvent::Text(text) => {
                let text = reader
                    .decoder()
                    .decode(&text)
                    .map_err(|err| syntax_error(&reader, err))?;
                if let Some(parent) = stack.last_mut() {
                    push_text_node(&mut parent.children, &text);
                }
            }
            XmlEvent::GeneralRef(entity) => {
                let entity = reader
                    .decoder()
                    .decode(&entity)
                    .map_err(|err| syntax_error(&reader, err))?;
                if let Some(parent) = stack.last_mut() {
                    push_text_node(&mut parent.children, &decode_entity(&entity));
                }
            }
            XmlEvent::CData(data) => {
                if let Some(parent) = stack.last_mut() {
                    push_text_node(&mut parent.children, &String::from_utf8_lossy(&data));
                }
            }
            XmlEvent::Comment(comment) => {
                let comment = reader
                    .decoder()
                    .decode(&comment)
                    .map_err(|err| syntax_error(&reader, err))?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::Comment(comment.into_owned()));
                }
            }
            XmlEvent::Eof => break,
            XmlEvent::Decl(_) | XmlEvent::PI(_) | XmlEvent::DocType(_) => {}
        }
    }

    if !stack.is_empty() {
        return Err(syntax_error(&reader, "unclosed element"));
    }
    Ok(root.map(|root| root.children).unwrap_or_default())
}

/// Decode an entity reference name such as `amp` or `#x2014`.
fn decode_entity(entity: &str) -> String {
    match entity {
        "lt" => "<".to_owned(),
        "gt" => ">".to_owned(),
        "amp" => "&".to_owned(),
        "apos" => "'".to_owned(),
        "quot" => "\"".to_owned(),
        "nbsp" => "\u{00a0}".to_owned(),
        s if s.starts_with('#') => {
            let code = if s.starts_with("#x") || s.starts_with("#X") {
                u32::from_str_radix(&s[2..], 16).ok()
            } else {
                s[1..].parse::<u32>().ok()
            };
            code.and_then(char::from_u32)
                .map_or_else(|| format!("&{entity};"), |c| c.to_string())
        }
        _ => format!("&{entity};"),
    }
}

/// Collapse whitespace runs the way HTML renders them.
fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if matches!(c, ' ' | '\t' | '\n' | '\r') {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

fn trim_spaces(blocks: Vec<Block>) -> Vec<Block> {
    trim_leading(trim_trailing(blocks))
}

fn trim_leading(mut blocks: Vec<Block>) -> Vec<Block> {
    let leading = blocks
        .iter()
        .take_while(|b| b.kind == BlockKind::Space)
        .count();
    blocks.drain(..leading);
    blocks
}

fn trim_trailing(mut blocks: Vec<Block>) -> Vec<Block> {
    while blocks.last().is_some_and(|b| b.kind == BlockKind::Space) {
        blocks.pop();
    }
    blocks
}

fn is_blank(node: &Node) -> bool {
    match node {
        Node::Text(text) => text.trim().is_empty(),
        _ => false,
    }
}

fn is_block_element(name: &str) -> bool {
    matches!(
        name,
        "p" | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "ul"
            | "ol"
            | "dl"
            | "blockquote"
            | "table"
            | "hr"
            | "pre"
            | "div"
            | "html"
            | "body"
            | "head"
    )
}

/// Index of the comment closing the marker opened at `start`.
fn matching_stop(nodes: &[Node], start: usize, open: &str, close: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, node) in nodes[start + 1..].iter().enumerate() {
        if let Node::Comment(comment) = node {
            if comment.starts_with(open) {
                depth += 1;
            } else if comment == close {
                if depth == 0 {
                    return Some(start + 1 + offset);
                }
                depth -= 1;
            }
        }
    }
    None
}

/// Next element sibling after `i`, skipping blank text when `skip_blank`.
fn next_element(nodes: &[Node], i: usize, skip_blank: bool) -> Option<(usize, &Element)> {
    let mut j = i + 1;
    while let Some(node) = nodes.get(j) {
        match node {
            Node::Element(element) => return Some((j, element)),
            node if skip_blank && is_blank(node) => j += 1,
            _ => return None,
        }
    }
    None
}

fn is_div(element: &Element, class: &str) -> bool {
    element.name == "div" && element.has_class(class)
}

fn find_element<'n>(nodes: &'n [Node], name: &str) -> Option<&'n Element> {
    nodes.iter().find_map(|node| match node {
        Node::Element(element) if element.name == name => Some(element),
        Node::Element(element) => find_element(&element.children, name),
        _ => None,
    })
}

fn macro_call(comment: &str, inline: bool) -> Option<MacroCall> {
    let fields = decode_comment_fields(comment);
    let mut fields = fields.into_iter();
    let id = fields.next().filter(|id| !id.is_empty())?;
    let mut call = MacroCall::new(id, inline);
    if let Some(params) = fields.next() {
        call.params = parse_params(&params);
    }
    if let Some(content) = fields.next() {
        call.content = Some(content);
    }
    Some(call)
}

struct Converter<'d> {
    document: Option<&'d str>,
}

impl Converter<'_> {
    /// Block-level content: loose inline content becomes paragraphs.
    fn blocks(&self, nodes: &[Node], listener: &mut dyn Listener) {
        let mut pending = Vec::new();
        let mut i = 0;
        while i < nodes.len() {
            match &nodes[i] {
                Node::Comment(comment) => {
                    if let Some(rest) = comment.strip_prefix("startmacro:")
                        && let Some(stop) = matching_stop(nodes, i, "startmacro:", "stopmacro")
                    {
                        flush_paragraph(&mut pending, listener);
                        if let Some(call) = macro_call(rest, false) {
                            let tag = Tag::MacroMarker(&call);
                            listener.event(Event::Start(tag, &Parameters::new()));
                            self.blocks(&nodes[i + 1..stop], listener);
                            listener.event(Event::End(tag));
                        }
                        i = stop + 1;
                        continue;
                    }
                    i = self.inline_node(nodes, i, &mut pending);
                    continue;
                }
                Node::Element(element) if is_block_element(&element.name) => {
                    flush_paragraph(&mut pending, listener);
                    i = self.block_at(nodes, i, element, true, listener);
                    continue;
                }
                node if is_blank(node) && pending.is_empty() => {}
                _ => {
                    i = self.inline_node(nodes, i, &mut pending);
                    continue;
                }
            }
            i += 1;
        }
        flush_paragraph(&mut pending, listener);
    }

    /// Convert the block element `element` found at `i`, returning the index
    /// of the next node. Runs of empty-line divs and an error followed by its
    /// description are read as one construct.
    fn block_at(
        &self,
        nodes: &[Node],
        i: usize,
        element: &Element,
        skip_blank: bool,
        listener: &mut dyn Listener,
    ) -> usize {
        if is_div(element, "wikimodel-emptyline") {
            let mut count = 1;
            let mut last = i;
            while let Some((j, sibling)) = next_element(nodes, last, skip_blank)
                && is_div(sibling, "wikimodel-emptyline")
            {
                count += 1;
                last = j;
            }
            listener.event(Event::EmptyLines(count));
            return last + 1;
        }
        if is_div(element, "xwikirenderingerror") {
            let (description, next) = match next_element(nodes, i, skip_blank) {
                Some((j, sibling)) if is_div(sibling, "xwikirenderingerrordescription") => {
                    (sibling.text().trim().to_owned(), j + 1)
                }
                _ => (String::new(), i + 1),
            };
            listener.event(Event::Error {
                message: element.text().trim(),
                description: &description,
                inline: false,
            });
            return next;
        }
        // A description without its error is dropped.
        if !is_div(element, "xwikirenderingerrordescription") {
            self.block_element(element, listener);
        }
        i + 1
    }

    fn block_element(&self, element: &Element, listener: &mut dyn Listener) {
        let name = element.name.as_str();
        match name {
            "html" | "body" => self.blocks(&element.children, listener),
            "head" => {}
            "p" => {
                let children = trim_spaces(self.inlines(&element.children));
                emit_wrapped(Tag::Paragraph, &element.params(&[]), &children, listener);
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name[1..].parse().unwrap_or(1);
                let children = trim_spaces(self.inlines(&element.children));
                emit_wrapped(Tag::Heading(level), &element.params(&["id"]), &children, listener);
            }
            "ul" | "ol" => {
                let kind = if name == "ol" {
                    ListKind::Numbered
                } else {
                    ListKind::Bulleted
                };
                listener.event(Event::Start(Tag::List(kind), &element.params(&[])));
                for li in child_elements(&element.children, &["li"]) {
                    listener.event(Event::Start(Tag::ListItem, &li.params(&[])));
                    self.mixed(&li.children, listener);
                    listener.event(Event::End(Tag::ListItem));
                }
                listener.event(Event::End(Tag::List(kind)));
            }
            "dl" => {
                listener.event(Event::Start(Tag::DefinitionList, &element.params(&[])));
                for item in child_elements(&element.children, &["dt", "dd"]) {
                    let tag = if item.name == "dt" {
                        Tag::DefinitionTerm
                    } else {
                        Tag::DefinitionDescription
                    };
                    listener.event(Event::Start(tag, &item.params(&[])));
                    self.mixed(&item.children, listener);
                    listener.event(Event::End(tag));
                }
                listener.event(Event::End(Tag::DefinitionList));
            }
            "blockquote" => self.quotation(element, listener),
            "table" => self.table(element, listener),
            "hr" => listener.event(Event::HorizontalLine(&element.params(&[]))),
            "pre" => listener.event(Event::Verbatim {
                text: &element.text(),
                inline: false,
                params: &element.params(&[]),
            }),
            _ => {
                listener.event(Event::Start(Tag::Group, &element.params(&[])));
                self.blocks(&element.children, listener);
                listener.event(Event::End(Tag::Group));
            }
        }
    }

    fn quotation(&self, element: &Element, listener: &mut dyn Listener) {
        listener.event(Event::Start(Tag::Quotation, &element.params(&[])));
        let mut line = Vec::new();
        let mut i = 0;
        while i < element.children.len() {
            match &element.children[i] {
                Node::Element(child) if child.name == "blockquote" => {
                    flush_line(&mut line, listener);
                    self.quotation(child, listener);
                }
                Node::Element(child) if child.name == "br" => flush_line(&mut line, listener),
                Node::Element(child) if child.name == "p" => {
                    flush_line(&mut line, listener);
                    line = self.inlines(&child.children);
                    flush_line(&mut line, listener);
                }
                _ => {
                    i = self.inline_node(&element.children, i, &mut line);
                    continue;
                }
            }
            i += 1;
        }
        flush_line(&mut line, listener);
        listener.event(Event::End(Tag::Quotation));
    }

    fn table(&self, element: &Element, listener: &mut dyn Listener) {
        listener.event(Event::Start(Tag::Table, &element.params(&[])));
        for child in child_elements(&element.children, &["tr", "thead", "tbody", "tfoot"]) {
            if child.name == "tr" {
                self.row(child, listener);
            } else {
                for tr in child_elements(&child.children, &["tr"]) {
                    self.row(tr, listener);
                }
            }
        }
        listener.event(Event::End(Tag::Table));
    }

    fn row(&self, element: &Element, listener: &mut dyn Listener) {
        listener.event(Event::Start(Tag::TableRow, &element.params(&[])));
        for cell in child_elements(&element.children, &["th", "td"]) {
            let tag = Tag::TableCell {
                header: cell.name == "th",
            };
            listener.event(Event::Start(tag, &cell.params(&[])));
            self.mixed(&cell.children, listener);
            listener.event(Event::End(tag));
        }
        listener.event(Event::End(Tag::TableRow));
    }

    /// Content of list items and cells: inline runs stay inline. Spaces are
    /// trimmed at both ends of the content.
    fn mixed(&self, nodes: &[Node], listener: &mut dyn Listener) {
        let mut run = Vec::new();
        let mut started = false;
        let mut i = 0;
        while i < nodes.len() {
            match &nodes[i] {
                Node::Element(element) if is_block_element(&element.name) => {
                    let inline = std::mem::take(&mut run);
                    let inline = if started { inline } else { trim_leading(inline) };
                    emit_all(&inline, listener);
                    i = self.block_at(nodes, i, element, false, listener);
                    started = true;
                }
                _ => i = self.inline_node(nodes, i, &mut run),
            }
        }
        let run = if started {
            trim_trailing(run)
        } else {
            trim_spaces(run)
        };
        emit_all(&run, listener);
    }

    fn inlines(&self, nodes: &[Node]) -> Vec<Block> {
        let mut out = Vec::new();
        let mut i = 0;
        while i < nodes.len() {
            i = self.inline_node(nodes, i, &mut out);
        }
        out
    }

    /// Convert the inline node at `i`, returning the index of the next node.
    fn inline_node(&self, nodes: &[Node], i: usize, out: &mut Vec<Block>) -> usize {
        match &nodes[i] {
            Node::Text(text) => push_text(&normalize_whitespace(text), out),
            Node::Comment(comment) => return self.marker(nodes, i, comment, out),
            Node::Element(element) => self.inline_element(element, out),
        }
        i + 1
    }

    fn marker(&self, nodes: &[Node], i: usize, comment: &str, out: &mut Vec<Block>) -> usize {
        if let Some(rest) = comment.strip_prefix("startmacro:")
            && let Some(stop) = matching_stop(nodes, i, "startmacro:", "stopmacro")
        {
            if let Some(call) = macro_call(rest, true) {
                let children = self.inlines(&nodes[i + 1..stop]);
                out.push(Block::new(BlockKind::MacroMarker(call)).with_children(children));
            }
            return stop + 1;
        }
        if let Some(rest) = comment.strip_prefix("startwikilink:")
            && let Some(stop) = matching_stop(nodes, i, "startwikilink:", "stopwikilink")
        {
            let inner = &nodes[i + 1..stop];
            let raw = decode_comment_fields(rest).concat();
            match (
                XWikiLinkResolver.resolve(&raw, self.document),
                find_element(inner, "a"),
            ) {
                (Ok(reference), Some(anchor)) => out.push(self.link(reference, anchor)),
                _ => out.extend(self.inlines(inner)),
            }
            return stop + 1;
        }
        if let Some(rest) = comment.strip_prefix("startimage:")
            && let Some(stop) = matching_stop(nodes, i, "startimage:", "stopimage")
        {
            let inner = &nodes[i + 1..stop];
            let raw = decode_comment_fields(rest).concat();
            match (
                XWikiImageResolver.resolve(&raw, self.document),
                find_element(inner, "img"),
            ) {
                (Ok(reference), Some(img)) => {
                    let mut params = img.params(&["src"]);
                    // The renderer falls back to the target name for `alt`.
                    if params.get("alt").map(String::as_str) == Some(reference.reference()) {
                        params.remove("alt");
                    }
                    out.push(
                        Block::new(BlockKind::Image {
                            reference,
                            freestanding: img.has_class("wikimodel-freestanding"),
                        })
                        .with_params(params),
                    );
                }
                _ => out.extend(self.inlines(inner)),
            }
            return stop + 1;
        }
        i + 1
    }

    fn link(&self, reference: ResourceReference, anchor: &Element) -> Block {
        let freestanding = anchor.has_class("wikimodel-freestanding");
        let generated = anchor.children.iter().all(|node| match node {
            Node::Element(element) => element.has_class("wikigeneratedlinkcontent"),
            node => is_blank(node),
        });
        let children = if freestanding || generated {
            Vec::new()
        } else {
            trim_spaces(self.inlines(&anchor.children))
        };
        Block::new(BlockKind::Link {
            reference,
            freestanding,
        })
        .with_children(children)
        .with_params(anchor.params(&["href"]))
    }

    fn inline_element(&self, element: &Element, out: &mut Vec<Block>) {
        let format = match element.name.as_str() {
            "strong" | "b" => Some(Format::Bold),
            "em" | "i" => Some(Format::Italic),
            "ins" | "u" => Some(Format::Underlined),
            "del" | "s" | "strike" => Some(Format::StrikedOut),
            "sup" => Some(Format::Superscript),
            "sub" => Some(Format::Subscript),
            "tt" | "code" if !element.has_class("wikimodel-verbatim") => Some(Format::Monospace),
            _ => None,
        };
        if let Some(format) = format {
            out.push(
                Block::format(format, self.inlines(&element.children))
                    .with_params(element.params(&[])),
            );
            return;
        }
        match element.name.as_str() {
            "tt" | "code" => out.push(
                Block::new(BlockKind::Verbatim {
                    text: element.text(),
                    inline: true,
                })
                .with_params(element.params(&[])),
            ),
            "br" => out.push(Block::new(BlockKind::NewLine)),
            "a" => self.anchor(element, out),
            "img" => {
                if let Some(src) = element.attr("src")
                    && let Ok(reference) = XWikiImageResolver.resolve(src, self.document)
                {
                    out.push(
                        Block::new(BlockKind::Image {
                            reference,
                            freestanding: element.has_class("wikimodel-freestanding"),
                        })
                        .with_params(element.params(&["src"])),
                    );
                }
            }
            "span" if element.has_class("xwikirenderingerror") => {
                out.push(Block::error(element.text().trim(), "", true));
            }
            "span" if element.has_class("xwikirenderingerrordescription") => {
                set_error_description(out, element);
            }
            "head" | "script" | "style" => {}
            _ => out.extend(self.inlines(&element.children)),
        }
    }

    fn anchor(&self, element: &Element, out: &mut Vec<Block>) {
        if let Some(href) = element.attr("href") {
            match UrlResolver.resolve(href, self.document) {
                Ok(reference) => out.push(self.link(reference, element)),
                Err(_) => out.extend(self.inlines(&element.children)),
            }
            return;
        }
        if let Some(id) = element.attr("id").or_else(|| element.attr("name")) {
            out.push(Block::new(BlockKind::Id(id.to_owned())));
        }
        out.extend(self.inlines(&element.children));
    }
}

fn emit_all(blocks: &[Block], listener: &mut dyn Listener) {
    for block in blocks {
        block.traverse(listener);
    }
}

fn emit_wrapped(tag: Tag<'_>, params: &Parameters, children: &[Block], listener: &mut dyn Listener) {
    listener.event(Event::Start(tag, params));
    emit_all(children, listener);
    listener.event(Event::End(tag));
}

fn flush_paragraph(pending: &mut Vec<Block>, listener: &mut dyn Listener) {
    let children = trim_spaces(std::mem::take(pending));
    if !children.is_empty() {
        emit_wrapped(Tag::Paragraph, &Parameters::new(), &children, listener);
    }
}

fn flush_line(line: &mut Vec<Block>, listener: &mut dyn Listener) {
    let children = trim_spaces(std::mem::take(line));
    if !children.is_empty() {
        emit_wrapped(Tag::QuotationLine, &Parameters::new(), &children, listener);
    }
}

fn set_error_description(out: &mut [Block], element: &Element) {
    if let Some(Block {
        kind: BlockKind::Error { description, .. },
        ..
    }) = out.last_mut()
    {
        *description = element.text().trim().to_owned();
    }
}

fn child_elements<'n>(
    nodes: &'n [Node],
    names: &'n [&'n str],
) -> impl Iterator<Item = &'n Element> + 'n {
    nodes.iter().filter_map(move |node| match node {
        Node::Element(element) if names.contains(&element.name.as_str()) => Some(element),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wr_xdom::ResourceType;

    fn parse(source: &str) -> Vec<Block> {
        XhtmlParser.parse(source).unwrap().blocks
    }

    #[test]
    fn test_heading_and_paragraph() {
        assert_eq!(
            parse(r#"<h1 id="Htitle"><span>Title</span></h1><p>Some <strong>bold</strong> text.</p>"#),
            vec![
                Block::heading(1, vec![Block::word("Title")]),
                Block::paragraph(vec![
                    Block::word("Some"),
                    Block::space(),
                    Block::format(Format::Bold, vec![Block::word("bold")]),
                    Block::space(),
                    Block::word("text"),
                    Block::special('.'),
                ]),
            ]
        );
    }

    #[test]
    fn test_whitespace_between_blocks_is_ignored() {
        assert_eq!(
            parse("<html><body>\n  <p>\n    a\n  </p>\n  <hr/>\n</body></html>"),
            vec![
                Block::paragraph(vec![Block::word("a")]),
                Block::new(BlockKind::HorizontalLine),
            ]
        );
    }

    #[test]
    fn test_loose_text_becomes_paragraph() {
        assert_eq!(
            parse("hello <em>you</em>"),
            vec![Block::paragraph(vec![
                Block::word("hello"),
                Block::space(),
                Block::format(Format::Italic, vec![Block::word("you")]),
            ])]
        );
    }

    #[test]
    fn test_entities() {
        assert_eq!(
            parse("<p>a &amp; b&#33;</p>"),
            vec![Block::paragraph(vec![
                Block::word("a"),
                Block::space(),
                Block::special('&'),
                Block::space(),
                Block::word("b"),
                Block::special('!'),
            ])]
        );
    }

    #[test]
    fn test_lists_and_tables() {
        let blocks = parse(
            "<ul><li>a<ol><li>b</li></ol></li></ul>\
             <table><tbody><tr><th>H</th></tr><tr><td>c</td></tr></tbody></table>",
        );
        assert_eq!(
            blocks[0],
            Block::new(BlockKind::List {
                kind: ListKind::Bulleted
            })
            .with_children(vec![Block::new(BlockKind::ListItem).with_children(vec![
                Block::word("a"),
                Block::new(BlockKind::List {
                    kind: ListKind::Numbered
                })
                .with_children(vec![
                    Block::new(BlockKind::ListItem).with_children(vec![Block::word("b")])
                ]),
            ])])
        );
        assert_eq!(blocks[1].children.len(), 2);
        assert_eq!(
            blocks[1].children[0].children[0].kind,
            BlockKind::TableCell { header: true }
        );
    }

    #[test]
    fn test_blockquote_lines() {
        assert_eq!(
            parse("<blockquote>a<br/>b<blockquote>c</blockquote></blockquote>"),
            vec![Block::new(BlockKind::Quotation).with_children(vec![
                Block::new(BlockKind::QuotationLine).with_children(vec![Block::word("a")]),
                Block::new(BlockKind::QuotationLine).with_children(vec![Block::word("b")]),
                Block::new(BlockKind::Quotation).with_children(vec![
                    Block::new(BlockKind::QuotationLine).with_children(vec![Block::word("c")])
                ]),
            ])]
        );
    }

    #[test]
    fn test_wiki_link_comment() {
        let blocks = parse(
            r#"<p><!--startwikilink:Main.WebHome--><span class="wikilink"><a href="/view/Main/WebHome">Home</a></span><!--stopwikilink--></p>"#,
        );
        assert_eq!(
            blocks,
            vec![Block::paragraph(vec![
                Block::new(BlockKind::Link {
                    reference: ResourceReference::document("Main.WebHome"),
                    freestanding: false,
                })
                .with_children(vec![Block::word("Home")])
            ])]
        );
    }

    #[test]
    fn test_generated_link_label_is_dropped() {
        let blocks = parse(
            r#"<p><!--startwikilink:Page--><span class="wikilink"><a href="/view/Page"><span class="wikigeneratedlinkcontent">Page</span></a></span><!--stopwikilink--></p>"#,
        );
        assert!(blocks[0].children[0].children.is_empty());
    }

    #[test]
    fn test_plain_anchor_uses_url_resolver() {
        let blocks = parse(r#"<p><a href="https://example.com" target="_blank">x</a></p>"#);
        let link = &blocks[0].children[0];
        match &link.kind {
            BlockKind::Link { reference, .. } => assert_eq!(reference.kind(), ResourceType::Url),
            other => panic!("expected link, got {other:?}"),
        }
        assert_eq!(link.params.get("target").map(String::as_str), Some("_blank"));
    }

    #[test]
    fn test_macro_marker_comment() {
        let comment = encode_comment_fields(&["info", r#"title="x-y""#, "Hello"]);
        let source = format!(
            r#"<!--startmacro:{comment}--><div class="box infomessage"><p>Hello</p></div><!--stopmacro-->"#
        );
        let blocks = parse(&source);
        match &blocks[0].kind {
            BlockKind::MacroMarker(call) => {
                assert_eq!(call.id, "info");
                assert!(!call.inline);
                assert_eq!(call.params.get("title").map(String::as_str), Some("x-y"));
                assert_eq!(call.content.as_deref(), Some("Hello"));
            }
            other => panic!("expected macro marker, got {other:?}"),
        }
        assert_eq!(blocks[0].children.len(), 1);
    }

    #[test]
    fn test_comment_fields_never_contain_double_dash() {
        let encoded = encode_comment_fields(&["a--b", "c\\d"]);
        assert!(!encoded.contains("--"));
        assert_eq!(decode_comment_fields(&encoded), vec!["a--b", "c\\d"]);
    }

    #[test]
    fn test_verbatim_and_empty_lines() {
        assert_eq!(
            parse(
                r#"<pre>**x**</pre><div class="wikimodel-emptyline"></div><div class="wikimodel-emptyline"></div><p><tt class="wikimodel-verbatim">a</tt></p>"#
            ),
            vec![
                Block::new(BlockKind::Verbatim {
                    text: "**x**".to_owned(),
                    inline: false,
                }),
                Block::new(BlockKind::EmptyLines(2)),
                Block::paragraph(vec![Block::new(BlockKind::Verbatim {
                    text: "a".to_owned(),
                    inline: true,
                })]),
            ]
        );
    }

    #[test]
    fn test_empty_lines_merge_across_whitespace() {
        assert_eq!(
            parse(
                "<body>\n<div class=\"wikimodel-emptyline\"></div>\n<div class=\"wikimodel-emptyline\"></div>\n<p>a</p>\n<div class=\"xwikirenderingerrordescription\">orphan</div></body>"
            ),
            vec![
                Block::new(BlockKind::EmptyLines(2)),
                Block::paragraph(vec![Block::word("a")]),
            ]
        );
    }

    #[test]
    fn test_list_item_spaces_trimmed_at_content_ends() {
        let blocks = parse("<ul><li> a <ul><li>b</li></ul> </li></ul>");
        let item = &blocks[0].children[0];
        assert_eq!(item.children.len(), 3);
        assert_eq!(item.children[0], Block::word("a"));
        assert_eq!(item.children[1], Block::space());
        assert!(matches!(item.children[2].kind, BlockKind::List { .. }));
    }

    #[test]
    fn test_error_blocks() {
        let blocks = parse(
            r#"<div class="xwikirenderingerror">Failed</div><div class="xwikirenderingerrordescription hidden">why</div>"#,
        );
        assert_eq!(blocks, vec![Block::error("Failed", "why", false)]);
    }

    #[test]
    fn test_image_comment_drops_default_alt() {
        let image = |alt: Option<&str>| {
            let block = Block::new(BlockKind::Image {
                reference: ResourceReference::new(ResourceType::Attachment, "cat.png"),
                freestanding: false,
            });
            match alt {
                Some(alt) => block.with_param("alt", alt),
                None => block,
            }
        };
        assert_eq!(
            parse(r#"<p><!--startimage:cat.png--><img src="/download/cat.png" alt="cat.png"/><!--stopimage--></p>"#),
            vec![Block::paragraph(vec![image(None)])]
        );
        assert_eq!(
            parse(r#"<p><!--startimage:cat.png--><img src="/download/cat.png" alt="A cat"/><!--stopimage--></p>"#),
            vec![Block::paragraph(vec![image(Some("A cat"))])]
        );
    }

    #[test]
    fn test_malformed_xml() {
        let err = XhtmlParser.parse("<p>open").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }
}
