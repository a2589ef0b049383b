//! Parser for `markdown/1.0` (`CommonMark` with GFM extensions).
//!
//! Built on `pulldown-cmark`. Markdown constructs without a direct document
//! counterpart are mapped onto the closest one: inline code becomes monospace
//! text, fenced code a standalone verbatim block, raw HTML an XHTML raw block.

use pulldown_cmark::{CodeBlockKind, Event as MdEvent, LinkType, Options, Tag as MdTag, TagEnd};
use wr_xdom::{
    Block, BlockKind, Event, Format, ListKind, Listener, Parameters, Syntax, Tag, XdomBuilder,
};

use crate::resolver::{ReferenceResolver, UrlResolver, XWikiImageResolver};
use crate::text::emit_text;
use crate::{ParseError, Parser};

/// Markdown parser.
#[derive(Debug, Clone, Copy)]
pub struct MarkdownParser {
    gfm: bool,
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownParser {
    /// Create a parser with GFM extensions enabled.
    #[must_use]
    pub fn new() -> Self {
        Self { gfm: true }
    }

    /// Enable or disable GitHub Flavored Markdown extensions.
    #[must_use]
    pub fn with_gfm(mut self, enabled: bool) -> Self {
        self.gfm = enabled;
        self
    }

    fn options(&self) -> Options {
        if self.gfm {
            Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_GFM
                | Options::ENABLE_DEFINITION_LIST
        } else {
            Options::empty()
        }
    }
}

impl Parser for MarkdownParser {
    fn syntax(&self) -> Syntax {
        Syntax::MARKDOWN_1_0
    }

    fn parse_events(
        &self,
        source: &str,
        document: Option<&str>,
        listener: &mut dyn Listener,
    ) -> Result<(), ParseError> {
        listener.event(Event::Start(Tag::Document, &Parameters::new()));
        Emitter::new(document, &mut *listener)
            .run(pulldown_cmark::Parser::new_ext(source, self.options()));
        listener.event(Event::End(Tag::Document));
        Ok(())
    }
}

/// Open markdown construct and what its end emits.
enum Open {
    Block {
        kind: BlockKind,
        /// Also closes the quotation line opened around it.
        wrapped: bool,
    },
    /// Emits nothing; children go to the parent.
    Transparent { wrapped: bool },
    /// Children are the alt text of an image.
    Image,
}

struct ImageContent {
    dest_url: String,
    title: String,
    content: XdomBuilder,
}

/// Translates `pulldown-cmark` events into listener events.
struct Emitter<'d, 'l> {
    document: Option<&'d str>,
    listener: &'l mut dyn Listener,
    stack: Vec<Open>,
    images: Vec<ImageContent>,
    code: Option<(Option<String>, String)>,
    /// Adjacent HTML fragments, merged into one raw event.
    raw: String,
    in_table_head: bool,
}

impl<'d, 'l> Emitter<'d, 'l> {
    fn new(document: Option<&'d str>, listener: &'l mut dyn Listener) -> Self {
        Self {
            document,
            listener,
            stack: Vec::new(),
            images: Vec::new(),
            code: None,
            raw: String::new(),
            in_table_head: false,
        }
    }

    fn run<'e>(mut self, events: impl Iterator<Item = MdEvent<'e>>) {
        let mut events = events.peekable();
        while let Some(event) = events.next() {
            match event {
                MdEvent::Start(tag) => {
                    self.flush_raw();
                    let checked = if matches!(tag, MdTag::Item | MdTag::Paragraph) {
                        events
                            .next_if(|next| matches!(next, MdEvent::TaskListMarker(_)))
                            .and_then(|marker| match marker {
                                MdEvent::TaskListMarker(checked) => Some(checked),
                                _ => None,
                            })
                    } else {
                        None
                    };
                    self.start_tag(tag, checked);
                }
                MdEvent::End(tag) => {
                    self.flush_raw();
                    self.end_tag(tag);
                }
                other => self.inline_event(other),
            }
        }
        while !self.stack.is_empty() {
            self.close();
        }
        self.flush_raw();
    }

    /// Where events go: the innermost image's alt text, or the listener.
    fn out(&mut self) -> &mut dyn Listener {
        if let Some(image) = self.images.last_mut() {
            return &mut image.content;
        }
        &mut *self.listener
    }

    fn emit(&mut self, event: Event<'_>) {
        self.flush_raw();
        self.out().event(event);
    }

    fn flush_raw(&mut self) {
        if self.raw.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.raw);
        self.out().event(Event::Raw {
            text: &text,
            syntax: &Syntax::XHTML_1_0,
        });
    }

    fn in_quotation(&self) -> bool {
        matches!(
            self.stack.last(),
            Some(Open::Block {
                kind: BlockKind::Quotation,
                ..
            })
        )
    }

    fn in_autolink(&self) -> bool {
        matches!(
            self.stack.last(),
            Some(Open::Block {
                kind: BlockKind::Link {
                    freestanding: true,
                    ..
                },
                ..
            })
        )
    }

    fn start(&mut self, kind: BlockKind, params: &Parameters, wrapped: bool) {
        if let Some(tag) = kind.tag() {
            self.emit(Event::Start(tag, params));
        }
        self.stack.push(Open::Block { kind, wrapped });
    }

    fn open_block(&mut self, kind: BlockKind, params: &Parameters) {
        // Quotations only hold quotation lines and nested quotations.
        match kind {
            BlockKind::Paragraph if self.in_quotation() => {
                self.start(BlockKind::QuotationLine, params, false);
            }
            BlockKind::Quotation => self.start(kind, params, false),
            other => self.open_wrapped(Some(other), params),
        }
    }

    /// Open `kind` (or a transparent construct), inside a quotation line
    /// when directly in a quotation.
    fn open_wrapped(&mut self, kind: Option<BlockKind>, params: &Parameters) {
        let wrapped = self.in_quotation();
        if wrapped {
            self.start(BlockKind::QuotationLine, &Parameters::new(), false);
        }
        match kind {
            Some(kind) => self.start(kind, params, wrapped),
            None => self.stack.push(Open::Transparent { wrapped }),
        }
    }

    /// Atomic block event, wrapped in a quotation line inside quotations.
    fn standalone(&mut self, event: Event<'_>) {
        let wrapped = self.in_quotation();
        if wrapped {
            self.emit(Event::Start(Tag::QuotationLine, &Parameters::new()));
        }
        self.emit(event);
        if wrapped {
            self.emit(Event::End(Tag::QuotationLine));
        }
    }

    fn close(&mut self) {
        let Some(open) = self.stack.pop() else {
            return;
        };
        let wrapped = match open {
            Open::Block { kind, wrapped } => {
                if let Some(tag) = kind.tag() {
                    self.emit(Event::End(tag));
                }
                wrapped
            }
            Open::Transparent { wrapped } => {
                self.flush_raw();
                wrapped
            }
            Open::Image => {
                self.close_image();
                false
            }
        };
        if wrapped {
            self.close();
        }
    }

    fn close_image(&mut self) {
        self.flush_raw();
        let Some(image) = self.images.pop() else {
            return;
        };
        let content = image
            .content
            .finish()
            .map(|xdom| xdom.blocks)
            .unwrap_or_default();
        match XWikiImageResolver.resolve(&image.dest_url, self.document) {
            Ok(reference) => {
                let mut params = Parameters::new();
                let alt: String = content.iter().map(Block::text).collect();
                if !alt.is_empty() {
                    params.insert("alt".to_owned(), alt);
                }
                if !image.title.is_empty() {
                    params.insert("title".to_owned(), image.title);
                }
                self.emit(Event::Image {
                    reference: &reference,
                    freestanding: false,
                    params: &params,
                });
            }
            Err(_) => {
                for block in &content {
                    block.traverse(self.out());
                }
            }
        }
    }

    fn inline_event(&mut self, event: MdEvent<'_>) {
        match event {
            MdEvent::Text(text) => {
                if let Some((_, buffer)) = &mut self.code {
                    buffer.push_str(&text);
                } else if !self.in_autolink() {
                    self.flush_raw();
                    emit_text(&text, self.out());
                }
            }
            MdEvent::Code(code) => {
                let tag = Tag::Format(Format::Monospace);
                self.emit(Event::Start(tag, &Parameters::new()));
                emit_text(&code, self.out());
                self.emit(Event::End(tag));
            }
            MdEvent::InlineMath(math) | MdEvent::DisplayMath(math) => {
                self.emit(Event::Verbatim {
                    text: &math,
                    inline: true,
                    params: &Parameters::new(),
                });
            }
            MdEvent::Html(html) | MdEvent::InlineHtml(html) => self.raw.push_str(&html),
            MdEvent::SoftBreak | MdEvent::HardBreak => self.emit(Event::NewLine),
            MdEvent::Rule => self.standalone(Event::HorizontalLine(&Parameters::new())),
            MdEvent::Start(_)
            | MdEvent::End(_)
            | MdEvent::TaskListMarker(_)
            | MdEvent::FootnoteReference(_) => {}
        }
    }

    fn start_tag(&mut self, tag: MdTag<'_>, checked: Option<bool>) {
        let mut params = Parameters::new();
        if let Some(checked) = checked {
            params.insert("checked".to_owned(), checked.to_string());
        }
        match tag {
            MdTag::Paragraph => self.open_block(BlockKind::Paragraph, &params),
            MdTag::Heading { level, id, .. } => {
                if let Some(id) = id {
                    params.insert("id".to_owned(), id.to_string());
                }
                self.open_block(BlockKind::Heading { level: level as u8 }, &params);
            }
            MdTag::BlockQuote(_) => self.open_block(BlockKind::Quotation, &params),
            MdTag::CodeBlock(kind) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(str::to_owned),
                    CodeBlockKind::Indented => None,
                };
                self.code = Some((language, String::new()));
            }
            MdTag::List(start) => {
                let kind = if start.is_some() {
                    ListKind::Numbered
                } else {
                    ListKind::Bulleted
                };
                if let Some(n) = start
                    && n != 1
                {
                    params.insert("start".to_owned(), n.to_string());
                }
                self.open_block(BlockKind::List { kind }, &params);
            }
            MdTag::Item => self.start(BlockKind::ListItem, &params, false),
            MdTag::DefinitionList => self.open_block(BlockKind::DefinitionList, &params),
            MdTag::DefinitionListTitle => self.start(BlockKind::DefinitionTerm, &params, false),
            MdTag::DefinitionListDefinition => {
                self.start(BlockKind::DefinitionDescription, &params, false);
            }
            MdTag::Table(_) => self.open_block(BlockKind::Table, &params),
            MdTag::TableHead => {
                self.in_table_head = true;
                self.start(BlockKind::TableRow, &params, false);
            }
            MdTag::TableRow => self.start(BlockKind::TableRow, &params, false),
            MdTag::TableCell => {
                let header = self.in_table_head;
                self.start(BlockKind::TableCell { header }, &params, false);
            }
            MdTag::Emphasis => self.start(BlockKind::Format(Format::Italic), &params, false),
            MdTag::Strong => self.start(BlockKind::Format(Format::Bold), &params, false),
            MdTag::Strikethrough => {
                self.start(BlockKind::Format(Format::StrikedOut), &params, false);
            }
            MdTag::Superscript => {
                self.start(BlockKind::Format(Format::Superscript), &params, false);
            }
            MdTag::Subscript => self.start(BlockKind::Format(Format::Subscript), &params, false),
            MdTag::Link {
                link_type,
                dest_url,
                ..
            } => match UrlResolver.resolve(&dest_url, self.document) {
                Ok(reference) => {
                    let freestanding = matches!(link_type, LinkType::Autolink | LinkType::Email);
                    self.start(
                        BlockKind::Link {
                            reference,
                            freestanding,
                        },
                        &params,
                        false,
                    );
                }
                Err(_) => self.stack.push(Open::Transparent { wrapped: false }),
            },
            MdTag::Image {
                dest_url, title, ..
            } => {
                self.images.push(ImageContent {
                    dest_url: dest_url.to_string(),
                    title: title.to_string(),
                    content: XdomBuilder::new(),
                });
                self.stack.push(Open::Image);
            }
            MdTag::HtmlBlock | MdTag::FootnoteDefinition(_) | MdTag::MetadataBlock(_) => {
                self.open_wrapped(None, &params);
            }
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::CodeBlock => {
                if let Some((language, text)) = self.code.take() {
                    let text = text.strip_suffix('\n').unwrap_or(&text);
                    let mut params = Parameters::new();
                    if let Some(language) = language {
                        params.insert("language".to_owned(), language);
                    }
                    self.standalone(Event::Verbatim {
                        text,
                        inline: false,
                        params: &params,
                    });
                }
            }
            TagEnd::TableHead => {
                self.in_table_head = false;
                self.close();
            }
            _ => self.close(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wr_xdom::{ResourceReference, ResourceType};

    fn parse(source: &str) -> Vec<Block> {
        MarkdownParser::new().parse(source).unwrap().blocks
    }

    #[test]
    fn test_heading_and_emphasis() {
        assert_eq!(
            parse("# Title\n\nSome **bold** and *it*."),
            vec![
                Block::heading(1, vec![Block::word("Title")]),
                Block::paragraph(vec![
                    Block::word("Some"),
                    Block::space(),
                    Block::format(Format::Bold, vec![Block::word("bold")]),
                    Block::space(),
                    Block::word("and"),
                    Block::space(),
                    Block::format(Format::Italic, vec![Block::word("it")]),
                    Block::special('.'),
                ]),
            ]
        );
    }

    #[test]
    fn test_fenced_code() {
        assert_eq!(
            parse("```rust\nfn main() {}\n```"),
            vec![
                Block::new(BlockKind::Verbatim {
                    text: "fn main() {}".to_owned(),
                    inline: false,
                })
                .with_param("language", "rust")
            ]
        );
    }

    #[test]
    fn test_blockquote_becomes_quotation_lines() {
        let blocks = parse("> quoted");
        assert_eq!(
            blocks,
            vec![Block::new(BlockKind::Quotation).with_children(vec![
                Block::new(BlockKind::QuotationLine).with_children(vec![Block::word("quoted")])
            ])]
        );
    }

    #[test]
    fn test_list_in_blockquote_is_wrapped() {
        let blocks = parse("> - a");
        let quotation = &blocks[0];
        assert_eq!(quotation.children[0].kind, BlockKind::QuotationLine);
        assert!(matches!(
            quotation.children[0].children[0].kind,
            BlockKind::List { .. }
        ));
        assert!(quotation.children[0].children[0].params.is_empty());
    }

    #[test]
    fn test_ordered_list_start() {
        let blocks = parse("3. three\n4. four");
        assert_eq!(
            blocks[0].kind,
            BlockKind::List {
                kind: ListKind::Numbered
            }
        );
        assert_eq!(blocks[0].params.get("start").map(String::as_str), Some("3"));
        assert_eq!(blocks[0].children.len(), 2);
    }

    #[test]
    fn test_table_head_is_header_row() {
        let blocks = parse("| A | B |\n|---|---|\n| 1 | 2 |");
        let table = &blocks[0];
        assert_eq!(table.kind, BlockKind::Table);
        assert_eq!(table.children.len(), 2);
        assert_eq!(
            table.children[0].children[0].kind,
            BlockKind::TableCell { header: true }
        );
        assert_eq!(
            table.children[1].children[0].kind,
            BlockKind::TableCell { header: false }
        );
    }

    #[test]
    fn test_link_and_image() {
        let blocks = parse("[docs](Guide#intro) ![a cat](cat.png)");
        let paragraph = &blocks[0];
        assert_eq!(
            paragraph.children[0],
            Block::new(BlockKind::Link {
                reference: ResourceReference::document("Guide")
                    .with_raw("Guide#intro")
                    .with_anchor("intro"),
                freestanding: false,
            })
            .with_children(vec![Block::word("docs")])
        );
        match &paragraph.children[2].kind {
            BlockKind::Image { reference, .. } => {
                assert_eq!(reference.kind(), ResourceType::Attachment);
            }
            other => panic!("expected image, got {other:?}"),
        }
        assert_eq!(
            paragraph.children[2].params.get("alt").map(String::as_str),
            Some("a cat")
        );
    }

    #[test]
    fn test_autolink_is_freestanding() {
        let blocks = parse("<https://example.com>");
        assert_eq!(
            blocks[0].children,
            vec![Block::new(BlockKind::Link {
                reference: ResourceReference::url("https://example.com"),
                freestanding: true,
            })]
        );
    }

    #[test]
    fn test_inline_code_is_monospace() {
        let blocks = parse("use `x`");
        assert_eq!(
            blocks[0].children[2],
            Block::format(Format::Monospace, vec![Block::word("x")])
        );
    }

    #[test]
    fn test_raw_html() {
        let blocks = parse("<div>hi</div>\n");
        assert!(matches!(
            &blocks[0].kind,
            BlockKind::Raw { syntax, .. } if *syntax == Syntax::XHTML_1_0
        ));
    }

    #[test]
    fn test_task_list_marker_is_item_parameter() {
        let blocks = parse("- [x] done\n- [ ] todo");
        let items = &blocks[0].children;
        assert_eq!(items[0].params.get("checked").map(String::as_str), Some("true"));
        assert_eq!(items[1].params.get("checked").map(String::as_str), Some("false"));
        assert_eq!(items[0].children, vec![Block::word("done")]);
    }

    #[test]
    fn test_adjacent_html_is_one_raw_block() {
        let source = "<div>\n<b>hi</b>\n</div>\n";
        assert_eq!(
            parse(source),
            vec![Block::new(BlockKind::Raw {
                text: source.to_owned(),
                syntax: Syntax::XHTML_1_0,
            })]
        );
    }

    #[test]
    fn test_image_alt_keeps_formatted_text() {
        let blocks = parse("![a *big* cat](cat.png)");
        assert_eq!(
            blocks[0].children[0].params.get("alt").map(String::as_str),
            Some("a big cat")
        );
    }
}
