//! Renderer for `xwiki/2.0`.
//!
//! Produces wiki syntax that parses back to the same document. Characters
//! that would otherwise be read as markup are escaped with `~`. Expanded
//! macros are written back as the macro call that produced them.

use wr_parser::format_params;
use wr_xdom::{
    Event, Format, ListKind, Listener, MacroCall, Parameters, ResourceReference, Syntax, Tag,
};

use crate::printer::PrintRenderer;

const ESCAPE: char = '~';

/// Characters that start markup when doubled.
const DOUBLED_MARKUP: &[char] = &[
    '*', '/', '_', '-', '#', '^', ',', '[', ']', '{', '}', '>', '|', '\\',
];

/// Characters that start a block when they open a paragraph line.
const PARAGRAPH_LINE_MARKUP: &[char] = &['=', '*', ';', ':', '|', '>', '-', '(', ')', '{'];

/// Words that turn a following `:` into a link or image prefix.
const PREFIX_WORDS: &[&str] = &["image", "http", "https", "ftp", "file", "mailto"];

#[derive(Debug)]
enum Frame {
    /// Sequence of blocks separated by blank lines (document, group).
    Container { first: bool, empty_lines: usize },
    /// Paragraph written as its own block.
    Paragraph,
    /// Format or link.
    Inline,
    Other,
}

#[derive(Debug)]
struct OpenLink {
    /// Output position after `[[`, `None` when freestanding.
    start: Option<usize>,
    params: String,
}

/// Where the next character is written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LineStart {
    No,
    Paragraph,
    Cell,
    Quotation,
}

/// XWiki syntax renderer.
///
/// # Example
///
/// ```
/// use wr_parser::{Parser, XWikiParser};
/// use wr_renderer::{PrintRenderer, XWikiRenderer};
///
/// let source = "= Title =\n\n* one\n* two ~~ three";
/// let xdom = XWikiParser.parse(source).unwrap();
/// let mut renderer = XWikiRenderer::new();
/// xdom.traverse(&mut renderer);
/// assert_eq!(Box::new(renderer).finish(), source);
/// ```
#[derive(Debug)]
pub struct XWikiRenderer {
    out: String,
    frames: Vec<Frame>,
    /// Nesting inside an expanded macro whose output is not written.
    skip: usize,
    lists: Vec<ListKind>,
    list_started: bool,
    quotation_depth: usize,
    quotation_started: bool,
    definitions_started: bool,
    row_started: bool,
    cell_depth: usize,
    links: Vec<OpenLink>,
    line_start: LineStart,
    /// Position of the last unescaped special symbol.
    last_special: Option<usize>,
    /// Position after the last word that can prefix a URL or image.
    prefix_end: Option<usize>,
    /// Paragraph line break not written yet: a plain newline when text
    /// follows on the next line, `\\` otherwise.
    pending_newline: bool,
}

impl Default for XWikiRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl XWikiRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            out: String::new(),
            frames: Vec::new(),
            skip: 0,
            lists: Vec::new(),
            list_started: false,
            quotation_depth: 0,
            quotation_started: false,
            definitions_started: false,
            row_started: false,
            cell_depth: 0,
            links: Vec::new(),
            line_start: LineStart::No,
            last_special: None,
            prefix_end: None,
            pending_newline: false,
        }
    }

    /// Write text that needs no escaping.
    fn raw(&mut self, text: &str) {
        self.out.push_str(text);
        self.line_start = LineStart::No;
        self.last_special = None;
    }

    /// Write a markup token, escaping a preceding literal symbol that would
    /// merge with it.
    fn markup(&mut self, token: &str) {
        if let Some(pos) = self.last_special
            && pos + 1 == self.out.len()
            && token.starts_with(&self.out[pos..])
        {
            self.out.insert(pos, ESCAPE);
        }
        self.raw(token);
    }

    fn word(&mut self, word: &str) {
        if self.line_start == LineStart::Paragraph && word.starts_with('1') {
            self.out.push(ESCAPE);
        }
        self.raw(word);
        if PREFIX_WORDS.contains(&word) {
            self.prefix_end = Some(self.out.len());
        }
    }

    fn special(&mut self, symbol: char) {
        let escape = symbol == ESCAPE
            || (DOUBLED_MARKUP.contains(&symbol) && self.out.ends_with(symbol))
            || match self.line_start {
                LineStart::Paragraph => PARAGRAPH_LINE_MARKUP.contains(&symbol),
                LineStart::Cell => symbol == '=',
                LineStart::Quotation => symbol == '>',
                LineStart::No => false,
            }
            || (symbol == ':' && self.prefix_end == Some(self.out.len()))
            || (symbol == '|' && self.cell_depth > 0);
        self.line_start = LineStart::No;
        if escape {
            self.out.push(ESCAPE);
            self.out.push(symbol);
            self.last_special = None;
        } else {
            self.last_special = Some(self.out.len());
            self.out.push(symbol);
        }
    }

    fn space(&mut self) {
        // Leading spaces do not change what the line starts with.
        self.out.push(' ');
        self.last_special = None;
    }

    /// Separate a block from the previous one when it sits directly in a
    /// block container; returns whether it does.
    fn begin_block(&mut self, params: &Parameters) -> bool {
        let Some(Frame::Container { first, empty_lines }) = self.frames.last_mut() else {
            return false;
        };
        let mut separator = if *first { String::new() } else { "\n\n".to_owned() };
        separator.push_str(&"\n".repeat(*empty_lines));
        *first = false;
        *empty_lines = 0;
        self.raw(&separator);
        if !params.is_empty() {
            self.raw(&format!("(% {} %)\n", format_params(params)));
        }
        true
    }

    /// Whether a new line inside the current block is a plain line break.
    fn in_paragraph(&self) -> bool {
        matches!(
            self.frames.iter().rev().find(|frame| !matches!(frame, Frame::Inline)),
            Some(Frame::Paragraph)
        )
    }

    fn start(&mut self, tag: Tag<'_>, params: &Parameters) {
        let frame = match tag {
            Tag::Document => Frame::Container {
                first: true,
                empty_lines: 0,
            },
            Tag::Paragraph => {
                if self.begin_block(params) {
                    self.line_start = LineStart::Paragraph;
                    Frame::Paragraph
                } else {
                    Frame::Other
                }
            }
            Tag::Heading(level) => {
                self.begin_block(params);
                self.raw(&format!("{} ", "=".repeat(usize::from(level))));
                Frame::Other
            }
            Tag::List(kind) => {
                if self.lists.is_empty() {
                    self.begin_block(params);
                    self.list_started = false;
                }
                self.lists.push(kind);
                Frame::Other
            }
            Tag::ListItem => {
                if self.list_started {
                    self.raw("\n");
                }
                self.list_started = true;
                let prefix = list_prefix(&self.lists);
                self.raw(&prefix);
                Frame::Other
            }
            Tag::DefinitionList => {
                self.begin_block(params);
                self.definitions_started = false;
                Frame::Other
            }
            Tag::DefinitionTerm | Tag::DefinitionDescription => {
                if self.definitions_started {
                    self.raw("\n");
                }
                self.definitions_started = true;
                self.raw(if tag == Tag::DefinitionTerm { "; " } else { ": " });
                Frame::Other
            }
            Tag::Quotation => {
                if self.quotation_depth == 0 {
                    self.begin_block(params);
                    self.quotation_started = false;
                }
                self.quotation_depth += 1;
                Frame::Other
            }
            Tag::QuotationLine => {
                if self.quotation_started {
                    self.raw("\n");
                }
                self.quotation_started = true;
                self.raw(&format!("{} ", ">".repeat(self.quotation_depth)));
                self.line_start = LineStart::Quotation;
                Frame::Other
            }
            Tag::Table => {
                self.begin_block(params);
                self.row_started = false;
                Frame::Other
            }
            Tag::TableRow => {
                if self.row_started {
                    self.raw("\n");
                }
                self.row_started = true;
                Frame::Other
            }
            Tag::TableCell { header } => {
                self.raw(if header { "|=" } else { "|" });
                self.cell_depth += 1;
                self.line_start = LineStart::Cell;
                Frame::Other
            }
            Tag::Format(format) => {
                self.markup(format_marker(format));
                Frame::Inline
            }
            Tag::Link { freestanding, .. } => {
                let start = if freestanding {
                    None
                } else {
                    self.markup("[[");
                    Some(self.out.len())
                };
                self.links.push(OpenLink {
                    start,
                    params: format_params(params),
                });
                Frame::Inline
            }
            Tag::MacroMarker(call) => {
                self.write_macro(call);
                self.skip = 1;
                return;
            }
            Tag::Group => {
                if self.begin_block(params) {
                    self.raw("(((\n");
                    Frame::Container {
                        first: true,
                        empty_lines: 0,
                    }
                } else {
                    Frame::Other
                }
            }
        };
        self.frames.push(frame);
    }

    fn end(&mut self, tag: Tag<'_>) {
        let frame = self.frames.pop();
        match tag {
            Tag::Heading(level) => self.raw(&format!(" {}", "=".repeat(usize::from(level)))),
            Tag::List(_) => {
                self.lists.pop();
            }
            Tag::Quotation => self.quotation_depth -= 1,
            Tag::TableCell { .. } => self.cell_depth -= 1,
            Tag::Format(format) => self.markup(format_marker(format)),
            Tag::Link { reference, .. } => {
                if let Some(link) = self.links.pop() {
                    self.end_link(reference, &link);
                }
            }
            Tag::Group => {
                if matches!(frame, Some(Frame::Container { .. })) {
                    self.raw("\n)))");
                }
            }
            _ => {}
        }
    }

    fn end_link(&mut self, reference: &ResourceReference, link: &OpenLink) {
        let Some(start) = link.start else {
            self.raw(reference.raw());
            return;
        };
        if self.out.len() != start {
            self.markup(">>");
        }
        self.raw(reference.raw());
        if !link.params.is_empty() {
            self.raw("||");
            self.raw(&link.params);
        }
        self.raw("]]");
    }

    fn image(&mut self, reference: &ResourceReference, freestanding: bool, params: &Parameters) {
        if freestanding {
            self.markup("image:");
            self.raw(reference.raw());
            return;
        }
        let mut markup = format!("[[image:{}", reference.raw());
        if !params.is_empty() {
            markup.push_str("||");
            markup.push_str(&format_params(params));
        }
        markup.push_str("]]");
        self.markup(&markup);
    }

    fn write_macro(&mut self, call: &MacroCall) {
        if !call.inline {
            self.begin_block(&Parameters::new());
        }
        self.markup(&macro_source(call));
    }

    fn verbatim(&mut self, text: &str, inline: bool, params: &Parameters) {
        if !inline && self.begin_block(params) {
            let open = if text.starts_with('\n') { "{{{\n" } else { "{{{" };
            let close = if text.ends_with('\n') { "\n}}}" } else { "}}}" };
            self.raw(&format!("{open}{text}{close}"));
        } else {
            self.markup(&format!("{{{{{{{text}}}}}}}"));
        }
    }

    fn new_line(&mut self) {
        if self.in_paragraph() && self.line_start != LineStart::Paragraph {
            self.pending_newline = true;
        } else {
            self.markup("\\\\");
        }
    }

    /// Write a deferred paragraph line break before `next`.
    fn flush_newline(&mut self, next: &Event<'_>) {
        if !std::mem::take(&mut self.pending_newline) {
            return;
        }
        if matches!(next, Event::End(_) | Event::NewLine) {
            self.markup("\\\\");
        } else {
            self.raw("\n");
            self.line_start = LineStart::Paragraph;
        }
    }
}

/// `**`, `1.`, `11.`, ... for the innermost list.
fn list_prefix(lists: &[ListKind]) -> String {
    let depth = lists.len();
    match lists.last() {
        Some(ListKind::Numbered) => format!("{}. ", "1".repeat(depth)),
        _ => format!("{} ", "*".repeat(depth)),
    }
}

fn format_marker(format: Format) -> &'static str {
    match format {
        Format::Bold => "**",
        Format::Italic => "//",
        Format::Underlined => "__",
        Format::StrikedOut => "--",
        Format::Monospace => "##",
        Format::Superscript => "^^",
        Format::Subscript => ",,",
    }
}

/// `{{id params}}content{{/id}}` or `{{id params/}}`.
fn macro_source(call: &MacroCall) -> String {
    let mut source = format!("{{{{{}", call.id);
    if !call.params.is_empty() {
        source.push(' ');
        source.push_str(&format_params(&call.params));
    }
    match &call.content {
        Some(content) => {
            source.push_str("}}");
            if content.starts_with('\n') {
                source.push('\n');
            }
            source.push_str(content);
            if content.ends_with('\n') {
                source.push('\n');
            }
            source.push_str(&format!("{{{{/{}}}}}", call.id));
        }
        None => source.push_str("/}}"),
    }
    source
}

impl Listener for XWikiRenderer {
    fn event(&mut self, event: Event<'_>) {
        if self.skip > 0 {
            match event {
                Event::Start(..) => self.skip += 1,
                Event::End(_) => self.skip -= 1,
                _ => {}
            }
            return;
        }

        self.flush_newline(&event);
        match event {
            Event::Start(tag, params) => self.start(tag, params),
            Event::End(tag) => self.end(tag),
            Event::Word(word) => self.word(word),
            Event::Space => self.space(),
            Event::SpecialSymbol(symbol) => self.special(symbol),
            Event::NewLine => self.new_line(),
            Event::EmptyLines(count) => {
                if let Some(Frame::Container { empty_lines, .. }) = self.frames.last_mut() {
                    *empty_lines += count;
                }
            }
            Event::HorizontalLine(params) => {
                self.begin_block(params);
                self.raw("----");
            }
            Event::Image {
                reference,
                freestanding,
                params,
            } => self.image(reference, freestanding, params),
            Event::Verbatim {
                text,
                inline,
                params,
            } => self.verbatim(text, inline, params),
            Event::Raw { text, syntax } => {
                if *syntax == Syntax::XWIKI_2_0 {
                    self.begin_block(&Parameters::new());
                    self.raw(text);
                } else if *syntax == Syntax::XHTML_1_0 {
                    self.begin_block(&Parameters::new());
                    self.markup(&format!("{{{{html}}}}{text}{{{{/html}}}}"));
                }
            }
            Event::Macro(call) => self.write_macro(call),
            Event::Id(name) => {
                self.markup(&macro_source(&MacroCall::new("id", true).with_param("name", name)));
            }
            Event::Error { .. } => {}
        }
    }
}

impl PrintRenderer for XWikiRenderer {
    fn finish(self: Box<Self>) -> String {
        self.out
    }
}
