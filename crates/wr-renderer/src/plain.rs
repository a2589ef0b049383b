//! Renderer for `plain/1.0`.

use wr_xdom::{Event, Listener, ResourceReference, ResourceType, Tag};

use crate::printer::PrintRenderer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Break {
    None,
    Line,
    Block,
}

/// Text-only renderer.
///
/// Blocks are separated by a blank line and list items, table rows,
/// definition items and quotation lines go on their own lines. Links show
/// their label, or their target when they have none; images and markup are
/// dropped.
#[derive(Debug)]
pub struct PlainRenderer {
    out: String,
    pending: Break,
    links: Vec<usize>,
    /// Open lists and quotations.
    nesting: usize,
    /// Whether the current table row already has a cell.
    row_has_cell: bool,
}

impl Default for PlainRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PlainRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            out: String::new(),
            pending: Break::None,
            links: Vec::new(),
            nesting: 0,
            row_has_cell: false,
        }
    }

    fn request(&mut self, brk: Break) {
        self.pending = self.pending.max(brk);
    }

    fn text(&mut self, text: &str) {
        if !self.out.is_empty() {
            match self.pending {
                Break::None => {}
                Break::Line => self.out.push('\n'),
                Break::Block => self.out.push_str("\n\n"),
            }
        }
        self.pending = Break::None;
        self.out.push_str(text);
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph
            | Tag::Heading(_)
            | Tag::Table
            | Tag::DefinitionList
            | Tag::Group => self.request(Break::Block),
            Tag::List(_) | Tag::Quotation => {
                self.request(if self.nesting > 0 { Break::Line } else { Break::Block });
                self.nesting += 1;
            }
            Tag::ListItem | Tag::DefinitionTerm | Tag::DefinitionDescription | Tag::QuotationLine => {
                self.request(Break::Line);
            }
            Tag::TableRow => {
                self.request(Break::Line);
                self.row_has_cell = false;
            }
            Tag::TableCell { .. } => {
                if self.row_has_cell {
                    self.text("\t");
                }
                self.row_has_cell = true;
            }
            Tag::Link { .. } => self.links.push(self.out.len()),
            Tag::MacroMarker(call) if !call.inline => self.request(Break::Block),
            Tag::Document | Tag::Format(_) | Tag::MacroMarker(_) => {}
        }
    }

    fn end(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Link { reference, .. } => {
                if self.links.pop() == Some(self.out.len()) {
                    self.text(&label(reference));
                }
            }
            Tag::List(_) | Tag::Quotation => {
                self.nesting -= 1;
                if self.nesting == 0 {
                    self.request(Break::Block);
                }
            }
            Tag::Paragraph | Tag::Heading(_) | Tag::Table | Tag::DefinitionList | Tag::Group => {
                self.request(Break::Block);
            }
            _ => {}
        }
    }
}

fn label(reference: &ResourceReference) -> String {
    match reference.kind() {
        ResourceType::Document if reference.reference().is_empty() => {
            reference.anchor().unwrap_or_default().to_owned()
        }
        _ => reference.reference().to_owned(),
    }
}

impl Listener for PlainRenderer {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag, _) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Word(word) => self.text(word),
            Event::Space => self.text(" "),
            Event::SpecialSymbol(symbol) => self.text(symbol.encode_utf8(&mut [0; 4])),
            Event::NewLine => self.text("\n"),
            Event::Verbatim { text, inline, .. } => {
                if !inline {
                    self.request(Break::Block);
                }
                self.text(text);
                if !inline {
                    self.request(Break::Block);
                }
            }
            Event::Error {
                message, inline, ..
            } => {
                if !inline {
                    self.request(Break::Block);
                }
                self.text(message);
            }
            Event::EmptyLines(_)
            | Event::HorizontalLine(_)
            | Event::Image { .. }
            | Event::Raw { .. }
            | Event::Macro(_)
            | Event::Id(_) => {}
        }
    }
}

impl PrintRenderer for PlainRenderer {
    fn finish(self: Box<Self>) -> String {
        self.out
    }
}
