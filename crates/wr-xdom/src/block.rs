//! Document blocks.
//!
//! A [`Block`] is a node of the document tree. Its [`BlockKind`] is a closed
//! set: renderers and transformations match on it exhaustively.

use std::collections::BTreeMap;

use crate::listener::{Event, Listener, Tag};
use crate::reference::ResourceReference;
use crate::syntax::Syntax;

/// Free-form block parameters (`(% class="x" %)` in wiki syntax).
pub type Parameters = BTreeMap<String, String>;

/// Inline text format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Format {
    Bold,
    Italic,
    Underlined,
    StrikedOut,
    Superscript,
    Subscript,
    Monospace,
}

impl Format {
    /// Uppercase name used in event traces.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bold => "BOLD",
            Self::Italic => "ITALIC",
            Self::Underlined => "UNDERLINED",
            Self::StrikedOut => "STRIKEDOUT",
            Self::Superscript => "SUPERSCRIPT",
            Self::Subscript => "SUBSCRIPT",
            Self::Monospace => "MONOSPACE",
        }
    }
}

/// List numbering style.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ListKind {
    Bulleted,
    Numbered,
}

/// An occurrence of a macro in the source.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MacroCall {
    /// Macro identifier (lowercase).
    pub id: String,
    /// Raw parameter values as written.
    pub params: Parameters,
    /// Macro content between the start and end markers.
    pub content: Option<String>,
    /// Whether the macro appears inside a paragraph.
    pub inline: bool,
}

impl MacroCall {
    /// Create a macro call without parameters or content.
    #[must_use]
    pub fn new(id: impl Into<String>, inline: bool) -> Self {
        Self {
            id: id.into(),
            params: Parameters::new(),
            content: None,
            inline,
        }
    }

    /// Add a parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Set the content.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

/// What a block represents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Heading { level: u8 },
    List { kind: ListKind },
    ListItem,
    DefinitionList,
    DefinitionTerm,
    DefinitionDescription,
    Quotation,
    QuotationLine,
    Table,
    TableRow,
    TableCell { header: bool },
    Format(Format),
    Word(String),
    Space,
    SpecialSymbol(char),
    NewLine,
    EmptyLines(usize),
    HorizontalLine,
    Link {
        reference: ResourceReference,
        freestanding: bool,
    },
    Image {
        reference: ResourceReference,
        freestanding: bool,
    },
    Verbatim { text: String, inline: bool },
    Raw { text: String, syntax: Syntax },
    /// Macro occurrence not yet expanded.
    Macro(MacroCall),
    /// Expanded macro; children hold the result.
    MacroMarker(MacroCall),
    Group,
    Error {
        message: String,
        description: String,
        inline: bool,
    },
    Id(String),
}

impl BlockKind {
    /// Tag for compound kinds, `None` for atomic ones.
    #[must_use]
    pub fn tag(&self) -> Option<Tag<'_>> {
        let tag = match self {
            Self::Paragraph => Tag::Paragraph,
            Self::Heading { level } => Tag::Heading(*level),
            Self::List { kind } => Tag::List(*kind),
            Self::ListItem => Tag::ListItem,
            Self::DefinitionList => Tag::DefinitionList,
            Self::DefinitionTerm => Tag::DefinitionTerm,
            Self::DefinitionDescription => Tag::DefinitionDescription,
            Self::Quotation => Tag::Quotation,
            Self::QuotationLine => Tag::QuotationLine,
            Self::Table => Tag::Table,
            Self::TableRow => Tag::TableRow,
            Self::TableCell { header } => Tag::TableCell { header: *header },
            Self::Format(format) => Tag::Format(*format),
            Self::Link {
                reference,
                freestanding,
            } => Tag::Link {
                reference,
                freestanding: *freestanding,
            },
            Self::MacroMarker(call) => Tag::MacroMarker(call),
            Self::Group => Tag::Group,
            _ => return None,
        };
        Some(tag)
    }

    /// Short name used in error messages.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
            Self::Heading { .. } => "heading",
            Self::List { .. } => "list",
            Self::ListItem => "list item",
            Self::DefinitionList => "definition list",
            Self::DefinitionTerm => "definition term",
            Self::DefinitionDescription => "definition description",
            Self::Quotation => "quotation",
            Self::QuotationLine => "quotation line",
            Self::Table => "table",
            Self::TableRow => "table row",
            Self::TableCell { .. } => "table cell",
            Self::Format(_) => "format",
            Self::Word(_) => "word",
            Self::Space => "space",
            Self::SpecialSymbol(_) => "special symbol",
            Self::NewLine => "new line",
            Self::EmptyLines(_) => "empty lines",
            Self::HorizontalLine => "horizontal line",
            Self::Link { .. } => "link",
            Self::Image { .. } => "image",
            Self::Verbatim { .. } => "verbatim",
            Self::Raw { .. } => "raw",
            Self::Macro(_) => "macro",
            Self::MacroMarker(_) => "macro marker",
            Self::Group => "group",
            Self::Error { .. } => "error",
            Self::Id(_) => "id",
        }
    }

    /// Whether a block of this kind may be placed directly under `parent`
    /// (`None` for the document root).
    #[must_use]
    pub fn allowed_in(&self, parent: Option<&BlockKind>) -> bool {
        let required_parent: Option<fn(&BlockKind) -> bool> = match self {
            Self::ListItem => Some(|p: &BlockKind| matches!(p, BlockKind::List { .. })),
            Self::TableRow => Some(|p: &BlockKind| matches!(p, BlockKind::Table)),
            Self::TableCell { .. } => Some(|p: &BlockKind| matches!(p, BlockKind::TableRow)),
            Self::DefinitionTerm | Self::DefinitionDescription => {
                Some(|p: &BlockKind| matches!(p, BlockKind::DefinitionList))
            }
            Self::QuotationLine => Some(|p: &BlockKind| matches!(p, BlockKind::Quotation)),
            _ => None,
        };
        if let Some(check) = required_parent {
            return parent.is_some_and(check);
        }
        // Structural containers only hold their own item kinds.
        !matches!(
            parent,
            Some(
                BlockKind::List { .. }
                    | BlockKind::Table
                    | BlockKind::TableRow
                    | BlockKind::DefinitionList
                    | BlockKind::Quotation
            )
        ) || matches!((parent, self), (Some(BlockKind::Quotation), BlockKind::Quotation))
    }

    /// Whether the kind is rendered inline (inside paragraphs).
    #[must_use]
    pub fn is_inline(&self) -> bool {
        match self {
            Self::Format(_)
            | Self::Word(_)
            | Self::Space
            | Self::SpecialSymbol(_)
            | Self::NewLine
            | Self::Link { .. }
            | Self::Id(_) => true,
            Self::Image { freestanding, .. } => !*freestanding,
            Self::Verbatim { inline, .. } | Self::Error { inline, .. } => *inline,
            Self::Macro(call) | Self::MacroMarker(call) => call.inline,
            _ => false,
        }
    }
}

/// Node of the document tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub children: Vec<Block>,
    pub params: Parameters,
}

impl Block {
    /// Create a block without children or parameters.
    #[must_use]
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
            params: Parameters::new(),
        }
    }

    /// Set the children.
    #[must_use]
    pub fn with_children(mut self, children: Vec<Block>) -> Self {
        self.children = children;
        self
    }

    /// Set the parameters.
    #[must_use]
    pub fn with_params(mut self, params: Parameters) -> Self {
        self.params = params;
        self
    }

    /// Add a single parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn paragraph(children: Vec<Block>) -> Self {
        Self::new(BlockKind::Paragraph).with_children(children)
    }

    #[must_use]
    pub fn heading(level: u8, children: Vec<Block>) -> Self {
        Self::new(BlockKind::Heading { level }).with_children(children)
    }

    #[must_use]
    pub fn format(format: Format, children: Vec<Block>) -> Self {
        Self::new(BlockKind::Format(format)).with_children(children)
    }

    #[must_use]
    pub fn word(text: impl Into<String>) -> Self {
        Self::new(BlockKind::Word(text.into()))
    }

    #[must_use]
    pub fn space() -> Self {
        Self::new(BlockKind::Space)
    }

    #[must_use]
    pub fn special(symbol: char) -> Self {
        Self::new(BlockKind::SpecialSymbol(symbol))
    }

    #[must_use]
    pub fn group(children: Vec<Block>) -> Self {
        Self::new(BlockKind::Group).with_children(children)
    }

    /// Error block shown in place of content that failed to produce output.
    #[must_use]
    pub fn error(message: impl Into<String>, description: impl Into<String>, inline: bool) -> Self {
        Self::new(BlockKind::Error {
            message: message.into(),
            description: description.into(),
            inline,
        })
    }

    /// Whether the block is rendered inline.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        self.kind.is_inline()
    }

    /// Emit the block and its descendants to a listener.
    pub fn traverse(&self, listener: &mut dyn Listener) {
        if let Some(tag) = self.kind.tag() {
            listener.event(Event::Start(tag, &self.params));
            for child in &self.children {
                child.traverse(listener);
            }
            listener.event(Event::End(tag));
            return;
        }

        let event = match &self.kind {
            BlockKind::Word(word) => Event::Word(word),
            BlockKind::Space => Event::Space,
            BlockKind::SpecialSymbol(symbol) => Event::SpecialSymbol(*symbol),
            BlockKind::NewLine => Event::NewLine,
            BlockKind::EmptyLines(count) => Event::EmptyLines(*count),
            BlockKind::HorizontalLine => Event::HorizontalLine(&self.params),
            BlockKind::Image {
                reference,
                freestanding,
            } => Event::Image {
                reference,
                freestanding: *freestanding,
                params: &self.params,
            },
            BlockKind::Verbatim { text, inline } => Event::Verbatim {
                text,
                inline: *inline,
                params: &self.params,
            },
            BlockKind::Raw { text, syntax } => Event::Raw { text, syntax },
            BlockKind::Macro(call) => Event::Macro(call),
            BlockKind::Error {
                message,
                description,
                inline,
            } => Event::Error {
                message,
                description,
                inline: *inline,
            },
            BlockKind::Id(name) => Event::Id(name),
            // Compound kinds were handled above.
            _ => return,
        };
        listener.event(event);
    }

    /// Concatenated text of words, spaces and symbols under this block.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match &self.kind {
            BlockKind::Word(word) => out.push_str(word),
            BlockKind::Space => out.push(' '),
            BlockKind::SpecialSymbol(symbol) => out.push(*symbol),
            BlockKind::NewLine => out.push('\n'),
            BlockKind::Verbatim { text, .. } => out.push_str(text),
            _ => {
                for child in &self.children {
                    child.collect_text(out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_item_requires_list() {
        let list = BlockKind::List {
            kind: ListKind::Bulleted,
        };
        assert!(!BlockKind::ListItem.allowed_in(None));
        assert!(!BlockKind::ListItem.allowed_in(Some(&BlockKind::Paragraph)));
        assert!(BlockKind::ListItem.allowed_in(Some(&list)));
    }

    #[test]
    fn test_table_only_holds_rows() {
        assert!(!BlockKind::Paragraph.allowed_in(Some(&BlockKind::Table)));
        assert!(BlockKind::TableRow.allowed_in(Some(&BlockKind::Table)));
    }

    #[test]
    fn test_nested_quotation_is_allowed() {
        assert!(BlockKind::Quotation.allowed_in(Some(&BlockKind::Quotation)));
        assert!(BlockKind::QuotationLine.allowed_in(Some(&BlockKind::Quotation)));
    }

    #[test]
    fn test_text_collects_words() {
        let block = Block::paragraph(vec![
            Block::word("Some"),
            Block::space(),
            Block::format(Format::Bold, vec![Block::word("bold")]),
            Block::special('.'),
        ]);
        assert_eq!(block.text(), "Some bold.");
    }

    #[test]
    fn test_inline_kinds() {
        assert!(Block::word("a").is_inline());
        assert!(!Block::paragraph(vec![]).is_inline());
        assert!(Block::new(BlockKind::Macro(MacroCall::new("x", true))).is_inline());
        assert!(!Block::new(BlockKind::Macro(MacroCall::new("x", false))).is_inline());
    }
}
