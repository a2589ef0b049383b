//! Listener protocol.
//!
//! Parsers emit [`Event`]s to a [`Listener`]; the tree builder and every
//! renderer are listeners. Compound constructs are bracketed by
//! [`Event::Start`] / [`Event::End`] carrying the same [`Tag`]; atomic
//! constructs are single events.

use crate::block::{BlockKind, Format, ListKind, MacroCall, Parameters};
use crate::reference::ResourceReference;
use crate::syntax::Syntax;

/// Compound construct opened by [`Event::Start`] and closed by [`Event::End`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tag<'a> {
    Document,
    Paragraph,
    Heading(u8),
    List(ListKind),
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
    Link {
        reference: &'a ResourceReference,
        freestanding: bool,
    },
    MacroMarker(&'a MacroCall),
    Group,
}

impl Tag<'_> {
    /// Block kind corresponding to this tag (`None` for the document).
    #[must_use]
    pub fn to_kind(&self) -> Option<BlockKind> {
        let kind = match *self {
            Tag::Document => return None,
            Tag::Paragraph => BlockKind::Paragraph,
            Tag::Heading(level) => BlockKind::Heading { level },
            Tag::List(kind) => BlockKind::List { kind },
            Tag::ListItem => BlockKind::ListItem,
            Tag::DefinitionList => BlockKind::DefinitionList,
            Tag::DefinitionTerm => BlockKind::DefinitionTerm,
            Tag::DefinitionDescription => BlockKind::DefinitionDescription,
            Tag::Quotation => BlockKind::Quotation,
            Tag::QuotationLine => BlockKind::QuotationLine,
            Tag::Table => BlockKind::Table,
            Tag::TableRow => BlockKind::TableRow,
            Tag::TableCell { header } => BlockKind::TableCell { header },
            Tag::Format(format) => BlockKind::Format(format),
            Tag::Link {
                reference,
                freestanding,
            } => BlockKind::Link {
                reference: reference.clone(),
                freestanding,
            },
            Tag::MacroMarker(call) => BlockKind::MacroMarker(call.clone()),
            Tag::Group => BlockKind::Group,
        };
        Some(kind)
    }
}

/// A single listener event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Event<'a> {
    Start(Tag<'a>, &'a Parameters),
    End(Tag<'a>),
    Word(&'a str),
    Space,
    SpecialSymbol(char),
    NewLine,
    EmptyLines(usize),
    HorizontalLine(&'a Parameters),
    Image {
        reference: &'a ResourceReference,
        freestanding: bool,
        params: &'a Parameters,
    },
    Verbatim {
        text: &'a str,
        inline: bool,
        params: &'a Parameters,
    },
    Raw {
        text: &'a str,
        syntax: &'a Syntax,
    },
    /// Unexpanded macro occurrence.
    Macro(&'a MacroCall),
    Id(&'a str),
    Error {
        message: &'a str,
        description: &'a str,
        inline: bool,
    },
}

/// Receiver of document events.
pub trait Listener {
    fn event(&mut self, event: Event<'_>);
}

impl<L: Listener + ?Sized> Listener for &mut L {
    fn event(&mut self, event: Event<'_>) {
        (**self).event(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        starts: usize,
        ends: usize,
        words: Vec<String>,
    }

    impl Listener for Counter {
        fn event(&mut self, event: Event<'_>) {
            match event {
                Event::Start(..) => self.starts += 1,
                Event::End(_) => self.ends += 1,
                Event::Word(word) => self.words.push(word.to_owned()),
                _ => {}
            }
        }
    }

    #[test]
    fn test_tag_to_kind() {
        assert_eq!(Tag::Heading(2).to_kind(), Some(BlockKind::Heading { level: 2 }));
        assert_eq!(Tag::Document.to_kind(), None);
    }

    fn feed<L: Listener>(mut listener: L) {
        let params = Parameters::new();
        listener.event(Event::Start(Tag::Paragraph, &params));
        listener.event(Event::Word("hi"));
        listener.event(Event::End(Tag::Paragraph));
    }

    #[test]
    fn test_mutable_reference_forwards() {
        let mut counter = Counter::default();
        feed(&mut counter);
        assert_eq!(counter.starts, 1);
        assert_eq!(counter.ends, 1);
        assert_eq!(counter.words, vec!["hi".to_owned()]);
    }
}
