//! Tree builder: turns a listener event stream into an [`Xdom`].

use crate::block::{Block, BlockKind, Parameters};
use crate::listener::{Event, Listener, Tag};
use crate::xdom::Xdom;

/// Event stream does not describe a well-formed tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// An end event did not match the innermost open construct.
    #[error("Unbalanced events: expected end of {expected}, got end of {found}")]
    Unbalanced {
        expected: &'static str,
        found: &'static str,
    },
    /// An end event arrived with nothing open.
    #[error("Unexpected end of {0}")]
    UnexpectedEnd(&'static str),
    /// The stream finished with constructs still open.
    #[error("Unclosed {0}")]
    Unclosed(&'static str),
    /// A block was placed under a parent that does not accept it.
    #[error("Invalid nesting: {child} is not allowed in {parent}")]
    InvalidNesting {
        child: &'static str,
        parent: &'static str,
    },
}

struct Frame {
    kind: BlockKind,
    params: Parameters,
    children: Vec<Block>,
}

/// Listener that builds an [`Xdom`].
///
/// Events are accepted unconditionally; the first protocol violation is
/// recorded and reported by [`finish`](Self::finish).
#[derive(Default)]
pub struct XdomBuilder {
    root: Vec<Block>,
    root_params: Parameters,
    stack: Vec<Frame>,
    error: Option<BuildError>,
}

impl XdomBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the built document or the first protocol violation.
    pub fn finish(self) -> Result<Xdom, BuildError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if let Some(frame) = self.stack.last() {
            return Err(BuildError::Unclosed(frame.kind.name()));
        }
        Ok(Xdom::new(self.root).with_params(self.root_params))
    }

    fn parent_kind(&self) -> Option<&BlockKind> {
        self.stack.last().map(|frame| &frame.kind)
    }

    fn push(&mut self, block: Block) {
        if self.error.is_none() && !block.kind.allowed_in(self.parent_kind()) {
            self.error = Some(BuildError::InvalidNesting {
                child: block.kind.name(),
                parent: self.parent_kind().map_or("document", BlockKind::name),
            });
        }
        match self.stack.last_mut() {
            Some(frame) => frame.children.push(block),
            None => self.root.push(block),
        }
    }

    fn fail(&mut self, err: BuildError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    fn start(&mut self, tag: Tag<'_>, params: &Parameters) {
        match tag.to_kind() {
            Some(kind) => self.stack.push(Frame {
                kind,
                params: params.clone(),
                children: Vec::new(),
            }),
            None => self.root_params.clone_from(params),
        }
    }

    fn end(&mut self, tag: Tag<'_>) {
        let Some(kind) = tag.to_kind() else {
            if let Some(frame) = self.stack.last() {
                let name = frame.kind.name();
                self.fail(BuildError::Unclosed(name));
            }
            return;
        };
        let Some(frame) = self.stack.pop() else {
            self.fail(BuildError::UnexpectedEnd(kind.name()));
            return;
        };
        if frame.kind != kind {
            self.fail(BuildError::Unbalanced {
                expected: frame.kind.name(),
                found: kind.name(),
            });
        }
        let block = Block {
            kind: frame.kind,
            children: frame.children,
            params: frame.params,
        };
        self.push(block);
    }
}

impl Listener for XdomBuilder {
    fn event(&mut self, event: Event<'_>) {
        let kind = match event {
            Event::Start(tag, params) => return self.start(tag, params),
            Event::End(tag) => return self.end(tag),
            Event::Word(word) => BlockKind::Word(word.to_owned()),
            Event::Space => BlockKind::Space,
            Event::SpecialSymbol(symbol) => BlockKind::SpecialSymbol(symbol),
            Event::NewLine => BlockKind::NewLine,
            Event::EmptyLines(count) => BlockKind::EmptyLines(count),
            Event::HorizontalLine(params) => {
                return self.push(Block::new(BlockKind::HorizontalLine).with_params(params.clone()));
            }
            Event::Image {
                reference,
                freestanding,
                params,
            } => {
                let kind = BlockKind::Image {
                    reference: reference.clone(),
                    freestanding,
                };
                return self.push(Block::new(kind).with_params(params.clone()));
            }
            Event::Verbatim {
                text,
                inline,
                params,
            } => {
                let kind = BlockKind::Verbatim {
                    text: text.to_owned(),
                    inline,
                };
                return self.push(Block::new(kind).with_params(params.clone()));
            }
            Event::Raw { text, syntax } => BlockKind::Raw {
                text: text.to_owned(),
                syntax: syntax.clone(),
            },
            Event::Macro(call) => BlockKind::Macro(call.clone()),
            Event::Id(name) => BlockKind::Id(name.to_owned()),
            Event::Error {
                message,
                description,
                inline,
            } => BlockKind::Error {
                message: message.to_owned(),
                description: description.to_owned(),
                inline,
            },
        };
        self.push(Block::new(kind));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Format, ListKind};
    use pretty_assertions::assert_eq;

    fn empty() -> Parameters {
        Parameters::new()
    }

    #[test]
    fn test_build_paragraph() {
        let params = empty();
        let mut builder = XdomBuilder::new();
        builder.event(Event::Start(Tag::Document, &params));
        builder.event(Event::Start(Tag::Paragraph, &params));
        builder.event(Event::Word("Some"));
        builder.event(Event::Space);
        builder.event(Event::Start(Tag::Format(Format::Bold), &params));
        builder.event(Event::Word("bold"));
        builder.event(Event::End(Tag::Format(Format::Bold)));
        builder.event(Event::End(Tag::Paragraph));
        builder.event(Event::End(Tag::Document));

        let xdom = builder.finish().unwrap();
        assert_eq!(
            xdom.blocks,
            vec![Block::paragraph(vec![
                Block::word("Some"),
                Block::space(),
                Block::format(Format::Bold, vec![Block::word("bold")]),
            ])]
        );
    }

    #[test]
    fn test_mismatched_end_is_reported() {
        let params = empty();
        let mut builder = XdomBuilder::new();
        builder.event(Event::Start(Tag::Paragraph, &params));
        builder.event(Event::End(Tag::Heading(1)));
        assert_eq!(
            builder.finish().unwrap_err(),
            BuildError::Unbalanced {
                expected: "paragraph",
                found: "heading"
            }
        );
    }

    #[test]
    fn test_unclosed_is_reported() {
        let params = empty();
        let mut builder = XdomBuilder::new();
        builder.event(Event::Start(Tag::Quotation, &params));
        assert_eq!(
            builder.finish().unwrap_err(),
            BuildError::Unclosed("quotation")
        );
    }

    #[test]
    fn test_unexpected_end_is_reported() {
        let mut builder = XdomBuilder::new();
        builder.event(Event::End(Tag::Paragraph));
        assert_eq!(
            builder.finish().unwrap_err(),
            BuildError::UnexpectedEnd("paragraph")
        );
    }

    #[test]
    fn test_list_item_outside_list_is_rejected() {
        let params = empty();
        let mut builder = XdomBuilder::new();
        builder.event(Event::Start(Tag::ListItem, &params));
        builder.event(Event::End(Tag::ListItem));
        assert!(matches!(
            builder.finish(),
            Err(BuildError::InvalidNesting { child: "list item", .. })
        ));
    }

    #[test]
    fn test_document_params_are_kept() {
        let mut params = empty();
        params.insert("class".to_owned(), "main".to_owned());
        let mut builder = XdomBuilder::new();
        builder.event(Event::Start(Tag::Document, &params));
        builder.event(Event::Start(Tag::List(ListKind::Numbered), &empty()));
        builder.event(Event::Start(Tag::ListItem, &empty()));
        builder.event(Event::Word("one"));
        builder.event(Event::End(Tag::ListItem));
        builder.event(Event::End(Tag::List(ListKind::Numbered)));
        builder.event(Event::End(Tag::Document));

        let xdom = builder.finish().unwrap();
        assert_eq!(xdom.params.get("class").map(String::as_str), Some("main"));
        assert_eq!(xdom.blocks.len(), 1);
    }
}
