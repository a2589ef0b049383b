//! Parser for the `xwiki/2.0` syntax.

use wr_xdom::{Format, Listener, Syntax};

use crate::resolver::{XWikiImageResolver, XWikiLinkResolver};
use crate::wiki::{Dialect, LinkStyle, parse_document};
use crate::{ParseError, Parser};

static XWIKI: Dialect = Dialect {
    syntax: Syntax::XWIKI_2_0,
    formats: &[
        ("**", Format::Bold),
        ("//", Format::Italic),
        ("__", Format::Underlined),
        ("--", Format::StrikedOut),
        ("##", Format::Monospace),
        ("^^", Format::Superscript),
        (",,", Format::Subscript),
    ],
    links: LinkStyle::LabelFirst,
    numbered_marker: '1',
    macros: true,
    block_params: true,
    quotations: true,
    definition_lists: true,
    groups: true,
    prefixed_images: true,
    link_resolver: &XWikiLinkResolver,
    image_resolver: &XWikiImageResolver,
};

/// Parser for the default rich wiki syntax.
#[derive(Debug, Default, Clone, Copy)]
pub struct XWikiParser;

impl Parser for XWikiParser {
    fn syntax(&self) -> Syntax {
        XWIKI.syntax.clone()
    }

    fn parse_events(
        &self,
        source: &str,
        document: Option<&str>,
        listener: &mut dyn Listener,
    ) -> Result<(), ParseError> {
        parse_document(&XWIKI, document, source, listener);
        Ok(())
    }
}
