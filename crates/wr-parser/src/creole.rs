//! Parser for `creole/1.0`.

use wr_xdom::{Format, Listener, Syntax};

use crate::resolver::CreoleResolver;
use crate::wiki::{Dialect, LinkStyle, parse_document};
use crate::{ParseError, Parser};

static CREOLE: Dialect = Dialect {
    syntax: Syntax::CREOLE_1_0,
    formats: &[
        ("**", Format::Bold),
        ("//", Format::Italic),
        ("##", Format::Monospace),
    ],
    links: LinkStyle::ReferenceFirst,
    numbered_marker: '#',
    macros: false,
    block_params: false,
    quotations: false,
    definition_lists: false,
    groups: false,
    prefixed_images: false,
    link_resolver: &CreoleResolver::links(),
    image_resolver: &CreoleResolver::images(),
};

/// Parser for Creole 1.0 lightweight markup.
#[derive(Debug, Default, Clone, Copy)]
pub struct CreoleParser;

impl Parser for CreoleParser {
    fn syntax(&self) -> Syntax {
        CREOLE.syntax.clone()
    }

    fn parse_events(
        &self,
        source: &str,
        document: Option<&str>,
        listener: &mut dyn Listener,
    ) -> Result<(), ParseError> {
        parse_document(&CREOLE, document, source, listener);
        Ok(())
    }
}
