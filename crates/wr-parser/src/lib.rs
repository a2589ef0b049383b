//! Syntax parsers for the wiki rendering pipeline.
//!
//! Every parser turns source text into an [`Xdom`] and can also stream the
//! same document as [`Listener`] events:
//!
//! ```
//! use wr_parser::{Parser, XWikiParser};
//!
//! let xdom = XWikiParser.parse("= Title =\n\nSome **bold** text.").unwrap();
//! assert_eq!(xdom.blocks.len(), 2);
//! ```
//!
//! Parsers are lenient: malformed markup is kept as literal text. The only
//! failures are event streams that do not form a valid tree and malformed XML
//! in the XHTML dialect.

mod creole;
mod markdown;
mod params;
mod plain;
mod registry;
mod resolver;
mod text;
mod wiki;
mod xhtml;
mod xwiki;

pub use creole::CreoleParser;
pub use markdown::MarkdownParser;
pub use params::{format_params, parse_params};
pub use plain::PlainParser;
pub use registry::ParserRegistry;
pub use resolver::{
    CreoleResolver, InvalidReferenceError, ReferenceResolver, UrlResolver, XWikiImageResolver,
    XWikiLinkResolver, is_url,
};
pub use text::{Token, emit_text, is_special, text_blocks, tokenize};
pub use xhtml::{XhtmlParser, decode_comment_fields, encode_comment_fields};
pub use xwiki::XWikiParser;

use wr_xdom::{BuildError, Listener, Syntax, UnknownSyntaxError, Xdom, XdomBuilder};

/// Parse error.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The parsed constructs do not form a valid document tree.
    #[error("Malformed document: {0}")]
    Malformed(#[from] BuildError),
    /// The input cannot be read at all.
    #[error("Syntax error at offset {position}: {message}")]
    Syntax { position: usize, message: String },
    /// No parser for the requested syntax.
    #[error(transparent)]
    UnknownSyntax(#[from] UnknownSyntaxError),
}

/// Parser for one source syntax.
///
/// A parser is an event source: [`parse_events`](Self::parse_events) streams
/// the document to a [`Listener`] and [`parse_with`](Self::parse_with) feeds
/// that stream into an [`XdomBuilder`].
pub trait Parser: Send + Sync {
    /// Syntax handled by this parser.
    fn syntax(&self) -> Syntax;

    /// Emit the events for `source` to `listener`, bracketed by the document
    /// start and end events. `document` is the reference of the document
    /// being parsed, used to qualify relative attachment references.
    fn parse_events(
        &self,
        source: &str,
        document: Option<&str>,
        listener: &mut dyn Listener,
    ) -> Result<(), ParseError>;

    /// Parse `source` into a tree.
    fn parse_with(&self, source: &str, document: Option<&str>) -> Result<Xdom, ParseError> {
        let mut builder = XdomBuilder::new();
        self.parse_events(source, document, &mut builder)?;
        Ok(builder.finish()?)
    }

    /// Parse `source` outside of any document.
    fn parse(&self, source: &str) -> Result<Xdom, ParseError> {
        self.parse_with(source, None)
    }
}
