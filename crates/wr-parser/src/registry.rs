//! Lookup of parsers by syntax.

use std::collections::BTreeMap;
use std::sync::Arc;

use wr_xdom::{Syntax, UnknownSyntaxError, Xdom};

use crate::{
    CreoleParser, MarkdownParser, ParseError, Parser, PlainParser, XWikiParser, XhtmlParser,
};

/// Parsers keyed by the syntax they read.
///
/// # Example
///
/// ```
/// use wr_parser::ParserRegistry;
/// use wr_xdom::Syntax;
///
/// let registry = ParserRegistry::new();
/// let xdom = registry.parse("Hello", &Syntax::PLAIN_1_0).unwrap();
/// assert_eq!(xdom.blocks.len(), 1);
/// ```
#[derive(Clone)]
pub struct ParserRegistry {
    parsers: BTreeMap<Syntax, Arc<dyn Parser>>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserRegistry {
    /// Registry with every built-in parser.
    #[must_use]
    pub fn new() -> Self {
        Self::empty()
            .with_parser(XWikiParser)
            .with_parser(CreoleParser)
            .with_parser(MarkdownParser::new())
            .with_parser(PlainParser)
            .with_parser(XhtmlParser)
    }

    /// Registry without parsers.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            parsers: BTreeMap::new(),
        }
    }

    /// Register a parser, replacing any parser for the same syntax.
    #[must_use]
    pub fn with_parser<P: Parser + 'static>(mut self, parser: P) -> Self {
        self.parsers.insert(parser.syntax(), Arc::new(parser));
        self
    }

    /// Parser for `syntax`.
    pub fn get(&self, syntax: &Syntax) -> Result<Arc<dyn Parser>, UnknownSyntaxError> {
        self.parsers
            .get(syntax)
            .map(Arc::clone)
            .ok_or_else(|| UnknownSyntaxError::NoParser(syntax.clone()))
    }

    /// Registered syntaxes in identifier order.
    pub fn syntaxes(&self) -> impl Iterator<Item = &Syntax> {
        self.parsers.keys()
    }

    /// Parse `source` written in `syntax`.
    pub fn parse(&self, source: &str, syntax: &Syntax) -> Result<Xdom, ParseError> {
        self.parse_with(source, syntax, None)
    }

    /// Parse `source` written in `syntax` as the content of `document`.
    pub fn parse_with(
        &self,
        source: &str,
        syntax: &Syntax,
        document: Option<&str>,
    ) -> Result<Xdom, ParseError> {
        let parser = self.get(syntax)?;
        tracing::debug!(syntax = %syntax, bytes = source.len(), "Parsing");
        parser.parse_with(source, document)
    }
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserRegistry")
            .field("syntaxes", &self.parsers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parsers() {
        let registry = ParserRegistry::new();
        let ids: Vec<String> = registry.syntaxes().map(Syntax::id).collect();
        assert_eq!(
            ids,
            vec![
                "creole/1.0",
                "markdown/1.0",
                "plain/1.0",
                "xhtml/1.0",
                "xwiki/2.0"
            ]
        );
    }

    #[test]
    fn test_unknown_syntax() {
        let registry = ParserRegistry::new();
        let err = registry.parse("x", &Syntax::EVENT_1_0).unwrap_err();
        assert!(matches!(
            err,
            ParseError::UnknownSyntax(UnknownSyntaxError::NoParser(ref s)) if *s == Syntax::EVENT_1_0
        ));
    }

    #[test]
    fn test_parse_dispatches_by_syntax() {
        let registry = ParserRegistry::new();
        let wiki = registry.parse("**a**", &Syntax::XWIKI_2_0).unwrap();
        let plain = registry.parse("**a**", &Syntax::PLAIN_1_0).unwrap();
        assert_eq!(wiki.blocks[0].children.len(), 1);
        assert_eq!(plain.blocks[0].children.len(), 5);
    }
}
