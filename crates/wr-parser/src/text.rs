//! Splitting of plain text into word, space and symbol events.

use wr_xdom::{Block, Event, Listener};

/// Piece of plain text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Token<'a> {
    Word(&'a str),
    Space,
    Special(char),
    NewLine,
}

/// Whether `c` is emitted as a special symbol rather than part of a word.
#[must_use]
pub fn is_special(c: char) -> bool {
    c.is_ascii_punctuation()
}

/// Iterator over the tokens of `text`.
///
/// Every whitespace character other than a newline is one [`Token::Space`].
pub fn tokenize(text: &str) -> Tokens<'_> {
    Tokens { rest: text }
}

pub struct Tokens<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let c = self.rest.chars().next()?;
        if c == '\n' {
            self.rest = &self.rest[1..];
            return Some(Token::NewLine);
        }
        if c == '\r' {
            self.rest = &self.rest[1..];
            return self.next();
        }
        if c.is_whitespace() {
            self.rest = &self.rest[c.len_utf8()..];
            return Some(Token::Space);
        }
        if is_special(c) {
            self.rest = &self.rest[1..];
            return Some(Token::Special(c));
        }
        let end = self
            .rest
            .find(|c: char| c.is_whitespace() || is_special(c))
            .unwrap_or(self.rest.len());
        let (word, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(Token::Word(word))
    }
}

/// Append the blocks for `text` to `out`.
pub fn push_text(text: &str, out: &mut Vec<Block>) {
    out.extend(tokenize(text).map(|token| match token {
        Token::Word(word) => Block::word(word),
        Token::Space => Block::space(),
        Token::Special(c) => Block::special(c),
        Token::NewLine => Block::new(wr_xdom::BlockKind::NewLine),
    }));
}

/// Blocks for `text`.
#[must_use]
pub fn text_blocks(text: &str) -> Vec<Block> {
    let mut out = Vec::new();
    push_text(text, &mut out);
    out
}

/// Emit the events for `text`.
pub fn emit_text(text: &str, listener: &mut dyn Listener) {
    for token in tokenize(text) {
        listener.event(match token {
            Token::Word(word) => Event::Word(word),
            Token::Space => Event::Space,
            Token::Special(c) => Event::SpecialSymbol(c),
            Token::NewLine => Event::NewLine,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tokenize_sentence() {
        let tokens: Vec<_> = tokenize("Some text.").collect();
        assert_eq!(
            tokens,
            vec![
                Token::Word("Some"),
                Token::Space,
                Token::Word("text"),
                Token::Special('.'),
            ]
        );
    }

    #[test]
    fn test_tokenize_unicode_word() {
        let tokens: Vec<_> = tokenize("héllo wörld").collect();
        assert_eq!(
            tokens,
            vec![Token::Word("héllo"), Token::Space, Token::Word("wörld")]
        );
    }

    #[test]
    fn test_tokenize_newlines_and_spaces() {
        let tokens: Vec<_> = tokenize("a  b\r\nc").collect();
        assert_eq!(
            tokens,
            vec![
                Token::Word("a"),
                Token::Space,
                Token::Space,
                Token::Word("b"),
                Token::NewLine,
                Token::Word("c"),
            ]
        );
    }

    #[test]
    fn test_text_blocks() {
        assert_eq!(
            text_blocks("a-b"),
            vec![Block::word("a"), Block::special('-'), Block::word("b")]
        );
    }
}
