//! Line-oriented wiki grammar shared by the `xwiki/2.0` and `creole/1.0`
//! parsers.
//!
//! A [`Dialect`] describes the markers of a concrete syntax. Parsing never
//! fails: constructs that do not close, or whose references cannot be
//! resolved, are kept as literal text.

use std::sync::LazyLock;

use regex::Regex;
use wr_xdom::{Block, BlockKind, Event, Format, ListKind, Listener, MacroCall, Parameters, Syntax, Tag};

use crate::params::parse_params;
use crate::resolver::ReferenceResolver;
use crate::text::push_text;

/// How links are written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LinkStyle {
    /// `[[label>>reference||params]]`
    LabelFirst,
    /// `[[reference|label]]`
    ReferenceFirst,
}

/// Markers of a wiki dialect.
pub(crate) struct Dialect {
    pub syntax: Syntax,
    pub formats: &'static [(&'static str, Format)],
    pub links: LinkStyle,
    pub numbered_marker: char,
    pub macros: bool,
    pub block_params: bool,
    pub quotations: bool,
    pub definition_lists: bool,
    pub groups: bool,
    /// `image:ref` and `[[image:ref]]` images (otherwise `{{ref|alt}}`).
    pub prefixed_images: bool,
    pub link_resolver: &'static dyn ReferenceResolver,
    pub image_resolver: &'static dyn ReferenceResolver,
}

const ESCAPE: char = '~';

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:https?|ftp|file)://[^\s\[\]{}|]+|mailto:[^\s\[\]{}|]+)").unwrap()
});

static LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]*(\*+|1+\.|#+)[ \t]+").unwrap());

/// Emit the events of a full document.
pub(crate) fn parse_document(
    dialect: &Dialect,
    context: Option<&str>,
    source: &str,
    listener: &mut dyn Listener,
) {
    listener.event(Event::Start(Tag::Document, &Parameters::new()));
    emit_blocks(dialect, context, source, listener);
    listener.event(Event::End(Tag::Document));
}

/// Emit the events of the top-level blocks of `source`.
fn emit_blocks(
    dialect: &Dialect,
    context: Option<&str>,
    source: &str,
    listener: &mut dyn Listener,
) {
    let source = source.replace("\r\n", "\n");
    let mut parser = BlockParser {
        inline: InlineParser { dialect, context },
        src: &source,
        pos: 0,
        listener,
        emitted: false,
        pending_params: Parameters::new(),
    };
    parser.run();
}

/// Parse a macro call at the start of `text`.
///
/// Returns the call (marked standalone) and the number of bytes it spans.
/// Content is everything up to the matching `{{/id}}`, with one leading and
/// one trailing newline removed. A start marker without a matching end marker
/// is a call without content.
pub(crate) fn parse_macro(text: &str) -> Option<(MacroCall, usize)> {
    let after = text.strip_prefix("{{")?;
    if !after.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    let id_len = after
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')))
        .unwrap_or(after.len());
    let id = &after[..id_len];

    let (params_end, close_len, self_closing) = find_macro_close(&after[id_len..])?;
    let params = parse_params(&after[id_len..id_len + params_end]);
    let mut call = MacroCall::new(id.to_ascii_lowercase(), false);
    call.params = params;

    let open_end = 2 + id_len + params_end + close_len;
    if self_closing {
        return Some((call, open_end));
    }

    let end_marker = format!("{{{{/{id}}}}}");
    let body = &text[open_end..];
    let mut depth = 0usize;
    let mut i = 0;
    while let Some(offset) = body[i..].find("{{") {
        let at = i + offset;
        if body[at..].starts_with(&end_marker) {
            if depth == 0 {
                let content = &body[..at];
                let content = content.strip_prefix('\n').unwrap_or(content);
                let content = content.strip_suffix('\n').unwrap_or(content);
                call.content = Some(content.to_owned());
                return Some((call, open_end + at + end_marker.len()));
            }
            depth -= 1;
            i = at + end_marker.len();
            continue;
        }
        if let Some(len) = nested_start(&body[at + 2..], id) {
            depth += 1;
            i = at + 2 + len;
            continue;
        }
        i = at + 2;
    }
    Some((call, open_end))
}

/// Length of a non-self-closing `id` start marker at the start of `s` (the
/// text after `{{`).
fn nested_start(s: &str, id: &str) -> Option<usize> {
    let rest = s.strip_prefix(id)?;
    if rest.starts_with(|c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')) {
        return None;
    }
    match find_macro_close(rest)? {
        (_, _, true) => None,
        (params_end, close_len, false) => Some(id.len() + params_end + close_len),
    }
}

/// Find the end of a macro start marker, honoring quoted parameter values.
///
/// Returns (length of the parameter text, length of the closing marker,
/// whether the marker is self-closing).
fn find_macro_close(s: &str) -> Option<(usize, usize, bool)> {
    let mut quote: Option<char> = None;
    let mut chars = s.char_indices();
    while let Some((i, c)) = chars.next() {
        match quote {
            Some(q) => {
                if c == ESCAPE {
                    chars.next();
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => quote = Some(c),
                '/' if s[i..].starts_with("/}}") => return Some((i, 3, true)),
                '}' if s[i..].starts_with("}}") => return Some((i, 2, false)),
                _ => {}
            },
        }
    }
    None
}

/// Split a list marker into (depth, kind).
fn list_marker(dialect: &Dialect, marker: &str) -> Option<(usize, ListKind)> {
    if marker.starts_with('*') {
        return Some((marker.len(), ListKind::Bulleted));
    }
    match dialect.numbered_marker {
        '1' if marker.ends_with('.') && marker.starts_with('1') => {
            Some((marker.len() - 1, ListKind::Numbered))
        }
        '#' if marker.starts_with('#') => Some((marker.len(), ListKind::Numbered)),
        _ => None,
    }
}

/// Split a table line into (header, content) cells.
///
/// Separators inside links, macros and after an escape are ignored. A trailing
/// separator does not open an empty cell.
fn split_cells(line: &str) -> Vec<(bool, &str)> {
    let line = line.trim();
    let mut cells = Vec::new();
    let mut start: Option<(usize, bool)> = None;
    let mut nesting = 0usize;
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'~' => {
                i += 2;
                continue;
            }
            b'[' | b'{' if bytes.get(i + 1) == Some(&bytes[i]) => {
                nesting += 1;
                i += 2;
                continue;
            }
            b']' | b'}' if nesting > 0 && bytes.get(i + 1) == Some(&bytes[i]) => {
                nesting -= 1;
                i += 2;
                continue;
            }
            b'|' if nesting == 0 => {
                if let Some((from, header)) = start {
                    cells.push((header, &line[from..i]));
                }
                let header = bytes.get(i + 1) == Some(&b'=');
                let from = if header { i + 2 } else { i + 1 };
                start = Some((from, header));
                i = from;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    if let Some((from, header)) = start
        && from < line.len()
    {
        cells.push((header, &line[from.min(line.len())..]));
    }
    cells
}

struct BlockParser<'a, 'l> {
    inline: InlineParser<'a>,
    src: &'a str,
    pos: usize,
    listener: &'l mut dyn Listener,
    /// Whether a top-level block was emitted yet.
    emitted: bool,
    /// `(% %)` parameters waiting for the next block.
    pending_params: Parameters,
}

impl<'a> BlockParser<'a, '_> {
    fn dialect(&self) -> &'a Dialect {
        self.inline.dialect
    }

    /// Current line (without newline) and the position of the next line.
    fn line(&self) -> (&'a str, usize) {
        self.line_at(self.pos)
    }

    fn line_at(&self, pos: usize) -> (&'a str, usize) {
        let rest = &self.src[pos..];
        match rest.find('\n') {
            Some(i) => (&rest[..i], pos + i + 1),
            None => (rest, self.src.len()),
        }
    }

    fn take_params(&mut self) -> Parameters {
        self.emitted = true;
        std::mem::take(&mut self.pending_params)
    }

    /// Open `tag`, consuming pending block parameters.
    fn start(&mut self, tag: Tag<'_>) {
        let params = self.take_params();
        self.listener.event(Event::Start(tag, &params));
    }

    fn end(&mut self, tag: Tag<'_>) {
        self.listener.event(Event::End(tag));
    }

    fn emit_inline(&mut self, blocks: &[Block]) {
        for block in blocks {
            block.traverse(&mut *self.listener);
        }
    }

    /// `tag` wrapping the inline content of `text`.
    fn inline_block(&mut self, tag: Tag<'_>, text: &str) {
        let children = self.inline.parse(text);
        self.start(tag);
        self.emit_inline(&children);
        self.end(tag);
    }

    fn run(&mut self) {
        let mut blank = 0usize;
        while self.pos < self.src.len() {
            let (line, next) = self.line();
            if line.trim().is_empty() {
                blank += 1;
                self.pos = next;
                continue;
            }
            let extra = if self.emitted {
                blank.saturating_sub(1)
            } else {
                blank
            };
            if extra > 0 {
                self.emitted = true;
                self.listener.event(Event::EmptyLines(extra));
            }
            blank = 0;
            self.parse_block();
        }
    }

    fn parse_block(&mut self) {
        let (line, next) = self.line();
        let trimmed = line.trim();
        let dialect = self.dialect();

        if dialect.block_params
            && let Some(inner) = trimmed.strip_prefix("(%")
            && let Some(close) = inner.find("%)")
        {
            self.pending_params.extend(parse_params(&inner[..close]));
            let leading = line.len() - line.trim_start().len();
            let after = self.pos + leading + 2 + close + 2;
            let rest_blank = self.src[after..next.min(self.src.len())].trim().is_empty();
            self.pos = if rest_blank { next } else { after };
            return;
        }

        if let Some((level, content)) = heading(trimmed) {
            self.pos = next;
            self.inline_block(Tag::Heading(level), content);
            return;
        }

        if is_horizontal_line(trimmed) {
            self.pos = next;
            let params = self.take_params();
            self.listener.event(Event::HorizontalLine(&params));
            return;
        }

        if dialect.groups && trimmed == "(((" && self.group(next) {
            return;
        }

        if let Some((text, end)) = self.standalone_verbatim() {
            self.pos = end;
            let params = self.take_params();
            self.listener.event(Event::Verbatim {
                text,
                inline: false,
                params: &params,
            });
            return;
        }

        if dialect.macros
            && let Some((call, end)) = self.standalone_macro()
        {
            self.pos = end;
            // Macro calls carry no block parameters.
            self.take_params();
            self.listener.event(Event::Macro(&call));
            return;
        }

        if LIST_RE
            .captures(line)
            .is_some_and(|caps| list_marker(dialect, &caps[1]).is_some())
        {
            self.list();
            return;
        }

        if dialect.definition_lists && (trimmed.starts_with(';') || trimmed.starts_with(':')) {
            self.definition_list();
            return;
        }

        if trimmed.starts_with('|') {
            self.table();
            return;
        }

        if dialect.quotations && trimmed.starts_with('>') {
            self.quotation();
            return;
        }

        self.paragraph();
    }

    /// `(((` ... `)))` group; `next` is the position after the opening line.
    fn group(&mut self, next: usize) -> bool {
        let src = self.src;
        let mut depth = 1usize;
        let mut pos = next;
        while pos < src.len() {
            let (line, after) = self.line_at(pos);
            match line.trim() {
                "(((" => depth += 1,
                ")))" => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos = after;
                        self.start(Tag::Group);
                        emit_blocks(
                            self.dialect(),
                            self.inline.context,
                            &src[next..pos],
                            &mut *self.listener,
                        );
                        self.end(Tag::Group);
                        return true;
                    }
                }
                _ => {}
            }
            pos = after;
        }
        false
    }

    /// `{{{...}}}` alone on its lines: the text and the position after it.
    fn standalone_verbatim(&self) -> Option<(&'a str, usize)> {
        let src = self.src;
        let body = src[self.pos..].strip_prefix("{{{")?;
        let close = body.find("}}}")?;
        let end = self.pos + 3 + close + 3;
        let (tail, next) = self.line_at(end);
        if !tail.trim().is_empty() {
            return None;
        }
        let text = &body[..close];
        let text = text.strip_prefix('\n').unwrap_or(text);
        let text = text.strip_suffix('\n').unwrap_or(text);
        Some((text, next))
    }

    fn standalone_macro(&self) -> Option<(MacroCall, usize)> {
        let (call, len) = parse_macro(&self.src[self.pos..])?;
        let (tail, next) = self.line_at(self.pos + len);
        if !tail.trim().is_empty() {
            return None;
        }
        Some((call, next))
    }

    /// Whether the line at `pos` starts a block that ends a paragraph.
    fn starts_block(&self, pos: usize) -> bool {
        let (line, _) = self.line_at(pos);
        let trimmed = line.trim();
        let dialect = self.dialect();
        trimmed.is_empty()
            || heading(trimmed).is_some()
            || is_horizontal_line(trimmed)
            || LIST_RE
                .captures(line)
                .is_some_and(|caps| list_marker(dialect, &caps[1]).is_some())
            || trimmed.starts_with('|')
            || (dialect.quotations && trimmed.starts_with('>'))
            || (dialect.definition_lists && (trimmed.starts_with(';') || trimmed.starts_with(':')))
            || (dialect.groups && trimmed == "(((")
            || (dialect.block_params && trimmed.starts_with("(%"))
            || (self.src[pos..].starts_with("{{{") && {
                let body = &self.src[pos + 3..];
                body.find("}}}").is_some_and(|close| {
                    self.line_at(pos + 3 + close + 3).0.trim().is_empty()
                })
            })
            || (dialect.macros
                && parse_macro(&self.src[pos..]).is_some_and(|(_, len)| {
                    self.line_at(pos + len).0.trim().is_empty()
                }))
    }

    fn paragraph(&mut self) {
        let src = self.src;
        let start = self.pos;
        let (first, mut next) = self.line();
        let mut end = (start + first.len()).min(src.len());
        while next < src.len() && !self.starts_block(next) {
            let (line, after) = self.line_at(next);
            end = next + line.len();
            next = after;
        }
        self.pos = next;
        self.inline_block(Tag::Paragraph, &src[start..end]);
    }

    /// Consecutive list lines. Each open list level holds an open item; a
    /// deeper marker nests under the current item, opening intermediate
    /// levels of the same kind, and a kind change ends the list at that
    /// level.
    fn list(&mut self) {
        let dialect = self.dialect();
        let mut open: Vec<ListKind> = Vec::new();
        while self.pos < self.src.len() {
            let (line, next) = self.line();
            let Some(caps) = LIST_RE.captures(line) else {
                break;
            };
            let Some((depth, kind)) = list_marker(dialect, &caps[1]) else {
                break;
            };
            let content = self.inline.parse(line[caps[0].len()..].trim_end());
            self.pos = next;

            while open.len() > depth {
                self.close_list(&mut open);
            }
            if open.len() == depth {
                if open.last() == Some(&kind) {
                    self.end(Tag::ListItem);
                    self.start(Tag::ListItem);
                } else {
                    self.close_list(&mut open);
                }
            }
            while open.len() < depth {
                self.start(Tag::List(kind));
                self.start(Tag::ListItem);
                open.push(kind);
            }
            self.emit_inline(&content);
        }
        while !open.is_empty() {
            self.close_list(&mut open);
        }
    }

    fn close_list(&mut self, open: &mut Vec<ListKind>) {
        if let Some(kind) = open.pop() {
            self.end(Tag::ListItem);
            self.end(Tag::List(kind));
        }
    }

    fn definition_list(&mut self) {
        self.start(Tag::DefinitionList);
        while self.pos < self.src.len() {
            let (line, next) = self.line();
            let trimmed = line.trim();
            let (tag, content) = if let Some(term) = trimmed.strip_prefix(';') {
                (Tag::DefinitionTerm, term)
            } else if let Some(description) = trimmed.strip_prefix(':') {
                (Tag::DefinitionDescription, description)
            } else {
                break;
            };
            self.pos = next;
            self.inline_block(tag, content.trim());
        }
        self.end(Tag::DefinitionList);
    }

    fn table(&mut self) {
        self.start(Tag::Table);
        while self.pos < self.src.len() {
            let (line, next) = self.line();
            if !line.trim().starts_with('|') {
                break;
            }
            self.pos = next;
            self.start(Tag::TableRow);
            for (header, content) in split_cells(line) {
                self.inline_block(Tag::TableCell { header }, content.trim());
            }
            self.end(Tag::TableRow);
        }
        self.end(Tag::Table);
    }

    /// Consecutive `>` lines form one quotation; deeper markers open nested
    /// quotations.
    fn quotation(&mut self) {
        let mut open = 0usize;
        while self.pos < self.src.len() {
            let (line, next) = self.line();
            let trimmed = line.trim_start();
            let depth = trimmed.chars().take_while(|&c| c == '>').count();
            if depth == 0 {
                break;
            }
            self.pos = next;
            while open > depth {
                self.end(Tag::Quotation);
                open -= 1;
            }
            while open < depth {
                self.start(Tag::Quotation);
                open += 1;
            }
            self.inline_block(Tag::QuotationLine, trimmed[depth..].trim());
        }
        for _ in 0..open {
            self.end(Tag::Quotation);
        }
    }
}

/// Heading level and content of a `== title ==` line.
fn heading(trimmed: &str) -> Option<(u8, &str)> {
    let level = trimmed.chars().take_while(|&c| c == '=').count();
    if level == 0 || level > 6 {
        return None;
    }
    let content = trimmed[level..].trim_end_matches('=').trim();
    if content.is_empty() {
        return None;
    }
    Some((u8::try_from(level).ok()?, content))
}

fn is_horizontal_line(trimmed: &str) -> bool {
    trimmed.len() >= 4 && trimmed.chars().all(|c| c == '-')
}

struct InlineParser<'a> {
    dialect: &'a Dialect,
    context: Option<&'a str>,
}

impl InlineParser<'_> {
    fn parse(&self, text: &str) -> Vec<Block> {
        self.parse_until(text, &[]).0
    }

    /// Parse until one of `stops` is found.
    ///
    /// Returns the blocks, the bytes consumed (including the stop marker) and
    /// the index of the stop marker found, if any.
    fn parse_until(&self, text: &str, stops: &[&str]) -> (Vec<Block>, usize, Option<usize>) {
        let mut out = Vec::new();
        let mut plain = String::new();
        let mut i = 0;

        while i < text.len() {
            let rest = &text[i..];

            if let Some(k) = stops.iter().position(|stop| rest.starts_with(stop)) {
                push_text(&plain, &mut out);
                return (out, i + stops[k].len(), Some(k));
            }

            if let Some(escaped) = rest.strip_prefix(ESCAPE) {
                match escaped.chars().next() {
                    Some(c) => {
                        plain.push(c);
                        i += 1 + c.len_utf8();
                    }
                    None => {
                        plain.push(ESCAPE);
                        i += 1;
                    }
                }
                continue;
            }

            let at_boundary = text[..i]
                .chars()
                .next_back()
                .is_none_or(|c| !c.is_alphanumeric());
            if let Some((blocks, len)) = self.construct(rest, stops, at_boundary) {
                push_text(&std::mem::take(&mut plain), &mut out);
                out.extend(blocks);
                i += len;
                continue;
            }

            let c = rest.chars().next().unwrap_or_default();
            plain.push(c);
            i += c.len_utf8().max(1);
        }

        push_text(&plain, &mut out);
        (out, text.len(), None)
    }

    fn construct(&self, rest: &str, stops: &[&str], at_boundary: bool) -> Option<(Vec<Block>, usize)> {
        let dialect = self.dialect;

        if rest.starts_with("\\\\") {
            return Some((vec![Block::new(BlockKind::NewLine)], 2));
        }

        if let Some(body) = rest.strip_prefix("{{{") {
            let close = body.find("}}}")?;
            let block = Block::new(BlockKind::Verbatim {
                text: body[..close].to_owned(),
                inline: true,
            });
            return Some((vec![block], 3 + close + 3));
        }

        if rest.starts_with("{{") {
            if dialect.macros {
                let (mut call, len) = parse_macro(rest)?;
                call.inline = true;
                return Some((vec![Block::new(BlockKind::Macro(call))], len));
            }
            return self.creole_image(rest);
        }

        if rest.starts_with("[[") {
            return self.link(rest);
        }

        if at_boundary {
            if dialect.prefixed_images
                && let Some(target) = rest.strip_prefix("image:")
            {
                let end = target.find(char::is_whitespace).unwrap_or(target.len());
                let reference = dialect
                    .image_resolver
                    .resolve(&target[..end], self.context)
                    .ok()?;
                let block = Block::new(BlockKind::Image {
                    reference,
                    freestanding: true,
                });
                return Some((vec![block], 6 + end));
            }

            if let Some(found) = URL_RE.find(rest) {
                let mut url = found.as_str();
                // An enclosing format marker ends the URL.
                let scheme_end = url.find("://").map_or(0, |p| p + 3);
                for stop in stops {
                    if let Some(p) = url[scheme_end..].find(stop) {
                        url = &url[..scheme_end + p];
                    }
                }
                let url = url.trim_end_matches(['.', ',', ';', ':', '!', '?', ')', '\'', '"']);
                let reference = dialect.link_resolver.resolve(url, self.context).ok()?;
                let block = Block::new(BlockKind::Link {
                    reference,
                    freestanding: true,
                });
                return Some((vec![block], url.len()));
            }
        }

        for &(marker, format) in dialect.formats {
            if !rest.starts_with(marker) || stops.contains(&marker) {
                continue;
            }
            let mut inner_stops = stops.to_vec();
            inner_stops.push(marker);
            let (children, consumed, found) =
                self.parse_until(&rest[marker.len()..], &inner_stops);
            if found == Some(inner_stops.len() - 1) && !children.is_empty() {
                return Some((
                    vec![Block::format(format, children)],
                    marker.len() + consumed,
                ));
            }
            return None;
        }

        None
    }

    fn link(&self, rest: &str) -> Option<(Vec<Block>, usize)> {
        let body = &rest[2..];
        let close = body.find("]]")?;
        let inner = &body[..close];
        let len = 2 + close + 2;
        let dialect = self.dialect;

        let (label, target, params) = match dialect.links {
            LinkStyle::LabelFirst => {
                let (rest, params) = match inner.rfind("||") {
                    Some(i) => (&inner[..i], parse_params(&inner[i + 2..])),
                    None => (inner, Parameters::new()),
                };
                match rest.rfind(">>") {
                    Some(i) => (Some(&rest[..i]), &rest[i + 2..], params),
                    None => (None, rest, params),
                }
            }
            LinkStyle::ReferenceFirst => match inner.split_once('|') {
                Some((target, label)) => (Some(label), target, Parameters::new()),
                None => (None, inner, Parameters::new()),
            },
        };

        if label.is_none()
            && dialect.prefixed_images
            && let Some(image) = target.trim().strip_prefix("image:")
        {
            let reference = dialect.image_resolver.resolve(image, self.context).ok()?;
            let block = Block::new(BlockKind::Image {
                reference,
                freestanding: false,
            })
            .with_params(params);
            return Some((vec![block], len));
        }

        let reference = dialect.link_resolver.resolve(target, self.context).ok()?;
        let children = label.map(|label| self.parse(label)).unwrap_or_default();
        let block = Block::new(BlockKind::Link {
            reference,
            freestanding: false,
        })
        .with_children(children)
        .with_params(params);
        Some((vec![block], len))
    }

    /// `{{reference|alt}}` image.
    fn creole_image(&self, rest: &str) -> Option<(Vec<Block>, usize)> {
        let body = &rest[2..];
        let close = body.find("}}")?;
        let inner = &body[..close];
        let (target, alt) = match inner.split_once('|') {
            Some((target, alt)) => (target, Some(alt.trim())),
            None => (inner, None),
        };
        let reference = self
            .dialect
            .image_resolver
            .resolve(target, self.context)
            .ok()?;
        let mut block = Block::new(BlockKind::Image {
            reference,
            freestanding: false,
        });
        if let Some(alt) = alt {
            block = block.with_param("alt", alt);
        }
        Some((vec![block], 2 + close + 2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_macro_self_closing() {
        let (call, len) = parse_macro(r#"{{toc depth="2"/}} tail"#).unwrap();
        assert_eq!(call.id, "toc");
        assert_eq!(call.params.get("depth").map(String::as_str), Some("2"));
        assert_eq!(call.content, None);
        assert_eq!(len, 18);
    }

    #[test]
    fn test_parse_macro_content_strips_one_newline() {
        let (call, _) = parse_macro("{{code}}\nhello\n{{/code}}").unwrap();
        assert_eq!(call.content.as_deref(), Some("hello"));
    }

    #[test]
    fn test_parse_macro_nested_same_id() {
        let source = "{{box}}a{{box}}b{{/box}}c{{/box}}";
        let (call, len) = parse_macro(source).unwrap();
        assert_eq!(call.content.as_deref(), Some("a{{box}}b{{/box}}c"));
        assert_eq!(len, source.len());
    }

    #[test]
    fn test_parse_macro_skips_other_markers() {
        let (call, _) = parse_macro("{{box}}{{info}}x{{/box}}").unwrap();
        assert_eq!(call.content.as_deref(), Some("{{info}}x"));

        let (call, _) = parse_macro("{{box}}{{box/}}x{{/box}}").unwrap();
        assert_eq!(call.content.as_deref(), Some("{{box/}}x"));
    }

    #[test]
    fn test_parse_macro_many_unclosed_markers() {
        let source = "{{a}}".repeat(1000);
        let (call, len) = parse_macro(&source).unwrap();
        assert_eq!(call.content, None);
        assert_eq!(len, 5);
    }

    #[test]
    fn test_parse_macro_quoted_braces() {
        let (call, _) = parse_macro(r#"{{set value="}}"/}}"#).unwrap();
        assert_eq!(call.params.get("value").map(String::as_str), Some("}}"));
    }

    #[test]
    fn test_parse_macro_unclosed_has_no_content() {
        let (call, len) = parse_macro("{{info}}text").unwrap();
        assert_eq!(call.content, None);
        assert_eq!(len, 8);
    }

    #[test]
    fn test_parse_macro_rejects_non_macro() {
        assert!(parse_macro("{{ x}}").is_none());
        assert!(parse_macro("{{1}}").is_none());
        assert!(parse_macro("{{open").is_none());
    }

    #[test]
    fn test_split_cells() {
        assert_eq!(
            split_cells("|=A|=B"),
            vec![(true, "A"), (true, "B")]
        );
        assert_eq!(
            split_cells("| [[x|y]] | b |"),
            vec![(false, " [[x|y]] "), (false, " b ")]
        );
        assert_eq!(split_cells("|a~|b|c"), vec![(false, "a~|b"), (false, "c")]);
    }
}
