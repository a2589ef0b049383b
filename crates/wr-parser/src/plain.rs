//! Parser for `plain/1.0`: text is never interpreted.

use wr_xdom::{Event, Listener, Parameters, Syntax, Tag};

use crate::text::emit_text;
use crate::{ParseError, Parser};

/// Parser that turns runs of non-blank lines into paragraphs.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainParser;

impl Parser for PlainParser {
    fn syntax(&self) -> Syntax {
        Syntax::PLAIN_1_0
    }

    fn parse_events(
        &self,
        source: &str,
        _document: Option<&str>,
        listener: &mut dyn Listener,
    ) -> Result<(), ParseError> {
        let source = source.replace("\r\n", "\n");
        let none = Parameters::new();
        let mut lines: Vec<&str> = Vec::new();
        let mut blank = 0usize;
        let mut emitted = false;

        listener.event(Event::Start(Tag::Document, &none));
        for line in source.split('\n') {
            if line.trim().is_empty() {
                if !lines.is_empty() {
                    paragraph(&lines, listener);
                    lines.clear();
                }
                blank += 1;
                continue;
            }
            if lines.is_empty() {
                let extra = if emitted {
                    blank.saturating_sub(1)
                } else {
                    blank
                };
                if extra > 0 {
                    listener.event(Event::EmptyLines(extra));
                }
                blank = 0;
                emitted = true;
            }
            lines.push(line);
        }
        if !lines.is_empty() {
            paragraph(&lines, listener);
        }
        listener.event(Event::End(Tag::Document));
        Ok(())
    }
}

fn paragraph(lines: &[&str], listener: &mut dyn Listener) {
    listener.event(Event::Start(Tag::Paragraph, &Parameters::new()));
    emit_text(&lines.join("\n"), listener);
    listener.event(Event::End(Tag::Paragraph));
}
