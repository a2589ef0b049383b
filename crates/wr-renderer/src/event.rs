//! Renderer for `event/1.0`: one line per listener event.
//!
//! Useful to inspect what a parser produced, and as a syntax-neutral format
//! in tests. The same events are available as [`EventRecord`]s.

use wr_parser::format_params;
use wr_xdom::{Event, Format, ListKind, Listener, MacroCall, Parameters, Tag, Xdom};

use crate::printer::PrintRenderer;

/// One listener event.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EventRecord {
    /// Event name such as `beginParagraph` or `onWord`.
    pub event: String,
    pub args: Vec<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "std::collections::BTreeMap::is_empty"))]
    pub params: Parameters,
}

impl EventRecord {
    fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            args: Vec::new(),
            params: Parameters::new(),
        }
    }

    fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn params(mut self, params: &Parameters) -> Self {
        self.params.clone_from(params);
        self
    }

    /// `name [arg] [arg] [k=v, k=v]`.
    #[must_use]
    pub fn line(&self) -> String {
        let mut line = self.event.clone();
        for arg in &self.args {
            line.push_str(" [");
            line.push_str(arg);
            line.push(']');
        }
        if !self.params.is_empty() {
            let params: Vec<String> = self
                .params
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect();
            line.push_str(" [");
            line.push_str(&params.join(", "));
            line.push(']');
        }
        line
    }
}

/// Collect the event records of a document.
#[must_use]
pub fn event_records(xdom: &Xdom) -> Vec<EventRecord> {
    let mut renderer = EventRenderer::new();
    xdom.traverse(&mut renderer);
    renderer.records
}

/// Event trace renderer.
///
/// # Example
///
/// ```
/// use wr_parser::{Parser, PlainParser};
/// use wr_renderer::{EventRenderer, PrintRenderer};
///
/// let xdom = PlainParser.parse("Hi!").unwrap();
/// let mut renderer = EventRenderer::new();
/// xdom.traverse(&mut renderer);
/// assert_eq!(
///     Box::new(renderer).finish(),
///     "beginDocument\nbeginParagraph\nonWord [Hi]\nonSpecialSymbol [!]\nendParagraph\nendDocument"
/// );
/// ```
#[derive(Debug, Default)]
pub struct EventRenderer {
    records: Vec<EventRecord>,
}

impl EventRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records collected so far.
    #[must_use]
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    fn push(&mut self, record: EventRecord) {
        self.records.push(record);
    }
}

fn list_name(kind: ListKind) -> &'static str {
    match kind {
        ListKind::Bulleted => "BULLETED",
        ListKind::Numbered => "NUMBERED",
    }
}

fn macro_record(name: &str, call: &MacroCall) -> EventRecord {
    let suffix = if call.inline { "Inline" } else { "Standalone" };
    let mut record = EventRecord::new(format!("{name}{suffix}"))
        .arg(call.id.clone())
        .arg(format_params(&call.params));
    if let Some(content) = &call.content {
        record = record.arg(content.clone());
    }
    record
}

/// Record opening or closing a compound construct.
fn tag_record(prefix: &str, tag: Tag<'_>) -> EventRecord {
    let simple = |name: &str| EventRecord::new(format!("{prefix}{name}"));
    match tag {
        Tag::Document => simple("Document"),
        Tag::Paragraph => simple("Paragraph"),
        Tag::Heading(level) => simple("Heading").arg(level.to_string()),
        Tag::List(kind) => simple("List").arg(list_name(kind)),
        Tag::ListItem => simple("ListItem"),
        Tag::DefinitionList => simple("DefinitionList"),
        Tag::DefinitionTerm => simple("DefinitionTerm"),
        Tag::DefinitionDescription => simple("DefinitionDescription"),
        Tag::Quotation => simple("Quotation"),
        Tag::QuotationLine => simple("QuotationLine"),
        Tag::Table => simple("Table"),
        Tag::TableRow => simple("TableRow"),
        Tag::TableCell { header: true } => simple("TableHeadCell"),
        Tag::TableCell { header: false } => simple("TableCell"),
        Tag::Format(format) => simple("Format").arg(Format::as_str(format)),
        Tag::Link {
            reference,
            freestanding,
        } => simple("Link")
            .arg(reference.kind().as_str())
            .arg(reference.reference())
            .arg(freestanding.to_string()),
        Tag::MacroMarker(call) => macro_record(&format!("{prefix}MacroMarker"), call),
        Tag::Group => simple("Group"),
    }
}

impl Listener for EventRenderer {
    fn event(&mut self, event: Event<'_>) {
        let record = match event {
            Event::Start(tag, params) => tag_record("begin", tag).params(params),
            Event::End(tag) => tag_record("end", tag),
            Event::Word(word) => EventRecord::new("onWord").arg(word),
            Event::Space => EventRecord::new("onSpace"),
            Event::SpecialSymbol(symbol) => EventRecord::new("onSpecialSymbol").arg(symbol),
            Event::NewLine => EventRecord::new("onNewLine"),
            Event::EmptyLines(count) => EventRecord::new("onEmptyLines").arg(count.to_string()),
            Event::HorizontalLine(params) => EventRecord::new("onHorizontalLine").params(params),
            Event::Image {
                reference,
                freestanding,
                params,
            } => EventRecord::new("onImage")
                .arg(reference.kind().as_str())
                .arg(reference.reference())
                .arg(freestanding.to_string())
                .params(params),
            Event::Verbatim {
                text,
                inline,
                params,
            } => {
                let name = if inline {
                    "onVerbatimInline"
                } else {
                    "onVerbatimStandalone"
                };
                EventRecord::new(name).arg(text).params(params)
            }
            Event::Raw { text, syntax } => EventRecord::new("onRawText")
                .arg(text)
                .arg(syntax.id()),
            Event::Macro(call) => macro_record("onMacro", call),
            Event::Id(name) => EventRecord::new("onId").arg(name),
            Event::Error {
                message,
                description,
                inline,
            } => {
                let name = if inline {
                    "onErrorInline"
                } else {
                    "onErrorStandalone"
                };
                EventRecord::new(name).arg(message).arg(description)
            }
        };
        self.push(record);
    }
}

impl PrintRenderer for EventRenderer {
    fn finish(self: Box<Self>) -> String {
        self.records
            .iter()
            .map(EventRecord::line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
