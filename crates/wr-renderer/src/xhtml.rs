//! Renderer for `xhtml/1.0`.
//!
//! Links, images and macro output are bracketed by comments
//! (`startwikilink:`, `startimage:`, `startmacro:`) that let the XHTML parser
//! restore the original references and macro calls.

use std::collections::BTreeMap;
use std::fmt::Write;

use wr_parser::{encode_comment_fields, format_params};
use wr_xdom::{
    Event, Format, ListKind, Listener, MacroCall, Parameters, ResourceReference, ResourceType,
    Syntax, Tag,
};

use crate::printer::{HeadingIds, PrintRenderer, escape_html};
use crate::wiki_model::WikiModel;

/// XHTML renderer.
///
/// # Example
///
/// ```
/// use wr_parser::{Parser, XWikiParser};
/// use wr_renderer::{DefaultWikiModel, PrintRenderer, XhtmlRenderer};
///
/// let xdom = XWikiParser.parse("= Title =\n\nSome **bold** text.").unwrap();
/// let wiki = DefaultWikiModel::new();
/// let mut renderer = XhtmlRenderer::new(&wiki);
/// xdom.traverse(&mut renderer);
/// assert_eq!(
///     Box::new(renderer).finish(),
///     r#"<h1 id="Htitle"><span>Title</span></h1><p>Some <strong>bold</strong> text.</p>"#
/// );
/// ```
pub struct XhtmlRenderer<'a> {
    wiki: &'a dyn WikiModel,
    out: String,
    ids: HeadingIds,
    headings: Vec<Heading>,
    links: Vec<usize>,
    /// For each open quotation, whether the last child was a line.
    quotations: Vec<bool>,
    inline_depth: usize,
}

struct Heading {
    start: usize,
    level: u8,
    params: Parameters,
    text: String,
}

impl<'a> XhtmlRenderer<'a> {
    #[must_use]
    pub fn new(wiki: &'a dyn WikiModel) -> Self {
        Self {
            wiki,
            out: String::new(),
            ids: HeadingIds::default(),
            headings: Vec::new(),
            links: Vec::new(),
            quotations: Vec::new(),
            inline_depth: 0,
        }
    }

    fn text(&mut self, text: &str) {
        for heading in &mut self.headings {
            heading.text.push_str(text);
        }
        self.out.push_str(&escape_html(text));
    }

    fn open(&mut self, name: &str, params: &Parameters) {
        write!(self.out, "<{name}{}>", attributes(params)).unwrap();
    }

    fn close(&mut self, name: &str) {
        write!(self.out, "</{name}>").unwrap();
    }

    fn start(&mut self, tag: Tag<'_>, params: &Parameters) {
        match tag {
            Tag::Document => {}
            Tag::Paragraph => {
                self.inline_depth += 1;
                self.open("p", params);
            }
            Tag::Heading(level) => {
                self.inline_depth += 1;
                self.headings.push(Heading {
                    start: self.out.len(),
                    level,
                    params: params.clone(),
                    text: String::new(),
                });
            }
            Tag::List(kind) => self.open(list_element(kind), params),
            Tag::ListItem => self.open("li", params),
            Tag::DefinitionList => self.open("dl", params),
            Tag::DefinitionTerm => {
                self.inline_depth += 1;
                self.open("dt", params);
            }
            Tag::DefinitionDescription => self.open("dd", params),
            Tag::Quotation => {
                if let Some(last_was_line) = self.quotations.last_mut() {
                    *last_was_line = false;
                }
                self.quotations.push(false);
                self.open("blockquote", params);
            }
            Tag::QuotationLine => {
                self.inline_depth += 1;
                if let Some(last_was_line) = self.quotations.last_mut() {
                    if *last_was_line {
                        self.out.push_str("<br/>");
                    }
                    *last_was_line = true;
                }
            }
            Tag::Table => self.open("table", params),
            Tag::TableRow => self.open("tr", params),
            Tag::TableCell { header } => self.open(if header { "th" } else { "td" }, params),
            Tag::Format(format) => {
                self.inline_depth += 1;
                self.open(format_element(format), params);
            }
            Tag::Link {
                reference,
                freestanding,
            } => {
                self.inline_depth += 1;
                self.start_link(reference, freestanding, params);
            }
            Tag::MacroMarker(call) => self.start_marker(call),
            Tag::Group => {
                let name = if self.inline_depth > 0 { "span" } else { "div" };
                self.open(name, params);
            }
        }
    }

    fn end(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Document => {}
            Tag::Paragraph => {
                self.inline_depth -= 1;
                self.close("p");
            }
            Tag::Heading(_) => {
                self.inline_depth -= 1;
                self.end_heading();
            }
            Tag::List(kind) => self.close(list_element(kind)),
            Tag::ListItem => self.close("li"),
            Tag::DefinitionList => self.close("dl"),
            Tag::DefinitionTerm => {
                self.inline_depth -= 1;
                self.close("dt");
            }
            Tag::DefinitionDescription => self.close("dd"),
            Tag::Quotation => {
                self.quotations.pop();
                self.close("blockquote");
            }
            Tag::QuotationLine => self.inline_depth -= 1,
            Tag::Table => self.close("table"),
            Tag::TableRow => self.close("tr"),
            Tag::TableCell { header } => self.close(if header { "th" } else { "td" }),
            Tag::Format(format) => {
                self.inline_depth -= 1;
                self.close(format_element(format));
            }
            Tag::Link { reference, .. } => {
                self.inline_depth -= 1;
                self.end_link(reference);
            }
            Tag::MacroMarker(_) => self.out.push_str("<!--stopmacro-->"),
            Tag::Group => {
                let name = if self.inline_depth > 0 { "span" } else { "div" };
                self.close(name);
            }
        }
    }

    fn end_heading(&mut self) {
        let Some(heading) = self.headings.pop() else {
            return;
        };
        let mut params = heading.params;
        let id = match params.remove("id") {
            Some(id) => id,
            None => self.ids.next(&heading.text),
        };
        let open = format!(
            r#"<h{level} id="{id}"{attrs}><span>"#,
            level = heading.level,
            id = escape_html(&id),
            attrs = attributes(&params),
        );
        self.out.insert_str(heading.start, &open);
        write!(self.out, "</span></h{}>", heading.level).unwrap();
    }

    fn start_link(&mut self, reference: &ResourceReference, freestanding: bool, params: &Parameters) {
        let (class, href) = self.link_target(reference);
        let mut attrs = params.clone();
        if freestanding {
            add_class(&mut attrs, "wikimodel-freestanding");
        }
        write!(
            self.out,
            r#"<!--startwikilink:{}--><span class="{class}"><a href="{}"{}>"#,
            encode_comment_fields(&[reference.raw()]),
            escape_html(&href),
            attributes(&attrs),
        )
        .unwrap();
        self.links.push(self.out.len());
    }

    fn end_link(&mut self, reference: &ResourceReference) {
        if self.links.pop() == Some(self.out.len()) {
            write!(
                self.out,
                r#"<span class="wikigeneratedlinkcontent">{}</span>"#,
                escape_html(generated_label(reference))
            )
            .unwrap();
        }
        self.out.push_str("</a></span><!--stopwikilink-->");
    }

    /// CSS class of the link wrapper and the link URL.
    fn link_target(&self, reference: &ResourceReference) -> (&'static str, String) {
        let target = reference.reference();
        match reference.kind() {
            ResourceType::Document => {
                if target.is_empty() {
                    let anchor = reference.anchor().unwrap_or_default();
                    return ("wikilink", format!("#{anchor}"));
                }
                let (anchor, query) = (reference.anchor(), reference.query_string());
                if self.wiki.document_exists(target) {
                    ("wikilink", self.wiki.view_url(target, anchor, query))
                } else {
                    ("wikicreatelink", self.wiki.edit_url(target, anchor, query))
                }
            }
            ResourceType::Attachment => ("wikiattachmentlink", self.wiki.attachment_url(reference)),
            ResourceType::Mailto => ("wikiexternallink", format!("mailto:{target}")),
            ResourceType::Unc => (
                "wikiexternallink",
                format!("file:////{}", target.replace('\\', "/")),
            ),
            ResourceType::Interwiki => {
                let alias = reference.interwiki_alias().unwrap_or_default();
                let mut url = self
                    .wiki
                    .interwiki_url(alias, target)
                    .unwrap_or_else(|| format!("interwiki:{alias}:{target}"));
                if let Some(query) = reference.query_string() {
                    url.push('?');
                    url.push_str(query);
                }
                if let Some(anchor) = reference.anchor() {
                    url.push('#');
                    url.push_str(anchor);
                }
                ("wikiexternallink", url)
            }
            ResourceType::Url => ("wikiexternallink", target.to_owned()),
        }
    }

    fn start_marker(&mut self, call: &MacroCall) {
        let params = format_params(&call.params);
        let mut fields = vec![call.id.as_str(), params.as_str()];
        if let Some(content) = &call.content {
            fields.push(content);
        }
        write!(self.out, "<!--startmacro:{}-->", encode_comment_fields(&fields)).unwrap();
    }

    fn image(&mut self, reference: &ResourceReference, freestanding: bool, params: &Parameters) {
        let src = self.wiki.image_url(reference, params);
        let mut attrs: BTreeMap<String, String> = params.clone();
        attrs
            .entry("alt".to_owned())
            .or_insert_with(|| reference.reference().to_owned());
        if freestanding {
            add_class(&mut attrs, "wikimodel-freestanding");
        }
        write!(
            self.out,
            r#"<!--startimage:{}--><img src="{}"{}/><!--stopimage-->"#,
            encode_comment_fields(&[reference.raw()]),
            escape_html(&src),
            attributes(&attrs),
        )
        .unwrap();
    }

    fn verbatim(&mut self, text: &str, inline: bool, params: &Parameters) {
        if inline {
            let mut attrs = params.clone();
            add_class(&mut attrs, "wikimodel-verbatim");
            write!(self.out, "<tt{}>{}</tt>", attributes(&attrs), escape_html(text)).unwrap();
        } else {
            write!(self.out, "<pre{}>{}</pre>", attributes(params), escape_html(text)).unwrap();
        }
    }

    fn error(&mut self, message: &str, description: &str, inline: bool) {
        let name = if inline { "span" } else { "div" };
        write!(
            self.out,
            r#"<{name} class="xwikirenderingerror">{}</{name}>"#,
            escape_html(message)
        )
        .unwrap();
        if !description.is_empty() {
            write!(
                self.out,
                r#"<{name} class="xwikirenderingerrordescription hidden">{}</{name}>"#,
                escape_html(description)
            )
            .unwrap();
        }
    }
}

fn list_element(kind: ListKind) -> &'static str {
    match kind {
        ListKind::Bulleted => "ul",
        ListKind::Numbered => "ol",
    }
}

fn format_element(format: Format) -> &'static str {
    match format {
        Format::Bold => "strong",
        Format::Italic => "em",
        Format::Underlined => "ins",
        Format::StrikedOut => "del",
        Format::Superscript => "sup",
        Format::Subscript => "sub",
        Format::Monospace => "tt",
    }
}

/// Label shown for a link written without one.
fn generated_label(reference: &ResourceReference) -> &str {
    match (reference.kind(), reference.reference()) {
        (ResourceType::Document, "") => reference.anchor().unwrap_or_default(),
        (_, target) => target,
    }
}

fn add_class(params: &mut Parameters, class: &str) {
    params
        .entry("class".to_owned())
        .and_modify(|classes| {
            classes.push(' ');
            classes.push_str(class);
        })
        .or_insert_with(|| class.to_owned());
}

/// ` key="value"` attributes in key order.
fn attributes(params: &Parameters) -> String {
    let mut out = String::new();
    for (key, value) in params {
        write!(out, r#" {key}="{}""#, escape_html(value)).unwrap();
    }
    out
}

impl Listener for XhtmlRenderer<'_> {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag, params) => self.start(tag, params),
            Event::End(tag) => self.end(tag),
            Event::Word(word) => self.text(word),
            Event::Space => self.text(" "),
            Event::SpecialSymbol(symbol) => self.text(symbol.encode_utf8(&mut [0; 4])),
            Event::NewLine => self.out.push_str("<br/>"),
            Event::EmptyLines(count) => {
                for _ in 0..count {
                    self.out.push_str(r#"<div class="wikimodel-emptyline"></div>"#);
                }
            }
            Event::HorizontalLine(params) => {
                write!(self.out, "<hr{}/>", attributes(params)).unwrap();
            }
            Event::Image {
                reference,
                freestanding,
                params,
            } => self.image(reference, freestanding, params),
            Event::Verbatim {
                text,
                inline,
                params,
            } => self.verbatim(text, inline, params),
            Event::Raw { text, syntax } => {
                if *syntax == Syntax::XHTML_1_0 {
                    self.out.push_str(text);
                }
            }
            Event::Macro(call) => {
                tracing::trace!(id = %call.id, "Skipping unexpanded macro");
            }
            Event::Id(name) => {
                let name = escape_html(name);
                write!(self.out, r#"<a id="{name}" name="{name}"></a>"#).unwrap();
            }
            Event::Error {
                message,
                description,
                inline,
            } => self.error(message, description, inline),
        }
    }
}

impl PrintRenderer for XhtmlRenderer<'_> {
    fn finish(self: Box<Self>) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wr_parser::{Parser, XWikiParser, XhtmlParser};
    use wr_xdom::{Block, BlockKind, Xdom};

    use crate::DefaultWikiModel;
    use crate::mock::MockWikiModel;

    fn render_with(xdom: &Xdom, wiki: &dyn WikiModel) -> String {
        let mut renderer = XhtmlRenderer::new(wiki);
        xdom.traverse(&mut renderer);
        Box::new(renderer).finish()
    }

    fn render(source: &str) -> String {
        render_with(&XWikiParser.parse(source).unwrap(), &DefaultWikiModel::new())
    }

    #[test]
    fn test_heading_and_paragraph() {
        assert_eq!(
            render("= Title =\n\nSome **bold** text."),
            r#"<h1 id="Htitle"><span>Title</span></h1><p>Some <strong>bold</strong> text.</p>"#
        );
    }

    #[test]
    fn test_duplicate_headings_get_unique_ids() {
        assert_eq!(
            render("== FAQ ==\n\n== FAQ =="),
            r#"<h2 id="Hfaq"><span>FAQ</span></h2><h2 id="Hfaq-1"><span>FAQ</span></h2>"#
        );
    }

    #[test]
    fn test_formats_and_escaping() {
        assert_eq!(
            render("//a// __b__ --c-- ##d## ^^e^^ ,,f,, <g>"),
            "<p><em>a</em> <ins>b</ins> <del>c</del> <tt>d</tt> <sup>e</sup> <sub>f</sub> &lt;g&gt;</p>"
        );
    }

    #[test]
    fn test_lists_tables_and_quotations() {
        assert_eq!(
            render("* a\n** b\n\n|=H|c\n\n> x\n> y\n>> z"),
            "<ul><li>a<ul><li>b</li></ul></li></ul>\
             <table><tr><th>H</th><td>c</td></tr></table>\
             <blockquote>x<br/>y<blockquote>z</blockquote></blockquote>"
        );
    }

    #[test]
    fn test_document_links() {
        let wiki = MockWikiModel::new().with_document("Main.Home");
        let xdom = XWikiParser
            .parse("[[Home>>Main.Home]] [[Main.New#Top]]")
            .unwrap();
        assert_eq!(
            render_with(&xdom, &wiki),
            "<p><!--startwikilink:Main.Home--><span class=\"wikilink\"><a href=\"view:Main.Home\">Home</a></span><!--stopwikilink--> \
             <!--startwikilink:Main.New#Top--><span class=\"wikicreatelink\"><a href=\"edit:Main.New#Top\">\
             <span class=\"wikigeneratedlinkcontent\">Main.New</span></a></span><!--stopwikilink--></p>"
        );
        assert_eq!(wiki.queries(), vec!["Main.Home", "Main.New"]);
    }

    #[test]
    fn test_external_and_freestanding_links() {
        assert_eq!(
            render("See https://example.com and [[mail>>mailto:a@b.c]]"),
            "<p>See <!--startwikilink:https://example.com--><span class=\"wikiexternallink\">\
             <a href=\"https://example.com\" class=\"wikimodel-freestanding\">\
             <span class=\"wikigeneratedlinkcontent\">https://example.com</span></a></span><!--stopwikilink--> \
             and <!--startwikilink:mailto:a@b.c--><span class=\"wikiexternallink\"><a href=\"mailto:a@b.c\">mail</a></span><!--stopwikilink--></p>"
        );
    }

    #[test]
    fn test_interwiki_links_keep_their_alias() {
        let xdom = XWikiParser
            .parse("[[Rust>>Rust_(language)#History@wikipedia]] [[Home@elsewhere]]")
            .unwrap();
        let wiki = DefaultWikiModel::new().with_interwiki("wikipedia", "https://en.wikipedia.org/wiki/");
        assert_eq!(
            render_with(&xdom, &wiki),
            "<p><!--startwikilink:Rust_(language)#History@wikipedia--><span class=\"wikiexternallink\">\
             <a href=\"https://en.wikipedia.org/wiki/Rust_(language)#History\">Rust</a></span><!--stopwikilink--> \
             <!--startwikilink:Home@elsewhere--><span class=\"wikiexternallink\"><a href=\"interwiki:elsewhere:Home\">\
             <span class=\"wikigeneratedlinkcontent\">Home</span></a></span><!--stopwikilink--></p>"
        );
    }

    #[test]
    fn test_image_with_default_alt() {
        let xdom = XWikiParser.parse_with("[[image:cat.png||width=\"10\"]]", Some("Main.Pets")).unwrap();
        assert_eq!(
            render_with(&xdom, &DefaultWikiModel::new()),
            "<p><!--startimage:cat.png--><img src=\"/download/Main/Pets/cat.png\" alt=\"cat.png\" width=\"10\"/><!--stopimage--></p>"
        );
    }

    #[test]
    fn test_verbatim_and_empty_lines() {
        assert_eq!(
            render("{{{**raw**}}}\n\n\n\npara {{{<b>}}}"),
            "<pre>**raw**</pre><div class=\"wikimodel-emptyline\"></div><div class=\"wikimodel-emptyline\"></div>\
             <p>para <tt class=\"wikimodel-verbatim\">&lt;b&gt;</tt></p>"
        );
    }

    #[test]
    fn test_macro_marker_comments() {
        let call = MacroCall::new("info", false)
            .with_param("title", "a-b")
            .with_content("Hi");
        let xdom = Xdom::new(vec![
            Block::new(BlockKind::MacroMarker(call)).with_children(vec![
                Block::group(vec![Block::paragraph(vec![Block::word("Hi")])])
                    .with_param("class", "box infomessage"),
            ]),
        ]);
        assert_eq!(
            render_with(&xdom, &DefaultWikiModel::new()),
            "<!--startmacro:info|-|title=\"a\\-b\"|-|Hi--><div class=\"box infomessage\"><p>Hi</p></div><!--stopmacro-->"
        );
    }

    #[test]
    fn test_inline_group_is_a_span() {
        let xdom = Xdom::new(vec![Block::paragraph(vec![
            Block::group(vec![Block::word("x")]).with_param("class", "box"),
        ])]);
        assert_eq!(
            render_with(&xdom, &DefaultWikiModel::new()),
            r#"<p><span class="box">x</span></p>"#
        );
    }

    #[test]
    fn test_errors_raw_ids_and_unexpanded_macros() {
        let xdom = Xdom::new(vec![
            Block::error("Failed", "why <not>", false),
            Block::paragraph(vec![
                Block::new(BlockKind::Id("top".to_owned())),
                Block::new(BlockKind::Macro(MacroCall::new("toc", true))),
                Block::new(BlockKind::Raw {
                    text: "<b>x</b>".to_owned(),
                    syntax: Syntax::XHTML_1_0,
                }),
            ]),
        ]);
        assert_eq!(
            render_with(&xdom, &DefaultWikiModel::new()),
            "<div class=\"xwikirenderingerror\">Failed</div>\
             <div class=\"xwikirenderingerrordescription hidden\">why &lt;not&gt;</div>\
             <p><a id=\"top\" name=\"top\"></a><b>x</b></p>"
        );
    }

    #[test]
    fn test_output_parses_back() {
        let source = "= T =\n\n* a\n* [[Main.Page]]\n\n|=h|[[image:x.png]]\n\n> q";
        let xdom = XWikiParser.parse(source).unwrap();
        let html = render_with(&xdom, &DefaultWikiModel::new());
        assert_eq!(XhtmlParser.parse(&html).unwrap(), xdom);
    }
}
