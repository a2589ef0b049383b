//! Bridge to the wiki hosting the rendered documents.
//!
//! Renderers ask the [`WikiModel`] whether linked documents exist and which
//! URLs to emit for documents, attachments and images.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use wr_xdom::{Parameters, ResourceReference};

/// Characters escaped in URL path segments.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// URL and existence lookups used while rendering.
pub trait WikiModel: Send + Sync {
    /// Whether `document` exists; missing documents get "create" links.
    fn document_exists(&self, document: &str) -> bool;

    fn view_url(&self, document: &str, anchor: Option<&str>, query: Option<&str>) -> String;

    fn edit_url(&self, document: &str, anchor: Option<&str>, query: Option<&str>) -> String;

    fn attachment_url(&self, attachment: &ResourceReference) -> String;

    /// URL of an embedded image; `params` are the image parameters
    /// (`width`, `height`, ...).
    fn image_url(&self, image: &ResourceReference, params: &Parameters) -> String;

    /// URL of `page` on the wiki known as `alias`, `None` when the alias is
    /// not defined.
    fn interwiki_url(&self, _alias: &str, _page: &str) -> Option<String> {
        None
    }
}

/// Wiki model producing relative `/view`, `/edit` and `/download` URLs under
/// a base URL. Every document is considered to exist.
///
/// # Example
///
/// ```
/// use wr_renderer::{DefaultWikiModel, WikiModel};
///
/// let model = DefaultWikiModel::new().with_base_url("/wiki");
/// assert_eq!(model.view_url("Main.Home", Some("Intro"), None), "/wiki/view/Main/Home#Intro");
///
/// let model = model.with_interwiki("wikipedia", "https://en.wikipedia.org/wiki/");
/// assert_eq!(
///     model.interwiki_url("wikipedia", "Rust (language)").as_deref(),
///     Some("https://en.wikipedia.org/wiki/Rust%20(language)")
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct DefaultWikiModel {
    base_url: String,
    interwiki: BTreeMap<String, String>,
}

impl DefaultWikiModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix for every generated URL (trailing slash ignored).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    /// Define the interwiki `alias`; its pages are linked as `prefix`
    /// followed by the encoded page name. Aliases are case-insensitive.
    #[must_use]
    pub fn with_interwiki(mut self, alias: &str, prefix: impl Into<String>) -> Self {
        self.interwiki.insert(alias.to_ascii_lowercase(), prefix.into());
        self
    }

    fn url(&self, action: &str, document: &str, anchor: Option<&str>, query: Option<&str>) -> String {
        let mut url = format!("{}/{action}/{}", self.base_url, document_path(document));
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }
        if let Some(anchor) = anchor.filter(|a| !a.is_empty()) {
            url.push('#');
            url.push_str(anchor);
        }
        url
    }
}

/// `Space.Page` as `Space/Page`, each segment percent-encoded.
fn document_path(document: &str) -> String {
    document
        .split('.')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

impl WikiModel for DefaultWikiModel {
    fn document_exists(&self, _document: &str) -> bool {
        true
    }

    fn view_url(&self, document: &str, anchor: Option<&str>, query: Option<&str>) -> String {
        self.url("view", document, anchor, query)
    }

    fn edit_url(&self, document: &str, anchor: Option<&str>, query: Option<&str>) -> String {
        self.url("edit", document, anchor, query)
    }

    fn attachment_url(&self, attachment: &ResourceReference) -> String {
        let file = utf8_percent_encode(attachment.reference(), SEGMENT);
        match attachment.owner_document() {
            Some(document) => format!(
                "{}/download/{}/{file}",
                self.base_url,
                document_path(document)
            ),
            None => format!("{}/download/{file}", self.base_url),
        }
    }

    fn image_url(&self, image: &ResourceReference, _params: &Parameters) -> String {
        if image.is_external() {
            return image.reference().to_owned();
        }
        self.attachment_url(image)
    }

    fn interwiki_url(&self, alias: &str, page: &str) -> Option<String> {
        let prefix = self.interwiki.get(&alias.to_ascii_lowercase())?;
        Some(format!("{prefix}{}", utf8_percent_encode(page, SEGMENT)))
    }
}
