//! Wiki model for tests.

use std::collections::HashSet;
use std::sync::RwLock;

use wr_xdom::{Parameters, ResourceReference};

use crate::wiki_model::WikiModel;

/// In-memory wiki model with predictable URLs.
///
/// Only documents added with [`with_document`](Self::with_document) exist.
/// Every existence query is recorded.
///
/// # Example
///
/// ```
/// use wr_renderer::{MockWikiModel, WikiModel};
///
/// let model = MockWikiModel::new().with_document("Main.Home");
/// assert!(model.document_exists("Main.Home"));
/// assert!(!model.document_exists("Main.Missing"));
/// assert_eq!(model.queries(), vec!["Main.Home", "Main.Missing"]);
/// ```
#[derive(Debug, Default)]
pub struct MockWikiModel {
    documents: HashSet<String>,
    queries: RwLock<Vec<String>>,
}

impl MockWikiModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.documents.insert(document.into());
        self
    }

    /// Documents asked about, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn queries(&self) -> Vec<String> {
        self.queries.read().unwrap().clone()
    }
}

fn suffix(anchor: Option<&str>, query: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(query) = query {
        out.push('?');
        out.push_str(query);
    }
    if let Some(anchor) = anchor {
        out.push('#');
        out.push_str(anchor);
    }
    out
}

impl WikiModel for MockWikiModel {
    fn document_exists(&self, document: &str) -> bool {
        self.queries.write().unwrap().push(document.to_owned());
        self.documents.contains(document)
    }

    fn view_url(&self, document: &str, anchor: Option<&str>, query: Option<&str>) -> String {
        format!("view:{document}{}", suffix(anchor, query))
    }

    fn edit_url(&self, document: &str, anchor: Option<&str>, query: Option<&str>) -> String {
        format!("edit:{document}{}", suffix(anchor, query))
    }

    fn attachment_url(&self, attachment: &ResourceReference) -> String {
        match attachment.owner_document() {
            Some(document) => format!("attach:{document}@{}", attachment.reference()),
            None => format!("attach:{}", attachment.reference()),
        }
    }

    fn image_url(&self, image: &ResourceReference, _params: &Parameters) -> String {
        if image.is_external() {
            return image.reference().to_owned();
        }
        self.attachment_url(image)
    }
}
