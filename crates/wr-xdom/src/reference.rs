//! Resource references targeted by links and images.

use std::fmt;

/// Kind of resource a reference points to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ResourceType {
    /// Another wiki document.
    Document,
    /// Attachment of a wiki document.
    Attachment,
    /// External URL.
    Url,
    /// E-mail address.
    Mailto,
    /// Document in another wiki, addressed through an alias.
    Interwiki,
    /// Windows network share path.
    Unc,
}

impl ResourceType {
    /// Lowercase name used in event traces.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Document => "doc",
            Self::Attachment => "attach",
            Self::Url => "url",
            Self::Mailto => "mailto",
            Self::Interwiki => "interwiki",
            Self::Unc => "unc",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable reference to a linked or embedded resource.
///
/// Built by the resolvers in the parser crate. `raw` keeps the text as typed in
/// the source so wiki renderers can reproduce it verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ResourceReference {
    raw: String,
    kind: ResourceType,
    reference: String,
    anchor: Option<String>,
    query_string: Option<String>,
    interwiki_alias: Option<String>,
    document: Option<String>,
}

impl ResourceReference {
    /// Create a reference of the given kind.
    ///
    /// `raw` defaults to `reference` until overridden with [`with_raw`](Self::with_raw).
    #[must_use]
    pub fn new(kind: ResourceType, reference: impl Into<String>) -> Self {
        let reference = reference.into();
        Self {
            raw: reference.clone(),
            kind,
            reference,
            anchor: None,
            query_string: None,
            interwiki_alias: None,
            document: None,
        }
    }

    /// Shorthand for a document reference.
    #[must_use]
    pub fn document(reference: impl Into<String>) -> Self {
        Self::new(ResourceType::Document, reference)
    }

    /// Shorthand for a URL reference.
    #[must_use]
    pub fn url(reference: impl Into<String>) -> Self {
        Self::new(ResourceType::Url, reference)
    }

    /// Set the source text the reference was written as.
    #[must_use]
    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = raw.into();
        self
    }

    /// Set the anchor (`#anchor`).
    #[must_use]
    pub fn with_anchor(mut self, anchor: impl Into<String>) -> Self {
        self.anchor = Some(anchor.into());
        self
    }

    /// Set the query string (`?a=b`).
    #[must_use]
    pub fn with_query_string(mut self, query_string: impl Into<String>) -> Self {
        self.query_string = Some(query_string.into());
        self
    }

    /// Set the interwiki alias (`@alias`).
    #[must_use]
    pub fn with_interwiki_alias(mut self, alias: impl Into<String>) -> Self {
        self.interwiki_alias = Some(alias.into());
        self
    }

    /// Set the owning document of an attachment.
    #[must_use]
    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.document = Some(document.into());
        self
    }

    /// Source text of the reference.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Resource kind.
    #[must_use]
    pub fn kind(&self) -> ResourceType {
        self.kind
    }

    /// Target without anchor, query string or alias.
    #[must_use]
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Anchor inside the target.
    #[must_use]
    pub fn anchor(&self) -> Option<&str> {
        self.anchor.as_deref()
    }

    /// Query string for the target.
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.query_string.as_deref()
    }

    /// Interwiki alias.
    #[must_use]
    pub fn interwiki_alias(&self) -> Option<&str> {
        self.interwiki_alias.as_deref()
    }

    /// Document owning an attachment, when known.
    #[must_use]
    pub fn owner_document(&self) -> Option<&str> {
        self.document.as_deref()
    }

    /// Whether the reference is an external (non-wiki) target.
    #[must_use]
    pub fn is_external(&self) -> bool {
        matches!(
            self.kind,
            ResourceType::Url | ResourceType::Mailto | ResourceType::Unc
        )
    }
}

impl fmt::Display for ResourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
