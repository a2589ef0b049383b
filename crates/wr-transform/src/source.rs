//! Access to the content of other documents.
//!
//! Inclusion macros fetch documents through a [`DocumentSource`]. The call is
//! synchronous; a source backed by slow storage blocks the transformation.

use std::collections::HashMap;

use wr_xdom::Syntax;

/// Raw content of a document and the syntax it is written in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub content: String,
    pub syntax: Syntax,
}

impl SourceDocument {
    pub fn new(content: impl Into<String>, syntax: Syntax) -> Self {
        Self {
            content: content.into(),
            syntax,
        }
    }
}

/// Semantic error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SourceErrorKind {
    /// Document does not exist.
    NotFound,
    /// Document exists but may not be viewed.
    Forbidden,
    /// Reference cannot name a document.
    InvalidReference,
    /// Backend failed or is unreachable.
    Unavailable,
}

/// Document source error.
#[derive(Debug)]
pub struct SourceError {
    pub kind: SourceErrorKind,
    /// Reference of the requested document.
    pub reference: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SourceError {
    #[must_use]
    pub fn new(kind: SourceErrorKind, reference: impl Into<String>) -> Self {
        Self {
            kind,
            reference: reference.into(),
            source: None,
        }
    }

    /// Attach the underlying error source.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    #[must_use]
    pub fn not_found(reference: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::NotFound, reference)
    }

    /// Map an I/O error while reading `reference`.
    #[must_use]
    pub fn io(err: std::io::Error, reference: impl Into<String>) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => SourceErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => SourceErrorKind::Forbidden,
            _ => SourceErrorKind::Unavailable,
        };
        Self::new(kind, reference).with_source(err)
    }

    /// Whether the failure is an infrastructure failure rather than a bad
    /// reference.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.kind == SourceErrorKind::Unavailable
    }
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            SourceErrorKind::NotFound => "Document not found",
            SourceErrorKind::Forbidden => "Document not viewable",
            SourceErrorKind::InvalidReference => "Invalid document reference",
            SourceErrorKind::Unavailable => "Document source unavailable",
        };
        write!(f, "{kind} [{}]", self.reference)?;
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Read access to documents by reference.
pub trait DocumentSource: Send + Sync {
    /// Fetch the document named by `reference`.
    fn get(&self, reference: &str) -> Result<SourceDocument, SourceError>;

    fn exists(&self, reference: &str) -> bool {
        self.get(reference).is_ok()
    }
}

/// In-memory document source.
///
/// # Example
///
/// ```
/// use wr_transform::{DocumentSource, MemorySource};
/// use wr_xdom::Syntax;
///
/// let source = MemorySource::new().with_document("Main.Home", "Hello", Syntax::XWIKI_2_0);
/// assert_eq!(source.get("Main.Home").unwrap().content, "Hello");
/// assert!(!source.exists("Main.Missing"));
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    documents: HashMap<String, SourceDocument>,
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document.
    #[must_use]
    pub fn with_document(
        mut self,
        reference: impl Into<String>,
        content: impl Into<String>,
        syntax: Syntax,
    ) -> Self {
        self.documents
            .insert(reference.into(), SourceDocument::new(content, syntax));
        self
    }
}

impl DocumentSource for MemorySource {
    fn get(&self, reference: &str) -> Result<SourceDocument, SourceError> {
        self.documents
            .get(reference)
            .cloned()
            .ok_or_else(|| SourceError::not_found(reference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_source_missing_document() {
        let err = MemorySource::new().get("Nope").unwrap_err();
        assert_eq!(err.kind, SourceErrorKind::NotFound);
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "Document not found [Nope]");
    }

    #[test]
    fn test_io_error_mapping() {
        let err = SourceError::io(std::io::Error::other("disk on fire"), "a.txt");
        assert_eq!(err.kind, SourceErrorKind::Unavailable);
        assert!(err.is_fatal());
        assert!(err.to_string().contains("disk on fire"));
    }
}
