//! Reference resolvers.
//!
//! Turn the raw target text of a link or image into a [`ResourceReference`].
//! Resolvers are pure: they never check whether the target exists.

use wr_xdom::{ResourceReference, ResourceType};

/// Raw reference text cannot be turned into a reference.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid reference '{raw}': {reason}")]
pub struct InvalidReferenceError {
    pub raw: String,
    pub reason: &'static str,
}

impl InvalidReferenceError {
    fn new(raw: &str, reason: &'static str) -> Self {
        Self {
            raw: raw.to_owned(),
            reason,
        }
    }
}

/// Resolves raw reference text.
///
/// `context` is the reference of the document being parsed, used to qualify
/// attachment references that do not name their document.
pub trait ReferenceResolver: Send + Sync {
    fn resolve(
        &self,
        raw: &str,
        context: Option<&str>,
    ) -> Result<ResourceReference, InvalidReferenceError>;
}

const MAILTO_PREFIX: &str = "mailto:";
const IMAGE_PREFIX: &str = "image:";
const ATTACH_PREFIX: &str = "attach:";

/// Split `scheme://rest` when the scheme is a plausible URL scheme.
fn split_url_scheme(s: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = s.split_once("://")?;
    let valid = !scheme.is_empty()
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some((scheme, rest))
}

/// Whether `s` starts with a URL (`scheme://host`).
#[must_use]
pub fn is_url(s: &str) -> bool {
    split_url_scheme(s).is_some_and(|(_, rest)| !rest.is_empty())
}

/// Remove and return the part after the last `separator`.
fn take_after_last<'a>(content: &mut &'a str, separator: char) -> Option<&'a str> {
    let pos = content.rfind(separator)?;
    let after = &content[pos + separator.len_utf8()..];
    *content = &content[..pos];
    Some(after)
}

/// Attachment reference `document@file` or bare `file` qualified by `context`.
fn attachment(raw: &str, target: &str, context: Option<&str>) -> ResourceReference {
    let (document, file) = match target.rsplit_once('@') {
        Some((document, file)) => (Some(document), file),
        None => (context, target),
    };
    let reference = ResourceReference::new(ResourceType::Attachment, file).with_raw(raw);
    match document {
        Some(document) if !document.is_empty() => reference.with_document(document),
        _ => reference,
    }
}

/// Link resolver for `xwiki/2.0` link targets.
///
/// Known URI prefixes (`mailto:`, `image:`, `attach:`) and `scheme://` URLs are
/// taken whole. Anything else is a document reference split from the right on
/// `@` (interwiki alias), `?` (query string) and `#` (anchor).
#[derive(Debug, Default, Clone, Copy)]
pub struct XWikiLinkResolver;

impl ReferenceResolver for XWikiLinkResolver {
    fn resolve(
        &self,
        raw: &str,
        context: Option<&str>,
    ) -> Result<ResourceReference, InvalidReferenceError> {
        let content = raw.trim();
        if content.is_empty() {
            return Err(InvalidReferenceError::new(raw, "empty reference"));
        }

        if let Some(address) = content.strip_prefix(MAILTO_PREFIX) {
            if address.is_empty() {
                return Err(InvalidReferenceError::new(raw, "missing e-mail address"));
            }
            return Ok(ResourceReference::new(ResourceType::Mailto, address).with_raw(content));
        }
        if let Some(target) = content
            .strip_prefix(ATTACH_PREFIX)
            .or_else(|| content.strip_prefix(IMAGE_PREFIX))
        {
            if target.is_empty() {
                return Err(InvalidReferenceError::new(raw, "missing attachment name"));
            }
            return Ok(attachment(content, target, context));
        }
        if let Some(unc) = content.strip_prefix("\\\\") {
            return Ok(ResourceReference::new(ResourceType::Unc, unc).with_raw(content));
        }
        if split_url_scheme(content).is_some() {
            if !is_url(content) || content.contains(char::is_whitespace) {
                return Err(InvalidReferenceError::new(raw, "invalid link format"));
            }
            return Ok(ResourceReference::url(content).with_raw(content));
        }

        let mut rest = content;
        let alias = take_after_last(&mut rest, '@');
        let query_string = take_after_last(&mut rest, '?');
        let anchor = take_after_last(&mut rest, '#');

        let kind = if alias.is_some() {
            ResourceType::Interwiki
        } else {
            ResourceType::Document
        };
        let mut reference = ResourceReference::new(kind, rest.trim()).with_raw(content);
        if let Some(alias) = alias {
            if alias.trim().is_empty() {
                return Err(InvalidReferenceError::new(raw, "empty interwiki alias"));
            }
            reference = reference.with_interwiki_alias(alias.trim());
        }
        if let Some(query_string) = query_string {
            reference = reference.with_query_string(query_string.trim());
        }
        if let Some(anchor) = anchor {
            reference = reference.with_anchor(anchor.trim());
        }
        if rest.trim().is_empty() && anchor.is_none() && query_string.is_none() {
            return Err(InvalidReferenceError::new(raw, "empty reference"));
        }
        Ok(reference)
    }
}

/// Image resolver for `xwiki/2.0` image targets.
///
/// A URL is used as is; `document@file` names an attachment of another
/// document; a bare name is an attachment of the current document.
#[derive(Debug, Default, Clone, Copy)]
pub struct XWikiImageResolver;

impl ReferenceResolver for XWikiImageResolver {
    fn resolve(
        &self,
        raw: &str,
        context: Option<&str>,
    ) -> Result<ResourceReference, InvalidReferenceError> {
        let content = raw.trim();
        let content = content.strip_prefix(IMAGE_PREFIX).unwrap_or(content);
        if content.is_empty() {
            return Err(InvalidReferenceError::new(raw, "empty image reference"));
        }
        if split_url_scheme(content).is_some() {
            if !is_url(content) || content.contains(char::is_whitespace) {
                return Err(InvalidReferenceError::new(raw, "invalid image URL"));
            }
            return Ok(ResourceReference::url(content));
        }
        Ok(attachment(content, content, context))
    }
}

/// Resolver for `creole/1.0` link and image targets.
///
/// URLs are taken whole, everything else is a document (or, for images, an
/// attachment of the current document).
#[derive(Debug, Default, Clone, Copy)]
pub struct CreoleResolver {
    images: bool,
}

impl CreoleResolver {
    #[must_use]
    pub const fn links() -> Self {
        Self { images: false }
    }

    #[must_use]
    pub const fn images() -> Self {
        Self { images: true }
    }
}

impl ReferenceResolver for CreoleResolver {
    fn resolve(
        &self,
        raw: &str,
        context: Option<&str>,
    ) -> Result<ResourceReference, InvalidReferenceError> {
        let content = raw.trim();
        if content.is_empty() {
            return Err(InvalidReferenceError::new(raw, "empty reference"));
        }
        if is_url(content) {
            return Ok(ResourceReference::url(content));
        }
        if self.images {
            return Ok(attachment(content, content, context));
        }
        let mut rest = content;
        let anchor = take_after_last(&mut rest, '#');
        let reference = ResourceReference::document(rest).with_raw(content);
        Ok(match anchor {
            Some(anchor) => reference.with_anchor(anchor),
            None => reference,
        })
    }
}

/// Resolver for hyperlink targets of `markdown/1.0` and `xhtml/1.0`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UrlResolver;

impl ReferenceResolver for UrlResolver {
    fn resolve(
        &self,
        raw: &str,
        _context: Option<&str>,
    ) -> Result<ResourceReference, InvalidReferenceError> {
        let content = raw.trim();
        if content.is_empty() {
            return Err(InvalidReferenceError::new(raw, "empty reference"));
        }
        if let Some(address) = content.strip_prefix(MAILTO_PREFIX) {
            return Ok(ResourceReference::new(ResourceType::Mailto, address).with_raw(content));
        }
        if split_url_scheme(content).is_some() {
            return Ok(ResourceReference::url(content));
        }
        let mut rest = content;
        let anchor = take_after_last(&mut rest, '#');
        let query_string = take_after_last(&mut rest, '?');
        let mut reference = ResourceReference::document(rest).with_raw(content);
        if let Some(query_string) = query_string {
            reference = reference.with_query_string(query_string);
        }
        if let Some(anchor) = anchor {
            reference = reference.with_anchor(anchor);
        }
        Ok(reference)
    }
}
