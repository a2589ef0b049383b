//! Syntax identifiers.
//!
//! A syntax is identified by a `name/version` pair such as `xwiki/2.0`.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Identifier of a markup syntax (`name/version`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Syntax {
    name: Cow<'static, str>,
    version: Cow<'static, str>,
}

impl Syntax {
    /// Default rich wiki syntax.
    pub const XWIKI_2_0: Self = Self::from_static("xwiki", "2.0");
    /// Creole lightweight markup.
    pub const CREOLE_1_0: Self = Self::from_static("creole", "1.0");
    /// `CommonMark` with GFM extensions.
    pub const MARKDOWN_1_0: Self = Self::from_static("markdown", "1.0");
    /// Uninterpreted plain text.
    pub const PLAIN_1_0: Self = Self::from_static("plain", "1.0");
    /// XHTML 1.0.
    pub const XHTML_1_0: Self = Self::from_static("xhtml", "1.0");
    /// Event trace (output only).
    pub const EVENT_1_0: Self = Self::from_static("event", "1.0");

    /// Create a syntax identifier.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            version: Cow::Owned(version.into()),
        }
    }

    const fn from_static(name: &'static str, version: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            version: Cow::Borrowed(version),
        }
    }

    /// Syntax name (e.g. `xwiki`).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Syntax version (e.g. `2.0`).
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The `name/version` identifier.
    #[must_use]
    pub fn id(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)
    }
}

impl FromStr for Syntax {
    type Err = UnknownSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once('/') {
            Some((name, version))
                if !name.is_empty() && !version.is_empty() && !version.contains('/') =>
            {
                Ok(Self::new(name.to_ascii_lowercase(), version))
            }
            _ => Err(UnknownSyntaxError::Malformed(s.to_owned())),
        }
    }
}

/// Requested syntax is malformed or has no registered parser/renderer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnknownSyntaxError {
    /// The identifier is not of the form `name/version`.
    #[error("Invalid syntax identifier '{0}', expected 'name/version'")]
    Malformed(String),
    /// No parser is registered for the syntax.
    #[error("No parser registered for syntax '{0}'")]
    NoParser(Syntax),
    /// No renderer is registered for the syntax.
    #[error("No renderer registered for syntax '{0}'")]
    NoRenderer(Syntax),
}
