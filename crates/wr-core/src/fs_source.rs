//! Documents read from a directory.

use std::fs;
use std::path::{Component, Path, PathBuf};

use wr_transform::{DocumentSource, SourceDocument, SourceError, SourceErrorKind};
use wr_xdom::Syntax;

/// File extensions and the syntax they imply, in lookup order.
const EXTENSIONS: &[(&str, Syntax)] = &[
    ("xwiki", Syntax::XWIKI_2_0),
    ("creole", Syntax::CREOLE_1_0),
    ("md", Syntax::MARKDOWN_1_0),
    ("markdown", Syntax::MARKDOWN_1_0),
    ("txt", Syntax::PLAIN_1_0),
    ("html", Syntax::XHTML_1_0),
    ("xhtml", Syntax::XHTML_1_0),
];

/// Syntax implied by the extension of `path`.
///
/// ```
/// use std::path::Path;
/// use wr_core::syntax_for_path;
/// use wr_xdom::Syntax;
///
/// assert_eq!(syntax_for_path(Path::new("notes/todo.md")), Some(Syntax::MARKDOWN_1_0));
/// assert_eq!(syntax_for_path(Path::new("README")), None);
/// ```
#[must_use]
pub fn syntax_for_path(path: &Path) -> Option<Syntax> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    EXTENSIONS
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, syntax)| syntax.clone())
}

/// Document source backed by files under a root directory.
///
/// A reference is either a relative file path (`guides/intro.md`) or a dotted
/// document reference (`Guides.Intro`), which is looked up as
/// `Guides/Intro.<ext>` trying each known extension. Files without a known
/// extension are read in the default syntax.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
    default_syntax: Syntax,
}

impl FsSource {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            default_syntax: Syntax::XWIKI_2_0,
        }
    }

    /// Syntax of files without a known extension.
    #[must_use]
    pub fn with_default_syntax(mut self, syntax: Syntax) -> Self {
        self.default_syntax = syntax;
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `reference` to a path under the root.
    ///
    /// Rejects absolute paths and `..` components.
    fn resolve_path_safe(&self, reference: &str) -> Result<PathBuf, SourceError> {
        let relative = Path::new(reference);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if reference.trim().is_empty() || escapes {
            return Err(SourceError::new(
                SourceErrorKind::InvalidReference,
                reference,
            ));
        }

        let direct = self.root.join(relative);
        if direct.is_file() {
            return Ok(direct);
        }

        if relative.extension().is_none() || !reference.contains('/') {
            let dotted: PathBuf = reference.split('.').collect();
            for (ext, _) in EXTENSIONS {
                let candidate = self.root.join(&dotted).with_extension(ext);
                if candidate.is_file() {
                    return Ok(candidate);
                }
            }
        }

        Err(SourceError::not_found(reference))
    }
}

impl DocumentSource for FsSource {
    fn get(&self, reference: &str) -> Result<SourceDocument, SourceError> {
        let path = self.resolve_path_safe(reference)?;
        let content = fs::read_to_string(&path).map_err(|err| SourceError::io(err, reference))?;
        let syntax = syntax_for_path(&path).unwrap_or_else(|| self.default_syntax.clone());
        tracing::debug!(reference, path = %path.display(), %syntax, "Read document");
        Ok(SourceDocument::new(content, syntax))
    }
}
