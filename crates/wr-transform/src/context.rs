//! Per-render transformation state.

use std::collections::BTreeMap;

use wr_xdom::Syntax;

/// Default bound on macro nesting.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// State shared by the transformations of one render.
///
/// A context belongs to a single document render and is never shared between
/// threads. Variables set by macros (`set`) are visible to later macros of the
/// same context only.
#[derive(Debug, Clone)]
pub struct TransformationContext {
    syntax: Syntax,
    document: Option<String>,
    variables: BTreeMap<String, String>,
    depth: usize,
    max_depth: usize,
}

impl TransformationContext {
    /// Context for a document written in `syntax`.
    #[must_use]
    pub fn new(syntax: Syntax) -> Self {
        Self {
            syntax,
            document: None,
            variables: BTreeMap::new(),
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set the reference of the document being transformed.
    #[must_use]
    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.document = Some(document.into());
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Fresh context for an independent sub-document one nesting level deeper.
    ///
    /// Variables are not inherited; the nesting bound is.
    #[must_use]
    pub fn isolated(&self, syntax: Syntax, document: Option<&str>) -> Self {
        Self {
            syntax,
            document: document.map(str::to_owned),
            variables: BTreeMap::new(),
            depth: self.depth + 1,
            max_depth: self.max_depth,
        }
    }

    pub fn syntax(&self) -> &Syntax {
        &self.syntax
    }

    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }

    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }

    pub fn variables(&self) -> &BTreeMap<String, String> {
        &self.variables
    }

    /// Current macro nesting level.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn set_depth(&mut self, depth: usize) {
        self.depth = depth;
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolated_drops_variables_and_keeps_depth() {
        let mut context = TransformationContext::new(Syntax::XWIKI_2_0)
            .with_document("Main.Home")
            .with_max_depth(5)
            .with_variable("x", "1");
        context.set_depth(2);

        let child = context.isolated(Syntax::CREOLE_1_0, Some("Main.Other"));
        assert_eq!(child.variable("x"), None);
        assert_eq!(child.depth(), 3);
        assert_eq!(child.max_depth(), 5);
        assert_eq!(child.document(), Some("Main.Other"));
        assert_eq!(child.syntax(), &Syntax::CREOLE_1_0);
        assert_eq!(context.variable("x"), Some("1"));
    }
}
