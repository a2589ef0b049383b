//! Lookup of renderers by target syntax.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use wr_xdom::{Syntax, UnknownSyntaxError, Xdom};

use crate::event::EventRenderer;
use crate::plain::PlainRenderer;
use crate::printer::PrintRenderer;
use crate::wiki_model::WikiModel;
use crate::xhtml::XhtmlRenderer;
use crate::xwiki::XWikiRenderer;

/// Creates a fresh renderer for each render.
pub trait RendererFactory: Send + Sync {
    /// Syntax produced by the renderers.
    fn syntax(&self) -> Syntax;

    fn create<'a>(&self, wiki: &'a dyn WikiModel) -> Box<dyn PrintRenderer + 'a>;
}

macro_rules! factory {
    ($name:ident, $syntax:expr, |$wiki:ident| $create:expr) => {
        #[derive(Debug, Default, Clone, Copy)]
        struct $name;

        impl RendererFactory for $name {
            fn syntax(&self) -> Syntax {
                $syntax
            }

            fn create<'a>(&self, $wiki: &'a dyn WikiModel) -> Box<dyn PrintRenderer + 'a> {
                Box::new($create)
            }
        }
    };
}

factory!(XhtmlFactory, Syntax::XHTML_1_0, |wiki| XhtmlRenderer::new(wiki));
factory!(PlainFactory, Syntax::PLAIN_1_0, |_wiki| PlainRenderer::new());
factory!(EventFactory, Syntax::EVENT_1_0, |_wiki| EventRenderer::new());
factory!(XWikiFactory, Syntax::XWIKI_2_0, |_wiki| XWikiRenderer::new());

/// Renderer factories keyed by target syntax.
///
/// The registry is read-only while rendering and can be shared across threads.
///
/// # Example
///
/// ```
/// use wr_renderer::{DefaultWikiModel, RendererRegistry};
/// use wr_xdom::{Block, Syntax, Xdom};
///
/// let xdom = Xdom::new(vec![Block::paragraph(vec![Block::word("Hi")])]);
/// let html = RendererRegistry::new()
///     .render(&xdom, &Syntax::XHTML_1_0, &DefaultWikiModel::new())
///     .unwrap();
/// assert_eq!(html, "<p>Hi</p>");
/// ```
#[derive(Clone)]
pub struct RendererRegistry {
    factories: BTreeMap<Syntax, Arc<dyn RendererFactory>>,
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererRegistry")
            .field("syntaxes", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RendererRegistry {
    /// Registry with the XHTML, plain text, event and XWiki renderers.
    #[must_use]
    pub fn new() -> Self {
        Self::empty()
            .with_factory(XhtmlFactory)
            .with_factory(PlainFactory)
            .with_factory(EventFactory)
            .with_factory(XWikiFactory)
    }

    /// Registry without renderers.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Register a factory, replacing any factory for the same syntax.
    #[must_use]
    pub fn with_factory<F: RendererFactory + 'static>(mut self, factory: F) -> Self {
        self.factories.insert(factory.syntax(), Arc::new(factory));
        self
    }

    /// Factory for `syntax`.
    pub fn get(&self, syntax: &Syntax) -> Result<Arc<dyn RendererFactory>, UnknownSyntaxError> {
        self.factories
            .get(syntax)
            .map(Arc::clone)
            .ok_or_else(|| UnknownSyntaxError::NoRenderer(syntax.clone()))
    }

    /// Registered target syntaxes in identifier order.
    pub fn syntaxes(&self) -> impl Iterator<Item = &Syntax> {
        self.factories.keys()
    }

    /// Render `xdom` to `syntax`.
    pub fn render(
        &self,
        xdom: &Xdom,
        syntax: &Syntax,
        wiki: &dyn WikiModel,
    ) -> Result<String, UnknownSyntaxError> {
        let mut renderer = self.get(syntax)?.create(wiki);
        xdom.traverse(renderer.as_mut());
        let output = renderer.finish();
        tracing::debug!(%syntax, bytes = output.len(), "Rendered document");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wr_xdom::Block;

    use crate::DefaultWikiModel;

    #[test]
    fn test_builtin_syntaxes() {
        let registry = RendererRegistry::new();
        let ids: Vec<String> = registry.syntaxes().map(Syntax::id).collect();
        assert_eq!(ids, vec!["event/1.0", "plain/1.0", "xhtml/1.0", "xwiki/2.0"]);
    }

    #[test]
    fn test_unknown_target() {
        let err = RendererRegistry::new()
            .render(&Xdom::default(), &Syntax::CREOLE_1_0, &DefaultWikiModel::new())
            .unwrap_err();
        assert_eq!(err, UnknownSyntaxError::NoRenderer(Syntax::CREOLE_1_0));
    }

    #[test]
    fn test_empty_registry() {
        assert!(RendererRegistry::empty().get(&Syntax::XHTML_1_0).is_err());
    }

    #[test]
    fn test_each_render_uses_a_fresh_renderer() {
        let registry = RendererRegistry::new();
        let xdom = Xdom::new(vec![Block::heading(1, vec![Block::word("A")])]);
        let wiki = DefaultWikiModel::new();
        let first = registry.render(&xdom, &Syntax::XHTML_1_0, &wiki).unwrap();
        let second = registry.render(&xdom, &Syntax::XHTML_1_0, &wiki).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, r#"<h1 id="Ha"><span>A</span></h1>"#);
    }
}
