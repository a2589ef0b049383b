//! Renderers turning an [`Xdom`](wr_xdom::Xdom) into text.
//!
//! Every renderer is a [`Listener`](wr_xdom::Listener) fed by
//! [`Xdom::traverse`](wr_xdom::Xdom::traverse) and implements
//! [`PrintRenderer`] to hand back its output. The [`RendererRegistry`] creates a
//! fresh renderer per render for each target syntax:
//!
//! - `xhtml/1.0`: [`XhtmlRenderer`], links resolved through a [`WikiModel`]
//! - `plain/1.0`: [`PlainRenderer`]
//! - `event/1.0`: [`EventRenderer`]
//! - `xwiki/2.0`: [`XWikiRenderer`]
//!
//! # Example
//!
//! ```
//! use wr_parser::{Parser, XWikiParser};
//! use wr_renderer::{DefaultWikiModel, RendererRegistry};
//! use wr_xdom::Syntax;
//!
//! let xdom = XWikiParser.parse("Some **bold** text.").unwrap();
//! let registry = RendererRegistry::new();
//! let wiki = DefaultWikiModel::new();
//!
//! let html = registry.render(&xdom, &Syntax::XHTML_1_0, &wiki).unwrap();
//! assert_eq!(html, "<p>Some <strong>bold</strong> text.</p>");
//!
//! let text = registry.render(&xdom, &Syntax::PLAIN_1_0, &wiki).unwrap();
//! assert_eq!(text, "Some bold text.");
//! ```

mod event;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod plain;
mod printer;
mod registry;
mod wiki_model;
mod xhtml;
mod xwiki;

pub use event::{EventRecord, EventRenderer, event_records};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockWikiModel;
pub use plain::PlainRenderer;
pub use printer::{PrintRenderer, escape_html};
pub use registry::{RendererFactory, RendererRegistry};
pub use wiki_model::{DefaultWikiModel, WikiModel};
pub use xhtml::XhtmlRenderer;
pub use xwiki::XWikiRenderer;
