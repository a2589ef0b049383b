//! Transformation pipeline and macro framework.
//!
//! A [`TransformationManager`] runs registered [`Transformation`]s over a
//! parsed document in priority order. The main transformation is the
//! [`MacroTransformation`], which expands `{{macro}}` calls using the macros of
//! a [`MacroRegistry`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use wr_parser::{Parser, XWikiParser};
//! use wr_transform::{
//!     MacroRegistry, MacroTransformation, TransformationContext, TransformationManager,
//! };
//! use wr_xdom::Syntax;
//!
//! let manager = TransformationManager::new()
//!     .with_transformation(MacroTransformation::new(Arc::new(MacroRegistry::with_builtins())));
//! let mut xdom = XWikiParser.parse(r#"{{set name="who" value="world"/}}Hello {{get name="who"/}}"#).unwrap();
//! let mut context = TransformationContext::new(Syntax::XWIKI_2_0);
//! manager.apply_all(&mut xdom, &mut context).unwrap();
//! assert_eq!(xdom.text(), "Hello world");
//! ```

mod context;
mod error;
pub mod macros;
mod source;
mod transformation;

pub use context::{DEFAULT_MAX_DEPTH, TransformationContext};
pub use error::{MacroExecutionError, MacroLookupError, TransformationError};
pub use macros::{
    ContentMode, DEFAULT_MACRO_PRIORITY, MACRO_TRANSFORMATION_PRIORITY, Macro, MacroContext,
    MacroDescriptor, MacroParameters, MacroRegistry, MacroTransformation, ParameterDescriptor,
    ParameterType, ParameterValue, WikiMacro,
};
pub use source::{DocumentSource, MemorySource, SourceDocument, SourceError, SourceErrorKind};
pub use transformation::{DEFAULT_PRIORITY, Transformation, TransformationManager};
