//! Macro framework.
//!
//! A macro turns a `{{id params}}content{{/id}}` call into replacement blocks.
//! Macros are looked up in a [`MacroRegistry`] and expanded by the
//! [`MacroTransformation`]; each expansion replaces the call with a
//! macro marker holding the produced blocks.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use wr_transform::{
//!     Macro, MacroContext, MacroDescriptor, MacroExecutionError, MacroParameters,
//!     MacroRegistry, MacroTransformation, Transformation, TransformationContext,
//! };
//! use wr_xdom::{Block, BlockKind, MacroCall, Syntax, Xdom};
//!
//! struct Hello(MacroDescriptor);
//!
//! impl Macro for Hello {
//!     fn descriptor(&self) -> &MacroDescriptor {
//!         &self.0
//!     }
//!
//!     fn execute(
//!         &self,
//!         _params: &MacroParameters,
//!         _content: Option<&str>,
//!         _context: &mut MacroContext<'_>,
//!     ) -> Result<Vec<Block>, MacroExecutionError> {
//!         Ok(vec![Block::word("hello")])
//!     }
//! }
//!
//! let registry = MacroRegistry::new().with_macro(Hello(MacroDescriptor::new("hello", "Greets")));
//! let transformation = MacroTransformation::new(Arc::new(registry));
//! let mut xdom = Xdom::new(vec![Block::new(BlockKind::Macro(MacroCall::new("hello", false)))]);
//! let mut context = TransformationContext::new(Syntax::XWIKI_2_0);
//! transformation.transform(&mut xdom, &mut context).unwrap();
//! assert_eq!(xdom.text(), "hello");
//! ```

pub mod builtin;
mod descriptor;
mod parameters;
mod registry;
mod transformation;
mod wiki;

pub use descriptor::{ContentMode, MacroDescriptor, ParameterDescriptor, ParameterType};
pub use parameters::{MacroParameters, ParameterValue};
pub use registry::MacroRegistry;
pub use transformation::{MACRO_TRANSFORMATION_PRIORITY, MacroTransformation};
pub use wiki::WikiMacro;

use wr_xdom::{Block, BlockKind, MacroCall, Syntax, Xdom};

use crate::context::TransformationContext;
use crate::error::MacroExecutionError;
use crate::source::DocumentSource;

/// Default execution priority of a macro.
pub const DEFAULT_MACRO_PRIORITY: u32 = 1000;

/// A pluggable macro.
pub trait Macro: Send + Sync {
    /// Declared id, parameters and content mode.
    fn descriptor(&self) -> &MacroDescriptor;

    /// Macros with lower priority expand first within a pass.
    fn priority(&self) -> u32 {
        DEFAULT_MACRO_PRIORITY
    }

    /// Whether the macro may be called inside a paragraph.
    fn supports_inline(&self) -> bool {
        true
    }

    /// Produce the blocks replacing the call.
    fn execute(
        &self,
        params: &MacroParameters,
        content: Option<&str>,
        context: &mut MacroContext<'_>,
    ) -> Result<Vec<Block>, MacroExecutionError>;
}

/// What a running macro can see and do.
pub struct MacroContext<'a> {
    call: &'a MacroCall,
    context: &'a mut TransformationContext,
    transformation: &'a MacroTransformation,
}

impl<'a> MacroContext<'a> {
    pub(crate) fn new(
        call: &'a MacroCall,
        context: &'a mut TransformationContext,
        transformation: &'a MacroTransformation,
    ) -> Self {
        Self {
            call,
            context,
            transformation,
        }
    }

    /// The call being expanded.
    pub fn call(&self) -> &MacroCall {
        self.call
    }

    pub fn is_inline(&self) -> bool {
        self.call.inline
    }

    /// Syntax of the document being transformed.
    pub fn syntax(&self) -> &Syntax {
        self.context.syntax()
    }

    pub fn document(&self) -> Option<&str> {
        self.context.document()
    }

    pub fn transformation_context(&self) -> &TransformationContext {
        self.context
    }

    pub fn transformation_context_mut(&mut self) -> &mut TransformationContext {
        self.context
    }

    /// Parse `content` written in `syntax` in the current document.
    pub fn parse(&self, content: &str, syntax: &Syntax) -> Result<Xdom, MacroExecutionError> {
        Ok(self
            .transformation
            .parsers()
            .parse_with(content, syntax, self.context.document())?)
    }

    /// Parse macro content in the current syntax.
    ///
    /// For inline calls a single top-level paragraph is unwrapped so the
    /// result fits inside the enclosing paragraph.
    pub fn parse_content(&self, content: &str) -> Result<Vec<Block>, MacroExecutionError> {
        let syntax = self.context.syntax().clone();
        let mut blocks = self.parse(content, &syntax)?.blocks;
        if self.call.inline
            && blocks.len() == 1
            && blocks[0].kind == BlockKind::Paragraph
            && let Some(paragraph) = blocks.pop()
        {
            return Ok(paragraph.children);
        }
        Ok(blocks)
    }

    /// Source of other documents' content.
    pub fn source(&self) -> Result<&dyn DocumentSource, MacroExecutionError> {
        self.transformation
            .source()
            .ok_or(MacroExecutionError::NoSource)
    }

    /// Expand the macros of `xdom` as an independent document: no inherited
    /// variables, one nesting level deeper.
    pub fn transform_new(
        &self,
        xdom: &mut Xdom,
        syntax: Syntax,
        document: Option<&str>,
    ) -> Result<(), MacroExecutionError> {
        let mut isolated = self.context.isolated(syntax, document);
        self.transform_in(xdom, &mut isolated)
    }

    /// Expand the macros of `xdom` in `context`, usually one derived with
    /// [`TransformationContext::isolated`].
    pub fn transform_in(
        &self,
        xdom: &mut Xdom,
        context: &mut TransformationContext,
    ) -> Result<(), MacroExecutionError> {
        crate::Transformation::transform(self.transformation, xdom, context)?;
        Ok(())
    }
}
