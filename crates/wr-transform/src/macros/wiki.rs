//! Macros defined in wiki markup.

use wr_xdom::{Block, BlockKind, Syntax};

use crate::error::MacroExecutionError;
use crate::macros::{Macro, MacroContext, MacroDescriptor, MacroParameters};

/// Variable holding the call content while the body is transformed.
const CONTENT_VARIABLE: &str = "macro.content";

/// Prefix of the variables holding the bound call parameters.
const PARAMS_PREFIX: &str = "macro.params.";

/// A macro whose output is a document body written in a wiki syntax.
///
/// Each call parses the body and expands its macros in a fresh context one
/// level deeper. That context holds the call parameters as
/// `macro.params.<name>` variables and the call content as `macro.content`,
/// so the body reads them with the `get` macro.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use wr_parser::{Parser, XWikiParser};
/// use wr_transform::{
///     MacroDescriptor, MacroRegistry, MacroTransformation, ParameterDescriptor, ParameterType,
///     Transformation, TransformationContext, WikiMacro,
/// };
/// use wr_xdom::Syntax;
///
/// let greet = WikiMacro::new(
///     MacroDescriptor::new("greet", "Greets someone")
///         .with_parameter(ParameterDescriptor::new("who", ParameterType::String).mandatory()),
///     r#"Hello {{get name="macro.params.who"/}}!"#,
///     Syntax::XWIKI_2_0,
/// );
/// let mut registry = MacroRegistry::with_builtins();
/// registry.register(Arc::new(greet));
///
/// let mut xdom = XWikiParser.parse(r#"{{greet who="Ann"/}}"#).unwrap();
/// let mut context = TransformationContext::new(Syntax::XWIKI_2_0);
/// MacroTransformation::new(Arc::new(registry))
///     .transform(&mut xdom, &mut context)
///     .unwrap();
/// assert_eq!(xdom.text(), "Hello Ann!");
/// ```
#[derive(Debug, Clone)]
pub struct WikiMacro {
    descriptor: MacroDescriptor,
    body: String,
    syntax: Syntax,
    inline: bool,
}

impl WikiMacro {
    /// Macro described by `descriptor` rendering `body`, written in `syntax`.
    #[must_use]
    pub fn new(descriptor: MacroDescriptor, body: impl Into<String>, syntax: Syntax) -> Self {
        Self {
            descriptor,
            body: body.into(),
            syntax,
            inline: true,
        }
    }

    /// Whether calls inside a paragraph are accepted (default `true`).
    #[must_use]
    pub fn with_inline_support(mut self, inline: bool) -> Self {
        self.inline = inline;
        self
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn syntax(&self) -> &Syntax {
        &self.syntax
    }
}

impl Macro for WikiMacro {
    fn descriptor(&self) -> &MacroDescriptor {
        &self.descriptor
    }

    fn supports_inline(&self) -> bool {
        self.inline
    }

    fn execute(
        &self,
        params: &MacroParameters,
        content: Option<&str>,
        context: &mut MacroContext<'_>,
    ) -> Result<Vec<Block>, MacroExecutionError> {
        let mut xdom = context.parse(&self.body, &self.syntax)?;
        // A body made of one macro call takes the placement of the call.
        if context.is_inline()
            && let [block] = xdom.blocks.as_mut_slice()
            && let BlockKind::Macro(call) = &mut block.kind
        {
            call.inline = true;
        }

        let mut body_context = context
            .transformation_context()
            .isolated(self.syntax.clone(), context.document());
        for (name, value) in params.entries() {
            body_context.set_variable(format!("{PARAMS_PREFIX}{name}"), value.to_string());
        }
        if let Some(content) = content {
            body_context.set_variable(CONTENT_VARIABLE, content);
        }
        tracing::debug!(id = %self.descriptor.id, syntax = %self.syntax, "Executing wiki macro");
        context.transform_in(&mut xdom, &mut body_context)?;

        let mut blocks = xdom.blocks;
        if context.is_inline()
            && blocks.len() == 1
            && blocks[0].kind == BlockKind::Paragraph
            && let Some(paragraph) = blocks.pop()
        {
            return Ok(paragraph.children);
        }
        Ok(blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use wr_parser::{Parser, XWikiParser};
    use wr_xdom::Xdom;

    use crate::macros::{ContentMode, ParameterDescriptor, ParameterType};
    use crate::{MacroRegistry, MacroTransformation, Transformation, TransformationContext};

    fn transform(m: WikiMacro, content: &str) -> Xdom {
        let mut registry = MacroRegistry::with_builtins();
        registry.register(Arc::new(m));
        let transformation = MacroTransformation::new(Arc::new(registry));
        let mut xdom = XWikiParser.parse(content).unwrap();
        let mut context = TransformationContext::new(Syntax::XWIKI_2_0).with_document("Main.Home");
        transformation.transform(&mut xdom, &mut context).unwrap();
        xdom
    }

    fn error_descriptions(xdom: &Xdom) -> Vec<String> {
        let mut errors = Vec::new();
        xdom.walk(|_, block| {
            if let BlockKind::Error { description, .. } = &block.kind {
                errors.push(description.clone());
            }
        });
        errors
    }

    fn greet() -> WikiMacro {
        WikiMacro::new(
            MacroDescriptor::new("greet", "Greets someone")
                .with_parameter(ParameterDescriptor::new("who", ParameterType::String).mandatory())
                .with_parameter(
                    ParameterDescriptor::new("times", ParameterType::Integer).with_default("1"),
                ),
            r#"Hello **{{get name="macro.params.who"/}}** x{{get name="macro.params.times"/}}"#,
            Syntax::XWIKI_2_0,
        )
    }

    #[test]
    fn test_standalone_body_keeps_its_blocks() {
        let title = WikiMacro::new(
            MacroDescriptor::new("title", "Section title").with_content(ContentMode::None),
            "== Test ==",
            Syntax::XWIKI_2_0,
        );
        let xdom = transform(title, "{{title/}}");
        assert_eq!(
            xdom.blocks[0].children,
            vec![Block::heading(2, vec![Block::word("Test")])]
        );
    }

    #[test]
    fn test_inline_call_unwraps_the_paragraph() {
        let xdom = transform(greet(), r#"Say {{greet who="Ann"/}} now"#);
        assert_eq!(xdom.text(), "Say Hello Ann x1 now");
        let paragraph = &xdom.blocks[0];
        assert_eq!(paragraph.kind, BlockKind::Paragraph);
        let marker = &paragraph.children[2];
        assert!(matches!(&marker.kind, BlockKind::MacroMarker(call) if call.id == "greet"));
        assert!(marker.children.iter().all(Block::is_inline));
    }

    #[test]
    fn test_standalone_call_gets_a_paragraph() {
        let xdom = transform(greet(), r#"{{greet who="Bob" times="3"/}}"#);
        assert_eq!(xdom.text(), "Hello Bob x3");
        assert_eq!(xdom.blocks[0].children[0].kind, BlockKind::Paragraph);
    }

    #[test]
    fn test_content_and_single_macro_body() {
        let quote = WikiMacro::new(
            MacroDescriptor::new("quote", "Repeats its content").with_content(ContentMode::Mandatory),
            r#"{{get name="macro.content"/}}"#,
            Syntax::XWIKI_2_0,
        );
        let xdom = transform(quote, "Said: {{quote}}yes{{/quote}}");
        assert_eq!(xdom.text(), "Said: yes");
        assert_eq!(xdom.blocks.len(), 1);
    }

    #[test]
    fn test_body_does_not_see_caller_variables() {
        let leak = WikiMacro::new(
            MacroDescriptor::new("leak", "Reads a caller variable"),
            r#"{{get name="x" default="none"/}}"#,
            Syntax::XWIKI_2_0,
        );
        let xdom = transform(leak, "{{set name=\"x\" value=\"1\"/}}\n\n{{leak/}}");
        assert_eq!(xdom.blocks[1].text(), "none");
    }

    #[test]
    fn test_missing_parameter_and_inline_restriction() {
        let xdom = transform(greet(), "{{greet/}}");
        assert_eq!(error_descriptions(&xdom), vec!["Missing mandatory parameter [who]"]);

        let block_only = greet().with_inline_support(false);
        let xdom = transform(block_only, r#"Say {{greet who="Ann"/}}"#);
        assert_eq!(
            error_descriptions(&xdom),
            vec!["The [greet] macro is a standalone macro and it cannot be used inline"]
        );
    }
}
