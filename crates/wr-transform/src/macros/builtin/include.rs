//! Inclusion of other documents.

use wr_xdom::Block;

use crate::error::MacroExecutionError;
use crate::macros::{
    ContentMode, Macro, MacroContext, MacroDescriptor, MacroParameters, ParameterDescriptor,
    ParameterType,
};

const CONTEXTS: &[&str] = &["new", "current"];

/// `{{include document="..." context="new|current"/}}`.
///
/// With `context="new"` the included document is transformed on its own,
/// without the variables of the including document. With `context="current"`
/// (the default) its blocks are returned as parsed and their macros expand in
/// the including document's context.
#[derive(Debug)]
pub struct IncludeMacro {
    descriptor: MacroDescriptor,
}

impl IncludeMacro {
    #[must_use]
    pub fn new() -> Self {
        let descriptor = MacroDescriptor::new("include", "Include another document")
            .with_parameter(
                ParameterDescriptor::new("document", ParameterType::String)
                    .mandatory()
                    .with_description("Reference of the document to include"),
            )
            .with_parameter(
                ParameterDescriptor::new("context", ParameterType::Enum(CONTEXTS))
                    .with_default("current")
                    .with_description("Context the included document is executed in"),
            )
            .with_content(ContentMode::None);
        Self { descriptor }
    }
}

impl Default for IncludeMacro {
    fn default() -> Self {
        Self::new()
    }
}

impl Macro for IncludeMacro {
    fn descriptor(&self) -> &MacroDescriptor {
        &self.descriptor
    }

    fn supports_inline(&self) -> bool {
        false
    }

    fn execute(
        &self,
        params: &MacroParameters,
        _content: Option<&str>,
        context: &mut MacroContext<'_>,
    ) -> Result<Vec<Block>, MacroExecutionError> {
        let reference = params.string("document").unwrap_or_default();
        let new_context = params.string("context") == Some("new");

        if !new_context && context.document() == Some(reference) {
            return Err(MacroExecutionError::Failed(format!(
                "Cannot include [{reference}] in itself"
            )));
        }

        let document = context.source()?.get(reference)?;
        tracing::debug!(reference, new_context, syntax = %document.syntax, "Including document");
        let mut xdom = context.parse(&document.content, &document.syntax)?;
        if new_context {
            context.transform_new(&mut xdom, document.syntax, Some(reference))?;
        }
        Ok(xdom.blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use wr_parser::{Parser, XWikiParser};
    use wr_xdom::{BlockKind, Syntax, Xdom};

    use crate::source::{DocumentSource, MemorySource, SourceDocument, SourceError, SourceErrorKind};
    use crate::{
        MacroRegistry, MacroTransformation, Transformation, TransformationContext,
        TransformationError,
    };

    fn transform(
        source: impl DocumentSource + 'static,
        content: &str,
        max_depth: usize,
    ) -> Result<Xdom, TransformationError> {
        let transformation = MacroTransformation::new(Arc::new(MacroRegistry::with_builtins()))
            .with_source(Arc::new(source));
        let mut xdom = XWikiParser.parse(content).unwrap();
        let mut context = TransformationContext::new(Syntax::XWIKI_2_0)
            .with_document("Main.Home")
            .with_max_depth(max_depth);
        transformation.transform(&mut xdom, &mut context)?;
        Ok(xdom)
    }

    fn words(xdom: &Xdom) -> Vec<String> {
        let mut words = Vec::new();
        xdom.walk(|_, block| {
            if let BlockKind::Word(word) = &block.kind {
                words.push(word.clone());
            }
        });
        words
    }

    fn errors(xdom: &Xdom) -> Vec<(String, String)> {
        let mut errors = Vec::new();
        xdom.walk(|_, block| {
            if let BlockKind::Error {
                message,
                description,
                ..
            } = &block.kind
            {
                errors.push((message.clone(), description.clone()));
            }
        });
        errors
    }

    fn other(content: &str) -> MemorySource {
        MemorySource::new().with_document("Main.Other", content, Syntax::XWIKI_2_0)
    }

    #[test]
    fn test_new_context_does_not_see_variables() {
        let xdom = transform(
            other(r#"{{get name="x" default="none"/}}"#),
            "{{set name=\"x\" value=\"1\"/}}\n\n{{include document=\"Main.Other\" context=\"new\"/}}",
            10,
        )
        .unwrap();
        assert_eq!(words(&xdom), vec!["none"]);
    }

    #[test]
    fn test_current_context_sees_variables() {
        let xdom = transform(
            other(r#"{{get name="x" default="none"/}}"#),
            "{{set name=\"x\" value=\"1\"/}}\n\n{{include document=\"Main.Other\"/}}",
            10,
        )
        .unwrap();
        assert_eq!(words(&xdom), vec!["1"]);
    }

    #[test]
    fn test_current_context_returns_macros_unexpanded() {
        // A single pass: the included call is left for the next pass.
        let xdom = transform(other("{{get name=\"x\"/}}"), "{{include document=\"Main.Other\"/}}", 1)
            .unwrap();
        let include = &xdom.blocks[0];
        assert!(matches!(&include.kind, BlockKind::MacroMarker(call) if call.id == "include"));
        assert!(matches!(&include.children[0].kind, BlockKind::MacroMarker(call) if call.id == "get"));
        assert_eq!(errors(&xdom)[0].0, "Maximum macro nesting exceeded");
    }

    #[test]
    fn test_new_context_transforms_included_document() {
        let xdom = transform(
            other("{{info}}Careful{{/info}}"),
            "{{include document=\"Main.Other\" context=\"new\"/}}",
            10,
        )
        .unwrap();
        let group = &xdom.blocks[0].children[0].children[0];
        assert_eq!(group.kind, BlockKind::Group);
        assert_eq!(group.params.get("class").map(String::as_str), Some("box infomessage"));
        assert_eq!(words(&xdom), vec!["Careful"]);
    }

    #[test]
    fn test_included_document_keeps_its_syntax() {
        let source = MemorySource::new().with_document("Main.Other", "# Hi", Syntax::MARKDOWN_1_0);
        let xdom = transform(source, "{{include document=\"Main.Other\"/}}", 10).unwrap();
        assert_eq!(
            xdom.blocks[0].children,
            vec![Block::heading(1, vec![Block::word("Hi")])]
        );
    }

    #[test]
    fn test_missing_document() {
        let xdom = transform(MemorySource::new(), "{{include document=\"Main.Missing\"/}}", 10).unwrap();
        assert_eq!(
            errors(&xdom),
            vec![(
                "Failed to execute the [include] macro".to_owned(),
                "Document not found [Main.Missing]".to_owned()
            )]
        );
    }

    #[test]
    fn test_missing_document_parameter() {
        let xdom = transform(MemorySource::new(), "{{include/}}", 10).unwrap();
        assert_eq!(errors(&xdom)[0].1, "Missing mandatory parameter [document]");
    }

    #[test]
    fn test_inline_include_is_rejected() {
        let xdom = transform(other("x"), "Text {{include document=\"Main.Other\"/}}", 10).unwrap();
        assert_eq!(
            errors(&xdom)[0].1,
            "The [include] macro is a standalone macro and it cannot be used inline"
        );
    }

    #[test]
    fn test_self_inclusion_in_current_context() {
        let source =
            MemorySource::new().with_document("Main.Home", "loop", Syntax::XWIKI_2_0);
        let xdom = transform(source, "{{include document=\"Main.Home\"/}}", 10).unwrap();
        assert_eq!(errors(&xdom)[0].1, "Cannot include [Main.Home] in itself");
    }

    #[test]
    fn test_recursive_new_inclusion_terminates() {
        let recursive = "{{include document=\"Main.Other\" context=\"new\"/}}";
        let xdom = transform(other(recursive), recursive, 4).unwrap();
        assert_eq!(
            errors(&xdom),
            vec![(
                "Maximum macro nesting exceeded".to_owned(),
                "The [include] macro was not expanded: nesting is limited to 4 levels".to_owned()
            )]
        );
    }

    #[test]
    fn test_unavailable_source_is_fatal() {
        struct Down;

        impl DocumentSource for Down {
            fn get(&self, reference: &str) -> Result<SourceDocument, SourceError> {
                Err(SourceError::new(SourceErrorKind::Unavailable, reference))
            }
        }

        let err = transform(Down, "{{include document=\"Main.Other\"/}}", 10).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.transformation(), "macro");
    }
}
