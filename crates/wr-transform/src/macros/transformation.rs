//! Expansion of macro calls.

use std::sync::Arc;

use wr_parser::ParserRegistry;
use wr_xdom::{Block, BlockKind, BlockPath, MacroCall, Xdom};

use crate::context::TransformationContext;
use crate::error::{MacroExecutionError, MacroLookupError, TransformationError};
use crate::macros::{ContentMode, Macro, MacroContext, MacroParameters, MacroRegistry};
use crate::source::DocumentSource;
use crate::transformation::Transformation;

/// Priority of the macro transformation.
pub const MACRO_TRANSFORMATION_PRIORITY: u32 = 100;

const NAME: &str = "macro";

/// Transformation expanding every macro call of a document.
///
/// Each pass collects the unexpanded calls, orders them by macro priority
/// (document order on ties) and replaces each call with a macro marker holding
/// its output. Output may contain new calls, so passes repeat until none are
/// left or the context's nesting bound is reached. Calls left at that point
/// are replaced by markers holding an error.
#[derive(Clone)]
pub struct MacroTransformation {
    registry: Arc<MacroRegistry>,
    parsers: ParserRegistry,
    source: Option<Arc<dyn DocumentSource>>,
    priority: u32,
}

struct Occurrence {
    path: BlockPath,
    call: MacroCall,
    found: Result<Arc<dyn Macro>, MacroLookupError>,
}

impl Occurrence {
    fn priority(&self) -> u32 {
        // Unknown macros first so their errors are reported deterministically.
        self.found.as_ref().map_or(0, |m| m.priority())
    }
}

impl MacroTransformation {
    #[must_use]
    pub fn new(registry: Arc<MacroRegistry>) -> Self {
        Self {
            registry,
            parsers: ParserRegistry::new(),
            source: None,
            priority: MACRO_TRANSFORMATION_PRIORITY,
        }
    }

    /// Parsers used by macros that parse content.
    #[must_use]
    pub fn with_parsers(mut self, parsers: ParserRegistry) -> Self {
        self.parsers = parsers;
        self
    }

    /// Source consulted by inclusion macros.
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn DocumentSource>) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn registry(&self) -> &MacroRegistry {
        &self.registry
    }

    pub fn parsers(&self) -> &ParserRegistry {
        &self.parsers
    }

    pub fn source(&self) -> Option<&dyn DocumentSource> {
        self.source.as_deref()
    }

    fn collect(&self, xdom: &Xdom, context: &TransformationContext) -> Vec<Occurrence> {
        let mut occurrences: Vec<Occurrence> = xdom
            .find_all(|block| matches!(block.kind, BlockKind::Macro(_)))
            .into_iter()
            .filter_map(|path| match &xdom.get(&path)?.kind {
                BlockKind::Macro(call) => Some(Occurrence {
                    found: self.registry.lookup(&call.id, Some(context.syntax())),
                    call: call.clone(),
                    path,
                }),
                _ => None,
            })
            .collect();
        occurrences.sort_by_key(Occurrence::priority);
        occurrences
    }

    fn expand(
        &self,
        occurrence: Occurrence,
        context: &mut TransformationContext,
    ) -> Result<Block, TransformationError> {
        let Occurrence { path, call, found } = occurrence;
        let children = match found {
            Ok(m) => match self.execute(m.as_ref(), &call, context) {
                Ok(blocks) => blocks,
                Err(err) if err.is_fatal() => {
                    return Err(TransformationError::fatal(NAME, err.to_string()));
                }
                Err(err) => {
                    tracing::warn!(id = %call.id, error = %err, "Macro execution failed");
                    vec![Block::error(
                        format!("Failed to execute the [{}] macro", call.id),
                        err.to_string(),
                        call.inline,
                    )]
                }
            },
            Err(err) => {
                tracing::warn!(id = %call.id, ?path, "Unknown macro");
                vec![Block::error(
                    err.to_string(),
                    format!("The [{}] macro is not registered", call.id),
                    call.inline,
                )]
            }
        };
        Ok(Block::new(BlockKind::MacroMarker(call)).with_children(children))
    }

    fn execute(
        &self,
        m: &dyn Macro,
        call: &MacroCall,
        context: &mut TransformationContext,
    ) -> Result<Vec<Block>, MacroExecutionError> {
        if call.inline && !m.supports_inline() {
            return Err(MacroExecutionError::InlineNotSupported {
                id: call.id.clone(),
            });
        }
        let descriptor = m.descriptor();
        let params = MacroParameters::bind(descriptor, &call.params)?;
        let content = match descriptor.content {
            ContentMode::None => None,
            ContentMode::Optional => call.content.as_deref(),
            ContentMode::Mandatory => Some(
                call.content
                    .as_deref()
                    .ok_or(MacroExecutionError::MissingContent)?,
            ),
        };

        let mut macro_context = MacroContext::new(call, context, self);
        let blocks = m.execute(&params, content, &mut macro_context)?;

        // Standalone calls producing only inline content form a paragraph.
        if !call.inline && !blocks.is_empty() && blocks.iter().all(Block::is_inline) {
            return Ok(vec![Block::paragraph(blocks)]);
        }
        Ok(blocks)
    }

    fn give_up(xdom: &mut Xdom, occurrences: Vec<Occurrence>, max_depth: usize) {
        for Occurrence { path, call, .. } in occurrences {
            tracing::warn!(id = %call.id, max_depth, "Maximum macro nesting exceeded");
            let error = Block::error(
                "Maximum macro nesting exceeded",
                format!(
                    "The [{}] macro was not expanded: nesting is limited to {max_depth} levels",
                    call.id
                ),
                call.inline,
            );
            let marker = Block::new(BlockKind::MacroMarker(call)).with_children(vec![error]);
            xdom.replace(&path, marker);
        }
    }
}

impl Transformation for MacroTransformation {
    fn name(&self) -> &str {
        NAME
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn transform(
        &self,
        xdom: &mut Xdom,
        context: &mut TransformationContext,
    ) -> Result<(), TransformationError> {
        let base = context.depth();
        let mut level = base;
        let result = loop {
            let occurrences = self.collect(xdom, context);
            if occurrences.is_empty() {
                break Ok(());
            }
            if level >= context.max_depth() {
                Self::give_up(xdom, occurrences, context.max_depth());
                break Ok(());
            }
            tracing::debug!(level, count = occurrences.len(), "Expanding macros");
            context.set_depth(level);
            let mut failure = None;
            for occurrence in occurrences {
                let path = occurrence.path.clone();
                match self.expand(occurrence, context) {
                    Ok(marker) => {
                        xdom.replace(&path, marker);
                    }
                    Err(err) => {
                        failure = Some(err);
                        break;
                    }
                }
            }
            if let Some(err) = failure {
                break Err(err);
            }
            level += 1;
        };
        context.set_depth(base);
        result
    }
}

impl std::fmt::Debug for MacroTransformation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MacroTransformation")
            .field("registry", &self.registry)
            .field("priority", &self.priority)
            .field("has_source", &self.source.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macros::MacroDescriptor;
    use crate::source::{SourceError, SourceErrorKind};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use wr_parser::{Parser, XWikiParser};
    use wr_xdom::Syntax;

    /// Emits a paragraph with one fixed word.
    struct Simple {
        descriptor: MacroDescriptor,
        word: &'static str,
        priority: u32,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Macro for Simple {
        fn descriptor(&self) -> &MacroDescriptor {
            &self.descriptor
        }

        fn priority(&self) -> u32 {
            self.priority
        }

        fn execute(
            &self,
            _params: &MacroParameters,
            _content: Option<&str>,
            _context: &mut MacroContext<'_>,
        ) -> Result<Vec<Block>, MacroExecutionError> {
            self.log.lock().unwrap().push(self.descriptor.id.to_string());
            Ok(vec![Block::paragraph(vec![Block::word(self.word)])])
        }
    }

    /// Emits a call to another macro.
    struct Emit {
        descriptor: MacroDescriptor,
        target: &'static str,
    }

    impl Macro for Emit {
        fn descriptor(&self) -> &MacroDescriptor {
            &self.descriptor
        }

        fn execute(
            &self,
            _params: &MacroParameters,
            _content: Option<&str>,
            _context: &mut MacroContext<'_>,
        ) -> Result<Vec<Block>, MacroExecutionError> {
            Ok(vec![Block::new(BlockKind::Macro(MacroCall::new(self.target, false)))])
        }
    }

    /// Parses its content.
    struct Content(MacroDescriptor);

    impl Macro for Content {
        fn descriptor(&self) -> &MacroDescriptor {
            &self.0
        }

        fn execute(
            &self,
            _params: &MacroParameters,
            content: Option<&str>,
            context: &mut MacroContext<'_>,
        ) -> Result<Vec<Block>, MacroExecutionError> {
            context.parse_content(content.unwrap_or_default())
        }
    }

    struct Broken {
        descriptor: MacroDescriptor,
        fatal: bool,
    }

    impl Macro for Broken {
        fn descriptor(&self) -> &MacroDescriptor {
            &self.descriptor
        }

        fn execute(
            &self,
            _params: &MacroParameters,
            _content: Option<&str>,
            _context: &mut MacroContext<'_>,
        ) -> Result<Vec<Block>, MacroExecutionError> {
            if self.fatal {
                Err(SourceError::new(SourceErrorKind::Unavailable, "db").into())
            } else {
                Err(MacroExecutionError::Failed("boom".to_owned()))
            }
        }
    }

    fn simple(
        id: &'static str,
        word: &'static str,
        priority: u32,
        log: &Arc<Mutex<Vec<String>>>,
    ) -> Simple {
        Simple {
            descriptor: MacroDescriptor::new(id, "test"),
            word,
            priority,
            log: Arc::clone(log),
        }
    }

    fn call(id: &str) -> Block {
        Block::new(BlockKind::Macro(MacroCall::new(id, false)))
    }

    fn run(registry: MacroRegistry, blocks: Vec<Block>, max_depth: usize) -> Xdom {
        let transformation = MacroTransformation::new(Arc::new(registry));
        let mut xdom = Xdom::new(blocks);
        let mut context = TransformationContext::new(Syntax::XWIKI_2_0).with_max_depth(max_depth);
        transformation.transform(&mut xdom, &mut context).unwrap();
        assert_eq!(context.depth(), 0);
        xdom
    }

    fn marker(id: &str, children: Vec<Block>) -> Block {
        Block::new(BlockKind::MacroMarker(MacroCall::new(id, false))).with_children(children)
    }

    #[test]
    fn test_simple_macro() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = MacroRegistry::new().with_macro(simple("testsimplemacro", "simplemacro0", 1000, &log));
        let xdom = run(registry, vec![call("testsimplemacro")], 10);
        assert_eq!(
            xdom.blocks,
            vec![marker(
                "testsimplemacro",
                vec![Block::paragraph(vec![Block::word("simplemacro0")])]
            )]
        );
    }

    #[test]
    fn test_nested_macro() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = MacroRegistry::new()
            .with_macro(simple("testsimplemacro", "simplemacro0", 1000, &log))
            .with_macro(Emit {
                descriptor: MacroDescriptor::new("testnestedmacro", "test"),
                target: "testsimplemacro",
            });
        let xdom = run(registry, vec![call("testnestedmacro")], 10);
        assert_eq!(
            xdom.blocks,
            vec![marker(
                "testnestedmacro",
                vec![marker(
                    "testsimplemacro",
                    vec![Block::paragraph(vec![Block::word("simplemacro0")])]
                )]
            )]
        );
    }

    #[test]
    fn test_infinite_recursion_terminates() {
        let registry = MacroRegistry::new().with_macro(Emit {
            descriptor: MacroDescriptor::new("testrecursivemacro", "test"),
            target: "testrecursivemacro",
        });
        let xdom = run(registry, vec![call("testrecursivemacro")], 5);

        let mut depth = 0;
        let mut block = &xdom.blocks[0];
        while let Some(child) = block.children.first()
            && matches!(block.kind, BlockKind::MacroMarker(_))
        {
            depth += 1;
            block = child;
        }
        // Five expansions, then a marker holding the error.
        assert_eq!(depth, 6);
        assert!(matches!(
            &block.kind,
            BlockKind::Error { message, .. } if message == "Maximum macro nesting exceeded"
        ));
    }

    #[test]
    fn test_priorities() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = MacroRegistry::new()
            .with_macro(simple("testsimplemacro", "simple", 1000, &log))
            .with_macro(simple("testprioritymacro", "word", 10, &log));
        let xdom = run(registry, vec![call("testsimplemacro"), call("testprioritymacro")], 10);

        assert_eq!(*log.lock().unwrap(), vec!["testprioritymacro", "testsimplemacro"]);
        // Document order is unchanged.
        assert_eq!(xdom.text(), "simple\nword");
    }

    #[test]
    fn test_equal_priorities_follow_document_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = MacroRegistry::new()
            .with_macro(simple("a", "a", 5, &log))
            .with_macro(simple("b", "b", 5, &log));
        run(registry, vec![call("b"), call("a"), call("b")], 10);
        assert_eq!(*log.lock().unwrap(), vec!["b", "a", "b"]);
    }

    #[test]
    fn test_leading_and_trailing_newlines_in_content() {
        let registry = MacroRegistry::new().with_macro(Content(MacroDescriptor::new("testcontentmacro", "test")));
        let block = Block::new(BlockKind::Macro(
            MacroCall::new("testcontentmacro", false).with_content("\nhello\n"),
        ));
        let xdom = run(registry, vec![block], 10);
        let words = xdom.find_all(|b| matches!(b.kind, BlockKind::Word(_)));
        assert_eq!(xdom.get(&words[0]), Some(&Block::word("hello")));
    }

    #[test]
    fn test_failures_are_contained() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = MacroRegistry::new()
            .with_macro(simple("ok", "fine", 1000, &log))
            .with_macro(Broken {
                descriptor: MacroDescriptor::new("broken", "test"),
                fatal: false,
            });
        let xdom = run(registry, vec![call("ok"), call("broken"), call("unknown"), call("ok")], 10);

        assert_eq!(*log.lock().unwrap(), vec!["ok", "ok"]);
        assert_eq!(xdom.blocks[0], marker("ok", vec![Block::paragraph(vec![Block::word("fine")])]));
        assert_eq!(xdom.blocks[3], xdom.blocks[0]);
        assert!(matches!(
            &xdom.blocks[1].children[0].kind,
            BlockKind::Error { message, description, inline: false }
                if message == "Failed to execute the [broken] macro" && description == "boom"
        ));
        assert!(matches!(
            &xdom.blocks[2].children[0].kind,
            BlockKind::Error { message, .. } if message == "Unknown macro: unknown"
        ));
    }

    #[test]
    fn test_fatal_failure_propagates() {
        let registry = MacroRegistry::new().with_macro(Broken {
            descriptor: MacroDescriptor::new("broken", "test"),
            fatal: true,
        });
        let transformation = MacroTransformation::new(Arc::new(registry));
        let mut xdom = Xdom::new(vec![call("broken")]);
        let mut context = TransformationContext::new(Syntax::XWIKI_2_0);
        let err = transformation.transform(&mut xdom, &mut context).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_inline_macro_in_parsed_document() {
        let registry = MacroRegistry::new().with_macro(Content(MacroDescriptor::new("echo", "test")));
        let parsed = XWikiParser.parse("Say {{echo}}**hi**{{/echo}} now").unwrap();
        let xdom = run(registry, parsed.blocks, 10);
        let paragraph = &xdom.blocks[0];
        assert_eq!(paragraph.kind, BlockKind::Paragraph);
        // The inline result is unwrapped from its paragraph.
        assert_eq!(
            paragraph.children[2].children,
            vec![Block::format(wr_xdom::Format::Bold, vec![Block::word("hi")])]
        );
    }

    #[test]
    fn test_standalone_only_macro_used_inline() {
        struct Standalone(MacroDescriptor);

        impl Macro for Standalone {
            fn descriptor(&self) -> &MacroDescriptor {
                &self.0
            }

            fn supports_inline(&self) -> bool {
                false
            }

            fn execute(
                &self,
                _params: &MacroParameters,
                _content: Option<&str>,
                _context: &mut MacroContext<'_>,
            ) -> Result<Vec<Block>, MacroExecutionError> {
                Ok(Vec::new())
            }
        }

        let registry = MacroRegistry::new().with_macro(Standalone(MacroDescriptor::new("box", "test")));
        let inline = Block::paragraph(vec![Block::new(BlockKind::Macro(MacroCall::new("box", true)))]);
        let xdom = run(registry, vec![inline], 10);
        assert!(matches!(
            &xdom.blocks[0].children[0].children[0].kind,
            BlockKind::Error { description, inline: true, .. }
                if description == "The [box] macro is a standalone macro and it cannot be used inline"
        ));
    }
}
