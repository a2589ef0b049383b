//! Parse, transform and render in one call.

use std::sync::Arc;

use rayon::prelude::*;
use wr_config::{Config, ConfigError, WikiMacroConfig};
use wr_parser::ParserRegistry;
use wr_renderer::{DefaultWikiModel, RendererRegistry, WikiModel};
use wr_transform::{
    ContentMode, DEFAULT_MAX_DEPTH, DocumentSource, MacroDescriptor, MacroRegistry,
    MacroTransformation, ParameterDescriptor, ParameterType, Transformation,
    TransformationContext, TransformationManager, WikiMacro,
};
use wr_xdom::{Syntax, Xdom};

use crate::error::ConvertError;
use crate::fs_source::FsSource;

/// One document of a batch conversion.
#[derive(Debug, Clone)]
pub struct ConvertRequest {
    pub content: String,
    pub from: Syntax,
    pub to: Syntax,
    /// Reference of the document, used to resolve relative references and
    /// to detect self-inclusion.
    pub document: Option<String>,
}

impl ConvertRequest {
    pub fn new(content: impl Into<String>, from: Syntax, to: Syntax) -> Self {
        Self {
            content: content.into(),
            from,
            to,
            document: None,
        }
    }

    #[must_use]
    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.document = Some(document.into());
        self
    }
}

/// Conversion pipeline: parser lookup, transformations, renderer lookup.
///
/// Registries and collaborators are read-only during a conversion, so a
/// converter can be shared across threads. Each conversion gets its own
/// [`TransformationContext`].
///
/// # Example
///
/// ```
/// use wr_core::Converter;
/// use wr_xdom::Syntax;
///
/// let converter = Converter::new();
/// let html = converter
///     .convert("= Title =\n\nSome **bold** text.", &Syntax::XWIKI_2_0, &Syntax::XHTML_1_0)
///     .unwrap();
/// assert_eq!(
///     html,
///     r#"<h1 id="Htitle"><span>Title</span></h1><p>Some <strong>bold</strong> text.</p>"#
/// );
/// ```
#[derive(Clone)]
pub struct Converter {
    parsers: ParserRegistry,
    renderers: RendererRegistry,
    macros: Arc<MacroRegistry>,
    transformations: Vec<Arc<dyn Transformation>>,
    source: Option<Arc<dyn DocumentSource>>,
    wiki: Arc<dyn WikiModel>,
    max_depth: usize,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("parsers", &self.parsers)
            .field("renderers", &self.renderers)
            .field("macros", &self.macros.ids(None))
            .field(
                "transformations",
                &self.transformations.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

impl Converter {
    /// Converter with every built-in parser, renderer and macro, no document
    /// source and a [`DefaultWikiModel`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            parsers: ParserRegistry::new(),
            renderers: RendererRegistry::new(),
            macros: Arc::new(MacroRegistry::with_builtins()),
            transformations: Vec::new(),
            source: None,
            wiki: Arc::new(DefaultWikiModel::new()),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Converter set up from a loaded configuration.
    ///
    /// Disabled macros are unregistered, documents are included from
    /// `wiki.source_dir`, `[[macros.wiki]]` entries are registered, URLs are generated under `wiki.base_url` and
    /// `wiki.interwiki` defines the interwiki aliases.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let mut macros = MacroRegistry::with_builtins();
        for id in &config.macros.disabled {
            macros.unregister(id);
        }
        for entry in &config.macros.wiki {
            match wiki_macro(entry, &config.rendering.default_syntax) {
                Ok(m) => macros.register(Arc::new(m)),
                Err(err) => tracing::warn!(id = %entry.id, error = %err, "Skipping wiki macro"),
            }
        }
        let source = FsSource::new(&config.wiki.source_dir)
            .with_default_syntax(config.rendering.default_syntax.clone());
        let wiki = config.wiki.interwiki.iter().fold(
            DefaultWikiModel::new().with_base_url(&config.wiki.base_url),
            |wiki, (alias, prefix)| wiki.with_interwiki(alias, prefix),
        );
        let converter = Self::new()
            .with_macros(macros)
            .with_source(Arc::new(source))
            .with_wiki_model(Arc::new(wiki));
        match config.rendering.max_macro_depth {
            Some(depth) => converter.with_max_depth(depth),
            None => converter,
        }
    }

    #[must_use]
    pub fn with_parsers(mut self, parsers: ParserRegistry) -> Self {
        self.parsers = parsers;
        self
    }

    #[must_use]
    pub fn with_renderers(mut self, renderers: RendererRegistry) -> Self {
        self.renderers = renderers;
        self
    }

    /// Replace the macros expanded by the macro transformation.
    #[must_use]
    pub fn with_macros(mut self, macros: MacroRegistry) -> Self {
        self.macros = Arc::new(macros);
        self
    }

    /// Add a transformation run next to the macro transformation.
    #[must_use]
    pub fn with_transformation<T: Transformation + 'static>(mut self, transformation: T) -> Self {
        self.transformations.push(Arc::new(transformation));
        self
    }

    /// Source of documents pulled in by inclusion macros.
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn DocumentSource>) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn with_wiki_model(mut self, wiki: Arc<dyn WikiModel>) -> Self {
        self.wiki = wiki;
        self
    }

    /// Bound on macro nesting for every conversion.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn parsers(&self) -> &ParserRegistry {
        &self.parsers
    }

    pub fn renderers(&self) -> &RendererRegistry {
        &self.renderers
    }

    pub fn macros(&self) -> &MacroRegistry {
        &self.macros
    }

    /// Transformations in registration order, macro expansion first.
    fn manager(&self) -> TransformationManager {
        let mut macro_transformation =
            MacroTransformation::new(Arc::clone(&self.macros)).with_parsers(self.parsers.clone());
        if let Some(source) = &self.source {
            macro_transformation = macro_transformation.with_source(Arc::clone(source));
        }
        let mut manager = TransformationManager::new().with_transformation(macro_transformation);
        for transformation in &self.transformations {
            manager.register(Arc::clone(transformation));
        }
        manager
    }

    /// Fresh context for a document written in `syntax`.
    #[must_use]
    pub fn context(&self, syntax: Syntax, document: Option<&str>) -> TransformationContext {
        let context = TransformationContext::new(syntax).with_max_depth(self.max_depth);
        match document {
            Some(document) => context.with_document(document),
            None => context,
        }
    }

    /// Parse `content` written in `from`.
    ///
    /// # Errors
    ///
    /// Returns an error if no parser is registered for `from` or the content
    /// cannot form a document.
    pub fn parse(&self, content: &str, from: &Syntax, document: Option<&str>) -> Result<Xdom, ConvertError> {
        Ok(self.parsers.parse_with(content, from, document)?)
    }

    /// Run every transformation over `xdom`.
    ///
    /// # Errors
    ///
    /// Returns fatal transformation errors; recoverable ones become error
    /// blocks in the document.
    pub fn transform(
        &self,
        xdom: &mut Xdom,
        context: &mut TransformationContext,
    ) -> Result<(), ConvertError> {
        Ok(self.manager().apply_all(xdom, context)?)
    }

    /// Render `xdom` to `to`.
    ///
    /// # Errors
    ///
    /// Returns an error if no renderer is registered for `to`.
    pub fn render(&self, xdom: &Xdom, to: &Syntax) -> Result<String, ConvertError> {
        Ok(self.renderers.render(xdom, to, self.wiki.as_ref())?)
    }

    /// Parse and transform `content` written in `from`.
    ///
    /// # Errors
    ///
    /// See [`parse`](Self::parse) and [`transform`](Self::transform).
    pub fn transformed(
        &self,
        content: &str,
        from: &Syntax,
        document: Option<&str>,
    ) -> Result<Xdom, ConvertError> {
        let mut xdom = self.parse(content, from, document)?;
        let mut context = self.context(from.clone(), document);
        self.transform(&mut xdom, &mut context)?;
        Ok(xdom)
    }

    /// Convert `content` from one syntax to another.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown syntaxes, unparseable content or fatal
    /// transformation failures.
    pub fn convert(&self, content: &str, from: &Syntax, to: &Syntax) -> Result<String, ConvertError> {
        self.convert_request(&ConvertRequest::new(content, from.clone(), to.clone()))
    }

    /// Convert a single request.
    ///
    /// # Errors
    ///
    /// See [`convert`](Self::convert).
    pub fn convert_request(&self, request: &ConvertRequest) -> Result<String, ConvertError> {
        // Fail on an unknown target before doing any work.
        self.renderers.get(&request.to)?;
        let xdom = self.transformed(&request.content, &request.from, request.document.as_deref())?;
        let output = self.render(&xdom, &request.to)?;
        tracing::info!(
            from = %request.from,
            to = %request.to,
            document = request.document.as_deref().unwrap_or_default(),
            bytes = output.len(),
            "Converted document"
        );
        Ok(output)
    }

    /// Convert many documents in parallel.
    ///
    /// Results are in request order; each document has its own context.
    pub fn convert_batch(&self, requests: &[ConvertRequest]) -> Vec<Result<String, ConvertError>> {
        requests
            .par_iter()
            .map(|request| self.convert_request(request))
            .collect()
    }
}

/// Wiki macro declared by a `[[macros.wiki]]` entry.
fn wiki_macro(entry: &WikiMacroConfig, default_syntax: &Syntax) -> Result<WikiMacro, ConfigError> {
    let mut descriptor = MacroDescriptor::new(entry.id.clone(), entry.description.clone())
        .with_content(ContentMode::Optional);
    for parameter in &entry.parameters {
        let mut declared = ParameterDescriptor::new(parameter.name.clone(), ParameterType::String)
            .with_description(parameter.description.clone());
        if parameter.mandatory {
            declared = declared.mandatory();
        }
        if let Some(default) = &parameter.default {
            declared = declared.with_default(default.clone());
        }
        descriptor = descriptor.with_parameter(declared);
    }
    let syntax = entry.body_syntax(default_syntax)?;
    Ok(WikiMacro::new(descriptor, entry.body.clone(), syntax).with_inline_support(!entry.standalone))
}

#[cfg(test)]
mod tests {
    // Converters are shared between threads by convert_batch.
    static_assertions::assert_impl_all!(super::Converter: Send, Sync);

    use std::path::PathBuf;

    use pretty_assertions::assert_eq;
    use wr_renderer::MockWikiModel;
    use wr_transform::MemorySource;
    use wr_xdom::UnknownSyntaxError;

    use super::*;

    #[test]
    fn test_convert_scenario_to_plain() {
        let text = Converter::new()
            .convert("= Title =\n\nSome **bold** text.", &Syntax::XWIKI_2_0, &Syntax::PLAIN_1_0)
            .unwrap();
        assert_eq!(text, "Title\n\nSome bold text.");
    }

    #[test]
    fn test_unknown_target_fails_before_parsing() {
        let err = Converter::new()
            .convert("x", &Syntax::new("nope", "1.0"), &Syntax::CREOLE_1_0)
            .unwrap_err();
        assert!(matches!(
            err,
            ConvertError::UnknownSyntax(UnknownSyntaxError::NoRenderer(_))
        ));
    }

    #[test]
    fn test_unknown_source_syntax() {
        let err = Converter::new()
            .convert("x", &Syntax::new("nope", "1.0"), &Syntax::XHTML_1_0)
            .unwrap_err();
        assert!(matches!(err, ConvertError::Parse(_)));
        assert!(err.to_string().contains("nope/1.0"));
    }

    #[test]
    fn test_macros_are_expanded() {
        let text = Converter::new()
            .convert(
                "{{set name=\"who\" value=\"world\"/}}Hello {{get name=\"who\"/}}",
                &Syntax::XWIKI_2_0,
                &Syntax::PLAIN_1_0,
            )
            .unwrap();
        assert_eq!(text, "Hello world");
    }

    #[test]
    fn test_include_from_source() {
        let source = MemorySource::new().with_document("Main.Other", "**Included**", Syntax::XWIKI_2_0);
        let text = Converter::new()
            .with_source(Arc::new(source))
            .convert(
                "Before\n\n{{include document=\"Main.Other\"/}}",
                &Syntax::XWIKI_2_0,
                &Syntax::PLAIN_1_0,
            )
            .unwrap();
        assert_eq!(text, "Before\n\nIncluded");
    }

    #[test]
    fn test_wiki_model_is_used_for_links() {
        let html = Converter::new()
            .with_wiki_model(Arc::new(MockWikiModel::new()))
            .convert("[[Main.Missing]]", &Syntax::XWIKI_2_0, &Syntax::XHTML_1_0)
            .unwrap();
        assert!(html.contains("wikicreatelink"), "{html}");
        assert!(html.contains("edit:Main.Missing"), "{html}");
    }

    #[test]
    fn test_from_config_disables_macros() {
        let mut config = Config::default();
        config.macros.disabled = vec!["GET".to_owned()];
        config.wiki.source_dir = PathBuf::from("/nonexistent");
        let converter = Converter::from_config(&config);
        assert!(!converter.macros().exists("get", None));
        assert!(converter.macros().exists("set", None));

        let text = converter
            .convert("{{get name=\"x\"/}}", &Syntax::XWIKI_2_0, &Syntax::PLAIN_1_0)
            .unwrap();
        assert_eq!(text, "Unknown macro: get");
    }

    #[test]
    fn test_from_config_registers_wiki_macros() {
        let mut config = Config::default();
        config.macros.wiki.push(WikiMacroConfig {
            id: "greet".to_owned(),
            body: "Hello {{get name=\"macro.params.who\"/}}".to_owned(),
            parameters: vec![wr_config::WikiMacroParameterConfig {
                name: "who".to_owned(),
                default: Some("you".to_owned()),
                ..Default::default()
            }],
            ..Default::default()
        });
        let converter = Converter::from_config(&config);
        assert!(converter.macros().exists("greet", None));

        let text = converter
            .convert(
                "{{greet who=\"Ann\"/}}\n\nAnd {{greet/}}.",
                &Syntax::XWIKI_2_0,
                &Syntax::PLAIN_1_0,
            )
            .unwrap();
        assert_eq!(text, "Hello Ann\n\nAnd Hello you.");
    }

    #[test]
    fn test_from_config_max_depth() {
        let mut config = Config::default();
        config.rendering.max_macro_depth = Some(3);
        let converter = Converter::from_config(&config);
        assert_eq!(converter.context(Syntax::XWIKI_2_0, None).max_depth(), 3);
    }

    #[test]
    fn test_from_config_interwiki_aliases() {
        let mut config = Config::default();
        config
            .wiki
            .interwiki
            .insert("wikipedia".to_owned(), "https://en.wikipedia.org/wiki/".to_owned());
        let html = Converter::from_config(&config)
            .convert("[[Rust@wikipedia]]", &Syntax::XWIKI_2_0, &Syntax::XHTML_1_0)
            .unwrap();
        assert!(html.contains(r#"href="https://en.wikipedia.org/wiki/Rust""#), "{html}");
    }

    #[test]
    fn test_convert_batch_keeps_order_and_isolates_contexts() {
        let requests: Vec<ConvertRequest> = (0..16)
            .map(|i| {
                ConvertRequest::new(
                    format!("{{{{set name=\"n\" value=\"{i}\"/}}}}{{{{get name=\"n\"/}}}}"),
                    Syntax::XWIKI_2_0,
                    Syntax::PLAIN_1_0,
                )
            })
            .chain([ConvertRequest::new("x", Syntax::XWIKI_2_0, Syntax::new("bad", "1"))])
            .collect();
        let results = Converter::new().convert_batch(&requests);
        assert_eq!(results.len(), 17);
        for (i, result) in results[..16].iter().enumerate() {
            assert_eq!(result.as_ref().unwrap(), &i.to_string());
        }
        assert!(results[16].is_err());
    }
}
