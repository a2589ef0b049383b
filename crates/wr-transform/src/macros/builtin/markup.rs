//! Macros producing a single markup block.

use wr_xdom::{Block, BlockKind, Syntax};

use crate::error::MacroExecutionError;
use crate::macros::{
    ContentMode, Macro, MacroContext, MacroDescriptor, MacroParameters, ParameterDescriptor,
    ParameterType,
};

/// `{{code language="rust"}}...{{/code}}`: verbatim content.
#[derive(Debug)]
pub struct CodeMacro {
    descriptor: MacroDescriptor,
}

impl CodeMacro {
    #[must_use]
    pub fn new() -> Self {
        let descriptor = MacroDescriptor::new("code", "Display content verbatim")
            .with_parameter(
                ParameterDescriptor::new("language", ParameterType::String)
                    .with_description("Language of the content"),
            )
            .with_content(ContentMode::Mandatory);
        Self { descriptor }
    }
}

impl Default for CodeMacro {
    fn default() -> Self {
        Self::new()
    }
}

impl Macro for CodeMacro {
    fn descriptor(&self) -> &MacroDescriptor {
        &self.descriptor
    }

    fn execute(
        &self,
        params: &MacroParameters,
        content: Option<&str>,
        context: &mut MacroContext<'_>,
    ) -> Result<Vec<Block>, MacroExecutionError> {
        let mut block = Block::new(BlockKind::Verbatim {
            text: content.unwrap_or_default().to_owned(),
            inline: context.is_inline(),
        });
        if let Some(language) = params.string("language") {
            block = block.with_param("language", language);
        }
        Ok(vec![block])
    }
}

/// `{{html}}...{{/html}}`: XHTML passed to the output untouched.
#[derive(Debug)]
pub struct HtmlMacro {
    descriptor: MacroDescriptor,
}

impl HtmlMacro {
    #[must_use]
    pub fn new() -> Self {
        let descriptor = MacroDescriptor::new("html", "Insert raw XHTML")
            .with_content(ContentMode::Mandatory);
        Self { descriptor }
    }
}

impl Default for HtmlMacro {
    fn default() -> Self {
        Self::new()
    }
}

impl Macro for HtmlMacro {
    fn descriptor(&self) -> &MacroDescriptor {
        &self.descriptor
    }

    fn execute(
        &self,
        _params: &MacroParameters,
        content: Option<&str>,
        _context: &mut MacroContext<'_>,
    ) -> Result<Vec<Block>, MacroExecutionError> {
        Ok(vec![Block::new(BlockKind::Raw {
            text: content.unwrap_or_default().to_owned(),
            syntax: Syntax::XHTML_1_0,
        })])
    }
}

/// `{{id name="anchor"/}}`: a link target.
#[derive(Debug)]
pub struct IdMacro {
    descriptor: MacroDescriptor,
}

impl IdMacro {
    #[must_use]
    pub fn new() -> Self {
        let descriptor = MacroDescriptor::new("id", "Insert an anchor")
            .with_parameter(ParameterDescriptor::new("name", ParameterType::String).mandatory())
            .with_content(ContentMode::None);
        Self { descriptor }
    }
}

impl Default for IdMacro {
    fn default() -> Self {
        Self::new()
    }
}

impl Macro for IdMacro {
    fn descriptor(&self) -> &MacroDescriptor {
        &self.descriptor
    }

    fn execute(
        &self,
        params: &MacroParameters,
        _content: Option<&str>,
        _context: &mut MacroContext<'_>,
    ) -> Result<Vec<Block>, MacroExecutionError> {
        let name = params.string("name").unwrap_or_default();
        Ok(vec![Block::new(BlockKind::Id(name.to_owned()))])
    }
}
