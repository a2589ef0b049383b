//! Context variables.

use wr_parser::text_blocks;
use wr_xdom::Block;

use crate::error::MacroExecutionError;
use crate::macros::{
    ContentMode, Macro, MacroContext, MacroDescriptor, MacroParameters, ParameterDescriptor,
    ParameterType,
};

/// `{{set name="x" value="1"/}}`: store a variable in the current context.
#[derive(Debug)]
pub struct SetMacro {
    descriptor: MacroDescriptor,
}

impl SetMacro {
    #[must_use]
    pub fn new() -> Self {
        let descriptor = MacroDescriptor::new("set", "Set a context variable")
            .with_parameter(ParameterDescriptor::new("name", ParameterType::String).mandatory())
            .with_parameter(ParameterDescriptor::new("value", ParameterType::String).with_default(""))
            .with_content(ContentMode::None);
        Self { descriptor }
    }
}

impl Default for SetMacro {
    fn default() -> Self {
        Self::new()
    }
}

impl Macro for SetMacro {
    fn descriptor(&self) -> &MacroDescriptor {
        &self.descriptor
    }

    fn execute(
        &self,
        params: &MacroParameters,
        _content: Option<&str>,
        context: &mut MacroContext<'_>,
    ) -> Result<Vec<Block>, MacroExecutionError> {
        let name = params.string("name").unwrap_or_default();
        let value = params.string("value").unwrap_or_default();
        context
            .transformation_context_mut()
            .set_variable(name, value);
        Ok(Vec::new())
    }
}

/// `{{get name="x" default="?"/}}`: print a variable of the current context.
#[derive(Debug)]
pub struct GetMacro {
    descriptor: MacroDescriptor,
}

impl GetMacro {
    #[must_use]
    pub fn new() -> Self {
        let descriptor = MacroDescriptor::new("get", "Print a context variable")
            .with_parameter(ParameterDescriptor::new("name", ParameterType::String).mandatory())
            .with_parameter(ParameterDescriptor::new("default", ParameterType::String))
            .with_content(ContentMode::None);
        Self { descriptor }
    }
}

impl Default for GetMacro {
    fn default() -> Self {
        Self::new()
    }
}

impl Macro for GetMacro {
    fn descriptor(&self) -> &MacroDescriptor {
        &self.descriptor
    }

    fn execute(
        &self,
        params: &MacroParameters,
        _content: Option<&str>,
        context: &mut MacroContext<'_>,
    ) -> Result<Vec<Block>, MacroExecutionError> {
        let name = params.string("name").unwrap_or_default();
        let value = context
            .transformation_context()
            .variable(name)
            .or_else(|| params.string("default"))
            .unwrap_or_default();
        Ok(text_blocks(value))
    }
}
