//! `wr syntaxes` command implementation.

use wr_core::Converter;

use crate::error::CliError;
use crate::output::Output;

/// List the syntaxes that can be read and written.
///
/// # Errors
///
/// Returns an error if stdout cannot be written.
pub(crate) fn execute() -> Result<(), CliError> {
    let output = Output::new();
    let converter = Converter::new();

    output.highlight("Input syntaxes:");
    for syntax in converter.parsers().syntaxes() {
        output.result(&format!("  {syntax}"))?;
    }
    output.highlight("Output syntaxes:");
    for syntax in converter.renderers().syntaxes() {
        output.result(&format!("  {syntax}"))?;
    }
    Ok(())
}
