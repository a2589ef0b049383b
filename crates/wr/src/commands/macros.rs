//! `wr macros` command implementation.

use std::path::PathBuf;

use clap::Args;
use wr_config::Config;
use wr_core::Converter;
use wr_transform::{ContentMode, MacroDescriptor};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the macros command.
#[derive(Args)]
pub(crate) struct MacrosArgs {
    /// Path to configuration file (default: auto-discover wr.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl MacrosArgs {
    /// List the macros enabled by the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = Config::load(self.config.as_deref(), None)?;
        let converter = Converter::from_config(&config);
        let macros = converter.macros();

        output.highlight("Macros:");
        for id in macros.ids(None) {
            if let Ok(m) = macros.lookup(&id, None) {
                output.result(&format!("  {}", describe(m.descriptor())))?;
            }
        }
        if !config.macros.disabled.is_empty() {
            output.info(&format!("Disabled: {}", config.macros.disabled.join(", ")));
        }
        Ok(())
    }
}

/// `id(param*, other) [content]: description`, mandatory parameters starred.
fn describe(descriptor: &MacroDescriptor) -> String {
    let params: Vec<String> = descriptor
        .parameters
        .iter()
        .map(|p| {
            if p.mandatory {
                format!("{}*", p.name)
            } else {
                p.name.to_string()
            }
        })
        .collect();
    let content = match descriptor.content {
        ContentMode::None => "",
        ContentMode::Optional => " [content]",
        ContentMode::Mandatory => " content",
    };
    format!(
        "{}({}){content}: {}",
        descriptor.id,
        params.join(", "),
        descriptor.description
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wr_transform::Macro;
    use wr_transform::macros::builtin::IncludeMacro;

    #[test]
    fn test_describe_include() {
        assert_eq!(
            describe(IncludeMacro::new().descriptor()),
            "include(document*, context): Include another document"
        );
    }
}
