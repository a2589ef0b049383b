//! `wr render` command implementation.

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::Args;
use wr_config::{CliSettings, Config};
use wr_core::{ConvertRequest, Converter, syntax_for_path};
use wr_renderer::event_records;
use wr_xdom::Syntax;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Document to render, or `-` for stdin.
    file: PathBuf,

    /// Input syntax (default: from the file extension, then config).
    #[arg(short, long)]
    from: Option<Syntax>,

    /// Output syntax (default: from config).
    #[arg(short, long)]
    to: Option<Syntax>,

    /// Path to configuration file (default: auto-discover wr.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the output to a file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory included documents are read from (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Prefix of generated URLs (overrides config).
    #[arg(long, env = "WR_BASE_URL")]
    base_url: Option<String>,

    /// Macro nesting limit (overrides config).
    #[arg(long)]
    max_macro_depth: Option<usize>,

    /// Print event records as JSON (with `--to event/1.0`).
    #[arg(long)]
    json: bool,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration, reading, conversion or writing fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            default_syntax: None,
            target_syntax: self.to.clone(),
            max_macro_depth: self.max_macro_depth,
            source_dir: self.source_dir.clone(),
            base_url: self.base_url.clone(),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let from = self.resolve_from(&config);
        let to = config.rendering.target_syntax.clone();
        if self.json && to != Syntax::EVENT_1_0 {
            return Err(CliError::Validation(format!(
                "--json requires --to {}, got {to}",
                Syntax::EVENT_1_0
            )));
        }

        let content = read_input(&self.file)?;
        let document = document_reference(&self.file, &config.wiki.source_dir);
        tracing::info!(file = %self.file.display(), %from, %to, ?document, "Rendering");

        let converter = Converter::from_config(&config);
        let rendered = if self.json {
            let xdom = converter.transformed(&content, &from, document.as_deref())?;
            serde_json::to_string_pretty(&event_records(&xdom))?
        } else {
            let request = ConvertRequest {
                content,
                from,
                to,
                document,
            };
            converter.convert_request(&request)?
        };

        match &self.output {
            Some(path) => {
                std::fs::write(path, &rendered)?;
                output.success(&format!(
                    "Wrote {} bytes to {}",
                    rendered.len(),
                    path.display()
                ));
            }
            None => output.result(&rendered)?,
        }

        Ok(())
    }

    /// `--from`, else the file extension, else the configured default.
    fn resolve_from(&self, config: &Config) -> Syntax {
        self.from
            .clone()
            .or_else(|| syntax_for_path(&self.file))
            .unwrap_or_else(|| config.rendering.default_syntax.clone())
    }
}

fn read_input(file: &Path) -> Result<String, CliError> {
    if file == Path::new("-") {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content)?;
        Ok(content)
    } else {
        Ok(std::fs::read_to_string(file)?)
    }
}

/// Reference of `file` relative to the source directory, used to detect
/// self-inclusion.
fn document_reference(file: &Path, source_dir: &Path) -> Option<String> {
    let absolute = file.canonicalize().ok()?;
    let root = source_dir.canonicalize().ok()?;
    let relative = absolute.strip_prefix(root).ok()?;
    Some(relative.to_string_lossy().replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: RenderArgs,
    }

    fn parse(args: &[&str]) -> RenderArgs {
        TestCli::parse_from(std::iter::once("wr").chain(args.iter().copied())).args
    }

    #[test]
    fn test_from_flag_wins() {
        let args = parse(&["page.md", "--from", "creole/1.0"]);
        assert_eq!(args.resolve_from(&Config::default()), Syntax::CREOLE_1_0);
    }

    #[test]
    fn test_from_extension() {
        let args = parse(&["page.md"]);
        assert_eq!(args.resolve_from(&Config::default()), Syntax::MARKDOWN_1_0);
    }

    #[test]
    fn test_from_config_default() {
        let args = parse(&["README"]);
        assert_eq!(args.resolve_from(&Config::default()), Syntax::XWIKI_2_0);
    }

    #[test]
    fn test_malformed_syntax_rejected() {
        let result = TestCli::try_parse_from(["wr", "page.md", "--to", "xhtml"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_document_reference() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Main")).unwrap();
        let file = dir.path().join("Main/Home.xwiki");
        std::fs::write(&file, "x").unwrap();
        assert_eq!(
            document_reference(&file, dir.path()),
            Some("Main/Home.xwiki".to_owned())
        );
        assert_eq!(document_reference(&file, Path::new("/nonexistent")), None);
    }

    #[test]
    fn test_render_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("page.xwiki");
        let out = dir.path().join("page.txt");
        std::fs::write(&input, "= Title =\n\nSome **bold** text.").unwrap();
        std::fs::write(dir.path().join("wr.toml"), "").unwrap();

        let args = parse(&[
            input.to_str().unwrap(),
            "--to",
            "plain/1.0",
            "--config",
            dir.path().join("wr.toml").to_str().unwrap(),
            "--output",
            out.to_str().unwrap(),
        ]);
        args.execute().unwrap();
        assert_eq!(
            std::fs::read_to_string(&out).unwrap(),
            "Title\n\nSome bold text."
        );
    }

    #[test]
    fn test_json_requires_event_target() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("page.xwiki");
        std::fs::write(&input, "x").unwrap();
        std::fs::write(dir.path().join("wr.toml"), "").unwrap();
        let args = parse(&[
            input.to_str().unwrap(),
            "--json",
            "--config",
            dir.path().join("wr.toml").to_str().unwrap(),
        ]);
        assert!(matches!(args.execute(), Err(CliError::Validation(_))));
    }
}
