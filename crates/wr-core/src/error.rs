//! Pipeline error.

use wr_config::ConfigError;
use wr_parser::ParseError;
use wr_transform::TransformationError;
use wr_xdom::UnknownSyntaxError;

/// Failure of a conversion.
///
/// Problems inside a document (unknown macros, broken links, failing
/// transformations) do not fail the conversion; they show up as error blocks
/// in the output.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error(transparent)]
    UnknownSyntax(#[from] UnknownSyntaxError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Transformation(#[from] TransformationError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
