//! Wiki document conversion pipeline.
//!
//! [`Converter`] ties the parsers, the transformation pipeline and the
//! renderers together: raw text in a source syntax is parsed into an
//! [`Xdom`](wr_xdom::Xdom), macros and other transformations run over it, and
//! a renderer for the target syntax serializes the result.
//!
//! [`FsSource`] lets inclusion macros read other documents from a directory.

mod converter;
mod error;
mod fs_source;

pub use converter::{ConvertRequest, Converter};
pub use error::ConvertError;
pub use fs_source::{FsSource, syntax_for_path};
