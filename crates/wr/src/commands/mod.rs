//! CLI command implementations.

pub(crate) mod macros;
pub(crate) mod render;
pub(crate) mod syntaxes;

pub(crate) use macros::MacrosArgs;
pub(crate) use render::RenderArgs;
