//! Canonical wiki document model.
//!
//! Every source syntax is parsed into the same tree ([`Xdom`] of [`Block`]s)
//! and every output syntax is produced from it. Parsers and renderers talk to
//! each other through the [`Listener`] event protocol:
//!
//! ```
//! use wr_xdom::{Block, Format, Xdom, XdomBuilder};
//!
//! let xdom = Xdom::new(vec![Block::paragraph(vec![
//!     Block::format(Format::Bold, vec![Block::word("bold")]),
//! ])]);
//!
//! let mut builder = XdomBuilder::new();
//! xdom.traverse(&mut builder);
//! assert_eq!(builder.finish().unwrap(), xdom);
//! ```

mod block;
mod builder;
mod listener;
mod reference;
mod syntax;
mod xdom;

pub use block::{Block, BlockKind, Format, ListKind, MacroCall, Parameters};
pub use builder::{BuildError, XdomBuilder};
pub use listener::{Event, Listener, Tag};
pub use reference::{ResourceReference, ResourceType};
pub use syntax::{Syntax, UnknownSyntaxError};
pub use xdom::{BlockPath, Xdom};
