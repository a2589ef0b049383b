//! Macros available out of the box.

mod include;
mod markup;
mod message;
mod variables;

pub use include::IncludeMacro;
pub use markup::{CodeMacro, HtmlMacro, IdMacro};
pub use message::{MessageKind, MessageMacro};
pub use variables::{GetMacro, SetMacro};

use std::sync::Arc;

use crate::macros::MacroRegistry;

/// Register every built-in macro for all syntaxes.
pub(crate) fn register_all(registry: &mut MacroRegistry) {
    registry.register(Arc::new(IncludeMacro::new()));
    registry.register(Arc::new(SetMacro::new()));
    registry.register(Arc::new(GetMacro::new()));
    for kind in [MessageKind::Info, MessageKind::Warning, MessageKind::Error] {
        registry.register(Arc::new(MessageMacro::new(kind)));
    }
    registry.register(Arc::new(CodeMacro::new()));
    registry.register(Arc::new(HtmlMacro::new()));
    registry.register(Arc::new(IdMacro::new()));
}
