//! Message boxes.

use wr_xdom::Block;

use crate::error::MacroExecutionError;
use crate::macros::{ContentMode, Macro, MacroContext, MacroDescriptor, MacroParameters};

/// Flavor of a message box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Warning,
    Error,
}

impl MessageKind {
    fn id(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    fn class(self) -> &'static str {
        match self {
            Self::Info => "box infomessage",
            Self::Warning => "box warningmessage",
            Self::Error => "box errormessage",
        }
    }
}

/// `{{info}}`, `{{warning}}` and `{{error}}`: content in a styled group.
#[derive(Debug)]
pub struct MessageMacro {
    kind: MessageKind,
    descriptor: MacroDescriptor,
}

impl MessageMacro {
    #[must_use]
    pub fn new(kind: MessageKind) -> Self {
        let description = match kind {
            MessageKind::Info => "Display an informational message",
            MessageKind::Warning => "Display a warning message",
            MessageKind::Error => "Display an error message",
        };
        Self {
            kind,
            descriptor: MacroDescriptor::new(kind.id(), description)
                .with_content(ContentMode::Mandatory),
        }
    }
}

impl Macro for MessageMacro {
    fn descriptor(&self) -> &MacroDescriptor {
        &self.descriptor
    }

    fn execute(
        &self,
        _params: &MacroParameters,
        content: Option<&str>,
        context: &mut MacroContext<'_>,
    ) -> Result<Vec<Block>, MacroExecutionError> {
        let children = context.parse_content(content.unwrap_or_default())?;
        Ok(vec![
            Block::group(children).with_param("class", self.kind.class()),
        ])
    }
}
