//! Declared macro schemas.

use std::borrow::Cow;

/// Type a raw parameter value is converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
    String,
    Integer,
    Boolean,
    /// One of the listed values, compared case-insensitively.
    Enum(&'static [&'static str]),
}

impl ParameterType {
    pub(crate) fn expected(self) -> String {
        match self {
            Self::String => "a string".to_owned(),
            Self::Integer => "an integer".to_owned(),
            Self::Boolean => "true or false".to_owned(),
            Self::Enum(values) => format!("one of [{}]", values.join(", ")),
        }
    }
}

/// One declared macro parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescriptor {
    pub name: Cow<'static, str>,
    pub description: Cow<'static, str>,
    pub kind: ParameterType,
    pub mandatory: bool,
    pub default: Option<Cow<'static, str>>,
}

impl ParameterDescriptor {
    /// Optional parameter without default.
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>, kind: ParameterType) -> Self {
        Self {
            name: name.into(),
            description: Cow::Borrowed(""),
            kind,
            mandatory: false,
            default: None,
        }
    }

    #[must_use]
    pub const fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    #[must_use]
    pub fn with_default(mut self, default: impl Into<Cow<'static, str>>) -> Self {
        self.default = Some(default.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<Cow<'static, str>>) -> Self {
        self.description = description.into();
        self
    }
}

/// Whether a macro takes content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentMode {
    /// Content is ignored.
    None,
    #[default]
    Optional,
    Mandatory,
}

/// Schema of a macro: its id, parameters and content mode.
///
/// Built-in macros describe themselves with static strings; macros defined
/// at runtime own theirs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDescriptor {
    pub id: Cow<'static, str>,
    pub description: Cow<'static, str>,
    pub parameters: Vec<ParameterDescriptor>,
    pub content: ContentMode,
}

impl MacroDescriptor {
    #[must_use]
    pub fn new(id: impl Into<Cow<'static, str>>, description: impl Into<Cow<'static, str>>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            parameters: Vec::new(),
            content: ContentMode::Optional,
        }
    }

    #[must_use]
    pub fn with_parameter(mut self, parameter: ParameterDescriptor) -> Self {
        self.parameters.push(parameter);
        self
    }

    #[must_use]
    pub fn with_content(mut self, content: ContentMode) -> Self {
        self.content = content;
        self
    }

    /// Declared parameter named `name` (case-insensitive).
    pub fn parameter(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.parameters
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }
}
