//! Binding of raw macro parameters to typed values.

use std::collections::BTreeMap;

use wr_xdom::Parameters;

use crate::error::MacroExecutionError;
use crate::macros::descriptor::{MacroDescriptor, ParameterType};

/// Typed parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    /// Canonical (declared) spelling of an enum value.
    Enum(&'static str),
}

impl std::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(value) => f.write_str(value),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Enum(value) => f.write_str(value),
        }
    }
}

/// Parameters of one macro call, validated against its descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacroParameters {
    values: BTreeMap<String, ParameterValue>,
}

impl MacroParameters {
    /// Validate `raw` against `descriptor`.
    ///
    /// Names match case-insensitively. Declared defaults fill in missing
    /// optional parameters.
    pub fn bind(descriptor: &MacroDescriptor, raw: &Parameters) -> Result<Self, MacroExecutionError> {
        let mut values = BTreeMap::new();
        for (name, value) in raw {
            let parameter =
                descriptor
                    .parameter(name)
                    .ok_or_else(|| MacroExecutionError::UnknownParameter {
                        name: name.clone(),
                    })?;
            let value = convert(&parameter.name, parameter.kind, value)?;
            values.insert(parameter.name.to_string(), value);
        }
        for parameter in &descriptor.parameters {
            if values.contains_key(parameter.name.as_ref()) {
                continue;
            }
            if let Some(default) = &parameter.default {
                let value = convert(&parameter.name, parameter.kind, default)?;
                values.insert(parameter.name.to_string(), value);
            } else if parameter.mandatory {
                return Err(MacroExecutionError::MissingParameter {
                    name: parameter.name.to_string(),
                });
            }
        }
        Ok(Self { values })
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.values.get(name)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        match self.values.get(name)? {
            ParameterValue::String(value) => Some(value),
            ParameterValue::Enum(value) => Some(value),
            _ => None,
        }
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.values.get(name)? {
            ParameterValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.values.get(name)? {
            ParameterValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Bound parameters by declared name, sorted.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
}

fn convert(
    name: &str,
    kind: ParameterType,
    value: &str,
) -> Result<ParameterValue, MacroExecutionError> {
    let invalid = || MacroExecutionError::InvalidParameter {
        name: name.to_owned(),
        value: value.to_owned(),
        expected: kind.expected(),
    };
    match kind {
        ParameterType::String => Ok(ParameterValue::String(value.to_owned())),
        ParameterType::Integer => value
            .trim()
            .parse()
            .map(ParameterValue::Integer)
            .map_err(|_| invalid()),
        ParameterType::Boolean => match value.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(ParameterValue::Boolean(true)),
            "false" | "no" | "0" => Ok(ParameterValue::Boolean(false)),
            _ => Err(invalid()),
        },
        ParameterType::Enum(allowed) => allowed
            .iter()
            .find(|candidate| candidate.eq_ignore_ascii_case(value.trim()))
            .map(|candidate| ParameterValue::Enum(*candidate))
            .ok_or_else(invalid),
    }
}
