//! Container launch command

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while decoding or inspecting a container command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("command must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("command has no `{0}` field")]
    MissingField(&'static str),

    #[error("command field `{field}` must be a {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
}

/// Body of a Docker `containers/create` call
///
/// The orchestrator treats the content as opaque apart from the `Image`
/// field, which is needed to pull the image before creating containers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerCommand(Map<String, Value>);

impl ContainerCommand {
    const IMAGE: &'static str = "Image";

    /// Image reference the container is created from
    pub fn image(&self) -> Result<&str, CommandError> {
        match self.0.get(Self::IMAGE) {
            None | Some(Value::Null) => Err(CommandError::MissingField(Self::IMAGE)),
            Some(Value::String(image)) if !image.trim().is_empty() => Ok(image),
            Some(Value::String(_)) => Err(CommandError::MissingField(Self::IMAGE)),
            Some(_) => Err(CommandError::WrongType {
                field: Self::IMAGE,
                expected: "string",
            }),
        }
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl TryFrom<Value> for ContainerCommand {
    type Error = CommandError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Err(CommandError::NotAnObject("null")),
            Value::Bool(_) => Err(CommandError::NotAnObject("a boolean")),
            Value::Number(_) => Err(CommandError::NotAnObject("a number")),
            Value::String(_) => Err(CommandError::NotAnObject("a string")),
            Value::Array(_) => Err(CommandError::NotAnObject("an array")),
        }
    }
}
