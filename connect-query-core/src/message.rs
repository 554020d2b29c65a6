//! # Message Initializers
//!
//! Callers may hand over either a fully constructed [`DynamicMessage`] or a loosely-typed
//! JSON value describing some of its fields. [`MessageInit`] captures both, and
//! [`MessageInit::into_message`] turns either into a valid instance of a given schema.
//!
//! JSON values follow the canonical Protobuf JSON mapping, the same one used to talk to
//! servers: field names may be given in their JSON (`lowerCamelCase`) or proto form, and
//! omitted fields take their default value.
use prost_reflect::{DynamicMessage, MessageDescriptor, ReflectMessage};

#[derive(Debug, thiserror::Error)]
pub enum MessageInitError {
    #[error("JSON structure does not match Protobuf schema '{message}': '{source}'")]
    InvalidJson {
        message: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to convert message '{from}' into '{to}': '{source}'")]
    Conversion {
        from: String,
        to: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A value that can be turned into a message of a known schema.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageInit {
    /// An already constructed message.
    Message(DynamicMessage),
    /// A plain (possibly partial) JSON object.
    Json(serde_json::Value),
}

impl MessageInit {
    /// Builds a valid instance of `schema`.
    ///
    /// A message that already is an instance of `schema` is returned unchanged. A message of a
    /// different type is converted field by field (by name). A JSON value is layered over the
    /// schema defaults.
    pub fn into_message(
        self,
        schema: &MessageDescriptor,
    ) -> Result<DynamicMessage, MessageInitError> {
        match self {
            MessageInit::Message(message) if is_message(&message, schema) => Ok(message),
            MessageInit::Message(message) => {
                let from = message.descriptor().full_name().to_string();
                let conversion_error = |source| MessageInitError::Conversion {
                    from: from.clone(),
                    to: schema.full_name().to_string(),
                    source,
                };

                let json = serde_json::to_value(&message).map_err(conversion_error)?;
                DynamicMessage::deserialize(schema.clone(), json).map_err(conversion_error)
            }
            MessageInit::Json(json) => DynamicMessage::deserialize(schema.clone(), json).map_err(
                |source| MessageInitError::InvalidJson {
                    message: schema.full_name().to_string(),
                    source,
                },
            ),
        }
    }
}

impl From<DynamicMessage> for MessageInit {
    fn from(message: DynamicMessage) -> Self {
        MessageInit::Message(message)
    }
}

impl From<serde_json::Value> for MessageInit {
    fn from(json: serde_json::Value) -> Self {
        MessageInit::Json(json)
    }
}

/// Returns true if `message` is a properly constructed instance of `schema`.
pub fn is_message(message: &DynamicMessage, schema: &MessageDescriptor) -> bool {
    message.descriptor() == *schema
}
