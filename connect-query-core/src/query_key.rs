//! # Query Keys
//!
//! A [`ConnectQueryKey`] identifies the cached result of an RPC. It serializes as a two element
//! array: the [`QUERY_KEY_TAG`] followed by a record naming the service, method, transport,
//! cardinality and canonical input of the request.
//!
//! ```json
//! ["connect-query", {
//!     "serviceName": "connectrpc.eliza.v1.ElizaService",
//!     "methodName": "Say",
//!     "cardinality": "finite",
//!     "input": { "sentence": "hi" }
//! }]
//! ```
//!
//! Leaving a field out of a key turns it into a filter matching every value of that field.
//! A key built from a [`ServiceDescriptor`] matches every method of the service.
use crate::{
    message_key::{MessageKey, create_message_key},
    transport::{TransportIdentity, create_transport_key},
};
use prost_reflect::{DynamicMessage, MethodDescriptor, ReflectMessage, ServiceDescriptor};
use serde::{Serialize, Serializer, ser::SerializeTuple};

/// Distinguishes these keys from any other key living in the same cache.
pub const QUERY_KEY_TAG: &str = "connect-query";

const SKIPPED_INPUT: &str = "skipped";

/// Input of a query that may be intentionally disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryInput<T> {
    Active(T),
    /// The query must not run. Its key records the input as `"skipped"`.
    Disabled,
}

impl<T> QueryInput<T> {
    pub fn is_disabled(&self) -> bool {
        matches!(self, QueryInput::Disabled)
    }

    pub fn as_ref(&self) -> QueryInput<&T> {
        match self {
            QueryInput::Active(input) => QueryInput::Active(input),
            QueryInput::Disabled => QueryInput::Disabled,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueryInput<U> {
        match self {
            QueryInput::Active(input) => QueryInput::Active(f(input)),
            QueryInput::Disabled => QueryInput::Disabled,
        }
    }

    pub fn active(self) -> Option<T> {
        match self {
            QueryInput::Active(input) => Some(input),
            QueryInput::Disabled => None,
        }
    }
}

impl<T> From<T> for QueryInput<T> {
    fn from(input: T) -> Self {
        QueryInput::Active(input)
    }
}

/// Whether a query holds a single response or a growing list of pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    Finite,
    Infinite,
}

/// What a key is built for: one method, or every method of a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySchema {
    Method(MethodDescriptor),
    Service(ServiceDescriptor),
}

impl KeySchema {
    pub fn service_name(&self) -> &str {
        match self {
            KeySchema::Method(method) => method.parent_service().full_name(),
            KeySchema::Service(service) => service.full_name(),
        }
    }
}

impl From<MethodDescriptor> for KeySchema {
    fn from(method: MethodDescriptor) -> Self {
        KeySchema::Method(method)
    }
}

impl From<ServiceDescriptor> for KeySchema {
    fn from(service: ServiceDescriptor) -> Self {
        KeySchema::Service(service)
    }
}

/// The input recorded in a key.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyInput {
    /// The query is disabled.
    Skipped,
    Message(MessageKey),
}

impl Serialize for KeyInput {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            KeyInput::Skipped => serializer.serialize_str(SKIPPED_INPUT),
            KeyInput::Message(message) => message.serialize(serializer),
        }
    }
}

/// Everything a key can be built from.
///
/// Only `schema` is required. Every other field left as `None` is left out of the key.
#[derive(Clone)]
pub struct KeyParams<'a> {
    pub schema: KeySchema,
    pub input: Option<QueryInput<&'a DynamicMessage>>,
    pub transport: Option<&'a dyn TransportIdentity>,
    pub cardinality: Option<Cardinality>,
    /// Field (JSON or proto name) excluded from the input, see [`create_message_key`].
    pub page_param_key: Option<&'a str>,
}

impl<'a> KeyParams<'a> {
    pub fn new(schema: impl Into<KeySchema>) -> Self {
        Self {
            schema: schema.into(),
            input: None,
            transport: None,
            cardinality: None,
            page_param_key: None,
        }
    }

    pub fn input(mut self, input: impl Into<QueryInput<&'a DynamicMessage>>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.input = Some(QueryInput::Disabled);
        self
    }

    pub fn transport(mut self, transport: &'a dyn TransportIdentity) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = Some(cardinality);
        self
    }

    pub fn page_param_key(mut self, key: &'a str) -> Self {
        self.page_param_key = Some(key);
        self
    }
}

/// The structured cache key of an RPC request, or a filter over such keys.
///
/// Serializes as `["connect-query", { ... }]`, fields set to `None` being omitted.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectQueryKey {
    pub service_name: String,
    /// `None` matches any method of the service.
    pub method_name: Option<String>,
    /// `None` matches any transport.
    pub transport: Option<String>,
    /// `None` matches both finite and infinite queries.
    pub cardinality: Option<Cardinality>,
    /// `None` matches any input.
    pub input: Option<KeyInput>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KeyRecord<'a> {
    service_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    method_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transport: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cardinality: Option<Cardinality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    input: Option<&'a KeyInput>,
}

impl ConnectQueryKey {
    fn record(&self) -> KeyRecord<'_> {
        KeyRecord {
            service_name: &self.service_name,
            method_name: self.method_name.as_deref(),
            transport: self.transport.as_deref(),
            cardinality: self.cardinality,
            input: self.input.as_ref(),
        }
    }

    /// The key as the JSON array it serializes to.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!([QUERY_KEY_TAG, self.record()])
    }

    /// Stable string form of the key, usable as a map key.
    pub fn hash_key(&self) -> String {
        self.to_json().to_string()
    }

    /// Returns true if this key is matched by `filter`.
    ///
    /// Every field present on the filter must be equal on this key. An input on the filter is
    /// compared as a whole: an empty input only matches requests without any field set.
    pub fn matches(&self, filter: &ConnectQueryKey) -> bool {
        fn field_matches<T: PartialEq>(value: &Option<T>, filter: &Option<T>) -> bool {
            filter.is_none() || value == filter
        }

        self.service_name == filter.service_name
            && field_matches(&self.method_name, &filter.method_name)
            && field_matches(&self.transport, &filter.transport)
            && field_matches(&self.cardinality, &filter.cardinality)
            && field_matches(&self.input, &filter.input)
    }
}

impl Serialize for ConnectQueryKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(QUERY_KEY_TAG)?;
        tuple.serialize_element(&self.record())?;
        tuple.end()
    }
}

/// Builds the key (or filter) described by `params`.
///
/// With a [`ServiceDescriptor`] schema there is no method input to check against, so the input
/// is keyed with its own descriptor. Such a filter selects the queries of every method of the
/// service whose input has the same JSON form.
///
/// # Panics
///
/// If the input is not an instance of the method's input message.
pub fn create_connect_query_key(params: KeyParams<'_>) -> ConnectQueryKey {
    let input = params.input.map(|input| match input {
        QueryInput::Disabled => KeyInput::Skipped,
        QueryInput::Active(message) => {
            let schema = match &params.schema {
                KeySchema::Method(method) => method.input(),
                KeySchema::Service(_) => message.descriptor(),
            };
            KeyInput::Message(create_message_key(&schema, message, params.page_param_key))
        }
    });

    let method_name = match &params.schema {
        KeySchema::Method(method) => Some(method.name().to_string()),
        KeySchema::Service(_) => None,
    };

    let key = ConnectQueryKey {
        service_name: params.schema.service_name().to_string(),
        method_name,
        transport: params
            .transport
            .map(|transport| create_transport_key(transport)),
        cardinality: params.cardinality,
        input,
    };

    tracing::trace!(key = %key.hash_key(), "created query key");

    key
}
