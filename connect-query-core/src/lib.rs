//! # Connect Query Core
//!
//! `connect-query-core` lets applications call Protobuf-defined RPCs through a
//! data-fetching/caching layer. Every cached request is identified by a typed, structured
//! key derived from the service name, the method name, the serialized input message and
//! the transport it went through.
//!
//! ## Key Components
//!
//! * **[`create_connect_query_key`]:** Builds the [`ConnectQueryKey`] for a method (exact key) or
//!   for a whole service (filter key).
//! * **[`create_message_key`]:** The canonical, JSON-compatible form of a message used inside
//!   keys. Absent fields are omitted, 64-bit integers and non-finite floats are stringified,
//!   bytes are base64 encoded and map keys are sorted.
//! * **[`create_protobuf_safe_updater`] & [`create_protobuf_safe_infinite_updater`]:** Updater
//!   factories guaranteeing that whatever is written into a cache slot is a valid instance of
//!   the method's output message, even when the caller hands over a plain JSON partial.
//! * **[`create_transport_key`]:** A short, process-local identity for a [`Transport`].
//!
//! ## Calling methods
//!
//! On top of the keys, the crate offers the fetch side of a query:
//!
//! * **[`call_unary_method`]:** Performs a unary call through a [`Transport`].
//! * **[`create_query_options`] & [`create_infinite_query_options`]:** Pair a key with the
//!   function that fetches its data, including paginated queries.
//! * **[`QueryCache`]:** A minimal in-memory cache that only accepts writes through the safe
//!   updaters.
//!
//! ## Re-exports
//!
//! This crate re-exports `prost`, `prost-reflect`, and `tonic` to ensure that consumers
//! use compatible versions of these underlying dependencies.
pub mod cache;
pub mod call;
pub mod grpc;
pub mod message;
pub mod message_key;
pub mod method;
pub mod query_key;
pub mod query_options;
pub mod transport;
pub mod updater;

pub use cache::{CachedData, QueryCache};
pub use call::{CallError, CallOptions, call_unary_method};
pub use message::{MessageInit, MessageInitError, is_message};
pub use message_key::{MessageKey, create_message_key};
pub use method::{MethodKind, UnsupportedMethodKind, assert_unary};
pub use query_key::{
    Cardinality, ConnectQueryKey, KeyInput, KeyParams, KeySchema, QUERY_KEY_TAG, QueryInput,
    create_connect_query_key,
};
pub use query_options::{
    InfiniteOptions, InfiniteQueryOptions, QueryOptions, QueryOptionsError,
    create_infinite_query_options, create_query_options,
};
pub use transport::{
    Transport, TransportConnectError, TransportId, TransportIdentity, create_transport_key,
};
pub use updater::{
    InfiniteData, InfiniteUpdate, InfiniteUpdateError, InfiniteUpdater, Updater,
    create_protobuf_safe_infinite_updater, create_protobuf_safe_updater,
};

// Re-exports
pub use prost;
pub use prost_reflect;
pub use tonic;

/// Type alias for the standard boxed error used in generic bounds.
type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
