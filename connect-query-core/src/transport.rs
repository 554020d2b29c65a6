//! # Transports
//!
//! A [`Transport`] is the connection queries are fetched through. Data fetched through two
//! different transports must never share a cache entry, so every transport carries a
//! [`TransportId`] that becomes part of its query keys.
//!
//! Ids come from a process-wide counter and are assigned when a transport is built. Clones
//! share the id of the transport they were cloned from, since they share the connection too.
//! Nothing is registered anywhere, so dropping the last clone of a transport leaves nothing
//! behind.
use crate::{BoxError, grpc::client::GrpcClient};
use http_body::Body as HttpBody;
use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};
use tonic::transport::{Channel, Endpoint};

static NEXT_TRANSPORT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-local identity of a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransportId(u64);

impl TransportId {
    /// Allocates an id that no other transport of this process has.
    pub fn next() -> Self {
        Self(NEXT_TRANSPORT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TransportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Anything that can be keyed as a transport.
pub trait TransportIdentity {
    fn transport_id(&self) -> TransportId;
}

/// Returns the short string identifying `transport` inside query keys (e.g. `t1`).
pub fn create_transport_key(transport: &(impl TransportIdentity + ?Sized)) -> String {
    transport.transport_id().to_string()
}

/// Errors that can occur when connecting to a gRPC server.
#[derive(Debug, thiserror::Error)]
pub enum TransportConnectError {
    #[error("Invalid URL '{0}': {1}")]
    InvalidUrl(String, #[source] tonic::transport::Error),
    #[error("Failed to connect to '{0}': {1}")]
    ConnectionFailed(String, #[source] tonic::transport::Error),
}

/// A connection to a gRPC server, usable by any number of queries.
#[derive(Debug, Clone)]
pub struct Transport<S = Channel> {
    id: TransportId,
    grpc_client: GrpcClient<S>,
}

impl Transport<Channel> {
    /// Connects to a gRPC server.
    ///
    /// # Arguments
    ///
    /// * `addr` - The server URI (e.g., `http://localhost:50051`).
    pub async fn connect(addr: &str) -> Result<Self, TransportConnectError> {
        let endpoint = Endpoint::new(addr.to_string())
            .map_err(|e| TransportConnectError::InvalidUrl(addr.to_string(), e))?;

        let channel = endpoint
            .connect()
            .await
            .map_err(|e| TransportConnectError::ConnectionFailed(addr.to_string(), e))?;

        tracing::debug!(addr, "connected transport");

        Ok(Self::from_service(channel))
    }
}

impl<S> Transport<S>
where
    S: tonic::client::GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    /// Creates a transport from an existing Tonic service/channel.
    pub fn from_service(service: S) -> Self {
        Self {
            id: TransportId::next(),
            grpc_client: GrpcClient::new(service),
        }
    }
}

impl<S> Transport<S> {
    pub fn id(&self) -> TransportId {
        self.id
    }

    pub(crate) fn grpc_client(&self) -> &GrpcClient<S> {
        &self.grpc_client
    }
}

impl<S> TransportIdentity for Transport<S> {
    fn transport_id(&self) -> TransportId {
        self.id
    }
}

impl TransportIdentity for TransportId {
    fn transport_id(&self) -> TransportId {
        *self
    }
}
