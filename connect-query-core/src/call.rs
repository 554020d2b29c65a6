//! # Unary Calls
//!
//! The fetch side of a query: sending the input of a unary method through a [`Transport`] and
//! returning its response message.
use crate::{
    BoxError,
    grpc::client::GrpcRequestError,
    message::{MessageInit, MessageInitError},
    method::{UnsupportedMethodKind, assert_unary},
    query_key::QueryInput,
    transport::Transport,
};
use http_body::Body as HttpBody;
use prost_reflect::{DynamicMessage, MethodDescriptor};
use std::time::Duration;

/// Per-call settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Custom gRPC metadata (headers) to attach to the request.
    pub headers: Vec<(String, String)>,
    /// Deadline sent to the server along with the request.
    pub timeout: Option<Duration>,
}

/// Errors that can occur during a unary call.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error(transparent)]
    UnsupportedMethodKind(#[from] UnsupportedMethodKind),
    #[error("Method '{0}' was called with a disabled (skipped) input")]
    Disabled(String),
    #[error("Invalid input: '{0}'")]
    InvalidInput(#[from] MessageInitError),
    #[error("Invalid page param for field '{field}': '{reason}'")]
    InvalidPageParam { field: String, reason: String },
    #[error("gRPC client request error: '{0}'")]
    GrpcRequestError(#[from] GrpcRequestError),
    #[error("gRPC call failed: '{0}'")]
    Status(#[from] tonic::Status),
}

/// Calls the unary `method` through `transport`.
///
/// # Returns
///
/// * `Ok(DynamicMessage)` - The response, an instance of the method's output message.
/// * `Err(CallError)` - If the method is not unary, the input is disabled or invalid, the
///   request could not be sent, or the server answered with an error status.
pub async fn call_unary_method<S>(
    transport: &Transport<S>,
    method: &MethodDescriptor,
    input: QueryInput<MessageInit>,
    options: &CallOptions,
) -> Result<DynamicMessage, CallError>
where
    S: tonic::client::GrpcService<tonic::body::Body> + Clone,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    assert_unary(method)?;

    let input = input
        .active()
        .ok_or_else(|| CallError::Disabled(method.full_name().to_string()))?
        .into_message(&method.input())?;

    tracing::debug!(
        method = method.full_name(),
        transport = %transport.id(),
        "calling unary method"
    );

    let mut grpc_client = transport.grpc_client().clone();
    let response = grpc_client
        .unary(method, input, &options.headers, options.timeout)
        .await??;

    Ok(response)
}
