//! # Method Kinds
//!
//! Only unary methods can back a query. This module classifies a [`MethodDescriptor`] and
//! rejects the streaming kinds before anything is keyed or fetched.
use prost_reflect::MethodDescriptor;
use std::fmt;

/// The four RPC shapes defined by Protobuf services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    Unary,
    ServerStreaming,
    ClientStreaming,
    BiDiStreaming,
}

impl MethodKind {
    pub fn of(method: &MethodDescriptor) -> Self {
        match (method.is_client_streaming(), method.is_server_streaming()) {
            (false, false) => MethodKind::Unary,
            (false, true) => MethodKind::ServerStreaming,
            (true, false) => MethodKind::ClientStreaming,
            (true, true) => MethodKind::BiDiStreaming,
        }
    }
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MethodKind::Unary => "unary",
            MethodKind::ServerStreaming => "server streaming",
            MethodKind::ClientStreaming => "client streaming",
            MethodKind::BiDiStreaming => "bidirectional streaming",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Method '{method}' is a {kind} method, only unary methods are supported")]
pub struct UnsupportedMethodKind {
    /// Fully qualified method name (e.g. `my.package.Service.Method`).
    pub method: String,
    pub kind: MethodKind,
}

/// Fails with [`UnsupportedMethodKind`] unless `method` is unary.
pub fn assert_unary(method: &MethodDescriptor) -> Result<(), UnsupportedMethodKind> {
    match MethodKind::of(method) {
        MethodKind::Unary => Ok(()),
        kind => Err(UnsupportedMethodKind {
            method: method.full_name().to_string(),
            kind,
        }),
    }
}
