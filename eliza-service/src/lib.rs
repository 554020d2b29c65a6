//! # Eliza Service
//!
//! **INTERNAL USE ONLY**: This crate exists solely to provide Protobuf schemas and a gRPC server
//! implementation for integration testing `connect-query-core`.
//! It is not intended for production use.
//!
//! | File                                | Contents                                                   |
//! |-------------------------------------|------------------------------------------------------------|
//! | `connectrpc/eliza/v1/eliza.proto`   | `ElizaService` with a unary `Say` and streaming methods    |
//! | `pagination/v1/list.proto`          | `ListService` with a paginated `List` and a unary `Count`  |
//! | `test/v1/kitchen_sink.proto`        | `KitchenSink`, a message using every kind of field         |
//! | `test/v1/legacy.proto`              | `Legacy`, a proto2 message with explicit field presence    |
pub mod server;

pub mod pb {
    pub mod eliza {
        tonic::include_proto!("connectrpc.eliza.v1");
    }

    pub mod pagination {
        tonic::include_proto!("pagination.v1");
    }

    pub mod test {
        tonic::include_proto!("test.v1");
    }
}

pub use server::{spawn_server, test_server};

use prost_reflect::{DescriptorPool, MessageDescriptor, MethodDescriptor, ServiceDescriptor};
use std::sync::LazyLock;

pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("descriptors");

pub const ELIZA_SERVICE: &str = "connectrpc.eliza.v1.ElizaService";
pub const LIST_SERVICE: &str = "pagination.v1.ListService";

static POOL: LazyLock<DescriptorPool> = LazyLock::new(|| {
    DescriptorPool::decode(FILE_DESCRIPTOR_SET).expect("Test schemas must be valid")
});

/// A pool holding every test schema.
pub fn descriptor_pool() -> DescriptorPool {
    POOL.clone()
}

/// Looks up a message of the test schemas.
///
/// # Panics
///
/// If no such message exists.
pub fn message(full_name: &str) -> MessageDescriptor {
    descriptor_pool()
        .get_message_by_name(full_name)
        .unwrap_or_else(|| panic!("message '{full_name}' not found"))
}

/// Looks up a service of the test schemas.
///
/// # Panics
///
/// If no such service exists.
pub fn service(full_name: &str) -> ServiceDescriptor {
    descriptor_pool()
        .get_service_by_name(full_name)
        .unwrap_or_else(|| panic!("service '{full_name}' not found"))
}

/// Looks up a method of the test schemas.
///
/// # Panics
///
/// If no such method exists.
pub fn method(service_name: &str, method_name: &str) -> MethodDescriptor {
    service(service_name)
        .methods()
        .find(|m| m.name() == method_name)
        .unwrap_or_else(|| panic!("method '{service_name}/{method_name}' not found"))
}
