//! # Generic gRPC Plumbing
//!
//! This module contains the low-level building blocks for performing gRPC calls using
//! dynamic message types.
//!
//! Unlike standard `tonic` clients which are strongly typed (e.g., `SayRequest`),
//! the components here work with [`prost_reflect::DynamicMessage`], encoding and decoding
//! them against descriptors resolved at runtime.
pub mod client;
pub mod codec;
