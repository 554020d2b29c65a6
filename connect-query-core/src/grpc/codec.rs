//! # Dynamic Message Codec
//!
//! This module implements `tonic::codec::Codec` for [`DynamicMessage`], so `tonic` can move
//! messages whose types are only known at runtime.
//!
//! ## How it works
//!
//! 1. **Encoder**: Any `DynamicMessage` carries its own descriptor, so it is written to the
//!    gRPC byte buffer as is.
//! 2. **Decoder**: Raw bytes are merged into a fresh `DynamicMessage` of the descriptor the
//!    codec was built with.
//!
//! [`super::client::GrpcClient`] builds the codec with the method's output descriptor.
use prost::Message;
use prost_reflect::{DynamicMessage, MessageDescriptor};
use tonic::{
    Status,
    codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder},
};

/// A Codec encoding any [`DynamicMessage`] and decoding messages of a single schema.
#[derive(Debug, Clone)]
pub struct DynamicCodec {
    /// Schema of the messages read from the wire.
    decode_desc: MessageDescriptor,
}

impl DynamicCodec {
    /// Creates a new `DynamicCodec`.
    ///
    /// # Arguments
    /// * `decode_desc` - Descriptor for the message type received from the peer.
    pub fn new(decode_desc: MessageDescriptor) -> Self {
        Self { decode_desc }
    }
}

impl Codec for DynamicCodec {
    type Encode = DynamicMessage;
    type Decode = DynamicMessage;

    type Encoder = DynamicEncoder;
    type Decoder = DynamicDecoder;

    fn encoder(&mut self) -> Self::Encoder {
        DynamicEncoder
    }

    fn decoder(&mut self) -> Self::Decoder {
        DynamicDecoder(self.decode_desc.clone())
    }
}

/// Responsible for encoding a message into Protobuf bytes.
#[derive(Debug)]
pub struct DynamicEncoder;

impl Encoder for DynamicEncoder {
    type Item = DynamicMessage;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        item.encode_raw(dst);
        Ok(())
    }
}

/// Responsible for decoding Protobuf bytes into a message.
#[derive(Debug)]
pub struct DynamicDecoder(MessageDescriptor);

impl Decoder for DynamicDecoder {
    type Item = DynamicMessage;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        let mut msg = DynamicMessage::new(self.0.clone());
        msg.merge(src)
            .map_err(|e| Status::internal(format!("Failed to decode Protobuf bytes: {}", e)))?;

        Ok(Some(msg))
    }
}
