//! Pluggable codecs for moving sessions across a store's wire boundary.
//!
//! Two native extension points are supported:
//! - a registry-identity binary format ([`data`]), where every serializer has a
//!   fixed numeric id that stored bytes refer to
//! - a self-describing structured format ([`structured`]), where encoded values
//!   carry their type name and named fields
//!
//! Generic [`Codec`]s are bridged onto either format by adapters, and several
//! format serializers can be combined with [`CodecChain`] (first match wins).

mod chain;
mod codec;
pub mod data;
mod error;
pub mod session;
pub mod structured;

pub use chain::CodecChain;
pub use codec::{AnyValue, Codec, FormatSerializer, TypeTag};
pub use data::{
    DataInput, DataOutput, DataSerializer, DataSerializerAdapter, DataSerializerRegistry,
};
pub use error::{CodecError, SerializationError};
pub use session::{
    SESSION_SERIALIZER_ID, SESSION_TYPE_NAME, SessionDataCodec, SessionStructuredCodec,
    session_data_serializer, session_structured_serializer,
};
pub use structured::{
    StructuredInstance, StructuredReader, StructuredSerializer, StructuredSerializerAdapter,
    StructuredSerializerCodec, StructuredWriter,
};
