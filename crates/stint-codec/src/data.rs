//! Registry-identity binary format.
//!
//! Every [`DataSerializer`] owns a fixed numeric id and an ordered list of the
//! concrete types it writes. A frame on the wire is:
//!
//! ```text
//! u32 serializer id | u8 type tag | payload
//! ```
//!
//! The type tag is the index of the value's type in the serializer's
//! supported list. Readers resolve the serializer by id, never by type name,
//! so an id and the order of its supported list must not change once data
//! has been written. New types are only ever appended.

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::codec::{AnyValue, Codec, FormatSerializer, TypeTag};
use crate::error::{CodecError, SerializationError};

/// Big-endian binary writer.
#[derive(Debug, Default)]
pub struct DataOutput {
    buf: BytesMut,
}

impl DataOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.buf.put_u8(u8::from(v));
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.put_u32(v);
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf.put_i64(v);
    }

    /// Length-prefixed (u32) byte string.
    pub fn write_bytes(&mut self, v: &[u8]) -> Result<(), SerializationError> {
        let len = u32::try_from(v.len()).map_err(|_| SerializationError::InvalidField {
            field: "bytes".to_string(),
            reason: format!("length {} exceeds u32", v.len()),
        })?;
        self.buf.put_u32(len);
        self.buf.put_slice(v);
        Ok(())
    }

    /// Length-prefixed UTF-8 string.
    pub fn write_string(&mut self, v: &str) -> Result<(), SerializationError> {
        self.write_bytes(v.as_bytes())
    }

    /// Presence flag followed by the string when present.
    pub fn write_opt_string(&mut self, v: Option<&str>) -> Result<(), SerializationError> {
        match v {
            Some(s) => {
                self.write_bool(true);
                self.write_string(s)
            }
            None => {
                self.write_bool(false);
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Big-endian binary reader over an owned buffer.
#[derive(Debug, Clone)]
pub struct DataInput {
    buf: Bytes,
}

impl DataInput {
    pub fn new(buf: impl Into<Bytes>) -> Self {
        Self { buf: buf.into() }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn need(&self, needed: usize) -> Result<(), SerializationError> {
        let remaining = self.buf.remaining();
        if remaining < needed {
            return Err(SerializationError::Truncated { needed, remaining });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, SerializationError> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_bool(&mut self) -> Result<bool, SerializationError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u32(&mut self) -> Result<u32, SerializationError> {
        self.need(4)?;
        Ok(self.buf.get_u32())
    }

    pub fn read_i64(&mut self) -> Result<i64, SerializationError> {
        self.need(8)?;
        Ok(self.buf.get_i64())
    }

    pub fn read_bytes(&mut self) -> Result<Bytes, SerializationError> {
        let len = self.read_u32()? as usize;
        self.need(len)?;
        Ok(self.buf.split_to(len))
    }

    pub fn read_string(&mut self) -> Result<String, SerializationError> {
        let bytes = self.read_bytes()?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    pub fn read_opt_string(&mut self) -> Result<Option<String>, SerializationError> {
        if self.read_bool()? {
            Ok(Some(self.read_string()?))
        } else {
            Ok(None)
        }
    }
}

/// A native binary serializer registered by numeric id.
pub trait DataSerializer: FormatSerializer<DataInput, DataOutput> {
    /// Stable identity referenced by every frame this serializer writes.
    fn id(&self) -> u32;

    /// Concrete types written by this serializer, in type-tag order.
    fn supported_types(&self) -> &[TypeTag];

    /// Whether `value`'s type is in the supported list.
    fn supports(&self, value: &dyn Any) -> bool {
        self.supported_types().iter().any(|tag| tag.matches(value))
    }
}

/// Exposes a [`Codec`] for `T` as a [`DataSerializer`].
///
/// Supported types are `T` (tag 0) and the shared form `Arc<RwLock<T>>`
/// (tag 1). A shared value is written while holding its read lock, and
/// decodes back into the shared form.
pub struct DataSerializerAdapter<T, C> {
    id: u32,
    supported: [TypeTag; 2],
    codec: C,
    _marker: PhantomData<fn() -> T>,
}

const TAG_VALUE: u8 = 0;
const TAG_SHARED: u8 = 1;

impl<T, C> DataSerializerAdapter<T, C>
where
    T: Any + Send + Sync,
    C: Codec<T, DataInput, DataOutput>,
{
    pub fn new(id: u32, codec: C) -> Self {
        Self {
            id,
            supported: [TypeTag::of::<T>(), TypeTag::of::<Arc<RwLock<T>>>()],
            codec,
            _marker: PhantomData,
        }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }
}

impl<T, C> FormatSerializer<DataInput, DataOutput> for DataSerializerAdapter<T, C>
where
    T: Any + Send + Sync,
    C: Codec<T, DataInput, DataOutput>,
{
    fn to_data(&self, value: &dyn Any, out: &mut DataOutput) -> Result<bool, SerializationError> {
        if let Some(v) = value.downcast_ref::<T>() {
            if !self.codec.can_handle(value) {
                return Ok(false);
            }
            out.write_u8(TAG_VALUE);
            self.codec.serialize(v, out)?;
            return Ok(true);
        }

        if let Some(shared) = value.downcast_ref::<Arc<RwLock<T>>>() {
            if !self.codec.can_handle_type(TypeId::of::<T>()) {
                return Ok(false);
            }
            let guard = shared.read();
            out.write_u8(TAG_SHARED);
            self.codec.serialize(&guard, out)?;
            return Ok(true);
        }

        Ok(false)
    }

    fn from_data(&self, input: &mut DataInput) -> Result<Option<AnyValue>, SerializationError> {
        if !self.codec.can_handle_type(TypeId::of::<T>()) {
            return Ok(None);
        }

        match input.read_u8()? {
            TAG_VALUE => Ok(Some(Box::new(self.codec.deserialize(input)?))),
            TAG_SHARED => {
                let value = self.codec.deserialize(input)?;
                Ok(Some(Box::new(Arc::new(RwLock::new(value)))))
            }
            tag => Err(SerializationError::UnknownTypeTag { id: self.id, tag }),
        }
    }
}

impl<T, C> DataSerializer for DataSerializerAdapter<T, C>
where
    T: Any + Send + Sync,
    C: Codec<T, DataInput, DataOutput>,
{
    fn id(&self) -> u32 {
        self.id
    }

    fn supported_types(&self) -> &[TypeTag] {
        &self.supported
    }
}

impl<T, C> fmt::Debug for DataSerializerAdapter<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSerializerAdapter")
            .field("id", &format_args!("{:#010x}", self.id))
            .field("supported", &self.supported)
            .finish()
    }
}

/// Id-keyed set of data serializers, filled once at startup.
#[derive(Default)]
pub struct DataSerializerRegistry {
    serializers: Vec<Arc<dyn DataSerializer>>,
}

impl DataSerializerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a serializer. Ids must be unique.
    pub fn register(&mut self, serializer: Arc<dyn DataSerializer>) -> Result<(), CodecError> {
        let id = serializer.id();
        if self.get(id).is_some() {
            return Err(CodecError::DuplicateSerializerId(id));
        }
        debug!(
            serializer_id = id,
            types = ?serializer.supported_types(),
            "Registered data serializer"
        );
        self.serializers.push(serializer);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, serializer: Arc<dyn DataSerializer>) -> Result<Self, CodecError> {
        self.register(serializer)?;
        Ok(self)
    }

    pub fn get(&self, id: u32) -> Option<&Arc<dyn DataSerializer>> {
        self.serializers.iter().find(|s| s.id() == id)
    }

    pub fn len(&self) -> usize {
        self.serializers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.serializers.is_empty()
    }

    /// Encode `value` with the first registered serializer that supports it.
    ///
    /// Returns `Ok(None)` when no serializer wants the value.
    pub fn encode(&self, value: &dyn Any) -> Result<Option<Bytes>, SerializationError> {
        for serializer in self.serializers.iter().filter(|s| s.supports(value)) {
            let mut out = DataOutput::new();
            out.write_u32(serializer.id());
            if serializer.to_data(value, &mut out)? {
                trace!(
                    serializer_id = serializer.id(),
                    len = out.len(),
                    "Encoded value"
                );
                return Ok(Some(out.into_bytes()));
            }
        }

        debug!(type_id = ?value.type_id(), "No data serializer handles value");
        Ok(None)
    }

    /// Decode a frame written by [`encode`](Self::encode).
    pub fn decode(&self, bytes: impl Into<Bytes>) -> Result<Option<AnyValue>, SerializationError> {
        let mut input = DataInput::new(bytes);
        let id = input.read_u32()?;
        let serializer = self
            .get(id)
            .ok_or(SerializationError::UnknownSerializerId(id))?;
        serializer.from_data(&mut input)
    }
}

impl fmt::Debug for DataSerializerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.serializers.iter().map(|s| format!("{:#010x}", s.id())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Point {
        x: i64,
        y: i64,
    }

    struct PointCodec;

    impl Codec<Point, DataInput, DataOutput> for PointCodec {
        fn serialize(&self, value: &Point, out: &mut DataOutput) -> Result<(), SerializationError> {
            out.write_i64(value.x);
            out.write_i64(value.y);
            Ok(())
        }

        fn deserialize(&self, input: &mut DataInput) -> Result<Point, SerializationError> {
            Ok(Point {
                x: input.read_i64()?,
                y: input.read_i64()?,
            })
        }

        fn can_handle_type(&self, type_id: TypeId) -> bool {
            type_id == TypeId::of::<Point>()
        }
    }

    const POINT_ID: u32 = 0x0000_0042;

    fn registry() -> DataSerializerRegistry {
        DataSerializerRegistry::new()
            .with(Arc::new(DataSerializerAdapter::new(POINT_ID, PointCodec)))
            .unwrap()
    }

    #[test]
    fn test_primitives_roundtrip() {
        let mut out = DataOutput::new();
        out.write_u8(7);
        out.write_bool(true);
        out.write_u32(0xDEAD_BEEF);
        out.write_i64(-5);
        out.write_string("héllo").unwrap();
        out.write_opt_string(None).unwrap();
        out.write_opt_string(Some("p")).unwrap();

        let mut input = DataInput::new(out.into_bytes());
        assert_eq!(input.read_u8().unwrap(), 7);
        assert!(input.read_bool().unwrap());
        assert_eq!(input.read_u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(input.read_i64().unwrap(), -5);
        assert_eq!(input.read_string().unwrap(), "héllo");
        assert_eq!(input.read_opt_string().unwrap(), None);
        assert_eq!(input.read_opt_string().unwrap().as_deref(), Some("p"));
        assert_eq!(input.remaining(), 0);
    }

    #[test]
    fn test_truncated_input() {
        let mut input = DataInput::new(vec![0u8, 0, 0, 9, b'a']);
        let err = input.read_string().unwrap_err();

        assert!(matches!(
            err,
            SerializationError::Truncated {
                needed: 9,
                remaining: 1
            }
        ));
    }

    #[test]
    fn test_frame_layout() {
        let bytes = registry().encode(&Point { x: 1, y: 2 }).unwrap().unwrap();

        assert_eq!(&bytes[..4], &POINT_ID.to_be_bytes());
        assert_eq!(bytes[4], TAG_VALUE);
        assert_eq!(bytes.len(), 4 + 1 + 16);
    }

    #[test]
    fn test_encode_decode_value() {
        let registry = registry();
        let bytes = registry.encode(&Point { x: 3, y: -4 }).unwrap().unwrap();

        let decoded = registry.decode(bytes).unwrap().unwrap();
        let point = decoded.downcast::<Point>().unwrap();
        assert_eq!((point.x, point.y), (3, -4));
    }

    #[test]
    fn test_encode_decode_shared() {
        let registry = registry();
        let shared = Arc::new(RwLock::new(Point { x: 5, y: 6 }));

        let bytes = registry.encode(&shared).unwrap().unwrap();
        assert_eq!(bytes[4], TAG_SHARED);

        let decoded = registry.decode(bytes).unwrap().unwrap();
        let shared = decoded.downcast::<Arc<RwLock<Point>>>().unwrap();
        assert_eq!(shared.read().x, 5);
    }

    #[test]
    fn test_unsupported_value_is_not_an_error() {
        assert!(registry().encode(&"text").unwrap().is_none());
    }

    #[test]
    fn test_unknown_id() {
        let mut out = DataOutput::new();
        out.write_u32(0x99);
        let err = registry().decode(out.into_bytes()).unwrap_err();

        assert!(matches!(err, SerializationError::UnknownSerializerId(0x99)));
    }

    #[test]
    fn test_unknown_tag() {
        let mut out = DataOutput::new();
        out.write_u32(POINT_ID);
        out.write_u8(9);
        let err = registry().decode(out.into_bytes()).unwrap_err();

        assert!(matches!(
            err,
            SerializationError::UnknownTypeTag {
                id: POINT_ID,
                tag: 9
            }
        ));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let result = registry().with(Arc::new(DataSerializerAdapter::new(POINT_ID, PointCodec)));
        assert!(matches!(
            result,
            Err(CodecError::DuplicateSerializerId(POINT_ID))
        ));
    }

    #[test]
    fn test_supported_types_order() {
        let adapter = DataSerializerAdapter::new(POINT_ID, PointCodec);
        let types = adapter.supported_types();

        assert_eq!(types[0], TypeTag::of::<Point>());
        assert_eq!(types[1], TypeTag::of::<Arc<RwLock<Point>>>());
    }
}
