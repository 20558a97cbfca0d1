//! Self-describing structured format.
//!
//! An encoded value is a [`StructuredInstance`]: a type name plus named
//! fields. Readers pick a serializer by type name, so the instance can be
//! inspected, or decoded later, without knowing which codec wrote it.

use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::{AnyValue, Codec, FormatSerializer};
use crate::error::SerializationError;

/// The store's structured serializer extension point.
pub type StructuredSerializer = dyn FormatSerializer<StructuredReader, StructuredWriter>;

/// An encoded value in the structured format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredInstance {
    type_name: String,
    fields: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    identity_fields: Vec<String>,
}

impl StructuredInstance {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Fields that together identify the value, in marking order.
    pub fn identity_fields(&self) -> &[String] {
        &self.identity_fields
    }
}

/// Builds a [`StructuredInstance`] field by field.
#[derive(Debug, Default)]
pub struct StructuredWriter {
    type_name: Option<String>,
    fields: BTreeMap<String, Value>,
    identity_fields: Vec<String>,
}

impl StructuredWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_type_name(&mut self, name: impl Into<String>) {
        self.type_name = Some(name.into());
    }

    pub fn write_string(&mut self, name: &str, value: &str) {
        self.fields
            .insert(name.to_string(), Value::String(value.to_string()));
    }

    pub fn write_opt_string(&mut self, name: &str, value: Option<&str>) {
        let value = value.map_or(Value::Null, |v| Value::String(v.to_string()));
        self.fields.insert(name.to_string(), value);
    }

    pub fn write_i64(&mut self, name: &str, value: i64) {
        self.fields.insert(name.to_string(), Value::from(value));
    }

    pub fn write_object(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }

    pub fn mark_identity_field(&mut self, name: &str) {
        if !self.identity_fields.iter().any(|f| f == name) {
            self.identity_fields.push(name.to_string());
        }
    }

    pub fn finish(self) -> Result<StructuredInstance, SerializationError> {
        let type_name = self.type_name.ok_or(SerializationError::MissingTypeName)?;
        Ok(StructuredInstance {
            type_name,
            fields: self.fields,
            identity_fields: self.identity_fields,
        })
    }
}

/// Reads named fields out of a [`StructuredInstance`].
#[derive(Debug, Clone)]
pub struct StructuredReader {
    instance: StructuredInstance,
}

impl StructuredReader {
    pub fn new(instance: StructuredInstance) -> Self {
        Self { instance }
    }

    pub fn type_name(&self) -> &str {
        &self.instance.type_name
    }

    pub fn instance(&self) -> &StructuredInstance {
        &self.instance
    }

    fn field(&self, name: &str) -> Result<&Value, SerializationError> {
        self.instance
            .fields
            .get(name)
            .ok_or_else(|| SerializationError::MissingField(name.to_string()))
    }

    pub fn read_string(&self, name: &str) -> Result<String, SerializationError> {
        match self.field(name)? {
            Value::String(s) => Ok(s.clone()),
            _ => Err(wrong_type(name, "string")),
        }
    }

    /// Absent and null fields both read as `None`.
    pub fn read_opt_string(&self, name: &str) -> Result<Option<String>, SerializationError> {
        match self.instance.fields.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(wrong_type(name, "string or null")),
        }
    }

    pub fn read_i64(&self, name: &str) -> Result<i64, SerializationError> {
        self.field(name)?
            .as_i64()
            .ok_or_else(|| wrong_type(name, "i64"))
    }

    pub fn read_object(&self, name: &str) -> Result<Value, SerializationError> {
        Ok(self.field(name)?.clone())
    }
}

fn wrong_type(field: &str, expected: &'static str) -> SerializationError {
    SerializationError::FieldType {
        field: field.to_string(),
        expected,
    }
}

/// Exposes a [`Codec`] for `T` as a [`StructuredSerializer`] under a fixed type name.
///
/// Both `T` and the shared form `Arc<RwLock<T>>` are written; the shared form
/// is written while holding its read lock. Decoding always yields `T`.
pub struct StructuredSerializerAdapter<T, C> {
    type_name: String,
    codec: C,
    _marker: PhantomData<fn() -> T>,
}

impl<T, C> StructuredSerializerAdapter<T, C>
where
    T: Any + Send + Sync,
    C: Codec<T, StructuredReader, StructuredWriter>,
{
    pub fn new(type_name: impl Into<String>, codec: C) -> Self {
        Self {
            type_name: type_name.into(),
            codec,
            _marker: PhantomData,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }
}

impl<T, C> FormatSerializer<StructuredReader, StructuredWriter> for StructuredSerializerAdapter<T, C>
where
    T: Any + Send + Sync,
    C: Codec<T, StructuredReader, StructuredWriter>,
{
    fn to_data(
        &self,
        value: &dyn Any,
        out: &mut StructuredWriter,
    ) -> Result<bool, SerializationError> {
        if let Some(v) = value.downcast_ref::<T>() {
            if !self.codec.can_handle(value) {
                return Ok(false);
            }
            out.set_type_name(self.type_name.as_str());
            self.codec.serialize(v, out)?;
            return Ok(true);
        }

        if let Some(shared) = value.downcast_ref::<Arc<RwLock<T>>>() {
            if !self.codec.can_handle_type(TypeId::of::<T>()) {
                return Ok(false);
            }
            let guard = shared.read();
            out.set_type_name(self.type_name.as_str());
            self.codec.serialize(&guard, out)?;
            return Ok(true);
        }

        Ok(false)
    }

    fn from_data(
        &self,
        input: &mut StructuredReader,
    ) -> Result<Option<AnyValue>, SerializationError> {
        if input.type_name() != self.type_name || !self.codec.can_handle_type(TypeId::of::<T>()) {
            return Ok(None);
        }
        Ok(Some(Box::new(self.codec.deserialize(input)?)))
    }
}

impl<T, C> fmt::Debug for StructuredSerializerAdapter<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuredSerializerAdapter")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Exposes a [`StructuredSerializer`] (a single one or a chain) as a [`Codec`] for `T`.
pub struct StructuredSerializerCodec<T> {
    serializer: Arc<StructuredSerializer>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> StructuredSerializerCodec<T> {
    pub fn new(serializer: Arc<StructuredSerializer>) -> Self {
        Self {
            serializer,
            _marker: PhantomData,
        }
    }

    pub fn serializer(&self) -> &Arc<StructuredSerializer> {
        &self.serializer
    }
}

impl<T: Any + Send + Sync> Codec<T, StructuredReader, StructuredWriter>
    for StructuredSerializerCodec<T>
{
    fn serialize(&self, value: &T, out: &mut StructuredWriter) -> Result<(), SerializationError> {
        if self.serializer.to_data(value, out)? {
            Ok(())
        } else {
            Err(SerializationError::Unsupported(std::any::type_name::<T>()))
        }
    }

    fn deserialize(&self, input: &mut StructuredReader) -> Result<T, SerializationError> {
        self.serializer
            .from_data(input)?
            .and_then(|value| value.downcast::<T>().ok())
            .map(|value| *value)
            .ok_or(SerializationError::Unsupported(std::any::type_name::<T>()))
    }

    fn can_handle_type(&self, type_id: TypeId) -> bool {
        type_id == TypeId::of::<T>()
    }
}

impl<T> fmt::Debug for StructuredSerializerCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuredSerializerCodec")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}
