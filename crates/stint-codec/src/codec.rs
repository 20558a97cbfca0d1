//! Generic codec contract and the native format capability interface.

use std::any::{Any, TypeId};
use std::fmt;

use crate::error::SerializationError;

/// A decoded value whose concrete type is known only at runtime.
pub type AnyValue = Box<dyn Any + Send + Sync>;

/// Runtime identity of a concrete type a serializer accepts.
///
/// The name is for diagnostics only. Wire formats identify types by position
/// in a serializer's supported list or by an explicit type name, never by this.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether `value` is an instance of this type.
    pub fn matches(&self, value: &dyn Any) -> bool {
        value.type_id() == self.id
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Converts values of `T` to and from a format's native input/output types.
///
/// `serialize` and `deserialize` are only called after `can_handle` answered
/// true for the value or type in question. `can_handle_type` is called on hot
/// paths, once per chain member per operation, and must answer `false` for
/// unrelated types rather than fail.
pub trait Codec<T, In: ?Sized, Out: ?Sized>: Send + Sync {
    fn serialize(&self, value: &T, out: &mut Out) -> Result<(), SerializationError>;

    fn deserialize(&self, input: &mut In) -> Result<T, SerializationError>;

    fn can_handle_type(&self, type_id: TypeId) -> bool;

    /// Maps a value to its concrete type and asks [`can_handle_type`](Self::can_handle_type).
    fn can_handle(&self, value: &dyn Any) -> bool {
        self.can_handle_type(value.type_id())
    }
}

/// A store's native serializer extension point for one wire format.
///
/// `to_data` answers `Ok(true)` when it wrote the value and `Ok(false)` when
/// the value is not one it handles. `from_data` answers `Ok(None)` when the
/// input is not one it handles. Errors mean the serializer tried and failed.
pub trait FormatSerializer<In: ?Sized, Out: ?Sized>: Send + Sync {
    fn to_data(&self, value: &dyn Any, out: &mut Out) -> Result<bool, SerializationError>;

    fn from_data(&self, input: &mut In) -> Result<Option<AnyValue>, SerializationError>;
}
