//! First-match-wins composition of format serializers.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::codec::{AnyValue, FormatSerializer};
use crate::error::{CodecError, SerializationError};

/// An ordered, immutable list of format serializers tried in turn.
///
/// Registration order is the tie-break: when two members both handle a
/// value, only the earlier one is ever invoked.
pub struct CodecChain<In: ?Sized, Out: ?Sized> {
    members: Vec<Arc<dyn FormatSerializer<In, Out>>>,
}

impl<In, Out> CodecChain<In, Out>
where
    In: ?Sized + 'static,
    Out: ?Sized + 'static,
{
    /// Build a chain. Fails if `members` is empty.
    pub fn new<I>(members: I) -> Result<Self, CodecError>
    where
        I: IntoIterator<Item = Arc<dyn FormatSerializer<In, Out>>>,
    {
        let members: Vec<_> = members.into_iter().collect();
        if members.is_empty() {
            return Err(CodecError::EmptyChain);
        }
        Ok(Self { members })
    }

    /// Compose serializers into one.
    ///
    /// A single member is returned unchanged, without a chain around it.
    pub fn compose<I>(members: I) -> Result<Arc<dyn FormatSerializer<In, Out>>, CodecError>
    where
        I: IntoIterator<Item = Arc<dyn FormatSerializer<In, Out>>>,
    {
        let mut chain = Self::new(members)?;
        if chain.members.len() == 1 {
            return Ok(chain.members.remove(0));
        }
        Ok(Arc::new(chain))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn FormatSerializer<In, Out>>> {
        self.members.iter()
    }
}

impl<In, Out> FormatSerializer<In, Out> for CodecChain<In, Out>
where
    In: ?Sized,
    Out: ?Sized,
{
    fn to_data(&self, value: &dyn Any, out: &mut Out) -> Result<bool, SerializationError> {
        for (index, member) in self.members.iter().enumerate() {
            if member.to_data(value, out)? {
                trace!(member = index, "Codec chain member serialized value");
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn from_data(&self, input: &mut In) -> Result<Option<AnyValue>, SerializationError> {
        for (index, member) in self.members.iter().enumerate() {
            if let Some(value) = member.from_data(input)? {
                trace!(member = index, "Codec chain member deserialized value");
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}

impl<In: ?Sized, Out: ?Sized> fmt::Debug for CodecChain<In, Out> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecChain")
            .field("members", &self.members.len())
            .finish()
    }
}
