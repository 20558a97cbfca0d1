//! Built-in session codecs for both wire formats.

use std::any::TypeId;
use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use stint_session::{Session, SessionAttributes, is_valid_session_id};

use crate::codec::Codec;
use crate::data::{DataInput, DataOutput, DataSerializerAdapter};
use crate::error::SerializationError;
use crate::structured::{StructuredReader, StructuredSerializerAdapter, StructuredWriter};

/// Data serializer id of the session serializer.
///
/// Stored frames refer to this id. It must never change.
pub const SESSION_SERIALIZER_ID: u32 = 0x0BAC_2BAC;

/// Structured type name written for sessions.
pub const SESSION_TYPE_NAME: &str = "stint.session.Session";

const ID: &str = "id";
const CREATION_TIME: &str = "creation_time";
const LAST_ACCESSED_TIME: &str = "last_accessed_time";
const MAX_INACTIVE_INTERVAL: &str = "max_inactive_interval_secs";
const PRINCIPAL_NAME: &str = "principal_name";
const ATTRIBUTES: &str = "attributes";

/// Session codec for the binary data format.
///
/// Layout: id, creation millis, last accessed millis, max inactive seconds,
/// optional principal name, then the attribute count followed by
/// name / JSON-encoded value pairs sorted by name.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionDataCodec;

impl Codec<Session, DataInput, DataOutput> for SessionDataCodec {
    fn serialize(&self, session: &Session, out: &mut DataOutput) -> Result<(), SerializationError> {
        out.write_string(session.id())?;
        out.write_i64(session.creation_time().timestamp_millis());
        out.write_i64(session.last_accessed_time().timestamp_millis());
        out.write_i64(session.max_inactive_interval().num_seconds());
        out.write_opt_string(session.principal_name())?;

        let mut attributes: Vec<_> = session.attributes().iter().collect();
        attributes.sort_by(|a, b| a.0.cmp(b.0));

        let count = u32::try_from(attributes.len()).map_err(|_| invalid(ATTRIBUTES, "too many"))?;
        out.write_u32(count);
        for (name, value) in attributes {
            out.write_string(name)?;
            out.write_bytes(&serde_json::to_vec(value)?)?;
        }
        Ok(())
    }

    fn deserialize(&self, input: &mut DataInput) -> Result<Session, SerializationError> {
        let id = input.read_string()?;
        if !is_valid_session_id(&id) {
            return Err(invalid(ID, "blank session id"));
        }
        let creation_time = from_millis(CREATION_TIME, input.read_i64()?)?;
        let last_accessed_time = from_millis(LAST_ACCESSED_TIME, input.read_i64()?)?;
        let max_inactive = from_secs(input.read_i64()?)?;
        let principal_name = input.read_opt_string()?;

        let count = input.read_u32()?;
        let mut attributes = HashMap::new();
        for _ in 0..count {
            let name = input.read_string()?;
            let value: Value = serde_json::from_slice(&input.read_bytes()?)?;
            attributes.insert(name, value);
        }

        restore(
            id,
            creation_time,
            last_accessed_time,
            max_inactive,
            principal_name,
            attributes,
        )
    }

    fn can_handle_type(&self, type_id: TypeId) -> bool {
        type_id == TypeId::of::<Session>()
    }
}

/// Session codec for the structured format. `id` is the identity field.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionStructuredCodec;

impl Codec<Session, StructuredReader, StructuredWriter> for SessionStructuredCodec {
    fn serialize(
        &self,
        session: &Session,
        out: &mut StructuredWriter,
    ) -> Result<(), SerializationError> {
        out.write_string(ID, session.id());
        out.write_i64(CREATION_TIME, session.creation_time().timestamp_millis());
        out.write_i64(LAST_ACCESSED_TIME, session.last_accessed_time().timestamp_millis());
        out.write_i64(MAX_INACTIVE_INTERVAL, session.max_inactive_interval().num_seconds());
        out.write_opt_string(PRINCIPAL_NAME, session.principal_name());
        out.write_object(ATTRIBUTES, serde_json::to_value(session.attributes())?);
        out.mark_identity_field(ID);
        Ok(())
    }

    fn deserialize(&self, input: &mut StructuredReader) -> Result<Session, SerializationError> {
        let attributes = match input.read_object(ATTRIBUTES)? {
            Value::Object(map) => map.into_iter().collect(),
            Value::Null => HashMap::new(),
            _ => {
                return Err(SerializationError::FieldType {
                    field: ATTRIBUTES.to_string(),
                    expected: "object",
                });
            }
        };

        restore(
            input.read_string(ID)?,
            from_millis(CREATION_TIME, input.read_i64(CREATION_TIME)?)?,
            from_millis(LAST_ACCESSED_TIME, input.read_i64(LAST_ACCESSED_TIME)?)?,
            from_secs(input.read_i64(MAX_INACTIVE_INTERVAL)?)?,
            input.read_opt_string(PRINCIPAL_NAME)?,
            attributes,
        )
    }

    fn can_handle_type(&self, type_id: TypeId) -> bool {
        type_id == TypeId::of::<Session>()
    }
}

/// The session codec registered under [`SESSION_SERIALIZER_ID`].
pub fn session_data_serializer() -> DataSerializerAdapter<Session, SessionDataCodec> {
    DataSerializerAdapter::new(SESSION_SERIALIZER_ID, SessionDataCodec)
}

/// The session codec registered under [`SESSION_TYPE_NAME`].
pub fn session_structured_serializer() -> StructuredSerializerAdapter<Session, SessionStructuredCodec>
{
    StructuredSerializerAdapter::new(SESSION_TYPE_NAME, SessionStructuredCodec)
}

fn restore(
    id: String,
    creation_time: DateTime<Utc>,
    last_accessed_time: DateTime<Utc>,
    max_inactive_interval: Duration,
    principal_name: Option<String>,
    attributes: HashMap<String, Value>,
) -> Result<Session, SerializationError> {
    let mut session = Session::with_id(id)
        .map_err(|e| invalid(ID, &e.to_string()))?
        .with_creation_time(creation_time)
        .with_last_accessed_time(last_accessed_time)
        .with_max_inactive_interval(max_inactive_interval)
        .with_attributes(SessionAttributes::from(attributes));
    session.set_principal_name(principal_name);
    Ok(session)
}

fn from_millis(field: &str, millis: i64) -> Result<DateTime<Utc>, SerializationError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| invalid(field, &format!("timestamp {millis} out of range")))
}

fn from_secs(secs: i64) -> Result<Duration, SerializationError> {
    Duration::try_seconds(secs)
        .ok_or_else(|| invalid(MAX_INACTIVE_INTERVAL, &format!("{secs} seconds out of range")))
}

fn invalid(field: &str, reason: &str) -> SerializationError {
    SerializationError::InvalidField {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
