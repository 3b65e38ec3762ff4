//! Wire-format encoding, the inverse of `decode`.

use prost::bytes::BufMut;
use prost::encoding::{WireType, encode_key, encode_varint};

use super::ast::{FieldDescriptor, FieldKind, Label, ScalarType, Syntax};
use super::decode::{scalar_default, wire_type_of};
use super::{DynamicMessage, MessageDescriptor, Schema, SchemaError, Value};

/// Append `message` to `out`, fields in declaration order.
///
/// Proto3 singular fields holding their default value are omitted, matching
/// what `prost` and other protobuf runtimes emit.
pub(crate) fn encode_message(
    schema: &Schema,
    descriptor: &MessageDescriptor,
    message: &DynamicMessage,
    out: &mut Vec<u8>,
) -> Result<(), SchemaError> {
    for field in &descriptor.fields {
        let Some(value) = message.get(&field.name) else {
            continue;
        };

        if field.is_repeated() {
            let Value::List(items) = value else {
                return Err(mismatch(field));
            };
            if items.is_empty() {
                continue;
            }
            if schema.packs(field) {
                let mut packed = Vec::new();
                for item in items {
                    write_value(schema, field, item, &mut packed)?;
                }
                encode_key(field.number, WireType::LengthDelimited, out);
                encode_varint(packed.len() as u64, out);
                out.extend_from_slice(&packed);
            } else {
                for item in items {
                    encode_key(field.number, wire_type_of(&field.kind), out);
                    write_value(schema, field, item, out)?;
                }
            }
            continue;
        }

        if field.label == Label::Singular && schema.syntax() == Syntax::Proto3 && is_default(field, value) {
            continue;
        }
        encode_key(field.number, wire_type_of(&field.kind), out);
        write_value(schema, field, value, out)?;
    }
    Ok(())
}

fn is_default(field: &FieldDescriptor, value: &Value) -> bool {
    match &field.kind {
        FieldKind::Scalar(scalar) => *value == scalar_default(*scalar),
        FieldKind::Enum(_) => *value == Value::Enum(0),
        FieldKind::Message(_) => false,
    }
}

/// Write one value without its key.
#[allow(clippy::cast_sign_loss)]
fn write_value(schema: &Schema, field: &FieldDescriptor, value: &Value, out: &mut Vec<u8>) -> Result<(), SchemaError> {
    match (&field.kind, value) {
        (FieldKind::Enum(_), Value::Enum(v)) => encode_varint(i64::from(*v) as u64, out),
        (FieldKind::Message(type_name), Value::Message(inner)) => {
            let nested = schema
                .message(type_name)
                .ok_or_else(|| SchemaError::UnknownType(type_name.clone()))?;
            let mut body = Vec::new();
            encode_message(schema, nested, inner, &mut body)?;
            encode_varint(body.len() as u64, out);
            out.extend_from_slice(&body);
        }
        (FieldKind::Scalar(scalar), value) => write_scalar(*scalar, value, out).ok_or_else(|| mismatch(field))?,
        _ => return Err(mismatch(field)),
    }
    Ok(())
}

#[allow(clippy::cast_sign_loss)]
fn write_scalar(scalar: ScalarType, value: &Value, out: &mut Vec<u8>) -> Option<()> {
    match (scalar, value) {
        (ScalarType::Int32, Value::I32(v)) => encode_varint(i64::from(*v) as u64, out),
        (ScalarType::Int64, Value::I64(v)) => encode_varint(*v as u64, out),
        (ScalarType::Uint32, Value::U32(v)) => encode_varint(u64::from(*v), out),
        (ScalarType::Uint64, Value::U64(v)) => encode_varint(*v, out),
        (ScalarType::Sint32, Value::I32(v)) => encode_varint(u64::from(((v << 1) ^ (v >> 31)) as u32), out),
        (ScalarType::Sint64, Value::I64(v)) => encode_varint(((v << 1) ^ (v >> 63)) as u64, out),
        (ScalarType::Bool, Value::Bool(v)) => encode_varint(u64::from(*v), out),
        (ScalarType::Fixed32, Value::U32(v)) => out.put_u32_le(*v),
        (ScalarType::Sfixed32, Value::I32(v)) => out.put_i32_le(*v),
        (ScalarType::Float, Value::F32(v)) => out.put_f32_le(*v),
        (ScalarType::Fixed64, Value::U64(v)) => out.put_u64_le(*v),
        (ScalarType::Sfixed64, Value::I64(v)) => out.put_i64_le(*v),
        (ScalarType::Double, Value::F64(v)) => out.put_f64_le(*v),
        (ScalarType::String, Value::String(v)) => {
            encode_varint(v.len() as u64, out);
            out.extend_from_slice(v.as_bytes());
        }
        (ScalarType::Bytes, Value::Bytes(v)) => {
            encode_varint(v.len() as u64, out);
            out.extend_from_slice(v);
        }
        _ => return None,
    }
    Some(())
}

fn mismatch(field: &FieldDescriptor) -> SchemaError {
    SchemaError::ValueMismatch { field: field.name.clone() }
}
