//! Wire-format decoding driven by a [`MessageDescriptor`].

use prost::bytes::Buf;
use prost::encoding::{WireType, decode_key, decode_varint};

use super::ast::{FieldDescriptor, FieldKind, Label, ScalarType, Syntax};
use super::{DynamicMessage, MessageDescriptor, RECURSION_LIMIT, Schema, SchemaError, Value};

pub(crate) fn decode_message(
    schema: &Schema,
    descriptor: &MessageDescriptor,
    bytes: &[u8],
) -> Result<DynamicMessage, SchemaError> {
    let mut message = DynamicMessage::new();
    merge_message(schema, descriptor, bytes, 0, &mut message)?;
    fill_defaults(schema, descriptor, &mut message);
    Ok(message)
}

/// Merge the fields in `buf` into `message`. Singular fields take the last
/// value seen; singular message fields merge; repeated fields append.
fn merge_message(
    schema: &Schema,
    descriptor: &MessageDescriptor,
    mut buf: &[u8],
    depth: u32,
    message: &mut DynamicMessage,
) -> Result<(), SchemaError> {
    if depth > RECURSION_LIMIT {
        return Err(SchemaError::RecursionLimit);
    }

    while buf.has_remaining() {
        let (number, wire_type) = decode_key(&mut buf)?;
        let Some(field) = descriptor.field_by_number(number) else {
            skip_field(number, wire_type, &mut buf, depth)?;
            continue;
        };

        if matches!(wire_type, WireType::StartGroup | WireType::EndGroup) {
            return Err(SchemaError::UnsupportedGroup);
        }

        if field.is_repeated() && wire_type == WireType::LengthDelimited && packable(&field.kind) {
            let mut packed = take_length_delimited(&mut buf, &field.name)?;
            let expected = wire_type_of(&field.kind);
            let mut items = Vec::new();
            while packed.has_remaining() {
                items.push(read_value(schema, field, expected, &mut packed, depth)?);
            }
            append_list(message, &field.name, items);
            continue;
        }

        let expected = wire_type_of(&field.kind);
        if wire_type != expected {
            return Err(SchemaError::WireType { field: field.name.clone(), expected, actual: wire_type });
        }

        if let FieldKind::Message(type_name) = &field.kind {
            if !field.is_repeated() {
                let nested = schema
                    .message(type_name)
                    .ok_or_else(|| SchemaError::UnknownType(type_name.clone()))?;
                let body = take_length_delimited(&mut buf, &field.name)?;
                if !message.contains(&field.name) {
                    message.set(&field.name, DynamicMessage::new());
                }
                if let Some(Value::Message(existing)) = message.get_mut(&field.name) {
                    merge_message(schema, nested, body, depth + 1, existing)?;
                }
                continue;
            }
        }

        let value = read_value(schema, field, wire_type, &mut buf, depth)?;
        if field.is_repeated() {
            append_list(message, &field.name, vec![value]);
        } else {
            message.set(&field.name, value);
        }
    }

    Ok(())
}

fn append_list(message: &mut DynamicMessage, name: &str, items: Vec<Value>) {
    if let Some(Value::List(existing)) = message.get_mut(name) {
        existing.extend(items);
    } else {
        message.set(name, Value::List(items));
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn read_value(
    schema: &Schema,
    field: &FieldDescriptor,
    wire_type: WireType,
    buf: &mut &[u8],
    depth: u32,
) -> Result<Value, SchemaError> {
    let name = field.name.as_str();
    let scalar = match &field.kind {
        FieldKind::Scalar(scalar) => *scalar,
        FieldKind::Enum(_) => return Ok(Value::Enum(decode_varint(buf)? as i32)),
        FieldKind::Message(type_name) => {
            let nested = schema
                .message(type_name)
                .ok_or_else(|| SchemaError::UnknownType(type_name.clone()))?;
            let body = take_length_delimited(buf, name)?;
            let mut inner = DynamicMessage::new();
            merge_message(schema, nested, body, depth + 1, &mut inner)?;
            return Ok(Value::Message(inner));
        }
    };
    debug_assert_eq!(wire_type, scalar_wire_type(scalar));

    let value = match scalar {
        ScalarType::Int32 => Value::I32(decode_varint(buf)? as i32),
        ScalarType::Int64 => Value::I64(decode_varint(buf)? as i64),
        ScalarType::Uint32 => Value::U32(decode_varint(buf)? as u32),
        ScalarType::Uint64 => Value::U64(decode_varint(buf)?),
        ScalarType::Sint32 => {
            let raw = decode_varint(buf)? as u32;
            Value::I32(((raw >> 1) as i32) ^ -((raw & 1) as i32))
        }
        ScalarType::Sint64 => {
            let raw = decode_varint(buf)?;
            Value::I64(((raw >> 1) as i64) ^ -((raw & 1) as i64))
        }
        ScalarType::Bool => Value::Bool(decode_varint(buf)? != 0),
        ScalarType::Fixed32 => Value::U32(take_fixed::<4>(buf, name).map(u32::from_le_bytes)?),
        ScalarType::Sfixed32 => Value::I32(take_fixed::<4>(buf, name).map(i32::from_le_bytes)?),
        ScalarType::Float => Value::F32(take_fixed::<4>(buf, name).map(f32::from_le_bytes)?),
        ScalarType::Fixed64 => Value::U64(take_fixed::<8>(buf, name).map(u64::from_le_bytes)?),
        ScalarType::Sfixed64 => Value::I64(take_fixed::<8>(buf, name).map(i64::from_le_bytes)?),
        ScalarType::Double => Value::F64(take_fixed::<8>(buf, name).map(f64::from_le_bytes)?),
        ScalarType::String => {
            let body = take_length_delimited(buf, name)?;
            let text = std::str::from_utf8(body).map_err(|_| SchemaError::InvalidUtf8 { field: name.to_owned() })?;
            Value::String(text.to_owned())
        }
        ScalarType::Bytes => Value::Bytes(take_length_delimited(buf, name)?.to_vec()),
    };
    Ok(value)
}

/// Populate absent fields with their implicit defaults so callers see the
/// same shape for `{}` as for a frame with every field set to zero.
fn fill_defaults(schema: &Schema, descriptor: &MessageDescriptor, message: &mut DynamicMessage) {
    for field in &descriptor.fields {
        if message.contains(&field.name) {
            if let FieldKind::Message(type_name) = &field.kind {
                let (Some(nested), Some(value)) = (schema.message(type_name), message.get_mut(&field.name)) else {
                    continue;
                };
                match value {
                    Value::Message(inner) => fill_defaults(schema, nested, inner),
                    Value::List(items) => {
                        for item in items {
                            if let Value::Message(inner) = item {
                                fill_defaults(schema, nested, inner);
                            }
                        }
                    }
                    _ => {}
                }
            }
            continue;
        }
        if field.is_repeated() {
            message.set(&field.name, Value::List(Vec::new()));
            continue;
        }
        // Explicit presence: proto3 `optional` and oneof members stay absent.
        if field.label == Label::Optional && schema.syntax() == Syntax::Proto3 {
            continue;
        }
        let default = match &field.kind {
            FieldKind::Scalar(scalar) => scalar_default(*scalar),
            FieldKind::Enum(type_name) => {
                Value::Enum(schema.enum_type(type_name).map_or(0, super::EnumDescriptor::default_number))
            }
            FieldKind::Message(_) => continue,
        };
        message.set(&field.name, default);
    }
}

pub(crate) fn scalar_default(scalar: ScalarType) -> Value {
    match scalar {
        ScalarType::Double => Value::F64(0.0),
        ScalarType::Float => Value::F32(0.0),
        ScalarType::Int32 | ScalarType::Sint32 | ScalarType::Sfixed32 => Value::I32(0),
        ScalarType::Int64 | ScalarType::Sint64 | ScalarType::Sfixed64 => Value::I64(0),
        ScalarType::Uint32 | ScalarType::Fixed32 => Value::U32(0),
        ScalarType::Uint64 | ScalarType::Fixed64 => Value::U64(0),
        ScalarType::Bool => Value::Bool(false),
        ScalarType::String => Value::String(String::new()),
        ScalarType::Bytes => Value::Bytes(Vec::new()),
    }
}

pub(crate) fn wire_type_of(kind: &FieldKind) -> WireType {
    match kind {
        FieldKind::Scalar(scalar) => scalar_wire_type(*scalar),
        FieldKind::Enum(_) => WireType::Varint,
        FieldKind::Message(_) => WireType::LengthDelimited,
    }
}

pub(crate) fn scalar_wire_type(scalar: ScalarType) -> WireType {
    match scalar {
        ScalarType::Int32
        | ScalarType::Int64
        | ScalarType::Uint32
        | ScalarType::Uint64
        | ScalarType::Sint32
        | ScalarType::Sint64
        | ScalarType::Bool => WireType::Varint,
        ScalarType::Fixed32 | ScalarType::Sfixed32 | ScalarType::Float => WireType::ThirtyTwoBit,
        ScalarType::Fixed64 | ScalarType::Sfixed64 | ScalarType::Double => WireType::SixtyFourBit,
        ScalarType::String | ScalarType::Bytes => WireType::LengthDelimited,
    }
}

fn packable(kind: &FieldKind) -> bool {
    match kind {
        FieldKind::Scalar(scalar) => scalar.is_packable(),
        FieldKind::Enum(_) => true,
        FieldKind::Message(_) => false,
    }
}

fn take_length_delimited<'a>(buf: &mut &'a [u8], field: &str) -> Result<&'a [u8], SchemaError> {
    let len = decode_varint(buf)?;
    let len = usize::try_from(len).map_err(|_| SchemaError::Truncated { field: field.to_owned() })?;
    if len > buf.len() {
        return Err(SchemaError::Truncated { field: field.to_owned() });
    }
    let data: &'a [u8] = buf;
    let (body, rest) = data.split_at(len);
    *buf = rest;
    Ok(body)
}

fn take_fixed<const N: usize>(buf: &mut &[u8], field: &str) -> Result<[u8; N], SchemaError> {
    let data: &[u8] = buf;
    let Some((head, rest)) = data.split_first_chunk::<N>() else {
        return Err(SchemaError::Truncated { field: field.to_owned() });
    };
    *buf = rest;
    Ok(*head)
}

/// Skip an unknown field. Groups are consumed up to their matching end tag.
fn skip_field(
    number: u32,
    wire_type: WireType,
    buf: &mut &[u8],
    depth: u32,
) -> Result<(), SchemaError> {
    const UNKNOWN: &str = "<unknown>";
    match wire_type {
        WireType::Varint => {
            decode_varint(buf)?;
        }
        WireType::SixtyFourBit => {
            take_fixed::<8>(buf, UNKNOWN)?;
        }
        WireType::ThirtyTwoBit => {
            take_fixed::<4>(buf, UNKNOWN)?;
        }
        WireType::LengthDelimited => {
            take_length_delimited(buf, UNKNOWN)?;
        }
        WireType::StartGroup => skip_group(number, buf, depth + 1)?,
        WireType::EndGroup => return Err(SchemaError::UnbalancedGroup { number }),
    }
    Ok(())
}

fn skip_group(number: u32, buf: &mut &[u8], depth: u32) -> Result<(), SchemaError> {
    if depth > RECURSION_LIMIT {
        return Err(SchemaError::RecursionLimit);
    }
    while buf.has_remaining() {
        let (inner, wire_type) = decode_key(buf)?;
        if wire_type == WireType::EndGroup {
            if inner != number {
                return Err(SchemaError::UnbalancedGroup { number });
            }
            return Ok(());
        }
        skip_field(inner, wire_type, buf, depth)?;
    }
    Err(SchemaError::UnbalancedGroup { number })
}

#[cfg(test)]
#[path = "decode_test.rs"]
mod tests;
