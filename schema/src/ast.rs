//! Descriptor types produced by the `.proto` parser.

use serde::Serialize;

/// Protobuf syntax level declared by the file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Syntax {
    Proto2,
    Proto3,
}

/// A message type with its fully-resolved fields.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MessageDescriptor {
    /// Dotted name including package and enclosing messages, without a leading dot.
    pub full_name: String,
    /// Short name as written in the declaration.
    pub name: String,
    /// Fields in declaration order.
    pub fields: Vec<FieldDescriptor>,
}

impl MessageDescriptor {
    /// Find a field by its wire number.
    #[must_use]
    pub fn field_by_number(&self, number: u32) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.number == number)
    }

    /// Find a field by its declared name.
    #[must_use]
    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A single field of a message.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub number: u32,
    pub label: Label,
    pub kind: FieldKind,
    /// Explicit `[packed = ...]` option, if one was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packed: Option<bool>,
}

impl FieldDescriptor {
    #[must_use]
    pub fn is_repeated(&self) -> bool {
        self.label == Label::Repeated
    }
}

/// Field cardinality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    /// No label (proto3 implicit presence).
    Singular,
    Optional,
    Required,
    Repeated,
}

/// What a field holds on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Scalar(ScalarType),
    /// Fully-qualified enum name.
    Enum(String),
    /// Fully-qualified message name.
    Message(String),
}

/// Built-in protobuf scalar types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
}

impl ScalarType {
    /// Map a `.proto` type keyword to a scalar type.
    #[must_use]
    pub fn from_keyword(word: &str) -> Option<Self> {
        let scalar = match word {
            "double" => Self::Double,
            "float" => Self::Float,
            "int32" => Self::Int32,
            "int64" => Self::Int64,
            "uint32" => Self::Uint32,
            "uint64" => Self::Uint64,
            "sint32" => Self::Sint32,
            "sint64" => Self::Sint64,
            "fixed32" => Self::Fixed32,
            "fixed64" => Self::Fixed64,
            "sfixed32" => Self::Sfixed32,
            "sfixed64" => Self::Sfixed64,
            "bool" => Self::Bool,
            "string" => Self::String,
            "bytes" => Self::Bytes,
            _ => return None,
        };
        Some(scalar)
    }

    /// Whether repeated values of this type may use packed encoding.
    #[must_use]
    pub fn is_packable(self) -> bool {
        !matches!(self, Self::String | Self::Bytes)
    }
}

/// An enum type and its declared values.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EnumDescriptor {
    pub full_name: String,
    pub name: String,
    pub values: Vec<EnumValue>,
}

impl EnumDescriptor {
    /// Value used when the field is absent: the first declared number, or zero.
    #[must_use]
    pub fn default_number(&self) -> i32 {
        self.values.first().map_or(0, |v| v.number)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EnumValue {
    pub name: String,
    pub number: i32,
}
