//! Runtime protobuf schemas for chat frames.
//!
//! This crate owns the binary message contract the receiver decodes against.
//! Unlike compiled `prost` types, the schema is loaded at runtime from `.proto`
//! text, so a deployment can ship a new field layout without a rebuild. The
//! wire primitives (varints, keys, wire types) come from `prost::encoding`.
//!
//! FLOW
//! ====
//! `.proto` text -> [`Schema::parse`] -> [`Schema::lookup_type`] ->
//! [`MessageType::decode`] -> [`DynamicMessage`].

pub mod ast;
mod decode;
mod encode;
pub mod parse;
pub mod value;

use std::collections::BTreeMap;
use std::sync::Arc;

use prost::encoding::WireType;

pub use ast::{EnumDescriptor, FieldDescriptor, FieldKind, Label, MessageDescriptor, ScalarType, Syntax};
pub use value::{DynamicMessage, Value};

/// Nested messages deeper than this are rejected while decoding.
pub const RECURSION_LIMIT: u32 = 100;

/// Error returned by schema parsing, lookup, and frame codec calls.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The `.proto` text is not valid.
    #[error("schema parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
    /// A field refers to a message or enum type the file does not declare.
    #[error("schema parse error at line {line}: unknown type `{type_name}` for field `{field}`")]
    UnresolvedType { line: usize, field: String, type_name: String },
    /// No message type with this fully-qualified name exists.
    #[error("no such type: {0}")]
    UnknownType(String),
    /// A varint or field key could not be read.
    #[error("failed to decode protobuf frame: {0}")]
    Decode(#[from] prost::DecodeError),
    /// The buffer ended inside a value.
    #[error("failed to decode protobuf frame: unexpected end of input in `{field}`")]
    Truncated { field: String },
    /// The wire type on the frame does not match the declared field type.
    #[error("failed to decode protobuf frame: `{field}` expected {expected:?} wire type, found {actual:?}")]
    WireType { field: String, expected: WireType, actual: WireType },
    /// A `string` field held bytes that are not UTF-8.
    #[error("failed to decode protobuf frame: `{field}` is not valid UTF-8")]
    InvalidUtf8 { field: String },
    /// A declared field arrived with the deprecated group wire type.
    #[error("failed to decode protobuf frame: groups are not supported")]
    UnsupportedGroup,
    /// An unknown group field has no matching end tag.
    #[error("failed to decode protobuf frame: group {number} is not terminated")]
    UnbalancedGroup { number: u32 },
    #[error("failed to decode protobuf frame: nesting exceeds {limit} levels", limit = RECURSION_LIMIT)]
    RecursionLimit,
    /// A value handed to the encoder does not fit the field it is stored under.
    #[error("value for `{field}` does not match its declared type")]
    ValueMismatch { field: String },
}

/// A parsed `.proto` file with every type reference resolved.
#[derive(Clone, Debug)]
pub struct Schema {
    syntax: Syntax,
    package: Option<String>,
    imports: Vec<String>,
    messages: BTreeMap<String, Arc<MessageDescriptor>>,
    enums: BTreeMap<String, EnumDescriptor>,
}

impl Schema {
    /// Parse `.proto` source text.
    ///
    /// # Errors
    ///
    /// See [`parse::parse`].
    pub fn parse(source: &str) -> Result<Self, SchemaError> {
        parse::parse(source)
    }

    #[must_use]
    pub fn syntax(&self) -> Syntax {
        self.syntax
    }

    #[must_use]
    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    /// Import paths as written; they are not loaded.
    #[must_use]
    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    /// All message types, ordered by full name.
    pub fn messages(&self) -> impl Iterator<Item = &MessageDescriptor> {
        self.messages.values().map(AsRef::as_ref)
    }

    /// All enum types, ordered by full name.
    pub fn enums(&self) -> impl Iterator<Item = &EnumDescriptor> {
        self.enums.values()
    }

    #[must_use]
    pub fn message(&self, full_name: &str) -> Option<&MessageDescriptor> {
        self.messages.get(full_name.trim_start_matches('.')).map(AsRef::as_ref)
    }

    #[must_use]
    pub fn enum_type(&self, full_name: &str) -> Option<&EnumDescriptor> {
        self.enums.get(full_name.trim_start_matches('.'))
    }

    /// Look up a message type by fully-qualified name, e.g. `messagepackage.MyMessage`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownType`] if no such message is declared.
    pub fn lookup_type(self: &Arc<Self>, full_name: &str) -> Result<MessageType, SchemaError> {
        let key = full_name.trim_start_matches('.');
        let descriptor = self
            .messages
            .get(key)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownType(key.to_owned()))?;
        Ok(MessageType { schema: Arc::clone(self), descriptor })
    }

    /// Whether repeated values of `field` are written packed.
    fn packs(&self, field: &FieldDescriptor) -> bool {
        let packable = match &field.kind {
            FieldKind::Scalar(scalar) => scalar.is_packable(),
            FieldKind::Enum(_) => true,
            FieldKind::Message(_) => false,
        };
        packable && field.is_repeated() && field.packed.unwrap_or(self.syntax == Syntax::Proto3)
    }
}

/// Parse `.proto` text and look up one message type in it.
///
/// # Errors
///
/// Returns the parse error or [`SchemaError::UnknownType`].
pub fn load_type(source: &str, full_name: &str) -> Result<MessageType, SchemaError> {
    Arc::new(Schema::parse(source)?).lookup_type(full_name)
}

/// A message type bound to the schema it was found in.
///
/// Cheap to clone; the schema is shared and never mutated.
#[derive(Clone, Debug)]
pub struct MessageType {
    schema: Arc<Schema>,
    descriptor: Arc<MessageDescriptor>,
}

impl MessageType {
    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.descriptor.full_name
    }

    #[must_use]
    pub fn descriptor(&self) -> &MessageDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Decode one binary frame.
    ///
    /// # Errors
    ///
    /// Returns a decode variant of [`SchemaError`] for malformed bytes.
    pub fn decode(&self, bytes: &[u8]) -> Result<DynamicMessage, SchemaError> {
        decode::decode_message(&self.schema, &self.descriptor, bytes)
    }

    /// Encode a message into protobuf bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::ValueMismatch`] when a value does not fit its field.
    pub fn encode(&self, message: &DynamicMessage) -> Result<Vec<u8>, SchemaError> {
        let mut out = Vec::new();
        encode::encode_message(&self.schema, &self.descriptor, message, &mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
