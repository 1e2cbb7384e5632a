//! Entity Codec Module
//!
//! Maps entities to flat hash fields (tagged with `_Type`) and to whole-object
//! blobs, driven by a field-descriptor table declared once per schema.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::field::{EnumField, FieldValue, TextField};
use crate::error::{CacheError, Result};

/// Reserved hash field holding the schema kind.
pub const TYPE_FIELD: &str = "_Type";

// == Field Shape ==
/// How a field's value is written as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    /// Assigned as-is
    Text,
    /// Natural text form, parsed back with the type's own rule
    Scalar,
    /// Member name of an enumeration
    Enumeration,
    /// JSON text (collections, arrays, nested records)
    Structured,
}

type EncodeFn<T> = Box<dyn Fn(&T) -> Result<Option<String>> + Send + Sync>;
type DecodeFn<T> = Box<dyn Fn(&mut T, &str) -> Result<()> + Send + Sync>;

/// One named field with its encode/decode pair.
pub struct FieldDescriptor<T> {
    name: &'static str,
    shape: FieldShape,
    encode: EncodeFn<T>,
    decode: DecodeFn<T>,
}

impl<T> FieldDescriptor<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn shape(&self) -> FieldShape {
        self.shape
    }
}

// == Schema ==
/// Kind name plus the field table of an entity type.
pub struct Schema<T> {
    kind: String,
    fields: Vec<FieldDescriptor<T>>,
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<(&str, FieldShape)> = self
            .fields
            .iter()
            .map(|field| (field.name, field.shape))
            .collect();
        f.debug_struct("Schema")
            .field("kind", &self.kind)
            .field("fields", &fields)
            .finish()
    }
}

impl<T: 'static> Schema<T> {
    /// Starts a schema whose payloads are tagged with `kind`.
    pub fn builder(kind: impl Into<String>) -> SchemaBuilder<T> {
        SchemaBuilder {
            kind: kind.into(),
            fields: Vec::new(),
        }
    }
}

impl<T> Schema<T> {
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn fields(&self) -> &[FieldDescriptor<T>] {
        &self.fields
    }
}

/// Declares the fields of a [`Schema`].
///
/// ```ignore
/// let schema = Schema::<Person>::builder("Person")
///     .field("Id", |p| &p.id, |p| &mut p.id)
///     .text("Name", |p| &p.name, |p| &mut p.name)
///     .structured("Tags", |p| &p.tags, |p| &mut p.tags)
///     .build()?;
/// ```
pub struct SchemaBuilder<T> {
    kind: String,
    fields: Vec<FieldDescriptor<T>>,
}

impl<T: 'static> SchemaBuilder<T> {
    /// Textual field, stored and restored verbatim.
    ///
    /// Only `String` and `Option<String>` are textual; other values use
    /// [`SchemaBuilder::field`].
    ///
    /// ```compile_fail
    /// use entity_cache::cache::Schema;
    ///
    /// struct Row {
    ///     id: i32,
    /// }
    ///
    /// let _ = Schema::<Row>::builder("Row").text("Id", |r| &r.id, |r| &mut r.id);
    /// ```
    pub fn text<V: TextField + 'static>(
        self,
        name: &'static str,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> Self {
        self.value_field(name, FieldShape::Text, get, get_mut)
    }

    /// Scalar field (numbers, bool, char, dates), optionally wrapped in `Option`.
    pub fn field<V: FieldValue + 'static>(
        self,
        name: &'static str,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> Self {
        self.value_field(name, FieldShape::Scalar, get, get_mut)
    }

    /// Enumeration field stored by member name.
    pub fn enumeration<V: EnumField>(
        self,
        name: &'static str,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> Self {
        self.push(FieldDescriptor {
            name,
            shape: FieldShape::Enumeration,
            encode: Box::new(move |entity: &T| -> Result<Option<String>> {
                encode_member(name, get(entity)).map(Some)
            }),
            decode: Box::new(move |entity: &mut T, text: &str| -> Result<()> {
                *get_mut(entity) = V::parse_member(text).map_err(|m| CacheError::decode(name, m))?;
                Ok(())
            }),
        })
    }

    /// Nullable enumeration field; None is omitted.
    pub fn optional_enumeration<V: EnumField>(
        self,
        name: &'static str,
        get: fn(&T) -> &Option<V>,
        get_mut: fn(&mut T) -> &mut Option<V>,
    ) -> Self {
        self.push(FieldDescriptor {
            name,
            shape: FieldShape::Enumeration,
            encode: Box::new(move |entity: &T| -> Result<Option<String>> {
                get(entity)
                    .as_ref()
                    .map(|member| encode_member(name, member))
                    .transpose()
            }),
            decode: Box::new(move |entity: &mut T, text: &str| -> Result<()> {
                *get_mut(entity) =
                    Some(V::parse_member(text).map_err(|m| CacheError::decode(name, m))?);
                Ok(())
            }),
        })
    }

    /// Collection, array or nested record stored as JSON text.
    ///
    /// A value that serializes to JSON `null` is omitted.
    pub fn structured<V: Serialize + DeserializeOwned + 'static>(
        self,
        name: &'static str,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> Self {
        self.push(FieldDescriptor {
            name,
            shape: FieldShape::Structured,
            encode: Box::new(move |entity: &T| -> Result<Option<String>> {
                let json = serde_json::to_string(get(entity)).map_err(|e| {
                    CacheError::Serialization(format!("field '{}': {}", name, e))
                })?;
                Ok((json != "null").then_some(json))
            }),
            decode: Box::new(move |entity: &mut T, text: &str| -> Result<()> {
                *get_mut(entity) =
                    serde_json::from_str(text).map_err(|e| CacheError::decode(name, e.to_string()))?;
                Ok(())
            }),
        })
    }

    /// Finishes the schema, rejecting empty kinds and duplicate or reserved names.
    pub fn build(self) -> Result<Schema<T>> {
        if self.kind.trim().is_empty() {
            return Err(CacheError::InvalidArgument(
                "Schema kind cannot be empty".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name == TYPE_FIELD {
                return Err(CacheError::InvalidArgument(format!(
                    "'{}' is reserved for the type tag",
                    TYPE_FIELD
                )));
            }
            if !seen.insert(field.name) {
                return Err(CacheError::InvalidArgument(format!(
                    "Field '{}' is declared twice in schema '{}'",
                    field.name, self.kind
                )));
            }
        }
        Ok(Schema {
            kind: self.kind,
            fields: self.fields,
        })
    }

    fn value_field<V: FieldValue + 'static>(
        self,
        name: &'static str,
        shape: FieldShape,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> Self {
        self.push(FieldDescriptor {
            name,
            shape,
            encode: Box::new(move |entity: &T| -> Result<Option<String>> {
                Ok(get(entity).to_field())
            }),
            decode: Box::new(move |entity: &mut T, text: &str| -> Result<()> {
                *get_mut(entity) = V::from_field(text).map_err(|m| CacheError::decode(name, m))?;
                Ok(())
            }),
        })
    }

    fn push(mut self, field: FieldDescriptor<T>) -> Self {
        self.fields.push(field);
        self
    }
}

fn encode_member<V: EnumField>(name: &str, member: &V) -> Result<String> {
    member
        .member_name()
        .map(str::to_string)
        .ok_or_else(|| CacheError::Serialization(format!("field '{}': unlisted enum member", name)))
}

// == Entity Codec ==
/// Encoder/decoder for one schema; cheap to clone.
pub struct EntityCodec<T> {
    schema: Arc<Schema<T>>,
}

impl<T> Clone for EntityCodec<T> {
    fn clone(&self) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
        }
    }
}

impl<T> fmt::Debug for EntityCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityCodec")
            .field("schema", &self.schema)
            .finish()
    }
}

impl<T> EntityCodec<T> {
    pub fn new(schema: Schema<T>) -> Self {
        Self {
            schema: Arc::new(schema),
        }
    }

    /// Type tag written to and expected in `_Type`.
    pub fn kind(&self) -> &str {
        self.schema.kind()
    }

    pub fn schema(&self) -> &Schema<T> {
        &self.schema
    }

    /// True when a stored `_Type` value names this codec's kind.
    pub fn matches_tag(&self, tag: Option<&str>) -> bool {
        tag.is_some_and(|tag| !tag.trim().is_empty() && tag == self.kind())
    }

    // == Encode ==
    /// Encodes every non-null field, then appends `_Type`.
    pub fn encode(&self, entity: &T) -> Result<Vec<(String, String)>> {
        let mut fields = Vec::with_capacity(self.schema.fields.len() + 1);
        for field in &self.schema.fields {
            if let Some(text) = (field.encode)(entity)? {
                fields.push((field.name.to_string(), text));
            }
        }
        fields.push((TYPE_FIELD.to_string(), self.kind().to_string()));
        Ok(fields)
    }

    // == Decode ==
    /// Rebuilds an entity from hash fields.
    ///
    /// Returns `Ok(None)` when `_Type` is missing or names another kind. Absent
    /// or blank fields keep their default; a present value that fails to parse
    /// is a [`CacheError::Decode`].
    pub fn decode(&self, fields: &[(String, String)]) -> Result<Option<T>>
    where
        T: Default,
    {
        let lookup: HashMap<&str, &str> = fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();

        if !self.matches_tag(lookup.get(TYPE_FIELD).copied()) {
            return Ok(None);
        }

        let mut entity = T::default();
        for field in &self.schema.fields {
            match lookup.get(field.name) {
                Some(text) if !text.trim().is_empty() => (field.decode)(&mut entity, text)?,
                _ => continue,
            }
        }
        Ok(Some(entity))
    }
}

impl<T: Serialize + DeserializeOwned> EntityCodec<T> {
    // == Blob ==
    /// Serializes the whole entity for single-value storage.
    pub fn encode_blob(&self, entity: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(entity)?)
    }

    /// Restores an entity written by [`EntityCodec::encode_blob`].
    pub fn decode_blob(&self, bytes: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
