//! Deserialization of arbitrary Rust types out of a [`Value`].
//!
//! This is the inverse of the mapping in [`ser`][crate::ser]. Options always deserialize as
//! `Some`, since nothing encodes a missing value; use `#[serde(default)]` for optional fields.

use serde::de::{DeserializeOwned, DeserializeSeed, Deserializer, Error as _, Unexpected, Visitor};

use crate::collections::ValueMap;
use crate::error::{Error, Result};
use crate::value::Value;

impl Value {
    fn unexpected(&self) -> Unexpected {
        match self {
            Value::Logical(v) => Unexpected::Bool(*v),
            Value::Integer(v) => Unexpected::Signed(*v),
            Value::Double(v) => Unexpected::Float(*v),
            Value::String(v) => Unexpected::Str(v),
            Value::Blob(v) => Unexpected::Bytes(v),
            Value::Array(_) | Value::Set(_) => Unexpected::Seq,
            Value::Map(_) => Unexpected::Map,
        }
    }
}

impl<'de> Deserializer<'de> for Value {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Value::Logical(v) => visitor.visit_bool(v),
            Value::Integer(v) => visitor.visit_i64(v),
            Value::Double(v) => visitor.visit_f64(v),
            Value::String(v) => visitor.visit_string(v),
            Value::Blob(v) => visitor.visit_byte_buf(v),
            Value::Array(v) => {
                let len = v.len();
                visitor.visit_seq(SeqAccess::new(v.into_iter(), len))
            }
            Value::Set(v) => {
                let len = v.len();
                visitor.visit_seq(SeqAccess::new(v.into_iter(), len))
            }
            Value::Map(v) => visitor.visit_map(MapAccess::new(v)),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self {
            Value::String(variant) => visitor.visit_enum(EnumAccess {
                variant,
                content: None,
            }),
            Value::Map(map) if map.len() == 1 => {
                let (key, content) = map
                    .into_iter()
                    .next()
                    .ok_or_else(|| Error::SerdeFail("enum map was empty".to_string()))?;
                match key {
                    Value::String(variant) => visitor.visit_enum(EnumAccess {
                        variant,
                        content: Some(content),
                    }),
                    other => Err(Error::invalid_type(other.unexpected(), &"a variant name")),
                }
            }
            other => Err(Error::invalid_type(
                other.unexpected(),
                &"a variant name, or a map with a single pair",
            )),
        }
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 u8 u16 u32 u64 f32 f64 char str
        string bytes byte_buf unit unit_struct
        seq tuple tuple_struct map struct identifier ignored_any
    }
}

struct SeqAccess<I> {
    iter: I,
    size_left: usize,
}

impl<I: Iterator<Item = Value>> SeqAccess<I> {
    fn new(iter: I, len: usize) -> Self {
        Self {
            iter,
            size_left: len,
        }
    }
}

impl<'de, I: Iterator<Item = Value>> serde::de::SeqAccess<'de> for SeqAccess<I> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(value) => {
                self.size_left -= 1;
                seed.deserialize(value).map(Some)
            }
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.size_left)
    }
}

struct MapAccess {
    iter: std::vec::IntoIter<(Value, Value)>,
    pending: Option<Value>,
    size_left: usize,
}

impl MapAccess {
    fn new(map: ValueMap) -> Self {
        let size_left = map.len();
        Self {
            iter: map.into_iter(),
            pending: None,
            size_left,
        }
    }
}

impl<'de> serde::de::MapAccess<'de> for MapAccess {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some((key, value)) => {
                self.size_left -= 1;
                self.pending = Some(value);
                seed.deserialize(key).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: DeserializeSeed<'de>,
    {
        let value = self
            .pending
            .take()
            .ok_or_else(|| Error::SerdeFail("map value requested before its key".to_string()))?;
        seed.deserialize(value)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.size_left)
    }
}

struct EnumAccess {
    variant: String,
    content: Option<Value>,
}

impl<'de> serde::de::EnumAccess<'de> for EnumAccess {
    type Error = Error;
    type Variant = VariantAccess;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, VariantAccess)>
    where
        V: DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(Value::String(self.variant))?;
        Ok((
            variant,
            VariantAccess {
                content: self.content,
            },
        ))
    }
}

struct VariantAccess {
    content: Option<Value>,
}

impl VariantAccess {
    fn content(self, expected: &'static str) -> Result<Value> {
        self.content
            .ok_or_else(|| Error::invalid_type(Unexpected::UnitVariant, &expected))
    }
}

impl<'de> serde::de::VariantAccess<'de> for VariantAccess {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        match self.content {
            None => Ok(()),
            Some(other) => Err(Error::invalid_type(other.unexpected(), &"a unit variant")),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: DeserializeSeed<'de>,
    {
        seed.deserialize(self.content("a newtype variant")?)
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.content("a tuple variant")? {
            Value::Array(v) => {
                let len = v.len();
                visitor.visit_seq(SeqAccess::new(v.into_iter(), len))
            }
            other => Err(Error::invalid_type(other.unexpected(), &"a tuple variant")),
        }
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.content("a struct variant")? {
            Value::Map(map) => visitor.visit_map(MapAccess::new(map)),
            other => Err(Error::invalid_type(other.unexpected(), &"a struct variant")),
        }
    }
}

/// Convert a [`Value`] into any deserializable type.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    T::deserialize(value)
}

/// Deserialize a type from exactly one canonically encoded bare value.
pub fn from_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    from_value(crate::decode::from_bytes(data)?)
}
