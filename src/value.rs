use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Index;

use base64::{engine::general_purpose, Engine as _};

use crate::collections::{ValueMap, ValueSet};
use crate::error::Result;
use crate::kind::Category;

/// A dynamically-typed value that can be carried in a message.
///
/// Arrays compare in order. Maps and Sets compare without regard to order. Doubles compare
/// by bit pattern, so equality agrees with the encoded form and is a true equivalence.
#[derive(Clone, Debug)]
pub enum Value {
    Logical(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Blob(Vec<u8>),
    Array(Vec<Value>),
    Map(ValueMap),
    Set(ValueSet),
}

impl Value {
    /// Category of the value's leading tag byte. This is the hint a message's framing tags
    /// carry about the top value.
    pub fn category(&self) -> Category {
        match self {
            Value::Integer(_) => Category::Integer,
            Value::Double(_) => Category::Double,
            Value::String(_) | Value::Blob(_) => Category::StringOrBlob,
            Value::Logical(_) | Value::Array(_) | Value::Map(_) | Value::Set(_) => {
                Category::Other
            }
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Logical(_) => "Logical",
            Value::Integer(_) => "Integer",
            Value::Double(_) => "Double",
            Value::String(_) => "String",
            Value::Blob(_) => "Blob",
            Value::Array(_) => "Array",
            Value::Map(_) => "Map",
            Value::Set(_) => "Set",
        }
    }

    /// The canonical encoding of this value, without message framing.
    pub fn encoded(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        crate::encode::encode_value(&mut buf, self)?;
        Ok(buf)
    }

    /// Container nesting depth. Scalars are at depth 0.
    pub fn depth(&self) -> usize {
        match self {
            Value::Array(v) => 1 + v.iter().map(Value::depth).max().unwrap_or(0),
            Value::Map(v) => {
                1 + v
                    .iter()
                    .map(|(k, v)| k.depth().max(v.depth()))
                    .max()
                    .unwrap_or(0)
            }
            Value::Set(v) => 1 + v.iter().map(Value::depth).max().unwrap_or(0),
            _ => 0,
        }
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, Value::Logical(_))
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Value::Integer(_))
    }

    pub fn is_double(&self) -> bool {
        matches!(self, Value::Double(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    pub fn is_blob(&self) -> bool {
        matches!(self, Value::Blob(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    pub fn is_set(&self) -> bool {
        matches!(self, Value::Set(_))
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Map(_) | Value::Set(_))
    }

    pub fn as_logical(&self) -> Option<bool> {
        if let Value::Logical(val) = *self {
            Some(val)
        } else {
            None
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        if let Value::Integer(val) = *self {
            Some(val)
        } else {
            None
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        if let Value::Double(val) = *self {
            Some(val)
        } else {
            None
        }
    }

    /// Either numeric type as a double.
    pub fn as_floating(&self) -> Option<f64> {
        match *self {
            Value::Integer(n) => Some(n as f64),
            Value::Double(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        if let Value::String(ref val) = *self {
            Some(val.as_str())
        } else {
            None
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        if let Value::Blob(ref val) = *self {
            Some(val)
        } else {
            None
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        if let Value::Array(ref array) = *self {
            Some(array)
        } else {
            None
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match *self {
            Value::Array(ref mut array) => Some(array),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        if let Value::Map(ref map) = *self {
            Some(map)
        } else {
            None
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut ValueMap> {
        match *self {
            Value::Map(ref mut map) => Some(map),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&ValueSet> {
        if let Value::Set(ref set) = *self {
            Some(set)
        } else {
            None
        }
    }

    pub fn as_set_mut(&mut self) -> Option<&mut ValueSet> {
        match *self {
            Value::Set(ref mut set) => Some(set),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Logical(s), Value::Logical(o)) => s == o,
            (Value::Integer(s), Value::Integer(o)) => s == o,
            (Value::Double(s), Value::Double(o)) => s.to_bits() == o.to_bits(),
            (Value::String(s), Value::String(o)) => s == o,
            (Value::Blob(s), Value::Blob(o)) => s == o,
            (Value::Array(s), Value::Array(o)) => s == o,
            (Value::Map(s), Value::Map(o)) => s == o,
            (Value::Set(s), Value::Set(o)) => s == o,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Logical(v) => v.hash(state),
            Value::Integer(v) => v.hash(state),
            Value::Double(v) => v.to_bits().hash(state),
            Value::String(v) => v.hash(state),
            Value::Blob(v) => v.hash(state),
            Value::Array(v) => v.hash(state),
            Value::Map(v) => v.hash(state),
            Value::Set(v) => v.hash(state),
        }
    }
}

impl Index<usize> for Value {
    type Output = Value;

    /// Index into an Array.
    ///
    /// # Panics
    ///
    /// Panics if this isn't an Array or the index is out of bounds.
    fn index(&self, index: usize) -> &Self::Output {
        match self {
            Value::Array(v) => &v[index],
            other => panic!("cannot index into a {}", other.type_name()),
        }
    }
}

fn write_string(f: &mut fmt::Formatter, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c => write!(f, "{}", c)?,
        }
    }
    f.write_str("\"")
}

fn write_sequence<'a>(
    f: &mut fmt::Formatter,
    open: &str,
    close: &str,
    items: impl Iterator<Item = &'a Value>,
) -> fmt::Result {
    let mut items = items.peekable();
    if items.peek().is_none() {
        return write!(f, "{}{}", open, close);
    }
    f.write_str(open)?;
    for item in items {
        write!(f, " {}", item)?;
    }
    write!(f, " {}", close)
}

/// Compact text form: `( )` for arrays, `{ key > value }` for maps, `[ ]` for sets, and
/// `%length%base64%` for blobs.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Logical(v) => write!(f, "{}", v),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{:?}", v),
            Value::String(v) => write_string(f, v),
            Value::Blob(v) => write!(f, "%{}%{}%", v.len(), general_purpose::STANDARD.encode(v)),
            Value::Array(v) => write_sequence(f, "(", ")", v.iter()),
            Value::Map(v) => {
                if v.is_empty() {
                    return f.write_str("{}");
                }
                f.write_str("{")?;
                for (key, val) in v.iter() {
                    write!(f, " {} > {}", key, val)?;
                }
                f.write_str(" }")
            }
            Value::Set(v) => write_sequence(f, "[", "]", v.iter()),
        }
    }
}

macro_rules! impl_value_from_integer {
    ($t: ty) => {
        impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Integer(i64::from(v))
            }
        }
    };
}

macro_rules! impl_value_from {
    ($t: ty, $p: ident) => {
        impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::$p(v)
            }
        }
    };
}

impl_value_from!(bool, Logical);
impl_value_from!(f64, Double);
impl_value_from!(String, String);
impl_value_from!(Vec<u8>, Blob);
impl_value_from!(Vec<Value>, Array);
impl_value_from!(ValueMap, Map);
impl_value_from!(ValueSet, Set);
impl_value_from_integer!(u8);
impl_value_from_integer!(u16);
impl_value_from_integer!(u32);
impl_value_from_integer!(i8);
impl_value_from_integer!(i16);
impl_value_from_integer!(i32);
impl_value_from_integer!(i64);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Double(f64::from(v))
    }
}

impl<'a> From<&'a str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<'a> From<Cow<'a, str>> for Value {
    fn from(v: Cow<'a, str>) -> Self {
        Value::String(v.into_owned())
    }
}

impl<'a> From<&'a [u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Blob(v.into())
    }
}

impl<V: Into<Value>> std::iter::FromIterator<V> for Value {
    fn from_iter<T: IntoIterator<Item = V>>(iter: T) -> Self {
        let v: Vec<Value> = iter.into_iter().map(Into::into).collect();
        Value::Array(v)
    }
}

macro_rules! impl_try_from_value {
    ($t: ty, $p: ident) => {
        impl TryFrom<Value> for $t {
            type Error = Value;
            fn try_from(v: Value) -> Result<Self, Self::Error> {
                match v {
                    Value::$p(v) => Ok(v),
                    _ => Err(v),
                }
            }
        }
    };
}

macro_rules! impl_try_from_value_integer {
    ($t: ty) => {
        impl TryFrom<Value> for $t {
            type Error = Value;
            fn try_from(v: Value) -> Result<Self, Self::Error> {
                match v {
                    Value::Integer(i) => TryFrom::try_from(i).map_err(|_| v),
                    _ => Err(v),
                }
            }
        }
    };
}

impl_try_from_value!(bool, Logical);
impl_try_from_value!(f64, Double);
impl_try_from_value!(String, String);
impl_try_from_value!(Vec<u8>, Blob);
impl_try_from_value!(Vec<Value>, Array);
impl_try_from_value!(ValueMap, Map);
impl_try_from_value!(ValueSet, Set);
impl_try_from_value_integer!(u8);
impl_try_from_value_integer!(u16);
impl_try_from_value_integer!(u32);
impl_try_from_value_integer!(u64);
impl_try_from_value_integer!(usize);
impl_try_from_value_integer!(i8);
impl_try_from_value_integer!(i16);
impl_try_from_value_integer!(i32);
impl_try_from_value_integer!(i64);
impl_try_from_value_integer!(isize);

impl serde::Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::{SerializeMap, SerializeSeq};
        match self {
            Value::Logical(v) => serializer.serialize_bool(*v),
            Value::Integer(v) => serializer.serialize_i64(*v),
            Value::Double(v) => serializer.serialize_f64(*v),
            Value::String(v) => serializer.serialize_str(v),
            Value::Blob(v) => serde::Serialize::serialize(serde_bytes::Bytes::new(v), serializer),
            Value::Array(v) => serde::Serialize::serialize(v, serializer),
            Value::Map(v) => {
                let mut map = serializer.serialize_map(Some(v.len()))?;
                for (key, val) in v.iter() {
                    map.serialize_entry(key, val)?;
                }
                map.end()
            }
            Value::Set(v) => {
                let mut seq = serializer.serialize_seq(Some(v.len()))?;
                for elem in v.iter() {
                    seq.serialize_element(elem)?;
                }
                seq.end()
            }
        }
    }
}

impl<'de> serde::Deserialize<'de> for Value {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::*;

        struct ValueVisitor;
        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
                fmt.write_str("a Logical, Integer, Double, String, Blob, Array, or Map")
            }

            fn visit_bool<E: Error>(self, v: bool) -> Result<Self::Value, E> {
                Ok(Value::Logical(v))
            }

            fn visit_i64<E: Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(Value::Integer(v))
            }

            fn visit_u64<E: Error>(self, v: u64) -> Result<Self::Value, E> {
                i64::try_from(v)
                    .map(Value::Integer)
                    .map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &"an i64 integer"))
            }

            fn visit_f64<E: Error>(self, v: f64) -> Result<Self::Value, E> {
                Ok(Value::Double(v))
            }

            fn visit_str<E: Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(Value::String(v.into()))
            }

            fn visit_string<E: Error>(self, v: String) -> Result<Self::Value, E> {
                Ok(Value::String(v))
            }

            fn visit_bytes<E: Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                Ok(Value::Blob(v.into()))
            }

            fn visit_byte_buf<E: Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
                Ok(Value::Blob(v))
            }

            fn visit_unit<E: Error>(self) -> Result<Self::Value, E> {
                Err(E::invalid_type(Unexpected::Unit, &self))
            }

            fn visit_none<E: Error>(self) -> Result<Self::Value, E> {
                Err(E::invalid_type(Unexpected::Option, &self))
            }

            fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
                Value::deserialize(d)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                // Allocate with the size hint, but be conservative. 4096 is what serde uses
                // internally for collections, so we'll do likewise.
                let mut seq = match access.size_hint() {
                    Some(size) => Vec::with_capacity(size.min(4096)),
                    None => Vec::new(),
                };
                while let Some(elem) = access.next_element()? {
                    seq.push(elem);
                }
                Ok(Value::Array(seq))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = ValueMap::new();
                while let Some((key, val)) = access.next_entry::<Value, Value>()? {
                    if map.insert_new(key, val).is_err() {
                        return Err(A::Error::custom("duplicate key in map"));
                    }
                }
                Ok(Value::Map(map))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn categories() {
        assert_eq!(Value::from(true).category(), Category::Other);
        assert_eq!(Value::from(3).category(), Category::Integer);
        assert_eq!(Value::from(3.5).category(), Category::Double);
        assert_eq!(Value::from("s").category(), Category::StringOrBlob);
        assert_eq!(Value::from(vec![1u8]).category(), Category::StringOrBlob);
        assert_eq!(Value::Array(vec![]).category(), Category::Other);
        assert_eq!(Value::Map(ValueMap::new()).category(), Category::Other);
        assert_eq!(Value::Set(ValueSet::new()).category(), Category::Other);
    }

    #[test]
    fn double_equality_by_bits() {
        assert_eq!(Value::Double(f64::NAN), Value::Double(f64::NAN));
        assert_ne!(Value::Double(0.0), Value::Double(-0.0));
        assert_eq!(Value::Double(1.5), Value::from(1.5f32));
        assert_ne!(Value::Double(1.0), Value::Integer(1));
    }

    #[test]
    fn array_equality_is_ordered() {
        let a: Value = vec![1, 2].into_iter().collect();
        let b: Value = vec![2, 1].into_iter().collect();
        assert_ne!(a, b);
        assert_eq!(a[1], Value::Integer(2));
    }

    #[test]
    fn depth() {
        assert_eq!(Value::from(1).depth(), 0);
        let inner = Value::Array(vec![Value::Array(vec![])]);
        assert_eq!(inner.depth(), 2);
        let mut map = ValueMap::new();
        map.insert(inner, 1);
        assert_eq!(Value::Map(map).depth(), 3);
    }

    #[test]
    fn try_from() {
        assert_eq!(u8::try_from(Value::Integer(200)), Ok(200u8));
        assert_eq!(u8::try_from(Value::Integer(300)), Err(Value::Integer(300)));
        assert_eq!(String::try_from(Value::from("hi")), Ok("hi".to_string()));
        assert_eq!(bool::try_from(Value::Integer(1)), Err(Value::Integer(1)));
    }

    #[test]
    fn display_scalars() {
        assert_eq!(Value::from(false).to_string(), "false");
        assert_eq!(Value::from(-144).to_string(), "-144");
        assert_eq!(Value::from(42.0).to_string(), "42.0");
        assert_eq!(
            Value::from("say \"hi\"\n").to_string(),
            "\"say \\\"hi\\\"\\n\""
        );
        assert_eq!(Value::from(&b"abc"[..]).to_string(), "%3%YWJj%");
    }

    #[test]
    fn display_containers() {
        assert_eq!(Value::Array(vec![]).to_string(), "()");
        assert_eq!(Value::Map(ValueMap::new()).to_string(), "{}");
        assert_eq!(Value::Set(ValueSet::new()).to_string(), "[]");
        let array: Value = vec![1, 2].into_iter().collect();
        assert_eq!(array.to_string(), "( 1 2 )");
        let mut map = ValueMap::new();
        map.insert(false, 13);
        map.insert("a", array);
        assert_eq!(Value::Map(map).to_string(), "{ false > 13 \"a\" > ( 1 2 ) }");
        let set: ValueSet = vec!["x"].into_iter().collect();
        assert_eq!(Value::Set(set).to_string(), "[ \"x\" ]");
    }

    #[test]
    fn serde_json_out() {
        let mut map = ValueMap::new();
        map.insert("k", vec![Value::from(1), Value::from(2.5), Value::from(true)]);
        let json = serde_json::to_string(&Value::Map(map)).unwrap();
        assert_eq!(json, r#"{"k":[1,2.5,true]}"#);

        let set: ValueSet = vec![1, 2].into_iter().collect();
        let json = serde_json::to_string(&Value::Set(set)).unwrap();
        assert_eq!(json, "[1,2]");
    }

    #[test]
    fn serde_json_in() {
        let val: Value = serde_json::from_str(r#"[1, -2.5, "a", {"k": true}]"#).unwrap();
        let mut map = ValueMap::new();
        map.insert("k", true);
        let expected = Value::Array(vec![
            Value::Integer(1),
            Value::Double(-2.5),
            Value::from("a"),
            Value::Map(map),
        ]);
        assert_eq!(val, expected);
    }

    #[test]
    fn serde_json_rejects_null() {
        assert!(serde_json::from_str::<Value>("null").is_err());
        assert!(serde_json::from_str::<Value>("[1, null]").is_err());
        assert!(serde_json::from_str::<Value>("18446744073709551615").is_err());
    }
}
