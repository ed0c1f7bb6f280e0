//! Decoding of a tag stream back into a [`Value`] tree.
//!
//! Decoding fails if the stream isn't in canonical form. That is:
//! - All integers, lengths, and counts are encoded in as few bytes as possible
//! - Consecutive doubles inside an Array form a single run
//! - Container counts agree with the elements actually present
//! - Map keys and Set elements are unique
//! - Strings are valid UTF-8
//!
//! Every strict prefix of a valid encoding fails to decode.

use crate::collections::{ValueMap, ValueSet};
use crate::element::{Element, Parser};
use crate::error::{Error, Result};
use crate::kind::{Category, ContainerKind};
use crate::value::Value;

struct ValueDecoder<'a> {
    parser: Parser<'a>,
}

impl<'a> ValueDecoder<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            parser: Parser::new(data),
        }
    }

    fn next_elem(&mut self, step: &'static str) -> Result<Element<'a>> {
        self.parser.next().ok_or(Error::LengthTooShort {
            step,
            actual: 0,
            expected: 1,
        })?
    }

    fn consumed(&self, data: &[u8]) -> usize {
        data.len() - self.parser.remaining().len()
    }

    fn decode_value(&mut self) -> Result<Value> {
        let elem = self.next_elem("get next value")?;
        self.value_from(elem)
    }

    fn value_from(&mut self, elem: Element<'a>) -> Result<Value> {
        Ok(match elem {
            Element::Logical(v) => Value::Logical(v),
            Element::Integer(v) => Value::Integer(v),
            Element::Doubles(run) => {
                if run.len() != 1 {
                    return Err(Error::BadEncode(format!(
                        "Got a run of {} Doubles where a single value was expected",
                        run.len()
                    )));
                }
                Value::Double(run[0])
            }
            Element::Str(v) => Value::String(v.to_string()),
            Element::Blob(v) => Value::Blob(v.to_vec()),
            Element::ContainerStart(ContainerKind::Array, count) => {
                Value::Array(self.decode_array(count)?)
            }
            Element::ContainerStart(ContainerKind::Map, count) => {
                Value::Map(self.decode_map(count)?)
            }
            Element::ContainerStart(ContainerKind::Set, count) => {
                Value::Set(self.decode_set(count)?)
            }
            Element::ContainerEnd { container, .. } => {
                return Err(Error::BadEncode(format!(
                    "Got a {} end where a value was expected",
                    container.name()
                )))
            }
            Element::MessageStart { .. } | Element::MessageEnd { .. } => {
                return Err(Error::BadFraming(format!(
                    "Got a {} where a value was expected",
                    elem.name()
                )))
            }
        })
    }

    fn decode_end(&mut self, container: ContainerKind) -> Result<()> {
        match self.next_elem("get container end")? {
            Element::ContainerEnd { .. } => Ok(()),
            other => Err(Error::BadEncode(format!(
                "{} has more elements than its count, got {}",
                container.name(),
                other.name()
            ))),
        }
    }

    fn decode_array(&mut self, count: usize) -> Result<Vec<Value>> {
        // The parser has already checked there are at least `count` bytes left
        let mut array = Vec::with_capacity(count);
        while array.len() < count {
            match self.next_elem("get Array element")? {
                Element::Doubles(run) => array.extend(run.iter().map(|v| Value::Double(*v))),
                elem => {
                    let value = self.value_from(elem)?;
                    array.push(value);
                }
            }
        }
        self.decode_end(ContainerKind::Array)?;
        Ok(array)
    }

    fn decode_map(&mut self, count: usize) -> Result<ValueMap> {
        let mut map = ValueMap::with_capacity(count);
        for _ in 0..count {
            let key = self.decode_value()?;
            let val = self.decode_value()?;
            if let Err((key, _)) = map.insert_new(key, val) {
                return Err(Error::BadEncode(format!("Map has a repeated key {}", key)));
            }
        }
        self.decode_end(ContainerKind::Map)?;
        Ok(map)
    }

    fn decode_set(&mut self, count: usize) -> Result<ValueSet> {
        let mut set = ValueSet::with_capacity(count);
        for _ in 0..count {
            let elem = self.decode_value()?;
            if let Err(elem) = set.insert_new(elem) {
                return Err(Error::BadEncode(format!("Set has a repeated element {}", elem)));
            }
        }
        self.decode_end(ContainerKind::Set)?;
        Ok(set)
    }

    fn decode_message(&mut self) -> Result<Option<Value>> {
        let (empty, expected) = match self.next_elem("get message start")? {
            Element::MessageStart { empty, expected } => (empty, expected),
            other => {
                return Err(Error::BadFraming(format!(
                    "Expected a Message start, got {}",
                    other.name()
                )))
            }
        };
        if empty && expected != Category::Integer {
            return Err(Error::BadFraming(format!(
                "Empty message start carries an expected category of {:?}",
                expected
            )));
        }

        let value = if empty {
            None
        } else {
            let value = self.decode_value()?;
            if value.category() != expected {
                return Err(Error::BadFraming(format!(
                    "Message start expected a {:?} value, but got a {}",
                    expected,
                    value.type_name()
                )));
            }
            Some(value)
        };

        match self.next_elem("get message end")? {
            Element::MessageEnd {
                empty: end_empty,
                expected: end_expected,
            } if end_empty == empty && end_expected == expected => Ok(value),
            Element::MessageEnd { .. } => Err(Error::BadFraming(String::from(
                "Message end tag doesn't mirror the start tag",
            ))),
            other => Err(Error::BadFraming(format!(
                "Expected a Message end, got {}",
                other.name()
            ))),
        }
    }
}

/// Decode a single bare value from the front of `data`, with no message framing. Returns the
/// value and the number of bytes it took up.
pub fn decode_value(data: &[u8]) -> Result<(Value, usize)> {
    let mut de = ValueDecoder::new(data);
    let value = de.decode_value()?;
    Ok((value, de.consumed(data)))
}

/// Decode one framed message from the front of `data`. Returns the top value, or `None` for
/// an empty message, and the number of bytes the message took up.
pub fn decode_message(data: &[u8]) -> Result<(Option<Value>, usize)> {
    let mut de = ValueDecoder::new(data);
    let value = de.decode_message()?;
    Ok((value, de.consumed(data)))
}

/// Decode exactly one bare value, failing if any bytes are left over.
pub fn from_bytes(data: &[u8]) -> Result<Value> {
    let (value, used) = decode_value(data)?;
    if used != data.len() {
        return Err(Error::TrailingData(data.len() - used));
    }
    Ok(value)
}
