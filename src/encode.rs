//! Encoding of a [`Value`] tree into its canonical tag stream.
//!
//! Every element goes through a [`DepthTracker`] on its way out, so the encoder refuses to
//! produce anything the decoder would reject for structural reasons.

use std::borrow::Cow;

use crate::depth_tracking::DepthTracker;
use crate::element::*;
use crate::error::Result;
use crate::kind::ContainerKind;
use crate::value::Value;

struct ValueEncoder<'a> {
    depth_tracking: DepthTracker,
    buf: &'a mut Vec<u8>,
}

impl<'a> ValueEncoder<'a> {
    fn new(buf: &'a mut Vec<u8>) -> Self {
        Self {
            depth_tracking: DepthTracker::new(),
            buf,
        }
    }

    fn encode_element(&mut self, elem: Element) -> Result<()> {
        self.depth_tracking.update_elem(&elem)?;
        serialize_elem(self.buf, elem);
        Ok(())
    }

    fn start(&mut self, container: ContainerKind, count: usize) -> Result<()> {
        self.encode_element(Element::ContainerStart(container, count))
    }

    fn end(&mut self, container: ContainerKind, count: usize) -> Result<()> {
        self.encode_element(Element::ContainerEnd {
            container,
            empty: count == 0,
        })
    }

    fn encode(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Logical(v) => self.encode_element(Element::Logical(*v)),
            Value::Integer(v) => self.encode_element(Element::Integer(*v)),
            // Outside of an Array, every double is a run of one
            Value::Double(v) => {
                self.encode_element(Element::Doubles(Cow::Borrowed(std::slice::from_ref(v))))
            }
            Value::String(v) => self.encode_element(Element::Str(v)),
            Value::Blob(v) => self.encode_element(Element::Blob(v)),
            Value::Array(v) => {
                self.start(ContainerKind::Array, v.len())?;
                self.encode_array_items(v)?;
                self.end(ContainerKind::Array, v.len())
            }
            Value::Map(v) => {
                self.start(ContainerKind::Map, v.len())?;
                for (key, val) in v.iter() {
                    self.encode(key)?;
                    self.encode(val)?;
                }
                self.end(ContainerKind::Map, v.len())
            }
            Value::Set(v) => {
                self.start(ContainerKind::Set, v.len())?;
                for elem in v.iter() {
                    self.encode(elem)?;
                }
                self.end(ContainerKind::Set, v.len())
            }
        }
    }

    /// Encode array contents, folding each stretch of consecutive doubles into one run.
    fn encode_array_items(&mut self, items: &[Value]) -> Result<()> {
        let mut rest = items;
        while let Some(first) = rest.first() {
            if first.is_double() {
                let run: Vec<f64> = rest.iter().map_while(Value::as_double).collect();
                rest = &rest[run.len()..];
                self.encode_element(Element::Doubles(Cow::Owned(run)))?;
            } else {
                self.encode(first)?;
                rest = &rest[1..];
            }
        }
        Ok(())
    }
}

/// Append the canonical encoding of `value` to `buf`, with no message framing.
///
/// Fails with [`Error::ParseLimit`][crate::Error::ParseLimit] if the value nests deeper than
/// [`MAX_DEPTH`][crate::MAX_DEPTH]. On failure `buf` is left as it was.
pub fn encode_value(buf: &mut Vec<u8>, value: &Value) -> Result<()> {
    let start_len = buf.len();
    let result = ValueEncoder::new(buf).encode(value);
    if result.is_err() {
        buf.truncate(start_len);
    }
    result
}
