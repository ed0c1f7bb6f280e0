use std::borrow::Cow;

use byteorder::{BigEndian, ByteOrder};

use crate::depth_tracking::DepthTracker;
use crate::error::{Error, Result};
use crate::kind::*;

/// A single tagged item in an encoded stream.
///
/// Containers are flattened into a start element carrying the element count, the elements
/// themselves, and an end element. A run of consecutive doubles is one element.
#[derive(Clone, Debug, PartialEq)]
pub enum Element<'a> {
    Logical(bool),
    Integer(i64),
    Doubles(Cow<'a, [f64]>),
    Str(&'a str),
    Blob(&'a [u8]),
    /// Start of a container with the given number of elements (pairs, for a Map). A count of
    /// zero is the empty form.
    ContainerStart(ContainerKind, usize),
    ContainerEnd {
        container: ContainerKind,
        empty: bool,
    },
    MessageStart {
        empty: bool,
        expected: Category,
    },
    MessageEnd {
        empty: bool,
        expected: Category,
    },
}

impl<'a> Element<'a> {
    pub fn name(&self) -> &'static str {
        use self::Element::*;
        match self {
            Logical(_) => "Logical",
            Integer(_) => "Integer",
            Doubles(_) => "Double",
            Str(_) => "String",
            Blob(_) => "Blob",
            ContainerStart(ContainerKind::Array, _) => "Array start",
            ContainerStart(ContainerKind::Map, _) => "Map start",
            ContainerStart(ContainerKind::Set, _) => "Set start",
            ContainerEnd { .. } => "Container end",
            MessageStart { .. } => "Message start",
            MessageEnd { .. } => "Message end",
        }
    }

    /// Category of the element's leading tag byte.
    pub fn category(&self) -> Category {
        use self::Element::*;
        match self {
            Integer(_) => Category::Integer,
            Doubles(_) => Category::Double,
            Str(_) | Blob(_) => Category::StringOrBlob,
            _ => Category::Other,
        }
    }
}

fn write_uint(buf: &mut Vec<u8>, v: u64) -> u8 {
    let len = unsigned_byte_count(v);
    buf.extend_from_slice(&v.to_be_bytes()[8 - len as usize..]);
    len
}

fn write_length(buf: &mut Vec<u8>, len: usize, blob: bool) {
    if len <= SHORT_LENGTH_MAX {
        let kind = if blob {
            Kind::ShortBlob(len as u8)
        } else {
            Kind::ShortStr(len as u8)
        };
        buf.push(kind.into());
    } else {
        let tag_pos = buf.len();
        buf.push(0);
        let len_bytes = write_uint(buf, len as u64);
        buf[tag_pos] = if blob {
            Kind::LongBlob(len_bytes)
        } else {
            Kind::LongStr(len_bytes)
        }
        .into();
    }
}

/// Serialize an element onto a byte vector. Doesn't check if container structures make
/// sense, just writes elements out.
///
/// # Panics
///
/// Panics if given an empty [`Element::Doubles`] run, which has no encoding.
pub fn serialize_elem(buf: &mut Vec<u8>, elem: Element) {
    use self::Element::*;
    match elem {
        Logical(v) => buf.push(if v { Kind::True } else { Kind::False }.into()),
        Integer(v) => {
            if is_short_integer(v) {
                buf.push(Kind::ShortInt(v as i8).into());
            } else {
                let len = signed_byte_count(v);
                buf.push(Kind::LongInt(len).into());
                buf.extend_from_slice(&v.to_be_bytes()[8 - len as usize..]);
            }
        }
        Doubles(run) => {
            let count = run.len();
            assert!(count > 0, "a Double run needs at least one value");
            if count <= SHORT_DOUBLE_COUNT_MAX {
                buf.push(Kind::ShortDoubles(count as u8).into());
            } else {
                let tag_pos = buf.len();
                buf.push(0);
                let len_bytes = write_uint(buf, count as u64);
                buf[tag_pos] = Kind::LongDoubles(len_bytes).into();
            }
            let start = buf.len();
            buf.resize(start + 8 * count, 0);
            BigEndian::write_f64_into(&run, &mut buf[start..]);
        }
        Str(v) => {
            write_length(buf, v.len(), false);
            buf.extend_from_slice(v.as_bytes());
        }
        Blob(v) => {
            write_length(buf, v.len(), true);
            buf.extend_from_slice(v);
        }
        ContainerStart(container, count) => {
            buf.push(
                Kind::ContainerStart {
                    container,
                    empty: count == 0,
                }
                .into(),
            );
            if count > 0 {
                serialize_elem(buf, Integer(count as i64));
            }
        }
        ContainerEnd { container, empty } => {
            buf.push(Kind::ContainerEnd { container, empty }.into())
        }
        MessageStart { empty, expected } => {
            buf.push(Kind::MessageStart { empty, expected }.into())
        }
        MessageEnd { empty, expected } => buf.push(Kind::MessageEnd { empty, expected }.into()),
    }
}

#[derive(Clone, Debug)]
pub struct Parser<'a> {
    data: &'a [u8],
    depth_tracking: DepthTracker,
    errored: bool,
}

impl<'a> Parser<'a> {
    pub fn new(data: &'a [u8]) -> Parser<'a> {
        Self {
            data,
            depth_tracking: DepthTracker::new(),
            errored: false,
        }
    }

    /// Bytes not yet parsed.
    pub fn remaining(&self) -> &'a [u8] {
        self.data
    }

    fn need(&self, step: &'static str, expected: usize) -> Result<()> {
        if expected > self.data.len() {
            Err(Error::LengthTooShort {
                step,
                actual: self.data.len(),
                expected,
            })
        } else {
            Ok(())
        }
    }

    fn take(&mut self, step: &'static str, len: usize) -> Result<&'a [u8]> {
        self.need(step, len)?;
        let (bytes, data) = self.data.split_at(len);
        self.data = data;
        Ok(bytes)
    }

    fn read_uint(&mut self, step: &'static str, len: u8) -> Result<u64> {
        let bytes = self.take(step, len as usize)?;
        Ok(BigEndian::read_uint(bytes, len as usize))
    }

    fn read_long_int(&mut self, len: u8) -> Result<i64> {
        let bytes = self.take("decode long Integer", len as usize)?;
        let v = BigEndian::read_int(bytes, len as usize);
        if is_short_integer(v) || signed_byte_count(v) != len {
            return Err(Error::BadEncode(format!(
                "Got Integer with value = {} in {} bytes. This is not the shortest encoding.",
                v, len
            )));
        }
        Ok(v)
    }

    fn read_long_length(&mut self, step: &'static str, len: u8, min: u64) -> Result<usize> {
        let v = self.read_uint(step, len)?;
        if v < min || unsigned_byte_count(v) != len {
            return Err(Error::BadEncode(format!(
                "Got {} = {} in {} bytes. This is not the shortest encoding.",
                step, v, len
            )));
        }
        usize::try_from(v).map_err(|_| Error::ParseLimit(format!("{} = {} is too large", step, v)))
    }

    fn read_doubles(&mut self, count: usize) -> Result<Element<'a>> {
        let size = count
            .checked_mul(8)
            .ok_or_else(|| Error::ParseLimit(format!("Double run of {} is too large", count)))?;
        let bytes = self.take("get Double run content", size)?;
        let mut run = vec![0f64; count];
        BigEndian::read_f64_into(bytes, &mut run);
        Ok(Element::Doubles(Cow::Owned(run)))
    }

    fn read_str(&mut self, len: usize) -> Result<Element<'a>> {
        let bytes = self.take("get String content", len)?;
        let string = std::str::from_utf8(bytes).map_err(|e| Error::BadEncode(format!("{}", e)))?;
        Ok(Element::Str(string))
    }

    fn read_count(&mut self, container: ContainerKind) -> Result<usize> {
        let tag = self.take("decode container count", 1)?[0];
        let count = match Kind::from_u8(tag) {
            Kind::ShortInt(v) => v as i64,
            Kind::LongInt(len) => self.read_long_int(len)?,
            _ => {
                return Err(Error::BadEncode(format!(
                    "{} start must be followed by an Integer count, got tag 0x{:02X}",
                    container.name(),
                    tag
                )))
            }
        };
        if count < 1 {
            return Err(Error::BadEncode(format!(
                "Non-empty {} has element count {}",
                container.name(),
                count
            )));
        }
        let count = usize::try_from(count).map_err(|_| {
            Error::ParseLimit(format!("{} count = {} is too large", container.name(), count))
        })?;
        // Every element takes up at least one byte
        let min_bytes = match container {
            ContainerKind::Map => count.saturating_mul(2),
            _ => count,
        };
        self.need("get container elements", min_bytes)?;
        Ok(count)
    }

    // Given a retrieved kind, try to turn it into the next element, which may move through the
    // data. If we can't, error. This function *does not* set the the errored flag. That's up to
    // the caller.
    fn parse_element(&mut self, kind: Kind) -> Result<Element<'a>> {
        let elem = match kind {
            Kind::Invalid(n) => {
                return Err(Error::BadEncode(format!("Invalid tag byte 0x{:02X}", n)))
            }
            Kind::ShortInt(v) => Element::Integer(v as i64),
            Kind::LongInt(len) => Element::Integer(self.read_long_int(len)?),
            Kind::ShortDoubles(count) => self.read_doubles(count as usize)?,
            Kind::LongDoubles(len) => {
                let count = self.read_long_length(
                    "Double run count",
                    len,
                    SHORT_DOUBLE_COUNT_MAX as u64 + 1,
                )?;
                self.read_doubles(count)?
            }
            Kind::ShortStr(len) => self.read_str(len as usize)?,
            Kind::LongStr(len) => {
                let len =
                    self.read_long_length("String length", len, SHORT_LENGTH_MAX as u64 + 1)?;
                self.read_str(len)?
            }
            Kind::ShortBlob(len) => Element::Blob(self.take("get Blob content", len as usize)?),
            Kind::LongBlob(len) => {
                let len =
                    self.read_long_length("Blob length", len, SHORT_LENGTH_MAX as u64 + 1)?;
                Element::Blob(self.take("get Blob content", len)?)
            }
            Kind::False => Element::Logical(false),
            Kind::True => Element::Logical(true),
            Kind::ContainerStart { container, empty } => {
                let count = if empty {
                    0
                } else {
                    self.read_count(container)?
                };
                Element::ContainerStart(container, count)
            }
            Kind::ContainerEnd { container, empty } => Element::ContainerEnd { container, empty },
            Kind::MessageStart { empty, expected } => Element::MessageStart { empty, expected },
            Kind::MessageEnd { empty, expected } => Element::MessageEnd { empty, expected },
        };
        self.depth_tracking.update_elem(&elem)?;
        Ok(elem)
    }
}

impl<'a> std::iter::Iterator for Parser<'a> {
    type Item = Result<Element<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.errored {
            return None;
        }
        let (&tag, data) = self.data.split_first()?;
        self.data = data;
        let result = self.parse_element(Kind::from_u8(tag));
        if result.is_err() {
            self.errored = true;
        }
        Some(result)
    }
}
