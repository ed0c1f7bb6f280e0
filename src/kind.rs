//! The one-byte tag scheme.
//!
//! Bits 7..6 of every tag select the category. The remaining bits carry a short value, a
//! length, or a count of trailing length bytes, depending on the category:
//!
//! | Range          | Meaning                                                    |
//! |----------------|------------------------------------------------------------|
//! | `0x00..=0x1F`  | Integer, short form, value `-16..=15` in 5-bit two's complement |
//! | `0x20..=0x27`  | Integer, long form, 1 to 8 big-endian bytes follow         |
//! | `0x40..=0x5F`  | Run of 1 to 32 doubles                                     |
//! | `0x60..=0x67`  | Run of doubles, count held in 1 to 8 following bytes       |
//! | `0x80..=0x8F`  | String, length 0 to 15                                     |
//! | `0x90..=0x97`  | String, length held in 1 to 8 following bytes              |
//! | `0xA0..=0xAF`  | Blob, length 0 to 15                                       |
//! | `0xB0..=0xB7`  | Blob, length held in 1 to 8 following bytes                |
//! | `0xC0`/`0xC1`  | Logical false / true                                       |
//! | `0xD4..=0xDE`  | Container start (Array, Map, Set; non-empty or empty)      |
//! | `0xE4..=0xEE`  | Container end                                              |
//! | `0xF0..=0xF7`  | Message start                                              |
//! | `0xF8..=0xFF`  | Message end                                                |
//!
//! Every other byte is invalid as a tag.

/// 0xc0
pub(crate) const MASK_CATEGORY: u8 = 0b1100_0000;
pub(crate) const CATEGORY_INTEGER: u8 = 0b0000_0000;
pub(crate) const CATEGORY_DOUBLE: u8 = 0b0100_0000;
pub(crate) const CATEGORY_STRING_OR_BLOB: u8 = 0b1000_0000;
pub(crate) const CATEGORY_OTHER: u8 = 0b1100_0000;

/// Long form indicator for Integer and Double tags, 0x20
pub(crate) const LONG_BIT: u8 = 0b0010_0000;
/// Mask for the count of trailing length bytes, stored as count - 1
pub(crate) const MASK_BYTE_COUNT: u8 = 0b0000_0111;

pub(crate) const MASK_SHORT_INTEGER: u8 = 0b0001_1111;
pub(crate) const SHORT_INTEGER_MIN: i64 = -16;
pub(crate) const SHORT_INTEGER_MAX: i64 = 15;

pub(crate) const MASK_SHORT_DOUBLE_COUNT: u8 = 0b0001_1111;
pub(crate) const SHORT_DOUBLE_COUNT_MAX: usize = 32;

/// Blob indicator for StringOrBlob tags, 0x20
pub(crate) const BLOB_BIT: u8 = 0b0010_0000;
/// Long length indicator for StringOrBlob tags, 0x10
pub(crate) const LONG_LENGTH_BIT: u8 = 0b0001_0000;
pub(crate) const MASK_SHORT_LENGTH: u8 = 0b0000_1111;
pub(crate) const SHORT_LENGTH_MAX: usize = 15;

pub(crate) const OTHER_LOGICAL: u8 = 0b0000_0000;
pub(crate) const OTHER_CONTAINER_START: u8 = 0b0001_0000;
pub(crate) const OTHER_CONTAINER_END: u8 = 0b0010_0000;
pub(crate) const OTHER_MESSAGE: u8 = 0b0011_0000;

pub(crate) const CONTAINER_ARRAY: u8 = 0b0000_0100;
pub(crate) const CONTAINER_MAP: u8 = 0b0000_1000;
pub(crate) const CONTAINER_SET: u8 = 0b0000_1100;
pub(crate) const CONTAINER_EMPTY_BIT: u8 = 0b0000_0010;

pub(crate) const MESSAGE_END_BIT: u8 = 0b0000_1000;
pub(crate) const MESSAGE_EMPTY_BIT: u8 = 0b0000_0100;
pub(crate) const MASK_MESSAGE_EXPECTED: u8 = 0b0000_0011;

/// The four top-level tag categories. Message framing tags carry one of these as a hint of
/// what the top value will be.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    Integer,
    Double,
    StringOrBlob,
    Other,
}

impl Category {
    /// Category of an arbitrary tag byte.
    pub fn of_tag(n: u8) -> Category {
        Category::from_bits((n & MASK_CATEGORY) >> 6)
    }

    fn from_bits(bits: u8) -> Category {
        match bits & 0b11 {
            0 => Category::Integer,
            1 => Category::Double,
            2 => Category::StringOrBlob,
            _ => Category::Other,
        }
    }

    fn into_bits(self) -> u8 {
        match self {
            Category::Integer => 0,
            Category::Double => 1,
            Category::StringOrBlob => 2,
            Category::Other => 3,
        }
    }
}

/// The three container types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerKind {
    Array,
    Map,
    Set,
}

impl ContainerKind {
    pub fn name(&self) -> &'static str {
        match self {
            ContainerKind::Array => "Array",
            ContainerKind::Map => "Map",
            ContainerKind::Set => "Set",
        }
    }

    fn into_bits(self) -> u8 {
        match self {
            ContainerKind::Array => CONTAINER_ARRAY,
            ContainerKind::Map => CONTAINER_MAP,
            ContainerKind::Set => CONTAINER_SET,
        }
    }
}

/// A decoded tag byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    /// Integer stored in the tag itself.
    ShortInt(i8),
    /// Integer stored in this many following bytes (1 to 8).
    LongInt(u8),
    /// Run of this many doubles (1 to 32).
    ShortDoubles(u8),
    /// Run of doubles whose count is stored in this many following bytes.
    LongDoubles(u8),
    /// String of this length (0 to 15).
    ShortStr(u8),
    /// String whose length is stored in this many following bytes.
    LongStr(u8),
    ShortBlob(u8),
    LongBlob(u8),
    False,
    True,
    ContainerStart { container: ContainerKind, empty: bool },
    ContainerEnd { container: ContainerKind, empty: bool },
    MessageStart { empty: bool, expected: Category },
    MessageEnd { empty: bool, expected: Category },
    Invalid(u8),
}

impl Kind {
    /// Classify a single tag byte.
    pub fn from_u8(n: u8) -> Kind {
        match n {
            0x00..=0x1f => Kind::ShortInt(((n << 3) as i8) >> 3),
            0x20..=0x27 => Kind::LongInt((n & MASK_BYTE_COUNT) + 1),
            0x40..=0x5f => Kind::ShortDoubles((n & MASK_SHORT_DOUBLE_COUNT) + 1),
            0x60..=0x67 => Kind::LongDoubles((n & MASK_BYTE_COUNT) + 1),
            0x80..=0x8f => Kind::ShortStr(n & MASK_SHORT_LENGTH),
            0x90..=0x97 => Kind::LongStr((n & MASK_BYTE_COUNT) + 1),
            0xa0..=0xaf => Kind::ShortBlob(n & MASK_SHORT_LENGTH),
            0xb0..=0xb7 => Kind::LongBlob((n & MASK_BYTE_COUNT) + 1),
            0xc0 => Kind::False,
            0xc1 => Kind::True,
            0xd0..=0xef => Self::container_from_u8(n),
            0xf0..=0xff => {
                let empty = (n & MESSAGE_EMPTY_BIT) != 0;
                let expected = Category::from_bits(n & MASK_MESSAGE_EXPECTED);
                if (n & MESSAGE_END_BIT) != 0 {
                    Kind::MessageEnd { empty, expected }
                } else {
                    Kind::MessageStart { empty, expected }
                }
            }
            _ => Kind::Invalid(n),
        }
    }

    fn container_from_u8(n: u8) -> Kind {
        // Bit 0 is unused and must be clear
        if (n & 0x01) != 0 {
            return Kind::Invalid(n);
        }
        let container = match n & CONTAINER_SET {
            CONTAINER_ARRAY => ContainerKind::Array,
            CONTAINER_MAP => ContainerKind::Map,
            CONTAINER_SET => ContainerKind::Set,
            _ => return Kind::Invalid(n),
        };
        let empty = (n & CONTAINER_EMPTY_BIT) != 0;
        if (n & OTHER_MESSAGE) == OTHER_CONTAINER_START {
            Kind::ContainerStart { container, empty }
        } else {
            Kind::ContainerEnd { container, empty }
        }
    }

    /// Converts a kind into its single-byte representation.
    /// Assumes the content of the kind is already within range.
    pub fn into_u8(self) -> u8 {
        match self {
            Kind::ShortInt(v) => CATEGORY_INTEGER | ((v as u8) & MASK_SHORT_INTEGER),
            Kind::LongInt(len) => CATEGORY_INTEGER | LONG_BIT | (len - 1),
            Kind::ShortDoubles(count) => CATEGORY_DOUBLE | (count - 1),
            Kind::LongDoubles(len) => CATEGORY_DOUBLE | LONG_BIT | (len - 1),
            Kind::ShortStr(len) => CATEGORY_STRING_OR_BLOB | len,
            Kind::LongStr(len) => CATEGORY_STRING_OR_BLOB | LONG_LENGTH_BIT | (len - 1),
            Kind::ShortBlob(len) => CATEGORY_STRING_OR_BLOB | BLOB_BIT | len,
            Kind::LongBlob(len) => {
                CATEGORY_STRING_OR_BLOB | BLOB_BIT | LONG_LENGTH_BIT | (len - 1)
            }
            Kind::False => CATEGORY_OTHER | OTHER_LOGICAL,
            Kind::True => CATEGORY_OTHER | OTHER_LOGICAL | 0x01,
            Kind::ContainerStart { container, empty } => {
                CATEGORY_OTHER
                    | OTHER_CONTAINER_START
                    | container.into_bits()
                    | if empty { CONTAINER_EMPTY_BIT } else { 0 }
            }
            Kind::ContainerEnd { container, empty } => {
                CATEGORY_OTHER
                    | OTHER_CONTAINER_END
                    | container.into_bits()
                    | if empty { CONTAINER_EMPTY_BIT } else { 0 }
            }
            Kind::MessageStart { empty, expected } => {
                CATEGORY_OTHER
                    | OTHER_MESSAGE
                    | if empty { MESSAGE_EMPTY_BIT } else { 0 }
                    | expected.into_bits()
            }
            Kind::MessageEnd { empty, expected } => {
                CATEGORY_OTHER
                    | OTHER_MESSAGE
                    | MESSAGE_END_BIT
                    | if empty { MESSAGE_EMPTY_BIT } else { 0 }
                    | expected.into_bits()
            }
            Kind::Invalid(n) => n,
        }
    }

    pub fn is_message_end(&self) -> bool {
        matches!(self, Kind::MessageEnd { .. })
    }
}

impl From<u8> for Kind {
    fn from(val: u8) -> Kind {
        Kind::from_u8(val)
    }
}

impl From<Kind> for u8 {
    fn from(val: Kind) -> u8 {
        val.into_u8()
    }
}

/// Whether an integer fits in the tag byte itself.
pub(crate) fn is_short_integer(v: i64) -> bool {
    (SHORT_INTEGER_MIN..=SHORT_INTEGER_MAX).contains(&v)
}

/// Smallest number of big-endian two's complement bytes that can hold `v`.
pub(crate) fn signed_byte_count(v: i64) -> u8 {
    // Number of bits needed, not counting redundant sign bits, plus the sign bit itself
    let bits = 65 - if v < 0 { v.leading_ones() } else { v.leading_zeros() };
    ((bits + 7) / 8).max(1) as u8
}

/// Smallest number of big-endian unsigned bytes that can hold `v`.
pub(crate) fn unsigned_byte_count(v: u64) -> u8 {
    let bits = 64 - v.leading_zeros();
    ((bits + 7) / 8).max(1) as u8
}
