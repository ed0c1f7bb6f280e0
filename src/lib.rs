//! tagwire is a compact, self-describing binary encoding for dynamically-typed values, with a
//! framing layer for sending the encoded messages over byte-oriented transports.
//!
//! A [`Value`] is one of:
//!
//! - Logical: `true` or `false`
//! - Integer: a signed 64-bit integer
//! - Double: an IEEE-754 double
//! - String: UTF-8 text
//! - Blob: arbitrary bytes
//! - Array: an ordered sequence of values
//! - Map: key-value pairs with unique keys, where both keys and values may be any value
//! - Set: unique values
//!
//! Every value starts with a one-byte tag (see [`kind`] for the full layout). Small integers
//! and short strings fit their value or length into the tag itself, and consecutive doubles
//! in an array share a single tag. Every value has exactly one canonical encoding, and the
//! decoder rejects anything else.
//!
//! A [`Message`] wraps a single value, or nothing, in start and end tags that announce
//! whether the message is empty and what category of value it holds:
//!
//! ```
//! # use tagwire::*;
//! # fn main() -> Result<()> {
//! let mut map = ValueMap::new();
//! map.insert(false, 13);
//!
//! let mut msg = Message::new();
//! msg.open(true);
//! msg.set_value(&Value::Map(map.clone()))?;
//! msg.close();
//! assert_eq!(msg.get_bytes(), &[0xF3, 0xD8, 0x01, 0xC0, 0x0D, 0xE8, 0xFB]);
//!
//! // Escaped and checksummed for the wire
//! let frame = msg.get_bytes_for_transmission();
//!
//! let mut rx = Message::new();
//! rx.open(false);
//! rx.append_transmission_bytes(&frame)?;
//! assert_eq!(rx.get_value(true)?, Some(Value::Map(map)));
//! rx.close();
//! # Ok(())
//! # }
//! ```
//!
//! Any type implementing serde's `Serialize` and `Deserialize` can be converted to and from a
//! [`Value`] with [`to_value`] and [`from_value`], or straight to bytes with [`to_vec`] and
//! [`from_slice`].

mod collections;
mod de;
mod decode;
mod depth_tracking;
mod encode;
mod error;
mod message;
mod ser;
mod value;

pub mod element;
pub mod kind;
pub mod transmission;

pub use self::collections::{ValueMap, ValueSet};
pub use self::de::{from_slice, from_value};
pub use self::decode::{decode_message, decode_value, from_bytes};
pub use self::encode::encode_value;
pub use self::error::{Error, Result};
pub use self::kind::Category;
pub use self::message::Message;
pub use self::ser::{to_value, to_vec};
pub use self::value::Value;

/// The maximum nesting depth of containers. Both encoding and decoding fail past this.
pub const MAX_DEPTH: usize = 100;

/// The maximum number of bytes a [`Message`] will hold in a read transaction, 16 MiB.
pub const MAX_MESSAGE_SIZE: usize = 1usize << 24;
