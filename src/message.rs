//! The message lifecycle: write transactions that encode one value between a start and end
//! tag, and read transactions that decode values back out of appended bytes.
//!
//! ```
//! # use tagwire::*;
//! let mut msg = Message::new();
//! msg.open(true);
//! msg.set_value(&Value::from(-144)).unwrap();
//! msg.close();
//! assert_eq!(msg.get_bytes(), &[0xF0, 0x21, 0xFF, 0x70, 0xF8]);
//!
//! let bytes = msg.get_bytes().to_vec();
//! msg.open(false);
//! msg.append_bytes(&bytes).unwrap();
//! assert_eq!(msg.get_value(true).unwrap(), Some(Value::from(-144)));
//! assert!(msg.read_at_end());
//! msg.close();
//! ```

use log::{debug, trace};

use crate::decode::{decode_message, decode_value};
use crate::encode::encode_value;
use crate::error::{Error, Result};
use crate::kind::{Category, Kind, MESSAGE_END_BIT};
use crate::transmission;
use crate::value::Value;
use crate::MAX_MESSAGE_SIZE;

const EMPTY_START: u8 = 0xF4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Idle,
    Writing { has_value: bool },
    Reading,
}

/// A buffer that messages are encoded into or decoded out of.
///
/// Calling an operation in the wrong state is a bug in the caller and panics: writing
/// outside a write transaction, setting the value twice, decoding outside a read
/// transaction, or opening a transaction while one is already open. Bad data never panics.
#[derive(Clone, Debug)]
pub struct Message {
    buf: Vec<u8>,
    state: State,
    /// Last write transaction was closed and `buf` holds a complete message.
    complete: bool,
    read_pos: usize,
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}

impl Message {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            state: State::Idle,
            complete: false,
            read_pos: 0,
        }
    }

    /// Begin a transaction, discarding anything already in the buffer.
    ///
    /// A write transaction starts with an empty message start tag, which
    /// [`set_value`][Self::set_value] rewrites.
    ///
    /// # Panics
    ///
    /// Panics if a transaction is already open.
    pub fn open(&mut self, for_writing: bool) {
        assert!(
            self.state == State::Idle,
            "open called while a transaction was already open ({:?})",
            self.state
        );
        self.buf.clear();
        self.read_pos = 0;
        self.complete = false;
        if for_writing {
            self.buf.push(EMPTY_START);
            self.state = State::Writing { has_value: false };
        } else {
            self.state = State::Reading;
        }
        debug!(
            "Opened message for {}",
            if for_writing { "writing" } else { "reading" }
        );
    }

    /// Encode `value` as the message's single top value.
    ///
    /// Fails only if the value nests deeper than [`MAX_DEPTH`][crate::MAX_DEPTH], in which
    /// case the message is left without a value.
    ///
    /// # Panics
    ///
    /// Panics outside a write transaction, or if a value was already set.
    pub fn set_value(&mut self, value: &Value) -> Result<()> {
        match self.state {
            State::Writing { has_value: false } => (),
            State::Writing { has_value: true } => {
                panic!("set_value called twice in one write transaction")
            }
            _ => panic!("set_value called outside a write transaction"),
        }
        encode_value(&mut self.buf, value)?;
        self.buf[0] = Kind::MessageStart {
            empty: false,
            expected: value.category(),
        }
        .into_u8();
        self.state = State::Writing { has_value: true };
        trace!("Set message value, {} bytes so far", self.buf.len());
        Ok(())
    }

    /// End the open transaction. Closing a write transaction appends the end tag, which
    /// mirrors the start tag.
    ///
    /// Closing a read transaction doesn't check that everything appended was decoded. Check
    /// [`read_at_end`][Self::read_at_end] first when leftover bytes should be an error.
    ///
    /// # Panics
    ///
    /// Panics if no transaction is open.
    pub fn close(&mut self) {
        match self.state {
            State::Idle => panic!("close called with no open transaction"),
            State::Writing { .. } => {
                let end = self.buf[0] | MESSAGE_END_BIT;
                self.buf.push(end);
                self.complete = true;
                debug!("Closed message after writing {} bytes", self.buf.len());
            }
            State::Reading => {
                if !self.read_at_end() {
                    debug!(
                        "Closed message with {} bytes left unread",
                        self.buf.len() - self.read_pos
                    );
                } else {
                    debug!("Closed message after reading {} bytes", self.read_pos);
                }
            }
        }
        self.state = State::Idle;
    }

    /// Drop any open transaction and clear the buffer.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.read_pos = 0;
        self.complete = false;
        self.state = State::Idle;
    }

    pub fn is_open(&self) -> bool {
        self.state != State::Idle
    }

    /// Category the start tag announces for the top value, or `None` for an empty message.
    /// Only meaningful once a write transaction has been opened.
    pub fn expected_category(&self) -> Option<Category> {
        match self.buf.first().map(|b| Kind::from_u8(*b)) {
            Some(Kind::MessageStart {
                empty: false,
                expected,
            }) => Some(expected),
            _ => None,
        }
    }

    /// The raw encoded bytes in the buffer. During a read transaction, bytes already decoded
    /// are dropped from the buffer on the next append.
    pub fn get_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// The buffered message wrapped in a transmission frame, ready to go on the wire.
    ///
    /// # Panics
    ///
    /// Panics unless the last transaction was a closed write transaction.
    pub fn get_bytes_for_transmission(&self) -> Vec<u8> {
        assert!(
            self.complete && self.state == State::Idle,
            "get_bytes_for_transmission needs a closed write transaction"
        );
        let last = self.buf.len() - 1;
        transmission::frame_parts(self.buf[0], &self.buf[1..last], self.buf[last])
    }

    fn check_reading(&self, op: &str) {
        assert!(
            self.state == State::Reading,
            "{} called outside a read transaction",
            op
        );
    }

    /// Drop bytes that have already been decoded.
    fn discard_read(&mut self) {
        if self.read_pos > 0 {
            self.buf.drain(..self.read_pos);
            trace!("Discarded {} decoded bytes", self.read_pos);
            self.read_pos = 0;
        }
    }

    /// Fails if the unread bytes plus `len` more would exceed [`MAX_MESSAGE_SIZE`].
    fn check_room(&self, len: usize) -> Result<()> {
        let total = (self.buf.len() - self.read_pos).saturating_add(len);
        if total > MAX_MESSAGE_SIZE {
            return Err(Error::ParseLimit(format!(
                "Message buffer would grow to {} bytes, the maximum is {}",
                total, MAX_MESSAGE_SIZE
            )));
        }
        Ok(())
    }

    /// Feed raw encoded bytes into a read transaction. Fails without appending anything if
    /// the unread bytes would grow past [`MAX_MESSAGE_SIZE`].
    ///
    /// # Panics
    ///
    /// Panics outside a read transaction.
    pub fn append_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.check_reading("append_bytes");
        self.check_room(data.len())?;
        self.discard_read();
        self.buf.extend_from_slice(data);
        trace!("Appended {} bytes", data.len());
        Ok(())
    }

    /// Feed one or more complete transmission frames into a read transaction. Every frame
    /// is verified before any of them are appended.
    ///
    /// # Panics
    ///
    /// Panics outside a read transaction.
    pub fn append_transmission_bytes(&mut self, mut data: &[u8]) -> Result<()> {
        self.check_reading("append_transmission_bytes");
        let mut messages = Vec::new();
        loop {
            let (message, used) = transmission::unframe_prefix(data).map_err(|e| {
                debug!("Rejected transmission frame: {}", e);
                e
            })?;
            messages.extend_from_slice(&message);
            data = &data[used..];
            if data.is_empty() {
                break;
            }
        }
        self.check_room(messages.len())?;
        self.discard_read();
        self.buf.extend_from_slice(&messages);
        trace!("Appended {} unframed bytes", messages.len());
        Ok(())
    }

    /// Decode the next message from the read cursor. With `consume_framing` set, a full
    /// message with its start and end tags is expected and `Ok(None)` means the message was
    /// empty. Without it, a single bare value is decoded.
    ///
    /// On failure the cursor doesn't move, so more bytes can be appended and the decode
    /// retried.
    ///
    /// # Panics
    ///
    /// Panics outside a read transaction.
    pub fn get_value(&mut self, consume_framing: bool) -> Result<Option<Value>> {
        self.check_reading("get_value");
        let data = &self.buf[self.read_pos..];
        let result = if consume_framing {
            decode_message(data)
        } else {
            decode_value(data).map(|(value, used)| (Some(value), used))
        };
        match result {
            Ok((value, used)) => {
                self.read_pos += used;
                trace!("Decoded {} bytes", used);
                Ok(value)
            }
            Err(e) => {
                debug!("Decode failed at offset {}: {}", self.read_pos, e);
                Err(e)
            }
        }
    }

    /// True if every appended byte has been decoded.
    pub fn read_at_end(&self) -> bool {
        self.read_pos == self.buf.len()
    }
}
