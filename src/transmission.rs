//! Transmission framing.
//!
//! A frame carries one message over a byte-oriented transport:
//!
//! ```text
//! StartTag ++ escape(body) ++ EndTag ++ checksum
//! ```
//!
//! The message start and end tags go out as-is. Inside the body, every byte in
//! `0xDC..=0xFF` is sent as the escape byte `0xDC` followed by the byte with its high bit
//! flipped, which always lands in `0x5C..=0x7F`. An escaped body therefore never contains a
//! raw byte from the reserved range, so the first raw message end tag after the start tag
//! marks the end of the frame, and frames can be split out of a stream without decoding
//! the message inside.
//!
//! The checksum is the wrapping 8-bit sum of every frame byte before it, XORed with
//! [`CHECKSUM_SEED`].

use log::trace;

use crate::error::{Error, Result};
use crate::kind::{Kind, MESSAGE_END_BIT};

/// Marks an escaped byte.
pub const ESCAPE: u8 = 0xDC;
/// Flipped on an escaped byte.
pub const ESCAPE_FLIP: u8 = 0x80;
/// Mixed into the frame byte sum to form the checksum.
pub const CHECKSUM_SEED: u8 = 0xE7;

/// True for bytes that can't appear raw inside an escaped body.
pub fn is_reserved(byte: u8) -> bool {
    byte >= ESCAPE
}

/// Escape `data`, appending to `buf`.
pub fn escape_into(buf: &mut Vec<u8>, data: &[u8]) {
    for &byte in data {
        if is_reserved(byte) {
            buf.push(ESCAPE);
            buf.push(byte ^ ESCAPE_FLIP);
        } else {
            buf.push(byte);
        }
    }
}

pub fn escape(data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(data.len() + data.len() / 8);
    escape_into(&mut buf, data);
    buf
}

/// Reverse [`escape`]. Fails on a raw reserved byte, or an escape byte that isn't followed
/// by a byte in `0x5C..=0x7F`.
pub fn unescape(data: &[u8]) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(data.len());
    let mut iter = data.iter().enumerate();
    while let Some((i, &byte)) = iter.next() {
        if byte == ESCAPE {
            let (_, &next) = iter.next().ok_or_else(|| {
                Error::BadEscape(format!("Escape byte at offset {} has nothing after it", i))
            })?;
            let orig = next ^ ESCAPE_FLIP;
            if !is_reserved(orig) {
                return Err(Error::BadEscape(format!(
                    "Escape byte at offset {} is followed by 0x{:02X}",
                    i, next
                )));
            }
            buf.push(orig);
        } else if is_reserved(byte) {
            return Err(Error::BadEscape(format!(
                "Reserved byte 0x{:02X} at offset {} wasn't escaped",
                byte, i
            )));
        } else {
            buf.push(byte);
        }
    }
    Ok(buf)
}

/// Checksum over a run of frame bytes.
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b)) ^ CHECKSUM_SEED
}

/// Build a frame from a message's start tag, body, and end tag. The tags are not checked.
pub(crate) fn frame_parts(start: u8, body: &[u8], end: u8) -> Vec<u8> {
    let mut buf = Vec::with_capacity(body.len() + body.len() / 8 + 3);
    buf.push(start);
    escape_into(&mut buf, body);
    buf.push(end);
    buf.push(checksum(&buf));
    buf
}

/// Build a transmission frame from a complete encoded message.
///
/// The message must open with a message start tag and close with the matching end tag.
/// The body in between isn't decoded.
pub fn frame(message: &[u8]) -> Result<Vec<u8>> {
    let (&start, rest) = message.split_first().ok_or(Error::LengthTooShort {
        step: "get message start",
        actual: 0,
        expected: 2,
    })?;
    if !matches!(Kind::from_u8(start), Kind::MessageStart { .. }) {
        return Err(Error::BadFraming(format!(
            "Expected a Message start tag, got 0x{:02X}",
            start
        )));
    }
    let (&end, body) = rest.split_last().ok_or(Error::LengthTooShort {
        step: "get message end",
        actual: 1,
        expected: 2,
    })?;
    if end != start | MESSAGE_END_BIT {
        return Err(Error::BadFraming(format!(
            "Message end tag 0x{:02X} doesn't mirror start tag 0x{:02X}",
            end, start
        )));
    }
    Ok(frame_parts(start, body, end))
}

/// Verify and unwrap the transmission frame at the front of `data`. Returns the raw message
/// and the number of frame bytes used.
pub fn unframe_prefix(data: &[u8]) -> Result<(Vec<u8>, usize)> {
    let start = *data.first().ok_or(Error::LengthTooShort {
        step: "get frame start",
        actual: 0,
        expected: 3,
    })?;
    if !matches!(Kind::from_u8(start), Kind::MessageStart { .. }) {
        return Err(Error::BadFraming(format!(
            "Frame doesn't open with a Message start tag, got 0x{:02X}",
            start
        )));
    }

    // Raw end tags can't appear in an escaped body
    let end_pos = data[1..]
        .iter()
        .position(|&b| Kind::from_u8(b).is_message_end())
        .map(|p| p + 1)
        .ok_or(Error::LengthTooShort {
            step: "find frame end tag",
            actual: data.len(),
            expected: data.len() + 2,
        })?;
    let end = data[end_pos];
    if end != start | MESSAGE_END_BIT {
        return Err(Error::BadFraming(format!(
            "Frame end tag 0x{:02X} doesn't mirror start tag 0x{:02X}",
            end, start
        )));
    }
    let actual = *data.get(end_pos + 1).ok_or(Error::LengthTooShort {
        step: "get frame checksum",
        actual: data.len(),
        expected: end_pos + 2,
    })?;

    let mut message = Vec::with_capacity(end_pos + 1);
    message.push(start);
    message.extend_from_slice(&unescape(&data[1..end_pos])?);
    message.push(end);

    let expected = checksum(&data[..=end_pos]);
    if expected != actual {
        return Err(Error::BadChecksum { expected, actual });
    }
    trace!("Unframed a {} byte message", message.len());
    Ok((message, end_pos + 2))
}

/// Verify and unwrap exactly one transmission frame.
pub fn unframe(data: &[u8]) -> Result<Vec<u8>> {
    let (message, used) = unframe_prefix(data)?;
    if used != data.len() {
        return Err(Error::TrailingData(data.len() - used));
    }
    Ok(message)
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::prelude::*;

    #[test]
    fn escape_reserved() {
        assert_eq!(escape(&[0x00, 0xdb, 0xdc, 0xff]), &[0x00, 0xdb, 0xdc, 0x5c, 0xdc, 0x7f]);
        assert_eq!(escape(&[0xf4, 0xfc]), &[0xdc, 0x74, 0xdc, 0x7c]);
    }

    #[test]
    fn escape_random() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let len = rng.gen_range(0..512);
            let mut data = vec![0u8; len];
            rng.fill_bytes(&mut data);
            let escaped = escape(&data);
            assert!(escaped.iter().all(|&b| b == ESCAPE || !is_reserved(b)));
            assert_eq!(unescape(&escaped).unwrap(), data);
        }
    }

    #[test]
    fn unescape_errors() {
        assert!(matches!(unescape(&[0x01, 0xdc]), Err(Error::BadEscape(_))));
        assert!(matches!(unescape(&[0xdc, 0x5b]), Err(Error::BadEscape(_))));
        assert!(matches!(unescape(&[0xdc, 0x80]), Err(Error::BadEscape(_))));
        assert!(matches!(unescape(&[0xdd]), Err(Error::BadEscape(_))));
    }

    #[test]
    fn checksums() {
        assert_eq!(checksum(&[]), 0xe7);
        assert_eq!(checksum(&[0xf4, 0xfc]), 0x17);
        assert_eq!(checksum(&[0xf3, 0xc0, 0xfb]), 0x49);
        assert_eq!(checksum(&[0xf3, 0xc1, 0xfb]), 0x48);
    }

    #[test]
    fn frame_fixtures() {
        assert_eq!(frame(&[0xf4, 0xfc]).unwrap(), &[0xf4, 0xfc, 0x17]);
        assert_eq!(frame(&[0xf3, 0xc0, 0xfb]).unwrap(), &[0xf3, 0xc0, 0xfb, 0x49]);
        // The end of a nested Set, 0xEC, needs escaping
        let framed = frame(&[0xf3, 0xde, 0xee, 0xfb]).unwrap();
        assert_eq!(&framed[..6], &[0xf3, 0xdc, 0x5e, 0xdc, 0x6e, 0xfb]);
        assert_eq!(framed[6], checksum(&framed[..6]));
    }

    #[test]
    fn frame_rejects_bad_messages() {
        assert!(frame(&[]).is_err());
        assert!(matches!(frame(&[0xc0]), Err(Error::BadFraming(_))));
        assert!(frame(&[0xf4]).is_err());
        assert!(matches!(frame(&[0xf3, 0xc0, 0xf8]), Err(Error::BadFraming(_))));
    }

    #[test]
    fn unframe_roundtrip() {
        let message = [0xf3, 0xd4, 0x02, 0xdc, 0xff, 0x00, 0xe4, 0xfb];
        let framed = frame(&message).unwrap();
        assert_eq!(unframe(&framed).unwrap(), message);
    }

    #[test]
    fn unframe_stream() {
        let mut data = frame(&[0xf4, 0xfc]).unwrap();
        data.extend(frame(&[0xf3, 0xc1, 0xfb]).unwrap());
        let (first, used) = unframe_prefix(&data).unwrap();
        assert_eq!(first, &[0xf4, 0xfc]);
        assert_eq!(used, 3);
        let (second, used2) = unframe_prefix(&data[used..]).unwrap();
        assert_eq!(second, &[0xf3, 0xc1, 0xfb]);
        assert_eq!(used + used2, data.len());
        assert_eq!(unframe(&data), Err(Error::TrailingData(4)));
    }

    #[test]
    fn unframe_errors() {
        // Not a start tag
        assert!(matches!(unframe(&[0xc0, 0xfc, 0x00]), Err(Error::BadFraming(_))));
        // Missing end tag and checksum
        assert!(matches!(unframe(&[0xf3, 0xc0]), Err(Error::LengthTooShort { .. })));
        // Missing checksum
        assert!(matches!(unframe(&[0xf4, 0xfc]), Err(Error::LengthTooShort { .. })));
        // End tag doesn't mirror the start
        assert!(matches!(unframe(&[0xf3, 0xc0, 0xf8, 0x00]), Err(Error::BadFraming(_))));
        // Raw reserved byte in the body
        let mut bad = vec![0xf3, 0xde, 0xfb];
        bad.push(checksum(&bad));
        assert!(matches!(unframe(&bad), Err(Error::BadEscape(_))));
        // Corrupted checksum
        assert_eq!(
            unframe(&[0xf3, 0xc0, 0xfb, 0x48]),
            Err(Error::BadChecksum {
                expected: 0x49,
                actual: 0x48
            })
        );
        // Corrupted body
        assert!(matches!(
            unframe(&[0xf3, 0xc1, 0xfb, 0x49]),
            Err(Error::BadChecksum { .. })
        ));
    }
}
