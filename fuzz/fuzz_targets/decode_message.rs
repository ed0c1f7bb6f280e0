#![no_main]
use libfuzzer_sys::fuzz_target;
use tagwire::{transmission, Message};

fuzz_target!(|data: &[u8]| {
    let mut msg = Message::new();
    msg.open(false);
    if msg.append_bytes(data).is_ok() {
        // Anything that decodes must encode back to the same bytes
        if let Ok(value) = msg.get_value(true) {
            let mut out = Message::new();
            out.open(true);
            if let Some(value) = value.as_ref() {
                out.set_value(value).unwrap();
            }
            out.close();
            assert!(data.starts_with(out.get_bytes()), "decoded a non-canonical message");
        }
    }
    let _ = transmission::unframe(data);
});
