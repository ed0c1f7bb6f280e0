use tagwire::*;

fn write(value: Option<&Value>) -> Message {
    let mut msg = Message::new();
    msg.open(true);
    if let Some(value) = value {
        msg.set_value(value).unwrap();
    }
    msg.close();
    msg
}

fn read_framed(bytes: &[u8]) -> Result<Option<Value>> {
    let mut msg = Message::new();
    msg.open(false);
    msg.append_bytes(bytes).unwrap();
    let value = msg.get_value(true)?;
    assert!(msg.read_at_end());
    msg.close();
    Ok(value)
}

/// Check the exact encoding, the decode back, and that every strict prefix fails.
fn check_fixture(value: Option<Value>, expected: &[u8]) {
    let msg = write(value.as_ref());
    assert_eq!(msg.get_bytes(), expected);
    assert_eq!(read_framed(expected).unwrap(), value);
    for len in 1..expected.len() {
        assert!(
            read_framed(&expected[..len]).is_err(),
            "prefix of {} bytes decoded",
            len
        );
    }
}

#[test]
fn empty_message() {
    check_fixture(None, &[0xF4, 0xFC]);
}

#[test]
fn logical_false() {
    check_fixture(Some(Value::Logical(false)), &[0xF3, 0xC0, 0xFB]);
}

#[test]
fn integer_minus_144() {
    check_fixture(Some(Value::Integer(-144)), &[0xF0, 0x21, 0xFF, 0x70, 0xF8]);
}

#[test]
fn array_of_zero() {
    check_fixture(
        Some(Value::Array(vec![Value::Integer(0)])),
        &[0xF3, 0xD4, 0x01, 0x00, 0xE4, 0xFB],
    );
}

#[test]
fn array_of_43_doubles() {
    let value: Value = (0..43).map(|i| i as f64).collect();
    let mut expected = vec![0xF3, 0xD4, 0x20, 0x2B, 0x60, 0x2B];
    for i in 0..43 {
        expected.extend_from_slice(&(i as f64).to_be_bytes());
    }
    expected.extend_from_slice(&[0xE4, 0xFB]);
    assert_eq!(expected.len(), 6 + 344 + 2);
    check_fixture(Some(value), &expected);
}

#[test]
fn map_false_to_13() {
    let mut map = ValueMap::new();
    map.insert(false, 13);
    check_fixture(
        Some(Value::Map(map)),
        &[0xF3, 0xD8, 0x01, 0xC0, 0x0D, 0xE8, 0xFB],
    );
}

#[test]
fn transmission_frames() {
    assert_eq!(write(None).get_bytes_for_transmission(), &[0xF4, 0xFC, 0x17]);
    assert_eq!(
        write(Some(&Value::Logical(false))).get_bytes_for_transmission(),
        &[0xF3, 0xC0, 0xFB, 0x49]
    );
}

#[test]
fn canonical_minimality() {
    assert_eq!(Value::from(12).encoded().unwrap(), &[0x0C]);
    assert_eq!(Value::from(144).encoded().unwrap(), &[0x21, 0x00, 0x90]);
    assert_eq!(Value::from(-12).encoded().unwrap(), &[0x14]);
    assert_eq!(Value::from(16).encoded().unwrap(), &[0x20, 0x10]);
}

#[test]
fn mixed_nested_roundtrip() {
    let mut inner = ValueMap::new();
    inner.insert("blob", vec![0xFFu8; 40]);
    inner.insert(-3.75, Value::Set(vec![1, 2, 3].into_iter().collect()));
    let value = Value::Array(vec![
        Value::from(1.0),
        Value::from(2.0),
        Value::Map(inner),
        Value::from("x".repeat(300)),
        Value::from(i64::MAX),
        Value::Array(vec![]),
    ]);
    let msg = write(Some(&value));
    assert_eq!(read_framed(msg.get_bytes()).unwrap(), Some(value.clone()));

    let mut rx = Message::new();
    rx.open(false);
    rx.append_transmission_bytes(&msg.get_bytes_for_transmission())
        .unwrap();
    assert_eq!(rx.get_value(true).unwrap(), Some(value));
}
