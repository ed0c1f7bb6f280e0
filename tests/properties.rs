use proptest::prelude::*;
use tagwire::*;

fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        (-20i64..20).prop_map(Value::from),
        any::<f64>().prop_map(Value::from),
        ".{0,40}".prop_map(Value::from),
        proptest::collection::vec(any::<u8>(), 0..40).prop_map(Value::from),
    ];
    leaf.prop_recursive(
        4,  // max depth
        64, // max nodes
        8,  // items per collection
        |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
                proptest::collection::vec(any::<f64>(), 0..40)
                    .prop_map(|v| v.into_iter().collect::<Value>()),
                proptest::collection::vec((inner.clone(), inner.clone()), 0..8)
                    .prop_map(|v| Value::Map(v.into_iter().collect())),
                proptest::collection::vec(inner, 0..8)
                    .prop_map(|v| Value::Set(v.into_iter().collect())),
            ]
        },
    )
}

fn message_bytes(value: &Value) -> Vec<u8> {
    let mut msg = Message::new();
    msg.open(true);
    msg.set_value(value).unwrap();
    msg.close();
    msg.get_bytes().to_vec()
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 500, ..ProptestConfig::default() })]

    #[test]
    fn encode_decode(value in arb_value()) {
        let bytes = message_bytes(&value);
        let (decoded, used) = decode_message(&bytes).unwrap();
        prop_assert_eq!(used, bytes.len());
        prop_assert_eq!(decoded, Some(value));
    }

    #[test]
    fn encoding_is_canonical(value in arb_value()) {
        // Decoding then re-encoding gives back the same bytes
        let bytes = value.encoded().unwrap();
        let decoded = from_bytes(&bytes).unwrap();
        prop_assert_eq!(decoded.encoded().unwrap(), bytes);
    }

    #[test]
    fn prefixes_fail(value in arb_value()) {
        let bytes = message_bytes(&value);
        for len in 0..bytes.len() {
            prop_assert!(decode_message(&bytes[..len]).is_err());
        }
    }

    #[test]
    fn transmission_roundtrip(value in arb_value()) {
        let bytes = message_bytes(&value);
        let framed = transmission::frame(&bytes).unwrap();
        prop_assert_eq!(transmission::unframe(&framed).unwrap(), bytes);
    }

    #[test]
    fn escape_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..256)) {
        let escaped = transmission::escape(&data);
        prop_assert!(escaped.iter().all(|b| *b <= transmission::ESCAPE));
        prop_assert_eq!(transmission::unescape(&escaped).unwrap(), data);
    }

    #[test]
    fn arbitrary_bytes_never_panic(data in proptest::collection::vec(any::<u8>(), 0..64)) {
        let _ = decode_message(&data);
        let _ = decode_value(&data);
        let _ = transmission::unframe(&data);
    }
}
