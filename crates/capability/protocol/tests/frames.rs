use i104m_protocol::{
    DecodeContext, Frame, MULTI_POINT_SIGNATURE, decode_object, multi_point_objects, parse_frame,
    source_offset,
};

fn normalized_frame() -> Vec<u8> {
    let mut datagram = Vec::new();
    for field in [MULTI_POINT_SIGNATURE, 2, 9, 1, 0, 3, 3] {
        datagram.extend_from_slice(&field.to_le_bytes());
    }
    for (address, value, quality) in [(100u32, 500i16, 0x00u8), (101, -20, 0x80)] {
        datagram.extend_from_slice(&address.to_le_bytes());
        datagram.extend_from_slice(&value.to_le_bytes());
        datagram.push(quality);
    }
    datagram
}

#[test]
fn normalized_multi_point_frame_decodes_both_objects() {
    let datagram = normalized_frame();
    let Frame::MultiPoint {
        header,
        count,
        records,
    } = parse_frame(&datagram).expect("frame")
    else {
        panic!("expected multi point frame");
    };

    let ctx = DecodeContext::new(1_000, source_offset(0).expect("offset"));
    let expanded = multi_point_objects(count, header.asdu, records).expect("objects");
    let updates: Vec<_> = expanded
        .objects
        .iter()
        .filter_map(|object| {
            decode_object(object.payload, object.object_address, header.asdu, header.cause, &ctx)
        })
        .collect();

    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].object_address, 100);
    assert_eq!(updates[0].value, 500.0);
    assert!(!updates[0].quality.invalid);
    assert_eq!(updates[1].object_address, 101);
    assert_eq!(updates[1].value, -20.0);
    assert!(updates[1].quality.invalid);
    assert!(updates.iter().all(|update| update.cause == 3 && update.asdu == 9));
}

#[test]
fn command_ack_frame_yields_no_updates() {
    let mut datagram = normalized_frame();
    datagram[8..12].copy_from_slice(&45u32.to_le_bytes());
    let Frame::MultiPoint {
        header,
        count,
        records,
    } = parse_frame(&datagram).expect("frame")
    else {
        panic!("expected multi point frame");
    };
    assert!(multi_point_objects(count, header.asdu, records).is_err());
}
