use i104m_pipeline::{FrameOutcome, FrameProcessor, IgnoreReason};
use i104m_protocol::{COMMAND_SIGNATURE, MULTI_POINT_SIGNATURE, SINGLE_POINT_SIGNATURE, source_offset};
use i104m_storage::InMemoryPointStore;
use std::sync::Arc;

const CONNECTION: u32 = 61;

fn header(signature: u32, second: u32, asdu: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    for field in [signature, second, asdu, 1, 0, 3, 0] {
        bytes.extend_from_slice(&field.to_le_bytes());
    }
    bytes
}

fn normalized_record(bytes: &mut Vec<u8>, address: u32, value: i16, quality: u8) {
    bytes.extend_from_slice(&address.to_le_bytes());
    bytes.extend_from_slice(&value.to_le_bytes());
    bytes.push(quality);
}

fn processor(store: &Arc<InMemoryPointStore>) -> FrameProcessor {
    FrameProcessor::new(CONNECTION, store.clone(), source_offset(0).expect("offset"))
}

#[tokio::test]
async fn multi_point_frame_is_one_bulk_write() {
    let store = Arc::new(InMemoryPointStore::new());
    let mut processor = processor(&store);
    let mut frame = header(MULTI_POINT_SIGNATURE, 2, 9);
    normalized_record(&mut frame, 100, 500, 0x00);
    normalized_record(&mut frame, 101, -20, 0x80);

    let outcome = processor.process(&frame, 1_000).await.expect("process");
    assert_eq!(outcome, FrameOutcome::Written(2));
    assert_eq!(store.bulk_write_count(), 1);

    let first = store.get(CONNECTION, 100).expect("100");
    assert_eq!(first.value, 500.0);
    assert!(!first.quality.invalid);
    let second = store.get(CONNECTION, 101).expect("101");
    assert_eq!(second.value, -20.0);
    assert!(second.quality.invalid);
    assert_eq!(second.received_at_ms, 1_000);
}

#[tokio::test]
async fn declared_count_beyond_datagram_is_truncated() {
    let store = Arc::new(InMemoryPointStore::new());
    let mut processor = processor(&store);
    let mut frame = header(MULTI_POINT_SIGNATURE, 5, 9);
    normalized_record(&mut frame, 100, 1, 0x00);
    normalized_record(&mut frame, 101, 2, 0x00);
    frame.extend_from_slice(&[0x66, 0x00]);

    let outcome = processor.process(&frame, 1_000).await.expect("process");
    assert_eq!(outcome, FrameOutcome::Written(2));
    assert_eq!(store.bulk_write_count(), 1);
}

#[tokio::test]
async fn command_ack_and_unknown_asdu_never_write() {
    let store = Arc::new(InMemoryPointStore::new());
    let mut processor = processor(&store);

    for asdu in [45, 46, 47, 99] {
        let mut frame = header(MULTI_POINT_SIGNATURE, 1, asdu);
        frame.extend_from_slice(&[0x01; 12]);
        let outcome = processor.process(&frame, 1_000).await.expect("process");
        assert_eq!(
            outcome,
            FrameOutcome::Ignored(IgnoreReason::UnsupportedAsdu(asdu))
        );
    }

    let mut single = header(SINGLE_POINT_SIGNATURE, 6001, 45);
    single.extend_from_slice(&[0x01; 4]);
    let outcome = processor.process(&single, 1_000).await.expect("process");
    assert_eq!(outcome, FrameOutcome::NoUpdates);
    assert_eq!(store.bulk_write_count(), 0);
}

#[tokio::test]
async fn repeated_single_point_frame_is_discarded() {
    let store = Arc::new(InMemoryPointStore::new());
    let mut processor = processor(&store);
    let mut frame = header(SINGLE_POINT_SIGNATURE, 7, 1);
    frame.push(0x01);

    assert_eq!(
        processor.process(&frame, 1_000).await.expect("first"),
        FrameOutcome::Written(1)
    );
    assert_eq!(
        processor.process(&frame, 2_000).await.expect("second"),
        FrameOutcome::Duplicate
    );

    let mut changed = frame.clone();
    changed[28] = 0x00;
    assert_eq!(
        processor.process(&changed, 3_000).await.expect("third"),
        FrameOutcome::Written(1)
    );
    assert_eq!(store.bulk_write_count(), 2);
    assert_eq!(store.get(CONNECTION, 7).expect("point").value, 0.0);
}

#[tokio::test]
async fn multi_point_frames_are_never_deduplicated() {
    let store = Arc::new(InMemoryPointStore::new());
    let mut processor = processor(&store);
    let mut frame = header(MULTI_POINT_SIGNATURE, 1, 9);
    normalized_record(&mut frame, 100, 1, 0x00);

    processor.process(&frame, 1_000).await.expect("first");
    processor.process(&frame, 2_000).await.expect("second");
    assert_eq!(store.bulk_write_count(), 2);
}

#[tokio::test]
async fn other_signatures_and_short_frames_are_ignored() {
    let store = Arc::new(InMemoryPointStore::new());
    let mut processor = processor(&store);

    let command = header(COMMAND_SIGNATURE, 1, 45);
    assert_eq!(
        processor.process(&command, 1_000).await.expect("command"),
        FrameOutcome::Ignored(IgnoreReason::UnknownSignature(COMMAND_SIGNATURE))
    );
    let short = header(MULTI_POINT_SIGNATURE, 1, 9);
    assert_eq!(
        processor.process(&short[..16], 1_000).await.expect("short"),
        FrameOutcome::Ignored(IgnoreReason::Truncated)
    );
    assert_eq!(store.bulk_write_count(), 0);
}

#[tokio::test]
async fn failed_bulk_write_is_an_error() {
    let store = Arc::new(InMemoryPointStore::new());
    store.fail_writes(true);
    let mut processor = processor(&store);
    let mut frame = header(MULTI_POINT_SIGNATURE, 1, 9);
    normalized_record(&mut frame, 100, 1, 0x00);

    assert!(processor.process(&frame, 1_000).await.is_err());
}
