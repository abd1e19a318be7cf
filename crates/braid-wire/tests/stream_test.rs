use braid_types::{
    AnswerDelta, ChatEvent, ChatMode, DoneStatus, EventEnvelope, ItemStatus, Source, ThreadItem,
};
use braid_wire::{encode_frame, FrameDecoder, StreamReducer};
use std::time::Duration;

fn envelope(event: ChatEvent) -> EventEnvelope {
    EventEnvelope::new("thread-1", "item-1", Some("parent-1".to_string()), event)
}

#[test]
fn encode_decode_round_trip_preserves_fields() {
    let original = envelope(ChatEvent::Sources(vec![Source {
        title: "Rust Book".into(),
        link: "https://doc.rust-lang.org/book/".into(),
        snippet: Some("ownership chapter".into()),
        index: Some(1),
    }]));

    let frame = encode_frame(&original).unwrap();
    let mut decoder = FrameDecoder::new();
    let decoded = decoder.feed(frame.as_bytes());

    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0], original);
}

#[test]
fn splitting_the_stream_at_any_offset_yields_the_same_state() {
    let frames: String = [
        encode_frame(&envelope(ChatEvent::Answer(AnswerDelta::delta("Hel")))).unwrap(),
        encode_frame(&envelope(ChatEvent::Answer(AnswerDelta::delta("lo")))).unwrap(),
        encode_frame(&envelope(ChatEvent::Done {
            status: DoneStatus::Complete,
            error: None,
        }))
        .unwrap(),
    ]
    .concat();
    let bytes = frames.as_bytes();

    let mut whole = FrameDecoder::new();
    let expected = whole.feed(bytes);
    assert_eq!(expected.len(), 3);

    for offset in 0..bytes.len() {
        let mut decoder = FrameDecoder::new();
        let mut decoded = decoder.feed(&bytes[..offset]);
        decoded.extend(decoder.feed(&bytes[offset..]));
        assert_eq!(decoded, expected, "split at byte {offset} diverged");
    }
}

#[test]
fn sequential_deltas_accumulate() {
    let mut reducer = StreamReducer::with_flush_interval(Duration::from_secs(1));
    reducer.apply(&envelope(ChatEvent::Answer(AnswerDelta::delta("Hel"))));
    let update = reducer
        .apply(&envelope(ChatEvent::Answer(AnswerDelta::delta("lo"))))
        .unwrap();
    assert_eq!(update.item.answer.text, "Hello");
    assert_eq!(update.item.status, ItemStatus::Pending);
}

#[test]
fn done_frame_is_idempotent() {
    let mut reducer = StreamReducer::new();
    let mut item = ThreadItem::new("thread-1", "question", ChatMode::Auto);
    item.id = "item-1".to_string();
    reducer.track(item);

    reducer.apply(&envelope(ChatEvent::Answer(AnswerDelta::delta("answer"))));
    let done = envelope(ChatEvent::Done {
        status: DoneStatus::Complete,
        error: None,
    });

    let first = reducer.apply(&done).unwrap();
    assert!(first.terminal);
    assert!(first.persist);
    assert_eq!(first.item.status, ItemStatus::Completed);
    assert_eq!(first.item.answer.final_text.as_deref(), Some("answer"));

    // Second application is a no-op: no double transition, no second
    // persistence write.
    assert!(reducer.apply(&done).is_none());
}

#[test]
fn aborted_done_marks_item_aborted_not_errored() {
    let mut reducer = StreamReducer::new();
    let update = reducer
        .apply(&envelope(ChatEvent::Done {
            status: DoneStatus::Aborted,
            error: None,
        }))
        .unwrap();
    assert_eq!(update.item.status, ItemStatus::Aborted);
    assert!(update.item.error.is_none());
}

#[test]
fn done_after_aborted_status_still_persists_and_releases() {
    // An abort emits `status: ABORTED` ahead of the terminal `done`
    // frame. The already-terminal item status must not swallow the
    // `done` frame: it carries the persist-always guarantee and
    // releases the accumulator entry.
    let mut reducer = StreamReducer::with_flush_interval(Duration::from_secs(60));
    reducer.apply(&envelope(ChatEvent::Answer(AnswerDelta::delta("par"))));
    reducer.apply(&envelope(ChatEvent::Status(ItemStatus::Aborted)));

    let done = reducer
        .apply(&envelope(ChatEvent::Done {
            status: DoneStatus::Aborted,
            error: None,
        }))
        .expect("done frame after aborted status must produce an update");
    assert!(done.terminal);
    assert!(done.persist);
    assert_eq!(done.item.status, ItemStatus::Aborted);

    // Released: the entry is gone and a duplicate done is a no-op.
    assert!(reducer.tracked("item-1").is_none());
    assert!(reducer
        .apply(&envelope(ChatEvent::Done {
            status: DoneStatus::Aborted,
            error: None,
        }))
        .is_none());
}

#[test]
fn metrics_only_touch_counters() {
    let mut reducer = StreamReducer::new();
    reducer.apply(&envelope(ChatEvent::Answer(AnswerDelta::delta("body"))));
    let update = reducer
        .apply(&envelope(ChatEvent::Metrics {
            tokens_used: Some(128),
            duration_ms: Some(900),
        }))
        .unwrap();
    assert_eq!(update.item.tokens_used, Some(128));
    assert_eq!(update.item.generation_duration_ms, Some(900));
    assert_eq!(update.item.answer.text, "body");
}

#[test]
fn first_and_terminal_updates_always_persist() {
    let mut reducer = StreamReducer::with_flush_interval(Duration::from_secs(60));

    let first = reducer
        .apply(&envelope(ChatEvent::Answer(AnswerDelta::delta("a"))))
        .unwrap();
    assert!(first.persist);

    let middle = reducer
        .apply(&envelope(ChatEvent::Answer(AnswerDelta::delta("b"))))
        .unwrap();
    assert!(!middle.persist);

    let last = reducer
        .apply(&envelope(ChatEvent::Done {
            status: DoneStatus::Complete,
            error: None,
        }))
        .unwrap();
    assert!(last.persist);
}
