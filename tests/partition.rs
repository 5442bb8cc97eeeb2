//! Partition rollover behaviour of the sink.

use chronicle::export::{PartitionLimit, PartitionedSink};
use chronicle::ExportFormat;

mod common;

#[tokio::test]
async fn count_limit_rolls_into_a_second_file() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("export.txt");
    let context = common::context(ExportFormat::PlainText, &base);
    let mut sink =
        PartitionedSink::new(base.clone(), ExportFormat::PlainText, PartitionLimit::MessageCount(3));

    for id in 1..=4_u64 {
        let message = common::message(id, "alice", &format!("message {id}"));

        sink.write_message(&context, &message).await.unwrap();
    }

    sink.dispose(&context).await.unwrap();

    let second = dir.path().join("export [part 2].txt");

    assert!(base.exists());
    assert!(second.exists());

    let first_content = std::fs::read_to_string(&base).unwrap();
    let second_content = std::fs::read_to_string(&second).unwrap();

    assert_eq!(first_content.matches("] alice").count(), 3);
    assert_eq!(second_content.matches("] alice").count(), 1);
    assert!(first_content.contains("Exported 3 message(s)"));
    assert!(second_content.contains("Exported 1 message(s)"));
}

#[tokio::test]
async fn byte_limit_never_splits_mid_message() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("export.txt");
    let context = common::context(ExportFormat::PlainText, &base);
    let limit = PartitionLimit::ByteSize(chronicle::export::FileSize::from_bytes(400));
    let mut sink = PartitionedSink::new(base.clone(), ExportFormat::PlainText, limit);

    for id in 1..=6_u64 {
        let message = common::message(id, "alice", &"x".repeat(120));

        sink.write_message(&context, &message).await.unwrap();
    }

    sink.dispose(&context).await.unwrap();

    // Every produced partition holds whole messages only.
    let mut total = 0;

    for entry in std::fs::read_dir(dir.path()).unwrap() {
        let content = std::fs::read_to_string(entry.unwrap().path()).unwrap();
        let headers = content.matches("] alice").count();

        assert!(headers >= 1);
        total += headers;
    }

    assert_eq!(total, 6);
}

#[tokio::test]
async fn null_limit_keeps_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("export.txt");
    let context = common::context(ExportFormat::PlainText, &base);
    let mut sink = PartitionedSink::new(base.clone(), ExportFormat::PlainText, PartitionLimit::Null);

    for id in 1..=10_u64 {
        let message = common::message(id, "alice", "hello");

        sink.write_message(&context, &message).await.unwrap();
    }

    sink.dispose(&context).await.unwrap();

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn disposal_without_writes_still_creates_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("export.txt");
    let context = common::context(ExportFormat::PlainText, &base);
    let mut sink = PartitionedSink::new(base.clone(), ExportFormat::PlainText, PartitionLimit::Null);

    sink.dispose(&context).await.unwrap();

    let content = std::fs::read_to_string(&base).unwrap();

    assert!(content.contains("Test Guild"));
    assert!(content.contains("Exported 0 message(s)"));
}
