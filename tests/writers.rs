//! Cross-format writer behaviour, driven through the partitioned sink.

use chronicle::export::{PartitionLimit, PartitionedSink};
use chronicle::ExportFormat;

mod common;

#[tokio::test]
async fn csv_quotes_embedded_commas_and_quotes() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("export.csv");
    let context = common::context(ExportFormat::Csv, &base);
    let mut sink = PartitionedSink::new(base.clone(), ExportFormat::Csv, PartitionLimit::Null);
    let message = common::message(1, "alice", "hello, \"world\"");

    sink.write_message(&context, &message).await.unwrap();
    sink.dispose(&context).await.unwrap();

    let content = std::fs::read_to_string(&base).unwrap();

    assert!(content.starts_with('\u{FEFF}'));
    assert!(content.contains("AuthorID,Author,Date,Content,Attachments,Reactions"));
    assert!(content.contains(r#""hello, ""world""""#));
}

#[tokio::test]
async fn json_document_counts_messages() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("export.json");
    let context = common::context(ExportFormat::Json, &base);
    let mut sink = PartitionedSink::new(base.clone(), ExportFormat::Json, PartitionLimit::Null);

    sink.write_message(&context, &common::message(1, "alice", "first")).await.unwrap();
    sink.write_message(&context, &common::message(2, "alice", "second <@77>")).await.unwrap();
    sink.dispose(&context).await.unwrap();

    let document: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&base).unwrap()).unwrap();

    assert_eq!(document["messageCount"], 2);
    assert_eq!(document["guild"]["name"], "Test Guild");
    assert_eq!(document["channel"]["name"], "general");
    assert_eq!(document["messages"][0]["content"], "first");
    assert_eq!(document["messages"][1]["author"]["name"], "alice");
    // Unresolved mentions degrade to the raw identifier.
    assert_eq!(document["messages"][1]["content"], "second @77");
    assert_eq!(document["messages"][0]["type"], "Default");
}

#[tokio::test]
async fn html_groups_consecutive_messages_from_one_author() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("export.html");
    let context = common::context(ExportFormat::HtmlDark, &base);
    let mut sink = PartitionedSink::new(base.clone(), ExportFormat::HtmlDark, PartitionLimit::Null);

    sink.write_message(&context, &common::message(1, "alice", "one")).await.unwrap();
    sink.write_message(&context, &common::message(2, "alice", "two")).await.unwrap();
    sink.dispose(&context).await.unwrap();

    let content = std::fs::read_to_string(&base).unwrap();

    assert!(content.starts_with("<!doctype html>"));
    assert_eq!(content.matches("chatlog__message-group").count(), 1);
    assert!(content.contains("id=\"chatlog__message-container-1\""));
    assert!(content.contains("id=\"chatlog__message-container-2\""));
    assert!(content.contains("showSpoiler"));
    assert!(content.contains("scrollToMessage"));
}

#[tokio::test]
async fn html_starts_a_new_group_for_replies() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("export.html");
    let context = common::context(ExportFormat::HtmlDark, &base);
    let mut sink = PartitionedSink::new(base.clone(), ExportFormat::HtmlDark, PartitionLimit::Null);
    let reply: chronicle::model::Message = serde_json::from_value(serde_json::json!({
        "id": "2",
        "type": 19,
        "author": {"id": "1", "username": "alice"},
        "timestamp": "2021-05-01T12:01:00+00:00",
        "content": "replying",
        "message_reference": {"message_id": "1", "channel_id": "500"},
    }))
    .unwrap();

    sink.write_message(&context, &common::message(1, "alice", "one")).await.unwrap();
    sink.write_message(&context, &reply).await.unwrap();
    sink.dispose(&context).await.unwrap();

    let content = std::fs::read_to_string(&base).unwrap();

    assert_eq!(content.matches("chatlog__message-group").count(), 2);
    assert!(content.contains("Original message was deleted"));
}

#[tokio::test]
async fn html_renders_jumbo_emoji_for_emoji_only_content() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("export.html");
    let context = common::context(ExportFormat::HtmlDark, &base);
    let mut sink = PartitionedSink::new(base.clone(), ExportFormat::HtmlDark, PartitionLimit::Null);

    sink.write_message(&context, &common::message(1, "alice", "\u{1F389} \u{1F389}"))
        .await
        .unwrap();
    sink.write_message(&context, &common::message(2, "bob", "party \u{1F389}")).await.unwrap();
    sink.dispose(&context).await.unwrap();

    let content = std::fs::read_to_string(&base).unwrap();

    assert_eq!(content.matches("chatlog__emoji--large").count(), 2);
}

#[tokio::test]
async fn plaintext_renders_minimal_markdown() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("export.txt");
    let context = common::context(ExportFormat::PlainText, &base);
    let mut sink = PartitionedSink::new(base.clone(), ExportFormat::PlainText, PartitionLimit::Null);

    sink.write_message(&context, &common::message(1, "alice", "**bold** stays literal"))
        .await
        .unwrap();
    sink.dispose(&context).await.unwrap();

    let content = std::fs::read_to_string(&base).unwrap();

    // The minimal profile keeps styling characters as-is.
    assert!(content.contains("**bold** stays literal"));
}

#[tokio::test]
async fn system_notifications_render_fallback_text() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("export.txt");
    let context = common::context(ExportFormat::PlainText, &base);
    let mut sink = PartitionedSink::new(base.clone(), ExportFormat::PlainText, PartitionLimit::Null);
    let join: chronicle::model::Message = serde_json::from_value(serde_json::json!({
        "id": "1",
        "type": 7,
        "author": {"id": "1", "username": "alice"},
        "timestamp": "2021-05-01T12:00:00+00:00",
        "content": "",
    }))
    .unwrap();

    sink.write_message(&context, &join).await.unwrap();
    sink.dispose(&context).await.unwrap();

    let content = std::fs::read_to_string(&base).unwrap();

    assert!(content.contains("Joined the server."));
}
