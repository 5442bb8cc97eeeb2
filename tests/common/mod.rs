use std::path::Path;
use std::sync::Arc;

use chronicle::api::ApiClient;
use chronicle::export::ExportContext;
use chronicle::model::{Channel, Guild, Message};
use chronicle::{CancellationFlag, ExportFormat, ExportRequest, Snowflake};

/// Builds a context over a dummy client; nothing here touches the network as
/// long as the test avoids member population and reaction rosters.
pub fn context(format: ExportFormat, base_path: &Path) -> ExportContext {
    let client = Arc::new(
        ApiClient::new("unused-token", Default::default(), CancellationFlag::new()).unwrap(),
    );
    let request = ExportRequest::new("unused-token", Snowflake::new(500), base_path, format);
    let guild: Guild =
        serde_json::from_value(serde_json::json!({"id": "10", "name": "Test Guild"})).unwrap();
    let channel = Channel {
        id: Snowflake::new(500),
        kind: chronicle::model::ChannelKind::Text,
        guild_id: Snowflake::new(10),
        parent: None,
        parent_id: None,
        name: "general".to_owned(),
        position: Some(0),
        topic: None,
        is_archived: false,
        last_message_id: Some(Snowflake::new(990)),
    };

    ExportContext::new(client, request, guild, channel, base_path)
}

/// Builds an ordinary text message from the given author at a fixed date.
pub fn message(id: u64, author: &str, content: &str) -> Message {
    serde_json::from_value(serde_json::json!({
        "id": id.to_string(),
        "type": 0,
        "author": {"id": "1", "username": author},
        "timestamp": "2021-05-01T12:00:00+00:00",
        "content": content,
    }))
    .unwrap()
}
