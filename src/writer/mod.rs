//! The polymorphic format writer framework.
//!
//! Every format conforms to [`MessageWriter`]: a preamble, any number of
//! messages, a postamble, and honest byte accounting so the partitioned sink
//! can enforce size limits.

use std::path::Path;

use async_trait::async_trait;
use chronicle_markdown::{MentionKind, Node};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::export::ExportContext;
use crate::model::Message;
use crate::request::ExportFormat;
use crate::Result;

pub use self::csv::CsvWriter;
mod csv;

pub use self::html::HtmlWriter;
mod html;

pub use self::json::JsonWriter;
mod json;

pub use self::plain::PlainTextWriter;
mod plain;

/// A sink for one output file of one format.
///
/// Calls arrive strictly in order: one preamble, messages ascending by
/// identifier, one postamble, then a flush before the file handle is
/// dropped.
#[async_trait]
pub trait MessageWriter: Send {
    /// Writes the file header.
    async fn write_preamble(&mut self, context: &ExportContext) -> Result;

    /// Appends one message.
    async fn write_message(&mut self, context: &ExportContext, message: &Message) -> Result;

    /// Writes the file footer.
    async fn write_postamble(&mut self, context: &ExportContext) -> Result;

    /// Flushes buffered output to disk.
    async fn flush(&mut self) -> Result;

    /// Returns how many messages were written.
    fn messages_written(&self) -> u64;

    /// Returns how many bytes were emitted so far.
    fn bytes_written(&self) -> u64;
}

/// Opens the writer for a format at the given path, creating parent
/// directories as needed.
pub(crate) async fn create_writer(
    format: ExportFormat,
    path: &Path,
) -> Result<Box<dyn MessageWriter>> {
    let out = CountingWriter::create(path).await?;

    Ok(match format {
        ExportFormat::PlainText => Box::new(PlainTextWriter::new(out)),
        ExportFormat::Csv => Box::new(CsvWriter::new(out)),
        ExportFormat::Json => Box::new(JsonWriter::new(out)),
        ExportFormat::HtmlDark => Box::new(HtmlWriter::new(out, html::Theme::Dark)),
        ExportFormat::HtmlLight => Box::new(HtmlWriter::new(out, html::Theme::Light)),
    })
}

/// A buffered file writer that counts every byte it emits.
pub(crate) struct CountingWriter {
    inner: BufWriter<File>,
    bytes: u64,
}

impl CountingWriter {
    /// Creates the file, making parent directories first.
    pub async fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        Ok(Self { inner: BufWriter::new(File::create(path).await?), bytes: 0 })
    }

    /// Writes raw bytes, counting them.
    pub async fn write_bytes(&mut self, bytes: &[u8]) -> Result {
        self.inner.write_all(bytes).await?;
        self.bytes += bytes.len() as u64;

        Ok(())
    }

    /// Writes a string, counting its bytes.
    pub async fn write_str(&mut self, text: &str) -> Result {
        self.write_bytes(text.as_bytes()).await
    }

    /// Flushes the underlying buffer.
    pub async fn flush(&mut self) -> Result {
        self.inner.flush().await.map_err(Into::into)
    }

    /// Returns how many bytes were written.
    pub const fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

/// Renders a message's content for the style-free formats.
///
/// System notifications render their fallback text; otherwise the content
/// parses under the minimal profile so mentions, custom emoji, and
/// timestamps keep their meaning while styling stays literal. With markdown
/// formatting disabled the raw source is returned as-is.
pub(crate) fn render_plain_content(context: &ExportContext, message: &Message) -> String {
    if message.is_system_notification() {
        return message.system_notification_content();
    }
    if !context.request().should_format_markdown {
        return message.content.clone();
    }

    let nodes = chronicle_markdown::parse_minimal(&message.content);

    render_nodes_plain(context, &nodes)
}

/// Renders parsed nodes into plain text through the context's caches.
pub(crate) fn render_nodes_plain(context: &ExportContext, nodes: &[Node]) -> String {
    let mut rendered = String::new();

    for node in nodes {
        match node {
            Node::Text(text) => rendered.push_str(text),
            Node::Mention(kind) => rendered.push_str(&render_mention_plain(context, *kind)),
            Node::Emoji { id: Some(_), name, .. } => {
                rendered.push(':');
                rendered.push_str(name);
                rendered.push(':');
            }
            Node::Emoji { id: None, name, .. } => rendered.push_str(name),
            Node::Timestamp { instant: Some(unix), format } => {
                rendered.push_str(&context.format_unix(*unix, *format));
            }
            Node::Timestamp { instant: None, .. } => rendered.push_str("Invalid date"),
            // The minimal profile produces nothing below this point; the
            // arms exist for callers that pass full-profile trees.
            other => rendered.push_str(&chronicle_markdown::to_plain_text(std::slice::from_ref(
                other,
            ))),
        }
    }

    rendered
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn byte_counter_matches_emitted_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counted.txt");
        let mut out = CountingWriter::create(&path).await.unwrap();

        out.write_str("hello ").await.unwrap();
        out.write_str("wörld\n").await.unwrap();
        out.write_bytes(&[0xEF, 0xBB, 0xBF]).await.unwrap();
        out.flush().await.unwrap();

        let on_disk = std::fs::metadata(&path).unwrap().len();

        assert_eq!(out.bytes_written(), on_disk);
    }
}

/// Renders one mention the way the chat client titles them.
pub(crate) fn render_mention_plain(context: &ExportContext, kind: MentionKind) -> String {
    match kind {
        MentionKind::Everyone => "@everyone".to_owned(),
        MentionKind::Here => "@here".to_owned(),
        MentionKind::User(id) => {
            let id = crate::Snowflake::new(id);

            context
                .member(id)
                .map_or_else(|| format!("@{id}"), |member| format!("@{}", member.display_name()))
        }
        MentionKind::Channel(id) => context
            .channel_by_id(crate::Snowflake::new(id))
            .map_or_else(|| "#deleted-channel".to_owned(), |channel| format!("#{}", channel.name)),
        MentionKind::Role(id) => context
            .role(crate::Snowflake::new(id))
            .map_or_else(|| "@deleted-role".to_owned(), |role| format!("@{}", role.name)),
    }
}
