use async_trait::async_trait;

use super::{render_plain_content, CountingWriter, MessageWriter};
use crate::export::ExportContext;
use crate::model::Message;
use crate::Result;

/// Writes a comma-separated table, one row per message.
pub struct CsvWriter {
    out: CountingWriter,
    messages: u64,
}

impl CsvWriter {
    /// Creates a writer over an open output file.
    #[must_use]
    pub(crate) const fn new(out: CountingWriter) -> Self {
        Self { out, messages: 0 }
    }
}

/// Quotes a field per RFC 4180: always wrapped, embedded quotes doubled.
fn encode(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

#[async_trait]
impl MessageWriter for CsvWriter {
    async fn write_preamble(&mut self, _context: &ExportContext) -> Result {
        // Byte order mark first, so spreadsheet tools pick up the encoding.
        self.out.write_str("\u{FEFF}").await?;
        self.out.write_str("AuthorID,Author,Date,Content,Attachments,Reactions\n").await
    }

    async fn write_message(&mut self, context: &ExportContext, message: &Message) -> Result {
        let mut attachments = String::new();

        for attachment in &message.attachments {
            if !attachments.is_empty() {
                attachments.push(',');
            }

            attachments.push_str(&context.resolve_asset_url(&attachment.url).await);
        }

        let reactions = message
            .reactions
            .iter()
            .map(|reaction| format!("{} ({})", reaction.emoji.name(), reaction.count))
            .collect::<Vec<_>>()
            .join(",");

        let row = [
            encode(&message.author.id.to_string()),
            encode(&message.author.full_name()),
            encode(&context.format_date(message.timestamp, 'g')),
            encode(&render_plain_content(context, message)),
            encode(&attachments),
            encode(&reactions),
        ]
        .join(",");

        self.out.write_str(&row).await?;
        self.out.write_str("\n").await?;
        self.messages += 1;

        Ok(())
    }

    async fn write_postamble(&mut self, _context: &ExportContext) -> Result {
        Ok(())
    }

    async fn flush(&mut self) -> Result {
        self.out.flush().await
    }

    fn messages_written(&self) -> u64 {
        self.messages
    }

    fn bytes_written(&self) -> u64 {
        self.out.bytes_written()
    }
}
