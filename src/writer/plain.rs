use async_trait::async_trait;

use super::{render_plain_content, CountingWriter, MessageWriter};
use crate::export::ExportContext;
use crate::model::Message;
use crate::Result;

/// The banner line used around the header and footer.
const BANNER: &str =
    "==============================================================\n";

/// Writes a human-readable text transcript.
pub struct PlainTextWriter {
    out: CountingWriter,
    messages: u64,
}

impl PlainTextWriter {
    /// Creates a writer over an open output file.
    #[must_use]
    pub(crate) const fn new(out: CountingWriter) -> Self {
        Self { out, messages: 0 }
    }

    async fn write_message_header(&mut self, context: &ExportContext, message: &Message) -> Result {
        let timestamp = context.format_date(message.timestamp, 'g');
        let author = context.display_name(&message.author);
        let mut header = format!("[{timestamp}] {author}");

        if message.is_pinned {
            header.push_str(" (pinned)");
        }

        header.push('\n');

        self.out.write_str(&header).await
    }
}

#[async_trait]
impl MessageWriter for PlainTextWriter {
    async fn write_preamble(&mut self, context: &ExportContext) -> Result {
        let mut header = String::from(BANNER);

        header.push_str(&format!("Guild: {}\n", context.guild().name));
        header.push_str(&format!("Channel: {}\n", context.channel().full_name()));

        if let Some(topic) = &context.channel().topic {
            header.push_str(&format!("Topic: {topic}\n"));
        }
        if let Some(after) = context.request().after {
            header.push_str(&format!("After: {}\n", context.format_date(after.timestamp(), 'g')));
        }
        if let Some(before) = context.request().before {
            header.push_str(&format!("Before: {}\n", context.format_date(before.timestamp(), 'g')));
        }

        header.push_str(BANNER);
        header.push('\n');

        self.out.write_str(&header).await
    }

    async fn write_message(&mut self, context: &ExportContext, message: &Message) -> Result {
        self.write_message_header(context, message).await?;

        let content = render_plain_content(context, message);

        if !content.is_empty() {
            self.out.write_str(&content).await?;
            self.out.write_str("\n").await?;
        }

        if !message.attachments.is_empty() {
            self.out.write_str("{Attachments}\n").await?;

            for attachment in &message.attachments {
                let location = context.resolve_asset_url(&attachment.url).await;
                let size = crate::export::FileSize::from_bytes(attachment.size_bytes);

                self.out.write_str(&format!("{location} ({size})\n")).await?;
            }
        }

        for embed in &message.embeds {
            self.out.write_str("{Embed}\n").await?;

            for line in [
                embed.author.as_ref().and_then(|author| author.name.clone()),
                embed.url.clone(),
                embed.title.clone(),
                embed.description.clone(),
            ]
            .into_iter()
            .flatten()
            {
                self.out.write_str(&format!("{line}\n")).await?;
            }

            for field in &embed.fields {
                self.out.write_str(&format!("{}: {}\n", field.name, field.value)).await?;
            }

            for image in embed.all_images() {
                if let Some(url) = &image.url {
                    let location = context.resolve_asset_url(url).await;

                    self.out.write_str(&format!("{location}\n")).await?;
                }
            }

            if let Some(footer) = &embed.footer {
                self.out.write_str(&format!("{}\n", footer.text)).await?;
            }
        }

        for sticker in &message.stickers {
            let location = context.resolve_asset_url(&sticker.source_url()).await;

            self.out.write_str(&format!("{{Sticker}}\n{} ({location})\n", sticker.name)).await?;
        }

        if !message.reactions.is_empty() {
            self.out.write_str("{Reactions}\n").await?;

            let mut line = String::new();

            for reaction in &message.reactions {
                if !line.is_empty() {
                    line.push(' ');
                }

                line.push_str(reaction.emoji.name());

                if reaction.count > 1 {
                    line.push_str(&format!(" ({})", reaction.count));
                }
            }

            line.push('\n');

            self.out.write_str(&line).await?;
        }

        self.out.write_str("\n").await?;
        self.messages += 1;

        Ok(())
    }

    async fn write_postamble(&mut self, _context: &ExportContext) -> Result {
        let footer = format!("{BANNER}Exported {} message(s)\n{BANNER}", self.messages);

        self.out.write_str(&footer).await
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
