use async_trait::async_trait;
use chronicle_markdown::Node;
use serde_json::{json, Map, Value};

use super::{render_plain_content, CountingWriter, MessageWriter};
use crate::export::ExportContext;
use crate::model::{Embed, Emoji, Member, Message, User};
use crate::Result;

/// Writes the whole export as one pretty-printed JSON document.
///
/// Messages accumulate in memory and the document is emitted at postamble
/// time, so the byte counter only moves at the very end.
pub struct JsonWriter {
    out: CountingWriter,
    messages: Vec<Value>,
    written: u64,
    preamble: Map<String, Value>,
}

impl JsonWriter {
    /// Creates a writer over an open output file.
    #[must_use]
    pub(crate) fn new(out: CountingWriter) -> Self {
        Self { out, messages: Vec::new(), written: 0, preamble: Map::new() }
    }

    fn user_value(context: &ExportContext, user: &User) -> Value {
        let member = context.member(user.id);

        json!({
            "id": user.id,
            "name": user.name,
            "discriminator": user.discriminator.map(|tag| format!("{tag:04}")),
            "nickname": context.display_name(user),
            "color": context.user_color(user.id).map(|color| color.hex()),
            "isBot": user.is_bot,
            "avatarUrl": member.map_or_else(|| user.avatar_url(), Member::avatar_url),
        })
    }

    fn author_value(context: &ExportContext, user: &User) -> Value {
        let mut value = Self::user_value(context, user);
        let roles: Vec<Value> = context
            .member_roles(user.id)
            .iter()
            .map(|role| {
                json!({
                    "id": role.id,
                    "name": role.name,
                    "color": role.color.map(crate::model::Color::hex),
                    "position": role.position,
                })
            })
            .collect();

        if let Some(object) = value.as_object_mut() {
            object.insert("roles".to_owned(), Value::Array(roles));
        }

        value
    }

    fn emoji_value(emoji: &Emoji) -> Value {
        json!({
            "id": emoji.id,
            "name": emoji.name(),
            "code": emoji.code(),
            "isAnimated": emoji.animated,
            "imageUrl": emoji.image_url(),
        })
    }

    async fn embed_value(context: &ExportContext, embed: &Embed) -> Value {
        let mut value = Map::new();

        if let Some(title) = &embed.title {
            value.insert("title".to_owned(), json!(title));
        }
        if let Some(url) = &embed.url {
            value.insert("url".to_owned(), json!(url));
        }
        if let Some(timestamp) = embed.timestamp {
            value.insert("timestamp".to_owned(), json!(timestamp.to_rfc3339()));
        }
        if let Some(color) = embed.color {
            value.insert("color".to_owned(), json!(color.hex()));
        }
        if let Some(author) = &embed.author {
            value.insert(
                "author".to_owned(),
                json!({"name": author.name, "url": author.url, "iconUrl": author.icon_url}),
            );
        }
        if let Some(description) = &embed.description {
            value.insert("description".to_owned(), json!(description));
        }
        if !embed.fields.is_empty() {
            let fields: Vec<Value> = embed
                .fields
                .iter()
                .map(|field| json!({"name": field.name, "value": field.value, "isInline": field.inline}))
                .collect();

            value.insert("fields".to_owned(), Value::Array(fields));
        }
        if let Some(thumbnail) = &embed.thumbnail {
            let url = match &thumbnail.url {
                Some(url) => Some(context.resolve_asset_url(url).await),
                None => None,
            };

            value.insert(
                "thumbnail".to_owned(),
                json!({"url": url, "width": thumbnail.width, "height": thumbnail.height}),
            );
        }

        let mut images = Vec::new();

        for image in embed.all_images() {
            let url = match &image.url {
                Some(url) => Some(context.resolve_asset_url(url).await),
                None => None,
            };

            images.push(json!({"url": url, "width": image.width, "height": image.height}));
        }

        if !images.is_empty() {
            value.insert("images".to_owned(), Value::Array(images));
        }
        if let Some(video) = &embed.video {
            value.insert(
                "video".to_owned(),
                json!({"url": video.url, "width": video.width, "height": video.height}),
            );
        }
        if let Some(footer) = &embed.footer {
            value.insert(
                "footer".to_owned(),
                json!({"text": footer.text, "iconUrl": footer.icon_url}),
            );
        }

        Value::Object(value)
    }

    /// Collects the distinct emoji used inline in the message content.
    fn inline_emojis(message: &Message) -> Vec<Emoji> {
        let mut found: Vec<Emoji> = Vec::new();
        let mut stack = chronicle_markdown::parse(&message.content);

        while let Some(node) = stack.pop() {
            match node {
                Node::Emoji { id, name, animated } => {
                    let emoji = id.map_or_else(
                        || Emoji::standard(name.clone()),
                        |id| Emoji::custom(crate::Snowflake::new(id), name.clone(), animated),
                    );

                    if !found.iter().any(|seen| seen.id == emoji.id && seen.name() == emoji.name())
                    {
                        found.push(emoji);
                    }
                }
                Node::Formatting(_, children)
                | Node::Heading(_, children)
                | Node::Link { children, .. } => stack.extend(children),
                Node::List(items) => stack.extend(items.into_iter().flatten()),
                _ => {}
            }
        }

        found
    }
}

#[async_trait]
impl MessageWriter for JsonWriter {
    async fn write_preamble(&mut self, context: &ExportContext) -> Result {
        let guild = context.guild();
        let channel = context.channel();

        self.preamble.insert(
            "guild".to_owned(),
            json!({"id": guild.id, "name": guild.name, "iconUrl": guild.icon_url()}),
        );
        self.preamble.insert(
            "channel".to_owned(),
            json!({
                "id": channel.id,
                "type": format!("{:?}", channel.kind),
                "categoryId": channel.parent.as_ref().map(|parent| parent.id),
                "category": channel.parent.as_ref().map(|parent| parent.name.clone()),
                "name": channel.name,
                "topic": channel.topic,
            }),
        );
        self.preamble.insert(
            "dateRange".to_owned(),
            json!({
                "after": context.request().after.map(|id| id.timestamp().to_rfc3339()),
                "before": context.request().before.map(|id| id.timestamp().to_rfc3339()),
            }),
        );
        self.preamble
            .insert("exportedAt".to_owned(), json!(context.exported_at().to_rfc3339()));

        Ok(())
    }

    async fn write_message(&mut self, context: &ExportContext, message: &Message) -> Result {
        let mut attachments = Vec::new();

        for attachment in &message.attachments {
            attachments.push(json!({
                "id": attachment.id,
                "url": context.resolve_asset_url(&attachment.url).await,
                "fileName": attachment.file_name,
                "fileSizeBytes": attachment.size_bytes,
                "width": attachment.width,
                "height": attachment.height,
            }));
        }

        let mut embeds = Vec::new();

        for embed in &message.embeds {
            embeds.push(Self::embed_value(context, embed).await);
        }

        let mut stickers = Vec::new();

        for sticker in &message.stickers {
            stickers.push(json!({
                "id": sticker.id,
                "name": sticker.name,
                "format": format!("{:?}", sticker.format),
                "sourceUrl": context.resolve_asset_url(&sticker.source_url()).await,
            }));
        }

        let mut reactions = Vec::new();

        for reaction in &message.reactions {
            let users: Vec<Value> = context
                .reaction_users(message.id, reaction)
                .await
                .iter()
                .map(|user| Self::user_value(context, user))
                .collect();

            reactions.push(json!({
                "emoji": Self::emoji_value(&reaction.emoji),
                "count": reaction.count,
                "users": users,
            }));
        }

        let mentions: Vec<Value> =
            message.mentioned_users.iter().map(|user| Self::user_value(context, user)).collect();
        let inline_emojis: Vec<Value> =
            Self::inline_emojis(message).iter().map(Self::emoji_value).collect();

        self.messages.push(json!({
            "id": message.id,
            "type": format!("{:?}", message.kind),
            "timestamp": message.timestamp.to_rfc3339(),
            "timestampEdited": message.edited_timestamp.map(|instant| instant.to_rfc3339()),
            "callEndedTimestamp": message.call_ended_timestamp().map(|instant| instant.to_rfc3339()),
            "isPinned": message.is_pinned,
            "content": render_plain_content(context, message),
            "author": Self::author_value(context, &message.author),
            "attachments": attachments,
            "embeds": embeds,
            "stickers": stickers,
            "reactions": reactions,
            "mentions": mentions,
            "reference": message.reference.as_ref().map(|reference| {
                json!({
                    "messageId": reference.message_id,
                    "channelId": reference.channel_id,
                    "guildId": reference.guild_id,
                })
            }),
            "interaction": message.interaction.as_ref().map(|interaction| {
                json!({
                    "id": interaction.id,
                    "name": interaction.name,
                    "user": Self::user_value(context, &interaction.user),
                })
            }),
            "inlineEmojis": inline_emojis,
        }));
        self.written += 1;

        Ok(())
    }

    async fn write_postamble(&mut self, _context: &ExportContext) -> Result {
        let count = self.messages.len();
        let mut document = std::mem::take(&mut self.preamble);

        document.insert("messages".to_owned(), Value::Array(std::mem::take(&mut self.messages)));
        document.insert("messageCount".to_owned(), json!(count));

        let rendered = serde_json::to_string_pretty(&Value::Object(document))?;

        self.out.write_str(&rendered).await?;
        self.out.write_str("\n").await
    }

    async fn flush(&mut self) -> Result {
        self.out.flush().await
    }

    fn messages_written(&self) -> u64 {
        self.written
    }

    fn bytes_written(&self) -> u64 {
        self.out.bytes_written()
    }
}
