use async_trait::async_trait;
use chronicle_markdown::{FormattingKind, MentionKind, Node};

use super::{render_mention_plain, CountingWriter, MessageWriter};
use crate::export::ExportContext;
use crate::model::{Member, Message};
use crate::snowflake::Snowflake;
use crate::Result;

/// Messages this close together may share a group.
const GROUP_WINDOW_MINUTES: i64 = 7;

/// The colour scheme baked into the page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Theme {
    /// Dark background, light text.
    Dark,
    /// Light background, dark text.
    Light,
}

/// Writes a self-contained HTML page.
///
/// Consecutive messages collapse into visual groups under one author header
/// when they share an author (by id *and* rendered name, guarding against
/// renames inside the window), sit within seven minutes of each other, are
/// not reply-like, and agree on being system notifications.
pub struct HtmlWriter {
    out: CountingWriter,
    theme: Theme,
    group: Vec<Message>,
    messages: u64,
}

impl HtmlWriter {
    /// Creates a writer over an open output file.
    #[must_use]
    pub(crate) const fn new(out: CountingWriter, theme: Theme) -> Self {
        Self { out, theme, group: Vec::new(), messages: 0 }
    }

    /// Decides whether `next` may join a group currently ending in `last`.
    fn can_join_group(context: &ExportContext, last: &Message, next: &Message) -> bool {
        last.author.id == next.author.id
            && context.display_name(&last.author) == context.display_name(&next.author)
            && (next.timestamp - last.timestamp).num_minutes().abs() <= GROUP_WINDOW_MINUTES
            && !last.is_reply_like()
            && !next.is_reply_like()
            && last.is_system_notification() == next.is_system_notification()
    }

    /// Renders and clears the buffered group.
    async fn flush_group(&mut self, context: &ExportContext) -> Result {
        let group = std::mem::take(&mut self.group);
        let Some(first) = group.first() else {
            return Ok(());
        };

        let author = &first.author;
        let avatar_url = context
            .member(author.id)
            .map_or_else(|| author.avatar_url(), Member::avatar_url);
        let avatar = context.resolve_asset_url(&avatar_url).await;
        let name = escape_html(&context.display_name(author));
        let color = context
            .user_color(author.id)
            .map_or_else(String::new, |color| format!(" style=\"color: {}\"", color.hex()));
        let timestamp = escape_html(&context.format_date(first.timestamp, 'g'));
        let title = escape_html(&context.format_date(first.timestamp, 'F'));
        let bot_tag = if author.is_bot { "<span class=\"chatlog__bot-tag\">BOT</span>" } else { "" };

        self.out.write_str("<div class=\"chatlog__message-group\">\n").await?;
        self.out
            .write_str(&format!(
                "<div class=\"chatlog__avatar-column\"><img class=\"chatlog__avatar\" src=\"{}\" alt=\"Avatar\" loading=\"lazy\"></div>\n",
                escape_html(&avatar)
            ))
            .await?;
        self.out.write_str("<div class=\"chatlog__messages\">\n").await?;
        self.out
            .write_str(&format!(
                "<div class=\"chatlog__header\"><span class=\"chatlog__author\"{color} title=\"{}\">{name}</span>{bot_tag}<span class=\"chatlog__timestamp\" title=\"{title}\">{timestamp}</span></div>\n",
                escape_html(&author.full_name()),
            ))
            .await?;

        for message in &group {
            self.write_single(context, message).await?;
        }

        self.out.write_str("</div>\n</div>\n").await
    }

    /// Renders one message inside the open group container.
    async fn write_single(&mut self, context: &ExportContext, message: &Message) -> Result {
        self.out
            .write_str(&format!(
                "<div class=\"chatlog__message-container\" id=\"chatlog__message-container-{}\">\n<div class=\"chatlog__message\">\n",
                message.id
            ))
            .await?;

        if let Some(reference) = &message.reference {
            let label = message.referenced_message.as_ref().map_or_else(
                || "Original message was deleted".to_owned(),
                |parent| {
                    format!(
                        "Reply to <b>{}</b>: {}",
                        escape_html(&context.display_name(&parent.author)),
                        escape_html(&truncated(&parent.content, 64)),
                    )
                },
            );
            let target = reference.message_id.map_or_else(String::new, |id| {
                format!(" onclick=\"scrollToMessage(event, '{id}')\"")
            });

            self.out
                .write_str(&format!("<div class=\"chatlog__reference\"{target}>{label}</div>\n"))
                .await?;
        }
        if let Some(interaction) = &message.interaction {
            self.out
                .write_str(&format!(
                    "<div class=\"chatlog__reference\"><b>{}</b> used <b>/{}</b></div>\n",
                    escape_html(&context.display_name(&interaction.user)),
                    escape_html(&interaction.name),
                ))
                .await?;
        }

        if message.is_system_notification() {
            self.out
                .write_str(&format!(
                    "<div class=\"chatlog__system-notification\">{}</div>\n",
                    escape_html(&message.system_notification_content()),
                ))
                .await?;
        } else if !message.content.trim().is_empty() {
            let content = if context.request().should_format_markdown {
                let nodes = chronicle_markdown::parse(&message.content);
                let jumbo = nodes
                    .iter()
                    .all(|node| node.is_emoji() || node.is_blank_text());

                render_nodes_html(context, &nodes, jumbo)
            } else {
                escape_html(&message.content)
            };

            self.out
                .write_str(&format!("<div class=\"chatlog__content\">{content}"))
                .await?;

            if message.edited_timestamp.is_some() {
                self.out
                    .write_str(" <span class=\"chatlog__edited\">(edited)</span>")
                    .await?;
            }

            self.out.write_str("</div>\n").await?;
        }

        for attachment in &message.attachments {
            let location = escape_html(&context.resolve_asset_url(&attachment.url).await);
            let rendered = if attachment.is_image() && !attachment.is_spoiler() {
                format!(
                    "<img class=\"chatlog__attachment-media\" src=\"{location}\" alt=\"{}\" loading=\"lazy\">",
                    escape_html(&attachment.file_name),
                )
            } else if attachment.is_video() {
                format!("<video class=\"chatlog__attachment-media\" controls src=\"{location}\"></video>")
            } else if attachment.is_audio() {
                format!("<audio controls src=\"{location}\"></audio>")
            } else {
                format!(
                    "<a href=\"{location}\">{} ({})</a>",
                    escape_html(&attachment.file_name),
                    crate::export::FileSize::from_bytes(attachment.size_bytes),
                )
            };

            self.out
                .write_str(&format!("<div class=\"chatlog__attachment\">{rendered}</div>\n"))
                .await?;
        }

        for embed in &message.embeds {
            self.write_embed(context, embed).await?;
        }

        for sticker in &message.stickers {
            let location = escape_html(&context.resolve_asset_url(&sticker.source_url()).await);

            self.out
                .write_str(&format!(
                    "<div class=\"chatlog__sticker\"><img src=\"{location}\" alt=\"{}\" loading=\"lazy\"></div>\n",
                    escape_html(&sticker.name),
                ))
                .await?;
        }

        if !message.reactions.is_empty() {
            self.out.write_str("<div class=\"chatlog__reactions\">").await?;

            for reaction in &message.reactions {
                self.out
                    .write_str(&format!(
                        "<span class=\"chatlog__reaction\"><img class=\"chatlog__emoji\" src=\"{}\" alt=\"{}\" loading=\"lazy\"> {}</span>",
                        escape_html(&reaction.emoji.image_url()),
                        escape_html(reaction.emoji.name()),
                        reaction.count,
                    ))
                    .await?;
            }

            self.out.write_str("</div>\n").await?;
        }

        self.out.write_str("</div>\n</div>\n").await
    }

    async fn write_embed(&mut self, context: &ExportContext, embed: &crate::model::Embed) -> Result {
        let accent = embed
            .color
            .map_or_else(String::new, |color| {
                format!(" style=\"border-left-color: {}\"", color.hex())
            });

        self.out.write_str(&format!("<div class=\"chatlog__embed\"{accent}>\n")).await?;

        if let Some(author) = &embed.author {
            if let Some(name) = &author.name {
                self.out
                    .write_str(&format!(
                        "<div class=\"chatlog__embed-author\">{}</div>\n",
                        escape_html(name)
                    ))
                    .await?;
            }
        }
        if let Some(title) = &embed.title {
            let inner = embed.url.as_ref().map_or_else(
                || escape_html(title),
                |url| format!("<a href=\"{}\">{}</a>", escape_html(url), escape_html(title)),
            );

            self.out
                .write_str(&format!("<div class=\"chatlog__embed-title\">{inner}</div>\n"))
                .await?;
        }
        if let Some(description) = &embed.description {
            let nodes = chronicle_markdown::parse(description);

            self.out
                .write_str(&format!(
                    "<div class=\"chatlog__embed-description\">{}</div>\n",
                    render_nodes_html(context, &nodes, false),
                ))
                .await?;
        }

        for field in &embed.fields {
            self.out
                .write_str(&format!(
                    "<div class=\"chatlog__embed-field\"><div class=\"chatlog__embed-field-name\">{}</div><div class=\"chatlog__embed-field-value\">{}</div></div>\n",
                    escape_html(&field.name),
                    escape_html(&field.value),
                ))
                .await?;
        }

        for image in embed.all_images() {
            if let Some(url) = &image.url {
                let location = escape_html(&context.resolve_asset_url(url).await);

                self.out
                    .write_str(&format!(
                        "<div class=\"chatlog__embed-image\"><img src=\"{location}\" alt=\"Embedded image\" loading=\"lazy\"></div>\n"
                    ))
                    .await?;
            }
        }

        if let Some(thumbnail) = &embed.thumbnail {
            if embed.image.is_none() {
                if let Some(url) = &thumbnail.url {
                    let location = escape_html(&context.resolve_asset_url(url).await);

                    self.out
                        .write_str(&format!(
                            "<div class=\"chatlog__embed-image\"><img src=\"{location}\" alt=\"Thumbnail\" loading=\"lazy\"></div>\n"
                        ))
                        .await?;
                }
            }
        }
        if let Some(footer) = &embed.footer {
            self.out
                .write_str(&format!(
                    "<div class=\"chatlog__embed-footer\">{}</div>\n",
                    escape_html(&footer.text)
                ))
                .await?;
        }

        self.out.write_str("</div>\n").await
    }
}

#[async_trait]
impl MessageWriter for HtmlWriter {
    async fn write_preamble(&mut self, context: &ExportContext) -> Result {
        let guild = context.guild();
        let channel = context.channel();
        let theme_css = match self.theme {
            Theme::Dark => DARK_CSS,
            Theme::Light => LIGHT_CSS,
        };

        self.out.write_str("<!doctype html>\n<html lang=\"en\">\n<head>\n").await?;
        self.out.write_str("<meta charset=\"utf-8\">\n").await?;
        self.out
            .write_str(&format!(
                "<title>{} - {}</title>\n",
                escape_html(&guild.name),
                escape_html(&channel.full_name()),
            ))
            .await?;
        self.out.write_str(&format!("<style>\n{CORE_CSS}{theme_css}</style>\n")).await?;
        self.out.write_str(&format!("<script>\n{SCRIPT}</script>\n")).await?;
        self.out.write_str("</head>\n<body>\n").await?;

        self.out.write_str("<div class=\"preamble\">\n").await?;
        self.out
            .write_str(&format!(
                "<div class=\"preamble__guild-name\">{}</div>\n<div class=\"preamble__channel-name\">{}</div>\n",
                escape_html(&guild.name),
                escape_html(&channel.full_name()),
            ))
            .await?;

        if let Some(topic) = &channel.topic {
            self.out
                .write_str(&format!(
                    "<div class=\"preamble__topic\">{}</div>\n",
                    escape_html(topic)
                ))
                .await?;
        }

        self.out.write_str("</div>\n<div class=\"chatlog\">\n").await
    }

    async fn write_message(&mut self, context: &ExportContext, message: &Message) -> Result {
        let joins = self
            .group
            .last()
            .is_some_and(|last| Self::can_join_group(context, last, message));

        if !self.group.is_empty() && !joins {
            self.flush_group(context).await?;
        }

        self.group.push(message.clone());
        self.messages += 1;

        Ok(())
    }

    async fn write_postamble(&mut self, context: &ExportContext) -> Result {
        self.flush_group(context).await?;
        self.out.write_str("</div>\n").await?;
        self.out
            .write_str(&format!(
                "<div class=\"postamble\">Exported {} message(s)</div>\n",
                self.messages
            ))
            .await?;
        self.out.write_str("</body>\n</html>\n").await
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

/// Escapes text for safe HTML interpolation.
pub(crate) fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for character in text.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }

    escaped
}

fn truncated(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_owned();
    }

    let mut shortened: String = text.chars().take(limit).collect();

    shortened.push('…');

    shortened
}

/// Renders a full-profile node tree to HTML.
fn render_nodes_html(context: &ExportContext, nodes: &[Node], jumbo: bool) -> String {
    let mut html = String::new();

    for node in nodes {
        match node {
            Node::Text(text) => html.push_str(&escape_html(text)),
            Node::Formatting(kind, children) => {
                let inner = render_nodes_html(context, children, false);
                let wrapped = match kind {
                    FormattingKind::Bold => format!("<b>{inner}</b>"),
                    FormattingKind::Italic => format!("<i>{inner}</i>"),
                    FormattingKind::Underline => format!("<u>{inner}</u>"),
                    FormattingKind::Strikethrough => format!("<s>{inner}</s>"),
                    FormattingKind::Spoiler => format!(
                        "<span class=\"chatlog__spoiler\" onclick=\"showSpoiler(event, this)\">{inner}</span>"
                    ),
                    FormattingKind::Quote => {
                        format!("<div class=\"chatlog__quote\">{inner}</div>")
                    }
                };

                html.push_str(&wrapped);
            }
            Node::Heading(level, children) => {
                let inner = render_nodes_html(context, children, false);

                html.push_str(&format!("<h{level}>{inner}</h{level}>"));
            }
            Node::List(items) => {
                html.push_str("<ul>");

                for item in items {
                    html.push_str(&format!(
                        "<li>{}</li>",
                        render_nodes_html(context, item, false)
                    ));
                }

                html.push_str("</ul>");
            }
            Node::InlineCode(code) => {
                html.push_str(&format!(
                    "<code class=\"chatlog__inline-code\">{}</code>",
                    escape_html(code)
                ));
            }
            Node::MultiLineCode(language, code) => {
                let class = language.as_ref().map_or_else(String::new, |language| {
                    format!(" class=\"language-{}\"", escape_html(language))
                });

                html.push_str(&format!(
                    "<pre class=\"chatlog__block-code\"><code{class}>{}</code></pre>",
                    escape_html(code)
                ));
            }
            Node::Link { url, children } => {
                html.push_str(&format!(
                    "<a href=\"{}\">{}</a>",
                    escape_html(url),
                    render_nodes_html(context, children, false),
                ));
            }
            Node::Emoji { id, name, animated } => {
                let class = if jumbo { "chatlog__emoji chatlog__emoji--large" } else { "chatlog__emoji" };
                let url = id.map_or_else(
                    || {
                        format!(
                            "https://cdn.jsdelivr.net/gh/jdecked/twemoji@latest/assets/72x72/{}.png",
                            chronicle_markdown::emoji::twemoji_id(name)
                        )
                    },
                    |id| {
                        let extension = if *animated { "gif" } else { "png" };

                        format!("{}/emojis/{id}.{extension}", crate::CDN_BASE)
                    },
                );

                html.push_str(&format!(
                    "<img class=\"{class}\" src=\"{}\" alt=\"{}\" loading=\"lazy\">",
                    escape_html(&url),
                    escape_html(name),
                ));
            }
            Node::Mention(kind) => {
                let label = match kind {
                    MentionKind::User(id) => {
                        let id = Snowflake::new(*id);

                        context.member(id).map_or_else(
                            || format!("@{id}"),
                            |member| format!("@{}", member.display_name()),
                        )
                    }
                    other => render_mention_plain(context, *other),
                };

                html.push_str(&format!(
                    "<span class=\"chatlog__mention\">{}</span>",
                    escape_html(&label)
                ));
            }
            Node::Timestamp { instant: Some(unix), format } => {
                let rendered = context.format_unix(*unix, *format);
                let full = context.format_unix(*unix, Some('F'));

                html.push_str(&format!(
                    "<span class=\"chatlog__timestamp\" title=\"{}\">{}</span>",
                    escape_html(&full),
                    escape_html(&rendered),
                ));
            }
            Node::Timestamp { instant: None, .. } => {
                html.push_str("<span class=\"chatlog__timestamp\">Invalid date</span>");
            }
        }
    }

    html
}

/// Layout styling shared by both themes.
const CORE_CSS: &str = "\
body { margin: 0; padding: 1rem; font-family: 'Helvetica Neue', Helvetica, Arial, sans-serif; font-size: 1rem; }
a { color: var(--link); text-decoration: none; }
a:hover { text-decoration: underline; }
.preamble { margin-bottom: 1rem; padding: 0.5rem 0; border-bottom: 1px solid var(--border); }
.preamble__guild-name { font-size: 1.4rem; font-weight: 600; }
.preamble__channel-name { font-size: 1.1rem; color: var(--muted); }
.preamble__topic { margin-top: 0.25rem; color: var(--muted); }
.chatlog { display: flex; flex-direction: column; }
.chatlog__message-group { display: flex; margin-bottom: 1rem; }
.chatlog__avatar-column { width: 40px; margin-right: 1rem; flex-shrink: 0; }
.chatlog__avatar { width: 40px; height: 40px; border-radius: 50%; }
.chatlog__messages { flex: 1; min-width: 0; }
.chatlog__header { margin-bottom: 0.1rem; }
.chatlog__author { font-weight: 600; }
.chatlog__bot-tag { margin-left: 0.3rem; padding: 0 0.3rem; font-size: 0.65rem; border-radius: 3px; background: var(--accent); color: #fff; }
.chatlog__timestamp { margin-left: 0.4rem; font-size: 0.75rem; color: var(--muted); }
.chatlog__content { overflow-wrap: break-word; white-space: pre-wrap; }
.chatlog__edited { font-size: 0.7rem; color: var(--muted); }
.chatlog__quote { padding-left: 0.5rem; border-left: 4px solid var(--border); }
.chatlog__inline-code, .chatlog__block-code { font-family: Consolas, 'Courier New', monospace; background: var(--surface); border-radius: 3px; }
.chatlog__inline-code { padding: 0.1rem 0.25rem; }
.chatlog__block-code { display: block; padding: 0.5rem; overflow-x: auto; }
.chatlog__spoiler { background: var(--spoiler); border-radius: 3px; cursor: pointer; }
.chatlog__spoiler:not(.chatlog__spoiler--revealed) { color: transparent; }
.chatlog__spoiler:not(.chatlog__spoiler--revealed) img { visibility: hidden; }
.chatlog__mention { color: var(--link); background: var(--mention); border-radius: 3px; padding: 0 2px; }
.chatlog__emoji { width: 1.375rem; height: 1.375rem; vertical-align: middle; }
.chatlog__emoji--large { width: 3rem; height: 3rem; }
.chatlog__attachment { margin-top: 0.3rem; }
.chatlog__attachment-media { max-width: 520px; max-height: 400px; border-radius: 3px; }
.chatlog__sticker img { max-width: 180px; }
.chatlog__embed { margin-top: 0.3rem; padding: 0.5rem 0.75rem; max-width: 520px; border-left: 4px solid var(--border); border-radius: 3px; background: var(--surface); }
.chatlog__embed-title { font-weight: 600; }
.chatlog__embed-field-name { font-weight: 600; font-size: 0.875rem; }
.chatlog__embed-footer { margin-top: 0.25rem; font-size: 0.75rem; color: var(--muted); }
.chatlog__embed-image img { max-width: 100%; border-radius: 3px; }
.chatlog__reference { font-size: 0.85rem; color: var(--muted); margin-bottom: 0.15rem; cursor: pointer; }
.chatlog__system-notification { color: var(--muted); }
.chatlog__reactions { margin-top: 0.25rem; }
.chatlog__reaction { display: inline-block; margin-right: 0.25rem; padding: 0.1rem 0.35rem; border-radius: 8px; background: var(--surface); font-size: 0.875rem; }
.chatlog__message-container--highlighted { background: var(--highlight); }
.postamble { margin-top: 1rem; padding-top: 0.5rem; border-top: 1px solid var(--border); color: var(--muted); }
";

/// Dark theme variables.
const DARK_CSS: &str = "\
body { --link: #00aff4; --border: #3f4147; --muted: #949ba4; --surface: #2b2d31; --mention: rgba(88, 101, 242, 0.3); --spoiler: #202225; --accent: #5865f2; --highlight: rgba(88, 101, 242, 0.15); background: #313338; color: #dbdee1; }
";

/// Light theme variables.
const LIGHT_CSS: &str = "\
body { --link: #0068e0; --border: #e3e5e8; --muted: #5c5e66; --surface: #f2f3f5; --mention: rgba(88, 101, 242, 0.15); --spoiler: #e3e5e8; --accent: #5865f2; --highlight: rgba(88, 101, 242, 0.08); background: #ffffff; color: #2e3338; }
";

/// Client-side hooks referenced by the rendered markup.
const SCRIPT: &str = "\
function showSpoiler(event, element) {
  if (element && !element.classList.contains('chatlog__spoiler--revealed')) {
    element.classList.add('chatlog__spoiler--revealed');
    event.stopPropagation();
  }
}
function scrollToMessage(event, id) {
  const element = document.getElementById('chatlog__message-container-' + id);
  if (!element) return;
  event.preventDefault();
  element.scrollIntoView({ behavior: 'smooth', block: 'center' });
  element.classList.add('chatlog__message-container--highlighted');
  setTimeout(() => element.classList.remove('chatlog__message-container--highlighted'), 2000);
}
";
