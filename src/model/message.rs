use bitflags::bitflags;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_repr::Deserialize_repr;

use super::attachment::Attachment;
use super::embed::{normalized_embeds, Embed};
use super::reaction::Reaction;
use super::sticker::Sticker;
use super::user::User;
use crate::snowflake::Snowflake;

/// The kind of a message.
///
/// Raw values `1..=18` are system notifications: server events rendered with
/// fallback text rather than user-authored content.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Deserialize_repr)]
pub enum MessageKind {
    /// An ordinary user message.
    Default = 0,
    /// A recipient was added to a group call or thread.
    RecipientAdd = 1,
    /// A recipient was removed from a group call or thread.
    RecipientRemove = 2,
    /// A call was started.
    Call = 3,
    /// The channel's name was changed.
    ChannelNameChange = 4,
    /// The channel's icon was changed.
    ChannelIconChange = 5,
    /// A message was pinned.
    ChannelPinnedMessage = 6,
    /// A member joined the guild.
    UserJoin = 7,
    /// The guild was boosted.
    GuildBoost = 8,
    /// The guild reached boost tier one.
    GuildBoostTier1 = 9,
    /// The guild reached boost tier two.
    GuildBoostTier2 = 10,
    /// The guild reached boost tier three.
    GuildBoostTier3 = 11,
    /// An announcement channel was followed.
    ChannelFollowAdd = 12,
    /// The guild was disqualified from discovery.
    GuildDiscoveryDisqualified = 14,
    /// The guild requalified for discovery.
    GuildDiscoveryRequalified = 15,
    /// The guild's discovery grace period posted its first warning.
    GuildDiscoveryGracePeriodInitialWarning = 16,
    /// The guild's discovery grace period posted its final warning.
    GuildDiscoveryGracePeriodFinalWarning = 17,
    /// A thread was created from this message.
    ThreadCreated = 18,
    /// A reply to another message.
    Reply = 19,
    /// A chat-input application command invocation.
    ChatInputCommand = 20,
    /// The first message of a thread, mirrored from its parent.
    ThreadStarterMessage = 21,
    /// A reminder to invite people to the guild.
    GuildInviteReminder = 22,
    /// A context-menu application command invocation.
    ContextMenuCommand = 23,
    /// An automatic moderation action report.
    AutoModerationAction = 24,
    /// A role subscription purchase or renewal.
    RoleSubscriptionPurchase = 25,
    /// An interaction premium upsell notice.
    InteractionPremiumUpsell = 26,
    /// A stage instance started.
    StageStart = 27,
    /// A stage instance ended.
    StageEnd = 28,
    /// A stage speaker change.
    StageSpeaker = 29,
    /// A stage topic change.
    StageTopic = 31,
    /// A premium subscription to the guild's application.
    GuildApplicationPremiumSubscription = 32,
    /// A kind added after this crate was written.
    #[serde(other)]
    Unknown = 255,
}

impl MessageKind {
    /// Returns the kind's raw wire value.
    #[must_use]
    pub const fn raw(self) -> u8 {
        self as u8
    }

    /// Returns whether this kind is a system notification.
    #[must_use]
    pub const fn is_system_notification(self) -> bool {
        1 <= self.raw() && self.raw() <= 18
    }
}

bitflags! {
    /// The subset of message flags the exporter cares about.
    #[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
    pub struct MessageFlags: u64 {
        /// The message was published to following channels.
        const CROSSPOSTED = 1 << 0;
        /// The message originated in another channel.
        const IS_CROSSPOST = 1 << 1;
        /// The message suppresses its embeds.
        const SUPPRESS_EMBEDS = 1 << 2;
        /// The crossposted source message was deleted.
        const SOURCE_MESSAGE_DELETED = 1 << 3;
        /// The message came from the urgent message system.
        const URGENT = 1 << 4;
        /// The message has an associated thread.
        const HAS_THREAD = 1 << 5;
        /// The message is only visible to the invoking user.
        const EPHEMERAL = 1 << 6;
        /// The message is an interaction placeholder.
        const LOADING = 1 << 7;
    }
}

/// The location a reply points back at.
#[derive(Clone, Debug, Deserialize)]
pub struct MessageReference {
    /// The referenced message, when the reference is message-scoped.
    #[serde(default)]
    pub message_id: Option<Snowflake>,
    /// The referenced channel.
    #[serde(default)]
    pub channel_id: Option<Snowflake>,
    /// The referenced guild.
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

/// The interaction a response message answers.
#[derive(Clone, Debug, Deserialize)]
pub struct Interaction {
    /// The interaction's identifier.
    pub id: Snowflake,
    /// The invoked command's name.
    pub name: String,
    /// The invoking user.
    pub user: User,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct CallInfo {
    #[serde(default)]
    ended_timestamp: Option<DateTime<Utc>>,
}

/// A single message.
#[derive(Clone, Debug, Deserialize)]
pub struct Message {
    /// The message's identifier.
    pub id: Snowflake,
    /// The message's kind.
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// The message's raw flag mask.
    #[serde(rename = "flags", default)]
    raw_flags: u64,
    /// The message's author.
    pub author: User,
    /// When the message was sent.
    pub timestamp: DateTime<Utc>,
    /// When the message was last edited, if ever.
    #[serde(rename = "edited_timestamp", default)]
    pub edited_timestamp: Option<DateTime<Utc>>,
    /// Call metadata for call notification messages.
    #[serde(rename = "call", default)]
    call: Option<CallInfo>,
    /// Whether the message is pinned.
    #[serde(rename = "pinned", default)]
    pub is_pinned: bool,
    /// The message's markdown source text.
    #[serde(default)]
    pub content: String,
    /// The message's attachments, in wire order.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// The message's embeds, normalised on parse.
    #[serde(default, deserialize_with = "normalized_embeds")]
    pub embeds: Vec<Embed>,
    /// The message's stickers.
    #[serde(rename = "sticker_items", default)]
    pub stickers: Vec<Sticker>,
    /// The message's aggregated reactions.
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    /// The users mentioned by the message.
    #[serde(rename = "mentions", default)]
    pub mentioned_users: Vec<User>,
    /// The reply reference, when the message is a reply.
    #[serde(rename = "message_reference", default)]
    pub reference: Option<MessageReference>,
    /// The directly referenced message, materialised at most one level deep.
    /// Renderers must never traverse further.
    #[serde(rename = "referenced_message", default)]
    pub referenced_message: Option<Box<Message>>,
    /// The interaction this message responds to.
    #[serde(rename = "interaction", default)]
    pub interaction: Option<Interaction>,
}

impl Message {
    /// Returns the message's known flags.
    #[must_use]
    pub const fn flags(&self) -> MessageFlags {
        MessageFlags::from_bits_truncate(self.raw_flags)
    }

    /// Returns when the message's call ended, for call notifications.
    #[must_use]
    pub fn call_ended_timestamp(&self) -> Option<DateTime<Utc>> {
        self.call.as_ref().and_then(|call| call.ended_timestamp)
    }

    /// Returns whether this message is a system notification.
    #[must_use]
    pub const fn is_system_notification(&self) -> bool {
        self.kind.is_system_notification()
    }

    /// Returns whether this message is a reply.
    #[must_use]
    pub fn is_reply(&self) -> bool {
        self.kind == MessageKind::Reply
    }

    /// Returns whether this message renders with a reply-style header, which
    /// covers both replies and interaction responses.
    #[must_use]
    pub fn is_reply_like(&self) -> bool {
        self.is_reply() || self.interaction.is_some()
    }

    /// Returns whether the message has nothing to render below its header.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
            && self.attachments.is_empty()
            && self.embeds.is_empty()
            && self.stickers.is_empty()
    }

    /// Returns every user the message references: the author, mentions, the
    /// interaction's invoker, and the replied-to author.
    #[must_use]
    pub fn referenced_users(&self) -> Vec<&User> {
        let mut users = vec![&self.author];

        users.extend(self.mentioned_users.iter());

        if let Some(interaction) = &self.interaction {
            users.push(&interaction.user);
        }
        if let Some(referenced) = &self.referenced_message {
            users.push(&referenced.author);
        }

        users
    }

    /// Returns the fallback text a system notification renders with.
    ///
    /// Ordinary messages return their content unchanged.
    #[must_use]
    pub fn system_notification_content(&self) -> String {
        match self.kind {
            MessageKind::RecipientAdd => "Added a recipient.".to_owned(),
            MessageKind::RecipientRemove => "Removed a recipient.".to_owned(),
            MessageKind::Call => self.call_ended_timestamp().map_or_else(
                || "Started a call.".to_owned(),
                |ended| {
                    let minutes = (ended - self.timestamp).num_minutes().max(0);

                    format!("Started a call that lasted {minutes} minutes.")
                },
            ),
            MessageKind::ChannelNameChange => format!("Changed the channel name: {}", self.content),
            MessageKind::ChannelIconChange => "Changed the channel icon.".to_owned(),
            MessageKind::ChannelPinnedMessage => "Pinned a message.".to_owned(),
            MessageKind::UserJoin => "Joined the server.".to_owned(),
            MessageKind::GuildBoost => "Boosted the server!".to_owned(),
            MessageKind::GuildBoostTier1 => "The server reached Tier 1!".to_owned(),
            MessageKind::GuildBoostTier2 => "The server reached Tier 2!".to_owned(),
            MessageKind::GuildBoostTier3 => "The server reached Tier 3!".to_owned(),
            MessageKind::ChannelFollowAdd => {
                format!("Followed announcement channel: {}", self.content)
            }
            MessageKind::GuildDiscoveryDisqualified => {
                "The server was disqualified from discovery.".to_owned()
            }
            MessageKind::GuildDiscoveryRequalified => {
                "The server requalified for discovery.".to_owned()
            }
            MessageKind::GuildDiscoveryGracePeriodInitialWarning => {
                "The server is at risk of being disqualified from discovery.".to_owned()
            }
            MessageKind::GuildDiscoveryGracePeriodFinalWarning => {
                "This is the final warning before the server is disqualified from discovery."
                    .to_owned()
            }
            MessageKind::ThreadCreated => format!("Started a thread: {}", self.content),
            _ => self.content.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn message(value: serde_json::Value) -> Message {
        serde_json::from_value(value).unwrap()
    }

    fn base(kind: u8) -> serde_json::Value {
        serde_json::json!({
            "id": "3",
            "type": kind,
            "author": {"id": "1", "username": "john"},
            "timestamp": "2021-05-01T12:00:00+00:00",
            "content": "hello",
        })
    }

    #[test]
    fn system_notification_range() {
        assert!(message(base(7)).is_system_notification());
        assert!(message(base(18)).is_system_notification());
        assert!(!message(base(0)).is_system_notification());
        assert!(!message(base(19)).is_system_notification());
    }

    #[test]
    fn unknown_kind_is_tolerated() {
        let message = message(base(200));

        assert_eq!(message.kind, MessageKind::Unknown);
        assert!(!message.is_system_notification());
    }

    #[test]
    fn reply_likeness() {
        let mut value = base(19);

        assert!(message(value.clone()).is_reply());

        value["type"] = serde_json::json!(0);
        value["interaction"] = serde_json::json!({
            "id": "9",
            "name": "ping",
            "user": {"id": "2", "username": "invoker"},
        });

        let interaction_response = message(value);

        assert!(!interaction_response.is_reply());
        assert!(interaction_response.is_reply_like());
    }

    #[test]
    fn referenced_users_cover_every_source() {
        let mut value = base(19);

        value["mentions"] = serde_json::json!([{"id": "4", "username": "mentioned"}]);
        value["referenced_message"] = serde_json::json!({
            "id": "2",
            "type": 0,
            "author": {"id": "5", "username": "parent"},
            "timestamp": "2021-05-01T11:59:00+00:00",
        });

        let users = message(value);
        let ids: Vec<u64> = users.referenced_users().iter().map(|u| u.id.value()).collect();

        assert_eq!(ids, vec![1, 4, 5]);
    }

    #[test]
    fn empty_message_retains_header_only_content() {
        let mut value = base(0);

        value["content"] = serde_json::json!("   ");

        assert!(message(value).is_empty());
        assert!(!message(base(0)).is_empty());
    }

    #[test]
    fn call_duration_renders_in_fallback() {
        let mut value = base(3);

        value["call"] = serde_json::json!({"ended_timestamp": "2021-05-01T12:10:00+00:00"});

        let message = message(value);

        assert_eq!(message.system_notification_content(), "Started a call that lasted 10 minutes.");
    }
}
