use serde::Deserialize;
use serde_repr::Deserialize_repr;

use super::user::User;
use crate::snowflake::Snowflake;

/// The kind of a channel.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Deserialize_repr)]
pub enum ChannelKind {
    /// A guild text channel.
    Text = 0,
    /// A one-on-one direct message channel.
    Dm = 1,
    /// A guild voice channel.
    Voice = 2,
    /// A multi-user direct message channel.
    GroupDm = 3,
    /// A category grouping other channels.
    Category = 4,
    /// A guild announcement channel.
    News = 5,
    /// A thread under an announcement channel.
    NewsThread = 10,
    /// A public thread under a text channel.
    PublicThread = 11,
    /// A private thread under a text channel.
    PrivateThread = 12,
    /// A stage voice channel.
    Stage = 13,
    /// A guild directory listing.
    Directory = 14,
    /// A forum channel; posts live in its threads, not in the channel itself.
    Forum = 15,
    /// A kind added after this crate was written.
    #[serde(other)]
    Unknown = 255,
}

impl ChannelKind {
    /// Returns whether this kind is a thread.
    #[must_use]
    pub const fn is_thread(self) -> bool {
        matches!(self, Self::NewsThread | Self::PublicThread | Self::PrivateThread)
    }

    /// Returns whether this kind is a grouping category.
    #[must_use]
    pub const fn is_category(self) -> bool {
        matches!(self, Self::Category)
    }

    /// Returns whether this kind is a direct-message channel.
    #[must_use]
    pub const fn is_direct(self) -> bool {
        matches!(self, Self::Dm | Self::GroupDm)
    }

    /// Returns whether this kind carries audio rather than text.
    #[must_use]
    pub const fn is_voice(self) -> bool {
        matches!(self, Self::Voice | Self::Stage)
    }
}

/// The wire shape of a channel payload.
#[derive(Debug, Deserialize)]
pub(crate) struct ChannelWire {
    id: Snowflake,
    #[serde(rename = "type")]
    kind: ChannelKind,
    #[serde(default)]
    guild_id: Option<Snowflake>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    position: Option<i64>,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    last_message_id: Option<Snowflake>,
    #[serde(default)]
    parent_id: Option<Snowflake>,
    #[serde(default)]
    recipients: Option<Vec<User>>,
    #[serde(default)]
    thread_metadata: Option<ThreadMetadata>,
}

impl ChannelWire {
    /// Returns the wire payload's kind, for pre-construction routing.
    pub(crate) const fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Returns the wire payload's parent identifier, so the client can
    /// resolve the parent before construction.
    pub(crate) const fn parent_id(&self) -> Option<Snowflake> {
        self.parent_id
    }
}

#[derive(Debug, Deserialize)]
struct ThreadMetadata {
    #[serde(default)]
    archived: bool,
}

/// A channel, thread, or category.
///
/// Parents form a forest of at most two levels: category → channel → thread.
/// The back-reference is attached by the client after fetching the parent
/// separately; it is never part of the wire payload.
#[derive(Clone, Debug)]
pub struct Channel {
    /// The channel's identifier.
    pub id: Snowflake,
    /// The channel's kind.
    pub kind: ChannelKind,
    /// The owning guild; the sentinel zero for direct messages.
    pub guild_id: Snowflake,
    /// The parent category or channel, when there is one.
    pub parent: Option<Box<Channel>>,
    /// The identifier of the parent, kept even when the parent itself was
    /// not resolved.
    pub parent_id: Option<Snowflake>,
    /// The channel's display name.
    pub name: String,
    /// The channel's sorting position, when known.
    pub position: Option<i64>,
    /// The channel's topic, when set.
    pub topic: Option<String>,
    /// Whether a thread has been archived.
    pub is_archived: bool,
    /// The identifier of the most recent message; `None` when empty.
    pub last_message_id: Option<Snowflake>,
}

impl Channel {
    /// Builds a channel from its wire payload and an optionally resolved
    /// parent.
    pub(crate) fn from_wire(wire: ChannelWire, parent: Option<Self>) -> Self {
        let name = wire.name.filter(|name| !name.is_empty()).unwrap_or_else(|| {
            wire.recipients.as_deref().map_or_else(
                || wire.id.to_string(),
                |recipients| {
                    recipients.iter().map(User::display_name).collect::<Vec<_>>().join(", ")
                },
            )
        });

        Self {
            id: wire.id,
            kind: wire.kind,
            guild_id: wire.guild_id.unwrap_or_else(|| Snowflake::new(0)),
            parent: parent.map(Box::new),
            parent_id: wire.parent_id,
            name,
            position: wire.position,
            topic: wire.topic,
            is_archived: wire.thread_metadata.is_some_and(|meta| meta.archived),
            last_message_id: wire.last_message_id,
        }
    }

    /// Returns whether the channel has never held a message.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.last_message_id.is_none()
    }

    /// Returns whether messages may exist after the given cursor.
    #[must_use]
    pub fn may_have_messages_after(&self, cursor: Snowflake) -> bool {
        self.last_message_id.is_some_and(|last| cursor < last)
    }

    /// Returns whether messages may exist before the given cursor.
    ///
    /// No message can predate the channel itself, so the channel's own
    /// identifier is the lower bound.
    #[must_use]
    pub fn may_have_messages_before(&self, cursor: Snowflake) -> bool {
        !self.is_empty() && cursor > self.id
    }

    /// Returns the hierarchical name: ancestors joined by `" / "`.
    #[must_use]
    pub fn full_name(&self) -> String {
        self.parent
            .as_ref()
            .map_or_else(|| self.name.clone(), |parent| format!("{} / {}", parent.full_name(), self.name))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn channel(last_message_id: Option<u64>) -> Channel {
        let wire: ChannelWire = serde_json::from_value(serde_json::json!({
            "id": "500",
            "type": 0,
            "guild_id": "1",
            "name": "general",
            "last_message_id": last_message_id.map(|id| id.to_string()),
        }))
        .unwrap();

        Channel::from_wire(wire, None)
    }

    #[test]
    fn empty_channel_has_no_last_message() {
        assert!(channel(None).is_empty());
        assert!(!channel(Some(900)).is_empty());
    }

    #[test]
    fn range_predicates_use_cursor_bounds() {
        let channel = channel(Some(900));

        assert!(channel.may_have_messages_after(Snowflake::new(899)));
        assert!(!channel.may_have_messages_after(Snowflake::new(900)));
        assert!(channel.may_have_messages_before(Snowflake::new(501)));
        assert!(!channel.may_have_messages_before(Snowflake::new(500)));
    }

    #[test]
    fn full_name_joins_ancestors() {
        let parent = channel(None);
        let mut thread = channel(Some(900));

        thread.name = "weekly".to_owned();
        thread.parent = Some(Box::new(parent));

        assert_eq!(thread.full_name(), "general / weekly");
    }

    #[test]
    fn unknown_kind_is_tolerated() {
        let wire: ChannelWire =
            serde_json::from_value(serde_json::json!({"id": "1", "type": 99})).unwrap();

        assert_eq!(wire.kind, ChannelKind::Unknown);
    }
}
