use serde::{Deserialize, Deserializer};

use crate::snowflake::Snowflake;
use crate::CDN_BASE;

/// A user account.
#[derive(Clone, Debug, Deserialize)]
pub struct User {
    /// The user's identifier.
    pub id: Snowflake,
    /// The user's unique handle.
    #[serde(rename = "username")]
    pub name: String,
    /// The user's chosen display name, when set.
    #[serde(rename = "global_name", default)]
    global_name: Option<String>,
    /// Whether the account is a bot.
    #[serde(rename = "bot", default)]
    pub is_bot: bool,
    /// The legacy four-digit discriminator.
    ///
    /// Accounts migrated to the unified-username scheme report a raw zero,
    /// which is normalised to `None` with no further heuristics.
    #[serde(default, deserialize_with = "legacy_discriminator")]
    pub discriminator: Option<u16>,
    /// The user's avatar hash, if one is set.
    #[serde(rename = "avatar", default)]
    avatar_hash: Option<String>,
}

impl User {
    /// Returns the name this user renders under outside any guild.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.name)
    }

    /// Returns the user's fully-qualified name.
    ///
    /// Legacy accounts render as `name#0000`; unified accounts as the bare
    /// handle.
    #[must_use]
    pub fn full_name(&self) -> String {
        self.discriminator
            .map_or_else(|| self.name.clone(), |tag| format!("{}#{tag:04}", self.name))
    }

    /// Returns the user's avatar URL, falling back to a default avatar.
    ///
    /// The default index derives from the discriminator for legacy accounts
    /// and from the identifier's timestamp bits for unified accounts.
    #[must_use]
    pub fn avatar_url(&self) -> String {
        if let Some(hash) = &self.avatar_hash {
            let ext = if hash.starts_with("a_") { "gif" } else { "png" };

            return format!("{CDN_BASE}/avatars/{}/{hash}.{ext}?size=512", self.id);
        }

        let index = self
            .discriminator
            .map_or_else(|| (self.id.value() >> 22) % 6, |tag| u64::from(tag % 5));

        format!("{CDN_BASE}/embed/avatars/{index}.png")
    }
}

/// A user's guild-scoped profile.
///
/// Produced either from the member endpoint or, when the user has since left
/// the guild, synthesised from the bare user via [`Member::of_user`].
#[derive(Clone, Debug)]
pub struct Member {
    /// The underlying user.
    pub user: User,
    /// The user's per-guild nickname, when set.
    pub nick: Option<String>,
    /// The user's role identifiers, in wire order.
    pub role_ids: Vec<Snowflake>,
    /// The user's per-guild avatar hash, when set.
    avatar_hash: Option<String>,
    /// The guild this profile belongs to.
    pub guild_id: Snowflake,
}

/// The wire shape of a guild member payload.
#[derive(Debug, Deserialize)]
pub(crate) struct MemberWire {
    user: User,
    #[serde(default)]
    nick: Option<String>,
    #[serde(default)]
    roles: Vec<Snowflake>,
    #[serde(default)]
    avatar: Option<String>,
}

impl Member {
    /// Builds a member from its wire payload and owning guild.
    pub(crate) fn from_wire(wire: MemberWire, guild_id: Snowflake) -> Self {
        Self {
            user: wire.user,
            nick: wire.nick,
            role_ids: wire.roles,
            avatar_hash: wire.avatar,
            guild_id,
        }
    }

    /// Synthesises a guild profile for a user who is no longer a member.
    #[must_use]
    pub const fn of_user(user: User, guild_id: Snowflake) -> Self {
        Self { user, nick: None, role_ids: Vec::new(), avatar_hash: None, guild_id }
    }

    /// Returns the name this member renders under inside the guild.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.nick.as_deref().unwrap_or_else(|| self.user.display_name())
    }

    /// Returns the member's avatar URL, preferring the per-guild override.
    #[must_use]
    pub fn avatar_url(&self) -> String {
        self.avatar_hash.as_ref().map_or_else(
            || self.user.avatar_url(),
            |hash| {
                let ext = if hash.starts_with("a_") { "gif" } else { "png" };

                format!(
                    "{CDN_BASE}/guilds/{}/users/{}/avatars/{hash}.{ext}?size=512",
                    self.guild_id, self.user.id
                )
            },
        )
    }
}

/// Deserializes the legacy discriminator, normalising zero to `None`.
fn legacy_discriminator<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u16),
    }

    let raw = match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(text)) => text.parse::<u16>().ok(),
        Some(Raw::Number(number)) => Some(number),
        None => None,
    };

    Ok(raw.filter(|tag| *tag != 0))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn legacy_user() -> User {
        serde_json::from_str(
            r#"{"id": "175928847299117063", "username": "john", "discriminator": "0042"}"#,
        )
        .unwrap()
    }

    fn unified_user() -> User {
        serde_json::from_str(
            r#"{"id": "175928847299117063", "username": "john", "discriminator": "0", "global_name": "Johnny"}"#,
        )
        .unwrap()
    }

    #[test]
    fn discriminator_zero_normalises_to_none() {
        assert_eq!(legacy_user().discriminator, Some(42));
        assert_eq!(unified_user().discriminator, None);
    }

    #[test]
    fn full_name_depends_on_scheme() {
        assert_eq!(legacy_user().full_name(), "john#0042");
        assert_eq!(unified_user().full_name(), "john");
    }

    #[test]
    fn display_name_prefers_global_name() {
        assert_eq!(legacy_user().display_name(), "john");
        assert_eq!(unified_user().display_name(), "Johnny");
    }

    #[test]
    fn default_avatar_index_is_stable() {
        let legacy = legacy_user().avatar_url();
        let unified = unified_user().avatar_url();

        assert_eq!(legacy, format!("{CDN_BASE}/embed/avatars/2.png"));
        assert!(unified.starts_with(&format!("{CDN_BASE}/embed/avatars/")));
    }

    #[test]
    fn member_nick_takes_precedence() {
        let member = Member {
            user: unified_user(),
            nick: Some("Boss".to_owned()),
            role_ids: Vec::new(),
            avatar_hash: None,
            guild_id: Snowflake::new(1),
        };

        assert_eq!(member.display_name(), "Boss");

        let fallback = Member::of_user(unified_user(), Snowflake::new(1));

        assert_eq!(fallback.display_name(), "Johnny");
    }
}
