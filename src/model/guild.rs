use serde::Deserialize;

use crate::snowflake::Snowflake;
use crate::CDN_BASE;

/// A guild, or the direct-message sentinel.
#[derive(Clone, Debug, Deserialize)]
pub struct Guild {
    /// The guild's identifier.
    pub id: Snowflake,
    /// The guild's display name.
    pub name: String,
    /// The guild's icon hash, if one is set.
    #[serde(rename = "icon", default)]
    icon_hash: Option<String>,
}

impl Guild {
    /// The sentinel guild that stands in for direct-message context.
    #[must_use]
    pub fn direct_messages() -> Self {
        Self { id: Snowflake::new(0), name: "Direct Messages".to_owned(), icon_hash: None }
    }

    /// Returns whether this is the direct-message sentinel.
    #[must_use]
    pub const fn is_direct(&self) -> bool {
        self.id.value() == 0
    }

    /// Returns the guild's icon URL, falling back to the default icon.
    #[must_use]
    pub fn icon_url(&self) -> String {
        self.icon_hash.as_ref().map_or_else(
            || format!("{CDN_BASE}/embed/avatars/0.png"),
            |hash| format!("{CDN_BASE}/icons/{}/{hash}.png", self.id),
        )
    }
}
