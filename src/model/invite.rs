use serde::Deserialize;

/// A resolved guild invite.
#[derive(Clone, Debug, Deserialize)]
pub struct Invite {
    /// The invite's code, as used in `discord.gg/<code>` links.
    pub code: String,
    /// The guild the invite points into, when visible.
    #[serde(default)]
    pub guild: Option<InviteGuild>,
    /// The channel the invite points at, when visible.
    #[serde(default)]
    pub channel: Option<InviteChannel>,
}

/// The guild summary carried by an invite.
#[derive(Clone, Debug, Deserialize)]
pub struct InviteGuild {
    /// The guild's display name.
    pub name: String,
}

/// The channel summary carried by an invite.
#[derive(Clone, Debug, Deserialize)]
pub struct InviteChannel {
    /// The channel's display name.
    pub name: String,
}
