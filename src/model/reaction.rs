use chronicle_markdown::emoji;
use serde::Deserialize;

use crate::snowflake::Snowflake;
use crate::CDN_BASE;

/// A standard or guild-custom emoji.
#[derive(Clone, Debug, Deserialize)]
pub struct Emoji {
    /// The custom emoji identifier; `None` for standard emoji.
    #[serde(default)]
    pub id: Option<Snowflake>,
    /// The emoji's name: a shortcode-style name for custom emoji, the glyph
    /// itself for standard ones.
    #[serde(default)]
    pub name: Option<String>,
    /// Whether a custom emoji is animated.
    #[serde(default)]
    pub animated: bool,
}

impl Emoji {
    /// Creates a custom emoji value.
    #[must_use]
    pub fn custom(id: Snowflake, name: impl Into<String>, animated: bool) -> Self {
        Self { id: Some(id), name: Some(name.into()), animated }
    }

    /// Creates a standard emoji value from its glyph.
    #[must_use]
    pub fn standard(glyph: impl Into<String>) -> Self {
        Self { id: None, name: Some(glyph.into()), animated: false }
    }

    /// Returns the emoji's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("unknown")
    }

    /// Returns the emoji's shortcode-style name.
    ///
    /// Custom emoji already carry one; standard emoji reverse through the
    /// shortcode index and fall back to the glyph itself.
    #[must_use]
    pub fn code(&self) -> &str {
        if self.id.is_some() {
            return self.name();
        }

        emoji::SHORTCODES
            .iter()
            .find(|(_, glyph)| *glyph == self.name())
            .map_or_else(|| self.name(), |(code, _)| code)
    }

    /// Returns the URL of the emoji's rendered image.
    #[must_use]
    pub fn image_url(&self) -> String {
        self.id.map_or_else(
            || {
                format!(
                    "https://cdn.jsdelivr.net/gh/jdecked/twemoji@latest/assets/72x72/{}.png",
                    emoji::twemoji_id(self.name())
                )
            },
            |id| {
                let ext = if self.animated { "gif" } else { "png" };

                format!("{CDN_BASE}/emojis/{id}.{ext}")
            },
        )
    }
}

/// An aggregated reaction on a message.
#[derive(Clone, Debug, Deserialize)]
pub struct Reaction {
    /// The reacted emoji.
    pub emoji: Emoji,
    /// How many users reacted with it.
    #[serde(default)]
    pub count: u64,
}

impl Reaction {
    /// Returns the reaction endpoint form of the emoji: `name:id` for custom
    /// emoji, the percent-encoded glyph otherwise.
    #[must_use]
    pub fn emoji_endpoint_path(&self) -> String {
        self.emoji.id.map_or_else(
            || urlencoding::encode(self.emoji.name()).into_owned(),
            |id| format!("{}:{id}", self.emoji.name()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_emoji_reverses_shortcode() {
        let emoji = Emoji::standard("\u{1F914}");

        assert_eq!(emoji.code(), "thinking");
        assert!(emoji.image_url().contains("72x72/1f914.png"));
    }

    #[test]
    fn custom_emoji_uses_cdn() {
        let emoji = Emoji::custom(Snowflake::new(9), "pepe", true);

        assert_eq!(emoji.code(), "pepe");
        assert_eq!(emoji.image_url(), format!("{CDN_BASE}/emojis/9.gif"));
    }
}
