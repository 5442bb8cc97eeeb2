use serde::Deserialize;
use serde_repr::Deserialize_repr;

use crate::snowflake::Snowflake;

/// The encoding of a sticker's source media.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Deserialize_repr)]
pub enum StickerFormat {
    /// A static PNG image.
    Png = 1,
    /// An animated PNG image.
    Apng = 2,
    /// A Lottie vector animation.
    Lottie = 3,
    /// An animated GIF image.
    Gif = 4,
    /// A format added after this crate was written.
    #[serde(other)]
    Unknown = 0,
}

/// A sticker sent with a message.
#[derive(Clone, Debug, Deserialize)]
pub struct Sticker {
    /// The sticker's identifier.
    pub id: Snowflake,
    /// The sticker's display name.
    pub name: String,
    /// The sticker's media format.
    #[serde(rename = "format_type")]
    pub format: StickerFormat,
}

impl Sticker {
    /// Returns the URL of the sticker's source media.
    #[must_use]
    pub fn source_url(&self) -> String {
        match self.format {
            StickerFormat::Lottie => format!("{}/stickers/{}.json", crate::CDN_BASE, self.id),
            StickerFormat::Gif => format!("{}/stickers/{}.gif", crate::CDN_BASE, self.id),
            _ => format!("https://media.discordapp.net/stickers/{}.png", self.id),
        }
    }
}
