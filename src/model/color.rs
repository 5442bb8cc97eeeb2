use std::fmt::Display;

use serde::{Deserialize, Deserializer, Serialize};

/// An RGB color as carried by roles and embeds.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(u8, u8, u8);

impl Color {
    /// Creates a new RGB color value.
    #[inline]
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self(r, g, b)
    }

    /// Returns the color's R component.
    #[inline]
    #[must_use]
    pub const fn r(self) -> u8 {
        self.0
    }

    /// Returns the color's G component.
    #[inline]
    #[must_use]
    pub const fn g(self) -> u8 {
        self.1
    }

    /// Returns the color's B component.
    #[inline]
    #[must_use]
    pub const fn b(self) -> u8 {
        self.2
    }

    /// Returns the color as a `#RRGGBB` hex string.
    #[must_use]
    pub fn hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

impl From<u32> for Color {
    #[allow(clippy::cast_possible_truncation)]
    fn from(value: u32) -> Self {
        Self::new(((value >> 16) & 0xFF) as u8, ((value >> 8) & 0xFF) as u8, (value & 0xFF) as u8)
    }
}

impl From<Color> for u32 {
    fn from(Color(r, g, b): Color) -> Self {
        Self::from(r) << 16 | Self::from(g) << 8 | Self::from(b)
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r(), self.g(), self.b())
    }
}

/// Deserializes a raw integer color where zero means "unset".
///
/// The upstream uses `0` as the null color rather than omitting the field, so
/// a raw zero is normalised to `None` here and never treated as black.
pub(crate) fn nullable_color<'de, D>(deserializer: D) -> Result<Option<Color>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<u32>::deserialize(deserializer)?;

    Ok(raw.filter(|raw| *raw != 0).map(Color::from))
}
