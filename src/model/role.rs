use serde::Deserialize;

use super::color::{nullable_color, Color};
use crate::snowflake::Snowflake;

/// A guild role.
#[derive(Clone, Debug, Deserialize)]
pub struct Role {
    /// The role's identifier.
    pub id: Snowflake,
    /// The role's display name.
    pub name: String,
    /// The role's color; `None` when the raw value is zero.
    #[serde(default, deserialize_with = "nullable_color")]
    pub color: Option<Color>,
    /// The role's sorting position; higher positions take precedence.
    #[serde(default)]
    pub position: i64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn zero_color_is_unset() {
        let role: Role =
            serde_json::from_str(r#"{"id": "1", "name": "everyone", "color": 0, "position": 0}"#)
                .unwrap();

        assert_eq!(role.color, None);
    }

    #[test]
    fn nonzero_color_is_decoded() {
        let role: Role =
            serde_json::from_str(r#"{"id": "1", "name": "mod", "color": 3447003, "position": 4}"#)
                .unwrap();

        assert_eq!(role.color, Some(Color::new(0x34, 0x98, 0xDB)));
    }
}
