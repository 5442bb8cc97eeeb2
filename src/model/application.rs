use bitflags::bitflags;
use serde::Deserialize;

use crate::snowflake::Snowflake;

bitflags! {
    /// The subset of application flags the exporter cares about.
    #[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
    pub struct ApplicationFlags: u64 {
        /// The application may read message content everywhere.
        const GATEWAY_MESSAGE_CONTENT = 1 << 18;
        /// The application may read message content in a limited set of guilds.
        const GATEWAY_MESSAGE_CONTENT_LIMITED = 1 << 19;
    }
}

/// The application a bot token belongs to.
#[derive(Clone, Debug, Deserialize)]
pub struct Application {
    /// The application's identifier.
    pub id: Snowflake,
    /// The application's display name.
    pub name: String,
    /// The application's raw flag mask.
    #[serde(rename = "flags", default)]
    raw_flags: u64,
}

impl Application {
    /// Returns the application's known flags.
    #[must_use]
    pub const fn flags(&self) -> ApplicationFlags {
        ApplicationFlags::from_bits_truncate(self.raw_flags)
    }

    /// Returns whether the application can read message content.
    ///
    /// Without this intent every fetched message arrives with empty content,
    /// which the client detects and surfaces as a fatal error.
    #[must_use]
    pub const fn has_message_content_intent(&self) -> bool {
        self.flags().intersects(
            ApplicationFlags::GATEWAY_MESSAGE_CONTENT
                .union(ApplicationFlags::GATEWAY_MESSAGE_CONTENT_LIMITED),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn intent_flag_detection() {
        let with: Application =
            serde_json::from_str(r#"{"id": "1", "name": "app", "flags": 262144}"#).unwrap();
        let without: Application =
            serde_json::from_str(r#"{"id": "1", "name": "app", "flags": 0}"#).unwrap();

        assert!(with.has_message_content_intent());
        assert!(!without.has_message_content_intent());
    }
}
