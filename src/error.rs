use crate::snowflake::Snowflake;

/// The crate's custom [`Result`] type with a default `T` type.
pub type Result<T = (), E = Error> = std::result::Result<T, E>;

/// A possible export failure.
///
/// Every error is either *fatal* — the whole job should stop — or
/// *channel-scoped* — the caller may skip the channel and continue with its
/// siblings. [`Error::is_fatal`] makes the distinction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The provided token was rejected for both user and bot authentication.
    #[error("the provided token is invalid")]
    InvalidToken,
    /// The token's application does not have the message content intent.
    #[error("the application is missing the message content intent; messages cannot be read")]
    MissingContentIntent,
    /// The requested channel kind cannot be exported directly.
    #[error("channel {0} is a forum and has no message feed of its own")]
    UnsupportedChannel(Snowflake),
    /// The channel holds no messages within the requested range.
    #[error("channel {0} contains no exportable messages")]
    ChannelEmpty(Snowflake),
    /// The export was cancelled by the caller.
    #[error("the export was cancelled")]
    Cancelled,
    /// The HTTP client itself could not be constructed.
    #[error("failed to construct the HTTP client")]
    Client(#[source] reqwest::Error),
    /// The upstream returned a non-success status that retrying cannot fix.
    #[error("'{route}' returned status {status}")]
    Status {
        /// The returned status code.
        status: u16,
        /// The requested route.
        route: String,
    },
    /// The transport failed for every allowed attempt.
    #[error("request to '{route}' failed after {attempts} attempts")]
    Transport {
        /// The requested route.
        route: String,
        /// How many attempts were made.
        attempts: u8,
        /// The final transport error.
        #[source]
        source: reqwest::Error,
    },
    /// A range bound was neither a decimal identifier nor a date.
    #[error("'{0}' is not a decimal identifier or ISO-8601 date")]
    InvalidCursor(String),
    /// A wire payload could not be interpreted.
    #[error("malformed {entity} payload")]
    Malformed {
        /// The entity that failed to parse.
        entity: &'static str,
        /// The decoding error.
        #[source]
        source: serde_json::Error,
    },
    /// A message filter expression could not be parsed.
    #[error(transparent)]
    Filter(#[from] crate::filter::FilterError),
    /// A partition limit string could not be parsed.
    #[error(transparent)]
    Limit(#[from] crate::export::LimitError),
    /// An error was raised while writing a specific message.
    #[error("failed to write message {message} (channel {channel}, guild {guild})")]
    Write {
        /// The guild being exported.
        guild: Snowflake,
        /// The channel being exported.
        channel: Snowflake,
        /// The message that was being written.
        message: Snowflake,
        /// The underlying failure.
        #[source]
        source: Box<Error>,
    },
    /// A filesystem operation failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A value could not be encoded for output.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns whether this error should abort the whole job rather than just
    /// the current channel.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::ChannelEmpty(_) => false,
            Self::Write { source, .. } => source.is_fatal(),
            _ => true,
        }
    }

    /// Wraps an error raised while writing the given message.
    #[must_use]
    pub fn while_writing(self, guild: Snowflake, channel: Snowflake, message: Snowflake) -> Self {
        Self::Write { guild, channel, message, source: Box::new(self) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_empty_is_not_fatal() {
        assert!(!Error::ChannelEmpty(Snowflake::new(1)).is_fatal());
        assert!(Error::InvalidToken.is_fatal());
    }

    #[test]
    fn write_wrapper_preserves_fatality() {
        let inner = Error::ChannelEmpty(Snowflake::new(1));
        let wrapped = inner.while_writing(Snowflake::new(1), Snowflake::new(2), Snowflake::new(3));

        assert!(!wrapped.is_fatal());

        let inner = Error::InvalidToken;
        let wrapped = inner.while_writing(Snowflake::new(1), Snowflake::new(2), Snowflake::new(3));

        assert!(wrapped.is_fatal());
    }
}
