/// The authentication scheme a token belongs to.
///
/// The kind is discovered once per client by probing the self endpoint with
/// each scheme; it decides the authorization header shape and which half of
/// the rate-limit preference applies.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum TokenKind {
    /// A user account token, sent bare.
    User,
    /// A bot token, sent with the `Bot ` prefix.
    Bot,
}

impl TokenKind {
    /// Formats the authorization header value for the given secret.
    #[must_use]
    pub fn header_value(self, secret: &str) -> String {
        match self {
            Self::User => secret.to_owned(),
            Self::Bot => format!("Bot {secret}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bot_tokens_are_prefixed() {
        assert_eq!(TokenKind::User.header_value("abc"), "abc");
        assert_eq!(TokenKind::Bot.header_value("abc"), "Bot abc");
    }
}
