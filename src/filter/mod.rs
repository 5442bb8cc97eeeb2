//! The message filter expression engine.
//!
//! An expression like `from:john has:image -lol` tokenises, parses into a
//! combinator tree, and evaluates as a predicate over messages. The null
//! filter matches everything and is the identity of `and` (and the absorbing
//! element of `or`).

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Message, User};

pub(crate) use self::lexer::tokenize;
mod lexer;

mod parser;

/// Matches anything that looks like a plain link in message text.
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| compiled(r"https?://\S+"));
/// Matches guild invite links in message text.
static INVITE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| compiled(r"(?:discord\.gg|discord(?:app)?\.com/invite)/\w+"));

/// Compiles a pattern known to be valid at build time.
#[allow(clippy::unwrap_used)]
fn compiled(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

/// A failure to understand a filter expression.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    /// A quoted value had no closing quote.
    #[error("unterminated quoted value")]
    UnterminatedQuote,
    /// Parentheses did not pair up.
    #[error("unbalanced parentheses")]
    UnbalancedParens,
    /// An operator had nothing to apply to.
    #[error("an operator is missing its operand")]
    DanglingOperator,
    /// Tokens remained after a complete expression.
    #[error("unexpected trailing input")]
    DanglingInput,
    /// An `op:value` pair had an empty value.
    #[error("operator '{0}' is missing its value")]
    EmptyValue(String),
    /// A `has:` value outside the known content kinds.
    #[error("'{0}' is not a recognised content kind")]
    UnknownContentKind(String),
}

/// The content categories `has:` can test for.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum ContentKind {
    /// A link in the content or any embed url.
    Link,
    /// Any embed at all.
    Embed,
    /// Any attachment at all.
    File,
    /// A video attachment or embed video slot.
    Video,
    /// An image attachment or embed image/thumbnail.
    Image,
    /// An audio attachment.
    Sound,
    /// Any sticker.
    Sticker,
    /// A guild invite link in the content.
    Invite,
    /// Any mentioned user.
    Mention,
    /// The pinned flag.
    Pin,
}

impl ContentKind {
    /// Parses a `has:` value, accepting pluralised aliases.
    ///
    /// # Errors
    ///
    /// This function will return an error if the value names no known kind.
    pub fn parse(value: &str) -> Result<Self, FilterError> {
        let lowered = value.to_ascii_lowercase();
        let singular = lowered.strip_suffix('s').unwrap_or(&lowered);

        Ok(match singular {
            "link" => Self::Link,
            "embed" => Self::Embed,
            "file" | "attachment" => Self::File,
            "video" => Self::Video,
            "image" => Self::Image,
            "sound" | "audio" => Self::Sound,
            "sticker" => Self::Sticker,
            "invite" => Self::Invite,
            "mention" => Self::Mention,
            "pin" | "pinned" => Self::Pin,
            _ => return Err(FilterError::UnknownContentKind(value.to_owned())),
        })
    }

    fn matches(self, message: &Message) -> bool {
        match self {
            Self::Link => {
                URL_PATTERN.is_match(&message.content)
                    || message.embeds.iter().any(|embed| embed.url.is_some())
            }
            Self::Embed => !message.embeds.is_empty(),
            Self::File => !message.attachments.is_empty(),
            Self::Video => {
                message.attachments.iter().any(crate::model::Attachment::is_video)
                    || message.embeds.iter().any(|embed| embed.video.is_some())
            }
            Self::Image => {
                message.attachments.iter().any(crate::model::Attachment::is_image)
                    || message
                        .embeds
                        .iter()
                        .any(|embed| embed.image.is_some() || embed.thumbnail.is_some())
            }
            Self::Sound => message.attachments.iter().any(crate::model::Attachment::is_audio),
            Self::Sticker => !message.stickers.is_empty(),
            Self::Invite => INVITE_PATTERN.is_match(&message.content),
            Self::Mention => !message.mentioned_users.is_empty(),
            Self::Pin => message.is_pinned,
        }
    }
}

/// A composable predicate over messages.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum MessageFilter {
    /// The null filter; matches every message.
    #[default]
    Null,
    /// Case-insensitive content search.
    Contains(String),
    /// Matches the author by id, handle, or fully-qualified name.
    From(String),
    /// Matches any mentioned user the way [`MessageFilter::From`] matches the
    /// author.
    Mentions(String),
    /// Matches a content category.
    Has(ContentKind),
    /// Matches any reaction by emoji code or name.
    Reaction(String),
    /// Inverts the inner filter.
    Negate(Box<MessageFilter>),
    /// Requires both sides.
    Both(Box<MessageFilter>, Box<MessageFilter>),
    /// Requires either side.
    Either(Box<MessageFilter>, Box<MessageFilter>),
}

impl MessageFilter {
    /// Parses a filter expression; blank input yields the null filter.
    ///
    /// # Errors
    ///
    /// This function will return an error if the expression is malformed.
    pub fn parse(text: &str) -> Result<Self, FilterError> {
        if text.trim().is_empty() {
            return Ok(Self::Null);
        }

        parser::Parser::new(tokenize(text)?).parse()
    }

    /// Returns whether the message passes this filter.
    #[must_use]
    pub fn matches(&self, message: &Message) -> bool {
        match self {
            Self::Null => true,
            Self::Contains(text) => contains_ci(&message.content, text),
            Self::From(value) => user_matches(&message.author, value),
            Self::Mentions(value) => {
                message.mentioned_users.iter().any(|user| user_matches(user, value))
            }
            Self::Has(kind) => kind.matches(message),
            Self::Reaction(value) => message.reactions.iter().any(|reaction| {
                reaction.emoji.code().eq_ignore_ascii_case(value)
                    || reaction.emoji.name().eq_ignore_ascii_case(value)
            }),
            Self::Negate(inner) => !inner.matches(message),
            Self::Both(left, right) => left.matches(message) && right.matches(message),
            Self::Either(left, right) => left.matches(message) || right.matches(message),
        }
    }

    /// Combines two filters conjunctively; the null filter is the identity.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::Null, filter) | (filter, Self::Null) => filter,
            (left, right) => Self::Both(Box::new(left), Box::new(right)),
        }
    }

    /// Combines two filters disjunctively; the null filter absorbs.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match (self, other) {
            (Self::Null, _) | (_, Self::Null) => Self::Null,
            (left, right) => Self::Either(Box::new(left), Box::new(right)),
        }
    }

    /// Inverts the filter; double negation unwraps.
    #[must_use]
    pub fn negate(self) -> Self {
        match self {
            Self::Negate(inner) => *inner,
            filter => Self::Negate(Box::new(filter)),
        }
    }
}

/// Case-insensitive substring test.
fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Matches a user by identifier, handle, or fully-qualified name.
fn user_matches(user: &User, value: &str) -> bool {
    user.id.to_string() == value
        || user.name.eq_ignore_ascii_case(value)
        || user.full_name().eq_ignore_ascii_case(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn message(value: serde_json::Value) -> Message {
        serde_json::from_value(value).unwrap()
    }

    fn from_john(attachments: bool) -> Message {
        let attachments = if attachments {
            serde_json::json!([{"id": "7", "url": "https://cdn.example/a.bin", "filename": "a.bin", "size": 1}])
        } else {
            serde_json::json!([])
        };

        message(serde_json::json!({
            "id": "3",
            "type": 0,
            "author": {"id": "1", "username": "John"},
            "timestamp": "2021-05-01T12:00:00+00:00",
            "content": "check THIS out: https://discord.gg/abc",
            "attachments": attachments,
        }))
    }

    #[test]
    fn from_and_has_scenario() {
        let filter = MessageFilter::parse("from:john has:attachment").unwrap();

        assert!(filter.matches(&from_john(true)));
        assert!(!filter.matches(&from_john(false)));
    }

    #[test]
    fn contains_is_case_insensitive() {
        let filter = MessageFilter::parse("this").unwrap();

        assert!(filter.matches(&from_john(false)));
    }

    #[test]
    fn invite_and_link_kinds_read_content() {
        assert!(MessageFilter::Has(ContentKind::Invite).matches(&from_john(false)));
        assert!(MessageFilter::Has(ContentKind::Link).matches(&from_john(false)));
        assert!(!MessageFilter::Has(ContentKind::Image).matches(&from_john(false)));
    }

    #[test]
    fn null_is_identity_of_and_and_absorbs_or() {
        let filter = MessageFilter::From("john".to_owned());

        assert_eq!(filter.clone().and(MessageFilter::Null), filter);
        assert_eq!(MessageFilter::Null.and(filter.clone()), filter);
        assert_eq!(filter.clone().or(MessageFilter::Null), MessageFilter::Null);
        assert_eq!(MessageFilter::Null.or(filter.clone()), MessageFilter::Null);
        assert_eq!(filter.clone().negate().negate(), filter);
    }

    #[test]
    fn blank_expression_is_null() {
        assert_eq!(MessageFilter::parse("   ").unwrap(), MessageFilter::Null);
    }

    #[test]
    fn reaction_matches_code_or_name() {
        let mut with_reaction = from_john(false);

        with_reaction.reactions = vec![serde_json::from_value(serde_json::json!({
            "emoji": {"id": null, "name": "\u{1F914}"},
            "count": 2,
        }))
        .unwrap()];

        assert!(MessageFilter::Reaction("thinking".to_owned()).matches(&with_reaction));
        assert!(MessageFilter::Reaction("\u{1F914}".to_owned()).matches(&with_reaction));
        assert!(!MessageFilter::Reaction("joy".to_owned()).matches(&with_reaction));
    }
}
