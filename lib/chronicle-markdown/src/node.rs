use std::fmt::Write;

/// A style applied by a [`Node::Formatting`] container.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum FormattingKind {
    /// Bold text, delimited by `**`.
    Bold,
    /// Italic text, delimited by `*` or `_`.
    Italic,
    /// Underlined text, delimited by `__`.
    Underline,
    /// Struck-through text, delimited by `~~`.
    Strikethrough,
    /// Spoilered text, delimited by `||`.
    Spoiler,
    /// Quoted text, prefixed by `> ` or `>>> `.
    Quote,
}

/// The target of a [`Node::Mention`].
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum MentionKind {
    /// An `@everyone` mention.
    Everyone,
    /// An `@here` mention.
    Here,
    /// A user mention, `<@id>` or `<@!id>`.
    User(u64),
    /// A channel mention, `<#id>`.
    Channel(u64),
    /// A role mention, `<@&id>`.
    Role(u64),
}

/// A single fragment of parsed markdown.
///
/// A parsed segment is an ordered list of nodes; container variants hold their
/// children re-parsed with the same matcher set.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// Literal text with no special meaning.
    Text(String),
    /// A styled container.
    Formatting(FormattingKind, Vec<Node>),
    /// A heading of level 1 through 3.
    Heading(u8, Vec<Node>),
    /// An unordered list of items.
    List(Vec<Vec<Node>>),
    /// An inline code span.
    InlineCode(String),
    /// A fenced code block with an optional language hint.
    MultiLineCode(Option<String>, String),
    /// A link with its title children.
    Link {
        /// The link's destination.
        url: String,
        /// The rendered title; for bare links this is the url itself.
        children: Vec<Node>,
    },
    /// A standard or custom emoji.
    Emoji {
        /// The custom emoji identifier; `None` for standard emoji.
        id: Option<u64>,
        /// The emoji's name; for standard emoji this is the glyph itself.
        name: String,
        /// Whether a custom emoji is animated.
        animated: bool,
    },
    /// A user, channel, role, or keyword mention.
    Mention(MentionKind),
    /// An embedded timestamp, `<t:seconds[:flag]>`.
    ///
    /// An unparseable instant or an unknown flag yields `instant: None`, the
    /// invalid-timestamp marker. A `None` format with a present instant means
    /// the relative (`r`/`R`) display.
    Timestamp {
        /// Unix seconds, or `None` when the token could not be interpreted.
        instant: Option<i64>,
        /// The single-letter format code, or `None` for relative display.
        format: Option<char>,
    },
}

impl Node {
    /// Creates a text node from any string-like value.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Creates a standard-emoji node from its glyph.
    pub fn standard_emoji(glyph: impl Into<String>) -> Self {
        Self::Emoji { id: None, name: glyph.into(), animated: false }
    }

    /// Returns whether this node is an emoji.
    #[must_use]
    pub const fn is_emoji(&self) -> bool {
        matches!(self, Self::Emoji { .. })
    }

    /// Returns whether this node is text consisting solely of whitespace.
    #[must_use]
    pub fn is_blank_text(&self) -> bool {
        matches!(self, Self::Text(text) if text.trim().is_empty())
    }
}

/// Reconstructs the plain-text reading of a node list.
///
/// Text nodes emit verbatim, so inputs without special constructs round-trip
/// exactly. Other nodes degrade to their most readable fragment: emoji emit
/// their name, links their url, code spans their contents.
#[must_use]
pub fn to_plain_text(nodes: &[Node]) -> String {
    let mut buffer = String::new();

    write_plain_text(&mut buffer, nodes);

    buffer
}

fn write_plain_text(buffer: &mut String, nodes: &[Node]) {
    for node in nodes {
        match node {
            Node::Text(text) => buffer.push_str(text),
            Node::Formatting(_, children) | Node::Heading(_, children) => {
                write_plain_text(buffer, children);
            }
            Node::List(items) => {
                for item in items {
                    write_plain_text(buffer, item);
                    buffer.push('\n');
                }
            }
            Node::InlineCode(code) | Node::MultiLineCode(_, code) => buffer.push_str(code),
            Node::Link { children, .. } => write_plain_text(buffer, children),
            Node::Emoji { id: None, name, .. } => buffer.push_str(name),
            Node::Emoji { id: Some(_), name, .. } => {
                let _ = write!(buffer, ":{name}:");
            }
            Node::Mention(kind) => match kind {
                MentionKind::Everyone => buffer.push_str("@everyone"),
                MentionKind::Here => buffer.push_str("@here"),
                MentionKind::User(id) => {
                    let _ = write!(buffer, "<@{id}>");
                }
                MentionKind::Channel(id) => {
                    let _ = write!(buffer, "<#{id}>");
                }
                MentionKind::Role(id) => {
                    let _ = write!(buffer, "<@&{id}>");
                }
            },
            Node::Timestamp { instant: Some(unix), format } => {
                let _ = match format {
                    Some(flag) => write!(buffer, "<t:{unix}:{flag}>"),
                    None => write!(buffer, "<t:{unix}:R>"),
                };
            }
            Node::Timestamp { instant: None, .. } => buffer.push_str("Invalid date"),
        }
    }
}
