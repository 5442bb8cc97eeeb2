use std::sync::LazyLock;

use regex::Captures;

use crate::emoji::{self, STANDARD_EMOJI_PATTERN};
use crate::matcher::Matcher;
use crate::node::{FormattingKind, MentionKind, Node};

/// Segments nested deeper than this degrade to plain text.
const MAX_DEPTH: u8 = 32;

/// Selects the matcher set used for a parse pass.
///
/// The two single-matcher profiles exist for the composite cases: `*…**X**…*`
/// re-parses its children against bold alone, `_…__X__…_` against underline
/// alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Profile {
    Full,
    Minimal,
    BoldOnly,
    UnderlineOnly,
}

impl Profile {
    fn matchers(self) -> &'static [Matcher] {
        match self {
            Self::Full => &FULL,
            Self::Minimal => &MINIMAL,
            Self::BoldOnly => &BOLD_ONLY,
            Self::UnderlineOnly => &UNDERLINE_ONLY,
        }
    }
}

/// Parses a segment with the full matcher set.
///
/// The output covers the input exactly once: matched constructs become their
/// node, the gaps between them become [`Node::Text`].
#[must_use]
pub fn parse(text: &str) -> Vec<Node> {
    parse_segment(text, 0, text.len(), Profile::Full, 0)
}

/// Parses a segment with the minimal matcher set.
///
/// Only mentions, custom emoji, and timestamps are recognised; everything
/// else stays literal text. Formats that strip styling use this profile so
/// rendered semantics survive while markup does not.
#[must_use]
pub fn parse_minimal(text: &str) -> Vec<Node> {
    parse_segment(text, 0, text.len(), Profile::Minimal, 0)
}

/// Runs the aggregate matcher over `source[from..end]`.
///
/// Each round every matcher reports its earliest occurrence in the remaining
/// window; the smallest start index wins and ties break toward the
/// earliest-registered matcher.
fn parse_segment(source: &str, from: usize, end: usize, profile: Profile, depth: u8) -> Vec<Node> {
    if depth >= MAX_DEPTH {
        return vec![Node::text(&source[from..end])];
    }

    let matchers = profile.matchers();
    let mut nodes = Vec::new();
    let mut position = from;

    while position < end {
        let mut best: Option<(usize, usize, Node)> = None;

        for matcher in matchers {
            let Some(found) = matcher.try_match(source, position, end, depth) else {
                continue;
            };

            if best.as_ref().map_or(true, |(start, ..)| found.0 < *start) {
                let exhausted = found.0 == position;

                best = Some(found);

                // Nothing can start earlier than the window itself.
                if exhausted {
                    break;
                }
            }
        }

        let Some((start, consumed_until, node)) = best else {
            nodes.push(Node::text(&source[position..end]));
            break;
        };

        if start > position {
            nodes.push(Node::text(&source[position..start]));
        }

        nodes.push(node);
        position = consumed_until;
    }

    nodes
}

/// Re-parses a capture group as the children of a container node.
fn children(source: &str, captures: &Captures<'_>, index: usize, profile: Profile, depth: u8) -> Vec<Node> {
    captures.get(index).map_or_else(Vec::new, |group| {
        parse_segment(source, group.start(), group.end(), profile, depth + 1)
    })
}

/// Returns the absolute end of the whole match.
fn match_end(captures: &Captures<'_>) -> Option<usize> {
    captures.get(0).map(|m| m.end())
}

static FULL: LazyLock<Vec<Matcher>> = LazyLock::new(|| {
    let mut matchers = vec![
        // Escapes. The kaomoji comes first so its underscores survive intact.
        Matcher::exact("¯\\_(ツ)_/¯", |s: &str| Node::text(s)),
        Matcher::pattern("[\u{2122}\u{00A9}\u{00AE}]", |_, caps, _| {
            Some((match_end(caps)?, Node::text(&caps[0])))
        }),
        Matcher::pattern(r"\\([^A-Za-z0-9\s])", |_, caps, _| {
            Some((match_end(caps)?, Node::text(&caps[1])))
        }),
        // Formatting composites, then basic formatting.
        Matcher::pattern(r"(?s)\*(\*\*.+?\*\*)\*([^*]|$)", |source, caps, depth| {
            let inner = children(source, caps, 1, Profile::BoldOnly, depth);

            Some((caps.get(2)?.start(), Node::Formatting(FormattingKind::Italic, inner)))
        }),
        Matcher::pattern(r"(?s)_(__.+?__)_([^_]|$)", |source, caps, depth| {
            let inner = children(source, caps, 1, Profile::UnderlineOnly, depth);

            Some((caps.get(2)?.start(), Node::Formatting(FormattingKind::Italic, inner)))
        }),
        bold_matcher(),
        underline_matcher(),
        Matcher::pattern(r"(?s)\*(.+?)\*([^*]|$)", |source, caps, depth| {
            let inner = children(source, caps, 1, Profile::Full, depth);

            Some((caps.get(2)?.start(), Node::Formatting(FormattingKind::Italic, inner)))
        }),
        // The closing delimiter must border a non-word character; the matched
        // border itself is left unconsumed.
        Matcher::pattern(r"(?s)_(.+?)_([^0-9A-Za-z_]|$)", |source, caps, depth| {
            let inner = children(source, caps, 1, Profile::Full, depth);

            Some((caps.get(2)?.start(), Node::Formatting(FormattingKind::Italic, inner)))
        }),
        Matcher::pattern(r"(?s)~~(.+?)~~([^~]|$)", |source, caps, depth| {
            let inner = children(source, caps, 1, Profile::Full, depth);

            Some((caps.get(2)?.start(), Node::Formatting(FormattingKind::Strikethrough, inner)))
        }),
        Matcher::pattern(r"(?s)\|\|(.+?)\|\|([^|]|$)", |source, caps, depth| {
            let inner = children(source, caps, 1, Profile::Full, depth);

            Some((caps.get(2)?.start(), Node::Formatting(FormattingKind::Spoiler, inner)))
        }),
        // Quotes: whole-rest before repeated before single.
        Matcher::pattern(r"(?ms)^>>>\s(.+)", |source, caps, depth| {
            let inner = children(source, caps, 1, Profile::Full, depth);

            Some((match_end(caps)?, Node::Formatting(FormattingKind::Quote, inner)))
        }),
        Matcher::pattern(r"(?m)(?:^>\s.*\n?){2,}", |_, caps, depth| {
            let block = caps.get(0)?;
            let mut inner = String::new();

            for line in block.as_str().split_inclusive('\n') {
                let stripped = line.strip_prefix('>').unwrap_or(line);

                inner.push_str(stripped.strip_prefix(' ').unwrap_or(stripped));
            }

            let nodes = parse_segment(&inner, 0, inner.len(), Profile::Full, depth + 1);

            Some((block.end(), Node::Formatting(FormattingKind::Quote, nodes)))
        }),
        Matcher::pattern(r"(?m)^>\s(.+\n?)", |source, caps, depth| {
            let inner = children(source, caps, 1, Profile::Full, depth);

            Some((match_end(caps)?, Node::Formatting(FormattingKind::Quote, inner)))
        }),
        // Headings and lists.
        Matcher::pattern(r"(?m)^(#{1,3})\s(.+\n?)", |source, caps, depth| {
            let level = u8::try_from(caps[1].len()).ok()?;
            let body = caps.get(2)?;
            let trimmed = body.as_str().trim_end_matches('\n');
            let inner =
                parse_segment(source, body.start(), body.start() + trimmed.len(), Profile::Full, depth + 1);

            Some((body.end(), Node::Heading(level, inner)))
        }),
        Matcher::pattern(r"(?m)^(?:[ \t]*[-*]\s.*\n?)+", |source, caps, depth| {
            let block = caps.get(0)?;
            let mut items = Vec::new();
            let mut offset = block.start();

            for line in block.as_str().split_inclusive('\n') {
                let body = line
                    .trim_start_matches([' ', '\t'])
                    .trim_start_matches(['-', '*'])
                    .trim_start_matches(' ');
                let start = offset + (line.len() - body.len());
                let length = body.trim_end_matches('\n').len();

                items.push(parse_segment(source, start, start + length, Profile::Full, depth + 1));
                offset += line.len();
            }

            Some((block.end(), Node::List(items)))
        }),
        // Code blocks: fenced, double-backtick, single-backtick.
        Matcher::pattern(r"(?s)```(?:([A-Za-z0-9+._-]*)\n)?(.*?)```", |_, caps, _| {
            let language = caps.get(1).map(|m| m.as_str()).filter(|s| !s.is_empty());

            Some((
                match_end(caps)?,
                Node::MultiLineCode(language.map(str::to_owned), caps[2].to_owned()),
            ))
        }),
        Matcher::pattern(r"(?s)``(.+?)``", |_, caps, _| {
            Some((match_end(caps)?, Node::InlineCode(caps[1].to_owned())))
        }),
        Matcher::pattern(r"`([^`]+)`", |_, caps, _| {
            Some((match_end(caps)?, Node::InlineCode(caps[1].to_owned())))
        }),
    ];

    matchers.extend(mention_matchers());
    matchers.extend([
        // Links: masked, then bare, then angle-bracketed.
        Matcher::pattern(r"(?s)\[(.+?)\]\((.+?)\)", |source, caps, depth| {
            let inner = children(source, caps, 1, Profile::Full, depth);

            Some((match_end(caps)?, Node::Link { url: caps[2].to_owned(), children: inner }))
        }),
        Matcher::pattern(r#"(https?://\S*[^.,:;"'\s])"#, |_, caps, _| {
            let url = caps[1].to_owned();

            Some((match_end(caps)?, Node::Link { url: url.clone(), children: vec![Node::Text(url)] }))
        }),
        Matcher::pattern(r#"<(https?://\S*[^.,:;"'\s])>"#, |_, caps, _| {
            let url = caps[1].to_owned();

            Some((match_end(caps)?, Node::Link { url: url.clone(), children: vec![Node::Text(url)] }))
        }),
        Matcher::pattern(STANDARD_EMOJI_PATTERN, |_, caps, _| {
            Some((match_end(caps)?, Node::standard_emoji(&caps[0])))
        }),
    ]);
    matchers.push(custom_emoji_matcher());
    matchers.push(shortcode_matcher());
    matchers.push(timestamp_matcher());

    matchers
});

static MINIMAL: LazyLock<Vec<Matcher>> = LazyLock::new(|| {
    let mut matchers = mention_matchers();

    matchers.push(custom_emoji_matcher());
    matchers.push(timestamp_matcher());

    matchers
});

static BOLD_ONLY: LazyLock<Vec<Matcher>> = LazyLock::new(|| vec![bold_matcher()]);

static UNDERLINE_ONLY: LazyLock<Vec<Matcher>> = LazyLock::new(|| vec![underline_matcher()]);

fn bold_matcher() -> Matcher {
    // The guard group stands in for "exactly two closing asterisks"; it is
    // matched but never consumed.
    Matcher::pattern(r"(?s)\*\*(.+?)\*\*([^*]|$)", |source, caps, depth| {
        let inner = children(source, caps, 1, Profile::Full, depth);

        Some((caps.get(2)?.start(), Node::Formatting(FormattingKind::Bold, inner)))
    })
}

fn underline_matcher() -> Matcher {
    Matcher::pattern(r"(?s)__(.+?)__([^_]|$)", |source, caps, depth| {
        let inner = children(source, caps, 1, Profile::Full, depth);

        Some((caps.get(2)?.start(), Node::Formatting(FormattingKind::Underline, inner)))
    })
}

fn mention_matchers() -> Vec<Matcher> {
    vec![
        Matcher::exact("@everyone", |_| Node::Mention(MentionKind::Everyone)),
        Matcher::exact("@here", |_| Node::Mention(MentionKind::Here)),
        Matcher::pattern(r"<@!?(\d+)>", |_, caps, _| {
            let id = caps[1].parse().ok()?;

            Some((match_end(caps)?, Node::Mention(MentionKind::User(id))))
        }),
        Matcher::pattern(r"<#(\d+)>", |_, caps, _| {
            let id = caps[1].parse().ok()?;

            Some((match_end(caps)?, Node::Mention(MentionKind::Channel(id))))
        }),
        Matcher::pattern(r"<@&(\d+)>", |_, caps, _| {
            let id = caps[1].parse().ok()?;

            Some((match_end(caps)?, Node::Mention(MentionKind::Role(id))))
        }),
    ]
}

fn custom_emoji_matcher() -> Matcher {
    Matcher::pattern(r"<(a?):(\w+):(\d+)>", |_, caps, _| {
        let id = caps[3].parse().ok()?;

        Some((
            match_end(caps)?,
            Node::Emoji { id: Some(id), name: caps[2].to_owned(), animated: !caps[1].is_empty() },
        ))
    })
}

fn shortcode_matcher() -> Matcher {
    let codes =
        emoji::SHORTCODES.iter().map(|(name, _)| *name).collect::<Vec<_>>().join("|");

    Matcher::pattern(&format!(":({codes}):"), |_, caps, _| {
        let glyph = emoji::glyph_from_shortcode(&caps[1])?;

        Some((match_end(caps)?, Node::standard_emoji(glyph)))
    })
}

fn timestamp_matcher() -> Matcher {
    Matcher::pattern(r"<t:(-?\d+)(?::(\w))?>", |_, caps, _| {
        let end = match_end(caps)?;
        let instant = caps[1].parse::<i64>().ok();
        let node = match (instant, caps.get(2)) {
            (Some(unix), None) => Node::Timestamp { instant: Some(unix), format: Some('f') },
            (Some(unix), Some(flag)) => match flag.as_str() {
                "r" | "R" => Node::Timestamp { instant: Some(unix), format: None },
                "t" | "T" | "d" | "D" | "f" | "F" => {
                    Node::Timestamp { instant: Some(unix), format: flag.as_str().chars().next() }
                }
                _ => Node::Timestamp { instant: None, format: None },
            },
            (None, _) => Node::Timestamp { instant: None, format: None },
        };

        Some((end, node))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_round_trips() {
        let input = "just some plain text, nothing else";

        assert_eq!(parse(input), vec![Node::text(input)]);
        assert_eq!(crate::to_plain_text(&parse(input)), input);
    }

    #[test]
    fn bold_containing_italic() {
        let nodes = parse("**bold *it*** text");

        assert_eq!(nodes, vec![
            Node::Formatting(FormattingKind::Bold, vec![
                Node::text("bold "),
                Node::Formatting(FormattingKind::Italic, vec![Node::text("it")]),
            ]),
            Node::text(" text"),
        ]);
    }

    #[test]
    fn shrug_kaomoji_stays_literal() {
        assert_eq!(parse("¯\\_(ツ)_/¯"), vec![Node::text("¯\\_(ツ)_/¯")]);
    }

    #[test]
    fn italic_bold_composite_restricts_children() {
        let nodes = parse("***bold***");

        // The outer italic's children re-parse with bold alone, so the inner
        // asterisks cannot be claimed by the italic matcher again.
        assert_eq!(nodes, vec![Node::Formatting(FormattingKind::Italic, vec![
            Node::Formatting(FormattingKind::Bold, vec![Node::text("bold")]),
        ])]);
    }

    #[test]
    fn underline_alt_italic_leaves_border() {
        let nodes = parse("_hi_ there");

        assert_eq!(nodes, vec![
            Node::Formatting(FormattingKind::Italic, vec![Node::text("hi")]),
            Node::text(" there"),
        ]);
    }

    #[test]
    fn escaped_asterisk_is_literal() {
        assert_eq!(parse(r"\*not italic\*"), vec![
            Node::text("*"),
            Node::text("not italic"),
            Node::text("*"),
        ]);
    }

    #[test]
    fn quote_block_spans_rest() {
        let nodes = parse(">>> a\nb");

        assert_eq!(nodes, vec![Node::Formatting(FormattingKind::Quote, vec![Node::text("a\nb")])]);
    }

    #[test]
    fn repeated_quote_merges_lines() {
        let nodes = parse("> a\n> b\n");

        assert_eq!(nodes, vec![Node::Formatting(FormattingKind::Quote, vec![Node::text("a\nb\n")])]);
    }

    #[test]
    fn quote_requires_line_start() {
        let nodes = parse("a > b");

        assert_eq!(nodes, vec![Node::text("a > b")]);
    }

    #[test]
    fn heading_levels() {
        let nodes = parse("## section\nrest");

        assert_eq!(nodes, vec![
            Node::Heading(2, vec![Node::text("section")]),
            Node::text("rest"),
        ]);
    }

    #[test]
    fn list_items_parse_independently() {
        let nodes = parse("- one\n- **two**\n");

        assert_eq!(nodes, vec![Node::List(vec![
            vec![Node::text("one")],
            vec![Node::Formatting(FormattingKind::Bold, vec![Node::text("two")])],
        ])]);
    }

    #[test]
    fn fenced_code_with_language() {
        let nodes = parse("```rust\nlet x = 1;\n```");

        assert_eq!(nodes, vec![Node::MultiLineCode(Some("rust".to_owned()), "let x = 1;\n".to_owned())]);
    }

    #[test]
    fn inline_code_beats_formatting_by_position() {
        let nodes = parse("`**a**`");

        assert_eq!(nodes, vec![Node::InlineCode("**a**".to_owned())]);
    }

    #[test]
    fn mentions() {
        let nodes = parse("hi <@!123> in <#456> as <@&789>, @everyone");

        assert_eq!(nodes, vec![
            Node::text("hi "),
            Node::Mention(MentionKind::User(123)),
            Node::text(" in "),
            Node::Mention(MentionKind::Channel(456)),
            Node::text(" as "),
            Node::Mention(MentionKind::Role(789)),
            Node::text(", "),
            Node::Mention(MentionKind::Everyone),
        ]);
    }

    #[test]
    fn masked_link_children() {
        let nodes = parse("[see **this**](https://example.com)");

        assert_eq!(nodes, vec![Node::Link {
            url: "https://example.com".to_owned(),
            children: vec![
                Node::text("see "),
                Node::Formatting(FormattingKind::Bold, vec![Node::text("this")]),
            ],
        }]);
    }

    #[test]
    fn auto_link_excludes_trailing_punctuation() {
        let nodes = parse("go to https://example.com/a, now");

        assert_eq!(nodes, vec![
            Node::text("go to "),
            Node::Link {
                url: "https://example.com/a".to_owned(),
                children: vec![Node::text("https://example.com/a")],
            },
            Node::text(", now"),
        ]);
    }

    #[test]
    fn custom_emoji_and_shortcode() {
        let nodes = parse("<a:pepe:123> :thinking:");

        assert_eq!(nodes, vec![
            Node::Emoji { id: Some(123), name: "pepe".to_owned(), animated: true },
            Node::text(" "),
            Node::Emoji { id: None, name: "\u{1F914}".to_owned(), animated: false },
        ]);
    }

    #[test]
    fn standard_emoji_glyph() {
        let nodes = parse("ok \u{1F44D}\u{1F3FD}");

        assert_eq!(nodes, vec![
            Node::text("ok "),
            Node::Emoji { id: None, name: "\u{1F44D}\u{1F3FD}".to_owned(), animated: false },
        ]);
    }

    #[test]
    fn timestamp_flags() {
        assert_eq!(parse("<t:1000000000:R>"), vec![Node::Timestamp {
            instant: Some(1_000_000_000),
            format: None,
        }]);
        assert_eq!(parse("<t:1000000000:D>"), vec![Node::Timestamp {
            instant: Some(1_000_000_000),
            format: Some('D'),
        }]);
        assert_eq!(parse("<t:1000000000>"), vec![Node::Timestamp {
            instant: Some(1_000_000_000),
            format: Some('f'),
        }]);
        assert_eq!(parse("<t:1000000000:x>"), vec![Node::Timestamp { instant: None, format: None }]);
    }

    #[test]
    fn minimal_profile_keeps_styling_literal() {
        let nodes = parse_minimal("**bold** <@123> <:x:456>");

        assert_eq!(nodes, vec![
            Node::text("**bold** "),
            Node::Mention(MentionKind::User(123)),
            Node::text(" "),
            Node::Emoji { id: Some(456), name: "x".to_owned(), animated: false },
        ]);
    }

    #[test]
    fn depth_cap_degrades_to_text() {
        let mut input = String::new();

        for _ in 0..40 {
            input.push_str("||");
        }
        input.push('x');
        for _ in 0..40 {
            input.push_str("||");
        }

        // No panic and full coverage is all that matters past the cap.
        let nodes = parse(&input);

        assert!(crate::to_plain_text(&nodes).contains('x'));
    }
}
