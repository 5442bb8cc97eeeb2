//! Standard-emoji recognition helpers shared by the parser and renderers.

use std::fmt::Write;

/// Shortcode-to-glyph index for the emoji Discord accepts as `:name:` codes.
///
/// This is the commonly-used subset; unknown codes are left as literal text,
/// which matches how the chat client renders them.
pub const SHORTCODES: &[(&str, &str)] = &[
    ("100", "\u{1F4AF}"),
    ("angry", "\u{1F620}"),
    ("blush", "\u{1F60A}"),
    ("broken_heart", "\u{1F494}"),
    ("clap", "\u{1F44F}"),
    ("cry", "\u{1F622}"),
    ("eyes", "\u{1F440}"),
    ("fire", "\u{1F525}"),
    ("grin", "\u{1F601}"),
    ("grinning", "\u{1F600}"),
    ("heart", "\u{2764}\u{FE0F}"),
    ("heart_eyes", "\u{1F60D}"),
    ("joy", "\u{1F602}"),
    ("kissing_heart", "\u{1F618}"),
    ("laughing", "\u{1F606}"),
    ("neutral_face", "\u{1F610}"),
    ("ok_hand", "\u{1F44C}"),
    ("pensive", "\u{1F614}"),
    ("poop", "\u{1F4A9}"),
    ("pray", "\u{1F64F}"),
    ("rage", "\u{1F621}"),
    ("relaxed", "\u{263A}\u{FE0F}"),
    ("rofl", "\u{1F923}"),
    ("rocket", "\u{1F680}"),
    ("slight_smile", "\u{1F642}"),
    ("smile", "\u{1F604}"),
    ("smiley", "\u{1F603}"),
    ("smirk", "\u{1F60F}"),
    ("sob", "\u{1F62D}"),
    ("star", "\u{2B50}"),
    ("sunglasses", "\u{1F60E}"),
    ("sweat_smile", "\u{1F605}"),
    ("tada", "\u{1F389}"),
    ("thinking", "\u{1F914}"),
    ("thumbsdown", "\u{1F44E}"),
    ("thumbsup", "\u{1F44D}"),
    ("upside_down", "\u{1F643}"),
    ("wave", "\u{1F44B}"),
    ("weary", "\u{1F629}"),
    ("wink", "\u{1F609}"),
];

/// Regex source matching one standard emoji: a regional-indicator pair, a
/// keycap sequence, or an emoji-block codepoint with optional variation
/// selector, skin tone, and zero-width-joiner continuations.
pub(crate) const STANDARD_EMOJI_PATTERN: &str = "(?x)
    [\u{1F1E6}-\u{1F1FF}]{2}
    | [0-9\\#\\*]\u{FE0F}?\u{20E3}
    | (?: [\u{2190}-\u{21FF}\u{2600}-\u{27BF}\u{2B00}-\u{2BFF}\u{1F000}-\u{1FAFF}]
          \u{FE0F}?
          [\u{1F3FB}-\u{1F3FF}]?
          (?: \u{200D}
              [\u{2190}-\u{21FF}\u{2600}-\u{27BF}\u{2B00}-\u{2BFF}\u{1F000}-\u{1FAFF}]
              \u{FE0F}?
              [\u{1F3FB}-\u{1F3FF}]?
          )*
      )";

/// Looks up the glyph for a `:shortcode:` name.
#[must_use]
pub fn glyph_from_shortcode(code: &str) -> Option<&'static str> {
    SHORTCODES.iter().find(|(name, _)| *name == code).map(|(_, glyph)| *glyph)
}

/// Derives the Twemoji image identifier for a standard-emoji glyph.
///
/// Codepoints are joined by `-` in lowercase hex. Following the Twemoji asset
/// naming rule, the variation selector is omitted unless the sequence also
/// contains a zero-width joiner.
#[must_use]
pub fn twemoji_id(glyph: &str) -> String {
    let keep_selector = glyph.chars().any(|c| c == '\u{200D}');
    let mut id = String::new();

    for point in glyph.chars() {
        if !keep_selector && point == '\u{FE0F}' {
            continue;
        }
        if !id.is_empty() {
            id.push('-');
        }

        let _ = write!(id, "{:x}", u32::from(point));
    }

    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortcode_lookup_finds_known_codes() {
        assert_eq!(glyph_from_shortcode("thinking"), Some("\u{1F914}"));
        assert_eq!(glyph_from_shortcode("not_a_real_code"), None);
    }

    #[test]
    fn twemoji_id_skips_lone_variation_selector() {
        assert_eq!(twemoji_id("\u{2764}\u{FE0F}"), "2764");
    }

    #[test]
    fn twemoji_id_keeps_selector_in_joined_sequences() {
        // Woman shrugging: person + ZWJ + female sign + selector.
        assert_eq!(twemoji_id("\u{1F937}\u{200D}\u{2640}\u{FE0F}"), "1f937-200d-2640-fe0f");
    }
}
