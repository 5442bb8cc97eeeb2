use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use super::color::{nullable_color, Color};

/// Hosts that only ever attach one image per embed.
///
/// When such a host has more than one image, the upstream appends extra
/// image-only embeds that share the first embed's url; normalisation folds
/// them back into the first embed's image list.
const ONE_IMAGE_HOSTS: &[&str] = &["https://twitter.com/", "https://x.com/"];

/// An embed's author block.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct EmbedAuthor {
    /// The author's display name.
    #[serde(default)]
    pub name: Option<String>,
    /// The author's link.
    #[serde(default)]
    pub url: Option<String>,
    /// The author's icon URL.
    #[serde(default)]
    pub icon_url: Option<String>,
}

/// An embed's titled field.
#[derive(Clone, Debug, Deserialize)]
pub struct EmbedField {
    /// The field's title.
    pub name: String,
    /// The field's body.
    pub value: String,
    /// Whether the field flows next to its neighbours.
    #[serde(default)]
    pub inline: bool,
}

/// An image, thumbnail, or video slot in an embed.
#[derive(Clone, Debug, Deserialize)]
pub struct EmbedMedia {
    /// The media's source URL.
    #[serde(default)]
    pub url: Option<String>,
    /// The proxied URL, when the upstream provides one.
    #[serde(default)]
    pub proxy_url: Option<String>,
    /// The media width in pixels, when known.
    #[serde(default)]
    pub width: Option<u32>,
    /// The media height in pixels, when known.
    #[serde(default)]
    pub height: Option<u32>,
}

/// An embed's footer block.
#[derive(Clone, Debug, Deserialize)]
pub struct EmbedFooter {
    /// The footer's text.
    pub text: String,
    /// The footer's icon URL.
    #[serde(default)]
    pub icon_url: Option<String>,
}

/// Rich content rendered below a message.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Embed {
    /// The embed's title.
    #[serde(default)]
    pub title: Option<String>,
    /// The embed's kind marker (`rich`, `image`, `video`, `link`, `gifv`).
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// The embed's link.
    #[serde(default)]
    pub url: Option<String>,
    /// The embed's timestamp line.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// The embed's accent color; `None` when the raw value is zero.
    #[serde(rename = "color", default, deserialize_with = "nullable_color")]
    pub color: Option<Color>,
    /// The embed's author block.
    #[serde(default)]
    pub author: Option<EmbedAuthor>,
    /// The embed's description body.
    #[serde(default)]
    pub description: Option<String>,
    /// The embed's titled fields.
    #[serde(default)]
    pub fields: Vec<EmbedField>,
    /// The embed's thumbnail.
    #[serde(default)]
    pub thumbnail: Option<EmbedMedia>,
    /// The embed's primary image.
    #[serde(default)]
    pub image: Option<EmbedMedia>,
    /// Additional images folded in by normalisation; never a wire field.
    #[serde(skip)]
    pub images: Vec<EmbedMedia>,
    /// The embed's footer block.
    #[serde(default)]
    pub footer: Option<EmbedFooter>,
    /// The embed's video slot.
    #[serde(default)]
    pub video: Option<EmbedMedia>,
}

impl Embed {
    /// Returns whether this embed carries nothing but an image.
    #[must_use]
    pub fn is_plain_image(&self) -> bool {
        self.image.is_some()
            && self.title.is_none()
            && self.description.is_none()
            && self.fields.is_empty()
            && self.footer.is_none()
    }

    /// Returns whether the embed's url points at a one-image-per-embed host.
    fn is_one_image_host(&self) -> bool {
        self.url
            .as_deref()
            .is_some_and(|url| ONE_IMAGE_HOSTS.iter().any(|host| url.starts_with(host)))
    }

    /// Returns every image slot: the primary image followed by any folded in
    /// by normalisation.
    pub fn all_images(&self) -> impl Iterator<Item = &EmbedMedia> {
        self.image.iter().chain(self.images.iter())
    }

    /// Returns the Spotify track identifier for track embeds.
    #[must_use]
    pub fn spotify_track_id(&self) -> Option<&str> {
        let url = self.url.as_deref()?;
        let rest = url.strip_prefix("https://open.spotify.com/track/")?;

        Some(rest.split(['?', '/']).next().unwrap_or(rest))
    }

    /// Returns the YouTube video identifier for video embeds.
    #[must_use]
    pub fn youtube_video_id(&self) -> Option<&str> {
        let url = self.url.as_deref()?;

        if let Some(rest) = url.strip_prefix("https://www.youtube.com/watch?v=") {
            return Some(rest.split('&').next().unwrap_or(rest));
        }

        url.strip_prefix("https://youtu.be/").map(|rest| rest.split('?').next().unwrap_or(rest))
    }
}

/// Folds trailing image-only embeds into their leading sibling.
///
/// Post-condition: no two consecutive embeds share a url within the
/// one-image-per-embed host set, which also makes the pass idempotent.
#[must_use]
pub fn normalize_embeds(embeds: Vec<Embed>) -> Vec<Embed> {
    let mut normalized: Vec<Embed> = Vec::with_capacity(embeds.len());

    for embed in embeds {
        if let Some(leading) = normalized.last_mut() {
            if leading.is_one_image_host() && embed.url == leading.url && embed.is_plain_image() {
                if let Some(image) = embed.image {
                    leading.images.push(image);
                }

                continue;
            }
        }

        normalized.push(embed);
    }

    normalized
}

/// Deserializes an embed list, applying normalisation in the same step.
pub(crate) fn normalized_embeds<'de, D>(deserializer: D) -> Result<Vec<Embed>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(normalize_embeds(Vec::<Embed>::deserialize(deserializer)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tweet_embed() -> Embed {
        Embed {
            title: Some("tweet".to_owned()),
            url: Some("https://twitter.com/some/status/1".to_owned()),
            image: Some(EmbedMedia {
                url: Some("https://pbs.example/1.png".to_owned()),
                proxy_url: None,
                width: None,
                height: None,
            }),
            ..Embed::default()
        }
    }

    fn extra_image() -> Embed {
        Embed {
            url: Some("https://twitter.com/some/status/1".to_owned()),
            image: Some(EmbedMedia {
                url: Some("https://pbs.example/2.png".to_owned()),
                proxy_url: None,
                width: None,
                height: None,
            }),
            ..Embed::default()
        }
    }

    #[test]
    fn trailing_images_fold_into_leader() {
        let normalized = normalize_embeds(vec![tweet_embed(), extra_image(), extra_image()]);

        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].all_images().count(), 3);
    }

    #[test]
    fn normalisation_is_idempotent() {
        let once = normalize_embeds(vec![tweet_embed(), extra_image()]);
        let counts: Vec<usize> = once.iter().map(|e| e.all_images().count()).collect();
        let twice = normalize_embeds(once);

        assert_eq!(twice.iter().map(|e| e.all_images().count()).collect::<Vec<_>>(), counts);
    }

    #[test]
    fn other_hosts_stay_separate() {
        let mut first = tweet_embed();

        first.url = Some("https://example.com/post".to_owned());

        let mut second = extra_image();

        second.url = first.url.clone();

        assert_eq!(normalize_embeds(vec![first, second]).len(), 2);
    }

    #[test]
    fn video_ids_parse_from_urls() {
        let youtube = Embed {
            url: Some("https://www.youtube.com/watch?v=abc123&t=9".to_owned()),
            ..Embed::default()
        };
        let spotify = Embed {
            url: Some("https://open.spotify.com/track/xyz?si=1".to_owned()),
            ..Embed::default()
        };

        assert_eq!(youtube.youtube_video_id(), Some("abc123"));
        assert_eq!(spotify.spotify_track_id(), Some("xyz"));
    }
}
