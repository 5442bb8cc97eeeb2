use serde::Deserialize;

use crate::snowflake::Snowflake;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "avif", "bmp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "flac", "m4a"];

/// A file attached to a message.
#[derive(Clone, Debug, Deserialize)]
pub struct Attachment {
    /// The attachment's identifier.
    pub id: Snowflake,
    /// The attachment's source URL.
    pub url: String,
    /// The attachment's file name.
    #[serde(rename = "filename")]
    pub file_name: String,
    /// The attachment's size in bytes.
    #[serde(rename = "size", default)]
    pub size_bytes: u64,
    /// The media width in pixels, when known.
    #[serde(default)]
    pub width: Option<u32>,
    /// The media height in pixels, when known.
    #[serde(default)]
    pub height: Option<u32>,
}

impl Attachment {
    fn extension(&self) -> Option<String> {
        self.file_name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())
    }

    /// Returns whether the file name carries an image extension.
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.extension().is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
    }

    /// Returns whether the file name carries a video extension.
    #[must_use]
    pub fn is_video(&self) -> bool {
        self.extension().is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
    }

    /// Returns whether the file name carries an audio extension.
    #[must_use]
    pub fn is_audio(&self) -> bool {
        self.extension().is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.as_str()))
    }

    /// Returns whether the attachment was uploaded as a spoiler.
    #[must_use]
    pub fn is_spoiler(&self) -> bool {
        self.file_name.starts_with("SPOILER_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(file_name: &str) -> Attachment {
        Attachment {
            id: Snowflake::new(1),
            url: format!("https://cdn.example.com/{file_name}"),
            file_name: file_name.to_owned(),
            size_bytes: 64,
            width: None,
            height: None,
        }
    }

    #[test]
    fn media_predicates_follow_extension() {
        assert!(attachment("photo.PNG").is_image());
        assert!(attachment("clip.mp4").is_video());
        assert!(attachment("song.flac").is_audio());
        assert!(!attachment("notes.txt").is_image());
        assert!(!attachment("no-extension").is_audio());
    }

    #[test]
    fn spoiler_prefix_is_detected() {
        assert!(attachment("SPOILER_photo.png").is_spoiler());
        assert!(!attachment("photo.png").is_spoiler());
    }
}
