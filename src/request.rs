use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::api::TokenKind;
use crate::export::PartitionLimit;
use crate::filter::MessageFilter;
use crate::snowflake::Snowflake;

/// The file format an export is written in.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub enum ExportFormat {
    /// A plain text transcript.
    PlainText,
    /// A self-contained dark-themed HTML page.
    #[default]
    HtmlDark,
    /// A self-contained light-themed HTML page.
    HtmlLight,
    /// A comma-separated table of message rows.
    Csv,
    /// A single structured JSON document.
    Json,
}

impl ExportFormat {
    /// Returns the file extension for this format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::PlainText => "txt",
            Self::HtmlDark | Self::HtmlLight => "html",
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

/// Controls which token kinds the client proactively rate-limits itself for.
///
/// The advisory budget in response headers is always *recorded*; this
/// preference only decides whether it is *respected* before the next request.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub enum RateLimitPreference {
    /// Respect the advertised budget for every token kind.
    #[default]
    RespectAll,
    /// Respect the advertised budget only when authenticated as a user.
    RespectUser,
    /// Respect the advertised budget only when authenticated as a bot.
    RespectBot,
    /// Never wait ahead of time; rely on retry-after handling alone.
    IgnoreAll,
}

impl RateLimitPreference {
    /// Returns whether the budget is respected for the given token kind.
    #[must_use]
    pub const fn is_respected_for(self, kind: TokenKind) -> bool {
        match self {
            Self::RespectAll => true,
            Self::RespectUser => matches!(kind, TokenKind::User),
            Self::RespectBot => matches!(kind, TokenKind::Bot),
            Self::IgnoreAll => false,
        }
    }
}

/// A cooperative cancellation flag shared between the caller and an export.
///
/// Cancellation takes effect between pages and between batches; an in-flight
/// request resolves at its next response boundary. Partial output is left on
/// disk.
#[derive(Clone, Debug, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// Creates a new, unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Reports estimated completion in `0.0..=1.0`; advisory only.
pub type ProgressFn = Box<dyn Fn(f64) + Send + Sync>;

/// Everything needed to export one channel.
#[derive(Debug)]
pub struct ExportRequest {
    /// The authentication token; its kind is discovered automatically.
    pub token: String,
    /// The channel to export.
    pub channel_id: Snowflake,
    /// The output file path, or a directory to derive a default name under.
    pub output_path: PathBuf,
    /// The format to write.
    pub format: ExportFormat,
    /// Only include messages sent after this bound.
    pub after: Option<Snowflake>,
    /// Only include messages sent before this bound.
    pub before: Option<Snowflake>,
    /// When to roll the output over into a new partition file.
    pub partition_limit: PartitionLimit,
    /// Which messages to include.
    pub message_filter: MessageFilter,
    /// Whether message content is parsed as markdown before rendering.
    pub should_format_markdown: bool,
    /// Whether referenced media is downloaded next to the output.
    pub should_download_assets: bool,
    /// Whether previously downloaded media may be reused; only meaningful
    /// together with [`Self::should_download_assets`].
    pub should_reuse_assets: bool,
    /// The asset directory path template; `None` derives `<output>_Files/`.
    pub assets_dir_path: Option<PathBuf>,
    /// How the advisory rate budget is handled.
    pub rate_limit_preference: RateLimitPreference,
    /// A BCP-47 tag selecting the date formatting locale.
    pub locale: Option<String>,
    /// Whether dates are normalised to UTC instead of the local offset.
    pub is_utc_normalization_enabled: bool,
    /// The caller's cancellation flag.
    pub cancellation: CancellationFlag,
}

impl ExportRequest {
    /// Creates a request with default options.
    #[must_use]
    pub fn new(
        token: impl Into<String>,
        channel_id: Snowflake,
        output_path: impl Into<PathBuf>,
        format: ExportFormat,
    ) -> Self {
        Self {
            token: token.into(),
            channel_id,
            output_path: output_path.into(),
            format,
            after: None,
            before: None,
            partition_limit: PartitionLimit::Null,
            message_filter: MessageFilter::Null,
            should_format_markdown: true,
            should_download_assets: false,
            should_reuse_assets: false,
            assets_dir_path: None,
            rate_limit_preference: RateLimitPreference::default(),
            locale: None,
            is_utc_normalization_enabled: false,
            cancellation: CancellationFlag::new(),
        }
    }
}
