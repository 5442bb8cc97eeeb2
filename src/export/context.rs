use std::collections::HashMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local, Locale, TimeZone, Utc};
use futures_util::{pin_mut, TryStreamExt};

use super::assets::AssetDownloader;
use crate::api::ApiClient;
use crate::model::{Channel, Color, Guild, Member, Reaction, Role, User};
use crate::request::{ExportFormat, ExportRequest};
use crate::snowflake::Snowflake;
use crate::Result;

/// How many member look-ups may be in flight at once.
const MEMBER_CONCURRENCY: usize = 10;
/// How many users are collected per reaction when expanding reactions.
const REACTION_USER_CAP: usize = 100;

/// Per-export lookup caches and rendering services.
///
/// Tier one (members, channels, roles) is filled by the orchestrator — once
/// up front for channels and roles, incrementally as users are referenced for
/// members. Tier two (per-user role lists and colors) derives lazily from
/// tier one. The orchestrator is the only writer; writers read the caches
/// only after the current batch's member resolution has completed, so no
/// locking is involved beyond the lazy tier-two memoisation.
pub struct ExportContext {
    client: Arc<ApiClient>,
    request: ExportRequest,
    guild: Guild,
    channel: Channel,
    exported_at: DateTime<Utc>,
    locale: Locale,
    assets: AssetDownloader,
    members: HashMap<Snowflake, Option<Member>>,
    channels: HashMap<Snowflake, Channel>,
    roles: HashMap<Snowflake, Role>,
    user_roles: std::sync::Mutex<HashMap<Snowflake, Vec<Snowflake>>>,
    user_colors: std::sync::Mutex<HashMap<Snowflake, Option<Color>>>,
}

impl ExportContext {
    /// Creates a context for one export.
    ///
    /// Nothing is fetched up front; the caches start empty and the token kind
    /// is not probed until the first request.
    #[must_use]
    pub fn new(
        client: Arc<ApiClient>,
        request: ExportRequest,
        guild: Guild,
        channel: Channel,
        base_path: &Path,
    ) -> Self {
        let locale = request
            .locale
            .as_deref()
            .and_then(|tag| Locale::try_from(tag.replace('-', "_").as_str()).ok())
            .unwrap_or(Locale::POSIX);
        let assets_dir = request.assets_dir_path.clone().map_or_else(
            || PathBuf::from(format!("{}_Files", base_path.display())),
            |template| {
                PathBuf::from(super::path::expand_template(
                    &template.to_string_lossy(),
                    &guild,
                    &channel,
                    request.after,
                    request.before,
                ))
            },
        );
        let output_dir = base_path.parent().map_or_else(PathBuf::new, Path::to_path_buf);
        let assets = AssetDownloader::new(
            reqwest::Client::new(),
            request.should_download_assets,
            request.should_reuse_assets,
            output_dir,
            assets_dir,
        );

        Self {
            client,
            request,
            guild,
            channel,
            exported_at: Utc::now(),
            locale,
            assets,
            members: HashMap::new(),
            channels: HashMap::new(),
            roles: HashMap::new(),
            user_roles: std::sync::Mutex::new(HashMap::new()),
            user_colors: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Returns the export request this context serves.
    #[must_use]
    pub const fn request(&self) -> &ExportRequest {
        &self.request
    }

    /// Returns the guild being exported.
    #[must_use]
    pub const fn guild(&self) -> &Guild {
        &self.guild
    }

    /// Returns the channel being exported.
    #[must_use]
    pub const fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Returns when this export started.
    #[must_use]
    pub const fn exported_at(&self) -> DateTime<Utc> {
        self.exported_at
    }

    /// Fills the channel and role caches, once, at export start.
    ///
    /// # Errors
    ///
    /// This function will return an error if either listing fails.
    pub(crate) async fn populate_channels_and_roles(&mut self) -> Result {
        if !self.guild.is_direct() {
            {
                let stream = self.client.get_guild_channels(self.guild.id);

                pin_mut!(stream);

                while let Some(channel) = stream.try_next().await? {
                    self.channels.insert(channel.id, channel);
                }
            }

            let stream = self.client.get_guild_roles(self.guild.id);

            pin_mut!(stream);

            while let Some(role) = stream.try_next().await? {
                self.roles.insert(role.id, role);
            }
        }

        Ok(())
    }

    /// Resolves guild profiles for the given users, at most
    /// [`MEMBER_CONCURRENCY`] look-ups in flight.
    ///
    /// Users already cached are skipped. A user who has left the guild gets a
    /// fallback profile synthesised from the user object itself, so the cache
    /// never re-queries them.
    ///
    /// # Errors
    ///
    /// This function will return an error if a look-up fails fatally.
    pub(crate) async fn populate_members(&mut self, users: Vec<User>) -> Result {
        let mut misses: Vec<User> = Vec::new();

        for user in users {
            if !self.members.contains_key(&user.id)
                && !misses.iter().any(|seen| seen.id == user.id)
            {
                misses.push(user);
            }
        }

        for chunk in misses.chunks(MEMBER_CONCURRENCY) {
            let results = futures_util::future::join_all(
                chunk.iter().map(|user| self.client.try_get_guild_member(self.guild.id, user.id)),
            )
            .await;

            for (user, result) in chunk.iter().zip(results) {
                let member = match result {
                    Ok(Some(member)) => Some(member),
                    Ok(None) => {
                        tracing::debug!(user = %user.id, "member not in guild; using fallback");

                        Some(Member::of_user(user.clone(), self.guild.id))
                    }
                    Err(error) => return Err(error),
                };

                self.members.insert(user.id, member);
            }
        }

        Ok(())
    }

    /// Looks up a cached member profile.
    #[must_use]
    pub fn member(&self, user_id: Snowflake) -> Option<&Member> {
        self.members.get(&user_id).and_then(Option::as_ref)
    }

    /// Looks up a cached channel.
    #[must_use]
    pub fn channel_by_id(&self, channel_id: Snowflake) -> Option<&Channel> {
        self.channels.get(&channel_id)
    }

    /// Looks up a cached role.
    #[must_use]
    pub fn role(&self, role_id: Snowflake) -> Option<&Role> {
        self.roles.get(&role_id)
    }

    /// Returns a user's roles ordered by position, highest first.
    #[must_use]
    pub fn member_roles(&self, user_id: Snowflake) -> Vec<Role> {
        let mut cache = self.user_roles.lock().unwrap_or_else(|error| error.into_inner());
        let ordered = cache.entry(user_id).or_insert_with(|| {
            let mut roles: Vec<&Role> = self
                .members
                .get(&user_id)
                .and_then(Option::as_ref)
                .map(|member| {
                    member.role_ids.iter().filter_map(|id| self.roles.get(id)).collect()
                })
                .unwrap_or_default();

            roles.sort_by_key(|role| std::cmp::Reverse(role.position));
            roles.into_iter().map(|role| role.id).collect()
        });

        ordered.iter().filter_map(|id| self.roles.get(id).cloned()).collect()
    }

    /// Returns the color a user renders with: the first colored role by
    /// position.
    #[must_use]
    pub fn user_color(&self, user_id: Snowflake) -> Option<Color> {
        if let Some(cached) =
            self.user_colors.lock().unwrap_or_else(|error| error.into_inner()).get(&user_id)
        {
            return *cached;
        }

        let color = self.member_roles(user_id).iter().find_map(|role| role.color);

        self.user_colors
            .lock()
            .unwrap_or_else(|error| error.into_inner())
            .insert(user_id, color);

        color
    }

    /// Returns the name a message author renders under.
    #[must_use]
    pub fn display_name(&self, user: &User) -> String {
        self.member(user.id)
            .map_or_else(|| user.display_name().to_owned(), |member| member.display_name().to_owned())
    }

    /// Resolves a media URL through the asset downloader.
    pub async fn resolve_asset_url(&self, url: &str) -> String {
        let html = matches!(self.request.format, ExportFormat::HtmlDark | ExportFormat::HtmlLight);

        self.assets.resolve(url, html).await
    }

    /// Collects the users behind one reaction, bounded and best-effort.
    ///
    /// A failure mid-listing degrades to the users collected so far; reaction
    /// rosters are decoration, not primary content.
    pub async fn reaction_users(&self, message_id: Snowflake, reaction: &Reaction) -> Vec<User> {
        let stream = self.client.get_message_reactions(self.channel.id, message_id, reaction);

        pin_mut!(stream);

        let mut users = Vec::new();

        while users.len() < REACTION_USER_CAP {
            match stream.try_next().await {
                Ok(Some(user)) => users.push(user),
                Ok(None) => break,
                Err(error) => {
                    tracing::warn!(%error, "reaction roster fetch failed; keeping partial list");

                    break;
                }
            }
        }

        users
    }

    /// Formats an instant with one of the date format codes.
    ///
    /// Codes: `d` short date, `t` short time, `f` long date-time, `F` full
    /// date-time, `R` relative to the export instant, `g` (and anything
    /// else) the compact default. Dates render in the configured locale, in
    /// the local timezone unless UTC normalisation is on.
    #[must_use]
    pub fn format_date(&self, instant: DateTime<Utc>, code: char) -> String {
        if self.request.is_utc_normalization_enabled {
            self.format_in_zone(instant, code)
        } else {
            self.format_in_zone(instant.with_timezone(&Local), code)
        }
    }

    /// Formats a timestamp markdown node's instant.
    ///
    /// `None` means the relative form; unparseable instants render as the
    /// invalid marker.
    #[must_use]
    pub fn format_unix(&self, unix: i64, code: Option<char>) -> String {
        Utc.timestamp_opt(unix, 0).single().map_or_else(
            || "Invalid date".to_owned(),
            |instant| self.format_date(instant, code.unwrap_or('R')),
        )
    }

    fn format_in_zone<Tz: TimeZone>(&self, instant: DateTime<Tz>, code: char) -> String
    where
        Tz::Offset: Display,
    {
        let pattern = match code {
            'd' => "%x",
            't' => "%I:%M %p",
            'f' => "%e %B %Y %I:%M %p",
            'F' => "%A, %e %B %Y %I:%M %p",
            'R' => return self.format_relative(instant.with_timezone(&Utc)),
            _ => "%d-%b-%y %I:%M %p",
        };

        instant.format_localized(pattern, self.locale).to_string()
    }

    /// Renders an instant relative to the export instant.
    fn format_relative(&self, instant: DateTime<Utc>) -> String {
        let delta = self.exported_at - instant;
        let (magnitude, future) =
            if delta.num_seconds() < 0 { (-delta, true) } else { (delta, false) };

        let phrase = if magnitude.num_seconds() < 60 {
            format!("{} seconds", magnitude.num_seconds().max(0))
        } else if magnitude.num_minutes() < 60 {
            format!("{} minutes", magnitude.num_minutes())
        } else if magnitude.num_hours() < 24 {
            format!("{} hours", magnitude.num_hours())
        } else if magnitude.num_days() < 365 {
            format!("{} days", magnitude.num_days())
        } else {
            format!("{} years", magnitude.num_days() / 365)
        };

        if future {
            format!("in {phrase}")
        } else {
            format!("{phrase} ago")
        }
    }
}
