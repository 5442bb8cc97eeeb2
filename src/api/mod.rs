//! The authenticated, rate-limited upstream client.
//!
//! Single-item fetches return parsed entities (or `None` on the `try_*`
//! variants); list endpoints surface as finite, single-pass [`Stream`]s that
//! fetch lazily, one page per consumer demand, with no prefetch.

use std::time::Duration;

use async_stream::try_stream;
use chrono::{DateTime, Utc};
use futures_util::Stream;
use rand::Rng;
use reqwest::header::AUTHORIZATION;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, OnceCell};

use crate::model::{
    Application, Channel, ChannelWire, Guild, Invite, Member, MemberWire, Message, Reaction, Role,
    User,
};
use crate::request::{CancellationFlag, RateLimitPreference};
use crate::snowflake::Snowflake;
use crate::{Error, Result, API_BASE};

pub use self::rate::RateBudget;
mod rate;

pub use self::token::TokenKind;
mod token;

/// How many times a single request may be attempted.
const MAX_ATTEMPTS: u8 = 5;
/// The base of the exponential backoff schedule.
const BASE_BACKOFF: Duration = Duration::from_secs(1);
/// The longest delay between attempts, advised or computed.
const MAX_BACKOFF: Duration = Duration::from_secs(60);
/// The page size requested from list endpoints.
const PAGE_SIZE: usize = 100;

/// The authenticated upstream client.
///
/// Cheap to share by reference; one client serves a whole export. All methods
/// take `&self` — the only interior state is the memoised token kind, the
/// memoised application probe, and the rate budget.
#[derive(Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    token: String,
    kind: OnceCell<TokenKind>,
    application: OnceCell<Option<Application>>,
    preference: RateLimitPreference,
    budget: Mutex<RateBudget>,
    cancellation: CancellationFlag,
}

impl ApiClient {
    /// Creates a new client for the given token.
    ///
    /// The token's kind is not probed until the first request needs it.
    ///
    /// # Errors
    ///
    /// This function will return an error if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(
        token: impl Into<String>,
        preference: RateLimitPreference,
        cancellation: CancellationFlag,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .read_timeout(Duration::from_secs(30))
            .build()
            .map_err(Error::Client)?;

        Ok(Self {
            http,
            token: token.into(),
            kind: OnceCell::new(),
            application: OnceCell::new(),
            preference,
            budget: Mutex::new(RateBudget::new()),
            cancellation,
        })
    }

    /// Returns the token's kind, probing the self endpoint once.
    ///
    /// The bare scheme is tried first, then the `Bot ` prefix; whichever is
    /// not rejected wins.
    ///
    /// # Errors
    ///
    /// This function will return [`Error::InvalidToken`] if both schemes are
    /// rejected.
    pub async fn token_kind(&self) -> Result<TokenKind> {
        self.kind
            .get_or_try_init(|| async {
                for kind in [TokenKind::User, TokenKind::Bot] {
                    let response = self
                        .http
                        .get(format!("{API_BASE}/users/@me"))
                        .header(AUTHORIZATION, kind.header_value(&self.token))
                        .send()
                        .await
                        .map_err(|source| Error::Transport {
                            route: "users/@me".to_owned(),
                            attempts: 1,
                            source,
                        })?;

                    if response.status() != StatusCode::UNAUTHORIZED {
                        tracing::debug!(?kind, "resolved token kind");

                        return Ok(kind);
                    }
                }

                Err(Error::InvalidToken)
            })
            .await
            .copied()
    }

    /// Computes the delay before retry attempt `attempt + 1`.
    fn backoff_delay(attempt: u8) -> Duration {
        let exponential = BASE_BACKOFF * 2_u32.saturating_pow(u32::from(attempt));
        let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..1_000));

        (exponential + jitter).min(MAX_BACKOFF)
    }

    /// Extracts a server-advised retry delay from a response, when present.
    fn advised_delay(response: &Response) -> Option<Duration> {
        response
            .headers()
            .get("Retry-After")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<f64>().ok())
            .filter(|seconds| *seconds >= 0.0)
            .map(|seconds| Duration::from_secs_f64(seconds).min(MAX_BACKOFF))
    }

    /// Performs one authenticated GET with retry, backoff, and proactive
    /// budget waits. The returned response may still carry a non-retryable
    /// error status; interpretation is the caller's job.
    async fn request(&self, route: &str) -> Result<Response> {
        let kind = self.token_kind().await?;
        let authorization = kind.header_value(&self.token);
        let url = format!("{API_BASE}/{route}");
        let mut attempt = 0;

        loop {
            if self.cancellation.is_cancelled() {
                return Err(Error::Cancelled);
            }

            if self.preference.is_respected_for(kind) {
                let delay = self.budget.lock().await.required_delay();

                if let Some(delay) = delay {
                    tracing::debug!(?delay, route, "rate budget exhausted; waiting");
                    tokio::time::sleep(delay).await;
                }
            }

            let result = self.http.get(&url).header(AUTHORIZATION, &authorization).send().await;
            let last_attempt = attempt + 1 >= MAX_ATTEMPTS;

            match result {
                Err(source) => {
                    if last_attempt {
                        return Err(Error::Transport {
                            route: route.to_owned(),
                            attempts: MAX_ATTEMPTS,
                            source,
                        });
                    }

                    tracing::warn!(route, attempt, "transport error; retrying");
                }
                Ok(response) => {
                    self.budget.lock().await.record(response.headers());

                    let status = response.status();
                    let retryable = status == StatusCode::REQUEST_TIMEOUT
                        || status == StatusCode::TOO_MANY_REQUESTS
                        || status.is_server_error();

                    if !retryable {
                        return Ok(response);
                    }
                    if last_attempt {
                        return Err(Error::Status { status: status.as_u16(), route: route.to_owned() });
                    }

                    if let Some(advised) = Self::advised_delay(&response) {
                        tracing::warn!(route, ?advised, "retryable status; honouring Retry-After");
                        tokio::time::sleep(advised).await;
                        attempt += 1;

                        continue;
                    }

                    tracing::warn!(route, %status, attempt, "retryable status; backing off");
                }
            }

            tokio::time::sleep(Self::backoff_delay(attempt)).await;
            attempt += 1;
        }
    }

    /// Performs a GET and decodes a success body.
    async fn request_json<T: DeserializeOwned>(&self, route: &str, entity: &'static str) -> Result<T> {
        let response = self.request(route).await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::InvalidToken);
        }
        if !status.is_success() {
            return Err(Error::Status { status: status.as_u16(), route: route.to_owned() });
        }

        let bytes = response.bytes().await.map_err(|source| Error::Transport {
            route: route.to_owned(),
            attempts: 1,
            source,
        })?;

        serde_json::from_slice(&bytes).map_err(|source| Error::Malformed { entity, source })
    }

    /// Performs a GET where the resource may be legitimately inaccessible;
    /// 403 and 404 decode to `None` instead of an error.
    async fn try_request_json<T: DeserializeOwned>(
        &self,
        route: &str,
        entity: &'static str,
    ) -> Result<Option<T>> {
        let response = self.request(route).await?;
        let status = response.status();

        if status == StatusCode::FORBIDDEN || status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::InvalidToken);
        }
        if !status.is_success() {
            return Err(Error::Status { status: status.as_u16(), route: route.to_owned() });
        }

        let bytes = response.bytes().await.map_err(|source| Error::Transport {
            route: route.to_owned(),
            attempts: 1,
            source,
        })?;

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| Error::Malformed { entity, source })
    }

    /// Fetches a guild by identifier; the zero sentinel resolves to the
    /// direct-message guild without a request.
    ///
    /// # Errors
    ///
    /// This function will return an error if the guild cannot be fetched.
    pub async fn get_guild(&self, guild_id: Snowflake) -> Result<Guild> {
        if guild_id.value() == 0 {
            return Ok(Guild::direct_messages());
        }

        self.request_json(&format!("guilds/{guild_id}"), "guild").await
    }

    /// Fetches a channel with its parents resolved up to two levels.
    ///
    /// # Errors
    ///
    /// This function will return an error if the channel cannot be fetched;
    /// an inaccessible parent is tolerated and left unresolved.
    pub async fn get_channel(&self, channel_id: Snowflake) -> Result<Channel> {
        let wire: ChannelWire = self.request_json(&format!("channels/{channel_id}"), "channel").await?;
        let mut parent = None;

        if let Some(parent_id) = wire.parent_id() {
            if let Some(parent_wire) = self
                .try_request_json::<ChannelWire>(&format!("channels/{parent_id}"), "channel")
                .await?
            {
                let grandparent = match parent_wire.parent_id() {
                    Some(grandparent_id) => self
                        .try_request_json::<ChannelWire>(
                            &format!("channels/{grandparent_id}"),
                            "channel",
                        )
                        .await?
                        .map(|grand| Channel::from_wire(grand, None)),
                    None => None,
                };

                parent = Some(Channel::from_wire(parent_wire, grandparent));
            }
        }

        Ok(Channel::from_wire(wire, parent))
    }

    /// Fetches the application behind a bot token, memoised for the client's
    /// lifetime.
    ///
    /// # Errors
    ///
    /// This function will return an error if the probe fails outright;
    /// an inaccessible application yields `None`.
    pub async fn try_get_application(&self) -> Result<Option<Application>> {
        self.application
            .get_or_try_init(|| async {
                self.try_request_json("applications/@me", "application").await
            })
            .await
            .cloned()
    }

    /// Fetches a user, or `None` when the user is inaccessible.
    ///
    /// # Errors
    ///
    /// This function will return an error if the request fails outright.
    pub async fn try_get_user(&self, user_id: Snowflake) -> Result<Option<User>> {
        self.try_request_json(&format!("users/{user_id}"), "user").await
    }

    /// Fetches a guild member, or `None` when the user has left the guild or
    /// is otherwise inaccessible.
    ///
    /// # Errors
    ///
    /// This function will return an error if the request fails outright.
    pub async fn try_get_guild_member(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
    ) -> Result<Option<Member>> {
        if guild_id.value() == 0 {
            return Ok(None);
        }

        let wire = self
            .try_request_json::<MemberWire>(
                &format!("guilds/{guild_id}/members/{user_id}"),
                "member",
            )
            .await?;

        Ok(wire.map(|wire| Member::from_wire(wire, guild_id)))
    }

    /// Resolves an invite code, or `None` when it is invalid or expired.
    ///
    /// # Errors
    ///
    /// This function will return an error if the request fails outright.
    pub async fn try_get_invite(&self, code: &str) -> Result<Option<Invite>> {
        self.try_request_json(&format!("invites/{code}"), "invite").await
    }

    /// Streams the guilds visible to the current token, ascending by
    /// identifier.
    pub fn get_user_guilds(&self) -> impl Stream<Item = Result<Guild>> + '_ {
        try_stream! {
            let mut cursor = Snowflake::new(0);

            loop {
                let route = format!("users/@me/guilds?limit={PAGE_SIZE}&after={cursor}");
                let page: Vec<Guild> = self.request_json(&route, "guild list").await?;
                let short_page = page.len() < PAGE_SIZE;

                for guild in page {
                    cursor = guild.id;

                    yield guild;
                }

                if short_page {
                    break;
                }
            }
        }
    }

    /// Streams a guild's channels with category parents attached, ordered by
    /// position.
    pub fn get_guild_channels(&self, guild_id: Snowflake) -> impl Stream<Item = Result<Channel>> + '_ {
        try_stream! {
            let route = format!("guilds/{guild_id}/channels");
            let wires: Vec<ChannelWire> = self.request_json(&route, "channel list").await?;

            let mut categories = Vec::new();
            let mut others = Vec::new();

            for wire in wires {
                if wire.kind().is_category() {
                    categories.push(Channel::from_wire(wire, None));
                } else {
                    others.push(wire);
                }
            }

            let mut channels: Vec<Channel> = others
                .into_iter()
                .map(|wire| {
                    let parent = wire
                        .parent_id()
                        .and_then(|id| categories.iter().find(|category| category.id == id))
                        .cloned();

                    Channel::from_wire(wire, parent)
                })
                .collect();

            channels.sort_by_key(|channel| (channel.position, channel.id));

            for channel in channels {
                yield channel;
            }
        }
    }

    /// Streams a guild's active threads.
    pub fn get_guild_threads(&self, guild_id: Snowflake) -> impl Stream<Item = Result<Channel>> + '_ {
        try_stream! {
            #[derive(serde::Deserialize)]
            struct ActiveThreads {
                #[serde(default)]
                threads: Vec<ChannelWire>,
            }

            let route = format!("guilds/{guild_id}/threads/active");
            let page: ActiveThreads = self.request_json(&route, "thread list").await?;

            for wire in page.threads {
                yield Channel::from_wire(wire, None);
            }
        }
    }

    /// Streams a guild's roles.
    pub fn get_guild_roles(&self, guild_id: Snowflake) -> impl Stream<Item = Result<Role>> + '_ {
        try_stream! {
            if guild_id.value() != 0 {
                let route = format!("guilds/{guild_id}/roles");
                let roles: Vec<Role> = self.request_json(&route, "role list").await?;

                for role in roles {
                    yield role;
                }
            }
        }
    }

    /// Probes the newest message at or below the `before` bound, or `None`
    /// when the range is empty.
    async fn try_get_last_message(
        &self,
        channel_id: Snowflake,
        before: Option<Snowflake>,
    ) -> Result<Option<Message>> {
        let route = before.map_or_else(
            || format!("channels/{channel_id}/messages?limit=1"),
            |before| format!("channels/{channel_id}/messages?limit=1&before={before}"),
        );
        let page: Vec<Message> = self.request_json(&route, "message list").await?;

        Ok(page.into_iter().next())
    }

    /// Detects the missing message-content intent from a page of messages.
    ///
    /// A bot without the intent receives every user message with empty
    /// content. When a whole page looks like that, the application flags are
    /// probed once to distinguish "intent disabled" from "genuinely empty".
    async fn check_content_intent(&self, page: &[Message]) -> Result {
        let suspicious = !page.is_empty()
            && page.iter().all(Message::is_empty)
            && page.iter().any(|message| !message.is_system_notification());

        if !suspicious || self.token_kind().await? != TokenKind::Bot {
            return Ok(());
        }

        let application = self.try_get_application().await?;

        if application.is_some_and(|application| !application.has_message_content_intent()) {
            return Err(Error::MissingContentIntent);
        }

        Ok(())
    }

    /// Streams a channel's messages in ascending identifier order.
    ///
    /// Pages are fetched on demand with no prefetch; the upstream returns
    /// newest-first pages, which are reversed before yielding. Progress, when
    /// a callback is given, is the yielded message's position between the
    /// first yielded timestamp and the probed end of range, clamped to
    /// `0.0..=1.0`.
    pub fn get_messages<'c>(
        &'c self,
        channel_id: Snowflake,
        after: Option<Snowflake>,
        before: Option<Snowflake>,
        on_progress: Option<&'c (dyn Fn(f64) + Send + Sync)>,
    ) -> impl Stream<Item = Result<Message>> + 'c {
        try_stream! {
            let Some(last) = self.try_get_last_message(channel_id, before).await? else {
                return;
            };
            let last_timestamp = last.timestamp;
            let mut cursor = after.unwrap_or_else(|| Snowflake::new(0));
            let mut first_timestamp: Option<DateTime<Utc>> = None;

            // Cancellation aborts between pages through the per-request check
            // in `request`.
            'pages: loop {
                let route =
                    format!("channels/{channel_id}/messages?limit={PAGE_SIZE}&after={cursor}");
                let page: Vec<Message> = self.request_json(&route, "message list").await?;
                let short_page = page.len() < PAGE_SIZE;

                self.check_content_intent(&page).await?;

                for message in page.into_iter().rev() {
                    if before.is_some_and(|before| message.id > before) {
                        break 'pages;
                    }

                    cursor = message.id;

                    let first = *first_timestamp.get_or_insert(message.timestamp);

                    if let Some(callback) = on_progress {
                        let total = (last_timestamp - first).num_milliseconds();
                        let elapsed = (message.timestamp - first).num_milliseconds();
                        #[allow(clippy::cast_precision_loss)]
                        let progress = if total <= 0 {
                            1.0
                        } else {
                            (elapsed as f64 / total as f64).clamp(0.0, 1.0)
                        };

                        callback(progress);
                    }

                    yield message;
                }

                if short_page {
                    break;
                }
            }
        }
    }

    /// Streams the users behind one reaction, ascending by identifier.
    pub fn get_message_reactions<'c>(
        &'c self,
        channel_id: Snowflake,
        message_id: Snowflake,
        reaction: &Reaction,
    ) -> impl Stream<Item = Result<User>> + 'c {
        let emoji = reaction.emoji_endpoint_path();

        try_stream! {
            let mut cursor = Snowflake::new(0);

            loop {
                let route = format!(
                    "channels/{channel_id}/messages/{message_id}/reactions/{emoji}?limit={PAGE_SIZE}&after={cursor}"
                );
                let page: Vec<User> = self.request_json(&route, "reaction user list").await?;
                let short_page = page.len() < PAGE_SIZE;

                for user in page {
                    cursor = user.id;

                    yield user;
                }

                if short_page {
                    break;
                }
            }
        }
    }
}
