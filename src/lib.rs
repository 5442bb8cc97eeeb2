//! Implements an export engine that archives Discord chat history into local
//! files.
//!
//! An export streams one channel's messages through a rate-limited paginated
//! client, resolves the members they reference with bounded concurrency,
//! applies an optional filter expression, and hands each surviving message to
//! a partitioned format writer. The crate is the engine only: argument
//! parsing, progress display, and subscriber installation belong to the host.
#![deny(clippy::expect_used, clippy::panic, clippy::unwrap_used)]
#![warn(clippy::nursery, clippy::pedantic, clippy::todo)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod export;
pub mod filter;
pub mod model;
pub mod writer;

pub use self::error::*;
mod error;

pub use self::request::*;
mod request;

pub use self::snowflake::Snowflake;
mod snowflake;

/// Discord's identifier epoch in milliseconds since the Unix epoch, or the
/// first second of 2015.
pub const DISCORD_EPOCH_MS: i64 = 1_420_070_400_000;
/// Discord REST endpoint base URL.
pub const API_BASE: &str = "https://discord.com/api/v10";
/// Discord content delivery network endpoint base URL.
pub const CDN_BASE: &str = "https://cdn.discordapp.com";

pub use self::export::export_channel;
