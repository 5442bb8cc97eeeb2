//! The export pipeline: client → batcher → member resolver → filter → sink.

use std::path::PathBuf;
use std::sync::Arc;

use futures_util::{pin_mut, TryStreamExt};

use crate::api::ApiClient;
use crate::model::{ChannelKind, Message, User};
use crate::request::{ExportRequest, ProgressFn};
use crate::{Error, Result};

pub use self::context::ExportContext;
mod context;

pub use self::limit::{FileSize, LimitError, PartitionLimit};
mod limit;

pub use self::sink::PartitionedSink;
mod sink;

mod assets;
pub(crate) mod path;

/// How many messages are buffered before members resolve and writes happen.
const BATCH_SIZE: usize = 50;

/// Exports one channel to local files.
///
/// Messages stream in ascending order, buffer into batches of fifty, have
/// their referenced members resolved with bounded concurrency, pass the
/// configured filter, and land in the partitioned sink. The optional callback
/// receives advisory progress in `0.0..=1.0`.
///
/// # Errors
///
/// This function will return an error when the export cannot proceed; check
/// [`Error::is_fatal`] to distinguish job-fatal failures from skippable ones.
/// [`Error::ChannelEmpty`] still leaves a header-and-footer file on disk.
pub async fn export_channel(request: ExportRequest, on_progress: Option<ProgressFn>) -> Result {
    let client = Arc::new(ApiClient::new(
        request.token.clone(),
        request.rate_limit_preference,
        request.cancellation.clone(),
    )?);
    let channel = client.get_channel(request.channel_id).await?;

    if channel.kind == ChannelKind::Forum {
        return Err(Error::UnsupportedChannel(channel.id));
    }

    let guild = client.get_guild(channel.guild_id).await?;
    let base_path = resolve_base_path(&request, &guild, &channel);

    tracing::debug!(
        guild = %guild.name,
        channel = %channel.full_name(),
        path = %base_path.display(),
        "starting export",
    );

    let mut context =
        ExportContext::new(Arc::clone(&client), request, guild, channel, &base_path);

    context.populate_channels_and_roles().await?;

    let mut sink = PartitionedSink::new(
        base_path,
        context.request().format,
        context.request().partition_limit,
    );

    let after = context.request().after;
    let before = context.request().before;
    let out_of_range = context.channel().is_empty()
        || after.is_some_and(|after| !context.channel().may_have_messages_after(after))
        || before.is_some_and(|before| !context.channel().may_have_messages_before(before));

    if out_of_range {
        sink.dispose(&context).await?;

        return Err(Error::ChannelEmpty(context.channel().id));
    }

    let progress = on_progress.as_deref();
    let result = run_pipeline(&client, &mut context, &mut sink, progress).await;

    match result {
        Ok(()) if sink.messages_total() == 0 => {
            sink.dispose(&context).await?;

            Err(Error::ChannelEmpty(context.channel().id))
        }
        Ok(()) => sink.dispose(&context).await,
        Err(error) => Err(error),
    }
}

/// Drives the message stream through batching, resolution, filtering, and
/// the sink.
async fn run_pipeline(
    client: &ApiClient,
    context: &mut ExportContext,
    sink: &mut PartitionedSink,
    on_progress: Option<&(dyn Fn(f64) + Send + Sync)>,
) -> Result {
    let channel_id = context.channel().id;
    let after = context.request().after;
    let before = context.request().before;
    let cancellation = context.request().cancellation.clone();

    let stream = client.get_messages(channel_id, after, before, on_progress);

    pin_mut!(stream);

    let mut batch: Vec<Message> = Vec::with_capacity(BATCH_SIZE);

    while let Some(message) = stream.try_next().await? {
        batch.push(message);

        if batch.len() >= BATCH_SIZE {
            flush_batch(context, sink, &mut batch).await?;
        }
        if cancellation.is_cancelled() {
            return Err(Error::Cancelled);
        }
    }

    flush_batch(context, sink, &mut batch).await
}

/// Resolves a batch's referenced members, then writes its filtered messages.
async fn flush_batch(
    context: &mut ExportContext,
    sink: &mut PartitionedSink,
    batch: &mut Vec<Message>,
) -> Result {
    if batch.is_empty() {
        return Ok(());
    }

    let mut referenced: Vec<User> = Vec::new();

    for message in batch.iter() {
        for user in message.referenced_users() {
            if !referenced.iter().any(|seen| seen.id == user.id) {
                referenced.push(user.clone());
            }
        }
    }

    context.populate_members(referenced).await?;

    let guild_id = context.guild().id;
    let channel_id = context.channel().id;

    for message in batch.drain(..) {
        if !context.request().message_filter.matches(&message) {
            continue;
        }

        sink.write_message(context, &message)
            .await
            .map_err(|error| error.while_writing(guild_id, channel_id, message.id))?;
    }

    Ok(())
}

/// Decides where the export lands: an explicit file path (with `%` templates
/// expanded) or a default name under a directory.
fn resolve_base_path(
    request: &ExportRequest,
    guild: &crate::model::Guild,
    channel: &crate::model::Channel,
) -> PathBuf {
    let raw = request.output_path.to_string_lossy();
    let treat_as_directory = raw.is_empty()
        || raw.ends_with(std::path::MAIN_SEPARATOR)
        || raw.ends_with('/')
        || request.output_path.is_dir();

    let expanded = path::expand_template(&raw, guild, channel, request.after, request.before);

    if treat_as_directory {
        let name = path::default_file_name(
            guild,
            channel,
            request.after,
            request.before,
            request.format.extension(),
        );

        PathBuf::from(expanded).join(name)
    } else {
        PathBuf::from(expanded)
    }
}
