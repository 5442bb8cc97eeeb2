use std::path::PathBuf;

use super::context::ExportContext;
use super::limit::PartitionLimit;
use super::path::partition_path;
use crate::model::Message;
use crate::request::ExportFormat;
use crate::writer::{create_writer, MessageWriter};
use crate::Result;

/// Owns the current format writer and rolls output over into numbered
/// partitions when the configured limit trips.
///
/// The first partition keeps the base path; partition `N` (1-based) injects
/// `" [part N]"` before the extension. Disposal with zero writes still
/// produces a file holding just the preamble and postamble.
pub struct PartitionedSink {
    base_path: PathBuf,
    format: ExportFormat,
    limit: PartitionLimit,
    partition_index: u64,
    writer: Option<Box<dyn MessageWriter>>,
    messages_total: u64,
}

impl PartitionedSink {
    /// Creates a sink; no file is opened until the first write or disposal.
    #[must_use]
    pub fn new(base_path: PathBuf, format: ExportFormat, limit: PartitionLimit) -> Self {
        Self { base_path, format, limit, partition_index: 0, writer: None, messages_total: 0 }
    }

    /// Returns how many messages were written across every partition.
    #[must_use]
    pub const fn messages_total(&self) -> u64 {
        self.messages_total
    }

    /// Returns the path of the partition currently being written.
    #[must_use]
    pub fn current_path(&self) -> PathBuf {
        partition_path(&self.base_path, self.partition_index)
    }

    async fn open_writer(&mut self, context: &ExportContext) -> Result<&mut Box<dyn MessageWriter>> {
        if self.writer.is_none() {
            let path = self.current_path();
            let mut writer = create_writer(self.format, &path).await?;

            writer.write_preamble(context).await?;

            self.writer = Some(writer);
        }

        // Just stored above, so the unwrap cannot fail.
        #[allow(clippy::unwrap_used)]
        let writer = self.writer.as_mut().unwrap();

        Ok(writer)
    }

    /// Closes the current partition, writing its postamble.
    async fn close_writer(&mut self, context: &ExportContext) -> Result {
        if let Some(mut writer) = self.writer.take() {
            writer.write_postamble(context).await?;
            writer.flush().await?;
        }

        Ok(())
    }

    /// Writes one message, rolling over first when the partition is full.
    ///
    /// # Errors
    ///
    /// This function will return an error if a writer operation fails.
    pub async fn write_message(&mut self, context: &ExportContext, message: &Message) -> Result {
        let full = self.writer.as_ref().is_some_and(|writer| {
            self.limit.is_reached(writer.messages_written(), writer.bytes_written())
        });

        if full {
            self.close_writer(context).await?;
            self.partition_index += 1;

            tracing::debug!(path = %self.current_path().display(), "rolling over to a new partition");
        }

        let writer = self.open_writer(context).await?;

        writer.write_message(context, message).await?;
        self.messages_total += 1;

        Ok(())
    }

    /// Finishes the export, ensuring at least one file exists.
    ///
    /// # Errors
    ///
    /// This function will return an error if closing the writer fails.
    pub async fn dispose(&mut self, context: &ExportContext) -> Result {
        self.open_writer(context).await?;
        self.close_writer(context).await
    }
}
