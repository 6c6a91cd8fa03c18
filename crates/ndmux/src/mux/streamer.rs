//! Per-request response stream construction.

use crate::{BatchRequest, BatchResult, Encoding, ItemHandler, RecordStream, dispatch};
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;

/// Default capacity of the channel between handler completions and the
/// serializer. Lower values increase backpressure responsiveness; higher
/// values let more settled records pipeline ahead of a slow consumer.
pub const DEFAULT_STREAM_BUFFER: usize = 8;

/// One multiplexer instance: a handler plus stream tuning.
///
/// There is no global registration; construct one of these wherever a batch
/// endpoint is wired up and call [`respond`](Self::respond) once per inbound
/// batch. Teardown is dropping the returned stream.
pub struct BatchStreamer<H> {
    handler: Arc<H>,
    buffer: usize,
}

impl<H> BatchStreamer<H>
where
    H: ItemHandler,
{
    pub fn new(handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
            buffer: DEFAULT_STREAM_BUFFER,
        }
    }

    /// Overrides the settled-record buffer capacity.
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }

    /// Dispatches `batch` and returns the response stream for it.
    ///
    /// Handlers start immediately; the stream yields one encoded record per
    /// item in completion order and terminates once every item has settled.
    pub fn respond(
        &self,
        batch: BatchRequest,
        encoding: Encoding,
    ) -> RecordStream<ReceiverStream<BatchResult>> {
        RecordStream::new(dispatch(batch, &self.handler, self.buffer), encoding)
    }
}
