//! Concurrent fan-out of batch items to their handler.
//!
//! Every item is started eagerly, back-to-back, without awaiting any sibling.
//! Each settlement (success, error, or panic) is wrapped as a [`BatchResult`]
//! and pushed into a bounded channel whose receiving half is the response
//! stream. The channel closes on its own once the last item settles, which is
//! what terminates the stream.

use crate::{BatchItem, BatchRequest, BatchResult, NormalizedError};
use core::future::Future;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Failure value a handler may settle with. Projected onto
/// [`NormalizedError`] before it reaches the wire.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Caller-supplied asynchronous unit of work for one batch item.
///
/// The multiplexer is generic over this trait: it imposes no ordering or rate
/// limit between invocations, so any concurrency bound is the handler's own
/// business. Plain async closures implement it via the blanket impl below.
pub trait ItemHandler: Send + Sync + 'static {
    fn handle(&self, item: BatchItem) -> BoxFuture<'static, Result<Value, HandlerError>>;
}

impl<F, Fut> ItemHandler for F
where
    F: Fn(BatchItem) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
{
    fn handle(&self, item: BatchItem) -> BoxFuture<'static, Result<Value, HandlerError>> {
        (self)(item).boxed()
    }
}

/// Dispatches every item of `batch` to `handler` and returns the stream of
/// settlements in completion order.
///
/// Invariants upheld here:
///
/// - The handler is invoked exactly once per item.
/// - Exactly one [`BatchResult`] is produced per item, carrying the item's
///   submission index, regardless of how the handler settles. A panic is
///   caught and reported like any other failure.
/// - No item's emission waits on another item's completion; `buffer` only
///   bounds how many settled records may sit unconsumed before producers
///   back off.
///
/// Dropping the returned stream closes the channel: handlers already running
/// continue to their natural end, but their results are discarded instead of
/// being written to a dead transport.
///
/// Must be called from within a tokio runtime.
pub fn dispatch<H>(batch: BatchRequest, handler: &Arc<H>, buffer: usize) -> ReceiverStream<BatchResult>
where
    H: ItemHandler,
{
    let (tx, rx) = mpsc::channel(buffer.max(1));

    for (id, item) in batch.batch.into_iter().enumerate() {
        let tx = tx.clone();
        let handler = Arc::clone(handler);

        tokio::spawn(async move {
            let settled = match AssertUnwindSafe(handler.handle(item)).catch_unwind().await {
                Ok(Ok(payload)) => BatchResult::success(id, payload),
                Ok(Err(err)) => BatchResult::failure(id, NormalizedError::from_failure(err)),
                Err(panic) => BatchResult::failure(id, NormalizedError::from_panic(panic)),
            };

            if tx.send(settled).await.is_err() {
                // Receiver gone: the client disconnected mid-stream. The
                // result is discarded, not an error.
                tracing::debug!(id, "response stream closed before item settled");
            }
        });
    }

    // The spawned tasks hold the only remaining senders, so the channel (and
    // with it the stream) closes exactly when the last item settles.
    ReceiverStream::new(rx)
}
