use core::time::Duration;
use futures::FutureExt;
use futures::future::BoxFuture;
use ndmux::{BatchItem, HandlerError, ItemHandler, NormalizedError};
use serde_json::Value;

/// Reference item handler wired into the standalone binary.
///
/// Echoes each item's payload back as its result. Two optional fields make it
/// useful for exercising the stream from the outside:
///
/// - `delay_ms` (number): sleep before settling, for observing completion
///   order versus submission order.
/// - `fail` (string): settle with a failure carrying this message, for
///   observing error records.
pub struct EchoHandler;

impl ItemHandler for EchoHandler {
    fn handle(&self, item: BatchItem) -> BoxFuture<'static, Result<Value, HandlerError>> {
        async move {
            let delay = item.get("delay_ms").and_then(Value::as_u64).unwrap_or(0);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            if let Some(message) = item.get("fail").and_then(Value::as_str) {
                return Err(NormalizedError::with_code(message, "echo_failure").into());
            }

            Ok(item)
        }
        .boxed()
    }
}
