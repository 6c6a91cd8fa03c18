//! Batch dispatch and response sequencing.
//!
//! This module contains the moving parts of the multiplexer:
//!
//! - [`dispatcher`] - fans each batch item out to its handler and collects
//!   settlements in completion order.
//! - [`encode`] - frames settlements as newline-delimited JSON, optionally
//!   through a streaming deflate encoder.
//! - [`streamer`] - ties the two together; one [`BatchStreamer`] produces one
//!   response stream per batch.

pub mod dispatcher;
pub mod encode;
pub mod streamer;

pub use dispatcher::{HandlerError, ItemHandler, dispatch};
pub use encode::{Encoding, RecordStream};
pub use streamer::{BatchStreamer, DEFAULT_STREAM_BUFFER};
