//! NDJSON framing of settled records, with optional streaming compression.
//!
//! Each [`BatchResult`] is serialized independently and atomically as one
//! JSON object followed by a newline; records are never split or merged, and
//! upstream order (completion order) is preserved. When deflate is selected,
//! every line passes through a single zlib encoder that lives as long as the
//! stream, with a sync flush per record so bytes reach the transport as soon
//! as the record settles rather than once over a buffered response.

use crate::{BatchResult, Error, Result};
use bytes::Bytes;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use futures::Stream;
use pin_project_lite::pin_project;
use std::io::Write;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

/// Wire encoding applied to the record stream.
///
/// Deflate is the default; callers opt out per request (see the transport
/// glue for the header polarity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// zlib-wrapped DEFLATE, flushed at every record boundary.
    #[default]
    Deflate,
    /// Plain NDJSON bytes.
    Identity,
}

impl Encoding {
    pub const fn is_deflate(self) -> bool {
        matches!(self, Self::Deflate)
    }

    /// Value for the `Content-Encoding` response header, if any.
    pub const fn content_encoding(self) -> Option<&'static str> {
        match self {
            Self::Deflate => Some("deflate"),
            Self::Identity => None,
        }
    }
}

pin_project! {
    /// Converts a stream of settled [`BatchResult`]s into wire-ready byte
    /// frames.
    ///
    /// Yields one frame per record (plus a trailing zlib frame when
    /// compressed). A frame is fully produced before the next upstream record
    /// is accepted; backpressure beyond that is the upstream channel's bound.
    ///
    /// A serialization or compression defect terminates the stream with an
    /// error after the frames already yielded; those stand and are not
    /// retracted.
    pub struct RecordStream<S> {
        #[pin]
        results: S,
        encoder: Option<ZlibEncoder<Vec<u8>>>,
        done: bool,
    }
}

impl<S> RecordStream<S>
where
    S: Stream<Item = BatchResult>,
{
    pub fn new(results: S, encoding: Encoding) -> Self {
        let encoder = match encoding {
            Encoding::Deflate => Some(ZlibEncoder::new(Vec::new(), Compression::fast())),
            Encoding::Identity => None,
        };
        Self {
            results,
            encoder,
            done: false,
        }
    }
}

impl<S> Stream for RecordStream<S>
where
    S: Stream<Item = BatchResult>,
{
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        if *this.done {
            return Poll::Ready(None);
        }

        match ready!(this.results.poll_next(cx)) {
            Some(record) => match encode_record(&record, this.encoder.as_mut()) {
                Ok(frame) => Poll::Ready(Some(Ok(frame))),
                Err(e) => {
                    *this.done = true;
                    Poll::Ready(Some(Err(e)))
                }
            },
            None => {
                // All items settled. Close the zlib stream, emitting its
                // trailer as the final frame.
                *this.done = true;
                match this.encoder.take() {
                    Some(encoder) => match encoder.finish() {
                        Ok(tail) if tail.is_empty() => Poll::Ready(None),
                        Ok(tail) => Poll::Ready(Some(Ok(Bytes::from(tail)))),
                        Err(e) => Poll::Ready(Some(Err(Error::Compress(e)))),
                    },
                    None => Poll::Ready(None),
                }
            }
        }
    }
}

fn encode_record(record: &BatchResult, encoder: Option<&mut ZlibEncoder<Vec<u8>>>) -> Result<Bytes> {
    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');

    match encoder {
        Some(encoder) => {
            encoder.write_all(&line)?;
            // Sync flush so this record's bytes are decodable immediately,
            // without waiting for the stream to end.
            encoder.flush()?;
            Ok(Bytes::from(std::mem::take(encoder.get_mut())))
        }
        None => Ok(Bytes::from(line)),
    }
}
