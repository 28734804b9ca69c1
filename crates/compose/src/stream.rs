//! Ordered composite byte stream.
//!
//! A `CompositeStream` is a queue of sub-streams exposed as one stream. Only
//! the front sub-stream is ever polled; the next one starts once the current
//! one is exhausted. Nothing is produced until the consumer polls, so an HTTP
//! body built from it follows the client's pace, and dropping it (client
//! disconnect) stops all further work.

use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A boxed source of body chunks.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// Sub-streams consumed strictly in order, presented as one stream.
#[derive(Default)]
pub struct CompositeStream {
    sources: VecDeque<ByteStream>,
    failed: bool,
}

impl CompositeStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sub-stream after all sources already queued.
    pub fn push(&mut self, source: ByteStream) {
        self.sources.push_back(source);
    }

    /// Builder form of [`push`](Self::push).
    pub fn then(mut self, source: ByteStream) -> Self {
        self.push(source);
        self
    }

    /// Sub-streams not yet exhausted, including the one in progress.
    pub fn remaining_sources(&self) -> usize {
        self.sources.len()
    }
}

impl FromIterator<ByteStream> for CompositeStream {
    fn from_iter<I: IntoIterator<Item = ByteStream>>(iter: I) -> Self {
        Self {
            sources: iter.into_iter().collect(),
            failed: false,
        }
    }
}

impl Stream for CompositeStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.failed {
            return Poll::Ready(None);
        }

        while let Some(front) = this.sources.front_mut() {
            match front.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) if chunk.is_empty() => continue,
                Poll::Ready(Some(Ok(chunk))) => return Poll::Ready(Some(Ok(chunk))),
                Poll::Ready(Some(Err(e))) => {
                    // An error ends the whole composite.
                    this.failed = true;
                    this.sources.clear();
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    this.sources.pop_front();
                }
                Poll::Pending => return Poll::Pending,
            }
        }

        Poll::Ready(None)
    }
}

/// A single-chunk source. Empty input yields nothing.
pub fn once(bytes: Bytes) -> ByteStream {
    stream::iter((!bytes.is_empty()).then_some(Ok::<_, io::Error>(bytes))).boxed()
}

/// Split `bytes` into zero-copy chunks of at most `chunk_size` bytes,
/// produced lazily on each poll.
pub fn chunked(bytes: Bytes, chunk_size: usize) -> ByteStream {
    let chunk_size = chunk_size.max(1);
    stream::unfold(bytes, move |mut rest| async move {
        if rest.is_empty() {
            return None;
        }
        let head = rest.split_to(chunk_size.min(rest.len()));
        Some((Ok::<_, io::Error>(head), rest))
    })
    .boxed()
}
