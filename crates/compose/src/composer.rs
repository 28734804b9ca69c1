//! Stream composition: splices fragments into a template.
//!
//! The composed body is, byte for byte:
//!
//! ```text
//! template[..prefix_end] ++ open ++ f0 ++ f1 ++ … ++ close ++ template[suffix_start..]
//! ```
//!
//! Fragments are computed concurrently but emitted in the order supplied.
//! All of them are materialized before the returned stream yields its first
//! byte: if any producer fails, `compose` returns an error and nothing has
//! been sent, so the client gets a clean error instead of a truncated page.
//! Template slices are not copied; they stream lazily from the shared buffer.

use bytes::Bytes;
use futures::future::try_join_all;
use futures::stream::{Stream, StreamExt};
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::debug;

use portico_core::{ComposeError, Principal};

use crate::fragment::FragmentProducer;
use crate::locator::Offsets;
use crate::stream::{self, CompositeStream};

/// Default wrapper opening the fragment block.
pub const SCRIPT_OPEN: &[u8] = b"\n<script>\n";

/// Default wrapper closing the fragment block.
pub const SCRIPT_CLOSE: &[u8] = b"</script>\n\n";

/// Default upper bound for a single body chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

#[derive(Debug, Clone)]
pub struct Composer {
    open: Bytes,
    close: Bytes,
    chunk_size: usize,
}

impl Default for Composer {
    fn default() -> Self {
        Self {
            open: Bytes::from_static(SCRIPT_OPEN),
            close: Bytes::from_static(SCRIPT_CLOSE),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the literal wrappers around the fragment block.
    pub fn with_delimiters(mut self, open: impl Into<Bytes>, close: impl Into<Bytes>) -> Self {
        self.open = open.into();
        self.close = close.into();
        self
    }

    /// Cap the size of template chunks handed to the transport.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Compose a page for `principal`.
    ///
    /// Every producer runs exactly once. The first failure aborts the
    /// composition with [`ComposeError::Fragment`].
    pub async fn compose(
        &self,
        template: &Bytes,
        offsets: Offsets,
        producers: &[Arc<dyn FragmentProducer>],
        principal: &Principal,
    ) -> Result<ComposedPage, ComposeError> {
        offsets.check(template.len())?;

        let fragments = try_join_all(producers.iter().map(|producer| async move {
            producer
                .produce(principal)
                .await
                .map_err(|source| ComposeError::Fragment {
                    name: producer.name().to_string(),
                    source,
                })
        }))
        .await?;

        let prefix = template.slice(..offsets.prefix_end);
        let suffix = template.slice(offsets.suffix_start..);

        let content_length = prefix.len()
            + self.open.len()
            + fragments.iter().map(Bytes::len).sum::<usize>()
            + self.close.len()
            + suffix.len();

        debug!(
            principal = %principal,
            fragments = fragments.len(),
            content_length,
            "Page composed"
        );

        let mut body = CompositeStream::new().then(stream::chunked(prefix, self.chunk_size));
        body.push(stream::once(self.open.clone()));
        for fragment in fragments {
            body.push(stream::once(fragment));
        }
        body.push(stream::once(self.close.clone()));
        body.push(stream::chunked(suffix, self.chunk_size));

        Ok(ComposedPage {
            body,
            content_length: content_length as u64,
        })
    }
}

/// A fully prepared page body, streamed on demand.
pub struct ComposedPage {
    body: CompositeStream,
    content_length: u64,
}

impl ComposedPage {
    /// Exact number of bytes the stream will yield.
    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    /// Drain the stream into one buffer.
    pub async fn into_bytes(self) -> io::Result<Bytes> {
        let mut out = Vec::with_capacity(self.content_length as usize);
        let mut body = self.body;
        while let Some(chunk) = body.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(Bytes::from(out))
    }
}

impl Stream for ComposedPage {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().body).poll_next(cx)
    }
}
