//! A stream that releases its input a few bytes at a time.

use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
};

use bytes::{Buf, Bytes};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// In-memory stream yielding at most `chunk` bytes per read.
///
/// Reads return EOF once the input is exhausted. Writes are collected and
/// available through [`ChunkedStream::written`].
#[derive(Debug)]
pub struct ChunkedStream {
    input: Bytes,
    chunk: usize,
    output: Vec<u8>,
}

impl ChunkedStream {
    /// Serve `input` in pieces of `chunk` bytes. A `chunk` of 0 is raised
    /// to 1.
    #[must_use]
    pub fn new(input: impl Into<Bytes>, chunk: usize) -> Self {
        Self {
            input: input.into(),
            chunk: chunk.max(1),
            output: Vec::new(),
        }
    }

    /// Bytes written to the stream so far.
    #[must_use]
    pub fn written(&self) -> &[u8] { &self.output }
}

impl AsyncRead for ChunkedStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let n = self.chunk.min(self.input.remaining()).min(buf.remaining());
        let piece = self.input.split_to(n);
        buf.put_slice(&piece);
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for ChunkedStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.output.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
