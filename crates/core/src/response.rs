//! Response envelope and the streamed-body result.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::stream::{Stream, StreamExt, TryStreamExt};
use reqwest::header::HeaderMap;
use tokio_util::io::StreamReader;

/// Status, headers and decoded result of one operation.
///
/// `result` is `None` when the server sent an empty body, never a
/// zero-valued model.
#[derive(Debug, Clone)]
pub struct DetailedResponse<T> {
    /// HTTP status code.
    pub status_code: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Decoded body, if any.
    pub result: Option<T>,
}

impl<T> DetailedResponse<T> {
    /// Borrow the decoded result.
    pub fn result(&self) -> Option<&T> {
        self.result.as_ref()
    }

    /// Take the decoded result, dropping status and headers.
    pub fn into_result(self) -> Option<T> {
        self.result
    }

    /// First value of a response header, if it is valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Replace the result, keeping status and headers.
    pub fn map<U, F>(self, f: F) -> DetailedResponse<U>
    where
        F: FnOnce(T) -> U,
    {
        DetailedResponse {
            status_code: self.status_code,
            headers: self.headers,
            result: self.result.map(f),
        }
    }
}

type BoxedByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// An unparsed response body, read incrementally.
///
/// Returned by download operations. Consume it as a [`Stream`] of chunks,
/// wrap it with [`ByteStream::into_async_read`], or collect it with
/// [`ByteStream::bytes`]. Dropping it closes the underlying connection.
pub struct ByteStream {
    inner: BoxedByteStream,
}

impl ByteStream {
    /// Wrap any stream of byte chunks.
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
        }
    }

    pub(crate) fn from_response(response: reqwest::Response) -> Self {
        Self::new(response.bytes_stream().map_err(io::Error::other))
    }

    /// A stream over an in-memory buffer.
    pub fn from_static(bytes: &'static [u8]) -> Self {
        Self::new(futures::stream::once(async move {
            Ok(Bytes::from_static(bytes))
        }))
    }

    /// Read the remaining body into memory.
    pub async fn bytes(mut self) -> io::Result<Bytes> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.inner.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    /// Adapt to `tokio::io::AsyncRead`.
    pub fn into_async_read(self) -> StreamReader<Self, Bytes> {
        StreamReader::new(self)
    }
}

impl Stream for ByteStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteStream").finish_non_exhaustive()
    }
}
