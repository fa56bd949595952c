//! Response body types: buffered, streaming, and empty.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::Stream;
use http_body::Frame;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full, StreamBody};

use davgate_s3_model::output::StreamingBlob;

/// S3 response body.
///
/// Small payloads (XML documents, error bodies) are buffered; object
/// payloads stream straight from the WebDAV response so the gateway never
/// holds a whole object in memory on the GET path.
#[derive(Default)]
pub enum S3ResponseBody {
    /// Buffered body for XML payloads, error documents, raw bytes.
    Buffered(Full<Bytes>),
    /// Streaming body for object payloads.
    Streaming(UnsyncBoxBody<Bytes, io::Error>),
    /// Empty body for 204 responses, HEAD replies, DELETE confirmations.
    #[default]
    Empty,
}

impl S3ResponseBody {
    /// Create a buffered body from bytes.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::Buffered(Full::new(data.into()))
    }

    /// Create a buffered body from a UTF-8 string.
    #[must_use]
    pub fn from_string(s: impl Into<String>) -> Self {
        Self::Buffered(Full::new(Bytes::from(s.into())))
    }

    /// Create a buffered body from an XML byte vector.
    #[must_use]
    pub fn from_xml(xml: Vec<u8>) -> Self {
        Self::Buffered(Full::new(Bytes::from(xml)))
    }

    /// Create an empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::Empty
    }

    /// Create a streaming body from a byte stream.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        let frames = futures_util::TryStreamExt::map_ok(stream, Frame::data);
        Self::Streaming(BodyExt::boxed_unsync(StreamBody::new(frames)))
    }

    /// Create a streaming body from a backend object payload.
    #[must_use]
    pub fn from_blob(blob: StreamingBlob) -> Self {
        Self::from_stream(blob.into_stream())
    }
}

impl std::fmt::Debug for S3ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buffered(_) => f.write_str("S3ResponseBody::Buffered"),
            Self::Streaming(_) => f.write_str("S3ResponseBody::Streaming"),
            Self::Empty => f.write_str("S3ResponseBody::Empty"),
        }
    }
}

impl http_body::Body for S3ResponseBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            Self::Buffered(full) => Pin::new(full)
                .poll_frame(cx)
                .map_err(|never| match never {}),
            Self::Streaming(body) => Pin::new(body).poll_frame(cx),
            Self::Empty => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Buffered(full) => full.is_end_stream(),
            Self::Streaming(body) => body.is_end_stream(),
            Self::Empty => true,
        }
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self {
            Self::Buffered(full) => full.size_hint(),
            Self::Streaming(body) => body.size_hint(),
            Self::Empty => http_body::SizeHint::with_exact(0),
        }
    }
}
