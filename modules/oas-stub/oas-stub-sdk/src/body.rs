use std::pin::Pin;

use bytes::Bytes;
use futures_core::Stream;

/// Boxed error type for body stream errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A streaming body.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, BoxError>> + Send>>;

/// Body of a stubbed request or response.
///
/// - `Empty`: no body (GET, HEAD, or a response without content)
/// - `Bytes`: buffered body, the common case for synthesized JSON
/// - `Stream`: streaming body, used when a latency option paces the
///   response byte by byte, and for aborted connections
pub enum Body {
    /// No body.
    Empty,
    /// Fully buffered body.
    Bytes(Bytes),
    /// Streaming body.
    Stream(BodyStream),
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Empty => write!(f, "Body::Empty"),
            Body::Bytes(b) => write!(f, "Body::Bytes({} bytes)", b.len()),
            Body::Stream(_) => write!(f, "Body::Stream(...)"),
        }
    }
}

impl Body {
    /// Returns `true` if this is an empty body.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    /// Consume this body into `Bytes`, buffering a stream if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if a stream chunk fails.
    pub async fn into_bytes(self) -> Result<Bytes, BoxError> {
        match self {
            Body::Empty => Ok(Bytes::new()),
            Body::Bytes(b) => Ok(b),
            Body::Stream(mut s) => {
                use futures_util::StreamExt;
                let mut buf = Vec::new();
                while let Some(chunk) = s.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(Bytes::from(buf))
            }
        }
    }

    /// Extract the inner `BodyStream`, converting other variants as needed.
    pub fn into_stream(self) -> BodyStream {
        match self {
            Body::Empty => Box::pin(futures_util::stream::empty()),
            Body::Bytes(b) => Box::pin(futures_util::stream::once(async { Ok(b) })),
            Body::Stream(s) => s,
        }
    }
}

impl From<()> for Body {
    fn from((): ()) -> Self {
        Body::Empty
    }
}

impl From<Bytes> for Body {
    fn from(b: Bytes) -> Self {
        if b.is_empty() {
            Body::Empty
        } else {
            Body::Bytes(b)
        }
    }
}

impl From<Option<Bytes>> for Body {
    fn from(b: Option<Bytes>) -> Self {
        b.map_or(Body::Empty, Body::from)
    }
}

impl From<Vec<u8>> for Body {
    fn from(v: Vec<u8>) -> Self {
        Bytes::from(v).into()
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Bytes::from(s).into()
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Bytes::from(s).into()
    }
}

impl From<BodyStream> for Body {
    fn from(s: BodyStream) -> Self {
        Body::Stream(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bytes_becomes_empty_body() {
        assert!(Body::from(Bytes::new()).is_empty());
        assert!(Body::from(None::<Bytes>).is_empty());
    }

    #[test]
    fn debug_does_not_leak_content() {
        let body = Body::from(Bytes::from("{\"token\":\"abc\"}"));
        let debug = format!("{body:?}");
        assert!(debug.contains("15 bytes"));
        assert!(!debug.contains("token"));
    }

    #[tokio::test]
    async fn into_bytes_buffers_stream() {
        let chunks = vec![Ok(Bytes::from("{\"id\"")), Ok(Bytes::from(":1}"))];
        let stream: BodyStream = Box::pin(futures_util::stream::iter(chunks));
        let bytes = Body::Stream(stream).into_bytes().await.unwrap();
        assert_eq!(bytes, Bytes::from("{\"id\":1}"));
    }

    #[tokio::test]
    async fn into_bytes_surfaces_stream_error() {
        let chunks: Vec<Result<Bytes, BoxError>> =
            vec![Ok(Bytes::from("a")), Err("connection reset".into())];
        let stream: BodyStream = Box::pin(futures_util::stream::iter(chunks));
        let err = Body::Stream(stream).into_bytes().await.unwrap_err();
        assert_eq!(err.to_string(), "connection reset");
    }

    #[tokio::test]
    async fn into_stream_from_bytes_yields_single_chunk() {
        use futures_util::StreamExt;
        let mut stream = Body::from("pets").into_stream();
        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(chunk, Bytes::from("pets"));
        assert!(stream.next().await.is_none());
    }
}
