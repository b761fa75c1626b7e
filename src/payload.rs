//! Message payloads exchanged with the application.
//!
//! A payload is either a single opaque frame or an ordered sequence of
//! frames. The distinction is preserved end to end: a single part sent is
//! delivered as a single part, N parts sent are delivered as N parts.

use bytes::Bytes;

/// A single-part or multipart message.
///
/// # Examples
///
/// ```
/// use driveshaft::Payload;
///
/// let single = Payload::from("hello");
/// assert_eq!(single.frames().len(), 1);
///
/// let multi = Payload::multipart(["topic", "body"]);
/// assert_eq!(multi.frames().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// One opaque frame.
    Single(Bytes),
    /// An ordered sequence of frames.
    Multipart(Vec<Bytes>),
}

impl Payload {
    /// Build a single-part payload.
    #[must_use]
    pub fn single(frame: impl Into<Bytes>) -> Self {
        Self::Single(frame.into())
    }

    /// Build a multipart payload from an iterator of frames.
    #[must_use]
    pub fn multipart<I, T>(frames: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Bytes>,
    {
        Self::Multipart(frames.into_iter().map(Into::into).collect())
    }

    /// Build a payload from raw frames, collapsing a one-element vector
    /// to [`Payload::Single`].
    #[must_use]
    pub fn from_frames(mut frames: Vec<Bytes>) -> Self {
        if frames.len() == 1 {
            Self::Single(frames.remove(0))
        } else {
            Self::Multipart(frames)
        }
    }

    /// View the frames in order.
    #[must_use]
    pub fn frames(&self) -> &[Bytes] {
        match self {
            Self::Single(frame) => std::slice::from_ref(frame),
            Self::Multipart(frames) => frames,
        }
    }

    /// Consume the payload and return its frames.
    #[must_use]
    pub fn into_frames(self) -> Vec<Bytes> {
        match self {
            Self::Single(frame) => vec![frame],
            Self::Multipart(frames) => frames,
        }
    }

    /// Number of frames.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Multipart(frames) => frames.len(),
        }
    }

    /// Check whether the payload carries no frames at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(_) => false,
            Self::Multipart(frames) => frames.is_empty(),
        }
    }

    /// Check whether the payload is multipart.
    #[must_use]
    pub const fn is_multipart(&self) -> bool {
        matches!(self, Self::Multipart(_))
    }
}

impl From<Bytes> for Payload {
    fn from(frame: Bytes) -> Self {
        Self::Single(frame)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(frame: Vec<u8>) -> Self {
        Self::Single(Bytes::from(frame))
    }
}

impl From<&str> for Payload {
    fn from(frame: &str) -> Self {
        Self::Single(Bytes::copy_from_slice(frame.as_bytes()))
    }
}

impl From<Vec<Bytes>> for Payload {
    fn from(frames: Vec<Bytes>) -> Self {
        Self::from_frames(frames)
    }
}
