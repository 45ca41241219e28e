use std::fmt;

use bytes::Bytes;

/// An ordered sequence of frames exchanged atomically over a socket.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Multipart {
    parts: Vec<Bytes>,
}

impl Multipart {
    /// Create an empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a message from anything that converts into frames.
    pub fn from_parts<I, B>(parts: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }

    /// Append a frame.
    pub fn push(&mut self, part: impl Into<Bytes>) {
        self.parts.push(part.into());
    }

    /// Prepend a frame (used by routers to attach a peer identity).
    pub fn push_front(&mut self, part: impl Into<Bytes>) {
        self.parts.insert(0, part.into());
    }

    /// Remove and return the first frame.
    pub fn pop_front(&mut self) -> Option<Bytes> {
        if self.parts.is_empty() {
            None
        } else {
            Some(self.parts.remove(0))
        }
    }

    /// Borrow a frame by index.
    pub fn get(&self, index: usize) -> Option<&Bytes> {
        self.parts.get(index)
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether the message has no frames.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Iterate over frames.
    pub fn iter(&self) -> std::slice::Iter<'_, Bytes> {
        self.parts.iter()
    }

    /// Total payload bytes across all frames.
    pub fn payload_size(&self) -> usize {
        self.parts.iter().map(Bytes::len).sum()
    }

    /// Consume the message and return its frames.
    pub fn into_parts(self) -> Vec<Bytes> {
        self.parts
    }
}

impl From<Vec<Bytes>> for Multipart {
    fn from(parts: Vec<Bytes>) -> Self {
        Self { parts }
    }
}

impl IntoIterator for Multipart {
    type Item = Bytes;
    type IntoIter = std::vec::IntoIter<Bytes>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.into_iter()
    }
}

impl fmt::Debug for Multipart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Payloads may be large or binary; show sizes only.
        let sizes: Vec<usize> = self.parts.iter().map(Bytes::len).collect();
        f.debug_struct("Multipart")
            .field("frames", &self.parts.len())
            .field("sizes", &sizes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_front_and_pop_front_route_identity() {
        let mut msg = Multipart::from_parts([
            Bytes::new(),
            Bytes::from_static(b"rid-1"),
            Bytes::from_static(b"echo"),
        ]);
        msg.push_front(Bytes::from_static(b"peer-7"));
        assert_eq!(msg.len(), 4);
        assert_eq!(msg.pop_front().as_deref(), Some(&b"peer-7"[..]));
        assert_eq!(msg.get(1).map(Bytes::as_ref), Some(&b"rid-1"[..]));
    }

    #[test]
    fn debug_output_hides_payloads() {
        let msg = Multipart::from_parts([Bytes::from_static(b"secret-token")]);
        let rendered = format!("{msg:?}");
        assert!(rendered.contains("frames: 1"));
        assert!(!rendered.contains("secret-token"));
    }

    #[test]
    fn pop_front_on_empty_is_none() {
        let mut msg = Multipart::new();
        assert!(msg.pop_front().is_none());
        assert_eq!(msg.payload_size(), 0);
    }
}
