use bytes::Bytes;

/// An immutable view of a byte sequence handed out of a cache.
///
/// `Bytes` already gives us cheap, reference-counted clones for internal
/// sharing (the LRU map, its recency-list node, and any outstanding reader
/// all hold the same backing allocation); [`ByteView::to_vec`] is the only
/// place a fresh, independently-owned copy is produced, matching the Go
/// original's `ByteSlice` defensive copy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ByteView {
    bytes: Bytes,
}

impl ByteView {
    /// Wraps an owned buffer that the backing source still holds a
    /// reference to. The caller must not assume a subsequent mutation of
    /// `bytes` leaves the view unaffected unless `bytes` was already cloned
    /// for this call.
    pub fn from_backing(bytes: Vec<u8>) -> Self {
        Self { bytes: Bytes::from(bytes) }
    }

    /// Wraps a buffer that was just received over the wire and is not
    /// referenced by anything else, so no further copy is needed.
    pub fn from_network(bytes: Vec<u8>) -> Self {
        Self { bytes: Bytes::from(bytes) }
    }

    /// Number of bytes in the view.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the view is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns a fresh, independently-owned copy of the bytes. Mutating the
    /// returned buffer never affects this view or any other holder of it.
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }

    /// Borrowed view of the underlying bytes, for callers that only read.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Decodes the view as UTF-8, replacing invalid sequences the way
    /// `String::from_utf8_lossy` does.
    pub fn to_string_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

impl From<Bytes> for ByteView {
    fn from(bytes: Bytes) -> Self {
        Self { bytes }
    }
}
