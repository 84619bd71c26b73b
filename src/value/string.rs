//! Heap string payload.
//!
//! Grounded on the host crate's `object/string.rs`, minus the `beef::Cow`:
//! every string here is produced by copying bytes onto the heap (there is
//! no borrowed/`'static` variant to make a `Cow` worthwhile), so a plain
//! owned `Box<[u8]>` is the whole story.

pub(crate) struct Str {
    bytes: Box<[u8]>,
}

impl Str {
    pub(crate) fn new(bytes: Box<[u8]>) -> Self {
        Self { bytes }
    }

    /// Bytes up to (not including) the first NUL, or the whole buffer if
    /// none is present. `make_string` appends a synthesized NUL;
    /// `make_string_n` doesn't, so comparisons and truthiness checks treat
    /// the payload as NUL-terminated-if-present rather than assuming one
    /// exists, matching `strcmp`-style semantics without depending on it.
    pub(crate) fn logical_bytes(&self) -> &[u8] {
        let end = self.bytes.iter().position(|&b| b == 0).unwrap_or(self.bytes.len());
        &self.bytes[..end]
    }
}
