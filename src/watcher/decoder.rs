//! Incremental UTF-8 decoding across poll boundaries.

/// Invalid (not merely incomplete) UTF-8 was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidUtf8 {
    /// Offset of the first invalid byte, relative to the start of the
    /// bytes passed to [`Utf8Decoder::decode`] (pending carry included).
    pub offset: usize,
}

/// Decodes a byte stream that may be cut in the middle of a character.
///
/// An incomplete sequence at the end of a chunk is kept and prepended to
/// the next chunk.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes carried over to the next chunk.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Decode the next chunk.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidUtf8`] if the bytes contain an invalid sequence. The
    /// carry is cleared in that case.
    pub fn decode(&mut self, bytes: &[u8]) -> Result<String, InvalidUtf8> {
        let mut buf = std::mem::take(&mut self.pending);
        buf.extend_from_slice(bytes);

        if let Err(e) = std::str::from_utf8(&buf) {
            if e.error_len().is_some() {
                return Err(InvalidUtf8 {
                    offset: e.valid_up_to(),
                });
            }
            // Incomplete sequence at the end: keep it for the next chunk.
            self.pending = buf.split_off(e.valid_up_to());
        }

        String::from_utf8(buf).map_err(|e| InvalidUtf8 {
            offset: e.utf8_error().valid_up_to(),
        })
    }

    /// Flush whatever is still pending, replacing it with U+FFFD.
    pub fn finish(&mut self) -> String {
        let pending = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&pending).into_owned()
    }

    /// Drop any carried bytes.
    pub fn reset(&mut self) {
        self.pending.clear();
    }
}
