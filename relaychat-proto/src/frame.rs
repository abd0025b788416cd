//! Transport-level frames.

/// One discrete unit of transport data.
///
/// The text/binary split is load-bearing: text frames are JSON control
/// messages, binary frames are `IV || ciphertext` data frames.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// A UTF-8 control frame.
    Text(String),
    /// An opaque data frame.
    Binary(Vec<u8>),
}

impl Frame {
    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        match self {
            Self::Text(s)   => s.len(),
            Self::Binary(b) => b.len(),
        }
    }

    /// True if the payload is empty.
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// True for control frames.
    pub fn is_text(&self) -> bool { matches!(self, Self::Text(_)) }
}
