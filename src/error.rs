//! Error types for the markup boundary.

use core::fmt;

/// Failure while reading rich-text markup into a node tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarkupError {
    /// The tokenizer rejected the input.
    Tokenize { offset: u64, message: String },
    /// A tag name, attribute or text run could not be decoded.
    Decode {
        offset: u64,
        source: &'static str,
        message: String,
    },
}

impl MarkupError {
    /// Byte offset into the input where the failure was detected.
    pub fn offset(&self) -> u64 {
        match self {
            Self::Tokenize { offset, .. } | Self::Decode { offset, .. } => *offset,
        }
    }
}

impl fmt::Display for MarkupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tokenize { offset, message } => {
                write!(f, "markup tokenize error at byte {}: {}", offset, message)
            }
            Self::Decode {
                offset,
                source,
                message,
            } => write!(
                f,
                "markup decode error in {} at byte {}: {}",
                source, offset, message
            ),
        }
    }
}

impl std::error::Error for MarkupError {}
