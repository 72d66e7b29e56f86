/// Errors that can occur during wire encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The buffer ended before a declared field was fully read.
    #[error("buffer underrun (need {needed} bytes, {available} available)")]
    Underrun { needed: u64, available: usize },

    /// Decoding finished but the buffer still holds unconsumed bytes.
    #[error("trailing bytes after decode ({0} left over)")]
    TrailingBytes(usize),

    /// A string field does not hold valid UTF-8.
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,

    /// The opcode byte does not name a known request.
    #[error("unknown opcode 0x{0:02x}")]
    UnknownOpcode(u8),
}

pub type Result<T> = std::result::Result<T, WireError>;
