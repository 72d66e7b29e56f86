use crate::error::WireError;

/// Request discriminators, one byte each.
///
/// Values are fixed by the protocol and must match the server build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// Create an evaluation session over the whole node population.
    EvalNew = 0x01,
    /// Create a session sampling a fresh random seed set per pass.
    SamplingNew = 0x02,
    /// Create a session over a fixed, caller-supplied seed set.
    TrainNew = 0x03,
    /// Reset the server-side cursor for a session.
    Begin = 0x04,
    /// Fetch the next mini-batch of a session.
    Next = 0x05,
    /// Release server-side session state.
    Close = 0x06,
}

impl Opcode {
    /// The wire byte for this opcode.
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Opcode {
    type Error = WireError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x01 => Ok(Opcode::EvalNew),
            0x02 => Ok(Opcode::SamplingNew),
            0x03 => Ok(Opcode::TrainNew),
            0x04 => Ok(Opcode::Begin),
            0x05 => Ok(Opcode::Next),
            0x06 => Ok(Opcode::Close),
            other => Err(WireError::UnknownOpcode(other)),
        }
    }
}

/// Server-reported outcome of a request.
///
/// `EndOfIteration` is the normal terminal signal of a `Next` stream and is
/// never an error. Every byte other than the two well-known codes is an
/// opaque server-defined failure, propagated as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Success,
    EndOfIteration,
    Error(u8),
}

impl StatusCode {
    pub const SUCCESS_BYTE: u8 = 0x00;
    pub const END_OF_ITERATION_BYTE: u8 = 0x01;

    /// Interpret a raw status byte. Total: unknown bytes become `Error`.
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            Self::SUCCESS_BYTE => StatusCode::Success,
            Self::END_OF_ITERATION_BYTE => StatusCode::EndOfIteration,
            other => StatusCode::Error(other),
        }
    }

    /// The wire byte for this status.
    pub fn as_byte(self) -> u8 {
        match self {
            StatusCode::Success => Self::SUCCESS_BYTE,
            StatusCode::EndOfIteration => Self::END_OF_ITERATION_BYTE,
            StatusCode::Error(code) => code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_byte_roundtrip() {
        for opcode in [
            Opcode::EvalNew,
            Opcode::SamplingNew,
            Opcode::TrainNew,
            Opcode::Begin,
            Opcode::Next,
            Opcode::Close,
        ] {
            assert_eq!(Opcode::try_from(opcode.as_byte()).unwrap(), opcode);
        }
    }

    #[test]
    fn unknown_opcode_rejected() {
        assert!(matches!(
            Opcode::try_from(0x7f),
            Err(WireError::UnknownOpcode(0x7f))
        ));
    }

    #[test]
    fn status_byte_roundtrip() {
        assert_eq!(StatusCode::from_byte(0x00), StatusCode::Success);
        assert_eq!(StatusCode::from_byte(0x01), StatusCode::EndOfIteration);
        assert_eq!(StatusCode::from_byte(0x42), StatusCode::Error(0x42));
        assert_eq!(StatusCode::Error(0x42).as_byte(), 0x42);
    }
}
