use graphfeed_wire::WireError;

/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A creation parameter failed local validation. No I/O was performed.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The operation requires an open session.
    #[error("session is closed")]
    SessionClosed,

    /// A response payload did not decode cleanly.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// The transport failed mid-operation. The session state is
    /// indeterminate afterwards; callers should discard it.
    #[error("transport I/O error: {0}")]
    Transport(#[from] std::io::Error),

    /// The server reported a failure status.
    #[error("server error (status 0x{code:02x})")]
    Server { code: u8 },
}

pub type Result<T> = std::result::Result<T, ClientError>;
