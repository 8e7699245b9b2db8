use thiserror::Error;

/// Errors produced by the FLUTE sender core.
#[derive(Debug, Error)]
pub enum FluteError {
    /// A datagram failed structural validation while being parsed.
    #[error("malformed datagram: {0}")]
    MalformedDatagram(String),

    /// The LCT codepoint does not map to a known FEC scheme.
    #[error("FEC encoding id {0} is not supported")]
    UnsupportedFec(u8),

    /// A parameter combination the sender cannot honor.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The TOI is already assigned to another object of the same FDT.
    #[error("TOI {0} is already present in the FDT")]
    DuplicateToi(String),

    /// The FDT was marked complete, no object can be added anymore.
    #[error("FDT is complete, no new object should be added")]
    FdtComplete,

    /// Reading or seeking an object data source failed.
    #[error("source I/O error: {0}")]
    SourceIo(#[from] std::io::Error),
}

/// Result alias used through the whole crate.
pub type Result<T> = std::result::Result<T, FluteError>;

impl FluteError {
    /// Shorthand for a [`FluteError::MalformedDatagram`] with a message.
    pub fn malformed<T: Into<String>>(msg: T) -> Self {
        FluteError::MalformedDatagram(msg.into())
    }

    /// Shorthand for a [`FluteError::InvalidConfiguration`] with a message.
    pub fn invalid<T: Into<String>>(msg: T) -> Self {
        FluteError::InvalidConfiguration(msg.into())
    }
}
