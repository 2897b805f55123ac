use thiserror::Error;

#[derive(Error, Debug)]
pub enum DnsError {
    #[error("Parse Error for {object:?}: {message:?}")]
    Parse { object: String, message: String },
    #[error("Reader Error: {message:?}")]
    Reader { message: String },
    #[error("Upstream Error: {message:?}")]
    Upstream { message: String },
}

impl DnsError {
    /// Whether the error comes from a malformed inbound buffer.
    pub fn is_format_error(&self) -> bool {
        matches!(self, DnsError::Parse { .. } | DnsError::Reader { .. })
    }
}
