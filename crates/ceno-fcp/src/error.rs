//! Error types for the FCP layer.

use ceno_core::FieldSetError;

/// Errors on the FCP connection itself.
///
/// Request-level failures reported by the node are not errors here; they are
/// classified into the signaling layer's fetch and insert errors.
#[derive(Debug, thiserror::Error)]
pub enum FcpError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("field error: {0}")]
    Field(#[from] FieldSetError),

    #[error("malformed message line: {0:?}")]
    MalformedLine(String),

    #[error("message {0} has data but no valid DataLength")]
    MissingDataLength(String),

    #[error("data length {len} exceeds limit of {max} bytes")]
    DataTooLarge { len: usize, max: usize },

    #[error("connection closed mid-message")]
    UnexpectedEof,

    #[error("connection to {0} timed out")]
    ConnectTimeout(String),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("not connected to node")]
    NotConnected,

    #[error("configuration error: {0}")]
    Configuration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_variants() {
        let io = FcpError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        assert!(io.to_string().contains("I/O error"));

        assert_eq!(
            FcpError::DataTooLarge { len: 10, max: 5 }.to_string(),
            "data length 10 exceeds limit of 5 bytes"
        );
        assert_eq!(FcpError::NotConnected.to_string(), "not connected to node");
        assert!(
            FcpError::Handshake("ProtocolError".into())
                .to_string()
                .contains("ProtocolError")
        );
    }

    #[test]
    fn error_from_field_set_error() {
        let err: FcpError = FieldSetError::InvalidKey("a=b".into()).into();
        assert!(matches!(err, FcpError::Field(_)));
    }
}
