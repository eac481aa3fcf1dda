//! Error types for the ceno-core crate.

/// Errors produced while parsing or building a network URI.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UriError {
    #[error("missing '@' separator")]
    MissingSeparator,

    #[error("unknown key type: {0}")]
    UnknownKeyType(String),

    #[error("malformed key triple: expected routing,crypto,extra")]
    MalformedKeys,

    #[error("invalid base64 in {part}")]
    InvalidBase64 { part: &'static str },

    #[error("invalid {part} length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        part: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("missing document name")]
    MissingDocName,

    #[error("missing edition number")]
    MissingEdition,

    #[error("invalid edition: {0}")]
    InvalidEdition(String),

    #[error("empty keyword")]
    EmptyKeyword,

    #[error("{0} key carries no routing keys")]
    NoKeys(&'static str),

    #[error("not an insert URI")]
    NotInsertUri,
}

/// Errors produced by the field set codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldSetError {
    #[error("line {line}: expected key=value, got {content:?}")]
    UnexpectedLine { line: usize, content: String },

    #[error("line {line}: empty key")]
    EmptyKey { line: usize },

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("invalid key: {0:?}")]
    InvalidKey(String),

    #[error("value for {0} contains a newline")]
    InvalidValue(String),

    #[error("field {key} is not a valid {expected}: {value:?}")]
    InvalidType {
        key: String,
        expected: &'static str,
        value: String,
    },

    #[error("content is not valid UTF-8")]
    NotUtf8,
}

/// Errors produced while building or restoring a signaling key pair.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("uri error: {0}")]
    Uri(#[from] UriError),

    #[error("signaling keys must be SSK, got {0}")]
    WrongKeyType(&'static str),

    #[error("request URI carries the insert flag")]
    NotRequestUri,

    #[error("insert and request URIs belong to different keys")]
    Mismatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_error_display() {
        assert_eq!(UriError::MissingSeparator.to_string(), "missing '@' separator");
        let err = UriError::InvalidKeyLength {
            part: "routing key",
            expected: 32,
            actual: 4,
        };
        assert_eq!(
            err.to_string(),
            "invalid routing key length: expected 32, got 4"
        );
    }

    #[test]
    fn key_error_from_uri_error() {
        let err: KeyError = UriError::NotInsertUri.into();
        assert!(matches!(err, KeyError::Uri(UriError::NotInsertUri)));
        assert!(err.to_string().contains("not an insert URI"));
    }

    #[test]
    fn fieldset_error_display() {
        let err = FieldSetError::UnexpectedLine {
            line: 1,
            content: "garbage".into(),
        };
        assert!(err.to_string().contains("line 1"));
        assert!(err.to_string().contains("garbage"));
    }
}
