//! FCP message codec.
//!
//! ```text
//! ClientGet              <- message name
//! Identifier=get-1       <- fields, one per line
//! URI=KSK@abc123
//! EndMessage             <- or "Data", followed by DataLength raw bytes
//! ```

use ceno_core::FieldSet;
use ceno_core::constants::{DATA_MARKER, END_MARKER, END_MESSAGE_MARKER};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::constants::{FIELD_DATA_LENGTH, FIELD_IDENTIFIER, MAX_DATA_LENGTH};
use crate::error::FcpError;

/// A single FCP message with an optional data payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FcpMessage {
    name: String,
    fields: FieldSet,
    data: Option<Vec<u8>>,
}

impl FcpMessage {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: FieldSet::new(),
            data: None,
        }
    }

    /// Builder form of [`set`](Self::set).
    pub fn with_field(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, FcpError> {
        self.set(key, value)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<(), FcpError> {
        self.fields.put_overwrite(key, value)?;
        Ok(())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get_str(key)
    }

    #[must_use]
    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        self.field(FIELD_IDENTIFIER)
    }

    #[must_use]
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    #[must_use]
    pub fn into_data(self) -> Option<Vec<u8>> {
        self.data
    }

    /// Serialize for the wire. `DataLength` is filled in from the payload.
    pub fn encode(&self) -> Result<Vec<u8>, FcpError> {
        let mut fields = self.fields.clone();
        if let Some(data) = &self.data {
            fields.put_overwrite(FIELD_DATA_LENGTH, data.len().to_string())?;
        }

        let mut text = String::with_capacity(64);
        text.push_str(&self.name);
        text.push('\n');
        fields.write_fields(&mut text);

        let mut out = text.into_bytes();
        match &self.data {
            Some(data) => {
                out.extend_from_slice(DATA_MARKER.as_bytes());
                out.push(b'\n');
                out.extend_from_slice(data);
            }
            None => {
                out.extend_from_slice(END_MESSAGE_MARKER.as_bytes());
                out.push(b'\n');
            }
        }
        Ok(out)
    }
}

/// Read one message. Returns `Ok(None)` on a clean end of stream between messages.
pub async fn read_message<R>(reader: &mut R) -> Result<Option<FcpMessage>, FcpError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();

    // Blank lines between messages are tolerated.
    let name = loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        let trimmed = trim_eol(&line);
        if !trimmed.is_empty() {
            break trimmed.to_string();
        }
    };

    let mut message = FcpMessage::new(name);
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Err(FcpError::UnexpectedEof);
        }
        let trimmed = trim_eol(&line);
        match trimmed {
            "" => continue,
            END_MESSAGE_MARKER | END_MARKER => return Ok(Some(message)),
            DATA_MARKER => {
                let len = data_length(&message)?;
                let mut data = vec![0u8; len];
                reader.read_exact(&mut data).await.map_err(|e| {
                    if e.kind() == std::io::ErrorKind::UnexpectedEof {
                        FcpError::UnexpectedEof
                    } else {
                        FcpError::Io(e)
                    }
                })?;
                message.data = Some(data);
                return Ok(Some(message));
            }
            _ => {
                let (key, value) = trimmed
                    .split_once('=')
                    .ok_or_else(|| FcpError::MalformedLine(trimmed.to_string()))?;
                message.set(key, value)?;
            }
        }
    }
}

fn data_length(message: &FcpMessage) -> Result<usize, FcpError> {
    let len: usize = message
        .field(FIELD_DATA_LENGTH)
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| FcpError::MissingDataLength(message.name.clone()))?;
    if len > MAX_DATA_LENGTH {
        return Err(FcpError::DataTooLarge {
            len,
            max: MAX_DATA_LENGTH,
        });
    }
    Ok(len)
}

fn trim_eol(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn read_all(bytes: &[u8]) -> Vec<FcpMessage> {
        let mut reader = bytes;
        let mut out = Vec::new();
        while let Some(msg) = read_message(&mut reader).await.unwrap() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn encode_without_data() {
        let msg = FcpMessage::new("ClientHello")
            .with_field("Name", "ceno")
            .unwrap()
            .with_field("ExpectedVersion", "2.0")
            .unwrap();
        assert_eq!(
            String::from_utf8(msg.encode().unwrap()).unwrap(),
            "ClientHello\nExpectedVersion=2.0\nName=ceno\nEndMessage\n"
        );
    }

    #[test]
    fn encode_with_data_sets_length() {
        let msg = FcpMessage::new("ClientPut")
            .with_field("URI", "KSK@abc")
            .unwrap()
            .with_data(b"hello".to_vec());
        assert_eq!(
            msg.encode().unwrap(),
            b"ClientPut\nDataLength=5\nURI=KSK@abc\nData\nhello".to_vec()
        );
    }

    #[test]
    fn field_values_cannot_inject_lines() {
        let err = FcpMessage::new("ClientGet").with_field("URI", "KSK@a\nFatal=true");
        assert!(matches!(err, Err(FcpError::Field(_))));
    }

    #[tokio::test]
    async fn read_simple_message() {
        let msgs = read_all(b"NodeHello\nFCPVersion=2.0\nNode=Fred\nEndMessage\n").await;
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].is("NodeHello"));
        assert_eq!(msgs[0].field("FCPVersion"), Some("2.0"));
        assert_eq!(msgs[0].data(), None);
    }

    #[tokio::test]
    async fn read_message_with_data_then_another() {
        let bytes = b"AllData\nIdentifier=get-1\nDataLength=3\nData\n1\n2GetFailed\nIdentifier=get-2\nCode=13\nEndMessage\n";
        let msgs = read_all(bytes).await;
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].identifier(), Some("get-1"));
        assert_eq!(msgs[0].data(), Some(&b"1\n2"[..]));
        assert!(msgs[1].is("GetFailed"));
        assert_eq!(msgs[1].field("Code"), Some("13"));
    }

    #[tokio::test]
    async fn read_tolerates_crlf_and_blank_lines() {
        let msgs = read_all(b"\r\nNodeHello\r\nNode=Fred\r\n\r\nEndMessage\r\n").await;
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].field("Node"), Some("Fred"));
    }

    #[tokio::test]
    async fn roundtrip_through_encode() {
        let msg = FcpMessage::new("AllData")
            .with_field("Identifier", "x")
            .unwrap()
            .with_data(vec![0, 159, 146, 150]);
        let encoded = msg.encode().unwrap();
        let decoded = read_all(&encoded).await;
        assert_eq!(decoded[0].data(), msg.data());
        assert_eq!(decoded[0].identifier(), Some("x"));
    }

    #[tokio::test]
    async fn eof_mid_message() {
        let mut reader: &[u8] = b"NodeHello\nNode=Fred\n";
        assert!(matches!(
            read_message(&mut reader).await,
            Err(FcpError::UnexpectedEof)
        ));
    }

    #[tokio::test]
    async fn eof_mid_data() {
        let mut reader: &[u8] = b"AllData\nDataLength=10\nData\nabc";
        assert!(matches!(
            read_message(&mut reader).await,
            Err(FcpError::UnexpectedEof)
        ));
    }

    #[tokio::test]
    async fn data_without_length() {
        let mut reader: &[u8] = b"AllData\nData\nabc";
        assert!(matches!(
            read_message(&mut reader).await,
            Err(FcpError::MissingDataLength(_))
        ));
    }

    #[tokio::test]
    async fn oversized_data_is_refused() {
        let text = format!("AllData\nDataLength={}\nData\n", MAX_DATA_LENGTH + 1);
        let mut reader = text.as_bytes();
        assert!(matches!(
            read_message(&mut reader).await,
            Err(FcpError::DataTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn line_without_equals() {
        let mut reader: &[u8] = b"NodeHello\ngarbage\nEndMessage\n";
        assert!(matches!(
            read_message(&mut reader).await,
            Err(FcpError::MalformedLine(_))
        ));
    }
}
