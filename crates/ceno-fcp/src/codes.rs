//! Classification of node replies into signaling errors.

use ceno_core::{FreenetUri, KeyError, KeyType, SignalingKeyPair};
use ceno_signaling::{FetchError, InsertError, KeyGenError};

use crate::constants::{
    ALL_DATA, CODE_ALL_DATA_NOT_FOUND, CODE_DATA_NOT_FOUND, CODE_PERMANENT_REDIRECT,
    CODE_RECENTLY_FAILED, FIELD_CODE, FIELD_CODE_DESCRIPTION, FIELD_EXTRA_DESCRIPTION,
    FIELD_FATAL, FIELD_INSERT_URI, FIELD_REDIRECT_URI, FIELD_REQUEST_URI, FIELD_URI, GET_FAILED,
    PROTOCOL_ERROR, PUT_FAILED, PUT_SUCCESSFUL, SSK_KEYPAIR, URI_GENERATED,
};
use crate::message::FcpMessage;

/// Turn the terminal reply to a `ClientGet` into a fetch result.
pub fn classify_get_reply(reply: FcpMessage) -> Result<Vec<u8>, FetchError> {
    match reply.name() {
        ALL_DATA => Ok(reply.into_data().unwrap_or_default()),
        GET_FAILED => Err(classify_get_failed(&reply)),
        PROTOCOL_ERROR => Err(FetchError::Fatal(describe(&reply))),
        other => Err(FetchError::Transient(format!("unexpected reply {other}"))),
    }
}

/// Map a `GetFailed` message onto the fetch error taxonomy.
///
/// A redirect whose target does not parse is treated as fatal: following it
/// is impossible and retrying the original would redirect again.
pub fn classify_get_failed(reply: &FcpMessage) -> FetchError {
    let code = reply
        .field(FIELD_CODE)
        .and_then(|c| c.trim().parse::<i32>().ok());
    let fatal = reply
        .field(FIELD_FATAL)
        .is_some_and(|f| f.trim().eq_ignore_ascii_case("true"));

    match code {
        Some(CODE_PERMANENT_REDIRECT) => match reply.field(FIELD_REDIRECT_URI) {
            Some(target) => match FreenetUri::parse(target) {
                Ok(uri) => FetchError::Redirect(uri),
                Err(e) => FetchError::Fatal(format!("unusable redirect {target:?}: {e}")),
            },
            None => FetchError::Fatal("redirect without RedirectURI".into()),
        },
        Some(CODE_DATA_NOT_FOUND | CODE_ALL_DATA_NOT_FOUND | CODE_RECENTLY_FAILED) => {
            FetchError::DataNotFound
        }
        _ if fatal => FetchError::Fatal(describe(reply)),
        _ => FetchError::Transient(describe(reply)),
    }
}

/// Turn the first reply to a `ClientPut` into the submission result.
pub fn classify_put_reply(reply: &FcpMessage) -> Result<FreenetUri, InsertError> {
    match reply.name() {
        URI_GENERATED | PUT_SUCCESSFUL => {
            let uri = reply
                .field(FIELD_URI)
                .ok_or_else(|| InsertError::Submission(format!("{} without URI", reply.name())))?;
            Ok(FreenetUri::parse(uri)?)
        }
        PUT_FAILED | PROTOCOL_ERROR => Err(InsertError::Submission(describe(reply))),
        other => Err(InsertError::Submission(format!("unexpected reply {other}"))),
    }
}

/// Turn the reply to a `GenerateSSK` into a signaling key pair.
pub fn classify_keypair_reply(reply: &FcpMessage) -> Result<SignalingKeyPair, KeyGenError> {
    match reply.name() {
        SSK_KEYPAIR => {
            let insert = required_uri(reply, FIELD_INSERT_URI)?;
            let request = required_uri(reply, FIELD_REQUEST_URI)?;
            Ok(SignalingKeyPair::from_parts(insert, request)?)
        }
        PROTOCOL_ERROR => Err(KeyGenError::Failed(describe(reply))),
        other => Err(KeyGenError::Failed(format!("unexpected reply {other}"))),
    }
}

/// Turn the first reply to a key-only `ClientPut` into the bare request URI.
pub fn classify_derived_uri(reply: &FcpMessage) -> Result<FreenetUri, KeyGenError> {
    match reply.name() {
        URI_GENERATED | PUT_SUCCESSFUL => {
            let uri = required_uri(reply, FIELD_URI)?;
            if uri.key_type() != KeyType::Ssk {
                return Err(KeyError::WrongKeyType(uri.key_type().as_str()).into());
            }
            uri.to_bare_ssk()
                .map_err(|e| KeyGenError::InvalidKeys(KeyError::from(e)))
        }
        PUT_FAILED | PROTOCOL_ERROR => Err(KeyGenError::Derivation(describe(reply))),
        other => Err(KeyGenError::Derivation(format!("unexpected reply {other}"))),
    }
}

fn required_uri(reply: &FcpMessage, field: &str) -> Result<FreenetUri, KeyGenError> {
    let text = reply
        .field(field)
        .ok_or_else(|| KeyGenError::Failed(format!("{} without {field}", reply.name())))?;
    FreenetUri::parse(text).map_err(|e| KeyGenError::InvalidKeys(KeyError::from(e)))
}

/// Human-readable summary of a failure message.
pub fn describe(reply: &FcpMessage) -> String {
    let code = reply.field(FIELD_CODE).unwrap_or("?");
    let mut out = format!("{} code {code}", reply.name());
    if let Some(desc) = reply.field(FIELD_CODE_DESCRIPTION) {
        out.push_str(": ");
        out.push_str(desc);
    }
    if let Some(extra) = reply.field(FIELD_EXTRA_DESCRIPTION) {
        out.push_str(" (");
        out.push_str(extra);
        out.push(')');
    }
    out
}
