//! FCP protocol constants.

use std::time::Duration;

pub const DEFAULT_FCP_ADDRESS: &str = "127.0.0.1:9481";
pub const DEFAULT_CLIENT_NAME: &str = "ceno-client";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Node-side retries per request; `-1` would mean forever.
pub const DEFAULT_MAX_RETRIES: i32 = 3;

pub const EXPECTED_VERSION: &str = "2.0";

/// Document name attached to an insert URI when asking the node for its
/// request URI. Stripped again from the answer.
pub const KEY_DERIVATION_DOC_NAME: &str = "ceno-key";

/// Body of the key-only put used for derivation; nothing is inserted.
pub const KEY_DERIVATION_PAYLOAD: &[u8] = b"ceno";

/// Upper bound on a single message's data payload.
pub const MAX_DATA_LENGTH: usize = 16 * 1024 * 1024;

// Message names
pub const CLIENT_HELLO: &str = "ClientHello";
pub const NODE_HELLO: &str = "NodeHello";
pub const CLIENT_GET: &str = "ClientGet";
pub const CLIENT_PUT: &str = "ClientPut";
pub const GENERATE_SSK: &str = "GenerateSSK";
pub const SSK_KEYPAIR: &str = "SSKKeypair";
pub const ALL_DATA: &str = "AllData";
pub const GET_FAILED: &str = "GetFailed";
pub const URI_GENERATED: &str = "URIGenerated";
pub const PUT_SUCCESSFUL: &str = "PutSuccessful";
pub const PUT_FAILED: &str = "PutFailed";
pub const PROTOCOL_ERROR: &str = "ProtocolError";
pub const CLOSE_CONNECTION_DURING_HANDSHAKE: &str = "CloseConnectionDuringHandshake";
pub const DISCONNECT: &str = "Disconnect";

// Field names
pub const FIELD_IDENTIFIER: &str = "Identifier";
pub const FIELD_URI: &str = "URI";
pub const FIELD_INSERT_URI: &str = "InsertURI";
pub const FIELD_REQUEST_URI: &str = "RequestURI";
pub const FIELD_DATA_LENGTH: &str = "DataLength";
pub const FIELD_CODE: &str = "Code";
pub const FIELD_FATAL: &str = "Fatal";
pub const FIELD_REDIRECT_URI: &str = "RedirectURI";
pub const FIELD_CODE_DESCRIPTION: &str = "CodeDescription";
pub const FIELD_EXTRA_DESCRIPTION: &str = "ExtraDescription";

// GetFailed codes
pub const CODE_DATA_NOT_FOUND: i32 = 13;
pub const CODE_PERMANENT_REDIRECT: i32 = 27;
pub const CODE_ALL_DATA_NOT_FOUND: i32 = 28;
pub const CODE_RECENTLY_FAILED: i32 = 30;
