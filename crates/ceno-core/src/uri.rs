//! Network URI model.
//!
//! Four key types are understood:
//!
//! ```text
//! KSK@name[/meta...]                         keyword (symmetric-name) key
//! SSK@r,c,e/[docname][/meta...]              signed subspace key
//! USK@r,c,e/docname/edition[/meta...]        updatable (versioned) subspace key
//! CHK@r,c,e[/meta...]                        content hash key
//! ```
//!
//! `r`, `c` and `e` are the routing key, crypto key and extra bytes, encoded
//! with the key alphabet from [`crate::encoding`]. The routing key of an SSK or
//! USK insert URI holds the node's private key material, whose length depends
//! on the node's key scheme; every other routing key is a 32-byte hash.

use std::fmt;
use std::str::FromStr;

use crate::constants::{
    CRYPTO_KEY_LENGTH, DEFAULT_EDITION, EXTRA_INSERT_FLAG_INDEX, EXTRA_LENGTH, KEY_PART_SEPARATOR,
    KEY_TYPE_SEPARATOR, PATH_SEPARATOR, ROUTING_KEY_LENGTH, URI_SCHEME_PREFIX,
};
use crate::encoding;
use crate::error::UriError;

/// The key scheme a URI addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    Chk,
    Ssk,
    Usk,
    Ksk,
}

impl KeyType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Chk => "CHK",
            Self::Ssk => "SSK",
            Self::Usk => "USK",
            Self::Ksk => "KSK",
        }
    }

    /// Whether URIs of this type carry a routing/crypto/extra triple.
    #[must_use]
    pub const fn has_keys(&self) -> bool {
        !matches!(self, Self::Ksk)
    }
}

impl FromStr for KeyType {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CHK" => Ok(Self::Chk),
            "SSK" => Ok(Self::Ssk),
            "USK" => Ok(Self::Usk),
            "KSK" => Ok(Self::Ksk),
            _ => Err(UriError::UnknownKeyType(s.to_string())),
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing key, crypto key and extra bytes of a keyed URI.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct KeyTriple {
    pub routing_key: Vec<u8>,
    pub crypto_key: [u8; CRYPTO_KEY_LENGTH],
    pub extra: [u8; EXTRA_LENGTH],
}

impl KeyTriple {
    fn parse(s: &str, key_type: KeyType) -> Result<Self, UriError> {
        let mut parts = s.split(KEY_PART_SEPARATOR);
        let (Some(routing), Some(crypto), Some(extra), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(UriError::MalformedKeys);
        };
        let triple = Self {
            routing_key: encoding::decode(routing).ok_or(UriError::InvalidBase64 {
                part: "routing key",
            })?,
            crypto_key: decode_fixed(crypto, "crypto key")?,
            extra: decode_fixed(extra, "extra")?,
        };
        triple.check_routing_key(key_type)?;
        Ok(triple)
    }

    /// Whether these keys are the private half of a signed subspace.
    fn is_insert(&self, key_type: KeyType) -> bool {
        matches!(key_type, KeyType::Ssk | KeyType::Usk) && self.extra[EXTRA_INSERT_FLAG_INDEX] != 0
    }

    fn check_routing_key(&self, key_type: KeyType) -> Result<(), UriError> {
        let actual = self.routing_key.len();
        let valid = if self.is_insert(key_type) {
            (1..=ROUTING_KEY_LENGTH).contains(&actual)
        } else {
            actual == ROUTING_KEY_LENGTH
        };
        if valid {
            Ok(())
        } else {
            Err(UriError::InvalidKeyLength {
                part: "routing key",
                expected: ROUTING_KEY_LENGTH,
                actual,
            })
        }
    }

    fn encode(&self) -> String {
        format!(
            "{}{KEY_PART_SEPARATOR}{}{KEY_PART_SEPARATOR}{}",
            encoding::encode(&self.routing_key),
            encoding::encode(&self.crypto_key),
            encoding::encode(&self.extra)
        )
    }
}

impl fmt::Debug for KeyTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

fn decode_fixed<const N: usize>(s: &str, part: &'static str) -> Result<[u8; N], UriError> {
    let bytes = encoding::decode(s).ok_or(UriError::InvalidBase64 { part })?;
    let actual = bytes.len();
    bytes.try_into().map_err(|_| UriError::InvalidKeyLength {
        part,
        expected: N,
        actual,
    })
}

/// A parsed network URI.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FreenetUri {
    key_type: KeyType,
    keys: Option<KeyTriple>,
    doc_name: Option<String>,
    edition: Option<i64>,
    meta_strings: Vec<String>,
}

impl FreenetUri {
    /// Parse a URI from its ASCII serialization.
    pub fn parse(s: &str) -> Result<Self, UriError> {
        let s = s.trim();
        let s = match s.get(..URI_SCHEME_PREFIX.len()) {
            Some(prefix) if prefix.eq_ignore_ascii_case(URI_SCHEME_PREFIX) => {
                &s[URI_SCHEME_PREFIX.len()..]
            }
            _ => s,
        };

        let (type_str, body) = s
            .split_once(KEY_TYPE_SEPARATOR)
            .ok_or(UriError::MissingSeparator)?;
        let key_type: KeyType = type_str.parse()?;
        let mut segments = body.split(PATH_SEPARATOR);

        match key_type {
            KeyType::Ksk => {
                let name = segments.next().unwrap_or_default();
                if name.is_empty() {
                    return Err(UriError::EmptyKeyword);
                }
                Ok(Self {
                    key_type,
                    keys: None,
                    doc_name: Some(name.to_string()),
                    edition: None,
                    meta_strings: collect_meta(segments),
                })
            }
            KeyType::Chk => {
                let keys = KeyTriple::parse(segments.next().unwrap_or_default(), key_type)?;
                Ok(Self {
                    key_type,
                    keys: Some(keys),
                    doc_name: None,
                    edition: None,
                    meta_strings: collect_meta(segments),
                })
            }
            KeyType::Ssk => {
                let keys = KeyTriple::parse(segments.next().unwrap_or_default(), key_type)?;
                let doc_name = segments
                    .next()
                    .filter(|name| !name.is_empty())
                    .map(str::to_string);
                Ok(Self {
                    key_type,
                    keys: Some(keys),
                    doc_name,
                    edition: None,
                    meta_strings: collect_meta(segments),
                })
            }
            KeyType::Usk => {
                let keys = KeyTriple::parse(segments.next().unwrap_or_default(), key_type)?;
                let doc_name = segments
                    .next()
                    .filter(|name| !name.is_empty())
                    .ok_or(UriError::MissingDocName)?
                    .to_string();
                let edition_str = segments
                    .next()
                    .filter(|e| !e.is_empty())
                    .ok_or(UriError::MissingEdition)?;
                let edition = edition_str
                    .parse::<i64>()
                    .map_err(|_| UriError::InvalidEdition(edition_str.to_string()))?;
                Ok(Self {
                    key_type,
                    keys: Some(keys),
                    doc_name: Some(doc_name),
                    edition: Some(edition),
                    meta_strings: collect_meta(segments),
                })
            }
        }
    }

    /// Build a keyword URI (`KSK@name`).
    ///
    /// The name is parsed the same way a serialized URI would be, so a `/`
    /// inside it starts the meta strings.
    pub fn ksk(name: &str) -> Result<Self, UriError> {
        Self::parse(&format!("{}{KEY_TYPE_SEPARATOR}{name}", KeyType::Ksk))
    }

    /// Build a versioned record URI (`USK@r,c,e/name/0`) under the keys of `base`.
    pub fn versioned(name: &str, base: &FreenetUri) -> Result<Self, UriError> {
        let keys = base
            .keys
            .clone()
            .ok_or(UriError::NoKeys(base.key_type.as_str()))?;
        if name.is_empty() || name.contains(PATH_SEPARATOR) {
            return Err(UriError::MissingDocName);
        }
        Ok(Self {
            key_type: KeyType::Usk,
            keys: Some(keys),
            doc_name: Some(name.to_string()),
            edition: Some(DEFAULT_EDITION),
            meta_strings: Vec::new(),
        })
    }

    /// Build an SSK URI from its raw parts.
    pub fn ssk(keys: KeyTriple, doc_name: Option<String>) -> Result<Self, UriError> {
        keys.check_routing_key(KeyType::Ssk)?;
        Ok(Self::ssk_from_checked(keys, doc_name))
    }

    /// Build an SSK URI from keys whose lengths the caller guarantees.
    pub(crate) fn ssk_from_checked(keys: KeyTriple, doc_name: Option<String>) -> Self {
        Self {
            key_type: KeyType::Ssk,
            keys: Some(keys),
            doc_name,
            edition: None,
            meta_strings: Vec::new(),
        }
    }

    /// The bare `SSK@r,c,e/` form of a keyed URI, without name or edition.
    pub fn to_bare_ssk(&self) -> Result<Self, UriError> {
        let keys = self
            .keys
            .clone()
            .ok_or(UriError::NoKeys(self.key_type.as_str()))?;
        Self::ssk(keys, None)
    }

    #[must_use]
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    #[must_use]
    pub fn doc_name(&self) -> Option<&str> {
        self.doc_name.as_deref()
    }

    #[must_use]
    pub fn edition(&self) -> Option<i64> {
        self.edition
    }

    #[must_use]
    pub fn meta_strings(&self) -> &[String] {
        &self.meta_strings
    }

    #[must_use]
    pub fn keys(&self) -> Option<&KeyTriple> {
        self.keys.as_ref()
    }

    #[must_use]
    pub fn routing_key(&self) -> Option<&[u8]> {
        self.keys.as_ref().map(|k| k.routing_key.as_slice())
    }

    #[must_use]
    pub fn crypto_key(&self) -> Option<&[u8; CRYPTO_KEY_LENGTH]> {
        self.keys.as_ref().map(|k| &k.crypto_key)
    }

    #[must_use]
    pub fn extra(&self) -> Option<&[u8; EXTRA_LENGTH]> {
        self.keys.as_ref().map(|k| &k.extra)
    }

    /// Whether this is the private insert form of an SSK/USK.
    #[must_use]
    pub fn is_insert_form(&self) -> bool {
        self.keys
            .as_ref()
            .is_some_and(|k| k.is_insert(self.key_type))
    }

    /// The canonical ASCII serialization.
    #[must_use]
    pub fn to_ascii_string(&self) -> String {
        let mut out = format!("{}{KEY_TYPE_SEPARATOR}", self.key_type);
        match self.key_type {
            KeyType::Ksk => {
                out.push_str(self.doc_name.as_deref().unwrap_or_default());
            }
            KeyType::Chk => {
                if let Some(keys) = &self.keys {
                    out.push_str(&keys.encode());
                }
            }
            KeyType::Ssk | KeyType::Usk => {
                if let Some(keys) = &self.keys {
                    out.push_str(&keys.encode());
                }
                out.push(PATH_SEPARATOR);
                out.push_str(self.doc_name.as_deref().unwrap_or_default());
                if let Some(edition) = self.edition {
                    out.push(PATH_SEPARATOR);
                    out.push_str(&edition.to_string());
                }
            }
        }
        for meta in &self.meta_strings {
            out.push(PATH_SEPARATOR);
            out.push_str(meta);
        }
        out
    }
}

fn collect_meta<'a>(segments: impl Iterator<Item = &'a str>) -> Vec<String> {
    segments
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl FromStr for FreenetUri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FreenetUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ascii_string())
    }
}

impl fmt::Debug for FreenetUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_insert_form() {
            // The routing key slot of an insert URI holds the private seed.
            return f
                .debug_tuple("FreenetUri")
                .field(&format_args!("{}@[REDACTED]", self.key_type))
                .finish();
        }
        f.debug_tuple("FreenetUri")
            .field(&self.to_ascii_string())
            .finish()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn parse_never_panics(s in "\\PC{0,80}") {
            let _ = FreenetUri::parse(&s);
        }

        #[test]
        fn ksk_names_survive_serialization(name in "[A-Za-z0-9._~-]{1,40}") {
            let uri = FreenetUri::ksk(&name).unwrap();
            prop_assert_eq!(uri.to_ascii_string(), format!("KSK@{name}"));
        }
    }
}
