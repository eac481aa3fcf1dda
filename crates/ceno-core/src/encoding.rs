//! The URL-safe base64 variant used inside key URIs.
//!
//! Same bit layout as RFC 4648 base64, but `+` and `/` are replaced by `~` and
//! `-` so encoded keys survive inside URI paths, and padding is never emitted.

use base64::Engine;
use base64::alphabet::Alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

const KEY_ALPHABET: Alphabet =
    match Alphabet::new("ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789~-") {
        Ok(alphabet) => alphabet,
        Err(_) => panic!("key alphabet must hold 64 unique printable characters"),
    };

const KEY_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &KEY_ALPHABET,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode bytes with the key alphabet.
#[must_use]
pub fn encode(data: &[u8]) -> String {
    KEY_ENGINE.encode(data)
}

/// Decode a key-alphabet string. Trailing `=` padding is tolerated.
pub fn decode(s: &str) -> Option<Vec<u8>> {
    KEY_ENGINE.decode(s).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_without_padding() {
        assert_eq!(encode(b"f"), "Zg");
        assert_eq!(encode(b"fo"), "Zm8");
        assert_eq!(encode(b"foo"), "Zm9v");
    }

    #[test]
    fn uses_tilde_and_dash() {
        // 0xfb 0xff -> "+/8" in standard base64
        assert_eq!(encode(&[0xfb, 0xff]), "~-8");
        assert_eq!(decode("~-8").unwrap(), vec![0xfb, 0xff]);
    }

    #[test]
    fn rejects_standard_alphabet_symbols() {
        assert!(decode("+/8").is_none());
    }

    #[test]
    fn tolerates_padding() {
        assert_eq!(decode("Zg==").unwrap(), b"f".to_vec());
    }

    #[test]
    fn key_sized_input_is_43_chars() {
        assert_eq!(encode(&[0xAB; 32]).len(), 43);
    }
}
