//! Key sizes, URI syntax constants and field-set markers.

// Key material sizes
pub const ROUTING_KEY_LENGTH: usize = 32;
pub const CRYPTO_KEY_LENGTH: usize = 32;
pub const EXTRA_LENGTH: usize = 5;
pub const SEED_LENGTH: usize = 32;

// Extra-bytes layout for SSK keys: [version, insert flag, crypto alg, hash alg (2 bytes)]
pub const SSK_VERSION: u8 = 1;
pub const EXTRA_INSERT_FLAG_INDEX: usize = 1;
pub const CRYPTO_ALGORITHM_AES_CTR_256_SHA256: u8 = 2;
pub const HASH_ALGORITHM_SHA256: u16 = 1;

// URI syntax
pub const URI_SCHEME_PREFIX: &str = "freenet:";
pub const KEY_TYPE_SEPARATOR: char = '@';
pub const PATH_SEPARATOR: char = '/';
pub const KEY_PART_SEPARATOR: char = ',';

/// Edition used when building a versioned record URI from scratch.
pub const DEFAULT_EDITION: i64 = 0;

// Field set end markers
pub const END_MARKER: &str = "End";
pub const END_MESSAGE_MARKER: &str = "EndMessage";
pub const DATA_MARKER: &str = "Data";

/// Build the 5 extra bytes of an SSK key in insert or request form.
#[must_use]
pub const fn ssk_extra(insert: bool) -> [u8; EXTRA_LENGTH] {
    let hash = HASH_ALGORITHM_SHA256.to_be_bytes();
    [
        SSK_VERSION,
        insert as u8,
        CRYPTO_ALGORITHM_AES_CTR_256_SHA256,
        hash[0],
        hash[1],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_request_extra_differ_only_in_flag() {
        let insert = ssk_extra(true);
        let request = ssk_extra(false);
        assert_eq!(insert[EXTRA_INSERT_FLAG_INDEX], 1);
        assert_eq!(request[EXTRA_INSERT_FLAG_INDEX], 0);
        assert_eq!(insert[0], request[0]);
        assert_eq!(insert[2..], request[2..]);
    }

    #[test]
    fn extra_layout() {
        assert_eq!(ssk_extra(true), [1, 1, 2, 0, 1]);
    }
}
