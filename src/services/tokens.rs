//! Bearer token generation.

use rand::RngCore;
use std::fmt::Write;

/// Random bytes per access token; hex encoding doubles the length.
pub const ACCESS_TOKEN_BYTES: usize = 128;

/// Generate an access token: 128 bytes from the thread-local CSPRNG, lowercase hex.
#[must_use]
pub fn generate_access_token() -> String {
    let mut bytes = [0u8; ACCESS_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);

    bytes
        .iter()
        .fold(String::with_capacity(ACCESS_TOKEN_BYTES * 2), |mut acc, b| {
            let _ = write!(acc, "{b:02x}");
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_token_format() {
        let token = generate_access_token();
        assert_eq!(token.len(), ACCESS_TOKEN_BYTES * 2);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        );
    }

    #[test]
    fn test_tokens_are_unique() {
        let tokens: HashSet<String> = (0..64).map(|_| generate_access_token()).collect();
        assert_eq!(tokens.len(), 64);
    }
}
