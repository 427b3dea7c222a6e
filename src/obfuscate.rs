// Copyright (c) 2025 Sean McNamara <smcnam@gmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Reversible token obfuscation for config files at rest.
//!
//! This is base64 and nothing more. It keeps tokens from being readable at a
//! glance in `~/.config/grepo/users/*.json`; it is not encryption and must
//! never be presented to the user as such.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::{GrepoError, Result};

/// Encode a secret for storage. Deterministic: no salt, no nonce.
pub fn encode(plain: &str) -> String {
    STANDARD.encode(plain.as_bytes())
}

/// Decode a stored secret. See [`decode_field`].
pub fn decode(opaque: &str) -> Result<String> {
    decode_field("value", opaque)
}

/// Decode a stored secret, naming `field` in the error on failure.
///
/// Values whose trailing `=` padding was stripped (by hand-edited files or
/// older tools) are repaired before decoding.
pub fn decode_field(field: &str, opaque: &str) -> Result<String> {
    let trimmed = opaque.trim();
    let decode_err = |reason: String| GrepoError::Decode {
        field: field.to_string(),
        reason,
    };

    // A single leftover character can never be valid base64, padding or not.
    if trimmed.len() % 4 == 1 {
        return Err(decode_err(format!(
            "invalid length {} for base64 data",
            trimmed.len()
        )));
    }

    let mut padded = trimmed.to_string();
    padded.push_str(&"=".repeat(missing_padding(trimmed.len())));

    let bytes = STANDARD
        .decode(padded.as_bytes())
        .map_err(|e| decode_err(e.to_string()))?;

    String::from_utf8(bytes).map_err(|e| decode_err(e.to_string()))
}

fn missing_padding(len: usize) -> usize {
    (4 - len % 4) % 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_examples() {
        for plain in ["", "a", "ab", "abc", "abcd", "ghp_ABC123", "sk-or-v1-ümlaut ✓"] {
            assert_eq!(decode(&encode(plain)).unwrap(), plain);
        }
    }

    #[test]
    fn test_encode_is_deterministic() {
        assert_eq!(encode("ghp_ABC123"), encode("ghp_ABC123"));
        assert_eq!(encode("ghp_ABC123"), "Z2hwX0FCQzEyMw==");
    }

    #[test]
    fn test_stripped_padding_is_repaired() {
        // Lengths 0, 1 and 2 mod 3 exercise zero, two and one padding chars.
        for plain in ["abc", "abcd", "abcde"] {
            let encoded = encode(plain);
            let stripped = encoded.trim_end_matches('=');
            assert_eq!(decode(stripped).unwrap(), plain, "input {:?}", stripped);
            assert_eq!(decode(stripped).unwrap(), decode(&encoded).unwrap());
        }
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        assert_eq!(decode("  Z2hwX0FCQzEyMw==\n").unwrap(), "ghp_ABC123");
    }

    #[test]
    fn test_invalid_alphabet_is_decode_error() {
        let err = decode_field("token", "not*base64!").unwrap_err();
        match err {
            GrepoError::Decode { field, .. } => assert_eq!(field, "token"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_impossible_length_is_decode_error() {
        let err = decode_field("openrouter_token", "abcde").unwrap_err();
        assert!(matches!(err, GrepoError::Decode { ref field, .. } if field == "openrouter_token"));
    }

    #[test]
    fn test_non_utf8_payload_is_decode_error() {
        // 0xff 0xfe is not valid UTF-8.
        let opaque = STANDARD.encode([0xffu8, 0xfe]);
        assert!(matches!(decode(&opaque), Err(GrepoError::Decode { .. })));
    }

    #[test]
    fn test_missing_padding() {
        assert_eq!(missing_padding(0), 0);
        assert_eq!(missing_padding(2), 2);
        assert_eq!(missing_padding(3), 1);
        assert_eq!(missing_padding(4), 0);
    }
}
