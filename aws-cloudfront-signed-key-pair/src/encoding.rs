/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The URL-safe alphabet CloudFront expects in signed URLs and cookies.
//!
//! CloudFront reads base64 with `+`, `=`, and `/` replaced by `-`, `_`, and `~`.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left untouched by URI component escaping.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// How values are made safe for query strings and cookie values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub enum UrlSafeEncoding {
    /// Replaces every `+`, `=`, and `/` before escaping the remainder, and carries the
    /// policy document as base64. This is the form CloudFront validates.
    #[default]
    CloudFront,
    /// Escapes first and then replaces only the first `+`, `=`, and `/`, carrying the policy
    /// document as escaped JSON. Matches tokens issued by existing edge deployments byte
    /// for byte.
    Legacy,
}

impl UrlSafeEncoding {
    /// Encodes a string value.
    pub fn encode(self, value: &str) -> String {
        match self {
            UrlSafeEncoding::CloudFront => encode_uri_component(&substitute_all(value)),
            UrlSafeEncoding::Legacy => substitute_first(&encode_uri_component(value)),
        }
    }

    /// Encodes raw bytes as standard base64 and then as [`encode`](Self::encode).
    pub fn encode_bytes(self, bytes: &[u8]) -> String {
        self.encode(&base64_simd::STANDARD.encode_to_string(bytes))
    }
}

/// Escapes everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`, as URI components are escaped
/// in browsers.
pub fn encode_uri_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

fn substitute_all(value: &str) -> String {
    value.replace('+', "-").replace('=', "_").replace('/', "~")
}

fn substitute_first(value: &str) -> String {
    value
        .replacen('+', "-", 1)
        .replacen('=', "_", 1)
        .replacen('/', "~", 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn uri_component_escaping() {
        assert_eq!(
            encode_uri_component("a b;c,d/é?x=1&y"),
            "a%20b%3Bc%2Cd%2F%C3%A9%3Fx%3D1%26y"
        );
        assert_eq!(encode_uri_component("A-z_0.9!~*'()"), "A-z_0.9!~*'()");
    }

    #[test]
    fn cloudfront_replaces_every_occurrence() {
        assert_eq!(UrlSafeEncoding::CloudFront.encode("ab+/c+d/=="), "ab-~c-d~__");
    }

    #[test]
    fn legacy_escapes_before_replacing() {
        assert_eq!(UrlSafeEncoding::Legacy.encode("ab+/c=="), "ab%2B%2Fc%3D%3D");
    }

    #[test]
    fn legacy_replaces_only_first_occurrence() {
        assert_eq!(substitute_first("a+b+c=d=e/f/g"), "a-b+c_d=e~f/g");
    }

    #[test]
    fn cloudfront_base64_alphabet() {
        let bytes: Vec<u8> = (0..=255u8).collect();
        let encoded = UrlSafeEncoding::CloudFront.encode_bytes(&bytes);
        assert!(encoded
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '~')));
        assert!(encoded.contains('~'));

        let restored = encoded.replace('-', "+").replace('_', "=").replace('~', "/");
        assert_eq!(
            base64_simd::STANDARD.decode_to_vec(restored).unwrap(),
            bytes
        );
    }

    #[test]
    fn key_pair_ids_pass_through() {
        for encoding in [UrlSafeEncoding::CloudFront, UrlSafeEncoding::Legacy] {
            assert_eq!(encoding.encode("K2JCJMDEHXQW5F"), "K2JCJMDEHXQW5F");
        }
    }
}
