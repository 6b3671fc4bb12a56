/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::encoding::UrlSafeEncoding;
use crate::error::SigningError;
use crate::policy::PolicyMode;
use crate::sign::SignedToken;
use std::fmt;
use url::Url;

const PARAM_KEY_PAIR_ID: &str = "Key-Pair-Id";
const PARAM_SIGNATURE: &str = "Signature";
const PARAM_EXPIRES: &str = "Expires";
const PARAM_POLICY: &str = "Policy";

/// A signed CloudFront URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrl {
    url: Url,
}

impl SignedUrl {
    /// Returns the complete signed URL as a string.
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// Returns the parsed URL.
    pub fn as_url(&self) -> &Url {
        &self.url
    }

    /// Consumes this value, returning the parsed URL.
    pub fn into_url(self) -> Url {
        self.url
    }

    /// Builds a `302 Found` response redirecting to this URL.
    #[cfg(feature = "http-1x")]
    #[cfg_attr(docsrs, doc(cfg(feature = "http-1x")))]
    pub fn to_redirect(&self) -> Result<http_1x::Response<()>, SigningError> {
        let location = http_1x::HeaderValue::from_str(self.as_str())
            .map_err(|err| SigningError::invalid_input(err.to_string()))?;
        let mut response = http_1x::Response::new(());
        *response.status_mut() = http_1x::StatusCode::FOUND;
        response
            .headers_mut()
            .insert(http_1x::header::LOCATION, location);
        Ok(response)
    }
}

impl fmt::Display for SignedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

impl AsRef<str> for SignedUrl {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<SignedUrl> for Url {
    fn from(value: SignedUrl) -> Self {
        value.url
    }
}

/// Appends the signing parameters of `token` to `base`.
///
/// Parameters are appended after any existing query, in the order `Key-Pair-Id`, `Signature`,
/// then `Policy` for custom policies or `Expires` for canned ones.
///
/// With [`UrlSafeEncoding::Legacy`] the already escaped values are form-urlencoded once more,
/// so `%` reads `%25` in the final URL.
pub fn render_url(base: &str, token: &SignedToken) -> Result<SignedUrl, SigningError> {
    let mut url = Url::parse(base)
        .map_err(|err| SigningError::invalid_input(format!("`{base}` is not a valid URL: {err}")))?;

    let last = match token.mode() {
        PolicyMode::Custom => (PARAM_POLICY, token.encoded_policy()),
        PolicyMode::Canned => (PARAM_EXPIRES, token.policy().expires_at().to_string()),
    };
    let params = [
        (PARAM_KEY_PAIR_ID, token.encoded_key_pair_id()),
        (PARAM_SIGNATURE, token.encoded_signature()),
        last,
    ];

    match token.encoding() {
        UrlSafeEncoding::Legacy => {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &params {
                pairs.append_pair(name, value);
            }
        }
        _ => {
            let mut query = match url.query() {
                Some(existing) if !existing.is_empty() => format!("{existing}&"),
                _ => String::new(),
            };
            let appended: Vec<String> = params
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect();
            query.push_str(&appended.join("&"));
            url.set_query(Some(&query));
        }
    }

    Ok(SignedUrl { url })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::test_keys::TEST_RSA_KEY_PEM;
    use crate::key::PrivateKey;
    use crate::policy::AccessPolicy;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn token(resource: &str, ip: Option<&str>, encoding: UrlSafeEncoding) -> SignedToken {
        let mut policy = AccessPolicy::builder()
            .resource(resource)
            .expires_at(1767290400);
        if let Some(ip) = ip {
            policy = policy.source_ip(ip);
        }
        let policy = policy.build().unwrap();
        let mode = policy.mode();
        SignedToken::sign(
            resource,
            "APKAEXAMPLE",
            policy,
            mode,
            &PrivateKey::from_pem(TEST_RSA_KEY_PEM).unwrap(),
            encoding,
        )
        .unwrap()
    }

    fn param_names(url: &SignedUrl) -> Vec<String> {
        url.as_url()
            .query_pairs()
            .map(|(name, _)| name.into_owned())
            .collect()
    }

    #[test]
    fn test_canned_url() {
        let token = token(
            "https://d111111abcdef8.cloudfront.net/image.jpg",
            None,
            UrlSafeEncoding::CloudFront,
        );
        let url = token.to_url().unwrap();

        assert_eq!(param_names(&url), ["Key-Pair-Id", "Signature", "Expires"]);
        assert!(url.as_str().starts_with(
            "https://d111111abcdef8.cloudfront.net/image.jpg?Key-Pair-Id=APKAEXAMPLE&Signature="
        ));
        assert!(url.as_str().ends_with("&Expires=1767290400"));
    }

    #[test]
    fn test_custom_url() {
        let token = token(
            "https://d111111abcdef8.cloudfront.net/image.jpg",
            Some("192.0.2.0/24"),
            UrlSafeEncoding::CloudFront,
        );
        let url = token.to_url().unwrap();

        assert_eq!(param_names(&url), ["Key-Pair-Id", "Signature", "Policy"]);
        let params: HashMap<_, _> = url.as_url().query_pairs().into_owned().collect();
        assert_eq!(params["Policy"], token.encoded_policy());
        assert_eq!(params["Signature"], token.encoded_signature());
    }

    #[test]
    fn test_existing_query_is_kept() {
        let token = token(
            "https://d111111abcdef8.cloudfront.net/image.jpg?size=large",
            None,
            UrlSafeEncoding::CloudFront,
        );
        let url = token.to_url().unwrap();
        assert!(url
            .as_str()
            .contains("image.jpg?size=large&Key-Pair-Id=APKAEXAMPLE&Signature="));
    }

    #[test]
    fn test_legacy_url_escapes_values_twice() {
        let token = token(
            "https://d111111abcdef8.cloudfront.net/image.jpg?size=large",
            Some("192.0.2.0/24"),
            UrlSafeEncoding::Legacy,
        );
        let url = token.to_url().unwrap();

        assert_eq!(param_names(&url), ["size", "Key-Pair-Id", "Signature", "Policy"]);
        assert!(url.as_str().contains("?size=large&Key-Pair-Id=APKAEXAMPLE&Signature="));
        // A 64-byte signature always ends in `==`.
        assert!(url.as_str().contains("%253D%253D&Policy=%257B%2522Statement%2522"));

        let params: HashMap<_, _> = url.as_url().query_pairs().into_owned().collect();
        assert_eq!(params["Signature"], token.encoded_signature());
        assert_eq!(params["Policy"], token.encoded_policy());
    }

    #[test]
    fn test_signature_uses_cloudfront_alphabet() {
        let token = token(
            "https://d111111abcdef8.cloudfront.net/image.jpg",
            None,
            UrlSafeEncoding::CloudFront,
        );
        let signature = token.encoded_signature();
        assert!(signature
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '~')));
    }

    #[test]
    fn test_invalid_base_url() {
        let token = token(
            "https://d111111abcdef8.cloudfront.net/image.jpg",
            None,
            UrlSafeEncoding::CloudFront,
        );
        let err = render_url("d111111abcdef8.cloudfront.net/image.jpg", &token).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidInput);
    }

    #[cfg(feature = "http-1x")]
    #[test]
    fn test_redirect_response() {
        let token = token(
            "https://d111111abcdef8.cloudfront.net/image.jpg",
            None,
            UrlSafeEncoding::CloudFront,
        );
        let url = token.to_url().unwrap();
        let response = url.to_redirect().unwrap();
        assert_eq!(response.status(), http_1x::StatusCode::FOUND);
        assert_eq!(
            response.headers()[http_1x::header::LOCATION],
            url.as_str()
        );
    }
}
