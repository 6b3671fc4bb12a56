/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

/* Automatically managed default lints */
#![cfg_attr(docsrs, feature(doc_cfg))]
/* End of automatically managed default lints */
//! CloudFront signed URLs and signed cookies.
//!
//! A [`SigningRequest`] describes what to sign: the URL, who signs it (key pair ID and RSA
//! private key) and the policy conditions (expiration, optional activation time and source IP
//! range). Signing produces a [`SignedToken`], which renders either as a [`SignedUrl`] or as
//! [`SignedCookies`].
//!
//! Requests without an activation time, an IP range or a wildcard resource use a canned
//! policy (`Expires`); everything else uses a custom policy (`Policy`).
//!
//! ```no_run
//! use aws_cloudfront_signed_key_pair::{sign_url, PrivateKey, SigningRequest};
//! use std::time::Duration;
//!
//! # fn example(pem: &[u8]) -> Result<(), aws_cloudfront_signed_key_pair::error::SigningError> {
//! let request = SigningRequest::builder()
//!     .resource_url("https://d111111abcdef8.cloudfront.net/image.jpg")
//!     .key_pair_id("K2JCJMDEHXQW5F")
//!     .private_key(PrivateKey::from_pem(pem)?)
//!     .expires_in(Duration::from_secs(3600))
//!     .build()?;
//! let url = sign_url(request)?;
//! println!("{url}");
//! # Ok(())
//! # }
//! ```
//!
//! For edge functions, [`SignedResource::sign_request`] looks the request path up in a
//! [`SignedPaths`] list and returns a redirect or cookies for it.

#![warn(
    missing_docs,
    rustdoc::missing_crate_level_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

mod config;
mod cookie;
mod encoding;
/// Error types for CloudFront signing operations.
pub mod error;
mod key;
mod path;
mod policy;
mod resource;
mod sign;
mod signed_url;
mod time;

pub use config::{SignedPath, SignedPaths};
pub use cookie::{
    render_cookies, CookieFormatter, CookieOptions, CookieValue, EdgeHeader, EdgeHeaders,
    SameSite, SetCookieHeader, SignedCookie, SignedCookies,
};
pub use encoding::{encode_uri_component, UrlSafeEncoding};
pub use key::{KeyMaterial, PrivateKey};
pub use path::{is_match, path_pattern_from_key, sanitize_path_key, PathConfig, PathMatcher};
pub use policy::{https_resource, AccessPolicy, PolicyBuilder, PolicyMode};
pub use resource::{DeliveryMode, SignedArtifact, SignedResource, SignedResourceBuilder};
pub use sign::{SignedToken, SigningRequest, SigningRequestBuilder};
pub use signed_url::{render_url, SignedUrl};
pub use time::{TimeInput, TimeNormalizer, DEFAULT_EXPIRATION, SECONDS_THRESHOLD_MILLIS};

/// Sign a CloudFront URL with canned or custom policy
pub fn sign_url(request: SigningRequest) -> Result<SignedUrl, error::SigningError> {
    request.sign_url()
}

/// Generate signed cookies with canned or custom policy
pub fn sign_cookies(request: SigningRequest) -> Result<SignedCookies, error::SigningError> {
    request.sign_cookies()
}
