/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::cookie::{render_cookies, CookieOptions, SignedCookies};
use crate::encoding::UrlSafeEncoding;
use crate::error::SigningError;
use crate::key::PrivateKey;
use crate::policy::{AccessPolicy, PolicyMode};
use crate::signed_url::{render_url, SignedUrl};
use crate::time::{TimeInput, TimeNormalizer};
use aws_smithy_async::time::SharedTimeSource;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Expiration {
    At(TimeInput),
    In(Duration),
}

/// Request to sign a CloudFront URL or generate signed cookies.
#[derive(Debug, Clone)]
pub struct SigningRequest {
    pub(crate) resource_url: String,
    pub(crate) resource_pattern: Option<String>,
    pub(crate) key_pair_id: String,
    pub(crate) private_key: PrivateKey,
    pub(crate) expires_at: i64,
    pub(crate) active_at: Option<i64>,
    pub(crate) ip_range: Option<String>,
    pub(crate) encoding: UrlSafeEncoding,
    pub(crate) cookie_options: CookieOptions,
    pub(crate) normalizer: TimeNormalizer,
}

impl SigningRequest {
    /// Creates a new builder for constructing a signing request.
    pub fn builder() -> SigningRequestBuilder {
        SigningRequestBuilder::default()
    }

    /// The URL being signed.
    pub fn resource_url(&self) -> &str {
        &self.resource_url
    }

    /// Expiration in epoch seconds.
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    /// Activation time in epoch seconds, if any.
    pub fn active_at(&self) -> Option<i64> {
        self.active_at
    }

    /// Builds the access policy and signs it.
    pub fn sign(&self) -> Result<SignedToken, SigningError> {
        let mut policy = AccessPolicy::builder()
            .resource(
                self.resource_pattern
                    .as_deref()
                    .unwrap_or(&self.resource_url),
            )
            .expires_at(self.expires_at);
        if let Some(active) = self.active_at {
            policy = policy.starts_at(active);
        }
        if let Some(ref ip) = self.ip_range {
            policy = policy.source_ip(ip);
        }
        let policy = policy.build()?;

        // A canned policy is only valid for the exact URL in the request.
        let mode = if self.resource_pattern.is_some() {
            PolicyMode::Custom
        } else {
            policy.mode()
        };

        SignedToken::sign(
            &self.resource_url,
            &self.key_pair_id,
            policy,
            mode,
            &self.private_key,
            self.encoding,
        )
    }

    pub(crate) fn sign_url(&self) -> Result<SignedUrl, SigningError> {
        let token = self.sign()?;
        render_url(&self.resource_url, &token)
    }

    pub(crate) fn sign_cookies(&self) -> Result<SignedCookies, SigningError> {
        let token = self.sign()?;
        render_cookies(&token, &self.cookie_options, &self.normalizer)
    }
}

/// Builder for [`SigningRequest`].
#[derive(Default, Debug)]
pub struct SigningRequestBuilder {
    resource_url: Option<String>,
    resource_pattern: Option<String>,
    key_pair_id: Option<String>,
    private_key: Option<PrivateKey>,
    expiration: Option<Expiration>,
    active_at: Option<TimeInput>,
    ip_range: Option<String>,
    encoding: Option<UrlSafeEncoding>,
    cookie_options: Option<CookieOptions>,
    time_source: Option<SharedTimeSource>,
}

impl SigningRequestBuilder {
    /// Sets the CloudFront resource URL to sign.
    pub fn resource_url(mut self, url: impl Into<String>) -> Self {
        self.resource_url = Some(url.into());
        self
    }

    /// Sets the policy `Resource`, when it differs from the URL (for example
    /// `https://d111111abcdef8.cloudfront.net/videos/*`).
    ///
    /// Setting a pattern always produces a custom policy.
    pub fn resource_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.resource_pattern = Some(pattern.into());
        self
    }

    /// Sets the CloudFront key pair ID.
    pub fn key_pair_id(mut self, id: impl Into<String>) -> Self {
        self.key_pair_id = Some(id.into());
        self
    }

    /// Sets the private key for signing.
    pub fn private_key(mut self, key: PrivateKey) -> Self {
        self.private_key = Some(key);
        self
    }

    /// Sets an absolute expiration time, in any shape [`TimeNormalizer`] accepts.
    ///
    /// An expiration that does not describe a valid instant falls back to one week from now.
    pub fn expires_at(mut self, time: impl Into<TimeInput>) -> Self {
        self.expiration = Some(Expiration::At(time.into()));
        self
    }

    /// Sets a relative expiration time from now.
    pub fn expires_in(mut self, duration: Duration) -> Self {
        self.expiration = Some(Expiration::In(duration));
        self
    }

    /// Sets an activation time (not-before date) for custom policy.
    pub fn active_at(mut self, time: impl Into<TimeInput>) -> Self {
        self.active_at = Some(time.into());
        self
    }

    /// Sets an IP range restriction (CIDR notation) for custom policy.
    pub fn ip_range(mut self, cidr: impl Into<String>) -> Self {
        self.ip_range = Some(cidr.into());
        self
    }

    /// Sets how signature, policy and key pair ID are made URL safe.
    pub fn encoding(mut self, encoding: UrlSafeEncoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Sets the attributes used when rendering signed cookies.
    pub fn cookie_options(mut self, options: CookieOptions) -> Self {
        self.cookie_options = Some(options);
        self
    }

    /// Sets the time source used for relative and default times.
    pub fn time_source(mut self, time_source: SharedTimeSource) -> Self {
        self.time_source = Some(time_source);
        self
    }

    /// Builds the signing request.
    pub fn build(self) -> Result<SigningRequest, SigningError> {
        let resource_url = self
            .resource_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| SigningError::invalid_input("resource_url is required"))?;

        let key_pair_id = self
            .key_pair_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SigningError::invalid_input("key_pair_id is required"))?;

        let private_key = self
            .private_key
            .ok_or_else(|| SigningError::invalid_input("private_key is required"))?;

        let normalizer = TimeNormalizer::new(self.time_source.unwrap_or_default());

        let expires_at = match self.expiration {
            Some(Expiration::At(time)) => normalizer.expires(Some(&time)),
            Some(Expiration::In(duration)) => i64::try_from(duration.as_secs())
                .ok()
                .and_then(|secs| normalizer.now_millis().div_euclid(1000).checked_add(secs))
                .ok_or_else(|| {
                    SigningError::invalid_input(format!(
                        "expires_in duration {duration:?} is out of range"
                    ))
                })?,
            None => normalizer.expires(None),
        };

        let active_at = self.active_at.map(|time| normalizer.starts(Some(&time)));

        Ok(SigningRequest {
            resource_url,
            resource_pattern: self.resource_pattern,
            key_pair_id,
            private_key,
            expires_at,
            active_at,
            ip_range: self.ip_range,
            encoding: self.encoding.unwrap_or_default(),
            cookie_options: self.cookie_options.unwrap_or_default(),
            normalizer,
        })
    }
}

/// A signed access policy, ready to be rendered as a URL or as cookies.
///
/// The signature covers the exact bytes of [`AccessPolicy::to_json`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedToken {
    resource_path: String,
    key_pair_id: String,
    policy: AccessPolicy,
    mode: PolicyMode,
    signature: Vec<u8>,
    encoding: UrlSafeEncoding,
}

impl SignedToken {
    /// Signs `policy` with `private_key` using RSA-SHA256.
    pub fn sign(
        resource_path: impl Into<String>,
        key_pair_id: impl Into<String>,
        policy: AccessPolicy,
        mode: PolicyMode,
        private_key: &PrivateKey,
        encoding: UrlSafeEncoding,
    ) -> Result<Self, SigningError> {
        let signature = private_key.sign(policy.to_json().as_bytes())?;
        Ok(Self {
            resource_path: resource_path.into(),
            key_pair_id: key_pair_id.into(),
            policy,
            mode,
            signature,
            encoding,
        })
    }

    /// The URL this token was issued for.
    pub fn resource_path(&self) -> &str {
        &self.resource_path
    }

    /// The key pair ID a verifier uses to find the public key.
    pub fn key_pair_id(&self) -> &str {
        &self.key_pair_id
    }

    /// The signed policy.
    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Whether this token renders as a canned or a custom policy.
    pub fn mode(&self) -> PolicyMode {
        self.mode
    }

    /// The raw RSA signature.
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// The encoding used for rendered values.
    pub fn encoding(&self) -> UrlSafeEncoding {
        self.encoding
    }

    pub(crate) fn encoded_signature(&self) -> String {
        self.encoding.encode_bytes(&self.signature)
    }

    pub(crate) fn encoded_key_pair_id(&self) -> String {
        self.encoding.encode(&self.key_pair_id)
    }

    pub(crate) fn encoded_policy(&self) -> String {
        self.policy.encode(self.encoding)
    }

    /// Renders the token onto the URL it was issued for.
    pub fn to_url(&self) -> Result<SignedUrl, SigningError> {
        render_url(&self.resource_path, self)
    }

    /// Renders the token as signed cookies.
    pub fn to_cookies(
        &self,
        options: &CookieOptions,
        normalizer: &TimeNormalizer,
    ) -> Result<SignedCookies, SigningError> {
        render_cookies(self, options, normalizer)
    }
}
