/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::config::{SignedPath, SignedPaths};
use crate::cookie::{CookieOptions, SignedCookies};
use crate::encoding::UrlSafeEncoding;
use crate::error::SigningError;
use crate::key::{KeyMaterial, PrivateKey};
use crate::path::join_host;
use crate::sign::{SignedToken, SigningRequest};
use crate::signed_url::SignedUrl;
use crate::time::TimeNormalizer;
use aws_smithy_async::time::SharedTimeSource;
use serde::Deserialize;

/// How signed access is handed to the viewer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryMode {
    /// Redirect to the requested URL with signing query parameters.
    #[default]
    SignedUrl,
    /// Set the CloudFront signed cookies on the response.
    SignedCookies,
}

/// The result of signing an incoming request.
#[derive(Debug, Clone)]
pub enum SignedArtifact {
    /// Redirect the viewer here.
    Redirect(SignedUrl),
    /// Add these cookies to the response.
    Cookies(SignedCookies),
}

/// Everything needed to sign requests for a set of paths: a key pair ID, its private key,
/// and how the result is delivered.
///
/// Built once and shared; nothing here changes after construction.
#[derive(Debug, Clone)]
pub struct SignedResource {
    key_pair_id: String,
    private_key: PrivateKey,
    public_key: Option<String>,
    delivery: DeliveryMode,
    cookie_defaults: CookieOptions,
    encoding: UrlSafeEncoding,
    time_source: SharedTimeSource,
}

impl SignedResource {
    /// Creates a new builder.
    pub fn builder() -> SignedResourceBuilder {
        SignedResourceBuilder::default()
    }

    /// The key pair ID.
    pub fn key_pair_id(&self) -> &str {
        &self.key_pair_id
    }

    /// The public key registered with CloudFront, when built from [`KeyMaterial`].
    pub fn public_key(&self) -> Option<&str> {
        self.public_key.as_deref()
    }

    /// How signed access is delivered.
    pub fn delivery(&self) -> DeliveryMode {
        self.delivery
    }

    /// Builds the signing request for a configured path, as requested at `request_url`.
    ///
    /// Wildcard paths sign their pattern as the policy resource; exact paths sign the URL.
    pub fn signing_request(
        &self,
        signed_path: &SignedPath,
        host: &str,
        request_url: &str,
    ) -> Result<SigningRequest, SigningError> {
        let config = signed_path.path();
        let mut builder = SigningRequest::builder()
            .resource_url(request_url)
            .key_pair_id(&self.key_pair_id)
            .private_key(self.private_key.clone())
            .encoding(self.encoding)
            .cookie_options(self.cookie_defaults.merge(signed_path.cookie_options()))
            .time_source(self.time_source.clone());
        if config.has_wildcard() {
            builder = builder.resource_pattern(config.policy_resource(host));
        }
        if let Some(expires) = signed_path.expires() {
            builder = builder.expires_at(expires.clone());
        }
        if let Some(starts) = signed_path.starts() {
            builder = builder.active_at(starts.clone());
        }
        if let Some(ip) = signed_path.ip_address() {
            builder = builder.ip_range(ip);
        }
        builder.build()
    }

    /// Signs a configured path without rendering it.
    pub fn sign_path(
        &self,
        signed_path: &SignedPath,
        host: &str,
    ) -> Result<SignedToken, SigningError> {
        let url = signed_path.path().concrete_url(host);
        self.signing_request(signed_path, host, &url)?.sign()
    }

    /// Finds the configured path for an incoming request and signs it.
    ///
    /// Returns `Ok(None)` when no configured path matches, in which case the request should
    /// pass through unchanged.
    pub fn sign_request(
        &self,
        paths: &SignedPaths,
        host: &str,
        request_path: &str,
    ) -> Result<Option<SignedArtifact>, SigningError> {
        let Some(signed_path) = paths.find(request_path) else {
            return Ok(None);
        };

        let request_url = join_host(host, request_path);
        let request = self.signing_request(signed_path, host, &request_url)?;
        let artifact = match self.delivery {
            DeliveryMode::SignedUrl => SignedArtifact::Redirect(request.sign_url()?),
            DeliveryMode::SignedCookies => SignedArtifact::Cookies(request.sign_cookies()?),
        };
        Ok(Some(artifact))
    }

    /// Renders signed cookies for a configured path, with `options` overriding both the
    /// resource defaults and the path's own cookie options.
    pub fn cookies_for(
        &self,
        signed_path: &SignedPath,
        host: &str,
        options: &CookieOptions,
    ) -> Result<SignedCookies, SigningError> {
        let token = self.sign_path(signed_path, host)?;
        let merged = self
            .cookie_defaults
            .merge(signed_path.cookie_options())
            .merge(options);
        token.to_cookies(&merged, &TimeNormalizer::new(self.time_source.clone()))
    }
}

/// Builder for [`SignedResource`].
#[derive(Debug, Default)]
pub struct SignedResourceBuilder {
    key_pair_id: Option<String>,
    private_key: Option<PrivateKey>,
    public_key: Option<String>,
    delivery: Option<DeliveryMode>,
    cookie_defaults: Option<CookieOptions>,
    encoding: Option<UrlSafeEncoding>,
    time_source: Option<SharedTimeSource>,
}

impl SignedResourceBuilder {
    /// Sets the key pair ID registered with CloudFront.
    pub fn key_pair_id(mut self, id: impl Into<String>) -> Self {
        self.key_pair_id = Some(id.into());
        self
    }

    /// Sets the private key.
    pub fn private_key(mut self, key: PrivateKey) -> Self {
        self.private_key = Some(key);
        self
    }

    /// Sets both keys from parsed key material.
    pub fn key_material(mut self, material: KeyMaterial) -> Self {
        self.public_key = Some(material.public_key().to_owned());
        self.private_key = Some(material.private_key().clone());
        self
    }

    /// Sets how signed access is delivered. Defaults to [`DeliveryMode::SignedUrl`].
    pub fn delivery(mut self, delivery: DeliveryMode) -> Self {
        self.delivery = Some(delivery);
        self
    }

    /// Sets cookie attributes applied to every path unless overridden.
    pub fn cookie_defaults(mut self, options: CookieOptions) -> Self {
        self.cookie_defaults = Some(options);
        self
    }

    /// Sets the URL-safe encoding.
    pub fn encoding(mut self, encoding: UrlSafeEncoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Sets the time source.
    pub fn time_source(mut self, time_source: SharedTimeSource) -> Self {
        self.time_source = Some(time_source);
        self
    }

    /// Builds the resource.
    pub fn build(self) -> Result<SignedResource, SigningError> {
        let key_pair_id = self
            .key_pair_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SigningError::invalid_input("key_pair_id is required"))?;
        let private_key = self
            .private_key
            .ok_or_else(|| SigningError::invalid_input("private_key is required"))?;
        Ok(SignedResource {
            key_pair_id,
            private_key,
            public_key: self.public_key,
            delivery: self.delivery.unwrap_or_default(),
            cookie_defaults: self.cookie_defaults.unwrap_or_default(),
            encoding: self.encoding.unwrap_or_default(),
            time_source: self.time_source.unwrap_or_default(),
        })
    }
}
