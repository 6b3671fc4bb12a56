/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! `Set-Cookie` formatting for CloudFront signed cookies.

use crate::encoding::UrlSafeEncoding;
use crate::error::SigningError;
use crate::policy::{AccessPolicy, PolicyMode};
use crate::sign::SignedToken;
use crate::time::{to_millis, TimeInput, TimeNormalizer};
use aws_smithy_types::date_time::Format;
use aws_smithy_types::DateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

const COOKIE_KEY_PAIR_ID: &str = "CloudFront-Key-Pair-Id";
const COOKIE_SIGNATURE: &str = "CloudFront-Signature";
const COOKIE_EXPIRES: &str = "CloudFront-Expires";
const COOKIE_POLICY: &str = "CloudFront-Policy";

const DEFAULT_PATH: &str = "/";
const DEFAULT_SECURE: bool = true;
const DEFAULT_HTTP_ONLY: bool = false;

/// The `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    /// `SameSite=Strict`
    Strict,
    /// `SameSite=Lax`
    Lax,
    /// `SameSite=None`
    None,
}

impl SameSite {
    /// Reads a `SameSite` value in any letter case.
    ///
    /// An empty value is `Lax`. Any other unrecognized value is `Strict`.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("strict") {
            SameSite::Strict
        } else if trimmed.eq_ignore_ascii_case("lax") {
            SameSite::Lax
        } else if trimmed.eq_ignore_ascii_case("none") {
            SameSite::None
        } else if trimmed.is_empty() {
            SameSite::Lax
        } else {
            tracing::warn!(same_site = %value, "unrecognized SameSite value, using Strict");
            SameSite::Strict
        }
    }

    /// The attribute value.
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes for signed cookies.
///
/// Every field is optional. Options layer with [`merge`](Self::merge); anything still unset
/// when a cookie is formatted takes the built-in default (`Path=/`, `Secure`, no `HttpOnly`).
///
/// `expires` and `max_age` are both instants, accepted in any shape [`TimeNormalizer`]
/// accepts. When `max_age` is set the cookie carries `Max-Age` (seconds remaining until that
/// instant); otherwise it carries `Expires`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieOptions {
    domain: Option<String>,
    path: Option<String>,
    expires: Option<TimeInput>,
    max_age: Option<TimeInput>,
    same_site: Option<String>,
    http_only: Option<bool>,
    secure: Option<bool>,
}

impl CookieOptions {
    /// Creates empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `Domain` attribute.
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Sets the `Path` attribute.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the instant rendered as `Expires`.
    pub fn expires(mut self, time: impl Into<TimeInput>) -> Self {
        self.expires = Some(time.into());
        self
    }

    /// Sets the instant rendered as `Max-Age`.
    pub fn max_age(mut self, time: impl Into<TimeInput>) -> Self {
        self.max_age = Some(time.into());
        self
    }

    /// Sets the `SameSite` attribute.
    pub fn same_site(mut self, same_site: impl Into<String>) -> Self {
        self.same_site = Some(same_site.into());
        self
    }

    /// Sets the `HttpOnly` flag.
    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = Some(http_only);
        self
    }

    /// Sets the `Secure` flag.
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = Some(secure);
        self
    }

    /// Layers `overrides` on top of `self`. Fields set in `overrides` win.
    pub fn merge(&self, overrides: &CookieOptions) -> CookieOptions {
        CookieOptions {
            domain: overrides.domain.clone().or_else(|| self.domain.clone()),
            path: overrides.path.clone().or_else(|| self.path.clone()),
            expires: overrides.expires.clone().or_else(|| self.expires.clone()),
            max_age: overrides.max_age.clone().or_else(|| self.max_age.clone()),
            same_site: overrides.same_site.clone().or_else(|| self.same_site.clone()),
            http_only: overrides.http_only.or(self.http_only),
            secure: overrides.secure.or(self.secure),
        }
    }
}

/// A value to place in a cookie.
#[derive(Debug, Clone, Copy)]
pub enum CookieValue<'a> {
    /// A plain string value.
    Text(&'a str),
    /// A policy document, serialized to JSON before encoding.
    Policy(&'a AccessPolicy),
}

impl<'a> From<&'a str> for CookieValue<'a> {
    fn from(value: &'a str) -> Self {
        CookieValue::Text(value)
    }
}

impl<'a> From<&'a String> for CookieValue<'a> {
    fn from(value: &'a String) -> Self {
        CookieValue::Text(value)
    }
}

impl<'a> From<&'a AccessPolicy> for CookieValue<'a> {
    fn from(value: &'a AccessPolicy) -> Self {
        CookieValue::Policy(value)
    }
}

fn has_forbidden_char(value: &str) -> bool {
    value.chars().any(|c| c == ';' || c == ',' || c.is_whitespace())
}

/// Formats single `Set-Cookie` values.
#[derive(Debug, Clone, Default)]
pub struct CookieFormatter {
    encoding: UrlSafeEncoding,
    normalizer: TimeNormalizer,
}

impl CookieFormatter {
    /// Creates a formatter that encodes values with `encoding` and resolves times with
    /// `normalizer`.
    pub fn new(encoding: UrlSafeEncoding, normalizer: TimeNormalizer) -> Self {
        Self {
            encoding,
            normalizer,
        }
    }

    /// Formats `name=value` followed by its attributes.
    ///
    /// Fails with [`InvalidCookieValue`](crate::error::ErrorKind::InvalidCookieValue) when the
    /// name or value contains `;`, `,`, or whitespace. Problems with optional attributes only
    /// drop that attribute and log a warning.
    pub fn format<'a>(
        &self,
        name: &str,
        value: impl Into<CookieValue<'a>>,
        options: &CookieOptions,
    ) -> Result<String, SigningError> {
        self.format_parts(name, value.into(), options)
            .map(|(_, header)| header)
    }

    fn format_parts(
        &self,
        name: &str,
        value: CookieValue<'_>,
        options: &CookieOptions,
    ) -> Result<(String, String), SigningError> {
        let (raw, encoded) = match value {
            CookieValue::Text(text) => (Some(text), self.encoding.encode(text)),
            CookieValue::Policy(policy) => (None, self.encoding.encode(&policy.to_json())),
        };
        if has_forbidden_char(name)
            || raw.map_or(false, has_forbidden_char)
            || has_forbidden_char(&encoded)
        {
            return Err(SigningError::invalid_cookie_value(format!(
                "`{name}` cannot contain semicolons, commas, or whitespace"
            )));
        }

        let mut header = format!("{name}={encoded}");

        if let Some(domain) = options.domain.as_deref().filter(|d| !d.is_empty()) {
            if has_forbidden_char(domain) {
                tracing::warn!(
                    cookie = %name,
                    domain = %domain,
                    "dropping Domain attribute containing semicolons, commas, or whitespace"
                );
            } else {
                header.push_str("; Domain=");
                header.push_str(domain);
            }
        }

        let path = options.path.as_deref().unwrap_or(DEFAULT_PATH);
        if !path.is_empty() {
            if has_forbidden_char(path) {
                tracing::warn!(
                    cookie = %name,
                    path = %path,
                    "dropping Path attribute containing semicolons, commas, or whitespace"
                );
            } else {
                header.push_str("; Path=");
                header.push_str(path);
            }
        }

        if let Some(attribute) = self.expiry_attribute(name, options) {
            header.push_str("; ");
            header.push_str(&attribute);
        }

        if let Some(same_site) = options.same_site.as_deref() {
            header.push_str("; SameSite=");
            header.push_str(SameSite::parse(same_site).as_str());
        }

        if options.http_only.unwrap_or(DEFAULT_HTTP_ONLY) {
            header.push_str("; HttpOnly");
        }
        if options.secure.unwrap_or(DEFAULT_SECURE) {
            header.push_str("; Secure");
        }

        Ok((encoded, header))
    }

    fn expiry_attribute(&self, name: &str, options: &CookieOptions) -> Option<String> {
        let input = options.expires.as_ref().or(options.max_age.as_ref())?;
        let expires_millis = match to_millis(input) {
            Ok(millis) => millis,
            Err(err) => {
                tracing::warn!(cookie = %name, error = %err, "dropping invalid cookie expiry");
                return None;
            }
        };

        let now_millis = self.normalizer.now_millis();
        if expires_millis <= now_millis {
            tracing::warn!(cookie = %name, "cookie is expired");
        }

        if options.max_age.is_some() {
            let max_age = (expires_millis - now_millis).div_euclid(1000).max(0);
            Some(format!("Max-Age={max_age}"))
        } else {
            match DateTime::from_millis(expires_millis).fmt(Format::HttpDate) {
                Ok(date) => Some(format!("Expires={date}")),
                Err(err) => {
                    tracing::warn!(
                        cookie = %name,
                        error = %err,
                        "dropping cookie expiry that cannot be formatted"
                    );
                    None
                }
            }
        }
    }
}

/// One rendered signed cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedCookie {
    name: &'static str,
    value: String,
    header: String,
}

impl SignedCookie {
    /// The cookie name.
    pub fn name(&self) -> &str {
        self.name
    }

    /// The encoded cookie value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The complete `Set-Cookie` header value, attributes included.
    pub fn header(&self) -> &str {
        &self.header
    }
}

/// A `{"Set-Cookie": value}` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetCookieHeader {
    /// The `Set-Cookie` header value.
    #[serde(rename = "Set-Cookie")]
    pub set_cookie: String,
}

/// A `{"key": "Set-Cookie", "value": value}` entry of an edge function headers map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeHeader {
    /// Always `Set-Cookie`.
    pub key: String,
    /// The `Set-Cookie` header value.
    pub value: String,
}

/// Headers map shape used by edge functions: `{"set-cookie": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeHeaders {
    /// The `Set-Cookie` entries, in order.
    #[serde(rename = "set-cookie")]
    pub set_cookie: Vec<EdgeHeader>,
}

/// Signed cookies for CloudFront.
///
/// Cookies are kept in the order `CloudFront-Key-Pair-Id`, `CloudFront-Signature`, then
/// `CloudFront-Policy` or `CloudFront-Expires`. Every rendering derives from that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedCookies {
    cookies: Vec<SignedCookie>,
}

impl SignedCookies {
    /// Returns all cookies in order.
    pub fn cookies(&self) -> &[SignedCookie] {
        &self.cookies
    }

    /// Gets a specific cookie value by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }

    /// Returns an iterator over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cookies.iter().map(|c| (c.name, c.value.as_str()))
    }

    /// All `Set-Cookie` values joined with `"; "`.
    pub fn to_header_string(&self) -> String {
        self.cookies
            .iter()
            .map(|c| c.header.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// One `{"Set-Cookie": value}` entry per cookie.
    pub fn set_cookie_headers(&self) -> Vec<SetCookieHeader> {
        self.cookies
            .iter()
            .map(|c| SetCookieHeader {
                set_cookie: c.header.clone(),
            })
            .collect()
    }

    /// The edge function headers map.
    pub fn edge_headers(&self) -> EdgeHeaders {
        EdgeHeaders {
            set_cookie: self
                .cookies
                .iter()
                .map(|c| EdgeHeader {
                    key: "Set-Cookie".to_owned(),
                    value: c.header.clone(),
                })
                .collect(),
        }
    }

    /// Appends one `Set-Cookie` header per cookie, keeping any already present.
    #[cfg(feature = "http-1x")]
    #[cfg_attr(docsrs, doc(cfg(feature = "http-1x")))]
    pub fn append_to(&self, headers: &mut http_1x::HeaderMap) -> Result<(), SigningError> {
        for cookie in &self.cookies {
            let value = http_1x::HeaderValue::from_str(&cookie.header)
                .map_err(|err| SigningError::invalid_cookie_value(err.to_string()))?;
            headers.append(http_1x::header::SET_COOKIE, value);
        }
        Ok(())
    }
}

impl fmt::Display for SignedCookies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_header_string())
    }
}

/// Renders `token` as signed cookies with the given attributes.
pub fn render_cookies(
    token: &SignedToken,
    options: &CookieOptions,
    normalizer: &TimeNormalizer,
) -> Result<SignedCookies, SigningError> {
    let formatter = CookieFormatter::new(token.encoding(), normalizer.clone());
    let signature = token.encoded_signature();

    let mut cookies = vec![
        signed_cookie(&formatter, COOKIE_KEY_PAIR_ID, token.key_pair_id().into(), options)?,
        signed_cookie(&formatter, COOKIE_SIGNATURE, signature.as_str().into(), options)?,
    ];
    let last = match token.mode() {
        PolicyMode::Custom => match token.encoding() {
            UrlSafeEncoding::Legacy => {
                signed_cookie(&formatter, COOKIE_POLICY, token.policy().into(), options)?
            }
            _ => {
                let policy = token.encoded_policy();
                signed_cookie(&formatter, COOKIE_POLICY, policy.as_str().into(), options)?
            }
        },
        PolicyMode::Canned => {
            let expires = token.policy().expires_at().to_string();
            signed_cookie(&formatter, COOKIE_EXPIRES, expires.as_str().into(), options)?
        }
    };
    cookies.push(last);

    Ok(SignedCookies { cookies })
}

fn signed_cookie(
    formatter: &CookieFormatter,
    name: &'static str,
    value: CookieValue<'_>,
    options: &CookieOptions,
) -> Result<SignedCookie, SigningError> {
    let (value, header) = formatter.format_parts(name, value, options)?;
    Ok(SignedCookie {
        name,
        value,
        header,
    })
}
