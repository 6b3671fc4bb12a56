/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Persisted signed-path configuration.
//!
//! The configuration is a JSON list of entries such as:
//!
//! ```json
//! [
//!   { "path": "/secure/*", "expires": 1767290400, "ipAddress": "192.0.2.0/24" },
//!   { "path": "/downloads/report.pdf", "cookieOptions": { "sameSite": "lax" } }
//! ]
//! ```
//!
//! Time fields accept anything [`TimeNormalizer`](crate::TimeNormalizer) accepts.

use crate::cookie::CookieOptions;
use crate::error::SigningError;
use crate::path::PathConfig;
use crate::time::TimeInput;
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignedPathEntry {
    path: String,
    expires: Option<TimeInput>,
    starts: Option<TimeInput>,
    ip_address: Option<String>,
    cookie_options: Option<CookieOptions>,
}

/// A configured path together with the policy options for it.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "SignedPathEntry")]
pub struct SignedPath {
    path: PathConfig,
    expires: Option<TimeInput>,
    starts: Option<TimeInput>,
    ip_address: Option<String>,
    cookie_options: CookieOptions,
}

impl TryFrom<SignedPathEntry> for SignedPath {
    type Error = SigningError;

    fn try_from(entry: SignedPathEntry) -> Result<Self, Self::Error> {
        Ok(Self {
            path: PathConfig::new(entry.path)?,
            expires: entry.expires,
            starts: entry.starts,
            ip_address: entry.ip_address,
            cookie_options: entry.cookie_options.unwrap_or_default(),
        })
    }
}

impl SignedPath {
    /// Creates an entry for `path` with no policy options.
    pub fn new(path: impl Into<String>) -> Result<Self, SigningError> {
        Ok(Self {
            path: PathConfig::new(path)?,
            expires: None,
            starts: None,
            ip_address: None,
            cookie_options: CookieOptions::default(),
        })
    }

    /// Sets the expiration.
    pub fn with_expires(mut self, time: impl Into<TimeInput>) -> Self {
        self.expires = Some(time.into());
        self
    }

    /// Sets the activation time.
    pub fn with_starts(mut self, time: impl Into<TimeInput>) -> Self {
        self.starts = Some(time.into());
        self
    }

    /// Sets the source IP restriction (CIDR).
    pub fn with_ip_address(mut self, cidr: impl Into<String>) -> Self {
        self.ip_address = Some(cidr.into());
        self
    }

    /// Sets cookie attributes that override the resource defaults for this path.
    pub fn with_cookie_options(mut self, options: CookieOptions) -> Self {
        self.cookie_options = options;
        self
    }

    /// The configured path.
    pub fn path(&self) -> &PathConfig {
        &self.path
    }

    /// The expiration, if configured.
    pub fn expires(&self) -> Option<&TimeInput> {
        self.expires.as_ref()
    }

    /// The activation time, if configured.
    pub fn starts(&self) -> Option<&TimeInput> {
        self.starts.as_ref()
    }

    /// The source IP restriction, if configured.
    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    /// Cookie attributes for this path.
    pub fn cookie_options(&self) -> &CookieOptions {
        &self.cookie_options
    }
}

/// The list of signed paths, searched in order.
#[derive(Debug, Clone, Default)]
pub struct SignedPaths {
    paths: Vec<SignedPath>,
}

impl SignedPaths {
    /// Creates a list from already-built entries.
    pub fn new(paths: Vec<SignedPath>) -> Self {
        Self { paths }
    }

    /// Loads the list from its persisted JSON form.
    pub fn from_json(json: &str) -> Result<Self, SigningError> {
        let paths: Vec<SignedPath> =
            serde_json::from_str(json).map_err(SigningError::invalid_configuration)?;
        Ok(Self { paths })
    }

    /// Loads the list from a JSON byte slice.
    pub fn from_slice(json: &[u8]) -> Result<Self, SigningError> {
        let paths: Vec<SignedPath> =
            serde_json::from_slice(json).map_err(SigningError::invalid_configuration)?;
        Ok(Self { paths })
    }

    /// The first entry whose path matches `request_path`.
    pub fn find(&self, request_path: &str) -> Option<&SignedPath> {
        let found = self
            .paths
            .iter()
            .find(|signed| signed.path.is_match(request_path));
        match found {
            Some(signed) => tracing::debug!(
                request_path = %request_path,
                path = %signed.path.raw_path(),
                "found signed path"
            ),
            None => tracing::debug!(request_path = %request_path, "no signed path matches"),
        }
        found
    }

    /// Iterates over the entries in order.
    pub fn iter(&self) -> impl Iterator<Item = &SignedPath> {
        self.paths.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FromIterator<SignedPath> for SignedPaths {
    fn from_iter<T: IntoIterator<Item = SignedPath>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
