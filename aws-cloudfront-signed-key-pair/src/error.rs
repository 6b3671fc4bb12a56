/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

/// The category of a [`SigningError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The private key could not be parsed or is not an RSA key.
    InvalidKeyMaterial,
    /// The access policy is inconsistent (for example, it starts after it expires).
    InvalidPolicy,
    /// A required input was missing or malformed.
    InvalidInput,
    /// A cookie name or value contains `;`, `,`, or whitespace.
    InvalidCookieValue,
    /// Persisted signed-path configuration could not be loaded.
    InvalidConfiguration,
    /// The RSA signing operation itself failed.
    SigningFailure,
}

/// Error type for CloudFront signing operations
#[derive(Debug)]
pub struct SigningError {
    kind: ErrorKind,
    source: Option<Box<dyn StdError + Send + Sync>>,
    message: Option<Cow<'static, str>>,
}

impl SigningError {
    pub(crate) fn new(
        kind: ErrorKind,
        source: Option<Box<dyn StdError + Send + Sync>>,
        message: Option<Cow<'static, str>>,
    ) -> Self {
        Self {
            kind,
            source,
            message,
        }
    }

    pub(crate) fn invalid_key_material(
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self::new(ErrorKind::InvalidKeyMaterial, Some(source.into()), None)
    }

    pub(crate) fn invalid_policy(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::InvalidPolicy, None, Some(message.into()))
    }

    pub(crate) fn invalid_input(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::InvalidInput, None, Some(message.into()))
    }

    pub(crate) fn invalid_cookie_value(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::InvalidCookieValue, None, Some(message.into()))
    }

    pub(crate) fn invalid_configuration(
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self::new(ErrorKind::InvalidConfiguration, Some(source.into()), None)
    }

    pub(crate) fn signing_failure(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::new(ErrorKind::SigningFailure, Some(source.into()), None)
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for SigningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::InvalidKeyMaterial => write!(f, "invalid private key")?,
            ErrorKind::InvalidPolicy => write!(f, "invalid policy")?,
            ErrorKind::InvalidInput => write!(f, "invalid input")?,
            ErrorKind::InvalidCookieValue => write!(f, "invalid cookie value")?,
            ErrorKind::InvalidConfiguration => write!(f, "invalid signed path configuration")?,
            ErrorKind::SigningFailure => write!(f, "signing operation failed")?,
        }
        if let Some(ref msg) = self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl StdError for SigningError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl From<ErrorKind> for SigningError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind, None, None)
    }
}
