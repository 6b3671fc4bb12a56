/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Configured signed paths and matching of request paths against them.
//!
//! A configured path may end in `/*` to cover everything below it. The wildcard is kept for
//! matching and for the policy `Resource`, but dropped from the concrete URL of the path.

use crate::error::SigningError;
use crate::policy::https_resource;
use regex::Regex;

const WILDCARD_SUFFIX: &str = "/*";
const STAR_MARKER: &str = "_STAR_";
const SLASH_MARKER: &str = "_SLASH_";
const RESERVED_PREFIX: &str = "PREFIX_";
const RESERVED_KEY_PREFIXES: [&str; 2] = ["aws", "ssm"];

/// A configured signed path.
#[derive(Debug, Clone)]
pub struct PathConfig {
    raw_path: String,
    has_wildcard: bool,
    matcher: PathMatcher,
}

impl PathConfig {
    /// Parses a configured path such as `/secure/*` or `/downloads/report.pdf`.
    ///
    /// A missing leading `/` is added.
    pub fn new(path: impl Into<String>) -> Result<Self, SigningError> {
        let path = path.into();
        if path.trim().is_empty() {
            return Err(SigningError::invalid_input("signed path cannot be empty"));
        }
        let raw_path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        let has_wildcard = raw_path.ends_with(WILDCARD_SUFFIX);
        let matcher = PathMatcher::new(&raw_path)?;
        Ok(Self {
            raw_path,
            has_wildcard,
            matcher,
        })
    }

    /// The path as configured.
    pub fn raw_path(&self) -> &str {
        &self.raw_path
    }

    /// Whether the path ends in `/*`.
    pub fn has_wildcard(&self) -> bool {
        self.has_wildcard
    }

    /// The form used to match requests. Keeps the wildcard.
    pub fn matchable_form(&self) -> &str {
        &self.raw_path
    }

    /// The path without its wildcard: `/secure/*` becomes `/secure/`.
    pub fn concrete_path(&self) -> &str {
        if self.has_wildcard {
            &self.raw_path[..self.raw_path.len() - 1]
        } else {
            &self.raw_path
        }
    }

    /// The `https` URL of the concrete path on `host`.
    pub fn concrete_url(&self, host: &str) -> String {
        join_host(host, self.concrete_path())
    }

    /// The policy `Resource` for this path on `host`, wildcard included.
    pub fn policy_resource(&self, host: &str) -> String {
        join_host(host, &self.raw_path)
    }

    /// The storage key for this path. See [`sanitize_path_key`].
    pub fn storage_key(&self) -> String {
        sanitize_path_key(&self.raw_path)
    }

    /// Whether `request_path` falls under this path.
    pub fn is_match(&self, request_path: &str) -> bool {
        self.matcher.is_match(request_path)
    }
}

/// Joins `host` and `path` as an https URL, adding the `/` between them if `path` lacks it.
pub(crate) fn join_host(host: &str, path: &str) -> String {
    let host = host.trim_end_matches('/');
    if path.starts_with('/') {
        https_resource(&format!("{host}{path}"))
    } else {
        https_resource(&format!("{host}/{path}"))
    }
}

/// Matches request paths against a configured path pattern.
///
/// `*` matches any run of characters and a leading `/` is optional. The match is anchored
/// at both ends.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    regex: Regex,
}

impl PathMatcher {
    /// Builds a matcher for a configured path. Every character other than `*` is literal.
    pub fn new(pattern: &str) -> Result<Self, SigningError> {
        Self::compile(pattern, false)
    }

    /// Builds a matcher from a key produced by [`sanitize_path_key`].
    ///
    /// Characters that sanitizing replaced with `.` match any single character.
    pub fn from_storage_key(key: &str) -> Result<Self, SigningError> {
        Self::compile(&path_pattern_from_key(key), true)
    }

    fn compile(pattern: &str, dot_matches_any: bool) -> Result<Self, SigningError> {
        let body: String = pattern
            .trim_start_matches('/')
            .chars()
            .map(|c| match c {
                '*' => ".*".to_owned(),
                '.' if dot_matches_any => ".".to_owned(),
                other => regex::escape(other.encode_utf8(&mut [0; 4])),
            })
            .collect();
        let regex = Regex::new(&format!("^/?{body}$")).map_err(|err| {
            SigningError::invalid_input(format!("`{pattern}` is not a valid path pattern: {err}"))
        })?;
        Ok(Self { regex })
    }

    /// Whether `request_path` matches.
    pub fn is_match(&self, request_path: &str) -> bool {
        self.regex.is_match(request_path)
    }
}

/// Whether `request_path` falls under `configured`.
pub fn is_match(configured: &PathConfig, request_path: &str) -> bool {
    configured.is_match(request_path)
}

/// Turns a path into a key that is safe for parameter stores.
///
/// `*` becomes `_STAR_`, `/` becomes `_SLASH_`, and any other character outside
/// `A-Z a-z 0-9 _ . -` becomes `.`. Keys starting with the reserved prefixes `aws` or `ssm`
/// (in any case) are prefixed with `PREFIX_<match>_`.
pub fn sanitize_path_key(path: &str) -> String {
    let mut key = String::with_capacity(path.len());
    for c in path.chars() {
        match c {
            '*' => key.push_str(STAR_MARKER),
            '/' => key.push_str(SLASH_MARKER),
            c if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') => key.push(c),
            _ => key.push('.'),
        }
    }
    match reserved_prefix(&key) {
        Some(len) => format!("{RESERVED_PREFIX}{}_{}", &key[..len], &key[len..]),
        None => key,
    }
}

/// Reverses [`sanitize_path_key`] as far as possible and adds a leading `/` if absent.
///
/// Characters that sanitizing replaced with `.` stay `.`.
pub fn path_pattern_from_key(key: &str) -> String {
    let unprefixed = key
        .strip_prefix(RESERVED_PREFIX)
        .and_then(|rest| {
            let len = reserved_prefix(rest)?;
            rest[len..].strip_prefix('_').map(|tail| format!("{}{tail}", &rest[..len]))
        })
        .unwrap_or_else(|| key.to_owned());
    let path = unprefixed
        .replace(SLASH_MARKER, "/")
        .replace(STAR_MARKER, "*");
    if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    }
}

fn reserved_prefix(key: &str) -> Option<usize> {
    RESERVED_KEY_PREFIXES.iter().find_map(|prefix| {
        key.get(..prefix.len())
            .filter(|head| head.eq_ignore_ascii_case(prefix))
            .map(|head| head.len())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn wildcard_path() {
        let config = PathConfig::new("/secure/*").unwrap();
        assert!(config.has_wildcard());
        assert_eq!(config.raw_path(), "/secure/*");
        assert_eq!(config.matchable_form(), "/secure/*");
        assert_eq!(config.concrete_path(), "/secure/");
        assert_eq!(
            config.concrete_url("d123.cloudfront.net"),
            "https://d123.cloudfront.net/secure/"
        );
        assert_eq!(
            config.policy_resource("http://d123.cloudfront.net/"),
            "https://d123.cloudfront.net/secure/*"
        );
    }

    #[test]
    fn exact_path() {
        let config = PathConfig::new("downloads/report.pdf").unwrap();
        assert!(!config.has_wildcard());
        assert_eq!(config.raw_path(), "/downloads/report.pdf");
        assert_eq!(config.concrete_path(), "/downloads/report.pdf");
        assert!(config.is_match("/downloads/report.pdf"));
        assert!(config.is_match("downloads/report.pdf"));
        assert!(!config.is_match("/downloads/reportXpdf"));
        assert!(!config.is_match("/downloads/report.pdf/extra"));
    }

    #[test]
    fn wildcard_matching() {
        let config = PathConfig::new("/secure/*").unwrap();
        assert!(config.is_match("/secure/"));
        assert!(config.is_match("/secure/a/b/c.mp4"));
        assert!(!config.is_match("/public/secure/a"));
        assert!(!config.is_match("/secure"));
        assert!(is_match(&config, "/secure/index.html"));
    }

    #[test]
    fn join_host_adds_separator() {
        assert_eq!(
            join_host("d123.cloudfront.net", "report.pdf"),
            "https://d123.cloudfront.net/report.pdf"
        );
        assert_eq!(
            join_host("https://d123.cloudfront.net/", "/report.pdf"),
            "https://d123.cloudfront.net/report.pdf"
        );
    }

    #[test]
    fn empty_path_is_rejected() {
        assert!(PathConfig::new("  ").is_err());
    }

    #[test]
    fn storage_keys() {
        assert_eq!(sanitize_path_key("/secure/*"), "_SLASH_secure_SLASH__STAR_");
        assert_eq!(sanitize_path_key("/a b/c~d.txt"), "_SLASH_a.b_SLASH_c.d.txt");
        assert_eq!(sanitize_path_key("aws/media"), "PREFIX_aws__SLASH_media");
        assert_eq!(sanitize_path_key("SSMkeys"), "PREFIX_SSM_keys");
        assert_eq!(
            PathConfig::new("/secure/*").unwrap().storage_key(),
            "_SLASH_secure_SLASH__STAR_"
        );
    }

    #[test]
    fn keys_reverse_to_patterns() {
        assert_eq!(path_pattern_from_key("_SLASH_secure_SLASH__STAR_"), "/secure/*");
        assert_eq!(path_pattern_from_key("PREFIX_aws__SLASH_media"), "/aws/media");
        assert_eq!(path_pattern_from_key("PREFIX_SSM_keys"), "/SSMkeys");
        assert_eq!(path_pattern_from_key("videos"), "/videos");
    }

    #[test]
    fn storage_key_matchers() {
        let matcher = PathMatcher::from_storage_key(&sanitize_path_key("/a b/*")).unwrap();
        assert!(matcher.is_match("/a b/file"));
        assert!(matcher.is_match("/a-b/file"));
        assert!(!matcher.is_match("/ab/file"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let config = PathConfig::new("/files/(v1)+[x]").unwrap();
        assert!(config.is_match("/files/(v1)+[x]"));
        assert!(!config.is_match("/files/v1x"));
    }
}
