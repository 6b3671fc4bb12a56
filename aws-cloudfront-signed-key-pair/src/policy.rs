/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::encoding::UrlSafeEncoding;
use crate::error::SigningError;
use aws_smithy_json::serialize::JsonObjectWriter;
use aws_smithy_types::Number;
use std::net::IpAddr;

/// Which on-the-wire form a signed token takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyMode {
    /// Expiration only, for one exact resource. Carried as `Expires`.
    Canned,
    /// Activation time, source IP, or a wildcard resource. Carried as the full `Policy`.
    Custom,
}

/// A CloudFront access policy with a single statement.
///
/// Times are epoch seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    resource: String,
    expires_at: i64,
    starts_at: Option<i64>,
    source_ip: Option<String>,
}

impl AccessPolicy {
    /// Creates a new builder.
    pub fn builder() -> PolicyBuilder {
        PolicyBuilder::default()
    }

    /// The `Resource` the policy grants access to.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// The `DateLessThan` condition.
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    /// The `DateGreaterThan` condition, if any.
    pub fn starts_at(&self) -> Option<i64> {
        self.starts_at
    }

    /// The `IpAddress` condition, if any.
    pub fn source_ip(&self) -> Option<&str> {
        self.source_ip.as_deref()
    }

    /// Canned when there is nothing beyond an expiration for a single exact resource.
    pub fn mode(&self) -> PolicyMode {
        if self.starts_at.is_none() && self.source_ip.is_none() && !self.resource.contains('*') {
            PolicyMode::Canned
        } else {
            PolicyMode::Custom
        }
    }

    /// Serializes the policy as CloudFront signs it.
    ///
    /// Key order is fixed (`Resource`, `Condition`, then `DateLessThan`, `DateGreaterThan`,
    /// `IpAddress`) and no whitespace is emitted; the signature covers these exact bytes.
    pub fn to_json(&self) -> String {
        let mut out = String::new();
        let mut root = JsonObjectWriter::new(&mut out);

        let mut statement_array = root.key("Statement").start_array();
        let mut statement = statement_array.value().start_object();

        statement.key("Resource").string(&self.resource);

        let mut condition = statement.key("Condition").start_object();

        let mut date_less = condition.key("DateLessThan").start_object();
        date_less
            .key("AWS:EpochTime")
            .number(epoch_number(self.expires_at));
        date_less.finish();

        if let Some(starts) = self.starts_at {
            let mut date_greater = condition.key("DateGreaterThan").start_object();
            date_greater
                .key("AWS:EpochTime")
                .number(epoch_number(starts));
            date_greater.finish();
        }

        if let Some(ref ip) = self.source_ip {
            let mut ip_addr = condition.key("IpAddress").start_object();
            ip_addr.key("AWS:SourceIp").string(ip);
            ip_addr.finish();
        }

        condition.finish();
        statement.finish();
        statement_array.finish();
        root.finish();

        out
    }

    /// The `Policy` query parameter / `CloudFront-Policy` cookie value.
    pub fn encode(&self, encoding: UrlSafeEncoding) -> String {
        let json = self.to_json();
        match encoding {
            UrlSafeEncoding::CloudFront => encoding.encode_bytes(json.as_bytes()),
            UrlSafeEncoding::Legacy => encoding.encode(&json),
        }
    }
}

fn epoch_number(secs: i64) -> Number {
    if secs >= 0 {
        Number::PosInt(secs as u64)
    } else {
        Number::NegInt(secs)
    }
}

/// Prefixes `https://`, replacing a leading `http://` or `https://` if present.
///
/// Policies are always issued for the secure scheme, whatever scheme the request used.
pub fn https_resource(url: &str) -> String {
    let without_scheme = ["https://", "http://"]
        .iter()
        .find_map(|scheme| {
            url.get(..scheme.len())
                .filter(|prefix| prefix.eq_ignore_ascii_case(scheme))
                .map(|_| &url[scheme.len()..])
        })
        .unwrap_or(url);
    format!("https://{without_scheme}")
}

/// Builder for [`AccessPolicy`].
#[derive(Debug, Default)]
pub struct PolicyBuilder {
    resource: Option<String>,
    expires_at: Option<i64>,
    starts_at: Option<i64>,
    source_ip: Option<String>,
}

impl PolicyBuilder {
    /// Sets the resource URL. The scheme is forced to `https`.
    pub fn resource(mut self, url: impl Into<String>) -> Self {
        self.resource = Some(url.into());
        self
    }

    /// Sets the expiration, in epoch seconds.
    pub fn expires_at(mut self, secs: i64) -> Self {
        self.expires_at = Some(secs);
        self
    }

    /// Sets the activation time, in epoch seconds. Zero means "no activation time".
    pub fn starts_at(mut self, secs: i64) -> Self {
        self.starts_at = Some(secs);
        self
    }

    /// Sets the source IP restriction, in CIDR notation.
    pub fn source_ip(mut self, cidr: impl Into<String>) -> Self {
        self.source_ip = Some(cidr.into());
        self
    }

    /// Builds the policy.
    pub fn build(self) -> Result<AccessPolicy, SigningError> {
        let resource = self
            .resource
            .ok_or_else(|| SigningError::invalid_policy("resource is required"))?;

        let expires_at = self
            .expires_at
            .ok_or_else(|| SigningError::invalid_policy("expires_at is required"))?;

        let starts_at = self.starts_at.filter(|secs| *secs != 0);
        if let Some(starts) = starts_at {
            if starts > expires_at {
                return Err(SigningError::invalid_policy(
                    "starts_at must not be after expires_at",
                ));
            }
        }

        if let Some(ref cidr) = self.source_ip {
            validate_cidr(cidr)?;
        }

        Ok(AccessPolicy {
            resource: https_resource(&resource),
            expires_at,
            starts_at,
            source_ip: self.source_ip,
        })
    }
}

fn validate_cidr(cidr: &str) -> Result<(), SigningError> {
    let invalid = || SigningError::invalid_input(format!("`{cidr}` is not a valid CIDR block"));
    let (address, prefix) = cidr.split_once('/').ok_or_else(invalid)?;
    let address: IpAddr = address.parse().map_err(|_| invalid())?;
    let width = if address.is_ipv4() { 32 } else { 128 };
    match prefix.parse::<u8>() {
        Ok(bits) if bits <= width => Ok(()),
        _ => Err(invalid()),
    }
}
