/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Normalization of loosely typed time inputs into epoch seconds.
//!
//! Callers may hand over a [`DateTime`], a [`SystemTime`], a number, or a string, and may
//! use either seconds or milliseconds. Numbers below [`SECONDS_THRESHOLD_MILLIS`] (the year
//! 2000 expressed in milliseconds) are read as seconds; everything at or above it is read as
//! milliseconds. Inputs that do not describe a valid instant never fail: they resolve to a
//! fallback, and a fallback that is itself invalid resolves to "now".

use aws_smithy_async::time::SharedTimeSource;
use aws_smithy_types::date_time::Format;
use aws_smithy_types::DateTime;
use serde::Deserialize;
use std::error::Error as StdError;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Numeric inputs strictly below this value are interpreted as seconds.
pub const SECONDS_THRESHOLD_MILLIS: i64 = 946_728_000_000;

/// Largest magnitude a valid instant may have, in milliseconds (±100,000,000 days).
const MAX_INSTANT_MILLIS: f64 = 8.64e15;

/// Expiration used when none (or an invalid one) is given.
pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(60 * 60 * 24 * 7);

/// A point in time in any of the shapes accepted by [`TimeNormalizer`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawTimeInput")]
#[non_exhaustive]
pub enum TimeInput {
    /// An already-typed instant.
    DateTime(DateTime),
    /// Epoch seconds or epoch milliseconds.
    Number(f64),
    /// A numeric string, or an RFC 3339 date-time.
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimeInput {
    Number(f64),
    Text(String),
}

impl From<RawTimeInput> for TimeInput {
    fn from(raw: RawTimeInput) -> Self {
        match raw {
            RawTimeInput::Number(n) => TimeInput::Number(n),
            RawTimeInput::Text(s) => TimeInput::Text(s),
        }
    }
}

impl From<DateTime> for TimeInput {
    fn from(value: DateTime) -> Self {
        TimeInput::DateTime(value)
    }
}

impl From<SystemTime> for TimeInput {
    fn from(value: SystemTime) -> Self {
        TimeInput::DateTime(DateTime::from(value))
    }
}

impl From<i64> for TimeInput {
    fn from(value: i64) -> Self {
        TimeInput::Number(value as f64)
    }
}

impl From<u64> for TimeInput {
    fn from(value: u64) -> Self {
        TimeInput::Number(value as f64)
    }
}

impl From<f64> for TimeInput {
    fn from(value: f64) -> Self {
        TimeInput::Number(value)
    }
}

impl From<&str> for TimeInput {
    fn from(value: &str) -> Self {
        TimeInput::Text(value.to_owned())
    }
}

impl From<String> for TimeInput {
    fn from(value: String) -> Self {
        TimeInput::Text(value)
    }
}

#[derive(Debug)]
enum TimeInputErrorKind {
    NotANumber,
    Empty,
    Unparseable(String),
    OutOfRange,
}

/// A time input that does not describe a valid instant.
///
/// Always recovered inside this crate by falling back to a default.
#[derive(Debug)]
pub(crate) struct TimeInputError {
    kind: TimeInputErrorKind,
}

impl From<TimeInputErrorKind> for TimeInputError {
    fn from(kind: TimeInputErrorKind) -> Self {
        Self { kind }
    }
}

impl fmt::Display for TimeInputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TimeInputErrorKind::*;
        match &self.kind {
            NotANumber => write!(f, "time value is not a finite number"),
            Empty => write!(f, "time value is empty"),
            Unparseable(value) => write!(f, "`{value}` is not a valid time"),
            OutOfRange => write!(f, "time value is outside the representable range"),
        }
    }
}

impl StdError for TimeInputError {}

fn number_to_millis(value: f64) -> Result<i64, TimeInputError> {
    if !value.is_finite() {
        return Err(TimeInputErrorKind::NotANumber.into());
    }
    let millis = if value < SECONDS_THRESHOLD_MILLIS as f64 {
        value * 1000.0
    } else {
        value
    };
    if millis.abs() > MAX_INSTANT_MILLIS {
        return Err(TimeInputErrorKind::OutOfRange.into());
    }
    Ok(millis.trunc() as i64)
}

fn text_to_millis(value: &str) -> Result<i64, TimeInputError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TimeInputErrorKind::Empty.into());
    }
    if let Ok(number) = trimmed.parse::<f64>() {
        return number_to_millis(number);
    }
    let parsed = DateTime::from_str(trimmed, Format::DateTime)
        .map_err(|_| TimeInputErrorKind::Unparseable(trimmed.to_owned()))?;
    date_time_to_millis(&parsed)
}

fn date_time_to_millis(value: &DateTime) -> Result<i64, TimeInputError> {
    let millis = value
        .to_millis()
        .map_err(|_| TimeInputError::from(TimeInputErrorKind::OutOfRange))?;
    if (millis as f64).abs() > MAX_INSTANT_MILLIS {
        return Err(TimeInputErrorKind::OutOfRange.into());
    }
    Ok(millis)
}

/// Converts a time input into epoch milliseconds without any fallback.
pub(crate) fn to_millis(input: &TimeInput) -> Result<i64, TimeInputError> {
    match input {
        TimeInput::DateTime(value) => date_time_to_millis(value),
        TimeInput::Number(value) => number_to_millis(*value),
        TimeInput::Text(value) => text_to_millis(value),
    }
}

pub(crate) fn system_time_to_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_millis() as i64,
        Err(before) => -(before.duration().as_millis() as i64),
    }
}

/// Resolves [`TimeInput`]s to epoch seconds against a time source.
#[derive(Debug, Clone, Default)]
pub struct TimeNormalizer {
    time_source: SharedTimeSource,
}

impl TimeNormalizer {
    /// Creates a normalizer that reads "now" from `time_source`.
    pub fn new(time_source: SharedTimeSource) -> Self {
        Self { time_source }
    }

    /// Returns the current time of the underlying time source.
    pub fn now(&self) -> SystemTime {
        self.time_source.now()
    }

    pub(crate) fn now_millis(&self) -> i64 {
        system_time_to_millis(self.now())
    }

    /// Normalizes `input` to epoch milliseconds.
    ///
    /// A missing or invalid `input` resolves to `fallback`; a missing or invalid `fallback`
    /// resolves to the current time.
    pub fn normalize_millis(&self, input: Option<&TimeInput>, fallback: Option<&TimeInput>) -> i64 {
        self.resolve(input, || match fallback.map(to_millis) {
            Some(Ok(millis)) => millis,
            Some(Err(err)) => {
                tracing::debug!(
                    fallback = ?fallback,
                    error = %err,
                    "invalid fallback time, using the current time"
                );
                self.now_millis()
            }
            None => self.now_millis(),
        })
    }

    /// Normalizes `input` to epoch seconds, with the same fallback rules as
    /// [`normalize_millis`](Self::normalize_millis).
    pub fn normalize(&self, input: Option<&TimeInput>, fallback: Option<&TimeInput>) -> i64 {
        self.normalize_millis(input, fallback).div_euclid(1000)
    }

    /// Normalizes an expiration time, defaulting to [`DEFAULT_EXPIRATION`] from now.
    pub fn expires(&self, input: Option<&TimeInput>) -> i64 {
        self.resolve(input, || {
            self.now_millis() + DEFAULT_EXPIRATION.as_millis() as i64
        })
        .div_euclid(1000)
    }

    /// Normalizes an activation time, defaulting to now.
    pub fn starts(&self, input: Option<&TimeInput>) -> i64 {
        self.resolve(input, || self.now_millis()).div_euclid(1000)
    }

    fn resolve(&self, input: Option<&TimeInput>, fallback: impl FnOnce() -> i64) -> i64 {
        match input.map(to_millis) {
            Some(Ok(millis)) => millis,
            Some(Err(err)) => {
                tracing::debug!(input = ?input, error = %err, "invalid time input, using fallback");
                fallback()
            }
            None => fallback(),
        }
    }
}
