// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deferred HTTP-shaped requests that must survive process restarts.
//!
//! Commands are only constructed through [`CommandBuilder`], which validates
//! the URL, method, and timestamp up front so malformed requests never reach
//! the store.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use url::Url;

use crate::error::BuildError;

/// HTTP method of a deferred command.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

/// A deferred request scoped to a session's lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub id: Option<i64>,
    pub session_id: i64,
    pub uuid: String,
    pub url: Url,
    pub http_method: HttpMethod,
    pub header_data: Vec<u8>,
    pub post_data: Vec<u8>,
    pub timestamp: f64,
}

/// A deferred request independent of any session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandaloneCommand {
    pub id: Option<i64>,
    pub uuid: String,
    pub url: Url,
    pub http_method: HttpMethod,
    pub header_data: Vec<u8>,
    pub post_data: Vec<u8>,
    pub timestamp: f64,
}

impl Command {
    pub fn builder() -> CommandBuilder {
        CommandBuilder::default()
    }
}

impl StandaloneCommand {
    pub fn builder() -> CommandBuilder {
        CommandBuilder::default()
    }
}

/// Builder for [`Command`] and [`StandaloneCommand`].
///
/// `url`, `http_method`, and `timestamp` are required. Header and body bytes
/// default to empty.
#[derive(Debug, Clone, Default)]
pub struct CommandBuilder {
    url: Option<String>,
    http_method: Option<String>,
    header_data: Vec<u8>,
    post_data: Vec<u8>,
    timestamp: Option<f64>,
    uuid: Option<String>,
}

struct ValidatedParts {
    uuid: String,
    url: Url,
    http_method: HttpMethod,
    header_data: Vec<u8>,
    post_data: Vec<u8>,
    timestamp: f64,
}

impl CommandBuilder {
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn http_method(mut self, method: impl Into<String>) -> Self {
        self.http_method = Some(method.into());
        self
    }

    pub fn header_data(mut self, header_data: Vec<u8>) -> Self {
        self.header_data = header_data;
        self
    }

    pub fn post_data(mut self, post_data: Vec<u8>) -> Self {
        self.post_data = post_data;
        self
    }

    pub fn timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Reuse an existing client identifier instead of generating one.
    pub fn uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }

    /// Build a session-scoped command.
    pub fn build(self, session_id: i64) -> Result<Command, BuildError> {
        let parts = self.validate()?;
        Ok(Command {
            id: None,
            session_id,
            uuid: parts.uuid,
            url: parts.url,
            http_method: parts.http_method,
            header_data: parts.header_data,
            post_data: parts.post_data,
            timestamp: parts.timestamp,
        })
    }

    /// Build a session-independent command.
    pub fn build_standalone(self) -> Result<StandaloneCommand, BuildError> {
        let parts = self.validate()?;
        Ok(StandaloneCommand {
            id: None,
            uuid: parts.uuid,
            url: parts.url,
            http_method: parts.http_method,
            header_data: parts.header_data,
            post_data: parts.post_data,
            timestamp: parts.timestamp,
        })
    }

    fn validate(self) -> Result<ValidatedParts, BuildError> {
        let raw_url = self.url.ok_or(BuildError::MissingField("url"))?;
        let url = parse_request_url(&raw_url)?;

        let raw_method = self
            .http_method
            .ok_or(BuildError::MissingField("http_method"))?;
        let http_method = HttpMethod::from_str(raw_method.trim())
            .map_err(|_| BuildError::UnsupportedMethod(raw_method.clone()))?;

        let timestamp = self.timestamp.ok_or(BuildError::MissingField("timestamp"))?;
        if !timestamp.is_finite() || timestamp < 0.0 {
            return Err(BuildError::InvalidTimestamp(timestamp));
        }

        Ok(ValidatedParts {
            uuid: self.uuid.unwrap_or_else(super::new_uuid),
            url,
            http_method,
            header_data: self.header_data,
            post_data: self.post_data,
            timestamp,
        })
    }
}

/// Parse and check a command URL. Only absolute http(s) URLs are accepted.
pub fn parse_request_url(raw: &str) -> Result<Url, BuildError> {
    let url = Url::parse(raw).map_err(|e| BuildError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(BuildError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("scheme `{other}` is not http or https"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> CommandBuilder {
        Command::builder()
            .url("https://example.com/v1/events")
            .http_method("post")
            .post_data(b"{\"a\":1}".to_vec())
            .timestamp(1_700_000_000.5)
    }

    #[test]
    fn builds_session_command() {
        let command = valid().build(12).unwrap();
        assert_eq!(command.session_id, 12);
        assert_eq!(command.http_method, HttpMethod::Post);
        assert_eq!(command.url.as_str(), "https://example.com/v1/events");
        assert!(command.id.is_none());
        assert!(command.header_data.is_empty());
    }

    #[test]
    fn builds_standalone_command_with_given_uuid() {
        let command = valid().uuid("fixed-uuid").build_standalone().unwrap();
        assert_eq!(command.uuid, "fixed-uuid");
        assert_eq!(command.timestamp, 1_700_000_000.5);
    }

    #[test]
    fn missing_url_is_rejected() {
        let err = StandaloneCommand::builder()
            .http_method("GET")
            .timestamp(1.0)
            .build_standalone()
            .unwrap_err();
        assert_eq!(err, BuildError::MissingField("url"));
    }

    #[test]
    fn non_http_scheme_is_rejected() {
        let err = valid().url("ftp://example.com/file").build(1).unwrap_err();
        assert!(matches!(err, BuildError::InvalidUrl { .. }));
    }

    #[test]
    fn relative_url_is_rejected() {
        let err = valid().url("/v1/events").build(1).unwrap_err();
        assert!(matches!(err, BuildError::InvalidUrl { .. }));
    }

    #[test]
    fn unknown_method_is_rejected() {
        let err = valid().http_method("TELEPORT").build(1).unwrap_err();
        assert_eq!(err, BuildError::UnsupportedMethod("TELEPORT".to_string()));
    }

    #[test]
    fn missing_method_is_rejected() {
        let err = Command::builder()
            .url("https://example.com")
            .timestamp(1.0)
            .build(1)
            .unwrap_err();
        assert_eq!(err, BuildError::MissingField("http_method"));
    }

    #[test]
    fn negative_or_nan_timestamp_is_rejected() {
        assert!(matches!(
            valid().timestamp(-1.0).build(1),
            Err(BuildError::InvalidTimestamp(_))
        ));
        assert!(matches!(
            valid().timestamp(f64::NAN).build(1),
            Err(BuildError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn missing_timestamp_is_rejected() {
        let err = Command::builder()
            .url("https://example.com")
            .http_method("GET")
            .build(1)
            .unwrap_err();
        assert_eq!(err, BuildError::MissingField("timestamp"));
    }

    proptest::proptest! {
        #[test]
        fn any_finite_non_negative_timestamp_is_kept(ts in 0.0f64..4_000_000_000.0) {
            let command = valid().timestamp(ts).build_standalone().unwrap();
            proptest::prop_assert_eq!(command.timestamp, ts);
        }

        #[test]
        fn any_negative_timestamp_is_rejected(ts in -4_000_000_000.0f64..-0.001) {
            proptest::prop_assert!(valid().timestamp(ts).build(1).is_err());
        }
    }
}
