// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};

/// Externally assigned identifiers for the current data subject.
///
/// There is at most one live instance. Saving or updating replaces the
/// previous value wholesale, cookies included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumerInfo {
    pub id: Option<i64>,
    /// Server-assigned subject id.
    pub mpid: i64,
    pub unique_identifier: Option<String>,
    pub cookies: Vec<Cookie>,
}

impl ConsumerInfo {
    pub fn new(mpid: i64) -> Self {
        Self {
            id: None,
            mpid,
            unique_identifier: None,
            cookies: Vec::new(),
        }
    }

    pub fn with_cookie(mut self, cookie: Cookie) -> Self {
        self.cookies.push(cookie);
        self
    }

    /// Look up a cookie by name.
    pub fn cookie(&self, name: &str) -> Option<&Cookie> {
        self.cookies.iter().find(|c| c.name == name)
    }
}

/// A cookie owned by the consumer-info record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    pub id: Option<i64>,
    pub consumer_info_id: Option<i64>,
    pub name: String,
    pub content: Option<String>,
    pub domain: Option<String>,
    pub expiration: Option<String>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: None,
            consumer_info_id: None,
            name: name.into(),
            content: Some(content.into()),
            domain: None,
            expiration: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_lookup_by_name() {
        let info = ConsumerInfo::new(7)
            .with_cookie(Cookie::new("uid", "abc"))
            .with_cookie(Cookie::new("rid", "def"));
        assert_eq!(info.cookie("rid").and_then(|c| c.content.as_deref()), Some("def"));
        assert!(info.cookie("missing").is_none());
    }
}
