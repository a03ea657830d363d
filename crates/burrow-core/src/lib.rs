// SPDX-FileCopyrightText: 2026 Burrow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Burrow telemetry persistence engine.
//!
//! Holds the record types persisted by the engine, the error taxonomy, the
//! engine's clock, and the adapter traits storage backends implement.

pub mod error;
pub mod time;
pub mod traits;
pub mod types;

pub use error::{BuildError, BurrowError};
pub use traits::{PluginAdapter, StorageAdapter};
pub use types::HealthStatus;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burrow_error_variants_render() {
        let unavailable = BurrowError::StoreUnavailable("closed".into());
        assert_eq!(unavailable.to_string(), "store unavailable: closed");

        let partial = BurrowError::PartialBatchFailure {
            requested: 4,
            reason: "row locked".into(),
        };
        assert!(partial.to_string().contains("4 ids rolled back"));

        let claimed = BurrowError::AlreadyClaimed {
            message_ids: vec![3, 5],
        };
        assert!(claimed.to_string().contains("[3, 5]"));

        let decode = BurrowError::Serialization {
            table: "messages",
            id: 9,
            reason: "unknown message type `zz`".into(),
        };
        assert_eq!(
            decode.to_string(),
            "failed to decode messages row 9: unknown message type `zz`"
        );

        let _storage = BurrowError::Storage {
            source: Box::new(std::io::Error::other("disk full")),
        };
        let _config = BurrowError::Config("bad".into());
        let _internal = BurrowError::Internal("bug".into());
    }

    #[test]
    fn build_error_converts_transparently() {
        let err: BurrowError = BuildError::MissingField("url").into();
        assert_eq!(err.to_string(), "missing required field `url`");
    }

    #[test]
    fn health_status_variants() {
        let healthy = HealthStatus::Healthy;
        let degraded = HealthStatus::Degraded("slow".into());
        let unhealthy = HealthStatus::Unhealthy("down".into());

        assert_eq!(healthy, HealthStatus::Healthy);
        assert_ne!(degraded, healthy);
        assert_ne!(unhealthy, healthy);
    }

    #[test]
    fn storage_adapter_is_object_safe() {
        fn _assert_object(_: &dyn StorageAdapter) {}
        fn _assert_plugin<T: PluginAdapter>() {}
    }
}
