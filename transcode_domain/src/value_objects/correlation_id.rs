// /////////////////////////////////////////////////////////////////////////////
// Media Transcode Worker
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! RPC correlation id: `rpc.media.<fn>.corr_id.<40-hex-sha1>`, derived from
//! the requesting user id, a timestamp, and the requested output version
//! labels.

use crate::value_objects::VersionLabel;
use crate::TranscodeError;
use sha1::{Digest, Sha1};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId {
    function_name: String,
    digest_hex: String,
}

impl CorrelationId {
    /// Derives a correlation id the way the broker-facing RPC handler does:
    /// SHA-1 over `usr_id ‖ timestamp ‖ joined(version_labels)`.
    pub fn derive(function_name: impl Into<String>, usr_id: &str, timestamp_ms: i64, version_labels: &[VersionLabel]) -> Self {
        let joined = version_labels
            .iter()
            .map(VersionLabel::as_str)
            .collect::<Vec<_>>()
            .join("");

        let mut hasher = Sha1::new();
        hasher.update(usr_id.as_bytes());
        hasher.update(timestamp_ms.to_string().as_bytes());
        hasher.update(joined.as_bytes());
        let digest_hex = hex::encode(hasher.finalize());

        Self {
            function_name: function_name.into(),
            digest_hex,
        }
    }

    /// Parses an existing correlation id string, validating its shape.
    pub fn parse(s: &str) -> Result<Self, TranscodeError> {
        let rest = s
            .strip_prefix("rpc.media.")
            .ok_or_else(|| TranscodeError::validation("correlation id must start with 'rpc.media.'"))?;
        let (function_name, rest) = rest
            .split_once(".corr_id.")
            .ok_or_else(|| TranscodeError::validation("correlation id missing '.corr_id.' separator"))?;
        if rest.len() != 40 || !rest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TranscodeError::validation(
                "correlation id digest must be exactly 40 hex characters",
            ));
        }
        Ok(Self {
            function_name: function_name.to_string(),
            digest_hex: rest.to_lowercase(),
        })
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rpc.media.{}.corr_id.{}", self.function_name, self.digest_hex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_id_has_expected_shape() {
        let labels = vec![VersionLabel::new("1080").unwrap()];
        let id = CorrelationId::derive("transcode_video_file", "user-42", 1_700_000_000_000, &labels);
        let s = id.to_string();
        assert!(s.starts_with("rpc.media.transcode_video_file.corr_id."));
        let digest = s.rsplit('.').next().unwrap();
        assert_eq!(digest.len(), 40);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn same_inputs_yield_same_id() {
        let labels = vec![VersionLabel::new("abcd").unwrap()];
        let a = CorrelationId::derive("f", "u", 1, &labels);
        let b = CorrelationId::derive("f", "u", 1, &labels);
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn different_timestamp_yields_different_id() {
        let labels = vec![VersionLabel::new("abcd").unwrap()];
        let a = CorrelationId::derive("f", "u", 1, &labels);
        let b = CorrelationId::derive("f", "u", 2, &labels);
        assert_ne!(a.to_string(), b.to_string());
    }

    #[test]
    fn parse_roundtrips_a_derived_id() {
        let labels = vec![VersionLabel::new("abcd").unwrap()];
        let id = CorrelationId::derive("transcode_video_file", "u", 1, &labels);
        let parsed = CorrelationId::parse(&id.to_string()).unwrap();
        assert_eq!(parsed.to_string(), id.to_string());
    }

    #[test]
    fn parse_rejects_malformed_digest() {
        assert!(CorrelationId::parse("rpc.media.f.corr_id.tooshort").is_err());
        assert!(CorrelationId::parse("not.a.correlation.id").is_err());
    }
}
