// /////////////////////////////////////////////////////////////////////////////
// Media Transcode Worker
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The HLS streaming seeker: serves master/secondary playlist, segment, and
//! key requests.

use crate::hls::crypto::{self, CryptoKeyFile};
use crate::hls::playlist::{self, PlaylistUrlLabels, VariantStreamInfo};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use transcode_domain::TranscodeError;

/// Per-resource rate limiter for the master playlist rebuild: rejects a
/// rebuild within `playlist_update_interval` of the last write.
#[derive(Debug, Default)]
pub struct MasterPlaylistRateLimiter {
    last_write: HashMap<String, Instant>,
}

impl MasterPlaylistRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `Ok(())` if a rebuild may proceed, or a `Capacity` error
    /// (mapped to HTTP 429) if the interval hasn't elapsed.
    pub fn check_and_record(&mut self, resource_id: &str, now: Instant, interval: Duration) -> Result<(), TranscodeError> {
        if let Some(last) = self.last_write.get(resource_id) {
            if now.duration_since(*last) < interval {
                return Err(TranscodeError::capacity("playlist update interval too short"));
            }
        }
        self.last_write.insert(resource_id.to_string(), now);
        Ok(())
    }
}

/// One committed version's variant metadata, gathered by scanning the
/// committed source directory.
#[derive(Debug, Clone)]
pub struct CommittedVariant {
    pub version: String,
    pub stream_inf_line: String,
}

/// Builds the aggregate master playlist for a resource from its committed
/// variants. Rate-limiting is the caller's responsibility via
/// [`MasterPlaylistRateLimiter`] so the pure build stays testable for
/// idempotence without a clock.
pub fn build_master_playlist_for_resource(
    variants: &[CommittedVariant],
    host: &str,
    path: &str,
    resource_id: &str,
    labels: &PlaylistUrlLabels,
) -> String {
    let variant_infos: Vec<VariantStreamInfo> = variants
        .iter()
        .map(|v| VariantStreamInfo {
            version: v.version.clone(),
            stream_inf_line: v.stream_inf_line.clone(),
        })
        .collect();
    playlist::build_master_playlist(&variant_infos, host, path, resource_id, labels)
}

/// Serves a secondary (media) playlist request for one version, rotating
/// the crypto key if due and rewriting segment/init URLs.
pub struct SeekerContext {
    pub host: String,
    pub base_path: String,
    pub key_update_interval_secs: u64,
}

impl SeekerContext {
    pub fn build_secondary_playlist(
        &self,
        source_playlist: &str,
        key_file: &mut CryptoKeyFile,
        now_secs: u64,
        resource_id: &str,
        version: &str,
    ) -> Result<String, TranscodeError> {
        let active_key_id = key_file.rotate(now_secs, self.key_update_interval_secs)?;
        let entry = key_file
            .entries
            .get(&active_key_id)
            .ok_or_else(|| TranscodeError::Internal("active key id missing after rotation".into()))?;

        let key_url = format!("https://{}{}/keys/{}/{}", self.host, self.base_path, resource_id, active_key_id);
        let init_url = format!("https://{}{}/{}/{}/init.mp4", self.host, self.base_path, resource_id, version);
        let segment_prefix = format!("https://{}{}/{}/{}/", self.host, self.base_path, resource_id, version);

        playlist::build_secondary_playlist(source_playlist, &key_url, &hex::encode(&entry.iv), &init_url, &segment_prefix)
    }

    /// Encrypts one segment's bytes under the currently active key.
    pub fn encrypt_segment(&self, key_file: &CryptoKeyFile, active_key_id: &str, plaintext: &[u8]) -> Result<Vec<u8>, TranscodeError> {
        let entry = key_file
            .entries
            .get(active_key_id)
            .ok_or_else(|| TranscodeError::Storage(format!("unknown key id {active_key_id}")))?;
        crypto::encrypt_segment(&entry.key, &entry.iv, plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limiter_rejects_second_build_within_interval() {
        let mut limiter = MasterPlaylistRateLimiter::new();
        let t0 = Instant::now();
        limiter.check_and_record("res1", t0, Duration::from_secs(60)).unwrap();
        let result = limiter.check_and_record("res1", t0 + Duration::from_secs(1), Duration::from_secs(60));
        assert!(result.is_err());
    }

    #[test]
    fn rate_limiter_allows_build_after_interval_elapses() {
        let mut limiter = MasterPlaylistRateLimiter::new();
        let t0 = Instant::now();
        limiter.check_and_record("res1", t0, Duration::from_secs(60)).unwrap();
        let result = limiter.check_and_record("res1", t0 + Duration::from_secs(61), Duration::from_secs(60));
        assert!(result.is_ok());
    }

    #[test]
    fn seeker_builds_secondary_playlist_with_rotated_key() {
        let ctx = SeekerContext {
            host: "example.com".to_string(),
            base_path: "/hls".to_string(),
            key_update_interval_secs: 300,
        };
        let mut key_file = CryptoKeyFile::default();
        let source = "#EXTM3U\n#EXT-X-VERSION:7\n#EXT-X-TARGETDURATION:6\n#EXT-X-PLAYLIST-TYPE:VOD\n#EXT-X-MAP:URI=\"init.mp4\"\n#EXTINF:5.0,\nseg0.m4s\n";
        let playlist = ctx.build_secondary_playlist(source, &mut key_file, 1_000, "res1", "1080").unwrap();
        assert!(playlist.contains("#EXT-X-KEY:METHOD=AES-128"));
        assert_eq!(key_file.entries.len(), 1);
    }
}
