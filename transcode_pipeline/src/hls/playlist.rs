// /////////////////////////////////////////////////////////////////////////////
// Media Transcode Worker
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Master and secondary (media) playlist synthesis for the HLS streaming
//! seeker.

use transcode_domain::TranscodeError;

/// URL label names used when synthesizing segment/master URLs; configurable
/// per deployment, defaults match the glossary's example.
#[derive(Debug, Clone)]
pub struct PlaylistUrlLabels {
    pub resource_id: String,
    pub version: String,
    pub detail: String,
}

impl Default for PlaylistUrlLabels {
    fn default() -> Self {
        Self {
            resource_id: "rid".to_string(),
            version: "ver".to_string(),
            detail: "detail".to_string(),
        }
    }
}

/// One version's master-playlist stream-info line, collected while scanning
/// the committed source directory.
#[derive(Debug, Clone)]
pub struct VariantStreamInfo {
    pub version: String,
    pub stream_inf_line: String,
}

/// Synthesizes the URL a playlist points a player at.
pub fn synthesize_url(host: &str, path: &str, labels: &PlaylistUrlLabels, resource_id: &str, version: &str, detail: &str) -> String {
    format!(
        "https://{host}{path}?{rid_label}={resource_id}&{ver_label}={version}&{detail_label}={detail}",
        rid_label = labels.resource_id,
        ver_label = labels.version,
        detail_label = labels.detail,
    )
}

/// Builds the aggregate master playlist from each version's
/// `#EXT-X-STREAM-INF` line, appending the synthesized per-version URL.
/// Rebuilding from the same inputs twice yields byte-identical output
/// (idempotence required by the testable properties).
pub fn build_master_playlist(
    variants: &[VariantStreamInfo],
    host: &str,
    path: &str,
    resource_id: &str,
    labels: &PlaylistUrlLabels,
) -> String {
    let mut out = String::from("#EXTM3U\n");
    for variant in variants {
        out.push_str(&variant.stream_inf_line);
        if !variant.stream_inf_line.ends_with('\n') {
            out.push('\n');
        }
        let url = synthesize_url(host, path, labels, resource_id, &variant.version, "master.m3u8");
        out.push_str(&url);
        out.push('\n');
    }
    out
}

const REQUIRED_HEADER_TAGS: [&str; 6] = [
    "EXTM3U",
    "EXT-X-VERSION",
    "EXT-X-TARGETDURATION",
    "EXT-X-PLAYLIST-TYPE",
    "EXT-X-MAP",
    "EXTINF",
];

/// One `EXTINF` entry parsed from the source playlist.
#[derive(Debug, Clone)]
struct SegmentEntry {
    extinf_line: String,
}

/// Validated, parsed source playlist ready for rewriting.
struct ParsedSourcePlaylist {
    header_lines: Vec<String>,
    has_map: bool,
    map_line_idx: Option<usize>,
    segments: Vec<SegmentEntry>,
}

/// Parses and validates a source secondary playlist's head: it must contain
/// every required tag, and `EXT-X-MAP` (if present) must precede any
/// `EXTINF`.
fn parse_source_playlist(source: &str) -> Result<ParsedSourcePlaylist, TranscodeError> {
    let lines: Vec<&str> = source.lines().collect();
    for tag in REQUIRED_HEADER_TAGS {
        if !lines.iter().any(|l| l.trim_start_matches('#').starts_with(tag)) {
            return Err(TranscodeError::format(format!("missing required tag: {tag}")));
        }
    }

    let mut header_lines = Vec::new();
    let mut segments = Vec::new();
    let mut map_line_idx = None;
    let mut seen_extinf = false;

    for line in &lines {
        if line.starts_with("#EXT-X-MAP") {
            if seen_extinf {
                return Err(TranscodeError::format("EXT-X-MAP must precede any EXTINF tag"));
            }
            map_line_idx = Some(header_lines.len());
            header_lines.push((*line).to_string());
        } else if line.starts_with("#EXTINF") {
            seen_extinf = true;
            segments.push(SegmentEntry {
                extinf_line: (*line).to_string(),
            });
        } else if !seen_extinf && !line.starts_with("#EXT-X-ENDLIST") {
            header_lines.push((*line).to_string());
        }
    }

    Ok(ParsedSourcePlaylist {
        header_lines,
        has_map: map_line_idx.is_some(),
        map_line_idx,
        segments,
    })
}

/// Rebuilds the per-version secondary playlist served to players: emits the
/// validated header (rewriting `EXT-X-MAP`'s URI if present), an
/// `EXT-X-KEY` tag for the active encryption key, then one synthesized
/// segment URL per `EXTINF` entry.
pub fn build_secondary_playlist(
    source: &str,
    key_url: &str,
    key_iv_hex: &str,
    init_segment_url: &str,
    segment_url_prefix: &str,
) -> Result<String, TranscodeError> {
    let parsed = parse_source_playlist(source)?;

    let mut out = String::new();
    for (idx, line) in parsed.header_lines.iter().enumerate() {
        if parsed.has_map && Some(idx) == parsed.map_line_idx {
            out.push_str(&format!(r#"#EXT-X-MAP:URI="{init_segment_url}""#));
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }

    out.push_str(&format!(
        r#"#EXT-X-KEY:METHOD=AES-128,URI="{key_url}",IV=0x{key_iv_hex}"#
    ));
    out.push('\n');

    for (seq, segment) in parsed.segments.iter().enumerate() {
        out.push_str(&segment.extinf_line);
        out.push('\n');
        out.push_str(&format!("{segment_url_prefix}segment-{seq:03}.m4s\n"));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_playlist_build_is_idempotent() {
        let variants = vec![VariantStreamInfo {
            version: "1080".to_string(),
            stream_inf_line: "#EXT-X-STREAM-INF:BANDWIDTH=5000000".to_string(),
        }];
        let labels = PlaylistUrlLabels::default();
        let first = build_master_playlist(&variants, "example.com", "/hls", "res1", &labels);
        let second = build_master_playlist(&variants, "example.com", "/hls", "res1", &labels);
        assert_eq!(first, second);
    }

    #[test]
    fn secondary_playlist_missing_ext_x_map_is_rejected_with_no_output() {
        let source = "#EXTM3U\n#EXT-X-VERSION:7\n#EXT-X-TARGETDURATION:6\n#EXT-X-PLAYLIST-TYPE:VOD\n#EXTINF:5.0,\nseg0.m4s\n";
        let result = build_secondary_playlist(source, "key-url", "00", "init-url", "seg-");
        assert!(result.is_err());
    }

    #[test]
    fn ext_x_map_after_extinf_is_rejected() {
        let source = "#EXTM3U\n#EXT-X-VERSION:7\n#EXT-X-TARGETDURATION:6\n#EXT-X-PLAYLIST-TYPE:VOD\n#EXTINF:5.0,\nseg0.m4s\n#EXT-X-MAP:URI=\"init.mp4\"\n";
        let result = build_secondary_playlist(source, "key-url", "00", "init-url", "seg-");
        assert!(result.is_err());
    }

    #[test]
    fn valid_source_playlist_rewrites_map_uri_and_segment_urls() {
        let source = "#EXTM3U\n#EXT-X-VERSION:7\n#EXT-X-TARGETDURATION:6\n#EXT-X-PLAYLIST-TYPE:VOD\n#EXT-X-MAP:URI=\"init.mp4\"\n#EXTINF:5.0,\nseg0.m4s\n#EXTINF:5.0,\nseg1.m4s\n";
        let out = build_secondary_playlist(source, "https://x/key", "00112233445566778899aabbccddeeff", "https://x/init.mp4", "https://x/").unwrap();
        assert!(out.contains(r#"#EXT-X-MAP:URI="https://x/init.mp4""#));
        assert!(out.contains("#EXT-X-KEY:METHOD=AES-128"));
        assert!(out.contains("https://x/segment-000.m4s"));
        assert!(out.contains("https://x/segment-001.m4s"));
    }
}
