// /////////////////////////////////////////////////////////////////////////////
// Media Transcode Worker
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! In-process Prometheus metrics: request/error counters, segments written,
//! playlist merges, and a per-segment encode latency histogram. No HTTP
//! metrics endpoint is exposed — scraping that surface is out of scope.

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

pub struct WorkerMetrics {
    pub requests_accepted: IntCounter,
    pub segments_written: IntCounter,
    pub playlist_merges: IntCounter,
    pub errors_by_kind: IntCounterVec,
    pub segment_encode_latency: Histogram,
}

impl WorkerMetrics {
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let requests_accepted = IntCounter::new("transcode_requests_accepted_total", "requests accepted for transcoding")?;
        let segments_written = IntCounter::new("transcode_segments_written_total", "HLS segments written")?;
        let playlist_merges = IntCounter::new("transcode_playlist_merges_total", "master playlist rebuilds")?;
        let errors_by_kind = IntCounterVec::new(
            Opts::new("transcode_errors_total", "errors observed, by kind"),
            &["kind"],
        )?;
        let segment_encode_latency = Histogram::with_opts(HistogramOpts::new(
            "transcode_segment_encode_seconds",
            "time to encode and write one HLS segment",
        ))?;

        registry.register(Box::new(requests_accepted.clone()))?;
        registry.register(Box::new(segments_written.clone()))?;
        registry.register(Box::new(playlist_merges.clone()))?;
        registry.register(Box::new(errors_by_kind.clone()))?;
        registry.register(Box::new(segment_encode_latency.clone()))?;

        Ok(Self {
            requests_accepted,
            segments_written,
            playlist_merges,
            errors_by_kind,
            segment_encode_latency,
        })
    }

    pub fn record_error(&self, kind: &str) {
        self.errors_by_kind.with_label_values(&[kind]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_register_without_collision() {
        let registry = Registry::new();
        let metrics = WorkerMetrics::new(&registry).unwrap();
        metrics.requests_accepted.inc();
        metrics.record_error("storage");
        assert_eq!(metrics.requests_accepted.get(), 1);
        assert_eq!(metrics.errors_by_kind.with_label_values(&["storage"]).get(), 1);
    }

    #[test]
    fn segment_encode_latency_observes_durations() {
        let registry = Registry::new();
        let metrics = WorkerMetrics::new(&registry).unwrap();
        metrics.segment_encode_latency.observe(0.05);
        assert_eq!(metrics.segment_encode_latency.get_sample_count(), 1);
    }
}
