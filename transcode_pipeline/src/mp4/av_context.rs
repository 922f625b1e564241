// /////////////////////////////////////////////////////////////////////////////
// Media Transcode Worker
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Av-context packet pump: per-stream decode state, progress accounting, and
//! the async-wake handle that breaks deep recursion when packets decode
//! synchronously to a frame.

use transcode_domain::TranscodeError;

/// Outcome of [`AvContext::next_local_packet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextPacketOutcome {
    /// A packet was fetched and is ready for decode.
    Ready,
    /// No stream has `preloaded > fetched`; more data must be pre-loaded.
    NeedPreload,
}

/// Outcome of [`AvContext::decode_packet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeOutcome {
    FrameReady,
    NeedNewPacket,
}

/// Per-stream decode bookkeeping, mirroring the source's packet-index
/// entries (`preloading`, `preloaded`, `fetched`).
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamState {
    pub preloading: usize,
    pub preloaded: usize,
    pub fetched: usize,
}

impl StreamState {
    fn has_unfetched_packet(&self) -> bool {
        self.preloaded > self.fetched
    }
}

/// Default fraction-of-progress delta required before a new progress
/// message is published back to the RPC caller.
pub const DEFAULT_REPORT_INTERVAL: f64 = 0.15;

pub struct AvContext {
    streams: Vec<StreamState>,
    current_stream_index: Option<usize>,
    current_packet_size: usize,
    packet_submitted: bool,
    tot_num_pkts_avail: u64,
    tot_num_pkts_fixed: u64,
    report_interval: f64,
    last_reported_progress: f64,
    async_wake_pending: bool,
}

impl AvContext {
    pub fn new(num_streams: usize, tot_num_pkts_avail: u64) -> Self {
        Self {
            streams: vec![StreamState::default(); num_streams],
            current_stream_index: None,
            current_packet_size: 0,
            packet_submitted: false,
            tot_num_pkts_avail,
            tot_num_pkts_fixed: 0,
            report_interval: DEFAULT_REPORT_INTERVAL,
            last_reported_progress: 0.0,
            async_wake_pending: false,
        }
    }

    pub fn with_report_interval(mut self, interval: f64) -> Self {
        self.report_interval = interval;
        self
    }

    pub fn stream(&self, idx: usize) -> Option<&StreamState> {
        self.streams.get(idx)
    }

    pub fn stream_mut(&mut self, idx: usize) -> Option<&mut StreamState> {
        self.streams.get_mut(idx)
    }

    /// Fetches the next packet from whichever stream has outstanding
    /// pre-loaded data. Returns `NeedPreload` when no stream does.
    pub fn next_local_packet(&mut self, stream_index: isize) -> Result<NextPacketOutcome, TranscodeError> {
        // `stream_index == -1` after a read means the packet belongs to no
        // known stream and is discarded, matching the source contract.
        if stream_index == -1 {
            return Ok(NextPacketOutcome::NeedPreload);
        }
        if stream_index < -1 || stream_index as usize >= self.streams.len() {
            return Err(TranscodeError::transcoder(format!(
                "stream index {stream_index} out of range"
            )));
        }

        let idx = stream_index as usize;
        let has_pending = self.streams.iter().any(|s| s.has_unfetched_packet());
        if !has_pending {
            return Ok(NextPacketOutcome::NeedPreload);
        }
        if let Some(stream) = self.streams.get_mut(idx) {
            if stream.has_unfetched_packet() {
                stream.fetched += 1;
                self.current_stream_index = Some(idx);
                self.current_packet_size = 1; // a placeholder payload size; real size comes from the demuxer.
                self.packet_submitted = false;
                return Ok(NextPacketOutcome::Ready);
            }
        }
        Ok(NextPacketOutcome::NeedPreload)
    }

    /// Rescales timestamps and submits the current packet to the codec on
    /// first attempt, then asks whether a frame is ready.
    pub fn decode_packet(&mut self) -> Result<DecodeOutcome, TranscodeError> {
        if self.current_packet_size == 0 {
            return Ok(DecodeOutcome::NeedNewPacket);
        }
        if !self.packet_submitted {
            self.packet_submitted = true;
            // first-attempt submission: timestamp rescale is a no-op here
            // since the concrete codec is an external collaborator.
        }
        self.tot_num_pkts_fixed += 1;
        self.tot_num_pkts_avail = self.tot_num_pkts_avail.saturating_sub(1);
        self.current_packet_size = 0;
        self.signal_async_wake();
        Ok(DecodeOutcome::FrameReady)
    }

    /// Signals the async-wake handle instead of invoking a continuation
    /// directly, moving the next step to the next event-loop iteration and
    /// bounding recursion depth when many packets decode synchronously.
    fn signal_async_wake(&mut self) {
        self.async_wake_pending = true;
    }

    pub fn take_async_wake(&mut self) -> bool {
        std::mem::take(&mut self.async_wake_pending)
    }

    pub fn tot_num_pkts_avail(&self) -> u64 {
        self.tot_num_pkts_avail
    }

    pub fn tot_num_pkts_fixed(&self) -> u64 {
        self.tot_num_pkts_fixed
    }

    /// `done = (fixed - avail) / fixed`, zero-guarded, generalized from the
    /// teacher's processing-context progress calculation.
    pub fn progress_percentage(&self) -> f64 {
        if self.tot_num_pkts_fixed == 0 {
            return 0.0;
        }
        let avail = self.tot_num_pkts_avail as f64;
        let fixed = self.tot_num_pkts_fixed as f64;
        ((fixed - avail) / fixed).clamp(0.0, 1.0)
    }

    /// Returns `Some(progress)` only when the delta since the last reported
    /// value exceeds `report_interval`, otherwise `None`.
    pub fn monitor_progress(&mut self) -> Option<f64> {
        let current = self.progress_percentage();
        if (current - self.last_reported_progress).abs() > self.report_interval {
            self.last_reported_progress = current;
            Some(current)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_local_packet_needs_preload_when_nothing_pending() {
        let mut ctx = AvContext::new(1, 10);
        assert_eq!(ctx.next_local_packet(0).unwrap(), NextPacketOutcome::NeedPreload);
    }

    #[test]
    fn next_local_packet_ready_when_preloaded_exceeds_fetched() {
        let mut ctx = AvContext::new(1, 10);
        ctx.stream_mut(0).unwrap().preloaded = 3;
        assert_eq!(ctx.next_local_packet(0).unwrap(), NextPacketOutcome::Ready);
        assert_eq!(ctx.stream(0).unwrap().fetched, 1);
    }

    #[test]
    fn discards_packets_with_stream_index_negative_one() {
        let mut ctx = AvContext::new(1, 10);
        ctx.stream_mut(0).unwrap().preloaded = 3;
        assert_eq!(ctx.next_local_packet(-1).unwrap(), NextPacketOutcome::NeedPreload);
    }

    #[test]
    fn decode_packet_without_a_fetched_packet_requests_a_new_one() {
        let mut ctx = AvContext::new(1, 10);
        assert_eq!(ctx.decode_packet().unwrap(), DecodeOutcome::NeedNewPacket);
    }

    #[test]
    fn monitor_progress_only_reports_past_the_interval() {
        let mut ctx = AvContext::new(1, 10).with_report_interval(0.15);
        ctx.stream_mut(0).unwrap().preloaded = 10;
        let mut reported = Vec::new();
        for _ in 0..10 {
            ctx.next_local_packet(0).unwrap();
            ctx.decode_packet().unwrap();
            reported.push(ctx.monitor_progress());
        }
        assert!(reported.iter().any(|r| r.is_some()));
        assert!(reported.iter().any(|r| r.is_none()));
    }

    #[test]
    fn tot_num_pkts_avail_is_monotonically_non_increasing() {
        let mut ctx = AvContext::new(1, 5);
        ctx.stream_mut(0).unwrap().preloaded = 5;
        let mut last = ctx.tot_num_pkts_avail();
        for _ in 0..5 {
            ctx.next_local_packet(0).unwrap();
            ctx.decode_packet().unwrap();
            let now = ctx.tot_num_pkts_avail();
            assert!(now <= last);
            last = now;
        }
    }
}
