// /////////////////////////////////////////////////////////////////////////////
// Media Transcode Worker
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The HLS destination pipeline's per-tick filter → encode → write loop.
//! A 4-row transition table keyed on whether the source, filter, and encoder
//! have each flushed selects which of `filter`/`encode`/`write`,
//! `flush_filter`/`flush_encode`, or `final_write` runs on a given tick.

use transcode_domain::TranscodeError;

/// Which function is active for a given tick, selected by the 4-row
/// transition table keyed on (source done?, filter flushed?, encoder
/// flushed?).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveFns {
    /// `filter`, `encode`, `write` all active.
    Normal,
    /// source exhausted, filter not yet flushed: `flush_filter`, `encode`, `write`.
    FlushingFilter,
    /// filter flushed, encoder not yet flushed: `flush_filter`, `flush_encode`, `write`.
    FlushingEncoder,
    /// everything flushed: only `final_write` runs.
    FinalWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickState {
    pub source_done: bool,
    pub filter_flushed: bool,
    pub encoder_flushed: bool,
}

impl TickState {
    /// Row lookup in the 4-row transition table.
    pub fn active_fns(self) -> ActiveFns {
        match (self.source_done, self.filter_flushed, self.encoder_flushed) {
            (false, _, _) => ActiveFns::Normal,
            (true, false, _) => ActiveFns::FlushingFilter,
            (true, true, false) => ActiveFns::FlushingEncoder,
            (true, true, true) => ActiveFns::FinalWrite,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.active_fns() == ActiveFns::FinalWrite
    }
}

/// One muxed packet ready to be written to the current segment.
#[derive(Debug, Clone)]
pub struct MuxedPacket {
    pub data: Vec<u8>,
    pub is_final: bool,
}

/// Drives one tick of the filter → encode → write nested loop: for each
/// filtered frame the filter stage produces, every encoder output is
/// drained and written to the segment before returning to filter again.
/// Returns `Ok(true)` once the tick has produced at least one packet,
/// `Ok(false)` when the filter reported "need more data" with nothing
/// written this tick.
pub trait FilterEncodeWriteStages {
    /// Produces the next filtered frame, or `None` when the filter needs
    /// more source data (non-flush ticks) or has nothing left to flush.
    fn filter_step(&mut self, state: TickState) -> Result<Option<Vec<u8>>, TranscodeError>;
    /// Drains all packets the encoder currently has buffered for the given
    /// filtered frame (or, when flushing, for no new input).
    fn encode_step(&mut self, frame: Option<Vec<u8>>, state: TickState) -> Result<Vec<MuxedPacket>, TranscodeError>;
    /// Writes one muxed packet to the current segment in local-tmp storage.
    fn write_step(&mut self, packet: &MuxedPacket) -> Result<(), TranscodeError>;
}

pub fn run_tick<S: FilterEncodeWriteStages>(stages: &mut S, state: TickState) -> Result<bool, TranscodeError> {
    let mut wrote_any = false;

    if state.is_terminal() {
        // final_write: no filter/encode input, just drain whatever the
        // write stage still needs to flush (e.g. segment trailer bytes).
        let packets = stages.encode_step(None, state)?;
        for packet in &packets {
            stages.write_step(packet)?;
            wrote_any = true;
        }
        return Ok(wrote_any);
    }

    loop {
        let frame = stages.filter_step(state)?;
        let frame_is_none = frame.is_none();
        let packets = stages.encode_step(frame, state)?;
        for packet in &packets {
            stages.write_step(packet)?;
            wrote_any = true;
        }
        if frame_is_none {
            break;
        }
    }

    Ok(wrote_any)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table_picks_normal_while_source_has_data() {
        let state = TickState::default();
        assert_eq!(state.active_fns(), ActiveFns::Normal);
    }

    #[test]
    fn transition_table_progresses_through_flush_stages() {
        let mut state = TickState {
            source_done: true,
            ..Default::default()
        };
        assert_eq!(state.active_fns(), ActiveFns::FlushingFilter);
        state.filter_flushed = true;
        assert_eq!(state.active_fns(), ActiveFns::FlushingEncoder);
        state.encoder_flushed = true;
        assert_eq!(state.active_fns(), ActiveFns::FinalWrite);
        assert!(state.is_terminal());
    }

    struct CountingStages {
        frames_remaining: usize,
        written: Vec<MuxedPacket>,
    }

    impl FilterEncodeWriteStages for CountingStages {
        fn filter_step(&mut self, _state: TickState) -> Result<Option<Vec<u8>>, TranscodeError> {
            if self.frames_remaining == 0 {
                return Ok(None);
            }
            self.frames_remaining -= 1;
            Ok(Some(vec![0u8; 4]))
        }

        fn encode_step(&mut self, frame: Option<Vec<u8>>, _state: TickState) -> Result<Vec<MuxedPacket>, TranscodeError> {
            Ok(frame
                .map(|data| {
                    vec![MuxedPacket {
                        data,
                        is_final: false,
                    }]
                })
                .unwrap_or_default())
        }

        fn write_step(&mut self, packet: &MuxedPacket) -> Result<(), TranscodeError> {
            self.written.push(packet.clone());
            Ok(())
        }
    }

    #[test]
    fn run_tick_drains_filter_until_need_more_data() {
        let mut stages = CountingStages {
            frames_remaining: 3,
            written: Vec::new(),
        };
        let wrote = run_tick(&mut stages, TickState::default()).unwrap();
        assert!(wrote);
        assert_eq!(stages.written.len(), 3);
    }

    #[test]
    fn run_tick_reports_no_progress_when_filter_is_immediately_dry() {
        let mut stages = CountingStages {
            frames_remaining: 0,
            written: Vec::new(),
        };
        let wrote = run_tick(&mut stages, TickState::default()).unwrap();
        assert!(!wrote);
    }
}
