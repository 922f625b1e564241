// /////////////////////////////////////////////////////////////////////////////
// Media Transcode Worker
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The HLS destination-side [`FileProcessor`]: drives the filter/encode/
//! write tick loop to completion for one output version.

use crate::hls::encode::{run_tick, FilterEncodeWriteStages, MuxedPacket, TickState};
use transcode_domain::{AsyncOpFlags, FileProcessor, TranscodeError};

/// Segments written so far, used to name `segment-NNN.m4s` files.
pub struct HlsFileProcessor<S: FilterEncodeWriteStages> {
    stages: S,
    state: TickState,
    async_flags: AsyncOpFlags,
    initialized: bool,
}

impl<S: FilterEncodeWriteStages> HlsFileProcessor<S> {
    pub fn new(stages: S) -> Self {
        Self {
            stages,
            state: TickState::default(),
            async_flags: AsyncOpFlags::default(),
            initialized: false,
        }
    }

    pub fn mark_source_done(&mut self) {
        self.state.source_done = true;
    }

    pub fn tick_state(&self) -> TickState {
        self.state
    }
}

impl<S: FilterEncodeWriteStages + 'static> FileProcessor for HlsFileProcessor<S> {
    fn init(&mut self) -> Result<(), TranscodeError> {
        self.initialized = true;
        Ok(())
    }

    fn deinit(&mut self) {
        self.initialized = false;
    }

    fn processing(&mut self) -> Result<bool, TranscodeError> {
        if !self.initialized {
            return Err(TranscodeError::Internal("processor used before init".into()));
        }
        let wrote = run_tick(&mut self.stages, self.state)?;

        if self.state.active_fns() == crate::hls::encode::ActiveFns::FlushingFilter {
            self.state.filter_flushed = true;
        } else if self.state.active_fns() == crate::hls::encode::ActiveFns::FlushingEncoder {
            self.state.encoder_flushed = true;
        }

        Ok(wrote)
    }

    fn has_done_processing(&self) -> bool {
        self.state.is_terminal()
    }

    fn label_match(&self, label: &str) -> bool {
        matches!(label, "hls" | "application/x-mpegurl" | "m3u8")
    }

    fn async_flags(&self) -> AsyncOpFlags {
        self.async_flags
    }

    fn async_flags_mut(&mut self) -> &mut AsyncOpFlags {
        &mut self.async_flags
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedStages {
        remaining: usize,
    }

    impl FilterEncodeWriteStages for FixedStages {
        fn filter_step(&mut self, state: TickState) -> Result<Option<Vec<u8>>, TranscodeError> {
            if state.is_terminal() || self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            Ok(Some(vec![0u8; 2]))
        }

        fn encode_step(&mut self, frame: Option<Vec<u8>>, _state: TickState) -> Result<Vec<MuxedPacket>, TranscodeError> {
            Ok(frame
                .map(|data| vec![MuxedPacket { data, is_final: false }])
                .unwrap_or_default())
        }

        fn write_step(&mut self, _packet: &MuxedPacket) -> Result<(), TranscodeError> {
            Ok(())
        }
    }

    #[test]
    fn label_match_accepts_hls_aliases_only() {
        let processor = HlsFileProcessor::new(FixedStages { remaining: 0 });
        assert!(processor.label_match("hls"));
        assert!(!processor.label_match("mp4"));
    }

    #[test]
    fn processing_reaches_terminal_once_source_and_flushes_complete() {
        let mut processor = HlsFileProcessor::new(FixedStages { remaining: 2 });
        processor.init().unwrap();
        processor.processing().unwrap();
        processor.mark_source_done();
        processor.processing().unwrap(); // flush filter
        assert!(!processor.has_done_processing());
        processor.processing().unwrap(); // flush encoder
        assert!(processor.has_done_processing());
    }
}
