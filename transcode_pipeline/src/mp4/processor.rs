// /////////////////////////////////////////////////////////////////////////////
// Media Transcode Worker
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The MP4 source-side [`FileProcessor`]: drives pre-loading to completion,
//! then hands packets to downstream destination processors through
//! [`AvContext`].

use crate::mp4::atom::MdatLocator;
use crate::mp4::av_context::{AvContext, NextPacketOutcome};
use crate::mp4::preload::{AtomPreloadState, Mp4Preloader};
use transcode_domain::{AsyncOpFlags, FileProcessor, FileProcessorRegistry, TranscodeError};

pub struct Mp4FileProcessor {
    state: AtomPreloadState,
    locator: Option<MdatLocator>,
    av_context: Option<AvContext>,
    local_temp: Vec<u8>,
    async_flags: AsyncOpFlags,
    initialized: bool,
    done: bool,
}

impl Mp4FileProcessor {
    pub fn new() -> Self {
        Self {
            state: AtomPreloadState::AwaitingOpen,
            locator: None,
            av_context: None,
            local_temp: Vec::new(),
            async_flags: AsyncOpFlags::default(),
            initialized: false,
            done: false,
        }
    }

    /// Runs the pre-load algorithm over already-fetched chunk bytes. In
    /// production the chunks arrive one storage read at a time through
    /// [`AtomPreloadState::step`]; tests and any storage backend that
    /// returns whole chunks synchronously can use this entry point.
    pub fn preload_from_chunks(&mut self, chunks: &[&[u8]]) -> Result<(), TranscodeError> {
        let (local_temp, locator) = Mp4Preloader::run_in_memory(chunks)?;
        self.local_temp = local_temp;
        self.locator = Some(locator);
        self.state = AtomPreloadState::Done;

        // The whole mdat body is already resident in this in-memory entry
        // point, so every packet it contains counts as pre-loaded up front;
        // `processing` still fetches and decodes them one at a time through
        // `AvContext`.
        let mut av_context = AvContext::new(1, locator.body_size());
        if let Some(stream) = av_context.stream_mut(0) {
            stream.preloaded = locator.body_size() as usize;
        }
        self.av_context = Some(av_context);
        Ok(())
    }

    pub fn mdat_locator(&self) -> Option<&MdatLocator> {
        self.locator.as_ref()
    }

    pub fn local_temp_bytes(&self) -> &[u8] {
        &self.local_temp
    }

    pub fn av_context_mut(&mut self) -> Option<&mut AvContext> {
        self.av_context.as_mut()
    }
}

impl Default for Mp4FileProcessor {
    fn default() -> Self {
        Self::new()
    }
}

fn ctor_mp4() -> Box<dyn FileProcessor + Send> {
    Box::new(Mp4FileProcessor::new())
}

static MP4_REGISTRY_ENTRIES: &[(&str, fn() -> Box<dyn FileProcessor + Send>)] =
    &[("mp4", ctor_mp4), ("mov", ctor_mp4), ("video/mp4", ctor_mp4)];

/// The source-side registry: labels a request's sniffed/declared container
/// maps to a constructor for. No destination entries are registered here —
/// `HlsFileProcessor` is generic over its filter/encode/write backend and
/// this crate ships no concrete backend, so there is no zero-argument
/// constructor to register it under.
pub fn registry() -> FileProcessorRegistry {
    FileProcessorRegistry::new(MP4_REGISTRY_ENTRIES)
}

impl FileProcessor for Mp4FileProcessor {
    fn init(&mut self) -> Result<(), TranscodeError> {
        self.initialized = true;
        self.state = AtomPreloadState::AwaitingOpen;
        Ok(())
    }

    fn deinit(&mut self) {
        self.av_context = None;
        self.locator = None;
        self.local_temp.clear();
        self.initialized = false;
    }

    fn processing(&mut self) -> Result<bool, TranscodeError> {
        if !self.initialized {
            return Err(TranscodeError::Internal("processor used before init".into()));
        }
        if self.state != AtomPreloadState::Done {
            // Driven externally by preload_from_chunks in this implementation;
            // a state that hasn't reached Done yet is waiting on a storage read.
            return Ok(false);
        }

        let av_context = self
            .av_context
            .as_mut()
            .expect("av_context is populated once pre-load reaches Done");
        while av_context.next_local_packet(0)? == NextPacketOutcome::Ready {
            av_context.decode_packet()?;
        }
        self.done = true;
        Ok(true)
    }

    fn has_done_processing(&self) -> bool {
        self.done
    }

    fn label_match(&self, label: &str) -> bool {
        matches!(label, "mp4" | "mov" | "video/mp4")
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

    fn atom_bytes(kind: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let size = (crate::mp4::ATOM_HEADER_SIZE + body.len()) as u32;
        let mut out = size.to_be_bytes().to_vec();
        out.extend_from_slice(kind);
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn reports_done_only_after_preload_completes() {
        let mut processor = Mp4FileProcessor::new();
        processor.init().unwrap();
        assert!(!processor.processing().unwrap());

        let ftyp = atom_bytes(b"ftyp", &[0u8; 8]);
        let moov = atom_bytes(b"moov", &[1u8; 8]);
        let mdat = atom_bytes(b"mdat", &[2u8; 16]);
        let chunk = [ftyp, moov, mdat].concat();
        processor.preload_from_chunks(&[&chunk]).unwrap();

        assert!(processor.processing().unwrap());
        assert!(processor.has_done_processing());
        assert!(processor.mdat_locator().is_some());
    }

    #[test]
    fn processing_drains_every_preloaded_packet_through_av_context() {
        let mut processor = Mp4FileProcessor::new();
        processor.init().unwrap();

        let ftyp = atom_bytes(b"ftyp", &[0u8; 8]);
        let moov = atom_bytes(b"moov", &[1u8; 8]);
        let mdat = atom_bytes(b"mdat", &[2u8; 16]);
        let chunk = [ftyp, moov, mdat].concat();
        processor.preload_from_chunks(&[&chunk]).unwrap();

        processor.processing().unwrap();

        let av_context = processor.av_context_mut().unwrap();
        assert_eq!(av_context.tot_num_pkts_avail(), 0);
        assert_eq!(av_context.tot_num_pkts_fixed(), 16);
    }

    #[test]
    fn registry_instantiates_mp4_processor_by_label() {
        let mut boxed = registry().instantiate("mp4").expect("mp4 label registered");
        assert!(boxed.as_any_mut().downcast_mut::<Mp4FileProcessor>().is_some());
        assert!(registry().instantiate("hls").is_none());
    }

    #[test]
    fn label_match_accepts_mp4_aliases_only() {
        let processor = Mp4FileProcessor::new();
        assert!(processor.label_match("mp4"));
        assert!(processor.label_match("video/mp4"));
        assert!(!processor.label_match("hls"));
    }
}
