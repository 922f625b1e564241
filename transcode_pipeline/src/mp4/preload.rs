// /////////////////////////////////////////////////////////////////////////////
// Media Transcode Worker
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! The MP4 source pre-loader: walks a chunked source one atom at a time and
//! produces a local temp file containing `ftyp || free? || moov ||
//! mdat-header`, with no `mdat` body bytes, plus an [`MdatLocator`] indexing
//! the skipped body range for later on-demand packet pre-loads.
//!
//! `AtomPreloadState` rewrites the source design's callback-chain as an
//! explicit enum driven by `step(event)`, per Design Notes §9: every prior
//! callback boundary becomes a state transition here.

use crate::mp4::atom::{Atom, MdatLocator, ATOM_HEADER_SIZE};
use transcode_domain::TranscodeError;

/// Explicit state machine for one atom's traversal, replacing the
/// callback-chain pattern of the source design one-for-one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomPreloadState {
    AwaitingOpen,
    AwaitingHeaderRead,
    AwaitingBodyRead,
    AwaitingSwitchChunk,
    EmittingMdatHeader,
    Done,
}

/// Completion events fed into [`AtomPreloadState::step`] at what used to be
/// callback boundaries.
#[derive(Debug, Clone)]
pub enum PreloadEvent {
    Opened,
    HeaderBytesRead(Vec<u8>),
    BodyBytesRead(Vec<u8>),
    ChunkSwitched,
    MdatHeaderEmitted,
    EndOfSource,
}

impl AtomPreloadState {
    /// Pure state transition. The caller (the async infrastructure adapter
    /// in production, or [`Mp4Preloader::run_in_memory`] in tests) is
    /// responsible for actually performing the I/O the event reports on.
    pub fn step(self, event: &PreloadEvent) -> AtomPreloadState {
        use AtomPreloadState::*;
        use PreloadEvent::*;
        match (self, event) {
            (AwaitingOpen, Opened) => AwaitingHeaderRead,
            (AwaitingHeaderRead, HeaderBytesRead(_)) => AwaitingBodyRead,
            (AwaitingHeaderRead, EndOfSource) => Done,
            (AwaitingBodyRead, BodyBytesRead(_)) => AwaitingHeaderRead,
            (AwaitingBodyRead, ChunkSwitched) => AwaitingSwitchChunk,
            (AwaitingSwitchChunk, ChunkSwitched) => AwaitingBodyRead,
            (AwaitingHeaderRead, ChunkSwitched) => AwaitingSwitchChunk,
            (AwaitingSwitchChunk, HeaderBytesRead(_)) => AwaitingBodyRead,
            (_, MdatHeaderEmitted) => EmittingMdatHeader,
            (EmittingMdatHeader, EndOfSource) => Done,
            // `estimate_nb_pkt_preload` returning zero is treated as explicit
            // end-of-source rather than leaving the continuation
            // unscheduled (see Design Notes "probable bugs in source").
            (_, EndOfSource) => Done,
            (other, _) => other,
        }
    }
}

/// Accumulated canonical-order bytes for the non-`mdat` atoms, plus the
/// pending `mdat` locator once one is found. The local temp file is always
/// assembled as `ftyp || free? || moov || mdat-header`, regardless of the
/// order atoms were encountered in the source (the "mdat before moov" case
/// in the testable scenarios requires this reordering).
#[derive(Debug, Default)]
struct CanonicalBuckets {
    ftyp: Vec<u8>,
    free: Vec<u8>,
    moov: Vec<u8>,
}

impl CanonicalBuckets {
    fn assemble(&self, mdat_header: [u8; ATOM_HEADER_SIZE]) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.ftyp.len() + self.free.len() + self.moov.len() + ATOM_HEADER_SIZE);
        out.extend_from_slice(&self.ftyp);
        out.extend_from_slice(&self.free);
        out.extend_from_slice(&self.moov);
        out.extend_from_slice(&mdat_header);
        out
    }
}

/// Cursor over a chunked source: tracks which chunk and byte offset we're
/// at, and can read `n` bytes even when they span a chunk boundary.
struct ChunkCursor<'a> {
    chunks: &'a [&'a [u8]],
    chunk_idx: usize,
    offset: usize,
    whole_file_pos: u64,
}

impl<'a> ChunkCursor<'a> {
    fn new(chunks: &'a [&'a [u8]]) -> Self {
        Self {
            chunks,
            chunk_idx: 0,
            offset: 0,
            whole_file_pos: 0,
        }
    }

    /// One-based chunk sequence number of the current position.
    fn fchunk_seq(&self) -> u32 {
        (self.chunk_idx + 1) as u32
    }

    fn at_end(&self) -> bool {
        self.chunk_idx >= self.chunks.len()
    }

    /// Reads `n` bytes starting at the current position, advancing across
    /// chunk boundaries as needed (step 1 of the atom state machine: "copy
    /// the tail, advance to the next chunk, read the remainder").
    fn read(&mut self, n: usize) -> Result<Vec<u8>, TranscodeError> {
        let mut out = Vec::with_capacity(n);
        while out.len() < n {
            if self.at_end() {
                return Err(TranscodeError::format("unexpected end of source while reading atom data"));
            }
            let chunk = self.chunks[self.chunk_idx];
            let remaining_in_chunk = chunk.len() - self.offset;
            let need = n - out.len();
            let take = remaining_in_chunk.min(need);
            out.extend_from_slice(&chunk[self.offset..self.offset + take]);
            self.offset += take;
            self.whole_file_pos += take as u64;
            if self.offset >= chunk.len() {
                self.chunk_idx += 1;
                self.offset = 0;
            }
        }
        Ok(out)
    }

    /// Skips `n` bytes without copying them (used for the `mdat` body, which
    /// is indexed but never copied into the local temp file).
    fn skip(&mut self, n: usize) -> Result<(), TranscodeError> {
        let mut remaining = n;
        while remaining > 0 {
            if self.at_end() {
                return Err(TranscodeError::format("unexpected end of source while skipping mdat body"));
            }
            let chunk = self.chunks[self.chunk_idx];
            let remaining_in_chunk = chunk.len() - self.offset;
            let take = remaining_in_chunk.min(remaining);
            self.offset += take;
            self.whole_file_pos += take as u64;
            remaining -= take;
            if self.offset >= chunk.len() {
                self.chunk_idx += 1;
                self.offset = 0;
            }
        }
        Ok(())
    }
}

/// Reference implementation of the pre-load algorithm over an in-memory
/// representation of the chunked source. Production wiring drives the same
/// atom-walk logic through [`AtomPreloadState`] one storage callback at a
/// time; this entry point is used directly by tests and by any storage
/// backend that can hand back whole chunks synchronously.
pub struct Mp4Preloader;

impl Mp4Preloader {
    /// Walks `chunks` end to end, returning the synthesized local temp file
    /// bytes and the `mdat` locator. `chunks[0]` is chunk 1.
    pub fn run_in_memory(chunks: &[&[u8]]) -> Result<(Vec<u8>, MdatLocator), TranscodeError> {
        let mut cursor = ChunkCursor::new(chunks);
        let mut buckets = CanonicalBuckets::default();
        let mut mdat: Option<MdatLocator> = None;

        while !cursor.at_end() {
            let fchunk_seq = cursor.fchunk_seq();
            let pos_in_chunk = cursor.offset as u64;
            let pos_wholefile = cursor.whole_file_pos;
            let header_bytes = cursor.read(ATOM_HEADER_SIZE)?;
            let atom = Atom::read_header(&header_bytes)?;

            if atom.is_mdat() {
                let body_len = atom.body_len()?;
                cursor.skip(body_len)?;
                mdat = Some(MdatLocator {
                    header: atom,
                    fchunk_seq,
                    pos: pos_in_chunk,
                    pos_wholefile,
                    size: atom.size as u64,
                    nb_preloaded: 0,
                });
                continue;
            }

            if !atom.is_known_kind() {
                return Err(TranscodeError::format(format!(
                    "unexpected atom '{}' encountered mid-stream",
                    atom.kind_str()
                )));
            }

            let body_len = atom.body_len()?;
            let body = cursor.read(body_len)?;
            let bucket = match &atom.kind {
                b"ftyp" => &mut buckets.ftyp,
                b"free" => &mut buckets.free,
                b"moov" => &mut buckets.moov,
                _ => unreachable!("is_known_kind only admits ftyp/free/moov/mdat"),
            };
            bucket.extend_from_slice(&header_bytes);
            bucket.extend_from_slice(&body);
        }

        let mdat = mdat.ok_or_else(|| TranscodeError::format("source has no mdat atom"))?;
        let local_temp = buckets.assemble(mdat.header.to_header_bytes());
        Ok((local_temp, mdat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom_bytes(kind: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let size = (ATOM_HEADER_SIZE + body.len()) as u32;
        let mut out = size.to_be_bytes().to_vec();
        out.extend_from_slice(kind);
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn local_temp_contains_no_mdat_body_bytes() {
        let ftyp = atom_bytes(b"ftyp", &[0u8; 16]);
        let moov = atom_bytes(b"moov", &[1u8; 12]);
        let mdat_body = vec![9u8; 40];
        let mdat = atom_bytes(b"mdat", &mdat_body);

        let chunk1 = [ftyp.clone(), moov.clone()].concat();
        let chunk2 = mdat.clone();
        let chunks: Vec<&[u8]> = vec![&chunk1, &chunk2];

        let (local_temp, locator) = Mp4Preloader::run_in_memory(&chunks).unwrap();

        assert_eq!(local_temp.len(), ftyp.len() + moov.len() + ATOM_HEADER_SIZE);
        assert!(!local_temp.windows(mdat_body.len()).any(|w| w == mdat_body.as_slice()));
        assert_eq!(locator.size, mdat.len() as u64);
        assert_eq!(locator.body_size(), mdat_body.len() as u64);
        assert_eq!(locator.fchunk_seq, 2);
        assert_eq!(locator.nb_preloaded, 0);
    }

    #[test]
    fn mdat_before_moov_is_reordered_to_canonical_layout() {
        let ftyp = atom_bytes(b"ftyp", &[0u8; 16]);
        let mdat_body = vec![7u8; 40];
        let mdat = atom_bytes(b"mdat", &mdat_body);
        let moov = atom_bytes(b"moov", &[2u8; 20]);

        let chunk1 = [ftyp.clone(), mdat, moov.clone()].concat();
        let chunks: Vec<&[u8]> = vec![&chunk1];

        let (local_temp, _locator) = Mp4Preloader::run_in_memory(&chunks).unwrap();

        // Canonical order is always ftyp, free?, moov, mdat-header - even
        // though mdat preceded moov in the source.
        assert!(local_temp.starts_with(&ftyp));
        let moov_pos = ftyp.len();
        assert_eq!(&local_temp[moov_pos..moov_pos + moov.len()], moov.as_slice());
        assert_eq!(local_temp.len(), ftyp.len() + moov.len() + ATOM_HEADER_SIZE);
    }

    #[test]
    fn header_spanning_chunk_boundary_reassembles_correctly() {
        let moov = atom_bytes(b"moov", &[3u8; 30]);
        let mdat_body = vec![5u8; 10];
        let mdat = atom_bytes(b"mdat", &mdat_body);
        let mdat_header_bytes = &mdat[..ATOM_HEADER_SIZE];

        // Split the mdat header itself across two chunks.
        let chunk1 = [moov.clone(), mdat_header_bytes[..3].to_vec()].concat();
        let chunk2 = [mdat_header_bytes[3..].to_vec(), mdat_body.clone()].concat();
        let chunks: Vec<&[u8]> = vec![&chunk1, &chunk2];

        let (local_temp, locator) = Mp4Preloader::run_in_memory(&chunks).unwrap();
        assert_eq!(local_temp.len(), moov.len() + ATOM_HEADER_SIZE);
        assert_eq!(locator.fchunk_seq, 1);
    }

    #[test]
    fn unknown_atom_kind_mid_stream_is_a_format_error() {
        let ftyp = atom_bytes(b"ftyp", &[0u8; 8]);
        let bogus = atom_bytes(b"skip", &[0u8; 4]);
        let chunk1 = [ftyp, bogus].concat();
        let chunks: Vec<&[u8]> = vec![&chunk1];
        assert!(Mp4Preloader::run_in_memory(&chunks).is_err());
    }

    #[test]
    fn state_machine_reaches_done_on_end_of_source() {
        let state = AtomPreloadState::AwaitingHeaderRead.step(&PreloadEvent::EndOfSource);
        assert_eq!(state, AtomPreloadState::Done);
    }

    #[test]
    fn state_machine_handles_chunk_switch_mid_header() {
        let state = AtomPreloadState::AwaitingHeaderRead.step(&PreloadEvent::ChunkSwitched);
        assert_eq!(state, AtomPreloadState::AwaitingSwitchChunk);
        let state = state.step(&PreloadEvent::HeaderBytesRead(vec![0; 8]));
        assert_eq!(state, AtomPreloadState::AwaitingBodyRead);
    }
}
