// /////////////////////////////////////////////////////////////////////////////
// Media Transcode Worker
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! MP4 atom (box) records: a 32-bit big-endian size followed by a 4-byte
//! ASCII kind, then the body. Only the four atom kinds the source pre-loader
//! needs to recognize are accepted; anything else mid-stream is fatal.

use transcode_domain::TranscodeError;

/// Size in bytes of an atom header: 4-byte size + 4-byte kind.
pub const ATOM_HEADER_SIZE: usize = 8;

/// Atom kinds the pre-loader understands. Any other kind encountered while
/// walking the source is a fatal data error.
pub const KNOWN_KINDS: [&[u8; 4]; 4] = [b"ftyp", b"free", b"moov", b"mdat"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Atom {
    pub size: u32,
    pub kind: [u8; 4],
}

impl Atom {
    /// Parses an 8-byte atom header (big-endian size, then 4-byte kind).
    pub fn read_header(bytes: &[u8]) -> Result<Self, TranscodeError> {
        if bytes.len() != ATOM_HEADER_SIZE {
            return Err(TranscodeError::format(format!(
                "atom header must be {ATOM_HEADER_SIZE} bytes, got {}",
                bytes.len()
            )));
        }
        let size = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let kind = [bytes[4], bytes[5], bytes[6], bytes[7]];
        Ok(Self { size, kind })
    }

    /// Serializes the header back to its 8-byte wire form.
    pub fn to_header_bytes(self) -> [u8; ATOM_HEADER_SIZE] {
        let mut out = [0u8; ATOM_HEADER_SIZE];
        out[..4].copy_from_slice(&self.size.to_be_bytes());
        out[4..].copy_from_slice(&self.kind);
        out
    }

    pub fn kind_str(&self) -> &str {
        std::str::from_utf8(&self.kind).unwrap_or("????")
    }

    pub fn is_known_kind(&self) -> bool {
        KNOWN_KINDS.iter().any(|k| *k == &self.kind)
    }

    pub fn is_mdat(&self) -> bool {
        &self.kind == b"mdat"
    }

    /// Number of body bytes following this header, per the declared size.
    pub fn body_len(&self) -> Result<usize, TranscodeError> {
        (self.size as usize)
            .checked_sub(ATOM_HEADER_SIZE)
            .ok_or_else(|| TranscodeError::format(format!("atom {} has size smaller than its header", self.kind_str())))
    }
}

/// Locates the `mdat` atom's body within the chunked source: which chunk its
/// body starts in, the byte offset into that chunk, its declared size, and
/// how many of its body bytes have been pre-loaded into the local temp file
/// so far (`nb_preloaded`, grown on demand by `preload_packet_sequence`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MdatLocator {
    pub header: Atom,
    pub fchunk_seq: u32,
    pub pos: u64,
    pub pos_wholefile: u64,
    pub size: u64,
    pub nb_preloaded: u64,
}

impl MdatLocator {
    pub fn body_size(&self) -> u64 {
        self.size.saturating_sub(ATOM_HEADER_SIZE as u64)
    }

    /// `true` once every body byte has been pre-loaded at least once.
    pub fn fully_preloaded(&self) -> bool {
        self.nb_preloaded >= self.body_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_header_bytes() {
        let atom = Atom {
            size: 1024,
            kind: *b"moov",
        };
        let bytes = atom.to_header_bytes();
        let parsed = Atom::read_header(&bytes).unwrap();
        assert_eq!(parsed, atom);
    }

    #[test]
    fn rejects_unknown_kind_membership_check() {
        let atom = Atom {
            size: 16,
            kind: *b"skip",
        };
        assert!(!atom.is_known_kind());
    }

    #[test]
    fn body_len_rejects_undersized_atom() {
        let atom = Atom {
            size: 4,
            kind: *b"ftyp",
        };
        assert!(atom.body_len().is_err());
    }
}
