// /////////////////////////////////////////////////////////////////////////////
// Media Transcode Worker
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! HLS segment encryption and crypto-key rotation.
//!
//! Segments are encrypted with AES-128-CBC rather than an AEAD cipher,
//! because the streaming seeker keys segments by a rotating CBC key/IV pair
//! the way `EXT-X-KEY:METHOD=AES-128` requires (see DESIGN.md for the
//! substitution rationale). Key rotation is purely time-driven: `rotate`
//! takes the current wall-clock time as `now_secs` and mints a fresh key once
//! the newest entry is older than the configured update interval, pruning
//! anything older than four intervals.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::Aes128;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use transcode_domain::TranscodeError;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

pub const KEY_LEN: usize = 16;
pub const IV_LEN: usize = 16;

/// One entry in `crypto-key.json`: an 8-hex-char key-id mapping to its key
/// material, the timestamp it was minted, and how many bytes it has sealed
/// so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoKeyEntry {
    pub algorithm: String,
    #[serde(with = "hex_bytes")]
    pub key: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub iv: Vec<u8>,
    pub timestamp_secs: u64,
    pub nbytes: u64,
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

/// The full `crypto-key.json` document: an ordered map of key-id to entry,
/// newest last.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CryptoKeyFile {
    pub entries: BTreeMap<String, CryptoKeyEntry>,
}

impl CryptoKeyFile {
    pub fn newest(&self) -> Option<(&String, &CryptoKeyEntry)> {
        self.entries.iter().max_by_key(|(_, e)| e.timestamp_secs)
    }

    pub fn oldest(&self) -> Option<(&String, &CryptoKeyEntry)> {
        self.entries.iter().min_by_key(|(_, e)| e.timestamp_secs)
    }

    /// Rotates the key set: mints a fresh key if the newest entry is older
    /// than `update_interval_secs`, and prunes any entry older than
    /// `4 * update_interval_secs`. Returns the active key-id after rotation.
    /// `now_secs` is passed in rather than read from a clock, matching the
    /// teacher's rule that time flows in through the caller, not a hidden
    /// global.
    pub fn rotate(&mut self, now_secs: u64, update_interval_secs: u64) -> Result<String, TranscodeError> {
        let needs_rotation = match self.newest() {
            Some((_, newest)) => now_secs.saturating_sub(newest.timestamp_secs) >= update_interval_secs,
            None => true,
        };

        if needs_rotation {
            let mut key = vec![0u8; KEY_LEN];
            let mut iv = vec![0u8; IV_LEN];
            rand::rng().fill_bytes(&mut key);
            rand::rng().fill_bytes(&mut iv);
            let key_id = format!("{:08x}", rand::rng().next_u32());
            self.entries.insert(
                key_id.clone(),
                CryptoKeyEntry {
                    algorithm: "AES-128-CBC".to_string(),
                    key,
                    iv,
                    timestamp_secs: now_secs,
                    nbytes: 0,
                },
            );
        }

        let prune_before = now_secs.saturating_sub(4 * update_interval_secs);
        if let Some((oldest_id, oldest)) = self.oldest() {
            if oldest.timestamp_secs < prune_before && self.entries.len() > 1 {
                let oldest_id = oldest_id.clone();
                self.entries.remove(&oldest_id);
            }
        }

        self.newest()
            .map(|(id, _)| id.clone())
            .ok_or_else(|| TranscodeError::Internal("crypto key file has no active key after rotation".into()))
    }
}

/// Encrypts a whole segment's plaintext bytes under AES-128-CBC with PKCS7
/// padding, equivalent to `EVP_EncryptUpdate` over aligned 16-byte chunks
/// followed by a single `EVP_EncryptFinal_ex` — CBC chains strictly block by
/// block, so encrypting the buffered segment in one call produces
/// byte-identical ciphertext to the streaming EVP calls.
pub fn encrypt_segment(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, TranscodeError> {
    if key.len() != KEY_LEN {
        return Err(TranscodeError::validation(format!(
            "AES-128-CBC requires a {KEY_LEN}-byte key, got {}",
            key.len()
        )));
    }
    if iv.len() != IV_LEN {
        return Err(TranscodeError::validation(format!(
            "AES-128-CBC requires a {IV_LEN}-byte IV, got {}",
            iv.len()
        )));
    }
    let encryptor = Aes128CbcEnc::new_from_slices(key, iv)
        .map_err(|e| TranscodeError::Internal(format!("bad AES-128-CBC key/iv length: {e}")))?;
    Ok(encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

pub fn decrypt_segment(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, TranscodeError> {
    if key.len() != KEY_LEN {
        return Err(TranscodeError::validation(format!(
            "AES-128-CBC requires a {KEY_LEN}-byte key, got {}",
            key.len()
        )));
    }
    let decryptor = Aes128CbcDec::new_from_slices(key, iv)
        .map_err(|e| TranscodeError::Internal(format!("bad AES-128-CBC key/iv length: {e}")))?;
    decryptor
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|e| TranscodeError::format(format!("segment decryption failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_encrypt_decrypt_equals_source() {
        let key = vec![1u8; KEY_LEN];
        let iv = vec![2u8; IV_LEN];
        let plaintext = b"the quick brown fox jumps over the lazy dog".to_vec();
        let ciphertext = encrypt_segment(&key, &iv, &plaintext).unwrap();
        let recovered = decrypt_segment(&key, &iv, &ciphertext).unwrap();
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn rejects_wrong_key_length() {
        let key = vec![0u8; 8];
        let iv = vec![0u8; IV_LEN];
        assert!(encrypt_segment(&key, &iv, b"x").is_err());
    }

    #[test]
    fn rotation_mints_a_key_when_file_is_empty() {
        let mut file = CryptoKeyFile::default();
        let active = file.rotate(1_000, 300).unwrap();
        assert_eq!(file.entries.len(), 1);
        assert!(file.entries.contains_key(&active));
    }

    #[test]
    fn rotation_is_a_no_op_within_the_update_interval() {
        let mut file = CryptoKeyFile::default();
        let first = file.rotate(1_000, 300).unwrap();
        let second = file.rotate(1_100, 300).unwrap();
        assert_eq!(first, second);
        assert_eq!(file.entries.len(), 1);
    }

    #[test]
    fn rotation_prunes_entries_older_than_four_update_intervals() {
        let mut file = CryptoKeyFile::default();
        file.rotate(0, 300).unwrap();
        // Jump far enough that the first key is older than 4x the interval
        // and a new key is minted.
        let active = file.rotate(5_000, 300).unwrap();
        assert_eq!(file.entries.len(), 1);
        assert!(file.entries.contains_key(&active));
    }

    #[test]
    fn never_removes_an_entry_younger_than_four_intervals() {
        let mut file = CryptoKeyFile::default();
        file.rotate(0, 300).unwrap();
        let first_id = file.newest().unwrap().0.clone();
        // Not yet past 4x the interval (1200s).
        file.rotate(1_000, 300).unwrap();
        assert!(file.entries.contains_key(&first_id));
    }
}
