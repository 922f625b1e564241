// /////////////////////////////////////////////////////////////////////////////
// Media Transcode Worker
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Storage-map coordinator (`AsaMap`/`AsaObj` in the original design): owns
//! the source handle, the local temp-file handle, and the set of
//! destination slots a single transcode request fans out to, plus the
//! fan-out/fan-in counter and the shared single-emit error slot.

use crate::value_objects::{StorageAlias, VersionLabel};
use crate::TranscodeError;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

/// One destination's "working" bit plus its identity.
#[derive(Debug, Clone)]
pub struct DestinationSlot {
    alias: StorageAlias,
    version: VersionLabel,
    working: bool,
}

impl DestinationSlot {
    pub fn new(alias: StorageAlias, version: VersionLabel) -> Self {
        Self {
            alias,
            version,
            working: false,
        }
    }

    pub fn alias(&self) -> &StorageAlias {
        &self.alias
    }

    pub fn version(&self) -> &VersionLabel {
        &self.version
    }

    pub fn is_working(&self) -> bool {
        self.working
    }
}

/// Single-emit shared error slot: the first caller to report an error wins;
/// later reports are silently dropped rather than overwriting it, so the
/// RPC reply channel is used exactly once per request regardless of how
/// many destinations fail concurrently.
#[derive(Debug, Clone, Default)]
pub struct ErrorInfo(Arc<Mutex<Option<TranscodeError>>>);

impl ErrorInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `err` if no error has been recorded yet. Returns `true` if
    /// this call was the one that recorded it.
    pub fn try_set(&self, err: TranscodeError) -> bool {
        let mut guard = self.0.lock();
        if guard.is_some() {
            return false;
        }
        *guard = Some(err);
        true
    }

    pub fn get(&self) -> Option<TranscodeError> {
        self.0.lock().clone()
    }

    pub fn is_set(&self) -> bool {
        self.0.lock().is_some()
    }
}

/// The storage-map coordinator for one transcode request.
pub struct StorageMap {
    source: Option<StorageAlias>,
    local_tmp: Option<PathBuf>,
    destinations: Vec<DestinationSlot>,
    max_destinations: usize,
    sync_count: u32,
    error_info: ErrorInfo,
    started: bool,
    deinitialized: bool,
}

impl StorageMap {
    /// Allocates a map with capacity for `n_dst` destination slots; a
    /// subsequent `add_destination` past that capacity fails.
    pub fn new(n_dst: usize) -> Self {
        Self {
            source: None,
            local_tmp: None,
            destinations: Vec::new(),
            max_destinations: n_dst,
            sync_count: 0,
            error_info: ErrorInfo::new(),
            started: false,
            deinitialized: false,
        }
    }

    pub fn set_source(&mut self, source: StorageAlias) -> Result<(), TranscodeError> {
        if self.started {
            return Err(TranscodeError::validation(
                "cannot set source after the storage map has started working",
            ));
        }
        self.source = Some(source);
        Ok(())
    }

    pub fn set_local_tmp(&mut self, path: PathBuf) -> Result<(), TranscodeError> {
        if self.started {
            return Err(TranscodeError::validation(
                "cannot set local temp path after the storage map has started working",
            ));
        }
        self.local_tmp = Some(path);
        Ok(())
    }

    pub fn add_destination(&mut self, alias: StorageAlias, version: VersionLabel) -> Result<(), TranscodeError> {
        if self.started {
            return Err(TranscodeError::validation(
                "cannot add a destination after the storage map has started working",
            ));
        }
        if self.destinations.len() >= self.max_destinations {
            return Err(TranscodeError::capacity(format!(
                "storage map allocated for {} destinations, cannot add another",
                self.max_destinations
            )));
        }
        self.destinations.push(DestinationSlot::new(alias, version));
        Ok(())
    }

    pub fn source(&self) -> Option<&StorageAlias> {
        self.source.as_ref()
    }

    pub fn local_tmp(&self) -> Option<&PathBuf> {
        self.local_tmp.as_ref()
    }

    pub fn iter_destinations(&self) -> impl Iterator<Item = &DestinationSlot> {
        self.destinations.iter()
    }

    pub fn iter_destinations_mut(&mut self) -> impl Iterator<Item = &mut DestinationSlot> {
        self.destinations.iter_mut()
    }

    pub fn destination_count(&self) -> usize {
        self.destinations.len()
    }

    /// Marks destination `idx` as started; increments the fan-out counter.
    pub fn start_working(&mut self, idx: usize) -> Result<(), TranscodeError> {
        self.started = true;
        let slot = self
            .destinations
            .get_mut(idx)
            .ok_or_else(|| TranscodeError::Internal(format!("no destination at index {idx}")))?;
        if !slot.working {
            slot.working = true;
            self.sync_count += 1;
        }
        Ok(())
    }

    /// Marks destination `idx` as stopped; decrements the fan-out counter.
    pub fn stop_working(&mut self, idx: usize) -> Result<(), TranscodeError> {
        let slot = self
            .destinations
            .get_mut(idx)
            .ok_or_else(|| TranscodeError::Internal(format!("no destination at index {idx}")))?;
        if slot.working {
            slot.working = false;
            self.sync_count = self.sync_count.saturating_sub(1);
        }
        Ok(())
    }

    pub fn all_stopped(&self) -> bool {
        self.sync_count == 0 && self.destinations.iter().all(|d| !d.working)
    }

    pub fn sync_count(&self) -> u32 {
        self.sync_count
    }

    pub fn error_info(&self) -> &ErrorInfo {
        &self.error_info
    }

    /// Idempotent teardown: drops handles exactly once regardless of how
    /// many times it is called.
    pub fn deinit(&mut self) {
        if self.deinitialized {
            return;
        }
        self.source = None;
        self.local_tmp = None;
        self.destinations.clear();
        self.sync_count = 0;
        self.deinitialized = true;
    }

    pub fn is_deinitialized(&self) -> bool {
        self.deinitialized
    }
}
