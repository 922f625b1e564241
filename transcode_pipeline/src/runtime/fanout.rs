// /////////////////////////////////////////////////////////////////////////////
// Media Transcode Worker
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Drives a request's [`StorageMap`] through `Init → SrcProcess → DstProcess
//! → Finalize`. Destinations fan out with `join_all` and fan back in at the
//! barrier; the first component to observe the shared [`ErrorInfo`] set stops
//! driving further ticks.

use futures::future::join_all;
use std::sync::Arc;
use transcode_domain::{ErrorInfo, FileProcessor, TranscodeError};

/// One tick of a single destination: runs `processing` until it suspends
/// (signals it will resume asynchronously) or finishes, reporting back
/// whether it is still working.
async fn drive_destination_once(processor: &mut dyn FileProcessor, error_info: &ErrorInfo) -> bool {
    if error_info.is_set() {
        return false;
    }
    match processor.processing() {
        Ok(_) => !processor.has_done_processing(),
        Err(err) => {
            error_info.try_set(err);
            false
        }
    }
}

/// Runs the source processor for one tick, then fans every destination
/// out for one tick each, joining on completion before the next tick.
/// Returns `true` while the source still has work to do.
#[tracing::instrument(skip(source, destinations, error_info))]
pub async fn run_processing_cycle(
    source: &mut dyn FileProcessor,
    destinations: &mut [Box<dyn FileProcessor>],
    error_info: &ErrorInfo,
) -> Result<bool, TranscodeError> {
    if error_info.is_set() {
        return Ok(false);
    }

    if let Err(err) = source.processing() {
        error_info.try_set(err.clone());
        return Err(err);
    }
    let source_still_working = !source.has_done_processing();

    let futures_vec: Vec<_> = destinations
        .iter_mut()
        .map(|dst| drive_destination_once(dst.as_mut(), error_info))
        .collect();
    let still_working = join_all(futures_vec).await;

    tracing::debug!(
        source_still_working,
        destinations_still_working = still_working.iter().filter(|w| **w).count(),
        "processing cycle completed"
    );

    Ok(source_still_working || still_working.into_iter().any(|w| w))
}

/// Runs cycles until either the source and all destinations report done,
/// or the shared error slot is set. Returns the terminal error, if any.
pub async fn run_until_done(
    source: &mut dyn FileProcessor,
    destinations: &mut [Box<dyn FileProcessor>],
    error_info: Arc<ErrorInfo>,
) -> Result<(), TranscodeError> {
    loop {
        let still_working = run_processing_cycle(source, destinations, &error_info).await?;
        if let Some(err) = error_info.get() {
            return Err(err);
        }
        if !still_working {
            return Ok(());
        }
    }
}
