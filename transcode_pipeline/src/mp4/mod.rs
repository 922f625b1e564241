// /////////////////////////////////////////////////////////////////////////////
// Media Transcode Worker
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! MP4 source container pre-loading: atom parsing, the `mdat` locator, the
//! pre-load state machine, and the av-context packet pump that feeds the
//! downstream encoders.

pub mod atom;
pub mod av_context;
pub mod estimator;
pub mod preload;
pub mod processor;

pub use atom::{Atom, MdatLocator, ATOM_HEADER_SIZE};
pub use av_context::{AvContext, DecodeOutcome, NextPacketOutcome, StreamState};
pub use estimator::{estimate_nb_pkt_preload, AsyncLimit, StreamPreloadStats, DEFAULT_NUM_INIT_PKTS};
pub use preload::{AtomPreloadState, Mp4Preloader, PreloadEvent};
pub use processor::{registry, Mp4FileProcessor};
