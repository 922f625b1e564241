// /////////////////////////////////////////////////////////////////////////////
// Media Transcode Worker
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! HLS destination pipeline (filter/encode/write + segment layout) and HLS
//! streaming seeker (playlist synthesis, segment encryption, key rotation).

pub mod crypto;
pub mod encode;
pub mod playlist;
pub mod processor;
pub mod seeker;

pub use crypto::{CryptoKeyEntry, CryptoKeyFile};
pub use encode::{ActiveFns, FilterEncodeWriteStages, MuxedPacket, TickState};
pub use playlist::{PlaylistUrlLabels, VariantStreamInfo};
pub use processor::HlsFileProcessor;
pub use seeker::{CommittedVariant, MasterPlaylistRateLimiter, SeekerContext};
