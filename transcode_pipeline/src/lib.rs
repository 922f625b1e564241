// /////////////////////////////////////////////////////////////////////////////
// Media Transcode Worker
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Media Transcode Worker
//!
//! A multi-destination media transcode worker: pre-loads an MP4 source into
//! a local working file and an indexed `mdat` body-byte-range map, fans out
//! to N destination encoders (HLS today), and serves the resulting HLS
//! playlists, segments, and keys back out.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  rpc        — request/reply DTOs, transport port            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  runtime    — fan-out/fan-in cycle driver over a StorageMap │
//! ├─────────────────────────────────────────────────────────────┤
//! │  mp4        — atom pre-loader, estimator, av-context pump   │
//! │  hls        — filter/encode/write pipeline, streaming seeker│
//! ├─────────────────────────────────────────────────────────────┤
//! │  storage    — source/committed/staging/local-temp layouts   │
//! │  infrastructure — config, logging, metrics                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The domain layer (`transcode_domain`) owns the `StorageMap` coordinator,
//! the `FileProcessor` dispatch contract, and the shared value objects; this
//! crate provides the concrete MP4/HLS processors, the storage and RPC
//! adapters, and the worker process's ambient stack.

pub mod hls;
pub mod infrastructure;
pub mod mp4;
pub mod rpc;
pub mod runtime;
pub mod storage;

pub use transcode_domain::{
    AsyncOpFlags, CorrelationId, FileProcessor, FileProcessorRegistry, StorageAlias, StorageMap, TranscodeError,
    VersionLabel, WorkerCount,
};
