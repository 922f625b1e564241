//! Domain layer for the media transcode worker.
//!
//! Pure business logic: the storage-map fan-out coordinator, the polymorphic
//! file-processor dispatch contract, and the value objects/errors shared by
//! the MP4 pre-loader and HLS pipeline that live in `transcode_pipeline`.
//! No I/O, no async runtime — infrastructure wraps these with adapters.

pub mod error;
pub mod fileprocessor;
pub mod storagemap;
pub mod value_objects;

pub use error::TranscodeError;
pub use fileprocessor::{AsyncOpFlags, FileProcessor, FileProcessorRegistry};
pub use storagemap::{DestinationSlot, ErrorInfo, StorageMap};
pub use value_objects::{CorrelationId, StorageAlias, VersionLabel, WorkerCount};
