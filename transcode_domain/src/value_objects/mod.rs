pub mod correlation_id;
pub mod storage_alias;
pub mod version_label;
pub mod worker_count;

pub use correlation_id::CorrelationId;
pub use storage_alias::StorageAlias;
pub use version_label::VersionLabel;
pub use worker_count::WorkerCount;
