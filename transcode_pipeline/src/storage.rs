// /////////////////////////////////////////////////////////////////////////////
// Media Transcode Worker
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Storage abstraction over source, committed, staging, and local-temp
//! layouts. An async trait keyed to this worker's directory conventions, with
//! one filesystem implementation provided.

use async_trait::async_trait;
use std::path::PathBuf;
use transcode_domain::TranscodeError;

/// One of the four well-known directory layouts a request touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageLayout {
    /// `<base>/<usr_id>/<upld_req_id:08x>/<chunk_seq>`
    Source,
    /// `<base>/<usr_id>/<upld_req_id:08x>/committed/<version>/...`
    Committed,
    /// `<base>/<usr_id>/<upld_req_id:08x>/transcoding/<version>/...`
    Staging,
    /// `<tmp>/<usr_id>/<upld_req_id:08x>/...`
    LocalTemp,
}

/// Builds a path under a storage root for the given layout.
pub struct StoragePaths {
    pub source_root: PathBuf,
    pub local_tmp_root: PathBuf,
}

impl StoragePaths {
    pub fn new(source_root: impl Into<PathBuf>, local_tmp_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            local_tmp_root: local_tmp_root.into(),
        }
    }

    pub fn source_chunk(&self, usr_id: u32, upld_req_id: u32, chunk_seq: u32) -> PathBuf {
        self.source_root
            .join(usr_id.to_string())
            .join(format!("{upld_req_id:08x}"))
            .join(chunk_seq.to_string())
    }

    pub fn committed_version_dir(&self, usr_id: u32, upld_req_id: u32, version: &str) -> PathBuf {
        self.source_root
            .join(usr_id.to_string())
            .join(format!("{upld_req_id:08x}"))
            .join("committed")
            .join(version)
    }

    pub fn staging_version_dir(&self, usr_id: u32, upld_req_id: u32, version: &str) -> PathBuf {
        self.source_root
            .join(usr_id.to_string())
            .join(format!("{upld_req_id:08x}"))
            .join("transcoding")
            .join(version)
    }

    pub fn local_tmp_dir(&self, usr_id: u32, upld_req_id: u32) -> PathBuf {
        self.local_tmp_root
            .join(usr_id.to_string())
            .join(format!("{upld_req_id:08x}"))
    }
}

/// Async storage port. One filesystem implementation is provided; remote
/// backends (object stores) are out of scope but plug in behind this trait
/// the same way.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn read(&self, path: &std::path::Path) -> Result<Vec<u8>, TranscodeError>;
    async fn write(&self, path: &std::path::Path, data: &[u8]) -> Result<(), TranscodeError>;
    async fn mkdir_all(&self, path: &std::path::Path) -> Result<(), TranscodeError>;
    async fn scandir(&self, path: &std::path::Path) -> Result<Vec<PathBuf>, TranscodeError>;
    async fn unlink(&self, path: &std::path::Path) -> Result<(), TranscodeError>;
    /// Moves `src` into `dst`, used to commit a staged output. Implementations
    /// must copy-then-delete, never delete-then-copy, so a crash mid-move
    /// leaves the staged copy intact (per `storage.c`'s ordering).
    async fn commit(&self, src: &std::path::Path, dst: &std::path::Path) -> Result<(), TranscodeError>;
}

/// Local filesystem-backed implementation of [`StorageBackend`].
pub struct FilesystemStorage;

impl FilesystemStorage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FilesystemStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for FilesystemStorage {
    async fn read(&self, path: &std::path::Path) -> Result<Vec<u8>, TranscodeError> {
        tokio::fs::read(path).await.map_err(TranscodeError::from)
    }

    async fn write(&self, path: &std::path::Path, data: &[u8]) -> Result<(), TranscodeError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, data).await.map_err(TranscodeError::from)
    }

    async fn mkdir_all(&self, path: &std::path::Path) -> Result<(), TranscodeError> {
        tokio::fs::create_dir_all(path).await.map_err(TranscodeError::from)
    }

    async fn scandir(&self, path: &std::path::Path) -> Result<Vec<PathBuf>, TranscodeError> {
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut out = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            out.push(entry.path());
        }
        Ok(out)
    }

    async fn unlink(&self, path: &std::path::Path) -> Result<(), TranscodeError> {
        tokio::fs::remove_file(path).await.map_err(TranscodeError::from)
    }

    async fn commit(&self, src: &std::path::Path, dst: &std::path::Path) -> Result<(), TranscodeError> {
        if let Some(parent) = dst.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(src, dst).await?;
        tokio::fs::remove_file(src).await.map_err(TranscodeError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_chunk_path_matches_layout() {
        let paths = StoragePaths::new("/data/src", "/tmp/work");
        let p = paths.source_chunk(42, 7, 1);
        assert_eq!(p, PathBuf::from("/data/src/42/00000007/1"));
    }

    #[test]
    fn committed_layout_nests_under_committed_and_version() {
        let paths = StoragePaths::new("/data/src", "/tmp/work");
        let p = paths.committed_version_dir(42, 7, "1080");
        assert_eq!(p, PathBuf::from("/data/src/42/00000007/committed/1080"));
    }

    #[tokio::test]
    async fn filesystem_commit_copies_then_deletes_source() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("staged.bin");
        let dst = dir.path().join("out").join("final.bin");
        tokio::fs::write(&src, b"payload").await.unwrap();

        let backend = FilesystemStorage::new();
        backend.commit(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert_eq!(tokio::fs::read(&dst).await.unwrap(), b"payload");
    }

    proptest::proptest! {
        #[test]
        fn source_chunk_path_always_nests_under_source_root(usr_id: u32, upld_req_id: u32, chunk_seq: u32) {
            let paths = StoragePaths::new("/data/src", "/tmp/work");
            let p = paths.source_chunk(usr_id, upld_req_id, chunk_seq);
            prop_assert!(p.starts_with("/data/src"));
            prop_assert_eq!(p.file_name().unwrap().to_str().unwrap(), chunk_seq.to_string());
        }
    }
}
